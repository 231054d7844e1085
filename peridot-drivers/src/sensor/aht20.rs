//! AHT20 humidity and temperature sensor (I2C)
//!
//! A measurement is triggered with `0xAC 0x33 0x00`, then polled until the
//! busy bit clears. The reply is seven bytes:
//!
//! ```text
//! ┌────────┬──────────────────────┬──────────────────────┬─────┐
//! │ STATUS │ HUMIDITY (20 bits)   │ TEMPERATURE (20 bits)│ CRC │
//! └────────┴──────────────────────┴──────────────────────┴─────┘
//! ```

use embedded_hal::delay::DelayNs;
use peridot_hal::{Error, I2cBus};

/// Fixed I2C address
pub const ADDRESS: u8 = 0x38;

pub mod cmd {
    pub const INITIALIZE: u8 = 0xBE;
    pub const STATUS: u8 = 0x71;
    pub const TRIGGER: u8 = 0xAC;
    pub const SOFT_RESET: u8 = 0xBA;
}

/// Status bits
pub mod status {
    pub const BUSY: u8 = 0x80;
    pub const CALIBRATED: u8 = 0x08;
    pub const READY: u8 = 0x04;
}

/// Polls after a trigger before giving up with `Timeout`
pub const MAX_POLLS: usize = 3;

/// Wait before each poll
const MEASURE_DELAY_MS: u32 = 80;

/// Full scale of the 20-bit readings
const FULL_SCALE: i64 = 1 << 20;

/// AHT20 driver; keeps the last raw reading
pub struct Aht20<B> {
    bus: B,
    address: u8,
    humidity: u32,
    temperature: u32,
}

impl<B: I2cBus> Aht20<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            address: ADDRESS,
            humidity: 0,
            temperature: 0,
        }
    }

    pub fn free(self) -> B {
        self.bus
    }

    pub fn status(&mut self) -> Result<u8, Error> {
        let mut buf = [0u8];
        self.bus.transact(self.address, &[cmd::STATUS], &mut buf)?;
        Ok(buf[0])
    }

    /// Load the calibration if the sensor reports it missing
    pub fn configure<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error> {
        if self.status()? & status::CALIBRATED != 0 {
            return Ok(());
        }
        self.bus.write(self.address, &[cmd::INITIALIZE, 0x08, 0x00])?;
        delay.delay_ms(10);
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), Error> {
        self.bus.write(self.address, &[cmd::SOFT_RESET])
    }

    /// Trigger a measurement and store the result
    pub fn read<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error> {
        self.bus.write(self.address, &[cmd::TRIGGER, 0x33, 0x00])?;

        let mut data = [0u8; 7];
        for _ in 0..MAX_POLLS {
            delay.delay_ms(MEASURE_DELAY_MS);
            self.bus.read(self.address, &mut data)?;

            if data[0] & status::READY != 0 && data[0] & status::BUSY == 0 {
                self.humidity = (data[1] as u32) << 12 | (data[2] as u32) << 4 | (data[3] as u32) >> 4;
                self.temperature =
                    ((data[3] as u32) & 0x0F) << 16 | (data[4] as u32) << 8 | data[5] as u32;
                return Ok(());
            }
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("aht20: still busy after {} polls", MAX_POLLS);
        Err(Error::Timeout)
    }

    pub fn raw_humidity(&self) -> u32 {
        self.humidity
    }

    pub fn raw_temperature(&self) -> u32 {
        self.temperature
    }

    /// Relative humidity in tenths of a percent
    pub fn deci_rel_humidity(&self) -> i32 {
        (self.humidity as i64 * 1000 / FULL_SCALE) as i32
    }

    /// Temperature in tenths of a degree Celsius
    pub fn deci_celsius(&self) -> i32 {
        (self.temperature as i64 * 2000 / FULL_SCALE) as i32 - 500
    }
}
