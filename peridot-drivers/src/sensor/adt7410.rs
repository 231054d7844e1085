//! ADT7410 temperature sensor (I2C)
//!
//! The temperature register is a big-endian signed value in 1/128 °C
//! (13-bit mode leaves the three status bits at the bottom, which the
//! scaling absorbs).

use embedded_hal::delay::DelayNs;
use peridot_hal::bytes::read_i16_be;
use peridot_hal::{Error, I2cBus};

/// Address with A0 = A1 = 0; the pins add 0..=3
pub const ADDRESS: u8 = 0x48;

/// Register map
pub mod reg {
    pub const TEMP_MSB: u8 = 0x00;
    pub const TEMP_LSB: u8 = 0x01;
    pub const STATUS: u8 = 0x02;
    pub const CONFIG: u8 = 0x03;
    pub const ID: u8 = 0x0B;
    pub const RESET: u8 = 0x2F;
}

/// Manufacturer ID in the top five bits of `reg::ID`
const ID_PATTERN: u8 = 0xC8;
const ID_MASK: u8 = 0xF8;

/// ADT7410 configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Adt7410Config {
    /// Address offset set by A0/A1 (0..=3)
    pub address_offset: u8,
}

pub struct Adt7410<B> {
    bus: B,
    address: u8,
}

impl<B: I2cBus> Adt7410<B> {
    pub fn new(bus: B, config: Adt7410Config) -> Result<Self, Error> {
        if config.address_offset > 3 {
            return Err(Error::InvalidParam);
        }
        Ok(Self {
            bus,
            address: ADDRESS + config.address_offset,
        })
    }

    pub fn free(self) -> B {
        self.bus
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Soft-reset the sensor and check its ID
    ///
    /// Some parts report an ID that does not match the datasheet pattern,
    /// so a mismatch is logged and otherwise ignored.
    pub fn configure<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error> {
        self.bus.write_register(self.address, reg::RESET, &[0xFF])?;
        delay.delay_ms(10);

        let id = self.id()?;
        if id & ID_MASK != ID_PATTERN {
            #[cfg(feature = "defmt")]
            defmt::warn!("adt7410: unexpected id {:#04x}", id);
        }
        Ok(())
    }

    /// Raw ID register
    pub fn id(&mut self) -> Result<u8, Error> {
        let mut buf = [0u8];
        self.bus.read_register(self.address, reg::ID, &mut buf)?;
        Ok(buf[0])
    }

    /// True when the ID register carries the ADT7410 pattern
    pub fn connected(&mut self) -> Result<bool, Error> {
        Ok(self.id()? & ID_MASK == ID_PATTERN)
    }

    /// Temperature in millicelsius
    pub fn read_temperature(&mut self) -> Result<i32, Error> {
        let mut buf = [0u8; 2];
        self.bus.read_register(self.address, reg::TEMP_MSB, &mut buf)?;
        Ok(read_i16_be(buf) as i32 * 1000 / 128)
    }
}
