//! MH-Z19 NDIR CO₂ sensor (UART, 9600 8N1)
//!
//! Every command and reply is a 9-byte frame:
//!
//! ```text
//! command: FF 01 CMD  B3 B4 B5 B6 B7 CHK
//! reply:   FF CMD D2  D3 D4 D5 D6 D7 CHK
//! ```
//!
//! CHK is the two's complement of the sum of bytes 1..=7.

use peridot_hal::{Error, UartBus};

pub const FRAME_LEN: usize = 9;
const START: u8 = 0xFF;
const SENSOR_NUMBER: u8 = 0x01;

pub mod cmd {
    pub const READ_CO2: u8 = 0x86;
    pub const CALIBRATE_ZERO: u8 = 0x87;
    pub const AUTO_CALIBRATION: u8 = 0x79;
    pub const DETECTION_RANGE: u8 = 0x99;
}

/// Checksum over bytes 1..=7 of a frame
pub fn checksum(frame: &[u8; FRAME_LEN]) -> u8 {
    let sum = frame[1..8].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    0xFFu8.wrapping_sub(sum).wrapping_add(1)
}

/// Build a command frame with its checksum
pub fn command(cmd: u8, args: [u8; 5]) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = START;
    frame[1] = SENSOR_NUMBER;
    frame[2] = cmd;
    frame[3..8].copy_from_slice(&args);
    frame[8] = checksum(&frame);
    frame
}

/// One CO₂ reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Co2Reading {
    /// Concentration in parts per million
    pub ppm: u16,
    /// Internal temperature, whole °C (coarse)
    pub temperature_c: i16,
}

pub struct Mhz19<U> {
    uart: U,
}

impl<U: UartBus> Mhz19<U> {
    pub fn new(uart: U) -> Self {
        Self { uart }
    }

    pub fn free(self) -> U {
        self.uart
    }

    pub fn read_co2(&mut self) -> Result<Co2Reading, Error> {
        let reply = self.exchange(cmd::READ_CO2, [0; 5])?;
        Ok(Co2Reading {
            ppm: u16::from_be_bytes([reply[2], reply[3]]),
            temperature_c: reply[4] as i16 - 40,
        })
    }

    /// Declare the current air to be 400 ppm
    pub fn calibrate_zero(&mut self) -> Result<(), Error> {
        self.uart.write_all(&command(cmd::CALIBRATE_ZERO, [0; 5]))
    }

    /// Enable or disable automatic baseline correction
    pub fn set_auto_calibration(&mut self, enabled: bool) -> Result<(), Error> {
        let arg = if enabled { 0xA0 } else { 0x00 };
        self.uart
            .write_all(&command(cmd::AUTO_CALIBRATION, [arg, 0, 0, 0, 0]))
    }

    /// Set the full-scale range (2000 or 5000 ppm)
    pub fn set_range(&mut self, ppm: u16) -> Result<(), Error> {
        if ppm != 2000 && ppm != 5000 {
            return Err(Error::InvalidParam);
        }
        let [hi, lo] = ppm.to_be_bytes();
        self.exchange(cmd::DETECTION_RANGE, [0, 0, 0, hi, lo])
            .map(|_| ())
    }

    fn exchange(&mut self, cmd: u8, args: [u8; 5]) -> Result<[u8; FRAME_LEN], Error> {
        // Stale bytes from an earlier reply would shift the frame
        while self.uart.buffered_count() > 0 {
            self.uart.read_byte()?;
        }
        self.uart.write_all(&command(cmd, args))?;

        let mut reply = [0u8; FRAME_LEN];
        self.uart.read_exact(&mut reply)?;
        if reply[0] != START || reply[1] != cmd {
            return Err(Error::BusError);
        }
        if checksum(&reply) != reply[8] {
            #[cfg(feature = "defmt")]
            defmt::debug!("mhz19: checksum mismatch {:02x}", reply);
            return Err(Error::CrcMismatch);
        }
        Ok(reply)
    }
}
