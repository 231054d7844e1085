//! DS18B20 1-Wire temperature sensor
//!
//! # Reading sequence
//!
//! ```text
//! reset ─ SKIP/MATCH ─ CONVERT_T ──(wait t_conv)── reset ─ SKIP/MATCH ─ READ_SCRATCHPAD ─ 9 bytes
//! ```
//!
//! The scratchpad's last byte is a Dallas CRC-8 over the first eight. The
//! temperature register is a signed 16-bit value in 1/16 °C steps; lower
//! resolutions leave the low bits undefined and the conversion finishes
//! sooner.

use embedded_hal::delay::DelayNs;
use peridot_bus::{crc8, OneWireExt, Rom};
use peridot_hal::{Error, OneWireBus};

/// Family code shared by every DS18B20
pub const FAMILY_CODE: u8 = 0x28;

/// Function commands
pub mod cmd {
    /// Start a temperature conversion
    pub const CONVERT_TEMPERATURE: u8 = 0x44;
    /// Read the 9-byte scratchpad
    pub const READ_SCRATCHPAD: u8 = 0xBE;
    /// Write TH, TL and configuration
    pub const WRITE_SCRATCHPAD: u8 = 0x4E;
}

/// Conversion resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Resolution {
    Bits9 = 9,
    Bits10 = 10,
    Bits11 = 11,
    /// Power-on default
    Bits12 = 12,
}

impl Resolution {
    /// Resolution from a bit count in `9..=12`
    pub fn from_bits(bits: u8) -> Result<Self, Error> {
        match bits {
            9 => Ok(Self::Bits9),
            10 => Ok(Self::Bits10),
            11 => Ok(Self::Bits11),
            12 => Ok(Self::Bits12),
            _ => Err(Error::InvalidParam),
        }
    }

    /// Worst-case conversion time in milliseconds
    pub const fn conversion_time_ms(self) -> u32 {
        match self {
            Self::Bits9 => 94,
            Self::Bits10 => 188,
            Self::Bits11 => 375,
            Self::Bits12 => 750,
        }
    }

    /// Configuration register value (R1:R0 in bits 6:5, reserved bits set)
    pub const fn config_byte(self) -> u8 {
        ((self as u8 - 9) << 5) | 0x1F
    }

    /// Decode a configuration register value
    pub const fn from_config(config: u8) -> Self {
        match (config >> 5) & 0x03 {
            0 => Self::Bits9,
            1 => Self::Bits10,
            2 => Self::Bits11,
            _ => Self::Bits12,
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::Bits12
    }
}

/// Convert the temperature register to millicelsius
pub fn raw_to_millicelsius(lsb: u8, msb: u8) -> i32 {
    let raw = i16::from_le_bytes([lsb, msb]) as i32;
    raw * 625 / 10
}

/// A CRC-checked scratchpad image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Scratchpad([u8; 9]);

impl Scratchpad {
    /// Validate the CRC of a raw scratchpad read
    pub fn new(bytes: [u8; 9]) -> Result<Self, Error> {
        if crc8(&bytes[..8]) != bytes[8] {
            #[cfg(feature = "defmt")]
            defmt::debug!("ds18b20: scratchpad crc mismatch {:02x}", bytes);
            return Err(Error::CrcMismatch);
        }
        Ok(Self(bytes))
    }

    /// Temperature in millicelsius
    pub fn millicelsius(&self) -> i32 {
        raw_to_millicelsius(self.0[0], self.0[1])
    }

    /// High alarm threshold (°C)
    pub fn alarm_high(&self) -> i8 {
        self.0[2] as i8
    }

    /// Low alarm threshold (°C)
    pub fn alarm_low(&self) -> i8 {
        self.0[3] as i8
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::from_config(self.0[4])
    }

    pub fn as_bytes(&self) -> &[u8; 9] {
        &self.0
    }
}

/// One DS18B20, addressed by ROM or alone on its bus
pub struct Ds18b20<B> {
    bus: B,
    rom: Option<Rom>,
    resolution: Resolution,
}

impl<B: OneWireBus> Ds18b20<B> {
    /// Sensor alone on the bus, addressed with SKIP_ROM
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            rom: None,
            resolution: Resolution::default(),
        }
    }

    /// Sensor on a multi-drop bus, addressed with MATCH_ROM
    pub fn with_rom(bus: B, rom: Rom) -> Result<Self, Error> {
        if rom.family_code() != FAMILY_CODE {
            return Err(Error::InvalidId);
        }
        Ok(Self {
            bus,
            rom: Some(rom),
            resolution: Resolution::default(),
        })
    }

    /// Release the bus
    pub fn free(self) -> B {
        self.bus
    }

    pub fn rom(&self) -> Option<&Rom> {
        self.rom.as_ref()
    }

    /// Resolution last written with [`set_resolution`](Self::set_resolution)
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Read the ROM of a single-drop sensor and remember it for MATCH_ROM
    pub fn read_address(&mut self) -> Result<Rom, Error> {
        let rom = self.bus.read_rom()?;
        if rom.family_code() != FAMILY_CODE {
            return Err(Error::InvalidId);
        }
        self.rom = Some(rom);
        Ok(rom)
    }

    /// Write the configuration register; alarm thresholds are set to
    /// +127 / 0 °C
    pub fn set_resolution(&mut self, resolution: Resolution) -> Result<(), Error> {
        self.bus.select(self.rom.as_ref())?;
        self.bus.write(cmd::WRITE_SCRATCHPAD);
        self.bus.write_bytes(&[0x7F, 0x00, resolution.config_byte()]);
        self.resolution = resolution;
        Ok(())
    }

    /// Start a conversion; the result is ready after
    /// [`conversion_time_ms`](Resolution::conversion_time_ms)
    pub fn request_temperature(&mut self) -> Result<(), Error> {
        self.bus.select(self.rom.as_ref())?;
        self.bus.write(cmd::CONVERT_TEMPERATURE);
        Ok(())
    }

    pub fn read_scratchpad(&mut self) -> Result<Scratchpad, Error> {
        self.bus.select(self.rom.as_ref())?;
        self.bus.write(cmd::READ_SCRATCHPAD);
        let mut bytes = [0u8; 9];
        self.bus.read_bytes(&mut bytes);
        Scratchpad::new(bytes)
    }

    /// Temperature from the last conversion, in millicelsius
    pub fn read_temperature(&mut self) -> Result<i32, Error> {
        Ok(self.read_scratchpad()?.millicelsius())
    }

    /// Convert, wait the conversion time, and read
    pub fn measure<D: DelayNs>(&mut self, delay: &mut D) -> Result<i32, Error> {
        self.request_temperature()?;
        delay.delay_ms(self.resolution.conversion_time_ms());
        self.read_temperature()
    }
}
