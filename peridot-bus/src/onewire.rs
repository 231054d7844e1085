//! 1-Wire link layer, ROM layer and Dallas CRC-8
//!
//! A single open-drain data line, pulled up, carries both directions. The
//! master opens every bit slot by pulling the line low; devices answer by
//! holding it low within the slot.
//!
//! ```text
//! reset    ──┐          480us          ┌──70us──┬──────410us──────┌──
//!            └─────────────────────────┘   ^ sample presence     │
//!
//! write 1  ──┐ 6 ┌────────64us─────────
//!            └───┘
//! write 0  ──┐       60us        ┌10─
//!            └───────────────────┘
//! read     ──┐3┌──10──┬─────53us──────
//!            └─┘      ^ sample
//! ```
//!
//! Every operation returns with the line released (input with pull-up).

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use peridot_hal::{Error, OneWireBus, OpenDrainPin};

/// Slot timings in microseconds
pub mod timing {
    pub const RESET_LOW_US: u32 = 480;
    pub const PRESENCE_WAIT_US: u32 = 70;
    pub const RESET_RECOVERY_US: u32 = 410;
    pub const WRITE_1_LOW_US: u32 = 6;
    pub const WRITE_1_HIGH_US: u32 = 64;
    pub const WRITE_0_LOW_US: u32 = 60;
    pub const WRITE_0_HIGH_US: u32 = 10;
    pub const READ_LOW_US: u32 = 3;
    pub const READ_SAMPLE_US: u32 = 10;
    pub const READ_RECOVERY_US: u32 = 53;
}

/// Most devices a single search returns
pub const MAX_DEVICES: usize = 32;

/// ROM-level commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RomCommand {
    /// Enumerate all devices
    SearchRom = 0xF0,
    /// Read the ROM of the only device on the bus
    ReadRom = 0x33,
    /// Address one device by ROM
    MatchRom = 0x55,
    /// Address every device (single-drop bus)
    SkipRom = 0xCC,
    /// Enumerate devices with an alarm condition
    AlarmSearch = 0xEC,
}

const CRC8_LO: [u8; 16] = [
    0x00, 0x5E, 0xBC, 0xE2, 0x61, 0x3F, 0xDD, 0x83, 0xC2, 0x9C, 0x7E, 0x20, 0xA3, 0xFD, 0x1F, 0x41,
];

const CRC8_HI: [u8; 16] = [
    0x00, 0x9D, 0x23, 0xBE, 0x46, 0xDB, 0x65, 0xF8, 0x8C, 0x11, 0xAF, 0x32, 0xCA, 0x57, 0xE9, 0x74,
];

/// Dallas/Maxim CRC-8 (x^8 + x^5 + x^4 + 1, reflected 0x8C, init 0)
///
/// Feeding the CRC byte through as well yields zero.
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |crc, &d| {
        let i = crc ^ d;
        CRC8_LO[(i & 0x0F) as usize] ^ CRC8_HI[((i >> 4) & 0x0F) as usize]
    })
}

/// 64-bit device ROM: family code, 48-bit serial, CRC-8
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rom([u8; 8]);

impl Rom {
    /// Validate and wrap ROM bytes as read from the wire
    pub fn new(bytes: [u8; 8]) -> Result<Self, Error> {
        let rom = Self(bytes);
        if !rom.is_valid() {
            #[cfg(feature = "defmt")]
            defmt::debug!("1-wire: ROM CRC mismatch {:02x}", bytes);
            return Err(Error::CrcMismatch);
        }
        Ok(rom)
    }

    /// Build a ROM from family code and serial, appending the CRC
    pub fn from_parts(family: u8, serial: [u8; 6]) -> Self {
        let mut bytes = [0u8; 8];
        bytes[0] = family;
        bytes[1..7].copy_from_slice(&serial);
        bytes[7] = crc8(&bytes[..7]);
        Self(bytes)
    }

    pub fn family_code(&self) -> u8 {
        self.0[0]
    }

    pub fn serial(&self) -> [u8; 6] {
        let mut s = [0u8; 6];
        s.copy_from_slice(&self.0[1..7]);
        s
    }

    pub fn crc(&self) -> u8 {
        self.0[7]
    }

    /// CRC over the first seven bytes matches the eighth
    pub fn is_valid(&self) -> bool {
        crc8(&self.0[..7]) == self.0[7]
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Bit `n` (0..64) in wire order
    #[inline]
    fn bit(&self, n: usize) -> bool {
        (self.0[n / 8] >> (n % 8)) & 1 != 0
    }
}

/// Bit-banged 1-Wire master on one open-drain pin
pub struct OneWire<P, D> {
    pin: P,
    delay: D,
}

impl<P: OpenDrainPin, D: DelayNs> OneWire<P, D> {
    /// Take the pin and leave the line released
    pub fn new(mut pin: P, delay: D) -> Self {
        pin.release();
        Self { pin, delay }
    }

    /// Borrow the data pin
    pub fn pin(&self) -> &P {
        &self.pin
    }

    /// Release the pin and delay source
    pub fn free(self) -> (P, D) {
        (self.pin, self.delay)
    }
}

impl<P: OpenDrainPin, D: DelayNs> OneWireBus for OneWire<P, D> {
    fn reset(&mut self) -> Result<(), Error> {
        self.pin.drive_low();
        self.delay.delay_us(timing::RESET_LOW_US);
        self.pin.release();
        self.delay.delay_us(timing::PRESENCE_WAIT_US);
        let present = self.pin.is_low();
        self.delay.delay_us(timing::RESET_RECOVERY_US);

        if !present {
            return Err(Error::NoPresence);
        }
        // Presence pulse lasts at most 240us; still low means a shorted line
        if self.pin.is_low() {
            return Err(Error::BusError);
        }
        Ok(())
    }

    fn write_bit(&mut self, bit: bool) {
        let (low, high) = if bit {
            (timing::WRITE_1_LOW_US, timing::WRITE_1_HIGH_US)
        } else {
            (timing::WRITE_0_LOW_US, timing::WRITE_0_HIGH_US)
        };
        self.pin.drive_low();
        self.delay.delay_us(low);
        self.pin.release();
        self.delay.delay_us(high);
    }

    fn read_bit(&mut self) -> bool {
        self.pin.drive_low();
        self.delay.delay_us(timing::READ_LOW_US);
        self.pin.release();
        self.delay.delay_us(timing::READ_SAMPLE_US);
        let bit = self.pin.is_high();
        self.delay.delay_us(timing::READ_RECOVERY_US);
        bit
    }
}

/// ROM-layer commands on any 1-Wire bus
pub trait OneWireExt: OneWireBus {
    /// Read the ROM of the only device on the bus
    fn read_rom(&mut self) -> Result<Rom, Error> {
        self.reset()?;
        self.write(RomCommand::ReadRom as u8);
        let mut bytes = [0u8; 8];
        self.read_bytes(&mut bytes);
        Rom::new(bytes)
    }

    /// Reset and address one device (`Some`) or all devices (`None`)
    fn select(&mut self, rom: Option<&Rom>) -> Result<(), Error> {
        self.reset()?;
        match rom {
            None => self.write(RomCommand::SkipRom as u8),
            Some(rom) => {
                self.write(RomCommand::MatchRom as u8);
                self.write_bytes(rom.as_bytes());
            }
        }
        Ok(())
    }

    /// Enumerate every device on the bus
    fn search(&mut self) -> Result<Vec<Rom, MAX_DEVICES>, Error> {
        self.search_by(RomCommand::SearchRom)
    }

    /// Enumerate devices whose alarm flag is set
    fn alarm_search(&mut self) -> Result<Vec<Rom, MAX_DEVICES>, Error> {
        self.search_by(RomCommand::AlarmSearch)
    }

    /// Binary-tree ROM search with `SearchRom` or `AlarmSearch`
    ///
    /// Stops after [`MAX_DEVICES`] ROMs. An empty result means no device
    /// answered the search (possible for `AlarmSearch`). A device that
    /// stops answering mid-search yields `BusError`; a ROM whose CRC fails
    /// yields `CrcMismatch`.
    fn search_by(&mut self, command: RomCommand) -> Result<Vec<Rom, MAX_DEVICES>, Error> {
        if !matches!(command, RomCommand::SearchRom | RomCommand::AlarmSearch) {
            return Err(Error::InvalidParam);
        }

        let mut found: Vec<Rom, MAX_DEVICES> = Vec::new();
        let mut rom = [0u8; 8];
        // 1-based bit position of the last branch where 0 was taken
        let mut last_discrepancy = 0usize;

        loop {
            self.reset()?;
            self.write(command as u8);

            let mut last_zero = 0usize;
            for pos in 1..=64usize {
                let n = pos - 1;
                let id = self.read_bit();
                let complement = self.read_bit();

                let dir = match (id, complement) {
                    (true, true) if pos == 1 && found.is_empty() => return Ok(found),
                    (true, true) => return Err(Error::BusError),
                    (false, true) => false,
                    (true, false) => true,
                    (false, false) => {
                        let dir = if pos < last_discrepancy {
                            Rom(rom).bit(n)
                        } else {
                            pos == last_discrepancy
                        };
                        if !dir {
                            last_zero = pos;
                        }
                        dir
                    }
                };

                if dir {
                    rom[n / 8] |= 1 << (n % 8);
                } else {
                    rom[n / 8] &= !(1 << (n % 8));
                }
                self.write_bit(dir);
            }

            if found.push(Rom::new(rom)?).is_err() {
                break;
            }
            last_discrepancy = last_zero;
            if last_discrepancy == 0 {
                break;
            }
        }
        Ok(found)
    }
}

impl<T: OneWireBus + ?Sized> OneWireExt for T {}
