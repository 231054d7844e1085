//! ATECC508A / ATECC608A secure element (I2C)
//!
//! Every public operation runs one session:
//!
//! ```text
//!   wake ──▶ send command ──▶ wait t_exec ──▶ read response ──▶ idle
//! ```
//!
//! Idle keeps volatile state (TempKey, RNG seed) without the watchdog
//! running out; [`sleep`](Atecc::sleep) drops it. Framing and CRC live in
//! `peridot_protocol::atecc`.

use embedded_hal::delay::DelayNs;
use peridot_hal::{Error, I2cBus};
use peridot_protocol::atecc::{
    parse_response, CryptoFrame, FrameError, Opcode, WordAddress, Zone, MAX_RESPONSE_SIZE,
    STATUS_AFTER_WAKE,
};

/// Factory default I2C address
pub const ADDRESS: u8 = 0x60;

/// Low time of the wake token (µs)
const WAKE_LOW_US: u32 = 1500;
/// Wait after the wake token before the status can be read (ms)
const WAKE_TIMEOUT_MS: u32 = 250;
/// Settle time after a command, sleep or idle write (ms)
const WRITE_SETTLE_MS: u32 = 1;

/// Config zone word holding LockValue (byte 2) and LockConfig (byte 3)
const LOCK_WORD: u16 = 0x15;
/// Config zone word holding the SlotLocked bitmap (bytes 0..2)
const SLOT_LOCK_WORD: u16 = 0x16;

/// Chip family, from the `Info` revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Variant {
    Atecc508,
    Atecc608,
    Unknown(u16),
}

impl From<u16> for Variant {
    fn from(version: u16) -> Self {
        match version {
            0x5000 => Self::Atecc508,
            0x6000 => Self::Atecc608,
            other => Self::Unknown(other),
        }
    }
}

fn frame_error(e: FrameError) -> Error {
    match e {
        FrameError::InvalidChecksum => Error::CrcMismatch,
        FrameError::PayloadTooLarge | FrameError::BufferTooSmall => Error::InvalidParam,
        FrameError::Incomplete | FrameError::InvalidFrame => Error::BusError,
    }
}

pub struct Atecc<B, D> {
    bus: B,
    delay: D,
    address: u8,
}

impl<B: I2cBus, D: DelayNs> Atecc<B, D> {
    pub fn new(bus: B, delay: D) -> Self {
        Self::with_address(bus, delay, ADDRESS)
    }

    pub fn with_address(bus: B, delay: D, address: u8) -> Self {
        Self {
            bus,
            delay,
            address,
        }
    }

    pub fn free(self) -> (B, D) {
        (self.bus, self.delay)
    }

    /// Wake the device and check the after-wake status
    pub fn wake(&mut self) -> Result<(), Error> {
        // A write to the general-call address holds SDA low long enough to
        // count as the wake token. Neither write is acknowledged by a
        // sleeping device.
        let _ = self.bus.write(0x00, &[0x00]);
        self.delay.delay_us(WAKE_LOW_US);
        let _ = self.bus.write(self.address, &[0x00]);
        self.delay.delay_ms(WAKE_TIMEOUT_MS);

        let mut status = [0u8; 1];
        self.read_response(&mut status)?;
        if status[0] != STATUS_AFTER_WAKE {
            #[cfg(feature = "defmt")]
            defmt::debug!("atecc: wake status {:#04x}", status[0]);
            return Err(Error::WakeFailed);
        }
        Ok(())
    }

    /// Enter sleep; volatile state is lost
    pub fn sleep(&mut self) -> Result<(), Error> {
        self.bus.write(self.address, &[WordAddress::Sleep as u8])?;
        self.delay.delay_ms(WRITE_SETTLE_MS);
        Ok(())
    }

    /// Enter idle; volatile state is kept
    pub fn idle(&mut self) -> Result<(), Error> {
        self.bus.write(self.address, &[WordAddress::Idle as u8])?;
        self.delay.delay_ms(WRITE_SETTLE_MS);
        Ok(())
    }

    /// Chip revision: byte 2 of the `Info` reply in the high byte
    ///
    /// The low byte is `resp[3] & 0xF000`, which is always zero, so the
    /// silicon stepping in byte 3 never shows. 0x5000 is an ATECC508A and
    /// 0x6000 an ATECC608A.
    pub fn version(&mut self) -> Result<u16, Error> {
        self.session(|dev| {
            let mut info = [0u8; 4];
            dev.execute(&CryptoFrame::command(Opcode::Info, 0x00, 0), &mut info)?;
            Ok((info[2] as u16) << 8 | (info[3] as u16 & 0xF000))
        })
    }

    pub fn variant(&mut self) -> Result<Variant, Error> {
        self.version().map(Variant::from)
    }

    /// True when an ATECC508A or ATECC608A answers
    pub fn connected(&mut self) -> bool {
        matches!(
            self.variant(),
            Ok(Variant::Atecc508) | Ok(Variant::Atecc608)
        )
    }

    /// 32 bytes from the hardware RNG
    pub fn random(&mut self) -> Result<[u8; 32], Error> {
        self.session(|dev| {
            let mut out = [0u8; 32];
            let n = dev.execute(&CryptoFrame::command(Opcode::Random, 0x00, 0), &mut out)?;
            if n != out.len() {
                return Err(Error::BusError);
            }
            Ok(out)
        })
    }

    /// Read 4 or 32 bytes from a zone
    ///
    /// `address` is the word address for `Config` and `Data`; for
    /// `Slot(n)` it is the 32-byte block within the slot.
    pub fn read(&mut self, zone: Zone, address: u16, buf: &mut [u8]) -> Result<(), Error> {
        let size_flag = match buf.len() {
            4 => 0x00,
            32 => 0x80,
            _ => return Err(Error::InvalidParam),
        };
        let param2 = match zone {
            Zone::Slot(n) if n > 15 => return Err(Error::InvalidParam),
            Zone::Slot(n) => ((n as u16) << 3) | (address << 8),
            Zone::Config | Zone::Data => address,
        };
        let frame = CryptoFrame::command(Opcode::Read, zone.read_code() | size_flag, param2);
        self.session(|dev| {
            let n = dev.execute(&frame, buf)?;
            if n != buf.len() {
                return Err(Error::BusError);
            }
            Ok(())
        })
    }

    /// Whether the config zone is locked
    pub fn is_locked(&mut self) -> Result<bool, Error> {
        self.is_zone_locked(Zone::Config)
    }

    pub fn is_zone_locked(&mut self, zone: Zone) -> Result<bool, Error> {
        let mut word = [0u8; 4];
        match zone {
            Zone::Config | Zone::Data => {
                self.read(Zone::Config, LOCK_WORD, &mut word)?;
                let index = if zone == Zone::Config { 3 } else { 2 };
                Ok(word[index] == 0x00)
            }
            Zone::Slot(n) if n > 15 => Err(Error::InvalidParam),
            Zone::Slot(n) => {
                self.read(Zone::Config, SLOT_LOCK_WORD, &mut word)?;
                let unlocked = u16::from_le_bytes([word[0], word[1]]);
                Ok(unlocked & (1 << n) == 0)
            }
        }
    }

    /// Permanently lock a zone
    ///
    /// Locking is irreversible; a zone that is already locked yields
    /// `LockFailed`.
    pub fn lock(&mut self, zone: Zone) -> Result<(), Error> {
        if matches!(zone, Zone::Slot(n) if n > 15) {
            return Err(Error::InvalidParam);
        }
        self.session(|dev| {
            let mut status = [0xFFu8; 1];
            dev.execute(&CryptoFrame::command(Opcode::Lock, zone.lock_param(), 0), &mut status)?;
            if status[0] != 0x00 {
                #[cfg(feature = "defmt")]
                defmt::warn!("atecc: lock {} failed, status {:#04x}", zone, status[0]);
                return Err(Error::LockFailed);
            }
            Ok(())
        })
    }

    /// Wake, run `f`, then idle even when `f` failed
    fn session<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        self.wake()?;
        let result = f(self);
        let idled = self.idle();
        let value = result?;
        idled?;
        Ok(value)
    }

    /// Send, wait the opcode's execution time, and read the response data
    /// into `out`; returns the data length
    fn execute(&mut self, frame: &CryptoFrame, out: &mut [u8]) -> Result<usize, Error> {
        let bytes = frame.encode_to_vec().map_err(frame_error)?;
        self.bus.write(self.address, &bytes)?;
        self.delay.delay_ms(WRITE_SETTLE_MS);
        self.delay.delay_ms(frame.opcode.max_execution_ms());
        self.read_response(out)
    }

    /// Read the length byte, then the whole response, and check its CRC
    fn read_response(&mut self, out: &mut [u8]) -> Result<usize, Error> {
        let word = [WordAddress::Response as u8];

        let mut length = [0u8; 1];
        self.bus.transact(self.address, &word, &mut length)?;
        let length = length[0] as usize;
        if !(3..=MAX_RESPONSE_SIZE).contains(&length) {
            return Err(Error::BusError);
        }

        let mut raw = [0u8; MAX_RESPONSE_SIZE];
        self.bus.transact(self.address, &word, &mut raw[..length])?;
        let data = parse_response(&raw[..length]).map_err(|e| {
            #[cfg(feature = "defmt")]
            defmt::debug!("atecc: bad response {:02x}", &raw[..length]);
            frame_error(e)
        })?;

        let n = data.len().min(out.len());
        out[..n].copy_from_slice(&data[..n]);
        Ok(data.len())
    }
}
