//! I2C bus abstractions
//!
//! Provides the I2C master trait consumed by every I2C device driver, and an
//! adapter that lifts any `embedded-hal` 1.0 I2C peripheral into it.

use heapless::Vec;

use crate::error::{from_i2c_kind, Error};

/// Longest payload accepted by [`I2cBus::write_register`]
pub const MAX_REGISTER_WRITE: usize = 32;

/// I2C bus master
///
/// A controller is stateless between calls. Every `transact` is a complete
/// START..STOP exchange; drivers assume exclusive use of the bus for the
/// duration of one call.
pub trait I2cBus {
    /// Write `write` then read into `read` in one transaction
    ///
    /// If `write` is non-empty: START, address+W, each byte with ACK check.
    /// If `read` is non-empty: (repeated) START, address+R, read with ACK on
    /// all bytes but the last. STOP is always issued before returning.
    /// With both empty the call is an address probe: START, address+W, STOP.
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `write` - Bytes to write (may be empty)
    /// * `read` - Buffer to read into (may be empty)
    fn transact(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<(), Error>;

    /// Write data to a device
    #[inline]
    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Error> {
        self.transact(address, data, &mut [])
    }

    /// Read data from a device
    #[inline]
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Error> {
        self.transact(address, &[], buf)
    }

    /// Write `reg` followed by `data` in a single write phase
    ///
    /// Payloads longer than [`MAX_REGISTER_WRITE`] return `InvalidParam`.
    fn write_register(&mut self, address: u8, reg: u8, data: &[u8]) -> Result<(), Error> {
        let mut frame: Vec<u8, { MAX_REGISTER_WRITE + 1 }> = Vec::new();
        frame.push(reg).map_err(|_| Error::InvalidParam)?;
        frame
            .extend_from_slice(data)
            .map_err(|_| Error::InvalidParam)?;
        self.transact(address, &frame, &mut [])
    }

    /// Write `reg`, then read `buf.len()` bytes after a repeated START
    #[inline]
    fn read_register(&mut self, address: u8, reg: u8, buf: &mut [u8]) -> Result<(), Error> {
        self.transact(address, &[reg], buf)
    }
}

impl<T: I2cBus + ?Sized> I2cBus for &mut T {
    #[inline]
    fn transact(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<(), Error> {
        (**self).transact(address, write, read)
    }
}

/// I2C configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl I2cConfig {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self { frequency: 100_000 };

    /// Fast mode (400 kHz)
    pub const FAST: Self = Self { frequency: 400_000 };
}

/// `I2cBus` over an `embedded-hal` 1.0 I2C peripheral
///
/// Hardware peripherals from any chip HAL plug in here; their errors are
/// mapped onto the shared taxonomy.
pub struct EhI2c<T> {
    inner: T,
}

impl<T: embedded_hal::i2c::I2c> EhI2c<T> {
    /// Wrap a peripheral
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Return the wrapped peripheral
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: embedded_hal::i2c::I2c> I2cBus for EhI2c<T> {
    fn transact(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<(), Error> {
        use embedded_hal::i2c::Error as _;

        let result = match (write.is_empty(), read.is_empty()) {
            (true, true) => self.inner.write(address, &[]),
            (false, true) => self.inner.write(address, write),
            (true, false) => self.inner.read(address, read),
            (false, false) => self.inner.write_read(address, write, read),
        };
        result.map_err(|e| from_i2c_kind(e.kind()))
    }
}
