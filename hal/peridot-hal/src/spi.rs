//! SPI bus abstractions
//!
//! Chip-select is not part of the bus. Drivers own their CS pin and assert
//! it around each transfer.

use crate::error::Error;

/// Largest chunk [`SpiBus::write`] shifts at a time through its discard buffer
const WRITE_CHUNK: usize = 32;

/// Full-duplex SPI master
pub trait SpiBus {
    /// Shift `tx` out while shifting into `rx`
    ///
    /// Both slices must have the same length, else `InvalidParam`.
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Error>;

    /// Shift one byte, returning the byte clocked in
    #[inline]
    fn transfer_byte(&mut self, byte: u8) -> Result<u8, Error> {
        let mut rx = [0u8; 1];
        self.transfer(&[byte], &mut rx)?;
        Ok(rx[0])
    }

    /// Write data, discarding what is shifted in
    fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        let mut discard = [0u8; WRITE_CHUNK];
        for chunk in data.chunks(WRITE_CHUNK) {
            self.transfer(chunk, &mut discard[..chunk.len()])?;
        }
        Ok(())
    }
}

impl<T: SpiBus + ?Sized> SpiBus for &mut T {
    #[inline]
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Error> {
        (**self).transfer(tx, rx)
    }

    #[inline]
    fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        (**self).write(data)
    }
}

/// SPI configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
    /// Clock polarity
    pub polarity: Polarity,
    /// Clock phase
    pub phase: Phase,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            frequency: 100_000, // 100 kHz
            polarity: Polarity::IdleLow,
            phase: Phase::CaptureOnFirstTransition,
        }
    }
}

impl SpiConfig {
    /// Configuration for a given mode and frequency
    pub fn new(mode: Mode, frequency: u32) -> Self {
        let (polarity, phase) = mode.into();
        Self {
            frequency,
            polarity,
            phase,
        }
    }
}

/// SPI clock polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Clock idles low (CPOL=0)
    IdleLow,
    /// Clock idles high (CPOL=1)
    IdleHigh,
}

/// SPI clock phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Data captured on first clock transition (CPHA=0)
    CaptureOnFirstTransition,
    /// Data captured on second clock transition (CPHA=1)
    CaptureOnSecondTransition,
}

/// SPI mode (combined polarity and phase)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Mode 0: CPOL=0, CPHA=0
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl From<Mode> for (Polarity, Phase) {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Mode0 => (Polarity::IdleLow, Phase::CaptureOnFirstTransition),
            Mode::Mode1 => (Polarity::IdleLow, Phase::CaptureOnSecondTransition),
            Mode::Mode2 => (Polarity::IdleHigh, Phase::CaptureOnFirstTransition),
            Mode::Mode3 => (Polarity::IdleHigh, Phase::CaptureOnSecondTransition),
        }
    }
}

/// `SpiBus` over an `embedded-hal` 1.0 SPI bus
pub struct EhSpi<T> {
    inner: T,
}

impl<T: embedded_hal::spi::SpiBus> EhSpi<T> {
    /// Wrap a bus
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Return the wrapped bus
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: embedded_hal::spi::SpiBus> SpiBus for EhSpi<T> {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Error> {
        if tx.len() != rx.len() {
            return Err(Error::InvalidParam);
        }
        self.inner
            .transfer(rx, tx)
            .and_then(|_| self.inner.flush())
            .map_err(|_| Error::BusError)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        self.inner
            .write(data)
            .and_then(|_| self.inner.flush())
            .map_err(|_| Error::BusError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    /// Loopback: returns each byte inverted, records everything written
    struct Loopback {
        sent: Vec<u8>,
        transfers: usize,
    }

    impl SpiBus for Loopback {
        fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Error> {
            if tx.len() != rx.len() {
                return Err(Error::InvalidParam);
            }
            self.transfers += 1;
            for (t, r) in tx.iter().zip(rx.iter_mut()) {
                self.sent.push(*t);
                *r = !*t;
            }
            Ok(())
        }
    }

    #[test]
    fn test_transfer_byte() {
        let mut bus = Loopback {
            sent: Vec::new(),
            transfers: 0,
        };
        assert_eq!(bus.transfer_byte(0x0F).unwrap(), 0xF0);
        assert_eq!(bus.sent, [0x0F]);
    }

    #[test]
    fn test_write_chunks_long_payload() {
        let mut bus = Loopback {
            sent: Vec::new(),
            transfers: 0,
        };
        let data: Vec<u8> = (0..100u8).collect();
        bus.write(&data).unwrap();
        assert_eq!(bus.sent, data);
        assert_eq!(bus.transfers, 4);
    }

    #[test]
    fn test_mode_conversion() {
        let cfg = SpiConfig::new(Mode::Mode3, 8_000_000);
        assert_eq!(cfg.polarity, Polarity::IdleHigh);
        assert_eq!(cfg.phase, Phase::CaptureOnSecondTransition);
        assert_eq!(SpiConfig::default().frequency, 100_000);
    }
}
