//! 1-Wire bus abstraction
//!
//! Bit-level link operations. The byte helpers are LSB-first, eight slots
//! per byte. ROM-level commands live with the link implementation in
//! `peridot-bus`.

use crate::error::Error;

/// 1-Wire bus master
pub trait OneWireBus {
    /// Reset pulse and presence detect
    ///
    /// Returns `NoPresence` when no device pulled the line low.
    fn reset(&mut self) -> Result<(), Error>;

    /// Emit one write slot
    fn write_bit(&mut self, bit: bool);

    /// Emit one read slot and return the sampled bit
    fn read_bit(&mut self) -> bool;

    /// Write one byte, LSB first
    fn write(&mut self, byte: u8) {
        for i in 0..8 {
            self.write_bit((byte >> i) & 1 != 0);
        }
    }

    /// Read one byte, LSB first
    fn read(&mut self) -> u8 {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.read_bit() {
                byte |= 1 << i;
            }
        }
        byte
    }

    /// Write several bytes
    fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write(b);
        }
    }

    /// Fill `buf` with read bytes
    fn read_bytes(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = self.read();
        }
    }
}

impl<T: OneWireBus + ?Sized> OneWireBus for &mut T {
    fn reset(&mut self) -> Result<(), Error> {
        (**self).reset()
    }

    fn write_bit(&mut self, bit: bool) {
        (**self).write_bit(bit)
    }

    fn read_bit(&mut self) -> bool {
        (**self).read_bit()
    }
}
