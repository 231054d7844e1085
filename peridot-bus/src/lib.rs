//! Software bus drivers
//!
//! Bit-banged implementations of the `peridot-hal` bus traits for boards
//! that lack (or have run out of) hardware peripherals on the needed pins:
//!
//! - [`soft_i2c::SoftI2c`] - I2C master over two open-drain lines, with
//!   clock stretching and calibrated half-cycle delays
//! - [`soft_spi::SoftSpi`] - SPI master (modes 0-3) over three GPIOs
//! - [`onewire::OneWire`] - 1-Wire master with ROM search and Dallas CRC-8
//!
//! All of them leave their lines idle (released, or SCK low for SPI) on
//! every return, including error returns.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod onewire;
pub mod soft_i2c;
pub mod soft_spi;

pub use onewire::{crc8, OneWire, OneWireExt, Rom, RomCommand};
pub use soft_i2c::SoftI2c;
pub use soft_spi::SoftSpi;
