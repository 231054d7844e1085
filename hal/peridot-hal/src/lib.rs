//! Peridot Hardware Abstraction Layer
//!
//! This crate defines the pin and bus traits every Peridot driver is written
//! against, plus the error taxonomy they all share. Chip HALs implement the
//! traits (or plug in through the `embedded-hal` adapters), and the same
//! drivers then run on any of them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Composed subsystems (touch, HUB75)     │  layer 4
//! ├─────────────────────────────────────────┤
//! │  Device drivers (peridot-drivers, ...)  │  layer 3
//! ├─────────────────────────────────────────┤
//! │  Software buses (peridot-bus)           │  layer 2
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  peridot-hal (this crate - traits)      │  layer 1
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  chip HAL via │       │  chip HAL via │  layer 0
//! │  FlexPin etc. │       │  embedded-hal │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`], [`gpio::InputPin`], [`gpio::FlexPin`] - Digital I/O
//! - [`gpio::OpenDrainPin`] - Open-drain line for bit-banged buses
//! - [`adc::AdcPin`] - Analog sampling on a GPIO
//! - [`i2c::I2cBus`] - I2C transactions
//! - [`spi::SpiBus`] - Full-duplex SPI
//! - [`uart::UartBus`] - Buffered serial stream
//! - [`onewire::OneWireBus`] - 1-Wire bit slots
//! - [`shared::BusMutex`] - Lock for buses with several users

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod adc;
pub mod bytes;
pub mod delay;
pub mod error;
pub mod gpio;
pub mod i2c;
pub mod onewire;
pub mod shared;
pub mod spi;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use adc::AdcPin;
pub use delay::{Cpu, SpinDelay};
pub use error::Error;
pub use gpio::{FlexPin, InputPin, OpenDrain, OpenDrainPin, OutputPin, PinMode};
pub use i2c::{EhI2c, I2cBus, I2cConfig};
pub use onewire::OneWireBus;
pub use shared::{BusMutex, SharedI2c, SharedSpi};
pub use spi::{EhSpi, Mode, Phase, Polarity, SpiBus, SpiConfig};
pub use uart::{BufferedUart, UartBus};
