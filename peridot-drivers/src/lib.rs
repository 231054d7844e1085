//! Device drivers
//!
//! Each driver borrows or owns a bus from `peridot-hal` and knows nothing
//! about the concrete peripheral behind it:
//!
//! - Sensors (DS18B20 over 1-Wire, AHT20, ADT7410 and BMA42x over I2C, MH-Z19
//!   over UART)
//! - LED strips (APA102 over SPI)
//! - Crypto (ATECC508A/608A over I2C)
//! - Touch (four-wire resistive panel and its debouncer)

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod crypto;
pub mod led;
pub mod sensor;
pub mod touch;
