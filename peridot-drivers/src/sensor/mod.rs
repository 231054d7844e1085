//! Sensor drivers

pub mod adt7410;
pub mod aht20;
pub mod bma42x;
pub mod ds18b20;
pub mod mhz19;

pub use adt7410::{Adt7410, Adt7410Config};
pub use aht20::Aht20;
pub use bma42x::{Bma42x, Bma42xConfig, ConfigFiles};
pub use ds18b20::{Ds18b20, Resolution, Scratchpad};
pub use mhz19::{Co2Reading, Mhz19};
