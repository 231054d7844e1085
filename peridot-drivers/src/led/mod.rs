//! Addressable LED strips

pub mod apa102;

pub use apa102::{Apa102, ColorOrder, Led};
