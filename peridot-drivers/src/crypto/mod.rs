//! Crypto co-processors

pub mod ateccx08;

pub use ateccx08::{Atecc, Variant};
