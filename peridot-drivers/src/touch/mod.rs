//! Resistive touch input

pub mod debounce;
pub mod fourwire;

pub use debounce::{Debouncer, TouchEvent};
pub use fourwire::{AxisCalibration, FourWire, FourWireConfig, TouchSample};
