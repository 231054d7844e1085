//! Analog input abstraction

use crate::error::Error;
use crate::gpio::FlexPin;

/// A GPIO that can also be sampled by the ADC
///
/// Resistive touch panels switch each of their four lines between driven
/// output, floating input and ADC input during one scan.
pub trait AdcPin: FlexPin {
    /// Sample the pin; the result is right-aligned at the ADC resolution
    fn read_adc(&mut self) -> Result<u16, Error>;
}
