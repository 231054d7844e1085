//! Command/data link to a display controller
//!
//! Controllers on a 4-wire SPI link tell commands from parameters and pixel
//! data by the D/C line: low for a command byte, high for data.

use embedded_hal::delay::DelayNs;
use peridot_hal::{Error, OutputPin, SpiBus};

/// Byte link to a display controller
pub trait DisplayInterface {
    /// Send bytes with D/C low
    fn command(&mut self, bytes: &[u8]) -> Result<(), Error>;

    /// Send bytes with D/C high
    fn data(&mut self, bytes: &[u8]) -> Result<(), Error>;

    /// A command byte followed by its parameters as data
    fn command_with_data(&mut self, cmd: u8, params: &[u8]) -> Result<(), Error> {
        self.command(&[cmd])?;
        if params.is_empty() {
            return Ok(());
        }
        self.data(params)
    }
}

/// 4-wire SPI link with its own chip-select and D/C pins
///
/// CS is asserted around every transfer and released even when the
/// transfer fails, so other devices on the bus stay usable.
pub struct SpiInterface<S, CS, DC> {
    spi: S,
    cs: CS,
    dc: DC,
}

impl<S: SpiBus, CS: OutputPin, DC: OutputPin> SpiInterface<S, CS, DC> {
    pub fn new(spi: S, mut cs: CS, dc: DC) -> Self {
        cs.set_high();
        Self { spi, cs, dc }
    }

    pub fn release(self) -> (S, CS, DC) {
        (self.spi, self.cs, self.dc)
    }

    fn send(&mut self, is_data: bool, bytes: &[u8]) -> Result<(), Error> {
        self.dc.set_state(is_data);
        self.cs.set_low();
        let result = self.spi.write(bytes);
        self.cs.set_high();
        result
    }
}

impl<S: SpiBus, CS: OutputPin, DC: OutputPin> DisplayInterface for SpiInterface<S, CS, DC> {
    fn command(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.send(false, bytes)
    }

    fn data(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.send(true, bytes)
    }
}

/// Pulse a controller's active-low reset line
pub fn hard_reset<P: OutputPin, D: DelayNs>(rst: &mut P, delay: &mut D) {
    rst.set_high();
    delay.delay_ms(5);
    rst.set_low();
    delay.delay_ms(20);
    rst.set_high();
    delay.delay_ms(150);
}
