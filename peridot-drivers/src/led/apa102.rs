//! APA102 / DotStar LED strip (SPI, clock and data only)
//!
//! ```text
//! ┌─────────────┬──────────────────────────────┬─────┬──────────────────┐
//! │ 00 00 00 00 │ 111BBBBB  C0  C1  C2         │ ... │ FF × (count/16)  │
//! │ start frame │ LED 0: brightness, 3 colors  │     │ end frame        │
//! └─────────────┴──────────────────────────────┴─────┴──────────────────┘
//! ```
//!
//! The strip has no chip select; it latches whatever is clocked in.

use peridot_hal::{Error, SpiBus};

const START_FRAME: [u8; 4] = [0x00; 4];
const LED_MARKER: u8 = 0xE0;

/// One LED: color plus 8-bit brightness (only the top five bits reach the strip)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Led {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub brightness: u8,
}

impl Led {
    pub const fn new(r: u8, g: u8, b: u8, brightness: u8) -> Self {
        Self { r, g, b, brightness }
    }
}

/// Byte order of the three color bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ColorOrder {
    #[default]
    Bgr,
    Brg,
    Grb,
}

impl ColorOrder {
    fn arrange(self, led: &Led) -> [u8; 3] {
        match self {
            Self::Bgr => [led.b, led.g, led.r],
            Self::Brg => [led.b, led.r, led.g],
            Self::Grb => [led.g, led.r, led.b],
        }
    }
}

pub struct Apa102<S> {
    spi: S,
    order: ColorOrder,
}

impl<S: SpiBus> Apa102<S> {
    pub fn new(spi: S) -> Self {
        Self::with_order(spi, ColorOrder::default())
    }

    pub fn with_order(spi: S, order: ColorOrder) -> Self {
        Self { spi, order }
    }

    pub fn free(self) -> S {
        self.spi
    }

    pub fn set_order(&mut self, order: ColorOrder) {
        self.order = order;
    }

    /// Send one full frame; returns the number of LEDs written
    pub fn write_colors(&mut self, leds: &[Led]) -> Result<usize, Error> {
        self.spi.write(&START_FRAME)?;
        for led in leds {
            let [c0, c1, c2] = self.order.arrange(led);
            self.spi
                .write(&[LED_MARKER | (led.brightness >> 3), c0, c1, c2])?;
        }
        self.end_frame(leds.len())?;
        Ok(leds.len())
    }

    /// Send pre-encoded 4-byte LED words between start and end frames
    pub fn write_raw(&mut self, words: &[u8]) -> Result<usize, Error> {
        if words.len() % 4 != 0 {
            return Err(Error::InvalidParam);
        }
        self.spi.write(&START_FRAME)?;
        self.spi.write(words)?;
        self.end_frame(words.len() / 4)?;
        Ok(words.len())
    }

    fn end_frame(&mut self, count: usize) -> Result<(), Error> {
        for _ in 0..count / 16 {
            self.spi.write(&[0xFF])?;
        }
        Ok(())
    }
}
