//! Four-wire resistive touch panel
//!
//! Two resistive layers face each other. Driving a voltage gradient across
//! one layer and sampling the other gives the position along that axis;
//! driving across both layers and sampling the far ends gives the contact
//! resistance, i.e. pressure.
//!
//! ```text
//!            X+                          Y+
//!   ┌────────┴────────┐         ┌────────┴────────┐
//!   │  X layer        │         │  Y layer        │
//!   │  (gradient ─▶)  │  touch  │  (gradient ▼)   │
//!   └────────┬────────┘ ◀─────▶ └────────┬────────┘
//!            X-                          Y-
//! ```
//!
//! | Read | Driven high | Driven low | Sampled  | Floating |
//! |------|-------------|------------|----------|----------|
//! | X    | X+          | X-         | Y+       | Y-       |
//! | Y    | Y+          | Y-         | X+       | X-       |
//! | Z    | Y+          | X-         | X+, Y-   |          |

use peridot_hal::{AdcPin, Error, PinMode};

/// Raw touch reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchSample {
    pub x: u16,
    pub y: u16,
    /// Pressure, higher is harder
    pub z: u16,
    pub pressed: bool,
}

/// Raw ADC span of one axis; `min > max` flips the axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisCalibration {
    pub raw_min: u16,
    pub raw_max: u16,
}

impl AxisCalibration {
    pub const fn new(raw_min: u16, raw_max: u16) -> Self {
        Self { raw_min, raw_max }
    }

    /// Map a raw reading onto `0..size`, clamping outside the span
    pub fn map(&self, raw: u16, size: u16) -> u16 {
        let (min, max) = (self.raw_min as i32, self.raw_max as i32);
        let last = size.saturating_sub(1) as i32;
        if min == max {
            return 0;
        }
        let scaled = (raw as i32 - min) * last / (max - min);
        scaled.clamp(0, last) as u16
    }
}

/// Panel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourWireConfig {
    /// ADC reads averaged per axis (at least 1)
    pub samples: u8,
    /// Full-scale ADC reading
    pub adc_max: u16,
    /// Pressure at or above which the panel counts as pressed
    pub pressure_threshold: u16,
    /// Logical width in pixels
    pub width: u16,
    /// Logical height in pixels
    pub height: u16,
    pub x: AxisCalibration,
    pub y: AxisCalibration,
}

impl Default for FourWireConfig {
    fn default() -> Self {
        Self {
            samples: 2,
            adc_max: 1023,
            pressure_threshold: 100,
            width: 240,
            height: 320,
            x: AxisCalibration::new(0, 1023),
            y: AxisCalibration::new(0, 1023),
        }
    }
}

impl FourWireConfig {
    fn validate(&self) -> Result<(), Error> {
        let flat = |c: &AxisCalibration| c.raw_min == c.raw_max;
        if self.samples == 0
            || self.width == 0
            || self.height == 0
            || self.adc_max == 0
            || flat(&self.x)
            || flat(&self.y)
        {
            return Err(Error::InvalidParam);
        }
        Ok(())
    }
}

/// Resistive panel on four ADC-capable pins
pub struct FourWire<XP, XM, YP, YM> {
    xp: XP,
    xm: XM,
    yp: YP,
    ym: YM,
    config: FourWireConfig,
}

impl<XP, XM, YP, YM> FourWire<XP, XM, YP, YM>
where
    XP: AdcPin,
    XM: AdcPin,
    YP: AdcPin,
    YM: AdcPin,
{
    pub fn new(xp: XP, xm: XM, yp: YP, ym: YM, config: FourWireConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            xp,
            xm,
            yp,
            ym,
            config,
        })
    }

    pub fn config(&self) -> &FourWireConfig {
        &self.config
    }

    pub fn free(self) -> (XP, XM, YP, YM) {
        (self.xp, self.xm, self.yp, self.ym)
    }

    /// Raw position along X (gradient on the X layer, sampled through Y+)
    pub fn read_x(&mut self) -> Result<u16, Error> {
        self.ym.set_mode(PinMode::Input);
        drive(&mut self.xp, true);
        drive(&mut self.xm, false);
        self.yp.set_mode(PinMode::Input);
        average(&mut self.yp, self.config.samples)
    }

    /// Raw position along Y (gradient on the Y layer, sampled through X+)
    pub fn read_y(&mut self) -> Result<u16, Error> {
        self.xm.set_mode(PinMode::Input);
        drive(&mut self.yp, true);
        drive(&mut self.ym, false);
        self.xp.set_mode(PinMode::Input);
        average(&mut self.xp, self.config.samples)
    }

    /// Pressure: `adc_max - (Z_high - Z_low)`, 0 when untouched
    pub fn read_z(&mut self) -> Result<u16, Error> {
        drive(&mut self.xm, false);
        drive(&mut self.yp, true);
        self.xp.set_mode(PinMode::Input);
        self.ym.set_mode(PinMode::Input);
        let z_low = average(&mut self.xp, self.config.samples)?;
        let z_high = average(&mut self.ym, self.config.samples)?;
        Ok(self
            .config
            .adc_max
            .saturating_sub(z_high.saturating_sub(z_low)))
    }

    /// Raw sample with the pressed flag applied
    pub fn read_sample(&mut self) -> Result<TouchSample, Error> {
        let z = self.read_z()?;
        let pressed = z >= self.config.pressure_threshold;
        let (x, y) = if pressed {
            (self.read_x()?, self.read_y()?)
        } else {
            (0, 0)
        };
        Ok(TouchSample { x, y, z, pressed })
    }

    /// Sample mapped to logical pixel coordinates
    pub fn read_point(&mut self) -> Result<TouchSample, Error> {
        let raw = self.read_sample()?;
        if !raw.pressed {
            return Ok(raw);
        }
        Ok(TouchSample {
            x: self.config.x.map(raw.x, self.config.width),
            y: self.config.y.map(raw.y, self.config.height),
            ..raw
        })
    }
}

#[inline]
fn drive<P: AdcPin>(pin: &mut P, high: bool) {
    pin.set_state(high);
    pin.set_mode(PinMode::Output);
}

fn average<P: AdcPin>(pin: &mut P, samples: u8) -> Result<u16, Error> {
    let mut sum = 0u32;
    for _ in 0..samples {
        sum += pin.read_adc()? as u32;
    }
    Ok((sum / samples as u32) as u16)
}
