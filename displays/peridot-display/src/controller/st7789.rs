//! Sitronix ST7789 (240 x 320 RAM, many panels use a window of it)

use embedded_hal::delay::DelayNs;
use peridot_hal::Error;

use super::dcs::{self, madctl};
use super::{dcs_window, run_init, Controller, InitStep, Params};
use crate::interface::DisplayInterface;

const RAM_COLUMNS: u16 = 240;
const RAM_ROWS: u16 = 320;

const WAKE: &[InitStep] = &[
    InitStep::wait(dcs::SWRESET, &[], 150),
    InitStep::wait(dcs::SLPOUT, &[], 500),
    InitStep::wait(dcs::COLMOD, &[dcs::COLMOD_RGB565], 10),
];

const DISPLAY_ON: &[InitStep] = &[
    InitStep::wait(dcs::NORON, &[], 10),
    InitStep::wait(dcs::DISPON, &[], 500),
];

/// ST7789 panel geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct St7789Config {
    pub width: u16,
    pub height: u16,
    /// First RAM column the glass is wired to
    pub column_offset: u16,
    /// First RAM row the glass is wired to
    pub row_offset: u16,
    /// Fixed address mapping; set `MV` for landscape panels
    pub madctl: u8,
    /// Most ST7789 glass needs inversion on for correct colors
    pub invert_colors: bool,
}

impl Default for St7789Config {
    fn default() -> Self {
        Self {
            width: 240,
            height: 240,
            column_offset: 0,
            row_offset: 0,
            madctl: 0,
            invert_colors: true,
        }
    }
}

impl St7789Config {
    /// 1.3" 240 x 240 modules, which sit 80 rows into RAM
    pub const SQUARE_240: Self = Self {
        width: 240,
        height: 240,
        column_offset: 0,
        row_offset: 80,
        madctl: madctl::MX | madctl::MY,
        invert_colors: true,
    };

    /// 2" 320 x 240 landscape modules
    pub const LANDSCAPE_320: Self = Self {
        width: 320,
        height: 240,
        column_offset: 0,
        row_offset: 0,
        madctl: madctl::MV | madctl::MX,
        invert_colors: true,
    };

    fn validate(&self) -> Result<(), Error> {
        let (cols, rows) = if self.madctl & madctl::MV != 0 {
            (RAM_ROWS, RAM_COLUMNS)
        } else {
            (RAM_COLUMNS, RAM_ROWS)
        };
        let w = self.width as u32 + self.column_offset as u32;
        let h = self.height as u32 + self.row_offset as u32;
        if self.width == 0 || self.height == 0 || w > cols as u32 || h > rows as u32 {
            return Err(Error::InvalidParam);
        }
        Ok(())
    }
}

pub struct St7789 {
    config: St7789Config,
}

impl St7789 {
    pub fn new(config: St7789Config) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &St7789Config {
        &self.config
    }
}

impl Controller for St7789 {
    fn size(&self) -> (u16, u16) {
        (self.config.width, self.config.height)
    }

    fn init<I: DisplayInterface, D: DelayNs>(
        &mut self,
        iface: &mut I,
        delay: &mut D,
    ) -> Result<(), Error> {
        run_init(iface, delay, WAKE, Params::AsData)?;
        iface.command_with_data(dcs::MADCTL, &[self.config.madctl])?;
        let inversion = if self.config.invert_colors {
            dcs::INVON
        } else {
            dcs::INVOFF
        };
        iface.command(&[inversion])?;
        run_init(iface, delay, DISPLAY_ON, Params::AsData)
    }

    fn set_window<I: DisplayInterface>(
        &mut self,
        iface: &mut I,
        x0: u16,
        y0: u16,
        x1: u16,
        y1: u16,
    ) -> Result<(), Error> {
        let (cx, cy) = (self.config.column_offset, self.config.row_offset);
        dcs_window(iface, x0 + cx, y0 + cy, x1 + cx, y1 + cy)
    }
}

#[cfg(test)]
mod tests {
    use super::super::mock::*;
    use super::*;

    #[test]
    fn test_geometry_validation() {
        assert!(St7789::new(St7789Config::default()).is_ok());
        assert!(St7789::new(St7789Config::SQUARE_240).is_ok());
        assert!(St7789::new(St7789Config::LANDSCAPE_320).is_ok());

        let portrait_too_wide = St7789Config {
            width: 320,
            height: 240,
            madctl: 0,
            ..Default::default()
        };
        assert!(matches!(St7789::new(portrait_too_wide), Err(Error::InvalidParam)));

        let offset_overflow = St7789Config {
            row_offset: 81,
            ..St7789Config::SQUARE_240
        };
        assert!(matches!(St7789::new(offset_overflow), Err(Error::InvalidParam)));
    }

    #[test]
    fn test_init_sets_mapping_once() {
        let mut dev = St7789::new(St7789Config::LANDSCAPE_320).unwrap();
        let mut rec = Recorder::default();
        dev.init(&mut rec, &mut NoDelay).unwrap();
        assert_eq!(rec.log.first(), Some(&Ev::Cmd(vec![dcs::SWRESET])));
        let madctl_pos = rec
            .log
            .iter()
            .position(|e| *e == Ev::Cmd(vec![dcs::MADCTL]))
            .unwrap();
        assert_eq!(rec.log[madctl_pos + 1], Ev::Data(vec![0x60]));
        assert_eq!(rec.log.last(), Some(&Ev::Cmd(vec![dcs::DISPON])));
    }

    #[test]
    fn test_window_applies_offsets() {
        let mut dev = St7789::new(St7789Config::SQUARE_240).unwrap();
        let mut rec = Recorder::default();
        dev.set_window(&mut rec, 0, 0, 239, 239).unwrap();
        assert_eq!(rec.log[1], Ev::Data(vec![0, 0, 0, 239]));
        assert_eq!(rec.log[3], Ev::Data(vec![0, 80, 1, 0x3F]));
    }
}
