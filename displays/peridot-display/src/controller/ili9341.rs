//! Ilitek ILI9341 (240 x 320)

use embedded_hal::delay::DelayNs;
use peridot_hal::Error;

use super::dcs::{self, madctl};
use super::{dcs_window, run_init, Controller, InitStep, Params};
use crate::interface::DisplayInterface;

#[allow(dead_code)]
mod cmd {
    pub const FRMCTR1: u8 = 0xB1;
    pub const DFUNCTR: u8 = 0xB6;
    pub const PWCTR1: u8 = 0xC0;
    pub const PWCTR2: u8 = 0xC1;
    pub const VMCTR1: u8 = 0xC5;
    pub const VMCTR2: u8 = 0xC7;
    pub const GAMMASET: u8 = 0x26;
    pub const GMCTRP1: u8 = 0xE0;
    pub const GMCTRN1: u8 = 0xE1;
    pub const GAMMA3_DISABLE: u8 = 0xF2;
}

/// Power-up sequence up to (not including) the address mapping
const POWER: &[InitStep] = &[
    InitStep::wait(dcs::SWRESET, &[], 150),
    InitStep::new(0xEF, &[0x03, 0x80, 0x02]),
    InitStep::new(0xCF, &[0x00, 0xC1, 0x30]),
    InitStep::new(0xED, &[0x64, 0x03, 0x12, 0x81]),
    InitStep::new(0xE8, &[0x85, 0x00, 0x78]),
    InitStep::new(0xCB, &[0x39, 0x2C, 0x00, 0x34, 0x02]),
    InitStep::new(0xF7, &[0x20]),
    InitStep::new(0xEA, &[0x00, 0x00]),
    InitStep::new(cmd::PWCTR1, &[0x23]),
    InitStep::new(cmd::PWCTR2, &[0x10]),
    InitStep::new(cmd::VMCTR1, &[0x3E, 0x28]),
    InitStep::new(cmd::VMCTR2, &[0x86]),
];

const PANEL: &[InitStep] = &[
    InitStep::new(dcs::VSCRSADD, &[0x00]),
    InitStep::new(dcs::COLMOD, &[dcs::COLMOD_RGB565]),
    InitStep::new(cmd::FRMCTR1, &[0x00, 0x18]),
    InitStep::new(cmd::DFUNCTR, &[0x08, 0x82, 0x27]),
    InitStep::new(cmd::GAMMA3_DISABLE, &[0x00]),
    InitStep::new(cmd::GAMMASET, &[0x01]),
    InitStep::new(
        cmd::GMCTRP1,
        &[
            0x0F, 0x31, 0x2B, 0x0C, 0x0E, 0x08, 0x4E, 0xF1, 0x37, 0x07, 0x10, 0x03, 0x0E, 0x09,
            0x00,
        ],
    ),
    InitStep::new(
        cmd::GMCTRN1,
        &[
            0x00, 0x0E, 0x14, 0x03, 0x11, 0x07, 0x31, 0xC1, 0x48, 0x08, 0x0F, 0x0C, 0x31, 0x36,
            0x0F,
        ],
    ),
    InitStep::wait(dcs::SLPOUT, &[], 150),
    InitStep::wait(dcs::DISPON, &[], 150),
];

pub struct Ili9341 {
    madctl: u8,
    size: (u16, u16),
}

impl Default for Ili9341 {
    fn default() -> Self {
        Self::portrait()
    }
}

impl Ili9341 {
    /// 240 x 320, connector at the bottom
    pub const fn portrait() -> Self {
        Self {
            madctl: madctl::MX | madctl::BGR,
            size: (240, 320),
        }
    }

    /// 320 x 240
    pub const fn landscape() -> Self {
        Self {
            madctl: madctl::MV | madctl::BGR,
            size: (320, 240),
        }
    }
}

impl Controller for Ili9341 {
    fn size(&self) -> (u16, u16) {
        self.size
    }

    fn init<I: DisplayInterface, D: DelayNs>(
        &mut self,
        iface: &mut I,
        delay: &mut D,
    ) -> Result<(), Error> {
        run_init(iface, delay, POWER, Params::AsData)?;
        iface.command_with_data(dcs::MADCTL, &[self.madctl])?;
        run_init(iface, delay, PANEL, Params::AsData)
    }

    fn set_window<I: DisplayInterface>(
        &mut self,
        iface: &mut I,
        x0: u16,
        y0: u16,
        x1: u16,
        y1: u16,
    ) -> Result<(), Error> {
        dcs_window(iface, x0, y0, x1, y1)
    }
}

#[cfg(test)]
mod tests {
    use super::super::mock::*;
    use super::*;

    #[test]
    fn test_orientation_presets() {
        assert_eq!(Ili9341::portrait().size(), (240, 320));
        assert_eq!(Ili9341::landscape().size(), (320, 240));
    }

    #[test]
    fn test_init_ends_with_display_on() {
        let mut rec = Recorder::default();
        Ili9341::default().init(&mut rec, &mut NoDelay).unwrap();
        assert!(rec.log.contains(&Ev::Data(vec![0x48])));
        assert!(rec.log.contains(&Ev::Data(vec![dcs::COLMOD_RGB565])));
        assert_eq!(rec.log.last(), Some(&Ev::Cmd(vec![dcs::DISPON])));
    }
}
