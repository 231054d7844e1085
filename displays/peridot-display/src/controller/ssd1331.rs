//! Solomon SSD1331 96 x 64 color OLED
//!
//! This part takes command parameters with D/C low; only pixel data goes
//! with D/C high, and there is no separate "write RAM" command.

use embedded_hal::delay::DelayNs;
use peridot_hal::Error;

use super::{run_init, Controller, InitStep, Params};
use crate::interface::DisplayInterface;

#[allow(dead_code)]
mod cmd {
    pub const SET_COLUMN: u8 = 0x15;
    pub const SET_ROW: u8 = 0x75;
    pub const CONTRAST_A: u8 = 0x81;
    pub const CONTRAST_B: u8 = 0x82;
    pub const CONTRAST_C: u8 = 0x83;
    pub const MASTER_CURRENT: u8 = 0x87;
    pub const PRECHARGE_A: u8 = 0x8A;
    pub const PRECHARGE_B: u8 = 0x8B;
    pub const PRECHARGE_C: u8 = 0x8C;
    pub const SET_REMAP: u8 = 0xA0;
    pub const START_LINE: u8 = 0xA1;
    pub const DISPLAY_OFFSET: u8 = 0xA2;
    pub const NORMAL_DISPLAY: u8 = 0xA4;
    pub const SET_MULTIPLEX: u8 = 0xA8;
    pub const SET_MASTER: u8 = 0xAD;
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const POWER_MODE: u8 = 0xB0;
    pub const PRECHARGE: u8 = 0xB1;
    pub const CLOCK_DIV: u8 = 0xB3;
    pub const PRECHARGE_LEVEL: u8 = 0xBB;
    pub const VCOMH: u8 = 0xBE;
}

pub const WIDTH: u16 = 96;
pub const HEIGHT: u16 = 64;

const INIT: &[InitStep] = &[
    InitStep::new(cmd::DISPLAY_OFF, &[]),
    // 65k color, RGB order, COM split
    InitStep::new(cmd::SET_REMAP, &[0x72]),
    InitStep::new(cmd::START_LINE, &[0x00]),
    InitStep::new(cmd::DISPLAY_OFFSET, &[0x00]),
    InitStep::new(cmd::NORMAL_DISPLAY, &[]),
    InitStep::new(cmd::SET_MULTIPLEX, &[0x3F]),
    InitStep::new(cmd::SET_MASTER, &[0x8E]),
    InitStep::new(cmd::POWER_MODE, &[0x0B]),
    InitStep::new(cmd::PRECHARGE, &[0x31]),
    InitStep::new(cmd::CLOCK_DIV, &[0xF0]),
    InitStep::new(cmd::PRECHARGE_A, &[0x64]),
    InitStep::new(cmd::PRECHARGE_B, &[0x78]),
    InitStep::new(cmd::PRECHARGE_C, &[0x64]),
    InitStep::new(cmd::PRECHARGE_LEVEL, &[0x3A]),
    InitStep::new(cmd::VCOMH, &[0x3E]),
    InitStep::new(cmd::MASTER_CURRENT, &[0x06]),
    InitStep::new(cmd::CONTRAST_A, &[0x91]),
    InitStep::new(cmd::CONTRAST_B, &[0x50]),
    InitStep::new(cmd::CONTRAST_C, &[0x7D]),
    InitStep::wait(cmd::DISPLAY_ON, &[], 100),
];

#[derive(Debug, Default)]
pub struct Ssd1331;

impl Ssd1331 {
    /// Per-channel contrast (A = red, B = green, C = blue)
    pub fn set_contrast<I: DisplayInterface>(
        &mut self,
        iface: &mut I,
        [a, b, c]: [u8; 3],
    ) -> Result<(), Error> {
        iface.command(&[cmd::CONTRAST_A, a])?;
        iface.command(&[cmd::CONTRAST_B, b])?;
        iface.command(&[cmd::CONTRAST_C, c])
    }
}

impl Controller for Ssd1331 {
    fn size(&self) -> (u16, u16) {
        (WIDTH, HEIGHT)
    }

    fn init<I: DisplayInterface, D: DelayNs>(
        &mut self,
        iface: &mut I,
        delay: &mut D,
    ) -> Result<(), Error> {
        run_init(iface, delay, INIT, Params::AsCommand)
    }

    fn set_window<I: DisplayInterface>(
        &mut self,
        iface: &mut I,
        x0: u16,
        y0: u16,
        x1: u16,
        y1: u16,
    ) -> Result<(), Error> {
        if x1 >= WIDTH || y1 >= HEIGHT {
            return Err(Error::OutOfBounds);
        }
        iface.command(&[cmd::SET_COLUMN, x0 as u8, x1 as u8])?;
        iface.command(&[cmd::SET_ROW, y0 as u8, y1 as u8])
    }
}
