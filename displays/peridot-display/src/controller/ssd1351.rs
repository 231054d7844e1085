//! Solomon SSD1351 128 x 128 color OLED

use embedded_hal::delay::DelayNs;
use peridot_hal::Error;

use super::{run_init, Controller, InitStep, Params};
use crate::interface::DisplayInterface;

#[allow(dead_code)]
mod cmd {
    pub const SET_COLUMN_ADDRESS: u8 = 0x15;
    pub const SET_ROW_ADDRESS: u8 = 0x75;
    pub const WRITE_RAM: u8 = 0x5C;
    pub const SET_REMAP_COLORDEPTH: u8 = 0xA0;
    pub const SET_DISPLAY_START_LINE: u8 = 0xA1;
    pub const SET_DISPLAY_OFFSET: u8 = 0xA2;
    pub const SET_DISPLAY_MODE_RESET: u8 = 0xA6;
    pub const FUNCTION_SELECTION: u8 = 0xAB;
    pub const SLEEP_MODE_DISPLAY_OFF: u8 = 0xAE;
    pub const SLEEP_MODE_DISPLAY_ON: u8 = 0xAF;
    pub const SET_PHASE_PERIOD: u8 = 0xB1;
    pub const SET_FRONT_CLOCK_DIV: u8 = 0xB3;
    pub const SET_SEGMENT_LOW_VOLTAGE: u8 = 0xB4;
    pub const SET_GPIO: u8 = 0xB5;
    pub const SET_SECOND_PRECHARGE_PERIOD: u8 = 0xB6;
    pub const SET_PRECHARGE_VOLTAGE: u8 = 0xBB;
    pub const SET_VCOMH_VOLTAGE: u8 = 0xBE;
    pub const SET_CONTRAST: u8 = 0xC1;
    pub const MASTER_CONTRAST: u8 = 0xC7;
    pub const SET_MUX_RATIO: u8 = 0xCA;
    pub const SET_COMMAND_LOCK: u8 = 0xFD;
}

pub const SIZE: u16 = 128;

const INIT: &[InitStep] = &[
    InitStep::new(cmd::SET_COMMAND_LOCK, &[0x12]),
    InitStep::new(cmd::SET_COMMAND_LOCK, &[0xB1]),
    InitStep::new(cmd::SLEEP_MODE_DISPLAY_OFF, &[]),
    InitStep::new(cmd::SET_FRONT_CLOCK_DIV, &[0xF1]),
    InitStep::new(cmd::SET_MUX_RATIO, &[0x7F]),
    InitStep::new(cmd::SET_REMAP_COLORDEPTH, &[0x72]),
    InitStep::new(cmd::SET_COLUMN_ADDRESS, &[0x00, 0x7F]),
    InitStep::new(cmd::SET_ROW_ADDRESS, &[0x00, 0x7F]),
    InitStep::new(cmd::SET_DISPLAY_START_LINE, &[0x00]),
    InitStep::new(cmd::SET_DISPLAY_OFFSET, &[0x00]),
    InitStep::new(cmd::SET_GPIO, &[0x00]),
    InitStep::new(cmd::FUNCTION_SELECTION, &[0x01]),
    InitStep::new(cmd::SET_PHASE_PERIOD, &[0x32]),
    InitStep::new(cmd::SET_SEGMENT_LOW_VOLTAGE, &[0xA0, 0xB5, 0x55]),
    InitStep::new(cmd::SET_PRECHARGE_VOLTAGE, &[0x17]),
    InitStep::new(cmd::SET_VCOMH_VOLTAGE, &[0x05]),
    InitStep::new(cmd::SET_CONTRAST, &[0xC8, 0x80, 0xC8]),
    InitStep::new(cmd::MASTER_CONTRAST, &[0x0F]),
    InitStep::new(cmd::SET_SECOND_PRECHARGE_PERIOD, &[0x01]),
    InitStep::new(cmd::SET_DISPLAY_MODE_RESET, &[]),
    InitStep::wait(cmd::SLEEP_MODE_DISPLAY_ON, &[], 100),
];

#[derive(Debug, Default)]
pub struct Ssd1351;

impl Ssd1351 {
    pub fn set_contrast<I: DisplayInterface>(
        &mut self,
        iface: &mut I,
        abc: [u8; 3],
    ) -> Result<(), Error> {
        iface.command_with_data(cmd::SET_CONTRAST, &abc)
    }
}

impl Controller for Ssd1351 {
    fn size(&self) -> (u16, u16) {
        (SIZE, SIZE)
    }

    fn init<I: DisplayInterface, D: DelayNs>(
        &mut self,
        iface: &mut I,
        delay: &mut D,
    ) -> Result<(), Error> {
        run_init(iface, delay, INIT, Params::AsData)
    }

    fn set_window<I: DisplayInterface>(
        &mut self,
        iface: &mut I,
        x0: u16,
        y0: u16,
        x1: u16,
        y1: u16,
    ) -> Result<(), Error> {
        if x1 >= SIZE || y1 >= SIZE {
            return Err(Error::OutOfBounds);
        }
        iface.command_with_data(cmd::SET_COLUMN_ADDRESS, &[x0 as u8, x1 as u8])?;
        iface.command_with_data(cmd::SET_ROW_ADDRESS, &[y0 as u8, y1 as u8])?;
        iface.command(&[cmd::WRITE_RAM])
    }
}

#[cfg(test)]
mod tests {
    use super::super::mock::*;
    use super::*;

    #[test]
    fn test_window() {
        let mut rec = Recorder::default();
        Ssd1351.set_window(&mut rec, 0, 0, 127, 127).unwrap();
        assert_eq!(
            rec.log,
            [
                Ev::Cmd(vec![0x15]),
                Ev::Data(vec![0, 127]),
                Ev::Cmd(vec![0x75]),
                Ev::Data(vec![0, 127]),
                Ev::Cmd(vec![0x5C]),
            ]
        );
    }

    #[test]
    fn test_init_unlocks_first() {
        let mut rec = Recorder::default();
        Ssd1351.init(&mut rec, &mut NoDelay).unwrap();
        assert_eq!(rec.log[0], Ev::Cmd(vec![cmd::SET_COMMAND_LOCK]));
        assert_eq!(rec.log[1], Ev::Data(vec![0x12]));
        assert_eq!(rec.log.last(), Some(&Ev::Cmd(vec![cmd::SLEEP_MODE_DISPLAY_ON])));
    }
}
