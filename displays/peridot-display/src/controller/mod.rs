//! Display controller command sets
//!
//! A controller knows its init sequence and how to open a device-side
//! write window. Everything above that (rotation, clipping, streaming) is
//! shared in [`crate::paged`].
//!
//! ```text
//! MIPI DCS (ST7789, ILI9341)        SSD1351                 SSD1331
//! CASET x0h x0l x1h x1l   (data)    15 x0 x1    (data)      15 x0 x1  (cmd)
//! RASET y0h y0l y1h y1l   (data)    75 y0 y1    (data)      75 y0 y1  (cmd)
//! RAMWR                             5C                      -
//! ```

mod ili9341;
mod ssd1331;
mod ssd1351;
mod st7789;

pub use ili9341::Ili9341;
pub use ssd1331::Ssd1331;
pub use ssd1351::Ssd1351;
pub use st7789::{St7789, St7789Config};

use embedded_hal::delay::DelayNs;
use peridot_hal::Error;

use crate::interface::DisplayInterface;

/// A TFT/OLED controller with window addressing
pub trait Controller {
    /// Native panel size after the fixed address mapping set by `init`
    fn size(&self) -> (u16, u16);

    /// Bring the panel out of reset into 16-bit color mode
    fn init<I: DisplayInterface, D: DelayNs>(
        &mut self,
        iface: &mut I,
        delay: &mut D,
    ) -> Result<(), Error>;

    /// Open the inclusive physical window `(x0, y0)..=(x1, y1)` for pixel data
    fn set_window<I: DisplayInterface>(
        &mut self,
        iface: &mut I,
        x0: u16,
        y0: u16,
        x1: u16,
        y1: u16,
    ) -> Result<(), Error>;
}

/// Commands shared by MIPI DCS controllers
pub mod dcs {
    pub const SWRESET: u8 = 0x01;
    pub const SLPOUT: u8 = 0x11;
    pub const NORON: u8 = 0x13;
    pub const INVOFF: u8 = 0x20;
    pub const INVON: u8 = 0x21;
    pub const DISPOFF: u8 = 0x28;
    pub const DISPON: u8 = 0x29;
    pub const CASET: u8 = 0x2A;
    pub const RASET: u8 = 0x2B;
    pub const RAMWR: u8 = 0x2C;
    pub const MADCTL: u8 = 0x36;
    pub const VSCRSADD: u8 = 0x37;
    pub const COLMOD: u8 = 0x3A;

    /// MADCTL bits
    pub mod madctl {
        pub const MY: u8 = 0x80;
        pub const MX: u8 = 0x40;
        pub const MV: u8 = 0x20;
        pub const BGR: u8 = 0x08;
    }

    /// COLMOD value for 16 bits per pixel
    pub const COLMOD_RGB565: u8 = 0x55;
}

/// One entry of a controller init table
#[derive(Debug, Clone, Copy)]
pub(crate) struct InitStep {
    pub cmd: u8,
    pub params: &'static [u8],
    pub delay_ms: u16,
}

impl InitStep {
    pub const fn new(cmd: u8, params: &'static [u8]) -> Self {
        Self {
            cmd,
            params,
            delay_ms: 0,
        }
    }

    pub const fn wait(cmd: u8, params: &'static [u8], delay_ms: u16) -> Self {
        Self {
            cmd,
            params,
            delay_ms,
        }
    }
}

/// Where an init table's parameters travel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Params {
    /// D/C high after the command byte
    AsData,
    /// Same D/C-low transfer as the command (SSD1331)
    AsCommand,
}

pub(crate) fn run_init<I: DisplayInterface, D: DelayNs>(
    iface: &mut I,
    delay: &mut D,
    steps: &[InitStep],
    params: Params,
) -> Result<(), Error> {
    let mut buf = [0u8; 16];
    for step in steps {
        match params {
            Params::AsData => iface.command_with_data(step.cmd, step.params)?,
            Params::AsCommand => {
                let len = step.params.len() + 1;
                let frame = buf.get_mut(..len).ok_or(Error::InvalidParam)?;
                frame[0] = step.cmd;
                frame[1..].copy_from_slice(step.params);
                iface.command(frame)?;
            }
        }
        if step.delay_ms > 0 {
            delay.delay_ms(step.delay_ms as u32);
        }
    }
    Ok(())
}

/// CASET/RASET/RAMWR with 16-bit big-endian bounds
pub(crate) fn dcs_window<I: DisplayInterface>(
    iface: &mut I,
    x0: u16,
    y0: u16,
    x1: u16,
    y1: u16,
) -> Result<(), Error> {
    let [x0h, x0l] = x0.to_be_bytes();
    let [x1h, x1l] = x1.to_be_bytes();
    let [y0h, y0l] = y0.to_be_bytes();
    let [y1h, y1l] = y1.to_be_bytes();
    iface.command_with_data(dcs::CASET, &[x0h, x0l, x1h, x1l])?;
    iface.command_with_data(dcs::RASET, &[y0h, y0l, y1h, y1l])?;
    iface.command(&[dcs::RAMWR])
}

#[cfg(test)]
pub(crate) mod mock {
    //! Recording interface shared by the controller and paged tests

    use super::*;
    use std::vec::Vec;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Ev {
        Cmd(Vec<u8>),
        Data(Vec<u8>),
    }

    #[derive(Default)]
    pub struct Recorder {
        pub log: Vec<Ev>,
    }

    impl Recorder {
        /// Total data bytes sent
        pub fn data_len(&self) -> usize {
            self.log
                .iter()
                .map(|e| match e {
                    Ev::Data(d) => d.len(),
                    Ev::Cmd(_) => 0,
                })
                .sum()
        }

        /// All data bytes in order
        pub fn data(&self) -> Vec<u8> {
            self.log
                .iter()
                .filter_map(|e| match e {
                    Ev::Data(d) => Some(d.as_slice()),
                    Ev::Cmd(_) => None,
                })
                .flatten()
                .copied()
                .collect()
        }
    }

    impl DisplayInterface for Recorder {
        fn command(&mut self, bytes: &[u8]) -> Result<(), Error> {
            self.log.push(Ev::Cmd(bytes.to_vec()));
            Ok(())
        }

        fn data(&mut self, bytes: &[u8]) -> Result<(), Error> {
            self.log.push(Ev::Data(bytes.to_vec()));
            Ok(())
        }
    }

    pub struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }
}
