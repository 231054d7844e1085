//! Peridot displays
//!
//! Two kinds of raster live here:
//!
//! - Color TFT/OLED controllers (ST7789, ILI9341, SSD1331, SSD1351) driven
//!   through a [`paged::PagedDisplay`]. Nothing is buffered on the host;
//!   every fill sets a device-side window and streams RGB565 through a
//!   single scratch row.
//! - Passive HUB75 LED matrices driven by [`hub75::Hub75`], which keeps
//!   binary-coded bit-planes and must be refreshed continuously.
//!
//! ```text
//! logical (x, y) ──► Rotation ──► physical (x, y) ──► controller window
//!                                                  └─► HUB75 bit-plane
//! ```
//!
//! Both implement [`embedded_graphics::draw_target::DrawTarget`] so the
//! usual text and primitive renderers work on top of them.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod color;
pub mod controller;
pub mod hub75;
pub mod interface;
pub mod paged;
pub mod surface;

pub use color::{rgb565, rgb565_to_rgb};
pub use controller::{Controller, Ili9341, Ssd1331, Ssd1351, St7789, St7789Config};
pub use hub75::{GpioPort, Hub75, Hub75Config, Hub75Port};
pub use interface::{DisplayInterface, SpiInterface};
pub use paged::PagedDisplay;
pub use surface::{Rotation, Surface};
