//! RGB565 packing
//!
//! ```text
//!  15      11 10        5 4       0
//! ┌──────────┬───────────┬─────────┐
//! │ R[7:3]   │ G[7:2]    │ B[7:3]  │   sent high byte first
//! └──────────┴───────────┴─────────┘
//! ```

use embedded_graphics::pixelcolor::{IntoStorage, Rgb565};

/// Pack an 8-bit-per-channel color, dropping the low bits
pub const fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3)
}

/// Unpack to 8-bit channels; the dropped low bits come back as zero
pub const fn rgb565_to_rgb(c: u16) -> (u8, u8, u8) {
    (
        ((c >> 8) & 0xF8) as u8,
        ((c >> 3) & 0xFC) as u8,
        ((c << 3) & 0xF8) as u8,
    )
}

/// Raw value of an `embedded-graphics` color
pub fn from_graphics(color: Rgb565) -> u16 {
    color.into_storage()
}
