//! Paged framebuffer core
//!
//! The host never holds the screen. A fill opens a window on the
//! controller and streams RGB565 through one scratch row:
//!
//! ```text
//! fill_rectangle(x, y, w, h, c)
//!   logical rect ──Rotation──► physical rect ──► set_window
//!   scratch = [c c c ... c]   (up to one row of the longer side)
//!   send scratch ⌈w·h / row⌉ times, last one trimmed
//! ```
//!
//! Rotation only changes coordinate translation; the controller's address
//! mapping is written once by `init`.

use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::geometry::{Dimensions, OriginDimensions, Size};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::Pixel;
use embedded_hal::delay::DelayNs;
use peridot_hal::Error;

use crate::color::from_graphics;
use crate::controller::Controller;
use crate::interface::DisplayInterface;
use crate::surface::{clip, Rotation, Surface};

/// Scratch bytes: one row of the longest supported side (320 px)
pub const SCRATCH_LEN: usize = 2 * 320;

pub struct PagedDisplay<I, C> {
    iface: I,
    controller: C,
    rotation: Rotation,
    scratch: [u8; SCRATCH_LEN],
    /// Bytes of `scratch` in use: 2 · max(W, H)
    row_bytes: usize,
}

impl<I: DisplayInterface, C: Controller> PagedDisplay<I, C> {
    /// Wrap a controller; panels with a side over 320 px are rejected
    pub fn new(iface: I, controller: C) -> Result<Self, Error> {
        let (w, h) = controller.size();
        let row_bytes = 2 * w.max(h) as usize;
        if row_bytes == 0 || row_bytes > SCRATCH_LEN {
            return Err(Error::InvalidParam);
        }
        Ok(Self {
            iface,
            controller,
            rotation: Rotation::Deg0,
            scratch: [0; SCRATCH_LEN],
            row_bytes,
        })
    }

    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error> {
        self.controller.init(&mut self.iface, delay)
    }

    pub fn release(self) -> (I, C) {
        (self.iface, self.controller)
    }

    /// Controller and link, for chip-specific commands
    pub fn parts_mut(&mut self) -> (&mut C, &mut I) {
        (&mut self.controller, &mut self.iface)
    }

    /// Fill a logical rectangle with one RGB565 color
    pub fn fill_rectangle(
        &mut self,
        x: u16,
        y: u16,
        w: u16,
        h: u16,
        color: u16,
    ) -> Result<(), Error> {
        self.open_window(x, y, w, h)?;

        let mut remaining = w as usize * h as usize * 2;
        let chunk = remaining.min(self.row_bytes);
        let [hi, lo] = color.to_be_bytes();
        for px in self.scratch[..chunk].chunks_exact_mut(2) {
            px[0] = hi;
            px[1] = lo;
        }
        while remaining > 0 {
            let n = remaining.min(chunk);
            self.iface.data(&self.scratch[..n])?;
            remaining -= n;
        }
        Ok(())
    }

    /// Copy a row-major logical block of RGB565 pixels
    ///
    /// `pixels.len()` must equal `w · h`, else `InvalidParam`.
    pub fn fill_rectangle_with_buffer(
        &mut self,
        x: u16,
        y: u16,
        w: u16,
        h: u16,
        pixels: &[u16],
    ) -> Result<(), Error> {
        if pixels.len() != w as usize * h as usize {
            return Err(Error::InvalidParam);
        }
        let (px, py, pw, ph) = self.open_window(x, y, w, h)?;
        let panel = self.controller.size();

        let mut used = 0;
        // The controller auto-advances in physical row-major order
        for row in py..py + ph {
            for col in px..px + pw {
                let (lx, ly) = self.rotation.to_logical(col, row, panel);
                let idx = (ly - y) as usize * w as usize + (lx - x) as usize;
                let [hi, lo] = pixels[idx].to_be_bytes();
                self.scratch[used] = hi;
                self.scratch[used + 1] = lo;
                used += 2;
                if used == self.row_bytes {
                    self.iface.data(&self.scratch[..used])?;
                    used = 0;
                }
            }
        }
        if used > 0 {
            self.iface.data(&self.scratch[..used])?;
        }
        Ok(())
    }

    /// Horizontal line from `x0` to `x1` inclusive, in either order
    pub fn draw_fast_hline(&mut self, x0: u16, x1: u16, y: u16, color: u16) -> Result<(), Error> {
        let (a, b) = (x0.min(x1), x0.max(x1));
        self.fill_rectangle(a, y, b - a + 1, 1, color)
    }

    /// Vertical line from `y0` to `y1` inclusive, in either order
    pub fn draw_fast_vline(&mut self, x: u16, y0: u16, y1: u16, color: u16) -> Result<(), Error> {
        let (a, b) = (y0.min(y1), y0.max(y1));
        self.fill_rectangle(x, a, 1, b - a + 1, color)
    }

    pub fn fill_screen(&mut self, color: u16) -> Result<(), Error> {
        let (w, h) = Surface::size(self);
        self.fill_rectangle(0, 0, w, h, color)
    }

    /// Open the physical window for a logical rectangle and return it
    fn open_window(
        &mut self,
        x: u16,
        y: u16,
        w: u16,
        h: u16,
    ) -> Result<(u16, u16, u16, u16), Error> {
        let panel = self.controller.size();
        let (px, py, pw, ph) = self.rotation.rect_to_physical(x, y, w, h, panel)?;
        self.controller
            .set_window(&mut self.iface, px, py, px + pw - 1, py + ph - 1)?;
        Ok((px, py, pw, ph))
    }
}

impl<I: DisplayInterface, C: Controller> Surface for PagedDisplay<I, C> {
    type Color = u16;

    fn physical_size(&self) -> (u16, u16) {
        self.controller.size()
    }

    fn rotation(&self) -> Rotation {
        self.rotation
    }

    fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: u16) -> Result<(), Error> {
        match clip(x, y, Surface::size(self)) {
            Some((x, y)) => self.fill_rectangle(x, y, 1, 1, color),
            None => Ok(()),
        }
    }
}

impl<I: DisplayInterface, C: Controller> OriginDimensions for PagedDisplay<I, C> {
    fn size(&self) -> Size {
        let (w, h) = Surface::size(self);
        Size::new(w as u32, h as u32)
    }
}

impl<I: DisplayInterface, C: Controller> DrawTarget for PagedDisplay<I, C> {
    type Color = Rgb565;
    type Error = Error;

    fn draw_iter<P>(&mut self, pixels: P) -> Result<(), Self::Error>
    where
        P: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point.x, point.y, from_graphics(color))?;
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.bounding_box());
        if area.is_zero_sized() {
            return Ok(());
        }
        self.fill_rectangle(
            area.top_left.x as u16,
            area.top_left.y as u16,
            area.size.width as u16,
            area.size.height as u16,
            from_graphics(color),
        )
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill_screen(from_graphics(color))
    }
}
