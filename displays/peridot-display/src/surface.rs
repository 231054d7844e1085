//! Rotated 2-D surfaces
//!
//! Callers always work in logical coordinates. A surface of physical size
//! `(W, H)` maps a logical point as follows (rotation is clockwise):
//!
//! ```text
//! Deg0    (x, y) -> (x,         y)          logical size W x H
//! Deg90   (x, y) -> (W - 1 - y, x)          logical size H x W
//! Deg180  (x, y) -> (W - 1 - x, H - 1 - y)  logical size W x H
//! Deg270  (x, y) -> (y,         H - 1 - x)  logical size H x W
//! ```

use peridot_hal::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [Self::Deg0, Self::Deg90, Self::Deg180, Self::Deg270];

    pub fn from_degrees(degrees: u16) -> Option<Self> {
        match degrees % 360 {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    /// True for the quarter turns that swap width and height
    pub fn is_transposed(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }

    /// Logical size of a panel whose physical size is `(w, h)`
    pub fn logical_size(self, (w, h): (u16, u16)) -> (u16, u16) {
        if self.is_transposed() {
            (h, w)
        } else {
            (w, h)
        }
    }

    /// Map a logical point onto the physical panel
    ///
    /// The point must lie inside the logical surface.
    pub fn to_physical(self, x: u16, y: u16, (w, h): (u16, u16)) -> (u16, u16) {
        match self {
            Self::Deg0 => (x, y),
            Self::Deg90 => (w - 1 - y, x),
            Self::Deg180 => (w - 1 - x, h - 1 - y),
            Self::Deg270 => (y, h - 1 - x),
        }
    }

    /// Inverse of [`Rotation::to_physical`]
    pub fn to_logical(self, px: u16, py: u16, (w, h): (u16, u16)) -> (u16, u16) {
        match self {
            Self::Deg0 => (px, py),
            Self::Deg90 => (py, w - 1 - px),
            Self::Deg180 => (w - 1 - px, h - 1 - py),
            Self::Deg270 => (h - 1 - py, px),
        }
    }

    /// Map a logical rectangle to the physical one covering the same pixels
    ///
    /// Returns `(x, y, w, h)` on the panel, or `OutOfBounds` when the
    /// rectangle is empty or not fully inside the logical surface.
    pub fn rect_to_physical(
        self,
        x: u16,
        y: u16,
        w: u16,
        h: u16,
        physical: (u16, u16),
    ) -> Result<(u16, u16, u16, u16), Error> {
        let (lw, lh) = self.logical_size(physical);
        if w == 0 || h == 0 || x >= lw || y >= lh || w > lw - x || h > lh - y {
            return Err(Error::OutOfBounds);
        }
        let (ax, ay) = self.to_physical(x, y, physical);
        let (bx, by) = self.to_physical(x + w - 1, y + h - 1, physical);
        let (x0, x1) = (ax.min(bx), ax.max(bx));
        let (y0, y1) = (ay.min(by), ay.max(by));
        Ok((x0, y0, x1 - x0 + 1, y1 - y0 + 1))
    }
}

/// A rotatable raster
pub trait Surface {
    type Color;

    /// Native panel size, independent of rotation
    fn physical_size(&self) -> (u16, u16);

    fn rotation(&self) -> Rotation;

    fn set_rotation(&mut self, rotation: Rotation);

    /// Size in logical (post-rotation) coordinates
    fn size(&self) -> (u16, u16) {
        self.rotation().logical_size(self.physical_size())
    }

    /// Write one pixel; points outside the surface are silently dropped
    fn set_pixel(&mut self, x: i32, y: i32, color: Self::Color) -> Result<(), Error>;
}

/// Clip a signed logical point against a `(w, h)` surface
pub(crate) fn clip(x: i32, y: i32, (w, h): (u16, u16)) -> Option<(u16, u16)> {
    if x < 0 || y < 0 || x >= w as i32 || y >= h as i32 {
        return None;
    }
    Some((x as u16, y as u16))
}
