//! HUB75 LED matrix refresh engine
//!
//! A passive panel only shows what is being clocked into it, so
//! [`Hub75::refresh_row`] must be called continuously (timer tick or tight
//! loop). Color depth comes from binary-coded modulation: plane `p` of a
//! channel holds bit `8 - D + p` of its 8-bit value and is lit for
//! `plane_time_us · 2^p`.
//!
//! ```text
//! per row r in 0..P, per plane p in 0..D:
//!   shift W columns of (R1 G1 B1 R2 G2 B2) for rows r and r + P
//!   OE off, address = r, LAT pulse
//!   OE on for plane_time_us << p (scaled by brightness), OE off
//! ```
//!
//! Plane storage is one byte per column holding the six color bits, laid
//! out `[plane][row][column]`, so a shift is a straight slice walk.

use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::Pixel;
use embedded_hal::delay::DelayNs;
use peridot_hal::{Error, OutputPin};

use crate::surface::{clip, Rotation, Surface};

/// Row address lines A..E
pub const MAX_ADDRESS_LINES: usize = 5;

/// Longest accepted least-significant plane time; the top plane of an
/// 8-bit frame then stays on for 1.28 s
pub const MAX_PLANE_TIME_US: u32 = 10_000;

/// Pins of a HUB75 connector
pub trait Hub75Port {
    /// Address lines wired (4 for 1:16 scan, 5 for 1:32)
    const ADDRESS_LINES: usize;

    /// Present R1 G1 B1 R2 G2 B2 (bits 0..=5) and pulse CLK
    fn shift(&mut self, bits: u8);

    /// Drive A..E with the row number
    fn set_address(&mut self, row: u16);

    /// Pulse LAT, moving the shift register to the output latches
    fn latch(&mut self);

    /// Light (`true`) or blank the latched row; OE is active low
    fn set_output_enable(&mut self, on: bool);
}

/// HUB75 connector on plain GPIO
///
/// `A` is the number of address lines wired.
pub struct GpioPort<P, const A: usize> {
    /// R1, G1, B1, R2, G2, B2
    data: [P; 6],
    address: [P; A],
    clk: P,
    lat: P,
    oe: P,
}

impl<P: OutputPin, const A: usize> GpioPort<P, A> {
    pub fn new(data: [P; 6], address: [P; A], mut clk: P, mut lat: P, mut oe: P) -> Self {
        clk.set_low();
        lat.set_low();
        oe.set_high();
        Self {
            data,
            address,
            clk,
            lat,
            oe,
        }
    }
}

impl<P: OutputPin, const A: usize> Hub75Port for GpioPort<P, A> {
    const ADDRESS_LINES: usize = A;

    #[inline]
    fn shift(&mut self, bits: u8) {
        for (i, pin) in self.data.iter_mut().enumerate() {
            pin.set_state(bits >> i & 1 != 0);
        }
        self.clk.set_high();
        self.clk.set_low();
    }

    fn set_address(&mut self, row: u16) {
        for (i, pin) in self.address.iter_mut().enumerate() {
            pin.set_state(row >> i & 1 != 0);
        }
    }

    #[inline]
    fn latch(&mut self) {
        self.lat.set_high();
        self.lat.set_low();
    }

    #[inline]
    fn set_output_enable(&mut self, on: bool) {
        self.oe.set_state(!on);
    }
}

/// Panel geometry and timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Hub75Config {
    pub width: u16,
    pub height: u16,
    /// Bit-planes per channel (1..=8)
    pub color_depth: u8,
    /// Rows lit at once on each half; must be `height / 2`
    pub row_pattern: u16,
    /// 0 = dark, 255 = full on-time
    pub brightness: u8,
    /// On-time of the least significant plane, at most [`MAX_PLANE_TIME_US`]
    pub plane_time_us: u32,
    /// At full brightness, skip re-shifting a plane identical to the last
    pub fast_update: bool,
}

impl Default for Hub75Config {
    fn default() -> Self {
        Self {
            width: 64,
            height: 32,
            color_depth: 4,
            row_pattern: 16,
            brightness: 255,
            plane_time_us: 10,
            fast_update: false,
        }
    }
}

impl Hub75Config {
    /// Bytes one plane buffer needs
    pub fn buffer_len(&self) -> usize {
        self.width as usize * self.row_pattern as usize * self.color_depth as usize
    }

    fn validate(&self, address_lines: usize) -> Result<(), Error> {
        if self.width == 0
            || self.row_pattern == 0
            || self.height != 2 * self.row_pattern
            || !(1..=8).contains(&self.color_depth)
            || self.plane_time_us > MAX_PLANE_TIME_US
            || address_lines > MAX_ADDRESS_LINES
            || (self.row_pattern as usize) > 1 << address_lines
        {
            return Err(Error::InvalidParam);
        }
        Ok(())
    }
}

pub struct Hub75<'a, P> {
    port: P,
    config: Hub75Config,
    rotation: Rotation,
    /// Planes being displayed
    front: &'a mut [u8],
    /// Planes being drawn, when double buffered
    back: Option<&'a mut [u8]>,
    swap_pending: bool,
    /// Next row `refresh_row` will draw
    row: u16,
}

impl<'a, P: Hub75Port> Hub75<'a, P> {
    /// Single-buffered engine drawing straight into `buffer`
    ///
    /// `buffer` must hold at least [`Hub75Config::buffer_len`] bytes.
    pub fn new(port: P, config: Hub75Config, buffer: &'a mut [u8]) -> Result<Self, Error> {
        Self::build(port, config, buffer, None)
    }

    /// Double-buffered engine; drawing goes to `back` until [`Hub75::swap`]
    pub fn with_back_buffer(
        port: P,
        config: Hub75Config,
        front: &'a mut [u8],
        back: &'a mut [u8],
    ) -> Result<Self, Error> {
        Self::build(port, config, front, Some(back))
    }

    fn build(
        mut port: P,
        config: Hub75Config,
        front: &'a mut [u8],
        back: Option<&'a mut [u8]>,
    ) -> Result<Self, Error> {
        config.validate(P::ADDRESS_LINES)?;
        let len = config.buffer_len();
        let front = front.get_mut(..len).ok_or(Error::InvalidParam)?;
        front.fill(0);
        let back = match back {
            Some(b) => {
                let b = b.get_mut(..len).ok_or(Error::InvalidParam)?;
                b.fill(0);
                Some(b)
            }
            None => None,
        };

        port.set_output_enable(false);
        port.set_address(0);

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "hub75: {}x{} depth {} scan 1:{}",
            config.width,
            config.height,
            config.color_depth,
            config.row_pattern
        );

        Ok(Self {
            port,
            config,
            rotation: Rotation::Deg0,
            front,
            back,
            swap_pending: false,
            row: 0,
        })
    }

    pub fn config(&self) -> &Hub75Config {
        &self.config
    }

    pub fn set_brightness(&mut self, brightness: u8) {
        self.config.brightness = brightness;
    }

    pub fn brightness(&self) -> u8 {
        self.config.brightness
    }

    /// Black out the drawing buffer
    pub fn clear_display(&mut self) {
        self.draw_buffer().fill(0);
    }

    /// Show the back buffer from the next row boundary on
    ///
    /// The new front is copied into the back buffer so drawing continues
    /// from what is on screen. Without a back buffer this does nothing.
    pub fn swap(&mut self) {
        self.swap_pending = self.back.is_some();
    }

    /// Clock zeros through the panel and blank it
    pub fn flush_display(&mut self) {
        self.port.set_output_enable(false);
        for _ in 0..self.config.width {
            self.port.shift(0);
        }
        self.port.latch();
    }

    /// Draw one row pair through every plane, then advance to the next row
    pub fn refresh_row<D: DelayNs>(&mut self, delay: &mut D) {
        if self.swap_pending {
            if let Some(back) = self.back.as_mut() {
                core::mem::swap(&mut self.front, back);
                back.copy_from_slice(&self.front[..]);
            }
            self.swap_pending = false;
        }

        let w = self.config.width as usize;
        let p = self.config.row_pattern as usize;
        let row = self.row as usize;
        let reuse = self.config.fast_update && self.config.brightness == u8::MAX;

        for plane in 0..self.config.color_depth as usize {
            let start = (plane * p + row) * w;
            let unchanged = reuse && plane > 0 && {
                let prev = start - p * w;
                self.front[start..start + w] == self.front[prev..prev + w]
            };

            if !unchanged {
                // First column shifted ends up in the last one
                for &bits in self.front[start..start + w].iter().rev() {
                    self.port.shift(bits);
                }
                self.port.set_output_enable(false);
                self.port.set_address(self.row);
                self.port.latch();
            }

            let on_us = self.on_time_us(plane as u32);
            if on_us > 0 {
                self.port.set_output_enable(true);
                delay.delay_us(on_us);
                self.port.set_output_enable(false);
            }
        }

        self.row = (self.row + 1) % self.config.row_pattern;
    }

    /// One full frame: every row pair once
    pub fn refresh<D: DelayNs>(&mut self, delay: &mut D) {
        for _ in 0..self.config.row_pattern {
            self.refresh_row(delay);
        }
    }

    fn on_time_us(&self, plane: u32) -> u32 {
        (self.config.plane_time_us << plane) * self.config.brightness as u32 / u8::MAX as u32
    }

    fn draw_buffer(&mut self) -> &mut [u8] {
        match self.back.as_deref_mut() {
            Some(back) => back,
            None => &mut *self.front,
        }
    }

    /// Store an 8-bit color at a physical position
    fn store(&mut self, x: u16, y: u16, color: Rgb888) {
        let Hub75Config {
            width,
            row_pattern,
            color_depth,
            ..
        } = self.config;
        let (row, shift) = if y < row_pattern {
            (y, 0)
        } else {
            (y - row_pattern, 3)
        };
        let (w, p) = (width as usize, row_pattern as usize);
        let buf = self.draw_buffer();

        for plane in 0..color_depth {
            let bit = 8 - color_depth + plane;
            let rgb = (color.r() >> bit & 1)
                | (color.g() >> bit & 1) << 1
                | (color.b() >> bit & 1) << 2;
            let cell = &mut buf[(plane as usize * p + row as usize) * w + x as usize];
            *cell = (*cell & !(0b111 << shift)) | rgb << shift;
        }
    }
}

impl<P: Hub75Port> Surface for Hub75<'_, P> {
    type Color = Rgb888;

    fn physical_size(&self) -> (u16, u16) {
        (self.config.width, self.config.height)
    }

    fn rotation(&self) -> Rotation {
        self.rotation
    }

    fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Rgb888) -> Result<(), Error> {
        let panel = self.physical_size();
        if let Some((x, y)) = clip(x, y, Surface::size(self)) {
            let (px, py) = self.rotation.to_physical(x, y, panel);
            self.store(px, py, color);
        }
        Ok(())
    }
}

impl<P: Hub75Port> OriginDimensions for Hub75<'_, P> {
    fn size(&self) -> Size {
        let (w, h) = Surface::size(self);
        Size::new(w as u32, h as u32)
    }
}

impl<P: Hub75Port> DrawTarget for Hub75<'_, P> {
    type Color = Rgb888;
    type Error = Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point.x, point.y, color)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    /// Electrical model of a panel: shift register, latches, LED on-time
    struct Panel {
        width: usize,
        rows: usize,
        shifted: Vec<u8>,
        latched: Vec<u8>,
        address: usize,
        oe: bool,
        shifts: usize,
        on_ns: u64,
        plane_ns: u64,
        /// Accumulated weight per pixel and channel
        seen: Vec<[u32; 3]>,
    }

    impl Panel {
        fn new(config: &Hub75Config) -> Rc<RefCell<Self>> {
            let (w, h) = (config.width as usize, config.height as usize);
            Rc::new(RefCell::new(Self {
                width: w,
                rows: config.row_pattern as usize,
                shifted: Vec::new(),
                latched: vec![0; w],
                address: 0,
                oe: false,
                shifts: 0,
                on_ns: 0,
                plane_ns: config.plane_time_us as u64 * 1000,
                seen: vec![[0; 3]; w * h],
            }))
        }

        fn intensity(&self, x: usize, y: usize) -> [u32; 3] {
            self.seen[y * self.width + x]
        }

        fn reset_counters(&mut self) {
            self.on_ns = 0;
            self.shifts = 0;
            self.seen.iter_mut().for_each(|s| *s = [0; 3]);
        }
    }

    struct Port(Rc<RefCell<Panel>>);

    impl Hub75Port for Port {
        const ADDRESS_LINES: usize = 4;

        fn shift(&mut self, bits: u8) {
            let mut p = self.0.borrow_mut();
            p.shifted.push(bits);
            p.shifts += 1;
        }

        fn set_address(&mut self, row: u16) {
            self.0.borrow_mut().address = row as usize;
        }

        fn latch(&mut self) {
            let mut p = self.0.borrow_mut();
            let w = p.width;
            let tail = p.shifted.len().saturating_sub(w);
            let last: Vec<u8> = p.shifted[tail..].to_vec();
            // the k-th bit clocked in of the last W sits in column W-1-k
            for (k, bits) in last.into_iter().enumerate() {
                p.latched[w - 1 - k] = bits;
            }
            p.shifted.clear();
        }

        fn set_output_enable(&mut self, on: bool) {
            self.0.borrow_mut().oe = on;
        }
    }

    struct Clock(Rc<RefCell<Panel>>);

    impl DelayNs for Clock {
        fn delay_ns(&mut self, ns: u32) {
            let mut p = self.0.borrow_mut();
            if !p.oe {
                return;
            }
            p.on_ns += ns as u64;
            let weight = (ns as u64 / p.plane_ns) as u32;
            let (w, top) = (p.width, p.address);
            let bottom = top + p.rows;
            for col in 0..w {
                let bits = p.latched[col];
                for ch in 0..3 {
                    if bits >> ch & 1 != 0 {
                        p.seen[top * w + col][ch] += weight;
                    }
                    if bits >> (3 + ch) & 1 != 0 {
                        p.seen[bottom * w + col][ch] += weight;
                    }
                }
            }
        }
    }

    const CHECKER: [Rgb888; 4] = [
        Rgb888::RED,
        Rgb888::GREEN,
        Rgb888::new(0x80, 0x40, 0x20),
        Rgb888::WHITE,
    ];

    fn checker(x: i32, y: i32) -> Rgb888 {
        CHECKER[((x / 8 + y / 8) % 4) as usize]
    }

    fn expected(c: Rgb888, depth: u8) -> [u32; 3] {
        let s = 8 - depth;
        [(c.r() >> s) as u32, (c.g() >> s) as u32, (c.b() >> s) as u32]
    }

    #[test]
    fn test_checker_frame() {
        let config = Hub75Config::default();
        let panel = Panel::new(&config);
        let mut front = vec![0u8; config.buffer_len()];
        let mut back = vec![0u8; config.buffer_len()];
        let mut hub =
            Hub75::with_back_buffer(Port(panel.clone()), config, &mut front, &mut back).unwrap();
        let mut clock = Clock(panel.clone());

        let size = hub.bounding_box().size;
        let pixels = (0..size.height as i32).flat_map(|y| {
            (0..size.width as i32).map(move |x| Pixel(Point::new(x, y), checker(x, y)))
        });
        hub.draw_iter(pixels).unwrap();

        // nothing shows until the swap
        hub.refresh(&mut clock);
        assert!(panel.borrow().seen.iter().all(|s| *s == [0; 3]));

        panel.borrow_mut().reset_counters();
        hub.swap();
        hub.refresh(&mut clock);

        let p = panel.borrow();
        // 16 rows x (1 + 2 + 4 + 8) x 10 µs
        assert_eq!(p.on_ns, 2_400_000);
        assert!(p.on_ns >= 2_000_000);
        for y in 0..32 {
            for x in 0..64 {
                let want = expected(checker(x as i32, y as i32), 4);
                assert_eq!(p.intensity(x, y), want, "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_rotated_pixel() {
        let config = Hub75Config::default();
        let panel = Panel::new(&config);
        let mut buf = vec![0u8; config.buffer_len()];
        let mut hub = Hub75::new(Port(panel.clone()), config, &mut buf).unwrap();
        hub.set_rotation(Rotation::Deg90);
        assert_eq!(Surface::size(&hub), (32, 64));

        hub.set_pixel(0, 0, Rgb888::WHITE).unwrap();
        hub.set_pixel(32, 0, Rgb888::WHITE).unwrap();
        hub.refresh(&mut Clock(panel.clone()));

        let p = panel.borrow();
        assert_eq!(p.intensity(63, 0), [15; 3]);
        let lit = p.seen.iter().filter(|s| **s != [0; 3]).count();
        assert_eq!(lit, 1);
    }

    #[test]
    fn test_bottom_half_uses_second_channel() {
        let config = Hub75Config::default();
        let panel = Panel::new(&config);
        let mut buf = vec![0u8; config.buffer_len()];
        let mut hub = Hub75::new(Port(panel.clone()), config, &mut buf).unwrap();
        hub.set_pixel(5, 20, Rgb888::BLUE).unwrap();
        hub.refresh(&mut Clock(panel.clone()));
        assert_eq!(panel.borrow().intensity(5, 20), [0, 0, 15]);
        assert_eq!(panel.borrow().intensity(5, 4), [0, 0, 0]);
    }

    #[test]
    fn test_fast_update_skips_identical_planes() {
        let config = Hub75Config {
            fast_update: true,
            ..Default::default()
        };
        let panel = Panel::new(&config);
        let mut buf = vec![0u8; config.buffer_len()];
        let mut hub = Hub75::new(Port(panel.clone()), config, &mut buf).unwrap();
        hub.clear(Rgb888::WHITE).unwrap();
        hub.refresh(&mut Clock(panel.clone()));

        let p = panel.borrow();
        assert_eq!(p.shifts, 64 * 16);
        assert_eq!(p.intensity(10, 30), [15; 3]);
    }

    #[test]
    fn test_brightness_scales_on_time() {
        let config = Hub75Config::default();
        let panel = Panel::new(&config);
        let mut buf = vec![0u8; config.buffer_len()];
        let mut hub = Hub75::new(Port(panel.clone()), config, &mut buf).unwrap();
        let mut clock = Clock(panel.clone());

        hub.set_brightness(128);
        hub.refresh(&mut clock);
        // per row: 1280/255 + 2560/255 + 5120/255 + 10240/255 = 75 µs
        assert_eq!(panel.borrow().on_ns, 16 * 75_000);

        panel.borrow_mut().reset_counters();
        hub.set_brightness(0);
        hub.refresh(&mut clock);
        assert_eq!(panel.borrow().on_ns, 0);
    }

    #[test]
    fn test_clear_display() {
        let config = Hub75Config::default();
        let panel = Panel::new(&config);
        let mut buf = vec![0u8; config.buffer_len()];
        let mut hub = Hub75::new(Port(panel.clone()), config, &mut buf).unwrap();
        hub.clear(Rgb888::WHITE).unwrap();
        hub.clear_display();
        hub.refresh(&mut Clock(panel.clone()));
        assert!(panel.borrow().seen.iter().all(|s| *s == [0; 3]));
    }

    #[test]
    fn test_row_advances_and_wraps() {
        let config = Hub75Config::default();
        let panel = Panel::new(&config);
        let mut buf = vec![0u8; config.buffer_len()];
        let mut hub = Hub75::new(Port(panel.clone()), config, &mut buf).unwrap();
        let mut clock = Clock(panel.clone());
        for _ in 0..15 {
            hub.refresh_row(&mut clock);
        }
        assert_eq!(panel.borrow().address, 14);
        hub.refresh_row(&mut clock);
        hub.refresh_row(&mut clock);
        assert_eq!(panel.borrow().address, 0);
    }

    #[test]
    fn test_config_validation() {
        let panel = Panel::new(&Hub75Config::default());
        let mut buf = vec![0u8; 8192];
        let bad = [
            Hub75Config { height: 30, ..Default::default() },
            Hub75Config { color_depth: 0, ..Default::default() },
            Hub75Config { color_depth: 9, ..Default::default() },
            // 1:32 scan needs a fifth address line
            Hub75Config { height: 64, row_pattern: 32, ..Default::default() },
            Hub75Config { plane_time_us: MAX_PLANE_TIME_US + 1, ..Default::default() },
            Hub75Config { plane_time_us: 200_000, color_depth: 8, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(
                Hub75::new(Port(panel.clone()), config, &mut buf),
                Err(Error::InvalidParam)
            ));
        }

        let longest = Hub75Config {
            plane_time_us: MAX_PLANE_TIME_US,
            color_depth: 8,
            ..Default::default()
        };
        let mut hub = Hub75::new(Port(panel.clone()), longest, &mut buf).unwrap();
        assert_eq!(hub.on_time_us(7), MAX_PLANE_TIME_US << 7);
        hub.set_brightness(128);
        assert_eq!(hub.on_time_us(7), (MAX_PLANE_TIME_US << 7) * 128 / 255);

        let mut small = vec![0u8; 100];
        assert!(matches!(
            Hub75::new(Port(panel.clone()), Hub75Config::default(), &mut small),
            Err(Error::InvalidParam)
        ));
    }

    #[test]
    fn test_gpio_port_shift() {
        #[derive(Clone)]
        struct Pin(Rc<RefCell<Vec<(usize, bool)>>>, usize);

        impl OutputPin for Pin {
            fn set_high(&mut self) {
                self.0.borrow_mut().push((self.1, true));
            }
            fn set_low(&mut self) {
                self.0.borrow_mut().push((self.1, false));
            }
        }

        let log = Rc::new(RefCell::new(Vec::new()));
        let pin = |n| Pin(log.clone(), n);
        let mut port: GpioPort<Pin, 4> = GpioPort::new(
            [pin(0), pin(1), pin(2), pin(3), pin(4), pin(5)],
            [pin(10), pin(11), pin(12), pin(13)],
            pin(20),
            pin(21),
            pin(22),
        );
        // OE idles high (blank)
        assert_eq!(log.borrow().last(), Some(&(22, true)));
        log.borrow_mut().clear();

        port.shift(0b100001);
        assert_eq!(
            *log.borrow(),
            [
                (0, true),
                (1, false),
                (2, false),
                (3, false),
                (4, false),
                (5, true),
                (20, true),
                (20, false)
            ]
        );

        log.borrow_mut().clear();
        port.set_address(0b1010);
        port.set_output_enable(true);
        assert_eq!(
            *log.borrow(),
            [(10, false), (11, true), (12, false), (13, true), (22, false)]
        );
    }
}
