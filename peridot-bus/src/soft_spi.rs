//! Bit-banged SPI master (MSB first, all four modes)
//!
//! ```text
//!             CPHA=0                      CPHA=1
//! MOSI   ──<bit>────────           ────<bit>──────
//! SCK    idle ─┐ sample ┌─ idle    idle ─┐ set ┌ sample ─ idle
//!              leading  trailing         leading trailing
//! ```
//!
//! With CPHA=0 data is set up before the leading edge and sampled on it.
//! With CPHA=1 data changes on the leading edge and is sampled on the
//! trailing one. CPOL only picks the idle level of SCK. CS is not handled
//! here; drivers own their CS pin.

use peridot_hal::delay::{Cpu, SpinDelay};
use peridot_hal::{Error, InputPin, Mode, OutputPin, Phase, Polarity, SpiBus, SpiConfig};

/// Software SPI master
pub struct SoftSpi<SCK, MOSI, MISO> {
    sck: SCK,
    mosi: MOSI,
    miso: MISO,
    delay: SpinDelay,
    idle_high: bool,
    sample_trailing: bool,
}

impl<SCK, MOSI, MISO> SoftSpi<SCK, MOSI, MISO>
where
    SCK: OutputPin,
    MOSI: OutputPin,
    MISO: InputPin,
{
    /// Create a bus in the configured mode
    ///
    /// `config.frequency` must have a calibration entry for `cpu`
    /// (100 kHz or 400 kHz), else `InvalidParam`.
    pub fn new(
        sck: SCK,
        mosi: MOSI,
        miso: MISO,
        cpu: Cpu,
        config: SpiConfig,
    ) -> Result<Self, Error> {
        let delay = SpinDelay::for_bus(cpu, config.frequency)?;
        Ok(Self::build(sck, mosi, miso, delay, config.polarity, config.phase))
    }

    /// Mode 0 bus with an explicit half-cycle delay
    pub fn with_delay(sck: SCK, mosi: MOSI, miso: MISO, delay: SpinDelay) -> Self {
        Self::with_mode(sck, mosi, miso, delay, Mode::Mode0)
    }

    /// Bus in `mode` with an explicit half-cycle delay
    pub fn with_mode(sck: SCK, mosi: MOSI, miso: MISO, delay: SpinDelay, mode: Mode) -> Self {
        let (polarity, phase): (Polarity, Phase) = mode.into();
        Self::build(sck, mosi, miso, delay, polarity, phase)
    }

    fn build(
        mut sck: SCK,
        mosi: MOSI,
        miso: MISO,
        delay: SpinDelay,
        polarity: Polarity,
        phase: Phase,
    ) -> Self {
        let idle_high = polarity == Polarity::IdleHigh;
        sck.set_state(idle_high);
        Self {
            sck,
            mosi,
            miso,
            delay,
            idle_high,
            sample_trailing: phase == Phase::CaptureOnSecondTransition,
        }
    }

    /// Release the pins
    pub fn free(self) -> (SCK, MOSI, MISO) {
        (self.sck, self.mosi, self.miso)
    }

    /// Drive SCK away from (`true`) or back to (`false`) its idle level
    #[inline(always)]
    fn clock(&mut self, active: bool) {
        self.sck.set_state(active != self.idle_high);
    }

    #[inline]
    fn shift(&mut self, out: u8) -> u8 {
        let mut input = 0u8;
        for i in (0..8).rev() {
            let bit = (out >> i) & 1 != 0;
            if self.sample_trailing {
                self.clock(true);
                self.mosi.set_state(bit);
                self.delay.half_cycle();
                self.clock(false);
                input = (input << 1) | self.miso.is_high() as u8;
                self.delay.half_cycle();
            } else {
                self.mosi.set_state(bit);
                self.delay.half_cycle();
                self.clock(true);
                input = (input << 1) | self.miso.is_high() as u8;
                self.delay.half_cycle();
                self.clock(false);
            }
        }
        input
    }
}

impl<SCK, MOSI, MISO> SpiBus for SoftSpi<SCK, MOSI, MISO>
where
    SCK: OutputPin,
    MOSI: OutputPin,
    MISO: InputPin,
{
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Error> {
        if tx.len() != rx.len() {
            return Err(Error::InvalidParam);
        }
        for (t, r) in tx.iter().zip(rx.iter_mut()) {
            *r = self.shift(*t);
        }
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        for &b in data {
            self.shift(b);
        }
        Ok(())
    }
}
