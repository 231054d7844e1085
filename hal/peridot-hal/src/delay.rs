//! Calibrated busy-wait delays
//!
//! Bit-banged protocols need microsecond and sub-microsecond waits that an
//! OS tick or timer interrupt cannot deliver. These are counted loops of
//! `nop` instructions whose counts come from one calibration table,
//! indexed by target core and bus frequency.
//!
//! ```text
//!   SCL  ──┐     ┌─────┐     ┌──
//!          └─────┘     └─────┘
//!          |<-h->|<-h->|
//!          h = half_cycle(): `nops_per_half_cycle` spins
//! ```
//!
//! The counts are starting points measured on real boards. Loop overhead
//! and the GPIO mode switches around each half-cycle eat most of the
//! budget, so the counts sit well below `core_hz / (2 * bus_hz)`.

use crate::error::Error;

/// Target core the spin loops are calibrated for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Cpu {
    /// Cortex-M0+ at 48 MHz (SAMD21)
    CortexM0Plus48MHz,
    /// Cortex-M0+ at 125 MHz (RP2040)
    Rp2040,
    /// Cortex-M4F at 64 MHz (nRF52)
    CortexM4_64MHz,
    /// Cortex-M4F at 120 MHz (SAMD51)
    CortexM4_120MHz,
    /// Cortex-M7 at 600 MHz (i.MX RT1062)
    CortexM7_600MHz,
    /// Xtensa LX6 at 240 MHz (ESP32)
    Esp32,
    /// Host build for tests; spins are effectively free
    Host,
}

impl Cpu {
    /// Core clock in Hz
    pub const fn core_hz(&self) -> u32 {
        match self {
            Cpu::CortexM0Plus48MHz => 48_000_000,
            Cpu::Rp2040 => 125_000_000,
            Cpu::CortexM4_64MHz => 64_000_000,
            Cpu::CortexM4_120MHz => 120_000_000,
            Cpu::CortexM7_600MHz => 600_000_000,
            Cpu::Esp32 => 240_000_000,
            Cpu::Host => 1_000_000_000,
        }
    }
}

/// One row of the calibration table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calibration {
    pub cpu: Cpu,
    /// Bus clock in Hz
    pub bus_hz: u32,
    /// Spins per half bus clock
    pub nops_per_half_cycle: u32,
}

const fn cal(cpu: Cpu, bus_hz: u32, nops_per_half_cycle: u32) -> Calibration {
    Calibration {
        cpu,
        bus_hz,
        nops_per_half_cycle,
    }
}

/// Half-cycle spin counts per (core, bus frequency)
pub const CALIBRATION: &[Calibration] = &[
    cal(Cpu::CortexM0Plus48MHz, 100_000, 20),
    cal(Cpu::CortexM0Plus48MHz, 400_000, 3),
    cal(Cpu::Rp2040, 100_000, 52),
    cal(Cpu::Rp2040, 400_000, 13),
    cal(Cpu::CortexM4_64MHz, 100_000, 27),
    cal(Cpu::CortexM4_64MHz, 400_000, 6),
    cal(Cpu::CortexM4_120MHz, 100_000, 50),
    cal(Cpu::CortexM4_120MHz, 400_000, 12),
    cal(Cpu::CortexM7_600MHz, 100_000, 250),
    cal(Cpu::CortexM7_600MHz, 400_000, 62),
    cal(Cpu::Esp32, 100_000, 100),
    cal(Cpu::Esp32, 400_000, 25),
    cal(Cpu::Host, 100_000, 0),
    cal(Cpu::Host, 400_000, 0),
];

/// Look up the half-cycle spin count for a core and bus frequency
pub fn half_cycle_nops(cpu: Cpu, bus_hz: u32) -> Option<u32> {
    CALIBRATION
        .iter()
        .find(|c| c.cpu == cpu && c.bus_hz == bus_hz)
        .map(|c| c.nops_per_half_cycle)
}

/// Cycles one iteration of [`spin`] costs, loop overhead included
const CYCLES_PER_SPIN: u32 = 4;

/// Burn `n` iterations of a counted `nop` loop
#[inline(always)]
pub fn spin(n: u32) {
    for _ in 0..n {
        #[cfg(feature = "cortex-m")]
        cortex_m::asm::nop();
        #[cfg(not(feature = "cortex-m"))]
        core::hint::spin_loop();
    }
}

/// Calibrated busy-wait
///
/// Implements `embedded_hal::delay::DelayNs` so drivers needing millisecond
/// waits can share it with the software buses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinDelay {
    nops_per_half_cycle: u32,
    spins_per_us: u32,
}

impl SpinDelay {
    /// Delay source for a core, with no bus half-cycle configured
    pub const fn new(cpu: Cpu) -> Self {
        Self {
            nops_per_half_cycle: 0,
            spins_per_us: cpu.core_hz() / 1_000_000 / CYCLES_PER_SPIN,
        }
    }

    /// Delay source for a software bus clocked at `bus_hz`
    ///
    /// Returns `InvalidParam` if the table has no entry for the pair.
    pub fn for_bus(cpu: Cpu, bus_hz: u32) -> Result<Self, Error> {
        let nops = half_cycle_nops(cpu, bus_hz).ok_or(Error::InvalidParam)?;
        Ok(Self {
            nops_per_half_cycle: nops,
            ..Self::new(cpu)
        })
    }

    /// Spins per bus half-cycle
    pub fn nops_per_half_cycle(&self) -> u32 {
        self.nops_per_half_cycle
    }

    /// Wait one bus half-cycle
    #[inline(always)]
    pub fn half_cycle(&self) {
        spin(self.nops_per_half_cycle);
    }

    /// Wait roughly `us` microseconds
    #[inline]
    pub fn spin_us(&self, us: u32) {
        spin(us.saturating_mul(self.spins_per_us));
    }
}

impl embedded_hal::delay::DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        let spins = (ns as u64 * self.spins_per_us as u64).div_ceil(1000);
        spin(spins.min(u32::MAX as u64) as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cortex_m0_standard_mode() {
        assert_eq!(half_cycle_nops(Cpu::CortexM0Plus48MHz, 100_000), Some(20));
    }

    #[test]
    fn test_faster_cores_spin_longer() {
        for bus in [100_000, 400_000] {
            let base = half_cycle_nops(Cpu::CortexM0Plus48MHz, bus).unwrap();
            for cpu in [Cpu::Rp2040, Cpu::CortexM4_120MHz, Cpu::CortexM7_600MHz] {
                assert!(half_cycle_nops(cpu, bus).unwrap() > base);
            }
        }
    }

    #[test]
    fn test_table_has_one_entry_per_pair() {
        for (i, a) in CALIBRATION.iter().enumerate() {
            for b in &CALIBRATION[i + 1..] {
                assert!(!(a.cpu == b.cpu && a.bus_hz == b.bus_hz));
            }
        }
    }

    #[test]
    fn test_unknown_frequency_rejected() {
        assert_eq!(
            SpinDelay::for_bus(Cpu::Rp2040, 1_000_000),
            Err(Error::InvalidParam)
        );
        let d = SpinDelay::for_bus(Cpu::Rp2040, 400_000).unwrap();
        assert_eq!(d.nops_per_half_cycle(), 13);
    }

    #[test]
    fn test_delay_ns_on_host_returns() {
        use embedded_hal::delay::DelayNs;
        let mut d = SpinDelay::new(Cpu::Host);
        d.delay_us(10);
        d.half_cycle();
    }
}
