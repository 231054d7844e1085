//! GPIO pin abstractions
//!
//! Provides traits for digital input and output pins that can be implemented
//! by chip-specific HALs, plus the open-drain primitive used by the
//! bit-banged buses.
//!
//! Software I2C and 1-Wire switch a pin between output-low and
//! input-pulled-high several times per bit. Those paths go through
//! [`OpenDrainPin`], whose methods are small enough to inline into the bit
//! loop; no trait objects are involved.

/// Pin configuration modes a platform exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    /// Push-pull output
    Output,
    /// Floating input (high impedance)
    Input,
    /// Input with internal pull-up
    InputPullUp,
    /// Input with internal pull-down
    InputPullDown,
}

impl PinMode {
    /// True for any of the input modes
    pub fn is_input(&self) -> bool {
        !matches!(self, PinMode::Output)
    }
}

/// Digital output pin
///
/// Implementations should handle the actual hardware register manipulation
/// for the specific chip.
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Set the pin to a specific state
    #[inline]
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }
}

/// Digital input pin
pub trait InputPin {
    /// Check if the pin reads high (logic 1)
    fn is_high(&self) -> bool;

    /// Check if the pin reads low (logic 0)
    #[inline]
    fn is_low(&self) -> bool {
        !self.is_high()
    }
}

/// Pin that can be reconfigured between input and output at runtime
///
/// Mode changes must complete within the pin's setup time so that
/// protocols switching mode inside one bit slot keep their timing.
pub trait FlexPin: OutputPin + InputPin {
    /// Switch the pin to `mode`
    fn set_mode(&mut self, mode: PinMode);

    /// Currently configured mode
    fn mode(&self) -> PinMode;
}

/// Open-drain line: either pulled low or released to the pull-up
///
/// Models I2C and 1-Wire electrically. A released line reads high unless
/// another device on the wire holds it low.
pub trait OpenDrainPin {
    /// Actively drive the line low
    fn drive_low(&mut self);

    /// Release the line (high impedance, pulled up externally or internally)
    fn release(&mut self);

    /// Sample the line level
    fn is_high(&self) -> bool;

    /// Sample the line level, inverted
    #[inline(always)]
    fn is_low(&self) -> bool {
        !self.is_high()
    }
}

/// Open-drain emulation over a reconfigurable pin
///
/// Driving low switches the pin to output-low; releasing switches it to
/// input with pull-up. Used on platforms whose GPIO block has no native
/// open-drain mode.
pub struct OpenDrain<P> {
    pin: P,
}

impl<P: FlexPin> OpenDrain<P> {
    /// Wrap a pin, leaving the line released
    pub fn new(mut pin: P) -> Self {
        pin.set_mode(PinMode::InputPullUp);
        Self { pin }
    }

    /// Current mode of the underlying pin
    pub fn mode(&self) -> PinMode {
        self.pin.mode()
    }

    /// Give the pin back
    pub fn release_pin(self) -> P {
        self.pin
    }
}

impl<P: FlexPin> OpenDrainPin for OpenDrain<P> {
    #[inline(always)]
    fn drive_low(&mut self) {
        // Latch low before enabling the driver so the line never glitches high
        self.pin.set_low();
        self.pin.set_mode(PinMode::Output);
    }

    #[inline(always)]
    fn release(&mut self) {
        self.pin.set_mode(PinMode::InputPullUp);
    }

    #[inline(always)]
    fn is_high(&self) -> bool {
        self.pin.is_high()
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;

    /// Flex pin whose input level follows its own output when driven,
    /// and an external level when floating
    pub struct MockFlexPin {
        pub mode: PinMode,
        pub out_high: bool,
        pub external_high: bool,
        pub mode_changes: usize,
    }

    impl MockFlexPin {
        pub fn new() -> Self {
            Self {
                mode: PinMode::Input,
                out_high: false,
                external_high: true,
                mode_changes: 0,
            }
        }
    }

    impl OutputPin for MockFlexPin {
        fn set_high(&mut self) {
            self.out_high = true;
        }

        fn set_low(&mut self) {
            self.out_high = false;
        }
    }

    impl InputPin for MockFlexPin {
        fn is_high(&self) -> bool {
            match self.mode {
                PinMode::Output => self.out_high,
                PinMode::InputPullUp => self.external_high,
                PinMode::InputPullDown => false,
                PinMode::Input => self.external_high,
            }
        }
    }

    impl FlexPin for MockFlexPin {
        fn set_mode(&mut self, mode: PinMode) {
            self.mode = mode;
            self.mode_changes += 1;
        }

        fn mode(&self) -> PinMode {
            self.mode
        }
    }
}
