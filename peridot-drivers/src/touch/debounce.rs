//! Touch debouncer
//!
//! Resistive panels bounce on contact and release, and a single sample may
//! read pressed while the finger is still hovering. The debouncer buffers a
//! candidate sample and only reports it once the same state has been read
//! [`STABLE_READS`] times in a row.
//!
//! ```text
//! samples:  P(100,100)  P(100,100)  R      R
//! count:    1           2           1      2
//! events:   -           Pressed     -      Released
//! ```

use super::fourwire::TouchSample;

/// Consecutive matching reads before a state is reported
pub const STABLE_READS: u8 = 2;

/// Largest per-axis jitter still counted as the same position
pub const DEFAULT_TOLERANCE: u16 = 4;

/// Debounced touch event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TouchEvent {
    Pressed { x: u16, y: u16 },
    /// Still pressed, at a new position
    Moved { x: u16, y: u16 },
    Released,
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    tolerance: u16,
    candidate: Option<TouchSample>,
    count: u8,
    /// Last reported state; `None` until the first report
    reported: Option<TouchSample>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl Debouncer {
    pub const fn new(tolerance: u16) -> Self {
        Self {
            tolerance,
            candidate: None,
            count: 0,
            reported: None,
        }
    }

    /// Forget all history
    pub fn reset(&mut self) {
        self.candidate = None;
        self.count = 0;
        self.reported = None;
    }

    /// Whether the last reported state was pressed
    pub fn is_pressed(&self) -> bool {
        self.reported.is_some_and(|s| s.pressed)
    }

    /// Feed one raw sample; returns an event when a new state settles
    pub fn update(&mut self, sample: TouchSample) -> Option<TouchEvent> {
        match self.candidate {
            Some(c) if self.same(&c, &sample) => {
                self.count = self.count.saturating_add(1);
            }
            _ => {
                self.candidate = Some(sample);
                self.count = 1;
            }
        }

        if self.count != STABLE_READS {
            return None;
        }
        let settled = self.candidate?;

        let event = match self.reported {
            Some(prev) if prev.pressed == settled.pressed => {
                if settled.pressed && !self.same(&prev, &settled) {
                    Some(TouchEvent::Moved {
                        x: settled.x,
                        y: settled.y,
                    })
                } else {
                    None
                }
            }
            _ if settled.pressed => Some(TouchEvent::Pressed {
                x: settled.x,
                y: settled.y,
            }),
            _ => Some(TouchEvent::Released),
        };

        if event.is_some() {
            self.reported = Some(settled);
        }
        event
    }

    fn same(&self, a: &TouchSample, b: &TouchSample) -> bool {
        if a.pressed != b.pressed {
            return false;
        }
        // Released samples carry no meaningful position
        !a.pressed
            || (a.x.abs_diff(b.x) <= self.tolerance && a.y.abs_diff(b.y) <= self.tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::vec::Vec;

    fn press(x: u16, y: u16) -> TouchSample {
        TouchSample {
            x,
            y,
            z: 400,
            pressed: true,
        }
    }

    fn release() -> TouchSample {
        TouchSample::default()
    }

    fn run(d: &mut Debouncer, samples: &[TouchSample]) -> Vec<TouchEvent> {
        samples.iter().filter_map(|s| d.update(*s)).collect()
    }

    #[test]
    fn test_press_then_release() {
        let mut d = Debouncer::default();
        let events = run(
            &mut d,
            &[press(100, 100), press(100, 100), release(), release()],
        );
        assert_eq!(
            events,
            [TouchEvent::Pressed { x: 100, y: 100 }, TouchEvent::Released]
        );
        assert!(!d.is_pressed());
    }

    #[test]
    fn test_no_emission_until_second_read() {
        let mut d = Debouncer::default();
        assert_eq!(d.update(press(10, 10)), None);
        assert_eq!(d.update(press(12, 9)), Some(TouchEvent::Pressed { x: 10, y: 10 }));
        assert!(d.is_pressed());
    }

    #[test]
    fn test_jitter_within_tolerance_is_silent() {
        let mut d = Debouncer::default();
        let events = run(
            &mut d,
            &[press(50, 50), press(51, 50), press(54, 46), press(50, 53)],
        );
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_drag_reports_moves() {
        let mut d = Debouncer::default();
        let events = run(
            &mut d,
            &[press(50, 50), press(50, 50), press(80, 50), press(81, 51)],
        );
        assert_eq!(
            events,
            [
                TouchEvent::Pressed { x: 50, y: 50 },
                TouchEvent::Moved { x: 80, y: 50 }
            ]
        );
    }

    #[test]
    fn test_transient_release_suppressed() {
        let mut d = Debouncer::default();
        let events = run(
            &mut d,
            &[press(5, 5), press(5, 5), release(), press(5, 5), press(5, 5)],
        );
        assert_eq!(events, [TouchEvent::Pressed { x: 5, y: 5 }]);
    }

    #[test]
    fn test_reset() {
        let mut d = Debouncer::default();
        run(&mut d, &[press(5, 5), press(5, 5)]);
        d.reset();
        assert!(!d.is_pressed());
        assert_eq!(d.update(press(5, 5)), None);
    }

    proptest! {
        #[test]
        fn prop_constant_input_emits_once(
            x in 0u16..1024,
            y in 0u16..1024,
            pressed in any::<bool>(),
            n in 2usize..20,
        ) {
            let sample = TouchSample { x, y, z: 0, pressed };
            let mut d = Debouncer::default();
            let events: Vec<(usize, TouchEvent)> = (0..n)
                .filter_map(|i| d.update(sample).map(|e| (i, e)))
                .collect();
            prop_assert_eq!(events.len(), 1);
            prop_assert_eq!(events[0].0, 1);
        }

        #[test]
        fn prop_single_transient_suppressed(
            x in 0u16..1024,
            y in 0u16..1024,
            pressed in any::<bool>(),
            tail in 2usize..10,
        ) {
            let stable = TouchSample { x, y, z: 0, pressed };
            let glitch = TouchSample { pressed: !pressed, ..stable };
            let mut d = Debouncer::default();
            let mut samples = vec![stable, stable, glitch];
            samples.extend(std::iter::repeat(stable).take(tail));
            prop_assert_eq!(run(&mut d, &samples).len(), 1);
        }
    }
}
