//! Relative-cycle countdown sentinels.
//!
//! `nextEvent`/`nextMode`/`nextFrame` in the reference core are plain `i32`s
//! with `INT32_MAX` meaning "nothing scheduled." That scheme is kept here
//! (see `DESIGN.md`'s Open Question notes) because these three values are
//! combined with `min()` every time the scheduler recomputes its next
//! wakeup, and a numeric sentinel keeps that combination a single `i32::min`
//! call instead of an `Option` match. The decrement path is guarded against
//! underflow, which the reference leaves undocumented.

/// A relative cycle count until some event fires, or [`Countdown::NONE`] if
/// nothing is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown(i32);

impl Countdown {
    /// Sentinel meaning "not scheduled."
    pub const NONE: Countdown = Countdown(i32::MAX);

    pub fn scheduled(cycles: i32) -> Self {
        Countdown(cycles)
    }

    pub fn is_pending(self) -> bool {
        self != Self::NONE
    }

    pub fn get(self) -> i32 {
        self.0
    }

    /// `self` has fired (is due or overdue).
    pub fn due(self) -> bool {
        self.is_pending() && self.0 <= 0
    }

    /// Subtracts `delta` cycles, logging (and holding at the last good
    /// value) instead of wrapping if that would underflow `i32`.
    #[must_use]
    pub fn advance(self, delta: i32) -> Self {
        if self == Self::NONE {
            return self;
        }
        match self.0.checked_sub(delta) {
            Some(value) => Countdown(value),
            None => {
                log::error!(
                    "countdown underflow: {} - {delta} does not fit in i32; holding",
                    self.0
                );
                self
            }
        }
    }

    pub fn min(self, other: Countdown) -> Countdown {
        Countdown(self.0.min(other.0))
    }

    /// Reschedules a just-fired countdown to `base_len` cycles from now,
    /// folding in any overshoot (a negative remainder) so that a caller who
    /// invoked `process_events` with more cycles than were pending does not
    /// lose time: the next countdown is shortened by exactly the overshoot.
    #[must_use]
    pub fn reschedule(self, base_len: i32) -> Countdown {
        Countdown(base_len + self.0.min(0))
    }
}
