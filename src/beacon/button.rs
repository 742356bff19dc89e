//! Operator Button
//!
//! One active-low push button. A press is timed from the first low sample
//! to release and classified by how long it was held.

use embedded_hal::digital::InputPin;

use crate::config::{BUTTON_MAX_HOLD_MS, BUTTON_POLL_MS, LONG_PRESS_MS};
use crate::timing::{poll_until, CancelToken, Clock, PollOutcome};

/// What a press asks for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressKind {
    /// Force continuous transmission
    Short,
    /// Advance to the next band
    Long,
}

#[cfg(feature = "embedded")]
impl defmt::Format for PressKind {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Short => defmt::write!(f, "short"),
            Self::Long => defmt::write!(f, "long"),
        }
    }
}

/// Classify a hold duration; the threshold itself counts as long
#[must_use]
pub const fn classify(hold_ms: u64) -> PressKind {
    if hold_ms < LONG_PRESS_MS as u64 {
        PressKind::Short
    } else {
        PressKind::Long
    }
}

/// One completed press-and-release
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonSample {
    /// Time from first low sample to release
    pub hold_ms: u64,
}

impl ButtonSample {
    /// Classification of this press
    #[must_use]
    pub const fn kind(self) -> PressKind {
        classify(self.hold_ms)
    }
}

/// Result of sampling the button once
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressOutcome {
    /// Not pressed, or the measurement was cancelled
    Idle,
    /// Pressed and released
    Pressed(ButtonSample),
    /// Held past `BUTTON_MAX_HOLD_MS`; ignored until released
    Stuck,
}

impl PressOutcome {
    /// The press to act on, if any
    #[must_use]
    pub const fn press(self) -> Option<PressKind> {
        match self {
            Self::Pressed(sample) => Some(sample.kind()),
            Self::Idle | Self::Stuck => None,
        }
    }
}

/// Times button presses
#[derive(Clone, Copy, Debug, Default)]
pub struct ButtonClassifier {
    /// A stuck hold has been reported and the button is still down
    stuck: bool,
}

impl ButtonClassifier {
    /// Create a classifier
    #[must_use]
    pub const fn new() -> Self {
        Self { stuck: false }
    }

    /// Whether the last measurement ended in a stuck hold
    #[must_use]
    pub const fn is_stuck(&self) -> bool {
        self.stuck
    }

    /// Sample the button and, if it is down, wait for release
    ///
    /// `idle` runs on every poll while the button is held (the caller
    /// drains the GPS stream there). Read errors count as released.
    pub async fn measure<P, C, F>(
        &mut self,
        pin: &mut P,
        clock: &mut C,
        cancel: &CancelToken,
        mut idle: F,
    ) -> PressOutcome
    where
        P: InputPin,
        C: Clock,
        F: FnMut(),
    {
        let pressed = pin.is_low().unwrap_or(false);
        if self.stuck {
            self.stuck = pressed;
            return PressOutcome::Idle;
        }
        if !pressed {
            return PressOutcome::Idle;
        }

        let outcome = poll_until(clock, BUTTON_MAX_HOLD_MS, BUTTON_POLL_MS, cancel, || {
            idle();
            !pin.is_low().unwrap_or(false)
        })
        .await;

        match outcome {
            PollOutcome::Satisfied { elapsed_ms } => {
                let sample = ButtonSample {
                    hold_ms: elapsed_ms,
                };
                debug!("Button: {} press ({}ms)", sample.kind(), elapsed_ms);
                PressOutcome::Pressed(sample)
            }
            PollOutcome::TimedOut { elapsed_ms } => {
                warn!("Button: held for {}ms, ignoring until released", elapsed_ms);
                self.stuck = true;
                PressOutcome::Stuck
            }
            PollOutcome::Cancelled { .. } => PressOutcome::Idle,
        }
    }
}
