//! Transmission Time Gate
//!
//! WSPR transmissions start one second into an even UTC minute. The gate
//! only trusts the receiver's clock once it reports a plausible year, which
//! filters out the default date an unsynchronised receiver sends.

use crate::config::{SLOT_MINUTES, SLOT_WINDOW_SECONDS, YEAR_MAX_EXCLUSIVE, YEAR_MIN_EXCLUSIVE};
use crate::types::{GeoFix, UtcDate};

/// Outcome of checking the clock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    /// Inside a transmit window
    Transmit,
    /// Time is good but outside a window
    Hold,
    /// Time is not trustworthy
    NoDecision,
}

#[cfg(feature = "embedded")]
impl defmt::Format for GateDecision {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Transmit => defmt::write!(f, "Transmit"),
            Self::Hold => defmt::write!(f, "Hold"),
            Self::NoDecision => defmt::write!(f, "NoDecision"),
        }
    }
}

/// Whether the date can be trusted
#[must_use]
pub const fn is_plausible(date: &UtcDate) -> bool {
    date.year > YEAR_MIN_EXCLUSIVE && date.year < YEAR_MAX_EXCLUSIVE
}

/// Check the fix's clock against the transmit schedule
#[must_use]
pub const fn evaluate(fix: &GeoFix) -> GateDecision {
    if !is_plausible(&fix.date) {
        return GateDecision::NoDecision;
    }
    if fix.time.minute % SLOT_MINUTES == 0 && fix.time.second <= SLOT_WINDOW_SECONDS {
        GateDecision::Transmit
    } else {
        GateDecision::Hold
    }
}

/// `Some(true)` inside a window, `Some(false)` outside, None when the time
/// is implausible
#[must_use]
pub const fn should_transmit_now(fix: &GeoFix) -> Option<bool> {
    match evaluate(fix) {
        GateDecision::Transmit => Some(true),
        GateDecision::Hold => Some(false),
        GateDecision::NoDecision => None,
    }
}
