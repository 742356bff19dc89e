//! Transmission Scheduler
//!
//! The beacon's control state machine. Each control cycle the runner hands
//! it the button reading and the current fix; it updates its own context
//! (band, locator, state) and answers with a single [`Intent`] for the
//! runner to carry out. It never touches hardware.

use crate::beacon::band::BandState;
use crate::beacon::button::PressKind;
use crate::beacon::time_gate::{self, GateDecision};
use crate::locator::{compute_locator, Locator};
use crate::types::{GeoFix, UtcDate};

/// Scheduler state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SchedulerState {
    /// Clock trusted, waiting for the next slot
    #[default]
    Idle,
    /// No trustworthy time yet
    AwaitingFix,
    /// Inside a slot, transmission about to start
    Armed,
    /// Scheduled transmission on air
    Transmitting,
    /// Operator override: transmit back to back until reset
    ForcedTransmitting,
}

#[cfg(feature = "embedded")]
impl defmt::Format for SchedulerState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Idle => defmt::write!(f, "IDLE"),
            Self::AwaitingFix => defmt::write!(f, "AWAITING_FIX"),
            Self::Armed => defmt::write!(f, "ARMED"),
            Self::Transmitting => defmt::write!(f, "TX"),
            Self::ForcedTransmitting => defmt::write!(f, "FORCED_TX"),
        }
    }
}

/// Why a transmission is happening
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransmitKind {
    /// Slot-aligned
    Scheduled,
    /// Operator override
    Forced,
}

#[cfg(feature = "embedded")]
impl defmt::Format for TransmitKind {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Scheduled => defmt::write!(f, "scheduled"),
            Self::Forced => defmt::write!(f, "forced"),
        }
    }
}

/// What the runner should do this cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    /// Nothing
    NoOp,
    /// Toggle the liveness indicator
    Blink,
    /// Band changed; acknowledge with `ordinal` blinks
    AdvanceBand {
        /// New band, counted from 1
        ordinal: usize,
    },
    /// Encode and send one transmission
    Transmit(TransmitKind),
}

#[cfg(feature = "embedded")]
impl defmt::Format for Intent {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::NoOp => defmt::write!(f, "NoOp"),
            Self::Blink => defmt::write!(f, "Blink"),
            Self::AdvanceBand { ordinal } => defmt::write!(f, "AdvanceBand({})", ordinal),
            Self::Transmit(kind) => defmt::write!(f, "Transmit({})", kind),
        }
    }
}

/// Inputs for one control cycle
#[derive(Clone, Copy, Debug)]
pub struct CycleInput<'a> {
    /// Completed button press, if any
    pub press: Option<PressKind>,
    /// Current fix
    pub fix: &'a GeoFix,
}

/// A transmit slot: date, hour and the slot's even minute
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Slot {
    date: UtcDate,
    hour: u8,
    minute: u8,
}

impl Slot {
    const fn of(fix: &GeoFix) -> Self {
        Self {
            date: fix.date,
            hour: fix.time.hour,
            minute: fix.time.minute,
        }
    }
}

/// Scheduler context
#[derive(Clone, Debug)]
pub struct Scheduler {
    state: SchedulerState,
    band: BandState,
    locator: Locator,
    has_fix: bool,
    last_slot: Option<Slot>,
}

impl Scheduler {
    /// Start awaiting a fix on the given band with the default locator
    #[must_use]
    pub fn new(band: BandState) -> Self {
        Self {
            state: SchedulerState::AwaitingFix,
            band,
            locator: Locator::default(),
            has_fix: false,
            last_slot: None,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    /// Band selection
    #[must_use]
    pub const fn band(&self) -> &BandState {
        &self.band
    }

    /// Locator that will be sent (last computed, or the default)
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        &self.locator
    }

    /// The last cycle saw a valid fix
    #[must_use]
    pub const fn has_fix(&self) -> bool {
        self.has_fix
    }

    /// Forced mode is latched
    #[must_use]
    pub const fn is_forced(&self) -> bool {
        matches!(self.state, SchedulerState::ForcedTransmitting)
    }

    /// Run one control cycle's decision
    pub fn decide(&mut self, input: CycleInput<'_>) -> Intent {
        let mut band_intent = None;
        match input.press {
            Some(PressKind::Short) => {
                if !self.is_forced() {
                    info!("Forced transmission mode (reset to leave)");
                }
                self.state = SchedulerState::ForcedTransmitting;
            }
            Some(PressKind::Long) => {
                self.band.advance();
                info!("{}", self.band);
                band_intent = Some(Intent::AdvanceBand {
                    ordinal: self.band.ordinal(),
                });
            }
            None => {}
        }

        self.update_fix(input.fix);

        if let Some(intent) = band_intent {
            return intent;
        }
        if self.is_forced() {
            return Intent::Transmit(TransmitKind::Forced);
        }

        match time_gate::evaluate(input.fix) {
            GateDecision::Transmit => {
                let slot = Slot::of(input.fix);
                if self.last_slot == Some(slot) {
                    self.settle();
                    Intent::NoOp
                } else {
                    self.last_slot = Some(slot);
                    self.state = SchedulerState::Armed;
                    Intent::Transmit(TransmitKind::Scheduled)
                }
            }
            GateDecision::Hold => {
                self.settle();
                Intent::NoOp
            }
            GateDecision::NoDecision => {
                self.state = SchedulerState::AwaitingFix;
                Intent::Blink
            }
        }
    }

    /// The runner is about to key the transmitter
    pub fn transmission_started(&mut self) {
        if self.state == SchedulerState::Armed {
            self.state = SchedulerState::Transmitting;
        }
    }

    /// The transmission has ended (completed or failed)
    pub fn transmission_finished(&mut self) {
        if !self.is_forced() {
            self.settle();
        }
    }

    fn settle(&mut self) {
        self.state = if self.has_fix {
            SchedulerState::Idle
        } else {
            SchedulerState::AwaitingFix
        };
    }

    fn update_fix(&mut self, fix: &GeoFix) {
        if fix.valid {
            let locator = compute_locator(fix.latitude, fix.longitude);
            if locator != self.locator {
                info!("Locator: {}", locator);
                self.locator = locator;
            }
        }
        self.has_fix = fix.valid;
    }
}
