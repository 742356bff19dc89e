//! Host stand-ins for the beacon's hardware seams
//!
//! Time is simulated: `SimClock` advances a shared counter instead of
//! sleeping, and the button and GPS mocks read the same counter, so a
//! whole control cycle runs instantly and deterministically.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use wspr_beacon::config::SynthCalibration;
use wspr_beacon::gps::FixSource;
use wspr_beacon::synth::{ClockOutput, DriveStrength, Synthesizer};
use wspr_beacon::timing::Clock;
use wspr_beacon::types::{GeoFix, UtcDate, UtcTime};

/// Shared simulated time in milliseconds
pub type SimTime = Rc<Cell<u64>>;

// =============================================================================
// Clock
// =============================================================================

/// Simulated clock; every delay can overshoot by a fixed latency
#[derive(Clone)]
pub struct SimClock {
    now: SimTime,
    latency_ms: u64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(ms: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(ms)),
            latency_ms: 0,
        }
    }

    /// Every delay returns `latency_ms` late
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn time(&self) -> SimTime {
        Rc::clone(&self.now)
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for SimClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.advance(u64::from(ms) + self.latency_ms);
    }
}

// =============================================================================
// Synthesizer
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SynthCall {
    Init,
    Drive(ClockOutput, DriveStrength),
    Frequency(u64, ClockOutput),
    Enable(ClockOutput, bool),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SynthFault;

/// Records every call; can fail on the n-th frequency write
#[derive(Default)]
pub struct MockSynth {
    pub calls: Vec<SynthCall>,
    pub fail_on_frequency: Option<usize>,
    frequency_writes: usize,
}

impl MockSynth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on_frequency(n: usize) -> Self {
        Self {
            fail_on_frequency: Some(n),
            ..Self::default()
        }
    }

    pub fn frequencies(&self) -> Vec<u64> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SynthCall::Frequency(f, _) => Some(*f),
                _ => None,
            })
            .collect()
    }
}

impl Synthesizer for MockSynth {
    type Error = SynthFault;

    async fn init(&mut self, _calibration: SynthCalibration) -> Result<(), SynthFault> {
        self.calls.push(SynthCall::Init);
        Ok(())
    }

    async fn set_drive_strength(
        &mut self,
        output: ClockOutput,
        drive: DriveStrength,
    ) -> Result<(), SynthFault> {
        self.calls.push(SynthCall::Drive(output, drive));
        Ok(())
    }

    async fn set_frequency(&mut self, centihertz: u64, output: ClockOutput) -> Result<(), SynthFault> {
        self.frequency_writes += 1;
        if self.fail_on_frequency == Some(self.frequency_writes) {
            return Err(SynthFault);
        }
        self.calls.push(SynthCall::Frequency(centihertz, output));
        Ok(())
    }

    async fn enable_output(&mut self, output: ClockOutput, enabled: bool) -> Result<(), SynthFault> {
        self.calls.push(SynthCall::Enable(output, enabled));
        Ok(())
    }
}

// =============================================================================
// GPIO
// =============================================================================

/// Output pin whose level can be observed from the test
#[derive(Clone, Default)]
pub struct MockLed {
    pub on: Rc<Cell<bool>>,
    pub rising_edges: Rc<Cell<u32>>,
}

impl MockLed {
    pub fn is_on(&self) -> bool {
        self.on.get()
    }

    pub fn blinks(&self) -> u32 {
        self.rising_edges.get()
    }
}

impl ErrorType for MockLed {
    type Error = Infallible;
}

impl OutputPin for MockLed {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.on.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        if !self.on.get() {
            self.rising_edges.set(self.rising_edges.get() + 1);
        }
        self.on.set(true);
        Ok(())
    }
}

/// Active-low button held down during scripted intervals `[start, end)`
#[derive(Clone)]
pub struct ScriptedButton {
    now: SimTime,
    holds: Rc<RefCell<Vec<(u64, u64)>>>,
}

impl ScriptedButton {
    pub fn new(now: SimTime) -> Self {
        Self {
            now,
            holds: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Hold the button from `start_ms` for `hold_ms`
    pub fn hold(&self, start_ms: u64, hold_ms: u64) {
        self.holds.borrow_mut().push((start_ms, start_ms + hold_ms));
    }

    fn pressed(&self) -> bool {
        let now = self.now.get();
        self.holds
            .borrow()
            .iter()
            .any(|&(start, end)| now >= start && now < end)
    }
}

impl ErrorType for ScriptedButton {
    type Error = Infallible;
}

impl InputPin for ScriptedButton {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(!self.pressed())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(self.pressed())
    }
}

// =============================================================================
// GPS
// =============================================================================

/// Receiver whose clock runs from `start` on simulated time
///
/// Like a real receiver the snapshot only moves when it is drained.
pub struct SimGps {
    now: SimTime,
    start: UtcTime,
    base: GeoFix,
    fix: GeoFix,
    /// Bytes credited per drain; zero simulates a silent receiver
    pub chars_per_drain: u32,
    pub drains: Rc<Cell<u32>>,
}

impl SimGps {
    pub fn new(now: SimTime, base: GeoFix) -> Self {
        Self {
            now,
            start: base.time,
            base,
            fix: base,
            chars_per_drain: 10,
            drains: Rc::new(Cell::new(0)),
        }
    }

    /// Valid London fix on 2024-03-15 starting at the given time
    pub fn london_at(now: SimTime, hour: u8, minute: u8, second: u8) -> Self {
        Self::new(
            now,
            GeoFix::at(
                51.5074,
                -0.1278,
                UtcDate::new(2024, 3, 15),
                UtcTime::new(hour, minute, second),
            ),
        )
    }

    /// Receiver that has not yet produced anything useful
    pub fn no_fix(now: SimTime) -> Self {
        Self::new(now, GeoFix::default())
    }

    pub fn drain_count(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.drains)
    }
}

impl FixSource for SimGps {
    fn drain(&mut self) {
        self.drains.set(self.drains.get() + 1);

        let start_s = u64::from(self.start.hour) * 3600
            + u64::from(self.start.minute) * 60
            + u64::from(self.start.second);
        let t = (start_s + self.now.get() / 1000) % 86_400;

        self.fix = self.base;
        self.fix.time = UtcTime::new((t / 3600) as u8, (t / 60 % 60) as u8, (t % 60) as u8);
        self.fix.chars_processed = self.drains.get().saturating_mul(self.chars_per_drain);
    }

    fn fix(&self) -> &GeoFix {
        &self.fix
    }
}
