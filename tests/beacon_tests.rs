//! Beacon Control Tests
//!
//! Band selection, the time gate, button timing and the scheduler's
//! state machine.
//! Run with: cargo test --target x86_64-unknown-linux-gnu --no-default-features --features std --test beacon_tests

mod common;

use common::{ScriptedButton, SimClock};
use embassy_futures::block_on;

use wspr_beacon::beacon::band::BandState;
use wspr_beacon::beacon::button::{ButtonClassifier, ButtonSample, PressKind, PressOutcome};
use wspr_beacon::beacon::scheduler::{CycleInput, Intent, Scheduler, SchedulerState, TransmitKind};
use wspr_beacon::beacon::time_gate::{evaluate, is_plausible, should_transmit_now, GateDecision};
use wspr_beacon::config::{band_plan, DEFAULT_BAND_INDEX};
use wspr_beacon::timing::CancelToken;
use wspr_beacon::types::{GeoFix, UtcDate, UtcTime};

fn bands() -> BandState {
    BandState::new(band_plan(), DEFAULT_BAND_INDEX).unwrap()
}

fn london(hour: u8, minute: u8, second: u8) -> GeoFix {
    GeoFix::at(
        51.5074,
        -0.1278,
        UtcDate::new(2024, 3, 15),
        UtcTime::new(hour, minute, second),
    )
}

fn cycle(scheduler: &mut Scheduler, press: Option<PressKind>, fix: &GeoFix) -> Intent {
    scheduler.decide(CycleInput { press, fix })
}

// =============================================================================
// Band Selection Tests
// =============================================================================

#[test]
fn test_band_cycle_wraps() {
    let mut band = bands();
    assert_eq!(band.index(), 2);
    assert_eq!(band.current().as_hz(), 14_095_600);

    let visited: Vec<usize> = (0..band.len()).map(|_| band.advance()).collect();
    assert_eq!(visited, vec![3, 4, 0, 1, 2]);
    assert_eq!(band.current().as_hz(), 14_095_600);
}

#[test]
fn test_band_ordinal() {
    let mut band = bands();
    assert_eq!(band.ordinal(), 3);
    band.advance();
    band.advance();
    band.advance();
    assert_eq!(band.index(), 0);
    assert_eq!(band.ordinal(), 1);
}

#[test]
fn test_band_rejects_bad_index() {
    assert!(BandState::new(band_plan(), 5).is_none());
    assert!(BandState::new(heapless::Vec::new(), 0).is_none());
}

// =============================================================================
// Time Gate Tests
// =============================================================================

#[test]
fn test_gate_window() {
    assert_eq!(should_transmit_now(&london(10, 0, 0)), Some(true));
    assert_eq!(should_transmit_now(&london(10, 0, 1)), Some(true));
    assert_eq!(should_transmit_now(&london(10, 0, 2)), Some(false));
    assert_eq!(should_transmit_now(&london(10, 1, 0)), Some(false));
    assert_eq!(should_transmit_now(&london(23, 58, 1)), Some(true));
}

#[test]
fn test_gate_ignores_position_validity() {
    let mut fix = london(10, 0, 0);
    fix.valid = false;
    assert_eq!(evaluate(&fix), GateDecision::Transmit);
}

#[test]
fn test_gate_implausible_year() {
    let mut fix = london(10, 0, 0);
    fix.date = UtcDate::new(2000, 1, 1);
    assert_eq!(should_transmit_now(&fix), None);
    fix.date = UtcDate::new(2080, 1, 1);
    assert_eq!(evaluate(&fix), GateDecision::NoDecision);
    assert_eq!(evaluate(&GeoFix::default()), GateDecision::NoDecision);
}

#[test]
fn test_plausible_bounds() {
    assert!(!is_plausible(&UtcDate::new(1999, 12, 31)));
    assert!(is_plausible(&UtcDate::new(2001, 1, 1)));
    assert!(is_plausible(&UtcDate::new(2079, 12, 31)));
    assert!(!is_plausible(&UtcDate::new(2080, 1, 1)));
}

// =============================================================================
// Button Tests
// =============================================================================

#[test]
fn test_button_not_pressed() {
    let mut clock = SimClock::new();
    let mut button = ScriptedButton::new(clock.time());
    let mut classifier = ButtonClassifier::new();

    let outcome = block_on(classifier.measure(&mut button, &mut clock, &CancelToken::new(), || {}));

    assert_eq!(outcome, PressOutcome::Idle);
    assert_eq!(clock.time().get(), 0);
}

#[test]
fn test_button_short_press() {
    let mut clock = SimClock::new();
    let mut button = ScriptedButton::new(clock.time());
    button.hold(0, 300);
    let mut classifier = ButtonClassifier::new();

    let outcome = block_on(classifier.measure(&mut button, &mut clock, &CancelToken::new(), || {}));

    assert_eq!(outcome, PressOutcome::Pressed(ButtonSample { hold_ms: 300 }));
    assert_eq!(outcome.press(), Some(PressKind::Short));
}

#[test]
fn test_button_long_press() {
    let mut clock = SimClock::new();
    let mut button = ScriptedButton::new(clock.time());
    button.hold(0, 750);
    let mut classifier = ButtonClassifier::new();

    let outcome = block_on(classifier.measure(&mut button, &mut clock, &CancelToken::new(), || {}));

    assert_eq!(outcome.press(), Some(PressKind::Long));
}

#[test]
fn test_button_threshold_resolved_to_the_millisecond() {
    let mut clock = SimClock::new();
    let time = clock.time();
    let mut button = ScriptedButton::new(clock.time());
    button.hold(0, 499);
    button.hold(1_000, 500);
    let mut classifier = ButtonClassifier::new();
    let cancel = CancelToken::new();

    let outcome = block_on(classifier.measure(&mut button, &mut clock, &cancel, || {}));
    assert_eq!(outcome, PressOutcome::Pressed(ButtonSample { hold_ms: 499 }));
    assert_eq!(outcome.press(), Some(PressKind::Short));

    time.set(1_000);
    let outcome = block_on(classifier.measure(&mut button, &mut clock, &cancel, || {}));
    assert_eq!(outcome, PressOutcome::Pressed(ButtonSample { hold_ms: 500 }));
    assert_eq!(outcome.press(), Some(PressKind::Long));
}

#[test]
fn test_button_idle_runs_while_held() {
    let mut clock = SimClock::new();
    let mut button = ScriptedButton::new(clock.time());
    button.hold(0, 100);
    let mut classifier = ButtonClassifier::new();
    let mut polls = 0;

    block_on(classifier.measure(&mut button, &mut clock, &CancelToken::new(), || polls += 1));

    // One poll per millisecond over a 100 ms hold
    assert!(polls >= 100);
}

#[test]
fn test_button_stuck_until_released() {
    let mut clock = SimClock::new();
    let time = clock.time();
    let mut button = ScriptedButton::new(clock.time());
    button.hold(0, 20_000);
    button.hold(30_000, 200);
    let mut classifier = ButtonClassifier::new();
    let cancel = CancelToken::new();

    let outcome = block_on(classifier.measure(&mut button, &mut clock, &cancel, || {}));
    assert_eq!(outcome, PressOutcome::Stuck);
    assert_eq!(outcome.press(), None);
    assert!(classifier.is_stuck());
    assert_eq!(time.get(), 10_000);

    // Still held: ignored without waiting
    let outcome = block_on(classifier.measure(&mut button, &mut clock, &cancel, || {}));
    assert_eq!(outcome, PressOutcome::Idle);
    assert_eq!(time.get(), 10_000);

    // Released
    time.set(25_000);
    let outcome = block_on(classifier.measure(&mut button, &mut clock, &cancel, || {}));
    assert_eq!(outcome, PressOutcome::Idle);
    assert!(!classifier.is_stuck());

    // A fresh press counts again
    time.set(30_000);
    let outcome = block_on(classifier.measure(&mut button, &mut clock, &cancel, || {}));
    assert_eq!(outcome.press(), Some(PressKind::Short));
}

#[test]
fn test_button_cancelled() {
    let mut clock = SimClock::new();
    let mut button = ScriptedButton::new(clock.time());
    button.hold(0, 5_000);
    let mut classifier = ButtonClassifier::new();
    let cancel = CancelToken::new();
    cancel.cancel();

    let outcome = block_on(classifier.measure(&mut button, &mut clock, &cancel, || {}));

    assert_eq!(outcome, PressOutcome::Idle);
    assert!(!classifier.is_stuck());
}

// =============================================================================
// Scheduler Tests
// =============================================================================

#[test]
fn test_scheduler_starts_awaiting_fix() {
    let scheduler = Scheduler::new(bands());
    assert_eq!(scheduler.state(), SchedulerState::AwaitingFix);
    assert_eq!(scheduler.locator().as_str(), "AA00");
    assert!(!scheduler.has_fix());
    assert!(!scheduler.is_forced());
}

#[test]
fn test_scheduled_transmission_lifecycle() {
    let mut scheduler = Scheduler::new(bands());

    let intent = cycle(&mut scheduler, None, &london(10, 0, 0));
    assert_eq!(intent, Intent::Transmit(TransmitKind::Scheduled));
    assert_eq!(scheduler.state(), SchedulerState::Armed);
    assert_eq!(scheduler.locator().as_str(), "IO91");

    scheduler.transmission_started();
    assert_eq!(scheduler.state(), SchedulerState::Transmitting);
    scheduler.transmission_finished();
    assert_eq!(scheduler.state(), SchedulerState::Idle);
}

#[test]
fn test_one_transmission_per_slot() {
    let mut scheduler = Scheduler::new(bands());

    assert_eq!(
        cycle(&mut scheduler, None, &london(10, 0, 0)),
        Intent::Transmit(TransmitKind::Scheduled)
    );
    scheduler.transmission_finished();

    assert_eq!(cycle(&mut scheduler, None, &london(10, 0, 1)), Intent::NoOp);
    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(cycle(&mut scheduler, None, &london(10, 1, 30)), Intent::NoOp);
    assert_eq!(
        cycle(&mut scheduler, None, &london(10, 2, 0)),
        Intent::Transmit(TransmitKind::Scheduled)
    );
}

#[test]
fn test_same_minute_next_day_transmits() {
    let mut scheduler = Scheduler::new(bands());
    cycle(&mut scheduler, None, &london(10, 0, 0));
    scheduler.transmission_finished();

    let mut tomorrow = london(10, 0, 0);
    tomorrow.date = UtcDate::new(2024, 3, 16);
    assert_eq!(
        cycle(&mut scheduler, None, &tomorrow),
        Intent::Transmit(TransmitKind::Scheduled)
    );
}

#[test]
fn test_implausible_time_blinks() {
    let mut scheduler = Scheduler::new(bands());

    assert_eq!(cycle(&mut scheduler, None, &GeoFix::default()), Intent::Blink);
    assert_eq!(scheduler.state(), SchedulerState::AwaitingFix);

    // Time becomes good outside a window
    assert_eq!(cycle(&mut scheduler, None, &london(10, 1, 0)), Intent::NoOp);
    assert_eq!(scheduler.state(), SchedulerState::Idle);
}

#[test]
fn test_short_press_forces_without_fix() {
    let mut scheduler = Scheduler::new(bands());
    let nothing = GeoFix::default();

    let intent = cycle(&mut scheduler, Some(PressKind::Short), &nothing);
    assert_eq!(intent, Intent::Transmit(TransmitKind::Forced));
    assert_eq!(scheduler.state(), SchedulerState::ForcedTransmitting);
    assert_eq!(scheduler.locator().as_str(), "AA00");

    scheduler.transmission_started();
    scheduler.transmission_finished();
    assert!(scheduler.is_forced());

    // Latched: keeps going without further presses, at any time
    assert_eq!(
        cycle(&mut scheduler, None, &london(10, 1, 17)),
        Intent::Transmit(TransmitKind::Forced)
    );
    // Position is still tracked
    assert_eq!(scheduler.locator().as_str(), "IO91");
}

#[test]
fn test_long_press_advances_band() {
    let mut scheduler = Scheduler::new(bands());

    let intent = cycle(&mut scheduler, Some(PressKind::Long), &london(10, 1, 0));
    assert_eq!(intent, Intent::AdvanceBand { ordinal: 4 });
    assert_eq!(scheduler.band().current().as_hz(), 18_104_600);
}

#[test]
fn test_band_change_defers_slot() {
    let mut scheduler = Scheduler::new(bands());

    // The acknowledgement takes this cycle; the slot is still open next cycle
    let intent = cycle(&mut scheduler, Some(PressKind::Long), &london(10, 0, 0));
    assert_eq!(intent, Intent::AdvanceBand { ordinal: 4 });
    assert_eq!(
        cycle(&mut scheduler, None, &london(10, 0, 1)),
        Intent::Transmit(TransmitKind::Scheduled)
    );
}

#[test]
fn test_long_press_in_forced_mode() {
    let mut scheduler = Scheduler::new(bands());
    cycle(&mut scheduler, Some(PressKind::Short), &GeoFix::default());

    let intent = cycle(&mut scheduler, Some(PressKind::Long), &GeoFix::default());
    assert_eq!(intent, Intent::AdvanceBand { ordinal: 4 });
    assert!(scheduler.is_forced());
}

#[test]
fn test_lost_fix_keeps_last_locator() {
    let mut scheduler = Scheduler::new(bands());
    cycle(&mut scheduler, None, &london(10, 1, 0));
    assert!(scheduler.has_fix());

    let mut elsewhere = london(10, 1, 30);
    elsewhere.latitude = -33.87;
    elsewhere.longitude = 151.21;
    elsewhere.valid = false;
    assert_eq!(cycle(&mut scheduler, None, &elsewhere), Intent::NoOp);
    assert!(!scheduler.has_fix());
    assert_eq!(scheduler.locator().as_str(), "IO91");
    assert_eq!(scheduler.state(), SchedulerState::AwaitingFix);

    // Time alone still opens the slot
    let mut slot = elsewhere;
    slot.time = UtcTime::new(10, 2, 0);
    assert_eq!(
        cycle(&mut scheduler, None, &slot),
        Intent::Transmit(TransmitKind::Scheduled)
    );
    scheduler.transmission_finished();
    assert_eq!(scheduler.state(), SchedulerState::AwaitingFix);
}

#[test]
fn test_locator_follows_movement() {
    let mut scheduler = Scheduler::new(bands());
    cycle(&mut scheduler, None, &london(10, 1, 0));

    let mut sydney = london(10, 1, 10);
    sydney.latitude = -33.87;
    sydney.longitude = 151.21;
    cycle(&mut scheduler, None, &sydney);
    assert_eq!(scheduler.locator().as_str(), "QF56");
}
