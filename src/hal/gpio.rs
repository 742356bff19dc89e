//! GPIO Abstractions
//!
//! Pin setup for the operator button and the three status LEDs. Embassy's
//! pin types implement the `embedded-hal` digital traits the runner is
//! written against.

use embassy_stm32::gpio::{Input, Level, Output, Pin, Pull, Speed};
use embassy_stm32::Peripheral;

use crate::beacon::runner::StatusLeds;

/// Status LED output (initially off)
#[must_use]
pub fn status_led<'d>(pin: impl Peripheral<P = impl Pin> + 'd) -> Output<'d> {
    Output::new(pin, Level::Low, Speed::Low)
}

/// Operator button: active low with internal pull-up
#[must_use]
pub fn operator_button<'d>(pin: impl Peripheral<P = impl Pin> + 'd) -> Input<'d> {
    Input::new(pin, Pull::Up)
}

/// The fix, time and transmit indicators
#[must_use]
pub fn status_leds<'d>(
    fix: impl Peripheral<P = impl Pin> + 'd,
    time: impl Peripheral<P = impl Pin> + 'd,
    tx: impl Peripheral<P = impl Pin> + 'd,
) -> StatusLeds<Output<'d>> {
    StatusLeds {
        fix: status_led(fix),
        time: status_led(time),
        tx: status_led(tx),
    }
}
