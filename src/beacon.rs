//! Beacon Control Logic
//!
//! State machines and decision logic for the beacon. Everything except
//! [`runner`] is free of hardware side effects and can be exercised on the
//! host.

pub mod band;
pub mod button;
pub mod emitter;
pub mod runner;
pub mod scheduler;
pub mod time_gate;
