//! WSPR Beacon Firmware Library
//!
//! This library provides the control core of a GPS-disciplined WSPR beacon
//! built on an STM32G474 and an `Si5351A` clock synthesizer. It decides
//! when to transmit, which grid locator to report and how to key the
//! synthesizer through the 162-symbol message with accurate symbol timing.
//!
//! # Architecture
//!
//! The firmware is organized in layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    APPLICATION LAYER                         │
//! │  Beacon Runner (effects)  │  Scheduler  │  Time Gate         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      CORE LAYER                              │
//! │  Locator  │  WSPR Encoder  │  NMEA Parser  │  Freq. Planning  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   HAL / DRIVER LAYER                         │
//! │  I2C  │  Si5351A  │  USART (GPS)  │  GPIO  │  Timer           │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    RTOS / SCHEDULER                          │
//! │           embassy-rs (async/await executor)                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Decisions without effects**: the scheduler returns an intent, the
//!   runner carries it out
//! - **Type-driven design**: Custom types enforce invariants at construction
//! - **No unsafe in application code**
//! - **Bounded waits**: every wait has a timeout and keeps the GPS drained
//! - **Explicit error handling**: All fallible operations return `Result`

#![cfg_attr(feature = "embedded", no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[macro_use]
mod fmt;

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_stm32;
#[cfg(feature = "embedded")]
pub use embassy_time;

/// Hardware Abstraction Layer
///
/// I2C register access, plus GPIO and timer bindings on the target.
pub mod hal;

/// Peripheral Drivers
///
/// The `Si5351A` synthesizer driver.
pub mod drivers;

/// Beacon Control Logic
///
/// Band selection, button, time gate, scheduler, emitter and runner.
pub mod beacon;

/// GPS Feed
///
/// NMEA parsing and the receiver the control loop drains.
pub mod gps;

/// Maidenhead grid locator computation
pub mod locator;

/// Frequency synthesizer interface and frequency planning
pub mod synth;

/// Clock abstraction and bounded waiting
pub mod timing;

/// WSPR message encoding
pub mod wspr;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Prelude module for common imports
#[cfg(feature = "embedded")]
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::types::*;

    // Beacon
    pub use crate::beacon::band::BandState;
    pub use crate::beacon::runner::{BeaconHardware, BeaconRunner};
    pub use crate::drivers::si5351::Si5351;
    pub use crate::gps::GpsReceiver;
    pub use crate::hal::timer::EmbassyClock;
    pub use crate::wspr::WsprEncoder;

    // Embassy
    pub use embassy_time::{Duration, Instant, Timer};

    // Error handling
    pub use core::result::Result;

    // Logging
    pub use defmt::{debug, error, info, trace, warn};
}
