//! Hardware Abstraction Layer
//!
//! Binds the beacon's hardware seams to STM32G474 peripherals. The I2C
//! register helpers are target independent; the GPIO and timer bindings
//! exist only in the embedded build.

#[cfg(feature = "embedded")]
pub mod gpio;
pub mod i2c;
#[cfg(feature = "embedded")]
pub mod timer;
