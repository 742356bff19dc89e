//! Peripheral Drivers
//!
//! Drivers for external ICs, written against the `embedded-hal-async`
//! traits so they build for the target and for host tests alike.

pub mod si5351;
