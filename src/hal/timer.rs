//! Timer Abstractions
//!
//! Backs the control core's [`Clock`] with the embassy time driver.

use embassy_time::{Duration, Instant, Timer};

use crate::timing::Clock;

/// Millisecond clock on the embassy time driver
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbassyClock;

impl EmbassyClock {
    /// Create the clock
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }

    async fn delay_ms(&mut self, ms: u32) {
        Timer::after(Duration::from_millis(u64::from(ms))).await;
    }

    async fn delay_until_ms(&mut self, deadline_ms: u64) {
        // Absolute deadline on the time driver
        Timer::at(Instant::from_millis(deadline_ms)).await;
    }
}

impl defmt::Format for EmbassyClock {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "EmbassyClock({}ms)", self.now_ms());
    }
}
