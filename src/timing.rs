//! Time Source and Bounded Waiting
//!
//! The control core never reads a hardware timer directly. It goes through
//! [`Clock`], which the firmware backs with `embassy-time` and the tests
//! back with a simulated clock, and it waits with [`poll_until`], which is
//! always bounded by a timeout and can be cut short by a [`CancelToken`].

use core::sync::atomic::{AtomicBool, Ordering};

/// Millisecond time source with an async delay
#[allow(async_fn_in_trait)]
pub trait Clock {
    /// Milliseconds since an arbitrary fixed epoch (monotonic)
    fn now_ms(&self) -> u64;

    /// Suspend for `ms` milliseconds
    async fn delay_ms(&mut self, ms: u32);

    /// Suspend until `now_ms()` reaches `deadline_ms`
    ///
    /// Returns immediately if the deadline has already passed.
    async fn delay_until_ms(&mut self, deadline_ms: u64) {
        let now = self.now_ms();
        if deadline_ms > now {
            let remaining = u32::try_from(deadline_ms - now).unwrap_or(u32::MAX);
            self.delay_ms(remaining).await;
        }
    }
}

/// Cooperative cancellation flag shared with a waiting operation
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    /// Create a token in the not-cancelled state
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Clear a previous cancellation
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}

/// How a bounded wait ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// The condition became true
    Satisfied {
        /// Time from start of the wait
        elapsed_ms: u64,
    },
    /// The timeout expired first
    TimedOut {
        /// Time from start of the wait
        elapsed_ms: u64,
    },
    /// The cancel token was set
    Cancelled {
        /// Time from start of the wait
        elapsed_ms: u64,
    },
}

impl PollOutcome {
    /// Time spent waiting
    #[must_use]
    pub const fn elapsed_ms(self) -> u64 {
        match self {
            Self::Satisfied { elapsed_ms }
            | Self::TimedOut { elapsed_ms }
            | Self::Cancelled { elapsed_ms } => elapsed_ms,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for PollOutcome {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Satisfied { elapsed_ms } => defmt::write!(f, "Satisfied({}ms)", elapsed_ms),
            Self::TimedOut { elapsed_ms } => defmt::write!(f, "TimedOut({}ms)", elapsed_ms),
            Self::Cancelled { elapsed_ms } => defmt::write!(f, "Cancelled({}ms)", elapsed_ms),
        }
    }
}

/// Poll `condition` every `interval_ms` until it holds, `timeout_ms`
/// elapses, or `cancel` is set
///
/// The condition is checked before the first delay, so an already
/// satisfied condition returns without waiting.
pub async fn poll_until<C, F>(
    clock: &mut C,
    timeout_ms: u32,
    interval_ms: u32,
    cancel: &CancelToken,
    mut condition: F,
) -> PollOutcome
where
    C: Clock,
    F: FnMut() -> bool,
{
    let start = clock.now_ms();
    let deadline = start + u64::from(timeout_ms);
    let interval = interval_ms.max(1);

    loop {
        let now = clock.now_ms();
        let elapsed_ms = now - start;

        if condition() {
            return PollOutcome::Satisfied { elapsed_ms };
        }
        if cancel.is_cancelled() {
            return PollOutcome::Cancelled { elapsed_ms };
        }
        if now >= deadline {
            return PollOutcome::TimedOut { elapsed_ms };
        }

        let step = u32::try_from(deadline - now).map_or(interval, |left| left.min(interval));
        clock.delay_ms(step).await;
    }
}
