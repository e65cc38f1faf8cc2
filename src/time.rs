//! Injected monotonic clock.
//!
//! The RED core never reads wall-clock or process time directly — every
//! timestamp it needs comes through a [`Clock`], so a discrete-event
//! simulator can drive it with virtual time and a real deployment can drive
//! it with the system clock, without either caller touching RED internals.

pub use quanta::Instant;

/// A source of monotonic timestamps.
///
/// Implementations must be monotonic for a single instance: successive
/// calls to `now()` must never go backwards.
pub trait Clock {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// The production [`Clock`]: wraps [`quanta::Clock`], which reads the CPU
/// timestamp counter directly rather than going through a syscall on every
/// call.
#[derive(Debug, Clone)]
pub struct SystemClock {
    inner: quanta::Clock,
}

impl SystemClock {
    /// Create a clock backed by the system's monotonic time source.
    pub fn new() -> Self {
        SystemClock {
            inner: quanta::Clock::new(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        self.inner.now()
    }
}

/// Deterministic clocks for tests.
pub mod testing {
    use super::{Clock, Instant};

    /// A mockable clock, backed by [`quanta::Clock::mock`]. Advance it with
    /// the returned [`quanta::Mock`] handle to exercise idle-catch-up paths
    /// without sleeping.
    #[derive(Debug, Clone)]
    pub struct MockClock {
        inner: quanta::Clock,
    }

    impl MockClock {
        /// Create a mock clock and the handle used to advance it.
        pub fn new() -> (Self, std::sync::Arc<quanta::Mock>) {
            let (inner, mock) = quanta::Clock::mock();
            (MockClock { inner }, mock)
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> Instant {
            self.inner.now()
        }
    }
}
