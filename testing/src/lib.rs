//! # Puerta Testing
//!
//! Testing utilities and helpers for the Puerta scan flow.
//!
//! This crate provides:
//! - Deterministic [`Clock`] implementations (fixed and manually advanced)
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - Assertion helpers for effects
//! - A one-call tracing setup for noisy test debugging
//!
//! ## Example
//!
//! ```ignore
//! use puerta_testing::{ManualClock, ReducerTest};
//!
//! let clock = ManualClock::starting_at(test_clock().now());
//! ReducerTest::new(ScanReducer::new())
//!     .with_env(environment_with(clock.clone()))
//!     .given_state(ScanState::default())
//!     .when_actions([ScanAction::OpenCamera, ScanAction::StartReading])
//!     .when_action(ScanAction::CodeScanned { raw: "E1,Q1".into() })
//!     .then_state(|state| assert!(state.busy))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use puerta_core::environment::Clock;


/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use puerta_testing::mocks::FixedClock;
    /// use puerta_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to
    ///
    /// Clones share the same time, so a test can keep one handle and give
    /// another to the environment.
    ///
    /// ```
    /// use puerta_testing::mocks::{ManualClock, test_clock};
    /// use puerta_core::environment::Clock;
    ///
    /// let clock = ManualClock::starting_at(test_clock().now());
    /// let start = clock.now();
    /// clock.advance_millis(4_999);
    /// assert_eq!((clock.now() - start).num_milliseconds(), 4_999);
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock frozen at `time`
        #[must_use]
        pub fn starting_at(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }

        /// Move the clock forward by a number of milliseconds
        pub fn advance_millis(&self, millis: i64) {
            self.advance(chrono::Duration::milliseconds(millis));
        }

        /// Jump to an absolute time
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = time;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Install a test subscriber honoring `RUST_LOG`
///
/// Safe to call from many tests; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::starting_at(test_clock().now());
        let env_copy = clock.clone();

        clock.advance_millis(5_000);

        assert_eq!(
            (env_copy.now() - test_clock().now()).num_milliseconds(),
            5_000
        );
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::starting_at(test_clock().now());
        let later = test_clock().now() + chrono::Duration::hours(1);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}
