//! # Puerta Core
//!
//! Core traits and types for the Puerta ticket-scanning client.
//!
//! The scan flow is written as a reducer: every camera frame, permission
//! answer and backend reply becomes an action, and the reducer decides what
//! happens next by mutating state and returning effect descriptions. The
//! runtime crate executes those effects.
//!
//! ## Core Concepts
//!
//! - **State**: Session state of a feature (dedup slot, busy flag, history)
//! - **Action**: All possible inputs to a reducer (user intents, camera frames, results)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Example
//!
//! ```ignore
//! use puerta_core::*;
//!
//! #[derive(Clone, Debug, Default)]
//! struct GateState {
//!     admitted: u32,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum GateAction {
//!     TicketAccepted,
//! }
//!
//! impl Reducer for GateReducer {
//!     type State = GateState;
//!     type Action = GateAction;
//!     type Environment = GateEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut GateState,
//!         action: GateAction,
//!         env: &GateEnvironment,
//!     ) -> SmallVec<[Effect<GateAction>; 4]> {
//!         match action {
//!             GateAction::TicketAccepted => {
//!                 state.admitted += 1;
//!                 smallvec![Effect::None]
//!             }
//!         }
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Declarative macros for building effects
pub mod effect_macros;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all decision logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for ScanReducer {
    ///     type State = ScanState;
    ///     type Action = ScanAction;
    ///     type Environment = ScanEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut ScanState,
    ///         action: ScanAction,
    ///         env: &ScanEnvironment,
    ///     ) -> SmallVec<[Effect<ScanAction>; 4]> {
    ///         match action {
    ///             ScanAction::HistoryCleared => {
    ///                 state.history.clear();
    ///                 smallvec![Effect::None]
    ///             }
    ///             _ => smallvec![Effect::None],
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action against the current state
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed
        ///
        /// Most actions produce at most a handful of effects, so the result
        /// is a `SmallVec` with inline capacity for four.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution), composable and cancellable.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// Identifier of a cancellable group of effects
    ///
    /// Effects wrapped in [`Effect::Cancellable`] are registered under their
    /// id; a later [`Effect::Cancel`] with the same id aborts whatever is
    /// still running.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct EffectId(u64);

    impl EffectId {
        /// Create an effect id from a raw value
        #[must_use]
        pub const fn new(value: u64) -> Self {
            Self(value)
        }

        /// Raw value of this id
        #[must_use]
        pub const fn value(self) -> u64 {
            self.0
        }
    }

    impl std::fmt::Display for EffectId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "effect-{}", self.0)
        }
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (for timeouts, retries)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Run an effect under an id so it can be cancelled later
        Cancellable {
            /// Group identifier
            id: EffectId,
            /// The wrapped effect
            effect: Box<Effect<Action>>,
        },

        /// Abort every running effect registered under the id
        Cancel(EffectId),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Cancellable { id, effect } => f
                    .debug_struct("Effect::Cancellable")
                    .field("id", id)
                    .field("effect", effect)
                    .finish(),
                Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Register this effect under `id` so it can be cancelled
        #[must_use]
        pub fn cancellable(self, id: EffectId) -> Effect<Action> {
            Effect::Cancellable {
                id,
                effect: Box::new(self),
            }
        }

        /// Whether this is the no-op effect
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter. Domain crates add their own traits
/// (backend client, navigator, permissions); time lives here because every
/// reducer that reasons about windows needs it.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)] // Test code can panic
mod tests {
    use super::effect::{Effect, EffectId};

    #[derive(Debug, Clone)]
    enum TestAction {
        Done,
    }

    #[test]
    fn cancellable_wraps_effect_under_id() {
        let effect: Effect<TestAction> = Effect::Delay {
            duration: std::time::Duration::from_millis(10),
            action: Box::new(TestAction::Done),
        }
        .cancellable(EffectId::new(7));

        match effect {
            Effect::Cancellable { id, effect } => {
                assert_eq!(id, EffectId::new(7));
                assert!(matches!(*effect, Effect::Delay { .. }));
            },
            other => panic!("unexpected effect: {other:?}"),
        }
    }

    #[test]
    fn effect_id_display() {
        assert_eq!(EffectId::new(42).to_string(), "effect-42");
    }

    #[test]
    fn debug_hides_future_body() {
        let effect: Effect<TestAction> = Effect::Future(Box::pin(async { None }));
        assert_eq!(format!("{effect:?}"), "Effect::Future(<future>)");
        assert!(Effect::<TestAction>::None.is_none());
    }
}
