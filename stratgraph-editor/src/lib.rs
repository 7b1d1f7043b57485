//! Stratgraph editor: the boundary around the pure core.
//!
//! The core is synchronous and side-effect free. This crate owns the parts
//! that involve time and I/O:
//! - `scheduler`: cancellable debounced tasks keyed by kind
//! - `backend`: the persistence collaborator trait and an in-memory store
//! - `autosave`: the single-flight validate-then-persist policy
//! - `worker`: a background thread that runs round trips
//! - `session`: the editing session that ties them together

pub mod autosave;
pub mod backend;
pub mod config;
pub mod scheduler;
pub mod session;
pub mod worker;

pub use autosave::{AutosaveApplied, AutosaveState, AutosaveTicket, RoundTripOutcome};
pub use backend::{BackendError, InMemoryBackend, StrategyBackend};
pub use config::{ConfigError, EditorConfig};
pub use scheduler::{DebounceScheduler, TaskKind};
pub use session::{EditorSession, SessionEvent};
pub use worker::AutosaveWorker;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_types_are_send() {
        fn assert_send<T: Send>() {}
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send::<EditorSession>();
        assert_send::<AutosaveTicket>();
        assert_send_sync::<InMemoryBackend>();
    }
}
