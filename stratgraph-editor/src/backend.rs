//! The persistence collaborator seam.
//!
//! The editor never talks to storage directly; everything goes through
//! [`StrategyBackend`]. [`InMemoryBackend`] is the reference implementation
//! used by tests and the CLI.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use stratgraph_core::graph::StrategyDefinition;
use stratgraph_core::validate::{validate, ValidationReport};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("version {0} not found")]
    VersionNotFound(u32),
    #[error("backend rejected the request: {0}")]
    Rejected(String),
}

/// Validation and durable, versioned persistence of definitions.
pub trait StrategyBackend: Send + Sync {
    fn validate(&self, definition: &StrategyDefinition) -> Result<ValidationReport, BackendError>;

    /// Persist a new version; returns its version number.
    fn save_version(&self, definition: &StrategyDefinition) -> Result<u32, BackendError>;

    fn load_version(&self, version: u32) -> Result<StrategyDefinition, BackendError>;
}

/// A persisted version.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedVersion {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub definition: StrategyDefinition,
}

/// Append-only version store in memory, validating with the core validator.
///
/// `fail_next_saves` and `set_unavailable` inject failures for tests.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    versions: Mutex<Vec<SavedVersion>>,
    failing_saves: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` `save_version` calls fail.
    pub fn fail_next_saves(&self, n: usize) {
        self.failing_saves.store(n, Ordering::SeqCst);
    }

    /// While set, every call fails with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn version_count(&self) -> usize {
        self.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn latest(&self) -> Option<SavedVersion> {
        self.lock().ok().and_then(|v| v.last().cloned())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<SavedVersion>>, BackendError> {
        self.versions
            .lock()
            .map_err(|_| BackendError::Unavailable("version store lock poisoned".into()))
    }

    fn check_available(&self) -> Result<(), BackendError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("backend marked unavailable".into()));
        }
        Ok(())
    }
}

impl StrategyBackend for InMemoryBackend {
    fn validate(&self, definition: &StrategyDefinition) -> Result<ValidationReport, BackendError> {
        self.check_available()?;
        Ok(validate(definition))
    }

    fn save_version(&self, definition: &StrategyDefinition) -> Result<u32, BackendError> {
        self.check_available()?;
        let injected = self
            .failing_saves
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(BackendError::Unavailable("injected save failure".into()));
        }

        let mut versions = self.lock()?;
        let version = versions.last().map_or(1, |v| v.version + 1);
        versions.push(SavedVersion {
            version,
            saved_at: Utc::now(),
            definition: definition.clone(),
        });
        Ok(version)
    }

    fn load_version(&self, version: u32) -> Result<StrategyDefinition, BackendError> {
        self.check_available()?;
        self.lock()?
            .iter()
            .find(|v| v.version == version)
            .map(|v| v.definition.clone())
            .ok_or(BackendError::VersionNotFound(version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratgraph_core::templates::StrategyTemplate;

    #[test]
    fn versions_are_sequential_and_loadable() {
        let backend = InMemoryBackend::new();
        let a = StrategyTemplate::GoldenCross.build();
        let b = StrategyTemplate::MacdMomentum.build();
        assert_eq!(backend.save_version(&a).unwrap(), 1);
        assert_eq!(backend.save_version(&b).unwrap(), 2);
        assert_eq!(backend.load_version(1).unwrap(), a);
        assert_eq!(backend.latest().unwrap().version, 2);
        assert_eq!(backend.load_version(3), Err(BackendError::VersionNotFound(3)));
    }

    #[test]
    fn injected_failures_are_consumed() {
        let backend = InMemoryBackend::new();
        let def = StrategyTemplate::GoldenCross.build();
        backend.fail_next_saves(2);
        assert!(backend.save_version(&def).is_err());
        assert!(backend.save_version(&def).is_err());
        assert_eq!(backend.save_version(&def).unwrap(), 1);
        assert_eq!(backend.version_count(), 1);
    }

    #[test]
    fn unavailable_fails_everything() {
        let backend = InMemoryBackend::new();
        backend.set_unavailable(true);
        let def = StrategyDefinition::empty();
        assert!(matches!(backend.validate(&def), Err(BackendError::Unavailable(_))));
        assert!(matches!(backend.save_version(&def), Err(BackendError::Unavailable(_))));
        backend.set_unavailable(false);
        assert!(!backend.validate(&def).unwrap().is_valid());
    }
}
