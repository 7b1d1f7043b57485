//! Autosave: single-flight validate-then-persist round trips.
//!
//! `AutosaveState` decides whether a round trip may start and whether its
//! result still applies when it returns. At most one round trip is in flight;
//! an edit that lands meanwhile is not queued but picked up by the next
//! debounce firing, because `begin` compares the current snapshot's hash with
//! the last successfully saved one.
//!
//! Loading another version bumps the generation. Round trips started before
//! the bump still run to completion against the backend, but their result is
//! `Discarded` instead of being applied.

use stratgraph_core::fingerprint::DefinitionHash;
use stratgraph_core::graph::StrategyDefinition;
use stratgraph_core::validate::ValidationError;
use tracing::{debug, info, warn};

use crate::backend::StrategyBackend;

/// A started round trip.
#[derive(Debug, Clone)]
pub struct AutosaveTicket {
    pub id: u64,
    pub generation: u64,
    pub hash: DefinitionHash,
    pub definition: StrategyDefinition,
}

/// What the backend said.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundTripOutcome {
    Saved { version: u32 },
    Rejected(Vec<ValidationError>),
    Failed(String),
}

/// What the session should do with a finished round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum AutosaveApplied {
    Saved { version: u32 },
    /// The backend validator found problems; nothing was persisted.
    Rejected(Vec<ValidationError>),
    Failed(String),
    /// The graph was switched while the round trip ran.
    Discarded,
}

#[derive(Debug, Clone, Default)]
pub struct AutosaveState {
    last_saved: Option<DefinitionHash>,
    in_flight: Option<u64>,
    generation: u64,
    next_id: u64,
}

impl AutosaveState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for a definition that is already persisted.
    pub fn with_baseline(hash: DefinitionHash) -> Self {
        Self {
            last_saved: Some(hash),
            ..Self::default()
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_saved(&self) -> Option<&DefinitionHash> {
        self.last_saved.as_ref()
    }

    /// Whether `definition` differs from the last saved snapshot.
    pub fn needs_save(&self, definition: &StrategyDefinition) -> bool {
        self.last_saved.as_ref() != Some(&definition.fingerprint())
    }

    /// Start a round trip for `definition`.
    ///
    /// `None` when one is already in flight or nothing changed since the last
    /// successful save.
    pub fn begin(&mut self, definition: &StrategyDefinition) -> Option<AutosaveTicket> {
        if let Some(id) = self.in_flight {
            debug!(in_flight = id, "autosave skipped: round trip in flight");
            return None;
        }
        let hash = definition.fingerprint();
        if self.last_saved.as_ref() == Some(&hash) {
            debug!(hash = hash.short(), "autosave skipped: unchanged");
            return None;
        }

        self.next_id += 1;
        let id = self.next_id;
        self.in_flight = Some(id);
        debug!(id, generation = self.generation, hash = hash.short(), "autosave begin");
        Some(AutosaveTicket {
            id,
            generation: self.generation,
            hash,
            definition: definition.clone(),
        })
    }

    /// Record a finished round trip.
    pub fn complete(&mut self, ticket: &AutosaveTicket, outcome: RoundTripOutcome) -> AutosaveApplied {
        if self.in_flight == Some(ticket.id) {
            self.in_flight = None;
        }
        if ticket.generation != self.generation {
            info!(
                id = ticket.id,
                ticket_generation = ticket.generation,
                generation = self.generation,
                "autosave result discarded after version switch"
            );
            return AutosaveApplied::Discarded;
        }

        match outcome {
            RoundTripOutcome::Saved { version } => {
                info!(id = ticket.id, version, "autosave saved");
                self.last_saved = Some(ticket.hash.clone());
                AutosaveApplied::Saved { version }
            }
            RoundTripOutcome::Rejected(errors) => {
                info!(id = ticket.id, errors = errors.len(), "autosave rejected by validation");
                AutosaveApplied::Rejected(errors)
            }
            RoundTripOutcome::Failed(error) => {
                warn!(id = ticket.id, %error, "autosave failed");
                AutosaveApplied::Failed(error)
            }
        }
    }

    /// Abandon the current graph, e.g. when another version is loaded.
    /// `baseline` is the hash of what is now on the canvas if it is already
    /// persisted.
    pub fn invalidate(&mut self, baseline: Option<DefinitionHash>) {
        self.generation += 1;
        self.last_saved = baseline;
        debug!(generation = self.generation, "autosave invalidated");
    }
}

/// Validate, then persist only if valid.
pub fn run_round_trip(backend: &dyn StrategyBackend, ticket: &AutosaveTicket) -> RoundTripOutcome {
    let report = match backend.validate(&ticket.definition) {
        Ok(report) => report,
        Err(e) => return RoundTripOutcome::Failed(e.to_string()),
    };
    if !report.is_valid() {
        return RoundTripOutcome::Rejected(report.errors);
    }
    match backend.save_version(&ticket.definition) {
        Ok(version) => RoundTripOutcome::Saved { version },
        Err(e) => RoundTripOutcome::Failed(e.to_string()),
    }
}
