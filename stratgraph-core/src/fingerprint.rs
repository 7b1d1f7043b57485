//! Content fingerprint of a strategy definition.
//!
//! The hash covers everything that is persisted (blocks, positions, labels,
//! connections, notes, meta) in canonical form, so two definitions that only
//! differ in connection or note order hash equal.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::StrategyDefinition;

/// BLAKE3 hex digest of `StrategyDefinition::canonical_json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefinitionHash(pub String);

impl DefinitionHash {
    pub fn of(definition: &StrategyDefinition) -> Self {
        Self::from_bytes(definition.canonical_json().as_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// First 12 hex characters, for logs.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for DefinitionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StrategyDefinition {
    pub fn fingerprint(&self) -> DefinitionHash {
        DefinitionHash::of(self)
    }
}
