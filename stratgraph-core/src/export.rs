//! Portable export document: a definition plus strategy metadata.
//!
//! The document carries a `schema_version`; documents written by a newer
//! build are rejected on import rather than half-read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::{StrategyDefinition, DEFINITION_VERSION};

/// Current export document version.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub name: String,
    #[serde(default)]
    pub asset: String,
    #[serde(default)]
    pub timeframe: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub schema_version: u32,
    pub exported_at: DateTime<Utc>,
    pub strategy: StrategyInfo,
    pub definition: StrategyDefinition,
}

impl ExportDocument {
    pub fn new(strategy: StrategyInfo, definition: StrategyDefinition) -> Self {
        Self::at(strategy, definition, Utc::now())
    }

    pub fn at(
        strategy: StrategyInfo,
        definition: StrategyDefinition,
        exported_at: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            exported_at,
            strategy,
            definition,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("export document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported schema version {found} (max supported: {supported})")]
    UnsupportedSchema { found: u32, supported: u32 },
    #[error("unsupported definition version {found} (max supported: {supported})")]
    UnsupportedDefinition { found: u32, supported: u32 },
}

/// Serialize a document to pretty JSON.
pub fn export_json(document: &ExportDocument) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(document)
}

/// Parse a document, rejecting versions newer than this build understands.
///
/// Unknown block types inside the definition are not an error; they load as
/// unknown blocks and are reported by the validator.
pub fn import_json(json: &str) -> Result<ExportDocument, ImportError> {
    let document: ExportDocument = serde_json::from_str(json)?;
    if document.schema_version > SCHEMA_VERSION {
        return Err(ImportError::UnsupportedSchema {
            found: document.schema_version,
            supported: SCHEMA_VERSION,
        });
    }
    if document.definition.meta.version > DEFINITION_VERSION {
        return Err(ImportError::UnsupportedDefinition {
            found: document.definition.meta.version,
            supported: DEFINITION_VERSION,
        });
    }
    Ok(document)
}
