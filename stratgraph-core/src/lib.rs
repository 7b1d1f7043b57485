//! Stratgraph Core: the model behind the visual strategy editor.
//!
//! Everything here is synchronous and side-effect free:
//! - Block registry: the static catalog of block kinds, ports, and param ranges
//! - Graph model: blocks, port-qualified connections, notes, immutable edits
//! - Canvas conversion, connection tidying, and auto-arrange
//! - Validator: structural and semantic checks reported as data
//! - Explanation generator: plain-English entry/exit/risk summary
//! - Undo/redo history over whole snapshots
//! - Fingerprints, starter templates, the wizard, and export documents
//!
//! Debouncing, autosave, and the backend boundary live in `stratgraph-editor`.

pub mod canvas;
pub mod explain;
pub mod export;
pub mod fingerprint;
pub mod graph;
pub mod history;
pub mod registry;
pub mod templates;
pub mod validate;
