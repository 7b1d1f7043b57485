//! Persisted strategy graph: blocks, port-qualified connections, notes.
//!
//! `StrategyDefinition` is the unit of persistence and the input to the
//! validator and explanation generator. It is treated as an immutable value:
//! edits go through [`edit::GraphEdit`] and produce a new definition.

pub mod edit;
pub mod ids;
pub mod params;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::registry::{BlockMeta, BlockType};

pub use edit::{EditError, GraphEdit};
pub use ids::{generate_block_id, generate_note_id, BlockId, NoteId};
pub use params::BlockParams;

/// Current persisted schema version.
pub const DEFINITION_VERSION: u32 = 1;

/// Canvas position. Display-only; no semantic meaning.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// ─── Block ──────────────────────────────────────────────────────────

/// A typed computation node.
///
/// `id` and the block's type are fixed at creation; only label, position, and
/// the parameter values of the same type may change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBlock", into = "RawBlock")]
pub struct Block {
    pub id: BlockId,
    pub label: String,
    pub position: Position,
    pub params: BlockParams,
}

/// Wire shape of a block: `{id, type, label, position, params}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawBlock {
    id: BlockId,
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    position: Position,
    #[serde(default)]
    params: Map<String, Value>,
}

impl From<RawBlock> for Block {
    fn from(raw: RawBlock) -> Self {
        Self {
            id: raw.id,
            label: raw.label,
            position: raw.position,
            params: BlockParams::from_wire(&raw.block_type, raw.params),
        }
    }
}

impl From<Block> for RawBlock {
    fn from(block: Block) -> Self {
        Self {
            block_type: block.params.type_name().to_string(),
            params: block.params.to_wire(),
            id: block.id,
            label: block.label,
            position: block.position,
        }
    }
}

impl Block {
    /// New block labelled with its registry label.
    pub fn new(id: impl Into<BlockId>, params: BlockParams, position: Position) -> Self {
        let label = params
            .block_type()
            .map(|t| t.meta().label.to_string())
            .unwrap_or_else(|| params.type_name().to_string());
        Self {
            id: id.into(),
            label,
            position,
            params,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn block_type(&self) -> Option<BlockType> {
        self.params.block_type()
    }

    pub fn type_name(&self) -> &str {
        self.params.type_name()
    }

    /// Registry metadata; `None` for unknown blocks.
    pub fn meta(&self) -> Option<&'static BlockMeta> {
        self.block_type().map(BlockType::meta)
    }
}

// ─── Connection ─────────────────────────────────────────────────────

/// One side of a connection: a block and one of its port names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Endpoint {
    pub block_id: BlockId,
    pub port: String,
}

impl Endpoint {
    pub fn new(block_id: impl Into<BlockId>, port: impl Into<String>) -> Self {
        Self {
            block_id: block_id.into(),
            port: port.into(),
        }
    }
}

/// Directed edge from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Connection {
    pub from: Endpoint,
    pub to: Endpoint,
}

impl Connection {
    pub fn new(from: Endpoint, to: Endpoint) -> Self {
        Self { from, to }
    }
}

// ─── Note ───────────────────────────────────────────────────────────

/// Free-floating annotation, optionally anchored to a block.
///
/// Removing the anchor block detaches the note; it is never deleted with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub text: String,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<BlockId>,
}

// ─── StrategyDefinition ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionMeta {
    pub version: u32,
}

impl Default for DefinitionMeta {
    fn default() -> Self {
        Self {
            version: DEFINITION_VERSION,
        }
    }
}

/// The persisted strategy graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StrategyDefinition {
    pub blocks: Vec<Block>,
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub meta: DefinitionMeta,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

impl StrategyDefinition {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    pub fn contains_block(&self, id: &BlockId) -> bool {
        self.block(id).is_some()
    }

    pub fn blocks_of_type(&self, block_type: BlockType) -> impl Iterator<Item = &Block> {
        self.blocks
            .iter()
            .filter(move |b| b.block_type() == Some(block_type))
    }

    /// All connections feeding `(block_id, port)`, in stored order.
    pub fn incoming<'a>(
        &'a self,
        block_id: &'a BlockId,
        port: &'a str,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .iter()
            .filter(move |c| &c.to.block_id == block_id && c.to.port == port)
    }

    /// The connection that drives an input port.
    ///
    /// When several connections target the same input the last one wins. The
    /// validator reports such graphs as invalid (`DUPLICATE_INPUT`); this rule
    /// only decides what read-only consumers display in the meantime.
    pub fn feeding(&self, block_id: &BlockId, port: &str) -> Option<&Connection> {
        self.connections
            .iter()
            .rev()
            .find(|c| &c.to.block_id == block_id && c.to.port == port)
    }

    /// Whether any connection into `(block_id, port)` comes from a block that
    /// exists. Dangling wires left by hand-edited JSON do not count.
    pub fn has_live_input(&self, block_id: &BlockId, port: &str) -> bool {
        self.incoming(block_id, port)
            .any(|c| self.contains_block(&c.from.block_id))
    }

    /// Deterministic JSON: blocks in stored order, connections and notes sorted.
    ///
    /// Block order is kept because it is user-visible (palette/insertion order);
    /// connection order carries no meaning and is normalized away.
    pub fn canonical_json(&self) -> String {
        let mut canonical = self.clone();
        canonical.connections.sort();
        canonical.notes.sort_by(|a, b| a.id.cmp(&b.id));
        // Model types serialize infallibly: string keys, no non-string map keys.
        serde_json::to_string(&canonical).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::params::{PeriodParams, PriceParams};
    use serde_json::json;

    fn sample() -> StrategyDefinition {
        StrategyDefinition {
            blocks: vec![
                Block::new(
                    "p",
                    BlockParams::Price(PriceParams::default()),
                    Position::new(0.0, 0.0),
                ),
                Block::new(
                    "s",
                    BlockParams::Sma(PeriodParams { period: 10 }),
                    Position::new(200.0, 0.0),
                ),
            ],
            connections: vec![Connection::new(
                Endpoint::new("p", "price"),
                Endpoint::new("s", "price"),
            )],
            meta: DefinitionMeta::default(),
            notes: Vec::new(),
        }
    }

    #[test]
    fn block_wire_shape() {
        let def = sample();
        let v = serde_json::to_value(&def.blocks[1]).unwrap();
        assert_eq!(
            v,
            json!({
                "id": "s",
                "type": "sma",
                "label": "SMA",
                "position": {"x": 200.0, "y": 0.0},
                "params": {"period": 10}
            })
        );
    }

    #[test]
    fn definition_json_roundtrip() {
        let def = sample();
        let json = serde_json::to_string(&def).unwrap();
        let back: StrategyDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(def, back);
    }

    #[test]
    fn unknown_block_survives_load_and_save() {
        let raw = json!({
            "blocks": [{"id": "x", "type": "neural_forecast", "label": "NF",
                        "position": {"x": 1.0, "y": 2.0}, "params": {"layers": 4}}],
            "connections": [],
            "meta": {"version": 1}
        });
        let def: StrategyDefinition = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(def.blocks[0].block_type(), None);
        assert_eq!(serde_json::to_value(&def).unwrap(), raw);
    }

    #[test]
    fn missing_meta_defaults_to_version_one() {
        let def: StrategyDefinition =
            serde_json::from_value(json!({"blocks": [], "connections": []})).unwrap();
        assert_eq!(def.meta.version, DEFINITION_VERSION);
        assert!(def.notes.is_empty());
    }

    #[test]
    fn feeding_is_last_writer_wins() {
        let mut def = sample();
        def.blocks.push(Block::new(
            "p2",
            BlockParams::Price(PriceParams::default()),
            Position::default(),
        ));
        def.connections.push(Connection::new(
            Endpoint::new("p2", "price"),
            Endpoint::new("s", "price"),
        ));
        let id = BlockId::from("s");
        assert_eq!(def.incoming(&id, "price").count(), 2);
        assert_eq!(def.feeding(&id, "price").unwrap().from.block_id.as_str(), "p2");
    }

    #[test]
    fn live_input_ignores_dangling_wires() {
        let mut def = sample();
        let id = BlockId::from("s");
        def.connections.push(Connection::new(
            Endpoint::new("ghost", "value"),
            Endpoint::new("s", "price"),
        ));
        assert!(def.has_live_input(&id, "price"));

        def.blocks.retain(|b| b.id.as_str() != "p");
        assert!(!def.has_live_input(&id, "price"));
        assert!(!def.has_live_input(&id, "volume"));
    }

    #[test]
    fn canonical_json_ignores_connection_order() {
        let mut a = sample();
        a.blocks.push(Block::new("c", BlockParams::Volume, Position::default()));
        a.connections.push(Connection::new(
            Endpoint::new("c", "volume"),
            Endpoint::new("s", "price"),
        ));
        let mut b = a.clone();
        b.connections.reverse();
        assert_eq!(a.canonical_json(), b.canonical_json());
    }
}
