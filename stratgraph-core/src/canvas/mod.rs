//! Canvas ⇄ definition conversion.
//!
//! The canvas representation is what the visual editor manipulates: nodes with
//! screen positions and transient decorations (selection, error highlights,
//! collapse state, summary text) and edges keyed by source/target handle. It is
//! derived, never persisted; every field not present on `Block`/`Connection`
//! can be re-derived or dropped without loss.
//!
//! - `to_canvas`: definition → nodes + edges (blocks and notes both become nodes)
//! - `to_definition`: nodes + edges → definition, stripping UI-only state
//! - `annotate_errors` / `annotate_summaries`: decorate nodes for display

pub mod layout;
pub mod tidy;

use crate::explain::describe_block;
use crate::graph::{
    Block, BlockId, BlockParams, Connection, DefinitionMeta, Endpoint, Note, NoteId, Position,
    StrategyDefinition,
};
use crate::validate::ValidationError;

pub use layout::auto_arrange;
pub use tidy::tidy_connections;

/// Node type used for notes on the canvas.
pub const NOTE_NODE_TYPE: &str = "note";

// ─── Canvas types ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct BlockNodeData {
    pub label: String,
    pub params: BlockParams,
    /// Set by `annotate_errors`.
    pub has_error: bool,
    pub errors: Vec<String>,
    pub collapsed: bool,
    /// Set by `annotate_summaries`.
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteNodeData {
    pub text: String,
    pub anchor: Option<BlockId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Block(BlockNodeData),
    Note(NoteNodeData),
}

/// An editor node. `node_type` is the block's wire type name, or `"note"`.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasNode {
    pub id: String,
    pub node_type: String,
    pub position: Position,
    pub data: NodeData,
    pub selected: bool,
}

impl CanvasNode {
    pub fn is_note(&self) -> bool {
        matches!(self.data, NodeData::Note(_))
    }

    /// A copy with selection, error highlights, and summary cleared.
    ///
    /// `collapsed` survives: it is a user choice, not a derived decoration.
    pub fn without_transient_state(&self) -> CanvasNode {
        let mut node = self.clone();
        node.selected = false;
        if let NodeData::Block(data) = &mut node.data {
            data.has_error = false;
            data.errors.clear();
            data.summary = None;
        }
        node
    }
}

/// An editor edge between an output handle and an input handle.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasEdge {
    pub id: String,
    pub source: String,
    pub source_handle: String,
    pub target: String,
    pub target_handle: String,
    pub selected: bool,
}

impl CanvasEdge {
    pub fn without_transient_state(&self) -> CanvasEdge {
        CanvasEdge {
            selected: false,
            ..self.clone()
        }
    }
}

/// Canonical edge id derived from both endpoints.
pub fn edge_id(source: &str, source_handle: &str, target: &str, target_handle: &str) -> String {
    format!("{source}:{source_handle}->{target}:{target_handle}")
}

// ─── Conversion ─────────────────────────────────────────────────────

fn block_node(block: &Block) -> CanvasNode {
    CanvasNode {
        id: block.id.to_string(),
        node_type: block.type_name().to_string(),
        position: block.position,
        data: NodeData::Block(BlockNodeData {
            label: block.label.clone(),
            params: block.params.clone(),
            has_error: false,
            errors: Vec::new(),
            collapsed: false,
            summary: None,
        }),
        selected: false,
    }
}

fn note_node(note: &Note) -> CanvasNode {
    CanvasNode {
        id: note.id.to_string(),
        node_type: NOTE_NODE_TYPE.to_string(),
        position: note.position,
        data: NodeData::Note(NoteNodeData {
            text: note.text.clone(),
            anchor: note.anchor.clone(),
        }),
        selected: false,
    }
}

fn connection_edge(connection: &Connection) -> CanvasEdge {
    let (from, to) = (&connection.from, &connection.to);
    CanvasEdge {
        id: edge_id(from.block_id.as_str(), &from.port, to.block_id.as_str(), &to.port),
        source: from.block_id.to_string(),
        source_handle: from.port.clone(),
        target: to.block_id.to_string(),
        target_handle: to.port.clone(),
        selected: false,
    }
}

/// Map a definition onto canvas nodes and edges.
///
/// An empty definition yields an empty canvas: substituting a starter template
/// is the caller's decision.
pub fn to_canvas(definition: &StrategyDefinition) -> (Vec<CanvasNode>, Vec<CanvasEdge>) {
    let nodes = definition
        .blocks
        .iter()
        .map(block_node)
        .chain(definition.notes.iter().map(note_node))
        .collect();
    let edges = definition.connections.iter().map(connection_edge).collect();
    (nodes, edges)
}

/// Inverse of [`to_canvas`] with the current schema version.
pub fn to_definition(nodes: &[CanvasNode], edges: &[CanvasEdge]) -> StrategyDefinition {
    to_definition_with_meta(nodes, edges, DefinitionMeta::default())
}

/// Inverse of [`to_canvas`], threading an existing version marker through.
pub fn to_definition_with_meta(
    nodes: &[CanvasNode],
    edges: &[CanvasEdge],
    meta: DefinitionMeta,
) -> StrategyDefinition {
    let mut blocks = Vec::new();
    let mut notes = Vec::new();
    for node in nodes {
        match &node.data {
            NodeData::Block(data) => blocks.push(Block {
                id: BlockId::new(node.id.clone()),
                label: data.label.clone(),
                position: node.position,
                params: data.params.clone(),
            }),
            NodeData::Note(data) => notes.push(Note {
                id: NoteId::new(node.id.clone()),
                text: data.text.clone(),
                position: node.position,
                anchor: data.anchor.clone(),
            }),
        }
    }

    let connections = edges
        .iter()
        .map(|e| {
            Connection::new(
                Endpoint::new(e.source.as_str(), e.source_handle.as_str()),
                Endpoint::new(e.target.as_str(), e.target_handle.as_str()),
            )
        })
        .collect();

    StrategyDefinition {
        blocks,
        connections,
        meta,
        notes,
    }
}

// ─── Decorations ────────────────────────────────────────────────────

/// Mark nodes that carry block-scoped validation errors.
///
/// Previous highlights are cleared first. Returns the annotated nodes and the
/// graph-global errors (no `block_id`, or an id with no node) for a banner.
pub fn annotate_errors(
    nodes: &[CanvasNode],
    errors: &[ValidationError],
) -> (Vec<CanvasNode>, Vec<ValidationError>) {
    let mut annotated: Vec<CanvasNode> = nodes
        .iter()
        .map(|n| {
            let mut n = n.clone();
            if let NodeData::Block(data) = &mut n.data {
                data.has_error = false;
                data.errors.clear();
            }
            n
        })
        .collect();

    let mut global = Vec::new();
    for error in errors {
        let target = error.block_id.as_ref().and_then(|id| {
            annotated
                .iter_mut()
                .find(|n| n.id == id.as_str() && !n.is_note())
        });
        match target {
            Some(CanvasNode {
                data: NodeData::Block(data),
                ..
            }) => {
                data.has_error = true;
                data.errors.push(error.display_message().to_string());
            }
            _ => global.push(error.clone()),
        }
    }
    (annotated, global)
}

/// Fill each block node's summary with its natural-language phrase.
pub fn annotate_summaries(nodes: &[CanvasNode], definition: &StrategyDefinition) -> Vec<CanvasNode> {
    nodes
        .iter()
        .map(|n| {
            let mut n = n.clone();
            let id = BlockId::new(n.id.clone());
            if let NodeData::Block(data) = &mut n.data {
                data.summary = describe_block(definition, &id);
            }
            n
        })
        .collect()
}
