//! Auto-arrange: layered left-to-right layout of block nodes.
//!
//! Best effort only. Each block's column is its longest distance from a source
//! (a block with no incoming edges); rows keep the blocks' existing order.
//! Blocks on a cycle cannot be ranked and go in one column after the rest.
//! Note nodes keep their positions.

use std::collections::HashMap;

use super::{CanvasEdge, CanvasNode};
use crate::graph::Position;

pub const COLUMN_WIDTH: f64 = 260.0;
pub const ROW_HEIGHT: f64 = 120.0;

pub fn auto_arrange(nodes: &[CanvasNode], edges: &[CanvasEdge]) -> Vec<CanvasNode> {
    let blocks: Vec<&str> = nodes
        .iter()
        .filter(|n| !n.is_note())
        .map(|n| n.id.as_str())
        .collect();
    let index: HashMap<&str, usize> = blocks
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();

    // Kahn's algorithm over block→block edges; edges touching unknown ids are ignored.
    let mut indegree = vec![0usize; blocks.len()];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); blocks.len()];
    for e in edges {
        if let (Some(&s), Some(&t)) = (index.get(e.source.as_str()), index.get(e.target.as_str())) {
            successors[s].push(t);
            indegree[t] += 1;
        }
    }

    let mut layer: Vec<Option<usize>> = vec![None; blocks.len()];
    let mut ready: Vec<usize> = (0..blocks.len()).filter(|&i| indegree[i] == 0).collect();
    for &i in &ready {
        layer[i] = Some(0);
    }
    while let Some(i) = ready.pop() {
        let next_layer = layer[i].unwrap_or(0) + 1;
        for &t in &successors[i] {
            layer[t] = Some(layer[t].map_or(next_layer, |l| l.max(next_layer)));
            indegree[t] -= 1;
            if indegree[t] == 0 {
                ready.push(t);
            }
        }
    }

    // Anything with remaining indegree sits on (or behind) a cycle.
    let ranked_max = (0..blocks.len())
        .filter(|&i| indegree[i] == 0)
        .filter_map(|i| layer[i])
        .max()
        .unwrap_or(0);
    let column = |i: usize| {
        if indegree[i] == 0 {
            layer[i].unwrap_or(0)
        } else {
            ranked_max + 1
        }
    };

    let mut rows_used: HashMap<usize, usize> = HashMap::new();
    let mut positions: HashMap<&str, Position> = HashMap::new();
    for (i, id) in blocks.iter().enumerate() {
        let col = column(i);
        let row = rows_used.entry(col).or_insert(0);
        positions.insert(
            *id,
            Position::new(col as f64 * COLUMN_WIDTH, *row as f64 * ROW_HEIGHT),
        );
        *row += 1;
    }

    nodes
        .iter()
        .map(|n| {
            let mut n = n.clone();
            if let Some(p) = positions.get(n.id.as_str()) {
                if !n.is_note() {
                    n.position = *p;
                }
            }
            n
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::to_canvas;
    use crate::graph::params::{CompareParams, ConstantParams, PeriodParams, PriceParams};
    use crate::graph::{
        Block, BlockParams, Connection, DefinitionMeta, Endpoint, Note, StrategyDefinition,
    };

    fn block(id: &str, params: BlockParams) -> Block {
        Block::new(id, params, Position::new(999.0, 999.0))
    }

    fn wire(from: &str, out: &str, to: &str, input: &str) -> Connection {
        Connection::new(Endpoint::new(from, out), Endpoint::new(to, input))
    }

    fn pos(nodes: &[CanvasNode], id: &str) -> Position {
        nodes.iter().find(|n| n.id == id).unwrap().position
    }

    #[test]
    fn columns_follow_longest_path() {
        let def = StrategyDefinition {
            blocks: vec![
                block("p", BlockParams::Price(PriceParams::default())),
                block("k", BlockParams::Constant(ConstantParams { value: 100.0 })),
                block("s", BlockParams::Sma(PeriodParams { period: 20 })),
                block("c", BlockParams::Compare(CompareParams::default())),
                block("e", BlockParams::EntrySignal),
            ],
            connections: vec![
                wire("p", "price", "s", "price"),
                wire("s", "value", "c", "left"),
                wire("k", "value", "c", "right"),
                wire("c", "result", "e", "signal"),
            ],
            meta: DefinitionMeta::default(),
            notes: vec![Note {
                id: "n".into(),
                text: "hi".into(),
                position: Position::new(7.0, 7.0),
                anchor: None,
            }],
        };
        let (nodes, edges) = to_canvas(&def);
        let arranged = auto_arrange(&nodes, &edges);

        assert_eq!(pos(&arranged, "p"), Position::new(0.0, 0.0));
        assert_eq!(pos(&arranged, "k"), Position::new(0.0, ROW_HEIGHT));
        assert_eq!(pos(&arranged, "s").x, COLUMN_WIDTH);
        assert_eq!(pos(&arranged, "c").x, 2.0 * COLUMN_WIDTH);
        assert_eq!(pos(&arranged, "e").x, 3.0 * COLUMN_WIDTH);
        assert_eq!(pos(&arranged, "n"), Position::new(7.0, 7.0));
    }

    #[test]
    fn cycles_do_not_hang() {
        let def = StrategyDefinition {
            blocks: vec![
                block("a", BlockParams::And),
                block("b", BlockParams::Or),
                block("p", BlockParams::Price(PriceParams::default())),
            ],
            connections: vec![wire("a", "result", "b", "a"), wire("b", "result", "a", "a")],
            meta: DefinitionMeta::default(),
            notes: Vec::new(),
        };
        let (nodes, edges) = to_canvas(&def);
        let arranged = auto_arrange(&nodes, &edges);
        assert_eq!(pos(&arranged, "p").x, 0.0);
        assert_eq!(pos(&arranged, "a").x, COLUMN_WIDTH);
        assert_eq!(pos(&arranged, "b").x, COLUMN_WIDTH);
        assert_ne!(pos(&arranged, "a").y, pos(&arranged, "b").y);
    }
}
