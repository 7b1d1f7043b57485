//! Undo/redo history over whole canvas snapshots.
//!
//! Every operation consumes the state and returns the next one; nothing is
//! shared between states. Snapshots are compared by value, after stripping
//! transient UI state (selection, error highlights, summaries), so pushing a
//! snapshot that only differs in decoration is a no-op.
//!
//! There is no timing logic here: callers debounce `push_snapshot`.

use std::collections::VecDeque;

use crate::canvas::{to_canvas, to_definition_with_meta, CanvasEdge, CanvasNode};
use crate::graph::{DefinitionMeta, StrategyDefinition};

/// Default bound on the number of undo steps kept.
pub const MAX_HISTORY: usize = 50;

/// One whole-canvas state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistorySnapshot {
    pub nodes: Vec<CanvasNode>,
    pub edges: Vec<CanvasEdge>,
}

impl HistorySnapshot {
    pub fn new(nodes: &[CanvasNode], edges: &[CanvasEdge]) -> Self {
        Self {
            nodes: nodes.iter().map(CanvasNode::without_transient_state).collect(),
            edges: edges.iter().map(CanvasEdge::without_transient_state).collect(),
        }
    }

    pub fn from_definition(definition: &StrategyDefinition) -> Self {
        let (nodes, edges) = to_canvas(definition);
        Self::new(&nodes, &edges)
    }

    pub fn to_definition(&self, meta: DefinitionMeta) -> StrategyDefinition {
        to_definition_with_meta(&self.nodes, &self.edges, meta)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryState {
    past: VecDeque<HistorySnapshot>,
    present: HistorySnapshot,
    future: Vec<HistorySnapshot>,
    limit: usize,
}

/// Result of `undo`/`redo`: the next state, plus the snapshot to apply when
/// one was available.
#[derive(Debug, Clone)]
pub struct HistoryStep {
    pub history: HistoryState,
    pub snapshot: Option<HistorySnapshot>,
}

impl HistoryState {
    /// Fresh history with `present` set and nothing to undo or redo.
    pub fn reset_history(nodes: &[CanvasNode], edges: &[CanvasEdge]) -> Self {
        Self::with_limit(nodes, edges, MAX_HISTORY)
    }

    /// Like [`reset_history`](Self::reset_history) with a custom bound. A
    /// limit of zero is raised to one.
    pub fn with_limit(nodes: &[CanvasNode], edges: &[CanvasEdge], limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            present: HistorySnapshot::new(nodes, edges),
            future: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record a new present. The old present moves onto `past` (dropping the
    /// oldest entry beyond the limit) and `future` is cleared.
    ///
    /// A snapshot structurally equal to `present` leaves the state unchanged,
    /// including `future`.
    pub fn push_snapshot(mut self, nodes: &[CanvasNode], edges: &[CanvasEdge]) -> Self {
        let snapshot = HistorySnapshot::new(nodes, edges);
        if snapshot == self.present {
            return self;
        }
        let previous = std::mem::replace(&mut self.present, snapshot);
        self.push_past(previous);
        self.future.clear();
        self
    }

    pub fn undo(mut self) -> HistoryStep {
        let Some(previous) = self.past.pop_back() else {
            return HistoryStep {
                history: self,
                snapshot: None,
            };
        };
        let current = std::mem::replace(&mut self.present, previous);
        self.future.push(current);
        let snapshot = Some(self.present.clone());
        HistoryStep {
            history: self,
            snapshot,
        }
    }

    pub fn redo(mut self) -> HistoryStep {
        let Some(next) = self.future.pop() else {
            return HistoryStep {
                history: self,
                snapshot: None,
            };
        };
        let current = std::mem::replace(&mut self.present, next);
        self.push_past(current);
        let snapshot = Some(self.present.clone());
        HistoryStep {
            history: self,
            snapshot,
        }
    }

    pub fn clear_future(mut self) -> Self {
        self.future.clear();
        self
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn present(&self) -> &HistorySnapshot {
        &self.present
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn push_past(&mut self, snapshot: HistorySnapshot) {
        self.past.push_back(snapshot);
        while self.past.len() > self.limit {
            self.past.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::NodeData;
    use crate::graph::params::PeriodParams;
    use crate::graph::{Block, BlockParams, Position};

    fn sma_node(id: &str, period: u32) -> CanvasNode {
        let def = StrategyDefinition {
            blocks: vec![Block::new(
                id,
                BlockParams::Sma(PeriodParams { period }),
                Position::default(),
            )],
            ..StrategyDefinition::empty()
        };
        to_canvas(&def).0.remove(0)
    }

    fn state_after(periods: &[u32]) -> HistoryState {
        periods.iter().fold(HistoryState::reset_history(&[], &[]), |h, &p| {
            h.push_snapshot(&[sma_node("s", p)], &[])
        })
    }

    #[test]
    fn reset_is_empty() {
        let h = HistoryState::reset_history(&[sma_node("s", 1)], &[]);
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert_eq!(h.present().nodes.len(), 1);
        assert_eq!(h.limit(), MAX_HISTORY);
    }

    #[test]
    fn undo_redo_walk() {
        let h = state_after(&[10, 20, 30]);
        assert_eq!(h.past_len(), 3);

        let step = h.undo();
        let snap = step.snapshot.unwrap();
        assert_eq!(snap, step.history.present().clone());
        assert!(step.history.can_redo());

        let step = step.history.redo();
        assert_eq!(step.history.present().nodes, vec![sma_node("s", 30)]);
        assert!(!step.history.can_redo());
    }

    #[test]
    fn underflow_is_a_no_op() {
        let h = HistoryState::reset_history(&[], &[]);
        let step = h.clone().undo();
        assert!(step.snapshot.is_none());
        assert_eq!(step.history, h);
        let step = h.clone().redo();
        assert!(step.snapshot.is_none());
        assert_eq!(step.history, h);
    }

    #[test]
    fn identical_push_keeps_future() {
        let h = state_after(&[10, 20]).undo().history;
        assert!(h.can_redo());
        let present = h.present().clone();
        let h = h.push_snapshot(&present.nodes, &present.edges);
        assert!(h.can_redo());
    }

    #[test]
    fn transient_state_does_not_create_a_step() {
        let h = state_after(&[10]);
        let mut node = sma_node("s", 10);
        node.selected = true;
        if let NodeData::Block(data) = &mut node.data {
            data.has_error = true;
            data.errors.push("bad".into());
        }
        let h = h.push_snapshot(&[node], &[]);
        assert_eq!(h.past_len(), 1);
    }

    #[test]
    fn limit_drops_oldest() {
        let h = (0..5).fold(HistoryState::with_limit(&[], &[], 3), |h, p| {
            h.push_snapshot(&[sma_node("s", p + 1)], &[])
        });
        assert_eq!(h.past_len(), 3);
        // Oldest surviving entry is the push of period 2.
        let mut h = h;
        for _ in 0..3 {
            h = h.undo().history;
        }
        assert_eq!(h.present().nodes, vec![sma_node("s", 2)]);
        assert!(!h.can_undo());
    }

    #[test]
    fn snapshot_converts_back_to_definition() {
        let def = StrategyDefinition {
            blocks: vec![Block::new(
                "s",
                BlockParams::Sma(PeriodParams { period: 9 }),
                Position::new(1.0, 2.0),
            )],
            ..StrategyDefinition::empty()
        };
        let snap = HistorySnapshot::from_definition(&def);
        assert_eq!(snap.to_definition(DefinitionMeta::default()), def);
    }
}
