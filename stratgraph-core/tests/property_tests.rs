//! Property tests for the pure core.
//!
//! Uses proptest to verify:
//! 1. Canvas round-trip: to_definition(to_canvas(d)) == d
//! 2. Tidy idempotence: tidy(tidy(e)) == tidy(e)
//! 3. History bounds: past never exceeds the limit; present is the last push
//! 4. Undo/redo inverse: undo then redo restores present exactly
//! 5. Redo cleared on new edit
//! 6. Validator and explainer never panic on arbitrary wiring

use proptest::prelude::*;
use stratgraph_core::canvas::{tidy_connections, to_canvas, to_definition, CanvasEdge, CanvasNode};
use stratgraph_core::explain::explain;
use stratgraph_core::graph::params::{
    CompareOp, CompareParams, ConstantParams, PeriodParams, PriceParams, StopLossParams,
};
use stratgraph_core::graph::{
    Block, BlockParams, Connection, DefinitionMeta, Endpoint, Position, StrategyDefinition,
};
use stratgraph_core::history::{HistoryState, MAX_HISTORY};
use stratgraph_core::validate::validate;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Two decimals keep JSON float round-trips exact.
fn cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn arb_params() -> impl Strategy<Value = BlockParams> {
    prop_oneof![
        Just(BlockParams::Price(PriceParams::default())),
        Just(BlockParams::Volume),
        (-1000.0..1000.0_f64)
            .prop_map(|v| BlockParams::Constant(ConstantParams { value: cents(v) })),
        (1u32..500).prop_map(|period| BlockParams::Sma(PeriodParams { period })),
        (1u32..500).prop_map(|period| BlockParams::Ema(PeriodParams { period })),
        (2u32..100).prop_map(|period| BlockParams::Rsi(PeriodParams { period })),
        Just(BlockParams::Compare(CompareParams {
            operator: CompareOp::Lt
        })),
        Just(BlockParams::And),
        Just(BlockParams::Not),
        Just(BlockParams::EntrySignal),
        Just(BlockParams::ExitSignal),
        (0.1..100.0_f64)
            .prop_map(|pct| BlockParams::StopLoss(StopLossParams { stop_loss_pct: cents(pct) })),
    ]
}

fn arb_position() -> impl Strategy<Value = Position> {
    (-2000.0..2000.0_f64, -2000.0..2000.0_f64).prop_map(|(x, y)| Position::new(cents(x), cents(y)))
}

/// Definitions with unique ids and connections between declared ports.
/// Wiring is arbitrary, so cycles and duplicate inputs occur.
fn arb_definition() -> impl Strategy<Value = StrategyDefinition> {
    prop::collection::vec((arb_params(), arb_position()), 1..12).prop_flat_map(|specs| {
        let n = specs.len();
        let pairs = prop::collection::vec((0..n, 0..n), 0..20);
        (Just(specs), pairs).prop_map(|(specs, pairs)| {
            let blocks: Vec<Block> = specs
                .into_iter()
                .enumerate()
                .map(|(i, (params, position))| Block::new(format!("b{i}"), params, position))
                .collect();
            let mut connections: Vec<Connection> = Vec::new();
            for (from, to) in pairs {
                let (Some(out), Some(input)) = (
                    blocks[from].meta().and_then(|m| m.outputs.first()),
                    blocks[to].meta().and_then(|m| m.inputs.first()),
                ) else {
                    continue;
                };
                let c = Connection::new(
                    Endpoint::new(blocks[from].id.clone(), out.name),
                    Endpoint::new(blocks[to].id.clone(), input.name),
                );
                if !connections.contains(&c) {
                    connections.push(c);
                }
            }
            StrategyDefinition {
                blocks,
                connections,
                meta: DefinitionMeta::default(),
                notes: Vec::new(),
            }
        })
    })
}

fn arb_edges() -> impl Strategy<Value = Vec<CanvasEdge>> {
    let name = prop::sample::select(vec!["a", "b", "c", "d"]);
    let handle = prop::sample::select(vec!["value", "left", "right", "signal"]);
    prop::collection::vec(
        (name.clone(), handle.clone(), name, handle, any::<bool>()),
        0..16,
    )
    .prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (s, sh, t, th, selected))| CanvasEdge {
                id: format!("e{i}"),
                source: s.to_string(),
                source_handle: sh.to_string(),
                target: t.to_string(),
                target_handle: th.to_string(),
                selected,
            })
            .collect()
    })
}

/// A one-node canvas whose only difference between pushes is the SMA period.
fn canvas_with_period(period: u32) -> (Vec<CanvasNode>, Vec<CanvasEdge>) {
    to_canvas(&StrategyDefinition {
        blocks: vec![Block::new(
            "s",
            BlockParams::Sma(PeriodParams { period }),
            Position::default(),
        )],
        ..StrategyDefinition::empty()
    })
}

fn history_after(pushes: u32) -> HistoryState {
    (1..=pushes).fold(HistoryState::reset_history(&[], &[]), |h, p| {
        let (nodes, edges) = canvas_with_period(p);
        h.push_snapshot(&nodes, &edges)
    })
}

// ── 1. Canvas round-trip ─────────────────────────────────────────────

proptest! {
    #[test]
    fn canvas_round_trip(def in arb_definition()) {
        let (nodes, edges) = to_canvas(&def);
        let back = to_definition(&nodes, &edges);
        prop_assert_eq!(&back.blocks, &def.blocks);
        let mut a = back.connections.clone();
        let mut b = def.connections.clone();
        a.sort();
        b.sort();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn json_round_trip(def in arb_definition()) {
        let json = serde_json::to_string(&def).unwrap();
        let back: StrategyDefinition = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back.canonical_json(), def.canonical_json());
    }
}

// ── 2. Tidy idempotence ──────────────────────────────────────────────

proptest! {
    #[test]
    fn tidy_is_idempotent(edges in arb_edges()) {
        let once = tidy_connections(&edges);
        prop_assert_eq!(tidy_connections(&once), once.clone());
        prop_assert!(once.len() <= edges.len());
    }
}

// ── 3-5. History ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn history_is_bounded(extra in 0u32..40) {
        let total = MAX_HISTORY as u32 + extra;
        let h = history_after(total);
        prop_assert_eq!(h.past_len(), MAX_HISTORY);
        let (nodes, _) = canvas_with_period(total);
        prop_assert_eq!(&h.present().nodes, &nodes);
    }

    #[test]
    fn undo_then_redo_restores_present(pushes in 1u32..80) {
        let h = history_after(pushes);
        let before = h.present().clone();
        let step = h.undo();
        prop_assert!(step.snapshot.is_some());
        let step = step.history.redo();
        prop_assert_eq!(step.snapshot.as_ref(), Some(&before));
        prop_assert_eq!(step.history.present(), &before);
    }

    #[test]
    fn new_push_clears_redo(pushes in 2u32..30, undos in 1u32..5) {
        let mut h = history_after(pushes);
        for _ in 0..undos {
            h = h.undo().history;
        }
        prop_assert!(h.can_redo());
        let (nodes, edges) = canvas_with_period(10_000);
        let h = h.push_snapshot(&nodes, &edges);
        prop_assert!(!h.can_redo());
        let step = h.redo();
        prop_assert!(step.snapshot.is_none());
    }
}

// ── 6. Total functions ───────────────────────────────────────────────

proptest! {
    #[test]
    fn validate_and_explain_are_total(def in arb_definition()) {
        let report = validate(&def);
        prop_assert_eq!(report.is_valid(), report.errors.is_empty());
        let _ = explain(&def);
    }
}
