//! Backward traversal from a port to the phrase that describes it.
//!
//! The graph is user-editable and may be cyclic whether or not it has been
//! validated, so the resolver carries the blocks on the current path and a
//! depth bound. Both hazards resolve to sentinel phrases; nothing here fails.
//!
//! Shared upstream blocks are resolved once: a phrase that did not touch the
//! path or the depth bound is the same from every caller, so it is memoised.
//! Fan-in still doubles phrase length per level, so phrases are capped in
//! length and each resolver has a fixed budget of block expansions.

use std::collections::HashMap;

use crate::graph::params::{CompareOp, CrossDirection, PriceSource};
use crate::graph::{Block, BlockId, BlockParams, StrategyDefinition};

use super::risk::{risk_exit_phrase, sizing_sentence};

/// Phrase for an input with no incoming connection.
pub const UNSPECIFIED: &str = "an unspecified condition";
/// Phrase for a block reached again on its own path.
pub const RECURSIVE: &str = "recursive condition";
/// Phrase once the traversal exceeds [`MAX_DEPTH`].
pub const TOO_DEEP: &str = "a deeply nested condition";

/// Maximum number of connections followed from the starting port.
pub const MAX_DEPTH: usize = 32;
/// Longest phrase kept for a single port; longer ones become [`TOO_DEEP`].
pub const MAX_PHRASE_LEN: usize = 2048;
/// Block expansions one resolver performs before answering [`TOO_DEEP`].
pub const MAX_EXPANSIONS: usize = 10_000;

pub(crate) struct Resolver<'a> {
    def: &'a StrategyDefinition,
    path: Vec<&'a BlockId>,
    resolved: HashMap<(&'a BlockId, &'a str), String>,
    expansions: usize,
    /// Set when the phrase being built hit the path or a bound.
    contextual: bool,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(def: &'a StrategyDefinition) -> Self {
        Self {
            def,
            path: Vec::new(),
            resolved: HashMap::new(),
            expansions: 0,
            contextual: false,
        }
    }

    /// Phrase for whatever feeds `port` on `block`.
    pub(crate) fn input(&mut self, block: &'a Block, port: &'a str, depth: usize) -> String {
        match self.def.feeding(&block.id, port) {
            Some(conn) => self.output(&conn.from.block_id, &conn.from.port, depth + 1),
            None => UNSPECIFIED.to_string(),
        }
    }

    /// Phrase for output `port` of block `id`.
    pub(crate) fn output(&mut self, id: &'a BlockId, port: &'a str, depth: usize) -> String {
        if depth > MAX_DEPTH {
            self.contextual = true;
            return TOO_DEEP.to_string();
        }
        if let Some(phrase) = self.resolved.get(&(id, port)) {
            return phrase.clone();
        }
        if self.path.contains(&id) {
            self.contextual = true;
            return RECURSIVE.to_string();
        }
        let Some(block) = self.def.block(id) else {
            return UNSPECIFIED.to_string();
        };
        if self.expansions >= MAX_EXPANSIONS {
            self.contextual = true;
            return TOO_DEEP.to_string();
        }
        self.expansions += 1;

        let outer = std::mem::replace(&mut self.contextual, false);
        self.path.push(id);
        let mut phrase = self.phrase(block, port, depth);
        self.path.pop();
        if phrase.len() > MAX_PHRASE_LEN {
            phrase = TOO_DEEP.to_string();
        }
        if !self.contextual {
            self.resolved.insert((id, port), phrase.clone());
        }
        self.contextual |= outer;
        phrase
    }

    fn phrase(&mut self, block: &'a Block, port: &str, depth: usize) -> String {
        match &block.params {
            BlockParams::Price(p) => format!("the {} price", p.source.name()),
            BlockParams::Volume => "volume".to_string(),
            BlockParams::Constant(p) => p.value.to_string(),
            BlockParams::Sma(p) => self.indicator(block, format!("the {}-day SMA", p.period), depth),
            BlockParams::Ema(p) => self.indicator(block, format!("the {}-day EMA", p.period), depth),
            BlockParams::Rsi(p) => self.indicator(block, format!("the {}-day RSI", p.period), depth),
            BlockParams::Atr(p) => format!("the {}-day ATR", p.period),
            BlockParams::Macd(p) => {
                let series = match port {
                    "signal" => "the MACD signal line",
                    "histogram" => "the MACD histogram",
                    _ => "the MACD line",
                };
                let base = format!(
                    "{series} ({}/{}/{})",
                    p.fast_period, p.slow_period, p.signal_period
                );
                self.indicator(block, base, depth)
            }
            BlockParams::Bollinger(p) => {
                let band = match port {
                    "middle" => "middle",
                    "lower" => "lower",
                    _ => "upper",
                };
                let base = format!(
                    "the {band} Bollinger Band ({}-day, {} std dev)",
                    p.period, p.std_dev
                );
                self.indicator(block, base, depth)
            }
            BlockParams::Compare(p) => {
                let left = self.input(block, "left", depth);
                let right = self.input(block, "right", depth);
                format!("{left} is {} {right}", operator_words(p.operator))
            }
            BlockParams::Crossover(p) => {
                let fast = self.input(block, "fast", depth);
                let slow = self.input(block, "slow", depth);
                let verb = match p.direction {
                    CrossDirection::CrossesAbove => "crosses above",
                    CrossDirection::CrossesBelow => "crosses below",
                };
                format!("{fast} {verb} {slow}")
            }
            BlockParams::And => {
                let a = self.input(block, "a", depth);
                let b = self.input(block, "b", depth);
                format!("both {a} and {b}")
            }
            BlockParams::Or => {
                let a = self.input(block, "a", depth);
                let b = self.input(block, "b", depth);
                format!("either {a} or {b}")
            }
            BlockParams::Not => {
                let inner = self.input(block, "input", depth);
                format!("it is not true that {inner}")
            }
            BlockParams::EntrySignal | BlockParams::ExitSignal => {
                self.input(block, "signal", depth)
            }
            BlockParams::PositionSize(p) => sizing_sentence(p),
            BlockParams::StopLoss(_)
            | BlockParams::TakeProfit(_)
            | BlockParams::TrailingStop(_)
            | BlockParams::MaxDrawdown(_)
            | BlockParams::TimeExit(_) => {
                risk_exit_phrase(&block.params).unwrap_or_else(|| UNSPECIFIED.to_string())
            }
            BlockParams::Unknown(u) => format!("an unrecognized {} block", u.type_name),
        }
    }

    /// Indicators over the close price read as just their name; any other
    /// source is appended ("the 14-day RSI of volume").
    fn indicator(&mut self, block: &'a Block, base: String, depth: usize) -> String {
        let Some(conn) = self.def.feeding(&block.id, "price") else {
            return base;
        };
        let from_close = matches!(
            self.def.block(&conn.from.block_id).map(|b| &b.params),
            Some(BlockParams::Price(p)) if p.source == PriceSource::Close
        );
        if from_close {
            return base;
        }
        let inner = self.output(&conn.from.block_id, &conn.from.port, depth + 1);
        format!("{base} of {inner}")
    }
}

fn operator_words(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Gt => "above",
        CompareOp::Lt => "below",
        CompareOp::Gte => "at or above",
        CompareOp::Lte => "at or below",
        CompareOp::Eq => "equal to",
    }
}

/// Natural-language phrase for one block, for canvas summaries.
///
/// Blocks with several outputs are described by their first output. `None`
/// when no block has the id.
pub fn describe_block(definition: &StrategyDefinition, id: &BlockId) -> Option<String> {
    let block = definition.block(id)?;
    let mut resolver = Resolver::new(definition);
    let phrase = match &block.params {
        BlockParams::EntrySignal => format!("enter when {}", resolver.input(block, "signal", 0)),
        BlockParams::ExitSignal => format!("exit when {}", resolver.input(block, "signal", 0)),
        _ => {
            let port = block
                .meta()
                .and_then(|m| m.outputs.first())
                .map_or("", |p| p.name);
            resolver.output(&block.id, port, 0)
        }
    };
    Some(phrase)
}
