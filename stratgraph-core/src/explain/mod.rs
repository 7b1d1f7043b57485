//! Plain-English summary of a strategy graph.
//!
//! Display only: nothing in validation or persistence reads an explanation.
//! `explain` always returns a value; missing pieces and cycles become
//! sentinel phrases inside the text.

mod risk;
mod traverse;

use serde::{Deserialize, Serialize};

use crate::graph::{BlockParams, StrategyDefinition};
use crate::registry::BlockType;

pub use risk::{risk_exit_phrase, sizing_sentence};
pub use traverse::{describe_block, MAX_DEPTH, RECURSIVE, TOO_DEEP, UNSPECIFIED};

use traverse::Resolver;

/// Shown instead of a summary when the graph lacks an entry or exit.
pub const FALLBACK_GUIDANCE: &str = "Add an Entry Signal and at least one exit (an Exit Signal \
     or a risk block such as a stop loss) to see a summary of this strategy.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplanationStatus {
    Valid,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub status: ExplanationStatus,
    pub entry: String,
    pub exit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<String>,
}

impl Explanation {
    fn fallback() -> Self {
        Self {
            status: ExplanationStatus::Fallback,
            entry: FALLBACK_GUIDANCE.to_string(),
            exit: String::new(),
            risk: None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.status == ExplanationStatus::Fallback
    }
}

/// Explain when the strategy enters, when it exits, and how it sizes.
pub fn explain(definition: &StrategyDefinition) -> Explanation {
    let entries: Vec<_> = definition.blocks_of_type(BlockType::EntrySignal).collect();

    // Exit signals count only when something is wired into them.
    let exit_signals: Vec<_> = definition
        .blocks_of_type(BlockType::ExitSignal)
        .filter(|b| definition.has_live_input(&b.id, "signal"))
        .collect();
    let risk_exits: Vec<String> = definition
        .blocks
        .iter()
        .filter_map(|b| risk_exit_phrase(&b.params))
        .collect();

    if entries.is_empty() || (exit_signals.is_empty() && risk_exits.is_empty()) {
        return Explanation::fallback();
    }

    let mut resolver = Resolver::new(definition);
    let entry_phrases: Vec<String> = entries
        .iter()
        .map(|b| resolver.input(b, "signal", 0))
        .collect();
    let exit_phrases: Vec<String> = exit_signals
        .iter()
        .map(|b| resolver.input(b, "signal", 0))
        .chain(risk_exits)
        .collect();

    let risk = definition.blocks.iter().find_map(|b| match &b.params {
        BlockParams::PositionSize(p) => Some(sizing_sentence(p)),
        _ => None,
    });

    Explanation {
        status: ExplanationStatus::Valid,
        entry: format!("Enter a position when {}.", join_or(&entry_phrases)),
        exit: format!("Exit when {}.", join_or(&exit_phrases)),
        risk,
    }
}

/// "A", "A or B", "A, B, or C".
pub fn join_or(phrases: &[String]) -> String {
    match phrases {
        [] => String::new(),
        [only] => only.clone(),
        [a, b] => format!("{a} or {b}"),
        [init @ .., last] => format!("{}, or {last}", init.join(", ")),
    }
}
