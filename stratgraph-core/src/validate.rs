//! Structural and semantic validation of a strategy graph.
//!
//! `validate` is a pure function over a snapshot. Problems are reported as a
//! list of `ValidationError`s, never raised: the caller decides whether an
//! invalid graph blocks a save. Errors with a `block_id` are annotated onto
//! that block on the canvas; errors without one are graph-global.
//!
//! Rules, in report order:
//! - an entry signal must exist; an exit condition (connected exit signal or
//!   any risk-exit block) must exist
//! - block ids are unique
//! - block types are known and their params readable
//! - numeric params lie within the registry's [min, max]
//! - MACD fast period < slow period
//! - take-profit ladders ascend strictly and close at most 100% in total
//! - each risk/sizing block type appears at most once
//! - connections reference existing blocks and declared ports of matching kind
//! - every declared input has exactly one incoming connection

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::graph::params::{BlockParams, TakeProfitParams, UnknownReason};
use crate::graph::{Block, BlockId, Connection, StrategyDefinition};
use crate::registry::{BlockType, Category, PortKind};

/// Slack for float error when summing ladder close percentages.
const CLOSE_TOTAL_TOLERANCE: f64 = 1e-9;

// ─── Result types ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    MissingEntrySignal,
    MissingExitCondition,
    DuplicateBlockId,
    UnknownBlockType,
    InvalidParams,
    ParamOutOfRange,
    ParamOrder,
    TakeProfitNotAscending,
    TakeProfitCloseTotal,
    DuplicateRiskBlock,
    DanglingConnection,
    InvalidPort,
    PortTypeMismatch,
    UnconnectedInput,
    DuplicateInput,
}

impl ValidationCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingEntrySignal => "MISSING_ENTRY_SIGNAL",
            Self::MissingExitCondition => "MISSING_EXIT_CONDITION",
            Self::DuplicateBlockId => "DUPLICATE_BLOCK_ID",
            Self::UnknownBlockType => "UNKNOWN_BLOCK_TYPE",
            Self::InvalidParams => "INVALID_PARAMS",
            Self::ParamOutOfRange => "PARAM_OUT_OF_RANGE",
            Self::ParamOrder => "PARAM_ORDER",
            Self::TakeProfitNotAscending => "TAKE_PROFIT_NOT_ASCENDING",
            Self::TakeProfitCloseTotal => "TAKE_PROFIT_CLOSE_TOTAL",
            Self::DuplicateRiskBlock => "DUPLICATE_RISK_BLOCK",
            Self::DanglingConnection => "DANGLING_CONNECTION",
            Self::InvalidPort => "INVALID_PORT",
            Self::PortTypeMismatch => "PORT_TYPE_MISMATCH",
            Self::UnconnectedInput => "UNCONNECTED_INPUT",
            Self::DuplicateInput => "DUPLICATE_INPUT",
        }
    }

    /// Relative link into the validation help page.
    pub fn help_link(self) -> String {
        format!(
            "/docs/validation#{}",
            self.as_str().to_ascii_lowercase().replace('_', "-")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<BlockId>,
    pub code: ValidationCode,
    /// Developer-facing description.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_link: Option<String>,
}

impl ValidationError {
    fn global(code: ValidationCode, message: String, user_message: &str) -> Self {
        Self {
            block_id: None,
            code,
            message,
            user_message: Some(user_message.to_string()),
            help_link: Some(code.help_link()),
        }
    }

    fn on_block(
        block_id: &BlockId,
        code: ValidationCode,
        message: String,
        user_message: String,
    ) -> Self {
        Self {
            block_id: Some(block_id.clone()),
            code,
            message,
            user_message: Some(user_message),
            help_link: Some(code.help_link()),
        }
    }

    /// The text to show a user: the friendly message when there is one.
    pub fn display_message(&self) -> &str {
        self.user_message.as_deref().unwrap_or(&self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Valid,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub status: ValidationStatus,
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        let status = if errors.is_empty() {
            ValidationStatus::Valid
        } else {
            ValidationStatus::Invalid
        };
        Self { status, errors }
    }

    pub fn is_valid(&self) -> bool {
        self.status == ValidationStatus::Valid
    }

    /// Errors scoped to one block.
    pub fn errors_for(&self, id: &BlockId) -> Vec<&ValidationError> {
        self.errors
            .iter()
            .filter(|e| e.block_id.as_ref() == Some(id))
            .collect()
    }

    /// Graph-global errors.
    pub fn global_errors(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|e| e.block_id.is_none())
    }
}

// ─── Entry point ────────────────────────────────────────────────────

/// Validate a strategy graph.
pub fn validate(definition: &StrategyDefinition) -> ValidationReport {
    let mut errors = Vec::new();

    check_entry_and_exit(definition, &mut errors);
    check_unique_ids(definition, &mut errors);
    for block in &definition.blocks {
        check_block_params(block, &mut errors);
    }
    check_cardinality(definition, &mut errors);
    check_connections(definition, &mut errors);
    check_inputs(definition, &mut errors);

    ValidationReport::from_errors(errors)
}

// ─── Rules ──────────────────────────────────────────────────────────

fn check_entry_and_exit(def: &StrategyDefinition, errors: &mut Vec<ValidationError>) {
    if def.blocks_of_type(BlockType::EntrySignal).next().is_none() {
        errors.push(ValidationError::global(
            ValidationCode::MissingEntrySignal,
            "graph has no entry_signal block".into(),
            "Add an Entry Signal block so the strategy knows when to open a position.",
        ));
    }

    let connected_exit = def
        .blocks_of_type(BlockType::ExitSignal)
        .any(|b| def.has_live_input(&b.id, "signal"));
    let risk_exit = def
        .blocks
        .iter()
        .any(|b| b.block_type().is_some_and(BlockType::is_risk_exit));
    if !connected_exit && !risk_exit {
        errors.push(ValidationError::global(
            ValidationCode::MissingExitCondition,
            "graph has no connected exit_signal and no risk block".into(),
            "Add a connected Exit Signal or a risk block (stop loss, take profit, trailing stop, \
             max drawdown, or time exit) so positions get closed.",
        ));
    }
}

fn check_unique_ids(def: &StrategyDefinition, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for block in &def.blocks {
        if !seen.insert(&block.id) {
            errors.push(ValidationError::on_block(
                &block.id,
                ValidationCode::DuplicateBlockId,
                format!("block id '{}' is used more than once", block.id),
                "Two blocks share the same id; delete and re-add one of them.".into(),
            ));
        }
    }
}

fn check_block_params(block: &Block, errors: &mut Vec<ValidationError>) {
    let meta = match (&block.params, block.meta()) {
        (BlockParams::Unknown(unknown), _) => {
            let (code, message, user) = match &unknown.reason {
                UnknownReason::UnrecognizedType => (
                    ValidationCode::UnknownBlockType,
                    format!("unknown block type '{}'", unknown.type_name),
                    format!(
                        "'{}' blocks are not supported by this version of the editor.",
                        unknown.type_name
                    ),
                ),
                UnknownReason::MalformedParams(reason) => (
                    ValidationCode::InvalidParams,
                    format!("{} params could not be read: {reason}", unknown.type_name),
                    format!("The settings of this {} block are invalid.", unknown.type_name),
                ),
            };
            errors.push(ValidationError::on_block(&block.id, code, message, user));
            return;
        }
        (_, Some(meta)) => meta,
        (_, None) => return,
    };

    for (name, value) in block.params.numeric_params() {
        let Some(spec) = meta.param(name) else {
            continue;
        };
        if !spec.contains(value) {
            errors.push(ValidationError::on_block(
                &block.id,
                ValidationCode::ParamOutOfRange,
                format!(
                    "{}.{name} = {value} is outside [{}, {}]",
                    meta.block_type.name(),
                    spec.min,
                    spec.max
                ),
                format!(
                    "{} {} must be between {} and {}.",
                    meta.label,
                    name.replace('_', " "),
                    spec.min,
                    spec.max
                ),
            ));
        }
    }

    match &block.params {
        BlockParams::Macd(p) if p.fast_period >= p.slow_period => {
            errors.push(ValidationError::on_block(
                &block.id,
                ValidationCode::ParamOrder,
                format!(
                    "macd fast_period {} must be below slow_period {}",
                    p.fast_period, p.slow_period
                ),
                "The MACD fast period must be shorter than the slow period.".into(),
            ));
        }
        BlockParams::TakeProfit(p) => check_take_profit_ladder(&block.id, p, errors),
        _ => {}
    }
}

/// Ladder rules: profit targets strictly ascending; total close share ≤ 100%.
fn check_take_profit_ladder(
    id: &BlockId,
    params: &TakeProfitParams,
    errors: &mut Vec<ValidationError>,
) {
    if !params.is_ladder() {
        return;
    }

    let ascending = params
        .levels
        .windows(2)
        .all(|pair| pair[1].profit_pct > pair[0].profit_pct);
    if !ascending {
        let targets: Vec<String> = params
            .levels
            .iter()
            .map(|l| format!("{}%", l.profit_pct))
            .collect();
        errors.push(ValidationError::on_block(
            id,
            ValidationCode::TakeProfitNotAscending,
            format!(
                "take-profit levels must ascend strictly: {}",
                targets.join(", ")
            ),
            "Each take-profit level must target a higher profit than the one before it.".into(),
        ));
    }

    let total: f64 = params.levels.iter().map(|l| l.close_pct).sum();
    if total > 100.0 + CLOSE_TOTAL_TOLERANCE {
        errors.push(ValidationError::on_block(
            id,
            ValidationCode::TakeProfitCloseTotal,
            format!("take-profit levels close {total:.2}% of the position in total"),
            "Take-profit levels cannot close more than 100% of the position.".into(),
        ));
    }
}

/// One block per risk/sizing type. The first occurrence is kept; each later
/// one is reported.
fn check_cardinality(def: &StrategyDefinition, errors: &mut Vec<ValidationError>) {
    let mut seen: HashSet<BlockType> = HashSet::new();
    for block in &def.blocks {
        let Some(block_type) = block.block_type() else {
            continue;
        };
        if !matches!(block_type.category(), Category::Risk | Category::Sizing) {
            continue;
        }
        if !seen.insert(block_type) {
            let label = block_type.meta().label;
            errors.push(ValidationError::on_block(
                &block.id,
                ValidationCode::DuplicateRiskBlock,
                format!("more than one {} block", block_type.name()),
                format!("Only one {label} block is allowed per strategy."),
            ));
        }
    }
}

fn check_connections(def: &StrategyDefinition, errors: &mut Vec<ValidationError>) {
    for conn in &def.connections {
        let from = def.block(&conn.from.block_id);
        let to = def.block(&conn.to.block_id);

        let (from, to) = match (from, to) {
            (Some(from), Some(to)) => (from, to),
            (from, to) => {
                let anchor = from.or(to).map(|b| &b.id);
                let missing = if from.is_none() {
                    &conn.from.block_id
                } else {
                    &conn.to.block_id
                };
                errors.push(dangling(conn, missing, anchor));
                continue;
            }
        };

        let out_port = from.meta().map(|m| m.output(&conn.from.port));
        if let Some(None) = out_port {
            errors.push(ValidationError::on_block(
                &from.id,
                ValidationCode::InvalidPort,
                format!("{} has no output port '{}'", from.type_name(), conn.from.port),
                format!(
                    "This block has no '{}' output; reconnect the wire.",
                    conn.from.port
                ),
            ));
        }
        let in_port = to.meta().map(|m| m.input(&conn.to.port));
        if let Some(None) = in_port {
            errors.push(ValidationError::on_block(
                &to.id,
                ValidationCode::InvalidPort,
                format!("{} has no input port '{}'", to.type_name(), conn.to.port),
                format!(
                    "This block has no '{}' input; reconnect the wire.",
                    conn.to.port
                ),
            ));
        }

        if let (Some(Some(out_spec)), Some(Some(in_spec))) = (out_port, in_port) {
            if out_spec.kind != in_spec.kind {
                errors.push(ValidationError::on_block(
                    &to.id,
                    ValidationCode::PortTypeMismatch,
                    format!(
                        "{}.{} ({:?}) wired into {}.{} ({:?})",
                        from.type_name(),
                        out_spec.name,
                        out_spec.kind,
                        to.type_name(),
                        in_spec.name,
                        in_spec.kind
                    ),
                    format!(
                        "The '{}' input expects a {}, but it is wired to a {}.",
                        in_spec.name,
                        kind_word(in_spec.kind),
                        kind_word(out_spec.kind)
                    ),
                ));
            }
        }
    }
}

fn dangling(conn: &Connection, missing: &BlockId, anchor: Option<&BlockId>) -> ValidationError {
    ValidationError {
        block_id: anchor.cloned(),
        code: ValidationCode::DanglingConnection,
        message: format!(
            "connection {}.{} -> {}.{} references missing block '{missing}'",
            conn.from.block_id, conn.from.port, conn.to.block_id, conn.to.port
        ),
        user_message: Some("A wire points at a block that no longer exists.".into()),
        help_link: Some(ValidationCode::DanglingConnection.help_link()),
    }
}

fn kind_word(kind: PortKind) -> &'static str {
    match kind {
        PortKind::Number => "number",
        PortKind::Condition => "condition",
    }
}

/// Every declared input needs exactly one incoming connection from an
/// existing block. Several connections into one input are rejected rather
/// than resolved by order.
fn check_inputs(def: &StrategyDefinition, errors: &mut Vec<ValidationError>) {
    let mut feeds: HashMap<(&BlockId, &str), usize> = HashMap::new();
    for conn in &def.connections {
        if def.contains_block(&conn.from.block_id) {
            *feeds
                .entry((&conn.to.block_id, conn.to.port.as_str()))
                .or_default() += 1;
        }
    }

    for block in &def.blocks {
        let Some(meta) = block.meta() else {
            continue;
        };
        for input in meta.inputs {
            match feeds.get(&(&block.id, input.name)).copied().unwrap_or(0) {
                0 => {
                    let user = if meta.block_type == BlockType::EntrySignal {
                        "Connect a condition to the Entry Signal so it knows when to enter."
                            .to_string()
                    } else {
                        format!("Connect something to the '{}' input of {}.", input.name, block.label)
                    };
                    errors.push(ValidationError::on_block(
                        &block.id,
                        ValidationCode::UnconnectedInput,
                        format!("{}.{} has no incoming connection", block.id, input.name),
                        user,
                    ));
                }
                1 => {}
                n => errors.push(ValidationError::on_block(
                    &block.id,
                    ValidationCode::DuplicateInput,
                    format!("{}.{} has {n} incoming connections", block.id, input.name),
                    format!(
                        "The '{}' input of {} can only take one wire.",
                        input.name, block.label
                    ),
                )),
            }
        }
    }
}
