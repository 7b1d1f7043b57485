//! Block registry: the static catalog of block kinds.
//!
//! Every block kind declares its category, typed input/output ports, numeric
//! parameter ranges, and a typed default parameter record. The catalog is
//! read-only and available before first use; nothing mutates it at runtime.
//!
//! Lookups by name return `Option` rather than failing: unknown type names are
//! an expected transient state when a graph saved by a newer build is loaded.

use serde::{Deserialize, Serialize};

use crate::graph::params::{
    BlockParams, BollingerParams, CompareParams, ConstantParams, CrossoverParams, MacdParams,
    MaxDrawdownParams, PeriodParams, PositionSizeParams, PriceParams, StopLossParams,
    TakeProfitParams, TimeExitParams, TrailingStopParams,
};

// ─── Block types ────────────────────────────────────────────────────

/// Every block kind the editor knows how to render, validate, and explain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Price,
    Volume,
    Constant,
    Sma,
    Ema,
    Rsi,
    Macd,
    Bollinger,
    Atr,
    Compare,
    Crossover,
    And,
    Or,
    Not,
    EntrySignal,
    ExitSignal,
    StopLoss,
    TakeProfit,
    TrailingStop,
    MaxDrawdown,
    TimeExit,
    PositionSize,
}

impl BlockType {
    /// All block types in catalog order.
    pub const ALL: [BlockType; 22] = [
        Self::Price,
        Self::Volume,
        Self::Constant,
        Self::Sma,
        Self::Ema,
        Self::Rsi,
        Self::Macd,
        Self::Bollinger,
        Self::Atr,
        Self::Compare,
        Self::Crossover,
        Self::And,
        Self::Or,
        Self::Not,
        Self::EntrySignal,
        Self::ExitSignal,
        Self::StopLoss,
        Self::TakeProfit,
        Self::TrailingStop,
        Self::MaxDrawdown,
        Self::TimeExit,
        Self::PositionSize,
    ];

    /// Wire name, as stored in the persisted `type` field.
    pub fn name(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Volume => "volume",
            Self::Constant => "constant",
            Self::Sma => "sma",
            Self::Ema => "ema",
            Self::Rsi => "rsi",
            Self::Macd => "macd",
            Self::Bollinger => "bollinger",
            Self::Atr => "atr",
            Self::Compare => "compare",
            Self::Crossover => "crossover",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::EntrySignal => "entry_signal",
            Self::ExitSignal => "exit_signal",
            Self::StopLoss => "stop_loss",
            Self::TakeProfit => "take_profit",
            Self::TrailingStop => "trailing_stop",
            Self::MaxDrawdown => "max_drawdown",
            Self::TimeExit => "time_exit",
            Self::PositionSize => "position_size",
        }
    }

    /// Parse a wire name. `None` for names this build does not know.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    pub fn meta(self) -> &'static BlockMeta {
        // CATALOG is laid out in `ALL` order.
        &CATALOG[self as usize]
    }

    pub fn category(self) -> Category {
        self.meta().category
    }

    /// Risk blocks that on their own satisfy the "exit condition" requirement.
    pub fn is_risk_exit(self) -> bool {
        matches!(
            self,
            Self::StopLoss
                | Self::TakeProfit
                | Self::TrailingStop
                | Self::MaxDrawdown
                | Self::TimeExit
        )
    }
}

/// Palette grouping for block kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Input,
    Indicator,
    Logic,
    Signal,
    Risk,
    Sizing,
}

/// Value carried by a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    /// A numeric series (prices, indicator values, constants).
    Number,
    /// A boolean series (comparisons, crossovers, logic gates).
    Condition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpec {
    pub name: &'static str,
    pub kind: PortKind,
}

/// Inclusive numeric range for one parameter key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
}

impl ParamSpec {
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

/// Static description of one block kind.
#[derive(Debug, Clone, Copy)]
pub struct BlockMeta {
    pub block_type: BlockType,
    pub category: Category,
    pub label: &'static str,
    pub description: &'static str,
    /// Every declared input is required.
    pub inputs: &'static [PortSpec],
    pub outputs: &'static [PortSpec],
    pub params: &'static [ParamSpec],
}

impl BlockMeta {
    pub fn input(&self, name: &str) -> Option<&'static PortSpec> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&'static PortSpec> {
        self.outputs.iter().find(|p| p.name == name)
    }

    pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

// ─── Catalog ────────────────────────────────────────────────────────

const fn num(name: &'static str) -> PortSpec {
    PortSpec {
        name,
        kind: PortKind::Number,
    }
}

const fn cond(name: &'static str) -> PortSpec {
    PortSpec {
        name,
        kind: PortKind::Condition,
    }
}

const fn range(name: &'static str, min: f64, max: f64) -> ParamSpec {
    ParamSpec { name, min, max }
}

static CATALOG: [BlockMeta; 22] = [
    BlockMeta {
        block_type: BlockType::Price,
        category: Category::Input,
        label: "Price",
        description: "Open, high, low, or close price of the traded asset",
        inputs: &[],
        outputs: &[num("price")],
        params: &[],
    },
    BlockMeta {
        block_type: BlockType::Volume,
        category: Category::Input,
        label: "Volume",
        description: "Traded volume per bar",
        inputs: &[],
        outputs: &[num("volume")],
        params: &[],
    },
    BlockMeta {
        block_type: BlockType::Constant,
        category: Category::Input,
        label: "Constant",
        description: "A fixed number",
        inputs: &[],
        outputs: &[num("value")],
        params: &[],
    },
    BlockMeta {
        block_type: BlockType::Sma,
        category: Category::Indicator,
        label: "SMA",
        description: "Simple moving average",
        inputs: &[num("price")],
        outputs: &[num("value")],
        params: &[range("period", 1.0, 500.0)],
    },
    BlockMeta {
        block_type: BlockType::Ema,
        category: Category::Indicator,
        label: "EMA",
        description: "Exponential moving average",
        inputs: &[num("price")],
        outputs: &[num("value")],
        params: &[range("period", 1.0, 500.0)],
    },
    BlockMeta {
        block_type: BlockType::Rsi,
        category: Category::Indicator,
        label: "RSI",
        description: "Relative strength index (0-100)",
        inputs: &[num("price")],
        outputs: &[num("value")],
        params: &[range("period", 2.0, 100.0)],
    },
    BlockMeta {
        block_type: BlockType::Macd,
        category: Category::Indicator,
        label: "MACD",
        description: "Moving average convergence/divergence",
        inputs: &[num("price")],
        outputs: &[num("macd"), num("signal"), num("histogram")],
        params: &[
            range("fast_period", 2.0, 100.0),
            range("slow_period", 2.0, 200.0),
            range("signal_period", 1.0, 100.0),
        ],
    },
    BlockMeta {
        block_type: BlockType::Bollinger,
        category: Category::Indicator,
        label: "Bollinger Bands",
        description: "Moving average with standard-deviation bands",
        inputs: &[num("price")],
        outputs: &[num("upper"), num("middle"), num("lower")],
        params: &[range("period", 2.0, 200.0), range("std_dev", 0.5, 5.0)],
    },
    BlockMeta {
        block_type: BlockType::Atr,
        category: Category::Indicator,
        label: "ATR",
        description: "Average true range of the traded asset",
        inputs: &[],
        outputs: &[num("value")],
        params: &[range("period", 1.0, 100.0)],
    },
    BlockMeta {
        block_type: BlockType::Compare,
        category: Category::Logic,
        label: "Compare",
        description: "Compares two numbers",
        inputs: &[num("left"), num("right")],
        outputs: &[cond("result")],
        params: &[],
    },
    BlockMeta {
        block_type: BlockType::Crossover,
        category: Category::Logic,
        label: "Crossover",
        description: "Fires on the bar where one series crosses another",
        inputs: &[num("fast"), num("slow")],
        outputs: &[cond("result")],
        params: &[],
    },
    BlockMeta {
        block_type: BlockType::And,
        category: Category::Logic,
        label: "AND",
        description: "True when both conditions hold",
        inputs: &[cond("a"), cond("b")],
        outputs: &[cond("result")],
        params: &[],
    },
    BlockMeta {
        block_type: BlockType::Or,
        category: Category::Logic,
        label: "OR",
        description: "True when either condition holds",
        inputs: &[cond("a"), cond("b")],
        outputs: &[cond("result")],
        params: &[],
    },
    BlockMeta {
        block_type: BlockType::Not,
        category: Category::Logic,
        label: "NOT",
        description: "Inverts a condition",
        inputs: &[cond("input")],
        outputs: &[cond("result")],
        params: &[],
    },
    BlockMeta {
        block_type: BlockType::EntrySignal,
        category: Category::Signal,
        label: "Entry Signal",
        description: "Opens a position when its condition is true",
        inputs: &[cond("signal")],
        outputs: &[],
        params: &[],
    },
    BlockMeta {
        block_type: BlockType::ExitSignal,
        category: Category::Signal,
        label: "Exit Signal",
        description: "Closes the position when its condition is true",
        inputs: &[cond("signal")],
        outputs: &[],
        params: &[],
    },
    BlockMeta {
        block_type: BlockType::StopLoss,
        category: Category::Risk,
        label: "Stop Loss",
        description: "Closes the position after a fixed percentage loss",
        inputs: &[],
        outputs: &[],
        params: &[range("stop_loss_pct", 0.1, 100.0)],
    },
    BlockMeta {
        block_type: BlockType::TakeProfit,
        category: Category::Risk,
        label: "Take Profit",
        description: "Closes all or part of the position at profit targets",
        inputs: &[],
        outputs: &[],
        params: &[
            range("take_profit_pct", 0.1, 1000.0),
            range("profit_pct", 0.1, 1000.0),
            range("close_pct", 0.1, 100.0),
        ],
    },
    BlockMeta {
        block_type: BlockType::TrailingStop,
        category: Category::Risk,
        label: "Trailing Stop",
        description: "Stop that follows the best price since entry",
        inputs: &[],
        outputs: &[],
        params: &[range("trail_pct", 0.1, 100.0)],
    },
    BlockMeta {
        block_type: BlockType::MaxDrawdown,
        category: Category::Risk,
        label: "Max Drawdown",
        description: "Closes the position when drawdown exceeds a limit",
        inputs: &[],
        outputs: &[],
        params: &[range("max_drawdown_pct", 0.1, 100.0)],
    },
    BlockMeta {
        block_type: BlockType::TimeExit,
        category: Category::Risk,
        label: "Time Exit",
        description: "Closes the position after a number of bars",
        inputs: &[],
        outputs: &[],
        params: &[range("bars", 1.0, 10_000.0)],
    },
    BlockMeta {
        block_type: BlockType::PositionSize,
        category: Category::Sizing,
        label: "Position Size",
        description: "How much capital each position uses",
        inputs: &[],
        outputs: &[],
        params: &[range("percent", 0.1, 100.0), range("amount", 1.0, 1.0e12)],
    },
];

// ─── Lookups ────────────────────────────────────────────────────────

/// Metadata for a wire type name; `None` for unknown names.
pub fn get_block_meta(type_name: &str) -> Option<&'static BlockMeta> {
    BlockType::from_name(type_name).map(BlockType::meta)
}

/// All block kinds in a category, in catalog order.
pub fn list_by_category(category: Category) -> Vec<&'static BlockMeta> {
    CATALOG.iter().filter(|m| m.category == category).collect()
}

/// The whole catalog.
pub fn all() -> &'static [BlockMeta] {
    &CATALOG
}

/// Typed default parameters for a block kind.
pub fn default_params(block_type: BlockType) -> BlockParams {
    match block_type {
        BlockType::Price => BlockParams::Price(PriceParams::default()),
        BlockType::Volume => BlockParams::Volume,
        BlockType::Constant => BlockParams::Constant(ConstantParams::default()),
        BlockType::Sma => BlockParams::Sma(PeriodParams { period: 20 }),
        BlockType::Ema => BlockParams::Ema(PeriodParams { period: 20 }),
        BlockType::Rsi => BlockParams::Rsi(PeriodParams { period: 14 }),
        BlockType::Macd => BlockParams::Macd(MacdParams::default()),
        BlockType::Bollinger => BlockParams::Bollinger(BollingerParams::default()),
        BlockType::Atr => BlockParams::Atr(PeriodParams { period: 14 }),
        BlockType::Compare => BlockParams::Compare(CompareParams::default()),
        BlockType::Crossover => BlockParams::Crossover(CrossoverParams::default()),
        BlockType::And => BlockParams::And,
        BlockType::Or => BlockParams::Or,
        BlockType::Not => BlockParams::Not,
        BlockType::EntrySignal => BlockParams::EntrySignal,
        BlockType::ExitSignal => BlockParams::ExitSignal,
        BlockType::StopLoss => BlockParams::StopLoss(StopLossParams::default()),
        BlockType::TakeProfit => BlockParams::TakeProfit(TakeProfitParams::default()),
        BlockType::TrailingStop => BlockParams::TrailingStop(TrailingStopParams::default()),
        BlockType::MaxDrawdown => BlockParams::MaxDrawdown(MaxDrawdownParams::default()),
        BlockType::TimeExit => BlockParams::TimeExit(TimeExitParams::default()),
        BlockType::PositionSize => BlockParams::PositionSize(PositionSizeParams::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_in_enum_order() {
        for (i, t) in BlockType::ALL.iter().enumerate() {
            assert_eq!(all()[i].block_type, *t, "catalog slot {i}");
            assert_eq!(t.meta().block_type, *t);
        }
    }

    #[test]
    fn names_round_trip() {
        for t in BlockType::ALL {
            assert_eq!(BlockType::from_name(t.name()), Some(t));
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.name()));
        }
    }

    #[test]
    fn unknown_type_is_absent_not_an_error() {
        assert!(get_block_meta("quantum_oracle").is_none());
        assert!(BlockType::from_name("").is_none());
    }

    #[test]
    fn default_params_match_type() {
        for t in BlockType::ALL {
            assert_eq!(default_params(t).block_type(), Some(t));
        }
    }

    #[test]
    fn list_by_category_filters() {
        let risk = list_by_category(Category::Risk);
        assert_eq!(risk.len(), 5);
        assert!(risk.iter().all(|m| m.block_type.is_risk_exit()));

        let signals: Vec<_> = list_by_category(Category::Signal)
            .iter()
            .map(|m| m.block_type)
            .collect();
        assert_eq!(signals, vec![BlockType::EntrySignal, BlockType::ExitSignal]);
    }

    #[test]
    fn position_size_is_not_an_exit() {
        assert!(!BlockType::PositionSize.is_risk_exit());
        assert_eq!(BlockType::PositionSize.category(), Category::Sizing);
    }

    #[test]
    fn rsi_period_range() {
        let spec = BlockType::Rsi.meta().param("period").unwrap();
        assert!(spec.contains(2.0));
        assert!(spec.contains(100.0));
        assert!(!spec.contains(1.0));
        assert!(!spec.contains(101.0));
        assert!(!spec.contains(f64::NAN));
    }

    #[test]
    fn ports_are_typed() {
        let compare = BlockType::Compare.meta();
        assert_eq!(compare.input("left").unwrap().kind, PortKind::Number);
        assert_eq!(compare.output("result").unwrap().kind, PortKind::Condition);
        assert!(compare.input("signal").is_none());
    }
}
