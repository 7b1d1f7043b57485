//! Typed block parameters.
//!
//! Each block kind owns a strongly-typed parameter record; `BlockParams` is the
//! tagged union over all of them. On the wire, parameters are a plain JSON
//! object under the block's `params` key, interpreted by the block's `type`.
//!
//! Missing keys fall back to registry defaults (`#[serde(default)]`). A known
//! type whose params fail to parse, or a type this build does not know, is kept
//! verbatim as `BlockParams::Unknown` so it survives a load/save cycle.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::registry::BlockType;

// ─── Parameter records ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    Open,
    High,
    Low,
    #[default]
    Close,
}

impl PriceSource {
    pub fn name(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceParams {
    pub source: PriceSource,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantParams {
    pub value: f64,
}

/// Single-period indicators: SMA, EMA, RSI, ATR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodParams {
    pub period: u32,
}

impl Default for PeriodParams {
    fn default() -> Self {
        Self { period: 14 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdParams {
    pub fast_period: u32,
    pub slow_period: u32,
    pub signal_period: u32,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerParams {
    pub period: u32,
    pub std_dev: f64,
}

impl Default for BollingerParams {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompareOp {
    #[default]
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "==")]
    Eq,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Eq => "==",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareParams {
    pub operator: CompareOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossDirection {
    #[default]
    CrossesAbove,
    CrossesBelow,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossoverParams {
    pub direction: CrossDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopLossParams {
    pub stop_loss_pct: f64,
}

impl Default for StopLossParams {
    fn default() -> Self {
        Self { stop_loss_pct: 2.0 }
    }
}

/// One rung of a laddered take-profit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeProfitLevel {
    /// Profit at which this rung triggers, in percent.
    pub profit_pct: f64,
    /// Share of the original position closed at this rung, in percent.
    pub close_pct: f64,
}

/// Take-profit: a single target, or a ladder when `levels` is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TakeProfitParams {
    pub take_profit_pct: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub levels: Vec<TakeProfitLevel>,
}

impl Default for TakeProfitParams {
    fn default() -> Self {
        Self {
            take_profit_pct: 4.0,
            levels: Vec::new(),
        }
    }
}

impl TakeProfitParams {
    pub fn is_ladder(&self) -> bool {
        self.levels.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailingStopParams {
    pub trail_pct: f64,
}

impl Default for TrailingStopParams {
    fn default() -> Self {
        Self { trail_pct: 3.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaxDrawdownParams {
    pub max_drawdown_pct: f64,
}

impl Default for MaxDrawdownParams {
    fn default() -> Self {
        Self {
            max_drawdown_pct: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeExitParams {
    pub bars: u32,
}

impl Default for TimeExitParams {
    fn default() -> Self {
        Self { bars: 20 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMode {
    #[default]
    PercentOfEquity,
    FixedAmount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionSizeParams {
    pub mode: SizingMode,
    pub value: f64,
}

impl Default for PositionSizeParams {
    fn default() -> Self {
        Self {
            mode: SizingMode::PercentOfEquity,
            value: 10.0,
        }
    }
}

// ─── Unknown blocks ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum UnknownReason {
    /// The type name is not in this build's registry.
    UnrecognizedType,
    /// The type is known but its params could not be read.
    MalformedParams(String),
}

/// A block this build cannot interpret. Kept verbatim so that loading and
/// re-saving a graph never loses data written by a newer version.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownBlock {
    pub type_name: String,
    pub params: Map<String, Value>,
    pub reason: UnknownReason,
}

// ─── Tagged union ───────────────────────────────────────────────────

/// Parameters of a block; the variant determines the block's type.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockParams {
    Price(PriceParams),
    Volume,
    Constant(ConstantParams),
    Sma(PeriodParams),
    Ema(PeriodParams),
    Rsi(PeriodParams),
    Macd(MacdParams),
    Bollinger(BollingerParams),
    Atr(PeriodParams),
    Compare(CompareParams),
    Crossover(CrossoverParams),
    And,
    Or,
    Not,
    EntrySignal,
    ExitSignal,
    StopLoss(StopLossParams),
    TakeProfit(TakeProfitParams),
    TrailingStop(TrailingStopParams),
    MaxDrawdown(MaxDrawdownParams),
    TimeExit(TimeExitParams),
    PositionSize(PositionSizeParams),
    Unknown(UnknownBlock),
}

fn parse<T: DeserializeOwned>(params: &Map<String, Value>) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(params.clone()))
}

fn to_object<T: Serialize>(params: &T) -> Map<String, Value> {
    match serde_json::to_value(params) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

impl BlockParams {
    /// Block type for this variant; `None` for unknown blocks.
    pub fn block_type(&self) -> Option<BlockType> {
        Some(match self {
            Self::Price(_) => BlockType::Price,
            Self::Volume => BlockType::Volume,
            Self::Constant(_) => BlockType::Constant,
            Self::Sma(_) => BlockType::Sma,
            Self::Ema(_) => BlockType::Ema,
            Self::Rsi(_) => BlockType::Rsi,
            Self::Macd(_) => BlockType::Macd,
            Self::Bollinger(_) => BlockType::Bollinger,
            Self::Atr(_) => BlockType::Atr,
            Self::Compare(_) => BlockType::Compare,
            Self::Crossover(_) => BlockType::Crossover,
            Self::And => BlockType::And,
            Self::Or => BlockType::Or,
            Self::Not => BlockType::Not,
            Self::EntrySignal => BlockType::EntrySignal,
            Self::ExitSignal => BlockType::ExitSignal,
            Self::StopLoss(_) => BlockType::StopLoss,
            Self::TakeProfit(_) => BlockType::TakeProfit,
            Self::TrailingStop(_) => BlockType::TrailingStop,
            Self::MaxDrawdown(_) => BlockType::MaxDrawdown,
            Self::TimeExit(_) => BlockType::TimeExit,
            Self::PositionSize(_) => BlockType::PositionSize,
            Self::Unknown(_) => return None,
        })
    }

    /// Wire type name, including the original name of unknown blocks.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Unknown(u) => &u.type_name,
            known => known.block_type().map(BlockType::name).unwrap_or_default(),
        }
    }

    /// Decode wire `(type, params)` into a typed record. Never fails.
    pub fn from_wire(type_name: &str, params: Map<String, Value>) -> Self {
        let Some(block_type) = BlockType::from_name(type_name) else {
            return Self::Unknown(UnknownBlock {
                type_name: type_name.to_string(),
                params,
                reason: UnknownReason::UnrecognizedType,
            });
        };

        let parsed = match block_type {
            BlockType::Price => parse(&params).map(Self::Price),
            BlockType::Volume => Ok(Self::Volume),
            BlockType::Constant => parse(&params).map(Self::Constant),
            BlockType::Sma => parse(&params).map(Self::Sma),
            BlockType::Ema => parse(&params).map(Self::Ema),
            BlockType::Rsi => parse(&params).map(Self::Rsi),
            BlockType::Macd => parse(&params).map(Self::Macd),
            BlockType::Bollinger => parse(&params).map(Self::Bollinger),
            BlockType::Atr => parse(&params).map(Self::Atr),
            BlockType::Compare => parse(&params).map(Self::Compare),
            BlockType::Crossover => parse(&params).map(Self::Crossover),
            BlockType::And => Ok(Self::And),
            BlockType::Or => Ok(Self::Or),
            BlockType::Not => Ok(Self::Not),
            BlockType::EntrySignal => Ok(Self::EntrySignal),
            BlockType::ExitSignal => Ok(Self::ExitSignal),
            BlockType::StopLoss => parse(&params).map(Self::StopLoss),
            BlockType::TakeProfit => parse(&params).map(Self::TakeProfit),
            BlockType::TrailingStop => parse(&params).map(Self::TrailingStop),
            BlockType::MaxDrawdown => parse(&params).map(Self::MaxDrawdown),
            BlockType::TimeExit => parse(&params).map(Self::TimeExit),
            BlockType::PositionSize => parse(&params).map(Self::PositionSize),
        };

        parsed.unwrap_or_else(|e| {
            Self::Unknown(UnknownBlock {
                type_name: type_name.to_string(),
                params,
                reason: UnknownReason::MalformedParams(e.to_string()),
            })
        })
    }

    /// Encode as the wire params object.
    pub fn to_wire(&self) -> Map<String, Value> {
        match self {
            Self::Price(p) => to_object(p),
            Self::Constant(p) => to_object(p),
            Self::Sma(p) | Self::Ema(p) | Self::Rsi(p) | Self::Atr(p) => to_object(p),
            Self::Macd(p) => to_object(p),
            Self::Bollinger(p) => to_object(p),
            Self::Compare(p) => to_object(p),
            Self::Crossover(p) => to_object(p),
            Self::StopLoss(p) => to_object(p),
            Self::TakeProfit(p) => to_object(p),
            Self::TrailingStop(p) => to_object(p),
            Self::MaxDrawdown(p) => to_object(p),
            Self::TimeExit(p) => to_object(p),
            Self::PositionSize(p) => to_object(p),
            Self::Volume
            | Self::And
            | Self::Or
            | Self::Not
            | Self::EntrySignal
            | Self::ExitSignal => Map::new(),
            Self::Unknown(u) => u.params.clone(),
        }
    }

    /// Range-checked numeric parameters, keyed by their registry `ParamSpec` name.
    ///
    /// Take-profit ladder rungs are reported per rung under `profit_pct` and
    /// `close_pct`; position size reports `percent` or `amount` depending on mode.
    pub fn numeric_params(&self) -> Vec<(&'static str, f64)> {
        match self {
            Self::Sma(p) | Self::Ema(p) | Self::Rsi(p) | Self::Atr(p) => {
                vec![("period", f64::from(p.period))]
            }
            Self::Macd(p) => vec![
                ("fast_period", f64::from(p.fast_period)),
                ("slow_period", f64::from(p.slow_period)),
                ("signal_period", f64::from(p.signal_period)),
            ],
            Self::Bollinger(p) => vec![("period", f64::from(p.period)), ("std_dev", p.std_dev)],
            Self::StopLoss(p) => vec![("stop_loss_pct", p.stop_loss_pct)],
            Self::TakeProfit(p) => {
                if p.levels.is_empty() {
                    vec![("take_profit_pct", p.take_profit_pct)]
                } else {
                    p.levels
                        .iter()
                        .flat_map(|l| [("profit_pct", l.profit_pct), ("close_pct", l.close_pct)])
                        .collect()
                }
            }
            Self::TrailingStop(p) => vec![("trail_pct", p.trail_pct)],
            Self::MaxDrawdown(p) => vec![("max_drawdown_pct", p.max_drawdown_pct)],
            Self::TimeExit(p) => vec![("bars", f64::from(p.bars))],
            Self::PositionSize(p) => match p.mode {
                SizingMode::PercentOfEquity => vec![("percent", p.value)],
                SizingMode::FixedAmount => vec![("amount", p.value)],
            },
            Self::Price(_)
            | Self::Volume
            | Self::Constant(_)
            | Self::Compare(_)
            | Self::Crossover(_)
            | Self::And
            | Self::Or
            | Self::Not
            | Self::EntrySignal
            | Self::ExitSignal
            | Self::Unknown(_) => Vec::new(),
        }
    }
}
