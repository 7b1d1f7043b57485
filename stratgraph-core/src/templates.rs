//! Starter graphs: named templates and the questionnaire wizard.
//!
//! Every graph produced here passes the validator; templates are tested for
//! that below and the wizard for every answer combination.

use serde::{Deserialize, Serialize};

use crate::canvas::layout::{COLUMN_WIDTH, ROW_HEIGHT};
use crate::graph::params::{
    BollingerParams, CompareOp, CompareParams, ConstantParams, CrossDirection, CrossoverParams,
    MacdParams, PeriodParams, PositionSizeParams, PriceParams, StopLossParams, TakeProfitLevel,
    TakeProfitParams, TrailingStopParams,
};
use crate::graph::{Block, BlockParams, Connection, Endpoint, Position, StrategyDefinition};

// ─── Builder ────────────────────────────────────────────────────────

/// Assembles a graph from ids the caller guarantees are unique. Positions are
/// given on the auto-arrange grid.
struct GraphBuilder {
    def: StrategyDefinition,
}

impl GraphBuilder {
    fn new() -> Self {
        Self {
            def: StrategyDefinition::empty(),
        }
    }

    fn block(mut self, id: &str, params: BlockParams, col: u32, row: u32) -> Self {
        let position = Position::new(f64::from(col) * COLUMN_WIDTH, f64::from(row) * ROW_HEIGHT);
        self.def.blocks.push(Block::new(id, params, position));
        self
    }

    fn wire(mut self, from: &str, out: &str, to: &str, input: &str) -> Self {
        self.def
            .connections
            .push(Connection::new(Endpoint::new(from, out), Endpoint::new(to, input)));
        self
    }

    fn build(self) -> StrategyDefinition {
        self.def
    }
}

fn crossover(direction: CrossDirection) -> BlockParams {
    BlockParams::Crossover(CrossoverParams { direction })
}

fn compare(operator: CompareOp) -> BlockParams {
    BlockParams::Compare(CompareParams { operator })
}

fn constant(value: f64) -> BlockParams {
    BlockParams::Constant(ConstantParams { value })
}

fn stop_loss(pct: f64) -> BlockParams {
    BlockParams::StopLoss(StopLossParams { stop_loss_pct: pct })
}

fn take_profit(pct: f64) -> BlockParams {
    BlockParams::TakeProfit(TakeProfitParams {
        take_profit_pct: pct,
        levels: Vec::new(),
    })
}

// ─── Templates ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyTemplate {
    GoldenCross,
    RsiMeanReversion,
    MacdMomentum,
    BollingerBreakout,
}

impl StrategyTemplate {
    pub const ALL: [StrategyTemplate; 4] = [
        Self::GoldenCross,
        Self::RsiMeanReversion,
        Self::MacdMomentum,
        Self::BollingerBreakout,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::GoldenCross => "golden_cross",
            Self::RsiMeanReversion => "rsi_mean_reversion",
            Self::MacdMomentum => "macd_momentum",
            Self::BollingerBreakout => "bollinger_breakout",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::GoldenCross => "50-day SMA crossing the 200-day SMA, 5% stop loss",
            Self::RsiMeanReversion => "Buy RSI below 30, sell above 70, 3% stop loss",
            Self::MacdMomentum => "MACD line crossing its signal line, 4% trailing stop",
            Self::BollingerBreakout => {
                "Close above the upper band, out below the middle band, laddered take profit"
            }
        }
    }

    pub fn build(self) -> StrategyDefinition {
        match self {
            Self::GoldenCross => GraphBuilder::new()
                .block("price", BlockParams::Price(PriceParams::default()), 0, 0)
                .block("sma_fast", BlockParams::Sma(PeriodParams { period: 50 }), 1, 0)
                .block("sma_slow", BlockParams::Sma(PeriodParams { period: 200 }), 1, 1)
                .block("cross_up", crossover(CrossDirection::CrossesAbove), 2, 0)
                .block("cross_down", crossover(CrossDirection::CrossesBelow), 2, 1)
                .block("entry", BlockParams::EntrySignal, 3, 0)
                .block("exit", BlockParams::ExitSignal, 3, 1)
                .block("stop_loss", stop_loss(5.0), 3, 2)
                .wire("price", "price", "sma_fast", "price")
                .wire("price", "price", "sma_slow", "price")
                .wire("sma_fast", "value", "cross_up", "fast")
                .wire("sma_slow", "value", "cross_up", "slow")
                .wire("sma_fast", "value", "cross_down", "fast")
                .wire("sma_slow", "value", "cross_down", "slow")
                .wire("cross_up", "result", "entry", "signal")
                .wire("cross_down", "result", "exit", "signal")
                .build(),
            Self::RsiMeanReversion => GraphBuilder::new()
                .block("price", BlockParams::Price(PriceParams::default()), 0, 0)
                .block("rsi", BlockParams::Rsi(PeriodParams { period: 14 }), 1, 0)
                .block("oversold", constant(30.0), 1, 1)
                .block("overbought", constant(70.0), 1, 2)
                .block("below", compare(CompareOp::Lt), 2, 0)
                .block("above", compare(CompareOp::Gt), 2, 1)
                .block("entry", BlockParams::EntrySignal, 3, 0)
                .block("exit", BlockParams::ExitSignal, 3, 1)
                .block("stop_loss", stop_loss(3.0), 3, 2)
                .wire("price", "price", "rsi", "price")
                .wire("rsi", "value", "below", "left")
                .wire("oversold", "value", "below", "right")
                .wire("rsi", "value", "above", "left")
                .wire("overbought", "value", "above", "right")
                .wire("below", "result", "entry", "signal")
                .wire("above", "result", "exit", "signal")
                .build(),
            Self::MacdMomentum => GraphBuilder::new()
                .block("price", BlockParams::Price(PriceParams::default()), 0, 0)
                .block("macd", BlockParams::Macd(MacdParams::default()), 1, 0)
                .block("cross_up", crossover(CrossDirection::CrossesAbove), 2, 0)
                .block("cross_down", crossover(CrossDirection::CrossesBelow), 2, 1)
                .block("entry", BlockParams::EntrySignal, 3, 0)
                .block("exit", BlockParams::ExitSignal, 3, 1)
                .block(
                    "trailing_stop",
                    BlockParams::TrailingStop(TrailingStopParams { trail_pct: 4.0 }),
                    3,
                    2,
                )
                .wire("price", "price", "macd", "price")
                .wire("macd", "macd", "cross_up", "fast")
                .wire("macd", "signal", "cross_up", "slow")
                .wire("macd", "macd", "cross_down", "fast")
                .wire("macd", "signal", "cross_down", "slow")
                .wire("cross_up", "result", "entry", "signal")
                .wire("cross_down", "result", "exit", "signal")
                .build(),
            Self::BollingerBreakout => GraphBuilder::new()
                .block("price", BlockParams::Price(PriceParams::default()), 0, 0)
                .block("bands", BlockParams::Bollinger(BollingerParams::default()), 1, 0)
                .block("breakout", compare(CompareOp::Gt), 2, 0)
                .block("breakdown", compare(CompareOp::Lt), 2, 1)
                .block("entry", BlockParams::EntrySignal, 3, 0)
                .block("exit", BlockParams::ExitSignal, 3, 1)
                .block("stop_loss", stop_loss(3.0), 3, 2)
                .block(
                    "take_profit",
                    BlockParams::TakeProfit(TakeProfitParams {
                        take_profit_pct: 5.0,
                        levels: vec![
                            TakeProfitLevel {
                                profit_pct: 5.0,
                                close_pct: 50.0,
                            },
                            TakeProfitLevel {
                                profit_pct: 10.0,
                                close_pct: 50.0,
                            },
                        ],
                    }),
                    3,
                    3,
                )
                .block(
                    "sizing",
                    BlockParams::PositionSize(PositionSizeParams::default()),
                    3,
                    4,
                )
                .wire("price", "price", "bands", "price")
                .wire("price", "price", "breakout", "left")
                .wire("bands", "upper", "breakout", "right")
                .wire("price", "price", "breakdown", "left")
                .wire("bands", "middle", "breakdown", "right")
                .wire("breakout", "result", "entry", "signal")
                .wire("breakdown", "result", "exit", "signal")
                .build(),
        }
    }
}

// ─── Wizard ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovingAverage {
    Sma,
    Ema,
}

/// What opens a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WizardSignal {
    /// Fast average crossing above the slow one.
    MaCrossover {
        average: MovingAverage,
        fast_period: u32,
        slow_period: u32,
    },
    /// RSI dipping below `oversold`.
    RsiThreshold {
        period: u32,
        oversold: f64,
        overbought: f64,
    },
}

/// What closes a position besides the risk toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardExit {
    /// The mirror image of the entry signal.
    OppositeSignal,
    /// Only the stop loss / take profit close positions.
    RiskOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardAnswers {
    pub signal: WizardSignal,
    pub exit_rule: WizardExit,
    #[serde(default)]
    pub stop_loss_pct: Option<f64>,
    #[serde(default)]
    pub take_profit_pct: Option<f64>,
}

/// Stop loss added when the answers leave no way to exit.
pub const WIZARD_FALLBACK_STOP_LOSS_PCT: f64 = 5.0;

/// Build a graph from questionnaire answers.
///
/// `RiskOnly` with both risk toggles off would produce a graph with no exit,
/// so a stop loss of [`WIZARD_FALLBACK_STOP_LOSS_PCT`] is added instead.
pub fn build_from_wizard(answers: &WizardAnswers) -> StrategyDefinition {
    let mut builder = GraphBuilder::new().block(
        "price",
        BlockParams::Price(PriceParams::default()),
        0,
        0,
    );
    let opposite_exit = answers.exit_rule == WizardExit::OppositeSignal;

    builder = match &answers.signal {
        WizardSignal::MaCrossover {
            average,
            fast_period,
            slow_period,
        } => {
            let ma = |period: u32| match average {
                MovingAverage::Sma => BlockParams::Sma(PeriodParams { period }),
                MovingAverage::Ema => BlockParams::Ema(PeriodParams { period }),
            };
            let mut b = builder
                .block("ma_fast", ma(*fast_period), 1, 0)
                .block("ma_slow", ma(*slow_period), 1, 1)
                .block("cross_up", crossover(CrossDirection::CrossesAbove), 2, 0)
                .block("entry", BlockParams::EntrySignal, 3, 0)
                .wire("price", "price", "ma_fast", "price")
                .wire("price", "price", "ma_slow", "price")
                .wire("ma_fast", "value", "cross_up", "fast")
                .wire("ma_slow", "value", "cross_up", "slow")
                .wire("cross_up", "result", "entry", "signal");
            if opposite_exit {
                b = b
                    .block("cross_down", crossover(CrossDirection::CrossesBelow), 2, 1)
                    .block("exit", BlockParams::ExitSignal, 3, 1)
                    .wire("ma_fast", "value", "cross_down", "fast")
                    .wire("ma_slow", "value", "cross_down", "slow")
                    .wire("cross_down", "result", "exit", "signal");
            }
            b
        }
        WizardSignal::RsiThreshold {
            period,
            oversold,
            overbought,
        } => {
            let mut b = builder
                .block("rsi", BlockParams::Rsi(PeriodParams { period: *period }), 1, 0)
                .block("oversold", constant(*oversold), 1, 1)
                .block("below", compare(CompareOp::Lt), 2, 0)
                .block("entry", BlockParams::EntrySignal, 3, 0)
                .wire("price", "price", "rsi", "price")
                .wire("rsi", "value", "below", "left")
                .wire("oversold", "value", "below", "right")
                .wire("below", "result", "entry", "signal");
            if opposite_exit {
                b = b
                    .block("overbought", constant(*overbought), 1, 2)
                    .block("above", compare(CompareOp::Gt), 2, 1)
                    .block("exit", BlockParams::ExitSignal, 3, 1)
                    .wire("rsi", "value", "above", "left")
                    .wire("overbought", "value", "above", "right")
                    .wire("above", "result", "exit", "signal");
            }
            b
        }
    };

    let mut stop = answers.stop_loss_pct;
    if !opposite_exit && stop.is_none() && answers.take_profit_pct.is_none() {
        stop = Some(WIZARD_FALLBACK_STOP_LOSS_PCT);
    }
    if let Some(pct) = stop {
        builder = builder.block("stop_loss", stop_loss(pct), 3, 2);
    }
    if let Some(pct) = answers.take_profit_pct {
        builder = builder.block("take_profit", take_profit(pct), 3, 3);
    }
    builder.build()
}
