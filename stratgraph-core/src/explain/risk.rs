//! Fixed phrase templates for risk and sizing blocks.

use crate::graph::params::{PositionSizeParams, SizingMode, TakeProfitParams};
use crate::graph::BlockParams;

/// Exit clause for a risk-exit block, e.g. "a stop loss of 5% is hit".
///
/// `None` for blocks that are not risk exits.
pub fn risk_exit_phrase(params: &BlockParams) -> Option<String> {
    let phrase = match params {
        BlockParams::StopLoss(p) => format!("a stop loss of {}% is hit", p.stop_loss_pct),
        BlockParams::TakeProfit(p) => take_profit_phrase(p),
        BlockParams::TrailingStop(p) => format!("a trailing stop of {}% is hit", p.trail_pct),
        BlockParams::MaxDrawdown(p) => format!("drawdown exceeds {}%", p.max_drawdown_pct),
        BlockParams::TimeExit(p) => format!("{} bars have passed since entry", p.bars),
        _ => return None,
    };
    Some(phrase)
}

fn take_profit_phrase(params: &TakeProfitParams) -> String {
    match params.levels.as_slice() {
        [] => format!("a take profit of {}% is reached", params.take_profit_pct),
        [only] => format!("a take profit of {}% is reached", only.profit_pct),
        levels => {
            let targets: Vec<String> = levels.iter().map(|l| l.profit_pct.to_string()).collect();
            format!(
                "profit targets are reached in a {}-step ladder at {}%",
                levels.len(),
                targets.join(", ")
            )
        }
    }
}

/// The separate sizing sentence.
pub fn sizing_sentence(params: &PositionSizeParams) -> String {
    match params.mode {
        SizingMode::PercentOfEquity => format!("Each position uses {}% of equity.", params.value),
        SizingMode::FixedAmount => format!("Each position uses a fixed amount of {}.", params.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::params::{StopLossParams, TakeProfitLevel, TimeExitParams};

    #[test]
    fn templates() {
        assert_eq!(
            risk_exit_phrase(&BlockParams::StopLoss(StopLossParams { stop_loss_pct: 5.0 })).unwrap(),
            "a stop loss of 5% is hit"
        );
        assert_eq!(
            risk_exit_phrase(&BlockParams::TimeExit(TimeExitParams { bars: 12 })).unwrap(),
            "12 bars have passed since entry"
        );
        assert_eq!(risk_exit_phrase(&BlockParams::EntrySignal), None);
    }

    #[test]
    fn ladder_lists_every_target() {
        let p = TakeProfitParams {
            take_profit_pct: 4.0,
            levels: vec![
                TakeProfitLevel {
                    profit_pct: 10.0,
                    close_pct: 50.0,
                },
                TakeProfitLevel {
                    profit_pct: 20.5,
                    close_pct: 50.0,
                },
            ],
        };
        assert_eq!(
            take_profit_phrase(&p),
            "profit targets are reached in a 2-step ladder at 10, 20.5%"
        );
    }

    #[test]
    fn sizing_modes() {
        let pct = PositionSizeParams::default();
        assert_eq!(sizing_sentence(&pct), "Each position uses 10% of equity.");
        let fixed = PositionSizeParams {
            mode: SizingMode::FixedAmount,
            value: 2500.0,
        };
        assert_eq!(sizing_sentence(&fixed), "Each position uses a fixed amount of 2500.");
    }
}
