//! Summary statistics of a finished run.

use super::account::EquityPoint;
use super::backtest::BacktestResult;
use super::position::ClosedTrade;
use super::signal::SignalKind;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Fractions, not percentages: 0.1 is a 10% return.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub final_equity: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    /// Longest run of bars below the previous equity peak.
    pub max_drawdown_duration: i64,
    pub round_trips: RoundTripStats,
    pub signal_counts: SignalCounts,
    pub buy_signals_acted: usize,
    pub sell_signals_acted: usize,
    pub executed_buys: usize,
    pub executed_sells: usize,
    pub total_commission: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoundTripStats {
    pub won: usize,
    pub lost: usize,
    pub breakeven: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_duration_days: f64,
}

impl RoundTripStats {
    pub fn total(&self) -> usize {
        self.won + self.lost + self.breakeven
    }

    pub fn from_closed(trades: &[ClosedTrade]) -> Self {
        let mut stats = RoundTripStats::default();
        let mut gross_win = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut days = 0i64;

        for trade in trades {
            if trade.is_win() {
                stats.won += 1;
                gross_win += trade.pnl;
                stats.largest_win = stats.largest_win.max(trade.pnl);
            } else if trade.is_loss() {
                stats.lost += 1;
                gross_loss += trade.pnl.abs();
                stats.largest_loss = stats.largest_loss.max(trade.pnl.abs());
            } else {
                stats.breakeven += 1;
            }
            days += (trade.exit_date - trade.entry_date).num_days();
        }

        let total = stats.total();
        if total > 0 {
            stats.win_rate = stats.won as f64 / total as f64;
            stats.avg_duration_days = days as f64 / total as f64;
        }
        if stats.won > 0 {
            stats.avg_win = gross_win / stats.won as f64;
        }
        if stats.lost > 0 {
            stats.avg_loss = gross_loss / stats.lost as f64;
        }
        stats.profit_factor = if gross_loss > 0.0 {
            gross_win / gross_loss
        } else if gross_win > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };
        stats
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignalCounts {
    pub normal_buy: usize,
    pub normal_sell: usize,
    pub strong_buy: usize,
    pub strong_sell: usize,
}

impl SignalCounts {
    pub fn get(&self, kind: SignalKind) -> usize {
        match kind {
            SignalKind::NormalBuy => self.normal_buy,
            SignalKind::NormalSell => self.normal_sell,
            SignalKind::StrongBuy => self.strong_buy,
            SignalKind::StrongSell => self.strong_sell,
        }
    }

    pub fn total(&self) -> usize {
        self.normal_buy + self.normal_sell + self.strong_buy + self.strong_sell
    }
}

impl Metrics {
    pub fn compute(result: &BacktestResult, risk_free_rate: f64) -> Self {
        let curve = &result.equity_curve;
        let initial = result.initial_cash;
        let final_equity = result.final_equity();

        let total_return = if initial > 0.0 {
            (final_equity - initial) / initial
        } else {
            0.0
        };

        let years = curve.len() as f64 / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(curve);
        let (sharpe_ratio, sortino_ratio) =
            compute_risk_adjusted(curve, risk_free_rate / TRADING_DAYS_PER_YEAR);

        let signal_counts = SignalCounts {
            normal_buy: result.signal_count(SignalKind::NormalBuy),
            normal_sell: result.signal_count(SignalKind::NormalSell),
            strong_buy: result.signal_count(SignalKind::StrongBuy),
            strong_sell: result.signal_count(SignalKind::StrongSell),
        };

        Metrics {
            final_equity,
            total_return,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            round_trips: RoundTripStats::from_closed(&result.closed_trades),
            signal_counts,
            buy_signals_acted: result.counters.buy_signals,
            sell_signals_acted: result.counters.sell_signals,
            executed_buys: result.counters.executed_buys,
            executed_sells: result.counters.executed_sells,
            total_commission: result.trades.iter().map(|t| t.commission).sum(),
        }
    }
}

fn compute_drawdown(curve: &[EquityPoint]) -> (f64, i64) {
    let Some(first) = curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut longest = 0i64;
    let mut underwater = 0i64;

    for point in curve {
        if point.equity >= peak {
            peak = point.equity;
            underwater = 0;
            continue;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
        }
        underwater += 1;
        longest = longest.max(underwater);
    }

    (max_dd, longest)
}

fn compute_risk_adjusted(curve: &[EquityPoint], daily_rf: f64) -> (f64, f64) {
    let returns: Vec<f64> = curve
        .windows(2)
        .map(|w| {
            if w[0].equity > 0.0 {
                (w[1].equity - w[0].equity) / w[0].equity
            } else {
                0.0
            }
        })
        .collect();

    if returns.is_empty() {
        return (0.0, 0.0);
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let stddev = (returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt();
    let downside = (returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|&r| (r - daily_rf).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();

    let excess = mean - daily_rf;
    let annualize = TRADING_DAYS_PER_YEAR.sqrt();
    let sharpe = if stddev > 0.0 {
        excess / stddev * annualize
    } else {
        0.0
    };
    let sortino = if downside > 0.0 {
        excess / downside * annualize
    } else {
        0.0
    };

    (sharpe, sortino)
}
