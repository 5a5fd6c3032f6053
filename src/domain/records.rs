//! Row views of run output for tabular writers.

use super::account::EquityPoint;
use super::metrics::Metrics;
use super::position::ClosedTrade;
use super::signal::Signal;
use super::trade::Trade;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub trait Tabular {
    fn headers() -> &'static [&'static str];
    fn row(&self) -> Vec<String>;
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

fn pct(fraction: f64) -> String {
    format!("{:.2}", fraction * 100.0)
}

impl Tabular for Signal {
    fn headers() -> &'static [&'static str] {
        &["date", "signal_type", "description", "price"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.date.format(DATE_FORMAT).to_string(),
            self.kind.as_str().to_string(),
            self.description.clone(),
            format!("{:.4}", self.price),
        ]
    }
}

impl Tabular for Trade {
    fn headers() -> &'static [&'static str] {
        &[
            "trade_id",
            "date",
            "action",
            "price",
            "size",
            "total_amount",
            "commission",
            "status",
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.trade_id.to_string(),
            self.date.format(DATE_FORMAT).to_string(),
            self.action.code().to_string(),
            format!("{:.4}", self.price),
            self.size.to_string(),
            money(self.total_amount),
            money(self.commission),
            self.status.as_str().to_string(),
        ]
    }
}

impl Tabular for EquityPoint {
    fn headers() -> &'static [&'static str] {
        &["date", "total_assets"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.date.format(DATE_FORMAT).to_string(), money(self.equity)]
    }
}

impl Tabular for ClosedTrade {
    fn headers() -> &'static [&'static str] {
        &[
            "entry_date",
            "exit_date",
            "quantity",
            "entry_price",
            "exit_price",
            "pnl",
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.entry_date.format(DATE_FORMAT).to_string(),
            self.exit_date.format(DATE_FORMAT).to_string(),
            self.quantity.to_string(),
            format!("{:.4}", self.entry_price),
            format!("{:.4}", self.exit_price),
            money(self.pnl),
        ]
    }
}

/// Percent columns are ×100.
impl Tabular for Metrics {
    fn headers() -> &'static [&'static str] {
        &[
            "final_equity",
            "total_return_pct",
            "annualized_return_pct",
            "max_drawdown_pct",
            "max_drawdown_duration",
            "sharpe_ratio",
            "sortino_ratio",
            "win_rate_pct",
            "profit_factor",
            "round_trips",
            "normal_buy_signals",
            "normal_sell_signals",
            "strong_buy_signals",
            "strong_sell_signals",
            "buy_signals_acted",
            "sell_signals_acted",
            "executed_buys",
            "executed_sells",
            "total_commission",
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            money(self.final_equity),
            pct(self.total_return),
            pct(self.annualized_return),
            pct(self.max_drawdown),
            self.max_drawdown_duration.to_string(),
            format!("{:.4}", self.sharpe_ratio),
            format!("{:.4}", self.sortino_ratio),
            pct(self.round_trips.win_rate),
            format!("{:.4}", self.round_trips.profit_factor),
            self.round_trips.total().to_string(),
            self.signal_counts.normal_buy.to_string(),
            self.signal_counts.normal_sell.to_string(),
            self.signal_counts.strong_buy.to_string(),
            self.signal_counts.strong_sell.to_string(),
            self.buy_signals_acted.to_string(),
            self.sell_signals_acted.to_string(),
            self.executed_buys.to_string(),
            self.executed_sells.to_string(),
            money(self.total_commission),
        ]
    }
}
