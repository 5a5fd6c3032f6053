//! Executed trade records.

use std::fmt;

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    pub fn code(&self) -> &'static str {
        match self {
            TradeAction::Buy => "B",
            TradeAction::Sell => "S",
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Fills settle immediately, so every recorded trade is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeStatus {
    Completed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub trade_id: u64,
    pub date: NaiveDate,
    pub action: TradeAction,
    /// Fill price including slippage.
    pub price: f64,
    pub size: i64,
    /// price × size, before fees.
    pub total_amount: f64,
    pub commission: f64,
    pub status: TradeStatus,
}

impl Trade {
    /// Cash moved by this trade: negative for buys, positive for sells.
    pub fn cash_flow(&self) -> f64 {
        match self.action {
            TradeAction::Buy => -(self.total_amount + self.commission),
            TradeAction::Sell => self.total_amount - self.commission,
        }
    }
}
