//! Position tracking and round-trip bookkeeping.

use chrono::NaiveDate;

use super::trade::{Trade, TradeAction};

/// Long-only holding in a single instrument.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub size: i64,
    pub average_cost: f64,
}

impl Position {
    pub fn is_flat(&self) -> bool {
        self.size == 0
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.size as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.size as f64 * (price - self.average_cost)
    }

    pub fn apply_buy(&mut self, size: i64, price: f64) {
        let new_size = self.size + size;
        if new_size > 0 {
            self.average_cost = (self.size as f64 * self.average_cost + size as f64 * price)
                / new_size as f64;
        }
        self.size = new_size;
    }

    /// Reduce the holding; returns the gross realized P&L against average cost.
    pub fn apply_sell(&mut self, size: i64, price: f64) -> f64 {
        let size = size.min(self.size);
        let realized = size as f64 * (price - self.average_cost);
        self.size -= size;
        if self.size == 0 {
            self.average_cost = 0.0;
        }
        realized
    }
}

/// A completed flat → long → flat cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    /// Total shares bought over the round trip.
    pub quantity: i64,
    /// Average buy price.
    pub entry_price: f64,
    /// Volume-weighted sell price.
    pub exit_price: f64,
    /// Net of every fill's fees.
    pub pnl: f64,
}

impl ClosedTrade {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.pnl < 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
struct OpenRoundTrip {
    entry_date: NaiveDate,
    bought: i64,
    bought_value: f64,
    sold: i64,
    sold_value: f64,
    fees: f64,
}

/// Groups fills into round trips.
#[derive(Debug, Clone, Default)]
pub struct RoundTripTracker {
    open: Option<OpenRoundTrip>,
}

impl RoundTripTracker {
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Record a fill; `position_after` is the holding once the fill settled.
    pub fn on_fill(&mut self, trade: &Trade, position_after: &Position) -> Option<ClosedTrade> {
        let open = self.open.get_or_insert_with(|| OpenRoundTrip {
            entry_date: trade.date,
            bought: 0,
            bought_value: 0.0,
            sold: 0,
            sold_value: 0.0,
            fees: 0.0,
        });

        match trade.action {
            TradeAction::Buy => {
                open.bought += trade.size;
                open.bought_value += trade.total_amount;
            }
            TradeAction::Sell => {
                open.sold += trade.size;
                open.sold_value += trade.total_amount;
            }
        }
        open.fees += trade.commission;

        if !position_after.is_flat() {
            return None;
        }

        let open = self.open.take()?;
        if open.bought == 0 || open.sold == 0 {
            return None;
        }

        Some(ClosedTrade {
            entry_date: open.entry_date,
            exit_date: trade.date,
            quantity: open.bought,
            entry_price: open.bought_value / open.bought as f64,
            exit_price: open.sold_value / open.sold as f64,
            pnl: open.sold_value - open.bought_value - open.fees,
        })
    }
}
