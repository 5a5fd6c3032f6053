//! Cash, position and equity tracking for one run.

use chrono::NaiveDate;

use super::position::Position;
use super::sizing::SizingInputs;
use super::trade::{Trade, TradeAction};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub cash: f64,
    pub initial_cash: f64,
    pub position: Position,
    pub equity_curve: Vec<EquityPoint>,
}

impl Account {
    pub fn new(initial_cash: f64) -> Self {
        Account {
            cash: initial_cash,
            initial_cash,
            position: Position::default(),
            equity_curve: Vec::new(),
        }
    }

    /// cash + size × price
    pub fn equity(&self, price: f64) -> f64 {
        self.cash + self.position.market_value(price)
    }

    pub fn sizing_inputs(&self, price: f64) -> SizingInputs {
        SizingInputs {
            cash: self.cash,
            equity: self.equity(price),
            position: self.position.size,
        }
    }

    pub fn apply_fill(&mut self, trade: &Trade) {
        self.cash += trade.cash_flow();
        match trade.action {
            TradeAction::Buy => self.position.apply_buy(trade.size, trade.price),
            TradeAction::Sell => {
                self.position.apply_sell(trade.size, trade.price);
            }
        }
    }

    pub fn record_equity(&mut self, date: NaiveDate, price: f64) {
        let equity = self.equity(price);
        self.equity_curve.push(EquityPoint { date, equity });
    }
}
