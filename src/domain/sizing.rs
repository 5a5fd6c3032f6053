//! Position sizing under capital and position caps.
//!
//! Buy:
//! 1. usable = min(cash, equity × max_single_buy_percent, equity × max_portfolio_percent)
//! 2. Reject unless usable covers one lot at the decision price
//! 3. shares = floor(usable / price), floored to a lot multiple
//! 4. Drop lots until shares × price + fees fit in cash
//!
//! Sell:
//! 1. Reject when flat
//! 2. size = min(position, floor(equity × max_single_sell_percent / price)),
//!    both floored to a lot multiple
//! 3. Reject below one lot
//!
//! The sizer only proposes orders; it never touches the account.

use std::fmt;

use super::commission::{CommissionBreakdown, CommissionModel};
use super::error::VoltraderError;
use super::trade::TradeAction;

#[derive(Debug, Clone, PartialEq)]
pub struct SizingConfig {
    /// Lot size; every order is a multiple of it.
    pub min_order_size: i64,
    pub max_portfolio_percent: f64,
    pub max_single_buy_percent: f64,
    pub max_single_sell_percent: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        SizingConfig {
            min_order_size: 100,
            max_portfolio_percent: 0.8,
            max_single_buy_percent: 0.2,
            max_single_sell_percent: 0.3,
        }
    }
}

impl SizingConfig {
    pub fn validate(&self) -> Result<(), VoltraderError> {
        if self.min_order_size < 1 {
            return Err(VoltraderError::config_invalid(
                "sizing",
                "min_order_size",
                format!("must be at least 1, got {}", self.min_order_size),
            ));
        }
        for (key, value) in [
            ("max_portfolio_percent", self.max_portfolio_percent),
            ("max_single_buy_percent", self.max_single_buy_percent),
            ("max_single_sell_percent", self.max_single_sell_percent),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(VoltraderError::config_invalid(
                    "sizing",
                    key,
                    format!("must be between 0 and 1, got {value}"),
                ));
            }
        }
        Ok(())
    }
}

/// Account state the sizer reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingInputs {
    pub cash: f64,
    pub equity: f64,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderInstruction {
    pub action: TradeAction,
    pub size: i64,
    /// Decision price the order was sized at.
    pub price: f64,
    pub fee_preview: CommissionBreakdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    NoPosition,
    InsufficientCash { cash: f64, required: f64 },
    BelowMinimumLot { shares: i64, lot: i64 },
    InvalidPrice { price: f64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NoPosition => write!(f, "no position to sell"),
            Rejection::InsufficientCash { cash, required } => {
                write!(f, "insufficient cash {cash:.2} for one lot costing {required:.2}")
            }
            Rejection::BelowMinimumLot { shares, lot } => {
                write!(f, "{shares} shares is below the minimum lot of {lot}")
            }
            Rejection::InvalidPrice { price } => write!(f, "invalid price {price}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SizingDecision {
    Accepted(OrderInstruction),
    Rejected(Rejection),
}

impl SizingDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SizingDecision::Accepted(_))
    }
}

pub fn floor_to_lot(shares: i64, lot: i64) -> i64 {
    if lot <= 0 {
        return shares;
    }
    shares.div_euclid(lot) * lot
}

#[derive(Debug, Clone)]
pub struct PositionSizer {
    pub config: SizingConfig,
    pub commission: CommissionModel,
}

impl PositionSizer {
    pub fn new(config: SizingConfig, commission: CommissionModel) -> Self {
        PositionSizer { config, commission }
    }

    pub fn size_buy(&self, inputs: &SizingInputs, price: f64) -> SizingDecision {
        if !price.is_finite() || price <= 0.0 {
            return SizingDecision::Rejected(Rejection::InvalidPrice { price });
        }

        let lot = self.config.min_order_size;
        let usable = inputs
            .cash
            .min(inputs.equity * self.config.max_single_buy_percent)
            .min(inputs.equity * self.config.max_portfolio_percent);

        let raw_shares = (usable.max(0.0) / price).floor() as i64;
        if usable < price * lot as f64 {
            return SizingDecision::Rejected(Rejection::BelowMinimumLot {
                shares: raw_shares,
                lot,
            });
        }

        let mut shares = floor_to_lot(raw_shares, lot);
        while shares >= lot {
            let fee = self.commission.estimate(shares, price);
            if shares as f64 * price + fee.total <= inputs.cash {
                return SizingDecision::Accepted(OrderInstruction {
                    action: TradeAction::Buy,
                    size: shares,
                    price,
                    fee_preview: fee,
                });
            }
            shares -= lot;
        }

        let one_lot = self.commission.estimate(lot, price);
        SizingDecision::Rejected(Rejection::InsufficientCash {
            cash: inputs.cash,
            required: lot as f64 * price + one_lot.total,
        })
    }

    pub fn size_sell(&self, inputs: &SizingInputs, price: f64) -> SizingDecision {
        if inputs.position <= 0 {
            return SizingDecision::Rejected(Rejection::NoPosition);
        }
        if !price.is_finite() || price <= 0.0 {
            return SizingDecision::Rejected(Rejection::InvalidPrice { price });
        }

        let lot = self.config.min_order_size;
        let held = floor_to_lot(inputs.position, lot);
        let by_equity = ((inputs.equity * self.config.max_single_sell_percent).max(0.0) / price)
            .floor() as i64;
        let shares = held.min(floor_to_lot(by_equity, lot));

        if shares < lot {
            return SizingDecision::Rejected(Rejection::BelowMinimumLot { shares, lot });
        }

        SizingDecision::Accepted(OrderInstruction {
            action: TradeAction::Sell,
            size: shares,
            price,
            fee_preview: self.commission.estimate(shares, price),
        })
    }
}
