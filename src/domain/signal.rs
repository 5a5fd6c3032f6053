//! Signal records emitted by the indicator engine.

use std::fmt;

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    NormalBuy,
    NormalSell,
    StrongBuy,
    StrongSell,
}

impl SignalKind {
    pub const ALL: [SignalKind; 4] = [
        SignalKind::NormalBuy,
        SignalKind::NormalSell,
        SignalKind::StrongBuy,
        SignalKind::StrongSell,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::NormalBuy => "normal_buy",
            SignalKind::NormalSell => "normal_sell",
            SignalKind::StrongBuy => "strong_buy",
            SignalKind::StrongSell => "strong_sell",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SignalKind::NormalBuy => "long",
            SignalKind::NormalSell => "short",
            SignalKind::StrongBuy => "strong long",
            SignalKind::StrongSell => "strong short",
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, SignalKind::NormalBuy | SignalKind::StrongBuy)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub date: NaiveDate,
    pub kind: SignalKind,
    pub description: String,
    /// Close of the bar the signal fired on.
    pub price: f64,
}

impl Signal {
    pub fn new(date: NaiveDate, kind: SignalKind, price: f64) -> Self {
        Signal {
            date,
            kind,
            description: kind.description().to_string(),
            price,
        }
    }
}
