//! Market identifiers.

use std::fmt;
use std::str::FromStr;

use super::error::VoltraderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Market {
    Hk,
    Cn,
    Us,
}

impl Market {
    pub const ALL: [Market; 3] = [Market::Hk, Market::Cn, Market::Us];

    pub fn code(&self) -> &'static str {
        match self {
            Market::Hk => "HK",
            Market::Cn => "CN",
            Market::Us => "US",
        }
    }

    pub fn currency(&self) -> &'static str {
        match self {
            Market::Hk => "HKD",
            Market::Cn => "CNY",
            Market::Us => "USD",
        }
    }

    /// Config section holding fee overrides for this market.
    pub fn commission_section(&self) -> &'static str {
        match self {
            Market::Hk => "commission_hk",
            Market::Cn => "commission_cn",
            Market::Us => "commission_us",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Market {
    type Err = VoltraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "HK" => Ok(Market::Hk),
            "CN" => Ok(Market::Cn),
            "US" => Ok(Market::Us),
            _ => Err(VoltraderError::UnknownMarket {
                market: s.trim().to_string(),
            }),
        }
    }
}
