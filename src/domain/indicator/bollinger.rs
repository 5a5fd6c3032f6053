//! Bollinger Bands, streaming form.
//!
//! - Middle: SMA(close, n)
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the population standard deviation (divides by N, not N-1).
//! Default parameters: period=20, multiplier=2.0.

use super::rolling::RollingWindow;
use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl Bands {
    /// Low pierced the lower band, or close held above it.
    pub fn confirms_buy(&self, bar: &OhlcvBar) -> bool {
        bar.low < self.lower || bar.close > self.lower
    }

    /// High pierced the upper band, or close held below it.
    pub fn confirms_sell(&self, bar: &OhlcvBar) -> bool {
        bar.high > self.upper || bar.close < self.upper
    }
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    window: RollingWindow,
    multiplier: f64,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64) -> Self {
        Bollinger {
            window: RollingWindow::new(period),
            multiplier,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<Bands> {
        self.window.push(close);
        let middle = self.window.sma()?;
        let stddev = self.window.std_dev()?;
        Some(Bands {
            upper: middle + self.multiplier * stddev,
            middle,
            lower: middle - self.multiplier * stddev,
        })
    }
}

impl Default for Bollinger {
    fn default() -> Self {
        Bollinger::new(20, 2.0)
    }
}
