//! KDJ stochastic oscillator, streaming form.
//!
//! RSV = (C - LLV(L, 9)) / (HHV(H, 3) - LLV(L, 3) + 1e-10) × 100
//!
//! The numerator uses the 9-bar low while the range in the denominator uses
//! 3-bar extremes. K = SMA(RSV, 3), D = SMA(K, 3), J = 3K - 2D.

use super::rolling::RollingWindow;
use crate::domain::ohlcv::OhlcvBar;

pub const LOW_ZONE: f64 = 20.0;
pub const HIGH_ZONE: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdjReading {
    pub k: f64,
    pub d: f64,
    pub j: f64,
}

impl KdjReading {
    pub fn in_buy_zone(&self) -> bool {
        (self.k < LOW_ZONE && self.d < LOW_ZONE) || self.j < LOW_ZONE
    }

    pub fn in_sell_zone(&self) -> bool {
        (self.k > HIGH_ZONE && self.d > HIGH_ZONE) || self.j > HIGH_ZONE
    }
}

#[derive(Debug, Clone)]
pub struct Kdj {
    low_n: RollingWindow,
    low_3: RollingWindow,
    high_3: RollingWindow,
    rsv: RollingWindow,
    k: RollingWindow,
}

impl Kdj {
    pub fn new(period: usize) -> Self {
        Kdj {
            low_n: RollingWindow::new(period),
            low_3: RollingWindow::new(3),
            high_3: RollingWindow::new(3),
            rsv: RollingWindow::new(3),
            k: RollingWindow::new(3),
        }
    }

    pub fn update(&mut self, bar: &OhlcvBar) -> Option<KdjReading> {
        self.low_n.push(bar.low);
        self.low_3.push(bar.low);
        self.high_3.push(bar.high);

        let (Some(llv_n), Some(llv_3), Some(hhv_3)) =
            (self.low_n.min(), self.low_3.min(), self.high_3.max())
        else {
            return None;
        };

        self.rsv
            .push((bar.close - llv_n) / (hhv_3 - llv_3 + 1e-10) * 100.0);
        let k = self.rsv.sma()?;
        self.k.push(k);
        let d = self.k.sma()?;

        Some(KdjReading {
            k,
            d,
            j: 3.0 * k - 2.0 * d,
        })
    }
}

impl Default for Kdj {
    fn default() -> Self {
        Kdj::new(9)
    }
}
