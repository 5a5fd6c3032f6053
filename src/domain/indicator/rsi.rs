//! RSI (Relative Strength Index), streaming form.
//!
//! Average gain/loss are simple moving averages of the up/down moves over
//! `period` bars (not Wilder smoothing):
//!
//! - UP = max(C - C[-1], 0), DOWN = |min(C - C[-1], 0)|
//! - RSI = SMA(UP, n) / (SMA(UP, n) + SMA(DOWN, n) + 1e-10) × 100
//!
//! The epsilon keeps a flat series at RSI 0 instead of dividing by zero.
//! Warmup: the first value appears on bar n+1 (n price changes needed).

use super::rolling::RollingWindow;

pub const OVERSOLD: f64 = 30.0;
pub const OVERBOUGHT: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiReading {
    pub value: f64,
    pub previous: Option<f64>,
    /// Crossover checks only run once more than `period` bars were seen.
    pub crossover_armed: bool,
}

impl RsiReading {
    pub fn oversold(&self) -> bool {
        self.value < OVERSOLD
    }

    pub fn overbought(&self) -> bool {
        self.value > OVERBOUGHT
    }

    /// Today above 30 and yesterday below 30.
    pub fn crossed_up(&self) -> bool {
        self.crossover_armed
            && matches!(self.previous, Some(prev) if self.value > OVERSOLD && prev < OVERSOLD)
    }

    /// Today below 70 and yesterday above 70.
    pub fn crossed_down(&self) -> bool {
        self.crossover_armed
            && matches!(self.previous, Some(prev) if self.value < OVERBOUGHT && prev > OVERBOUGHT)
    }
}

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev_close: Option<f64>,
    ups: RollingWindow,
    downs: RollingWindow,
    bars_seen: usize,
    last: Option<f64>,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Rsi {
            period,
            prev_close: None,
            ups: RollingWindow::new(period),
            downs: RollingWindow::new(period),
            bars_seen: 0,
            last: None,
        }
    }

    pub fn update(&mut self, close: f64) -> Option<RsiReading> {
        self.bars_seen += 1;

        if let Some(prev) = self.prev_close {
            let delta = close - prev;
            self.ups.push(delta.max(0.0));
            self.downs.push((-delta).max(0.0));
        }
        self.prev_close = Some(close);

        let value = match (self.ups.sma(), self.downs.sma()) {
            (Some(up), Some(down)) => up / (up + down + 1e-10) * 100.0,
            _ => return None,
        };

        let reading = RsiReading {
            value,
            previous: self.last,
            crossover_armed: self.bars_seen > self.period,
        };
        self.last = Some(value);
        Some(reading)
    }
}
