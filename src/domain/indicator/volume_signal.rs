//! Composite volume/price signal engine.
//!
//! Per bar, for each horizon h in {5, 20}:
//!
//! - volume multiplier: 0.9 + min(std5 / (ma5 + 1e-10), 0.6) for h=5,
//!   0.8 + min(std20 / (ma20 + 1e-10), 0.5) for h=20
//! - volume excess: vol - vol_ma_h when vol > vol_ma_h × multiplier, else 0
//! - price count: ma_close_h - close after three bearish bars (buy side),
//!   close - ma_close_h after three bullish bars (sell side), when positive
//! - score: -excess × count (buy) or excess × count (sell) when both positive
//!
//! A main signal needs a non-zero score on both horizons and more than
//! [`MAIN_SIGNAL_MIN_BARS`] bars seen. A strong signal is a main signal
//! confirmed by RSI (optional), Bollinger and KDJ.
//!
//! Nothing is emitted before [`WARMUP_BARS`] bars: the evaluation carries no
//! snapshot and all markers are `None`.

use std::collections::VecDeque;

use chrono::NaiveDate;

use super::bollinger::{Bands, Bollinger};
use super::kdj::{Kdj, KdjReading};
use super::rolling::RollingWindow;
use super::rsi::{Rsi, RsiReading};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::{Signal, SignalKind};

pub const SHORT_PERIOD: usize = 5;
pub const LONG_PERIOD: usize = 20;
pub const RSI_PERIOD: usize = 14;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_WIDTH: f64 = 2.0;
pub const KDJ_PERIOD: usize = 9;

/// Longest lookback plus one.
pub const WARMUP_BARS: usize = LONG_PERIOD + 1;

/// Main signals need strictly more bars than this.
pub const MAIN_SIGNAL_MIN_BARS: usize = 50;

/// Chart offsets for the four markers, relative to the bar's low/high.
const MAIN_BUY_OFFSET: f64 = 0.96;
const MAIN_SELL_OFFSET: f64 = 1.05;
const STRONG_BUY_OFFSET: f64 = 0.90;
const STRONG_SELL_OFFSET: f64 = 1.08;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorConfig {
    /// Require RSI oversold/overbought or a crossover for strong signals.
    pub rsi_filter: bool,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        IndicatorConfig { rsi_filter: true }
    }
}

/// Chart positions of the fired markers; `None` where a marker did not fire.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SignalMarkers {
    pub main_buy: Option<f64>,
    pub main_sell: Option<f64>,
    pub strong_buy: Option<f64>,
    pub strong_sell: Option<f64>,
}

impl SignalMarkers {
    pub fn fired(&self) -> Vec<SignalKind> {
        [
            (SignalKind::NormalBuy, self.main_buy),
            (SignalKind::NormalSell, self.main_sell),
            (SignalKind::StrongBuy, self.strong_buy),
            (SignalKind::StrongSell, self.strong_sell),
        ]
        .into_iter()
        .filter_map(|(kind, marker)| marker.map(|_| kind))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.main_buy.is_none()
            && self.main_sell.is_none()
            && self.strong_buy.is_none()
            && self.strong_sell.is_none()
    }

    pub fn has(&self, kind: SignalKind) -> bool {
        match kind {
            SignalKind::NormalBuy => self.main_buy.is_some(),
            SignalKind::NormalSell => self.main_sell.is_some(),
            SignalKind::StrongBuy => self.strong_buy.is_some(),
            SignalKind::StrongSell => self.strong_sell.is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizonScore {
    pub volume_multiplier: f64,
    pub volume_excess: f64,
    pub buy: f64,
    pub sell: f64,
}

/// Indicator values behind one bar's evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub short: HorizonScore,
    pub long: HorizonScore,
    pub three_down: bool,
    pub three_up: bool,
    pub rsi: RsiReading,
    pub bands: Bands,
    pub kdj: KdjReading,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarEvaluation {
    pub date: NaiveDate,
    /// 1-based count of bars seen, including this one.
    pub bars_seen: usize,
    pub snapshot: Option<IndicatorSnapshot>,
    pub markers: SignalMarkers,
    pub signals: Vec<Signal>,
}

impl BarEvaluation {
    pub fn is_warmup(&self) -> bool {
        self.snapshot.is_none()
    }

    pub fn has(&self, kind: SignalKind) -> bool {
        self.markers.has(kind)
    }
}

#[derive(Debug, Clone)]
struct Horizon {
    volume: RollingWindow,
    close: RollingWindow,
    base: f64,
    cap: f64,
}

impl Horizon {
    fn new(period: usize, base: f64, cap: f64) -> Self {
        Horizon {
            volume: RollingWindow::new(period),
            close: RollingWindow::new(period),
            base,
            cap,
        }
    }

    fn push(&mut self, bar: &OhlcvBar) {
        self.volume.push(bar.volume);
        self.close.push(bar.close);
    }

    fn score(&self, bar: &OhlcvBar, three_down: bool, three_up: bool) -> Option<HorizonScore> {
        let vol_ma = self.volume.sma()?;
        let vol_std = self.volume.std_dev()?;
        let close_ma = self.close.sma()?;

        let volume_multiplier = self.base + (vol_std / (vol_ma + 1e-10)).min(self.cap);
        let volume_excess = if bar.volume > vol_ma * volume_multiplier {
            bar.volume - vol_ma
        } else {
            0.0
        };

        let buy_count = if three_down && close_ma > bar.close {
            close_ma - bar.close
        } else {
            0.0
        };
        let sell_count = if three_up && close_ma < bar.close {
            bar.close - close_ma
        } else {
            0.0
        };

        let buy = if volume_excess > 0.0 && buy_count > 0.0 {
            -volume_excess * buy_count
        } else {
            0.0
        };
        let sell = if volume_excess > 0.0 && sell_count > 0.0 {
            volume_excess * sell_count
        } else {
            0.0
        };

        Some(HorizonScore {
            volume_multiplier,
            volume_excess,
            buy,
            sell,
        })
    }
}

/// Streaming engine; one instance per run.
#[derive(Debug, Clone)]
pub struct VolumeSignalEngine {
    config: IndicatorConfig,
    short: Horizon,
    long: Horizon,
    rsi: Rsi,
    bollinger: Bollinger,
    kdj: Kdj,
    recent: VecDeque<(bool, bool)>,
    bars_seen: usize,
}

impl VolumeSignalEngine {
    pub fn new(config: IndicatorConfig) -> Self {
        VolumeSignalEngine {
            config,
            short: Horizon::new(SHORT_PERIOD, 0.9, 0.6),
            long: Horizon::new(LONG_PERIOD, 0.8, 0.5),
            rsi: Rsi::new(RSI_PERIOD),
            bollinger: Bollinger::new(BOLLINGER_PERIOD, BOLLINGER_WIDTH),
            kdj: Kdj::new(KDJ_PERIOD),
            recent: VecDeque::with_capacity(3),
            bars_seen: 0,
        }
    }

    pub fn config(&self) -> IndicatorConfig {
        self.config
    }

    pub fn update(&mut self, bar: &OhlcvBar) -> BarEvaluation {
        self.bars_seen += 1;

        self.short.push(bar);
        self.long.push(bar);
        let rsi = self.rsi.update(bar.close);
        let bands = self.bollinger.update(bar.close);
        let kdj = self.kdj.update(bar);

        if self.recent.len() == 3 {
            self.recent.pop_front();
        }
        self.recent.push_back((bar.is_bearish(), bar.is_bullish()));

        let mut evaluation = BarEvaluation {
            date: bar.date,
            bars_seen: self.bars_seen,
            snapshot: None,
            markers: SignalMarkers::default(),
            signals: Vec::new(),
        };

        if self.bars_seen < WARMUP_BARS {
            return evaluation;
        }

        let three_down = self.recent.len() == 3 && self.recent.iter().all(|(down, _)| *down);
        let three_up = self.recent.len() == 3 && self.recent.iter().all(|(_, up)| *up);

        let (Some(short), Some(long), Some(rsi), Some(bands), Some(kdj)) = (
            self.short.score(bar, three_down, three_up),
            self.long.score(bar, three_down, three_up),
            rsi,
            bands,
            kdj,
        ) else {
            return evaluation;
        };

        let snapshot = IndicatorSnapshot {
            short,
            long,
            three_down,
            three_up,
            rsi,
            bands,
            kdj,
        };
        evaluation.markers = self.markers(bar, &snapshot);
        evaluation.signals = evaluation
            .markers
            .fired()
            .into_iter()
            .map(|kind| Signal::new(bar.date, kind, bar.close))
            .collect();
        evaluation.snapshot = Some(snapshot);
        evaluation
    }

    fn markers(&self, bar: &OhlcvBar, s: &IndicatorSnapshot) -> SignalMarkers {
        let enough_history = self.bars_seen > MAIN_SIGNAL_MIN_BARS;
        let main_buy = enough_history && s.short.buy != 0.0 && s.long.buy != 0.0;
        let main_sell = enough_history && s.short.sell != 0.0 && s.long.sell != 0.0;

        let rsi_buy = !self.config.rsi_filter || s.rsi.oversold() || s.rsi.crossed_up();
        let rsi_sell = !self.config.rsi_filter || s.rsi.overbought() || s.rsi.crossed_down();

        let strong_buy = main_buy && rsi_buy && s.bands.confirms_buy(bar) && s.kdj.in_buy_zone();
        let strong_sell =
            main_sell && rsi_sell && s.bands.confirms_sell(bar) && s.kdj.in_sell_zone();

        SignalMarkers {
            main_buy: main_buy.then(|| bar.low * MAIN_BUY_OFFSET),
            main_sell: main_sell.then(|| bar.high * MAIN_SELL_OFFSET),
            strong_buy: strong_buy.then(|| bar.low * STRONG_BUY_OFFSET),
            strong_sell: strong_sell.then(|| bar.high * STRONG_SELL_OFFSET),
        }
    }
}

impl Default for VolumeSignalEngine {
    fn default() -> Self {
        VolumeSignalEngine::new(IndicatorConfig::default())
    }
}

/// Evaluate a whole series with a fresh engine.
pub fn evaluate_series(bars: &[OhlcvBar], config: IndicatorConfig) -> Vec<BarEvaluation> {
    let mut engine = VolumeSignalEngine::new(config);
    bars.iter().map(|bar| engine.update(bar)).collect()
}
