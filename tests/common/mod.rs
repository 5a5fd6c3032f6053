#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashMap;
use voltrader::adapters::file_config_adapter::FileConfigAdapter;
use voltrader::domain::config_validation::{validate_config, RunSettings};
use voltrader::domain::error::VoltraderError;
use voltrader::domain::market::Market;
pub use voltrader::domain::ohlcv::OhlcvBar;
use voltrader::domain::strategy::StrategyRegistry;
use voltrader::ports::data_port::{DataPort, InstrumentData};

pub struct MockDataPort {
    pub data: HashMap<String, InstrumentData>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(self, instrument: &str, bars: Vec<OhlcvBar>) -> Self {
        self.with_market_bars(instrument, None, bars)
    }

    pub fn with_market_bars(
        mut self,
        instrument: &str,
        market: Option<Market>,
        bars: Vec<OhlcvBar>,
    ) -> Self {
        self.data.insert(
            instrument.to_string(),
            InstrumentData {
                instrument: instrument.to_string(),
                market,
                bars,
            },
        );
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors.insert(instrument.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn list_instruments(&self) -> Result<Vec<String>, VoltraderError> {
        let mut names: Vec<String> = self
            .data
            .keys()
            .chain(self.errors.keys())
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    fn load(&self, instrument: &str) -> Result<InstrumentData, VoltraderError> {
        if let Some(reason) = self.errors.get(instrument) {
            return Err(VoltraderError::integrity(instrument, None, reason.clone()));
        }
        self.data
            .get(instrument)
            .cloned()
            .ok_or_else(|| VoltraderError::NoData {
                instrument: instrument.to_string(),
            })
    }
}

pub fn date(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64)
}

pub fn make_bar(i: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> OhlcvBar {
    OhlcvBar {
        date: date(i),
        open,
        high,
        low,
        close,
        volume,
    }
}

pub fn flat_series(count: usize, price: f64, volume: f64) -> Vec<OhlcvBar> {
    (0..count)
        .map(|i| make_bar(i, price, price, price, price, volume))
        .collect()
}

/// 45 flat bars at 100, a ten-bar slide of one point a day with a 5× volume
/// spike on the last down bar (index 54), then five recovery bars.
pub fn capitulation_series() -> Vec<OhlcvBar> {
    let mut bars = flat_series(45, 100.0, 1000.0);
    let mut prev = 100.0;
    for i in 45..55 {
        let close = prev - 1.0;
        let volume = if i == 54 { 5000.0 } else { 1000.0 };
        bars.push(make_bar(i, prev, prev + 0.1, close - 0.1, close, volume));
        prev = close;
    }
    for i in 55..60 {
        let close = prev + 1.5;
        bars.push(make_bar(i, prev, close + 0.1, prev - 0.1, close, 1500.0));
        prev = close;
    }
    bars
}

/// Deterministic zig-zag with periodic volume bursts.
pub fn choppy_series(count: usize) -> Vec<OhlcvBar> {
    let mut prev: f64 = 50.0;
    (0..count)
        .map(|i| {
            let step = match i % 12 {
                0..=4 => -0.8,
                5..=9 => 0.9,
                _ => 0.1,
            };
            let close = prev + step;
            let volume = if i % 12 == 4 || i % 12 == 9 { 9000.0 } else { 1500.0 };
            let bar = make_bar(
                i,
                prev,
                prev.max(close) + 0.2,
                prev.min(close) - 0.2,
                close,
                volume,
            );
            prev = close;
            bar
        })
        .collect()
}

/// Settings from an INI string, validated against the default registry.
pub fn settings_from(ini: &str) -> RunSettings {
    let config = FileConfigAdapter::from_string(ini).unwrap();
    validate_config(&config, &StrategyRegistry::with_defaults()).unwrap()
}

pub fn default_settings() -> RunSettings {
    settings_from("")
}
