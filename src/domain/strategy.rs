//! Trading strategies and the name → factory registry.
//!
//! A strategy turns one bar's indicator evaluation into at most one order
//! intent. When buy and sell conditions fire on the same bar, buy wins.

use std::collections::BTreeMap;

use super::error::VoltraderError;
use super::indicator::BarEvaluation;
use super::ohlcv::OhlcvBar;
use super::signal::SignalKind;
use super::trade::TradeAction;

pub const DEFAULT_STRATEGY: &str = "enhanced_volume";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderIntent {
    pub action: TradeAction,
    /// Signal the intent acts on.
    pub signal: SignalKind,
}

pub trait Strategy {
    fn name(&self) -> &str;

    fn evaluate(&mut self, bar: &OhlcvBar, evaluation: &BarEvaluation) -> Option<OrderIntent>;
}

fn intent_for(
    evaluation: &BarEvaluation,
    buy: SignalKind,
    sell: SignalKind,
) -> Option<OrderIntent> {
    if evaluation.has(buy) {
        Some(OrderIntent {
            action: TradeAction::Buy,
            signal: buy,
        })
    } else if evaluation.has(sell) {
        Some(OrderIntent {
            action: TradeAction::Sell,
            signal: sell,
        })
    } else {
        None
    }
}

/// Trades confirmed (strong) signals only.
#[derive(Debug, Default, Clone)]
pub struct EnhancedVolumeStrategy;

impl Strategy for EnhancedVolumeStrategy {
    fn name(&self) -> &str {
        "enhanced_volume"
    }

    fn evaluate(&mut self, _bar: &OhlcvBar, evaluation: &BarEvaluation) -> Option<OrderIntent> {
        intent_for(evaluation, SignalKind::StrongBuy, SignalKind::StrongSell)
    }
}

/// Trades every main volume signal.
#[derive(Debug, Default, Clone)]
pub struct MainVolumeStrategy;

impl Strategy for MainVolumeStrategy {
    fn name(&self) -> &str {
        "main_volume"
    }

    fn evaluate(&mut self, _bar: &OhlcvBar, evaluation: &BarEvaluation) -> Option<OrderIntent> {
        intent_for(evaluation, SignalKind::NormalBuy, SignalKind::NormalSell)
    }
}

pub type StrategyFactory = fn() -> Box<dyn Strategy>;

#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    factories: BTreeMap<String, StrategyFactory>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        StrategyRegistry::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = StrategyRegistry::new();
        registry.register("enhanced_volume", || Box::new(EnhancedVolumeStrategy));
        registry.register("main_volume", || Box::new(MainVolumeStrategy));
        registry
    }

    /// Registers `factory` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: &str, factory: StrategyFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Strategy>, VoltraderError> {
        let factory = self.factories.get(name).ok_or_else(|| {
            VoltraderError::config_invalid(
                "backtest",
                "strategy",
                format!(
                    "unknown strategy '{name}' (available: {})",
                    self.names().join(", ")
                ),
            )
        })?;
        Ok(factory())
    }
}
