//! Configuration validation.
//!
//! Reads every setting a run needs, checks it, and returns the resolved
//! `RunSettings`. Nothing runs until this succeeds.

use std::path::PathBuf;

use crate::domain::backtest::{BacktestConfig, DEFAULT_INITIAL_CASH};
use crate::domain::commission::FeeSchedule;
use crate::domain::error::VoltraderError;
use crate::domain::indicator::IndicatorConfig;
use crate::domain::market::Market;
use crate::domain::sizing::SizingConfig;
use crate::domain::strategy::{StrategyRegistry, DEFAULT_STRATEGY};
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_OUTPUT_DIR: &str = "output";

#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub backtest: BacktestConfig,
    pub strategy: String,
    pub data_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub risk_free_rate: f64,
    /// Fee schedules for every market, config overrides applied.
    market_fees: Vec<(Market, FeeSchedule)>,
}

impl RunSettings {
    /// Backtest config for an instrument whose data names `market`.
    /// `None` keeps the configured market.
    pub fn config_for(&self, market: Option<Market>) -> BacktestConfig {
        match market {
            Some(m) if m != self.backtest.market => {
                let mut config = self.backtest.with_market(m);
                if let Some((_, fees)) = self.market_fees.iter().find(|(k, _)| *k == m) {
                    config.fees = *fees;
                }
                config
            }
            _ => self.backtest.clone(),
        }
    }

    /// Replaces the configured strategy, e.g. from a command-line flag.
    pub fn with_strategy(
        mut self,
        name: &str,
        registry: &StrategyRegistry,
    ) -> Result<Self, VoltraderError> {
        check_strategy(name, registry)?;
        self.strategy = name.to_string();
        Ok(self)
    }
}

fn check_strategy(name: &str, registry: &StrategyRegistry) -> Result<(), VoltraderError> {
    if registry.contains(name) {
        return Ok(());
    }
    Err(VoltraderError::config_invalid(
        "backtest",
        "strategy",
        format!(
            "unknown strategy '{name}' (available: {})",
            registry.names().join(", ")
        ),
    ))
}

/// Validates `config` and resolves the run settings.
pub fn validate_config(
    config: &dyn ConfigPort,
    registry: &StrategyRegistry,
) -> Result<RunSettings, VoltraderError> {
    let backtest = build_backtest_config(config)?;

    let strategy = config
        .get_string("backtest", "strategy")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_STRATEGY.to_string());
    check_strategy(&strategy, registry)?;

    let risk_free_rate = read_f64(config, "backtest", "risk_free_rate", 0.0)?;
    if !(0.0..1.0).contains(&risk_free_rate) {
        return Err(VoltraderError::config_invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }

    let data_dir = read_path(config, "data_dir");
    let output_dir =
        read_path(config, "output_dir").unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    let mut market_fees = Vec::with_capacity(Market::ALL.len());
    for market in Market::ALL {
        market_fees.push((market, FeeSchedule::from_config(market, config)?));
    }

    Ok(RunSettings {
        backtest,
        strategy,
        data_dir,
        output_dir,
        risk_free_rate,
        market_fees,
    })
}

/// Builds the per-run engine config from `[backtest]`, `[sizing]`,
/// `[indicator]` and the market's commission section.
pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, VoltraderError> {
    let market = match config.get_string("backtest", "market") {
        Some(raw) if !raw.trim().is_empty() => raw.parse::<Market>()?,
        _ => Market::Hk,
    };

    let initial_cash = read_f64(config, "backtest", "initial_cash", DEFAULT_INITIAL_CASH)?;
    if initial_cash <= 0.0 {
        return Err(VoltraderError::config_invalid(
            "backtest",
            "initial_cash",
            "initial_cash must be positive",
        ));
    }

    let slippage = read_f64(config, "backtest", "slippage", 0.0)?;
    if slippage < 0.0 {
        return Err(VoltraderError::config_invalid(
            "backtest",
            "slippage",
            "slippage must be non-negative",
        ));
    }

    let defaults = SizingConfig::default();
    let sizing = SizingConfig {
        min_order_size: read_i64(config, "sizing", "min_order_size", defaults.min_order_size)?,
        max_portfolio_percent: read_f64(
            config,
            "sizing",
            "max_portfolio_percent",
            defaults.max_portfolio_percent,
        )?,
        max_single_buy_percent: read_f64(
            config,
            "sizing",
            "max_single_buy_percent",
            defaults.max_single_buy_percent,
        )?,
        max_single_sell_percent: read_f64(
            config,
            "sizing",
            "max_single_sell_percent",
            defaults.max_single_sell_percent,
        )?,
    };
    sizing.validate()?;

    let indicator = IndicatorConfig {
        rsi_filter: config.get_bool("indicator", "rsi_filter", true),
    };

    Ok(BacktestConfig {
        initial_cash,
        market,
        slippage,
        sizing,
        indicator,
        fees: FeeSchedule::from_config(market, config)?,
    })
}

fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, VoltraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(VoltraderError::config_invalid(
                section,
                key,
                format!("expected a number, got '{raw}'"),
            )),
        },
    }
}

fn read_i64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, VoltraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
            VoltraderError::config_invalid(section, key, format!("expected an integer, got '{raw}'"))
        }),
    }
}

fn read_path(config: &dyn ConfigPort, key: &str) -> Option<PathBuf> {
    config
        .get_string("backtest", key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}
