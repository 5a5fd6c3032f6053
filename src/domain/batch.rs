//! Multi-instrument batch runs.
//!
//! Every instrument gets its own data load, strategy instance and account.
//! Runs execute on the rayon pool and share nothing mutable; one failing
//! instrument does not stop the others.

use rayon::prelude::*;
use tracing::{error, info};

use super::backtest::{run_backtest, BacktestResult};
use super::config_validation::RunSettings;
use super::error::VoltraderError;
use super::metrics::Metrics;
use super::strategy::StrategyRegistry;
use crate::ports::data_port::DataPort;

#[derive(Debug)]
pub struct InstrumentOutcome {
    pub instrument: String,
    pub outcome: Result<(BacktestResult, Metrics), VoltraderError>,
}

impl InstrumentOutcome {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Loads and backtests one instrument.
pub fn run_instrument(
    port: &dyn DataPort,
    instrument: &str,
    strategy_name: &str,
    registry: &StrategyRegistry,
    settings: &RunSettings,
) -> Result<(BacktestResult, Metrics), VoltraderError> {
    let data = port.load(instrument)?;
    let config = settings.config_for(data.market);
    let mut strategy = registry.create(strategy_name)?;
    let result = run_backtest(&data.instrument, &data.bars, strategy.as_mut(), &config)?;
    let metrics = Metrics::compute(&result, settings.risk_free_rate);
    Ok((result, metrics))
}

/// Runs `instruments` in parallel. Outcomes come back in input order;
/// `on_complete` fires as each instrument finishes, in completion order.
pub fn run_batch<F>(
    port: &(dyn DataPort + Sync),
    instruments: &[String],
    strategy_name: &str,
    registry: &StrategyRegistry,
    settings: &RunSettings,
    on_complete: F,
) -> Vec<InstrumentOutcome>
where
    F: Fn(&InstrumentOutcome) + Send + Sync,
{
    info!(
        instruments = instruments.len(),
        strategy = strategy_name,
        "batch start"
    );

    let outcomes: Vec<InstrumentOutcome> = instruments
        .par_iter()
        .map(|instrument| {
            let outcome = run_instrument(port, instrument, strategy_name, registry, settings);
            if let Err(e) = &outcome {
                error!(instrument = %instrument, error = %e, "instrument failed");
            }
            let outcome = InstrumentOutcome {
                instrument: instrument.clone(),
                outcome,
            };
            on_complete(&outcome);
            outcome
        })
        .collect();

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    info!(
        succeeded = outcomes.len() - failed,
        failed, "batch end"
    );
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::config_validation::validate_config;
    use crate::domain::market::Market;
    use crate::domain::ohlcv::OhlcvBar;
    use crate::ports::data_port::InstrumentData;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MapPort(HashMap<String, InstrumentData>);

    impl DataPort for MapPort {
        fn list_instruments(&self) -> Result<Vec<String>, VoltraderError> {
            let mut names: Vec<String> = self.0.keys().cloned().collect();
            names.sort();
            Ok(names)
        }

        fn load(&self, instrument: &str) -> Result<InstrumentData, VoltraderError> {
            self.0
                .get(instrument)
                .cloned()
                .ok_or_else(|| VoltraderError::NoData {
                    instrument: instrument.to_string(),
                })
        }
    }

    fn flat(n: usize) -> Vec<OhlcvBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| OhlcvBar {
                date: start + chrono::Duration::days(i as i64),
                open: 10.0,
                high: 10.0,
                low: 10.0,
                close: 10.0,
                volume: 1000.0,
            })
            .collect()
    }

    fn data(name: &str, market: Option<Market>, n: usize) -> (String, InstrumentData) {
        (
            name.to_string(),
            InstrumentData {
                instrument: name.to_string(),
                market,
                bars: flat(n),
            },
        )
    }

    fn settings() -> RunSettings {
        validate_config(
            &FileConfigAdapter::empty(),
            &StrategyRegistry::with_defaults(),
        )
        .unwrap()
    }

    #[test]
    fn failures_are_isolated_and_order_kept() {
        let port = MapPort(HashMap::from([
            data("A", None, 60),
            data("C", Some(Market::Us), 60),
        ]));
        let names: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let done = AtomicUsize::new(0);
        let outcomes = run_batch(
            &port,
            &names,
            "enhanced_volume",
            &StrategyRegistry::with_defaults(),
            &settings(),
            |_| {
                done.fetch_add(1, Ordering::SeqCst);
            },
        );

        assert_eq!(done.load(Ordering::SeqCst), 3);
        let order: Vec<&str> = outcomes.iter().map(|o| o.instrument.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
        assert!(outcomes[0].is_ok());
        assert!(matches!(outcomes[1].outcome, Err(VoltraderError::NoData { .. })));

        let (a, _) = outcomes[0].outcome.as_ref().unwrap();
        let (c, _) = outcomes[2].outcome.as_ref().unwrap();
        assert_eq!(a.market, Market::Hk);
        assert_eq!(c.market, Market::Us);
        assert_eq!(a.equity_curve.len(), 60);
        assert!(a.trades.is_empty());
    }

    #[test]
    fn unknown_strategy_fails_each_instrument() {
        let port = MapPort(HashMap::from([data("A", None, 10)]));
        let outcomes = run_batch(
            &port,
            &["A".to_string()],
            "nope",
            &StrategyRegistry::with_defaults(),
            &settings(),
            |_| {},
        );
        assert!(outcomes[0]
            .outcome
            .as_ref()
            .is_err_and(VoltraderError::is_configuration));
    }

    #[test]
    fn run_instrument_computes_metrics() {
        let port = MapPort(HashMap::from([data("A", None, 30)]));
        let (result, metrics) = run_instrument(
            &port,
            "A",
            "main_volume",
            &StrategyRegistry::with_defaults(),
            &settings(),
        )
        .unwrap();
        assert_eq!(result.strategy, "main_volume");
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(metrics.final_equity, result.initial_cash);
        assert_eq!(metrics.total_return, 0.0);
    }
}
