//! Integration tests for the backtest pipeline.
//!
//! Tests cover:
//! - Capitulation scenario: a strong buy is acted on and filled
//! - Flat market: no signals, no trades, flat equity
//! - Short histories are flagged but still run
//! - Repeated runs over the same bars are identical
//! - Account invariants over a long choppy series
//! - Batch runs isolate per-instrument failures

mod common;

use approx::assert_relative_eq;
use common::*;
use voltrader::domain::backtest::{run_backtest, BacktestConfig, DataWarning, MIN_BARS};
use voltrader::domain::batch::run_batch;
use voltrader::domain::error::VoltraderError;
use voltrader::domain::market::Market;
use voltrader::domain::metrics::Metrics;
use voltrader::domain::signal::SignalKind;
use voltrader::domain::strategy::{EnhancedVolumeStrategy, MainVolumeStrategy, StrategyRegistry};
use voltrader::domain::trade::TradeAction;

mod scenarios {
    use super::*;

    #[test]
    fn capitulation_strong_buy_is_filled() {
        let bars = capitulation_series();
        let config = BacktestConfig::default();
        let result =
            run_backtest("HK.00700", &bars, &mut EnhancedVolumeStrategy, &config).unwrap();

        let strong: Vec<_> = result
            .signals
            .iter()
            .filter(|s| s.kind == SignalKind::StrongBuy)
            .collect();
        assert!(!strong.is_empty());
        assert_eq!(strong[0].date, date(54));
        assert_eq!(strong[0].description, "strong long");

        let first = &result.trades[0];
        assert_eq!(first.action, TradeAction::Buy);
        assert_eq!(first.date, date(54));
        assert_eq!(first.price, 90.0);
        // 20% of 5,000,000 at 90 is 11,111 shares, floored to the lot
        assert_eq!(first.size, 11_100);
        assert!(first.commission > 0.0);
        assert!(result.counters.buy_signals >= 1);
        assert!(result.counters.executed_buys >= 1);
    }

    #[test]
    fn flat_market_never_trades() {
        let bars = flat_series(80, 25.0, 40_000.0);
        let config = BacktestConfig::default();
        let result = run_backtest("FLAT", &bars, &mut EnhancedVolumeStrategy, &config).unwrap();

        assert!(result.signals.is_empty());
        assert!(result.trades.is_empty());
        assert_eq!(result.equity_curve.len(), 80);
        assert!(result
            .equity_curve
            .iter()
            .all(|p| p.equity == config.initial_cash));

        let metrics = Metrics::compute(&result, 0.0);
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.signal_counts.total(), 0);
        assert_eq!(metrics.round_trips.total(), 0);
    }

    #[test]
    fn short_history_is_flagged() {
        let bars = flat_series(MIN_BARS - 1, 10.0, 1000.0);
        let result = run_backtest(
            "SHORT",
            &bars,
            &mut EnhancedVolumeStrategy,
            &BacktestConfig::default(),
        )
        .unwrap();
        assert_eq!(
            result.warnings,
            vec![DataWarning::InsufficientData {
                bars: MIN_BARS - 1,
                minimum: MIN_BARS,
            }]
        );
        assert_eq!(result.equity_curve.len(), MIN_BARS - 1);
    }

    #[test]
    fn unordered_bars_rejected() {
        let mut bars = flat_series(30, 10.0, 1000.0);
        bars.swap(3, 4);
        let err = run_backtest(
            "BAD",
            &bars,
            &mut EnhancedVolumeStrategy,
            &BacktestConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, VoltraderError::DataIntegrity { .. }));
    }
}

mod invariants {
    use super::*;

    fn check(result: &voltrader::domain::backtest::BacktestResult, lot: i64) {
        let mut cash = result.initial_cash;
        let mut position = 0i64;
        for trade in &result.trades {
            assert_eq!(trade.size % lot, 0, "trade {} not lot aligned", trade.trade_id);
            assert!(trade.size > 0);
            match trade.action {
                TradeAction::Buy => {
                    cash -= trade.total_amount + trade.commission;
                    position += trade.size;
                }
                TradeAction::Sell => {
                    assert!(trade.size <= position, "sold more than held");
                    cash += trade.total_amount - trade.commission;
                    position -= trade.size;
                }
            }
            assert!(cash >= -1e-6, "cash went negative: {cash}");
        }
        assert_eq!(position, result.final_position.size);
        assert_relative_eq!(cash, result.final_cash, epsilon = 1e-6);
        assert_eq!(result.equity_curve.len(), result.bars);
    }

    #[test]
    fn main_strategy_keeps_account_consistent() {
        let bars = choppy_series(400);
        let config = BacktestConfig::default();
        let result = run_backtest("CHOP", &bars, &mut MainVolumeStrategy, &config).unwrap();
        check(&result, config.sizing.min_order_size);
        assert_eq!(
            result.counters.executed_buys + result.counters.executed_sells,
            result.trades.len()
        );
    }

    #[test]
    fn small_account_with_slippage_stays_solvent() {
        let settings = settings_from(
            "[backtest]\ninitial_cash = 20000\nslippage = 0.05\nmarket = CN\n\
             [sizing]\nmax_single_buy_percent = 1.0\nmax_portfolio_percent = 1.0\n",
        );
        let bars = choppy_series(300);
        let result =
            run_backtest("CN.600000", &bars, &mut MainVolumeStrategy, &settings.backtest).unwrap();
        check(&result, 100);
        for trade in &result.trades {
            let close = bars.iter().find(|b| b.date == trade.date).unwrap().close;
            match trade.action {
                TradeAction::Buy => assert_relative_eq!(trade.price, close + 0.05),
                TradeAction::Sell => assert_relative_eq!(trade.price, close - 0.05),
            }
        }
    }

    #[test]
    fn repeated_runs_are_identical() {
        let bars = choppy_series(250);
        let config = BacktestConfig::for_market(Market::Us);
        let a = run_backtest("US.X", &bars, &mut MainVolumeStrategy, &config).unwrap();
        let b = run_backtest("US.X", &bars, &mut MainVolumeStrategy, &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(Metrics::compute(&a, 0.02), Metrics::compute(&b, 0.02));
    }

    #[test]
    fn signals_never_precede_warmup() {
        let bars = choppy_series(120);
        let result =
            run_backtest("W", &bars, &mut MainVolumeStrategy, &BacktestConfig::default()).unwrap();
        for signal in &result.signals {
            assert!(signal.date >= date(20), "signal during warm-up on {}", signal.date);
        }
    }
}

mod batch {
    use super::*;

    #[test]
    fn failing_instrument_does_not_stop_others() {
        let port = MockDataPort::new()
            .with_bars("HK.00700", capitulation_series())
            .with_market_bars("US.AAPL", Some(Market::Us), flat_series(60, 180.0, 5e6))
            .with_error("HK.BROKEN", "negative volume");
        let instruments = port_names(&port);

        let outcomes = run_batch(
            &port,
            &instruments,
            "enhanced_volume",
            &StrategyRegistry::with_defaults(),
            &default_settings(),
            |_| {},
        );

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].instrument, "HK.00700");
        assert_eq!(outcomes[1].instrument, "HK.BROKEN");
        assert_eq!(outcomes[2].instrument, "US.AAPL");

        let (hk, hk_metrics) = outcomes[0].outcome.as_ref().unwrap();
        assert_eq!(hk.market, Market::Hk);
        assert_eq!(hk_metrics.signal_counts.get(SignalKind::StrongBuy), hk.signal_count(SignalKind::StrongBuy));
        assert!(hk_metrics.executed_buys >= 1);

        match &outcomes[1].outcome {
            Err(VoltraderError::DataIntegrity { instrument, .. }) => {
                assert_eq!(instrument, "HK.BROKEN")
            }
            other => panic!("expected integrity error, got {other:?}"),
        }

        let (us, _) = outcomes[2].outcome.as_ref().unwrap();
        assert_eq!(us.market, Market::Us);
        assert!(us.trades.is_empty());
    }

    #[test]
    fn batch_matches_single_runs() {
        let bars = choppy_series(200);
        let port = MockDataPort::new()
            .with_bars("A", bars.clone())
            .with_bars("B", capitulation_series());
        let settings = default_settings();
        let outcomes = run_batch(
            &port,
            &port_names(&port),
            "main_volume",
            &StrategyRegistry::with_defaults(),
            &settings,
            |_| {},
        );
        let single = run_backtest("A", &bars, &mut MainVolumeStrategy, &settings.backtest).unwrap();
        let (batched, _) = outcomes[0].outcome.as_ref().unwrap();
        assert_eq!(batched, &single);
    }

    fn port_names(port: &MockDataPort) -> Vec<String> {
        use voltrader::ports::data_port::DataPort;
        port.list_instruments().unwrap()
    }
}
