//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::BacktestResult;
use crate::domain::batch::{run_batch, run_instrument, InstrumentOutcome};
use crate::domain::commission::{CommissionBreakdown, FeeSchedule};
use crate::domain::config_validation::{validate_config, RunSettings};
use crate::domain::error::VoltraderError;
use crate::domain::market::Market;
use crate::domain::metrics::Metrics;
use crate::domain::signal::SignalKind;
use crate::domain::strategy::StrategyRegistry;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "voltrader", about = "Volume-signal backtester for HK, CN and US equities")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest one instrument from a CSV bar file
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        strategy: Option<String>,
    },
    /// Backtest every CSV file in a directory, in parallel
    Batch {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        strategy: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List registered strategies
    Strategies,
    /// Preview the fees for one order
    Fees {
        #[arg(short, long)]
        market: String,
        #[arg(long, allow_hyphen_values = true)]
        size: i64,
        #[arg(short, long)]
        price: f64,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let registry = StrategyRegistry::with_defaults();
    let outcome = match cli.command {
        Command::Backtest {
            config,
            file,
            output,
            strategy,
        } => run_backtest(&config, &file, output.as_deref(), strategy.as_deref(), &registry),
        Command::Batch {
            config,
            data_dir,
            output,
            strategy,
        } => run_batch_command(
            &config,
            data_dir.as_deref(),
            output.as_deref(),
            strategy.as_deref(),
            &registry,
        ),
        Command::Validate { config } => run_validate(&config, &registry),
        Command::Strategies => {
            for name in registry.names() {
                println!("{name}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Fees {
            market,
            size,
            price,
            config,
        } => run_fees(&market, size, price, config.as_deref()),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Loads and validates the config, applying a strategy override if given.
pub fn load_settings(
    config_path: &Path,
    strategy: Option<&str>,
    registry: &StrategyRegistry,
) -> Result<RunSettings, VoltraderError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let settings = validate_config(&adapter, registry)?;
    match strategy {
        Some(name) => settings.with_strategy(name, registry),
        None => Ok(settings),
    }
}

/// Runs one bar file and writes its report; returns the report directory.
pub fn backtest_file(
    settings: &RunSettings,
    file: &Path,
    output_dir: &Path,
    registry: &StrategyRegistry,
    reporter: &dyn ReportPort,
) -> Result<(BacktestResult, Metrics, PathBuf), VoltraderError> {
    let (port, instrument) = CsvAdapter::for_file(file)?;
    let (result, metrics) =
        run_instrument(&port, &instrument, &settings.strategy, registry, settings)?;
    let dir = reporter.write(&result, &metrics, output_dir)?;
    Ok((result, metrics, dir))
}

fn run_backtest(
    config_path: &Path,
    file: &Path,
    output: Option<&Path>,
    strategy: Option<&str>,
    registry: &StrategyRegistry,
) -> Result<ExitCode, VoltraderError> {
    let settings = load_settings(config_path, strategy, registry)?;
    let output_dir = output.unwrap_or(settings.output_dir.as_path()).to_path_buf();

    eprintln!("Running {} on {}", settings.strategy, file.display());
    let (result, metrics, dir) =
        backtest_file(&settings, file, &output_dir, registry, &CsvReportAdapter::new())?;

    print_summary(&result, &metrics);
    println!("\nReport written to: {}", dir.display());
    Ok(ExitCode::SUCCESS)
}

fn run_batch_command(
    config_path: &Path,
    data_dir: Option<&Path>,
    output: Option<&Path>,
    strategy: Option<&str>,
    registry: &StrategyRegistry,
) -> Result<ExitCode, VoltraderError> {
    let settings = load_settings(config_path, strategy, registry)?;
    let data_dir = data_dir
        .map(Path::to_path_buf)
        .or_else(|| settings.data_dir.clone())
        .ok_or_else(|| VoltraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: "data_dir".to_string(),
        })?;
    let output_dir = output.unwrap_or(settings.output_dir.as_path()).to_path_buf();

    let port = CsvAdapter::new(data_dir.clone());
    let instruments = port.list_instruments()?;
    if instruments.is_empty() {
        eprintln!("No CSV files found in {}", data_dir.display());
        return Ok(ExitCode::SUCCESS);
    }
    eprintln!(
        "Running {} on {} instruments from {}",
        settings.strategy,
        instruments.len(),
        data_dir.display()
    );

    let outcomes = run_batch(
        &port,
        &instruments,
        &settings.strategy,
        registry,
        &settings,
        |outcome| match &outcome.outcome {
            Ok((_, metrics)) => eprintln!(
                "  {}: done, return {:.2}%",
                outcome.instrument,
                metrics.total_return * 100.0
            ),
            Err(e) => eprintln!("  {}: failed ({e})", outcome.instrument),
        },
    );

    Ok(write_batch_reports(
        &outcomes,
        &output_dir,
        &CsvReportAdapter::new(),
    ))
}

/// Writes a report for every successful instrument and prints the table.
/// A failed write is reported like a failed run. Exit code comes from the
/// first failure, if any.
fn write_batch_reports(
    outcomes: &[InstrumentOutcome],
    output_dir: &Path,
    reporter: &dyn ReportPort,
) -> ExitCode {
    let mut first_failure: Option<ExitCode> = None;
    let mut written = 0usize;

    println!(
        "\n{:<16} {:>10} {:>10} {:>8} {:>8}",
        "Instrument", "Return %", "MaxDD %", "Signals", "Trades"
    );
    for outcome in outcomes {
        let failure = match &outcome.outcome {
            Ok((result, metrics)) => match reporter.write(result, metrics, output_dir) {
                Ok(_) => {
                    written += 1;
                    println!(
                        "{:<16} {:>10.2} {:>10.2} {:>8} {:>8}",
                        outcome.instrument,
                        metrics.total_return * 100.0,
                        metrics.max_drawdown * 100.0,
                        metrics.signal_counts.total(),
                        result.trades.len()
                    );
                    None
                }
                Err(e) => {
                    error!(instrument = %outcome.instrument, error = %e, "report write failed");
                    println!("{:<16} REPORT FAILED: {e}", outcome.instrument);
                    Some(ExitCode::from(&e))
                }
            },
            Err(e) => {
                println!("{:<16} FAILED: {e}", outcome.instrument);
                Some(ExitCode::from(e))
            }
        };
        if first_failure.is_none() {
            first_failure = failure;
        }
    }

    info!(
        written,
        failed = outcomes.len() - written,
        output = %output_dir.display(),
        "batch reports written"
    );
    first_failure.unwrap_or(ExitCode::SUCCESS)
}

fn run_validate(config_path: &Path, registry: &StrategyRegistry) -> Result<ExitCode, VoltraderError> {
    let settings = load_settings(config_path, None, registry)?;
    let bt = &settings.backtest;
    println!("Configuration is valid.");
    println!("  Market:         {} ({})", bt.market, bt.market.currency());
    println!("  Initial cash:   {:.2}", bt.initial_cash);
    println!("  Slippage:       {}", bt.slippage);
    println!("  Strategy:       {}", settings.strategy);
    println!("  Lot size:       {}", bt.sizing.min_order_size);
    println!(
        "  Limits:         portfolio {:.0}%, buy {:.0}%, sell {:.0}%",
        bt.sizing.max_portfolio_percent * 100.0,
        bt.sizing.max_single_buy_percent * 100.0,
        bt.sizing.max_single_sell_percent * 100.0
    );
    println!("  RSI filter:     {}", bt.indicator.rsi_filter);
    println!("  Output dir:     {}", settings.output_dir.display());
    if let Some(dir) = &settings.data_dir {
        println!("  Data dir:       {}", dir.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn run_fees(
    market: &str,
    size: i64,
    price: f64,
    config_path: Option<&Path>,
) -> Result<ExitCode, VoltraderError> {
    let market: Market = market.parse()?;
    let schedule = match config_path {
        Some(path) => FeeSchedule::from_config(market, &FileConfigAdapter::from_file(path)?)?,
        None => FeeSchedule::for_market(market),
    };
    let breakdown = schedule.estimate(size, price);
    print_breakdown(market, size, price, &breakdown);
    Ok(ExitCode::SUCCESS)
}

fn print_breakdown(market: Market, size: i64, price: f64, b: &CommissionBreakdown) {
    println!(
        "{market} order: {size} @ {price} (notional {:.2} {})",
        size.unsigned_abs() as f64 * price,
        market.currency()
    );
    println!("  Commission:       {:.2}", b.commission);
    println!("  Stamp duty:       {:.2}", b.stamp_duty);
    println!("  Transaction levy: {:.2}", b.transaction_levy);
    println!("  Transaction fee:  {:.2}", b.transaction_fee);
    println!("  Settlement fee:   {:.2}", b.settlement_fee);
    println!("  System fee:       {:.2}", b.fixed_system_fee);
    println!("  Total:            {:.2}", b.total);
}

pub fn print_summary(result: &BacktestResult, metrics: &Metrics) {
    println!("\n=== {} ({}, {}) ===", result.instrument, result.market, result.strategy);
    if let (Some(start), Some(end)) = (result.start_date(), result.end_date()) {
        println!("Period:           {start} to {end} ({} bars)", result.bars);
    }
    for warning in &result.warnings {
        println!("Warning:          {warning}");
    }
    println!("Initial Cash:     {:.2}", result.initial_cash);
    println!("Final Equity:     {:.2}", metrics.final_equity);
    println!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    println!("Annualized:       {:.2}%", metrics.annualized_return * 100.0);
    println!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    println!("Max Drawdown:     -{:.2}%", metrics.max_drawdown * 100.0);
    println!("Round Trips:      {}", metrics.round_trips.total());
    println!("Win Rate:         {:.2}%", metrics.round_trips.win_rate * 100.0);
    println!("Profit Factor:    {:.2}", metrics.round_trips.profit_factor);
    println!("Commission Paid:  {:.2}", metrics.total_commission);

    println!("\nSignals:");
    for kind in SignalKind::ALL {
        println!("  {:<12} {}", kind.as_str(), metrics.signal_counts.get(kind));
    }
    println!(
        "Acted on:         {} buy, {} sell",
        metrics.buy_signals_acted, metrics.sell_signals_acted
    );
    println!(
        "Executed:         {} buys, {} sells",
        metrics.executed_buys, metrics.executed_sells
    );
}
