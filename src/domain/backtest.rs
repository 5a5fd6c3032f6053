//! Backtest engine and event loop.
//!
//! One run drives a single instrument bar by bar:
//!
//! AwaitingBar → EvaluateSignal → MaybeSubmitOrder → SettleFill → AwaitingBar
//!
//! Indicators update on every bar. The strategy is consulted only while no
//! order is pending; accepted orders fill on the bar they were submitted on, at
//! close plus slippage for buys and close minus slippage for sells. Orders are
//! sized at that fill price so the cash check covers what is actually paid.

use std::fmt;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::account::{Account, EquityPoint};
use super::commission::{CommissionModel, FeeSchedule};
use super::error::VoltraderError;
use super::indicator::{IndicatorConfig, VolumeSignalEngine};
use super::market::Market;
use super::ohlcv::{validate_bars, OhlcvBar};
use super::position::{ClosedTrade, Position, RoundTripTracker};
use super::signal::{Signal, SignalKind};
use super::sizing::{OrderInstruction, PositionSizer, SizingConfig, SizingDecision};
use super::strategy::{OrderIntent, Strategy};
use super::trade::{Trade, TradeAction, TradeStatus};

/// Runs shorter than this are flagged; main signals cannot fire in them.
pub const MIN_BARS: usize = 50;

pub const DEFAULT_INITIAL_CASH: f64 = 5_000_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_cash: f64,
    pub market: Market,
    /// Fixed price offset: added to buys, subtracted from sells.
    pub slippage: f64,
    pub sizing: SizingConfig,
    pub indicator: IndicatorConfig,
    pub fees: FeeSchedule,
}

impl BacktestConfig {
    pub fn for_market(market: Market) -> Self {
        BacktestConfig {
            initial_cash: DEFAULT_INITIAL_CASH,
            market,
            slippage: 0.0,
            sizing: SizingConfig::default(),
            indicator: IndicatorConfig::default(),
            fees: FeeSchedule::for_market(market),
        }
    }

    /// Same settings under another market's built-in fee schedule.
    pub fn with_market(&self, market: Market) -> Self {
        BacktestConfig {
            market,
            fees: FeeSchedule::for_market(market),
            ..self.clone()
        }
    }
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig::for_market(Market::Hk)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataWarning {
    InsufficientData { bars: usize, minimum: usize },
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataWarning::InsufficientData { bars, minimum } => write!(
                f,
                "only {bars} bars, at least {minimum} needed for main signals"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunCounters {
    /// Buy intents the strategy acted on, accepted or not.
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub executed_buys: usize,
    pub executed_sells: usize,
    pub rejected_orders: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub instrument: String,
    pub strategy: String,
    pub market: Market,
    pub initial_cash: f64,
    pub final_cash: f64,
    pub final_position: Position,
    pub bars: usize,
    pub signals: Vec<Signal>,
    pub trades: Vec<Trade>,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
    pub counters: RunCounters,
    pub warnings: Vec<DataWarning>,
}

impl BacktestResult {
    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.initial_cash)
    }

    pub fn signal_count(&self, kind: SignalKind) -> usize {
        self.signals.iter().filter(|s| s.kind == kind).count()
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.equity_curve.first().map(|p| p.date)
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.equity_curve.last().map(|p| p.date)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PendingOrder {
    instruction: OrderInstruction,
    signal: SignalKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LoopState {
    AwaitingBar,
    EvaluateSignal,
    MaybeSubmitOrder(OrderIntent),
    SettleFill,
}

struct BacktestLoop<'a> {
    instrument: &'a str,
    strategy: &'a mut dyn Strategy,
    engine: VolumeSignalEngine,
    sizer: PositionSizer,
    slippage: f64,
    account: Account,
    pending: Option<PendingOrder>,
    round_trips: RoundTripTracker,
    signals: Vec<Signal>,
    trades: Vec<Trade>,
    closed_trades: Vec<ClosedTrade>,
    counters: RunCounters,
}

impl<'a> BacktestLoop<'a> {
    fn new(instrument: &'a str, strategy: &'a mut dyn Strategy, config: &BacktestConfig) -> Self {
        BacktestLoop {
            instrument,
            strategy,
            engine: VolumeSignalEngine::new(config.indicator),
            sizer: PositionSizer::new(
                config.sizing.clone(),
                CommissionModel::with_schedule(config.market, config.fees),
            ),
            slippage: config.slippage,
            account: Account::new(config.initial_cash),
            pending: None,
            round_trips: RoundTripTracker::default(),
            signals: Vec::new(),
            trades: Vec::new(),
            closed_trades: Vec::new(),
            counters: RunCounters::default(),
        }
    }

    fn on_bar(&mut self, bar: &OhlcvBar) {
        let evaluation = self.engine.update(bar);
        for signal in &evaluation.signals {
            info!(
                instrument = self.instrument,
                date = %signal.date,
                kind = %signal.kind,
                price = signal.price,
                "signal"
            );
        }
        self.signals.extend(evaluation.signals.iter().cloned());

        let mut state = LoopState::EvaluateSignal;
        loop {
            state = match state {
                LoopState::EvaluateSignal => {
                    if self.pending.is_some() {
                        LoopState::SettleFill
                    } else {
                        match self.strategy.evaluate(bar, &evaluation) {
                            Some(intent) => LoopState::MaybeSubmitOrder(intent),
                            None => LoopState::AwaitingBar,
                        }
                    }
                }
                LoopState::MaybeSubmitOrder(intent) => {
                    self.submit(bar, intent);
                    if self.pending.is_some() {
                        LoopState::SettleFill
                    } else {
                        LoopState::AwaitingBar
                    }
                }
                LoopState::SettleFill => {
                    self.settle(bar);
                    LoopState::AwaitingBar
                }
                LoopState::AwaitingBar => break,
            };
        }

        self.account.record_equity(bar.date, bar.close);
    }

    fn fill_price(&self, bar: &OhlcvBar, action: TradeAction) -> f64 {
        match action {
            TradeAction::Buy => bar.close + self.slippage,
            TradeAction::Sell => bar.close - self.slippage,
        }
    }

    fn submit(&mut self, bar: &OhlcvBar, intent: OrderIntent) {
        let price = self.fill_price(bar, intent.action);
        let inputs = self.account.sizing_inputs(bar.close);

        let decision = match intent.action {
            TradeAction::Buy => {
                self.counters.buy_signals += 1;
                self.sizer.size_buy(&inputs, price)
            }
            TradeAction::Sell => {
                self.counters.sell_signals += 1;
                self.sizer.size_sell(&inputs, price)
            }
        };

        match decision {
            SizingDecision::Accepted(instruction) => {
                info!(
                    instrument = self.instrument,
                    date = %bar.date,
                    action = %instruction.action,
                    size = instruction.size,
                    price = instruction.price,
                    cash = inputs.cash,
                    equity = inputs.equity,
                    position = inputs.position,
                    "order accepted"
                );
                debug!(
                    instrument = self.instrument,
                    currency = self.sizer.commission.market.currency(),
                    "fee preview: {}",
                    instruction.fee_preview
                );
                self.pending = Some(PendingOrder {
                    instruction,
                    signal: intent.signal,
                });
            }
            SizingDecision::Rejected(reason) => {
                self.counters.rejected_orders += 1;
                info!(
                    instrument = self.instrument,
                    date = %bar.date,
                    action = %intent.action,
                    signal = %intent.signal,
                    cash = inputs.cash,
                    equity = inputs.equity,
                    position = inputs.position,
                    "order rejected: {reason}"
                );
            }
        }
    }

    fn settle(&mut self, bar: &OhlcvBar) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let order = pending.instruction;

        let trade = Trade {
            trade_id: self.trades.len() as u64 + 1,
            date: bar.date,
            action: order.action,
            price: order.price,
            size: order.size,
            total_amount: order.size as f64 * order.price,
            commission: order.fee_preview.total,
            status: TradeStatus::Completed,
        };

        self.account.apply_fill(&trade);
        match trade.action {
            TradeAction::Buy => self.counters.executed_buys += 1,
            TradeAction::Sell => self.counters.executed_sells += 1,
        }
        info!(
            instrument = self.instrument,
            date = %trade.date,
            action = %trade.action,
            size = trade.size,
            price = trade.price,
            commission = trade.commission,
            signal = %pending.signal,
            cash = self.account.cash,
            position = self.account.position.size,
            "filled"
        );

        if let Some(closed) = self.round_trips.on_fill(&trade, &self.account.position) {
            debug!(
                instrument = self.instrument,
                pnl = closed.pnl,
                "round trip closed"
            );
            self.closed_trades.push(closed);
        }
        self.trades.push(trade);
    }
}

/// Run `strategy` over `bars` for one instrument.
pub fn run_backtest(
    instrument: &str,
    bars: &[OhlcvBar],
    strategy: &mut dyn Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, VoltraderError> {
    validate_bars(instrument, bars)?;

    let strategy_name = strategy.name().to_string();
    info!(
        instrument,
        strategy = %strategy_name,
        market = %config.market,
        bars = bars.len(),
        initial_cash = config.initial_cash,
        "backtest start"
    );

    let mut warnings = Vec::new();
    if bars.len() < MIN_BARS {
        let warning = DataWarning::InsufficientData {
            bars: bars.len(),
            minimum: MIN_BARS,
        };
        warn!(instrument, "{warning}");
        warnings.push(warning);
    }

    let mut run = BacktestLoop::new(instrument, strategy, config);
    for bar in bars {
        run.on_bar(bar);
    }

    let result = BacktestResult {
        instrument: instrument.to_string(),
        strategy: strategy_name,
        market: config.market,
        initial_cash: config.initial_cash,
        final_cash: run.account.cash,
        final_position: run.account.position,
        bars: bars.len(),
        signals: run.signals,
        trades: run.trades,
        closed_trades: run.closed_trades,
        equity_curve: run.account.equity_curve,
        counters: run.counters,
        warnings,
    };

    info!(
        instrument,
        signals = result.signals.len(),
        trades = result.trades.len(),
        final_equity = result.final_equity(),
        "backtest end"
    );
    Ok(result)
}
