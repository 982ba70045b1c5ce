//! Intraday decision engine.
//!
//! Driven one (instrument, price, tick) at a time:
//! 1. Push the price into the instrument's signal window (stop while cold)
//! 2. Entry: price below the moving average -> buy and open a call/put hedge pair
//! 3. Profit exit: price above the average and the cost basis margin -> sell at the sell limit
//! 4. Risk exit (checkpoint ticks only): price well below the average -> sell at the raw price
//! 5. Option sweep (checkpoint ticks only): pay out every exercisable hedge
//!
//! Later rules see the effects of earlier rules within the same tick.

use std::collections::HashMap;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::data::OptionType;
use crate::portfolio::{OptionContract, Portfolio, PortfolioSnapshot};
use crate::pricing::BlackScholes;
use crate::signal::SignalBook;

use super::settlement::{settle_portfolio, SettlementReport};
use super::slippage::LimitSlippage;
use super::trade::{ExitReason, TickReport, TradeAction, TradeEvent};

#[derive(Error, Debug, PartialEq)]
pub enum EngineError {
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("Session already settled")]
    SessionSettled,

    #[error("Missing final price for {0}")]
    MissingFinalPrice(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Protective option pair opened with every entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HedgeConfig {
    /// Open hedges at all.
    pub enabled: bool,
    /// Call strike as a multiple of spot (1.05 = 5% out of the money).
    pub call_strike_mult: f64,
    /// Put strike as a multiple of spot.
    pub put_strike_mult: f64,
    /// Time to maturity, in the rate's time unit.
    pub maturity: f64,
    /// Risk-free rate.
    pub rate: f64,
    /// Volatility fed to the pricing model.
    pub volatility: f64,
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            call_strike_mult: 1.05,
            put_strike_mult: 0.95,
            maturity: 0.1,
            rate: 0.01,
            volatility: 0.20,
        }
    }
}

/// Strategy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Samples in the moving average.
    pub window_size: usize,

    /// Limit offset as a fraction (0.01 = 1%).
    pub slippage_pct: f64,

    /// Profit exits require price above avg cost by this fraction.
    pub profit_margin_pct: f64,

    /// Risk exits fire when price is this fraction below the average.
    pub risk_drop_pct: f64,

    /// Risk exits and option sweeps run when `tick % checkpoint_interval == 0`.
    pub checkpoint_interval: u32,

    /// Hedge pair parameters.
    pub hedge: HedgeConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            slippage_pct: 0.01,
            profit_margin_pct: 0.01,
            risk_drop_pct: 0.03,
            checkpoint_interval: 2,
            hedge: HedgeConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: &str| Err(EngineError::InvalidConfig(msg.to_string()));

        if self.window_size == 0 {
            return invalid("window_size must be positive");
        }
        if self.checkpoint_interval == 0 {
            return invalid("checkpoint_interval must be positive");
        }
        if !(0.0..1.0).contains(&self.slippage_pct) {
            return invalid("slippage_pct must be in [0, 1)");
        }
        if !self.profit_margin_pct.is_finite() || self.profit_margin_pct < 0.0 {
            return invalid("profit_margin_pct must be non-negative");
        }
        if !(0.0..1.0).contains(&self.risk_drop_pct) {
            return invalid("risk_drop_pct must be in [0, 1)");
        }

        let hedge = &self.hedge;
        if !(hedge.maturity.is_finite() && hedge.maturity > 0.0) {
            return invalid("hedge.maturity must be positive");
        }
        if !(hedge.volatility.is_finite() && hedge.volatility >= 0.0) {
            return invalid("hedge.volatility must be non-negative");
        }
        if !hedge.rate.is_finite() {
            return invalid("hedge.rate must be finite");
        }
        if !(hedge.call_strike_mult.is_finite() && hedge.call_strike_mult > 0.0)
            || !(hedge.put_strike_mult.is_finite() && hedge.put_strike_mult > 0.0)
        {
            return invalid("hedge strike multipliers must be positive");
        }
        Ok(())
    }
}

fn to_decimal(value: f64, name: &str) -> Result<Decimal, EngineError> {
    Decimal::from_f64(value)
        .ok_or_else(|| {
            EngineError::InvalidConfig(format!("{} is not representable", name))
        })
}

/// The decision and settlement state machine for one session.
pub struct IntradayEngine {
    config: EngineConfig,
    slippage: LimitSlippage,
    profit_threshold: Decimal,
    drop_threshold: Decimal,
    call_strike_mult: Decimal,
    put_strike_mult: Decimal,
    pricer: BlackScholes,
    signals: SignalBook,
    portfolio: Portfolio,
    settled: bool,
}

impl IntradayEngine {
    /// Create an engine for a fixed instrument set.
    pub fn new(
        config: EngineConfig,
        initial_cash: Decimal,
        symbols: &[String],
    ) -> Result<Self, EngineError> {
        config.validate()?;
        if symbols.is_empty() {
            return Err(EngineError::InvalidConfig(
                "at least one instrument is required".to_string(),
            ));
        }

        let slippage = LimitSlippage::new(to_decimal(config.slippage_pct, "slippage_pct")?);
        let profit_threshold =
            Decimal::ONE + to_decimal(config.profit_margin_pct, "profit_margin_pct")?;
        let drop_threshold = Decimal::ONE - to_decimal(config.risk_drop_pct, "risk_drop_pct")?;
        let call_strike_mult = to_decimal(config.hedge.call_strike_mult, "call_strike_mult")?;
        let put_strike_mult = to_decimal(config.hedge.put_strike_mult, "put_strike_mult")?;

        Ok(Self {
            pricer: BlackScholes::new(config.hedge.rate),
            signals: SignalBook::new(config.window_size),
            portfolio: Portfolio::new(initial_cash, symbols),
            config,
            slippage,
            profit_threshold,
            drop_threshold,
            call_strike_mult,
            put_strike_mult,
            settled: false,
        })
    }

    pub fn cash(&self) -> Decimal {
        self.portfolio.cash()
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// Read-only view for reporting.
    pub fn snapshot(&self) -> PortfolioSnapshot {
        self.portfolio.snapshot()
    }

    /// Current moving average for an instrument, `None` while cold.
    pub fn moving_average(&self, symbol: &str) -> Option<Decimal> {
        self.signals.average(symbol)
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Whether risk exits and option sweeps run on this tick.
    pub fn is_checkpoint(&self, tick: u32) -> bool {
        tick % self.config.checkpoint_interval == 0
    }

    /// Process one price observation.
    ///
    /// `price` must be positive and rounded to cents; ticks arrive in
    /// increasing order.
    pub fn on_tick(
        &mut self,
        symbol: &str,
        price: Decimal,
        tick: u32,
    ) -> Result<TickReport, EngineError> {
        if self.settled {
            return Err(EngineError::SessionSettled);
        }
        if !self.portfolio.contains(symbol) {
            return Err(EngineError::UnknownInstrument(symbol.to_string()));
        }
        debug_assert!(price > Decimal::ZERO, "prices must be positive");

        self.signals.push(symbol, price);

        let mut report = TickReport {
            symbol: symbol.to_string(),
            tick,
            price,
            sma: None,
            events: Vec::new(),
        };

        let Some(sma) = self.signals.average(symbol) else {
            debug!(symbol, tick, "signal window not warm");
            return Ok(report);
        };
        report.sma = Some(sma);

        self.try_enter(symbol, price, sma, tick, &mut report.events);
        self.try_profit_exit(symbol, price, sma, tick, &mut report.events);

        if self.is_checkpoint(tick) {
            self.try_risk_exit(symbol, price, sma, tick, &mut report.events);
            self.sweep_hedges(symbol, price, tick, &mut report.events);
        }

        Ok(report)
    }

    /// Liquidate everything at the final prices. One-shot.
    pub fn settle(
        &mut self,
        final_prices: &HashMap<String, Decimal>,
    ) -> Result<SettlementReport, EngineError> {
        if self.settled {
            return Err(EngineError::SessionSettled);
        }
        let report = settle_portfolio(&mut self.portfolio, final_prices)?;
        self.settled = true;
        Ok(report)
    }

    fn record(&self, tick: u32, events: &mut Vec<TradeEvent>, event: TradeEvent) {
        info!(tick, "{}", event);
        events.push(event);
    }

    /// Buy below the moving average, sized from the current cash split
    /// evenly across instruments.
    fn try_enter(
        &mut self,
        symbol: &str,
        price: Decimal,
        sma: Decimal,
        tick: u32,
        events: &mut Vec<TradeEvent>,
    ) {
        let buy_limit = self.slippage.buy_limit(price);
        if price >= sma || !self.portfolio.can_afford(buy_limit) {
            return;
        }

        let instruments = Decimal::from(self.portfolio.instrument_count() as u64);
        let qty = (self.portfolio.cash() / buy_limit / instruments)
            .floor()
            .to_u64()
            .unwrap_or(0);
        if qty == 0 {
            debug!(symbol, tick, "entry sized to zero shares");
            return;
        }

        let cost = Decimal::from(qty) * buy_limit;
        if !self.portfolio.try_debit(cost) {
            return;
        }
        if let Some(position) = self.portfolio.position_mut(symbol) {
            position.open_or_add(qty, buy_limit);
        }
        self.record(
            tick,
            events,
            TradeEvent::new(
                symbol,
                TradeAction::Buy {
                    qty,
                    price: buy_limit,
                },
            ),
        );

        if self.config.hedge.enabled {
            self.open_hedges(symbol, price, tick, events);
        }
    }

    /// Open the call then the put, each only if its premium is affordable
    /// at that moment.
    fn open_hedges(
        &mut self,
        symbol: &str,
        spot: Decimal,
        tick: u32,
        events: &mut Vec<TradeEvent>,
    ) {
        let legs = [
            (OptionType::Call, self.call_strike_mult),
            (OptionType::Put, self.put_strike_mult),
        ];

        for (option_type, mult) in legs {
            let strike = spot * mult;
            let Some(premium) = self.quote_premium(option_type, spot, strike) else {
                debug!(symbol, tick, %strike, "{} premium not representable", option_type);
                continue;
            };
            if !self.portfolio.try_debit(premium) {
                debug!(
                    symbol,
                    tick,
                    %premium,
                    cash = %self.portfolio.cash(),
                    "{} hedge skipped, premium not covered",
                    option_type
                );
                continue;
            }

            let contract = OptionContract {
                option_type,
                strike,
                premium,
                time_to_maturity: self.config.hedge.maturity,
            };
            if let Some(position) = self.portfolio.position_mut(symbol) {
                position.add_option(contract.clone());
            }
            self.record(
                tick,
                events,
                TradeEvent::new(symbol, TradeAction::OptionOpened { contract }),
            );
        }
    }

    /// Premium for one hedge leg, `None` when the model output is unusable.
    pub fn quote_premium(
        &self,
        option_type: OptionType,
        spot: Decimal,
        strike: Decimal,
    ) -> Option<Decimal> {
        let spot = spot.to_f64()?;
        let strike = strike.to_f64()?;
        let hedge = &self.config.hedge;
        let value = self
            .pricer
            .price(spot, strike, hedge.maturity, hedge.volatility, option_type);
        if !value.is_finite() {
            return None;
        }
        Decimal::from_f64(value.max(0.0))
    }

    fn try_profit_exit(
        &mut self,
        symbol: &str,
        price: Decimal,
        sma: Decimal,
        tick: u32,
        events: &mut Vec<TradeEvent>,
    ) {
        let sell_limit = self.slippage.sell_limit(price);
        let threshold = self.profit_threshold;
        let Some(position) = self.portfolio.position_mut(symbol) else {
            return;
        };
        if price <= sma || !position.has_shares() || price <= position.avg_cost * threshold {
            return;
        }

        let qty = position.close_all();
        self.portfolio.credit(Decimal::from(qty) * sell_limit);
        self.record(
            tick,
            events,
            TradeEvent::new(
                symbol,
                TradeAction::Sell {
                    qty,
                    price: sell_limit,
                    reason: ExitReason::ProfitTarget,
                },
            ),
        );
    }

    /// Checkpoint-only liquidation at the raw price when the price has
    /// dropped well below the average. Sees the state left by the profit exit.
    fn try_risk_exit(
        &mut self,
        symbol: &str,
        price: Decimal,
        sma: Decimal,
        tick: u32,
        events: &mut Vec<TradeEvent>,
    ) {
        let floor = sma * self.drop_threshold;
        let Some(position) = self.portfolio.position_mut(symbol) else {
            return;
        };
        if !position.has_shares() || price >= floor {
            return;
        }

        let qty = position.close_all();
        self.portfolio.credit(Decimal::from(qty) * price);
        self.record(
            tick,
            events,
            TradeEvent::new(
                symbol,
                TradeAction::Sell {
                    qty,
                    price,
                    reason: ExitReason::DropForecast,
                },
            ),
        );
    }

    fn sweep_hedges(
        &mut self,
        symbol: &str,
        price: Decimal,
        tick: u32,
        events: &mut Vec<TradeEvent>,
    ) {
        let exercised = match self.portfolio.position_mut(symbol) {
            Some(position) => position.sweep_options(price),
            None => return,
        };

        for option in exercised {
            self.portfolio.credit(option.payout);
            self.record(
                tick,
                events,
                TradeEvent::new(
                    symbol,
                    TradeAction::OptionExercised {
                        contract: option.contract,
                        payout: option.payout,
                        at_settlement: false,
                    },
                ),
            );
        }
    }
}
