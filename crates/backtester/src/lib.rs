//! # Meridian Event-Based Backtester
//!
//! A deterministic replay driver over an ordered sequence of bars. It shares
//! the exact cost model and signal-to-trade mapping used by the live order
//! path, so a backtest reproduces live semantics bar for bar.
//!
//! Two exposure variants (long-only and long/short) compose one shared
//! `BarLedger` state machine with a precomputed signal slice; `run_*` returns
//! a `BacktestResult` value and summarization is a pure function of it.

use crate::error::BacktestError;
use crate::ledger::BarLedger;
use analytics::BacktestSummary;
use core_types::{Bar, CostModel};
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;

pub mod error;
pub mod ledger;

pub use ledger::Fill;

/// Parameters for a single backtest run.
#[derive(Debug, Clone)]
pub struct BacktestParams {
    pub initial_capital: Decimal,
    pub costs: CostModel,
    /// Annualization factor for the summary (365 for always-on markets).
    pub trading_days: u32,
}

/// The complete product of one run: the value series, every fill, and the
/// run parameters needed to summarize it.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    /// One mark-to-market portfolio value per bar.
    pub values: Vec<Decimal>,
    pub fills: Vec<Fill>,
    pub n_trades: u32,
    pub initial_capital: Decimal,
    pub trading_days: u32,
}

impl BacktestResult {
    /// Summary statistics shared across all variants. Pure: derived entirely
    /// from this value, no hidden engine state.
    pub fn summary(&self) -> Result<BacktestSummary, BacktestError> {
        Ok(analytics::summarize_values(
            &self.values,
            self.initial_capital,
            self.trading_days,
            self.n_trades,
        )?)
    }
}

/// Runs the long-only variant: target exposure is 0 or 1 block of units.
///
/// A positive signal buys up to 95% of available cash at the bar's close
/// (at least one unit); anything else liquidates fully.
pub fn run_long_only(
    bars: &[Bar],
    signals: &[i8],
    params: &BacktestParams,
) -> Result<BacktestResult, BacktestError> {
    run_with(bars, signals, params, |ledger, signal, price| {
        if signal > 0 && ledger.position == 0 {
            affordable_units(ledger.cash, price)
        } else if signal <= 0 && ledger.position > 0 {
            -ledger.position
        } else {
            0
        }
    })
}

/// Runs the long/short variant: target exposure is -1, 0, or +1 times a unit
/// block sized once from the first bar. Each bar trades the *difference*
/// between target and current position.
pub fn run_long_short(
    bars: &[Bar],
    signals: &[i8],
    params: &BacktestParams,
) -> Result<BacktestResult, BacktestError> {
    let first_price = bars.first().ok_or(BacktestError::NoData)?.price();
    let unit_size = affordable_units(params.initial_capital, first_price);

    run_with(bars, signals, params, move |ledger, signal, _price| {
        let target = i64::from(signal.signum()) * unit_size;
        target - ledger.position
    })
}

/// `max(1, floor(cash * 0.95 / price))` units.
fn affordable_units(cash: Decimal, price: Decimal) -> i64 {
    if price <= dec!(0) {
        return 1;
    }
    (cash * dec!(0.95) / price)
        .floor()
        .to_i64()
        .unwrap_or(1)
        .max(1)
}

/// The shared bar loop. `trade_units` maps (ledger, signal, close) to the
/// signed unit delta to execute on that bar.
fn run_with<F>(
    bars: &[Bar],
    signals: &[i8],
    params: &BacktestParams,
    mut trade_units: F,
) -> Result<BacktestResult, BacktestError>
where
    F: FnMut(&BarLedger, i8, Decimal) -> i64,
{
    if bars.is_empty() {
        return Err(BacktestError::NoData);
    }
    if params.initial_capital <= dec!(0) {
        return Err(BacktestError::InvalidParameter(
            "initial_capital".to_string(),
            "must be positive".to_string(),
        ));
    }

    let mut ledger = BarLedger::new(params.initial_capital, params.costs);
    let mut values = Vec::with_capacity(bars.len());

    let progress_bar = ProgressBar::new(bars.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .map_err(|e| BacktestError::InvalidParameter("progress".to_string(), e.to_string()))?
            .progress_chars("=>-"),
    );

    for (i, bar) in bars.iter().enumerate() {
        // Signals are precomputed over the full series by the strategy
        // collaborator (already shifted to avoid look-ahead); a short
        // sequence defaults the missing tail to flat.
        let signal = signals.get(i).copied().unwrap_or(0);

        let units = trade_units(&ledger, signal, bar.price());
        if units != 0 {
            ledger.execute_trade(i, bar, units);
        }

        values.push(ledger.portfolio_value(bar.price()));
        progress_bar.inc(1);
    }

    // Force-close any open exposure on the final bar and restate its value.
    if ledger.position != 0 {
        let last = bars.len() - 1;
        ledger.close_position(last, &bars[last]);
        values[last] = ledger.portfolio_value(bars[last].price());
    }

    progress_bar.finish_and_clear();

    Ok(BacktestResult {
        values,
        n_trades: ledger.n_trades,
        fills: ledger.fills().to_vec(),
        initial_capital: params.initial_capital,
        trading_days: params.trading_days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bars(closes: &[Decimal]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| Bar {
                timestamp: start + Duration::days(i as i64),
                open: *close,
                high: *close,
                low: *close,
                close: *close,
                volume: dec!(0),
            })
            .collect()
    }

    fn params(costs: CostModel) -> BacktestParams {
        BacktestParams {
            initial_capital: dec!(100000),
            costs,
            trading_days: 365,
        }
    }

    #[test]
    fn empty_bars_are_rejected() {
        let err = run_long_only(&[], &[], &params(CostModel::free()));
        assert!(matches!(err, Err(BacktestError::NoData)));
    }

    #[test]
    fn values_are_recorded_for_every_bar() {
        let bars = bars(&[dec!(100), dec!(101), dec!(102), dec!(101), dec!(100)]);
        let result = run_long_only(&bars, &[0, 1, 1, 0, 0], &params(CostModel::free())).unwrap();
        assert_eq!(result.values.len(), bars.len());
    }

    #[test]
    fn zero_cost_round_trip_preserves_capital() {
        // Constant price, one full round trip, no transaction costs: the
        // net series must equal the gross series exactly.
        let bars = bars(&[dec!(100), dec!(100), dec!(100), dec!(100)]);
        let result = run_long_only(&bars, &[1, 1, 0, 0], &params(CostModel::free())).unwrap();
        assert_eq!(result.values, vec![dec!(100000); 4]);
        assert_eq!(result.n_trades, 2);
    }

    #[test]
    fn transaction_costs_only_ever_hurt() {
        let closes = [dec!(100), dec!(105), dec!(103), dec!(108), dec!(104)];
        let signals = [1, 1, 0, 1, 0];
        let free = run_long_only(&bars(&closes), &signals, &params(CostModel::free())).unwrap();
        let costly = run_long_only(
            &bars(&closes),
            &signals,
            &params(CostModel::new(dec!(1), dec!(0.002))),
        )
        .unwrap();
        assert!(costly.values.last().unwrap() <= free.values.last().unwrap());
    }

    #[test]
    fn long_only_buys_95_pct_of_cash() {
        let bars = bars(&[dec!(100), dec!(100)]);
        let result = run_long_only(&bars, &[1, 1], &params(CostModel::free())).unwrap();
        // floor(100000 * 0.95 / 100) = 950 units, closed on the final bar.
        assert_eq!(result.fills[0].units, 950);
        assert_eq!(result.n_trades, 2);
    }

    #[test]
    fn long_short_trades_target_deltas() {
        let bars = bars(&[dec!(100), dec!(100), dec!(100), dec!(100), dec!(100)]);
        // Target exposure flips long -> short -> long; each flip is one
        // trade, plus the forced close on the final bar.
        let result =
            run_long_short(&bars, &[1, 1, -1, -1, 1], &params(CostModel::free())).unwrap();
        assert_eq!(result.n_trades, 4);

        // unit_size = floor(100000 * 0.95 / 100) = 950.
        assert_eq!(result.fills[0].units, 950);
        assert_eq!(result.fills[1].units, 1900); // +950 -> -950
        assert_eq!(result.fills[2].units, 1900); // -950 -> +950
        assert_eq!(result.fills[3].units, 950); // forced close
    }

    #[test]
    fn short_exposure_profits_from_falling_prices() {
        let bars = bars(&[dec!(100), dec!(90), dec!(80)]);
        let result = run_long_short(&bars, &[-1, -1, -1], &params(CostModel::free())).unwrap();
        // 950 units short from 100 down to 80: +19000.
        assert_eq!(*result.values.last().unwrap(), dec!(119000));
    }

    #[test]
    fn missing_signals_default_to_flat() {
        let bars = bars(&[dec!(100), dec!(100), dec!(100), dec!(100)]);
        let result = run_long_only(&bars, &[1], &params(CostModel::free())).unwrap();
        // Bought on bar 0, flattened on bar 1 when the signal ran out.
        assert_eq!(result.n_trades, 2);
        assert_eq!(result.fills[1].bar, 1);
    }

    #[test]
    fn summary_is_a_pure_function_of_the_result() {
        let bars = bars(&[dec!(100), dec!(110), dec!(121)]);
        let result = run_long_only(&bars, &[1, 1, 1], &params(CostModel::free())).unwrap();
        let a = result.summary().unwrap();
        let b = result.summary().unwrap();
        assert_eq!(a, b);
        assert!(a.total_return > dec!(0));
        assert_eq!(a.n_bars, 3);
    }
}
