use crate::error::AnalyticsError;
use crate::metrics::{annualize_return, log_returns, max_drawdown, mean, population_std};
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

/// The shared summary produced for every event-based backtest variant.
///
/// This is a plain value: it is computed once from a finished run and never
/// depends on hidden engine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub initial_capital: Decimal,
    pub final_value: Decimal,
    pub total_return: Decimal,
    pub annualized_return: Decimal,
    pub annualized_volatility: Decimal,
    /// Zero when volatility is zero.
    pub sharpe_ratio: Decimal,
    /// Peak-to-trough decline of the value series; non-positive.
    pub max_drawdown: Decimal,
    pub n_trades: u32,
    pub n_bars: usize,
}

/// Summarizes a bar-by-bar portfolio value series.
///
/// # Arguments
///
/// * `values` - One mark-to-market portfolio value per bar, in order.
/// * `initial_capital` - Starting capital of the run.
/// * `trading_days` - Annualization factor.
/// * `n_trades` - Number of fills executed during the run.
pub fn summarize_values(
    values: &[Decimal],
    initial_capital: Decimal,
    trading_days: u32,
    n_trades: u32,
) -> Result<BacktestSummary, AnalyticsError> {
    if values.is_empty() {
        return Err(AnalyticsError::NotEnoughData(
            "portfolio value series is empty".to_string(),
        ));
    }
    if initial_capital <= Decimal::ZERO {
        return Err(AnalyticsError::InvalidParameter(
            "initial_capital".to_string(),
            "must be positive".to_string(),
        ));
    }

    let days = Decimal::from(trading_days);
    let final_value = values[values.len() - 1];
    let total_return = final_value / initial_capital - Decimal::ONE;
    let n_years = Decimal::from(values.len()) / days;
    let annualized_return = annualize_return(total_return, n_years)?;

    let returns = log_returns(values)?;
    let annualized_volatility = if returns.len() > 1 {
        let sqrt_days = days
            .sqrt()
            .ok_or_else(|| AnalyticsError::Calculation("sqrt of trading_days".to_string()))?;
        population_std(&returns, mean(&returns))? * sqrt_days
    } else {
        Decimal::ZERO
    };

    let sharpe_ratio = if annualized_volatility > Decimal::ZERO {
        annualized_return / annualized_volatility
    } else {
        Decimal::ZERO
    };

    Ok(BacktestSummary {
        initial_capital,
        final_value,
        total_return,
        annualized_return,
        annualized_volatility,
        sharpe_ratio,
        max_drawdown: max_drawdown(values),
        n_trades,
        n_bars: values.len(),
    })
}
