use crate::error::AnalyticsError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};

/// Full performance statistics derived from a log-return series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: Decimal,
    pub annualized_return: Decimal,
    pub annualized_volatility: Decimal,
    /// Zero when the return series has no dispersion.
    pub sharpe_ratio: Decimal,
    /// Zero when there is no downside deviation to measure against.
    pub sortino_ratio: Decimal,
    /// Peak-to-trough decline of cumulative wealth; non-positive.
    pub max_drawdown: Decimal,
    /// Historical value-at-risk at the configured confidence level.
    pub var: Decimal,
    /// Expected shortfall beyond the VaR threshold.
    pub cvar: Decimal,
    pub win_rate: Decimal,
    /// `None` when there are no losing observations.
    pub profit_factor: Option<Decimal>,
    /// Kelly fraction implied by the win rate and the win/loss ratio.
    pub kelly_fraction: Decimal,
    pub n_observations: usize,
    pub n_years: Decimal,
}

/// Converts a value series into per-period log returns.
///
/// Fails on non-positive values, which have no defined log return.
pub fn log_returns(values: &[Decimal]) -> Result<Vec<Decimal>, AnalyticsError> {
    values
        .windows(2)
        .map(|w| {
            if w[0] <= Decimal::ZERO || w[1] <= Decimal::ZERO {
                return Err(AnalyticsError::Calculation(
                    "log return undefined for non-positive values".to_string(),
                ));
            }
            (w[1] / w[0]).checked_ln().ok_or_else(|| {
                AnalyticsError::Calculation("log return out of range".to_string())
            })
        })
        .collect()
}

/// Computes the full metric set over a series of per-period log returns.
///
/// # Arguments
///
/// * `returns` - Log returns, one per bar.
/// * `trading_days` - Annualization factor (365 for always-on markets).
/// * `risk_free_rate` - Annualized risk-free rate.
/// * `confidence` - VaR/CVaR tail probability (0.05 for 95%).
pub fn compute_metrics(
    returns: &[Decimal],
    trading_days: u32,
    risk_free_rate: Decimal,
    confidence: Decimal,
) -> Result<PerformanceMetrics, AnalyticsError> {
    if returns.len() < 2 {
        return Err(AnalyticsError::NotEnoughData(format!(
            "need at least 2 returns, got {}",
            returns.len()
        )));
    }
    if confidence <= Decimal::ZERO || confidence >= Decimal::ONE {
        return Err(AnalyticsError::InvalidParameter(
            "confidence".to_string(),
            "must be strictly between 0 and 1".to_string(),
        ));
    }

    let days = Decimal::from(trading_days);
    let sqrt_days = days
        .sqrt()
        .ok_or_else(|| AnalyticsError::Calculation("sqrt of trading_days".to_string()))?;

    // Compounded growth. exp(sum) is strictly positive, so total_return > -1.
    let sum: Decimal = returns.iter().sum();
    let growth = sum
        .checked_exp()
        .ok_or_else(|| AnalyticsError::Calculation("cumulative return overflow".to_string()))?;
    let total_return = growth - Decimal::ONE;

    let n_years = Decimal::from(returns.len()) / days;
    let annualized_return = annualize_return(total_return, n_years)?;

    let mean = mean(returns);
    let std_dev = population_std(returns, mean)?;
    let annualized_volatility = std_dev * sqrt_days;

    let daily_rf = risk_free_rate / days;
    let sharpe_ratio = if std_dev > Decimal::ZERO {
        (mean - daily_rf) / std_dev * sqrt_days
    } else {
        Decimal::ZERO
    };

    // Sortino measures against downside deviation only.
    let downside: Vec<Decimal> = returns.iter().copied().filter(|r| *r < daily_rf).collect();
    let sortino_ratio = if downside.len() > 1 {
        let downside_std = population_std(&downside, self::mean(&downside))? * sqrt_days;
        if downside_std > Decimal::ZERO {
            (annualized_return - risk_free_rate) / downside_std
        } else {
            Decimal::ZERO
        }
    } else {
        Decimal::ZERO
    };

    // Drawdown over the cumulative wealth path implied by the returns.
    let mut cumulative = Vec::with_capacity(returns.len());
    let mut running = Decimal::ZERO;
    for r in returns {
        running += *r;
        let wealth = running
            .checked_exp()
            .ok_or_else(|| AnalyticsError::Calculation("wealth overflow".to_string()))?;
        cumulative.push(wealth);
    }
    let max_drawdown = max_drawdown(&cumulative);

    let var = percentile(returns, confidence * Decimal::from(100))?;
    let tail: Vec<Decimal> = returns.iter().copied().filter(|r| *r <= var).collect();
    let cvar = if tail.is_empty() { var } else { self::mean(&tail) };

    let wins: Vec<Decimal> = returns.iter().copied().filter(|r| *r > Decimal::ZERO).collect();
    let losses: Vec<Decimal> = returns.iter().copied().filter(|r| *r < Decimal::ZERO).collect();
    let win_rate = Decimal::from(wins.len()) / Decimal::from(returns.len());

    let gross_profit: Decimal = wins.iter().sum();
    let gross_loss: Decimal = losses.iter().sum::<Decimal>().abs();
    let profit_factor = if gross_loss > Decimal::ZERO {
        Some(gross_profit / gross_loss)
    } else {
        None
    };

    let kelly_fraction = if win_rate > Decimal::ZERO && win_rate < Decimal::ONE {
        if losses.is_empty() {
            win_rate
        } else {
            let avg_win = self::mean(&wins);
            let avg_loss = self::mean(&losses).abs();
            if avg_win > Decimal::ZERO && avg_loss > Decimal::ZERO {
                win_rate - (Decimal::ONE - win_rate) / (avg_win / avg_loss)
            } else {
                Decimal::ZERO
            }
        }
    } else {
        Decimal::ZERO
    };

    Ok(PerformanceMetrics {
        total_return,
        annualized_return,
        annualized_volatility,
        sharpe_ratio,
        sortino_ratio,
        max_drawdown,
        var,
        cvar,
        win_rate,
        profit_factor,
        kelly_fraction,
        n_observations: returns.len(),
        n_years,
    })
}

/// `(1 + total_return)^(1 / n_years) - 1`, zero when the horizon is degenerate.
pub(crate) fn annualize_return(
    total_return: Decimal,
    n_years: Decimal,
) -> Result<Decimal, AnalyticsError> {
    if n_years <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    let base = Decimal::ONE + total_return;
    if base <= Decimal::ZERO {
        return Err(AnalyticsError::Calculation(
            "cannot annualize a return of -100% or worse".to_string(),
        ));
    }
    let compounded = base
        .checked_powd(Decimal::ONE / n_years)
        .ok_or_else(|| AnalyticsError::Calculation("annualization overflow".to_string()))?;
    Ok(compounded - Decimal::ONE)
}

pub(crate) fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().sum::<Decimal>() / Decimal::from(values.len())
}

/// Population standard deviation (ddof = 0).
pub(crate) fn population_std(
    values: &[Decimal],
    mean: Decimal,
) -> Result<Decimal, AnalyticsError> {
    if values.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let variance = values
        .iter()
        .map(|v| (*v - mean) * (*v - mean))
        .sum::<Decimal>()
        / Decimal::from(values.len());
    variance
        .sqrt()
        .ok_or_else(|| AnalyticsError::Calculation("sqrt of negative variance".to_string()))
}

/// Largest peak-to-trough decline over a value series. Non-positive.
pub(crate) fn max_drawdown(values: &[Decimal]) -> Decimal {
    let mut worst = Decimal::ZERO;
    let mut peak = match values.first() {
        Some(first) => *first,
        None => return Decimal::ZERO,
    };
    for value in values {
        if *value > peak {
            peak = *value;
        }
        if peak > Decimal::ZERO {
            let drawdown = (*value - peak) / peak;
            if drawdown < worst {
                worst = drawdown;
            }
        }
    }
    worst
}

/// Linear-interpolation percentile over an unsorted slice, `q` in [0, 100].
pub(crate) fn percentile(values: &[Decimal], q: Decimal) -> Result<Decimal, AnalyticsError> {
    if values.is_empty() {
        return Err(AnalyticsError::NotEnoughData(
            "percentile of empty slice".to_string(),
        ));
    }
    let mut sorted = values.to_vec();
    sorted.sort();

    let rank = q / Decimal::from(100) * Decimal::from(sorted.len() - 1);
    let lower = rank.floor();
    let fraction = rank - lower;
    let lo = lower
        .to_usize()
        .ok_or_else(|| AnalyticsError::Calculation("percentile rank out of range".to_string()))?;
    if lo + 1 >= sorted.len() {
        return Ok(sorted[sorted.len() - 1]);
    }
    Ok(sorted[lo] + (sorted[lo + 1] - sorted[lo]) * fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_short_series() {
        let err = compute_metrics(&[dec!(0.01)], 365, dec!(0), dec!(0.05));
        assert!(matches!(err, Err(AnalyticsError::NotEnoughData(_))));
    }

    #[test]
    fn flat_returns_have_zero_sharpe_and_drawdown() {
        let returns = vec![dec!(0); 10];
        let m = compute_metrics(&returns, 365, dec!(0), dec!(0.05)).unwrap();
        assert_eq!(m.sharpe_ratio, dec!(0));
        assert_eq!(m.total_return, dec!(0));
        assert_eq!(m.max_drawdown, dec!(0));
        assert_eq!(m.win_rate, dec!(0));
    }

    #[test]
    fn all_positive_returns_have_no_profit_factor() {
        let returns = vec![dec!(0.01), dec!(0.02), dec!(0.01)];
        let m = compute_metrics(&returns, 365, dec!(0), dec!(0.05)).unwrap();
        assert_eq!(m.profit_factor, None);
        assert_eq!(m.win_rate, dec!(1));
        assert!(m.total_return > dec!(0.039));
    }

    #[test]
    fn drawdown_tracks_running_peak() {
        let values = vec![dec!(100), dec!(110), dec!(99), dec!(120), dec!(90)];
        // Worst decline is 120 -> 90 = -25%.
        assert_eq!(max_drawdown(&values), dec!(-0.25));
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let values = vec![dec!(1), dec!(2), dec!(3), dec!(4)];
        assert_eq!(percentile(&values, dec!(0)).unwrap(), dec!(1));
        assert_eq!(percentile(&values, dec!(100)).unwrap(), dec!(4));
        assert_eq!(percentile(&values, dec!(50)).unwrap(), dec!(2.5));
    }

    #[test]
    fn log_returns_reject_non_positive_values() {
        assert!(log_returns(&[dec!(100), dec!(0)]).is_err());
        let r = log_returns(&[dec!(100), dec!(100)]).unwrap();
        assert_eq!(r, vec![dec!(0)]);
    }

    #[test]
    fn mixed_returns_produce_sane_ratios() {
        let returns = vec![dec!(0.02), dec!(-0.01), dec!(0.015), dec!(-0.02), dec!(0.01)];
        let m = compute_metrics(&returns, 365, dec!(0), dec!(0.05)).unwrap();
        assert!(m.annualized_volatility > dec!(0));
        assert!(m.profit_factor.is_some());
        assert_eq!(m.n_observations, 5);
        // 3 of 5 observations are wins.
        assert_eq!(m.win_rate, dec!(0.6));
    }
}
