use crate::error::AnalyticsError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::BTreeMap;

/// Wealth paths for one bet fraction: `n_trials` rows of `n_steps + 1` samples.
pub type WealthPaths = Vec<Vec<Decimal>>;

/// Optimal Kelly leverage `f* = (mu - r) / sigma^2`.
///
/// Returns zero when volatility is non-positive: a degenerate edge is treated
/// as "do not lever".
pub fn optimal_leverage(mu: Decimal, sigma: Decimal, risk_free_rate: Decimal) -> Decimal {
    if sigma <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (mu - risk_free_rate) / (sigma * sigma)
}

/// Parameters for the Kelly Monte-Carlo simulation.
#[derive(Debug, Clone)]
pub struct KellyConfig {
    /// Win probability of the biased coin.
    pub win_probability: f64,
    /// Bet fractions to simulate. `None` selects the default grid, which
    /// includes the even-odds Kelly optimum `2p - 1`.
    pub fractions: Option<Vec<Decimal>>,
    /// Simulation paths per fraction.
    pub n_trials: usize,
    /// Bets per path.
    pub n_steps: usize,
    pub initial_capital: Decimal,
    /// Seed for the pseudo-random source; identical seeds and parameters
    /// produce bit-identical wealth matrices.
    pub seed: u64,
}

impl Default for KellyConfig {
    fn default() -> Self {
        Self {
            win_probability: 0.55,
            fractions: None,
            n_trials: 50,
            n_steps: 100,
            initial_capital: Decimal::from(100),
            seed: 42,
        }
    }
}

/// Simulates multiplicative wealth paths under a biased coin for a list of
/// candidate bet fractions.
///
/// For each fraction `f`: `wealth[t+1] = wealth[t] * (1 + f)` on a win and
/// `wealth[t] * (1 - f)` on a loss. Keys of the returned map are the
/// fractions formatted to four decimal places.
pub fn kelly_simulation(
    config: &KellyConfig,
) -> Result<BTreeMap<String, WealthPaths>, AnalyticsError> {
    let p = config.win_probability;
    if !(0.0..=1.0).contains(&p) {
        return Err(AnalyticsError::InvalidParameter(
            "win_probability".to_string(),
            format!("{} is not in [0, 1]", p),
        ));
    }
    if config.n_trials == 0 || config.n_steps == 0 {
        return Err(AnalyticsError::InvalidParameter(
            "n_trials/n_steps".to_string(),
            "must be positive".to_string(),
        ));
    }

    let fractions = match &config.fractions {
        Some(fractions) => fractions.clone(),
        None => default_fractions(p)?,
    };

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut results = BTreeMap::new();

    for f in fractions {
        let up = Decimal::ONE + f;
        let down = Decimal::ONE - f;

        let mut paths: WealthPaths = vec![Vec::with_capacity(config.n_steps + 1); config.n_trials];
        for path in paths.iter_mut() {
            path.push(config.initial_capital);
        }

        // One rng draw per trial per step, in a fixed order, so a seed pins
        // down the entire matrix.
        for _ in 0..config.n_steps {
            for path in paths.iter_mut() {
                let won = rng.r#gen::<f64>() < p;
                let last = *path.last().expect("path is seeded with initial capital");
                path.push(last * if won { up } else { down });
            }
        }

        results.insert(format!("{:.4}", f), paths);
    }

    Ok(results)
}

/// The default candidate grid around the even-odds Kelly optimum.
fn default_fractions(p: f64) -> Result<Vec<Decimal>, AnalyticsError> {
    let f_star = Decimal::from_f64(2.0 * p - 1.0).ok_or_else(|| {
        AnalyticsError::Calculation("win probability is not representable".to_string())
    })?;
    Ok(vec![
        Decimal::new(5, 2),   // 0.05
        Decimal::new(10, 2),  // 0.10
        Decimal::new(25, 2),  // 0.25
        f_star,
        Decimal::new(50, 2),  // 0.50
        Decimal::new(75, 2),  // 0.75
        Decimal::ONE,
    ])
}
