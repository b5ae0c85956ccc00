use core_types::CostModel;
use rust_decimal::Decimal;
use serde::Deserialize;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub trading: Trading,
    pub costs: Costs,
    pub risk: RiskLimits,
    pub backtest: Backtest,
}

/// Parameters describing what and how much we trade.
#[derive(Debug, Clone, Deserialize)]
pub struct Trading {
    /// The asset pair being traded (e.g., "BTC/USDT"). Informational only;
    /// the core trades exactly one pair.
    pub symbol: String,
    /// Base-currency amount submitted per signal.
    pub units: Decimal,
    /// Starting quote-currency capital.
    pub initial_capital: Decimal,
    /// Whether the venue permits short exposure. Spot venues do not.
    pub allow_short: bool,
}

/// The dual transaction cost model applied to every fill.
#[derive(Debug, Clone, Deserialize)]
pub struct Costs {
    /// Fixed cost per trade in quote currency (e.g., 0.0).
    pub fixed: Decimal,
    /// Proportional cost as a fraction of notional (e.g., 0.0005).
    pub proportional: Decimal,
}

impl Costs {
    pub fn model(&self) -> CostModel {
        CostModel::new(self.fixed, self.proportional)
    }
}

/// Hard limits enforced by the order manager.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskLimits {
    /// Maximum base-currency position size; larger requests are clamped.
    pub max_position_size: Decimal,
    /// Circuit breaker: fraction of equity drawdown that halts trading (e.g., 0.15).
    pub max_drawdown_pct: Decimal,
}

/// Parameters for the event-based backtest engine.
#[derive(Debug, Clone, Deserialize)]
pub struct Backtest {
    /// Starting capital for simulated runs.
    pub initial_capital: Decimal,
    /// Annualization factor. 365 for always-on crypto markets.
    pub trading_days: u32,
    /// Annualized risk-free rate used in ratio metrics.
    pub risk_free_rate: Decimal,
}
