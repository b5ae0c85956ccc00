use crate::error::ConfigError;
use rust_decimal_macros::dec;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{Backtest, Config, Costs, RiskLimits, Trading};

/// Loads the application configuration from the `config.toml` file.
///
/// This function is the primary entry point for this crate. It reads the configuration file,
/// deserializes it into our strongly-typed `Config` struct, and returns it.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from("config.toml")
}

/// Loads configuration from an arbitrary file path (used by tests and the CLI).
pub fn load_config_from(path: &str) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(path))
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;

    Ok(config)
}

/// Fails fast on parameter combinations the core cannot operate under.
fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.trading.initial_capital <= dec!(0) {
        return Err(ConfigError::ValidationError(
            "trading.initial_capital must be positive".to_string(),
        ));
    }
    if config.trading.units <= dec!(0) {
        return Err(ConfigError::ValidationError(
            "trading.units must be positive".to_string(),
        ));
    }
    if config.costs.fixed < dec!(0) || config.costs.proportional < dec!(0) {
        return Err(ConfigError::ValidationError(
            "transaction costs cannot be negative".to_string(),
        ));
    }
    if config.risk.max_position_size <= dec!(0) {
        return Err(ConfigError::ValidationError(
            "risk.max_position_size must be positive".to_string(),
        ));
    }
    if config.risk.max_drawdown_pct <= dec!(0) || config.risk.max_drawdown_pct >= dec!(1) {
        return Err(ConfigError::ValidationError(
            "risk.max_drawdown_pct must be between 0 and 1".to_string(),
        ));
    }
    if config.backtest.initial_capital <= dec!(0) {
        return Err(ConfigError::ValidationError(
            "backtest.initial_capital must be positive".to_string(),
        ));
    }
    if config.backtest.trading_days == 0 {
        return Err(ConfigError::ValidationError(
            "backtest.trading_days must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            trading: Trading {
                symbol: "BTC/USDT".to_string(),
                units: dec!(0.001),
                initial_capital: dec!(1000),
                allow_short: false,
            },
            costs: Costs {
                fixed: dec!(0),
                proportional: dec!(0.0005),
            },
            risk: RiskLimits {
                max_position_size: dec!(0.01),
                max_drawdown_pct: dec!(0.15),
            },
            backtest: Backtest {
                initial_capital: dec!(100000),
                trading_days: 365,
                risk_free_rate: dec!(0),
            },
        }
    }

    #[test]
    fn sane_config_validates() {
        assert!(validate(&base_config()).is_ok());
    }

    #[test]
    fn drawdown_limit_must_be_a_fraction() {
        let mut config = base_config();
        config.risk.max_drawdown_pct = dec!(1.5);
        assert!(validate(&config).is_err());

        config.risk.max_drawdown_pct = dec!(0);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn negative_costs_are_rejected() {
        let mut config = base_config();
        config.costs.proportional = dec!(-0.001);
        assert!(validate(&config).is_err());
    }
}
