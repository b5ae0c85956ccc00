//! # Meridian Trader
//!
//! The session loop that drives one `OrderManager` over a stream of price
//! ticks. Each tick follows a hard ordering: mark the broker, coerce the
//! signal to what the venue permits, update equity, run the risk check, then
//! execute. The loop honors a `watch`-based shutdown handle and always
//! flattens before returning its summary.

use configuration::Config;
use core_types::{Bar, Side};
use execution::{Broker, OrderManager, TradingSummary};
use rust_decimal::Decimal;
use tokio::sync::watch;

pub mod error;

pub use error::TraderError;

/// Drives the order manager tick by tick for one trading session.
pub struct Trader {
    manager: OrderManager,
    units: Decimal,
    allow_short: bool,
    ticks: u64,
    shutdown: Option<watch::Receiver<bool>>,
}

impl Trader {
    /// Builds a session over the given broker using the configured trade
    /// size and risk limits.
    pub fn new(config: &Config, broker: Box<dyn Broker>) -> Result<Self, TraderError> {
        let manager = OrderManager::new(
            broker,
            config.risk.max_position_size,
            config.risk.max_drawdown_pct,
            config.trading.initial_capital,
        )?;
        Ok(Self {
            manager,
            units: config.trading.units,
            allow_short: config.trading.allow_short,
            ticks: 0,
            shutdown: None,
        })
    }

    /// Installs a shutdown handle. When the sender flips it to `true` the
    /// session flattens and returns at the next tick boundary.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn manager(&self) -> &OrderManager {
        &self.manager
    }

    /// Replays a precomputed signal series over historical bars through the
    /// full live order path. Signals shorter than the bar series default the
    /// missing tail to flat.
    pub async fn run_on_data(
        &mut self,
        bars: &[Bar],
        signals: &[i8],
    ) -> Result<TradingSummary, TraderError> {
        let last_price = bars.last().ok_or(TraderError::NoData)?.price();

        for (i, bar) in bars.iter().enumerate() {
            if self.shutdown_requested() {
                tracing::info!("shutdown requested, closing out");
                self.close_out(bar.price()).await?;
                return Ok(self.manager.summary());
            }
            let signal = signals.get(i).copied().unwrap_or(0);
            self.tick(bar.price(), signal).await?;
        }

        self.close_out(last_price).await?;
        Ok(self.manager.summary())
    }

    /// Processes one price tick. The ordering here is the core contract of
    /// the session loop: equity must be current before the risk check runs,
    /// and a failed risk check forces the tick's signal flat.
    pub async fn tick(&mut self, price: Decimal, signal: i8) -> Result<(), TraderError> {
        self.manager.set_mark(price);

        let signal = if signal < 0 && !self.allow_short {
            tracing::warn!("short signal on a long-only venue, treating as flat");
            0
        } else {
            signal
        };
        let mut side = Side::from_signal(signal)?;

        let equity = self.manager.update_equity(price).await?;
        if !self.manager.check_risk() {
            side = Side::Flat;
        }

        self.manager.execute_signal(side, self.units, price).await?;

        self.ticks += 1;
        if self.ticks % 10 == 0 {
            tracing::info!(
                tick = self.ticks,
                %price,
                %equity,
                position = ?self.manager.position().side,
                "session heartbeat"
            );
        }
        Ok(())
    }

    /// Flattens the book and cancels resting orders at the given price.
    pub async fn close_out(&mut self, price: Decimal) -> Result<(), TraderError> {
        self.manager.close_all(price).await?;
        Ok(())
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }
}
