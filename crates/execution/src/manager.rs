use crate::broker::Broker;
use crate::error::ExecutionError;
use core_types::{OrderResult, Position, Side, TradeRecord};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Aggregate statistics over all closed trades of one manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSummary {
    pub n_trades: usize,
    pub total_pnl: Decimal,
    pub win_rate: Decimal,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    pub final_equity: Decimal,
}

/// Owns the current position, the trade log, the equity curve, and the
/// drawdown circuit breaker. Consumes an injected `Broker` for execution.
///
/// Single-threaded by design: each call runs to completion before the next
/// tick is processed, so no internal locking is needed. The caller drives the
/// hard ordering `update_equity -> check_risk -> execute_signal` once per
/// tick.
pub struct OrderManager {
    broker: Box<dyn Broker>,
    max_position_size: Decimal,
    max_drawdown_pct: Decimal,
    position: Position,
    trades: Vec<TradeRecord>,
    equity_curve: Vec<Decimal>,
    halted: bool,
}

impl OrderManager {
    /// Creates a manager over the given broker. Fails fast on parameters the
    /// risk machinery cannot operate under.
    pub fn new(
        broker: Box<dyn Broker>,
        max_position_size: Decimal,
        max_drawdown_pct: Decimal,
        initial_capital: Decimal,
    ) -> Result<Self, ExecutionError> {
        if max_position_size <= dec!(0) {
            return Err(ExecutionError::InvalidParameter(
                "max_position_size".to_string(),
                "must be positive".to_string(),
            ));
        }
        if max_drawdown_pct <= dec!(0) || max_drawdown_pct >= dec!(1) {
            return Err(ExecutionError::InvalidParameter(
                "max_drawdown_pct".to_string(),
                "must be between 0 and 1".to_string(),
            ));
        }
        if initial_capital <= dec!(0) {
            return Err(ExecutionError::InvalidParameter(
                "initial_capital".to_string(),
                "must be positive".to_string(),
            ));
        }
        Ok(Self {
            broker,
            max_position_size,
            max_drawdown_pct,
            position: Position::flat(),
            trades: Vec::new(),
            equity_curve: vec![initial_capital],
            halted: false,
        })
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[Decimal] {
        &self.equity_curve
    }

    /// Whether the circuit breaker has tripped. One-way: once halted, only
    /// constructing a new manager clears it.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Forwards the simulated mark price to the broker (no-op on live venues).
    pub fn set_mark(&mut self, price: Decimal) {
        self.broker.set_price(price);
    }

    /// Executes a trade based on the target signal vs. the current position.
    ///
    /// Returns the last order receipt issued, or `None` when no order was
    /// needed or the venue rejected it. The in-memory position is updated to
    /// the *intended* state even on a rejected fill; the `None` return
    /// surfaces the rejection to the caller.
    pub async fn execute_signal(
        &mut self,
        signal: Side,
        amount: Decimal,
        current_price: Decimal,
    ) -> Result<Option<OrderResult>, ExecutionError> {
        if amount < dec!(0) {
            return Err(ExecutionError::InvalidParameter(
                "amount".to_string(),
                "cannot be negative".to_string(),
            ));
        }
        if current_price <= dec!(0) {
            return Err(ExecutionError::InvalidParameter(
                "current_price".to_string(),
                "must be positive".to_string(),
            ));
        }

        // Fail-safe override: a halted manager only ever flattens.
        let signal = if self.halted {
            tracing::warn!("trading halted due to risk limit, forcing flat");
            Side::Flat
        } else {
            signal
        };

        if signal == self.position.side {
            return Ok(None);
        }

        let amount = if amount > self.max_position_size {
            tracing::warn!(
                %amount,
                max = %self.max_position_size,
                "amount exceeds max position size, clamping"
            );
            self.max_position_size
        } else {
            amount
        };

        let mut order = None;

        // Close any existing exposure first, then record the round trip.
        match self.position.side {
            Side::Long => {
                order = self.broker.market_sell(self.position.amount).await?;
                if order.is_none() {
                    tracing::warn!("closing sell was rejected by the venue");
                }
            }
            Side::Short => {
                order = self.broker.market_buy(self.position.amount).await?;
                if order.is_none() {
                    tracing::warn!("closing buy was rejected by the venue");
                }
            }
            Side::Flat => {}
        }
        if !self.position.is_flat() {
            self.trades
                .push(TradeRecord::from_close(&self.position, current_price));
        }

        // Open the target exposure. The position is always replaced wholesale.
        match signal {
            Side::Long => {
                order = self.broker.market_buy(amount).await?;
                if order.is_none() {
                    tracing::warn!("opening buy was rejected by the venue");
                }
                self.position = Position::open(Side::Long, current_price, amount);
            }
            Side::Short => {
                order = self.broker.market_sell(amount).await?;
                if order.is_none() {
                    tracing::warn!("opening sell was rejected by the venue");
                }
                self.position = Position::open(Side::Short, current_price, amount);
            }
            Side::Flat => {
                self.position = Position::flat();
            }
        }

        Ok(order)
    }

    /// Recomputes unrealized P&L at the mark, queries the broker for total
    /// account value, and appends it to the equity curve.
    ///
    /// Must be called before `check_risk` on every tick.
    pub async fn update_equity(&mut self, mark_price: Decimal) -> Result<Decimal, ExecutionError> {
        if !self.position.is_flat() {
            self.position.unrealized_pnl = self.position.unrealized_at(mark_price);
        }
        let balance = self.broker.get_balance().await?;
        let equity = balance.quote_total;
        self.equity_curve.push(equity);
        Ok(equity)
    }

    /// Checks drawdown against the running equity peak. Returns `true` while
    /// trading may continue.
    ///
    /// A breach trips the one-way breaker: `halted` is set permanently and
    /// all subsequent signals are forced flat.
    pub fn check_risk(&mut self) -> bool {
        if self.equity_curve.len() < 2 {
            return true;
        }

        let mut peak = Decimal::MIN;
        for equity in &self.equity_curve {
            if *equity > peak {
                peak = *equity;
            }
        }
        let latest = self.equity_curve[self.equity_curve.len() - 1];
        let drawdown = if peak > dec!(0) {
            (latest - peak) / peak
        } else {
            dec!(0)
        };

        if drawdown.abs() > self.max_drawdown_pct {
            tracing::error!(
                drawdown = %drawdown,
                limit = %self.max_drawdown_pct,
                "MAX DRAWDOWN BREACHED, halting trading"
            );
            self.halted = true;
            return false;
        }
        true
    }

    /// Unconditionally flattens any open position, records the trade, and
    /// requests cancellation of any resting orders.
    ///
    /// Used at the end of a backtest and on shutdown. A failed cancel is
    /// logged, not fatal.
    pub async fn close_all(&mut self, current_price: Decimal) -> Result<(), ExecutionError> {
        match self.position.side {
            Side::Long => {
                if self.broker.market_sell(self.position.amount).await?.is_none() {
                    tracing::warn!("flattening sell was rejected by the venue");
                }
            }
            Side::Short => {
                if self.broker.market_buy(self.position.amount).await?.is_none() {
                    tracing::warn!("flattening buy was rejected by the venue");
                }
            }
            Side::Flat => {}
        }
        if !self.position.is_flat() {
            self.trades
                .push(TradeRecord::from_close(&self.position, current_price));
        }
        self.position = Position::flat();

        match self.broker.cancel_all_orders().await {
            Ok(true) => {}
            Ok(false) => tracing::warn!("venue did not acknowledge cancel-all"),
            Err(e) => tracing::error!(error = %e, "cancel-all failed during close-out"),
        }
        tracing::info!("all positions closed");
        Ok(())
    }

    /// Aggregates the trade log. Returns the explicit empty summary when no
    /// trades have occurred; never fails.
    pub fn summary(&self) -> TradingSummary {
        let final_equity = *self
            .equity_curve
            .last()
            .expect("equity curve is seeded with initial capital");

        if self.trades.is_empty() {
            return TradingSummary {
                n_trades: 0,
                total_pnl: dec!(0),
                win_rate: dec!(0),
                avg_win: dec!(0),
                avg_loss: dec!(0),
                largest_win: dec!(0),
                largest_loss: dec!(0),
                final_equity,
            };
        }

        let pnls: Vec<Decimal> = self.trades.iter().map(|t| t.pnl).collect();
        let wins: Vec<Decimal> = pnls.iter().copied().filter(|p| *p > dec!(0)).collect();
        let losses: Vec<Decimal> = pnls.iter().copied().filter(|p| *p <= dec!(0)).collect();

        let avg = |xs: &[Decimal]| {
            if xs.is_empty() {
                dec!(0)
            } else {
                xs.iter().sum::<Decimal>() / Decimal::from(xs.len())
            }
        };

        TradingSummary {
            n_trades: self.trades.len(),
            total_pnl: pnls.iter().sum(),
            win_rate: Decimal::from(wins.len()) / Decimal::from(pnls.len()),
            avg_win: avg(&wins),
            avg_loss: avg(&losses),
            largest_win: *pnls.iter().max().expect("pnls is non-empty"),
            largest_loss: *pnls.iter().min().expect("pnls is non-empty"),
            final_equity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::PaperBroker;
    use core_types::CostModel;

    fn manager() -> OrderManager {
        let broker = PaperBroker::new(dec!(10000), CostModel::new(dec!(0), dec!(0.0005)));
        OrderManager::new(Box::new(broker), dec!(0.1), dec!(0.15), dec!(10000)).unwrap()
    }

    fn manager_free_costs(initial: Decimal) -> OrderManager {
        let broker = PaperBroker::new(initial, CostModel::free());
        OrderManager::new(Box::new(broker), dec!(0.1), dec!(0.15), initial).unwrap()
    }

    #[test]
    fn initial_state_is_flat_and_live() {
        let m = manager();
        assert!(m.position().is_flat());
        assert!(!m.is_halted());
        assert_eq!(m.equity_curve(), &[dec!(10000)]);
    }

    #[test]
    fn constructor_rejects_bad_parameters() {
        let broker = PaperBroker::new(dec!(10000), CostModel::free());
        assert!(
            OrderManager::new(Box::new(broker), dec!(0), dec!(0.15), dec!(10000)).is_err()
        );
        let broker = PaperBroker::new(dec!(10000), CostModel::free());
        assert!(
            OrderManager::new(Box::new(broker), dec!(0.1), dec!(1.5), dec!(10000)).is_err()
        );
    }

    #[tokio::test]
    async fn long_signal_opens_a_long_position() {
        let mut m = manager();
        m.set_mark(dec!(50000));
        let order = m.execute_signal(Side::Long, dec!(0.01), dec!(50000)).await.unwrap();
        assert!(order.is_some());
        assert_eq!(m.position().side, Side::Long);
        assert_eq!(m.position().amount, dec!(0.01));
        assert_eq!(m.position().entry_price, dec!(50000));
    }

    #[tokio::test]
    async fn short_signal_sets_short_position_even_when_venue_rejects() {
        let mut m = manager();
        m.set_mark(dec!(50000));
        // The paper ledger holds no inventory, so the opening sell is
        // rejected, but the intended position is still installed.
        let order = m.execute_signal(Side::Short, dec!(0.01), dec!(50000)).await.unwrap();
        assert!(order.is_none());
        assert_eq!(m.position().side, Side::Short);
    }

    #[tokio::test]
    async fn flat_signal_closes_and_records_the_trade() {
        let mut m = manager();
        m.set_mark(dec!(50000));
        m.execute_signal(Side::Long, dec!(0.01), dec!(50000)).await.unwrap();
        m.set_mark(dec!(51000));
        m.execute_signal(Side::Flat, dec!(0.01), dec!(51000)).await.unwrap();

        assert!(m.position().is_flat());
        assert_eq!(m.trades().len(), 1);
        // Bought at 50k, sold at 51k.
        assert_eq!(m.trades()[0].pnl, dec!(10));
    }

    #[tokio::test]
    async fn same_signal_is_a_no_op() {
        let mut m = manager();
        m.set_mark(dec!(50000));
        let order = m.execute_signal(Side::Flat, dec!(0.01), dec!(50000)).await.unwrap();
        assert!(order.is_none());
        assert!(m.trades().is_empty());

        m.execute_signal(Side::Long, dec!(0.01), dec!(50000)).await.unwrap();
        let again = m.execute_signal(Side::Long, dec!(0.05), dec!(52000)).await.unwrap();
        assert!(again.is_none());
        assert_eq!(m.position().amount, dec!(0.01));
        assert!(m.trades().is_empty());
    }

    #[tokio::test]
    async fn oversized_amount_is_clamped() {
        let mut m = manager();
        m.set_mark(dec!(50000));
        m.execute_signal(Side::Long, dec!(10), dec!(50000)).await.unwrap();
        assert_eq!(m.position().amount, dec!(0.1));
    }

    #[tokio::test]
    async fn negative_amount_fails_fast() {
        let mut m = manager();
        let err = m.execute_signal(Side::Long, dec!(-1), dec!(50000)).await;
        assert!(matches!(err, Err(ExecutionError::InvalidParameter(_, _))));
    }

    #[tokio::test]
    async fn position_invariant_holds_across_transitions() {
        let mut m = manager();
        m.set_mark(dec!(50000));
        for signal in [Side::Long, Side::Flat, Side::Short, Side::Long, Side::Flat] {
            m.execute_signal(signal, dec!(0.01), dec!(50000)).await.unwrap();
            let p = m.position();
            assert_eq!(p.amount == dec!(0), p.side == Side::Flat);
        }
    }

    #[tokio::test]
    async fn close_all_flattens_and_cancels() {
        let mut m = manager();
        m.set_mark(dec!(50000));
        m.execute_signal(Side::Long, dec!(0.01), dec!(50000)).await.unwrap();
        m.close_all(dec!(51000)).await.unwrap();
        assert!(m.position().is_flat());
        assert_eq!(m.trades().len(), 1);
    }

    #[tokio::test]
    async fn update_equity_marks_to_market() {
        let mut m = manager_free_costs(dec!(1000));
        m.set_mark(dec!(50000));
        m.execute_signal(Side::Long, dec!(0.02), dec!(50000)).await.unwrap();

        // All cash went into 0.02 units at 50000; equity should track the mark.
        let eq = m.update_equity(dec!(50000)).await.unwrap();
        assert_eq!(eq, dec!(1000));

        m.set_mark(dec!(55000));
        let eq = m.update_equity(dec!(55000)).await.unwrap();
        assert_eq!(eq, dec!(1100));
        assert_eq!(m.position().unrealized_pnl, dec!(100));
    }

    #[test]
    fn risk_check_passes_with_fresh_curve() {
        let mut m = manager();
        assert!(m.check_risk());
        assert!(!m.is_halted());
    }

    #[tokio::test]
    async fn drawdown_breach_halts_and_forces_flat() {
        let mut m = manager_free_costs(dec!(1000));
        m.set_mark(dec!(50000));
        m.update_equity(dec!(50000)).await.unwrap();
        m.execute_signal(Side::Long, dec!(0.02), dec!(50000)).await.unwrap();

        // Price collapses: equity curve becomes [1000, 1000, 820].
        m.set_mark(dec!(41000));
        let eq = m.update_equity(dec!(41000)).await.unwrap();
        assert_eq!(eq, dec!(820));

        assert!(!m.check_risk());
        assert!(m.is_halted());

        // A long signal on a halted manager is forced flat: the position is
        // closed, not reopened.
        m.execute_signal(Side::Long, dec!(0.02), dec!(41000)).await.unwrap();
        assert!(m.position().is_flat());
        assert_eq!(m.trades().len(), 1);
        assert_eq!(m.trades()[0].pnl, dec!(-180));
    }

    #[tokio::test]
    async fn summary_aggregates_trades() {
        let mut m = manager();
        m.set_mark(dec!(50000));
        m.execute_signal(Side::Long, dec!(0.01), dec!(50000)).await.unwrap();
        m.set_mark(dec!(51000));
        m.execute_signal(Side::Flat, dec!(0.01), dec!(51000)).await.unwrap();

        let s = m.summary();
        assert_eq!(s.n_trades, 1);
        assert_eq!(s.total_pnl, dec!(10));
        assert_eq!(s.win_rate, dec!(1));
        assert_eq!(s.largest_win, dec!(10));
    }

    #[test]
    fn empty_summary_is_explicit() {
        let m = manager();
        let s = m.summary();
        assert_eq!(s.n_trades, 0);
        assert_eq!(s.total_pnl, dec!(0));
        assert_eq!(s.final_equity, dec!(10000));
    }
}
