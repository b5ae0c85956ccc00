use chrono::{DateTime, Utc};
use core_types::{Bar, CostModel, OrderSide};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One executed fill inside the event-based engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub bar: usize,
    pub timestamp: DateTime<Utc>,
    pub side: OrderSide,
    pub units: u64,
    pub price: Decimal,
    /// Transaction cost charged on this fill.
    pub fee: Decimal,
    pub cash_after: Decimal,
    pub position_after: i64,
}

/// The single state machine shared by all event-based backtest variants:
/// cash, a signed unit position, and the dual transaction cost model.
///
/// Trades settle at the bar close. The ledger itself places no constraint on
/// cash going negative; exposure limits are the driver's concern.
#[derive(Debug, Clone)]
pub struct BarLedger {
    pub cash: Decimal,
    /// Signed position in whole units of the base asset.
    pub position: i64,
    pub n_trades: u32,
    costs: CostModel,
    fills: Vec<Fill>,
}

impl BarLedger {
    pub fn new(initial_capital: Decimal, costs: CostModel) -> Self {
        Self {
            cash: initial_capital,
            position: 0,
            n_trades: 0,
            costs,
            fills: Vec::new(),
        }
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// Executes a signed trade at the bar's close: positive units buy,
    /// negative units sell. One call is one fill and one log entry.
    pub fn execute_trade(&mut self, bar_index: usize, bar: &Bar, units: i64) {
        let price = bar.price();
        let cost = Decimal::from(units) * price;
        let fee = self.costs.cost(cost);

        self.cash -= cost + fee;
        self.position += units;
        self.n_trades += 1;

        let side = if units > 0 {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        };
        tracing::debug!(
            bar = bar_index,
            ?side,
            units = units.unsigned_abs(),
            %price,
            %fee,
            cash = %self.cash,
            "fill"
        );
        self.fills.push(Fill {
            bar: bar_index,
            timestamp: bar.timestamp,
            side,
            units: units.unsigned_abs(),
            price,
            fee,
            cash_after: self.cash,
            position_after: self.position,
        });
    }

    /// Flattens any open position at the bar's close.
    pub fn close_position(&mut self, bar_index: usize, bar: &Bar) {
        if self.position != 0 {
            self.execute_trade(bar_index, bar, -self.position);
        }
    }

    /// Mark-to-market value: cash plus position at the given price.
    pub fn portfolio_value(&self, price: Decimal) -> Decimal {
        self.cash + Decimal::from(self.position) * price
    }
}
