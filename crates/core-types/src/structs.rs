use crate::enums::{OrderSide, OrderType, Side};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One immutable OHLCV observation for a fixed time interval.
///
/// Bars are produced once by the data layer and read-only thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Bar {
    /// The reference price of the bar. All marking and fills use the close.
    pub fn price(&self) -> Decimal {
        self.close
    }

    /// The log return relative to the previous bar, `ln(close_t / close_{t-1})`.
    ///
    /// `None` when either close is non-positive.
    pub fn log_return(&self, previous: &Bar) -> Option<Decimal> {
        if previous.close <= Decimal::ZERO || self.close <= Decimal::ZERO {
            return None;
        }
        (self.close / previous.close).checked_ln()
    }
}

/// The trader's current exposure in the asset.
///
/// A position is replaced wholesale on every transition, never mutated
/// field-by-field, so the entry price can never go stale. Invariant:
/// `amount == 0` exactly when `side == Flat`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: Side,
    pub entry_price: Decimal,
    pub amount: Decimal,
    pub unrealized_pnl: Decimal,
}

impl Position {
    /// The flat (zero) position.
    pub fn flat() -> Self {
        Self {
            side: Side::Flat,
            entry_price: Decimal::ZERO,
            amount: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
        }
    }

    /// Opens a fresh position at the given entry price.
    pub fn open(side: Side, entry_price: Decimal, amount: Decimal) -> Self {
        Self {
            side,
            entry_price,
            amount,
            unrealized_pnl: Decimal::ZERO,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.side == Side::Flat
    }

    /// Mark-to-market P&L at `mark_price`: `(mark - entry) * amount * side`.
    pub fn unrealized_at(&self, mark_price: Decimal) -> Decimal {
        (mark_price - self.entry_price) * self.amount * self.side.multiplier()
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::flat()
    }
}

/// An immutable log entry created when a position is closed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub side: Side,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub amount: Decimal,
    pub pnl: Decimal,
}

impl TradeRecord {
    /// Records the close of `position` at `exit_price`.
    pub fn from_close(position: &Position, exit_price: Decimal) -> Self {
        let pnl =
            (exit_price - position.entry_price) * position.amount * position.side.multiplier();
        Self {
            side: position.side,
            entry_price: position.entry_price,
            exit_price,
            amount: position.amount,
            pnl,
        }
    }
}

/// The dual transaction cost function applied identically to every trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Flat charge per trade, in quote currency units. May be zero.
    pub fixed: Decimal,
    /// Fraction of notional, e.g. 0.001 for 10 bps.
    pub proportional: Decimal,
}

impl CostModel {
    pub fn new(fixed: Decimal, proportional: Decimal) -> Self {
        Self {
            fixed,
            proportional,
        }
    }

    /// Zero-cost model, useful for gross-vs-net comparisons.
    pub fn free() -> Self {
        Self::new(Decimal::ZERO, Decimal::ZERO)
    }

    /// `fixed + |notional| * proportional`, regardless of trade direction.
    pub fn cost(&self, notional: Decimal) -> Decimal {
        self.fixed + notional.abs() * self.proportional
    }
}

/// A receipt for a submitted order.
///
/// Partial fills are represented by `filled <= amount`; a rejection is not an
/// `OrderResult` at all but a `None` return from the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    /// Broker-assigned identifier (e.g. `paper-42` for the simulated ledger).
    pub id: String,
    /// Client-side identifier generated at submission time.
    pub client_order_id: Uuid,
    pub side: OrderSide,
    pub order_type: OrderType,
    /// Quantity requested, in base currency.
    pub amount: Decimal,
    /// Quantity actually filled, `<= amount`.
    pub filled: Decimal,
    pub price: Decimal,
    /// Notional value of the fill, `filled * price`.
    pub cost: Decimal,
    /// Transaction cost charged on the fill.
    pub fee: Decimal,
}

/// Account balances split by currency, as reported by a broker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub quote_free: Decimal,
    /// Cash plus the mark-to-market value of base holdings.
    pub quote_total: Decimal,
    pub base_free: Decimal,
    pub base_total: Decimal,
}

/// A top-of-book snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
    pub volume: Decimal,
}
