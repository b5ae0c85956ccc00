use crate::error::ExecutionError;
use async_trait::async_trait;
use core_types::{Balance, OrderResult, Ticker};
use rust_decimal::Decimal;

/// A generic contract for an execution backend.
///
/// This trait allows the order manager and the control loop to be agnostic
/// about whether they are talking to a simulated ledger or a real exchange.
///
/// Every successful call is one unit of work: one trade produces one receipt
/// and one balance mutation. Partial fills are reported through the returned
/// `filled` quantity, never as multiple silent calls.
///
/// Order placement returns `Ok(None)` when the venue cannot fill the trade
/// (insufficient funds or inventory). That is a *normal* outcome the caller
/// must handle, not an error; callers must not retry it. `Err` is reserved
/// for connectivity failures on live venues and must never be raised by the
/// simulated variant.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Fetches account balances for the quote and base currency.
    async fn get_balance(&mut self) -> Result<Balance, ExecutionError>;

    /// Fetches the current top-of-book snapshot.
    async fn get_ticker(&mut self) -> Result<Ticker, ExecutionError>;

    /// Places a market buy for `amount` of base currency.
    async fn market_buy(&mut self, amount: Decimal)
    -> Result<Option<OrderResult>, ExecutionError>;

    /// Places a market sell for `amount` of base currency.
    async fn market_sell(
        &mut self,
        amount: Decimal,
    ) -> Result<Option<OrderResult>, ExecutionError>;

    /// Places a limit buy for `amount` at `price`.
    async fn limit_buy(
        &mut self,
        amount: Decimal,
        price: Decimal,
    ) -> Result<Option<OrderResult>, ExecutionError>;

    /// Places a limit sell for `amount` at `price`.
    async fn limit_sell(
        &mut self,
        amount: Decimal,
        price: Decimal,
    ) -> Result<Option<OrderResult>, ExecutionError>;

    /// Cancels all resting orders. Returns whether the venue acknowledged.
    async fn cancel_all_orders(&mut self) -> Result<bool, ExecutionError>;

    /// Moves the simulated mark price. A no-op for live venues, which take
    /// their prices from the market.
    fn set_price(&mut self, _price: Decimal) {}
}
