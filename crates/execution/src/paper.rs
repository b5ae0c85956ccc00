use crate::broker::Broker;
use crate::error::ExecutionError;
use async_trait::async_trait;
use core_types::{Balance, CostModel, OrderResult, OrderSide, OrderType, Ticker};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// The "virtual exchange" for backtesting and paper trading.
///
/// Tracks a private cash/asset ledger with the dual transaction cost model
/// applied on every fill. No network connection is made, and no call ever
/// returns a connectivity error. A buy or sell fails (returns `None`) only
/// when the resulting balance or inventory would go negative.
pub struct PaperBroker {
    quote: Decimal,
    base: Decimal,
    costs: CostModel,
    last_price: Decimal,
    order_count: u64,
    trade_log: Vec<OrderResult>,
}

impl PaperBroker {
    /// Creates a ledger with `initial_quote` cash and no asset inventory.
    ///
    /// The mark starts at a placeholder price; callers are expected to
    /// `set_price` before trading.
    pub fn new(initial_quote: Decimal, costs: CostModel) -> Self {
        Self {
            quote: initial_quote,
            base: Decimal::ZERO,
            costs,
            last_price: dec!(50000),
            order_count: 0,
            trade_log: Vec::new(),
        }
    }

    /// Every fill so far, in execution order.
    pub fn trade_log(&self) -> &[OrderResult] {
        &self.trade_log
    }

    fn fill_buy(&mut self, amount: Decimal, price: Decimal, order_type: OrderType) -> Option<OrderResult> {
        let cost = amount * price;
        let fee = self.costs.cost(cost);
        if cost + fee > self.quote {
            tracing::warn!(%amount, %price, "paper: insufficient funds for buy");
            return None;
        }
        self.quote -= cost + fee;
        self.base += amount;
        Some(self.log_order(OrderSide::Buy, order_type, amount, price, fee))
    }

    fn fill_sell(&mut self, amount: Decimal, price: Decimal, order_type: OrderType) -> Option<OrderResult> {
        if amount > self.base {
            tracing::warn!(%amount, "paper: insufficient inventory for sell");
            return None;
        }
        let proceeds = amount * price;
        let fee = self.costs.cost(proceeds);
        self.quote += proceeds - fee;
        self.base -= amount;
        Some(self.log_order(OrderSide::Sell, order_type, amount, price, fee))
    }

    fn log_order(
        &mut self,
        side: OrderSide,
        order_type: OrderType,
        amount: Decimal,
        price: Decimal,
        fee: Decimal,
    ) -> OrderResult {
        self.order_count += 1;
        let order = OrderResult {
            id: format!("paper-{}", self.order_count),
            client_order_id: Uuid::new_v4(),
            side,
            order_type,
            amount,
            filled: amount,
            price,
            cost: amount * price,
            fee,
        };
        tracing::info!(
            side = ?order.side,
            order_type = ?order.order_type,
            %amount,
            %price,
            %fee,
            "PAPER fill"
        );
        self.trade_log.push(order.clone());
        order
    }
}

#[async_trait]
impl Broker for PaperBroker {
    async fn get_balance(&mut self) -> Result<Balance, ExecutionError> {
        Ok(Balance {
            quote_free: self.quote,
            quote_total: self.quote + self.base * self.last_price,
            base_free: self.base,
            base_total: self.base,
        })
    }

    async fn get_ticker(&mut self) -> Result<Ticker, ExecutionError> {
        // Synthetic 1bp half-spread around the mark.
        let spread = self.last_price * dec!(0.0001);
        Ok(Ticker {
            bid: self.last_price - spread,
            ask: self.last_price + spread,
            last: self.last_price,
            volume: Decimal::ZERO,
        })
    }

    async fn market_buy(
        &mut self,
        amount: Decimal,
    ) -> Result<Option<OrderResult>, ExecutionError> {
        Ok(self.fill_buy(amount, self.last_price, OrderType::Market))
    }

    async fn market_sell(
        &mut self,
        amount: Decimal,
    ) -> Result<Option<OrderResult>, ExecutionError> {
        Ok(self.fill_sell(amount, self.last_price, OrderType::Market))
    }

    /// Paper semantics: limit orders execute immediately at the limit price.
    async fn limit_buy(
        &mut self,
        amount: Decimal,
        price: Decimal,
    ) -> Result<Option<OrderResult>, ExecutionError> {
        Ok(self.fill_buy(amount, price, OrderType::Limit))
    }

    async fn limit_sell(
        &mut self,
        amount: Decimal,
        price: Decimal,
    ) -> Result<Option<OrderResult>, ExecutionError> {
        Ok(self.fill_sell(amount, price, OrderType::Limit))
    }

    async fn cancel_all_orders(&mut self) -> Result<bool, ExecutionError> {
        // Nothing rests on the paper book; everything fills instantly.
        Ok(true)
    }

    fn set_price(&mut self, price: Decimal) {
        self.last_price = price;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broker() -> PaperBroker {
        PaperBroker::new(dec!(10000), CostModel::new(dec!(0), dec!(0.0005)))
    }

    #[tokio::test]
    async fn initial_balance_is_all_cash() {
        let mut b = broker();
        let bal = b.get_balance().await.unwrap();
        assert_eq!(bal.quote_free, dec!(10000));
        assert_eq!(bal.base_free, dec!(0));
    }

    #[tokio::test]
    async fn market_buy_deducts_cost_plus_fee() {
        let mut b = broker();
        b.set_price(dec!(50000));
        let order = b.market_buy(dec!(0.1)).await.unwrap().unwrap();
        assert_eq!(order.filled, dec!(0.1));

        // Cost: 0.1 * 50000 = 5000, fee: 5000 * 0.0005 = 2.5
        let bal = b.get_balance().await.unwrap();
        assert_eq!(bal.quote_free, dec!(4997.5));
        assert_eq!(bal.base_free, dec!(0.1));
    }

    #[tokio::test]
    async fn exact_deduction_matches_cost_model() {
        let mut b = broker();
        b.set_price(dec!(50000));
        b.market_buy(dec!(0.1)).await.unwrap().unwrap();
        // 0.1 * 50000 * 1.0005 = 5002.5 deducted in total.
        let bal = b.get_balance().await.unwrap();
        assert_eq!(dec!(10000) - bal.quote_free, dec!(5002.5));
    }

    #[tokio::test]
    async fn insufficient_funds_rejects_without_error() {
        let mut b = broker();
        b.set_price(dec!(50000));
        // 1 BTC at 50000 exceeds 10000 cash.
        let order = b.market_buy(dec!(1)).await.unwrap();
        assert!(order.is_none());
        let bal = b.get_balance().await.unwrap();
        assert_eq!(bal.quote_free, dec!(10000));
    }

    #[tokio::test]
    async fn selling_more_than_inventory_rejects() {
        let mut b = broker();
        let order = b.market_sell(dec!(0.1)).await.unwrap();
        assert!(order.is_none());
    }

    #[tokio::test]
    async fn round_trip_returns_inventory_to_zero() {
        let mut b = broker();
        b.set_price(dec!(50000));
        b.market_buy(dec!(0.1)).await.unwrap().unwrap();
        b.market_sell(dec!(0.1)).await.unwrap().unwrap();
        let bal = b.get_balance().await.unwrap();
        assert_eq!(bal.base_free, dec!(0));
        // Two proportional fees were paid.
        assert!(bal.quote_free < dec!(10000));
    }

    #[tokio::test]
    async fn ticker_straddles_the_mark() {
        let mut b = broker();
        b.set_price(dec!(60000));
        let t = b.get_ticker().await.unwrap();
        assert_eq!(t.last, dec!(60000));
        assert!(t.bid < t.last && t.last < t.ask);
    }

    #[tokio::test]
    async fn limit_orders_fill_at_the_limit_price() {
        let mut b = broker();
        let order = b.limit_buy(dec!(0.01), dec!(49000)).await.unwrap().unwrap();
        assert_eq!(order.price, dec!(49000));
        assert_eq!(order.order_type, OrderType::Limit);

        let sell = b.limit_sell(dec!(0.01), dec!(51000)).await.unwrap().unwrap();
        assert_eq!(sell.price, dec!(51000));
        let bal = b.get_balance().await.unwrap();
        assert_eq!(bal.base_free, dec!(0));
    }

    #[tokio::test]
    async fn every_fill_is_one_log_entry() {
        let mut b = broker();
        b.set_price(dec!(50000));
        b.market_buy(dec!(0.01)).await.unwrap();
        b.market_sell(dec!(0.01)).await.unwrap();
        assert_eq!(b.trade_log().len(), 2);
        assert_eq!(b.trade_log()[0].side, OrderSide::Buy);
        assert_eq!(b.trade_log()[1].side, OrderSide::Sell);
        assert_eq!(b.trade_log()[0].id, "paper-1");
        assert_eq!(b.trade_log()[1].id, "paper-2");
    }

    #[tokio::test]
    async fn cancel_all_acknowledges() {
        let mut b = broker();
        assert!(b.cancel_all_orders().await.unwrap());
    }
}
