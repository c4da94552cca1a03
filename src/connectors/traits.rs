use crate::types::{AccountState, OpenOrder, OrderAck, OrderRequest};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// Balance plus every one-way position record. `symbol` is the one the run trades;
    /// records for other symbols may be present too.
    async fn fetch_account_state(&self, symbol: &str) -> Result<AccountState>;
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Close prices, oldest first. The last element is the still-forming candle.
    async fn fetch_close_series(&self, symbol: &str, interval: &str, limit: u16)
        -> Result<Vec<Decimal>>;
}

#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn fetch_open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>>;

    async fn cancel_all_orders(&self, symbol: &str) -> Result<()>;

    /// Sends the request once. Rounds price/quantity to exchange precision first.
    async fn submit_order(&self, request: &OrderRequest) -> Result<OrderAck>;
}

/// Everything a run needs from the exchange.
pub trait ExchangeClient: AccountProvider + MarketDataProvider + OrderGateway {}

impl<T> ExchangeClient for T where T: AccountProvider + MarketDataProvider + OrderGateway {}
