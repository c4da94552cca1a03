// src/connectors/messages.rs
use crate::types::{OrderType, Side};
use rust_decimal::Decimal;
use serde::Deserialize;

/// `GET /fapi/v2/account`. Only the fields the bot reads are mapped.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesAccount {
    pub total_margin_balance: Decimal,
    #[serde(default)]
    pub positions: Vec<FuturesPosition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesPosition {
    pub symbol: String,
    pub leverage: Decimal,
    pub entry_price: Decimal,
    pub position_amt: Decimal,
    /// "BOTH" in one-way mode, "LONG"/"SHORT" in hedge mode.
    #[serde(default = "default_position_side")]
    pub position_side: String,
}

fn default_position_side() -> String {
    "BOTH".to_string()
}

/// One element of `GET /fapi/v1/openOrders`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesOpenOrder {
    pub symbol: String,
    pub client_order_id: String,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: Side,
}

/// `POST /fapi/v1/order` acknowledgement.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesOrderAck {
    pub order_id: u64,
    pub client_order_id: String,
    pub symbol: String,
    pub status: String,
}

/// Error body Binance returns alongside 4xx/5xx statuses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    pub msg: String,
}

/// Close price sits at index 4 of each kline row and is sent as a string.
pub const KLINE_CLOSE_INDEX: usize = 4;
