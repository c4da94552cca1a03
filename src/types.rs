// src/types.rs
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One-way mode only: a symbol carries a single net position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    Both,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Both => "BOTH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Limit,
    StopMarket,
    TakeProfitMarket,
    #[serde(other)]
    Other,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Limit => "LIMIT",
            OrderType::StopMarket => "STOP_MARKET",
            OrderType::TakeProfitMarket => "TAKE_PROFIT_MARKET",
            OrderType::Other => "OTHER",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    Gtc,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Gtc => "GTC",
        }
    }
}

/// Which part of a run an order belongs to. Used for client ids and error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderLeg {
    Entry,
    StopLoss,
    TakeProfit,
}

impl OrderLeg {
    pub fn tag(&self) -> &'static str {
        match self {
            OrderLeg::Entry => "entry",
            OrderLeg::StopLoss => "sl",
            OrderLeg::TakeProfit => "tp",
        }
    }
}

impl fmt::Display for OrderLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderLeg::Entry => "entry",
            OrderLeg::StopLoss => "stop-loss",
            OrderLeg::TakeProfit => "take-profit",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Advice(Side, Decimal),
    Hold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Signed: positive = long, negative = short, zero = flat.
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub leverage: Decimal,
}

impl Position {
    pub fn is_open(&self) -> bool {
        !self.quantity.is_zero()
    }

    /// Side of the order that closes this position. A short is closed by buying,
    /// a long by selling. Flat positions have nothing to close.
    pub fn closing_side(&self) -> Option<Side> {
        if self.quantity < Decimal::ZERO {
            Some(Side::Buy)
        } else if self.quantity > Decimal::ZERO {
            Some(Side::Sell)
        } else {
            None
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct AccountState {
    pub margin_balance: Decimal,
    pub positions: HashMap<String, Position>,
}

impl AccountState {
    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn open_position(&self, symbol: &str) -> Option<&Position> {
        self.position(symbol).filter(|p| p.is_open())
    }

    pub fn leverage(&self, symbol: &str) -> Option<Decimal> {
        self.position(symbol).map(|p| p.leverage)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenOrder {
    pub symbol: String,
    pub client_order_id: String,
    pub order_type: OrderType,
    pub side: Side,
}

/// Built once per decision and sent once. Never mutated after submission.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub leg: OrderLeg,
    pub symbol: String,
    pub side: Side,
    pub position_side: PositionSide,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub close_position: bool,
}

impl OrderRequest {
    pub fn limit(symbol: &str, side: Side, price: Decimal, quantity: Decimal) -> Self {
        Self {
            leg: OrderLeg::Entry,
            symbol: symbol.to_string(),
            side,
            position_side: PositionSide::Both,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Gtc,
            price: Some(price),
            stop_price: None,
            quantity: Some(quantity),
            close_position: false,
        }
    }

    /// Trigger order that closes the whole position, so it carries no quantity.
    pub fn close_position(
        leg: OrderLeg,
        symbol: &str,
        side: Side,
        order_type: OrderType,
        stop_price: Decimal,
    ) -> Self {
        Self {
            leg,
            symbol: symbol.to_string(),
            side,
            position_side: PositionSide::Both,
            order_type,
            time_in_force: TimeInForce::Gtc,
            price: None,
            stop_price: Some(stop_price),
            quantity: None,
            close_position: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    pub id: String,
    pub client_order_id: String,
    pub symbol: String,
    pub status: String,
}

impl OrderAck {
    pub fn paper(request: &OrderRequest) -> Self {
        Self {
            id: "0".to_string(),
            client_order_id: format!("paper-{}", request.leg.tag()),
            symbol: request.symbol.clone(),
            status: "PAPER".to_string(),
        }
    }
}
