// src/strategies/traits.rs
use crate::core::indicator::MovingAverageSet;
use crate::error::BotResult;
use crate::types::Signal;
use rust_decimal::Decimal;

pub trait Strategy: Send + Sync {
    fn name(&self) -> String;

    /// Periods the strategy reads from the average set.
    fn required_periods(&self) -> Vec<usize>;

    /// Direction and entry price, or Hold. Pure: same inputs, same answer.
    fn evaluate(&self, current_price: Decimal, averages: &MovingAverageSet) -> BotResult<Signal>;

    /// Unrounded order quantity. Lot-size rounding belongs to the gateway.
    fn size_order(&self, balance: Decimal, leverage: Decimal, current_price: Decimal)
        -> BotResult<Decimal>;
}
