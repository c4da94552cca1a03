// src/core/bracket.rs
use crate::error::{BotError, BotResult};
use crate::types::{OrderLeg, OrderRequest, OrderType, Side};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketPrices {
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bracket {
    pub stop_loss: OrderRequest,
    pub take_profit: OrderRequest,
}

/// Derives stop-loss / take-profit triggers from an entry price.
#[derive(Debug, Clone, Copy)]
pub struct BracketBuilder {
    stop_loss: Decimal,
    take_profit: Decimal,
}

impl BracketBuilder {
    /// Fractions are offsets from entry, e.g. 0.02 = 2%. Both must be positive.
    pub fn new(stop_loss: Decimal, take_profit: Decimal) -> BotResult<Self> {
        if stop_loss <= Decimal::ZERO || take_profit <= Decimal::ZERO {
            return Err(BotError::Config(format!(
                "bracket fractions must be positive (stop_loss={}, take_profit={})",
                stop_loss, take_profit
            )));
        }
        Ok(Self {
            stop_loss,
            take_profit,
        })
    }

    /// `closing_side` is the side that exits the position: SELL for a long, BUY for a short.
    pub fn prices(&self, entry_price: Decimal, closing_side: Side) -> BracketPrices {
        match closing_side {
            Side::Sell => BracketPrices {
                stop_loss: entry_price * (Decimal::ONE - self.stop_loss),
                take_profit: entry_price * (Decimal::ONE + self.take_profit),
            },
            Side::Buy => BracketPrices {
                stop_loss: entry_price * (Decimal::ONE + self.stop_loss),
                take_profit: entry_price * (Decimal::ONE - self.take_profit),
            },
        }
    }

    pub fn build(&self, symbol: &str, entry_price: Decimal, closing_side: Side) -> Bracket {
        let prices = self.prices(entry_price, closing_side);
        Bracket {
            stop_loss: OrderRequest::close_position(
                OrderLeg::StopLoss,
                symbol,
                closing_side,
                OrderType::StopMarket,
                prices.stop_loss,
            ),
            take_profit: OrderRequest::close_position(
                OrderLeg::TakeProfit,
                symbol,
                closing_side,
                OrderType::TakeProfitMarket,
                prices.take_profit,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PositionSide, TimeInForce};
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn builder() -> BracketBuilder {
        BracketBuilder::new(d("0.02"), d("0.02")).unwrap()
    }

    #[test]
    fn test_short_bracket_prices() {
        let bracket = builder().build("BTCUSDT", d("20000"), Side::Buy);

        assert_eq!(bracket.stop_loss.side, Side::Buy);
        assert_eq!(bracket.stop_loss.order_type, OrderType::StopMarket);
        assert_eq!(bracket.stop_loss.stop_price, Some(d("20400")));

        assert_eq!(bracket.take_profit.side, Side::Buy);
        assert_eq!(bracket.take_profit.order_type, OrderType::TakeProfitMarket);
        assert_eq!(bracket.take_profit.stop_price, Some(d("19600")));
    }

    #[test]
    fn test_long_bracket_prices() {
        let prices = BracketBuilder::new(d("0.01"), d("0.03"))
            .unwrap()
            .prices(d("100"), Side::Sell);
        assert_eq!(prices.stop_loss, d("99"));
        assert_eq!(prices.take_profit, d("103"));
    }

    #[test]
    fn test_sign_invariant() {
        let entry = d("31337.5");
        let short = builder().prices(entry, Side::Buy);
        assert!(short.stop_loss > entry && short.take_profit < entry);

        let long = builder().prices(entry, Side::Sell);
        assert!(long.stop_loss < entry && long.take_profit > entry);
    }

    #[test]
    fn test_legs_close_whole_position() {
        let bracket = builder().build("BTCUSDT", d("20000"), Side::Sell);
        for leg in [&bracket.stop_loss, &bracket.take_profit] {
            assert!(leg.close_position);
            assert_eq!(leg.quantity, None);
            assert_eq!(leg.price, None);
            assert_eq!(leg.position_side, PositionSide::Both);
            assert_eq!(leg.time_in_force, TimeInForce::Gtc);
            assert_eq!(leg.symbol, "BTCUSDT");
        }
    }

    #[test]
    fn test_non_positive_fraction_rejected() {
        assert!(BracketBuilder::new(Decimal::ZERO, d("0.02")).is_err());
        assert!(BracketBuilder::new(d("0.02"), d("-0.01")).is_err());
    }
}
