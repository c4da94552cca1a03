// src/strategies/ema_trend.rs
use crate::config::{trend_periods_with, TradingConfig, TREND_PERIODS};
use crate::core::indicator::MovingAverageSet;
use crate::error::{BotError, BotResult};
use crate::strategies::traits::Strategy;
use crate::types::{Side, Signal};
use rust_decimal::Decimal;
use tracing::debug;

/// Trend-following entry on stacked EMAs.
///
/// * Long: price above the reference EMA and ema20 > ema50 > ema100.
/// * Short: price below the reference EMA and ema20 < ema50 < ema100.
///
/// Entries are limit orders resting at the reference EMA, not at market.
#[derive(Debug, Clone)]
pub struct EmaTrendStrategy {
    reference_period: usize,
    size_fraction: Decimal,
}

impl EmaTrendStrategy {
    pub fn new(reference_period: usize, size_fraction: Decimal) -> BotResult<Self> {
        if reference_period == 0 {
            return Err(BotError::InvalidPeriod(reference_period));
        }
        if size_fraction <= Decimal::ZERO || size_fraction > Decimal::ONE {
            return Err(BotError::Config(format!(
                "size fraction must be in (0, 1], got {}",
                size_fraction
            )));
        }
        Ok(Self {
            reference_period,
            size_fraction,
        })
    }

    pub fn from_config(config: &TradingConfig) -> BotResult<Self> {
        Self::new(config.reference_period()?, config.size_fraction)
    }

    pub fn reference_period(&self) -> usize {
        self.reference_period
    }
}

impl Strategy for EmaTrendStrategy {
    fn name(&self) -> String {
        format!("ema-trend(ema{})", self.reference_period())
    }

    fn required_periods(&self) -> Vec<usize> {
        trend_periods_with(self.reference_period)
    }

    fn evaluate(&self, current_price: Decimal, averages: &MovingAverageSet) -> BotResult<Signal> {
        let [fast, medium, slow] = TREND_PERIODS;
        let ema20 = averages.require(fast)?;
        let ema50 = averages.require(medium)?;
        let ema100 = averages.require(slow)?;
        let ema_x = averages.require(self.reference_period)?;

        debug!(
            %current_price, %ema20, %ema50, %ema100, %ema_x,
            "Evaluating trend"
        );

        if current_price > ema_x && ema20 > ema50 && ema50 > ema100 {
            return Ok(Signal::Advice(Side::Buy, ema_x));
        }
        if current_price < ema_x && ema20 < ema50 && ema50 < ema100 {
            return Ok(Signal::Advice(Side::Sell, ema_x));
        }
        Ok(Signal::Hold)
    }

    fn size_order(
        &self,
        balance: Decimal,
        leverage: Decimal,
        current_price: Decimal,
    ) -> BotResult<Decimal> {
        if current_price <= Decimal::ZERO {
            return Err(BotError::InvalidInput(format!(
                "current price must be positive, got {}",
                current_price
            )));
        }
        if balance <= Decimal::ZERO {
            return Err(BotError::InvalidInput(format!(
                "margin balance must be positive, got {}",
                balance
            )));
        }
        if leverage <= Decimal::ZERO {
            return Err(BotError::InvalidInput(format!(
                "leverage must be positive, got {}",
                leverage
            )));
        }
        Ok(balance * leverage / current_price * self.size_fraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn averages(ema20: &str, ema50: &str, ema100: &str) -> MovingAverageSet {
        MovingAverageSet::from_values([(20, d(ema20)), (50, d(ema50)), (100, d(ema100))])
    }

    fn strategy() -> EmaTrendStrategy {
        EmaTrendStrategy::new(50, d("0.5")).unwrap()
    }

    #[test]
    fn test_stacked_uptrend_goes_long_at_reference() {
        let signal = strategy().evaluate(d("110"), &averages("105", "100", "95")).unwrap();
        assert_eq!(signal, Signal::Advice(Side::Buy, d("100")));
    }

    #[test]
    fn test_stacked_downtrend_goes_short_at_reference() {
        let signal = strategy().evaluate(d("90"), &averages("95", "100", "105")).unwrap();
        assert_eq!(signal, Signal::Advice(Side::Sell, d("100")));
    }

    #[test]
    fn test_mixed_trend_holds() {
        let signal = strategy().evaluate(d("90"), &averages("95", "100", "99")).unwrap();
        assert_eq!(signal, Signal::Hold);
    }

    #[test]
    fn test_price_on_wrong_side_of_reference_holds() {
        let signal = strategy().evaluate(d("99"), &averages("105", "100", "95")).unwrap();
        assert_eq!(signal, Signal::Hold);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let s = strategy();
        let set = averages("105", "100", "95");
        let first = s.evaluate(d("110"), &set).unwrap();
        for _ in 0..10 {
            assert_eq!(s.evaluate(d("110"), &set).unwrap(), first);
        }
    }

    #[test]
    fn test_separate_reference_average() {
        let s = EmaTrendStrategy::new(200, d("0.5")).unwrap();
        let mut values = vec![(20, d("105")), (50, d("100")), (100, d("95"))];
        assert!(matches!(
            s.evaluate(d("110"), &MovingAverageSet::from_values(values.clone())),
            Err(BotError::MissingAverage(200))
        ));

        values.push((200, d("90")));
        let signal = s.evaluate(d("110"), &MovingAverageSet::from_values(values)).unwrap();
        assert_eq!(signal, Signal::Advice(Side::Buy, d("90")));
        assert_eq!(s.required_periods(), vec![20, 50, 100, 200]);
    }

    #[test]
    fn test_periods_match_config_history_check() {
        let config = TradingConfig {
            symbol: "BTCUSDT".to_string(),
            interval: "1h".to_string(),
            mode: "ema200".to_string(),
            stop_loss: d("0.02"),
            take_profit: d("0.02"),
            size_fraction: d("0.5"),
            kline_limit: 600,
            cancel_orders_when_flat: true,
        };
        let s = EmaTrendStrategy::from_config(&config).unwrap();
        assert_eq!(s.reference_period(), 200);
        assert_eq!(s.required_periods(), config.required_periods().unwrap());
        assert_eq!(s.name(), "ema-trend(ema200)");
    }

    #[test]
    fn test_quantity_sizing() {
        let qty = strategy().size_order(d("1000"), d("10"), d("20000")).unwrap();
        assert_eq!(qty, d("0.25"));
    }

    #[test]
    fn test_sizing_rejects_bad_inputs() {
        let s = strategy();
        assert!(s.size_order(d("1000"), d("10"), Decimal::ZERO).is_err());
        assert!(s.size_order(Decimal::ZERO, d("10"), d("100")).is_err());
        assert!(s.size_order(d("1000"), Decimal::ZERO, d("100")).is_err());
    }

    #[test]
    fn test_size_fraction_bounds() {
        assert!(EmaTrendStrategy::new(50, Decimal::ZERO).is_err());
        assert!(EmaTrendStrategy::new(50, d("1.01")).is_err());
        assert!(EmaTrendStrategy::new(50, Decimal::ONE).is_ok());
    }
}
