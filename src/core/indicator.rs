// src/core/indicator.rs
use crate::error::{BotError, BotResult};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use ta::indicators::ExponentialMovingAverage;
use ta::Next;

/// Full EMA series over `prices`, one value per input.
///
/// Seeded with the first price, then `ema[i] = price[i] * k + ema[i-1] * (1 - k)`
/// with `k = 2 / (period + 1)`. Fails when fewer than `period` prices are given.
pub fn ema_series(prices: &[f64], period: usize) -> BotResult<Vec<f64>> {
    if period == 0 {
        return Err(BotError::InvalidPeriod(period));
    }
    if prices.len() < period {
        return Err(BotError::InsufficientData {
            period,
            available: prices.len(),
        });
    }

    let mut ema = ExponentialMovingAverage::new(period).map_err(|_| BotError::InvalidPeriod(period))?;
    Ok(prices.iter().map(|&price| ema.next(price)).collect())
}

/// Latest value of the EMA. The whole window is still walked because the average is path dependent.
pub fn ema_latest(prices: &[f64], period: usize) -> BotResult<f64> {
    ema_series(prices, period)?
        .last()
        .copied()
        .ok_or(BotError::InsufficientData {
            period,
            available: 0,
        })
}

/// Latest EMA values keyed by period, all computed over the same closes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovingAverageSet {
    values: BTreeMap<usize, Decimal>,
}

impl MovingAverageSet {
    pub fn compute(closes: &[Decimal], periods: &[usize]) -> BotResult<Self> {
        let prices = closes
            .iter()
            .map(|c| {
                c.to_f64()
                    .ok_or_else(|| BotError::InvalidInput(format!("close price {} is not representable", c)))
            })
            .collect::<BotResult<Vec<f64>>>()?;

        let mut values = BTreeMap::new();
        for &period in periods {
            let latest = ema_latest(&prices, period)?;
            let value = Decimal::from_f64(latest).ok_or_else(|| {
                BotError::InvalidInput(format!("ema{} produced a non-finite value", period))
            })?;
            values.insert(period, value);
        }
        Ok(Self { values })
    }

    pub fn from_values(values: impl IntoIterator<Item = (usize, Decimal)>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn get(&self, period: usize) -> Option<Decimal> {
        self.values.get(&period).copied()
    }

    pub fn require(&self, period: usize) -> BotResult<Decimal> {
        self.get(period).ok_or(BotError::MissingAverage(period))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for MovingAverageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|(period, value)| format!("ema{}={}", period, value.round_dp(2)))
            .collect();
        f.write_str(&parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_constant_series_is_flat() {
        let prices = vec![42.5; 120];
        for period in [1, 20, 50, 100] {
            let series = ema_series(&prices, period).unwrap();
            assert!(series.iter().all(|v| close(*v, 42.5)));
        }
    }

    #[test]
    fn test_series_length_matches_input() {
        let prices: Vec<f64> = (0..75).map(|i| 100.0 + (i as f64).sin()).collect();
        assert_eq!(ema_series(&prices, 20).unwrap().len(), prices.len());
    }

    #[test]
    fn test_recurrence_seeded_with_first_price() {
        // k = 0.5 for period 3
        let series = ema_series(&[10.0, 20.0, 30.0, 40.0], 3).unwrap();
        assert_eq!(series, vec![10.0, 15.0, 22.5, 31.25]);
    }

    #[test]
    fn test_insufficient_history() {
        let prices = vec![100.0; 150];
        match ema_latest(&prices, 200) {
            Err(BotError::InsufficientData { period, available }) => {
                assert_eq!(period, 200);
                assert_eq!(available, 150);
            }
            other => panic!("expected InsufficientData, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_period_rejected() {
        assert!(matches!(
            ema_series(&[1.0], 0),
            Err(BotError::InvalidPeriod(0))
        ));
    }

    #[test]
    fn test_average_set_orders_uptrend() {
        let closes: Vec<Decimal> = (1..=300).map(Decimal::from).collect();
        let set = MovingAverageSet::compute(&closes, &[20, 50, 100]).unwrap();
        assert_eq!(set.len(), 3);
        assert!(!set.is_empty());
        assert!(MovingAverageSet::default().is_empty());
        let (e20, e50, e100) = (set.get(20).unwrap(), set.get(50).unwrap(), set.get(100).unwrap());
        assert!(e20 > e50 && e50 > e100);
        assert!(matches!(set.require(200), Err(BotError::MissingAverage(200))));
    }
}
