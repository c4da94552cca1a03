// src/config.rs

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

/// Fast/medium/slow averages that define the trend. The reference EMA comes from `mode`.
pub const TREND_PERIODS: [usize; 3] = [20, 50, 100];

/// Binance futures caps `/fapi/v1/klines` at this many candles per request.
pub const MAX_KLINE_LIMIT: u16 = 1500;

const INTERVALS: [&str; 15] = [
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w", "1M",
];

#[derive(Debug, Deserialize, Clone)]
pub struct TradingConfig {
    pub symbol: String,
    pub interval: String,
    /// Reference average, written as `ema<period>` (e.g. `ema50`).
    pub mode: String,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    /// Fraction of full leveraged notional committed per entry.
    pub size_fraction: Decimal,
    #[serde(default = "default_kline_limit")]
    pub kline_limit: u16,
    #[serde(default = "default_true")]
    pub cancel_orders_when_flat: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub secret_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_recv_window")]
    pub recv_window: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub live_trading: bool,
    #[serde(default)]
    pub log_dir: Option<String>,
    #[serde(default = "default_tick_size")]
    pub symbol_tick_size: Decimal,
    #[serde(default = "default_step_size")]
    pub symbol_step_size: Decimal,
    pub trading: TradingConfig,
}

fn default_kline_limit() -> u16 {
    600
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://fapi.binance.com".to_string()
}

fn default_recv_window() -> u64 {
    5000
}

fn default_request_timeout_ms() -> u64 {
    2000
}

fn default_tick_size() -> Decimal {
    Decimal::new(1, 1)
}

fn default_step_size() -> Decimal {
    Decimal::new(1, 3)
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("Settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        Self::from_config(builder.build()?)
    }

    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() || self.secret_key.trim().is_empty() {
            return Err(invalid("api_key and secret_key must be set"));
        }
        Url::parse(&self.base_url)
            .map_err(|e| invalid(format!("base_url {:?} is not a URL: {}", self.base_url, e)))?;
        if self.recv_window == 0 || self.recv_window > 60_000 {
            return Err(invalid("recv_window must be within 1..=60000 ms"));
        }
        if self.request_timeout_ms == 0 {
            return Err(invalid("request_timeout_ms must be positive"));
        }
        if self.symbol_tick_size <= Decimal::ZERO || self.symbol_step_size <= Decimal::ZERO {
            return Err(invalid("symbol_tick_size and symbol_step_size must be positive"));
        }
        self.trading.validate()
    }
}

impl TradingConfig {
    /// Period of the reference EMA named by `mode`.
    pub fn reference_period(&self) -> Result<usize, ConfigError> {
        let digits = self
            .mode
            .trim()
            .to_ascii_lowercase()
            .strip_prefix("ema")
            .map(str::to_string)
            .ok_or_else(|| invalid(format!("mode {:?} must look like ema<period>", self.mode)))?;
        match digits.parse::<usize>() {
            Ok(period) if period > 0 => Ok(period),
            _ => Err(invalid(format!("mode {:?} has no valid EMA period", self.mode))),
        }
    }

    /// Every period the signal needs, trend periods first, deduplicated.
    pub fn required_periods(&self) -> Result<Vec<usize>, ConfigError> {
        Ok(trend_periods_with(self.reference_period()?))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(invalid("trading.symbol must be set"));
        }
        if !INTERVALS.contains(&self.interval.as_str()) {
            return Err(invalid(format!(
                "trading.interval {:?} is not a kline interval",
                self.interval
            )));
        }
        check_fraction("trading.stop_loss", self.stop_loss)?;
        check_fraction("trading.take_profit", self.take_profit)?;
        if self.size_fraction <= Decimal::ZERO || self.size_fraction > Decimal::ONE {
            return Err(invalid("trading.size_fraction must be in (0, 1]"));
        }

        let longest = self
            .required_periods()?
            .into_iter()
            .max()
            .unwrap_or_default();
        if usize::from(self.kline_limit) <= longest {
            return Err(invalid(format!(
                "trading.kline_limit {} must exceed the longest EMA period {}",
                self.kline_limit, longest
            )));
        }
        if self.kline_limit > MAX_KLINE_LIMIT {
            return Err(invalid(format!(
                "trading.kline_limit {} exceeds the exchange maximum {}",
                self.kline_limit, MAX_KLINE_LIMIT
            )));
        }
        Ok(())
    }
}

/// Trend periods plus the reference EMA, deduplicated. Shared by config
/// validation and the strategy so the history check and the engine agree.
pub fn trend_periods_with(reference: usize) -> Vec<usize> {
    let mut periods = TREND_PERIODS.to_vec();
    if !periods.contains(&reference) {
        periods.push(reference);
    }
    periods
}

fn check_fraction(name: &str, value: Decimal) -> Result<(), ConfigError> {
    if value <= Decimal::ZERO || value >= Decimal::ONE {
        return Err(invalid(format!("{} must be in (0, 1), got {}", name, value)));
    }
    Ok(())
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Message(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use std::str::FromStr;

    const VALID: &str = r#"
        api_key = "key"
        secret_key = "secret"

        [trading]
        symbol = "BTCUSDT"
        interval = "1h"
        mode = "ema50"
        stop_loss = "0.02"
        take_profit = "0.03"
        size_fraction = "0.5"
    "#;

    fn load(toml: &str) -> Result<AppConfig, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        AppConfig::from_config(config)
    }

    #[test]
    fn test_loads_with_defaults() {
        let cfg = load(VALID).unwrap();
        assert_eq!(cfg.base_url, "https://fapi.binance.com");
        assert!(!cfg.live_trading);
        assert_eq!(cfg.trading.kline_limit, 600);
        assert!(cfg.trading.cancel_orders_when_flat);
        assert_eq!(cfg.trading.stop_loss, Decimal::from_str("0.02").unwrap());
        assert_eq!(cfg.trading.reference_period().unwrap(), 50);
    }

    #[test]
    fn test_missing_stop_loss_is_fatal() {
        let toml = VALID.replace("stop_loss = \"0.02\"", "");
        assert!(load(&toml).is_err());
    }

    #[test]
    fn test_non_positive_fractions_rejected() {
        let zero_sl = VALID.replace("stop_loss = \"0.02\"", "stop_loss = \"0\"");
        assert!(load(&zero_sl).is_err());

        let negative_tp = VALID.replace("take_profit = \"0.03\"", "take_profit = \"-0.01\"");
        assert!(load(&negative_tp).is_err());

        let oversized = VALID.replace("size_fraction = \"0.5\"", "size_fraction = \"1.5\"");
        assert!(load(&oversized).is_err());
    }

    #[test]
    fn test_mode_parsing() {
        let mut cfg = load(VALID).unwrap().trading;
        cfg.mode = "EMA200".to_string();
        assert_eq!(cfg.reference_period().unwrap(), 200);

        cfg.mode = "sma50".to_string();
        assert!(cfg.reference_period().is_err());

        cfg.mode = "ema0".to_string();
        assert!(cfg.reference_period().is_err());
    }

    #[test]
    fn test_required_periods_deduplicates_reference() {
        let mut cfg = load(VALID).unwrap().trading;
        assert_eq!(cfg.required_periods().unwrap(), vec![20, 50, 100]);

        cfg.mode = "ema200".to_string();
        assert_eq!(cfg.required_periods().unwrap(), vec![20, 50, 100, 200]);
    }

    #[test]
    fn test_kline_limit_must_exceed_longest_period() {
        let toml = VALID.replace("mode = \"ema50\"", "mode = \"ema600\"");
        assert!(load(&toml).is_err());

        let toml = format!("{}\nkline_limit = 100", VALID);
        assert!(load(&toml).is_err());
    }

    #[test]
    fn test_unknown_interval_rejected() {
        let toml = VALID.replace("interval = \"1h\"", "interval = \"7m\"");
        assert!(load(&toml).is_err());
    }
}
