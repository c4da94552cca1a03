// src/error.rs
use crate::types::OrderLeg;
use thiserror::Error;

pub type BotResult<T> = std::result::Result<T, BotError>;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{what} unavailable: {source}")]
    DataUnavailable {
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("insufficient data: EMA{period} needs {period} close prices, got {available}")]
    InsufficientData { period: usize, available: usize },

    #[error("invalid EMA period: {0}")]
    InvalidPeriod(usize),

    #[error("moving average ema{0} was not computed")]
    MissingAverage(usize),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{leg} order rejected: {source}")]
    OrderRejected {
        leg: OrderLeg,
        #[source]
        source: anyhow::Error,
    },

    #[error("bracket incomplete: {placed} order is live but {failed} order failed: {source}")]
    PartialBracket {
        placed: OrderLeg,
        failed: OrderLeg,
        #[source]
        source: anyhow::Error,
    },
}

impl BotError {
    pub fn data(what: &'static str, source: anyhow::Error) -> Self {
        BotError::DataUnavailable { what, source }
    }
}

impl From<config::ConfigError> for BotError {
    fn from(err: config::ConfigError) -> Self {
        BotError::Config(err.to_string())
    }
}
