// Core modules
pub mod config;
pub mod connectors;
pub mod core;
pub mod error;
pub mod logging;
pub mod strategies;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{BotError, BotResult};
pub use types::*;
