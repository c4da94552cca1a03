pub mod ema_trend;
pub mod traits;
