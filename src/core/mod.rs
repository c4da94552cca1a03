pub mod bracket;
pub mod engine;
pub mod indicator;
pub mod reconciler;
