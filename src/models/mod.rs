//! Data models

mod prediction;

pub use prediction::Prediction;
