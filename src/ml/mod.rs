//! Machine learning building blocks for training and inference.
//!
//! Everything here is deterministic for a fixed seed and exports to JSON.

pub mod forest;
pub mod label_encoder;
pub mod metrics;
