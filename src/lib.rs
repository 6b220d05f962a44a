//! Mood-tomorrow classifier: training pipeline, artifact contract, and single-shot inference.
/// On-disk model, encoder, and sidecar files.
pub mod artifacts;
/// Trainer configuration.
pub mod config;
/// Training CSV loading and splitting.
pub mod dataset;
/// Wellness feature layout and projection.
pub mod features;
/// Tracing setup for the binaries.
pub mod logging;
/// Random forest, label encoder, and metrics.
pub mod ml;
/// Inference against persisted artifacts.
pub mod predictor;
/// Synthetic training data.
pub mod synth;
/// Training pipeline.
pub mod trainer;
