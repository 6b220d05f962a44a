//! Wellness feature vector layout.
//!
//! Callers hand over a named mapping; the model consumes an ordered row. Rows are always built
//! by field name against the column order persisted with the model, never by position.

use serde_json::Value;
use thiserror::Error;

/// Number of numeric fields in a wellness feature vector.
pub const FEATURE_COUNT: usize = 11;

/// Feature columns in the order used for training.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "mood_today",
    "avg_mood_last_3_days",
    "sleep_hours",
    "sleep_quality",
    "exercise_minutes",
    "stress_level",
    "screen_time",
    "social_interaction_minutes",
    "water_intake_liters",
    "productivity_level",
    "anxiety_level",
];

/// CSV column holding the prediction target.
pub const LABEL_COLUMN: &str = "mood_tomorrow_label";

/// Errors raised while turning a named mapping into a feature row.
#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    /// The input was not a JSON object.
    #[error("features must be a JSON object")]
    NotAnObject,
    /// A required field was absent.
    #[error("missing required feature '{name}'")]
    Missing { name: String },
    /// A field was present but not a number.
    #[error("feature '{name}' must be a number, got {value}")]
    NotNumeric { name: String, value: String },
}

/// Owned list of the default feature column names.
pub fn default_feature_names() -> Vec<String> {
    FEATURE_COLUMNS.iter().map(|name| (*name).to_string()).collect()
}

/// Project a JSON object into a row following `order`.
///
/// Extra keys are ignored. The first missing or non-numeric field in `order` fails the projection.
pub fn project(features: &Value, order: &[String]) -> Result<Vec<f32>, FeatureError> {
    let map = features.as_object().ok_or(FeatureError::NotAnObject)?;
    let mut row = Vec::with_capacity(order.len());
    for name in order {
        let value = map.get(name).ok_or_else(|| FeatureError::Missing {
            name: name.clone(),
        })?;
        let number = value.as_f64().ok_or_else(|| FeatureError::NotNumeric {
            name: name.clone(),
            value: value.to_string(),
        })?;
        row.push(number as f32);
    }
    Ok(row)
}
