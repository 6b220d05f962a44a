//! Seeded synthetic wellness data for exercising the trainer end to end.
//!
//! Today's metrics are drawn from plausible daily ranges. Tomorrow's mood, stress, and anxiety are
//! derived from them with noise, and the label follows a fixed rule: high stress or anxiety is
//! "stressed", otherwise a high mood is "happy", a low mood is "sad", and the rest is "neutral".

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::features::{FEATURE_COLUMNS, FEATURE_COUNT, LABEL_COLUMN};

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: csv::Error,
    },
    #[error("Failed to flush {path}: {source}")]
    Flush {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One generated day: today's metrics and tomorrow's mood label.
#[derive(Debug, Clone, PartialEq)]
pub struct WellnessRecord {
    /// Values in feature column order.
    pub features: [f32; FEATURE_COUNT],
    pub label: String,
}

/// Label tomorrow's state from its mood, stress, and anxiety.
pub fn label_for(mood: f32, stress: f32, anxiety: f32) -> &'static str {
    if stress >= 7.0 || anxiety >= 7.0 {
        "stressed"
    } else if mood >= 7.0 {
        "happy"
    } else if mood <= 3.0 {
        "sad"
    } else {
        "neutral"
    }
}

/// Generate `rows` records; the same seed always yields the same records.
pub fn generate(rows: usize, seed: u64) -> Vec<WellnessRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..rows).map(|_| generate_one(&mut rng)).collect()
}

fn generate_one(rng: &mut StdRng) -> WellnessRecord {
    let mood_today = rng.random_range(1..=10) as f32;
    let avg_mood = round1((mood_today + rng.random_range(-2.0f32..2.0)).clamp(1.0, 10.0));
    let sleep_hours = round1(rng.random_range(4.0f32..10.0));
    let sleep_quality = rng.random_range(1..=10) as f32;
    let exercise_minutes = rng.random_range(0..=120) as f32;
    let stress_level = rng.random_range(1..=10) as f32;
    let screen_time = round1(rng.random_range(1.0f32..12.0));
    let social_minutes = rng.random_range(0..=180) as f32;
    let water_liters = round1(rng.random_range(0.5f32..4.5));
    let productivity = rng.random_range(1..=10) as f32;
    let anxiety_level = rng.random_range(1..=10) as f32;

    let mood_tomorrow = (0.45 * mood_today
        + 0.25 * avg_mood
        + 0.3 * (sleep_hours - 7.0)
        + 0.15 * (sleep_quality - 5.0)
        + 0.01 * (exercise_minutes - 30.0)
        - 0.2 * (stress_level - 5.0)
        - 0.1 * (screen_time - 5.0)
        + 0.005 * (social_minutes - 60.0)
        + 0.1 * (productivity - 5.0)
        - 0.15 * (anxiety_level - 5.0)
        + 1.5
        + rng.random_range(-1.0f32..1.0))
    .clamp(1.0, 10.0);
    let stress_tomorrow = stress_level - 0.01 * exercise_minutes + rng.random_range(-1.5f32..1.5);
    let anxiety_tomorrow =
        anxiety_level - 0.2 * (sleep_quality - 5.0) + rng.random_range(-1.5f32..1.5);

    WellnessRecord {
        features: [
            mood_today,
            avg_mood,
            sleep_hours,
            sleep_quality,
            exercise_minutes,
            stress_level,
            screen_time,
            social_minutes,
            water_liters,
            productivity,
            anxiety_level,
        ],
        label: label_for(mood_tomorrow, stress_tomorrow, anxiety_tomorrow).to_string(),
    }
}

fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

/// Write records as a training CSV with a header row.
pub fn write_csv(path: &Path, records: &[WellnessRecord]) -> Result<(), SynthError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| SynthError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let write_err = |source| SynthError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(write_err)?;
    let mut header: Vec<&str> = FEATURE_COLUMNS.to_vec();
    header.push(LABEL_COLUMN);
    writer.write_record(&header).map_err(write_err)?;
    for record in records {
        let mut row: Vec<String> = record.features.iter().map(|v| v.to_string()).collect();
        row.push(record.label.clone());
        writer.write_record(&row).map_err(write_err)?;
    }
    writer.flush().map_err(|source| SynthError::Flush {
        path: path.to_path_buf(),
        source,
    })
}
