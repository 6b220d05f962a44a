use std::path::{Path, PathBuf};

use moodcast::config::TrainConfig;
use moodcast::ml::forest::ForestParams;
use moodcast::synth;
use moodcast::trainer::{self, TrainingSummary};
use serde_json::{Value, json};
use tempfile::TempDir;

/// Temporary working directory laid out like a deployment: `data/` and `models/`.
pub struct Workspace {
    pub temp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            temp: tempfile::tempdir().expect("create tempdir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn data_path(&self) -> PathBuf {
        self.root().join("data").join("wellness_data.csv")
    }

    pub fn write_dataset(&self, rows: usize, seed: u64) {
        let records = synth::generate(rows, seed);
        synth::write_csv(&self.data_path(), &records).expect("write dataset");
    }

    pub fn config(&self, n_estimators: usize) -> TrainConfig {
        TrainConfig {
            data_path: self.data_path(),
            models_dir: self.root().join("models"),
            log_dir: self.root().join("logs"),
            forest: ForestParams {
                n_estimators,
                ..ForestParams::default()
            },
            ..TrainConfig::default()
        }
    }

    pub fn train(&self, n_estimators: usize) -> TrainingSummary {
        trainer::train(&self.config(n_estimators)).expect("train")
    }
}

pub fn example_features() -> Value {
    json!({
        "mood_today": 7,
        "avg_mood_last_3_days": 6.5,
        "sleep_hours": 7,
        "sleep_quality": 8,
        "exercise_minutes": 30,
        "stress_level": 3,
        "screen_time": 4,
        "social_interaction_minutes": 60,
        "water_intake_liters": 2,
        "productivity_level": 7,
        "anxiety_level": 2
    })
}
