//! Training pipeline: CSV to persisted forest, encoder, and sidecar.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

use crate::artifacts::{
    self, ArtifactError, ArtifactPaths, EncoderArtifact, FeatureImportance, ModelArtifact,
    ModelInfo,
};
use crate::config::{ConfigError, TrainConfig};
use crate::dataset::{self, Dataset, DatasetError};
use crate::ml::forest::{RandomForestModel, TrainDataset, train_random_forest};
use crate::ml::label_encoder::LabelEncoder;
use crate::ml::metrics::{ConfusionMatrix, accuracy_score, classification_report};

const MODEL_TYPE: &str = "RandomForestClassifier";

/// Errors that abort a training run.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    /// The split, the forest fit, or its evaluation could not proceed.
    #[error("Training failed: {0}")]
    Fit(String),
    #[error("Failed to format training timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Outcome of a training run, for reporting and tests.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub n_rows: usize,
    pub label_counts: BTreeMap<String, usize>,
    pub classes: Vec<String>,
    pub n_train: usize,
    pub n_test: usize,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub report: String,
    /// Sorted by importance, highest first.
    pub feature_importance: Vec<FeatureImportance>,
    pub paths: ArtifactPaths,
}

impl TrainingSummary {
    /// Operator-facing report printed by the trainer binary.
    pub fn render(&self) -> String {
        let rule = "-".repeat(50);
        let mut out = String::new();
        let _ = writeln!(out, "Dataset rows: {}", self.n_rows);
        let _ = writeln!(out, "Target distribution:");
        for (label, count) in &self.label_counts {
            let _ = writeln!(out, "  {label:<16} {count}");
        }
        let mapping: Vec<String> = self
            .classes
            .iter()
            .enumerate()
            .map(|(code, class)| format!("{class}={code}"))
            .collect();
        let _ = writeln!(out, "Class mapping: {}", mapping.join(", "));
        let _ = writeln!(out, "Training set size: {}", self.n_train);
        let _ = writeln!(out, "Test set size: {}", self.n_test);
        let _ = writeln!(out, "\nTraining Accuracy: {:.4}", self.train_accuracy);
        let _ = writeln!(out, "Test Accuracy: {:.4}", self.test_accuracy);
        let _ = writeln!(out, "\n{rule}\nClassification Report (Test Set):\n{rule}");
        out.push_str(&self.report);
        let _ = writeln!(out, "\nConfusion Matrix (rows=true, cols=pred):");
        out.push_str(&self.confusion.render());
        let _ = writeln!(out, "\n{rule}\nFeature Importance:\n{rule}");
        for (rank, entry) in self.feature_importance.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>2}  {:<28} {:.6}",
                rank + 1,
                entry.feature,
                entry.importance
            );
        }
        let _ = writeln!(out, "\nModel saved to {}", self.paths.model.display());
        let _ = writeln!(out, "Label encoder saved to {}", self.paths.encoder.display());
        let _ = writeln!(out, "Model info saved to {}", self.paths.info.display());
        out
    }
}

/// Load the configured CSV, fit, evaluate, and persist all artifacts.
pub fn train(config: &TrainConfig) -> Result<TrainingSummary, TrainError> {
    config.validate()?;
    info!("Loading dataset from {}", config.data_path.display());
    let dataset = dataset::load_csv(&config.data_path)?;
    info!(
        rows = dataset.len(),
        features = dataset.feature_names.len(),
        "Dataset loaded"
    );
    train_on(&dataset, config)
}

/// Fit and persist from an already loaded dataset.
pub fn train_on(dataset: &Dataset, config: &TrainConfig) -> Result<TrainingSummary, TrainError> {
    let encoder = LabelEncoder::fit(&dataset.labels);
    if encoder.len() < 2 {
        return Err(TrainError::Fit(format!(
            "Need at least 2 distinct labels, found {}",
            encoder.len()
        )));
    }
    let y = encoder.transform_all(&dataset.labels).map_err(TrainError::Fit)?;

    let split = dataset::stratified_split(&y, config.test_fraction, config.split_seed);
    if split.train.is_empty() || split.test.is_empty() {
        return Err(TrainError::Fit(
            "Dataset needs both train and test samples".to_string(),
        ));
    }
    info!(
        train = split.train.len(),
        test = split.test.len(),
        "Stratified split"
    );

    let (train_x, train_y) = gather(dataset, &y, &split.train);
    let (test_x, test_y) = gather(dataset, &y, &split.test);
    let train_set = TrainDataset {
        feature_names: dataset.feature_names.clone(),
        n_classes: encoder.len(),
        x: train_x,
        y: train_y,
    };

    info!(
        n_estimators = config.forest.n_estimators,
        max_depth = config.forest.max_depth,
        "Fitting random forest"
    );
    let model = train_random_forest(&train_set, &config.forest).map_err(TrainError::Fit)?;

    let train_pred = model.predict_batch(&train_set.x).map_err(TrainError::Fit)?;
    let test_pred = model.predict_batch(&test_x).map_err(TrainError::Fit)?;
    let train_accuracy = accuracy_score(&train_set.y, &train_pred);
    let test_accuracy = accuracy_score(&test_y, &test_pred);
    info!(train_accuracy, test_accuracy, "Evaluation complete");

    let confusion = ConfusionMatrix::from_predictions(encoder.len(), &test_y, &test_pred);
    let report = classification_report(&confusion, encoder.classes());
    let feature_importance = importance_records(&model);
    for entry in &feature_importance {
        debug!(feature = %entry.feature, importance = entry.importance, "Feature importance");
    }

    let fingerprint = artifacts::schema_fingerprint(&model.feature_names, encoder.classes());
    let info = ModelInfo {
        model_type: MODEL_TYPE.to_string(),
        n_estimators: config.forest.n_estimators,
        max_depth: config.forest.max_depth,
        min_samples_split: config.forest.min_samples_split,
        min_samples_leaf: config.forest.min_samples_leaf,
        random_state: config.forest.random_state,
        test_fraction: config.test_fraction,
        n_train: split.train.len(),
        n_test: split.test.len(),
        train_accuracy,
        test_accuracy,
        classes: encoder.classes().to_vec(),
        features: model.feature_names.clone(),
        feature_importance: feature_importance.clone(),
        schema_fingerprint: fingerprint.clone(),
        trained_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
    };

    let paths = ArtifactPaths::new(&config.models_dir);
    let classes = encoder.classes().to_vec();
    artifacts::save_all(
        &paths,
        &ModelArtifact {
            schema_fingerprint: fingerprint.clone(),
            model,
        },
        &EncoderArtifact {
            schema_fingerprint: fingerprint,
            encoder,
        },
        &info,
    )?;
    info!("Artifacts written to {}", paths.dir.display());

    Ok(TrainingSummary {
        n_rows: dataset.len(),
        label_counts: dataset.label_counts(),
        classes,
        n_train: split.train.len(),
        n_test: split.test.len(),
        train_accuracy,
        test_accuracy,
        confusion,
        report,
        feature_importance,
        paths,
    })
}

fn gather(dataset: &Dataset, y: &[usize], indices: &[usize]) -> (Vec<Vec<f32>>, Vec<usize>) {
    indices
        .iter()
        .map(|&idx| (dataset.x[idx].clone(), y[idx]))
        .unzip()
}

fn importance_records(model: &RandomForestModel) -> Vec<FeatureImportance> {
    model
        .importance_ranking()
        .into_iter()
        .map(|(feature, importance)| FeatureImportance {
            feature,
            importance,
        })
        .collect()
}
