//! On-disk artifact contract shared by the trainer and the predictor.
//!
//! A training run writes three JSON files under one models directory: the fitted forest, the
//! label encoder, and an informational sidecar. The forest and encoder each carry the same schema
//! fingerprint so a mismatched pair is rejected at load time. Files are overwritten wholesale.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::ml::forest::RandomForestModel;
use crate::ml::label_encoder::LabelEncoder;

/// Default models directory, relative to the working directory.
pub const DEFAULT_MODELS_DIR: &str = "models";
pub const MODEL_FILE_NAME: &str = "mood_predictor.forest.json";
pub const ENCODER_FILE_NAME: &str = "label_encoder.json";
pub const INFO_FILE_NAME: &str = "mood_predictor.json";

/// Errors that may occur while reading or writing artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// An artifact the predictor needs does not exist.
    #[error("Artifact not found at {path}")]
    NotFound { path: PathBuf },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to create models directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid artifact at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// The artifact parsed but violates a structural invariant.
    #[error("Invalid model at {path}: {message}")]
    Invalid { path: PathBuf, message: String },
    /// The model and encoder were not produced by the same training run.
    #[error("Model and label encoder do not match: {message}")]
    SchemaMismatch { message: String },
}

/// Paths of the three artifacts inside a models directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub model: PathBuf,
    pub encoder: PathBuf,
    pub info: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            model: dir.join(MODEL_FILE_NAME),
            encoder: dir.join(ENCODER_FILE_NAME),
            info: dir.join(INFO_FILE_NAME),
            dir,
        }
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::new(DEFAULT_MODELS_DIR)
    }
}

/// Persisted forest plus the fingerprint tying it to its encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub schema_fingerprint: String,
    pub model: RandomForestModel,
}

/// Persisted label encoder plus the fingerprint tying it to its model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderArtifact {
    pub schema_fingerprint: String,
    pub encoder: LabelEncoder,
}

/// One row of the importance ranking in the sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f32,
}

/// Informational summary of a training run. Never read by the predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub random_state: u64,
    pub test_fraction: f64,
    pub n_train: usize,
    pub n_test: usize,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub classes: Vec<String>,
    pub features: Vec<String>,
    /// Sorted by importance, highest first.
    pub feature_importance: Vec<FeatureImportance>,
    pub schema_fingerprint: String,
    /// RFC 3339 timestamp of the training run.
    pub trained_at: String,
}

/// Digest over feature names and class list.
///
/// Length-prefixed so that distinct lists never collide by concatenation.
pub fn schema_fingerprint(features: &[String], classes: &[String]) -> String {
    let mut hasher = blake3::Hasher::new();
    for list in [features, classes] {
        hasher.update(&(list.len() as u64).to_le_bytes());
        for item in list {
            hasher.update(&(item.len() as u64).to_le_bytes());
            hasher.update(item.as_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Write the model, encoder, and sidecar, creating the directory if needed.
pub fn save_all(
    paths: &ArtifactPaths,
    model: &ModelArtifact,
    encoder: &EncoderArtifact,
    info: &ModelInfo,
) -> Result<(), ArtifactError> {
    std::fs::create_dir_all(&paths.dir).map_err(|source| ArtifactError::CreateDir {
        path: paths.dir.clone(),
        source,
    })?;
    write_json(&paths.model, model)?;
    write_json(&paths.encoder, encoder)?;
    write_json(&paths.info, info)?;
    Ok(())
}

/// Load and cross-check the model and encoder.
///
/// Missing files are reported before any parsing so callers can distinguish an untrained setup.
pub fn load_pair(paths: &ArtifactPaths) -> Result<(ModelArtifact, EncoderArtifact), ArtifactError> {
    for path in [&paths.model, &paths.encoder] {
        if !path.is_file() {
            return Err(ArtifactError::NotFound { path: path.clone() });
        }
    }
    let model: ModelArtifact = read_json(&paths.model)?;
    model
        .model
        .validate()
        .map_err(|message| ArtifactError::Invalid {
            path: paths.model.clone(),
            message,
        })?;
    let encoder: EncoderArtifact = read_json(&paths.encoder)?;
    check_pair(&model, &encoder)?;
    Ok((model, encoder))
}

/// Read the sidecar written by the last training run.
pub fn load_info(paths: &ArtifactPaths) -> Result<ModelInfo, ArtifactError> {
    if !paths.info.is_file() {
        return Err(ArtifactError::NotFound {
            path: paths.info.clone(),
        });
    }
    read_json(&paths.info)
}

fn check_pair(model: &ModelArtifact, encoder: &EncoderArtifact) -> Result<(), ArtifactError> {
    if model.schema_fingerprint != encoder.schema_fingerprint {
        return Err(ArtifactError::SchemaMismatch {
            message: format!(
                "model fingerprint {} != encoder fingerprint {}",
                model.schema_fingerprint, encoder.schema_fingerprint
            ),
        });
    }
    if model.model.n_classes != encoder.encoder.len() {
        return Err(ArtifactError::SchemaMismatch {
            message: format!(
                "model has {} classes but encoder has {}",
                model.model.n_classes,
                encoder.encoder.len()
            ),
        });
    }
    let expected = schema_fingerprint(&model.model.feature_names, encoder.encoder.classes());
    if expected != model.schema_fingerprint {
        return Err(ArtifactError::SchemaMismatch {
            message: "fingerprint does not match the stored features and classes".to_string(),
        });
    }
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| ArtifactError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, bytes).map_err(|source| ArtifactError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = std::fs::read(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
