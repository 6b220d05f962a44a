//! Single-shot inference against persisted artifacts.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::artifacts::{self, ArtifactError, ArtifactPaths};
use crate::features::{self, FeatureError};
use crate::ml::forest::{RandomForestModel, argmax};
use crate::ml::label_encoder::LabelEncoder;

/// Errors returned by [`Predictor`].
#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Feature(#[from] FeatureError),
    /// The model could not score the projected row.
    #[error("Prediction failed: {0}")]
    Model(String),
    /// The model produced a class code the encoder does not know.
    #[error("Predicted class {code} has no label")]
    UnknownClass { code: usize },
}

impl PredictError {
    /// Whether the failure means no model has been trained yet.
    pub fn is_missing_artifacts(&self) -> bool {
        matches!(self, Self::Artifact(ArtifactError::NotFound { .. }))
    }
}

/// Prediction for one feature mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub predicted_mood: String,
    /// Probability of `predicted_mood`.
    pub confidence: f64,
    /// Probability for every trained class.
    pub probabilities: BTreeMap<String, f64>,
}

/// Fitted model and encoder loaded for one invocation.
#[derive(Debug, Clone)]
pub struct Predictor {
    model: RandomForestModel,
    encoder: LabelEncoder,
}

impl Predictor {
    /// Load and cross-check the model and encoder under `paths`.
    pub fn load(paths: &ArtifactPaths) -> Result<Self, PredictError> {
        let (model, encoder) = artifacts::load_pair(paths)?;
        debug!(
            trees = model.model.trees.len(),
            classes = encoder.encoder.len(),
            "Artifacts loaded from {}",
            paths.dir.display()
        );
        Ok(Self {
            model: model.model,
            encoder: encoder.encoder,
        })
    }

    pub fn classes(&self) -> &[String] {
        self.encoder.classes()
    }

    /// Feature names in the order the model was trained on.
    pub fn feature_names(&self) -> &[String] {
        &self.model.feature_names
    }

    /// Predict the mood for a JSON object of named features.
    pub fn predict(&self, features: &Value) -> Result<Prediction, PredictError> {
        let row = features::project(features, &self.model.feature_names)?;
        let proba = self.model.predict_proba(&row).map_err(PredictError::Model)?;
        let (code, confidence) = argmax(&proba);
        let predicted_mood = self
            .encoder
            .inverse_transform(code)
            .ok_or(PredictError::UnknownClass { code })?
            .to_string();
        let probabilities = self
            .encoder
            .classes()
            .iter()
            .cloned()
            .zip(proba.iter().copied())
            .collect();
        Ok(Prediction {
            predicted_mood,
            confidence,
            probabilities,
        })
    }
}

/// Load the artifacts and predict once. Nothing is cached between calls.
pub fn predict_mood(paths: &ArtifactPaths, features: &Value) -> Result<Prediction, PredictError> {
    Predictor::load(paths)?.predict(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{EncoderArtifact, ModelArtifact, ModelInfo, save_all, schema_fingerprint};
    use crate::features::default_feature_names;
    use crate::ml::forest::{DecisionTree, ForestParams, TreeNode};
    use serde_json::json;
    use tempfile::tempdir;

    /// Three classes; `stress_level` above 6 means "stressed", otherwise `mood_today` decides.
    fn write_fixture(paths: &ArtifactPaths) {
        let features = default_feature_names();
        let encoder = LabelEncoder::fit(&["happy", "sad", "stressed"]);
        let fingerprint = schema_fingerprint(&features, encoder.classes());
        let tree = DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature_index: 5,
                    threshold: 6.0,
                    left: 1,
                    right: 4,
                },
                TreeNode::Split {
                    feature_index: 0,
                    threshold: 5.0,
                    left: 2,
                    right: 3,
                },
                TreeNode::Leaf {
                    distribution: vec![0.1, 0.8, 0.1],
                },
                TreeNode::Leaf {
                    distribution: vec![0.7, 0.2, 0.1],
                },
                TreeNode::Leaf {
                    distribution: vec![0.0, 0.1, 0.9],
                },
            ],
        };
        let model = RandomForestModel {
            model_version: 1,
            params: ForestParams::default(),
            feature_names: features.clone(),
            n_classes: 3,
            feature_importances: vec![1.0 / 11.0; 11],
            trees: vec![tree.clone(), tree],
        };
        let info = ModelInfo {
            model_type: "RandomForestClassifier".into(),
            n_estimators: 2,
            max_depth: 15,
            min_samples_split: 5,
            min_samples_leaf: 2,
            random_state: 42,
            test_fraction: 0.2,
            n_train: 0,
            n_test: 0,
            train_accuracy: 0.0,
            test_accuracy: 0.0,
            classes: encoder.classes().to_vec(),
            features,
            feature_importance: Vec::new(),
            schema_fingerprint: fingerprint.clone(),
            trained_at: String::new(),
        };
        save_all(
            paths,
            &ModelArtifact {
                schema_fingerprint: fingerprint.clone(),
                model,
            },
            &EncoderArtifact {
                schema_fingerprint: fingerprint,
                encoder,
            },
            &info,
        )
        .unwrap();
    }

    fn example() -> Value {
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

    #[test]
    fn predicts_argmax_with_full_distribution() {
        let dir = tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path());
        write_fixture(&paths);

        let prediction = predict_mood(&paths, &example()).unwrap();
        assert_eq!(prediction.predicted_mood, "happy");
        assert!((prediction.confidence - 0.7).abs() < 1e-6);
        let keys: Vec<&String> = prediction.probabilities.keys().collect();
        assert_eq!(keys, vec!["happy", "sad", "stressed"]);
        let sum: f64 = prediction.probabilities.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);

        let mut stressed = example();
        stressed["stress_level"] = json!(9);
        let prediction = predict_mood(&paths, &stressed).unwrap();
        assert_eq!(prediction.predicted_mood, "stressed");
        let max = prediction
            .probabilities
            .values()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(prediction.confidence, max);
    }

    #[test]
    fn missing_feature_is_reported() {
        let dir = tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path());
        write_fixture(&paths);

        let mut input = example();
        input.as_object_mut().unwrap().remove("anxiety_level");
        let err = predict_mood(&paths, &input).unwrap_err();
        assert!(matches!(err, PredictError::Feature(FeatureError::Missing { .. })));
        assert!(!err.is_missing_artifacts());
        assert!(err.to_string().contains("anxiety_level"));
    }

    #[test]
    fn absent_artifacts_are_flagged() {
        let dir = tempdir().unwrap();
        let err = Predictor::load(&ArtifactPaths::new(dir.path())).unwrap_err();
        assert!(err.is_missing_artifacts());
    }

    #[test]
    fn serializes_with_contract_keys() {
        let dir = tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path());
        write_fixture(&paths);
        let predictor = Predictor::load(&paths).unwrap();
        assert_eq!(predictor.feature_names().len(), 11);
        assert_eq!(predictor.classes(), &["happy", "sad", "stressed"]);
        let value = serde_json::to_value(predictor.predict(&example()).unwrap()).unwrap();
        assert!(value["predicted_mood"].is_string());
        assert!(value["confidence"].is_f64());
        assert_eq!(value["probabilities"].as_object().unwrap().len(), 3);
    }
}
