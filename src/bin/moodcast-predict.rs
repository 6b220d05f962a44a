//! Predict tomorrow's mood from one JSON feature object.
//!
//! Prints a single JSON object on stdout. Meant to be invoked as a subprocess by a backend
//! service that parses stdout and stderr.

use std::process::ExitCode;

use moodcast::artifacts::ArtifactPaths;
use moodcast::logging::{self, LogOptions};
use moodcast::predictor::{PredictError, predict_mood};
use serde_json::{Value, json};

const MISSING_MODEL_MESSAGE: &str = "Error: Model files not found. Please train the model first.";

fn main() -> ExitCode {
    let _ = logging::init(&LogOptions::predictor());

    let Some(argument) = std::env::args_os().nth(1) else {
        println!("{}", usage_text());
        return ExitCode::SUCCESS;
    };

    let result = argument
        .into_string()
        .map_err(|_| Failure::Other("argument is not valid UTF-8".to_string()))
        .and_then(|argument| run(&argument));
    match result {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(Failure::MissingModel) => {
            eprintln!("{MISSING_MODEL_MESSAGE}");
            ExitCode::FAILURE
        }
        Err(Failure::Other(message)) => {
            eprintln!("{}", json!({ "error": message }));
            ExitCode::FAILURE
        }
    }
}

enum Failure {
    MissingModel,
    Other(String),
}

impl From<PredictError> for Failure {
    fn from(err: PredictError) -> Self {
        if err.is_missing_artifacts() {
            Failure::MissingModel
        } else {
            Failure::Other(err.to_string())
        }
    }
}

fn run(argument: &str) -> Result<String, Failure> {
    let features: Value =
        serde_json::from_str(argument).map_err(|err| Failure::Other(err.to_string()))?;
    let prediction = predict_mood(&ArtifactPaths::default(), &features)?;
    tracing::debug!(
        predicted = %prediction.predicted_mood,
        confidence = prediction.confidence,
        "Prediction complete"
    );
    serde_json::to_string(&prediction).map_err(|err| Failure::Other(err.to_string()))
}

fn usage_text() -> String {
    [
        "Usage: moodcast-predict '<json_features>'",
        "Example: moodcast-predict '{\"mood_today\": 7, \"avg_mood_last_3_days\": 6.5, ...}'",
    ]
    .join("\n")
}
