//! Train the mood classifier and write its artifacts.

use std::path::PathBuf;

use moodcast::config::TrainConfig;
use moodcast::logging::{self, LogOptions};
use moodcast::trainer;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let config = options.into_config()?;

    if let Err(err) = logging::init(&LogOptions::trainer(config.log_dir.clone())) {
        eprintln!("Logging disabled: {err}");
    }

    let rule = "=".repeat(50);
    println!("{rule}\nMOOD PREDICTION MODEL TRAINING\n{rule}");
    let summary = trainer::train(&config).map_err(|err| err.to_string())?;
    print!("{}", summary.render());
    println!("\n{rule}\nMODEL TRAINING COMPLETED SUCCESSFULLY!\n{rule}");
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    data: Option<PathBuf>,
    models_dir: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    seed: Option<u64>,
}

impl CliOptions {
    fn into_config(self) -> Result<TrainConfig, String> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::load(path).map_err(|err| err.to_string())?,
            None => TrainConfig::default(),
        };
        if let Some(data) = self.data {
            config.data_path = data;
        }
        if let Some(models_dir) = self.models_dir {
            config.models_dir = models_dir;
        }
        if let Some(log_dir) = self.log_dir {
            config.log_dir = log_dir;
        }
        if let Some(seed) = self.seed {
            config.set_seed(seed);
        }
        Ok(config)
    }
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                options.config = Some(PathBuf::from(value));
            }
            "--data" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--data requires a value".to_string())?;
                options.data = Some(PathBuf::from(value));
            }
            "--models-dir" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--models-dir requires a value".to_string())?;
                options.models_dir = Some(PathBuf::from(value));
            }
            "--log-dir" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--log-dir requires a value".to_string())?;
                options.log_dir = Some(PathBuf::from(value));
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                options.seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("Invalid --seed value: {value}"))?,
                );
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "moodcast-train",
        "",
        "Trains the mood-tomorrow random forest and writes model, label encoder, and model info.",
        "",
        "Usage:",
        "  moodcast-train [options]",
        "",
        "Options:",
        "  --data <csv>         Training CSV (default: data/wellness_data.csv).",
        "  --models-dir <dir>   Artifact directory (default: models).",
        "  --config <toml>      Optional TOML config; flags override it.",
        "  --seed <n>           Seed for the split and the forest (default: 42).",
        "  --log-dir <dir>      Log file directory (default: logs).",
    ]
    .join("\n")
}
