//! Developer utility to write a seeded synthetic wellness CSV for training.

use std::path::PathBuf;

use moodcast::config::DEFAULT_DATA_PATH;
use moodcast::synth;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let records = synth::generate(options.rows, options.seed);
    synth::write_csv(&options.out, &records).map_err(|err| err.to_string())?;

    let mut counts = std::collections::BTreeMap::new();
    for record in &records {
        *counts.entry(record.label.as_str()).or_insert(0usize) += 1;
    }
    println!("wrote {} rows to {}", records.len(), options.out.display());
    for (label, count) in counts {
        println!("  {label:<10} {count}");
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    rows: usize,
    seed: u64,
    out: PathBuf,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut rows = 1000usize;
    let mut seed = 42u64;
    let mut out = PathBuf::from(DEFAULT_DATA_PATH);

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--rows" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--rows requires a value".to_string())?;
                rows = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --rows value: {value}"))?;
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                seed = value
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid --seed value: {value}"))?;
            }
            "--out" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--out requires a value".to_string())?;
                out = PathBuf::from(value);
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    if rows == 0 {
        return Err("--rows must be at least 1".to_string());
    }
    Ok(CliOptions { rows, seed, out })
}

fn help_text() -> String {
    [
        "moodcast-synth",
        "",
        "Writes a seeded synthetic wellness dataset in the trainer's CSV format.",
        "",
        "Usage:",
        "  moodcast-synth [--rows 1000] [--seed 42] [--out data/wellness_data.csv]",
    ]
    .join("\n")
}
