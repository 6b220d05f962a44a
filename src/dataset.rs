//! Training CSV loading and stratified train/test splitting.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::features::{FEATURE_COLUMNS, LABEL_COLUMN, default_feature_names};

/// Errors that may occur while loading a training CSV.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Failed to open the CSV file.
    #[error("Failed to open dataset {path}: {source}")]
    Open {
        path: PathBuf,
        source: csv::Error,
    },
    /// Failed to read the header row or a record.
    #[error("Failed to read dataset {path}: {source}")]
    Read {
        path: PathBuf,
        source: csv::Error,
    },
    /// A required column is absent from the header row.
    #[error("Dataset {path} is missing column '{column}'")]
    MissingColumn { path: PathBuf, column: String },
    /// A feature cell could not be parsed as a number.
    #[error("Dataset {path} line {line}: column '{column}' has non-numeric value '{value}'")]
    InvalidNumber {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },
    /// A label cell was empty.
    #[error("Dataset {path} line {line}: empty '{column}'")]
    EmptyLabel {
        path: PathBuf,
        line: u64,
        column: String,
    },
    /// The file has a header but no data rows.
    #[error("Dataset {path} has no rows")]
    Empty { path: PathBuf },
}

/// Feature rows and string labels loaded from a training CSV.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Column names in row order.
    pub feature_names: Vec<String>,
    /// Feature matrix, row-major.
    pub x: Vec<Vec<f32>>,
    /// Raw labels aligned with `x`.
    pub labels: Vec<String>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Count of rows per label, sorted by label.
    pub fn label_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for label in &self.labels {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Load the wellness CSV at `path`.
///
/// Columns are located by header name, so the file may order them freely or carry extra columns.
pub fn load_csv(path: &Path) -> Result<Dataset, DatasetError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| DatasetError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let headers = reader
        .headers()
        .map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    let column_index = |column: &str| -> Result<usize, DatasetError> {
        headers
            .iter()
            .position(|header| header.trim() == column)
            .ok_or_else(|| DatasetError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            })
    };
    let feature_idx = FEATURE_COLUMNS
        .iter()
        .map(|column| column_index(*column))
        .collect::<Result<Vec<_>, _>>()?;
    let label_idx = column_index(LABEL_COLUMN)?;

    let mut x = Vec::new();
    let mut labels = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let line = record.position().map(|pos| pos.line()).unwrap_or(0);
        let mut row = Vec::with_capacity(feature_idx.len());
        for (&idx, column) in feature_idx.iter().zip(FEATURE_COLUMNS.iter()) {
            let cell = record.get(idx).unwrap_or("").trim();
            let value = cell
                .parse::<f32>()
                .map_err(|_| DatasetError::InvalidNumber {
                    path: path.to_path_buf(),
                    line,
                    column: (*column).to_string(),
                    value: cell.to_string(),
                })?;
            row.push(value);
        }
        let label = record.get(label_idx).unwrap_or("").trim();
        if label.is_empty() {
            return Err(DatasetError::EmptyLabel {
                path: path.to_path_buf(),
                line,
                column: LABEL_COLUMN.to_string(),
            });
        }
        x.push(row);
        labels.push(label.to_string());
    }

    if x.is_empty() {
        return Err(DatasetError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(Dataset {
        feature_names: default_feature_names(),
        x,
        labels,
    })
}

/// Row indices assigned to each side of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices so each class keeps its share of `test_fraction` in the test side.
///
/// The result depends only on the labels, the fraction, and the seed. A class with a single row
/// stays in train, and no class is moved entirely into test.
pub fn stratified_split<T: Ord>(labels: &[T], test_fraction: f64, seed: u64) -> Split {
    let mut by_class: BTreeMap<&T, Vec<usize>> = BTreeMap::new();
    for (idx, label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(idx);
    }

    let fraction = test_fraction.clamp(0.0, 1.0);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for (_label, mut indices) in by_class {
        indices.shuffle(&mut rng);
        let n = indices.len();
        let mut test_n = ((n as f64) * fraction).round() as usize;
        if n == 1 {
            test_n = 0;
        } else if test_n >= n {
            test_n = n - 1;
        }
        test.extend_from_slice(&indices[..test_n]);
        train.extend_from_slice(&indices[test_n..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    Split { train, test }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn header() -> String {
        let mut cols: Vec<&str> = FEATURE_COLUMNS.to_vec();
        cols.push(LABEL_COLUMN);
        cols.join(",")
    }

    #[test]
    fn loads_rows_by_header_name() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", header()).unwrap();
        writeln!(file, "7,6.5,7,8,30,3,4,60,2,7,2,happy").unwrap();
        writeln!(file, "3,4,5,4,0,8,9,10,1,3,8,stressed").unwrap();

        let dataset = load_csv(file.path()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.x[0][1], 6.5);
        assert_eq!(dataset.labels, vec!["happy", "stressed"]);
        assert_eq!(dataset.feature_names.len(), FEATURE_COLUMNS.len());
    }

    #[test]
    fn reordered_columns_still_land_in_feature_order() {
        let mut file = NamedTempFile::new().unwrap();
        let mut cols: Vec<&str> = FEATURE_COLUMNS.to_vec();
        cols.reverse();
        cols.insert(0, LABEL_COLUMN);
        writeln!(file, "{}", cols.join(",")).unwrap();
        writeln!(file, "sad,11,10,9,8,7,6,5,4,3,2,1").unwrap();

        let dataset = load_csv(file.path()).unwrap();
        assert_eq!(dataset.x[0][0], 1.0);
        assert_eq!(dataset.x[0][10], 11.0);
    }

    #[test]
    fn missing_column_is_reported() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "mood_today,{LABEL_COLUMN}").unwrap();
        writeln!(file, "5,happy").unwrap();
        let err = load_csv(file.path()).unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn { ref column, .. } if column == "avg_mood_last_3_days"));
    }

    #[test]
    fn bad_number_and_empty_file_are_errors() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", header()).unwrap();
        writeln!(file, "x,6.5,7,8,30,3,4,60,2,7,2,happy").unwrap();
        assert!(matches!(
            load_csv(file.path()),
            Err(DatasetError::InvalidNumber { line: 2, .. })
        ));

        let mut empty = NamedTempFile::new().unwrap();
        writeln!(empty, "{}", header()).unwrap();
        assert!(matches!(load_csv(empty.path()), Err(DatasetError::Empty { .. })));
    }

    #[test]
    fn split_is_stratified_and_deterministic() {
        let mut labels = vec![0usize; 50];
        labels.extend(vec![1usize; 30]);
        labels.extend(vec![2usize; 20]);

        let split = stratified_split(&labels, 0.2, 42);
        assert_eq!(split.train.len() + split.test.len(), labels.len());
        let test_counts = |class: usize| split.test.iter().filter(|&&i| labels[i] == class).count();
        assert_eq!(test_counts(0), 10);
        assert_eq!(test_counts(1), 6);
        assert_eq!(test_counts(2), 4);

        assert_eq!(split, stratified_split(&labels, 0.2, 42));
        assert_ne!(split.test, stratified_split(&labels, 0.2, 7).test);
    }

    #[test]
    fn singleton_class_stays_in_train() {
        let labels = vec!["a", "a", "a", "a", "a", "b"];
        let split = stratified_split(&labels, 0.2, 1);
        assert!(split.train.contains(&5));
        assert_eq!(split.test.len(), 1);

        let split = stratified_split(&["x", "x"], 1.0, 1);
        assert_eq!(split.train.len(), 1);
    }
}
