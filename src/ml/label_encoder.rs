//! Bidirectional mapping between class names and integer codes.

use serde::{Deserialize, Serialize};

/// Label encoder fitted on the training labels.
///
/// Classes are stored sorted, so codes are stable for a given label set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit an encoder on the distinct values of `labels`.
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut classes: Vec<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Code for `label`, or `None` for an unseen label.
    pub fn transform(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(label))
            .ok()
    }

    /// Encode every label, failing on the first unseen one.
    pub fn transform_all<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>, String> {
        labels
            .iter()
            .map(|label| {
                let label = label.as_ref();
                self.transform(label)
                    .ok_or_else(|| format!("Unseen label '{label}'"))
            })
            .collect()
    }

    /// Label for `code`, or `None` when the code is out of range.
    pub fn inverse_transform(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }
}
