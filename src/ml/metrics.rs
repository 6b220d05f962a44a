//! Evaluation metrics for the mood classifier.

use std::fmt::Write as _;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    /// Build a matrix from aligned truth/prediction codes.
    pub fn from_predictions(n_classes: usize, truth: &[usize], predicted: &[usize]) -> Self {
        let mut cm = Self::new(n_classes);
        for (&t, &p) in truth.iter().zip(predicted.iter()) {
            cm.add(t, p);
        }
        cm
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// Render rows as truth, columns as predictions.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for truth in 0..self.n_classes {
            for pred in 0..self.n_classes {
                let _ = write!(out, "{:6}", self.get(truth, pred));
            }
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f32,
    /// `TP / (TP + FN)`.
    pub recall: f32,
    /// Harmonic mean of precision and recall.
    pub f1: f32,
    /// Total number of true examples for the class.
    pub support: u32,
}

/// Compute per-class precision, recall, and F1 from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    let mut stats = Vec::with_capacity(k);
    for class_idx in 0..k {
        let tp = cm.get(class_idx, class_idx) as f32;
        let mut fp = 0f32;
        let mut fn_ = 0f32;
        let mut support = 0u32;
        for j in 0..k {
            let v = cm.get(class_idx, j);
            support = support.saturating_add(v);
            if j != class_idx {
                fn_ += v as f32;
            }
        }
        for i in 0..k {
            if i != class_idx {
                fp += cm.get(i, class_idx) as f32;
            }
        }
        let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
        let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        stats.push(PerClassStats {
            precision,
            recall,
            f1,
            support,
        });
    }
    stats
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f32 {
    let mut correct = 0u64;
    for class_idx in 0..cm.n_classes {
        correct += cm.get(class_idx, class_idx) as u64;
    }
    let total = cm.total();
    if total == 0 {
        0.0
    } else {
        (correct as f32) / (total as f32)
    }
}

/// Fraction of positions where `truth` and `predicted` agree.
pub fn accuracy_score(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth
        .iter()
        .zip(predicted.iter())
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / truth.len() as f64
}

/// Text classification report with per-class rows, accuracy, and macro/weighted averages.
pub fn classification_report(cm: &ConfusionMatrix, class_names: &[String]) -> String {
    let stats = precision_recall_by_class(cm);
    let width = class_names
        .iter()
        .map(|name| name.len())
        .chain(std::iter::once("weighted avg".len()))
        .max()
        .unwrap_or(12);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>width$} {:>10} {:>10} {:>10} {:>10}",
        "", "precision", "recall", "f1-score", "support"
    );
    out.push('\n');
    for (idx, s) in stats.iter().enumerate() {
        let name = class_names.get(idx).map(String::as_str).unwrap_or("?");
        let _ = writeln!(
            out,
            "{:>width$} {:>10.2} {:>10.2} {:>10.2} {:>10}",
            name, s.precision, s.recall, s.f1, s.support
        );
    }
    out.push('\n');

    let total: u32 = stats.iter().map(|s| s.support).sum();
    let _ = writeln!(
        out,
        "{:>width$} {:>10} {:>10} {:>10.2} {:>10}",
        "accuracy",
        "",
        "",
        accuracy(cm),
        total
    );
    let k = stats.len().max(1) as f32;
    let weight = |s: &PerClassStats| {
        if total == 0 {
            0.0
        } else {
            s.support as f32 / total as f32
        }
    };
    let macro_avg = [
        stats.iter().map(|s| s.precision).sum::<f32>() / k,
        stats.iter().map(|s| s.recall).sum::<f32>() / k,
        stats.iter().map(|s| s.f1).sum::<f32>() / k,
    ];
    let weighted_avg = [
        stats.iter().map(|s| s.precision * weight(s)).sum::<f32>(),
        stats.iter().map(|s| s.recall * weight(s)).sum::<f32>(),
        stats.iter().map(|s| s.f1 * weight(s)).sum::<f32>(),
    ];
    for (label, [p, r, f]) in [("macro avg", macro_avg), ("weighted avg", weighted_avg)] {
        let _ = writeln!(
            out,
            "{:>width$} {:>10.2} {:>10.2} {:>10.2} {:>10}",
            label, p, r, f, total
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_class_stats_from_matrix() {
        // truth 0 predicted 0 twice, truth 0 predicted 1 once, truth 1 predicted 1 once.
        let cm = ConfusionMatrix::from_predictions(2, &[0, 0, 0, 1], &[0, 0, 1, 1]);
        let stats = precision_recall_by_class(&cm);
        assert!((stats[0].precision - 1.0).abs() < 1e-6);
        assert!((stats[0].recall - 2.0 / 3.0).abs() < 1e-6);
        assert!((stats[1].precision - 0.5).abs() < 1e-6);
        assert!((stats[1].f1 - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(stats[0].support, 3);
        assert!((accuracy(&cm) - 0.75).abs() < 1e-6);
        assert!((accuracy_score(&[0, 0, 0, 1], &[0, 0, 1, 1]) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_codes_are_ignored() {
        let mut cm = ConfusionMatrix::new(2);
        cm.add(5, 0);
        assert_eq!(cm.total(), 0);
        assert_eq!(accuracy(&cm), 0.0);
    }

    #[test]
    fn report_lists_every_class_and_averages() {
        let cm = ConfusionMatrix::from_predictions(2, &[0, 1, 1], &[0, 1, 0]);
        let report = classification_report(&cm, &["happy".into(), "sad".into()]);
        assert!(report.contains("happy"));
        assert!(report.contains("sad"));
        assert!(report.contains("accuracy"));
        assert!(report.contains("macro avg"));
        assert!(report.contains("weighted avg"));
        assert_eq!(cm.render().lines().count(), 2);
    }
}
