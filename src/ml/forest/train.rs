use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::model::{DecisionTree, RandomForestModel, TreeNode};

/// Number of features considered at each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// `floor(sqrt(n_features))`.
    Sqrt,
    /// `floor(log2(n_features))`.
    Log2,
    /// Every feature.
    All,
}

impl MaxFeatures {
    /// Resolve to a concrete feature count, at least 1.
    pub fn resolve(self, n_features: usize) -> usize {
        let n = n_features.max(1);
        let k = match self {
            Self::Sqrt => (n as f64).sqrt().floor() as usize,
            Self::Log2 => (n as f64).log2().floor() as usize,
            Self::All => n,
        };
        k.clamp(1, n)
    }
}

/// Forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    /// Number of trees.
    pub n_estimators: usize,
    /// Maximum depth of each tree, in edges from the root.
    pub max_depth: usize,
    /// Minimum rows in a node before it may split.
    pub min_samples_split: usize,
    /// Minimum rows on each side of a split.
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    /// Seed for bootstrap sampling and feature subsampling.
    pub random_state: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 15,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: MaxFeatures::Sqrt,
            random_state: 42,
        }
    }
}

/// In-memory dataset used for fitting.
#[derive(Debug, Clone)]
pub struct TrainDataset {
    /// Column names aligned with each row.
    pub feature_names: Vec<String>,
    /// Number of classes; labels are `0..n_classes`.
    pub n_classes: usize,
    /// Feature matrix, row-major.
    pub x: Vec<Vec<f32>>,
    /// Class indices aligned with `x`.
    pub y: Vec<usize>,
}

/// Fit a random forest on `dataset`.
pub fn train_random_forest(
    dataset: &TrainDataset,
    params: &ForestParams,
) -> Result<RandomForestModel, String> {
    if dataset.x.len() != dataset.y.len() {
        return Err("Mismatched X/Y lengths".to_string());
    }
    if dataset.x.is_empty() {
        return Err("Empty dataset".to_string());
    }
    if dataset.n_classes < 2 {
        return Err("Need at least 2 classes".to_string());
    }
    if params.n_estimators == 0 {
        return Err("n_estimators must be at least 1".to_string());
    }
    let n_features = dataset.feature_names.len();
    if let Some(row) = dataset.x.iter().find(|row| row.len() != n_features) {
        return Err(format!(
            "Row has {} values but {n_features} feature names were given",
            row.len()
        ));
    }
    if let Some(&label) = dataset.y.iter().find(|&&label| label >= dataset.n_classes) {
        return Err(format!(
            "Label {label} is out of range for {} classes",
            dataset.n_classes
        ));
    }

    let n = dataset.x.len();
    let max_features = params.max_features.resolve(n_features);
    let mut trees = Vec::with_capacity(params.n_estimators);
    let mut importances = vec![0.0f64; n_features];

    for tree_idx in 0..params.n_estimators {
        let mut rng = StdRng::seed_from_u64(params.random_state.wrapping_add(tree_idx as u64));
        let bootstrap: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();

        let mut builder = TreeBuilder {
            x: &dataset.x,
            y: &dataset.y,
            n_classes: dataset.n_classes,
            params,
            max_features,
            n_root: bootstrap.len() as f64,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
            rng,
        };
        builder.grow(bootstrap, 0);

        let tree_total: f64 = builder.importances.iter().sum();
        if tree_total > 0.0 {
            for (total, tree_imp) in importances.iter_mut().zip(&builder.importances) {
                *total += tree_imp / tree_total;
            }
        }
        trees.push(DecisionTree {
            nodes: builder.nodes,
        });
    }

    let total: f64 = importances.iter().sum();
    let feature_importances = importances
        .iter()
        .map(|&imp| if total > 0.0 { (imp / total) as f32 } else { 0.0 })
        .collect();

    Ok(RandomForestModel {
        model_version: 1,
        params: params.clone(),
        feature_names: dataset.feature_names.clone(),
        n_classes: dataset.n_classes,
        feature_importances,
        trees,
    })
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f32>],
    y: &'a [usize],
    n_classes: usize,
    params: &'a ForestParams,
    max_features: usize,
    n_root: f64,
    nodes: Vec<TreeNode>,
    importances: Vec<f64>,
    rng: StdRng,
}

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    feature_index: usize,
    threshold: f32,
    score: f64,
}

impl TreeBuilder<'_> {
    /// Grow the subtree for `rows` and return its node index.
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> u32 {
        let counts = self.class_counts(&rows);
        let n = rows.len();
        let impurity = gini(&counts, n);
        let splittable = depth < self.params.max_depth
            && n >= self.params.min_samples_split.max(2)
            && n >= 2 * self.params.min_samples_leaf.max(1)
            && impurity > 0.0;

        let split = if splittable {
            self.best_split(&rows)
        } else {
            None
        };
        let Some(split) = split else {
            return self.push(TreeNode::Leaf {
                distribution: distribution(&counts, n),
            });
        };

        let (left, right): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&row| self.x[row][split.feature_index] <= split.threshold);
        let n = n as f64;
        self.importances[split.feature_index] += (n / self.n_root) * (impurity - split.score);

        // Placeholder until both children have indices.
        let node_idx = self.push(TreeNode::Leaf {
            distribution: Vec::new(),
        });
        let left_idx = self.grow(left, depth + 1);
        let right_idx = self.grow(right, depth + 1);
        self.nodes[node_idx as usize] = TreeNode::Split {
            feature_index: split.feature_index as u16,
            threshold: split.threshold,
            left: left_idx,
            right: right_idx,
        };
        node_idx
    }

    fn push(&mut self, node: TreeNode) -> u32 {
        self.nodes.push(node);
        (self.nodes.len() - 1) as u32
    }

    fn class_counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &row in rows {
            counts[self.y[row]] += 1;
        }
        counts
    }

    /// Search a random subset of features for the split with the lowest weighted Gini.
    ///
    /// Keeps drawing features past `max_features` until at least one valid split exists.
    fn best_split(&mut self, rows: &[usize]) -> Option<BestSplit> {
        let n_features = self.importances.len();
        let mut order: Vec<usize> = (0..n_features).collect();
        order.shuffle(&mut self.rng);

        let mut best: Option<BestSplit> = None;
        for (visited, &feature_index) in order.iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            if let Some(candidate) = self.best_split_for_feature(rows, feature_index)
                && best.is_none_or(|b| candidate.score < b.score)
            {
                best = Some(candidate);
            }
        }
        best
    }

    fn best_split_for_feature(&self, rows: &[usize], feature_index: usize) -> Option<BestSplit> {
        let mut pairs: Vec<(f32, usize)> = rows
            .iter()
            .map(|&row| (self.x[row][feature_index], self.y[row]))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = pairs.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let mut right_counts = vec![0usize; self.n_classes];
        for &(_, label) in &pairs {
            right_counts[label] += 1;
        }
        let mut left_counts = vec![0usize; self.n_classes];

        let mut best: Option<BestSplit> = None;
        for i in 0..n - 1 {
            let (value, label) = pairs[i];
            left_counts[label] += 1;
            right_counts[label] -= 1;
            let next = pairs[i + 1].0;
            let n_left = i + 1;
            let n_right = n - n_left;
            if value >= next || n_left < min_leaf || n_right < min_leaf {
                continue;
            }
            let score = (n_left as f64 * gini(&left_counts, n_left)
                + n_right as f64 * gini(&right_counts, n_right))
                / n as f64;
            if best.is_none_or(|b| score < b.score) {
                let mid = value + (next - value) / 2.0;
                let threshold = if mid < next { mid } else { value };
                best = Some(BestSplit {
                    feature_index,
                    threshold,
                    score,
                });
            }
        }
        best
    }
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

fn distribution(counts: &[usize], n: usize) -> Vec<f32> {
    let n = n.max(1) as f32;
    counts.iter().map(|&c| c as f32 / n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Class is decided by feature 0 alone; feature 1 is noise.
    fn threshold_dataset(n: usize) -> TrainDataset {
        let mut x = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let signal = i as f32 / n as f32;
            let noise = ((i * 7919) % 97) as f32 / 97.0;
            x.push(vec![signal, noise]);
            y.push(usize::from(signal > 0.5));
        }
        TrainDataset {
            feature_names: vec!["signal".into(), "noise".into()],
            n_classes: 2,
            x,
            y,
        }
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_estimators: 15,
            max_features: MaxFeatures::All,
            ..ForestParams::default()
        }
    }

    #[test]
    fn max_features_resolves() {
        assert_eq!(MaxFeatures::Sqrt.resolve(11), 3);
        assert_eq!(MaxFeatures::Log2.resolve(11), 3);
        assert_eq!(MaxFeatures::All.resolve(11), 11);
        assert_eq!(MaxFeatures::Sqrt.resolve(1), 1);
    }

    #[test]
    fn gini_matches_definition() {
        assert_eq!(gini(&[4, 0], 4), 0.0);
        assert!((gini(&[2, 2], 4) - 0.5).abs() < 1e-12);
        assert_eq!(gini(&[], 0), 0.0);
    }

    #[test]
    fn learns_threshold_and_ranks_signal_first() {
        let dataset = threshold_dataset(200);
        let model = train_random_forest(&dataset, &small_params()).unwrap();
        model.validate().unwrap();
        assert_eq!(model.trees.len(), 15);

        assert_eq!(model.predict_class_index(&[0.1, 0.5]), Ok(0));
        assert_eq!(model.predict_class_index(&[0.9, 0.5]), Ok(1));
        let proba = model.predict_proba(&[0.9, 0.5]).unwrap();
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        let sum: f32 = model.feature_importances.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(model.importance_ranking()[0].0, "signal");
    }

    #[test]
    fn same_seed_reproduces_model() {
        let dataset = threshold_dataset(120);
        let params = ForestParams {
            n_estimators: 5,
            ..ForestParams::default()
        };
        let a = train_random_forest(&dataset, &params).unwrap();
        let b = train_random_forest(&dataset, &params).unwrap();
        assert_eq!(a, b);

        let other = ForestParams {
            random_state: 7,
            ..params
        };
        let c = train_random_forest(&dataset, &other).unwrap();
        assert_ne!(a.trees, c.trees);
    }

    #[test]
    fn respects_depth_and_leaf_limits() {
        let dataset = threshold_dataset(200);
        let params = ForestParams {
            n_estimators: 3,
            max_depth: 2,
            min_samples_leaf: 10,
            ..ForestParams::default()
        };
        let model = train_random_forest(&dataset, &params).unwrap();
        for tree in &model.trees {
            assert!(tree.depth() <= 2);
        }
    }

    #[test]
    fn rejects_invalid_input() {
        let mut dataset = threshold_dataset(10);
        dataset.n_classes = 1;
        assert!(train_random_forest(&dataset, &small_params()).is_err());

        let mut dataset = threshold_dataset(10);
        dataset.y[0] = 5;
        assert!(train_random_forest(&dataset, &small_params()).is_err());

        let mut dataset = threshold_dataset(10);
        dataset.x[3].push(1.0);
        assert!(train_random_forest(&dataset, &small_params()).is_err());

        let dataset = TrainDataset {
            feature_names: vec!["a".into()],
            n_classes: 2,
            x: Vec::new(),
            y: Vec::new(),
        };
        assert!(train_random_forest(&dataset, &small_params()).is_err());
    }
}
