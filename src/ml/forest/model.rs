use serde::{Deserialize, Serialize};

use super::train::ForestParams;

/// Node of a flattened decision tree. Index 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Internal node: rows with `feature <= threshold` go left.
    Split {
        feature_index: u16,
        threshold: f32,
        left: u32,
        right: u32,
    },
    /// Terminal node holding the class distribution of its training rows.
    Leaf { distribution: Vec<f32> },
}

/// Single CART tree stored as a node array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Walk from the root to the leaf reached by `features`.
    ///
    /// Returns `None` when the walk reaches a node index or a feature index that does not exist.
    pub fn leaf_distribution(&self, features: &[f32]) -> Option<&[f32]> {
        let mut idx = 0usize;
        loop {
            match self.nodes.get(idx)? {
                TreeNode::Leaf { distribution } => return Some(distribution),
                TreeNode::Split {
                    feature_index,
                    threshold,
                    left,
                    right,
                } => {
                    let value = *features.get(*feature_index as usize)?;
                    let next = (if value <= *threshold { *left } else { *right }) as usize;
                    if next <= idx {
                        return None;
                    }
                    idx = next;
                }
            }
        }
    }

    /// Longest root-to-leaf path, counted in edges.
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + walk(nodes, *left as usize).max(walk(nodes, *right as usize))
                }
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    fn validate(&self, tree_idx: usize, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err(format!("Tree {tree_idx} has no nodes"));
        }
        let len = self.nodes.len();
        for (node_idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { distribution } => {
                    if distribution.len() != n_classes {
                        return Err(format!(
                            "Tree {tree_idx} leaf {node_idx} has {} probabilities but expected {n_classes}",
                            distribution.len()
                        ));
                    }
                }
                TreeNode::Split {
                    feature_index,
                    left,
                    right,
                    ..
                } => {
                    if *feature_index as usize >= n_features {
                        return Err(format!(
                            "Tree {tree_idx} node {node_idx} splits on feature {feature_index} of {n_features}"
                        ));
                    }
                    // Children are always written after their parent.
                    for child in [*left as usize, *right as usize] {
                        if child <= node_idx || child >= len {
                            return Err(format!(
                                "Tree {tree_idx} node {node_idx} has invalid child {child}"
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Fitted random forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestModel {
    /// Model format version.
    pub model_version: i64,
    /// Hyperparameters used for fitting.
    pub params: ForestParams,
    /// Feature names in the column order the trees index into.
    pub feature_names: Vec<String>,
    /// Number of classes; class codes are `0..n_classes`.
    pub n_classes: usize,
    /// Mean decrease in impurity per feature, normalized to sum to 1.
    pub feature_importances: Vec<f32>,
    pub trees: Vec<DecisionTree>,
}

impl RandomForestModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), String> {
        if self.n_classes < 2 {
            return Err("Model must contain at least 2 classes".to_string());
        }
        if self.feature_names.is_empty() {
            return Err("Model has no features".to_string());
        }
        if self.trees.is_empty() {
            return Err("Model has no trees".to_string());
        }
        if self.feature_importances.len() != self.feature_names.len() {
            return Err("feature_importances length must match feature_names length".to_string());
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate(tree_idx, self.feature_names.len(), self.n_classes)?;
        }
        Ok(())
    }

    /// Class probabilities for one feature row, averaged over all trees.
    ///
    /// The row must hold exactly one value per entry of `feature_names`.
    pub fn predict_proba(&self, features: &[f32]) -> Result<Vec<f64>, String> {
        if features.len() != self.feature_names.len() {
            return Err(format!(
                "Expected {} feature values, got {}",
                self.feature_names.len(),
                features.len()
            ));
        }
        let mut proba = vec![0.0f64; self.n_classes];
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            let distribution = tree
                .leaf_distribution(features)
                .ok_or_else(|| format!("Tree {tree_idx} is malformed"))?;
            for (slot, &p) in proba.iter_mut().zip(distribution) {
                *slot += p as f64;
            }
        }
        let sum: f64 = proba.iter().sum();
        if sum > 0.0 {
            for p in &mut proba {
                *p /= sum;
            }
        } else if !proba.is_empty() {
            let uniform = 1.0 / proba.len() as f64;
            proba.iter_mut().for_each(|p| *p = uniform);
        }
        Ok(proba)
    }

    /// Most probable class code for one feature row.
    pub fn predict_class_index(&self, features: &[f32]) -> Result<usize, String> {
        Ok(argmax(&self.predict_proba(features)?).0)
    }

    /// Predicted class codes for a batch of rows.
    pub fn predict_batch(&self, rows: &[Vec<f32>]) -> Result<Vec<usize>, String> {
        rows.iter().map(|row| self.predict_class_index(row)).collect()
    }

    /// Feature names paired with importances, most important first.
    ///
    /// Equal importances keep column order.
    pub fn importance_ranking(&self) -> Vec<(String, f32)> {
        let mut ranking: Vec<(String, f32)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.feature_importances.iter().copied())
            .collect();
        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranking
    }
}

/// Index and value of the first maximum.
pub fn argmax(values: &[f64]) -> (usize, f64) {
    let mut best_idx = 0usize;
    let mut best_val = f64::NEG_INFINITY;
    for (idx, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = idx;
        }
    }
    (best_idx, best_val)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(threshold: f32) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature_index: 0,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf {
                    distribution: vec![1.0, 0.0],
                },
                TreeNode::Leaf {
                    distribution: vec![0.0, 1.0],
                },
            ],
        }
    }

    fn model(trees: Vec<DecisionTree>) -> RandomForestModel {
        RandomForestModel {
            model_version: 1,
            params: ForestParams::default(),
            feature_names: vec!["a".into(), "b".into()],
            n_classes: 2,
            feature_importances: vec![1.0, 0.0],
            trees,
        }
    }

    #[test]
    fn leaf_walk_follows_threshold() {
        let tree = stump(0.5);
        assert_eq!(tree.leaf_distribution(&[0.5, 0.0]), Some(&[1.0, 0.0][..]));
        assert_eq!(tree.leaf_distribution(&[0.6, 0.0]), Some(&[0.0, 1.0][..]));
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn proba_averages_trees() {
        let forest = model(vec![stump(0.5), stump(1.5)]);
        forest.validate().unwrap();
        let proba = forest.predict_proba(&[1.0, 0.0]).unwrap();
        assert!((proba[0] - 0.5).abs() < 1e-12);
        assert!((proba[1] - 0.5).abs() < 1e-12);
        // Ties resolve to the first class.
        assert_eq!(forest.predict_class_index(&[1.0, 0.0]), Ok(0));
        assert_eq!(forest.predict_class_index(&[2.0, 0.0]), Ok(1));
        assert_eq!(
            forest.predict_batch(&[vec![0.0, 0.0], vec![3.0, 0.0]]),
            Ok(vec![0, 1])
        );
    }

    #[test]
    fn rows_of_the_wrong_width_are_rejected() {
        let forest = model(vec![stump(0.5)]);
        let err = forest.predict_proba(&[0.1]).unwrap_err();
        assert!(err.contains("Expected 2 feature values, got 1"));
        assert!(forest.predict_proba(&[0.1, 0.2, 0.3]).is_err());
        assert!(forest.predict_batch(&[vec![0.0, 0.0], vec![0.0]]).is_err());
    }

    #[test]
    fn unvalidated_tree_with_dangling_child_is_an_error() {
        let mut forest = model(vec![stump(0.5)]);
        forest.trees[0].nodes[0] = TreeNode::Split {
            feature_index: 0,
            threshold: 0.5,
            left: 7,
            right: 2,
        };
        assert_eq!(forest.trees[0].leaf_distribution(&[0.0, 0.0]), None);
        assert!(forest.predict_proba(&[0.0, 0.0]).is_err());
        assert_eq!(forest.trees[0].leaf_distribution(&[0.9, 0.0]), Some(&[0.0, 1.0][..]));

        forest.trees[0].nodes[0] = TreeNode::Split {
            feature_index: 0,
            threshold: 0.5,
            left: 0,
            right: 2,
        };
        assert_eq!(forest.trees[0].leaf_distribution(&[0.0, 0.0]), None);
    }

    #[test]
    fn validate_rejects_broken_structure() {
        let mut forest = model(vec![stump(0.5)]);
        forest.trees[0].nodes[1] = TreeNode::Leaf {
            distribution: vec![1.0],
        };
        assert!(forest.validate().is_err());

        let mut forest = model(vec![stump(0.5)]);
        forest.trees[0].nodes[0] = TreeNode::Split {
            feature_index: 9,
            threshold: 0.0,
            left: 1,
            right: 2,
        };
        assert!(forest.validate().is_err());

        assert!(model(Vec::new()).validate().is_err());
    }

    #[test]
    fn ranking_sorts_descending() {
        let mut forest = model(vec![stump(0.5)]);
        forest.feature_importances = vec![0.25, 0.75];
        let ranking = forest.importance_ranking();
        assert_eq!(ranking[0].0, "b");
        assert_eq!(ranking[1].0, "a");
    }
}
