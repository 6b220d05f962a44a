//! Seeded random forest classifier.
//!
//! CART trees grown on bootstrap samples with Gini impurity and per-split feature subsampling.
//! Leaves keep the class distribution of the samples that reached them, so probabilities are
//! the mean of leaf distributions across trees. Fitting is single-threaded and fully determined
//! by the training rows and `random_state`, and the fitted model exports to JSON.

mod model;
mod train;

pub use model::{DecisionTree, RandomForestModel, TreeNode, argmax};
pub use train::{ForestParams, MaxFeatures, TrainDataset, train_random_forest};
