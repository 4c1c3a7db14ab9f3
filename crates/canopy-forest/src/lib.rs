//! Random forests for classification, regression and right-censored survival data.
//!
//! Build a [`TrainingRequest`] from a feature [`Matrix`], a [`Target`] and a
//! [`ForestConfig`], grow a [`Forest`] with [`Forest::fit`], then predict new
//! rows with [`Forest::predict`]. Trees grow in parallel on a rayon pool; each
//! tree draws from its own seeded ChaCha stream, so a forest depends only on
//! its request and seed.
//!
//! Split rules cover variance, Beta log-likelihood, Gini, log-rank,
//! concordance, extremely randomized trees and maximally selected rank
//! statistics. Missing feature values (`NaN`) follow the larger child of each
//! split. Fitted forests carry variable importance and out-of-bag error, and
//! round-trip through a versioned bincode format.

mod cancel;
mod config;
mod criterion;
mod data;
mod error;
mod forest;
mod importance;
mod matrix;
mod maxstat;
mod metrics;
mod node;
mod oob;
mod permutation;
mod predict;
mod quantile;
mod request;
mod rng;
mod serialize;
mod split;
mod survival;
mod tree;

pub use cancel::CancelToken;
pub use config::{
    ForestConfig, ImportanceMode, Mtry, SampleFraction, SplitRule, TreeType, UnorderedPolicy,
};
pub use data::LevelOrder;
pub use error::{ErrorKind, ForestError};
pub use forest::{Forest, TrainingMetadata};
pub use importance::RankedFeature;
pub use matrix::Matrix;
pub use metrics::{ConfusionMatrix, misclassification, mse};
pub use node::{FeatureIndex, LeafValue, Node, NodeIndex, SplitPredicate};
pub use oob::OobSummary;
pub use predict::{PredictionRequest, PredictionResult, PredictionType};
pub use request::{Target, TrainingRequest};
pub use rng::RandomStream;
pub use tree::Tree;
