//! Forest training with parallel tree construction.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::ThreadPoolBuilder;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument, warn};

use crate::cancel::CancelToken;
use crate::config::{ForestConfig, ImportanceMode, SplitRule, TreeType, UnorderedPolicy};
use crate::data::{Dataset, LevelOrder};
use crate::error::ForestError;
use crate::importance::{RankedFeature, impurity_importance, rank_features};
use crate::oob::{OobAccumulator, OobSummary};
use crate::permutation::permutation_importance;
use crate::predict::prediction_width;
use crate::request::{FitPlan, TrainingRequest};
use crate::rng::{Purpose, RandomStream, draw_count};
use crate::tree::{Tree, TreeBuilder};

/// Resolved settings of the fit that produced a forest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TrainingMetadata {
    /// Hyperparameters as requested.
    pub config: ForestConfig,
    /// Split rule after defaults.
    pub split_rule: SplitRule,
    /// Unordered-column policy after defaults.
    pub unordered_policy: UnorderedPolicy,
    /// Features drawn per node.
    pub mtry: usize,
    /// Minimum rows per child after defaults.
    pub min_node_size: usize,
    /// Number of training rows.
    pub n_rows: usize,
    /// Worker-pool size actually requested from rayon (0 = all cores).
    pub num_threads: usize,
}

/// A fitted random forest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Forest {
    pub(crate) trees: Vec<Tree>,
    pub(crate) tree_type: TreeType,
    pub(crate) n_features: usize,
    pub(crate) feature_names: Vec<String>,
    pub(crate) class_values: Vec<f64>,
    pub(crate) unordered: Vec<bool>,
    /// Per column; empty unless the `Order` policy was used.
    pub(crate) level_orders: Vec<Option<LevelOrder>>,
    pub(crate) event_times: Vec<f64>,
    pub(crate) probability: bool,
    pub(crate) quantiles: bool,
    pub(crate) importance_mode: ImportanceMode,
    pub(crate) importance: Option<Vec<f64>>,
    pub(crate) local_importance: Option<Vec<Vec<f64>>>,
    pub(crate) oob: Option<OobSummary>,
    pub(crate) metadata: TrainingMetadata,
}

/// How each tree's bootstrap sample is drawn.
#[derive(Debug)]
enum Sampler<'a> {
    /// Caller-supplied rows per tree.
    Manual(&'a [Vec<usize>]),
    /// Classification: draws within each class.
    PerClass {
        rows_by_class: Vec<Vec<usize>>,
        fractions: &'a [f64],
        replace: bool,
    },
    /// Draws proportional to case weights.
    Weighted {
        weights: &'a [f64],
        size: usize,
        replace: bool,
        /// Zero-weight rows, the fixed OOB set in holdout mode.
        holdout: Option<Vec<usize>>,
    },
    Uniform {
        n_rows: usize,
        fraction: f64,
        replace: bool,
    },
}

impl<'a> Sampler<'a> {
    fn new(request: &'a TrainingRequest, data: &Dataset<'a>, plan: &'a FitPlan) -> Self {
        let config = request.config();
        let n_rows = data.num_rows();
        if let Some(inbag) = request.inbag() {
            return Sampler::Manual(inbag);
        }
        if let Some(fractions) = &plan.per_class_fraction {
            let mut rows_by_class = vec![Vec::new(); data.n_classes()];
            for (row, &class) in data.classes().iter().enumerate() {
                rows_by_class[class].push(row);
            }
            return Sampler::PerClass {
                rows_by_class,
                fractions,
                replace: config.replace(),
            };
        }
        match data.case_weights() {
            Some(weights) => Sampler::Weighted {
                weights,
                size: draw_count(n_rows, plan.sample_fraction),
                replace: config.replace(),
                holdout: config
                    .holdout
                    .then(|| (0..n_rows).filter(|&r| data.weight(r) == 0.0).collect()),
            },
            None => Sampler::Uniform {
                n_rows,
                fraction: plan.sample_fraction,
                replace: config.replace(),
            },
        }
    }

    /// Bootstrap rows in draw order, and the sorted OOB rows.
    fn draw(&self, tree_index: usize, n_rows: usize, rng: &mut RandomStream) -> (Vec<usize>, Vec<usize>) {
        let bootstrap = match self {
            Sampler::Manual(inbag) => inbag[tree_index].clone(),
            Sampler::PerClass {
                rows_by_class,
                fractions,
                replace,
            } => rows_by_class
                .iter()
                .zip(fractions.iter())
                .flat_map(|(rows, &fraction)| {
                    rng.bootstrap_indices(rows.len(), fraction, *replace)
                        .into_iter()
                        .map(|i| rows[i])
                        .collect::<Vec<_>>()
                })
                .collect(),
            Sampler::Weighted {
                weights,
                size,
                replace,
                ..
            } => rng.weighted_bootstrap(weights, *size, *replace),
            Sampler::Uniform {
                n_rows,
                fraction,
                replace,
            } => rng.bootstrap_indices(*n_rows, *fraction, *replace),
        };

        let oob = match self {
            Sampler::Weighted {
                holdout: Some(rows),
                ..
            } => rows.clone(),
            _ => {
                let mut in_bag = vec![false; n_rows];
                for &row in &bootstrap {
                    in_bag[row] = true;
                }
                (0..n_rows).filter(|&r| !in_bag[r]).collect()
            }
        };
        (bootstrap, oob)
    }
}

impl Forest {
    /// Grow a forest from a training request.
    ///
    /// # Errors
    ///
    /// Any validation error (kind [`InvalidInput`](crate::ErrorKind::InvalidInput)),
    /// or [`ForestError::ThreadPool`] when the worker pool cannot be created.
    pub fn fit(request: &TrainingRequest) -> Result<Self, ForestError> {
        Self::fit_with_cancel(request, &CancelToken::new())
    }

    /// Grow a forest, checking `cancel` before each tree.
    ///
    /// # Errors
    ///
    /// As [`fit`](Self::fit), plus [`ForestError::Cancelled`]. No partial forest
    /// is returned.
    #[instrument(skip_all, fields(
        n_trees = request.config().num_trees(),
        n_rows = request.features().n_rows(),
        n_features = request.features().n_cols()
    ))]
    pub fn fit_with_cancel(request: &TrainingRequest, cancel: &CancelToken) -> Result<Self, ForestError> {
        let plan = request.validate()?;
        let config = request.config();
        let data = Dataset::new(request, &plan);
        let n_rows = data.num_rows();
        let n_features = data.num_columns();

        info!(
            tree_type = ?plan.params.tree_type,
            split_rule = ?plan.params.split_rule,
            n_trees = config.num_trees,
            n_rows,
            n_features,
            mtry = plan.params.mtry,
            min_node_size = plan.params.min_node_size,
            num_threads = plan.num_threads,
            "training random forest"
        );

        let pool = ThreadPoolBuilder::new()
            .num_threads(plan.num_threads)
            .build()?;
        let sampler = Sampler::new(request, &data, &plan);

        let trees = pool.install(|| grow_trees(&data, &plan, &sampler, config, cancel))?;
        debug!(n_trees = trees.len(), "tree growth complete");

        let empty_oob = trees.iter().filter(|t| t.oob_rows().is_empty()).count();
        if empty_oob > 0 && (config.oob_error || config.importance == ImportanceMode::Permutation) {
            warn!(
                n_trees = empty_oob,
                "trees without out-of-bag rows are skipped in OOB estimates"
            );
        }

        let (importance, local_importance) = match config.importance {
            ImportanceMode::None => (None, None),
            ImportanceMode::Impurity => (Some(impurity_importance(&trees, n_features, false)), None),
            ImportanceMode::ImpurityCorrected => {
                (Some(impurity_importance(&trees, n_features, true)), None)
            }
            ImportanceMode::Permutation => {
                let result = pool.install(|| {
                    permutation_importance(
                        &trees,
                        &data,
                        config.seed,
                        config.scale_permutation_importance,
                        config.local_importance,
                    )
                });
                (Some(result.importance), result.local)
            }
        };

        let event_times = data
            .survival_index()
            .map(|index| index.event_times().to_vec())
            .unwrap_or_default();

        let oob = if config.oob_error {
            let width = prediction_width(plan.params.tree_type, plan.n_classes, event_times.len());
            let mut accumulator = OobAccumulator::new(n_rows, width, config.probability);
            for tree in &trees {
                accumulator.add_tree(tree, &data);
            }
            let summary = accumulator.finish(&data);
            if summary.is_none() {
                warn!("out-of-bag error is undefined for this forest");
            }
            summary
        } else {
            None
        };

        let forest = Self {
            trees,
            tree_type: plan.params.tree_type,
            n_features,
            feature_names: request.feature_names(),
            class_values: data.class_values().to_vec(),
            unordered: data.unordered_flags().to_vec(),
            level_orders: data.level_orders().to_vec(),
            event_times,
            probability: config.probability,
            quantiles: config.quantiles,
            importance_mode: config.importance,
            importance,
            local_importance,
            oob,
            metadata: TrainingMetadata {
                config: config.clone(),
                split_rule: plan.params.split_rule,
                unordered_policy: plan.policy,
                mtry: plan.params.mtry,
                min_node_size: plan.params.min_node_size,
                n_rows,
                num_threads: plan.num_threads,
            },
        };

        info!(
            oob_error = forest.oob.as_ref().map(|s| s.error),
            n_nodes = forest.trees.iter().map(Tree::n_nodes).sum::<usize>(),
            "random forest training complete"
        );
        Ok(forest)
    }

    // --- Accessors ---

    /// Borrow the trees, in growth order.
    #[must_use]
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return `true` when the forest holds at least one tree.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Return the tree type.
    #[must_use]
    pub fn tree_type(&self) -> TreeType {
        self.tree_type
    }

    /// Return the number of features the forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Sorted class values (classification); empty otherwise.
    #[must_use]
    pub fn class_values(&self) -> &[f64] {
        &self.class_values
    }

    /// Sorted unique training event times (survival); empty otherwise.
    #[must_use]
    pub fn event_times(&self) -> &[f64] {
        &self.event_times
    }

    /// Per-column unordered flags.
    #[must_use]
    pub fn unordered_features(&self) -> &[bool] {
        &self.unordered
    }

    /// Level ranking applied to each unordered column under the `Order` policy.
    #[must_use]
    pub fn level_orders(&self) -> &[Option<LevelOrder>] {
        &self.level_orders
    }

    /// Return whether leaf responses were retained for quantile prediction.
    #[must_use]
    pub fn retains_quantiles(&self) -> bool {
        self.quantiles
    }

    /// Return the importance mode used at fit time.
    #[must_use]
    pub fn importance_mode(&self) -> ImportanceMode {
        self.importance_mode
    }

    /// Variable importance per feature, in column order.
    #[must_use]
    pub fn importance(&self) -> Option<&[f64]> {
        self.importance.as_deref()
    }

    /// Features sorted by importance, descending. Empty when no importance was computed.
    #[must_use]
    pub fn ranked_importance(&self) -> Vec<RankedFeature> {
        self.importance
            .as_deref()
            .map(|importance| rank_features(importance, &self.feature_names))
            .unwrap_or_default()
    }

    /// Per-row permutation importance, rows by features.
    #[must_use]
    pub fn local_importance(&self) -> Option<&[Vec<f64>]> {
        self.local_importance.as_deref()
    }

    /// Out-of-bag evaluation, when computed and defined.
    #[must_use]
    pub fn oob(&self) -> Option<&OobSummary> {
        self.oob.as_ref()
    }

    /// Out-of-bag prediction error.
    #[must_use]
    pub fn oob_error(&self) -> Option<f64> {
        self.oob.as_ref().map(|s| s.error)
    }

    /// Return training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }
}

/// Grow every tree. Tree `i` always draws from substream `i`, and results are
/// stored by index, so the forest does not depend on the pool size.
fn grow_trees(
    data: &Dataset<'_>,
    plan: &FitPlan,
    sampler: &Sampler<'_>,
    config: &ForestConfig,
    cancel: &CancelToken,
) -> Result<Vec<Tree>, ForestError> {
    let total = config.num_trees;
    let seed = config.seed;
    let n_rows = data.num_rows();
    let grow_one = |index: usize, used: &mut [bool]| {
        let mut rng = RandomStream::substream(seed, Purpose::Growth, index);
        let (bootstrap, oob) = sampler.draw(index, n_rows, &mut rng);
        let tree = TreeBuilder::new(data, &plan.params).grow(bootstrap, oob, &mut rng, used);
        debug!(
            tree = index,
            n_nodes = tree.n_nodes(),
            depth = tree.depth(),
            "tree complete"
        );
        tree
    };

    if plan.params.regularization.is_some() {
        // Usage flags carry over from tree to tree.
        let mut used = vec![false; data.num_columns()];
        let mut trees = Vec::with_capacity(total);
        for index in 0..total {
            if cancel.is_cancelled() {
                return Err(ForestError::Cancelled {
                    completed: index,
                    total,
                });
            }
            trees.push(grow_one(index, used.as_mut_slice()));
        }
        return Ok(trees);
    }

    let completed = AtomicUsize::new(0);
    let grown: Vec<Option<Tree>> = (0..total)
        .into_par_iter()
        .map(|index| {
            if cancel.is_cancelled() {
                return None;
            }
            let tree = grow_one(index, &mut []);
            completed.fetch_add(1, Ordering::Relaxed);
            Some(tree)
        })
        .collect();
    grown
        .into_iter()
        .collect::<Option<Vec<Tree>>>()
        .ok_or_else(|| ForestError::Cancelled {
            completed: completed.load(Ordering::Relaxed),
            total,
        })
}
