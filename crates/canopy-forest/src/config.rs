//! Hyperparameter bundle for forest training.

use crate::error::ForestError;

/// Kind of forest, implied by the training target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TreeType {
    /// Class labels; leaves hold class distributions.
    Classification,
    /// Real-valued response; leaves hold means.
    Regression,
    /// Right-censored time-to-event; leaves hold cumulative hazard curves.
    Survival,
}

/// Objective used to choose a node's split.
///
/// Variants carry their own parameters; the splitter dispatches on the
/// variant with a `match`.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SplitRule {
    /// Regression: maximize the reduction of within-child sum of squares.
    Variance,
    /// Regression on (0, 1) responses: Beta log-likelihood of the children.
    Beta,
    /// Classification: minimize weighted Gini impurity of the children.
    Gini,
    /// Survival: maximize the two-sample log-rank statistic.
    LogRank,
    /// Survival: maximize |C - 0.5| of Harrell's C between child membership and outcome.
    Concordance,
    /// Any tree type: random thresholds per feature, base objective for the tree type.
    ExtraTrees {
        /// Thresholds drawn per candidate feature.
        num_random_splits: usize,
    },
    /// Regression and survival: maximally selected rank statistics with p-value selection.
    MaxStat {
        /// Significance threshold a split must beat.
        alpha: f64,
        /// Lower quantile of the feature range considered for cut points.
        minprop: f64,
    },
}

impl SplitRule {
    /// ExtraTrees with a single random split per feature.
    #[must_use]
    pub fn extra_trees() -> Self {
        SplitRule::ExtraTrees {
            num_random_splits: 1,
        }
    }

    /// MaxStat with `alpha = 0.5`, `minprop = 0.1`.
    #[must_use]
    pub fn maxstat() -> Self {
        SplitRule::MaxStat {
            alpha: 0.5,
            minprop: 0.1,
        }
    }

    /// The rule used when none is configured.
    #[must_use]
    pub fn default_for(tree_type: TreeType) -> Self {
        match tree_type {
            TreeType::Classification => SplitRule::Gini,
            TreeType::Regression => SplitRule::Variance,
            TreeType::Survival => SplitRule::LogRank,
        }
    }

    /// Whether the rule is defined for the tree type.
    #[must_use]
    pub fn supports(&self, tree_type: TreeType) -> bool {
        match self {
            SplitRule::Variance | SplitRule::Beta => tree_type == TreeType::Regression,
            SplitRule::Gini => tree_type == TreeType::Classification,
            SplitRule::LogRank | SplitRule::Concordance => tree_type == TreeType::Survival,
            SplitRule::ExtraTrees { .. } => true,
            SplitRule::MaxStat { .. } => tree_type != TreeType::Classification,
        }
    }
}

/// Strategy for the number of features drawn at each node.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Mtry {
    /// Square root of the feature count, rounded down (at least 1).
    Sqrt,
    /// A fraction of the feature count, rounded up.
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// Every feature.
    All,
}

impl Mtry {
    /// Resolve to a concrete count for `n_features` columns.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidMtry`] when the count falls outside `[1, n_features]`.
    pub fn resolve(self, n_features: usize) -> Result<usize, ForestError> {
        let resolved = match self {
            Mtry::Sqrt => ((n_features as f64).sqrt().floor() as usize).max(1),
            Mtry::Fraction(f) if f.is_finite() && f > 0.0 => (n_features as f64 * f).ceil() as usize,
            Mtry::Fraction(_) => 0,
            Mtry::Fixed(n) => n,
            Mtry::All => n_features,
        };
        if resolved == 0 || resolved > n_features {
            return Err(ForestError::InvalidMtry {
                mtry: resolved,
                n_features,
            });
        }
        Ok(resolved)
    }
}

/// Fraction of rows drawn for each tree's bootstrap sample.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SampleFraction {
    /// 1.0 with replacement, 0.632 without.
    Default,
    /// One fraction for all rows.
    Fraction(f64),
    /// Classification only: one fraction per class, in ascending class-value order.
    PerClass(Vec<f64>),
}

/// How unordered (categorical) columns are split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UnorderedPolicy {
    /// Treat levels as ordered numbers.
    Ignore,
    /// Rank levels by mean response once before growing, then split as ordered.
    Order,
    /// Split by partitioning the set of levels.
    Partition,
}

/// Variable importance computed after growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ImportanceMode {
    /// No importance.
    None,
    /// Mean split improvement per feature.
    Impurity,
    /// Impurity importance minus that of a row-permuted shadow copy of the
    /// feature, grown alongside the real columns (Nembrini et al., 2018).
    ImpurityCorrected,
    /// Mean increase of out-of-bag error when a feature is permuted.
    Permutation,
}

/// Configuration for forest training.
///
/// Construct via [`ForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter                      | Default                                            |
/// |--------------------------------|----------------------------------------------------|
/// | `mtry`                         | `Sqrt`                                             |
/// | `min_node_size`                | `None` (1 classification, 5 regression, 3 survival) |
/// | `max_depth`                    | 0 (unlimited)                                      |
/// | `split_rule`                   | `None` (Gini, Variance or LogRank)                 |
/// | `replace`                      | `true`                                             |
/// | `sample_fraction`              | `Default` (1.0 / 0.632)                            |
/// | `class_weights`                | `None`                                             |
/// | `split_select_weights`         | `None`                                             |
/// | `always_split_variables`       | empty                                              |
/// | `respect_unordered`            | `None` (Partition for ExtraTrees, else Ignore)     |
/// | `importance`                   | `None`                                             |
/// | `scale_permutation_importance` | `false`                                            |
/// | `local_importance`             | `false`                                            |
/// | `regularization_factor`        | empty                                              |
/// | `regularization_usedepth`      | `false`                                            |
/// | `holdout`                      | `false`                                            |
/// | `oob_error`                    | `true`                                             |
/// | `probability`                  | `false`                                            |
/// | `quantiles`                    | `false`                                            |
/// | `num_threads`                  | 0 (all cores)                                      |
/// | `seed`                         | 42                                                 |
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ForestConfig {
    pub(crate) num_trees: usize,
    pub(crate) mtry: Mtry,
    pub(crate) min_node_size: Option<usize>,
    pub(crate) max_depth: usize,
    pub(crate) split_rule: Option<SplitRule>,
    pub(crate) replace: bool,
    pub(crate) sample_fraction: SampleFraction,
    pub(crate) class_weights: Option<Vec<f64>>,
    pub(crate) split_select_weights: Option<Vec<f64>>,
    pub(crate) always_split_variables: Vec<usize>,
    pub(crate) respect_unordered: Option<UnorderedPolicy>,
    pub(crate) importance: ImportanceMode,
    pub(crate) scale_permutation_importance: bool,
    pub(crate) local_importance: bool,
    pub(crate) regularization_factor: Vec<f64>,
    pub(crate) regularization_usedepth: bool,
    pub(crate) holdout: bool,
    pub(crate) oob_error: bool,
    pub(crate) probability: bool,
    pub(crate) quantiles: bool,
    pub(crate) num_threads: usize,
    pub(crate) seed: u64,
}

impl ForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `num_trees` is zero.
    pub fn new(num_trees: usize) -> Result<Self, ForestError> {
        if num_trees == 0 {
            return Err(ForestError::InvalidTreeCount { num_trees });
        }
        Ok(Self {
            num_trees,
            mtry: Mtry::Sqrt,
            min_node_size: None,
            max_depth: 0,
            split_rule: None,
            replace: true,
            sample_fraction: SampleFraction::Default,
            class_weights: None,
            split_select_weights: None,
            always_split_variables: Vec::new(),
            respect_unordered: None,
            importance: ImportanceMode::None,
            scale_permutation_importance: false,
            local_importance: false,
            regularization_factor: Vec::new(),
            regularization_usedepth: false,
            holdout: false,
            oob_error: true,
            probability: false,
            quantiles: false,
            num_threads: 0,
            seed: 42,
        })
    }

    // --- Setters ---

    /// Set the per-node feature count strategy.
    #[must_use]
    pub fn with_mtry(mut self, mtry: Mtry) -> Self {
        self.mtry = mtry;
        self
    }

    /// Set the minimum number of rows per child. `None` picks the tree-type default.
    #[must_use]
    pub fn with_min_node_size(mut self, min_node_size: Option<usize>) -> Self {
        self.min_node_size = min_node_size;
        self
    }

    /// Set the maximum tree depth. 0 means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the split rule. `None` picks the tree-type default.
    #[must_use]
    pub fn with_split_rule(mut self, split_rule: Option<SplitRule>) -> Self {
        self.split_rule = split_rule;
        self
    }

    /// Sample with or without replacement.
    #[must_use]
    pub fn with_replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    /// Set the bootstrap sample fraction.
    #[must_use]
    pub fn with_sample_fraction(mut self, sample_fraction: SampleFraction) -> Self {
        self.sample_fraction = sample_fraction;
        self
    }

    /// Set the class weights used by the Gini objective.
    #[must_use]
    pub fn with_class_weights(mut self, class_weights: Option<Vec<f64>>) -> Self {
        self.class_weights = class_weights;
        self
    }

    /// Set per-feature selection probabilities for the mtry draw.
    #[must_use]
    pub fn with_split_select_weights(mut self, weights: Option<Vec<f64>>) -> Self {
        self.split_select_weights = weights;
        self
    }

    /// Set features that join every node's candidate set.
    #[must_use]
    pub fn with_always_split_variables(mut self, features: Vec<usize>) -> Self {
        self.always_split_variables = features;
        self
    }

    /// Set the unordered-column policy. `None` picks the split-rule default.
    #[must_use]
    pub fn with_respect_unordered(mut self, policy: Option<UnorderedPolicy>) -> Self {
        self.respect_unordered = policy;
        self
    }

    /// Set the variable importance mode.
    #[must_use]
    pub fn with_importance(mut self, importance: ImportanceMode) -> Self {
        self.importance = importance;
        self
    }

    /// Scale permutation importance by its standard error.
    #[must_use]
    pub fn with_scale_permutation_importance(mut self, scale: bool) -> Self {
        self.scale_permutation_importance = scale;
        self
    }

    /// Also compute per-row permutation importance.
    #[must_use]
    pub fn with_local_importance(mut self, local: bool) -> Self {
        self.local_importance = local;
        self
    }

    /// Set regularization factors (length 1 or one per feature, each in [0, 1]).
    #[must_use]
    pub fn with_regularization_factor(mut self, factors: Vec<f64>) -> Self {
        self.regularization_factor = factors;
        self
    }

    /// Raise the regularization factor to the power `depth + 1`.
    #[must_use]
    pub fn with_regularization_usedepth(mut self, usedepth: bool) -> Self {
        self.regularization_usedepth = usedepth;
        self
    }

    /// Hold out zero-weight rows as the out-of-bag set.
    #[must_use]
    pub fn with_holdout(mut self, holdout: bool) -> Self {
        self.holdout = holdout;
        self
    }

    /// Compute the out-of-bag prediction error.
    #[must_use]
    pub fn with_oob_error(mut self, oob_error: bool) -> Self {
        self.oob_error = oob_error;
        self
    }

    /// Average class distributions instead of voting (classification).
    #[must_use]
    pub fn with_probability(mut self, probability: bool) -> Self {
        self.probability = probability;
        self
    }

    /// Retain leaf responses for quantile prediction (regression).
    #[must_use]
    pub fn with_quantiles(mut self, quantiles: bool) -> Self {
        self.quantiles = quantiles;
        self
    }

    /// Set the worker-pool size. 0 uses every core.
    #[must_use]
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn num_trees(&self) -> usize {
        self.num_trees
    }

    /// Return the mtry strategy.
    #[must_use]
    pub fn mtry(&self) -> Mtry {
        self.mtry
    }

    /// Return the configured minimum node size, if any.
    #[must_use]
    pub fn min_node_size(&self) -> Option<usize> {
        self.min_node_size
    }

    /// Return the maximum depth (0 = unlimited).
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the configured split rule, if any.
    #[must_use]
    pub fn split_rule(&self) -> Option<SplitRule> {
        self.split_rule
    }

    /// Return whether bootstrap samples are drawn with replacement.
    #[must_use]
    pub fn replace(&self) -> bool {
        self.replace
    }

    /// Return the sample fraction setting.
    #[must_use]
    pub fn sample_fraction(&self) -> &SampleFraction {
        &self.sample_fraction
    }

    /// Return the importance mode.
    #[must_use]
    pub fn importance(&self) -> ImportanceMode {
        self.importance
    }

    /// Return whether OOB error is computed.
    #[must_use]
    pub fn oob_error(&self) -> bool {
        self.oob_error
    }

    /// Return whether classification predictions average distributions.
    #[must_use]
    pub fn probability(&self) -> bool {
        self.probability
    }

    /// Return whether leaf responses are retained for quantiles.
    #[must_use]
    pub fn quantiles(&self) -> bool {
        self.quantiles
    }

    /// Return the worker-pool size (0 = all cores).
    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    // --- Resolution against a tree type ---

    pub(crate) fn resolved_split_rule(&self, tree_type: TreeType) -> SplitRule {
        self.split_rule
            .unwrap_or_else(|| SplitRule::default_for(tree_type))
    }

    pub(crate) fn resolved_min_node_size(&self, tree_type: TreeType) -> usize {
        self.min_node_size.unwrap_or(match tree_type {
            TreeType::Classification => 1,
            TreeType::Regression => 5,
            TreeType::Survival => 3,
        })
    }

    pub(crate) fn resolved_unordered_policy(&self) -> UnorderedPolicy {
        self.respect_unordered.unwrap_or(match self.split_rule {
            Some(SplitRule::ExtraTrees { .. }) => UnorderedPolicy::Partition,
            _ => UnorderedPolicy::Ignore,
        })
    }

    /// Single fraction used when the setting is not per-class.
    pub(crate) fn resolved_sample_fraction(&self) -> f64 {
        match &self.sample_fraction {
            SampleFraction::Fraction(f) => *f,
            SampleFraction::Default | SampleFraction::PerClass(_) => {
                if self.replace {
                    1.0
                } else {
                    0.632
                }
            }
        }
    }

    /// Regularization is active unless every factor is 1.
    pub(crate) fn uses_regularization(&self) -> bool {
        self.regularization_factor.iter().any(|&f| f != 1.0)
    }
}
