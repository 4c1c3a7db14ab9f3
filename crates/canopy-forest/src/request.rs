//! Training requests and their eager validation.

use tracing::warn;

use crate::config::{
    ForestConfig, ImportanceMode, SampleFraction, SplitRule, TreeType, UnorderedPolicy,
};
use crate::data::{MAX_LEVELS, class_values};
use crate::error::ForestError;
use crate::forest::Forest;
use crate::matrix::Matrix;
use crate::rng::draw_count;

/// Training target, one or two columns depending on the tree type.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Real-valued response.
    Regression(Vec<f64>),
    /// Class labels. Any finite values; classes are their sorted unique values.
    Classification(Vec<f64>),
    /// Right-censored survival outcome.
    Survival {
        /// Observed time (event or censoring).
        time: Vec<f64>,
        /// 1 for an observed event, 0 for censoring.
        status: Vec<f64>,
    },
}

impl Target {
    /// The tree type this target trains.
    #[must_use]
    pub fn tree_type(&self) -> TreeType {
        match self {
            Target::Regression(_) => TreeType::Regression,
            Target::Classification(_) => TreeType::Classification,
            Target::Survival { .. } => TreeType::Survival,
        }
    }

    fn len(&self) -> usize {
        match self {
            Target::Regression(y) | Target::Classification(y) => y.len(),
            Target::Survival { time, .. } => time.len(),
        }
    }
}

/// Everything one fit call needs: data, target, weights and hyperparameters.
///
/// Built once with the `with_*` methods, then read-only.
#[derive(Debug, Clone)]
pub struct TrainingRequest {
    features: Matrix,
    target: Target,
    case_weights: Option<Vec<f64>>,
    unordered_features: Vec<usize>,
    feature_names: Option<Vec<String>>,
    inbag: Option<Vec<Vec<usize>>>,
    config: ForestConfig,
}

impl TrainingRequest {
    /// Create a request with uniform case weights and all columns ordered.
    #[must_use]
    pub fn new(features: Matrix, target: Target, config: ForestConfig) -> Self {
        Self {
            features,
            target,
            case_weights: None,
            unordered_features: Vec::new(),
            feature_names: None,
            inbag: None,
            config,
        }
    }

    /// Set per-row case weights; bootstrap draws are proportional to them.
    #[must_use]
    pub fn with_case_weights(mut self, weights: Vec<f64>) -> Self {
        self.case_weights = Some(weights);
        self
    }

    /// Mark columns as unordered (categorical levels in `[0, 64)`).
    #[must_use]
    pub fn with_unordered_features(mut self, columns: Vec<usize>) -> Self {
        self.unordered_features = columns;
        self
    }

    /// Name the feature columns. Defaults to `x0, x1, ...`.
    #[must_use]
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.feature_names = Some(names);
        self
    }

    /// Use these row indices as each tree's bootstrap sample instead of drawing one.
    #[must_use]
    pub fn with_inbag(mut self, inbag: Vec<Vec<usize>>) -> Self {
        self.inbag = Some(inbag);
        self
    }

    /// Borrow the feature matrix.
    #[must_use]
    pub fn features(&self) -> &Matrix {
        &self.features
    }

    /// Borrow the target.
    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Borrow the case weights, if any.
    #[must_use]
    pub fn case_weights(&self) -> Option<&[f64]> {
        self.case_weights.as_deref()
    }

    /// Borrow the unordered column indices.
    #[must_use]
    pub fn unordered_features(&self) -> &[usize] {
        &self.unordered_features
    }

    /// Borrow the manual in-bag rows, if any.
    #[must_use]
    pub fn inbag(&self) -> Option<&[Vec<usize>]> {
        self.inbag.as_deref()
    }

    /// Borrow the hyperparameters.
    #[must_use]
    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Feature names, generated when none were given.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        match &self.feature_names {
            Some(names) => names.clone(),
            None => (0..self.features.n_cols()).map(|c| format!("x{c}")).collect(),
        }
    }

    /// Grow a forest from this request.
    ///
    /// # Errors
    ///
    /// Any [`ForestError`] of kind [`InvalidInput`](crate::ErrorKind::InvalidInput)
    /// found by validation, or a pool construction failure.
    pub fn fit(&self) -> Result<Forest, ForestError> {
        Forest::fit(self)
    }

    /// Check every input and hyperparameter, and resolve defaults.
    pub(crate) fn validate(&self) -> Result<FitPlan, ForestError> {
        let n_rows = self.features.n_rows();
        let n_features = self.features.n_cols();
        let config = &self.config;
        let tree_type = self.target.tree_type();

        if config.num_trees == 0 {
            return Err(ForestError::InvalidTreeCount {
                num_trees: config.num_trees,
            });
        }
        if n_rows == 0 {
            return Err(ForestError::EmptyDataset);
        }
        if n_features == 0 {
            return Err(ForestError::ZeroFeatures);
        }
        for column in 0..n_features {
            if let Some(row) = self
                .features
                .column(column)
                .iter()
                .position(|v| v.is_infinite())
            {
                return Err(ForestError::InfiniteValue { row, column });
            }
        }

        // --- Target ---
        if self.target.len() != n_rows {
            return Err(ForestError::RowLengthMismatch {
                what: "target",
                expected: n_rows,
                got: self.target.len(),
            });
        }
        let n_classes = self.validate_target()?;

        if let Some(names) = &self.feature_names
            && names.len() != n_features
        {
            return Err(ForestError::FeatureNamesMismatch {
                expected: n_features,
                got: names.len(),
            });
        }

        // --- Split rule ---
        let split_rule = config.resolved_split_rule(tree_type);
        if !split_rule.supports(tree_type) {
            return Err(ForestError::IncompatibleSplitRule {
                rule: split_rule,
                tree_type,
            });
        }
        match split_rule {
            SplitRule::ExtraTrees { num_random_splits } if num_random_splits == 0 => {
                return Err(ForestError::InvalidRuleParameter {
                    name: "num_random_splits",
                    value: 0.0,
                });
            }
            SplitRule::MaxStat { alpha, .. } if !(alpha > 0.0 && alpha < 1.0) => {
                return Err(ForestError::InvalidRuleParameter {
                    name: "alpha",
                    value: alpha,
                });
            }
            SplitRule::MaxStat { minprop, .. } if !(0.0..0.5).contains(&minprop) => {
                return Err(ForestError::InvalidRuleParameter {
                    name: "minprop",
                    value: minprop,
                });
            }
            SplitRule::Beta => {
                if let Target::Regression(y) = &self.target
                    && let Some(row) = y.iter().position(|&v| v <= 0.0 || v >= 1.0)
                {
                    return Err(ForestError::TargetOutOfDomain {
                        rule: split_rule,
                        row,
                        value: y[row],
                    });
                }
            }
            _ => {}
        }

        // --- Unordered columns ---
        let policy = config.resolved_unordered_policy();
        let mut unordered = vec![false; n_features];
        for &column in &self.unordered_features {
            if column >= n_features {
                return Err(ForestError::FeatureOutOfRange {
                    what: "unordered_features",
                    feature: column,
                    n_features,
                });
            }
            unordered[column] = true;
            if policy != UnorderedPolicy::Ignore {
                for (row, &value) in self.features.column(column).iter().enumerate() {
                    let valid = value.is_nan()
                        || (value >= 0.0 && value < MAX_LEVELS as f64 && value.fract() == 0.0);
                    if !valid {
                        return Err(ForestError::InvalidLevel { row, column, value });
                    }
                }
            }
        }

        // --- Node sizes ---
        let mtry = config.mtry.resolve(n_features)?;
        if config.min_node_size == Some(0) {
            return Err(ForestError::InvalidMinNodeSize { min_node_size: 0 });
        }
        let min_node_size = config.resolved_min_node_size(tree_type);

        // --- Sampling ---
        let per_class = self.validate_sample_fraction(tree_type, n_classes)?;
        let case_weights = self.validate_case_weights(n_rows)?;
        if per_class.is_some() && case_weights.is_some() {
            return Err(ForestError::ConflictingOptions {
                first: "per-class sample_fraction",
                second: "case weights",
            });
        }
        if config.holdout && case_weights.is_none() {
            return Err(ForestError::ConflictingOptions {
                first: "holdout",
                second: "uniform case weights",
            });
        }
        if let Some(inbag) = &self.inbag {
            self.validate_inbag(inbag, n_rows, per_class.is_some())?;
        } else if per_class.is_none() {
            let fraction = config.resolved_sample_fraction();
            if draw_count(n_rows, fraction) == 0 {
                return Err(ForestError::InvalidSampleFraction {
                    fraction,
                    replace: config.replace,
                });
            }
        }

        // --- Per-class and per-feature weights ---
        let class_weights = match (&config.class_weights, tree_type) {
            (None, TreeType::Classification) => vec![1.0; n_classes],
            (None, _) => Vec::new(),
            (Some(_), TreeType::Regression | TreeType::Survival) => {
                return Err(ForestError::UnsupportedOption {
                    option: "class_weights",
                    tree_type,
                });
            }
            (Some(weights), TreeType::Classification) => {
                if weights.len() != n_classes || weights.iter().any(|w| !w.is_finite() || *w < 0.0)
                {
                    return Err(ForestError::InvalidClassWeights {
                        expected: n_classes,
                        got: weights.len(),
                    });
                }
                weights.clone()
            }
        };

        if let Some(weights) = &config.split_select_weights
            && (weights.len() != n_features || weights.iter().any(|w| !(0.0..=1.0).contains(w)))
        {
            return Err(ForestError::InvalidSplitSelectWeights {
                expected: n_features,
                got: weights.len(),
            });
        }

        let mut always_split = config.always_split_variables.clone();
        if let Some(&feature) = always_split.iter().find(|&&f| f >= n_features) {
            return Err(ForestError::FeatureOutOfRange {
                what: "always_split_variables",
                feature,
                n_features,
            });
        }
        always_split.sort_unstable();
        always_split.dedup();

        // --- Regularization ---
        let regularization = self.validate_regularization(n_features)?;
        let mut num_threads = config.num_threads;
        if regularization.is_some() && num_threads != 1 {
            warn!(
                requested_threads = num_threads,
                "regularization requires sequential growth; using one thread"
            );
            num_threads = 1;
        }

        // --- Tree-type restricted options ---
        if config.quantiles && tree_type != TreeType::Regression {
            return Err(ForestError::UnsupportedOption {
                option: "quantiles",
                tree_type,
            });
        }
        if config.probability && tree_type != TreeType::Classification {
            return Err(ForestError::UnsupportedOption {
                option: "probability",
                tree_type,
            });
        }
        if config.importance == ImportanceMode::ImpurityCorrected {
            if config.split_select_weights.is_some() {
                return Err(ForestError::ConflictingOptions {
                    first: "impurity_corrected importance",
                    second: "split_select_weights",
                });
            }
            if regularization.is_some() {
                return Err(ForestError::ConflictingOptions {
                    first: "impurity_corrected importance",
                    second: "regularization",
                });
            }
        }
        if config.local_importance {
            if config.importance != ImportanceMode::Permutation {
                return Err(ForestError::ConflictingOptions {
                    first: "local_importance",
                    second: "non-permutation importance",
                });
            }
            if tree_type == TreeType::Survival {
                return Err(ForestError::UnsupportedOption {
                    option: "local_importance",
                    tree_type,
                });
            }
        }

        Ok(FitPlan {
            params: GrowthParams {
                tree_type,
                split_rule,
                mtry,
                min_node_size,
                max_depth: config.max_depth,
                class_weights,
                split_select_weights: config.split_select_weights.clone(),
                always_split,
                regularization,
                regularization_usedepth: config.regularization_usedepth,
                quantiles: config.quantiles,
            },
            policy,
            unordered,
            n_classes,
            sample_fraction: config.resolved_sample_fraction(),
            per_class_fraction: per_class,
            num_threads,
            shadow_seed: (config.importance == ImportanceMode::ImpurityCorrected)
                .then_some(config.seed),
        })
    }

    /// Returns the number of classes (0 for non-classification targets).
    fn validate_target(&self) -> Result<usize, ForestError> {
        match &self.target {
            Target::Regression(y) => {
                if let Some(row) = y.iter().position(|v| !v.is_finite()) {
                    return Err(ForestError::NonFiniteTarget { row });
                }
                Ok(0)
            }
            Target::Classification(labels) => {
                if let Some(row) = labels.iter().position(|v| !v.is_finite()) {
                    return Err(ForestError::NonFiniteTarget { row });
                }
                Ok(class_values(labels).len())
            }
            Target::Survival { time, status } => {
                if status.len() != time.len() {
                    return Err(ForestError::RowLengthMismatch {
                        what: "survival status",
                        expected: time.len(),
                        got: status.len(),
                    });
                }
                if let Some(row) = time.iter().position(|t| !t.is_finite() || *t < 0.0) {
                    return Err(ForestError::InvalidSurvivalTime {
                        row,
                        time: time[row],
                    });
                }
                if let Some(row) = status.iter().position(|s| *s != 0.0 && *s != 1.0) {
                    return Err(ForestError::InvalidEventIndicator {
                        row,
                        value: status[row],
                    });
                }
                Ok(0)
            }
        }
    }

    fn validate_sample_fraction(
        &self,
        tree_type: TreeType,
        n_classes: usize,
    ) -> Result<Option<Vec<f64>>, ForestError> {
        let replace = self.config.replace;
        let check = |fraction: f64| -> Result<(), ForestError> {
            if !fraction.is_finite() || fraction <= 0.0 || (!replace && fraction > 1.0) {
                return Err(ForestError::InvalidSampleFraction { fraction, replace });
            }
            Ok(())
        };
        match &self.config.sample_fraction {
            SampleFraction::Default => Ok(None),
            SampleFraction::Fraction(f) => {
                check(*f)?;
                Ok(None)
            }
            SampleFraction::PerClass(fractions) => {
                if tree_type != TreeType::Classification {
                    return Err(ForestError::UnsupportedOption {
                        option: "per-class sample_fraction",
                        tree_type,
                    });
                }
                if fractions.len() != n_classes {
                    return Err(ForestError::SampleFractionLengthMismatch {
                        expected: n_classes,
                        got: fractions.len(),
                    });
                }
                for &f in fractions {
                    check(f)?;
                }
                Ok(Some(fractions.clone()))
            }
        }
    }

    fn validate_case_weights(&self, n_rows: usize) -> Result<Option<&[f64]>, ForestError> {
        let Some(weights) = &self.case_weights else {
            return Ok(None);
        };
        if weights.len() != n_rows {
            return Err(ForestError::RowLengthMismatch {
                what: "case weights",
                expected: n_rows,
                got: weights.len(),
            });
        }
        if let Some(row) = weights.iter().position(|w| !w.is_finite() || *w < 0.0) {
            return Err(ForestError::InvalidCaseWeight {
                row,
                weight: weights[row],
            });
        }
        if weights.iter().all(|&w| w == 0.0) {
            return Err(ForestError::AllCaseWeightsZero);
        }
        Ok(Some(weights))
    }

    fn validate_inbag(
        &self,
        inbag: &[Vec<usize>],
        n_rows: usize,
        per_class: bool,
    ) -> Result<(), ForestError> {
        if inbag.len() != self.config.num_trees {
            return Err(ForestError::InbagLengthMismatch {
                expected: self.config.num_trees,
                got: inbag.len(),
            });
        }
        if self.case_weights.is_some() {
            return Err(ForestError::ConflictingOptions {
                first: "inbag",
                second: "case weights",
            });
        }
        if per_class {
            return Err(ForestError::ConflictingOptions {
                first: "inbag",
                second: "per-class sample_fraction",
            });
        }
        for (tree, rows) in inbag.iter().enumerate() {
            if rows.is_empty() {
                return Err(ForestError::InvalidInbag {
                    tree,
                    reason: "bootstrap sample is empty".to_string(),
                });
            }
            if let Some(&row) = rows.iter().find(|&&r| r >= n_rows) {
                return Err(ForestError::InvalidInbag {
                    tree,
                    reason: format!("row {row} is out of range for {n_rows} rows"),
                });
            }
        }
        Ok(())
    }

    /// Expand the regularization vector to one factor per feature, or `None` when disabled.
    fn validate_regularization(&self, n_features: usize) -> Result<Option<Vec<f64>>, ForestError> {
        let factors = &self.config.regularization_factor;
        if factors.is_empty() {
            return Ok(None);
        }
        if factors.len() != 1 && factors.len() != n_features {
            return Err(ForestError::RegularizationLengthMismatch {
                expected: n_features,
                got: factors.len(),
            });
        }
        if let Some(feature) = factors.iter().position(|f| !(0.0..=1.0).contains(f)) {
            return Err(ForestError::InvalidRegularization {
                feature,
                factor: factors[feature],
            });
        }
        if !self.config.uses_regularization() {
            return Ok(None);
        }
        if factors.len() == 1 {
            Ok(Some(vec![factors[0]; n_features]))
        } else {
            Ok(Some(factors.clone()))
        }
    }
}

/// Hyperparameters the tree builder and splitter read, resolved and validated.
#[derive(Debug, Clone)]
pub(crate) struct GrowthParams {
    pub(crate) tree_type: TreeType,
    pub(crate) split_rule: SplitRule,
    pub(crate) mtry: usize,
    pub(crate) min_node_size: usize,
    pub(crate) max_depth: usize,
    /// One weight per class for classification, empty otherwise.
    pub(crate) class_weights: Vec<f64>,
    pub(crate) split_select_weights: Option<Vec<f64>>,
    /// Sorted, deduplicated.
    pub(crate) always_split: Vec<usize>,
    /// One factor per feature when regularization is active.
    pub(crate) regularization: Option<Vec<f64>>,
    pub(crate) regularization_usedepth: bool,
    pub(crate) quantiles: bool,
}

/// Outcome of validation: everything `Forest::fit` needs beyond the raw request.
#[derive(Debug, Clone)]
pub(crate) struct FitPlan {
    pub(crate) params: GrowthParams,
    pub(crate) policy: UnorderedPolicy,
    pub(crate) unordered: Vec<bool>,
    pub(crate) n_classes: usize,
    pub(crate) sample_fraction: f64,
    pub(crate) per_class_fraction: Option<Vec<f64>>,
    pub(crate) num_threads: usize,
    /// Seed of the shadow-row permutation for corrected impurity importance.
    pub(crate) shadow_seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mtry;
    use crate::error::ErrorKind;

    fn matrix(n_rows: usize, n_cols: usize) -> Matrix {
        let columns: Vec<Vec<f64>> = (0..n_cols)
            .map(|c| (0..n_rows).map(|r| (r * (c + 1)) as f64).collect())
            .collect();
        Matrix::from_columns(&columns).unwrap()
    }

    fn regression(n_rows: usize, n_cols: usize, config: ForestConfig) -> TrainingRequest {
        let y = (0..n_rows).map(|r| r as f64).collect();
        TrainingRequest::new(matrix(n_rows, n_cols), Target::Regression(y), config)
    }

    fn config() -> ForestConfig {
        ForestConfig::new(5).unwrap()
    }

    #[test]
    fn valid_request_resolves_defaults() {
        let plan = regression(20, 4, config()).validate().unwrap();
        assert_eq!(plan.params.tree_type, TreeType::Regression);
        assert_eq!(plan.params.split_rule, SplitRule::Variance);
        assert_eq!(plan.params.mtry, 2);
        assert_eq!(plan.params.min_node_size, 5);
        assert!((plan.sample_fraction - 1.0).abs() < f64::EPSILON);
        assert!(plan.params.regularization.is_none());
    }

    #[test]
    fn mtry_out_of_range() {
        let err = regression(20, 4, config().with_mtry(Mtry::Fixed(5)))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ForestError::InvalidMtry { mtry: 5, n_features: 4 }));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn beta_requires_unit_interval_targets() {
        let err = regression(20, 2, config().with_split_rule(Some(SplitRule::Beta)))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ForestError::TargetOutOfDomain { row: 0, .. }));

        let y = (0..20).map(|r| (r as f64 + 1.0) / 22.0).collect();
        let ok = TrainingRequest::new(
            matrix(20, 2),
            Target::Regression(y),
            config().with_split_rule(Some(SplitRule::Beta)),
        );
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn sample_fraction_above_one_needs_replacement() {
        let err = regression(
            20,
            2,
            config()
                .with_replace(false)
                .with_sample_fraction(SampleFraction::Fraction(1.5)),
        )
        .validate()
        .unwrap_err();
        assert!(matches!(
            err,
            ForestError::InvalidSampleFraction { replace: false, .. }
        ));
        let ok = regression(
            20,
            2,
            config().with_sample_fraction(SampleFraction::Fraction(1.5)),
        );
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn regularization_validation() {
        for factors in [vec![1.1], vec![-0.1]] {
            let err = regression(20, 3, config().with_regularization_factor(factors))
                .validate()
                .unwrap_err();
            assert!(matches!(err, ForestError::InvalidRegularization { .. }));
        }
        let err = regression(20, 3, config().with_regularization_factor(vec![1.0, 1.0]))
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            ForestError::RegularizationLengthMismatch { expected: 3, got: 2 }
        ));

        let ones = regression(20, 3, config().with_regularization_factor(vec![1.0; 3]))
            .validate()
            .unwrap();
        assert!(ones.params.regularization.is_none());

        let plan = regression(
            20,
            3,
            config()
                .with_regularization_factor(vec![0.5])
                .with_num_threads(2),
        )
        .validate()
        .unwrap();
        assert_eq!(plan.params.regularization, Some(vec![0.5; 3]));
        assert_eq!(plan.num_threads, 1);
    }

    #[test]
    fn inbag_length_must_match_tree_count() {
        let err = regression(20, 2, config())
            .with_inbag(vec![vec![1, 2, 3], vec![2, 3, 4]])
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            ForestError::InbagLengthMismatch { expected: 5, got: 2 }
        ));
    }

    #[test]
    fn inbag_conflicts_with_case_weights() {
        let request = regression(20, 2, ForestConfig::new(2).unwrap())
            .with_inbag(vec![vec![1, 2, 3], vec![2, 3, 4]])
            .with_case_weights(vec![1.0; 20]);
        assert!(matches!(
            request.validate().unwrap_err(),
            ForestError::ConflictingOptions { first: "inbag", .. }
        ));
    }

    #[test]
    fn incompatible_split_rule() {
        let err = regression(20, 2, config().with_split_rule(Some(SplitRule::Gini)))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ForestError::IncompatibleSplitRule { .. }));
    }

    #[test]
    fn survival_status_must_be_binary() {
        let request = TrainingRequest::new(
            matrix(3, 1),
            Target::Survival {
                time: vec![1.0, 2.0, 3.0],
                status: vec![1.0, 2.0, 0.0],
            },
            config(),
        );
        assert!(matches!(
            request.validate().unwrap_err(),
            ForestError::InvalidEventIndicator { row: 1, .. }
        ));
    }

    #[test]
    fn unordered_levels_must_be_small_integers() {
        let m = Matrix::from_columns(&[vec![0.0, 1.5, 2.0]]).unwrap();
        let request = TrainingRequest::new(
            m,
            Target::Regression(vec![1.0, 2.0, 3.0]),
            config().with_respect_unordered(Some(UnorderedPolicy::Partition)),
        )
        .with_unordered_features(vec![0]);
        assert!(matches!(
            request.validate().unwrap_err(),
            ForestError::InvalidLevel { row: 1, column: 0, .. }
        ));
    }

    #[test]
    fn quantiles_only_for_regression() {
        let request = TrainingRequest::new(
            matrix(4, 1),
            Target::Classification(vec![0.0, 1.0, 0.0, 1.0]),
            config().with_quantiles(true),
        );
        assert!(matches!(
            request.validate().unwrap_err(),
            ForestError::UnsupportedOption { option: "quantiles", .. }
        ));
    }

    #[test]
    fn infinite_feature_rejected_but_nan_accepted() {
        let m = Matrix::from_columns(&[vec![1.0, f64::NAN, 3.0]]).unwrap();
        let ok = TrainingRequest::new(m, Target::Regression(vec![1.0, 2.0, 3.0]), config());
        assert!(ok.validate().is_ok());

        let m = Matrix::from_columns(&[vec![1.0, f64::INFINITY, 3.0]]).unwrap();
        let bad = TrainingRequest::new(m, Target::Regression(vec![1.0, 2.0, 3.0]), config());
        assert!(matches!(
            bad.validate().unwrap_err(),
            ForestError::InfiniteValue { row: 1, column: 0 }
        ));
    }
}
