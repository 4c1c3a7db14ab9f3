use std::path::PathBuf;

use crate::config::{SplitRule, TreeType};

/// Coarse classification of a [`ForestError`].
///
/// Callers that only need to know *why* a request was rejected match on this
/// instead of on the individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed hyperparameters or data; detected before any tree is grown.
    InvalidInput,
    /// Prediction requested on a forest without trees.
    NotFitted,
    /// Prediction input shape disagrees with the training shape.
    DimensionMismatch,
    /// The call was cancelled through its [`CancelToken`](crate::CancelToken).
    Cancelled,
    /// Reading, writing or decoding a persisted forest failed.
    Persistence,
    /// The worker pool could not be created.
    Runtime,
}

/// Errors from forest training, prediction and persistence.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when num_trees is zero.
    #[error("num_trees must be at least 1, got {num_trees}")]
    InvalidTreeCount {
        /// The invalid num_trees value provided.
        num_trees: usize,
    },

    /// Returned when the feature matrix has zero rows.
    #[error("training dataset has zero rows")]
    EmptyDataset,

    /// Returned when the feature matrix has zero columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a row passed to a matrix constructor has the wrong length.
    #[error("row {row} has {got} values, expected {expected}")]
    RaggedRow {
        /// Zero-based index of the offending row.
        row: usize,
        /// The expected number of values.
        expected: usize,
        /// The actual number of values.
        got: usize,
    },

    /// Returned when a column passed to a matrix constructor has the wrong length.
    #[error("column {column} has {got} values, expected {expected}")]
    RaggedColumn {
        /// Zero-based index of the offending column.
        column: usize,
        /// The expected number of values.
        expected: usize,
        /// The actual number of values.
        got: usize,
    },

    /// Returned when a feature value is infinite. `NaN` is accepted as missing.
    #[error("infinite feature value at row {row}, column {column}")]
    InfiniteValue {
        /// Zero-based row index.
        row: usize,
        /// Zero-based column index.
        column: usize,
    },

    /// Returned when a per-row vector does not have one entry per row.
    #[error("{what} has {got} entries, expected one per row ({expected})")]
    RowLengthMismatch {
        /// Which input was malformed.
        what: &'static str,
        /// The number of rows in the feature matrix.
        expected: usize,
        /// The number of entries provided.
        got: usize,
    },

    /// Returned when a target value is NaN or infinite.
    #[error("non-finite target value at row {row}")]
    NonFiniteTarget {
        /// Zero-based row index.
        row: usize,
    },

    /// Returned when a survival time is negative or non-finite.
    #[error("survival time at row {row} must be finite and non-negative, got {time}")]
    InvalidSurvivalTime {
        /// Zero-based row index.
        row: usize,
        /// The offending time.
        time: f64,
    },

    /// Returned when a survival status is neither 0 nor 1.
    #[error("event indicator at row {row} must be 0 or 1, got {value}")]
    InvalidEventIndicator {
        /// Zero-based row index.
        row: usize,
        /// The offending indicator.
        value: f64,
    },

    /// Returned when a target lies outside the domain the split rule requires.
    #[error("split rule {rule:?} requires targets in (0, 1), row {row} has {value}")]
    TargetOutOfDomain {
        /// The split rule with the domain restriction.
        rule: SplitRule,
        /// Zero-based row index.
        row: usize,
        /// The offending target value.
        value: f64,
    },

    /// Returned when mtry resolves outside [1, n_features].
    #[error("mtry resolved to {mtry}, but must be in [1, {n_features}]")]
    InvalidMtry {
        /// The resolved mtry value.
        mtry: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when min_node_size is explicitly set to zero.
    #[error("min_node_size must be at least 1, got {min_node_size}")]
    InvalidMinNodeSize {
        /// The invalid value provided.
        min_node_size: usize,
    },

    /// Returned when a sample fraction is not positive, or exceeds 1.0 without replacement.
    #[error("sample_fraction {fraction} is invalid with replace = {replace}")]
    InvalidSampleFraction {
        /// The offending fraction.
        fraction: f64,
        /// Whether sampling with replacement was requested.
        replace: bool,
    },

    /// Returned when per-class sample fractions do not match the class count.
    #[error("per-class sample_fraction has {got} entries, expected one per class ({expected})")]
    SampleFractionLengthMismatch {
        /// The number of classes in the target.
        expected: usize,
        /// The number of fractions provided.
        got: usize,
    },

    /// Returned when a case weight is negative or non-finite.
    #[error("case weight at row {row} must be finite and non-negative, got {weight}")]
    InvalidCaseWeight {
        /// Zero-based row index.
        row: usize,
        /// The offending weight.
        weight: f64,
    },

    /// Returned when every case weight is zero.
    #[error("at least one case weight must be positive")]
    AllCaseWeightsZero,

    /// Returned when class weights do not have one non-negative entry per class.
    #[error("class_weights must have {expected} finite non-negative entries, got {got}")]
    InvalidClassWeights {
        /// The number of classes in the target.
        expected: usize,
        /// The number of weights provided.
        got: usize,
    },

    /// Returned when a regularization factor lies outside [0, 1].
    #[error("regularization factor {factor} at feature {feature} is outside [0, 1]")]
    InvalidRegularization {
        /// Zero-based feature index.
        feature: usize,
        /// The offending factor.
        factor: f64,
    },

    /// Returned when the regularization vector is neither length 1 nor n_features.
    #[error("regularization_factor has {got} entries, expected 1 or {expected}")]
    RegularizationLengthMismatch {
        /// The number of features.
        expected: usize,
        /// The number of factors provided.
        got: usize,
    },

    /// Returned when a split-select weight lies outside [0, 1] or the vector has the wrong length.
    #[error("split_select_weights must have {expected} entries in [0, 1], got {got} entries")]
    InvalidSplitSelectWeights {
        /// The number of features.
        expected: usize,
        /// The number of weights provided.
        got: usize,
    },

    /// Returned when the number of feature names differs from the column count.
    #[error("{got} feature names given for {expected} columns")]
    FeatureNamesMismatch {
        /// The number of columns.
        expected: usize,
        /// The number of names provided.
        got: usize,
    },

    /// Returned when a feature index refers past the last column.
    #[error("{what} refers to feature {feature}, but there are only {n_features} features")]
    FeatureOutOfRange {
        /// Which option held the index.
        what: &'static str,
        /// The offending feature index.
        feature: usize,
        /// The number of features.
        n_features: usize,
    },

    /// Returned when the manual in-bag rows do not have one entry per tree.
    #[error("inbag has {got} entries, expected one per tree ({expected})")]
    InbagLengthMismatch {
        /// num_trees.
        expected: usize,
        /// The number of in-bag vectors provided.
        got: usize,
    },

    /// Returned when a class index passed to a metric is not below the class count.
    #[error("class label {label} is out of range for {n_classes} classes")]
    InvalidClassLabel {
        /// The offending dense class index.
        label: usize,
        /// The number of classes.
        n_classes: usize,
    },

    /// Returned when a manual in-bag row index is out of range or a tree's bag is empty.
    #[error("inbag for tree {tree} is invalid: {reason}")]
    InvalidInbag {
        /// Zero-based tree index.
        tree: usize,
        /// Human-readable description.
        reason: String,
    },

    /// Returned when two options cannot be used together.
    #[error("{first} cannot be combined with {second}")]
    ConflictingOptions {
        /// The first option.
        first: &'static str,
        /// The second option.
        second: &'static str,
    },

    /// Returned when a split rule is not defined for the tree type.
    #[error("split rule {rule:?} is not available for {tree_type:?} forests")]
    IncompatibleSplitRule {
        /// The requested split rule.
        rule: SplitRule,
        /// The tree type implied by the target.
        tree_type: TreeType,
    },

    /// Returned when an option is not available for the tree type.
    #[error("{option} is not available for {tree_type:?} forests")]
    UnsupportedOption {
        /// The option name.
        option: &'static str,
        /// The tree type implied by the target.
        tree_type: TreeType,
    },

    /// Returned when a split-rule parameter is out of range.
    #[error("{name} = {value} is out of range")]
    InvalidRuleParameter {
        /// Parameter name.
        name: &'static str,
        /// The offending value.
        value: f64,
    },

    /// Returned when an unordered column holds something other than a level in [0, 64).
    #[error("unordered column {column} has value {value} at row {row}; levels must be integers in [0, 64)")]
    InvalidLevel {
        /// Zero-based row index.
        row: usize,
        /// Zero-based column index.
        column: usize,
        /// The offending value.
        value: f64,
    },

    /// Returned when a requested quantile level is outside [0, 1].
    #[error("quantile level {level} is outside [0, 1]")]
    InvalidQuantile {
        /// The offending level.
        level: f64,
    },

    /// Returned when quantiles are requested from a forest grown without them.
    #[error("forest was grown without quantile support; enable quantiles before fitting")]
    QuantilesNotRetained,

    /// Returned when predicting with a forest that has no trees.
    #[error("forest has no trees; fit it before predicting")]
    NotFitted,

    /// Returned when a prediction matrix has a different column count than the training data.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The number of training features.
        expected: usize,
        /// The number of columns in the prediction input.
        got: usize,
    },

    /// Returned when the caller cancelled the operation.
    #[error("operation cancelled after {completed} of {total} trees")]
    Cancelled {
        /// Trees finished before cancellation was observed.
        completed: usize,
        /// Trees requested.
        total: usize,
    },

    /// Returned when the rayon worker pool cannot be built.
    #[error("failed to build worker pool")]
    ThreadPool {
        /// The underlying rayon error.
        #[from]
        source: rayon::ThreadPoolBuildError,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize forest")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize forest")]
    DeserializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write forest to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read forest from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a forest with an incompatible format version.
    #[error("incompatible forest format: expected version {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The format version this build expects.
        expected: u32,
        /// The format version found in the payload.
        found: u32,
    },
}

impl ForestError {
    /// Return the taxonomy bucket this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForestError::NotFitted => ErrorKind::NotFitted,
            ForestError::PredictionFeatureMismatch { .. } => ErrorKind::DimensionMismatch,
            ForestError::Cancelled { .. } => ErrorKind::Cancelled,
            ForestError::ThreadPool { .. } => ErrorKind::Runtime,
            ForestError::SerializeModel { .. }
            | ForestError::DeserializeModel { .. }
            | ForestError::WriteModel { .. }
            | ForestError::ReadModel { .. }
            | ForestError::IncompatibleModelVersion { .. } => ErrorKind::Persistence,
            _ => ErrorKind::InvalidInput,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ForestError};

    #[test]
    fn validation_errors_are_invalid_input() {
        let err = ForestError::InvalidMtry {
            mtry: 9,
            n_features: 4,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.to_string(), "mtry resolved to 9, but must be in [1, 4]");
    }

    #[test]
    fn class_label_error_is_invalid_input() {
        let err = ForestError::InvalidClassLabel {
            label: 4,
            n_classes: 3,
        };
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(err.to_string(), "class label 4 is out of range for 3 classes");
    }

    #[test]
    fn prediction_errors_have_their_own_kinds() {
        assert_eq!(ForestError::NotFitted.kind(), ErrorKind::NotFitted);
        let err = ForestError::PredictionFeatureMismatch {
            expected: 3,
            got: 2,
        };
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
    }

    #[test]
    fn cancellation_kind() {
        let err = ForestError::Cancelled {
            completed: 2,
            total: 10,
        };
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(err.to_string(), "operation cancelled after 2 of 10 trees");
    }
}
