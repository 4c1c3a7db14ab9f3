//! Prediction for new rows: tree traversal and ensemble aggregation.

use rayon::iter::{IndexedParallelIterator, IntoParallelRefMutIterator, ParallelIterator};
use tracing::{debug, instrument};

use crate::cancel::CancelToken;
use crate::config::TreeType;
use crate::error::ForestError;
use crate::forest::Forest;
use crate::matrix::Matrix;
use crate::node::LeafValue;
use crate::split::argmax_lowest;

/// What a prediction call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PredictionType {
    /// Aggregated responses, class probabilities or hazard curves.
    #[default]
    Response,
    /// Arena index of the leaf reached in every tree.
    TerminalNodes,
}

/// New rows to predict.
#[derive(Debug, Clone)]
pub struct PredictionRequest {
    features: Matrix,
    prediction_type: PredictionType,
}

impl PredictionRequest {
    /// Request aggregated responses for `features`.
    #[must_use]
    pub fn new(features: Matrix) -> Self {
        Self {
            features,
            prediction_type: PredictionType::Response,
        }
    }

    /// Set the prediction type.
    #[must_use]
    pub fn with_prediction_type(mut self, prediction_type: PredictionType) -> Self {
        self.prediction_type = prediction_type;
        self
    }

    /// Borrow the rows to predict.
    #[must_use]
    pub fn features(&self) -> &Matrix {
        &self.features
    }

    /// Return the prediction type.
    #[must_use]
    pub fn prediction_type(&self) -> PredictionType {
        self.prediction_type
    }
}

/// Ensemble predictions, one entry per requested row.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionResult {
    /// Mean of the tree predictions.
    Regression(Vec<f64>),
    /// Class proportions and the most likely class per row.
    Classification {
        /// Class values, ascending; the column order of `probabilities`.
        class_values: Vec<f64>,
        /// Vote shares, or mean leaf distributions in probability mode.
        probabilities: Vec<Vec<f64>>,
        /// Class value with the largest proportion; ties go to the smaller class.
        predicted: Vec<f64>,
    },
    /// Mean cumulative hazard over the training event times.
    Survival {
        /// Sorted unique training event times.
        event_times: Vec<f64>,
        /// One curve per row, aligned with `event_times`.
        chf: Vec<Vec<f64>>,
    },
    /// Leaf arena index, rows by trees.
    TerminalNodes(Vec<Vec<usize>>),
}

impl PredictionResult {
    /// Survival curves `exp(-chf)`, or `None` for non-survival results.
    #[must_use]
    pub fn survival_function(&self) -> Option<Vec<Vec<f64>>> {
        match self {
            PredictionResult::Survival { chf, .. } => Some(
                chf.iter()
                    .map(|curve| curve.iter().map(|h| (-h).exp()).collect())
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Running sum of leaf values reached by one row.
///
/// Every tree type is summed into a flat vector: one slot for regression,
/// one per class, or one per event time.
#[derive(Debug, Clone)]
pub(crate) struct LeafAccumulator {
    totals: Vec<f64>,
    count: usize,
}

impl LeafAccumulator {
    pub(crate) fn new(width: usize) -> Self {
        Self {
            totals: vec![0.0; width],
            count: 0,
        }
    }

    /// Classification leaves add a one-hot vote unless `probability` is set.
    pub(crate) fn add(&mut self, leaf: &LeafValue, probability: bool) {
        match leaf {
            LeafValue::Mean { mean, .. } => self.totals[0] += mean,
            LeafValue::Classes {
                distribution,
                majority,
            } => {
                if probability {
                    for (total, p) in self.totals.iter_mut().zip(distribution) {
                        *total += p;
                    }
                } else {
                    self.totals[*majority] += 1.0;
                }
            }
            LeafValue::Hazard { chf } => {
                for (total, h) in self.totals.iter_mut().zip(chf) {
                    *total += h;
                }
            }
        }
        self.count += 1;
    }

    /// Number of leaves added so far.
    pub(crate) fn count(&self) -> usize {
        self.count
    }

    /// Mean over the added leaves, or `None` before the first one.
    pub(crate) fn mean(&self) -> Option<Vec<f64>> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(self.totals.iter().map(|t| t / n).collect())
    }
}

/// Length of an accumulated prediction vector.
pub(crate) fn prediction_width(tree_type: TreeType, n_classes: usize, n_event_times: usize) -> usize {
    match tree_type {
        TreeType::Regression => 1,
        TreeType::Classification => n_classes,
        TreeType::Survival => n_event_times,
    }
}

impl Forest {
    /// Predict new rows.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::NotFitted`] | the forest has no trees |
    /// | [`ForestError::PredictionFeatureMismatch`] | column count differs from training |
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, ForestError> {
        self.predict_with_cancel(request, &CancelToken::new())
    }

    /// Predict new rows, checking `cancel` before each tree.
    ///
    /// # Errors
    ///
    /// As [`predict`](Self::predict), plus [`ForestError::Cancelled`].
    #[instrument(skip_all, fields(n_rows = request.features().n_rows(), n_trees = self.trees.len()))]
    pub fn predict_with_cancel(
        &self,
        request: &PredictionRequest,
        cancel: &CancelToken,
    ) -> Result<PredictionResult, ForestError> {
        let matrix = request.features();
        self.check_predictable(matrix)?;
        let result = match request.prediction_type() {
            PredictionType::TerminalNodes => {
                PredictionResult::TerminalNodes(self.terminal_nodes(matrix, cancel)?)
            }
            PredictionType::Response => {
                let means = self.aggregate(matrix, cancel)?;
                self.to_result(means)
            }
        };
        debug!("prediction complete");
        Ok(result)
    }

    pub(crate) fn check_predictable(&self, matrix: &Matrix) -> Result<(), ForestError> {
        if self.trees.is_empty() {
            return Err(ForestError::NotFitted);
        }
        if matrix.n_cols() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: matrix.n_cols(),
            });
        }
        Ok(())
    }

    /// Feature value as the trees saw it during growth.
    #[inline]
    pub(crate) fn feature_value(&self, matrix: &Matrix, row: usize, col: usize) -> f64 {
        let raw = matrix.value(row, col);
        match self.level_orders.get(col) {
            Some(Some(order)) => order.rank(raw),
            _ => raw,
        }
    }

    fn aggregate(&self, matrix: &Matrix, cancel: &CancelToken) -> Result<Vec<Vec<f64>>, ForestError> {
        let width = prediction_width(self.tree_type, self.class_values.len(), self.event_times.len());
        let mut accumulators = vec![LeafAccumulator::new(width); matrix.n_rows()];
        for (completed, tree) in self.trees.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ForestError::Cancelled {
                    completed,
                    total: self.trees.len(),
                });
            }
            accumulators
                .par_iter_mut()
                .enumerate()
                .for_each(|(row, acc)| {
                    acc.add(
                        tree.leaf_value(|c| self.feature_value(matrix, row, c)),
                        self.probability,
                    );
                });
        }
        Ok(accumulators
            .iter()
            .map(|acc| acc.mean().unwrap_or_else(|| vec![f64::NAN; width]))
            .collect())
    }

    fn terminal_nodes(&self, matrix: &Matrix, cancel: &CancelToken) -> Result<Vec<Vec<usize>>, ForestError> {
        let mut nodes = vec![Vec::with_capacity(self.trees.len()); matrix.n_rows()];
        for (completed, tree) in self.trees.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ForestError::Cancelled {
                    completed,
                    total: self.trees.len(),
                });
            }
            nodes.par_iter_mut().enumerate().for_each(|(row, out)| {
                out.push(tree.leaf_index(|c| self.feature_value(matrix, row, c)).index());
            });
        }
        Ok(nodes)
    }

    fn to_result(&self, means: Vec<Vec<f64>>) -> PredictionResult {
        match self.tree_type {
            TreeType::Regression => {
                PredictionResult::Regression(means.into_iter().map(|m| m[0]).collect())
            }
            TreeType::Classification => {
                let predicted = means
                    .iter()
                    .map(|p| self.class_values[argmax_lowest(p)])
                    .collect();
                PredictionResult::Classification {
                    class_values: self.class_values.clone(),
                    probabilities: means,
                    predicted,
                }
            }
            TreeType::Survival => PredictionResult::Survival {
                event_times: self.event_times.clone(),
                chf: means,
            },
        }
    }
}
