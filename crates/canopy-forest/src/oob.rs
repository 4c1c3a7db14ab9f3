//! Out-of-bag (OOB) prediction and error.
//!
//! Each training row is predicted only by the trees that did not see it during
//! growth. The error is the mean squared error (regression), the
//! misclassification rate (classification) or `1 - C` with Harrell's C of the
//! summed cumulative hazard as risk (survival).

use tracing::instrument;

use crate::data::{Dataset, Outcome};
use crate::error::ForestError;
use crate::forest::Forest;
use crate::metrics::{ConfusionMatrix, mse};
use crate::predict::{LeafAccumulator, prediction_width};
use crate::request::TrainingRequest;
use crate::split::argmax_lowest;
use crate::survival::concordance_index;
use crate::tree::Tree;

/// Out-of-bag evaluation of a fitted forest.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OobSummary {
    /// OOB prediction error.
    pub error: f64,
    /// Per-row OOB prediction: mean response, predicted class value, or
    /// survival risk. `None` for rows that were in every bootstrap sample.
    pub predictions: Vec<Option<f64>>,
    /// Observed versus predicted classes over the OOB rows (classification).
    pub confusion: Option<ConfusionMatrix>,
    /// Number of rows with at least one OOB tree.
    pub n_oob_rows: usize,
}

/// Incremental OOB aggregation, fed one tree at a time in tree order.
#[derive(Debug, Clone)]
pub(crate) struct OobAccumulator {
    rows: Vec<LeafAccumulator>,
    probability: bool,
}

impl OobAccumulator {
    pub(crate) fn new(n_rows: usize, width: usize, probability: bool) -> Self {
        Self {
            rows: vec![LeafAccumulator::new(width); n_rows],
            probability,
        }
    }

    /// Add one tree's predictions for its OOB rows.
    pub(crate) fn add_tree(&mut self, tree: &Tree, data: &Dataset<'_>) {
        for &row in tree.oob_rows() {
            let leaf = tree.leaf_value(|c| data.value(row, c));
            self.rows[row].add(leaf, self.probability);
        }
    }

    /// Error over the rows seen so far. `None` when no row has an OOB tree.
    pub(crate) fn finish(&self, data: &Dataset<'_>) -> Option<OobSummary> {
        summarize(data, self.rows.iter().map(LeafAccumulator::mean).collect())
    }
}

impl Forest {
    /// Recompute the OOB evaluation against the request the forest was trained on.
    ///
    /// Useful after [`load`](Self::load), or for a forest fitted with
    /// `oob_error` disabled. Gives the same summary as the one computed
    /// during fit.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::NotFitted`] | the forest has no trees |
    /// | [`ForestError::PredictionFeatureMismatch`] | column count differs from training |
    /// | [`ForestError::RowLengthMismatch`] | row count differs from training |
    /// | any validation error | the request itself is invalid |
    #[instrument(skip_all, fields(n_rows = request.features().n_rows()))]
    pub fn evaluate_oob(&self, request: &TrainingRequest) -> Result<Option<OobSummary>, ForestError> {
        self.check_predictable(request.features())?;
        if request.features().n_rows() != self.metadata.n_rows {
            return Err(ForestError::RowLengthMismatch {
                what: "training rows",
                expected: self.metadata.n_rows,
                got: request.features().n_rows(),
            });
        }
        let plan = request.validate()?;
        let data = Dataset::new(request, &plan);
        let width = prediction_width(self.tree_type, self.class_values.len(), self.event_times.len());
        Ok(compute_oob(&self.trees, &data, width, self.probability))
    }
}

/// OOB summary computed row by row, scanning every tree for membership.
pub(crate) fn compute_oob(
    trees: &[Tree],
    data: &Dataset<'_>,
    width: usize,
    probability: bool,
) -> Option<OobSummary> {
    let predictions = (0..data.num_rows())
        .map(|row| {
            let mut acc = LeafAccumulator::new(width);
            for tree in trees {
                if tree.oob_rows().binary_search(&row).is_ok() {
                    acc.add(tree.leaf_value(|c| data.value(row, c)), probability);
                }
            }
            acc.mean()
        })
        .collect();
    summarize(data, predictions)
}

fn summarize(data: &Dataset<'_>, predictions: Vec<Option<Vec<f64>>>) -> Option<OobSummary> {
    let oob_rows: Vec<usize> = (0..predictions.len())
        .filter(|&row| predictions[row].is_some())
        .collect();
    if oob_rows.is_empty() {
        return None;
    }

    let mut scalar = vec![None; predictions.len()];
    let mut confusion = None;
    let error = match data.target(oob_rows[0]) {
        Outcome::Response(_) => {
            let mut observed = Vec::with_capacity(oob_rows.len());
            let mut predicted = Vec::with_capacity(oob_rows.len());
            for &row in &oob_rows {
                let p = predictions[row].as_ref()?[0];
                if let Outcome::Response(y) = data.target(row) {
                    observed.push(y);
                    predicted.push(p);
                }
                scalar[row] = Some(p);
            }
            mse(&observed, &predicted).ok()?
        }
        Outcome::Class(_) => {
            let mut observed = Vec::with_capacity(oob_rows.len());
            let mut predicted = Vec::with_capacity(oob_rows.len());
            for &row in &oob_rows {
                let class = argmax_lowest(predictions[row].as_ref()?);
                observed.push(data.classes()[row]);
                predicted.push(class);
                scalar[row] = Some(data.class_values()[class]);
            }
            let matrix = ConfusionMatrix::from_labels(&observed, &predicted, data.n_classes()).ok()?;
            let error = 1.0 - matrix.accuracy();
            confusion = Some(matrix);
            error
        }
        Outcome::Survival { .. } => {
            let mut risk = Vec::with_capacity(oob_rows.len());
            let mut time = Vec::with_capacity(oob_rows.len());
            let mut event = Vec::with_capacity(oob_rows.len());
            for &row in &oob_rows {
                let r: f64 = predictions[row].as_ref()?.iter().sum();
                if let Outcome::Survival { time: t, event: e } = data.target(row) {
                    time.push(t);
                    event.push(e);
                }
                risk.push(r);
                scalar[row] = Some(r);
            }
            1.0 - concordance_index(&risk, &time, &event)?
        }
    };

    Some(OobSummary {
        error,
        predictions: scalar,
        confusion,
        n_oob_rows: oob_rows.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForestConfig;
    use crate::matrix::Matrix;
    use crate::request::Target;
    use crate::rng::RandomStream;
    use crate::tree::TreeBuilder;

    fn grow_trees(request: &TrainingRequest, n_trees: usize) -> Vec<Tree> {
        let plan = request.validate().unwrap();
        let data = Dataset::new(request, &plan);
        let n = data.num_rows();
        (0..n_trees)
            .map(|i| {
                let mut rng = RandomStream::seed(i as u64);
                let bootstrap = rng.bootstrap_indices(n, 1.0, true);
                let mut in_bag = vec![false; n];
                for &r in &bootstrap {
                    in_bag[r] = true;
                }
                let oob = (0..n).filter(|&r| !in_bag[r]).collect();
                TreeBuilder::new(&data, &plan.params).grow(bootstrap, oob, &mut rng, &mut [])
            })
            .collect()
    }

    fn both_ways(request: &TrainingRequest, probability: bool) -> (OobSummary, OobSummary) {
        let trees = grow_trees(request, 15);
        let plan = request.validate().unwrap();
        let data = Dataset::new(request, &plan);
        let width = prediction_width(
            request.target().tree_type(),
            data.n_classes(),
            data.survival_index().map_or(0, |i| i.n_times()),
        );
        let direct = compute_oob(&trees, &data, width, probability).unwrap();
        let mut acc = OobAccumulator::new(data.num_rows(), width, probability);
        for tree in &trees {
            acc.add_tree(tree, &data);
        }
        (direct, acc.finish(&data).unwrap())
    }

    fn features() -> Matrix {
        let x: Vec<f64> = (0..60).map(f64::from).collect();
        let z: Vec<f64> = (0..60).map(|i| f64::from((i * 17) % 23)).collect();
        Matrix::from_columns(&[x, z]).unwrap()
    }

    #[test]
    fn regression_direct_matches_incremental() {
        let y: Vec<f64> = (0..60).map(|i| f64::from(i) * 0.5 + f64::from(i % 4)).collect();
        let request =
            TrainingRequest::new(features(), Target::Regression(y.clone()), ForestConfig::new(15).unwrap());
        let (direct, incremental) = both_ways(&request, false);
        assert_eq!(direct, incremental);
        assert!(direct.error.is_finite());
        assert!(direct.confusion.is_none());
        assert!(direct.n_oob_rows > 40);

        let (observed, predicted): (Vec<f64>, Vec<f64>) = direct
            .predictions
            .iter()
            .enumerate()
            .filter_map(|(row, p)| p.map(|p| (y[row], p)))
            .unzip();
        assert!((direct.error - mse(&observed, &predicted).unwrap()).abs() < 1e-12);
    }

    #[test]
    fn classification_has_confusion_matrix() {
        let y = (0..60).map(|i| f64::from(u8::from(i >= 30))).collect();
        let request =
            TrainingRequest::new(features(), Target::Classification(y), ForestConfig::new(15).unwrap());
        let (direct, incremental) = both_ways(&request, true);
        assert_eq!(direct, incremental);
        let confusion = direct.confusion.unwrap();
        assert_eq!(confusion.total(), direct.n_oob_rows);
        assert!((direct.error - (1.0 - confusion.accuracy())).abs() < 1e-12);
        assert!(direct.error < 0.2, "error = {}", direct.error);
    }

    #[test]
    fn survival_error_is_one_minus_concordance() {
        let time: Vec<f64> = (0..60).map(|i| f64::from(60 - i)).collect();
        let status = (0..60).map(|i| f64::from(u8::from(i % 5 != 0))).collect();
        let request = TrainingRequest::new(
            features(),
            Target::Survival { time, status },
            ForestConfig::new(15).unwrap(),
        );
        let (direct, incremental) = both_ways(&request, false);
        assert_eq!(direct, incremental);
        assert!((0.0..=1.0).contains(&direct.error));
        assert!(direct.error < 0.3, "error = {}", direct.error);
    }

    #[test]
    fn no_oob_rows_gives_none() {
        let y = (0..60).map(f64::from).collect();
        let request = TrainingRequest::new(features(), Target::Regression(y), ForestConfig::new(1).unwrap());
        let plan = request.validate().unwrap();
        let data = Dataset::new(&request, &plan);
        let tree = TreeBuilder::new(&data, &plan.params).grow(
            (0..60).collect(),
            Vec::new(),
            &mut RandomStream::seed(1),
            &mut [],
        );
        assert!(compute_oob(&[tree], &data, 1, false).is_none());
    }

    #[test]
    fn evaluate_oob_matches_fit_summary() {
        let y: Vec<f64> = (0..60).map(|i| f64::from(i % 7)).collect();
        let request = TrainingRequest::new(features(), Target::Regression(y), ForestConfig::new(12).unwrap());
        let forest = request.fit().unwrap();
        assert_eq!(forest.evaluate_oob(&request).unwrap().as_ref(), forest.oob());

        let without = TrainingRequest::new(
            features(),
            Target::Regression((0..60).map(f64::from).collect()),
            ForestConfig::new(4).unwrap().with_oob_error(false),
        );
        let forest = without.fit().unwrap();
        assert!(forest.oob().is_none());
        assert!(forest.evaluate_oob(&without).unwrap().is_some());
    }

    #[test]
    fn evaluate_oob_rejects_other_row_count() {
        let y: Vec<f64> = (0..60).map(f64::from).collect();
        let forest = TrainingRequest::new(features(), Target::Regression(y), ForestConfig::new(3).unwrap())
            .fit()
            .unwrap();
        let short = TrainingRequest::new(
            Matrix::from_columns(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap(),
            Target::Regression(vec![1.0, 2.0]),
            ForestConfig::new(3).unwrap(),
        );
        assert!(matches!(
            forest.evaluate_oob(&short),
            Err(ForestError::RowLengthMismatch { expected: 60, got: 2, .. })
        ));
    }
}
