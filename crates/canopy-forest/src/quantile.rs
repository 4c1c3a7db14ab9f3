//! Quantile regression from retained leaf responses.

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::instrument;

use crate::config::TreeType;
use crate::error::ForestError;
use crate::forest::Forest;
use crate::matrix::Matrix;
use crate::node::LeafValue;

impl Forest {
    /// Predict response quantiles for new rows.
    ///
    /// The training responses of every leaf a row reaches, across all trees,
    /// are pooled and the type-7 empirical quantile is taken at each level.
    /// Returns one vector per row, aligned with `levels`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::NotFitted`] | the forest has no trees |
    /// | [`ForestError::PredictionFeatureMismatch`] | column count differs from training |
    /// | [`ForestError::QuantilesNotRetained`] | not a regression forest grown with quantiles |
    /// | [`ForestError::InvalidQuantile`] | a level is outside `[0, 1]` |
    #[instrument(skip_all, fields(n_rows = features.n_rows(), n_levels = levels.len()))]
    pub fn predict_quantiles(
        &self,
        features: &Matrix,
        levels: &[f64],
    ) -> Result<Vec<Vec<f64>>, ForestError> {
        self.check_predictable(features)?;
        if self.tree_type != TreeType::Regression || !self.quantiles {
            return Err(ForestError::QuantilesNotRetained);
        }
        if let Some(&level) = levels.iter().find(|l| !(0.0..=1.0).contains(*l)) {
            return Err(ForestError::InvalidQuantile { level });
        }

        Ok((0..features.n_rows())
            .into_par_iter()
            .map(|row| {
                let mut pooled = Vec::new();
                for tree in &self.trees {
                    if let LeafValue::Mean { responses, .. } =
                        tree.leaf_value(|c| self.feature_value(features, row, c))
                    {
                        pooled.extend_from_slice(responses);
                    }
                }
                pooled.sort_unstable_by(f64::total_cmp);
                levels.iter().map(|&p| type7_quantile(&pooled, p)).collect()
            })
            .collect())
    }
}

/// Linear interpolation between order statistics at `h = (n - 1) p`.
///
/// `sorted` must be ascending. `NaN` when empty.
fn type7_quantile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    let h = (n - 1) as f64 * p;
    let lo = h.floor() as usize;
    if lo + 1 >= n {
        return sorted[n - 1];
    }
    sorted[lo] + (h - lo as f64) * (sorted[lo + 1] - sorted[lo])
}
