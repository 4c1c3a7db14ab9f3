//! Permutation importance over out-of-bag rows.
//!
//! For every tree with OOB rows, the tree's OOB error is measured once as is
//! and once per feature with that feature's values shuffled among the OOB
//! rows. A feature's importance is the mean error increase over those trees.

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use statrs::statistics::Statistics;

use crate::data::{Dataset, Outcome};
use crate::node::LeafValue;
use crate::rng::{Purpose, RandomStream};
use crate::survival::concordance_index;
use crate::tree::Tree;

/// Global and optional per-row permutation importance.
#[derive(Debug, Clone)]
pub(crate) struct PermutationImportance {
    pub(crate) importance: Vec<f64>,
    /// Rows by features.
    pub(crate) local: Option<Vec<Vec<f64>>>,
}

/// One tree's OOB loss per row and overall error.
struct Evaluation {
    /// Squared error or 0/1 loss per OOB row; empty for survival.
    losses: Vec<f64>,
    error: Option<f64>,
}

/// Error increases of one tree, per feature and per (OOB row, feature).
struct TreeIncrease {
    increases: Vec<f64>,
    local: Vec<Vec<f64>>,
}

pub(crate) fn permutation_importance(
    trees: &[Tree],
    data: &Dataset<'_>,
    seed: u64,
    scale: bool,
    local: bool,
) -> PermutationImportance {
    let n_features = data.num_columns();
    let per_tree: Vec<Option<TreeIncrease>> = (0..trees.len())
        .into_par_iter()
        .map(|index| tree_increase(&trees[index], index, data, seed, local))
        .collect();

    let contributing: Vec<&TreeIncrease> = per_tree.iter().flatten().collect();
    let importance = (0..n_features)
        .map(|feature| {
            if contributing.is_empty() {
                return 0.0;
            }
            let values: Vec<f64> = contributing.iter().map(|t| t.increases[feature]).collect();
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            if scale {
                // Standard error over the trees that had OOB rows.
                let sd = values.iter().std_dev();
                if sd.is_finite() && sd > 0.0 {
                    return mean / (sd / n.sqrt());
                }
            }
            mean
        })
        .collect();

    let local = local.then(|| {
        let n_rows = data.num_rows();
        let mut sums = vec![vec![0.0; n_features]; n_rows];
        let mut counts = vec![0_usize; n_rows];
        for (tree, increase) in trees.iter().zip(&per_tree) {
            let Some(increase) = increase else { continue };
            for (&row, row_increase) in tree.oob_rows().iter().zip(&increase.local) {
                for (sum, value) in sums[row].iter_mut().zip(row_increase) {
                    *sum += value;
                }
                counts[row] += 1;
            }
        }
        for (row_sums, &count) in sums.iter_mut().zip(&counts) {
            if count > 0 {
                row_sums.iter_mut().for_each(|v| *v /= count as f64);
            }
        }
        sums
    });

    PermutationImportance { importance, local }
}

fn tree_increase(
    tree: &Tree,
    index: usize,
    data: &Dataset<'_>,
    seed: u64,
    local: bool,
) -> Option<TreeIncrease> {
    let rows = tree.oob_rows();
    if rows.is_empty() {
        return None;
    }
    let n_features = data.num_columns();
    let baseline = evaluate(tree, data, rows, |pos, col| data.value(rows[pos], col));
    let baseline_error = baseline.error?;

    let mut rng = RandomStream::substream(seed, Purpose::Permutation, index);
    let mut increases = Vec::with_capacity(n_features);
    let mut local_rows = if local {
        vec![vec![0.0; n_features]; rows.len()]
    } else {
        Vec::new()
    };
    for feature in 0..n_features {
        let mut shuffled: Vec<f64> = rows.iter().map(|&r| data.value(r, feature)).collect();
        rng.shuffle(&mut shuffled);
        let permuted = evaluate(tree, data, rows, |pos, col| {
            if col == feature {
                shuffled[pos]
            } else {
                data.value(rows[pos], col)
            }
        });
        increases.push(permuted.error.map_or(0.0, |e| e - baseline_error));
        if local {
            for (pos, (after, before)) in permuted.losses.iter().zip(&baseline.losses).enumerate() {
                local_rows[pos][feature] = after - before;
            }
        }
    }
    Some(TreeIncrease {
        increases,
        local: local_rows,
    })
}

/// `value_of(position, column)` reads the feature of the `position`-th row in `rows`.
fn evaluate(
    tree: &Tree,
    data: &Dataset<'_>,
    rows: &[usize],
    value_of: impl Fn(usize, usize) -> f64,
) -> Evaluation {
    let mut losses = Vec::with_capacity(rows.len());
    let mut risk = Vec::new();
    let mut time = Vec::new();
    let mut event = Vec::new();
    for (pos, &row) in rows.iter().enumerate() {
        let leaf = tree.leaf_value(|col| value_of(pos, col));
        match (leaf, data.target(row)) {
            (LeafValue::Mean { mean, .. }, Outcome::Response(y)) => {
                losses.push((y - mean) * (y - mean));
            }
            (LeafValue::Classes { majority, .. }, Outcome::Class(class)) => {
                losses.push(f64::from(u8::from(*majority != class)));
            }
            (LeafValue::Hazard { chf }, Outcome::Survival { time: t, event: e }) => {
                risk.push(chf.iter().sum::<f64>());
                time.push(t);
                event.push(e);
            }
            _ => {}
        }
    }
    let error = if risk.is_empty() {
        (!losses.is_empty()).then(|| losses.iter().sum::<f64>() / losses.len() as f64)
    } else {
        concordance_index(&risk, &time, &event).map(|c| 1.0 - c)
    };
    Evaluation { losses, error }
}

#[cfg(test)]
mod tests {
    use super::permutation_importance;
    use crate::config::{ForestConfig, ImportanceMode, Mtry};
    use crate::data::Dataset;
    use crate::matrix::Matrix;
    use crate::request::{Target, TrainingRequest};

    fn request(config: ForestConfig) -> TrainingRequest {
        let signal: Vec<f64> = (0..80).map(f64::from).collect();
        let noise: Vec<f64> = (0..80).map(|i| f64::from((i * 37) % 41)).collect();
        let y = signal.iter().map(|x| if *x < 40.0 { 0.0 } else { 1.0 }).collect();
        TrainingRequest::new(
            Matrix::from_columns(&[signal, noise]).unwrap(),
            Target::Classification(y),
            config
                .with_mtry(Mtry::All)
                .with_importance(ImportanceMode::Permutation),
        )
    }

    #[test]
    fn informative_feature_outranks_noise() {
        let forest = request(ForestConfig::new(40).unwrap()).fit().unwrap();
        let importance = forest.importance().unwrap();
        assert!(importance[0] > 0.1, "signal = {}", importance[0]);
        assert!(importance[1].abs() < 0.05, "noise = {}", importance[1]);
        let ranked = forest.ranked_importance();
        assert_eq!(ranked[0].name, "x0");
    }

    #[test]
    fn scaled_importance_keeps_sign() {
        let forest = request(
            ForestConfig::new(40)
                .unwrap()
                .with_scale_permutation_importance(true),
        )
        .fit()
        .unwrap();
        assert!(forest.importance().unwrap()[0] > 1.0);
    }

    #[test]
    fn scaling_ignores_trees_without_oob_rows() {
        let req = request(ForestConfig::new(12).unwrap());
        let forest = req.fit().unwrap();
        let plan = req.validate().unwrap();
        let data = Dataset::new(&req, &plan);

        let mut trees = forest.trees().to_vec();
        let scaled = permutation_importance(&trees, &data, 3, true, false).importance;
        for _ in 0..6 {
            let mut in_bag_only = trees[0].clone();
            in_bag_only.oob.clear();
            trees.push(in_bag_only);
        }
        let padded = permutation_importance(&trees, &data, 3, true, false).importance;
        assert_eq!(scaled, padded);
        assert!(scaled[0] > 1.0);
    }

    #[test]
    fn local_importance_has_one_row_per_sample() {
        let forest = request(ForestConfig::new(30).unwrap().with_local_importance(true))
            .fit()
            .unwrap();
        let local = forest.local_importance().unwrap();
        assert_eq!(local.len(), 80);
        assert!(local.iter().all(|row| row.len() == 2));
        let mean_signal: f64 = local.iter().map(|row| row[0]).sum::<f64>() / 80.0;
        assert!(mean_signal > 0.0);
    }

    #[test]
    fn same_seed_same_importance() {
        let a = request(ForestConfig::new(10).unwrap().with_seed(5)).fit().unwrap();
        let b = request(ForestConfig::new(10).unwrap().with_seed(5)).fit().unwrap();
        assert_eq!(a.importance(), b.importance());
    }
}
