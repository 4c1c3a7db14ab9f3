//! Read-only view of a training request used during growth.

use crate::config::UnorderedPolicy;
use crate::matrix::Matrix;
use crate::request::{FitPlan, Target, TrainingRequest};
use crate::rng::{Purpose, RandomStream};
use crate::split::argmax_lowest;
use crate::survival::{SurvivalIndex, logrank_scores};

/// Unordered columns hold levels in `[0, MAX_LEVELS)`, one bit each in a split mask.
pub(crate) const MAX_LEVELS: usize = 64;

/// Sorted unique class values of a label column.
pub(crate) fn class_values(labels: &[f64]) -> Vec<f64> {
    let mut values = labels.to_vec();
    values.sort_unstable_by(f64::total_cmp);
    values.dedup();
    values
}

/// Target of one row, as seen by the splitter and leaf aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Outcome {
    Response(f64),
    Class(usize),
    Survival { time: f64, event: bool },
}

/// Prepared targets: class labels mapped to dense indices, survival times indexed.
#[derive(Debug, Clone)]
pub(crate) enum Response<'a> {
    Regression(&'a [f64]),
    Classification {
        classes: Vec<usize>,
        class_values: Vec<f64>,
    },
    Survival {
        time: &'a [f64],
        event: Vec<bool>,
        index: SurvivalIndex,
    },
}

impl<'a> Response<'a> {
    fn prepare(target: &'a Target) -> Self {
        match target {
            Target::Regression(y) => Response::Regression(y),
            Target::Classification(labels) => {
                let class_values = class_values(labels);
                let classes = labels
                    .iter()
                    .map(|label| {
                        class_values
                            .binary_search_by(|probe| probe.total_cmp(label))
                            .unwrap_or_default()
                    })
                    .collect();
                Response::Classification {
                    classes,
                    class_values,
                }
            }
            Target::Survival { time, status } => {
                let event: Vec<bool> = status.iter().map(|&s| s == 1.0).collect();
                let index = SurvivalIndex::build(time, &event);
                Response::Survival { time, event, index }
            }
        }
    }
}

/// Rank of each level of an unordered column under the `Order` policy.
///
/// Levels absent from training map to `NaN`, so they follow the missing-value side.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LevelOrder {
    ranks: Vec<f64>,
}

impl LevelOrder {
    /// Rank levels by the mean of `scores` over the rows holding each level.
    pub(crate) fn from_scores(column: &[f64], scores: &[f64]) -> Self {
        let mut sums = [0.0_f64; MAX_LEVELS];
        let mut counts = [0_usize; MAX_LEVELS];
        for (&value, &score) in column.iter().zip(scores) {
            if value.is_nan() {
                continue;
            }
            let level = value as usize;
            sums[level] += score;
            counts[level] += 1;
        }
        let mut present: Vec<(usize, f64)> = (0..MAX_LEVELS)
            .filter(|&l| counts[l] > 0)
            .map(|l| (l, sums[l] / counts[l] as f64))
            .collect();
        present.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        let mut ranks = vec![f64::NAN; MAX_LEVELS];
        for (rank, &(level, _)) in present.iter().enumerate() {
            ranks[level] = rank as f64;
        }
        Self { ranks }
    }

    /// Map a raw level to its rank.
    #[must_use]
    pub fn rank(&self, value: f64) -> f64 {
        if value.is_nan() || value < 0.0 || value.fract() != 0.0 {
            return f64::NAN;
        }
        self.ranks.get(value as usize).copied().unwrap_or(f64::NAN)
    }
}

/// Borrowed view over the feature matrix plus prepared targets and weights.
///
/// With shadow columns enabled the splitter sees `2p` candidates: column
/// `p + j` reads feature `j` at a fixed permutation of the rows.
#[derive(Debug)]
pub(crate) struct Dataset<'a> {
    matrix: &'a Matrix,
    response: Response<'a>,
    weights: Option<&'a [f64]>,
    unordered: Vec<bool>,
    partition: bool,
    level_orders: Vec<Option<LevelOrder>>,
    shadow_rows: Option<Vec<usize>>,
}

impl<'a> Dataset<'a> {
    pub(crate) fn new(request: &'a TrainingRequest, plan: &FitPlan) -> Self {
        let matrix = request.features();
        let response = Response::prepare(request.target());
        let level_orders = if plan.policy == UnorderedPolicy::Order {
            let scores = order_scores(&response, matrix.n_rows());
            plan.unordered
                .iter()
                .enumerate()
                .map(|(col, &flag)| flag.then(|| LevelOrder::from_scores(matrix.column(col), &scores)))
                .collect()
        } else {
            Vec::new()
        };
        Self {
            matrix,
            response,
            weights: request.case_weights(),
            unordered: plan.unordered.clone(),
            partition: plan.policy == UnorderedPolicy::Partition,
            level_orders,
            shadow_rows: plan.shadow_seed.map(|seed| {
                let mut rows: Vec<usize> = (0..matrix.n_rows()).collect();
                RandomStream::substream(seed, Purpose::Shadow, 0).shuffle(&mut rows);
                rows
            }),
        }
    }

    pub(crate) fn num_rows(&self) -> usize {
        self.matrix.n_rows()
    }

    pub(crate) fn num_columns(&self) -> usize {
        self.matrix.n_cols()
    }

    /// Columns the splitter may draw: the features, then their shadows if any.
    pub(crate) fn num_candidate_columns(&self) -> usize {
        match self.shadow_rows {
            Some(_) => 2 * self.num_columns(),
            None => self.num_columns(),
        }
    }

    /// Feature column behind a candidate column and whether it is a shadow.
    #[inline]
    pub(crate) fn base_column(&self, col: usize) -> (usize, bool) {
        let p = self.num_columns();
        if col >= p { (col - p, true) } else { (col, false) }
    }

    /// Feature value, remapped to its level rank under the `Order` policy.
    #[inline]
    pub(crate) fn value(&self, row: usize, col: usize) -> f64 {
        let (base, shadow) = self.base_column(col);
        let row = match (&self.shadow_rows, shadow) {
            (Some(rows), true) => rows[row],
            _ => row,
        };
        let raw = self.matrix.value(row, base);
        match self.level_orders.get(base) {
            Some(Some(order)) => order.rank(raw),
            _ => raw,
        }
    }

    /// Whether the column was declared unordered.
    pub(crate) fn is_unordered(&self, col: usize) -> bool {
        self.unordered[self.base_column(col).0]
    }

    /// Whether the column is split by partitioning its levels.
    #[inline]
    pub(crate) fn splits_by_partition(&self, col: usize) -> bool {
        self.partition && self.is_unordered(col)
    }

    pub(crate) fn weight(&self, row: usize) -> f64 {
        self.weights.map_or(1.0, |w| w[row])
    }

    pub(crate) fn case_weights(&self) -> Option<&'a [f64]> {
        self.weights
    }

    pub(crate) fn target(&self, row: usize) -> Outcome {
        match &self.response {
            Response::Regression(y) => Outcome::Response(y[row]),
            Response::Classification { classes, .. } => Outcome::Class(classes[row]),
            Response::Survival { time, event, .. } => Outcome::Survival {
                time: time[row],
                event: event[row],
            },
        }
    }

    pub(crate) fn response(&self) -> &Response<'a> {
        &self.response
    }

    /// Dense class index per row. Empty for other tree types.
    pub(crate) fn classes(&self) -> &[usize] {
        match &self.response {
            Response::Classification { classes, .. } => classes,
            _ => &[],
        }
    }

    pub(crate) fn class_values(&self) -> &[f64] {
        match &self.response {
            Response::Classification { class_values, .. } => class_values,
            _ => &[],
        }
    }

    pub(crate) fn n_classes(&self) -> usize {
        self.class_values().len()
    }

    pub(crate) fn survival_index(&self) -> Option<&SurvivalIndex> {
        match &self.response {
            Response::Survival { index, .. } => Some(index),
            _ => None,
        }
    }

    pub(crate) fn unordered_flags(&self) -> &[bool] {
        &self.unordered
    }

    pub(crate) fn level_orders(&self) -> &[Option<LevelOrder>] {
        &self.level_orders
    }
}

/// Per-row score whose level means define the `Order` ranking.
fn order_scores(response: &Response<'_>, n_rows: usize) -> Vec<f64> {
    match response {
        Response::Regression(y) => y.to_vec(),
        Response::Classification {
            classes,
            class_values,
        } => {
            let mut counts = vec![0_usize; class_values.len()];
            for &c in classes {
                counts[c] += 1;
            }
            let majority = argmax_lowest(&counts);
            classes
                .iter()
                .map(|&c| f64::from(u8::from(c == majority)))
                .collect()
        }
        Response::Survival { time, event, .. } => {
            let rows: Vec<usize> = (0..n_rows).collect();
            logrank_scores(&rows, time, event)
        }
    }
}
