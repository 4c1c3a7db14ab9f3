use crate::config::SplitRule;
use crate::criterion::{Beta, Concordance, Criterion, Gini, LogRank, Variance};
use crate::data::{Dataset, MAX_LEVELS, Outcome, Response};
use crate::maxstat::{benjamini_hochberg, max_statistic, p_value, rank_scores};
use crate::node::{FeatureIndex, SplitPredicate, level_bit};
use crate::request::GrowthParams;
use crate::rng::RandomStream;
use crate::survival::logrank_scores;

/// Present levels up to which every partition is enumerated.
const MAX_EXHAUSTIVE_LEVELS: usize = 10;

/// A chosen split with the node's rows routed to each child.
#[derive(Debug, Clone)]
pub(crate) struct SplitDecision {
    pub(crate) feature: FeatureIndex,
    /// The split was found on the feature's shadow column.
    pub(crate) shadow: bool,
    pub(crate) predicate: SplitPredicate,
    pub(crate) missing_goes_left: bool,
    /// Improvement after regularization.
    pub(crate) improvement: f64,
    pub(crate) left: Vec<usize>,
    pub(crate) right: Vec<usize>,
}

/// Best candidate found for one feature.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    predicate: SplitPredicate,
    improvement: f64,
}

/// Chooses node splits for one tree.
///
/// Holds the objective's scratch state, so each tree builder owns one.
#[derive(Debug)]
pub(crate) struct Splitter<'d, 'a> {
    data: &'d Dataset<'a>,
    params: &'d GrowthParams,
    criterion: Option<Criterion<'d>>,
}

impl<'d, 'a> Splitter<'d, 'a> {
    pub(crate) fn new(data: &'d Dataset<'a>, params: &'d GrowthParams) -> Self {
        Self {
            data,
            params,
            criterion: base_criterion(data, params),
        }
    }

    /// Find the best split of `rows`, or `None` when the node must become a leaf.
    ///
    /// `used` flags features already split on by earlier trees or nodes; it
    /// only matters when regularization is active.
    pub(crate) fn find_best_split(
        &mut self,
        rows: &[usize],
        depth: usize,
        rng: &mut RandomStream,
        used: &[bool],
    ) -> Option<SplitDecision> {
        let min_node_size = self.params.min_node_size;
        if rows.len() < 2 * min_node_size {
            return None;
        }
        if self.params.max_depth > 0 && depth >= self.params.max_depth {
            return None;
        }
        if self.is_pure(rows) {
            return None;
        }

        let candidates = self.draw_candidates(rng);
        let best = match self.params.split_rule {
            SplitRule::MaxStat { alpha, minprop } => {
                self.best_maxstat(rows, &candidates, depth, used, alpha, minprop)
            }
            _ => {
                let mut best: Option<Candidate> = None;
                for &feature in &candidates {
                    let penalty = self.penalty(feature, depth, used);
                    let found = if self.data.splits_by_partition(feature) {
                        self.best_partition(rows, feature, penalty, rng)
                    } else {
                        self.best_threshold(rows, feature, penalty, rng)
                    };
                    if let Some(candidate) = found
                        && best.is_none_or(|b| candidate.improvement > b.improvement)
                    {
                        best = Some(candidate);
                    }
                }
                best
            }
        }?;
        if best.improvement <= 0.0 {
            return None;
        }
        self.route(rows, best)
    }

    /// Draw `mtry` features (uniform, or weighted) and append the always-split ones.
    ///
    /// Shadow columns, when present, are drawn like any other feature.
    fn draw_candidates(&self, rng: &mut RandomStream) -> Vec<usize> {
        let always = &self.params.always_split;
        let eligible: Vec<usize> = (0..self.data.num_candidate_columns())
            .filter(|f| always.binary_search(f).is_err())
            .collect();
        let mtry = self.params.mtry.min(eligible.len());
        let picks = match &self.params.split_select_weights {
            Some(weights) => {
                let eligible_weights: Vec<f64> = eligible.iter().map(|&f| weights[f]).collect();
                rng.weighted_sample_without_replacement(&eligible_weights, mtry)
            }
            None => rng.sample_without_replacement(eligible.len(), mtry),
        };
        let mut features: Vec<usize> = picks.into_iter().map(|i| eligible[i]).collect();
        features.extend_from_slice(always);
        features
    }

    /// Multiplier for features not split on yet.
    fn penalty(&self, feature: usize, depth: usize, used: &[bool]) -> f64 {
        match &self.params.regularization {
            Some(factors) if !used.get(feature).copied().unwrap_or(false) => {
                if self.params.regularization_usedepth {
                    factors[feature].powi(depth as i32 + 1)
                } else {
                    factors[feature]
                }
            }
            _ => 1.0,
        }
    }

    fn is_pure(&self, rows: &[usize]) -> bool {
        let Some(&first) = rows.first() else {
            return true;
        };
        match self.data.target(first) {
            Outcome::Survival { .. } => rows.iter().all(|&row| {
                !matches!(self.data.target(row), Outcome::Survival { event: true, .. })
            }),
            outcome => rows.iter().all(|&row| self.data.target(row) == outcome),
        }
    }

    /// Rows with a value for `feature`, sorted by that value.
    fn present_sorted(&self, rows: &[usize], feature: usize) -> Vec<(f64, usize)> {
        let mut present: Vec<(f64, usize)> = rows
            .iter()
            .map(|&row| (self.data.value(row, feature), row))
            .filter(|(v, _)| !v.is_nan())
            .collect();
        present.sort_by(|a, b| a.0.total_cmp(&b.0));
        present
    }

    fn best_threshold(
        &mut self,
        rows: &[usize],
        feature: usize,
        penalty: f64,
        rng: &mut RandomStream,
    ) -> Option<Candidate> {
        let present = self.present_sorted(rows, feature);
        let n = present.len();
        let min = self.params.min_node_size;
        if n < 2 * min || n < 2 {
            return None;
        }
        let random_splits = match self.params.split_rule {
            SplitRule::ExtraTrees { num_random_splits } => Some(num_random_splits),
            _ => None,
        };
        let criterion = self.criterion.as_mut()?;
        let present_rows: Vec<usize> = present.iter().map(|&(_, r)| r).collect();
        criterion.reset(&present_rows);

        let mut best: Option<(f64, f64)> = None;
        if let Some(num_random_splits) = random_splits {
            let (low, high) = (present[0].0, present[n - 1].0);
            if low == high {
                return None;
            }
            let mut thresholds: Vec<f64> = (0..num_random_splits)
                .map(|_| rng.uniform_in(low, high))
                .collect();
            thresholds.sort_by(f64::total_cmp);
            let mut n_left = 0;
            for threshold in thresholds {
                while n_left < n && present[n_left].0 < threshold {
                    criterion.move_left(present[n_left].1);
                    n_left += 1;
                }
                if n_left < min || n - n_left < min {
                    continue;
                }
                if let Some(gain) = criterion.improvement() {
                    let gain = gain * penalty;
                    if best.is_none_or(|(b, _)| gain > b) {
                        best = Some((gain, threshold));
                    }
                }
            }
        } else {
            for i in 0..n - 1 {
                criterion.move_left(present[i].1);
                let (value, next) = (present[i].0, present[i + 1].0);
                let n_left = i + 1;
                if value == next || n_left < min || n - n_left < min {
                    continue;
                }
                if let Some(gain) = criterion.improvement() {
                    let gain = gain * penalty;
                    if best.is_none_or(|(b, _)| gain > b) {
                        best = Some((gain, midpoint(value, next)));
                    }
                }
            }
        }
        best.map(|(improvement, threshold)| Candidate {
            feature,
            predicate: SplitPredicate::Threshold(threshold),
            improvement,
        })
    }

    fn best_partition(
        &mut self,
        rows: &[usize],
        feature: usize,
        penalty: f64,
        rng: &mut RandomStream,
    ) -> Option<Candidate> {
        let present: Vec<(u64, usize)> = rows
            .iter()
            .filter_map(|&row| level_bit(self.data.value(row, feature)).map(|bit| (bit, row)))
            .collect();
        let n = present.len();
        let min = self.params.min_node_size;
        if n < 2 * min || n < 2 {
            return None;
        }
        let all_levels = present.iter().fold(0_u64, |acc, &(bit, _)| acc | bit);
        let levels: Vec<u64> = (0..MAX_LEVELS)
            .map(|l| 1_u64 << l)
            .filter(|bit| all_levels & bit != 0)
            .collect();
        let k = levels.len();
        if k < 2 {
            return None;
        }

        let masks: Vec<u64> = if let SplitRule::ExtraTrees { num_random_splits } = self.params.split_rule {
            (0..num_random_splits)
                .map(|_| random_partition(&levels, rng))
                .collect()
        } else if k <= MAX_EXHAUSTIVE_LEVELS {
            (1_u64..(1 << (k - 1)))
                .map(|subset| {
                    levels
                        .iter()
                        .enumerate()
                        .filter(|&(j, _)| subset & (1 << j) != 0)
                        .fold(0, |mask, (_, bit)| mask | bit)
                })
                .collect()
        } else {
            self.ordered_prefix_partitions(&present, &levels)
        };

        let criterion = self.criterion.as_mut()?;
        let present_rows: Vec<usize> = present.iter().map(|&(_, r)| r).collect();
        criterion.reset(&present_rows);
        let mut best: Option<(f64, u64)> = None;
        for mask in masks {
            criterion.clear_left();
            let mut n_left = 0;
            for &(bit, row) in &present {
                if mask & bit != 0 {
                    criterion.move_left(row);
                    n_left += 1;
                }
            }
            if n_left < min || n - n_left < min {
                continue;
            }
            if let Some(gain) = criterion.improvement() {
                let gain = gain * penalty;
                if best.is_none_or(|(b, _)| gain > b) {
                    best = Some((gain, mask));
                }
            }
        }
        best.map(|(improvement, mask)| Candidate {
            feature,
            predicate: SplitPredicate::Categories(mask),
            improvement,
        })
    }

    /// Order levels by their mean node score and return every prefix as a left set.
    fn ordered_prefix_partitions(&self, present: &[(u64, usize)], levels: &[u64]) -> Vec<u64> {
        let rows: Vec<usize> = present.iter().map(|&(_, r)| r).collect();
        let scores = self.node_scores(&rows);
        let mut means: Vec<(u64, f64)> = levels
            .iter()
            .map(|&bit| {
                let (sum, count) = present
                    .iter()
                    .zip(&scores)
                    .filter(|((b, _), _)| *b == bit)
                    .fold((0.0, 0.0), |(s, c), (_, score)| (s + score, c + 1.0));
                (bit, sum / count)
            })
            .collect();
        means.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        let mut masks = Vec::with_capacity(means.len() - 1);
        let mut mask = 0;
        for &(bit, _) in &means[..means.len() - 1] {
            mask |= bit;
            masks.push(mask);
        }
        masks
    }

    /// Per-row scores used to order levels within a node, aligned with `rows`.
    fn node_scores(&self, rows: &[usize]) -> Vec<f64> {
        match self.data.response() {
            Response::Regression(y) => rows.iter().map(|&r| y[r]).collect(),
            Response::Classification { classes, .. } => {
                let mut counts = vec![0_usize; self.data.n_classes()];
                for &r in rows {
                    counts[classes[r]] += 1;
                }
                let majority = argmax_lowest(&counts);
                rows.iter()
                    .map(|&r| f64::from(u8::from(classes[r] == majority)))
                    .collect()
            }
            Response::Survival { time, event, .. } => logrank_scores(rows, time, event),
        }
    }

    fn best_maxstat(
        &self,
        rows: &[usize],
        candidates: &[usize],
        depth: usize,
        used: &[bool],
        alpha: f64,
        minprop: f64,
    ) -> Option<Candidate> {
        let mut found: Vec<(usize, f64, f64, f64)> = Vec::new();
        for &feature in candidates {
            let present = self.present_sorted(rows, feature);
            if present.len() < 2 {
                continue;
            }
            let values: Vec<f64> = present.iter().map(|&(v, _)| v).collect();
            let sorted_rows: Vec<usize> = present.iter().map(|&(_, r)| r).collect();
            let scores = match self.data.response() {
                Response::Regression(y) => {
                    let ys: Vec<f64> = sorted_rows.iter().map(|&r| y[r]).collect();
                    rank_scores(&ys)
                }
                Response::Survival { time, event, .. } => logrank_scores(&sorted_rows, time, event),
                Response::Classification { .. } => return None,
            };
            let Some(cut) = max_statistic(&values, &scores, minprop, self.params.min_node_size)
            else {
                continue;
            };
            let statistic = cut.statistic * self.penalty(feature, depth, used);
            let p = p_value(statistic, minprop, values.len(), &cut.cut_sizes);
            found.push((feature, statistic, p, cut.threshold));
        }
        if found.is_empty() {
            return None;
        }
        let p_values: Vec<f64> = found.iter().map(|f| f.2).collect();
        let adjusted = benjamini_hochberg(&p_values);
        let mut best = 0;
        for (i, &p) in adjusted.iter().enumerate() {
            if p < adjusted[best] {
                best = i;
            }
        }
        if adjusted[best] >= alpha {
            return None;
        }
        let (feature, statistic, _, threshold) = found[best];
        Some(Candidate {
            feature,
            predicate: SplitPredicate::Threshold(threshold),
            improvement: statistic,
        })
    }

    /// Send present rows by the predicate and missing rows to the larger child.
    fn route(&self, rows: &[usize], best: Candidate) -> Option<SplitDecision> {
        let mut left = Vec::with_capacity(rows.len());
        let mut right = Vec::with_capacity(rows.len());
        let mut missing = Vec::new();
        for &row in rows {
            let value = self.data.value(row, best.feature);
            if value.is_nan() {
                missing.push(row);
            } else if best.predicate.sends_left(value) {
                left.push(row);
            } else {
                right.push(row);
            }
        }
        let min = self.params.min_node_size;
        if left.len() < min || right.len() < min || left.is_empty() || right.is_empty() {
            return None;
        }
        let missing_goes_left = left.len() >= right.len();
        if missing_goes_left {
            left.extend(missing);
        } else {
            right.extend(missing);
        }
        let (feature, shadow) = self.data.base_column(best.feature);
        Some(SplitDecision {
            feature: FeatureIndex::new(feature),
            shadow,
            predicate: best.predicate,
            missing_goes_left,
            improvement: best.improvement,
            left,
            right,
        })
    }
}

/// Objective used by the incremental scans for this rule and tree type.
fn base_criterion<'d>(data: &'d Dataset<'_>, params: &'d GrowthParams) -> Option<Criterion<'d>> {
    match (params.split_rule, data.response()) {
        (SplitRule::MaxStat { .. }, _) => None,
        (SplitRule::Beta, Response::Regression(y)) => Some(Criterion::Beta(Beta::new(y))),
        (_, Response::Regression(y)) => Some(Criterion::Variance(Variance::new(y))),
        (_, Response::Classification { classes, .. }) => {
            Some(Criterion::Gini(Gini::new(classes, &params.class_weights)))
        }
        (SplitRule::Concordance, Response::Survival { time, event, .. }) => {
            Some(Criterion::Concordance(Concordance::new(time, event)))
        }
        (_, Response::Survival { index, .. }) => Some(Criterion::LogRank(LogRank::new(index))),
    }
}

/// Threshold strictly above `low` and at most `high`.
fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low + (high - low) / 2.0;
    if mid > low { mid } else { high }
}

/// Random proper subset of `levels`; the last level always stays right.
fn random_partition(levels: &[u64], rng: &mut RandomStream) -> u64 {
    let choosable = &levels[..levels.len() - 1];
    let mut mask = choosable
        .iter()
        .filter(|_| rng.uniform() < 0.5)
        .fold(0, |mask, bit| mask | bit);
    if mask == 0 {
        mask = choosable[rng.below(choosable.len())];
    }
    mask
}

/// Index of the largest count; ties go to the lowest index.
pub(crate) fn argmax_lowest<T: PartialOrd + Copy>(values: &[T]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ForestConfig, Mtry, UnorderedPolicy};
    use crate::matrix::Matrix;
    use crate::request::{FitPlan, Target, TrainingRequest};

    fn setup(columns: Vec<Vec<f64>>, target: Target, config: ForestConfig) -> (TrainingRequest, FitPlan) {
        let request = TrainingRequest::new(Matrix::from_columns(&columns).unwrap(), target, config);
        let plan = request.validate().unwrap();
        (request, plan)
    }

    fn all_features(n_trees: usize) -> ForestConfig {
        ForestConfig::new(n_trees)
            .unwrap()
            .with_mtry(Mtry::All)
            .with_min_node_size(Some(1))
    }

    fn rows(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn separable_classes_split_between_groups() {
        let (request, plan) = setup(
            vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]],
            Target::Classification(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]),
            all_features(1),
        );
        let data = Dataset::new(&request, &plan);
        let mut splitter = Splitter::new(&data, &plan.params);
        let mut rng = RandomStream::seed(42);
        let split = splitter
            .find_best_split(&rows(6), 0, &mut rng, &[])
            .expect("should find a split");
        assert_eq!(split.feature.index(), 0);
        assert_eq!(split.predicate, SplitPredicate::Threshold(6.5));
        assert_eq!(split.left, vec![0, 1, 2]);
        assert_eq!(split.right, vec![3, 4, 5]);
        assert!(split.improvement > 0.0);
    }

    #[test]
    fn constant_feature_returns_none() {
        let (request, plan) = setup(
            vec![vec![5.0; 4]],
            Target::Regression(vec![1.0, 2.0, 3.0, 4.0]),
            all_features(1),
        );
        let data = Dataset::new(&request, &plan);
        let mut splitter = Splitter::new(&data, &plan.params);
        assert!(
            splitter
                .find_best_split(&rows(4), 0, &mut RandomStream::seed(1), &[])
                .is_none()
        );
    }

    #[test]
    fn small_nodes_and_depth_limit_stop() {
        let (request, plan) = setup(
            vec![vec![1.0, 2.0, 3.0, 4.0]],
            Target::Regression(vec![1.0, 2.0, 30.0, 40.0]),
            all_features(1).with_min_node_size(Some(3)),
        );
        let data = Dataset::new(&request, &plan);
        let mut splitter = Splitter::new(&data, &plan.params);
        assert!(
            splitter
                .find_best_split(&rows(4), 0, &mut RandomStream::seed(1), &[])
                .is_none()
        );

        let (request, plan) = setup(
            vec![vec![1.0, 2.0, 3.0, 4.0]],
            Target::Regression(vec![1.0, 2.0, 30.0, 40.0]),
            all_features(1).with_max_depth(2),
        );
        let data = Dataset::new(&request, &plan);
        let mut splitter = Splitter::new(&data, &plan.params);
        let mut rng = RandomStream::seed(1);
        assert!(splitter.find_best_split(&rows(4), 1, &mut rng, &[]).is_some());
        assert!(splitter.find_best_split(&rows(4), 2, &mut rng, &[]).is_none());
    }

    #[test]
    fn pure_node_is_not_split() {
        let (request, plan) = setup(
            vec![vec![1.0, 2.0, 3.0, 4.0]],
            Target::Classification(vec![1.0; 4]),
            all_features(1),
        );
        let data = Dataset::new(&request, &plan);
        let mut splitter = Splitter::new(&data, &plan.params);
        assert!(
            splitter
                .find_best_split(&rows(4), 0, &mut RandomStream::seed(1), &[])
                .is_none()
        );
    }

    #[test]
    fn missing_rows_follow_the_larger_child() {
        let (request, plan) = setup(
            vec![vec![1.0, 2.0, f64::NAN, 10.0, 11.0, 12.0, 13.0]],
            Target::Regression(vec![0.0, 0.0, 5.0, 9.0, 9.0, 9.0, 9.0]),
            all_features(1),
        );
        let data = Dataset::new(&request, &plan);
        let mut splitter = Splitter::new(&data, &plan.params);
        let split = splitter
            .find_best_split(&rows(7), 0, &mut RandomStream::seed(3), &[])
            .unwrap();
        assert!(!split.missing_goes_left);
        assert_eq!(split.left, vec![0, 1]);
        assert_eq!(split.right, vec![3, 4, 5, 6, 2]);
    }

    #[test]
    fn partition_groups_levels_by_response() {
        // Levels 0 and 2 share low responses, 1 and 3 high ones.
        let levels = vec![0.0, 1.0, 2.0, 3.0, 0.0, 1.0, 2.0, 3.0];
        let y = vec![1.0, 10.0, 1.5, 10.5, 1.2, 9.8, 1.1, 10.2];
        let (request, plan) = setup(
            vec![levels],
            Target::Regression(y),
            all_features(1).with_respect_unordered(Some(UnorderedPolicy::Partition)),
        );
        let request = request.with_unordered_features(vec![0]);
        let plan = request.validate().unwrap();
        let data = Dataset::new(&request, &plan);
        let mut splitter = Splitter::new(&data, &plan.params);
        let split = splitter
            .find_best_split(&rows(8), 0, &mut RandomStream::seed(9), &[])
            .unwrap();
        let SplitPredicate::Categories(mask) = split.predicate else {
            panic!("expected a category split");
        };
        assert!(mask == 0b0101 || mask == 0b1010, "mask = {mask:#b}");
    }

    #[test]
    fn extra_trees_threshold_within_observed_range() {
        let x: Vec<f64> = (0..30).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| if *v < 15.0 { 0.0 } else { 1.0 }).collect();
        let (request, plan) = setup(
            vec![x],
            Target::Regression(y),
            all_features(1).with_split_rule(Some(SplitRule::ExtraTrees {
                num_random_splits: 5,
            })),
        );
        let data = Dataset::new(&request, &plan);
        let mut splitter = Splitter::new(&data, &plan.params);
        for seed in 0..10 {
            let split = splitter
                .find_best_split(&rows(30), 0, &mut RandomStream::seed(seed), &[])
                .unwrap();
            let SplitPredicate::Threshold(t) = split.predicate else {
                panic!("expected a threshold");
            };
            assert!((0.0..29.0).contains(&t));
        }
    }

    #[test]
    fn maxstat_needs_significance() {
        let x: Vec<f64> = (0..40).map(f64::from).collect();
        let signal: Vec<f64> = x
            .iter()
            .map(|v| (if *v < 20.0 { 0.0 } else { 5.0 }) + v * 0.01)
            .collect();
        let (request, plan) = setup(
            vec![x.clone()],
            Target::Regression(signal),
            all_features(1).with_split_rule(Some(SplitRule::maxstat())),
        );
        let data = Dataset::new(&request, &plan);
        let mut splitter = Splitter::new(&data, &plan.params);
        let split = splitter
            .find_best_split(&rows(40), 0, &mut RandomStream::seed(1), &[])
            .unwrap();
        assert_eq!(split.predicate, SplitPredicate::Threshold(19.5));

        // Alternating response: no cut is significant at a tiny alpha.
        let noise: Vec<f64> = (0..40).map(|i| f64::from(i % 2)).collect();
        let (request, plan) = setup(
            vec![x],
            Target::Regression(noise),
            all_features(1).with_split_rule(Some(SplitRule::MaxStat {
                alpha: 0.001,
                minprop: 0.1,
            })),
        );
        let data = Dataset::new(&request, &plan);
        let mut splitter = Splitter::new(&data, &plan.params);
        assert!(
            splitter
                .find_best_split(&rows(40), 0, &mut RandomStream::seed(1), &[])
                .is_none()
        );
    }

    #[test]
    fn regularization_prefers_used_features() {
        // Feature 0 separates slightly better than feature 1.
        let f0 = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let f1 = vec![1.0, 2.0, 4.0, 3.0, 5.0, 6.0];
        let y = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let (request, plan) = setup(
            vec![f0, f1],
            Target::Regression(y),
            all_features(1).with_regularization_factor(vec![0.1]),
        );
        let data = Dataset::new(&request, &plan);
        let mut splitter = Splitter::new(&data, &plan.params);
        let mut rng = RandomStream::seed(1);
        let fresh = splitter.find_best_split(&rows(6), 0, &mut rng, &[false, false]).unwrap();
        assert_eq!(fresh.feature.index(), 0);
        let reused = splitter.find_best_split(&rows(6), 0, &mut rng, &[false, true]).unwrap();
        assert_eq!(reused.feature.index(), 1);
    }

    #[test]
    fn always_split_variables_join_the_draw() {
        let columns = vec![vec![1.0, 2.0, 3.0, 4.0]; 4];
        let (request, plan) = setup(
            columns,
            Target::Regression(vec![1.0, 2.0, 3.0, 4.0]),
            ForestConfig::new(1)
                .unwrap()
                .with_mtry(Mtry::Fixed(1))
                .with_always_split_variables(vec![3]),
        );
        let data = Dataset::new(&request, &plan);
        let splitter = Splitter::new(&data, &plan.params);
        let mut rng = RandomStream::seed(5);
        for _ in 0..20 {
            let drawn = splitter.draw_candidates(&mut rng);
            assert_eq!(drawn.len(), 2);
            assert_eq!(drawn[1], 3);
            assert_ne!(drawn[0], 3);
        }
    }

    #[test]
    fn survival_split_uses_logrank() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let (request, plan) = setup(
            vec![x],
            Target::Survival {
                time: vec![1.0, 2.0, 1.5, 2.5, 20.0, 22.0, 21.0, 25.0],
                status: vec![1.0; 8],
            },
            all_features(1),
        );
        let data = Dataset::new(&request, &plan);
        let mut splitter = Splitter::new(&data, &plan.params);
        let split = splitter
            .find_best_split(&rows(8), 0, &mut RandomStream::seed(2), &[])
            .unwrap();
        assert!(split.left.iter().all(|&r| r < 4), "left = {:?}", split.left);
        assert!(split.right.contains(&4));
    }

    #[test]
    fn argmax_ties_go_low() {
        assert_eq!(argmax_lowest(&[1, 3, 3, 2]), 1);
        assert_eq!(argmax_lowest(&[0.0]), 0);
    }
}
