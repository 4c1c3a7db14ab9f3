//! Split objectives scored incrementally as rows move into the left child.
//!
//! A criterion is reset with the rows of a node that have a value for the
//! feature under consideration; those rows start on the right. The splitter
//! then moves rows left one at a time and asks for the improvement of the
//! current partition.

use statrs::function::gamma::ln_gamma;

use crate::survival::{RiskCounts, SurvivalIndex};

/// Node statistics for one split objective, dispatched by `match`.
#[derive(Debug)]
pub(crate) enum Criterion<'d> {
    Variance(Variance<'d>),
    Gini(Gini<'d>),
    Beta(Beta<'d>),
    LogRank(LogRank<'d>),
    Concordance(Concordance<'d>),
}

impl Criterion<'_> {
    /// Load the node totals of `rows` and put every row on the right.
    pub(crate) fn reset(&mut self, rows: &[usize]) {
        match self {
            Criterion::Variance(c) => c.reset(rows),
            Criterion::Gini(c) => c.reset(rows),
            Criterion::Beta(c) => c.reset(rows),
            Criterion::LogRank(c) => c.reset(rows),
            Criterion::Concordance(c) => c.reset(rows),
        }
    }

    /// Move every row back to the right, keeping the node totals.
    pub(crate) fn clear_left(&mut self) {
        match self {
            Criterion::Variance(c) => c.left = Moments::default(),
            Criterion::Gini(c) => c.left.iter_mut().for_each(|v| *v = 0.0),
            Criterion::Beta(c) => c.left = BetaSums::default(),
            Criterion::LogRank(c) => c.left = RiskCounts::zeros(c.index.n_times()),
            Criterion::Concordance(c) => c.left_sum = 0.0,
        }
    }

    #[inline]
    pub(crate) fn move_left(&mut self, row: usize) {
        match self {
            Criterion::Variance(c) => c.left.add(c.y[row]),
            Criterion::Gini(c) => c.left[c.classes[row]] += 1.0,
            Criterion::Beta(c) => c.left.add(c.y[row]),
            Criterion::LogRank(c) => c.left.add(c.index, row),
            Criterion::Concordance(c) => c.left_sum += c.contribution[row],
        }
    }

    /// Improvement of the current left/right partition, `None` when undefined.
    pub(crate) fn improvement(&self) -> Option<f64> {
        match self {
            Criterion::Variance(c) => c.improvement(),
            Criterion::Gini(c) => c.improvement(),
            Criterion::Beta(c) => c.improvement(),
            Criterion::LogRank(c) => c.improvement(),
            Criterion::Concordance(c) => c.improvement(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Moments {
    n: f64,
    sum: f64,
}

impl Moments {
    #[inline]
    fn add(&mut self, value: f64) {
        self.n += 1.0;
        self.sum += value;
    }
}

/// Reduction in within-child sum of squares.
#[derive(Debug)]
pub(crate) struct Variance<'d> {
    y: &'d [f64],
    total: Moments,
    left: Moments,
}

impl<'d> Variance<'d> {
    pub(crate) fn new(y: &'d [f64]) -> Self {
        Self {
            y,
            total: Moments::default(),
            left: Moments::default(),
        }
    }

    fn reset(&mut self, rows: &[usize]) {
        self.total = Moments::default();
        for &row in rows {
            self.total.add(self.y[row]);
        }
        self.left = Moments::default();
    }

    fn improvement(&self) -> Option<f64> {
        let n_right = self.total.n - self.left.n;
        if self.left.n == 0.0 || n_right == 0.0 {
            return None;
        }
        let sum_right = self.total.sum - self.left.sum;
        let score = self.left.sum * self.left.sum / self.left.n + sum_right * sum_right / n_right;
        Some(score - self.total.sum * self.total.sum / self.total.n)
    }
}

/// Class-weighted Gini gain.
#[derive(Debug)]
pub(crate) struct Gini<'d> {
    classes: &'d [usize],
    class_weights: &'d [f64],
    total: Vec<f64>,
    left: Vec<f64>,
    n: f64,
}

impl<'d> Gini<'d> {
    pub(crate) fn new(classes: &'d [usize], class_weights: &'d [f64]) -> Self {
        let n_classes = class_weights.len();
        Self {
            classes,
            class_weights,
            total: vec![0.0; n_classes],
            left: vec![0.0; n_classes],
            n: 0.0,
        }
    }

    fn reset(&mut self, rows: &[usize]) {
        self.total.iter_mut().for_each(|v| *v = 0.0);
        self.left.iter_mut().for_each(|v| *v = 0.0);
        for &row in rows {
            self.total[self.classes[row]] += 1.0;
        }
        self.n = rows.len() as f64;
    }

    fn weighted_square_sum(&self, counts: impl Iterator<Item = f64>) -> f64 {
        counts
            .zip(self.class_weights)
            .map(|(c, w)| w * c * c)
            .sum()
    }

    fn improvement(&self) -> Option<f64> {
        let n_left: f64 = self.left.iter().sum();
        let n_right = self.n - n_left;
        if n_left == 0.0 || n_right == 0.0 {
            return None;
        }
        let left = self.weighted_square_sum(self.left.iter().copied());
        let right = self.weighted_square_sum(self.total.iter().zip(&self.left).map(|(t, l)| t - l));
        let parent = self.weighted_square_sum(self.total.iter().copied());
        Some(left / n_left + right / n_right - parent / self.n)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct BetaSums {
    n: f64,
    sum: f64,
    sum_sq: f64,
    sum_log: f64,
    sum_log1m: f64,
}

impl BetaSums {
    #[inline]
    fn add(&mut self, y: f64) {
        self.n += 1.0;
        self.sum += y;
        self.sum_sq += y * y;
        self.sum_log += y.ln();
        self.sum_log1m += (1.0 - y).ln();
    }

    fn minus(&self, other: &BetaSums) -> BetaSums {
        BetaSums {
            n: self.n - other.n,
            sum: self.sum - other.sum,
            sum_sq: self.sum_sq - other.sum_sq,
            sum_log: self.sum_log - other.sum_log,
            sum_log1m: self.sum_log1m - other.sum_log1m,
        }
    }

    /// Beta log-likelihood with method-of-moments parameters.
    pub(crate) fn log_likelihood(&self) -> Option<f64> {
        if self.n < 2.0 {
            return None;
        }
        let mean = self.sum / self.n;
        let var = (self.sum_sq - self.n * mean * mean) / (self.n - 1.0);
        if var <= f64::EPSILON || mean <= 0.0 || mean >= 1.0 {
            return None;
        }
        let phi = mean * (1.0 - mean) / var - 1.0;
        if phi <= 0.0 {
            return None;
        }
        let a = mean * phi;
        let b = (1.0 - mean) * phi;
        Some(
            self.n * (ln_gamma(phi) - ln_gamma(a) - ln_gamma(b))
                + (a - 1.0) * self.sum_log
                + (b - 1.0) * self.sum_log1m,
        )
    }
}

/// Gain in Beta log-likelihood from fitting each child separately.
#[derive(Debug)]
pub(crate) struct Beta<'d> {
    y: &'d [f64],
    total: BetaSums,
    left: BetaSums,
}

impl<'d> Beta<'d> {
    pub(crate) fn new(y: &'d [f64]) -> Self {
        Self {
            y,
            total: BetaSums::default(),
            left: BetaSums::default(),
        }
    }

    fn reset(&mut self, rows: &[usize]) {
        self.total = BetaSums::default();
        for &row in rows {
            self.total.add(self.y[row]);
        }
        self.left = BetaSums::default();
    }

    fn improvement(&self) -> Option<f64> {
        let right = self.total.minus(&self.left);
        let children = self.left.log_likelihood()? + right.log_likelihood()?;
        Some(children - self.total.log_likelihood()?)
    }
}

/// Standardized two-sample log-rank statistic.
#[derive(Debug)]
pub(crate) struct LogRank<'d> {
    index: &'d SurvivalIndex,
    total: RiskCounts,
    total_at_risk: Vec<f64>,
    left: RiskCounts,
}

impl<'d> LogRank<'d> {
    pub(crate) fn new(index: &'d SurvivalIndex) -> Self {
        Self {
            index,
            total: RiskCounts::zeros(index.n_times()),
            total_at_risk: Vec::new(),
            left: RiskCounts::zeros(index.n_times()),
        }
    }

    fn reset(&mut self, rows: &[usize]) {
        self.total = self.index.counts(rows);
        self.total_at_risk = self.total.at_risk();
        self.left = RiskCounts::zeros(self.index.n_times());
    }

    fn improvement(&self) -> Option<f64> {
        if self.left.n == 0.0 || self.left.n == self.total.n {
            return None;
        }
        let left_at_risk = self.left.at_risk();
        let mut numerator = 0.0;
        let mut variance = 0.0;
        for (k, &at_risk) in self.total_at_risk.iter().enumerate() {
            let deaths = self.total.deaths[k];
            if at_risk < 2.0 || deaths == 0.0 {
                continue;
            }
            let share = left_at_risk[k] / at_risk;
            numerator += self.left.deaths[k] - share * deaths;
            variance += share * (1.0 - share) * deaths * (at_risk - deaths) / (at_risk - 1.0);
        }
        if variance <= 0.0 {
            return None;
        }
        Some(numerator.abs() / variance.sqrt())
    }
}

/// Distance of Harrell's C from one half, with child membership as the predictor.
///
/// Each row's contribution is the number of comparable pairs it wins as the
/// earlier event minus the number it loses as the later row; summing the
/// contributions of the left rows gives concordant minus discordant pairs.
#[derive(Debug)]
pub(crate) struct Concordance<'d> {
    time: &'d [f64],
    event: &'d [bool],
    contribution: Vec<f64>,
    comparable: f64,
    left_sum: f64,
}

impl<'d> Concordance<'d> {
    pub(crate) fn new(time: &'d [f64], event: &'d [bool]) -> Self {
        Self {
            time,
            event,
            contribution: vec![0.0; time.len()],
            comparable: 0.0,
            left_sum: 0.0,
        }
    }

    fn reset(&mut self, rows: &[usize]) {
        let mut sorted = rows.to_vec();
        sorted.sort_by(|&a, &b| self.time[a].total_cmp(&self.time[b]));
        let n = sorted.len();
        let mut events_before = 0.0;
        let mut comparable = 0.0;
        let mut start = 0;
        while start < n {
            let t = self.time[sorted[start]];
            let mut end = start;
            while end < n && self.time[sorted[end]] == t {
                end += 1;
            }
            let later = (n - end) as f64;
            let mut group_events = 0.0;
            for &row in &sorted[start..end] {
                let wins = if self.event[row] { later } else { 0.0 };
                self.contribution[row] = wins - events_before;
                comparable += wins;
                if self.event[row] {
                    group_events += 1.0;
                }
            }
            events_before += group_events;
            start = end;
        }
        self.comparable = comparable;
        self.left_sum = 0.0;
    }

    fn improvement(&self) -> Option<f64> {
        if self.comparable == 0.0 {
            return None;
        }
        Some(self.left_sum.abs() / (2.0 * self.comparable))
    }
}
