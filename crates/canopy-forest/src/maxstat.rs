//! Maximally selected rank statistics.
//!
//! For one feature, every admissible cut point of the sorted values yields a
//! standardized linear rank statistic; the maximum over cut points is
//! compared across features through an approximate p-value.

use statrs::function::erf::erfc;

/// Best cut point of one feature.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MaxStatCut {
    pub(crate) statistic: f64,
    /// Number of sorted rows to the left of the cut.
    pub(crate) n_left: usize,
    pub(crate) threshold: f64,
    /// Left sizes of every admissible cut point, ascending.
    pub(crate) cut_sizes: Vec<usize>,
}

/// Mid-ranks (1-based, ties averaged) of `values`.
pub(crate) fn rank_scores(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let mid = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = mid;
        }
        start = end;
    }
    ranks
}

/// Maximum standardized statistic over admissible cuts.
///
/// `values` must be sorted ascending and `scores` aligned with them. A cut
/// after position `m` is admissible when it falls between distinct values and
/// leaves at least `max(minprop * n, min_node_size)` rows on each side.
pub(crate) fn max_statistic(
    values: &[f64],
    scores: &[f64],
    minprop: f64,
    min_node_size: usize,
) -> Option<MaxStatCut> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let min_side = ((nf * minprop) as usize).max(min_node_size).max(1);
    let total: f64 = scores.iter().sum();
    let mean = total / nf;
    let ss: f64 = scores.iter().map(|s| (s - mean) * (s - mean)).sum();
    if ss <= 0.0 {
        return None;
    }

    let mut best: Option<(f64, usize)> = None;
    let mut cut_sizes = Vec::new();
    let mut left_sum = 0.0;
    for m in 1..n {
        left_sum += scores[m - 1];
        if m < min_side || n - m < min_side || values[m - 1] == values[m] {
            continue;
        }
        cut_sizes.push(m);
        let mf = m as f64;
        let expected = mf * mean;
        let variance = mf * (nf - mf) / (nf * (nf - 1.0)) * ss;
        let statistic = (left_sum - expected).abs() / variance.sqrt();
        if best.is_none_or(|(s, _)| statistic > s) {
            best = Some((statistic, m));
        }
    }

    let (statistic, n_left) = best?;
    Some(MaxStatCut {
        statistic,
        n_left,
        threshold: (values[n_left - 1] + values[n_left]) / 2.0,
        cut_sizes,
    })
}

fn normal_pdf(x: f64) -> f64 {
    (-x * x / 2.0).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

fn normal_sf(x: f64) -> f64 {
    0.5 * erfc(x / std::f64::consts::SQRT_2)
}

/// Lausen & Schumacher (1992) upper bound on the p-value of statistic `b`.
pub(crate) fn p_value_lau92(b: f64, minprop: f64) -> f64 {
    if b < 1.0 {
        return 1.0;
    }
    let maxprop = 1.0 - minprop;
    let density = normal_pdf(b);
    let p = 4.0 * density / b
        + density * (b - 1.0 / b) * ((maxprop * (1.0 - minprop)) / ((1.0 - maxprop) * minprop)).ln();
    clamp_probability(p)
}

/// Lausen, Sauerbrei & Schumacher (1994) improved Bonferroni p-value of statistic `b`.
pub(crate) fn p_value_lau94(b: f64, n: usize, cut_sizes: &[usize]) -> f64 {
    let nf = n as f64;
    let mut d = 0.0;
    for pair in cut_sizes.windows(2) {
        let (m1, m2) = (pair[0] as f64, pair[1] as f64);
        let t = (1.0 - m1 * (nf - m2) / ((nf - m1) * m2)).sqrt();
        d += std::f64::consts::FRAC_1_PI
            * (-b * b / 2.0).exp()
            * (t - (b * b / 4.0 - 1.0) * t.powi(3) / 6.0);
    }
    clamp_probability(2.0 * normal_sf(b) + d)
}

/// Smaller of the two approximations.
pub(crate) fn p_value(b: f64, minprop: f64, n: usize, cut_sizes: &[usize]) -> f64 {
    p_value_lau92(b, minprop).min(p_value_lau94(b, n, cut_sizes))
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() { 1.0 } else { p.clamp(0.0, 1.0) }
}

/// Benjamini–Hochberg adjusted p-values, in input order.
pub(crate) fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let k = p_values.len();
    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));
    let mut adjusted = vec![0.0; k];
    let mut running: f64 = 1.0;
    for (pos, &i) in order.iter().enumerate().rev() {
        let candidate = p_values[i] * k as f64 / (pos + 1) as f64;
        running = running.min(candidate);
        adjusted[i] = running;
    }
    adjusted
}
