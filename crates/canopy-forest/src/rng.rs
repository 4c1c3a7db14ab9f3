//! Seeded, reproducible random number streams.
//!
//! Every tree draws from its own ChaCha stream, selected from the forest seed,
//! the purpose of the draw and the tree index. Trees therefore see the same
//! randomness no matter which worker grows them or in which order.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// What a substream is used for. Each purpose occupies a disjoint range of
/// ChaCha stream ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Purpose {
    /// Bootstrap sampling and node splitting while a tree grows.
    Growth = 0,
    /// Shuffling feature columns for permutation importance.
    Permutation = 1,
    /// Row permutation behind the shadow columns of corrected impurity importance.
    Shadow = 2,
}

/// A deterministic pseudo-random stream.
#[derive(Debug, Clone)]
pub struct RandomStream {
    rng: ChaCha8Rng,
}

impl RandomStream {
    /// Create a stream from a seed.
    #[must_use]
    pub fn seed(value: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(value),
        }
    }

    /// Derive the substream for one tree.
    pub(crate) fn substream(seed: u64, purpose: Purpose, tree_index: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(((purpose as u64) << 48) | tree_index as u64);
        Self { rng }
    }

    /// Draw a value uniformly from `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    /// Draw a value uniformly from `[low, high)`.
    pub fn uniform_in(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.uniform()
    }

    /// Draw an index uniformly from `[0, n)`. `n` must be positive.
    pub fn below(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    /// Draw `k` distinct indices from `[0, n)` in draw order.
    ///
    /// `k` is clamped to `n`.
    pub fn sample_without_replacement(&mut self, n: usize, k: usize) -> Vec<usize> {
        let mut pool: Vec<usize> = (0..n).collect();
        let take = k.min(n);
        // Partial Fisher-Yates: only the first `take` positions are shuffled.
        for i in 0..take {
            let j = self.rng.gen_range(i..n);
            pool.swap(i, j);
        }
        pool.truncate(take);
        pool
    }

    /// Draw `k` distinct indices with probability proportional to `weights`.
    ///
    /// Uses exponential keys (`u^(1/w)`); zero-weight items are never drawn,
    /// so fewer than `k` indices come back when fewer have positive weight.
    pub fn weighted_sample_without_replacement(&mut self, weights: &[f64], k: usize) -> Vec<usize> {
        let mut keyed: Vec<(f64, usize)> = weights
            .iter()
            .enumerate()
            .filter(|&(_, &w)| w > 0.0)
            .map(|(i, &w)| (self.uniform().powf(1.0 / w), i))
            .collect();
        keyed.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        keyed.truncate(k);
        keyed.into_iter().map(|(_, i)| i).collect()
    }

    /// Draw a bootstrap sample of `round(n * fraction)` row indices.
    pub fn bootstrap_indices(&mut self, n: usize, fraction: f64, with_replacement: bool) -> Vec<usize> {
        let size = draw_count(n, fraction);
        if n == 0 {
            return Vec::new();
        }
        if with_replacement {
            (0..size).map(|_| self.rng.gen_range(0..n)).collect()
        } else {
            self.sample_without_replacement(n, size)
        }
    }

    /// Draw `size` row indices with probability proportional to `weights`.
    pub fn weighted_bootstrap(&mut self, weights: &[f64], size: usize, with_replacement: bool) -> Vec<usize> {
        if !with_replacement {
            return self.weighted_sample_without_replacement(weights, size);
        }
        let mut cumulative = Vec::with_capacity(weights.len());
        let mut total = 0.0;
        for &w in weights {
            total += w;
            cumulative.push(total);
        }
        if total <= 0.0 {
            return Vec::new();
        }
        (0..size)
            .map(|_| {
                let target = self.uniform() * total;
                // First row whose cumulative weight exceeds the target.
                cumulative
                    .partition_point(|&c| c <= target)
                    .min(weights.len() - 1)
            })
            .collect()
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        slice.shuffle(&mut self.rng);
    }
}

/// Number of draws for a sample fraction: `n * fraction` rounded to the nearest integer.
pub(crate) fn draw_count(n: usize, fraction: f64) -> usize {
    (n as f64 * fraction).round() as usize
}
