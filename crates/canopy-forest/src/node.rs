use std::fmt;

use crate::data::MAX_LEVELS;

/// Zero-based feature column index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a tree's node arena. The root is always index 0.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub(crate) const ROOT: NodeIndex = NodeIndex(0);

    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rule deciding whether a non-missing feature value goes to the left child.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SplitPredicate {
    /// Ordered split: `value < threshold` goes left.
    Threshold(f64),
    /// Unordered split: level `l` goes left iff bit `l` is set.
    ///
    /// Values that are not a level in `[0, 64)` go right.
    Categories(u64),
}

impl SplitPredicate {
    /// Whether a non-missing value is sent left.
    #[inline]
    #[must_use]
    pub fn sends_left(&self, value: f64) -> bool {
        match *self {
            SplitPredicate::Threshold(threshold) => value < threshold,
            SplitPredicate::Categories(mask) => level_bit(value).is_some_and(|bit| mask & bit != 0),
        }
    }
}

/// Bit of a level in a category mask, or `None` when the value is not a level.
#[inline]
pub(crate) fn level_bit(value: f64) -> Option<u64> {
    if value >= 0.0 && value < MAX_LEVELS as f64 && value.fract() == 0.0 {
        Some(1_u64 << (value as u32))
    } else {
        None
    }
}

/// Aggregated training targets of the rows that reached a leaf.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum LeafValue {
    /// Regression leaf.
    Mean {
        /// Mean response.
        mean: f64,
        /// Raw responses, retained only in quantile mode.
        responses: Vec<f64>,
    },
    /// Classification leaf.
    Classes {
        /// Class proportions, indexed by class, summing to 1.
        distribution: Vec<f64>,
        /// Most frequent class; ties go to the lowest index.
        majority: usize,
    },
    /// Survival leaf.
    Hazard {
        /// Nelson–Aalen cumulative hazard at each of the forest's event times.
        chf: Vec<f64>,
    },
}

/// A node in a tree's arena.
///
/// Children are referenced by [`NodeIndex`], so a tree is a flat `Vec<Node>`
/// that serializes without any pointer fix-ups.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// An interior decision node.
    Split {
        /// Feature used for the split.
        feature: FeatureIndex,
        /// Left/right rule for non-missing values.
        predicate: SplitPredicate,
        /// Side taken by rows whose feature value is missing.
        missing_goes_left: bool,
        /// Index of the left child.
        left: NodeIndex,
        /// Index of the right child.
        right: NodeIndex,
        /// Number of bootstrap rows that reached this node.
        n_samples: usize,
        /// Split-rule improvement achieved by this split (after regularization).
        improvement: f64,
        /// Chosen on the row-permuted shadow of `feature`. Prediction still
        /// reads the real feature.
        shadow: bool,
    },
    /// A terminal leaf.
    Leaf {
        /// Aggregated targets.
        value: LeafValue,
        /// Number of bootstrap rows that reached this leaf.
        n_samples: usize,
    },
}

impl Node {
    /// Return the number of bootstrap rows that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Child to follow for a row with the given feature value, or `None` at a leaf.
    #[inline]
    #[must_use]
    pub fn next(&self, value_of: impl Fn(usize) -> f64) -> Option<NodeIndex> {
        match self {
            Node::Split {
                feature,
                predicate,
                missing_goes_left,
                left,
                right,
                ..
            } => {
                let value = value_of(feature.index());
                let go_left = if value.is_nan() {
                    *missing_goes_left
                } else {
                    predicate.sends_left(value)
                };
                Some(if go_left { *left } else { *right })
            }
            Node::Leaf { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- Indices ---

    #[test]
    fn indices_roundtrip_and_display() {
        assert_eq!(FeatureIndex::new(7).index(), 7);
        assert_eq!(format!("{}", FeatureIndex::new(3)), "3");
        assert_eq!(NodeIndex::ROOT.index(), 0);
        assert!(NodeIndex::new(10) < NodeIndex::new(20));
    }

    // --- Predicates ---

    #[test]
    fn threshold_is_strict() {
        let p = SplitPredicate::Threshold(2.5);
        assert!(p.sends_left(2.4));
        assert!(!p.sends_left(2.5));
    }

    #[test]
    fn category_mask_membership() {
        let p = SplitPredicate::Categories(0b1010);
        assert!(p.sends_left(1.0));
        assert!(p.sends_left(3.0));
        assert!(!p.sends_left(0.0));
        assert!(!p.sends_left(2.0));
        assert!(!p.sends_left(64.0));
        assert!(!p.sends_left(1.5));
        assert!(!p.sends_left(-1.0));
        assert!(SplitPredicate::Categories(1 << 63).sends_left(63.0));
    }

    // --- Node ---

    fn make_split(missing_goes_left: bool) -> Node {
        Node::Split {
            feature: FeatureIndex::new(1),
            predicate: SplitPredicate::Threshold(3.5),
            missing_goes_left,
            left: NodeIndex::new(1),
            right: NodeIndex::new(2),
            n_samples: 20,
            improvement: 0.16,
            shadow: false,
        }
    }

    #[test]
    fn split_routes_values_and_missing() {
        let row = [0.0, 1.0];
        assert_eq!(make_split(false).next(|c| row[c]), Some(NodeIndex::new(1)));
        let row = [0.0, 9.0];
        assert_eq!(make_split(true).next(|c| row[c]), Some(NodeIndex::new(2)));
        let row = [0.0, f64::NAN];
        assert_eq!(make_split(true).next(|c| row[c]), Some(NodeIndex::new(1)));
        assert_eq!(make_split(false).next(|c| row[c]), Some(NodeIndex::new(2)));
    }

    #[test]
    fn leaf_has_no_next() {
        let leaf = Node::Leaf {
            value: LeafValue::Classes {
                distribution: vec![0.2, 0.8],
                majority: 1,
            },
            n_samples: 10,
        };
        assert!(leaf.is_leaf());
        assert_eq!(leaf.n_samples(), 10);
        assert_eq!(leaf.next(|_| 0.0), None);
        assert!(!make_split(true).is_leaf());
        assert_eq!(make_split(true).n_samples(), 20);
    }
}
