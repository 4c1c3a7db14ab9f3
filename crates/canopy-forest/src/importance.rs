//! Variable importance aggregation and ranking.

use crate::tree::Tree;

/// A feature with its importance and 1-based rank (1 = most important).
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFeature {
    /// Feature name.
    pub name: String,
    /// Importance value.
    pub importance: f64,
    /// 1-based rank.
    pub rank: usize,
}

/// Mean over trees of each tree's summed split improvement per feature.
///
/// With `corrected`, each feature's shadow improvement is subtracted, which
/// centers the importance of uninformative features on zero.
pub(crate) fn impurity_importance(trees: &[Tree], n_features: usize, corrected: bool) -> Vec<f64> {
    let mut totals = vec![0.0_f64; n_features];
    if trees.is_empty() {
        return totals;
    }
    for tree in trees {
        for (total, value) in totals.iter_mut().zip(tree.feature_improvements(n_features)) {
            *total += value;
        }
        if corrected {
            for (total, value) in totals.iter_mut().zip(tree.shadow_improvements(n_features)) {
                *total -= value;
            }
        }
    }
    let n_trees = trees.len() as f64;
    totals.iter_mut().for_each(|v| *v /= n_trees);
    totals
}

/// Sort features by importance, descending, and assign ranks.
///
/// Ties keep column order.
pub(crate) fn rank_features(importance: &[f64], names: &[String]) -> Vec<RankedFeature> {
    let mut features: Vec<RankedFeature> = names
        .iter()
        .zip(importance)
        .map(|(name, &importance)| RankedFeature {
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();

    features.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, feature) in features.iter_mut().enumerate() {
        feature.rank = i + 1;
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{FeatureIndex, LeafValue, Node, NodeIndex, SplitPredicate};

    fn leaf() -> Node {
        Node::Leaf {
            value: LeafValue::Mean {
                mean: 0.0,
                responses: Vec::new(),
            },
            n_samples: 1,
        }
    }

    fn stump(feature: usize, improvement: f64) -> Tree {
        split_stump(feature, improvement, false)
    }

    fn split_stump(feature: usize, improvement: f64, shadow: bool) -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature: FeatureIndex::new(feature),
                    predicate: SplitPredicate::Threshold(0.5),
                    missing_goes_left: true,
                    left: NodeIndex::new(1),
                    right: NodeIndex::new(2),
                    n_samples: 2,
                    improvement,
                    shadow,
                },
                leaf(),
                leaf(),
            ],
            bootstrap: vec![0, 1],
            oob: Vec::new(),
        }
    }

    #[test]
    fn importance_is_mean_of_tree_sums() {
        let trees = [stump(0, 4.0), stump(0, 2.0), stump(2, 3.0)];
        let importance = impurity_importance(&trees, 3, false);
        assert!((importance[0] - 2.0).abs() < 1e-12);
        assert_eq!(importance[1], 0.0);
        assert!((importance[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ranking_is_descending_and_one_based() {
        let names: Vec<String> = ["a", "b", "c"].iter().map(|s| (*s).to_string()).collect();
        let ranked = rank_features(&[0.1, 0.5, 0.1], &names);
        assert_eq!(ranked[0].name, "b");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].name, "a");
        assert_eq!(ranked[2].name, "c");
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn no_trees_gives_zeros() {
        assert_eq!(impurity_importance(&[], 2, false), vec![0.0, 0.0]);
    }

    #[test]
    fn corrected_importance_subtracts_shadow_splits() {
        let trees = [
            split_stump(0, 4.0, false),
            split_stump(0, 1.0, true),
            split_stump(1, 3.0, true),
        ];
        let plain = impurity_importance(&trees, 2, false);
        assert!((plain[0] - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(plain[1], 0.0);

        let corrected = impurity_importance(&trees, 2, true);
        assert!((corrected[0] - 1.0).abs() < 1e-12);
        assert!((corrected[1] + 1.0).abs() < 1e-12);
    }
}
