use std::collections::VecDeque;

use tracing::{debug, instrument};

use crate::data::{Dataset, Response};
use crate::node::{LeafValue, Node, NodeIndex};
use crate::request::GrowthParams;
use crate::rng::RandomStream;
use crate::split::{Splitter, argmax_lowest};

/// A grown decision tree.
///
/// Stored as an arena-based `Vec<Node>` rooted at index 0, together with the
/// bootstrap rows it was grown from and the rows it never saw.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) bootstrap: Vec<usize>,
    pub(crate) oob: Vec<usize>,
}

impl Tree {
    /// Borrow the node arena.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Bootstrap row indices, with multiplicity, in draw order.
    #[must_use]
    pub fn bootstrap_rows(&self) -> &[usize] {
        &self.bootstrap
    }

    /// Sorted out-of-bag row indices.
    #[must_use]
    pub fn oob_rows(&self) -> &[usize] {
        &self.oob
    }

    /// Return the total number of nodes (splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaves.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the depth of the deepest leaf. A lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut queue = VecDeque::from([(NodeIndex::ROOT, 0_usize)]);
        while let Some((index, depth)) = queue.pop_front() {
            max_depth = max_depth.max(depth);
            if let Node::Split { left, right, .. } = &self.nodes[index.index()] {
                queue.push_back((*left, depth + 1));
                queue.push_back((*right, depth + 1));
            }
        }
        max_depth
    }

    /// Walk from the root to a leaf, reading feature values through `value_of`.
    #[inline]
    pub fn leaf_index(&self, value_of: impl Fn(usize) -> f64) -> NodeIndex {
        let mut current = NodeIndex::ROOT;
        while let Some(next) = self.nodes[current.index()].next(&value_of) {
            current = next;
        }
        current
    }

    /// Leaf value reached by a row.
    pub(crate) fn leaf_value(&self, value_of: impl Fn(usize) -> f64) -> &LeafValue {
        match &self.nodes[self.leaf_index(value_of).index()] {
            Node::Leaf { value, .. } => value,
            Node::Split { .. } => unreachable!("leaf_index always ends at a leaf"),
        }
    }

    /// Sum of split improvements per feature, over splits on the real columns.
    #[must_use]
    pub fn feature_improvements(&self, n_features: usize) -> Vec<f64> {
        self.improvements(n_features, false)
    }

    /// Sum of split improvements per feature, over splits on shadow columns.
    #[must_use]
    pub fn shadow_improvements(&self, n_features: usize) -> Vec<f64> {
        self.improvements(n_features, true)
    }

    fn improvements(&self, n_features: usize, on_shadow: bool) -> Vec<f64> {
        let mut totals = vec![0.0; n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                improvement,
                shadow,
                ..
            } = node
                && *shadow == on_shadow
            {
                totals[feature.index()] += improvement;
            }
        }
        totals
    }
}

/// Grows trees over one dataset view.
#[derive(Debug)]
pub(crate) struct TreeBuilder<'d, 'a> {
    data: &'d Dataset<'a>,
    params: &'d GrowthParams,
    splitter: Splitter<'d, 'a>,
}

impl<'d, 'a> TreeBuilder<'d, 'a> {
    pub(crate) fn new(data: &'d Dataset<'a>, params: &'d GrowthParams) -> Self {
        Self {
            data,
            params,
            splitter: Splitter::new(data, params),
        }
    }

    /// Grow one tree from its bootstrap rows.
    ///
    /// Nodes are expanded breadth-first from a FIFO queue, so arena indices
    /// follow level order. Features chosen for a split are flagged in `used`
    /// (pass an empty slice when regularization is off).
    #[instrument(skip_all, fields(bootstrap = bootstrap.len()))]
    pub(crate) fn grow(
        &mut self,
        bootstrap: Vec<usize>,
        oob: Vec<usize>,
        rng: &mut RandomStream,
        used: &mut [bool],
    ) -> Tree {
        let mut nodes = vec![placeholder()];
        let mut queue = VecDeque::from([(NodeIndex::ROOT, bootstrap.clone(), 0_usize)]);

        while let Some((index, rows, depth)) = queue.pop_front() {
            let n_samples = rows.len();
            match self.splitter.find_best_split(&rows, depth, rng, used) {
                Some(split) => {
                    let left = NodeIndex::new(nodes.len());
                    let right = NodeIndex::new(nodes.len() + 1);
                    nodes.push(placeholder());
                    nodes.push(placeholder());
                    if let Some(flag) = used.get_mut(split.feature.index()) {
                        *flag = true;
                    }
                    nodes[index.index()] = Node::Split {
                        feature: split.feature,
                        predicate: split.predicate,
                        missing_goes_left: split.missing_goes_left,
                        left,
                        right,
                        n_samples,
                        improvement: split.improvement,
                        shadow: split.shadow,
                    };
                    queue.push_back((left, split.left, depth + 1));
                    queue.push_back((right, split.right, depth + 1));
                }
                None => {
                    nodes[index.index()] = Node::Leaf {
                        value: self.leaf_value(&rows),
                        n_samples,
                    };
                }
            }
        }

        debug!(n_nodes = nodes.len(), n_oob = oob.len(), "tree grown");
        Tree {
            nodes,
            bootstrap,
            oob,
        }
    }

    fn leaf_value(&self, rows: &[usize]) -> LeafValue {
        match self.data.response() {
            Response::Regression(y) => {
                let responses: Vec<f64> = rows.iter().map(|&r| y[r]).collect();
                let mean = if responses.is_empty() {
                    0.0
                } else {
                    responses.iter().sum::<f64>() / responses.len() as f64
                };
                LeafValue::Mean {
                    mean,
                    responses: if self.params.quantiles {
                        responses
                    } else {
                        Vec::new()
                    },
                }
            }
            Response::Classification { classes, .. } => {
                let n_classes = self.data.n_classes();
                let mut counts = vec![0_usize; n_classes];
                for &r in rows {
                    counts[classes[r]] += 1;
                }
                let total = rows.len().max(1) as f64;
                LeafValue::Classes {
                    distribution: counts.iter().map(|&c| c as f64 / total).collect(),
                    majority: argmax_lowest(&counts),
                }
            }
            Response::Survival { index, .. } => LeafValue::Hazard {
                chf: index.cumulative_hazard(rows),
            },
        }
    }
}

fn placeholder() -> Node {
    Node::Leaf {
        value: LeafValue::Mean {
            mean: 0.0,
            responses: Vec::new(),
        },
        n_samples: 0,
    }
}
