//! CART (Classification and Regression Tree) builder
//!
//! Grows one classification tree by exact-greedy Gini splits over a random
//! subset of features at every node. Thresholds are midpoints between
//! adjacent distinct values. Nodes are emitted in pre-order.

use loan_model::{Node, Tree};
use rand::seq::index;
use rand::Rng;

use crate::deterministic::SplitTieBreaker;

/// Growth limits for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    /// `None` grows until leaves are pure or too small to split
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split, already resolved to `1..=n_features`
    pub max_features: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: usize::MAX,
        }
    }
}

/// Split candidate with weighted impurity and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    impurity: f64,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn new(feature_idx: usize, threshold: f64, impurity: f64) -> Self {
        Self {
            feature_idx,
            threshold,
            impurity,
            tie_breaker: SplitTieBreaker::new(feature_idx, threshold),
        }
    }

    fn beats(&self, other: &Self) -> bool {
        self.impurity < other.impurity
            || (self.impurity == other.impurity && self.tie_breaker < other.tie_breaker)
    }
}

/// Where a pending node attaches to its parent
#[derive(Debug, Clone, Copy)]
struct ParentSlot {
    node: usize,
    is_left: bool,
}

/// A subtree still to be grown
struct PendingNode {
    indices: Vec<usize>,
    depth: usize,
    parent: Option<ParentSlot>,
}

enum NodeOutcome {
    Leaf(u32),
    Split {
        split: SplitCandidate,
        left: Vec<usize>,
        right: Vec<usize>,
    },
}

/// Build classification trees over a fixed feature matrix
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<f64>],
    labels: &'a [u32],
    n_classes: usize,
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    /// `features` and `labels` must have the same length and every label
    /// must be below `n_classes`.
    pub fn new(features: &'a [Vec<f64>], labels: &'a [u32], n_classes: usize, config: TreeConfig) -> Self {
        debug_assert_eq!(features.len(), labels.len());

        let feature_count = features.first().map_or(0, Vec::len);

        Self {
            config,
            features,
            labels,
            n_classes,
            feature_count,
        }
    }

    /// Grow a tree on the rows at `sample` (duplicates allowed)
    ///
    /// Pending subtrees sit on an explicit stack, right child below left, so
    /// nodes come out in pre-order and the random stream is drawn in the same
    /// order a depth-first recursion would draw it. The stacked index buffers
    /// are disjoint subsets of `sample`.
    pub fn build<R: Rng>(&self, sample: &[usize], rng: &mut R) -> Tree {
        let mut nodes: Vec<Node> = Vec::new();
        let mut pending = vec![PendingNode {
            indices: sample.to_vec(),
            depth: 0,
            parent: None,
        }];

        while let Some(PendingNode { indices, depth, parent }) = pending.pop() {
            let current_idx = nodes.len() as i32;
            if let Some(slot) = parent {
                let parent_node = &mut nodes[slot.node];
                if slot.is_left {
                    parent_node.left = current_idx;
                } else {
                    parent_node.right = current_idx;
                }
            }

            match self.split_node(indices, depth, rng) {
                NodeOutcome::Leaf(class) => nodes.push(Node::leaf(current_idx, class)),
                NodeOutcome::Split { split, left, right } => {
                    // Children are patched in when they are popped
                    nodes.push(Node::internal(
                        current_idx,
                        split.feature_idx as i32,
                        split.threshold,
                        -1,
                        -1,
                    ));
                    let node = current_idx as usize;
                    pending.push(PendingNode {
                        indices: right,
                        depth: depth + 1,
                        parent: Some(ParentSlot { node, is_left: false }),
                    });
                    pending.push(PendingNode {
                        indices: left,
                        depth: depth + 1,
                        parent: Some(ParentSlot { node, is_left: true }),
                    });
                }
            }
        }

        Tree::new(nodes)
    }

    /// Decide one node; the index buffer is consumed by the partition
    fn split_node<R: Rng>(&self, indices: Vec<usize>, depth: usize, rng: &mut R) -> NodeOutcome {
        let counts = self.class_counts(&indices);
        let majority = majority_class(&counts);

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        if pure
            || self.config.max_depth.is_some_and(|max| depth >= max)
            || indices.len() < self.config.min_samples_split
            || indices.len() < 2 * self.config.min_samples_leaf
        {
            return NodeOutcome::Leaf(majority);
        }

        let Some(split) = self.find_best_split(&indices, rng) else {
            return NodeOutcome::Leaf(majority);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.features[i][split.feature_idx] <= split.threshold);

        NodeOutcome::Split { split, left, right }
    }

    /// Best split over a random feature subset
    fn find_best_split<R: Rng>(&self, indices: &[usize], rng: &mut R) -> Option<SplitCandidate> {
        if self.feature_count == 0 {
            return None;
        }
        let k = self.config.max_features.clamp(1, self.feature_count);
        let mut candidates = index::sample(rng, self.feature_count, k).into_vec();
        candidates.sort_unstable();

        let mut best: Option<SplitCandidate> = None;
        for feature_idx in candidates {
            if let Some(candidate) = self.best_split_on(indices, feature_idx) {
                if best.as_ref().map_or(true, |current| candidate.beats(current)) {
                    best = Some(candidate);
                }
            }
        }
        best
    }

    /// Sweep the sorted values of one feature, tracking class counts left of
    /// each boundary
    fn best_split_on(&self, indices: &[usize], feature_idx: usize) -> Option<SplitCandidate> {
        let mut sorted: Vec<(f64, u32)> = indices
            .iter()
            .map(|&i| (self.features[i][feature_idx], self.labels[i]))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = sorted.len();
        let total = self.class_counts(indices);
        let mut left = vec![0usize; self.n_classes];
        let min_leaf = self.config.min_samples_leaf;

        let mut best: Option<SplitCandidate> = None;
        for pos in 0..n.saturating_sub(1) {
            left[sorted[pos].1 as usize] += 1;

            let (value, next) = (sorted[pos].0, sorted[pos + 1].0);
            if value == next {
                continue;
            }

            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }

            let right: Vec<usize> = total.iter().zip(&left).map(|(t, l)| t - l).collect();
            let impurity = (n_left as f64 * gini(&left, n_left)
                + n_right as f64 * gini(&right, n_right))
                / n as f64;

            let candidate = SplitCandidate::new(feature_idx, midpoint(value, next), impurity);
            if best.as_ref().map_or(true, |current| candidate.beats(current)) {
                best = Some(candidate);
            }
        }
        best
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[self.labels[i] as usize] += 1;
        }
        counts
    }
}

/// Gini impurity of a class histogram over `n` samples
fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

/// Midpoint of `low < high`, kept strictly below `high`
fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low + (high - low) / 2.0;
    if mid < high {
        mid
    } else {
        low
    }
}

/// Most frequent class; ties go to the lowest code
pub(crate) fn majority_class(counts: &[usize]) -> u32 {
    let mut best = 0usize;
    for (class, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = class;
        }
    }
    best as u32
}
