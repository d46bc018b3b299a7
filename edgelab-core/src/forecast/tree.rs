//! Depth-limited CART regression tree (squared-error splits).

use ndarray::{Array2, ArrayView1};

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Grow a tree on `rows` of `x` against `target`.
    ///
    /// Leaves hold the mean target of their rows until overwritten with
    /// [`RegressionTree::set_leaf_value`].
    pub fn fit(
        x: &Array2<f64>,
        target: &[f64],
        rows: &[usize],
        max_depth: usize,
        min_samples_leaf: usize,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, target, rows.to_vec(), max_depth, min_samples_leaf.max(1));
        tree
    }

    fn grow(
        &mut self,
        x: &Array2<f64>,
        target: &[f64],
        rows: Vec<usize>,
        depth_left: usize,
        min_leaf: usize,
    ) -> usize {
        let id = self.nodes.len();
        let mean = if rows.is_empty() {
            0.0
        } else {
            rows.iter().map(|&r| target[r]).sum::<f64>() / rows.len() as f64
        };
        self.nodes.push(Node::Leaf { value: mean });

        if depth_left == 0 || rows.len() < 2 * min_leaf {
            return id;
        }
        let Some((feature, threshold)) = best_split(x, target, &rows, min_leaf) else {
            return id;
        };

        let (l_rows, r_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| x[[r, feature]] <= threshold);
        let left = self.grow(x, target, l_rows, depth_left - 1, min_leaf);
        let right = self.grow(x, target, r_rows, depth_left - 1, min_leaf);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    /// Node id of the leaf a sample falls into.
    pub fn leaf_of(&self, sample: ArrayView1<f64>) -> usize {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { .. } => return id,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if sample[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn predict_one(&self, sample: ArrayView1<f64>) -> f64 {
        match self.nodes[self.leaf_of(sample)] {
            Node::Leaf { value } => value,
            Node::Split { .. } => f64::NAN,
        }
    }

    /// Overwrite the value of a leaf node; ignored for split nodes.
    pub fn set_leaf_value(&mut self, node: usize, new_value: f64) {
        if let Some(Node::Leaf { value }) = self.nodes.get_mut(node) {
            *value = new_value;
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

/// Best (feature, threshold) by squared-error reduction, if any split
/// leaves at least `min_leaf` rows on each side and improves the fit.
fn best_split(
    x: &Array2<f64>,
    target: &[f64],
    rows: &[usize],
    min_leaf: usize,
) -> Option<(usize, f64)> {
    let n = rows.len();
    let total_sum: f64 = rows.iter().map(|&r| target[r]).sum();
    let total_sq: f64 = rows.iter().map(|&r| target[r] * target[r]).sum();
    let parent_sse = total_sq - total_sum * total_sum / n as f64;

    let mut best: Option<(usize, f64, f64)> = None;
    let mut order: Vec<usize> = rows.to_vec();

    for feature in 0..x.ncols() {
        order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for i in 0..n - 1 {
            let y = target[order[i]];
            left_sum += y;
            left_sq += y * y;

            let left_n = i + 1;
            let right_n = n - left_n;
            if left_n < min_leaf || right_n < min_leaf {
                continue;
            }
            let here = x[[order[i], feature]];
            let next = x[[order[i + 1], feature]];
            if here == next {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / left_n as f64)
                + (right_sq - right_sum * right_sum / right_n as f64);
            if best.map_or(true, |(_, _, b)| sse < b) {
                best = Some((feature, here + (next - here) / 2.0, sse));
            }
        }
    }

    best.filter(|&(_, _, sse)| sse < parent_sse - 1e-12)
        .map(|(f, t, _)| (f, t))
}
