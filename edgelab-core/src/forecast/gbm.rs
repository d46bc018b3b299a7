//! Gradient-boosted trees on the pinball (quantile) loss.
//!
//! Each stage fits a squared-error tree to the negative pinball gradient
//! (`alpha` where the target is above the current fit, `alpha - 1` below) on
//! a row subsample, then replaces each leaf with the `alpha`-quantile of the
//! in-bag residuals falling in it. The initial fit is the `alpha`-quantile of
//! the training target.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::tree::RegressionTree;
use super::{ForecastError, Regressor};

/// GBM hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbmParams {
    /// Number of boosting stages (trees)
    pub n_estimators: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Shrinkage applied to every stage
    pub learning_rate: f64,
    /// Fraction of rows drawn (without replacement) per stage
    pub subsample: f64,
    /// Minimum rows in a leaf
    pub min_samples_leaf: usize,
    /// RNG seed for subsampling
    pub seed: u64,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            n_estimators: 400,
            max_depth: 3,
            learning_rate: 0.1,
            subsample: 0.8,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuantileGbm {
    alpha: f64,
    params: GbmParams,
    init: f64,
    trees: Vec<RegressionTree>,
    fitted: bool,
}

impl QuantileGbm {
    pub fn new(alpha: f64, params: GbmParams) -> Self {
        Self {
            alpha,
            params,
            init: 0.0,
            trees: Vec::new(),
            fitted: false,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for QuantileGbm {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ForecastError> {
        let n = x.nrows();
        if n == 0 {
            return Err(ForecastError::EmptyTrainingSet);
        }
        if y.len() != n {
            return Err(ForecastError::ShapeMismatch {
                rows: n,
                targets: y.len(),
            });
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ForecastError::InvalidQuantile(self.alpha));
        }

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let n_bag = ((n as f64 * self.params.subsample).round() as usize).clamp(1, n);

        self.init = lower_quantile(y.to_vec(), self.alpha);
        let mut fit = vec![self.init; n];
        self.trees.clear();

        for _ in 0..self.params.n_estimators {
            let mut rows = if n_bag < n {
                rand::seq::index::sample(&mut rng, n, n_bag).into_vec()
            } else {
                (0..n).collect()
            };
            rows.sort_unstable();

            let grad: Vec<f64> = (0..n)
                .map(|i| if y[i] > fit[i] { self.alpha } else { self.alpha - 1.0 })
                .collect();
            let mut tree = RegressionTree::fit(
                x,
                &grad,
                &rows,
                self.params.max_depth,
                self.params.min_samples_leaf,
            );

            let mut residuals_by_leaf: HashMap<usize, Vec<f64>> = HashMap::new();
            for &i in &rows {
                residuals_by_leaf
                    .entry(tree.leaf_of(x.row(i)))
                    .or_default()
                    .push(y[i] - fit[i]);
            }
            for (leaf, residuals) in residuals_by_leaf {
                tree.set_leaf_value(leaf, lower_quantile(residuals, self.alpha));
            }

            for (i, f) in fit.iter_mut().enumerate() {
                *f += self.params.learning_rate * tree.predict_one(x.row(i));
            }
            self.trees.push(tree);
        }

        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ForecastError> {
        if !self.fitted {
            return Err(ForecastError::NotTrained);
        }
        Ok(x
            .rows()
            .into_iter()
            .map(|row| {
                self.init
                    + self
                        .trees
                        .iter()
                        .map(|t| self.params.learning_rate * t.predict_one(row))
                        .sum::<f64>()
            })
            .collect())
    }
}

/// Smallest value with at least `alpha` of the sample at or below it.
pub fn lower_quantile(mut values: Vec<f64>, alpha: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let n = values.len();
    let k = ((alpha * n as f64).ceil() as usize).clamp(1, n) - 1;
    values[k]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn noisy_line(n: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let xs: Vec<f64> = (0..n).map(|i| i as f64 / n as f64).collect();
        let ys: Array1<f64> = xs
            .iter()
            .map(|x| 2.0 * x + rng.gen_range(-0.5..0.5))
            .collect();
        (Array2::from_shape_vec((n, 1), xs).unwrap(), ys)
    }

    fn small() -> GbmParams {
        GbmParams {
            n_estimators: 60,
            ..GbmParams::default()
        }
    }

    #[test]
    fn lower_quantile_picks_order_statistic() {
        let v = vec![5.0, 1.0, 3.0, 2.0, 4.0];
        assert_eq!(lower_quantile(v.clone(), 0.5), 3.0);
        assert_eq!(lower_quantile(v.clone(), 0.15), 1.0);
        assert_eq!(lower_quantile(v.clone(), 0.85), 5.0);
        assert_eq!(lower_quantile(v, 0.2), 1.0);
    }

    #[test]
    fn coverage_tracks_alpha_in_sample() {
        let (x, y) = noisy_line(300, 1);
        for alpha in [0.15, 0.85] {
            let mut m = QuantileGbm::new(alpha, small());
            m.fit(&x, &y).unwrap();
            let p = m.predict(&x).unwrap();
            let below = y.iter().zip(p.iter()).filter(|(t, q)| t <= q).count() as f64 / 300.0;
            assert!((below - alpha).abs() < 0.1, "alpha {alpha}: coverage {below}");
        }
    }

    #[test]
    fn same_seed_same_predictions() {
        let (x, y) = noisy_line(120, 2);
        let mut a = QuantileGbm::new(0.5, small());
        let mut b = QuantileGbm::new(0.5, small());
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
        assert_eq!(a.n_trees(), 60);
    }

    #[test]
    fn rejects_bad_inputs() {
        let (x, y) = noisy_line(10, 3);
        let mut m = QuantileGbm::new(0.5, small());
        assert!(matches!(m.predict(&x), Err(ForecastError::NotTrained)));
        assert!(matches!(
            m.fit(&x, &Array1::zeros(9)),
            Err(ForecastError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            QuantileGbm::new(1.5, small()).fit(&x, &y),
            Err(ForecastError::InvalidQuantile(_))
        ));
        assert!(matches!(
            m.fit(&Array2::zeros((0, 1)), &Array1::zeros(0)),
            Err(ForecastError::EmptyTrainingSet)
        ));
    }
}
