//! Quantile forecaster.
//!
//! One pinball-loss GBM per requested quantile plus a ridge point estimator,
//! all fit on the training slice only. Prediction returns a
//! [`ForecastDistribution`] per test row.

pub mod gbm;
pub mod ridge;
pub mod tree;

pub use gbm::{GbmParams, QuantileGbm};
pub use ridge::RidgeRegression;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::ForecastDistribution;
use crate::features::{FeatureRow, N_FEATURES};

/// Errors that can occur while fitting or predicting.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("feature rows ({rows}) and targets ({targets}) differ in length")]
    ShapeMismatch { rows: usize, targets: usize },

    #[error("quantile {0} is outside (0, 1)")]
    InvalidQuantile(f64),

    #[error("expected exactly three ascending quantiles, got {0:?}")]
    BadQuantileSet(Vec<f64>),

    #[error("normal equations are singular")]
    SingularSystem,

    #[error("model not trained")]
    NotTrained,
}

/// The seam between the forecaster and its models.
pub trait Regressor: Send + Sync {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<(), ForecastError>;
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ForecastError>;
}

/// Model hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Lower, median and upper quantile levels.
    pub quantiles: Vec<f64>,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub subsample: f64,
    pub min_samples_leaf: usize,
    pub seed: u64,
    pub ridge_alpha: f64,
    /// Sort each prediction's quantiles so they never cross.
    pub sort_quantiles: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let gbm = GbmParams::default();
        Self {
            quantiles: vec![0.15, 0.5, 0.85],
            n_estimators: gbm.n_estimators,
            max_depth: gbm.max_depth,
            learning_rate: gbm.learning_rate,
            subsample: gbm.subsample,
            min_samples_leaf: gbm.min_samples_leaf,
            seed: gbm.seed,
            ridge_alpha: 1.0,
            sort_quantiles: false,
        }
    }
}

impl ModelConfig {
    pub fn gbm_params(&self) -> GbmParams {
        GbmParams {
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            learning_rate: self.learning_rate,
            subsample: self.subsample,
            min_samples_leaf: self.min_samples_leaf,
            seed: self.seed,
        }
    }

    /// Check the quantile set: three levels, strictly inside (0, 1), ascending.
    pub fn check_quantiles(&self) -> Result<[f64; 3], ForecastError> {
        let q = &self.quantiles;
        if let Some(bad) = q.iter().find(|a| !(**a > 0.0 && **a < 1.0)) {
            return Err(ForecastError::InvalidQuantile(*bad));
        }
        match q.as_slice() {
            [lo, md, hi] if lo < md && md < hi => Ok([*lo, *md, *hi]),
            _ => Err(ForecastError::BadQuantileSet(q.clone())),
        }
    }
}

/// Fitted quantile + point models.
pub struct QuantileForecaster {
    lo: QuantileGbm,
    md: QuantileGbm,
    hi: QuantileGbm,
    point: RidgeRegression,
    sort_quantiles: bool,
}

impl QuantileForecaster {
    /// Fit all four models on `train`.
    pub fn fit(cfg: &ModelConfig, train: &[FeatureRow]) -> Result<Self, ForecastError> {
        let [a_lo, a_md, a_hi] = cfg.check_quantiles()?;
        if train.is_empty() {
            return Err(ForecastError::EmptyTrainingSet);
        }

        let x = design_matrix(train.iter().map(|r| &r.values));
        let y: Array1<f64> = train.iter().map(|r| r.forward_return).collect();

        let params = cfg.gbm_params();
        let mut lo = QuantileGbm::new(a_lo, params.clone());
        let mut md = QuantileGbm::new(a_md, params.clone());
        let mut hi = QuantileGbm::new(a_hi, params);
        let mut point = RidgeRegression::new(cfg.ridge_alpha);

        lo.fit(&x, &y)?;
        md.fit(&x, &y)?;
        hi.fit(&x, &y)?;
        point.fit(&x, &y)?;
        debug!(rows = train.len(), "fitted quantile forecaster");

        Ok(Self {
            lo,
            md,
            hi,
            point,
            sort_quantiles: cfg.sort_quantiles,
        })
    }

    /// Forecast distributions for feature vectors, in input order.
    pub fn predict<'a, I>(&self, rows: I) -> Result<Vec<ForecastDistribution>, ForecastError>
    where
        I: IntoIterator<Item = &'a [f64; N_FEATURES]>,
    {
        let x = design_matrix(rows);
        if x.nrows() == 0 {
            return Ok(Vec::new());
        }
        let lo = self.lo.predict(&x)?;
        let md = self.md.predict(&x)?;
        let hi = self.hi.predict(&x)?;
        let mu = self.point.predict(&x)?;

        Ok((0..x.nrows())
            .map(|i| {
                let mut q = [lo[i], md[i], hi[i]];
                if self.sort_quantiles {
                    q.sort_by(f64::total_cmp);
                }
                ForecastDistribution {
                    q_lo: q[0],
                    q_md: q[1],
                    q_hi: q[2],
                    mu: mu[i],
                }
            })
            .collect())
    }
}

fn design_matrix<'a, I>(rows: I) -> Array2<f64>
where
    I: IntoIterator<Item = &'a [f64; N_FEATURES]>,
{
    let flat: Vec<f64> = rows.into_iter().flat_map(|r| r.iter().copied()).collect();
    let n = flat.len() / N_FEATURES;
    Array2::from_shape_vec((n, N_FEATURES), flat).unwrap_or_else(|_| Array2::zeros((0, N_FEATURES)))
}
