//! Ridge regression with an unpenalized intercept.
//!
//! Solved in closed form on centered data:
//! `(Xc^T Xc + alpha I) beta = Xc^T yc`, `intercept = mean(y) - mean(X) . beta`,
//! using a Cholesky factorization of the (symmetric positive definite)
//! normal matrix.

use ndarray::{Array1, Array2, Axis};

use super::{ForecastError, Regressor};

#[derive(Debug, Clone)]
pub struct RidgeRegression {
    alpha: f64,
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            coefficients: None,
            intercept: 0.0,
        }
    }

    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Regressor for RidgeRegression {
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

        let x_mean = x.mean_axis(Axis(0)).ok_or(ForecastError::EmptyTrainingSet)?;
        let y_mean = y.mean().ok_or(ForecastError::EmptyTrainingSet)?;
        let xc = x - &x_mean;
        let yc = y - y_mean;

        let mut xtx = xc.t().dot(&xc);
        for i in 0..xtx.nrows() {
            xtx[[i, i]] += self.alpha;
        }
        let xty = xc.t().dot(&yc);

        let beta = cholesky_solve(&xtx, &xty)?;
        self.intercept = y_mean - x_mean.dot(&beta);
        self.coefficients = Some(beta);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ForecastError> {
        let beta = self.coefficients.as_ref().ok_or(ForecastError::NotTrained)?;
        Ok(x.dot(beta) + self.intercept)
    }
}

/// Solve `a x = b` for symmetric positive definite `a`.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, ForecastError> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return Err(ForecastError::SingularSystem);
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * z[j]).sum();
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T x = z
    let mut out = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = (i + 1..n).map(|j| l[[j, i]] * out[j]).sum();
        out[i] = (z[i] - sum) / l[[i, i]];
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn tiny_alpha_recovers_exact_line() {
        let x = array![[0.0, 1.0], [1.0, 0.0], [2.0, 1.0], [3.0, 5.0], [4.0, 2.0]];
        let y: Array1<f64> = x.rows().into_iter().map(|r| 1.5 + 2.0 * r[0] - r[1]).collect();
        let mut m = RidgeRegression::new(1e-9);
        m.fit(&x, &y).unwrap();

        let beta = m.coefficients().unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-6);
        assert!((beta[1] + 1.0).abs() < 1e-6);
        assert!((m.intercept() - 1.5).abs() < 1e-6);
    }

    #[test]
    fn penalty_shrinks_toward_mean() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 1.0, 2.0, 3.0];
        let mut loose = RidgeRegression::new(1e-9);
        let mut tight = RidgeRegression::new(100.0);
        loose.fit(&x, &y).unwrap();
        tight.fit(&x, &y).unwrap();

        let b_loose = loose.coefficients().unwrap()[0];
        let b_tight = tight.coefficients().unwrap()[0];
        assert!(b_tight < b_loose);
        // closed form: sum(xc*yc) / (sum(xc^2) + alpha) = 5 / 105
        assert!((b_tight - 5.0 / 105.0).abs() < 1e-12);
        let p = tight.predict(&array![[1.5]]).unwrap();
        assert!((p[0] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn constant_column_without_penalty_is_singular() {
        let x = array![[1.0], [1.0], [1.0]];
        let mut m = RidgeRegression::new(0.0);
        assert!(matches!(
            m.fit(&x, &array![1.0, 2.0, 3.0]),
            Err(ForecastError::SingularSystem)
        ));
    }

    #[test]
    fn predict_before_fit_errors() {
        let m = RidgeRegression::new(1.0);
        assert!(matches!(m.predict(&array![[1.0]]), Err(ForecastError::NotTrained)));
    }
}
