//! # Levenberg-Marquardt 最小化器
//!
//! 阻尼高斯-牛顿迭代：`(JᵀJ + λ·diag(JᵀJ)) δ = -Jᵀr`，
//! 步长被接受时 λ 减小，否则增大。新点截断到参数边界内。
//!
//! ## 依赖关系
//! - 使用 `nalgebra` 的 Cholesky 分解求解法方程

use super::{
    clamp_to_bounds, covariance, jacobian, sum_of_squares, uncertainties, Minimizer,
    MinimizerOutcome, ResidualFn,
};
use crate::error::{DiffError, Result};

use nalgebra::{DMatrix, DVector};

const LAMBDA_START: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e12;
/// χ² 相对变化收敛阈值
const FTOL: f64 = 1e-10;
/// 参数相对变化收敛阈值
const XTOL: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct LevenbergMarquardt {
    max_iterations: usize,
}

impl LevenbergMarquardt {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }
}

impl Minimizer for LevenbergMarquardt {
    fn name(&self) -> &'static str {
        "lm"
    }

    fn minimize(
        &self,
        x0: &[f64],
        bounds: &[(f64, f64)],
        residuals: &mut ResidualFn<'_>,
    ) -> Result<MinimizerOutcome> {
        let n = x0.len();
        let mut x = x0.to_vec();
        clamp_to_bounds(&mut x, bounds);

        let mut r = residuals(&x)?;
        let m = r.len();
        if m == 0 {
            return Err(DiffError::MinimizationFailed(
                "residual vector is empty".to_string(),
            ));
        }
        let mut chi2 = sum_of_squares(&r);
        if !chi2.is_finite() {
            return Err(DiffError::MinimizationFailed(
                "initial residuals are not finite".to_string(),
            ));
        }

        let mut lambda = LAMBDA_START;
        let mut iterations = 0;
        let mut converged = false;
        let mut message = format!("maximum number of iterations ({}) reached", self.max_iterations);

        'outer: while iterations < self.max_iterations {
            iterations += 1;
            let jac = jacobian(&x, &r, bounds, residuals)?;
            let normal = jac.transpose() * &jac;
            let gradient = jac.transpose() * DVector::from_column_slice(&r);

            loop {
                let mut damped = normal.clone();
                for i in 0..n {
                    damped[(i, i)] += lambda * normal[(i, i)].max(1e-12);
                }
                let step = match damped.cholesky() {
                    Some(chol) => chol.solve(&(-&gradient)),
                    None => {
                        lambda *= 10.0;
                        if lambda > LAMBDA_MAX {
                            message = "normal matrix is singular".to_string();
                            break 'outer;
                        }
                        continue;
                    }
                };

                let mut trial: Vec<f64> = x.iter().zip(step.iter()).map(|(a, d)| a + d).collect();
                clamp_to_bounds(&mut trial, bounds);
                let trial_r = residuals(&trial)?;
                let trial_chi2 = sum_of_squares(&trial_r);

                if trial_chi2.is_finite() && trial_chi2 < chi2 {
                    let x_change = trial
                        .iter()
                        .zip(&x)
                        .map(|(a, b)| (a - b).abs() / (b.abs() + XTOL))
                        .fold(0.0_f64, f64::max);
                    let f_change = (chi2 - trial_chi2) / chi2.max(f64::MIN_POSITIVE);
                    x = trial;
                    r = trial_r;
                    chi2 = trial_chi2;
                    lambda = (lambda / 10.0).max(LAMBDA_MIN);
                    if f_change < FTOL || x_change < XTOL {
                        converged = true;
                        message = "fit converged".to_string();
                        break 'outer;
                    }
                    break;
                }

                lambda *= 10.0;
                if lambda > LAMBDA_MAX {
                    converged = true;
                    message = "no further improvement of chi-square".to_string();
                    break 'outer;
                }
            }
        }

        let final_jac: DMatrix<f64> = jacobian(&x, &r, bounds, residuals)?;
        let cov = covariance(&final_jac, chi2);
        let su = uncertainties(cov.as_ref(), n);
        Ok(MinimizerOutcome {
            values: x,
            uncertainties: su,
            covariance: cov,
            iterations,
            success: converged,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_exponential_decay() {
        let t: Vec<f64> = (0..20).map(|i| i as f64 * 0.25).collect();
        let y: Vec<f64> = t.iter().map(|t| 3.0 * (-0.7 * t).exp()).collect();
        let mut f = |p: &[f64]| -> Result<Vec<f64>> {
            Ok(t.iter()
                .zip(&y)
                .map(|(t, y)| y - p[0] * (-p[1] * t).exp())
                .collect())
        };
        let lm = LevenbergMarquardt::new(200);
        let out = lm
            .minimize(&[1.0, 0.2], &[(0.0, 10.0), (0.0, 5.0)], &mut f)
            .unwrap();
        assert!(out.success, "{}", out.message);
        assert!((out.values[0] - 3.0).abs() < 1e-5);
        assert!((out.values[1] - 0.7).abs() < 1e-5);
    }

    #[test]
    fn test_respects_bounds() {
        let mut f = |p: &[f64]| -> Result<Vec<f64>> { Ok(vec![p[0] - 5.0, 0.1 * (p[0] - 5.0)]) };
        let out = LevenbergMarquardt::new(50)
            .minimize(&[0.5], &[(0.0, 2.0)], &mut f)
            .unwrap();
        assert!((out.values[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_residuals_rejected() {
        let mut f = |_: &[f64]| -> Result<Vec<f64>> { Ok(Vec::new()) };
        assert!(LevenbergMarquardt::new(5)
            .minimize(&[1.0], &[(f64::NEG_INFINITY, f64::INFINITY)], &mut f)
            .is_err());
    }
}
