//! # Nelder-Mead 单纯形最小化器
//!
//! 无导数方法，适合残差对参数不光滑的情形。
//! 收敛后用最终点的数值雅可比矩阵估计协方差。

use super::{
    clamp_to_bounds, covariance, jacobian, sum_of_squares, uncertainties, Minimizer,
    MinimizerOutcome, ResidualFn,
};
use crate::error::{DiffError, Result};

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;
const FTOL: f64 = 1e-10;
const XTOL: f64 = 1e-8;

#[derive(Debug, Clone)]
pub struct NelderMead {
    max_iterations: usize,
}

impl NelderMead {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }
}

/// 单纯形顶点
struct Vertex {
    x: Vec<f64>,
    f: f64,
}

impl Minimizer for NelderMead {
    fn name(&self) -> &'static str {
        "simplex"
    }

    fn minimize(
        &self,
        x0: &[f64],
        bounds: &[(f64, f64)],
        residuals: &mut ResidualFn<'_>,
    ) -> Result<MinimizerOutcome> {
        let n = x0.len();
        if n == 0 {
            return Err(DiffError::MinimizationFailed(
                "no parameters to vary".to_string(),
            ));
        }
        let mut start = x0.to_vec();
        clamp_to_bounds(&mut start, bounds);

        let mut objective = |x: &[f64]| -> Result<f64> {
            let f = sum_of_squares(&residuals(x)?);
            Ok(if f.is_finite() { f } else { f64::INFINITY })
        };

        let f0 = objective(&start)?;
        if !f0.is_finite() {
            return Err(DiffError::MinimizationFailed(
                "initial residuals are not finite".to_string(),
            ));
        }
        let mut simplex = vec![Vertex { x: start.clone(), f: f0 }];
        for j in 0..n {
            let mut x = start.clone();
            let step = if x[j] != 0.0 { 0.05 * x[j] } else { 2.5e-4 };
            x[j] += step;
            if x[j] > bounds[j].1 {
                x[j] = start[j] - step.abs();
            }
            clamp_to_bounds(&mut x, bounds);
            let f = objective(&x)?;
            simplex.push(Vertex { x, f });
        }

        let mut iterations = 0;
        let mut converged = false;
        while iterations < self.max_iterations {
            simplex.sort_by(|a, b| a.f.total_cmp(&b.f));
            let best = simplex[0].f;
            let worst = simplex[n].f;
            let x_spread = simplex[1..]
                .iter()
                .flat_map(|v| v.x.iter().zip(&simplex[0].x).map(|(a, b)| (a - b).abs()))
                .fold(0.0_f64, f64::max);
            let x_scale = simplex[0].x.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
            if worst - best <= FTOL * (1.0 + best.abs()) && x_spread <= XTOL * x_scale {
                converged = true;
                break;
            }
            iterations += 1;

            let centroid: Vec<f64> = (0..n)
                .map(|j| simplex[..n].iter().map(|v| v.x[j]).sum::<f64>() / n as f64)
                .collect();
            let towards = |coef: f64, from: &[f64]| -> Vec<f64> {
                let mut p: Vec<f64> = centroid
                    .iter()
                    .zip(from)
                    .map(|(c, w)| c + coef * (c - w))
                    .collect();
                clamp_to_bounds(&mut p, bounds);
                p
            };

            let xr = towards(REFLECTION, &simplex[n].x);
            let fr = objective(&xr)?;
            if fr < simplex[0].f {
                let xe = towards(EXPANSION, &simplex[n].x);
                let fe = objective(&xe)?;
                simplex[n] = if fe < fr {
                    Vertex { x: xe, f: fe }
                } else {
                    Vertex { x: xr, f: fr }
                };
                continue;
            }
            if fr < simplex[n - 1].f {
                simplex[n] = Vertex { x: xr, f: fr };
                continue;
            }
            let xc = towards(-CONTRACTION, &simplex[n].x);
            let fc = objective(&xc)?;
            if fc < simplex[n].f {
                simplex[n] = Vertex { x: xc, f: fc };
                continue;
            }
            let anchor = simplex[0].x.clone();
            for v in simplex.iter_mut().skip(1) {
                for (xi, ai) in v.x.iter_mut().zip(&anchor) {
                    *xi = ai + SHRINK * (*xi - ai);
                }
                v.f = objective(&v.x)?;
            }
        }
        simplex.sort_by(|a, b| a.f.total_cmp(&b.f));
        let Vertex { x, f: chi2 } = simplex.swap_remove(0);

        let r = residuals(&x)?;
        let jac = jacobian(&x, &r, bounds, residuals)?;
        let cov = covariance(&jac, chi2);
        let su = uncertainties(cov.as_ref(), n);
        let message = if converged {
            "fit converged".to_string()
        } else {
            format!("maximum number of iterations ({}) reached", self.max_iterations)
        };
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
    fn test_fits_quadratic_bowl() {
        let mut f = |p: &[f64]| -> Result<Vec<f64>> { Ok(vec![p[0] - 1.5, 2.0 * (p[1] + 0.5)]) };
        let out = NelderMead::new(2000)
            .minimize(
                &[0.0, 0.0],
                &[(f64::NEG_INFINITY, f64::INFINITY); 2],
                &mut f,
            )
            .unwrap();
        assert!(out.success, "{}", out.message);
        assert!((out.values[0] - 1.5).abs() < 1e-4);
        assert!((out.values[1] + 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_stays_within_bounds() {
        let mut f = |p: &[f64]| -> Result<Vec<f64>> { Ok(vec![p[0] + 3.0]) };
        let out = NelderMead::new(500)
            .minimize(&[1.0], &[(0.0, 2.0)], &mut f)
            .unwrap();
        assert!(out.values[0] >= 0.0 && out.values[0] < 1e-3);
    }
}
