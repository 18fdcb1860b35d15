//! # 最小化器模块
//!
//! 对残差向量 `r(x)` 最小化 `Σ r²`，支持参数上下界。
//!
//! ## 组成
//! - `Minimizer` trait 与 `MinimizerOutcome`
//! - `lm`：Levenberg-Marquardt（默认）
//! - `simplex`：Nelder-Mead 单纯形（无导数）
//! - `MinimizerFactory`：目录与创建
//!
//! ## 依赖关系
//! - 被 `analysis/fitting/fitter.rs` 使用
//! - 使用 `nalgebra` 求解法方程与协方差

pub mod lm;
pub mod simplex;

pub use lm::LevenbergMarquardt;
pub use simplex::NelderMead;

use crate::analysis::calculators::EngineInfo;
use crate::error::{DiffError, Result};

use nalgebra::DMatrix;

/// 残差函数：参数向量 → 残差向量
pub type ResidualFn<'a> = dyn FnMut(&[f64]) -> Result<Vec<f64>> + 'a;

/// 最小化结果
#[derive(Debug, Clone)]
pub struct MinimizerOutcome {
    pub values: Vec<f64>,
    /// 标准不确定度，协方差不可用时为 `None`
    pub uncertainties: Vec<Option<f64>>,
    pub covariance: Option<DMatrix<f64>>,
    pub iterations: usize,
    pub success: bool,
    pub message: String,
}

/// 最小化后端
pub trait Minimizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// 从 `x0` 出发最小化 `Σ r²`，`bounds` 与 `x0` 等长
    fn minimize(
        &self,
        x0: &[f64],
        bounds: &[(f64, f64)],
        residuals: &mut ResidualFn<'_>,
    ) -> Result<MinimizerOutcome>;
}

// ─────────────────────────────────────────────────────────────
// 公共数值工具
// ─────────────────────────────────────────────────────────────

/// 相对差分步长
const STEP_REL: f64 = 1e-6;

pub(crate) fn clamp_to_bounds(x: &mut [f64], bounds: &[(f64, f64)]) {
    for (v, &(lo, hi)) in x.iter_mut().zip(bounds) {
        if *v < lo {
            *v = lo;
        }
        if *v > hi {
            *v = hi;
        }
    }
}

pub(crate) fn sum_of_squares(r: &[f64]) -> f64 {
    r.iter().map(|v| v * v).sum()
}

/// 前向差分雅可比矩阵（m × n）
///
/// 步长越过上界时改为后向差分。
pub(crate) fn jacobian(
    x: &[f64],
    r0: &[f64],
    bounds: &[(f64, f64)],
    residuals: &mut ResidualFn<'_>,
) -> Result<DMatrix<f64>> {
    let m = r0.len();
    let n = x.len();
    let mut jac = DMatrix::<f64>::zeros(m, n);
    let mut probe = x.to_vec();
    for j in 0..n {
        let mut h = STEP_REL * x[j].abs().max(1e-3);
        if x[j] + h > bounds[j].1 {
            h = -h;
        }
        probe[j] = x[j] + h;
        let r = residuals(&probe)?;
        probe[j] = x[j];
        if r.len() != m {
            return Err(DiffError::MinimizationFailed(format!(
                "residual length changed from {} to {}",
                m,
                r.len()
            )));
        }
        for i in 0..m {
            jac[(i, j)] = (r[i] - r0[i]) / h;
        }
    }
    Ok(jac)
}

/// 由雅可比矩阵估计协方差 `(JᵀJ)⁻¹ · χ²/(m-n)`
pub(crate) fn covariance(jac: &DMatrix<f64>, chi2: f64) -> Option<DMatrix<f64>> {
    let (m, n) = jac.shape();
    let normal = jac.transpose() * jac;
    let inverse = normal.try_inverse()?;
    let scale = if m > n { chi2 / (m - n) as f64 } else { 1.0 };
    Some(inverse * scale)
}

pub(crate) fn uncertainties(cov: Option<&DMatrix<f64>>, n: usize) -> Vec<Option<f64>> {
    match cov {
        Some(c) => (0..n)
            .map(|i| {
                let v = c[(i, i)];
                (v.is_finite() && v >= 0.0).then(|| v.sqrt())
            })
            .collect(),
        None => vec![None; n],
    }
}

// ─────────────────────────────────────────────────────────────
// 工厂
// ─────────────────────────────────────────────────────────────

const MINIMIZERS: &[EngineInfo] = &[
    EngineInfo {
        name: "lm",
        description: "Levenberg-Marquardt least squares with numerical Jacobian",
        available: true,
    },
    EngineInfo {
        name: "simplex",
        description: "Nelder-Mead simplex, derivative-free",
        available: true,
    },
];

/// 最小化器工厂
pub struct MinimizerFactory;

impl MinimizerFactory {
    pub const DEFAULT: &'static str = "lm";
    pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

    pub fn catalogue() -> &'static [EngineInfo] {
        MINIMIZERS
    }

    pub fn available() -> Vec<&'static str> {
        MINIMIZERS.iter().map(|e| e.name).collect()
    }

    /// 校验名称并返回规范名称
    pub fn validate(name: &str) -> Result<&'static str> {
        let key = name.trim().to_ascii_lowercase();
        let canonical = match key.as_str() {
            "lm" | "leastsq" | "lmfit" | "lmfit (leastsq)" | "levenberg-marquardt" => "lm",
            "simplex" | "nelder-mead" | "nelder_mead" | "dfols" => "simplex",
            _ => {
                return Err(DiffError::UnknownEngine {
                    kind: "minimizer".to_string(),
                    name: name.to_string(),
                    available: Self::available().join(", "),
                })
            }
        };
        Ok(canonical)
    }

    pub fn create(name: &str, max_iterations: usize) -> Result<Box<dyn Minimizer>> {
        let max_iterations = max_iterations.max(1);
        match Self::validate(name)? {
            "simplex" => Ok(Box::new(NelderMead::new(max_iterations))),
            _ => Ok(Box::new(LevenbergMarquardt::new(max_iterations))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_aliases() {
        assert_eq!(MinimizerFactory::create("LM", 10).unwrap().name(), "lm");
        assert_eq!(
            MinimizerFactory::create("nelder-mead", 10).unwrap().name(),
            "simplex"
        );
        assert_eq!(
            MinimizerFactory::create("lmfit (leastsq)", 10).unwrap().name(),
            "lm"
        );
        assert!(MinimizerFactory::create("bfgs", 10).is_err());
    }

    #[test]
    fn test_clamp() {
        let mut x = vec![-1.0, 5.0, 0.5];
        clamp_to_bounds(&mut x, &[(0.0, 1.0), (0.0, 1.0), (0.0, 1.0)]);
        assert_eq!(x, vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn test_covariance_of_line_fit() {
        // y = a + b t，残差对参数的导数就是设计矩阵
        let jac = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let cov = covariance(&jac, 1.0).unwrap();
        assert!(cov[(0, 0)] > 0.0 && cov[(1, 1)] > 0.0);
        let su = uncertainties(Some(&cov), 2);
        assert!(su.iter().all(Option::is_some));
    }
}
