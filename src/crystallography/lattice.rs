//! # 晶格几何
//!
//! 晶格向量、倒格矢与 d 间距计算。
//!
//! ## 约定
//! - 行向量表示 a, b, c，a 沿 x 轴，b 在 xy 平面内
//! - 倒格矢含 2π 因子：bᵢ · aⱼ = 2π δᵢⱼ
//!
//! ## 依赖关系
//! - 被 `sample_models/sample_model.rs` 与 `analysis/calculators/` 使用
//! - 使用 `error.rs` 报告超出搜索上限的 hkl 范围

use crate::error::{DiffError, Result};

use serde::Serialize;
use std::f64::consts::PI;

/// 反射搜索格点 (2h+1)(2k+1)(2l+1) 的上限
pub const MAX_HKL_GRID: u64 = 50_000_000;

/// 晶格
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Lattice {
    /// 晶格向量矩阵 (3x3)，行向量表示 a, b, c
    pub matrix: [[f64; 3]; 3],
}

impl Lattice {
    /// 从晶格参数 (a, b, c, alpha, beta, gamma) 创建晶格
    /// 角度单位：度
    pub fn from_parameters(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        let (cos_alpha, cos_beta) = (alpha.to_radians().cos(), beta.to_radians().cos());
        let (sin_gamma, cos_gamma) = gamma.to_radians().sin_cos();

        let c1 = c * cos_beta;
        let c2 = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let c3 = (c * c - c1 * c1 - c2 * c2).max(0.0).sqrt();

        Lattice {
            matrix: [
                [a, 0.0, 0.0],
                [b * cos_gamma, b * sin_gamma, 0.0],
                [c1, c2, c3],
            ],
        }
    }

    /// 晶格参数 (a, b, c, alpha, beta, gamma)
    pub fn parameters(&self) -> (f64, f64, f64, f64, f64, f64) {
        let [a_vec, b_vec, c_vec] = self.matrix;
        let (a, b, c) = (norm(&a_vec), norm(&b_vec), norm(&c_vec));

        let alpha = (dot(&b_vec, &c_vec) / (b * c)).acos().to_degrees();
        let beta = (dot(&a_vec, &c_vec) / (a * c)).acos().to_degrees();
        let gamma = (dot(&a_vec, &b_vec) / (a * b)).acos().to_degrees();

        (a, b, c, alpha, beta, gamma)
    }

    /// 晶胞体积（Å³）
    pub fn volume(&self) -> f64 {
        let [a, b, c] = self.matrix;
        dot(&a, &cross(&b, &c)).abs()
    }

    /// 倒格矢矩阵（行向量 b1, b2, b3，含 2π 因子）
    pub fn reciprocal(&self) -> [[f64; 3]; 3] {
        let [a, b, c] = self.matrix;
        let volume = dot(&a, &cross(&b, &c));
        if volume.abs() < 1e-10 {
            return [[0.0; 3]; 3];
        }
        let factor = 2.0 * PI / volume;
        let scale = |v: [f64; 3]| [v[0] * factor, v[1] * factor, v[2] * factor];
        [scale(cross(&b, &c)), scale(cross(&c, &a)), scale(cross(&a, &b))]
    }

    /// 倒格矢 G(hkl) 的模
    pub fn g_magnitude(&self, recip: &[[f64; 3]; 3], hkl: [i32; 3]) -> f64 {
        let (h, k, l) = (hkl[0] as f64, hkl[1] as f64, hkl[2] as f64);
        let g = [
            h * recip[0][0] + k * recip[1][0] + l * recip[2][0],
            h * recip[0][1] + k * recip[1][1] + l * recip[2][1],
            h * recip[0][2] + k * recip[1][2] + l * recip[2][2],
        ];
        norm(&g)
    }

    /// d 间距（Å）
    pub fn d_spacing(&self, hkl: [i32; 3]) -> f64 {
        let g = self.g_magnitude(&self.reciprocal(), hkl);
        if g < 1e-12 {
            f64::INFINITY
        } else {
            2.0 * PI / g
        }
    }

    /// 分数坐标转笛卡尔坐标
    pub fn frac_to_cart(&self, frac: &[f64; 3]) -> [f64; 3] {
        let m = &self.matrix;
        [
            frac[0] * m[0][0] + frac[1] * m[1][0] + frac[2] * m[2][0],
            frac[0] * m[0][1] + frac[1] * m[1][1] + frac[2] * m[2][1],
            frac[0] * m[0][2] + frac[1] * m[1][2] + frac[2] * m[2][2],
        ]
    }

    /// 给定 d_min 时需要搜索的最大 |h|,|k|,|l|
    ///
    /// 搜索格点数超过 [`MAX_HKL_GRID`] 时报错。
    pub fn hkl_limits(&self, d_min: f64) -> Result<[i32; 3]> {
        if !d_min.is_finite() || d_min <= 0.0 {
            return Err(DiffError::InvalidArgument(format!(
                "d_min must be positive, got {}",
                d_min
            )));
        }
        // h = G · a / 2π，故 |h| <= |G|max · |a| / 2π = |a| / d_min
        let mut limits = [0i64; 3];
        for (limit, row) in limits.iter_mut().zip(self.matrix.iter()) {
            let bound = (norm(row) / d_min).floor();
            if !bound.is_finite() {
                return Err(DiffError::InvalidArgument(
                    "lattice vectors must be finite".to_string(),
                ));
            }
            *limit = bound.min(i32::MAX as f64 / 4.0) as i64 + 1;
        }
        let grid = limits
            .iter()
            .fold(1f64, |acc, &l| acc * (2 * l + 1) as f64);
        if grid > MAX_HKL_GRID as f64 {
            return Err(DiffError::InvalidArgument(format!(
                "reflection search of {:.3e} hkl points exceeds the limit of {}; raise d_min",
                grid, MAX_HKL_GRID
            )));
        }
        Ok([limits[0] as i32, limits[1] as i32, limits[2] as i32])
    }
}

/// 向量叉积
pub fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// 向量点积
pub fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn norm(v: &[f64; 3]) -> f64 {
    dot(v, v).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cubic_round_trip() {
        let lattice = Lattice::from_parameters(5.0, 5.0, 5.0, 90.0, 90.0, 90.0);
        let (a, b, c, alpha, beta, gamma) = lattice.parameters();
        for v in [a, b, c] {
            assert!((v - 5.0).abs() < 1e-9);
        }
        for v in [alpha, beta, gamma] {
            assert!((v - 90.0).abs() < 1e-9);
        }
        assert!((lattice.volume() - 125.0).abs() < 1e-9);
    }

    #[test]
    fn test_hexagonal_parameters() {
        let lattice = Lattice::from_parameters(3.0, 3.0, 5.0, 90.0, 90.0, 120.0);
        let (_, _, c, _, _, gamma) = lattice.parameters();
        assert!((c - 5.0).abs() < 1e-9);
        assert!((gamma - 120.0).abs() < 1e-9);
        // V = a² c sin(120°)
        let expected = 9.0 * 5.0 * (120f64).to_radians().sin();
        assert!((lattice.volume() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_d_spacing_cubic() {
        let lattice = Lattice::from_parameters(5.4, 5.4, 5.4, 90.0, 90.0, 90.0);
        assert!((lattice.d_spacing([1, 0, 0]) - 5.4).abs() < 1e-9);
        assert!((lattice.d_spacing([1, 1, 1]) - 5.4 / 3f64.sqrt()).abs() < 1e-9);
        assert!((lattice.d_spacing([2, 2, 0]) - 5.4 / 8f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_reciprocal_orthogonality() {
        let lattice = Lattice::from_parameters(4.0, 5.0, 6.0, 80.0, 95.0, 100.0);
        let recip = lattice.reciprocal();
        for (i, a) in lattice.matrix.iter().enumerate() {
            for (j, b) in recip.iter().enumerate() {
                let expected = if i == j { 2.0 * PI } else { 0.0 };
                assert!((dot(a, b) - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_hkl_limits_cover_d_min() {
        let lattice = Lattice::from_parameters(5.0, 5.0, 10.0, 90.0, 90.0, 90.0);
        let limits = lattice.hkl_limits(1.0).unwrap();
        assert!(limits[0] >= 5);
        assert!(limits[2] >= 10);
    }

    #[test]
    fn test_hkl_limits_large_cell() {
        let lattice = Lattice::from_parameters(80.0, 80.0, 80.0, 90.0, 90.0, 90.0);
        let limits = lattice.hkl_limits(1.0).unwrap();
        assert!(limits.iter().all(|&l| l >= 80));
    }

    #[test]
    fn test_hkl_limits_budget() {
        let lattice = Lattice::from_parameters(500.0, 500.0, 500.0, 90.0, 90.0, 90.0);
        assert!(lattice.hkl_limits(0.5).is_err());
        assert!(lattice.hkl_limits(0.0).is_err());
        assert!(lattice.hkl_limits(f64::NAN).is_err());
    }
}
