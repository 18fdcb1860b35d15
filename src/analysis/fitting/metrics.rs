//! # 可靠性因子
//!
//! 输入为 `(测量值, 计算值, 标准不确定度)` 三元组，只包含参与精修的点。
//!
//! - R  = Σ|o−c| / Σ|o|
//! - R² = sqrt(Σ(o−c)² / Σo²)
//! - wR = sqrt(Σw(o−c)² / Σw·o²)，w = 1/σ²
//! - Rb = Σ|o−c| / Σo
//! - χ²ᵣ = Σ((o−c)/σ)² / (n − p)，自由度不大于 0 时为 NaN

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ReliabilityFactors {
    pub r_factor: f64,
    pub r_factor_squared: f64,
    pub weighted_r_factor: f64,
    pub bragg_r_factor: f64,
    pub reduced_chi_square: f64,
    pub points: usize,
}

/// 零分母返回 NaN
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        f64::NAN
    } else {
        num / den
    }
}

pub fn reduced_chi_square(chi2: f64, points: usize, n_params: usize) -> f64 {
    if points > n_params {
        chi2 / (points - n_params) as f64
    } else {
        f64::NAN
    }
}

pub fn reliability_factors(triples: &[(f64, f64, f64)], n_params: usize) -> ReliabilityFactors {
    let mut abs_diff = 0.0;
    let mut abs_obs = 0.0;
    let mut sum_obs = 0.0;
    let mut sq_diff = 0.0;
    let mut sq_obs = 0.0;
    let mut w_sq_diff = 0.0;
    let mut w_sq_obs = 0.0;
    let mut chi2 = 0.0;

    for &(obs, calc, su) in triples {
        let diff = obs - calc;
        let su = if su > 0.0 { su } else { 1.0 };
        let w = 1.0 / (su * su);
        abs_diff += diff.abs();
        abs_obs += obs.abs();
        sum_obs += obs;
        sq_diff += diff * diff;
        sq_obs += obs * obs;
        w_sq_diff += w * diff * diff;
        w_sq_obs += w * obs * obs;
        chi2 += (diff / su).powi(2);
    }

    ReliabilityFactors {
        r_factor: ratio(abs_diff, abs_obs),
        r_factor_squared: ratio(sq_diff, sq_obs).sqrt(),
        weighted_r_factor: ratio(w_sq_diff, w_sq_obs).sqrt(),
        bragg_r_factor: ratio(abs_diff, sum_obs),
        reduced_chi_square: reduced_chi_square(chi2, triples.len(), n_params),
        points: triples.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_agreement() {
        let t = vec![(10.0, 10.0, 1.0), (20.0, 20.0, 2.0), (5.0, 5.0, 1.0)];
        let rf = reliability_factors(&t, 1);
        assert_eq!(rf.r_factor, 0.0);
        assert_eq!(rf.weighted_r_factor, 0.0);
        assert_eq!(rf.reduced_chi_square, 0.0);
    }

    #[test]
    fn test_known_values() {
        let t = vec![(10.0, 9.0, 1.0), (20.0, 22.0, 1.0)];
        let rf = reliability_factors(&t, 0);
        assert!((rf.r_factor - 0.1).abs() < 1e-12);
        assert!((rf.reduced_chi_square - 2.5).abs() < 1e-12);
        assert!((rf.r_factor_squared - (5.0_f64 / 500.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_no_degrees_of_freedom() {
        let rf = reliability_factors(&[(1.0, 0.0, 1.0)], 1);
        assert!(rf.reduced_chi_square.is_nan());
    }
}
