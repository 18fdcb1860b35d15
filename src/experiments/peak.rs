//! # 峰形类别
//!
//! 峰形类型决定参数族：
//! - 恒定波长：Caglioti 高斯展宽 U/V/W、洛伦兹展宽 X/Y，
//!   经验不对称 (split pseudo-Voigt) 或 FCJ 不对称 (TCH)
//! - 飞行时间：σ₀/σ₁/σ₂、γ₀/γ₁/γ₂、β₀/β₁，Ikeda-Carpenter / back-to-back 的 α₀/α₁
//! - 全散射：Q 阻尼、Q 展宽、截断、锐化参数、粒径阻尼
//!
//! 同时提供运动学计算器所需的峰形函数。
//!
//! ## 依赖关系
//! - 被 `experiments/experiment.rs` 与 `analysis/calculators/kinematic.rs` 使用

use crate::core::cif::{format_value, CifWriter};
use crate::core::Parameter;
use crate::error::{DiffError, Result};
use crate::experiments::enums::{BeamMode, PeakProfileType, ScatteringType};
use crate::parsers::CifBlock;

use std::f64::consts::{LN_2, PI};

pub const CATEGORY: &str = "peak";
const TAG_PROFILE_TYPE: &str = "_peak.profile_type";

/// 参数定义：名称、CIF 标签、默认值、单位、说明
struct ParamDef(&'static str, &'static str, f64, &'static str, &'static str);

const CWL_BROADENING: &[ParamDef] = &[
    ParamDef("broad_gauss_u", "_peak.broad_gauss_u", 0.01, "deg²", "Gaussian broadening U"),
    ParamDef("broad_gauss_v", "_peak.broad_gauss_v", -0.01, "deg²", "Gaussian broadening V"),
    ParamDef("broad_gauss_w", "_peak.broad_gauss_w", 0.02, "deg²", "Gaussian broadening W"),
    ParamDef("broad_lorentz_x", "_peak.broad_lorentz_x", 0.0, "deg", "Lorentzian broadening X"),
    ParamDef("broad_lorentz_y", "_peak.broad_lorentz_y", 0.0, "deg", "Lorentzian broadening Y"),
];

const EMPIRICAL_ASYMMETRY: &[ParamDef] = &[
    ParamDef("asym_empir_1", "_peak.asym_empir_1", 0.1, "", "Empirical asymmetry p1"),
    ParamDef("asym_empir_2", "_peak.asym_empir_2", 0.2, "", "Empirical asymmetry p2"),
    ParamDef("asym_empir_3", "_peak.asym_empir_3", 0.3, "", "Empirical asymmetry p3"),
    ParamDef("asym_empir_4", "_peak.asym_empir_4", 0.4, "", "Empirical asymmetry p4"),
];

const FCJ_ASYMMETRY: &[ParamDef] = &[
    ParamDef("asym_fcj_1", "_peak.asym_fcj_1", 0.01, "", "FCJ asymmetry S/L"),
    ParamDef("asym_fcj_2", "_peak.asym_fcj_2", 0.02, "", "FCJ asymmetry H/L"),
];

const TOF_BROADENING: &[ParamDef] = &[
    ParamDef("gauss_sigma_0", "_peak.gauss_sigma_0", 0.0, "µs²", "Gaussian variance term 0"),
    ParamDef("gauss_sigma_1", "_peak.gauss_sigma_1", 0.0, "µs/Å", "Gaussian variance term 1"),
    ParamDef("gauss_sigma_2", "_peak.gauss_sigma_2", 0.0, "µs²/Å²", "Gaussian variance term 2"),
    ParamDef("lorentz_gamma_0", "_peak.lorentz_gamma_0", 0.0, "µs", "Lorentzian width term 0"),
    ParamDef("lorentz_gamma_1", "_peak.lorentz_gamma_1", 0.0, "µs/Å", "Lorentzian width term 1"),
    ParamDef("lorentz_gamma_2", "_peak.lorentz_gamma_2", 0.0, "µs²/Å²", "Lorentzian width term 2"),
    ParamDef("mix_beta_0", "_peak.mix_beta_0", 0.0, "deg", "Mixing coefficient β0"),
    ParamDef("mix_beta_1", "_peak.mix_beta_1", 0.0, "deg", "Mixing coefficient β1"),
];

const TOF_ASYMMETRY: &[ParamDef] = &[
    ParamDef("asym_alpha_0", "_peak.asym_alpha_0", 0.01, "", "Rise-time coefficient α0"),
    ParamDef("asym_alpha_1", "_peak.asym_alpha_1", 0.02, "", "Rise-time coefficient α1"),
];

const TOTAL_BROADENING: &[ParamDef] = &[
    ParamDef("damp_q", "_peak.damp_q", 0.05, "Å⁻¹", "Instrumental Q-resolution damping"),
    ParamDef("broad_q", "_peak.broad_q", 0.0, "Å⁻²", "Quadratic peak broadening"),
    ParamDef("cutoff_q", "_peak.cutoff_q", 25.0, "Å⁻¹", "Q cutoff of the Fourier transform"),
    ParamDef("sharp_delta_1", "_peak.sharp_delta_1", 0.0, "Å", "Linear peak sharpening"),
    ParamDef("sharp_delta_2", "_peak.sharp_delta_2", 0.0, "Å²", "Quadratic peak sharpening"),
    ParamDef("damp_particle_diameter", "_peak.damp_particle_diameter", 0.0, "Å", "Particle diameter damping"),
];

fn families(profile: PeakProfileType) -> &'static [&'static [ParamDef]] {
    match profile {
        PeakProfileType::PseudoVoigt => &[CWL_BROADENING],
        PeakProfileType::SplitPseudoVoigt => &[CWL_BROADENING, EMPIRICAL_ASYMMETRY],
        PeakProfileType::ThompsonCoxHastings => &[CWL_BROADENING, FCJ_ASYMMETRY],
        PeakProfileType::PseudoVoigtIkedaCarpenter | PeakProfileType::PseudoVoigtBackToBack => {
            &[TOF_BROADENING, TOF_ASYMMETRY]
        }
        PeakProfileType::GaussianDampedSinc => &[TOTAL_BROADENING],
    }
}

/// 峰形
#[derive(Debug, Clone)]
pub struct Peak {
    profile_type: PeakProfileType,
    scattering_type: ScatteringType,
    beam_mode: BeamMode,
    params: Vec<Parameter>,
}

impl Peak {
    /// 给定实验条件的默认峰形
    pub fn new(scattering_type: ScatteringType, beam_mode: BeamMode) -> Self {
        let profile_type = PeakProfileType::default_for(scattering_type, beam_mode);
        Self {
            profile_type,
            scattering_type,
            beam_mode,
            params: build_params(profile_type, beam_mode),
        }
    }

    pub fn profile_type(&self) -> PeakProfileType {
        self.profile_type
    }

    /// 切换峰形类型；同名参数保留当前值
    pub fn set_profile_type(&mut self, profile_type: PeakProfileType) -> Result<()> {
        let allowed = PeakProfileType::allowed_for(self.scattering_type, self.beam_mode);
        if !allowed.contains(&profile_type) {
            return Err(DiffError::InvalidChoice {
                name: "peak_profile_type".to_string(),
                value: profile_type.to_string(),
                allowed: allowed
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        let mut params = build_params(profile_type, self.beam_mode);
        for new in params.iter_mut() {
            if let Some(old) = self.params.iter().find(|p| p.name() == new.name()) {
                *new = old.clone();
            }
        }
        self.profile_type = profile_type;
        self.params = params;
        Ok(())
    }

    /// 参数当前值，不存在时为 0
    pub fn value(&self, name: &str) -> f64 {
        self.params
            .iter()
            .find(|p| p.name() == name)
            .map(Parameter::value)
            .unwrap_or(0.0)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.iter_mut().find(|p| p.name() == name)
    }

    pub fn parameters(&self) -> Vec<&Parameter> {
        self.params.iter().collect()
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        self.params.iter_mut().collect()
    }

    /// 非对称峰形在运动学计算器中按对称处理
    pub fn is_asymmetric(&self) -> bool {
        !matches!(
            self.profile_type,
            PeakProfileType::PseudoVoigt | PeakProfileType::GaussianDampedSinc
        )
    }

    // ─────────────────────────────────────────────────────────────
    // 峰宽
    // ─────────────────────────────────────────────────────────────

    /// 恒定波长峰宽 (deg)：返回 (高斯 FWHM, 洛伦兹 FWHM)
    ///
    /// H_G² = U tan²θ + V tanθ + W，H_L = X tanθ + Y / cosθ
    pub fn cwl_widths(&self, two_theta: f64) -> (f64, f64) {
        let theta = (two_theta / 2.0).to_radians();
        let tan = theta.tan();
        let h_g2 = self.value("broad_gauss_u") * tan * tan
            + self.value("broad_gauss_v") * tan
            + self.value("broad_gauss_w");
        let h_l = self.value("broad_lorentz_x") * tan + self.value("broad_lorentz_y") / theta.cos();
        (h_g2.max(0.0).sqrt(), h_l.max(0.0))
    }

    /// 飞行时间峰宽 (µs)：返回 (高斯 FWHM, 洛伦兹 FWHM)
    ///
    /// σ² = σ₀ + σ₁ d² + σ₂ d⁴，γ = γ₀ + γ₁ d + γ₂ d²
    pub fn tof_widths(&self, d: f64) -> (f64, f64) {
        let d2 = d * d;
        let sigma2 = self.value("gauss_sigma_0")
            + self.value("gauss_sigma_1") * d2
            + self.value("gauss_sigma_2") * d2 * d2;
        let gamma = self.value("lorentz_gamma_0")
            + self.value("lorentz_gamma_1") * d
            + self.value("lorentz_gamma_2") * d2;
        ((8.0 * LN_2 * sigma2.max(0.0)).sqrt(), gamma.max(0.0))
    }

    // ─────────────────────────────────────────────────────────────
    // CIF
    // ─────────────────────────────────────────────────────────────

    pub fn load_cif(&mut self, block: &CifBlock) -> Result<()> {
        if let Some(raw) = block.find_value(TAG_PROFILE_TYPE) {
            self.set_profile_type(raw.parse()?)?;
        }
        for param in self.params.iter_mut() {
            if let Some(raw) = block.find_any(param.cif_names()) {
                param.load_cif(raw)?;
            }
        }
        Ok(())
    }

    pub fn write_cif(&self, w: &mut CifWriter) {
        w.item(TAG_PROFILE_TYPE, &format_value(self.profile_type.as_str()));
        for p in &self.params {
            w.parameter(p);
        }
    }

    pub(crate) fn bind(&mut self, datablock: &str) {
        for p in self.params.iter_mut() {
            p.bind(datablock);
        }
    }
}

fn build_params(profile_type: PeakProfileType, beam_mode: BeamMode) -> Vec<Parameter> {
    // 飞行时间下的 pseudo-Voigt 只带展宽参数
    let defs: &[&[ParamDef]] =
        if profile_type == PeakProfileType::PseudoVoigt && beam_mode == BeamMode::TimeOfFlight {
            &[TOF_BROADENING]
        } else {
            families(profile_type)
        };
    defs.iter()
        .flat_map(|f| f.iter())
        .map(|def| {
            Parameter::new(def.0, def.2)
                .cif(def.1)
                .with_units(def.3)
                .with_description(def.4)
                .category(CATEGORY)
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────
// 峰形函数
// ─────────────────────────────────────────────────────────────

/// Thompson-Cox-Hastings 组合：返回 (总 FWHM, 洛伦兹分数 η)
pub fn tch_mix(fwhm_g: f64, fwhm_l: f64) -> (f64, f64) {
    let g = fwhm_g;
    let l = fwhm_l;
    let fwhm = (g.powi(5)
        + 2.69269 * g.powi(4) * l
        + 2.42843 * g.powi(3) * l.powi(2)
        + 4.47163 * g.powi(2) * l.powi(3)
        + 0.07842 * g * l.powi(4)
        + l.powi(5))
    .powf(0.2);
    if fwhm <= 0.0 {
        return (0.0, 0.0);
    }
    let ratio = l / fwhm;
    let eta = 1.36603 * ratio - 0.47719 * ratio.powi(2) + 0.11116 * ratio.powi(3);
    (fwhm, eta.clamp(0.0, 1.0))
}

/// 面积归一化的 pseudo-Voigt
pub fn pseudo_voigt(dx: f64, fwhm: f64, eta: f64) -> f64 {
    if fwhm <= 0.0 {
        return 0.0;
    }
    let hw = fwhm / 2.0;
    let gauss = (LN_2 / PI).sqrt() / hw * (-LN_2 * (dx / hw).powi(2)).exp();
    let lorentz = 1.0 / (PI * hw * (1.0 + (dx / hw).powi(2)));
    eta * lorentz + (1.0 - eta) * gauss
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cwl_parameters() {
        let peak = Peak::new(ScatteringType::Bragg, BeamMode::ConstantWavelength);
        assert_eq!(peak.profile_type(), PeakProfileType::PseudoVoigt);
        assert_eq!(peak.value("broad_gauss_v"), -0.01);
        assert_eq!(peak.parameters().len(), 5);
    }

    #[test]
    fn test_switch_profile_keeps_shared_values() {
        let mut peak = Peak::new(ScatteringType::Bragg, BeamMode::ConstantWavelength);
        peak.get_mut("broad_gauss_u").unwrap().set_value(0.2).unwrap();
        peak.set_profile_type(PeakProfileType::SplitPseudoVoigt).unwrap();
        assert_eq!(peak.value("broad_gauss_u"), 0.2);
        assert_eq!(peak.value("asym_empir_4"), 0.4);
        assert!(peak
            .set_profile_type(PeakProfileType::PseudoVoigtBackToBack)
            .is_err());
    }

    #[test]
    fn test_tof_pseudo_voigt_has_no_asymmetry() {
        let mut peak = Peak::new(ScatteringType::Bragg, BeamMode::TimeOfFlight);
        assert!(peak.get_mut("asym_alpha_0").is_some());
        peak.set_profile_type(PeakProfileType::PseudoVoigt).unwrap();
        assert!(peak.get_mut("asym_alpha_0").is_none());
    }

    #[test]
    fn test_pseudo_voigt_is_normalised() {
        let (fwhm, eta) = tch_mix(0.1, 0.05);
        let step = 0.0005;
        let area: f64 = (-4000..=4000)
            .map(|i| pseudo_voigt(i as f64 * step, fwhm, eta) * step)
            .sum();
        // 洛伦兹尾部在 ±2° 外仍有少量面积
        assert!((area - 1.0).abs() < 0.02, "area = {}", area);
    }

    #[test]
    fn test_tch_limits() {
        let (fwhm, eta) = tch_mix(0.2, 0.0);
        assert!((fwhm - 0.2).abs() < 1e-12);
        assert_eq!(eta, 0.0);
        let (fwhm, eta) = tch_mix(0.0, 0.3);
        assert!((fwhm - 0.3).abs() < 1e-12);
        assert!((eta - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_cwl_widths() {
        let peak = Peak::new(ScatteringType::Bragg, BeamMode::ConstantWavelength);
        let (g, l) = peak.cwl_widths(0.0);
        assert!((g - 0.02f64.sqrt()).abs() < 1e-12);
        assert_eq!(l, 0.0);
    }
}
