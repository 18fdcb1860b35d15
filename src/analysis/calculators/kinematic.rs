//! # 运动学衍射计算器
//!
//! 内置的布拉格衍射计算后端。
//!
//! ## 算法概述
//! 1. 由 d_min 确定 (hkl) 搜索范围
//! 2. 遍历 (hkl)，对晶胞内全部原子求结构因子
//!    F = Σ occ · b(s) · exp(-B s²) · exp(2πi(hx + ky + lz))，s = 1/(2d)
//! 3. 合并相同 d 的反射（等效反射的强度累加即多重度）
//! 4. 粉末：乘 Lorentz(-极化) 因子，按峰形展开到横坐标上
//!    单晶：直接返回 |F|²
//!
//! 非对称峰形按对称 TCH pseudo-Voigt 处理；全散射不支持。
//!
//! ## 依赖关系
//! - 被 `analysis/calculators/mod.rs` 使用
//! - 使用 `crystallography/scattering.rs` 获取散射幅度
//! - 使用 `experiments/peak.rs` 的峰形函数
//! - 使用 `rayon` 并行遍历 (hkl)

use crate::analysis::calculators::Calculator;
use crate::crystallography::scattering::{self, Probe};
use crate::error::{DiffError, Result};
use crate::experiments::peak::{pseudo_voigt, tch_mix};
use crate::experiments::{Experiment, ExperimentData, ExperimentType, Instrument};
use crate::sample_models::{SampleModel, UnitCellAtom};
use crate::utils::output::print_warning;

use rayon::prelude::*;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};

/// 峰形展开的截断范围（FWHM 的倍数）
const PROFILE_RANGE: f64 = 20.0;

/// 相对 d 容差，用于合并等效反射
const D_TOLERANCE: f64 = 1e-7;

static ASYMMETRY_WARNED: AtomicBool = AtomicBool::new(false);

/// 一个（合并后的）布拉格反射
#[derive(Debug, Clone)]
pub struct BraggReflection {
    /// Miller 指数（合并组中的代表）
    pub hkl: [i32; 3],
    /// d 间距（Å）
    pub d_spacing: f64,
    /// 合并的反射数
    pub multiplicity: usize,
    /// 多重度加权的 |F|²
    pub f_squared: f64,
}

/// 运动学计算器
#[derive(Debug, Default)]
pub struct KinematicCalculator;

impl KinematicCalculator {
    /// d >= d_min 的全部反射，按 d 降序
    pub fn reflections(&self, model: &SampleModel, probe: Probe, d_min: f64) -> Result<Vec<BraggReflection>> {
        if d_min <= 0.0 {
            return Err(DiffError::InvalidArgument(format!(
                "d_min must be positive, got {}",
                d_min
            )));
        }
        let lattice = model.lattice();
        let recip = lattice.reciprocal();
        let atoms = model.unit_cell_atoms();
        check_scatterers(&atoms, probe)?;
        let [hmax, kmax, lmax] = lattice.hkl_limits(d_min)?;
        let g_max = 2.0 * PI / d_min;

        let mut found: Vec<BraggReflection> = (-hmax..=hmax)
            .into_par_iter()
            .flat_map_iter(|h| {
                let mut out = Vec::new();
                for k in -kmax..=kmax {
                    for l in -lmax..=lmax {
                        if h == 0 && k == 0 && l == 0 {
                            continue;
                        }
                        let g = lattice.g_magnitude(&recip, [h, k, l]);
                        if g < 1e-10 || g > g_max {
                            continue;
                        }
                        let d = 2.0 * PI / g;
                        let f_sq = structure_factor_squared(&atoms, [h, k, l], d, probe);
                        out.push(BraggReflection {
                            hkl: [h, k, l],
                            d_spacing: d,
                            multiplicity: 1,
                            f_squared: f_sq,
                        });
                    }
                }
                out.into_iter()
            })
            .collect();

        found.sort_by(|a, b| b.d_spacing.total_cmp(&a.d_spacing));
        let merged = merge_equivalent(found);
        Ok(merged
            .into_iter()
            .filter(|r| r.f_squared > 1e-10)
            .collect())
    }

    /// 单个反射的 |F|²
    pub fn f_squared(&self, model: &SampleModel, probe: Probe, hkl: [i32; 3]) -> Result<f64> {
        let atoms = model.unit_cell_atoms();
        check_scatterers(&atoms, probe)?;
        let d = model.lattice().d_spacing(hkl);
        Ok(structure_factor_squared(&atoms, hkl, d, probe))
    }

    fn powder_pattern(&self, model: &SampleModel, experiment: &Experiment) -> Result<Vec<f64>> {
        let Some(data) = experiment.data.as_powder() else {
            return Ok(Vec::new());
        };
        let x = &data.x;
        if x.is_empty() {
            return Ok(Vec::new());
        }
        let peak = experiment.peak.as_ref().ok_or_else(|| {
            DiffError::IncompatibleExperiment("powder experiment without peak profile".to_string())
        })?;
        if peak.is_asymmetric() && !ASYMMETRY_WARNED.swap(true, Ordering::Relaxed) {
            print_warning(&format!(
                "Peak profile '{}' is evaluated as a symmetric pseudo-Voigt by the kinematic calculator",
                peak.profile_type()
            ));
        }

        let probe = experiment.expt_type().radiation_probe.probe();
        let x_min = x[0];
        let x_max = x[x.len() - 1];
        let step = if x.len() > 1 {
            (x_max - x_min) / (x.len() - 1) as f64
        } else {
            0.0
        };

        // 每个反射在横坐标上的位置、积分强度与峰宽
        let peaks: Vec<(f64, f64, f64, f64)> = match &experiment.instrument {
            Instrument::Cwl(instr) => {
                let offset = instr.twotheta_offset.value();
                let tth_max = (x_max - offset).clamp(1e-3, 179.9);
                let d_min = instr.wavelength.value() / (2.0 * (tth_max / 2.0).to_radians().sin());
                let d_min = d_min * (1.0 - 1e-3);
                self.reflections(model, probe, d_min)?
                    .into_iter()
                    .filter_map(|r| {
                        let tth = instr.two_theta_from_d(r.d_spacing)?;
                        let theta = ((tth - offset) / 2.0).to_radians();
                        let lp = lorentz_polarization(theta, probe);
                        let (fg, fl) = peak.cwl_widths(tth - offset);
                        let (fwhm, eta) = tch_mix(fg, fl);
                        Some((tth, r.f_squared * lp, fwhm.max(step), eta))
                    })
                    .collect()
            }
            Instrument::Tof(instr) => {
                let d_min = instr
                    .d_from_tof(x_min.max(1e-6))
                    .unwrap_or(0.1)
                    .max(0.1)
                    * (1.0 - 1e-3);
                self.reflections(model, probe, d_min)?
                    .into_iter()
                    .map(|r| {
                        let d = r.d_spacing;
                        let tof = instr.tof_from_d(d);
                        let (fg, fl) = peak.tof_widths(d);
                        let (fwhm, eta) = tch_mix(fg, fl);
                        (tof, r.f_squared * d.powi(4), fwhm.max(2.0 * step), eta)
                    })
                    .collect()
            }
        };

        let n = x.len();
        let pattern = peaks
            .par_iter()
            .fold(
                || vec![0.0; n],
                |mut acc, &(center, intensity, fwhm, eta)| {
                    if fwhm <= 0.0 {
                        return acc;
                    }
                    let lo = center - PROFILE_RANGE * fwhm;
                    let hi = center + PROFILE_RANGE * fwhm;
                    let start = x.partition_point(|&v| v < lo);
                    for i in start..n {
                        if x[i] > hi {
                            break;
                        }
                        acc[i] += intensity * pseudo_voigt(x[i] - center, fwhm, eta);
                    }
                    acc
                },
            )
            .reduce(
                || vec![0.0; n],
                |mut a, b| {
                    for (ai, bi) in a.iter_mut().zip(b) {
                        *ai += bi;
                    }
                    a
                },
            );
        Ok(pattern)
    }

    fn single_crystal_intensities(&self, model: &SampleModel, experiment: &Experiment) -> Result<Vec<f64>> {
        let ExperimentData::SingleCrystal(refl) = &experiment.data else {
            return Ok(Vec::new());
        };
        let probe = experiment.expt_type().radiation_probe.probe();
        let atoms = model.unit_cell_atoms();
        check_scatterers(&atoms, probe)?;
        let lattice = model.lattice();
        Ok(refl
            .items
            .par_iter()
            .map(|r| structure_factor_squared(&atoms, r.hkl, lattice.d_spacing(r.hkl), probe))
            .collect())
    }
}

impl Calculator for KinematicCalculator {
    fn name(&self) -> &'static str {
        "kinematic"
    }

    fn supports(&self, expt_type: &ExperimentType) -> bool {
        !expt_type.is_total()
    }

    fn calculate_model(&self, model: &SampleModel, experiment: &Experiment) -> Result<Vec<f64>> {
        match experiment.data {
            ExperimentData::Powder(_) => self.powder_pattern(model, experiment),
            ExperimentData::SingleCrystal(_) => self.single_crystal_intensities(model, experiment),
        }
    }
}

/// 所有原子必须有散射数据
fn check_scatterers(atoms: &[UnitCellAtom], probe: Probe) -> Result<()> {
    for atom in atoms {
        if scattering::scattering_amplitude(&atom.type_symbol, probe, 0.0).is_none() {
            return Err(DiffError::not_found("scattering factor", &atom.type_symbol));
        }
    }
    Ok(())
}

/// |F(hkl)|²
fn structure_factor_squared(atoms: &[UnitCellAtom], hkl: [i32; 3], d: f64, probe: Probe) -> f64 {
    let s = 0.5 / d;
    let s2 = s * s;
    let (mut re, mut im) = (0.0, 0.0);
    for atom in atoms {
        let b = scattering::scattering_amplitude(&atom.type_symbol, probe, s).unwrap_or(0.0);
        let dw = (-atom.b_iso * s2).exp();
        let amp = atom.occupancy * b * dw;
        // 相位 2π(hx + ky + lz)
        let phase = 2.0
            * PI
            * (hkl[0] as f64 * atom.position[0]
                + hkl[1] as f64 * atom.position[1]
                + hkl[2] as f64 * atom.position[2]);
        re += amp * phase.cos();
        im += amp * phase.sin();
    }
    re * re + im * im
}

/// Lorentz 因子；X 射线另乘非偏振光的极化因子 (1 + cos²2θ)/2
fn lorentz_polarization(theta: f64, probe: Probe) -> f64 {
    let sin_theta = theta.sin();
    let cos_theta = theta.cos();
    if sin_theta.abs() < 1e-10 || cos_theta.abs() < 1e-10 {
        return 0.0;
    }
    let lorentz = 1.0 / (sin_theta * sin_theta * cos_theta);
    match probe {
        Probe::Neutron => lorentz,
        Probe::Xray => {
            let cos_2theta = (2.0 * theta).cos();
            lorentz * (1.0 + cos_2theta * cos_2theta) / 2.0
        }
    }
}

/// 合并 d 相同的反射（输入按 d 排序）
fn merge_equivalent(sorted: Vec<BraggReflection>) -> Vec<BraggReflection> {
    let mut merged: Vec<BraggReflection> = Vec::new();
    for r in sorted {
        match merged.last_mut() {
            Some(last) if (last.d_spacing - r.d_spacing).abs() <= D_TOLERANCE * last.d_spacing => {
                last.f_squared += r.f_squared;
                last.multiplicity += 1;
                if simpler(r.hkl, last.hkl) {
                    last.hkl = r.hkl;
                }
            }
            _ => merged.push(r),
        }
    }
    merged
}

/// 优先非负、排序靠前的指数作为代表
fn simpler(a: [i32; 3], b: [i32; 3]) -> bool {
    let neg = |v: [i32; 3]| v.iter().filter(|x| **x < 0).count();
    (neg(a), std::cmp::Reverse(a)) < (neg(b), std::cmp::Reverse(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::HasParameters;
    use crate::experiments::Experiment;
    use crate::sample_models::SampleModels;

    const SI_CIF: &str = "data_si
_space_group.name_H-M_alt 'F d -3 m'
_space_group.IT_coordinate_system_code 2
_cell.length_a 5.431
loop_
_atom_site.label
_atom_site.type_symbol
_atom_site.fract_x
_atom_site.fract_y
_atom_site.fract_z
_atom_site.occupancy
_atom_site.B_iso_or_equiv
Si Si 0.125 0.125 0.125 1.0 0.5
";

    fn silicon() -> SampleModel {
        SampleModel::from_cif_str(SI_CIF).unwrap()
    }

    #[test]
    fn test_silicon_extinctions() {
        let calc = KinematicCalculator;
        let model = silicon();
        let refl = calc.reflections(&model, Probe::Xray, 1.0).unwrap();
        let first: Vec<[i32; 3]> = refl.iter().take(3).map(|r| r.hkl).collect();
        // 金刚石结构：(200) 系统消光
        assert_eq!(first, vec![[1, 1, 1], [2, 2, 0], [3, 1, 1]]);
        assert_eq!(refl[0].multiplicity, 8);
        assert!((refl[0].d_spacing - 5.431 / 3f64.sqrt()).abs() < 1e-9);
        assert!(calc.f_squared(&model, Probe::Xray, [2, 0, 0]).unwrap() < 1e-6);
    }

    #[test]
    fn test_unknown_element_is_an_error() {
        let mut model = silicon();
        model
            .atom_sites
            .get_mut("Si")
            .unwrap()
            .type_symbol
            .set_value("Xx")
            .unwrap();
        assert!(KinematicCalculator
            .reflections(&model, Probe::Neutron, 1.0)
            .is_err());
    }

    #[test]
    fn test_powder_peak_position() {
        let mut models = SampleModels::new();
        models.add(silicon());
        let x: String = (0..=400)
            .map(|i| format!("{:.2} 100 10\n", 20.0 + i as f64 * 0.05))
            .collect();
        let cif = format!(
            "data_d\n_expt_type.radiation_probe xray\n_instr.wavelength 1.5406\nloop_\n_pd_phase_block.id\n_pd_phase_block.scale\nsi 1\nloop_\n_pd_meas.2theta_scan\n_pd_meas.intensity_total\n_pd_meas.intensity_total_su\n{}",
            x
        );
        let mut expt = Experiment::from_cif_str(&cif).unwrap();
        assert!(expt.free_parameters().is_empty());
        crate::analysis::calculators::calculate_pattern(&KinematicCalculator, &models, &mut expt)
            .unwrap();
        let data = expt.data.as_powder().unwrap();
        let (imax, _) = data
            .intensity_calc
            .iter()
            .enumerate()
            .fold((0, f64::MIN), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) });
        // Si (111) 位于 2θ ≈ 28.44°
        assert!((data.x[imax] - 28.44).abs() < 0.06, "max at {}", data.x[imax]);
    }

    #[test]
    fn test_total_scattering_unsupported() {
        let expt = Experiment::from_cif_str("data_p\n_expt_type.scattering_type total\n").unwrap();
        assert!(!KinematicCalculator.supports(expt.expt_type()));
    }
}
