//! # 实验数据类别
//!
//! 粉末数据：每个点含横坐标（2θ / TOF / r）、测量强度及其不确定度、
//! 计算强度、背景、d 间距与精修状态 (`incl` / `excl`)。
//! 单晶数据：反射 (hkl) 的测量与计算强度。
//!
//! ## 依赖关系
//! - 被 `experiments/experiment.rs`、`analysis/`、`display/` 使用

use crate::core::cif::CifWriter;
use crate::core::uncertainty::{format_number, parse_number};
use crate::error::{DiffError, Result};
use crate::experiments::excluded_regions::ExcludedRegions;
use crate::parsers::{check_x_axis, CifBlock, CifLoop, MeasuredColumns, MeasuredReflection};

const TAG_POINT_ID: &str = "_pd_data.point_id";
const TAG_D_SPACING: &str = "_pd_proc.d_spacing";
const TAG_MEAS: &str = "_pd_meas.intensity_total";
const TAG_MEAS_SU: &str = "_pd_meas.intensity_total_su";
const TAG_CALC: &str = "_pd_calc.intensity_total";
const TAG_BKG: &str = "_pd_calc.intensity_bkg";
const TAG_STATUS: &str = "_pd_data.refinement_status";

const TAG_H: &str = "_refln.index_h";
const TAG_K: &str = "_refln.index_k";
const TAG_L: &str = "_refln.index_l";
const TAG_I_MEAS: &str = "_refln.intensity_meas";
const TAG_I_MEAS_SU: &str = "_refln.intensity_meas_su";
const TAG_I_CALC: &str = "_refln.intensity_calc";
const TAG_REFLN_D: &str = "_refln.d_spacing";
const TAG_STOL: &str = "_refln.sin_theta_over_lambda";

/// 粉末数据横坐标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XKind {
    TwoTheta,
    TimeOfFlight,
    R,
}

impl XKind {
    /// CIF 标签，第一个为写出时使用
    pub fn tags(&self) -> &'static [&'static str] {
        match self {
            XKind::TwoTheta => &["_pd_meas.2theta_scan", "_pd_proc.2theta_scan"],
            XKind::TimeOfFlight => &["_pd_meas.time_of_flight"],
            XKind::R => &["_pd_proc.r"],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            XKind::TwoTheta => "2θ (deg)",
            XKind::TimeOfFlight => "TOF (µs)",
            XKind::R => "r (Å)",
        }
    }
}

/// 精修状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefinementStatus {
    Included,
    Excluded,
}

impl RefinementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefinementStatus::Included => "incl",
            RefinementStatus::Excluded => "excl",
        }
    }
}

/// 粉末衍射数据
#[derive(Debug, Clone)]
pub struct PowderData {
    pub x_kind: XKind,
    pub x: Vec<f64>,
    pub intensity_meas: Vec<f64>,
    pub intensity_meas_su: Vec<f64>,
    pub intensity_calc: Vec<f64>,
    pub intensity_bkg: Vec<f64>,
    pub d_spacing: Vec<f64>,
    pub status: Vec<RefinementStatus>,
}

impl PowderData {
    pub fn new(x_kind: XKind) -> Self {
        Self {
            x_kind,
            x: Vec::new(),
            intensity_meas: Vec::new(),
            intensity_meas_su: Vec::new(),
            intensity_calc: Vec::new(),
            intensity_bkg: Vec::new(),
            d_spacing: Vec::new(),
            status: Vec::new(),
        }
    }

    /// 从测量列创建
    pub fn from_columns(x_kind: XKind, columns: MeasuredColumns) -> Self {
        let n = columns.len();
        Self {
            x_kind,
            x: columns.x,
            intensity_meas: columns.y,
            intensity_meas_su: columns.sy,
            intensity_calc: vec![0.0; n],
            intensity_bkg: vec![0.0; n],
            d_spacing: vec![0.0; n],
            status: vec![RefinementStatus::Included; n],
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// 是否有测量强度
    pub fn has_measured(&self) -> bool {
        self.intensity_meas.iter().any(|v| *v != 0.0)
    }

    /// 按排除区间重新标记精修状态
    pub fn apply_exclusions(&mut self, regions: &ExcludedRegions) {
        for (x, status) in self.x.iter().zip(self.status.iter_mut()) {
            *status = if regions.excludes(*x) {
                RefinementStatus::Excluded
            } else {
                RefinementStatus::Included
            };
        }
    }

    /// 参与拟合的点的下标
    pub fn included_indices(&self) -> Vec<usize> {
        self.status
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == RefinementStatus::Included)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn included_count(&self) -> usize {
        self.status
            .iter()
            .filter(|s| **s == RefinementStatus::Included)
            .count()
    }

    /// 写入计算结果
    pub fn set_calculated(&mut self, calc: Vec<f64>, bkg: Vec<f64>) {
        self.intensity_calc = calc;
        self.intensity_bkg = bkg;
    }

    /// 以 (测量, 计算, σ) 三元组遍历参与拟合的点
    pub fn included_triples(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.included_indices().into_iter().map(move |i| {
            (
                self.intensity_meas[i],
                self.intensity_calc[i],
                self.intensity_meas_su[i],
            )
        })
    }

    pub fn load_cif(&mut self, block: &CifBlock) -> Result<bool> {
        let Some(lp) = block.find_loop_any(self.x_kind.tags()) else {
            return Ok(false);
        };
        let x_col = self.x_kind.tags().iter().find_map(|t| lp.column(t));
        let Some(x_col) = x_col else {
            return Ok(false);
        };
        let n = lp.len();
        self.x = read_column(lp, Some(x_col), n, 0.0, &block.name)?;
        check_x_axis(&self.x).map_err(|reason| DiffError::ParseError {
            format: "CIF".to_string(),
            path: block.name.clone(),
            reason,
        })?;
        self.intensity_meas = read_column(lp, lp.column(TAG_MEAS), n, 0.0, &block.name)?;
        self.intensity_meas_su = read_column(lp, lp.column(TAG_MEAS_SU), n, 0.0, &block.name)?;
        for (su, y) in self.intensity_meas_su.iter_mut().zip(&self.intensity_meas) {
            if *su <= 0.0 {
                *su = if *y > 0.0 { y.sqrt() } else { 1.0 };
            }
        }
        self.intensity_calc = read_column(lp, lp.column(TAG_CALC), n, 0.0, &block.name)?;
        self.intensity_bkg = read_column(lp, lp.column(TAG_BKG), n, 0.0, &block.name)?;
        self.d_spacing = read_column(lp, lp.column(TAG_D_SPACING), n, 0.0, &block.name)?;
        self.status = match lp.column(TAG_STATUS) {
            Some(c) => lp
                .rows
                .iter()
                .map(|r| {
                    if r[c].eq_ignore_ascii_case("excl") {
                        RefinementStatus::Excluded
                    } else {
                        RefinementStatus::Included
                    }
                })
                .collect(),
            None => vec![RefinementStatus::Included; n],
        };
        Ok(true)
    }

    /// 写出数据循环；`max_points` 仅保留首尾各若干点
    pub fn write_cif(&self, w: &mut CifWriter, max_points: Option<usize>) {
        let tags = [
            TAG_POINT_ID,
            self.x_kind.tags()[0],
            TAG_D_SPACING,
            TAG_MEAS,
            TAG_MEAS_SU,
            TAG_CALC,
            TAG_BKG,
            TAG_STATUS,
        ];
        let rows: Vec<Vec<String>> = (0..self.len())
            .map(|i| {
                vec![
                    (i + 1).to_string(),
                    format_number(self.x[i]),
                    format_data(self.d_spacing[i]),
                    format_number(self.intensity_meas[i]),
                    format_number(self.intensity_meas_su[i]),
                    format_data(self.intensity_calc[i]),
                    format_data(self.intensity_bkg[i]),
                    self.status[i].as_str().to_string(),
                ]
            })
            .collect();
        w.loop_table(&tags, &rows, max_points);
    }
}

/// 单晶反射
#[derive(Debug, Clone, PartialEq)]
pub struct Reflection {
    pub hkl: [i32; 3],
    pub intensity_meas: f64,
    pub intensity_meas_su: f64,
    pub intensity_calc: f64,
    pub d_spacing: f64,
    pub sin_theta_over_lambda: f64,
}

/// 单晶反射列表
#[derive(Debug, Clone, Default)]
pub struct Reflections {
    pub items: Vec<Reflection>,
}

impl Reflections {
    pub fn from_measured(measured: &[MeasuredReflection]) -> Self {
        Self {
            items: measured
                .iter()
                .map(|m| Reflection {
                    hkl: m.hkl,
                    intensity_meas: m.intensity,
                    intensity_meas_su: m.sigma,
                    intensity_calc: 0.0,
                    d_spacing: 0.0,
                    sin_theta_over_lambda: 0.0,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn load_cif(&mut self, block: &CifBlock) -> Result<bool> {
        let Some(lp) = block.find_loop(TAG_H) else {
            return Ok(false);
        };
        let n = lp.len();
        let h = read_column(lp, lp.column(TAG_H), n, 0.0, &block.name)?;
        let k = read_column(lp, lp.column(TAG_K), n, 0.0, &block.name)?;
        let l = read_column(lp, lp.column(TAG_L), n, 0.0, &block.name)?;
        let meas = read_column(lp, lp.column(TAG_I_MEAS), n, 0.0, &block.name)?;
        let su = read_column(lp, lp.column(TAG_I_MEAS_SU), n, 1.0, &block.name)?;
        let calc = read_column(lp, lp.column(TAG_I_CALC), n, 0.0, &block.name)?;
        let d = read_column(lp, lp.column(TAG_REFLN_D), n, 0.0, &block.name)?;
        let stol = read_column(lp, lp.column(TAG_STOL), n, 0.0, &block.name)?;
        self.items = (0..n)
            .map(|i| Reflection {
                hkl: [h[i] as i32, k[i] as i32, l[i] as i32],
                intensity_meas: meas[i],
                intensity_meas_su: if su[i] > 0.0 { su[i] } else { 1.0 },
                intensity_calc: calc[i],
                d_spacing: d[i],
                sin_theta_over_lambda: stol[i],
            })
            .collect();
        Ok(true)
    }

    pub fn write_cif(&self, w: &mut CifWriter, max_points: Option<usize>) {
        let rows: Vec<Vec<String>> = self
            .items
            .iter()
            .map(|r| {
                vec![
                    r.hkl[0].to_string(),
                    r.hkl[1].to_string(),
                    r.hkl[2].to_string(),
                    format_data(r.d_spacing),
                    format_data(r.sin_theta_over_lambda),
                    format_data(r.intensity_meas),
                    format_data(r.intensity_meas_su),
                    format_data(r.intensity_calc),
                ]
            })
            .collect();
        w.loop_table(
            &[
                TAG_H,
                TAG_K,
                TAG_L,
                TAG_REFLN_D,
                TAG_STOL,
                TAG_I_MEAS,
                TAG_I_MEAS_SU,
                TAG_I_CALC,
            ],
            &rows,
            max_points,
        );
    }
}

/// 实验数据
#[derive(Debug, Clone)]
pub enum ExperimentData {
    Powder(PowderData),
    SingleCrystal(Reflections),
}

impl ExperimentData {
    pub fn len(&self) -> usize {
        match self {
            ExperimentData::Powder(d) => d.len(),
            ExperimentData::SingleCrystal(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_powder(&self) -> Option<&PowderData> {
        match self {
            ExperimentData::Powder(d) => Some(d),
            ExperimentData::SingleCrystal(_) => None,
        }
    }

    pub fn as_powder_mut(&mut self) -> Option<&mut PowderData> {
        match self {
            ExperimentData::Powder(d) => Some(d),
            ExperimentData::SingleCrystal(_) => None,
        }
    }

    /// 参与拟合的 (测量, 计算, σ)
    pub fn fit_triples(&self) -> Vec<(f64, f64, f64)> {
        match self {
            ExperimentData::Powder(d) => d.included_triples().collect(),
            ExperimentData::SingleCrystal(r) => r
                .items
                .iter()
                .map(|x| (x.intensity_meas, x.intensity_calc, x.intensity_meas_su))
                .collect(),
        }
    }
}

/// 计算列的写出格式：保留四位小数
fn format_data(value: f64) -> String {
    format_number((value * 1e4).round() / 1e4)
}

fn read_column(
    lp: &CifLoop,
    col: Option<usize>,
    n: usize,
    default: f64,
    block: &str,
) -> Result<Vec<f64>> {
    let Some(c) = col else {
        return Ok(vec![default; n]);
    };
    lp.rows
        .iter()
        .map(|row| {
            let raw = row[c].as_str();
            if crate::core::uncertainty::is_missing(raw) {
                return Ok(default);
            }
            parse_number(raw)
                .map(|v| v.value)
                .filter(|v| v.is_finite())
                .ok_or_else(|| DiffError::ParseError {
                    format: "CIF".to_string(),
                    path: block.to_string(),
                    reason: format!("'{}' is not a finite number", raw),
                })
        })
        .collect()
}
