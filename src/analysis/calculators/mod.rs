//! # 计算器模块
//!
//! 由样品模型与实验参数计算衍射图样。
//!
//! ## 组成
//! - `Calculator` trait：单个样品模型的未缩放图样
//! - `calculate_pattern`：按关联相比例因子求和并加上背景，写回实验数据
//! - `CalculatorFactory`：后端目录与创建
//!
//! ## 依赖关系
//! - 被 `analysis/fitting/` 与 `analysis/workflow.rs` 使用
//! - 子模块: kinematic

pub mod kinematic;

pub use kinematic::KinematicCalculator;

use crate::error::{DiffError, Result};
use crate::experiments::{Experiment, ExperimentData, ExperimentType, Instrument, XKind};
use crate::sample_models::{SampleModel, SampleModels};
use crate::utils::output::print_warning;

use serde::Serialize;

/// 衍射计算后端
pub trait Calculator: Send + Sync {
    fn name(&self) -> &'static str;

    /// 是否支持该实验类型
    fn supports(&self, expt_type: &ExperimentType) -> bool;

    /// 单个样品模型的未缩放计算强度
    ///
    /// 粉末实验返回实验横坐标上的图样，单晶实验返回每个反射的强度。
    fn calculate_model(&self, model: &SampleModel, experiment: &Experiment) -> Result<Vec<f64>>;
}

/// 计算实验图样并写回实验数据
///
/// 粉末：`calc = bkg + Σ scale · model`；单晶：`calc = scale · |F|²`。
pub fn calculate_pattern(
    calculator: &dyn Calculator,
    models: &SampleModels,
    experiment: &mut Experiment,
) -> Result<()> {
    if !calculator.supports(experiment.expt_type()) {
        return Err(DiffError::UnsupportedCalculation {
            calculator: calculator.name().to_string(),
            what: experiment.expt_type().to_string(),
        });
    }

    let mut total: Option<Vec<f64>> = None;
    for phase in experiment.linked_phases.iter() {
        let Some(model) = models.get(phase.id()) else {
            print_warning(&format!(
                "Experiment '{}' links unknown sample model '{}', skipped",
                experiment.name(),
                phase.id()
            ));
            continue;
        };
        let scale = phase.scale.value();
        let pattern = calculator.calculate_model(model, experiment)?;
        match total.as_mut() {
            Some(sum) => {
                for (s, v) in sum.iter_mut().zip(&pattern) {
                    *s += scale * v;
                }
            }
            None => total = Some(pattern.iter().map(|v| scale * v).collect()),
        }
    }

    let lattice_d: Option<Vec<f64>> = match &experiment.data {
        ExperimentData::SingleCrystal(refl) => experiment
            .linked_phases
            .iter()
            .next()
            .and_then(|p| models.get(p.id()))
            .map(|m| {
                let lattice = m.lattice();
                refl.items.iter().map(|r| lattice.d_spacing(r.hkl)).collect()
            }),
        ExperimentData::Powder(_) => None,
    };

    let d_axis = powder_d_spacing(experiment);
    let background = match &experiment.data {
        ExperimentData::Powder(data) => experiment.background.calculate(&data.x),
        ExperimentData::SingleCrystal(_) => Vec::new(),
    };

    match &mut experiment.data {
        ExperimentData::Powder(data) => {
            let n = data.len();
            let model_sum = total.unwrap_or_else(|| vec![0.0; n]);
            let calc = model_sum
                .iter()
                .zip(&background)
                .map(|(m, b)| m + b)
                .collect();
            data.set_calculated(calc, background);
            if let Some(d) = d_axis {
                data.d_spacing = d;
            }
        }
        ExperimentData::SingleCrystal(refl) => {
            let intensities = total.unwrap_or_else(|| vec![0.0; refl.len()]);
            for (i, r) in refl.items.iter_mut().enumerate() {
                r.intensity_calc = intensities.get(i).copied().unwrap_or(0.0);
                if let Some(d) = lattice_d.as_ref().and_then(|d| d.get(i)) {
                    r.d_spacing = *d;
                    r.sin_theta_over_lambda = if *d > 0.0 { 0.5 / d } else { 0.0 };
                }
            }
        }
    }
    Ok(())
}

/// 粉末数据各点的 d 间距
fn powder_d_spacing(experiment: &Experiment) -> Option<Vec<f64>> {
    let data = experiment.data.as_powder()?;
    match (&experiment.instrument, data.x_kind) {
        (Instrument::Cwl(instr), XKind::TwoTheta) => {
            Some(data.x.iter().map(|&x| instr.d_from_two_theta(x)).collect())
        }
        (Instrument::Tof(instr), XKind::TimeOfFlight) => Some(
            data.x
                .iter()
                .map(|&x| instr.d_from_tof(x).unwrap_or(0.0))
                .collect(),
        ),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────
// 工厂
// ─────────────────────────────────────────────────────────────

/// 后端目录条目
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub available: bool,
}

const CALCULATORS: &[EngineInfo] = &[
    EngineInfo {
        name: "kinematic",
        description: "Built-in kinematic Bragg calculator (powder CWL/TOF, single crystal)",
        available: true,
    },
    EngineInfo {
        name: "cryspy",
        description: "CrysPy library for crystallographic calculations",
        available: false,
    },
    EngineInfo {
        name: "crysfml",
        description: "CrysFML library for crystallographic calculations",
        available: false,
    },
    EngineInfo {
        name: "pdffit",
        description: "PDFfit2 for pair distribution function calculations",
        available: false,
    },
];

/// 计算器工厂
pub struct CalculatorFactory;

impl CalculatorFactory {
    pub const DEFAULT: &'static str = "kinematic";

    pub fn catalogue() -> &'static [EngineInfo] {
        CALCULATORS
    }

    pub fn available() -> Vec<&'static str> {
        CALCULATORS
            .iter()
            .filter(|e| e.available)
            .map(|e| e.name)
            .collect()
    }

    /// 校验名称并返回规范名称
    pub fn validate(name: &str) -> Result<&'static str> {
        let info = CALCULATORS
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| DiffError::UnknownEngine {
                kind: "calculator".to_string(),
                name: name.to_string(),
                available: Self::available().join(", "),
            })?;
        if !info.available {
            return Err(DiffError::EngineUnavailable(format!(
                "calculator '{}' requires an external library that is not bundled",
                info.name
            )));
        }
        Ok(info.name)
    }

    pub fn create(name: &str) -> Result<Box<dyn Calculator>> {
        match Self::validate(name)? {
            "kinematic" => Ok(Box::new(KinematicCalculator::default())),
            other => Err(DiffError::EngineUnavailable(other.to_string())),
        }
    }

    pub fn default_calculator() -> Box<dyn Calculator> {
        Box::new(KinematicCalculator::default())
    }
}
