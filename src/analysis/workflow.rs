//! # 分析设置与流程
//!
//! 保存当前计算器、最小化器、拟合模式、联合拟合权重与用户约束，
//! 并驱动图样计算与拟合。设置持久化在项目的 `analysis.cif` 中：
//!
//! ```text
//! data_analysis
//! _analysis.calculator_engine kinematic
//! _analysis.fitting_engine lm
//! _analysis.fit_mode joint
//! loop_
//! _joint_fit_experiment.id
//! _joint_fit_experiment.weight
//! npd 0.5
//! xrd 0.5
//! ```
//!
//! ## 依赖关系
//! - 被 `project/manager.rs` 与 `commands/` 使用
//! - 使用 `rayon` 并行计算多个实验

use crate::analysis::calculators::{calculate_pattern, CalculatorFactory};
use crate::analysis::constraints::Constraints;
use crate::analysis::fitting::{FitResults, FitTarget, Fitter};
use crate::analysis::minimizers::MinimizerFactory;
use crate::core::cif::{format_value, CifWriter};
use crate::core::uncertainty::{format_number, parse_number};
use crate::core::{HasParameters, Parameter};
use crate::error::{DiffError, Result};
use crate::experiments::{Experiment, Experiments};
use crate::parsers::{parse_cif_content, CifBlock};
use crate::sample_models::SampleModels;
use crate::utils::output::{print_info, print_skip, print_warning};

use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// 联合拟合默认权重
pub const DEFAULT_JOINT_WEIGHT: f64 = 0.5;

/// 拟合模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Fit each experiment on its own, one after another
    #[default]
    Single,
    /// Fit all experiments together with per-experiment weights
    Joint,
}

impl FitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitMode::Single => "single",
            FitMode::Joint => "joint",
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitMode {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(FitMode::Single),
            "joint" => Ok(FitMode::Joint),
            _ => Err(DiffError::InvalidChoice {
                name: "fit_mode".to_string(),
                value: s.to_string(),
                allowed: "single, joint".to_string(),
            }),
        }
    }
}

/// 分析设置
#[derive(Debug, Clone)]
pub struct Analysis {
    calculator: &'static str,
    minimizer: &'static str,
    pub fit_mode: FitMode,
    joint_weights: Vec<(String, f64)>,
    pub max_iterations: usize,
    pub constraints: Constraints,
}

impl Default for Analysis {
    fn default() -> Self {
        Self::new()
    }
}

impl Analysis {
    pub fn new() -> Self {
        Self {
            calculator: CalculatorFactory::DEFAULT,
            minimizer: MinimizerFactory::DEFAULT,
            fit_mode: FitMode::Single,
            joint_weights: Vec::new(),
            max_iterations: MinimizerFactory::DEFAULT_MAX_ITERATIONS,
            constraints: Constraints::new(),
        }
    }

    pub fn calculator(&self) -> &'static str {
        self.calculator
    }

    pub fn set_calculator(&mut self, name: &str) -> Result<()> {
        self.calculator = CalculatorFactory::validate(name)?;
        Ok(())
    }

    pub fn minimizer(&self) -> &'static str {
        self.minimizer
    }

    pub fn set_minimizer(&mut self, name: &str) -> Result<()> {
        self.minimizer = MinimizerFactory::validate(name)?;
        Ok(())
    }

    /// 设置联合拟合权重（非负有限值）
    pub fn set_joint_weight(&mut self, id: &str, weight: f64) -> Result<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(DiffError::InvalidArgument(format!(
                "weight of experiment '{}' must be a non-negative number, got {}",
                id, weight
            )));
        }
        match self.joint_weights.iter_mut().find(|(e, _)| e == id) {
            Some(entry) => entry.1 = weight,
            None => self.joint_weights.push((id.to_string(), weight)),
        }
        Ok(())
    }

    pub fn joint_weight(&self, id: &str) -> f64 {
        self.joint_weights
            .iter()
            .find(|(e, _)| e == id)
            .map(|(_, w)| *w)
            .unwrap_or(DEFAULT_JOINT_WEIGHT)
    }

    pub fn joint_weights(&self) -> &[(String, f64)] {
        &self.joint_weights
    }

    /// 联合拟合目标：权重归一化使其总和等于实验数
    pub fn joint_targets(&self, experiment_ids: &[String]) -> Vec<FitTarget> {
        let raw: Vec<f64> = experiment_ids.iter().map(|id| self.joint_weight(id)).collect();
        let total: f64 = raw.iter().sum();
        let norm = if total > 0.0 {
            experiment_ids.len() as f64 / total
        } else {
            1.0
        };
        experiment_ids
            .iter()
            .zip(raw)
            .map(|(id, w)| FitTarget::new(id, w * norm))
            .collect()
    }

    // ─────────────────────────────────────────────────────────────
    // 计算与拟合
    // ─────────────────────────────────────────────────────────────

    /// 计算单个实验的图样
    pub fn calculate(&self, models: &SampleModels, experiment: &mut Experiment) -> Result<()> {
        let calculator = CalculatorFactory::create(self.calculator)?;
        calculate_pattern(calculator.as_ref(), models, experiment)
    }

    /// 并行计算所有实验；不受支持的实验类型跳过并警告
    pub fn calculate_all(&self, models: &SampleModels, experiments: &mut Experiments) -> Result<()> {
        let calculator = CalculatorFactory::create(self.calculator)?;
        let calculator = calculator.as_ref();
        let mut all: Vec<&mut Experiment> = experiments.iter_mut().collect();
        let outcomes: Vec<Result<()>> = all
            .par_iter_mut()
            .map(|experiment| calculate_pattern(calculator, models, experiment))
            .collect();
        for (experiment, outcome) in all.iter().zip(outcomes) {
            match outcome {
                Ok(()) => {}
                Err(DiffError::UnsupportedCalculation { .. }) => print_warning(&format!(
                    "Calculator '{}' cannot compute experiment '{}' ({}), skipped",
                    self.calculator,
                    experiment.name(),
                    experiment.expt_type()
                )),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// 按拟合模式执行拟合
    ///
    /// single 模式依次拟合每个实验并返回多个结果，joint 模式返回一个结果。
    pub fn fit(
        &self,
        models: &mut SampleModels,
        experiments: &mut Experiments,
        echo_progress: bool,
    ) -> Result<Vec<FitResults>> {
        if models.is_empty() {
            return Err(DiffError::NothingToFit("project has no sample models".to_string()));
        }
        if experiments.is_empty() {
            return Err(DiffError::NothingToFit("project has no experiments".to_string()));
        }
        let calculator = CalculatorFactory::create(self.calculator)?;
        let minimizer = MinimizerFactory::create(self.minimizer, self.max_iterations)?;
        let mut fitter = Fitter::new(calculator.as_ref(), minimizer.as_ref(), &self.constraints);
        if !echo_progress {
            fitter = fitter.quiet();
        }

        let with_data: Vec<String> = experiments
            .iter()
            .filter(|e| {
                let has = !e.data.fit_triples().is_empty();
                if !has {
                    print_skip(&format!("Experiment '{}' has no measured data", e.name()));
                }
                has
            })
            .map(|e| e.name().to_string())
            .collect();
        if with_data.is_empty() {
            return Err(DiffError::NothingToFit(
                "no experiment has measured data".to_string(),
            ));
        }

        match self.fit_mode {
            FitMode::Joint => {
                print_info(&format!(
                    "Using experiments {:?} for 'joint' fitting",
                    with_data
                ));
                let targets = self.joint_targets(&with_data);
                Ok(vec![fitter.fit(models, experiments, &targets)?])
            }
            FitMode::Single => {
                let mut results = Vec::with_capacity(with_data.len());
                for id in &with_data {
                    print_info(&format!("Using experiment '{}' for 'single' fitting", id));
                    results.push(fitter.fit(models, experiments, &[FitTarget::new(id, 1.0)])?);
                }
                Ok(results)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // 参数列表
    // ─────────────────────────────────────────────────────────────

    pub fn all_parameters<'a>(
        models: &'a SampleModels,
        experiments: &'a Experiments,
    ) -> Vec<&'a Parameter> {
        let mut params = models.parameters();
        params.extend(experiments.parameters());
        params
    }

    pub fn free_parameters<'a>(
        models: &'a SampleModels,
        experiments: &'a Experiments,
    ) -> Vec<&'a Parameter> {
        Self::all_parameters(models, experiments)
            .into_iter()
            .filter(|p| p.is_free())
            .collect()
    }

    // ─────────────────────────────────────────────────────────────
    // CIF
    // ─────────────────────────────────────────────────────────────

    pub fn to_cif(&self) -> String {
        let mut w = CifWriter::new();
        w.data_block("analysis")
            .item("_analysis.calculator_engine", self.calculator)
            .item("_analysis.fitting_engine", self.minimizer)
            .item("_analysis.fit_mode", self.fit_mode.as_str())
            .item("_analysis.max_iterations", &self.max_iterations.to_string());
        if !self.joint_weights.is_empty() {
            let rows: Vec<Vec<String>> = self
                .joint_weights
                .iter()
                .map(|(id, weight)| vec![format_value(id), format_number(*weight)])
                .collect();
            w.blank().loop_table(
                &["_joint_fit_experiment.id", "_joint_fit_experiment.weight"],
                &rows,
                None,
            );
        }
        self.constraints.write_cif(&mut w);
        w.finish()
    }

    pub fn from_cif_block(block: &CifBlock) -> Result<Self> {
        let mut analysis = Self::new();
        if let Some(name) = block.find_value("_analysis.calculator_engine") {
            if let Err(e) = analysis.set_calculator(name) {
                print_warning(&format!(
                    "{}; using '{}' instead",
                    e,
                    CalculatorFactory::DEFAULT
                ));
            }
        }
        if let Some(name) = block.find_value("_analysis.fitting_engine") {
            if let Err(e) = analysis.set_minimizer(name) {
                print_warning(&format!(
                    "{}; using '{}' instead",
                    e,
                    MinimizerFactory::DEFAULT
                ));
            }
        }
        if let Some(mode) = block.find_value("_analysis.fit_mode") {
            analysis.fit_mode = mode.parse()?;
        }
        if let Some(raw) = block.find_value("_analysis.max_iterations") {
            analysis.max_iterations = raw.trim().parse().map_err(|_| DiffError::ParseError {
                format: "CIF".to_string(),
                path: block.name.clone(),
                reason: format!("'{}' is not a valid iteration count", raw),
            })?;
        }
        if let (Some(ids), Some(weights)) = (
            block.find_values("_joint_fit_experiment.id"),
            block.find_values("_joint_fit_experiment.weight"),
        ) {
            for (id, raw) in ids.iter().zip(&weights) {
                let weight = parse_number(raw).map(|n| n.value).ok_or_else(|| {
                    DiffError::ParseError {
                        format: "CIF".to_string(),
                        path: block.name.clone(),
                        reason: format!("'{}' is not a valid weight", raw),
                    }
                })?;
                analysis.set_joint_weight(id, weight)?;
            }
        }
        analysis.constraints.load_cif(block)?;
        Ok(analysis)
    }

    pub fn from_cif_str(text: &str) -> Result<Self> {
        let doc = parse_cif_content(text)?;
        match doc.first() {
            Some(block) => Self::from_cif_block(block),
            None => Ok(Self::new()),
        }
    }
}
