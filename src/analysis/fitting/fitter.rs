//! # 拟合器
//!
//! 收集样品模型与目标实验中的自由参数，交给最小化器迭代：
//! 每次求值写入参数、重新应用对称性与用户约束、并行计算各实验图样，
//! 再拼接加权残差 `(meas − calc)/σ · sqrt(w)`。
//!
//! ## 依赖关系
//! - 被 `analysis/workflow.rs` 使用
//! - 使用 `analysis/calculators`、`analysis/minimizers`、`analysis/constraints.rs`
//! - 使用 `rayon` 并行计算多个实验的图样

use super::metrics::{reduced_chi_square, reliability_factors};
use super::progress::FitProgressTracker;
use super::results::{FitResults, FittedParameter};
use crate::analysis::calculators::{calculate_pattern, Calculator};
use crate::analysis::constraints::{find_parameter, find_parameter_mut, Constraints};
use crate::analysis::minimizers::Minimizer;
use crate::core::HasParameters;
use crate::error::{DiffError, Result};
use crate::experiments::{Experiment, Experiments};
use crate::sample_models::SampleModels;
use crate::utils::output::print_debug;

use rayon::prelude::*;

/// 参与拟合的实验及其权重
#[derive(Debug, Clone, PartialEq)]
pub struct FitTarget {
    pub experiment: String,
    pub weight: f64,
}

impl FitTarget {
    pub fn new(experiment: &str, weight: f64) -> Self {
        Self {
            experiment: experiment.to_string(),
            weight,
        }
    }
}

/// 拟合参数快照
struct FreeParameter {
    full_name: String,
    units: String,
    start: f64,
    bounds: (f64, f64),
}

pub struct Fitter<'a> {
    calculator: &'a dyn Calculator,
    minimizer: &'a dyn Minimizer,
    constraints: &'a Constraints,
    echo_progress: bool,
}

impl<'a> Fitter<'a> {
    pub fn new(
        calculator: &'a dyn Calculator,
        minimizer: &'a dyn Minimizer,
        constraints: &'a Constraints,
    ) -> Self {
        Self {
            calculator,
            minimizer,
            constraints,
            echo_progress: true,
        }
    }

    /// 不输出迭代表
    pub fn quiet(mut self) -> Self {
        self.echo_progress = false;
        self
    }

    pub fn fit(
        &self,
        models: &mut SampleModels,
        experiments: &mut Experiments,
        targets: &[FitTarget],
    ) -> Result<FitResults> {
        if targets.is_empty() {
            return Err(DiffError::NothingToFit("no experiments selected".to_string()));
        }
        for target in targets {
            let experiment = experiments
                .get(&target.experiment)
                .ok_or_else(|| DiffError::not_found("experiment", &target.experiment))?;
            if experiment.data.fit_triples().is_empty() {
                return Err(DiffError::NothingToFit(format!(
                    "experiment '{}' has no measured points",
                    target.experiment
                )));
            }
        }

        models.apply_symmetry_constraints()?;
        self.constraints.apply(models, experiments)?;

        let free = collect_free_parameters(models, experiments, targets);
        if free.is_empty() {
            return Err(DiffError::NothingToFit(
                "no free parameters; mark parameters free with '()' in CIF or `set --free`"
                    .to_string(),
            ));
        }
        for p in &free {
            if let Some(param) = find_parameter_mut(models, experiments, &p.full_name) {
                param.set_start_value(Some(p.start));
            }
        }
        print_debug(&format!(
            "Fitting {} parameters: {}",
            free.len(),
            free.iter().map(|p| p.full_name.as_str()).collect::<Vec<_>>().join(", ")
        ));

        let x0: Vec<f64> = free.iter().map(|p| p.start).collect();
        let bounds: Vec<(f64, f64)> = free.iter().map(|p| p.bounds).collect();
        let n_params = free.len();

        let mut tracker = FitProgressTracker::new();
        if !self.echo_progress {
            tracker = tracker.silent();
        }
        tracker.start(self.minimizer.name());

        let outcome = {
            let mut residuals = |x: &[f64]| -> Result<Vec<f64>> {
                self.update(models, experiments, &free, x, targets)?;
                let r = weighted_residuals(experiments, targets);
                let chi2: f64 = r.iter().map(|v| v * v).sum();
                tracker.track(reduced_chi_square(chi2, r.len(), n_params));
                Ok(r)
            };
            self.minimizer.minimize(&x0, &bounds, &mut residuals)?
        };
        tracker.finish();

        // 以最终参数重新计算，保证模型状态与结果一致
        self.update(models, experiments, &free, &outcome.values, targets)?;
        for (p, su) in free.iter().zip(&outcome.uncertainties) {
            if let Some(param) = find_parameter_mut(models, experiments, &p.full_name) {
                param.set_uncertainty(*su);
            }
        }

        let mut triples = Vec::new();
        for target in targets {
            if let Some(experiment) = experiments.get(&target.experiment) {
                triples.extend(experiment.data.fit_triples());
            }
        }
        let reliability = reliability_factors(&triples, n_params);

        let parameters = free
            .iter()
            .zip(&outcome.uncertainties)
            .map(|(p, su)| FittedParameter {
                full_name: p.full_name.clone(),
                units: p.units.clone(),
                start: p.start,
                value: find_parameter(models, experiments, &p.full_name)
                    .map(|param| param.value())
                    .unwrap_or(p.start),
                uncertainty: *su,
            })
            .collect();

        Ok(FitResults {
            success: outcome.success,
            message: outcome.message,
            iterations: tracker.iterations(),
            minimizer: self.minimizer.name().to_string(),
            reduced_chi_square: reliability.reduced_chi_square,
            fitting_time_s: tracker.elapsed().map(|d| d.as_secs_f64()).unwrap_or(0.0),
            parameters,
            reliability,
            experiments: targets.iter().map(|t| t.experiment.clone()).collect(),
        })
    }

    /// 写入参数值、应用约束并重新计算目标实验
    fn update(
        &self,
        models: &mut SampleModels,
        experiments: &mut Experiments,
        free: &[FreeParameter],
        x: &[f64],
        targets: &[FitTarget],
    ) -> Result<()> {
        for (p, &value) in free.iter().zip(x) {
            let param = find_parameter_mut(models, experiments, &p.full_name)
                .ok_or_else(|| DiffError::not_found("parameter", &p.full_name))?;
            param.set_value(value.clamp(p.bounds.0, p.bounds.1))?;
        }
        models.apply_symmetry_constraints()?;
        self.constraints.apply(models, experiments)?;

        let names: Vec<&str> = targets.iter().map(|t| t.experiment.as_str()).collect();
        let mut selected: Vec<&mut Experiment> = experiments
            .iter_mut()
            .filter(|e| names.contains(&e.name()))
            .collect();
        let models: &SampleModels = models;
        let calculator = self.calculator;
        selected
            .par_iter_mut()
            .try_for_each(|experiment| calculate_pattern(calculator, models, experiment))
    }
}

/// 目标实验链接的样品模型的自由参数，加上目标实验自身的自由参数
fn collect_free_parameters(
    models: &SampleModels,
    experiments: &Experiments,
    targets: &[FitTarget],
) -> Vec<FreeParameter> {
    let selected: Vec<&Experiment> = targets
        .iter()
        .filter_map(|t| experiments.get(&t.experiment))
        .collect();
    let linked: Vec<String> = selected
        .iter()
        .flat_map(|e| e.linked_phases.ids())
        .collect();
    let mut params: Vec<_> = models
        .iter()
        .filter(|m| linked.iter().any(|id| id == m.name()))
        .flat_map(|m| m.free_parameters())
        .collect();
    for experiment in selected {
        params.extend(experiment.free_parameters());
    }
    params
        .into_iter()
        .map(|p| FreeParameter {
            full_name: p.full_name(),
            units: p.units().to_string(),
            start: p.value(),
            bounds: p.fit_range(),
        })
        .collect()
}

/// 拼接各目标实验的加权残差
fn weighted_residuals(experiments: &Experiments, targets: &[FitTarget]) -> Vec<f64> {
    let mut residuals = Vec::new();
    for target in targets {
        let Some(experiment) = experiments.get(&target.experiment) else {
            continue;
        };
        let scale = target.weight.max(0.0).sqrt();
        residuals.extend(
            experiment
                .data
                .fit_triples()
                .into_iter()
                .map(|(meas, calc, su)| {
                    let su = if su > 0.0 { su } else { 1.0 };
                    (meas - calc) / su * scale
                }),
        );
    }
    residuals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::calculators::{CalculatorFactory, KinematicCalculator};
    use crate::analysis::minimizers::MinimizerFactory;

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

    const EXPT_HEAD: &str = "data_xrd
_expt_type.sample_form powder
_expt_type.beam_mode 'constant wavelength'
_expt_type.radiation_probe xray
_expt_type.scattering_type bragg
_instr.wavelength 1.5406
_peak.broad_gauss_u 0.0
_peak.broad_gauss_v 0.0
_peak.broad_gauss_w 0.01
loop_
_pd_phase_block.id
_pd_phase_block.scale
si 1.0
";

    /// 以已知比例因子合成测量数据
    fn synthetic_project(true_scale: f64) -> (SampleModels, Experiments) {
        let mut models = SampleModels::new();
        models.add_from_cif_str(SI_CIF).unwrap();
        let mut experiments = Experiments::new();
        add_synthetic_experiment(&models, &mut experiments, "xrd", 400, true_scale);
        (models, experiments)
    }

    fn add_synthetic_experiment(
        models: &SampleModels,
        experiments: &mut Experiments,
        name: &str,
        points: usize,
        true_scale: f64,
    ) {
        experiments
            .add_from_cif_str(&EXPT_HEAD.replacen("data_xrd", &format!("data_{}", name), 1))
            .unwrap();
        let calculator = KinematicCalculator::default();
        let experiment = experiments.get_mut(name).unwrap();
        let x: Vec<f64> = (0..points).map(|i| 25.0 + i as f64 * 0.05).collect();
        let data = experiment.data.as_powder_mut().unwrap();
        *data = crate::experiments::PowderData::from_columns(
            crate::experiments::XKind::TwoTheta,
            crate::parsers::MeasuredColumns {
                x: x.clone(),
                y: vec![0.0; x.len()],
                sy: vec![1.0; x.len()],
            },
        );
        let pattern = calculator.calculate_model(models.get("si").unwrap(), experiment).unwrap();
        let data = experiment.data.as_powder_mut().unwrap();
        data.intensity_meas = pattern.iter().map(|v| v * true_scale).collect();
        data.intensity_meas_su = data
            .intensity_meas
            .iter()
            .map(|v| v.abs().sqrt().max(1.0))
            .collect();
    }

    #[test]
    fn test_fit_recovers_scale() {
        let (mut models, mut experiments) = synthetic_project(2.5);
        experiments
            .find_parameter_mut("xrd.linked_phases.si.scale")
            .unwrap()
            .set_free(true)
            .unwrap();
        let calculator = CalculatorFactory::default_calculator();
        let minimizer = MinimizerFactory::create("lm", 100).unwrap();
        let constraints = Constraints::new();
        let results = Fitter::new(calculator.as_ref(), minimizer.as_ref(), &constraints)
            .quiet()
            .fit(&mut models, &mut experiments, &[FitTarget::new("xrd", 1.0)])
            .unwrap();

        let scale = &results.parameters[0];
        assert_eq!(scale.full_name, "xrd.linked_phases.si.scale");
        assert!((scale.value - 2.5).abs() < 1e-4, "scale = {}", scale.value);
        assert!(results.reliability.r_factor < 1e-4);
        let param = experiments.find_parameter("xrd.linked_phases.si.scale").unwrap();
        assert_eq!(param.start_value(), Some(1.0));
    }

    #[test]
    fn test_nothing_to_fit() {
        let (mut models, mut experiments) = synthetic_project(1.0);
        let calculator = CalculatorFactory::default_calculator();
        let minimizer = MinimizerFactory::create("lm", 10).unwrap();
        let constraints = Constraints::new();
        let err = Fitter::new(calculator.as_ref(), minimizer.as_ref(), &constraints)
            .quiet()
            .fit(&mut models, &mut experiments, &[FitTarget::new("xrd", 1.0)]);
        assert!(matches!(err, Err(DiffError::NothingToFit(_))));
    }

    #[test]
    fn test_joint_fit_with_unequal_weights() {
        let (mut models, mut experiments) = synthetic_project(2.5);
        add_synthetic_experiment(&models, &mut experiments, "xrd2", 300, 0.8);
        for name in ["xrd.linked_phases.si.scale", "xrd2.linked_phases.si.scale"] {
            experiments.find_parameter_mut(name).unwrap().set_free(true).unwrap();
        }
        let targets = [FitTarget::new("xrd", 1.0), FitTarget::new("xrd2", 9.0)];

        let before = weighted_residuals(&experiments, &targets);
        assert_eq!(before.len(), 700);
        let single = weighted_residuals(&experiments, &[FitTarget::new("xrd2", 1.0)]);
        for (a, b) in single.iter().zip(&before[400..]) {
            assert!((3.0 * a - b).abs() < 1e-9);
        }

        let calculator = CalculatorFactory::default_calculator();
        let minimizer = MinimizerFactory::create("lm", 100).unwrap();
        let constraints = Constraints::new();
        let results = Fitter::new(calculator.as_ref(), minimizer.as_ref(), &constraints)
            .quiet()
            .fit(&mut models, &mut experiments, &targets)
            .unwrap();

        assert_eq!(results.experiments, vec!["xrd", "xrd2"]);
        assert_eq!(results.reliability.points, 700);
        let value = |name: &str| {
            results
                .parameters
                .iter()
                .find(|p| p.full_name == name)
                .unwrap()
                .value
        };
        assert!((value("xrd.linked_phases.si.scale") - 2.5).abs() < 1e-4);
        assert!((value("xrd2.linked_phases.si.scale") - 0.8).abs() < 1e-4);
    }

    #[test]
    fn test_unlinked_model_is_not_fitted() {
        let (mut models, mut experiments) = synthetic_project(2.5);
        models
            .add_from_cif_str("data_other\n_space_group.name_H-M_alt 'P 1'\n_cell.length_a 4.0()\n")
            .unwrap();
        experiments
            .find_parameter_mut("xrd.linked_phases.si.scale")
            .unwrap()
            .set_free(true)
            .unwrap();
        assert!(models.find_parameter("other.cell.length_a").unwrap().is_free());

        let calculator = CalculatorFactory::default_calculator();
        let minimizer = MinimizerFactory::create("lm", 100).unwrap();
        let constraints = Constraints::new();
        let results = Fitter::new(calculator.as_ref(), minimizer.as_ref(), &constraints)
            .quiet()
            .fit(&mut models, &mut experiments, &[FitTarget::new("xrd", 1.0)])
            .unwrap();

        let names: Vec<&str> = results.parameters.iter().map(|p| p.full_name.as_str()).collect();
        assert_eq!(names, vec!["xrd.linked_phases.si.scale"]);
        assert!(results.parameters[0].uncertainty.is_some());
        assert_eq!(models.find_parameter("other.cell.length_a").unwrap().value(), 4.0);
    }

    #[test]
    fn test_weighted_residuals_scale() {
        let (_, experiments) = synthetic_project(1.0);
        let r1 = weighted_residuals(&experiments, &[FitTarget::new("xrd", 1.0)]);
        let r4 = weighted_residuals(&experiments, &[FitTarget::new("xrd", 4.0)]);
        assert_eq!(r1.len(), 400);
        for (a, b) in r1.iter().zip(&r4) {
            assert!((2.0 * a - b).abs() < 1e-9);
        }
    }
}
