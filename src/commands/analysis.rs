//! # calc / fit 命令实现
//!
//! ## 功能
//! - `calc`：用当前参数计算图样并报告可靠性因子，不修改项目文件
//! - `fit`：按 `analysis.cif` 的设置（可由命令行覆盖）精修自由参数
//!
//! ## 依赖关系
//! - 使用 `cli/analysis.rs` 定义的参数
//! - 使用 `project/`, `analysis/`, `utils/output.rs`

use crate::analysis::fitting::metrics::reliability_factors;
use crate::analysis::Analysis;
use crate::cli::analysis::{CalcArgs, FitArgs};
use crate::error::{DiffError, Result};
use crate::experiments::Experiment;
use crate::project::Project;
use crate::utils::output::{self, Verbosity};

use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct AgreementRow {
    #[tabled(rename = "Experiment")]
    experiment: String,
    #[tabled(rename = "Points")]
    points: usize,
    #[tabled(rename = "Rf (%)")]
    r_factor: String,
    #[tabled(rename = "wR (%)")]
    weighted_r_factor: String,
    #[tabled(rename = "χ²ᵣ")]
    reduced_chi_square: String,
}

fn percent(v: f64) -> String {
    if v.is_finite() {
        format!("{:.2}", v * 100.0)
    } else {
        "-".to_string()
    }
}

fn agreement_row(experiment: &Experiment) -> AgreementRow {
    let rf = reliability_factors(&experiment.data.fit_triples(), 0);
    AgreementRow {
        experiment: experiment.name().to_string(),
        points: rf.points,
        r_factor: percent(rf.r_factor),
        weighted_r_factor: percent(rf.weighted_r_factor),
        reduced_chi_square: if rf.reduced_chi_square.is_finite() {
            format!("{:.2}", rf.reduced_chi_square)
        } else {
            "-".to_string()
        },
    }
}

/// 执行 calc 命令
pub fn execute_calc(args: CalcArgs) -> Result<()> {
    let mut project = Project::load(&args.dir)?;
    if let Some(calculator) = &args.calculator {
        project.analysis.set_calculator(calculator)?;
    }
    output::print_info(&format!(
        "Calculating with '{}'",
        project.analysis.calculator()
    ));

    let names: Vec<String> = match &args.experiment {
        Some(name) => {
            let experiment = project
                .experiments
                .get_mut(name)
                .ok_or_else(|| DiffError::not_found("experiment", name))?;
            project.analysis.calculate(&project.sample_models, experiment)?;
            vec![name.clone()]
        }
        None => {
            project.calculate_all()?;
            project.experiments.ids()
        }
    };

    let rows: Vec<AgreementRow> = names
        .iter()
        .filter_map(|name| project.experiments.get(name))
        .map(agreement_row)
        .collect();
    if rows.is_empty() {
        output::print_warning("Project has no experiments");
        return Ok(());
    }
    output::print_header("Agreement with measured data");
    output::print_block(&Table::new(&rows).with(Style::rounded()).to_string());
    Ok(())
}

/// 把命令行覆盖项写入分析设置
fn apply_overrides(analysis: &mut Analysis, args: &FitArgs) -> Result<()> {
    if let Some(minimizer) = &args.minimizer {
        analysis.set_minimizer(minimizer)?;
    }
    if let Some(calculator) = &args.calculator {
        analysis.set_calculator(calculator)?;
    }
    if let Some(mode) = args.mode {
        analysis.fit_mode = mode;
    }
    for (id, weight) in &args.weights {
        analysis.set_joint_weight(id, *weight)?;
    }
    if let Some(max_iterations) = args.max_iterations {
        if max_iterations == 0 {
            return Err(DiffError::InvalidArgument(
                "--max-iterations must be at least 1".to_string(),
            ));
        }
        analysis.max_iterations = max_iterations;
    }
    Ok(())
}

/// 执行 fit 命令
pub fn execute_fit(args: FitArgs) -> Result<()> {
    let mut project = Project::load(&args.dir)?;
    apply_overrides(&mut project.analysis, &args)?;

    for (id, _) in &args.weights {
        if project.experiments.get(id).is_none() {
            return Err(DiffError::not_found("experiment", id));
        }
    }

    let echo = !args.json && output::verbosity() >= Verbosity::Normal;
    if echo {
        output::print_header(&format!(
            "Fitting project '{}' ({} mode, minimizer '{}', calculator '{}')",
            project.info.name(),
            project.analysis.fit_mode.as_str(),
            project.analysis.minimizer(),
            project.analysis.calculator()
        ));
    }

    let results = project.fit(echo)?.to_vec();

    if args.json {
        output::print_block(&serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            result.show();
        }
    }

    if args.no_save {
        output::print_skip("Refined parameters not saved (--no-save)");
    } else {
        project.save()?;
    }

    if results.iter().any(|r| !r.success) {
        output::print_warning("At least one fit did not converge");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::FitMode;
    use std::path::PathBuf;

    fn fit_args() -> FitArgs {
        FitArgs {
            dir: PathBuf::from("unused"),
            minimizer: Some("simplex".to_string()),
            calculator: None,
            mode: Some(FitMode::Joint),
            weights: vec![("hrpt".to_string(), 2.0)],
            max_iterations: Some(50),
            no_save: true,
            json: false,
        }
    }

    #[test]
    fn test_apply_overrides() {
        let mut analysis = Analysis::default();
        apply_overrides(&mut analysis, &fit_args()).unwrap();
        assert_eq!(analysis.minimizer(), "simplex");
        assert_eq!(analysis.fit_mode, FitMode::Joint);
        assert_eq!(analysis.max_iterations, 50);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let mut args = fit_args();
        args.max_iterations = Some(0);
        let mut analysis = Analysis::default();
        assert!(apply_overrides(&mut analysis, &args).is_err());
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0.1234), "12.34");
        assert_eq!(percent(f64::NAN), "-");
    }
}
