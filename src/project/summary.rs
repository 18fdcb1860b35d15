//! # 项目摘要
//!
//! 汇总项目信息、各样品模型的晶体学数据、实验配置与拟合统计，
//! 可输出为终端报告、`summary.cif` 或 JSON。
//!
//! ## 依赖关系
//! - 被 `project/manager.rs` 与 `commands/info.rs` 使用
//! - 使用 `display/tables.rs` 渲染表格

use crate::analysis::{Analysis, FitResults};
use crate::core::cif::{format_value, CifWriter};
use crate::core::uncertainty::format_number;
use crate::display::tables::{atom_site_table, cell_table, key_value_table};
use crate::experiments::{Experiment, Experiments};
use crate::project::info::{ProjectInfo, TIMESTAMP_FORMAT};
use crate::sample_models::{SampleModel, SampleModels};
use crate::utils::output::{print_block, print_section};

use serde::Serialize;

/// 单个样品模型的摘要
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub space_group: String,
    pub crystal_system: String,
    pub cell: [f64; 6],
    pub volume: f64,
    pub formula: String,
    pub atom_sites: usize,
}

impl ModelSummary {
    fn from_model(model: &SampleModel) -> Self {
        Self {
            name: model.name().to_string(),
            space_group: model.space_group.name().to_string(),
            crystal_system: model.space_group.crystal_system().to_string(),
            cell: model.cell.values(),
            volume: model.cell.volume(),
            formula: model.formula(),
            atom_sites: model.atom_sites.len(),
        }
    }
}

/// 单个实验的摘要
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentSummary {
    pub name: String,
    pub expt_type: String,
    pub wavelength: Option<f64>,
    pub profile_type: Option<String>,
    pub points: usize,
    pub linked_phases: Vec<String>,
    /// 峰形参数（名称，值）
    pub peak: Vec<(String, f64)>,
}

impl ExperimentSummary {
    fn from_experiment(experiment: &Experiment) -> Self {
        Self {
            name: experiment.name().to_string(),
            expt_type: experiment.expt_type().to_string(),
            wavelength: experiment.instrument.wavelength(),
            profile_type: experiment
                .peak
                .as_ref()
                .map(|p| p.profile_type().as_str().to_string()),
            points: experiment.data.len(),
            linked_phases: experiment.linked_phases.ids(),
            peak: experiment
                .peak
                .as_ref()
                .map(|p| {
                    p.parameters()
                        .iter()
                        .map(|param| (param.name().to_string(), param.value()))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// 拟合统计
#[derive(Debug, Clone, Serialize)]
pub struct FitSummary {
    pub experiments: Vec<String>,
    pub reduced_chi_square: f64,
    pub weighted_r_factor: f64,
    pub success: bool,
}

/// 项目摘要
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub project: ProjectInfo,
    pub models: Vec<ModelSummary>,
    pub experiments: Vec<ExperimentSummary>,
    pub calculator: String,
    pub minimizer: String,
    pub fit_mode: String,
    pub fits: Vec<FitSummary>,
}

impl Summary {
    pub fn new(
        info: &ProjectInfo,
        models: &SampleModels,
        experiments: &Experiments,
        analysis: &Analysis,
        fits: &[FitResults],
    ) -> Self {
        Self {
            project: info.clone(),
            models: models.iter().map(ModelSummary::from_model).collect(),
            experiments: experiments
                .iter()
                .map(ExperimentSummary::from_experiment)
                .collect(),
            calculator: analysis.calculator().to_string(),
            minimizer: analysis.minimizer().to_string(),
            fit_mode: analysis.fit_mode.as_str().to_string(),
            fits: fits
                .iter()
                .map(|r| FitSummary {
                    experiments: r.experiments.clone(),
                    reduced_chi_square: r.reduced_chi_square,
                    weighted_r_factor: r.reliability.weighted_r_factor,
                    success: r.success,
                })
                .collect(),
        }
    }

    /// 打印终端报告
    ///
    /// 原子位置表需要模型本身，因此同时传入模型集合。
    pub fn show(&self, models: &SampleModels) {
        print_section("Project info");
        print_block(&format!("Title: {}", self.project.title()));
        if !self.project.description().is_empty() {
            let wrapped = crate::core::cif::wrap_text(
                self.project.description(),
                crate::project::info::WRAP_WIDTH,
            );
            print_block(&wrapped.join("\n"));
        }

        print_section("Crystallographic data");
        for model in models.iter() {
            print_block(&format!(
                "Phase '{}': {} ({}, IT {})",
                model.name(),
                model.space_group.name(),
                model.space_group.crystal_system(),
                model.space_group.it_number()
            ));
            print_block(&cell_table(model));
            if !model.atom_sites.is_empty() {
                print_block(&atom_site_table(model));
            }
        }

        print_section("Experiments");
        for expt in &self.experiments {
            let mut rows = vec![
                ("Experiment".to_string(), expt.name.clone()),
                ("Type".to_string(), expt.expt_type.clone()),
                ("Data points".to_string(), expt.points.to_string()),
            ];
            if let Some(wl) = expt.wavelength {
                rows.push(("Wavelength (Å)".to_string(), format_number(wl)));
            }
            if let Some(profile) = &expt.profile_type {
                rows.push(("Profile type".to_string(), profile.clone()));
            }
            if !expt.linked_phases.is_empty() {
                rows.push(("Linked phases".to_string(), expt.linked_phases.join(", ")));
            }
            for (name, value) in &expt.peak {
                rows.push((name.clone(), format_number(*value)));
            }
            print_block(&key_value_table(&rows));
        }

        print_section("Fitting");
        let mut rows = vec![
            ("Calculation engine".to_string(), self.calculator.clone()),
            ("Minimization engine".to_string(), self.minimizer.clone()),
            ("Fit mode".to_string(), self.fit_mode.clone()),
        ];
        for fit in &self.fits {
            rows.push((
                format!("Reduced χ² ({})", fit.experiments.join(", ")),
                format!("{:.2}", fit.reduced_chi_square),
            ));
        }
        print_block(&key_value_table(&rows));
    }

    /// 渲染 `summary.cif`
    pub fn to_cif(&self) -> String {
        let mut w = CifWriter::new();
        w.data_block("summary")
            .blank()
            .item("_summary.project_id", &format_value(self.project.name()))
            .item("_summary.project_title", &format_value(self.project.title()))
            .item(
                "_summary.last_modified",
                &format_value(
                    &self
                        .project
                        .last_modified()
                        .format(TIMESTAMP_FORMAT)
                        .to_string(),
                ),
            )
            .item("_summary.calculator_engine", &format_value(&self.calculator))
            .item("_summary.fitting_engine", &format_value(&self.minimizer))
            .item("_summary.fit_mode", &format_value(&self.fit_mode));

        let model_rows: Vec<Vec<String>> = self
            .models
            .iter()
            .map(|m| {
                let mut row = vec![
                    format_value(&m.name),
                    format_value(&m.space_group),
                    format_value(&m.crystal_system),
                ];
                row.extend(m.cell.iter().map(|v| format!("{:.4}", v)));
                row.push(format!("{:.4}", m.volume));
                row.push(format_value(&m.formula));
                row
            })
            .collect();
        if !model_rows.is_empty() {
            w.blank();
        }
        w.loop_table(
            &[
                "_summary_phase.id",
                "_summary_phase.space_group",
                "_summary_phase.crystal_system",
                "_summary_phase.length_a",
                "_summary_phase.length_b",
                "_summary_phase.length_c",
                "_summary_phase.angle_alpha",
                "_summary_phase.angle_beta",
                "_summary_phase.angle_gamma",
                "_summary_phase.volume",
                "_summary_phase.formula",
            ],
            &model_rows,
            None,
        );

        let expt_rows: Vec<Vec<String>> = self
            .experiments
            .iter()
            .map(|e| {
                vec![
                    format_value(&e.name),
                    format_value(&e.expt_type),
                    e.wavelength.map(format_number).unwrap_or_else(|| ".".to_string()),
                    e.profile_type
                        .as_deref()
                        .map(format_value)
                        .unwrap_or_else(|| ".".to_string()),
                    e.points.to_string(),
                ]
            })
            .collect();
        if !expt_rows.is_empty() {
            w.blank();
        }
        w.loop_table(
            &[
                "_summary_experiment.id",
                "_summary_experiment.type",
                "_summary_experiment.wavelength",
                "_summary_experiment.profile_type",
                "_summary_experiment.points",
            ],
            &expt_rows,
            None,
        );

        let fit_rows: Vec<Vec<String>> = self
            .fits
            .iter()
            .map(|f| {
                vec![
                    format_value(&f.experiments.join(",")),
                    format!("{:.4}", f.reduced_chi_square),
                    format!("{:.4}", f.weighted_r_factor),
                    if f.success { "yes" } else { "no" }.to_string(),
                ]
            })
            .collect();
        if !fit_rows.is_empty() {
            w.blank();
        }
        w.loop_table(
            &[
                "_summary_fit.experiments",
                "_summary_fit.reduced_chi_square",
                "_summary_fit.weighted_r_factor",
                "_summary_fit.success",
            ],
            &fit_rows,
            None,
        );
        w.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse_cif_content;

    fn sample() -> (ProjectInfo, SampleModels, Experiments, Analysis) {
        let mut models = SampleModels::new();
        let mut model = SampleModel::new("si").unwrap();
        model.set_space_group("F d -3 m").unwrap();
        models.add(model);
        (
            ProjectInfo::new("demo").unwrap(),
            models,
            Experiments::new(),
            Analysis::new(),
        )
    }

    #[test]
    fn test_summary_collects_models() {
        let (info, models, experiments, analysis) = sample();
        let summary = Summary::new(&info, &models, &experiments, &analysis, &[]);
        assert_eq!(summary.models.len(), 1);
        assert_eq!(summary.models[0].space_group, "F d -3 m");
        assert_eq!(summary.models[0].crystal_system, "cubic");
        assert_eq!(summary.calculator, "kinematic");
        assert!(summary.fits.is_empty());
    }

    #[test]
    fn test_summary_cif_parses() {
        let (info, models, experiments, analysis) = sample();
        let text = Summary::new(&info, &models, &experiments, &analysis, &[]).to_cif();
        let doc = parse_cif_content(&text).unwrap();
        let block = doc.block("summary").unwrap();
        assert_eq!(block.find_value("_summary.project_id"), Some("demo"));
        assert_eq!(
            block.find_values("_summary_phase.space_group"),
            Some(vec!["F d -3 m"])
        );
    }
}
