//! # new / info 命令实现
//!
//! ## 功能
//! - `new`：由模型 CIF、实验 CIF 与测量数据文件创建项目目录
//! - `info`：打印项目摘要（终端报告或 JSON）
//!
//! ## 依赖关系
//! - 使用 `cli/project.rs` 定义的参数
//! - 使用 `project/`, `batch/collector.rs`, `utils/output.rs`

use crate::batch::FileCollector;
use crate::cli::project::{InfoArgs, NewArgs};
use crate::commands::params::constraint_table;
use crate::error::{DiffError, Result};
use crate::experiments::{Experiment, ExperimentType, Instrument};
use crate::project::info::TIMESTAMP_FORMAT;
use crate::project::manager::PROJECT_FILE;
use crate::project::Project;
use crate::utils::output;

use std::path::{Path, PathBuf};

/// 由目录名推导合法的项目名
fn default_name(dir: &Path) -> String {
    let raw = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.is_empty() {
        "untitled_project".to_string()
    } else {
        name
    }
}

/// 收集 CIF 输入（文件或目录）
fn collect_cif(input: &Path) -> Result<Vec<PathBuf>> {
    let files = FileCollector::new(input).with_pattern("*.cif").collect();
    if files.is_empty() {
        return Err(DiffError::NoFilesFound {
            pattern: format!("{}/*.cif", input.display()),
        });
    }
    Ok(files)
}

/// 执行 new 命令
pub fn execute_new(args: NewArgs) -> Result<()> {
    output::print_header(&format!("Creating project in {}", args.dir.display()));

    if args.dir.join(PROJECT_FILE).exists() && !args.force {
        return Err(DiffError::InvalidArgument(format!(
            "{} already contains a project, use --force to overwrite it",
            args.dir.display()
        )));
    }

    let name = args.name.clone().unwrap_or_else(|| default_name(&args.dir));
    let mut project = Project::new(&name)?;
    if let Some(title) = &args.title {
        project.info.set_title(title);
    }
    if let Some(description) = &args.description {
        project.info.set_description(description);
    }

    for input in &args.models {
        for file in collect_cif(input)? {
            let names = project.sample_models.add_from_cif_path(&file)?;
            output::print_info(&format!(
                "Added sample model(s) {} from {}",
                names.join(", "),
                file.display()
            ));
        }
    }

    for input in &args.experiments {
        for file in collect_cif(input)? {
            let names = project.experiments.add_from_cif_path(&file)?;
            output::print_info(&format!(
                "Added experiment(s) {} from {}",
                names.join(", "),
                file.display()
            ));
        }
    }

    if !args.data.is_empty() {
        let expt_type = ExperimentType::new(
            args.sample_form,
            args.beam_mode,
            args.radiation_probe,
            args.scattering_type,
        )?;
        let links = if args.links.is_empty() && project.sample_models.len() == 1 {
            project.sample_models.names()
        } else {
            args.links.clone()
        };
        for link in &links {
            if project.sample_models.get(link).is_none() {
                return Err(DiffError::not_found("sample model", link));
            }
        }

        for (expt_name, path) in &args.data {
            let mut experiment = Experiment::from_data_file(expt_name, expt_type, Path::new(path))?;
            if let Some(wavelength) = args.wavelength {
                match &mut experiment.instrument {
                    Instrument::Cwl(instrument) => instrument.wavelength.set_value(wavelength)?,
                    Instrument::Tof(_) => output::print_warning(&format!(
                        "--wavelength ignored for time-of-flight experiment '{}'",
                        expt_name
                    )),
                }
            }
            for link in &links {
                experiment.link_phase(link, 1.0)?;
            }
            for &(start, end) in &args.excluded {
                experiment.add_excluded_region(start, end)?;
            }
            if links.is_empty() {
                output::print_warning(&format!(
                    "Experiment '{}' has no linked phases, add them with --link",
                    expt_name
                ));
            }
            output::print_info(&format!(
                "Added experiment '{}' ({}, {} points, {} in fit) from {}",
                expt_name,
                experiment.expt_type(),
                experiment.data.len(),
                experiment.data.fit_triples().len(),
                path
            ));
            project.experiments.add(experiment);
        }
    }

    project.save_as(&args.dir)?;
    output::print_done(&format!(
        "Project '{}' created with {} sample model(s) and {} experiment(s)",
        project.info.name(),
        project.sample_models.len(),
        project.experiments.len()
    ));
    Ok(())
}

/// 执行 info 命令
pub fn execute_info(args: InfoArgs) -> Result<()> {
    let project = Project::load(&args.dir)?;
    let summary = project.summary();

    if args.json {
        output::print_block(&serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    output::print_header(&format!("Project '{}'", project.info.name()));
    output::print_block(&format!(
        "Path: {}\nCreated: {}\nLast modified: {}",
        args.dir.display(),
        project.info.created().format(TIMESTAMP_FORMAT),
        project.info.last_modified().format(TIMESTAMP_FORMAT)
    ));
    summary.show(&project.sample_models);

    if !project.analysis.constraints.is_empty() {
        output::print_section("Constraints");
        output::print_block(&constraint_table(&project.analysis.constraints));
    }

    if args.cif {
        for experiment in project.experiments.iter() {
            output::print_section(&format!("Experiment '{}'", experiment.name()));
            experiment.show();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name() {
        assert_eq!(default_name(Path::new("/tmp/lbco-hrpt")), "lbco_hrpt");
        assert_eq!(default_name(Path::new("/")), "untitled_project");
    }
}
