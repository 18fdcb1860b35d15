//! # plot 命令实现
//!
//! 计算所选实验的图样，并用终端或图片后端绘制测量与计算曲线。
//!
//! ## 依赖关系
//! - 使用 `cli/output.rs` 定义的参数
//! - 使用 `project/`, `display/`

use crate::cli::output::PlotArgs;
use crate::display::chart::{Chart, ChartOptions};
use crate::error::{DiffError, Result};
use crate::project::Project;
use crate::utils::output;

use std::path::PathBuf;

/// 选出要绘制的实验：未指定时项目必须只有一个实验
fn select_experiment(project: &Project, requested: Option<&str>) -> Result<String> {
    match requested {
        Some(name) => project
            .experiments
            .get(name)
            .map(|e| e.name().to_string())
            .ok_or_else(|| DiffError::not_found("experiment", name)),
        None => {
            let ids = project.experiments.ids();
            match ids.as_slice() {
                [only] => Ok(only.clone()),
                [] => Err(DiffError::InvalidArgument(
                    "project has no experiments to plot".to_string(),
                )),
                _ => Err(DiffError::InvalidArgument(format!(
                    "project has several experiments ({}), choose one with --experiment",
                    ids.join(", ")
                ))),
            }
        }
    }
}

/// 执行 plot 命令
pub fn execute(args: PlotArgs) -> Result<()> {
    let mut project = Project::load(&args.dir)?;
    let name = select_experiment(&project, args.experiment.as_deref())?;

    let experiment = project
        .experiments
        .get_mut(&name)
        .ok_or_else(|| DiffError::not_found("experiment", &name))?;
    match project.analysis.calculate(&project.sample_models, experiment) {
        Ok(()) => {}
        Err(DiffError::UnsupportedCalculation { .. }) => output::print_warning(&format!(
            "Calculator '{}' cannot compute experiment '{}', plotting measured data only",
            project.analysis.calculator(),
            name
        )),
        Err(e) => return Err(e),
    }

    let options = ChartOptions {
        x_min: args.x_min.unwrap_or(f64::NEG_INFINITY),
        x_max: args.x_max.unwrap_or(f64::INFINITY),
        residual: args.residual,
        background: args.background,
    };
    let chart = Chart::from_experiment(experiment, &options)?;

    let target = match (&args.output, args.backend.image_format()) {
        (Some(path), _) => path.clone(),
        (None, Some(format)) => args.dir.join(format!("{}.{}", name, format.extension())),
        (None, None) => PathBuf::new(),
    };
    let plotter = args.backend.create(&target, args.height);
    output::print_debug(&format!("Plotting '{}' with the {} backend", name, plotter.name()));
    plotter.plot(&chart)?;

    if args.backend.image_format().is_some() {
        output::print_success(&format!("Chart written to {}", target.display()));
    }
    Ok(())
}
