//! # export 命令实现
//!
//! 计算全部实验后，将测量与计算数据并行导出为 CSV 或 XY 文件。
//!
//! ## 依赖关系
//! - 使用 `cli/output.rs` 定义的参数
//! - 使用 `project/`, `batch/`

use crate::batch::{export_experiment, BatchRunner, ProcessResult};
use crate::cli::output::ExportArgs;
use crate::error::{DiffError, Result};
use crate::experiments::Experiment;
use crate::project::Project;
use crate::utils::output;

use std::fs;
use std::path::Path;

/// 导出单个实验
fn export_one(experiment: &Experiment, out_dir: &Path, args: &ExportArgs) -> ProcessResult {
    let name = experiment.name().to_string();
    let path = out_dir.join(format!("{}.{}", name, args.format.extension()));
    if path.exists() && !args.overwrite {
        return ProcessResult::Skipped(name);
    }
    match export_experiment(experiment, &path, args.format) {
        Ok(()) => ProcessResult::Success(name),
        Err(e) => ProcessResult::Failed(name, e.to_string()),
    }
}

/// 执行 export 命令
pub fn execute(args: ExportArgs) -> Result<()> {
    let mut project = Project::load(&args.dir)?;
    if project.experiments.is_empty() {
        output::print_warning("Project has no experiments to export");
        return Ok(());
    }
    project.calculate_all()?;

    let out_dir = args
        .output
        .clone()
        .unwrap_or_else(|| args.dir.join("export"));
    fs::create_dir_all(&out_dir).map_err(|e| DiffError::write(&out_dir, e))?;

    let runner = BatchRunner::new(args.jobs);
    output::print_info(&format!(
        "Exporting {} experiment(s) to {} using {} job(s)",
        project.experiments.len(),
        out_dir.display(),
        runner.jobs()
    ));

    let experiments: Vec<&Experiment> = project.experiments.iter().collect();
    let result = runner.run(&experiments, "Exporting", |experiment| {
        export_one(experiment, &out_dir, &args)
    })?;

    result.report("Exported");
    if result.skipped > 0 {
        output::print_skip("Existing files were kept, use --overwrite to replace them");
    }
    if result.failed > 0 {
        return Err(DiffError::Other(format!(
            "{} experiment(s) could not be exported",
            result.failed
        )));
    }
    Ok(())
}
