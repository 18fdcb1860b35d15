//! # plot / export 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/plot.rs` 与 `commands/export.rs`

use crate::batch::ExportFormat;
use crate::display::PlotBackend;

use clap::Args;
use std::path::PathBuf;

/// plot 子命令参数
#[derive(Args, Debug)]
pub struct PlotArgs {
    /// Project directory
    pub dir: PathBuf,

    /// Experiment to plot (may be omitted when the project has one)
    #[arg(short, long)]
    pub experiment: Option<String>,

    /// Plotting backend
    #[arg(
        short,
        long,
        value_enum,
        env = "DIFFREFINE_PLOT_BACKEND",
        default_value_t = PlotBackend::Ascii
    )]
    pub backend: PlotBackend,

    /// Output file for png/svg backends (default: <dir>/<experiment>.<ext>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Lower limit of the x range
    #[arg(long, allow_hyphen_values = true)]
    pub x_min: Option<f64>,

    /// Upper limit of the x range
    #[arg(long, allow_hyphen_values = true)]
    pub x_max: Option<f64>,

    /// Add the residual (Imeas - Icalc) series
    #[arg(long, default_value_t = false)]
    pub residual: bool,

    /// Add the background series
    #[arg(long, default_value_t = false)]
    pub background: bool,

    /// Chart height: text rows (ascii) or pixels (png/svg)
    #[arg(long)]
    pub height: Option<u32>,
}

/// export 子命令参数
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Project directory
    pub dir: PathBuf,

    /// Output directory (default: <dir>/export)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
    pub format: ExportFormat,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, env = "DIFFREFINE_JOBS", default_value_t = 0)]
    pub jobs: usize,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
