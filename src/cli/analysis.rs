//! # calc / fit 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/analysis.rs`

use crate::analysis::FitMode;
use crate::cli::parse_weight;

use clap::Args;
use std::path::PathBuf;

/// calc 子命令参数
#[derive(Args, Debug)]
pub struct CalcArgs {
    /// Project directory
    pub dir: PathBuf,

    /// Only calculate this experiment
    #[arg(short, long)]
    pub experiment: Option<String>,

    /// Calculation engine (overrides analysis.cif for this run)
    #[arg(long)]
    pub calculator: Option<String>,
}

/// fit 子命令参数
#[derive(Args, Debug)]
pub struct FitArgs {
    /// Project directory
    pub dir: PathBuf,

    /// Minimization engine (lm, simplex)
    #[arg(short, long)]
    pub minimizer: Option<String>,

    /// Calculation engine
    #[arg(long)]
    pub calculator: Option<String>,

    /// Fit mode: each experiment separately or all jointly
    #[arg(long, value_enum)]
    pub mode: Option<FitMode>,

    /// Joint-fit weight as EXPERIMENT=WEIGHT (repeatable)
    #[arg(short, long = "weight", value_parser = parse_weight)]
    pub weights: Vec<(String, f64)>,

    /// Maximum number of minimizer iterations
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Do not write the refined project back to disk
    #[arg(long, default_value_t = false)]
    pub no_save: bool,

    /// Print fit results as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
