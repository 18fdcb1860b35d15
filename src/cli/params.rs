//! # params / set / constrain 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/params.rs`

use crate::cli::parse_key_value;

use clap::Args;
use std::path::PathBuf;

/// params 子命令参数
#[derive(Args, Debug)]
pub struct ParamsArgs {
    /// Project directory
    pub dir: PathBuf,

    /// Only list free parameters
    #[arg(long, default_value_t = false)]
    pub free: bool,

    /// Only list parameters whose full name contains this text
    #[arg(long)]
    pub filter: Option<String>,
}

/// set 子命令参数
#[derive(Args, Debug)]
pub struct SetArgs {
    /// Project directory
    pub dir: PathBuf,

    /// Full parameter name, e.g. lbco.cell.length_a
    pub name: String,

    /// New value
    #[arg(long, allow_hyphen_values = true)]
    pub value: Option<f64>,

    /// Refine the parameter during fitting
    #[arg(long, default_value_t = false, conflicts_with = "fix")]
    pub free: bool,

    /// Keep the parameter fixed during fitting
    #[arg(long, default_value_t = false)]
    pub fix: bool,

    /// Lower bound used during fitting
    #[arg(long, allow_hyphen_values = true)]
    pub fit_min: Option<f64>,

    /// Upper bound used during fitting
    #[arg(long, allow_hyphen_values = true)]
    pub fit_max: Option<f64>,
}

/// constrain 子命令参数
#[derive(Args, Debug)]
pub struct ConstrainArgs {
    /// Project directory
    pub dir: PathBuf,

    /// Alias as LABEL=FULL.PARAMETER.NAME (repeatable)
    #[arg(short, long = "alias", value_parser = parse_key_value)]
    pub aliases: Vec<(String, String)>,

    /// Constraint equation "lhs = expression" (repeatable)
    #[arg(short, long = "expr")]
    pub expressions: Vec<String>,

    /// Remove the constraint whose left-hand alias is given (repeatable)
    #[arg(short, long = "remove")]
    pub remove: Vec<String>,
}
