//! # space-group 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/lookup.rs`

use clap::Args;

/// space-group 子命令参数
#[derive(Args, Debug)]
pub struct SpaceGroupArgs {
    /// Hermann-Mauguin symbol (e.g. "F d -3 m") or International Tables number
    pub symbol: String,

    /// Do not list the symmetry operators
    #[arg(long, default_value_t = false)]
    pub no_operators: bool,
}
