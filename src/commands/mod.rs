//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `project/`, `analysis/`, `display/`, `utils/`
//! - 子模块: project, params, analysis, plot, export, lookup

pub mod analysis;
pub mod export;
pub mod lookup;
pub mod params;
pub mod plot;
pub mod project;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::New(args) => project::execute_new(args),
        Commands::Info(args) => project::execute_info(args),
        Commands::Params(args) => params::execute_params(args),
        Commands::Set(args) => params::execute_set(args),
        Commands::Constrain(args) => params::execute_constrain(args),
        Commands::Calc(args) => analysis::execute_calc(args),
        Commands::Fit(args) => analysis::execute_fit(args),
        Commands::Plot(args) => plot::execute(args),
        Commands::Export(args) => export::execute(args),
        Commands::SpaceGroup(args) => lookup::execute_space_group(args),
        Commands::Engines => lookup::execute_engines(),
    }
}
