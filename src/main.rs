//! # diffrefine 命令行入口
//!
//! ## 子命令
//! - `new` / `info` - 创建项目、查看项目摘要
//! - `params` / `set` / `constrain` - 查看与修改参数、别名与约束
//! - `calc` / `fit` - 计算图样、精修参数
//! - `plot` / `export` - 绘图与数据导出
//! - `space-group` / `engines` - 查询空间群与可用引擎

use clap::Parser;
use diffrefine::cli::Cli;
use diffrefine::{commands, utils};

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();
    utils::output::set_verbosity(cli.verbosity);

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
