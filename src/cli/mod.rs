//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `new` / `info`：创建与查看项目
//! - `params` / `set` / `constrain`：参数与约束
//! - `calc` / `fit`：图样计算与拟合
//! - `plot` / `export`：图表与数据导出
//! - `space-group` / `engines`：查询内置表
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: project, params, analysis, output, lookup

pub mod analysis;
pub mod lookup;
pub mod output;
pub mod params;
pub mod project;

use crate::utils::output::Verbosity;

use clap::{Parser, Subcommand};

/// diffrefine - 衍射图样建模与精修工具箱
#[derive(Parser)]
#[command(name = "diffrefine")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Diffraction pattern modelling and refinement with CIF projects", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output verbosity
    #[arg(
        long,
        global = true,
        value_enum,
        env = "DIFFREFINE_VERBOSITY",
        default_value_t = Verbosity::Normal
    )]
    pub verbosity: Verbosity,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Create a project from sample-model CIFs, experiment CIFs and data files
    New(project::NewArgs),

    /// Show project info, sample models, experiments and analysis settings
    Info(project::InfoArgs),

    /// List refinable parameters
    Params(params::ParamsArgs),

    /// Change a parameter value, fit flag or fit range
    Set(params::SetArgs),

    /// Define aliases and constraints between parameters
    Constrain(params::ConstrainArgs),

    /// Calculate patterns and print agreement factors
    Calc(analysis::CalcArgs),

    /// Refine free parameters against measured data
    Fit(analysis::FitArgs),

    /// Plot measured vs calculated data of an experiment
    Plot(output::PlotArgs),

    /// Export measured and calculated patterns
    Export(output::ExportArgs),

    /// Look up a space group in the built-in table
    SpaceGroup(lookup::SpaceGroupArgs),

    /// List calculation and minimization engines
    Engines,
}

/// 解析 `key=value`
pub fn parse_key_value(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", input))?;
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() || value.is_empty() {
        return Err(format!("expected KEY=VALUE, got '{}'", input));
    }
    Ok((key.to_string(), value.to_string()))
}

/// 解析 `id=weight`
pub fn parse_weight(input: &str) -> Result<(String, f64), String> {
    let (key, value) = parse_key_value(input)?;
    let weight = value
        .parse::<f64>()
        .map_err(|_| format!("'{}' is not a number", value))?;
    Ok((key, weight))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("hrpt = data/hrpt.xye").unwrap(),
            ("hrpt".to_string(), "data/hrpt.xye".to_string())
        );
        assert!(parse_key_value("hrpt").is_err());
        assert!(parse_key_value("=x").is_err());
        assert_eq!(parse_weight("a=0.3").unwrap(), ("a".to_string(), 0.3));
        assert!(parse_weight("a=heavy").is_err());
    }
}
