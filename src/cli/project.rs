//! # new / info 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/project.rs`

use crate::cli::parse_key_value;
use crate::experiments::{BeamMode, RadiationProbe, SampleForm, ScatteringType};

use clap::Args;
use std::path::PathBuf;

/// 预定义辐射源波长 (Å)
pub fn get_predefined_wavelength(name: &str) -> Option<f64> {
    match name.to_lowercase().as_str() {
        "cu-ka" | "cuka" => Some(1.5418),
        "cu-ka1" | "cuka1" => Some(1.5406),
        "mo-ka" | "moka" => Some(0.7107),
        "mo-ka1" | "moka1" => Some(0.7093),
        "co-ka" | "coka" => Some(1.7903),
        "ag-ka" | "agka" => Some(0.5609),
        _ => None,
    }
}

/// 解析波长输入（辐射源名称或数值）
pub fn parse_wavelength(input: &str) -> Result<f64, String> {
    if let Some(wl) = get_predefined_wavelength(input) {
        return Ok(wl);
    }
    match input.parse::<f64>() {
        Ok(v) if v > 0.0 => Ok(v),
        _ => Err(format!(
            "Invalid wavelength '{}'. Use a positive number (e.g., 1.494) or a name: cu-ka, mo-ka, co-ka, ag-ka",
            input
        )),
    }
}

/// 解析排除区间 `START:END`
pub fn parse_region(input: &str) -> Result<(f64, f64), String> {
    let invalid = || format!("Invalid region '{}'. Use START:END (e.g., 0:10.5)", input);
    let (start, end) = input.split_once(':').ok_or_else(invalid)?;
    let start: f64 = start.trim().parse().map_err(|_| invalid())?;
    let end: f64 = end.trim().parse().map_err(|_| invalid())?;
    if !start.is_finite() || !end.is_finite() || start > end {
        return Err(invalid());
    }
    Ok((start, end))
}

/// new 子命令参数
#[derive(Args, Debug)]
pub struct NewArgs {
    /// Project directory to create
    pub dir: PathBuf,

    /// Project name (defaults to the directory name)
    #[arg(long)]
    pub name: Option<String>,

    /// Project title
    #[arg(long)]
    pub title: Option<String>,

    /// Project description
    #[arg(long)]
    pub description: Option<String>,

    /// Sample-model CIF file, or a directory of them (repeatable)
    #[arg(short, long = "model")]
    pub models: Vec<PathBuf>,

    /// Experiment CIF file, or a directory of them (repeatable)
    #[arg(short, long = "experiment")]
    pub experiments: Vec<PathBuf>,

    /// Measured data file as NAME=PATH (repeatable)
    #[arg(short, long = "data", value_parser = parse_key_value)]
    pub data: Vec<(String, String)>,

    /// Sample form for --data experiments
    #[arg(long, value_enum, default_value_t = SampleForm::Powder)]
    pub sample_form: SampleForm,

    /// Beam mode for --data experiments
    #[arg(long, value_enum, default_value_t = BeamMode::ConstantWavelength)]
    pub beam_mode: BeamMode,

    /// Radiation probe for --data experiments
    #[arg(long, value_enum, default_value_t = RadiationProbe::Neutron)]
    pub radiation_probe: RadiationProbe,

    /// Scattering type for --data experiments
    #[arg(long, value_enum, default_value_t = ScatteringType::Bragg)]
    pub scattering_type: ScatteringType,

    /// Wavelength for constant-wavelength --data experiments: name (cu-ka, mo-ka, ...) or value in Å
    #[arg(short, long, value_parser = parse_wavelength)]
    pub wavelength: Option<f64>,

    /// Region of --data experiments left out of fits, as START:END (repeatable)
    #[arg(long = "exclude", value_parser = parse_region, allow_hyphen_values = true)]
    pub excluded: Vec<(f64, f64)>,

    /// Sample model linked to --data experiments (repeatable; default: the only model)
    #[arg(long = "link")]
    pub links: Vec<String>,

    /// Overwrite an existing project in the directory
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

/// info 子命令参数
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Project directory
    pub dir: PathBuf,

    /// Print the summary as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Also print each experiment in CIF form (data truncated)
    #[arg(long, default_value_t = false)]
    pub cif: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wavelength() {
        assert_eq!(parse_wavelength("cu-ka1").unwrap(), 1.5406);
        assert_eq!(parse_wavelength("1.494").unwrap(), 1.494);
        assert!(parse_wavelength("-1").is_err());
        assert!(parse_wavelength("sunlight").is_err());
    }

    #[test]
    fn test_parse_region() {
        assert_eq!(parse_region("0:10.5").unwrap(), (0.0, 10.5));
        assert_eq!(parse_region("-5 : 3").unwrap(), (-5.0, 3.0));
        assert!(parse_region("10:5").is_err());
        assert!(parse_region("10").is_err());
        assert!(parse_region("a:b").is_err());
    }
}
