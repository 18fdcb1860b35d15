//! # 图样导出
//!
//! 将实验的测量与计算数据导出为 CSV 或 XY 文本。
//!
//! ## 支持格式
//! - CSV: 粉末为 x, 测量强度, 不确定度, 计算强度, 背景, 状态；单晶为 h, k, l, d, 测量, 不确定度, 计算
//! - XY: `#` 注释头加空白分隔列，可被 `parsers/xye.rs` 读回
//!
//! ## 依赖关系
//! - 被 `commands/export.rs` 调用
//! - 使用 `csv` 库写入 CSV 文件

use crate::error::{DiffError, Result};
use crate::experiments::{Experiment, ExperimentData, PowderData, Reflections, XKind};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    /// Comma separated values with a header row
    #[default]
    Csv,
    /// Whitespace separated columns with comment header
    Xy,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xy => "xy",
        }
    }
}

fn x_column(kind: XKind) -> &'static str {
    match kind {
        XKind::TwoTheta => "2theta",
        XKind::TimeOfFlight => "time_of_flight",
        XKind::R => "r",
    }
}

/// 导出单个实验
pub fn export_experiment(experiment: &Experiment, path: &Path, format: ExportFormat) -> Result<()> {
    match (&experiment.data, format) {
        (ExperimentData::Powder(data), ExportFormat::Csv) => powder_to_csv(data, path),
        (ExperimentData::Powder(data), ExportFormat::Xy) => {
            powder_to_xy(data, experiment.name(), path)
        }
        (ExperimentData::SingleCrystal(refl), ExportFormat::Csv) => reflections_to_csv(refl, path),
        (ExperimentData::SingleCrystal(refl), ExportFormat::Xy) => {
            reflections_to_xy(refl, experiment.name(), path)
        }
    }
}

fn powder_to_csv(data: &PowderData, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        x_column(data.x_kind),
        "intensity_meas",
        "intensity_meas_su",
        "intensity_calc",
        "intensity_bkg",
        "status",
    ])?;
    for i in 0..data.len() {
        wtr.write_record(&[
            format!("{:.4}", data.x[i]),
            format!("{:.4}", data.intensity_meas[i]),
            format!("{:.4}", data.intensity_meas_su[i]),
            format!("{:.4}", data.intensity_calc[i]),
            format!("{:.4}", data.intensity_bkg[i]),
            data.status[i].as_str().to_string(),
        ])?;
    }
    wtr.flush().map_err(|e| DiffError::write(path, e))?;
    Ok(())
}

fn reflections_to_csv(refl: &Reflections, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "h",
        "k",
        "l",
        "d_spacing",
        "intensity_meas",
        "intensity_meas_su",
        "intensity_calc",
    ])?;
    for r in &refl.items {
        wtr.write_record(&[
            r.hkl[0].to_string(),
            r.hkl[1].to_string(),
            r.hkl[2].to_string(),
            format!("{:.5}", r.d_spacing),
            format!("{:.4}", r.intensity_meas),
            format!("{:.4}", r.intensity_meas_su),
            format!("{:.4}", r.intensity_calc),
        ])?;
    }
    wtr.flush().map_err(|e| DiffError::write(path, e))?;
    Ok(())
}

fn powder_to_xy(data: &PowderData, name: &str, path: &Path) -> Result<()> {
    let mut lines = vec![
        format!("# Experiment: {}", name),
        format!(
            "# Columns: {}, intensity_meas, intensity_meas_su, intensity_calc",
            x_column(data.x_kind)
        ),
    ];
    for i in 0..data.len() {
        lines.push(format!(
            "{:.4}\t{:.4}\t{:.4}\t{:.4}",
            data.x[i], data.intensity_meas[i], data.intensity_meas_su[i], data.intensity_calc[i]
        ));
    }
    write_lines(path, &lines)
}

fn reflections_to_xy(refl: &Reflections, name: &str, path: &Path) -> Result<()> {
    let mut lines = vec![
        format!("# Experiment: {}", name),
        "# Columns: h, k, l, intensity_meas, intensity_meas_su, intensity_calc".to_string(),
    ];
    for r in &refl.items {
        lines.push(format!(
            "{}\t{}\t{}\t{:.4}\t{:.4}\t{:.4}",
            r.hkl[0], r.hkl[1], r.hkl[2], r.intensity_meas, r.intensity_meas_su, r.intensity_calc
        ));
    }
    write_lines(path, &lines)
}

fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    let file = File::create(path).map_err(|e| DiffError::write(path, e))?;
    let mut out = BufWriter::new(file);
    for line in lines {
        writeln!(out, "{}", line).map_err(|e| DiffError::write(path, e))?;
    }
    out.flush().map_err(|e| DiffError::write(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiments::ExperimentType;
    use crate::parsers::{parse_xye_file, MeasuredColumns};
    use tempfile::tempdir;

    fn experiment() -> Experiment {
        let mut expt = Experiment::new("hrpt", ExperimentType::default()).unwrap();
        let mut data = PowderData::from_columns(
            XKind::TwoTheta,
            MeasuredColumns {
                x: vec![10.0, 10.1, 10.2],
                y: vec![100.0, 150.0, 120.0],
                sy: vec![10.0, 12.2, 11.0],
            },
        );
        data.intensity_calc = vec![101.0, 148.0, 119.5];
        expt.data = ExperimentData::Powder(data);
        expt
    }

    #[test]
    fn test_csv_export() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hrpt.csv");
        export_experiment(&experiment(), &path, ExportFormat::Csv).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("2theta,intensity_meas,intensity_meas_su,intensity_calc,intensity_bkg,status")
        );
        assert_eq!(
            lines.next(),
            Some("10.0000,100.0000,10.0000,101.0000,0.0000,incl")
        );
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_csv_header_names_time_axis() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tof.csv");
        let mut expt = experiment();
        if let ExperimentData::Powder(data) = &mut expt.data {
            data.x_kind = XKind::TimeOfFlight;
        }
        export_experiment(&expt, &path, ExportFormat::Csv).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("time_of_flight,intensity_meas,"));
    }

    #[test]
    fn test_xy_export_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hrpt.xy");
        export_experiment(&experiment(), &path, ExportFormat::Xy).unwrap();
        let columns = parse_xye_file(&path).unwrap();
        assert_eq!(columns.len(), 3);
        assert!((columns.y[1] - 150.0).abs() < 1e-9);
        assert!((columns.sy[2] - 11.0).abs() < 1e-9);
    }
}
