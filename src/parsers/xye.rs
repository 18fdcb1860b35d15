//! # 测量数据列格式解析器
//!
//! 解析 `x y [sy]` 三列数据（.xye / .xy / .dat），分隔符为空白或逗号。
//!
//! ## 规则
//! - `#` 与 `!` 开头的行为注释
//! - 缺少 `sy` 时取 `sqrt(y)`，y <= 0 时取 1
//! - 所有数值必须有限，x 必须严格单调递增
//!
//! ## 依赖关系
//! - 被 `experiments/experiment.rs` 使用

use crate::error::{DiffError, Result};

use std::fs;
use std::path::Path;

/// 测量数据列
#[derive(Debug, Clone, Default)]
pub struct MeasuredColumns {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub sy: Vec<f64>,
}

impl MeasuredColumns {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// 解析数据文件
pub fn parse_xye_file(path: &Path) -> Result<MeasuredColumns> {
    let content = fs::read_to_string(path).map_err(|e| DiffError::read(path, e))?;
    parse_xye_content(&content).map_err(|reason| DiffError::ParseError {
        format: "xye".to_string(),
        path: path.display().to_string(),
        reason,
    })
}

/// 从字符串内容解析
pub fn parse_xye_content(content: &str) -> std::result::Result<MeasuredColumns, String> {
    let mut columns = MeasuredColumns::default();

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .collect();

        if fields.len() < 2 {
            return Err(format!("line {}: expected at least 2 columns", i + 1));
        }

        let parse = |s: &str| -> std::result::Result<f64, String> {
            match s.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                Ok(_) => Err(format!("line {}: '{}' is not a finite number", i + 1, s)),
                Err(_) => Err(format!("line {}: '{}' is not a number", i + 1, s)),
            }
        };

        let x = parse(fields[0])?;
        let y = parse(fields[1])?;
        let sy = match fields.get(2) {
            Some(s) => parse(s)?,
            None if y > 0.0 => y.sqrt(),
            None => 1.0,
        };

        if let Some(&last) = columns.x.last() {
            if x <= last {
                return Err(format!(
                    "line {}: x values must increase ({} after {})",
                    i + 1,
                    x,
                    last
                ));
            }
        }

        columns.x.push(x);
        columns.y.push(y);
        columns.sy.push(if sy > 0.0 { sy } else { 1.0 });
    }

    if columns.is_empty() {
        return Err("no data points".to_string());
    }

    Ok(columns)
}

/// 检查 x 轴有限且严格递增；返回首个违规点的描述
pub fn check_x_axis(x: &[f64]) -> std::result::Result<(), String> {
    if let Some(i) = x.iter().position(|v| !v.is_finite()) {
        return Err(format!("point {}: x value {} is not finite", i + 1, x[i]));
    }
    match x.windows(2).position(|w| w[1] <= w[0]) {
        Some(i) => Err(format!(
            "point {}: x values must increase ({} after {})",
            i + 2,
            x[i + 1],
            x[i]
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_columns() {
        let data = "# 2theta I sI\n10.0 100 10\n10.1, 121, 11\n";
        let cols = parse_xye_content(data).unwrap();
        assert_eq!(cols.len(), 2);
        assert_eq!(cols.sy, vec![10.0, 11.0]);
    }

    #[test]
    fn test_two_columns_default_su() {
        let cols = parse_xye_content("1 16\n2 0\n").unwrap();
        assert_eq!(cols.sy, vec![4.0, 1.0]);
    }

    #[test]
    fn test_non_monotonic_rejected() {
        assert!(parse_xye_content("2 1\n1 1\n").is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(parse_xye_content("nan 10\n1 10\n2 10\n").is_err());
        assert!(parse_xye_content("1 inf\n2 10\n").is_err());
        assert!(parse_xye_content("1 10 NaN\n2 10 1\n").is_err());
    }

    #[test]
    fn test_check_x_axis() {
        assert!(check_x_axis(&[1.0, 2.0, 3.0]).is_ok());
        assert!(check_x_axis(&[]).is_ok());
        assert!(check_x_axis(&[1.0, 1.0]).is_err());
        assert!(check_x_axis(&[3.0, 2.0, 1.0]).is_err());
        assert!(check_x_axis(&[1.0, f64::NAN, 3.0]).is_err());
    }

    #[test]
    fn test_empty_rejected() {
        assert!(parse_xye_content("# nothing\n").is_err());
    }
}
