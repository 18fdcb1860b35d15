//! # 单晶反射列表解析器
//!
//! 解析 `h k l I sI` 五列文本（.hkl / .int），空白分隔。
//! `#` 开头为注释，缺少 sI 时取 `sqrt(|I|)`（至少 1）。
//!
//! ## 依赖关系
//! - 被 `experiments/experiment.rs` 使用

use crate::error::{DiffError, Result};

use std::fs;
use std::path::Path;

/// 单条测量反射
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasuredReflection {
    pub hkl: [i32; 3],
    pub intensity: f64,
    pub sigma: f64,
}

pub fn parse_hkl_file(path: &Path) -> Result<Vec<MeasuredReflection>> {
    let content = fs::read_to_string(path).map_err(|e| DiffError::read(path, e))?;
    parse_hkl_content(&content).map_err(|reason| DiffError::ParseError {
        format: "hkl".to_string(),
        path: path.display().to_string(),
        reason,
    })
}

pub fn parse_hkl_content(content: &str) -> std::result::Result<Vec<MeasuredReflection>, String> {
    let mut reflections = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(format!("line {}: expected h k l I [sI]", i + 1));
        }
        let index = |s: &str| {
            s.parse::<i32>()
                .map_err(|_| format!("line {}: '{}' is not a Miller index", i + 1, s))
        };
        let number = |s: &str| {
            s.parse::<f64>()
                .map_err(|_| format!("line {}: '{}' is not a number", i + 1, s))
        };
        let hkl = [index(fields[0])?, index(fields[1])?, index(fields[2])?];
        if hkl == [0, 0, 0] {
            continue;
        }
        let intensity = number(fields[3])?;
        let sigma = match fields.get(4) {
            Some(s) => number(s)?,
            None => intensity.abs().sqrt(),
        };
        reflections.push(MeasuredReflection {
            hkl,
            intensity,
            sigma: if sigma > 0.0 { sigma } else { 1.0 },
        });
    }
    if reflections.is_empty() {
        return Err("no reflections".to_string());
    }
    Ok(reflections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reflections() {
        let refl = parse_hkl_content("# h k l I sI\n1 0 0 100 5\n0 0 0 9 9\n1 1 0 16\n").unwrap();
        assert_eq!(refl.len(), 2);
        assert_eq!(refl[0].hkl, [1, 0, 0]);
        assert_eq!(refl[1].sigma, 4.0);
    }

    #[test]
    fn test_bad_index() {
        assert!(parse_hkl_content("1.5 0 0 1 1\n").is_err());
    }
}
