//! # 解析器模块
//!
//! 提供 CIF、测量数据列与单晶反射列表的解析器。
//!
//! ## 依赖关系
//! - 被 `sample_models/`、`experiments/`、`project/` 使用
//! - 子模块: cif, xye, hkl

pub mod cif;
pub mod hkl;
pub mod xye;

pub use cif::{parse_cif_content, parse_cif_file, CifBlock, CifDocument, CifLoop};
pub use hkl::{parse_hkl_file, MeasuredReflection};
pub use xye::{check_x_axis, parse_xye_file, MeasuredColumns};

use std::path::Path;

/// 数据文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// CIF 文本
    Cif,
    /// 测量数据列
    Columns,
    /// 单晶反射列表
    Reflections,
}

/// 从文件扩展名推断输入类型
pub fn detect_kind(path: &Path) -> InputKind {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .as_deref()
    {
        Some("cif") | Some("mcif") | Some("rcif") => InputKind::Cif,
        Some("hkl") | Some("int") => InputKind::Reflections,
        _ => InputKind::Columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_kind() {
        assert_eq!(detect_kind(Path::new("a/lbco.CIF")), InputKind::Cif);
        assert_eq!(detect_kind(Path::new("hrpt.xye")), InputKind::Columns);
        assert_eq!(detect_kind(Path::new("data")), InputKind::Columns);
        assert_eq!(detect_kind(Path::new("tbti.hkl")), InputKind::Reflections);
    }
}
