//! # 项目信息
//!
//! 项目标识、标题、描述与时间戳，对应 `project.cif` 中的 `_project.*`。
//!
//! ## 依赖关系
//! - 被 `project/manager.rs` 与 `project/summary.rs` 使用
//! - 使用 `chrono` 记录创建与修改时间

use crate::core::cif::{format_value, wrap_text, CifWriter};
use crate::error::{DiffError, Result};
use crate::parsers::{parse_cif_content, CifBlock};
use crate::sample_models::sample_model::validate_name;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// CIF 中的时间格式，如 `07 Mar 2025 14:05:31`
pub const TIMESTAMP_FORMAT: &str = "%d %b %Y %H:%M:%S";

/// 标题与描述的折行宽度
pub const WRAP_WIDTH: usize = 60;

const DEFAULT_NAME: &str = "untitled_project";
const DEFAULT_TITLE: &str = "Untitled Project";

/// 项目信息
#[derive(Debug, Clone, Serialize)]
pub struct ProjectInfo {
    name: String,
    title: String,
    description: String,
    path: Option<PathBuf>,
    created: NaiveDateTime,
    last_modified: NaiveDateTime,
}

impl Default for ProjectInfo {
    fn default() -> Self {
        let now = now();
        Self {
            name: DEFAULT_NAME.to_string(),
            title: DEFAULT_TITLE.to_string(),
            description: String::new(),
            path: None,
            created: now,
            last_modified: now,
        }
    }
}

fn now() -> NaiveDateTime {
    // CIF 只保存到秒
    let text = Local::now().naive_local().format(TIMESTAMP_FORMAT).to_string();
    NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| Local::now().naive_local())
}

/// 将连续空白压缩为单个空格
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).ok()
}

impl ProjectInfo {
    pub fn new(name: &str) -> Result<Self> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            ..Self::default()
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.name = name.to_string();
        Ok(())
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = normalize(title);
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = normalize(description);
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: &Path) {
        self.path = Some(path.to_path_buf());
    }

    pub fn created(&self) -> NaiveDateTime {
        self.created
    }

    pub fn last_modified(&self) -> NaiveDateTime {
        self.last_modified
    }

    /// 更新修改时间
    pub fn touch(&mut self) {
        self.last_modified = now();
    }

    // ─────────────────────────────────────────────────────────────
    // CIF
    // ─────────────────────────────────────────────────────────────

    pub fn to_cif(&self) -> String {
        let mut w = CifWriter::new();
        w.data_block(&self.name)
            .blank()
            .item("_project.id", &format_value(&self.name));
        write_wrapped(&mut w, "_project.title", &self.title);
        write_wrapped(&mut w, "_project.description", &self.description);
        w.item(
            "_project.created",
            &format_value(&self.created.format(TIMESTAMP_FORMAT).to_string()),
        )
        .item(
            "_project.last_modified",
            &format_value(&self.last_modified.format(TIMESTAMP_FORMAT).to_string()),
        );
        w.finish()
    }

    pub fn from_cif_block(block: &CifBlock) -> Result<Self> {
        let mut info = Self::default();
        let name = block.find_value("_project.id").unwrap_or(&block.name);
        info.set_name(name)?;
        if let Some(title) = block.find_value("_project.title") {
            info.set_title(title);
        }
        if let Some(description) = block.find_value("_project.description") {
            info.set_description(description);
        }
        if let Some(created) = block.find_value("_project.created").and_then(parse_timestamp) {
            info.created = created;
        }
        if let Some(modified) = block
            .find_value("_project.last_modified")
            .and_then(parse_timestamp)
        {
            info.last_modified = modified;
        }
        Ok(info)
    }

    pub fn from_cif_str(text: &str) -> Result<Self> {
        let doc = parse_cif_content(text)?;
        let block = doc.first().ok_or_else(|| DiffError::MissingCifItem {
            block: "project".to_string(),
            tag: "data_".to_string(),
        })?;
        Self::from_cif_block(block)
    }
}

/// 超过折行宽度的值写为文本字段
fn write_wrapped(w: &mut CifWriter, tag: &str, text: &str) {
    let lines = wrap_text(text, WRAP_WIDTH);
    if lines.len() > 1 {
        w.text_field(tag, &lines.join("\n"));
    } else {
        w.item(tag, &format_value(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let info = ProjectInfo::default();
        assert_eq!(info.name(), "untitled_project");
        assert_eq!(info.title(), "Untitled Project");
        assert!(info.description().is_empty());
        assert!(info.path().is_none());
    }

    #[test]
    fn test_description_is_normalized() {
        let mut info = ProjectInfo::default();
        info.set_description("  La0.5Ba0.5CoO3\n   refined   against HRPT  ");
        assert_eq!(info.description(), "La0.5Ba0.5CoO3 refined against HRPT");
    }

    #[test]
    fn test_invalid_name() {
        assert!(ProjectInfo::new("my project").is_err());
    }

    #[test]
    fn test_cif_round_trip_with_long_description() {
        let mut info = ProjectInfo::new("lbco_hrpt").unwrap();
        info.set_title("La0.5Ba0.5CoO3 at HRPT@PSI");
        info.set_description(
            "This project demonstrates a standard refinement of La0.5Ba0.5CoO3, \
             which crystallizes in a perovskite-type structure, using neutron \
             powder diffraction data collected in constant wavelength mode",
        );
        let text = info.to_cif();
        assert!(text.contains("_project.id lbco_hrpt"));
        assert!(text.contains("_project.description\n;"));

        let loaded = ProjectInfo::from_cif_str(&text).unwrap();
        assert_eq!(loaded.name(), "lbco_hrpt");
        assert_eq!(loaded.title(), info.title());
        assert_eq!(loaded.description(), info.description());
        assert_eq!(loaded.created(), info.created());
    }

    #[test]
    fn test_timestamp_format() {
        let ts = parse_timestamp("07 Mar 2025 14:05:31").unwrap();
        assert_eq!(ts.format(TIMESTAMP_FORMAT).to_string(), "07 Mar 2025 14:05:31");
    }
}
