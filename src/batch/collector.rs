//! # 文件收集器
//!
//! 根据输入路径和模式收集 CIF 与数据文件。
//!
//! ## 功能
//! - 支持单文件和目录输入
//! - glob 模式匹配（逗号分隔多模式）
//! - 可选递归搜索
//! - 结果按路径排序，保证项目加载顺序稳定
//!
//! ## 依赖关系
//! - 被 `project/manager.rs` 与 `commands/project.rs` 调用
//! - 使用 `walkdir` 遍历目录，`glob` 匹配文件名

use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 文件收集器
pub struct FileCollector {
    /// 输入路径
    input: PathBuf,
    /// 匹配模式列表
    patterns: Vec<Pattern>,
    /// 是否递归
    recursive: bool,
}

impl FileCollector {
    /// 创建新的文件收集器，默认匹配全部文件
    pub fn new(input: &Path) -> Self {
        Self {
            input: input.to_path_buf(),
            patterns: Vec::new(),
            recursive: false,
        }
    }

    /// 设置匹配模式（逗号分隔），非法模式被忽略
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.patterns = pattern
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| Pattern::new(s).ok())
            .collect();
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集所有匹配的文件
    pub fn collect(&self) -> Vec<PathBuf> {
        if self.input.is_file() {
            return vec![self.input.clone()];
        }
        if !self.input.is_dir() {
            return vec![];
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut files: Vec<PathBuf> = WalkDir::new(&self.input)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| self.matches(e.path()))
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        files
    }

    fn matches(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => return false,
        };
        self.patterns.iter().any(|p| p.matches(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_collect_sorted_with_pattern() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.cif"), "").unwrap();
        fs::write(dir.path().join("a.cif"), "").unwrap();
        fs::write(dir.path().join("data.xye"), "").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.cif"), "").unwrap();

        let files = FileCollector::new(dir.path()).with_pattern("*.cif").collect();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.cif", "b.cif"]);

        let all = FileCollector::new(dir.path())
            .with_pattern("*.cif, *.xye")
            .recursive(true)
            .collect();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_single_file_and_missing_input() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("model.cif");
        fs::write(&file, "").unwrap();
        assert_eq!(FileCollector::new(&file).collect(), vec![file]);
        assert!(FileCollector::new(&dir.path().join("nope")).collect().is_empty());
    }
}
