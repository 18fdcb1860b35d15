//! # 样品模型集合
//!
//! 项目中的全部样品模型，按名称索引。
//!
//! ## 依赖关系
//! - 被 `project/` 与 `analysis/` 使用

use crate::core::{Collection, HasParameters, Parameter};
use crate::error::{DiffError, Result};
use crate::parsers::{parse_cif_content, parse_cif_file};
use crate::sample_models::SampleModel;

use std::path::Path;

/// 样品模型集合
#[derive(Debug, Clone, Default)]
pub struct SampleModels {
    items: Collection<SampleModel>,
}

impl SampleModels {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加模型；同名模型被替换
    pub fn add(&mut self, model: SampleModel) -> Option<SampleModel> {
        self.items.add(model)
    }

    /// 从 CIF 文本添加全部数据块，返回添加的名称
    pub fn add_from_cif_str(&mut self, text: &str) -> Result<Vec<String>> {
        let doc = parse_cif_content(text)?;
        self.add_blocks(&doc)
    }

    pub fn add_from_cif_path(&mut self, path: &Path) -> Result<Vec<String>> {
        let doc = parse_cif_file(path)?;
        self.add_blocks(&doc)
    }

    fn add_blocks(&mut self, doc: &crate::parsers::CifDocument) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for block in &doc.blocks {
            let model = SampleModel::from_cif_block(block)?;
            names.push(model.name().to_string());
            self.add(model);
        }
        Ok(names)
    }

    pub fn remove(&mut self, name: &str) -> Result<SampleModel> {
        self.items
            .remove(name)
            .ok_or_else(|| DiffError::not_found("sample model", name))
    }

    pub fn get(&self, name: &str) -> Option<&SampleModel> {
        self.items.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut SampleModel> {
        self.items.get_mut(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.items.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SampleModel> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SampleModel> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 全部模型施加晶系约束
    pub fn apply_symmetry_constraints(&mut self) -> Result<()> {
        for model in self.items.iter_mut() {
            model.apply_symmetry_constraints()?;
        }
        Ok(())
    }
}

impl HasParameters for SampleModels {
    fn parameters(&self) -> Vec<&Parameter> {
        self.items.iter().flat_map(|m| m.parameters()).collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        self.items
            .iter_mut()
            .flat_map(|m| m.parameters_mut())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_multiple_blocks() {
        let mut models = SampleModels::new();
        let names = models
            .add_from_cif_str("data_a\n_cell.length_a 4\ndata_b\n_cell.length_a 5\n")
            .unwrap();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(models.len(), 2);
        assert!(models.remove("a").is_ok());
        assert!(models.remove("a").is_err());
    }
}
