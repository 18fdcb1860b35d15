//! # 实验集合
//!
//! 项目中的全部实验，按名称索引。
//!
//! ## 依赖关系
//! - 被 `project/` 与 `analysis/` 使用

use crate::core::{Collection, HasParameters, Parameter};
use crate::error::{DiffError, Result};
use crate::experiments::{Experiment, ExperimentType};
use crate::parsers::parse_cif_content;

use std::path::Path;

/// 实验集合
#[derive(Debug, Clone, Default)]
pub struct Experiments {
    items: Collection<Experiment>,
}

impl Experiments {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加实验；同名实验被替换
    pub fn add(&mut self, experiment: Experiment) -> Option<Experiment> {
        self.items.add(experiment)
    }

    /// 从 CIF 文本添加全部数据块，返回添加的名称
    pub fn add_from_cif_str(&mut self, text: &str) -> Result<Vec<String>> {
        let doc = parse_cif_content(text)?;
        let mut names = Vec::new();
        for block in &doc.blocks {
            let experiment = Experiment::from_cif_block(block)?;
            names.push(experiment.name().to_string());
            self.add(experiment);
        }
        Ok(names)
    }

    pub fn add_from_cif_path(&mut self, path: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for experiment in Experiment::from_cif_path(path)? {
            names.push(experiment.name().to_string());
            self.add(experiment);
        }
        Ok(names)
    }

    /// 从测量数据文件添加
    pub fn add_from_data_path(
        &mut self,
        name: &str,
        expt_type: ExperimentType,
        path: &Path,
    ) -> Result<()> {
        self.add(Experiment::from_data_file(name, expt_type, path)?);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<Experiment> {
        self.items
            .remove(name)
            .ok_or_else(|| DiffError::not_found("experiment", name))
    }

    pub fn get(&self, name: &str) -> Option<&Experiment> {
        self.items.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Experiment> {
        self.items.get_mut(name)
    }

    pub fn ids(&self) -> Vec<String> {
        self.items.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Experiment> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Experiment> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl HasParameters for Experiments {
    fn parameters(&self) -> Vec<&Parameter> {
        self.items.iter().flat_map(|e| e.parameters()).collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        self.items
            .iter_mut()
            .flat_map(|e| e.parameters_mut())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_remove() {
        let mut experiments = Experiments::new();
        let names = experiments
            .add_from_cif_str("data_a\n_instr.wavelength 1.2\ndata_b\n_expt_type.beam_mode tof\n")
            .unwrap();
        assert_eq!(names, vec!["a", "b"]);
        assert!(experiments.get("b").unwrap().expt_type().is_tof());
        assert!(experiments.remove("a").is_ok());
        assert_eq!(experiments.ids(), vec!["b"]);
        assert!(experiments.remove("zzz").is_err());
    }
}
