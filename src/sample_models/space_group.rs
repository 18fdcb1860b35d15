//! # 空间群类别
//!
//! CIF 标签 `_space_group.name_H-M_alt` 与 `_space_group.IT_coordinate_system_code`。
//! 设置符号时查表并缓存完整对称操作集。
//!
//! ## 依赖关系
//! - 被 `sample_models/sample_model.rs` 使用
//! - 使用 `crystallography/space_groups.rs`

use crate::core::cif::CifWriter;
use crate::core::StringDescriptor;
use crate::crystallography::space_groups::{self, CrystalSystem, SpaceGroupEntry};
use crate::crystallography::SymOp;
use crate::error::{DiffError, Result};
use crate::parsers::CifBlock;

pub const CATEGORY: &str = "space_group";

const NAME_TAGS: &[&str] = &[
    "_space_group.name_H-M_alt",
    "_space_group_name_H-M_alt",
    "_symmetry_space_group_name_H-M",
];
const CODE_TAGS: &[&str] = &[
    "_space_group.IT_coordinate_system_code",
    "_space_group_IT_coordinate_system_code",
];

/// 空间群
#[derive(Debug, Clone)]
pub struct SpaceGroup {
    name_hm: StringDescriptor,
    coordinate_code: StringDescriptor,
    entry: &'static SpaceGroupEntry,
    operations: Vec<SymOp>,
}

impl SpaceGroup {
    /// 默认 `P 1`
    pub fn new() -> Result<Self> {
        let entry = space_groups::lookup("P 1")?;
        Ok(Self {
            name_hm: StringDescriptor::new("name_h_m", entry.name_hm)
                .cif(NAME_TAGS[0])
                .with_description("Hermann-Mauguin symbol of the space group")
                .category(CATEGORY),
            coordinate_code: StringDescriptor::new("it_coordinate_system_code", "")
                .cif(CODE_TAGS[0])
                .with_description("Coordinate system code (origin choice or axes setting)")
                .category(CATEGORY),
            entry,
            operations: entry.operations()?,
        })
    }

    /// 设置空间群符号，坐标系代码重置为表中默认
    pub fn set_name(&mut self, symbol: &str) -> Result<()> {
        let entry = space_groups::lookup(symbol)?;
        self.operations = entry.operations()?;
        self.entry = entry;
        self.name_hm.set_value(entry.name_hm)?;
        self.coordinate_code.set_value(entry.coordinate_code)?;
        Ok(())
    }

    /// 设置坐标系代码；内置表每个空间群只含一种设定
    pub fn set_coordinate_code(&mut self, code: &str) -> Result<()> {
        let code = code.trim();
        if code.is_empty() || code == "?" || code == "." {
            return Ok(());
        }
        if !self.entry.coordinate_code.is_empty()
            && !self.entry.coordinate_code.eq_ignore_ascii_case(code)
        {
            return Err(DiffError::InvalidChoice {
                name: format!("{} coordinate system code", self.entry.name_hm),
                value: code.to_string(),
                allowed: self.entry.coordinate_code.to_string(),
            });
        }
        self.coordinate_code.set_value(code)
    }

    pub fn name(&self) -> &str {
        self.name_hm.value()
    }

    pub fn coordinate_code(&self) -> &str {
        self.coordinate_code.value()
    }

    pub fn it_number(&self) -> u16 {
        self.entry.it_number
    }

    pub fn crystal_system(&self) -> CrystalSystem {
        self.entry.crystal_system()
    }

    pub fn operations(&self) -> &[SymOp] {
        &self.operations
    }

    pub fn from_cif(block: &CifBlock) -> Result<Self> {
        let mut sg = Self::new()?;
        if let Some(name) = block.find_any(NAME_TAGS) {
            sg.set_name(name)?;
        }
        if let Some(code) = block.find_any(CODE_TAGS) {
            sg.set_coordinate_code(code)?;
        }
        Ok(sg)
    }

    pub fn write_cif(&self, w: &mut CifWriter) {
        w.descriptor(&self.name_hm);
        if !self.coordinate_code.value().is_empty() {
            w.descriptor(&self.coordinate_code);
        }
    }

    pub(crate) fn bind(&mut self, datablock: &str) {
        self.name_hm.bind(datablock);
        self.coordinate_code.bind(datablock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse_cif_content;

    #[test]
    fn test_default_is_p1() {
        let sg = SpaceGroup::new().unwrap();
        assert_eq!(sg.name(), "P 1");
        assert_eq!(sg.operations().len(), 1);
    }

    #[test]
    fn test_set_name_normalizes_symbol() {
        let mut sg = SpaceGroup::new().unwrap();
        sg.set_name("Fd-3m").unwrap();
        assert_eq!(sg.name(), "F d -3 m");
        assert_eq!(sg.coordinate_code(), "2");
        assert_eq!(sg.it_number(), 227);
    }

    #[test]
    fn test_coordinate_code_mismatch() {
        let mut sg = SpaceGroup::new().unwrap();
        sg.set_name("F d -3 m").unwrap();
        assert!(sg.set_coordinate_code("1").is_err());
        assert!(sg.set_coordinate_code("2").is_ok());
    }

    #[test]
    fn test_from_cif_ddl1_alias() {
        let doc = parse_cif_content("data_x\n_symmetry_space_group_name_H-M 'P m -3 m'\n").unwrap();
        let sg = SpaceGroup::from_cif(&doc.blocks[0]).unwrap();
        assert_eq!(sg.it_number(), 221);
    }
}
