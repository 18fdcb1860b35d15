//! # 样品模型（晶体结构数据块）
//!
//! 一个样品模型由空间群、晶胞与原子位置组成，对应 CIF 中的一个数据块。
//!
//! ## 功能
//! - CIF 读写
//! - 晶系约束（晶胞参数）
//! - 对称展开得到晶胞内全部原子
//!
//! ## 依赖关系
//! - 被 `sample_models/collection.rs`、`analysis/`、`project/` 使用
//! - 子组件: space_group, cell, atom_sites

use crate::core::cif::CifWriter;
use crate::core::{HasParameters, Keyed, Parameter};
use crate::crystallography::symmetry::equivalent_positions;
use crate::crystallography::Lattice;
use crate::error::{DiffError, Result};
use crate::parsers::{parse_cif_content, CifBlock};
use crate::sample_models::atom_sites::{
    atom_sites_from_cif, write_atom_sites, AtomSite, AtomSites, LABEL_PATTERN,
};
use crate::sample_models::cell::Cell;
use crate::sample_models::space_group::SpaceGroup;

use regex::Regex;

/// 晶胞内的一个原子（对称展开后）
#[derive(Debug, Clone)]
pub struct UnitCellAtom {
    pub label: String,
    pub type_symbol: String,
    pub position: [f64; 3],
    pub occupancy: f64,
    /// 位移参数 B (Å²)
    pub b_iso: f64,
}

/// 样品模型
#[derive(Debug, Clone)]
pub struct SampleModel {
    name: String,
    pub space_group: SpaceGroup,
    pub cell: Cell,
    pub atom_sites: AtomSites,
}

/// 数据块名称校验
pub fn validate_name(name: &str) -> Result<()> {
    let re = Regex::new(LABEL_PATTERN).map_err(|e| DiffError::Other(e.to_string()))?;
    if re.is_match(name) {
        Ok(())
    } else {
        Err(DiffError::InvalidArgument(format!(
            "'{}' is not a valid data block name (letters, digits and '_' only)",
            name
        )))
    }
}

impl SampleModel {
    pub fn new(name: &str) -> Result<Self> {
        validate_name(name)?;
        let mut model = Self {
            name: name.to_string(),
            space_group: SpaceGroup::new()?,
            cell: Cell::default(),
            atom_sites: AtomSites::new(),
        };
        model.bind();
        Ok(model)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 重命名并更新所有参数的全名
    pub fn rename(&mut self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.name = name.to_string();
        self.bind();
        Ok(())
    }

    fn bind(&mut self) {
        let name = self.name.clone();
        self.space_group.bind(&name);
        self.cell.bind(&name);
        for site in self.atom_sites.iter_mut() {
            site.bind(&name);
        }
    }

    /// 设置空间群并施加晶系约束
    pub fn set_space_group(&mut self, symbol: &str) -> Result<()> {
        self.space_group.set_name(symbol)?;
        self.apply_symmetry_constraints()
    }

    /// 添加原子位置；标签重复时替换
    pub fn add_atom_site(&mut self, mut site: AtomSite) {
        site.bind(&self.name);
        self.atom_sites.add(site);
    }

    pub fn remove_atom_site(&mut self, label: &str) -> Result<AtomSite> {
        self.atom_sites
            .remove(label)
            .ok_or_else(|| DiffError::not_found("atom site", label))
    }

    /// 按晶系约束晶胞参数
    pub fn apply_symmetry_constraints(&mut self) -> Result<()> {
        let rules = self.space_group.crystal_system().cell_rules();
        self.cell.apply_rules(&rules)
    }

    pub fn lattice(&self) -> Lattice {
        self.cell.lattice()
    }

    /// 对称展开后的晶胞内原子
    pub fn unit_cell_atoms(&self) -> Vec<UnitCellAtom> {
        let ops = self.space_group.operations();
        let mut atoms = Vec::new();
        for site in self.atom_sites.iter() {
            for position in equivalent_positions(ops, &site.position()) {
                atoms.push(UnitCellAtom {
                    label: site.label().to_string(),
                    type_symbol: site.type_symbol.value().to_string(),
                    position,
                    occupancy: site.occupancy.value(),
                    b_iso: site.b_equivalent(),
                });
            }
        }
        atoms
    }

    /// 各原子位置的多重度
    pub fn multiplicities(&self) -> Vec<(String, usize)> {
        let ops = self.space_group.operations();
        self.atom_sites
            .iter()
            .map(|s| {
                (
                    s.label().to_string(),
                    equivalent_positions(ops, &s.position()).len(),
                )
            })
            .collect()
    }

    /// 化学式（按晶胞内原子与占有率）
    pub fn formula(&self) -> String {
        use std::collections::BTreeMap;
        let mut counts: BTreeMap<String, f64> = BTreeMap::new();
        for atom in self.unit_cell_atoms() {
            let symbol = crate::crystallography::scattering::element_symbol(&atom.type_symbol);
            *counts.entry(symbol).or_insert(0.0) += atom.occupancy;
        }
        counts
            .into_iter()
            .map(|(el, n)| {
                if (n - 1.0).abs() < 1e-6 {
                    el
                } else if (n - n.round()).abs() < 1e-6 {
                    format!("{}{}", el, n.round() as i64)
                } else {
                    format!("{}{:.3}", el, n)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    // ─────────────────────────────────────────────────────────────
    // CIF
    // ─────────────────────────────────────────────────────────────

    pub fn from_cif_block(block: &CifBlock) -> Result<Self> {
        let mut model = Self::new(&block.name)?;
        model.space_group = SpaceGroup::from_cif(block)?;
        model.cell = Cell::from_cif(block)?;
        model.atom_sites = atom_sites_from_cif(block)?;
        model.bind();
        model.apply_symmetry_constraints()?;
        Ok(model)
    }

    /// 从 CIF 文本的第一个数据块创建
    pub fn from_cif_str(text: &str) -> Result<Self> {
        let doc = parse_cif_content(text)?;
        let block = doc.first().ok_or_else(|| DiffError::ParseError {
            format: "CIF".to_string(),
            path: "<string>".to_string(),
            reason: "no data block".to_string(),
        })?;
        Self::from_cif_block(block)
    }

    pub fn to_cif(&self) -> String {
        let mut w = CifWriter::new();
        w.data_block(&self.name).blank();
        self.space_group.write_cif(&mut w);
        w.blank();
        self.cell.write_cif(&mut w);
        w.blank();
        write_atom_sites(&self.atom_sites, &mut w);
        w.finish()
    }
}

impl HasParameters for SampleModel {
    fn parameters(&self) -> Vec<&Parameter> {
        let mut params = self.cell.parameters();
        for site in self.atom_sites.iter() {
            params.extend(site.parameters());
        }
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        let mut params = self.cell.parameters_mut();
        for site in self.atom_sites.iter_mut() {
            params.extend(site.parameters_mut());
        }
        params
    }
}

impl Keyed for SampleModel {
    fn key(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub const SI_CIF: &str = "data_si
_space_group.name_H-M_alt 'F d -3 m'
_space_group.IT_coordinate_system_code 2
_cell.length_a 5.43(1)
loop_
_atom_site.label
_atom_site.type_symbol
_atom_site.fract_x
_atom_site.fract_y
_atom_site.fract_z
_atom_site.Wyckoff_letter
_atom_site.occupancy
_atom_site.B_iso_or_equiv
_atom_site.adp_type
Si Si 0.125 0.125 0.125 a 1.0 0.5 Biso
";

    #[test]
    fn test_from_cif_applies_cubic_constraints() {
        let model = SampleModel::from_cif_str(SI_CIF).unwrap();
        assert_eq!(model.name(), "si");
        assert_eq!(model.cell.values(), [5.43, 5.43, 5.43, 90.0, 90.0, 90.0]);
        assert!(model.cell.length_a.is_free());
        assert!(!model.cell.length_b.is_free());
    }

    #[test]
    fn test_unit_cell_expansion() {
        let model = SampleModel::from_cif_str(SI_CIF).unwrap();
        assert_eq!(model.unit_cell_atoms().len(), 8);
        assert_eq!(model.multiplicities(), vec![("Si".to_string(), 8)]);
        assert_eq!(model.formula(), "Si8");
    }

    #[test]
    fn test_parameter_full_names() {
        let model = SampleModel::from_cif_str(SI_CIF).unwrap();
        let names: Vec<String> = model.parameters().iter().map(|p| p.full_name()).collect();
        assert!(names.contains(&"si.cell.length_a".to_string()));
        assert!(names.contains(&"si.atom_site.Si.b_iso".to_string()));
    }

    #[test]
    fn test_cif_round_trip() {
        let model = SampleModel::from_cif_str(SI_CIF).unwrap();
        let text = model.to_cif();
        let again = SampleModel::from_cif_str(&text).unwrap();
        assert_eq!(again.space_group.name(), "F d -3 m");
        assert_eq!(again.cell.values(), model.cell.values());
        assert!(again.cell.length_a.is_free());
        assert_eq!(again.atom_sites.get("Si").unwrap().wyckoff_letter.value(), "a");
    }

    #[test]
    fn test_rename_rebinds() {
        let mut model = SampleModel::from_cif_str(SI_CIF).unwrap();
        model.rename("silicon").unwrap();
        assert_eq!(model.cell.length_a.full_name(), "silicon.cell.length_a");
        assert!(model.rename("bad name").is_err());
    }
}
