//! # 原子位置类别
//!
//! `_atom_site` 循环：标签、元素类型、分数坐标、Wyckoff 字母、占有率、
//! 各向同性位移参数。集合按标签索引。
//!
//! ## 依赖关系
//! - 被 `sample_models/sample_model.rs` 使用
//! - 使用 `core/collection.rs`

use crate::core::cif::CifWriter;
use crate::core::{Collection, Keyed, Parameter, StringDescriptor};
use crate::error::{DiffError, Result};
use crate::parsers::CifBlock;

use std::f64::consts::PI;

pub const CATEGORY: &str = "atom_site";

/// 标签格式
pub const LABEL_PATTERN: &str = r"^[A-Za-z0-9_]+$";

const ADP_TYPES: &[&str] = &["Biso", "Uiso"];

/// 单个原子位置
#[derive(Debug, Clone)]
pub struct AtomSite {
    pub label: StringDescriptor,
    pub type_symbol: StringDescriptor,
    pub fract_x: Parameter,
    pub fract_y: Parameter,
    pub fract_z: Parameter,
    pub wyckoff_letter: StringDescriptor,
    pub occupancy: Parameter,
    pub b_iso: Parameter,
    pub adp_type: StringDescriptor,
}

fn coordinate(name: &'static str, tag: &'static str, alias: &'static str) -> Parameter {
    Parameter::new(name, 0.0)
        .cif(tag)
        .cif(alias)
        .with_description("Fractional coordinate")
        .category(CATEGORY)
}

impl AtomSite {
    pub fn new(label: &str, type_symbol: &str, position: [f64; 3]) -> Result<Self> {
        let mut site = Self {
            label: StringDescriptor::new("label", "Si")
                .cif("_atom_site.label")
                .pattern(LABEL_PATTERN)
                .category(CATEGORY),
            type_symbol: StringDescriptor::new("type_symbol", "Si")
                .cif("_atom_site.type_symbol")
                .with_description("Chemical element or ion")
                .category(CATEGORY),
            fract_x: coordinate("fract_x", "_atom_site.fract_x", "_atom_site_fract_x"),
            fract_y: coordinate("fract_y", "_atom_site.fract_y", "_atom_site_fract_y"),
            fract_z: coordinate("fract_z", "_atom_site.fract_z", "_atom_site_fract_z"),
            wyckoff_letter: StringDescriptor::new("wyckoff_letter", "")
                .cif("_atom_site.Wyckoff_letter")
                .pattern(r"^[a-zA-Z]?$")
                .category(CATEGORY),
            occupancy: Parameter::new("occupancy", 1.0)
                .cif("_atom_site.occupancy")
                .cif("_atom_site_occupancy")
                .range(0.0, 1.0)
                .with_description("Site occupancy")
                .category(CATEGORY),
            b_iso: Parameter::new("b_iso", 0.0)
                .cif("_atom_site.B_iso_or_equiv")
                .cif("_atom_site_B_iso_or_equiv")
                .with_units("Å²")
                .range(0.0, f64::INFINITY)
                .with_description("Isotropic atomic displacement parameter")
                .category(CATEGORY),
            adp_type: StringDescriptor::new("adp_type", "Biso")
                .cif("_atom_site.adp_type")
                .allowed(ADP_TYPES)
                .category(CATEGORY),
        };
        site.label.set_value(label)?;
        site.type_symbol.set_value(type_symbol)?;
        site.fract_x.set_value(position[0])?;
        site.fract_y.set_value(position[1])?;
        site.fract_z.set_value(position[2])?;
        site.rebind_entry();
        Ok(site)
    }

    pub fn label(&self) -> &str {
        self.label.value()
    }

    pub fn position(&self) -> [f64; 3] {
        [
            self.fract_x.value(),
            self.fract_y.value(),
            self.fract_z.value(),
        ]
    }

    /// 以 B (Å²) 表示的位移参数；Uiso 时 B = 8π²U
    pub fn b_equivalent(&self) -> f64 {
        if self.adp_type.value() == "Uiso" {
            8.0 * PI * PI * self.b_iso.value()
        } else {
            self.b_iso.value()
        }
    }

    pub fn parameters(&self) -> Vec<&Parameter> {
        vec![
            &self.fract_x,
            &self.fract_y,
            &self.fract_z,
            &self.occupancy,
            &self.b_iso,
        ]
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![
            &mut self.fract_x,
            &mut self.fract_y,
            &mut self.fract_z,
            &mut self.occupancy,
            &mut self.b_iso,
        ]
    }

    fn rebind_entry(&mut self) {
        let label = self.label.value().to_string();
        for p in self.parameters_mut() {
            p.set_entry(&label);
        }
        for d in [
            &mut self.label,
            &mut self.type_symbol,
            &mut self.wyckoff_letter,
            &mut self.adp_type,
        ] {
            d.set_entry(&label);
        }
    }

    pub(crate) fn bind(&mut self, datablock: &str) {
        for p in self.parameters_mut() {
            p.bind(datablock);
        }
        for d in [
            &mut self.label,
            &mut self.type_symbol,
            &mut self.wyckoff_letter,
            &mut self.adp_type,
        ] {
            d.bind(datablock);
        }
    }

    fn cif_row(&self) -> Vec<String> {
        vec![
            self.label.cif_value(),
            self.type_symbol.cif_value(),
            self.fract_x.cif_value(),
            self.fract_y.cif_value(),
            self.fract_z.cif_value(),
            self.wyckoff_letter.cif_value(),
            self.occupancy.cif_value(),
            self.b_iso.cif_value(),
            self.adp_type.cif_value(),
        ]
    }
}

impl Keyed for AtomSite {
    fn key(&self) -> &str {
        self.label.value()
    }
}

/// 原子位置集合
pub type AtomSites = Collection<AtomSite>;

const LOOP_TAGS: &[&str] = &[
    "_atom_site.label",
    "_atom_site.type_symbol",
    "_atom_site.fract_x",
    "_atom_site.fract_y",
    "_atom_site.fract_z",
    "_atom_site.Wyckoff_letter",
    "_atom_site.occupancy",
    "_atom_site.B_iso_or_equiv",
    "_atom_site.adp_type",
];

/// 从 CIF 读取原子位置循环
pub fn atom_sites_from_cif(block: &CifBlock) -> Result<AtomSites> {
    let mut sites = AtomSites::new();
    let Some(lp) = block.find_loop_any(&["_atom_site.label", "_atom_site_label"]) else {
        return Ok(sites);
    };

    let col = |tags: &[&str]| tags.iter().find_map(|t| lp.column(t));
    let label_col = col(&["_atom_site.label", "_atom_site_label"]);
    let type_col = col(&["_atom_site.type_symbol", "_atom_site_type_symbol"]);
    let u_col = col(&["_atom_site.U_iso_or_equiv", "_atom_site_U_iso_or_equiv"]);
    let wyckoff_col = col(&["_atom_site.Wyckoff_letter", "_atom_site_Wyckoff_symbol"]);
    let adp_col = col(&["_atom_site.adp_type", "_atom_site_adp_type"]);

    for row in &lp.rows {
        let label = label_col.map(|c| row[c].as_str()).unwrap_or("");
        let type_symbol = type_col.map(|c| row[c].as_str()).unwrap_or(label);
        let mut site = AtomSite::new(label, type_symbol, [0.0; 3])?;

        for param in site.parameters_mut() {
            if let Some(c) = param.cif_names().iter().find_map(|t| lp.column(t)) {
                param.load_cif(&row[c])?;
            }
        }
        if let (Some(c), None) = (u_col, col(&["_atom_site.B_iso_or_equiv"])) {
            site.b_iso.load_cif(&row[c])?;
            site.adp_type.set_value("Uiso")?;
        }
        if let Some(c) = wyckoff_col {
            let letter = row[c].trim();
            if letter != "?" && letter != "." {
                site.wyckoff_letter.set_value(letter)?;
            }
        }
        if let Some(c) = adp_col {
            site.adp_type.set_value(&row[c])?;
        }

        if sites.add(site).is_some() {
            return Err(DiffError::ParseError {
                format: "CIF".to_string(),
                path: block.name.clone(),
                reason: format!("duplicate atom site label '{}'", label),
            });
        }
    }
    Ok(sites)
}

/// 写出原子位置循环
pub fn write_atom_sites(sites: &AtomSites, w: &mut CifWriter) {
    let rows: Vec<Vec<String>> = sites.iter().map(AtomSite::cif_row).collect();
    w.loop_table(LOOP_TAGS, &rows, None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse_cif_content;

    #[test]
    fn test_new_site_binds_entry() {
        let site = AtomSite::new("O1", "O2-", [0.5, 0.0, 0.0]).unwrap();
        assert_eq!(site.fract_x.full_name(), "atom_site.O1.fract_x");
        assert_eq!(site.key(), "O1");
    }

    #[test]
    fn test_invalid_label() {
        assert!(AtomSite::new("O 1", "O", [0.0; 3]).is_err());
    }

    #[test]
    fn test_uiso_conversion() {
        let mut site = AtomSite::new("Si", "Si", [0.0; 3]).unwrap();
        site.b_iso.set_value(0.01).unwrap();
        site.adp_type.set_value("Uiso").unwrap();
        assert!((site.b_equivalent() - 8.0 * PI * PI * 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_loop_from_cif() {
        let cif = "data_x\nloop_\n_atom_site.label\n_atom_site.type_symbol\n_atom_site.fract_x\n\
                   _atom_site.fract_y\n_atom_site.fract_z\n_atom_site.occupancy\n_atom_site.B_iso_or_equiv\n\
                   La La 0 0 0 0.5 0.5()\nO O 0.5 0 0 1 1.2\n";
        let doc = parse_cif_content(cif).unwrap();
        let sites = atom_sites_from_cif(&doc.blocks[0]).unwrap();
        assert_eq!(sites.keys(), vec!["La", "O"]);
        let la = sites.get("La").unwrap();
        assert_eq!(la.occupancy.value(), 0.5);
        assert!(la.b_iso.is_free());
        assert_eq!(sites.get("O").unwrap().fract_x.value(), 0.5);
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let cif = "data_x\nloop_\n_atom_site.label\n_atom_site.fract_x\nA 0\nA 0.5\n";
        let doc = parse_cif_content(cif).unwrap();
        assert!(atom_sites_from_cif(&doc.blocks[0]).is_err());
    }
}
