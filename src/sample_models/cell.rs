//! # 晶胞类别
//!
//! 六个晶胞参数 `_cell.length_a` … `_cell.angle_gamma`，并按晶系施加约束。
//!
//! ## 依赖关系
//! - 被 `sample_models/sample_model.rs` 使用
//! - 使用 `crystallography/lattice.rs` 与 `crystallography/space_groups.rs`

use crate::core::cif::CifWriter;
use crate::core::Parameter;
use crate::crystallography::{CellRule, Lattice};
use crate::error::Result;
use crate::parsers::CifBlock;

pub const CATEGORY: &str = "cell";

/// 晶胞
#[derive(Debug, Clone)]
pub struct Cell {
    pub length_a: Parameter,
    pub length_b: Parameter,
    pub length_c: Parameter,
    pub angle_alpha: Parameter,
    pub angle_beta: Parameter,
    pub angle_gamma: Parameter,
}

fn length(name: &'static str, tag: &'static str, alias: &'static str) -> Parameter {
    Parameter::new(name, 10.0)
        .cif(tag)
        .cif(alias)
        .with_units("Å")
        .range(0.0, 1000.0)
        .open_min()
        .with_description("Unit-cell length")
        .category(CATEGORY)
}

fn angle(name: &'static str, tag: &'static str, alias: &'static str) -> Parameter {
    Parameter::new(name, 90.0)
        .cif(tag)
        .cif(alias)
        .with_units("deg")
        .range(0.0, 180.0)
        .open_min()
        .open_max()
        .with_description("Unit-cell angle")
        .category(CATEGORY)
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            length_a: length("length_a", "_cell.length_a", "_cell_length_a"),
            length_b: length("length_b", "_cell.length_b", "_cell_length_b"),
            length_c: length("length_c", "_cell.length_c", "_cell_length_c"),
            angle_alpha: angle("angle_alpha", "_cell.angle_alpha", "_cell_angle_alpha"),
            angle_beta: angle("angle_beta", "_cell.angle_beta", "_cell_angle_beta"),
            angle_gamma: angle("angle_gamma", "_cell.angle_gamma", "_cell_angle_gamma"),
        }
    }
}

impl Cell {
    /// 参数数组，顺序 a, b, c, alpha, beta, gamma
    pub fn values(&self) -> [f64; 6] {
        [
            self.length_a.value(),
            self.length_b.value(),
            self.length_c.value(),
            self.angle_alpha.value(),
            self.angle_beta.value(),
            self.angle_gamma.value(),
        ]
    }

    pub fn lattice(&self) -> Lattice {
        let [a, b, c, alpha, beta, gamma] = self.values();
        Lattice::from_parameters(a, b, c, alpha, beta, gamma)
    }

    pub fn volume(&self) -> f64 {
        self.lattice().volume()
    }

    pub fn parameters(&self) -> Vec<&Parameter> {
        vec![
            &self.length_a,
            &self.length_b,
            &self.length_c,
            &self.angle_alpha,
            &self.angle_beta,
            &self.angle_gamma,
        ]
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![
            &mut self.length_a,
            &mut self.length_b,
            &mut self.length_c,
            &mut self.angle_alpha,
            &mut self.angle_beta,
            &mut self.angle_gamma,
        ]
    }

    /// 施加晶系约束：从属参数取主参数的值且不再自由
    pub fn apply_rules(&mut self, rules: &[CellRule; 6]) -> Result<()> {
        let values = self.values();
        for (param, rule) in self.parameters_mut().into_iter().zip(rules.iter()) {
            match *rule {
                CellRule::Free => {}
                CellRule::Follows(master) => {
                    param.set_value(values[master])?;
                    param.set_free(false)?;
                }
                CellRule::Fixed(v) => {
                    param.set_value(v)?;
                    param.set_free(false)?;
                }
            }
        }
        Ok(())
    }

    pub fn from_cif(block: &CifBlock) -> Result<Self> {
        let mut cell = Self::default();
        for param in cell.parameters_mut() {
            if let Some(raw) = block.find_any(param.cif_names()) {
                param.load_cif(raw)?;
            }
        }
        Ok(cell)
    }

    pub fn write_cif(&self, w: &mut CifWriter) {
        for p in self.parameters() {
            w.parameter(p);
        }
    }

    pub(crate) fn bind(&mut self, datablock: &str) {
        for p in self.parameters_mut() {
            p.bind(datablock);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crystallography::CrystalSystem;
    use crate::parsers::parse_cif_content;

    #[test]
    fn test_cubic_rules() {
        let mut cell = Cell::default();
        cell.length_a.set_value(5.43).unwrap();
        cell.length_b.set_free(true).unwrap();
        cell.angle_gamma.set_value(100.0).unwrap();
        cell.apply_rules(&CrystalSystem::Cubic.cell_rules()).unwrap();
        assert_eq!(cell.values(), [5.43, 5.43, 5.43, 90.0, 90.0, 90.0]);
        assert!(!cell.length_b.is_free());
    }

    #[test]
    fn test_hexagonal_rules() {
        let mut cell = Cell::default();
        cell.length_a.set_value(3.0).unwrap();
        cell.length_c.set_value(5.0).unwrap();
        cell.apply_rules(&CrystalSystem::Hexagonal.cell_rules()).unwrap();
        assert_eq!(cell.values(), [3.0, 3.0, 5.0, 90.0, 90.0, 120.0]);
    }

    #[test]
    fn test_from_cif_marks_free() {
        let doc = parse_cif_content("data_x\n_cell.length_a 3.89(2)\n_cell_angle_gamma 120\n")
            .unwrap();
        let cell = Cell::from_cif(&doc.blocks[0]).unwrap();
        assert!(cell.length_a.is_free());
        assert_eq!(cell.angle_gamma.value(), 120.0);
        assert!(!cell.angle_gamma.is_free());
    }

    #[test]
    fn test_degenerate_values_rejected() {
        let mut cell = Cell::default();
        assert!(cell.length_a.set_value(0.0).is_err());
        assert!(cell.length_a.set_value(1000.0).is_ok());
        assert!(cell.angle_beta.set_value(0.0).is_err());
        assert!(cell.angle_beta.set_value(180.0).is_err());
        let doc = parse_cif_content("data_x\n_cell.length_a 0\n").unwrap();
        assert!(Cell::from_cif(&doc.blocks[0]).is_err());
    }
}
