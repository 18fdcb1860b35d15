//! # 关联相类别
//!
//! 粉末实验通过 `_pd_phase_block.id/scale` 关联若干样品模型，每个带可精修比例因子；
//! 单晶实验通过 `_sc_crystal_block.id/scale` 关联一个晶体，并带消光参数
//! `_extinction.mosaicity/radius`。
//!
//! ## 依赖关系
//! - 被 `experiments/experiment.rs` 与 `analysis/calculators/` 使用

use crate::core::cif::{format_value, CifWriter};
use crate::core::{Collection, Keyed, Parameter};
use crate::error::{DiffError, Result};
use crate::parsers::CifBlock;

pub const CATEGORY: &str = "linked_phases";

const PD_ID: &str = "_pd_phase_block.id";
const PD_SCALE: &str = "_pd_phase_block.scale";
const SC_ID: &str = "_sc_crystal_block.id";
const SC_SCALE: &str = "_sc_crystal_block.scale";

/// 关联相
#[derive(Debug, Clone)]
pub struct LinkedPhase {
    id: String,
    pub scale: Parameter,
}

impl LinkedPhase {
    pub fn new(id: &str, scale: f64) -> Result<Self> {
        crate::sample_models::sample_model::validate_name(id)?;
        let mut param = Parameter::new("scale", scale)
            .cif(PD_SCALE)
            .cif(SC_SCALE)
            .range(0.0, f64::INFINITY)
            .with_description("Scale factor of the linked phase")
            .category(CATEGORY);
        param.set_entry(id);
        Ok(Self {
            id: id.to_string(),
            scale: param,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Keyed for LinkedPhase {
    fn key(&self) -> &str {
        &self.id
    }
}

/// 关联相集合
#[derive(Debug, Clone, Default)]
pub struct LinkedPhases {
    single_crystal: bool,
    items: Collection<LinkedPhase>,
    datablock: String,
}

impl LinkedPhases {
    pub fn new(single_crystal: bool) -> Self {
        Self {
            single_crystal,
            ..Self::default()
        }
    }

    /// 添加关联；单晶实验只保留一个晶体
    pub fn add(&mut self, id: &str, scale: f64) -> Result<()> {
        let mut phase = LinkedPhase::new(id, scale)?;
        phase.scale.bind(&self.datablock);
        if self.single_crystal {
            self.items.clear();
        }
        self.items.add(phase);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<LinkedPhase> {
        self.items
            .remove(id)
            .ok_or_else(|| DiffError::not_found("linked phase", id))
    }

    pub fn get(&self, id: &str) -> Option<&LinkedPhase> {
        self.items.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinkedPhase> {
        self.items.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.items.keys()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn parameters(&self) -> Vec<&Parameter> {
        self.items.iter().map(|p| &p.scale).collect()
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        self.items.iter_mut().map(|p| &mut p.scale).collect()
    }

    pub fn load_cif(&mut self, block: &CifBlock) -> Result<()> {
        let (id_tag, scale_tag) = if self.single_crystal {
            (SC_ID, SC_SCALE)
        } else {
            (PD_ID, PD_SCALE)
        };
        let Some(ids) = block.find_values(id_tag) else {
            return Ok(());
        };
        let scales = block.find_values(scale_tag).unwrap_or_default();
        for (i, id) in ids.iter().enumerate() {
            let mut phase = LinkedPhase::new(id, 1.0)?;
            if let Some(raw) = scales.get(i) {
                phase.scale.load_cif(raw)?;
            }
            phase.scale.bind(&self.datablock);
            self.items.add(phase);
        }
        Ok(())
    }

    pub fn write_cif(&self, w: &mut CifWriter) {
        if self.single_crystal {
            if let Some(phase) = self.items.iter().next() {
                w.item(SC_ID, &format_value(&phase.id))
                    .item(SC_SCALE, &phase.scale.cif_value());
            }
            return;
        }
        let rows: Vec<Vec<String>> = self
            .items
            .iter()
            .map(|p| vec![format_value(&p.id), p.scale.cif_value()])
            .collect();
        w.loop_table(&[PD_ID, PD_SCALE], &rows, None);
    }

    pub(crate) fn bind(&mut self, datablock: &str) {
        self.datablock = datablock.to_string();
        for p in self.items.iter_mut() {
            p.scale.bind(datablock);
        }
    }
}

/// 单晶消光参数
#[derive(Debug, Clone)]
pub struct Extinction {
    pub mosaicity: Parameter,
    pub radius: Parameter,
}

impl Default for Extinction {
    fn default() -> Self {
        Self {
            mosaicity: Parameter::new("mosaicity", 1.0)
                .cif("_extinction.mosaicity")
                .with_units("deg")
                .with_description("Mosaicity value for extinction correction")
                .category("extinction"),
            radius: Parameter::new("radius", 1.0)
                .cif("_extinction.radius")
                .with_units("µm")
                .with_description("Crystal radius for extinction correction")
                .category("extinction"),
        }
    }
}

impl Extinction {
    pub fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.mosaicity, &self.radius]
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.mosaicity, &mut self.radius]
    }

    pub fn load_cif(&mut self, block: &CifBlock) -> Result<()> {
        for param in self.parameters_mut() {
            if let Some(raw) = block.find_any(param.cif_names()) {
                param.load_cif(raw)?;
            }
        }
        Ok(())
    }

    pub fn write_cif(&self, w: &mut CifWriter) {
        w.parameter(&self.mosaicity).parameter(&self.radius);
    }

    pub(crate) fn bind(&mut self, datablock: &str) {
        self.mosaicity.bind(datablock);
        self.radius.bind(datablock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse_cif_content;

    #[test]
    fn test_powder_loop() {
        let doc = parse_cif_content(
            "data_e\nloop_\n_pd_phase_block.id\n_pd_phase_block.scale\nlbco 10.5(2)\nsi 1\n",
        )
        .unwrap();
        let mut phases = LinkedPhases::new(false);
        phases.bind("e");
        phases.load_cif(&doc.blocks[0]).unwrap();
        assert_eq!(phases.ids(), vec!["lbco", "si"]);
        let lbco = phases.get("lbco").unwrap();
        assert!(lbco.scale.is_free());
        assert_eq!(lbco.scale.full_name(), "e.linked_phases.lbco.scale");
    }

    #[test]
    fn test_single_crystal_keeps_one() {
        let mut phases = LinkedPhases::new(true);
        phases.add("a", 1.0).unwrap();
        phases.add("b", 2.0).unwrap();
        assert_eq!(phases.ids(), vec!["b"]);
        let mut w = CifWriter::new();
        phases.write_cif(&mut w);
        assert!(w.finish().contains("_sc_crystal_block.id b"));
    }
}
