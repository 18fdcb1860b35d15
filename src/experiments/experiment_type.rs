//! # 实验类型类别
//!
//! `_expt_type.*`：样品形态、光束模式、辐射探针、散射类型。
//! 创建实验后不可更改，决定仪器、峰形、背景与数据的具体类型。
//!
//! ## 依赖关系
//! - 被 `experiments/experiment.rs` 与 `analysis/calculators/` 使用

use crate::core::cif::CifWriter;
use crate::error::{DiffError, Result};
use crate::experiments::enums::{BeamMode, RadiationProbe, SampleForm, ScatteringType};
use crate::parsers::CifBlock;

use serde::Serialize;
use std::fmt;

const TAG_SAMPLE_FORM: &str = "_expt_type.sample_form";
const TAG_BEAM_MODE: &str = "_expt_type.beam_mode";
const TAG_RADIATION_PROBE: &str = "_expt_type.radiation_probe";
const TAG_SCATTERING_TYPE: &str = "_expt_type.scattering_type";

/// 实验类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExperimentType {
    pub sample_form: SampleForm,
    pub beam_mode: BeamMode,
    pub radiation_probe: RadiationProbe,
    pub scattering_type: ScatteringType,
}

impl ExperimentType {
    /// 创建并校验组合
    pub fn new(
        sample_form: SampleForm,
        beam_mode: BeamMode,
        radiation_probe: RadiationProbe,
        scattering_type: ScatteringType,
    ) -> Result<Self> {
        let expt_type = Self {
            sample_form,
            beam_mode,
            radiation_probe,
            scattering_type,
        };
        expt_type.validate()?;
        Ok(expt_type)
    }

    /// 单晶实验只支持布拉格散射
    pub fn validate(&self) -> Result<()> {
        if self.sample_form == SampleForm::SingleCrystal
            && self.scattering_type == ScatteringType::Total
        {
            return Err(DiffError::IncompatibleExperiment(
                "single-crystal experiments require bragg scattering".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_powder(&self) -> bool {
        self.sample_form == SampleForm::Powder
    }

    pub fn is_total(&self) -> bool {
        self.scattering_type == ScatteringType::Total
    }

    pub fn is_tof(&self) -> bool {
        self.beam_mode == BeamMode::TimeOfFlight
    }

    /// 从 CIF 读取，缺失项取默认值
    pub fn from_cif(block: &CifBlock) -> Result<Self> {
        let mut expt_type = Self::default();
        if let Some(v) = block.find_value(TAG_SAMPLE_FORM) {
            expt_type.sample_form = v.parse()?;
        }
        if let Some(v) = block.find_value(TAG_BEAM_MODE) {
            expt_type.beam_mode = v.parse()?;
        }
        if let Some(v) = block.find_value(TAG_RADIATION_PROBE) {
            expt_type.radiation_probe = v.parse()?;
        }
        if let Some(v) = block.find_value(TAG_SCATTERING_TYPE) {
            expt_type.scattering_type = v.parse()?;
        }
        expt_type.validate()?;
        Ok(expt_type)
    }

    pub fn write_cif(&self, w: &mut CifWriter) {
        use crate::core::cif::format_value;
        w.item(TAG_SAMPLE_FORM, &format_value(self.sample_form.as_str()))
            .item(TAG_BEAM_MODE, &format_value(self.beam_mode.as_str()))
            .item(TAG_RADIATION_PROBE, &format_value(self.radiation_probe.as_str()))
            .item(TAG_SCATTERING_TYPE, &format_value(self.scattering_type.as_str()));
    }
}

impl fmt::Display for ExperimentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.sample_form, self.beam_mode, self.radiation_probe, self.scattering_type
        )
    }
}

impl Serialize for ExperimentType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("ExperimentType", 4)?;
        s.serialize_field("sample_form", self.sample_form.as_str())?;
        s.serialize_field("beam_mode", self.beam_mode.as_str())?;
        s.serialize_field("radiation_probe", self.radiation_probe.as_str())?;
        s.serialize_field("scattering_type", self.scattering_type.as_str())?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::parse_cif_content;

    #[test]
    fn test_single_crystal_requires_bragg() {
        assert!(ExperimentType::new(
            SampleForm::SingleCrystal,
            BeamMode::ConstantWavelength,
            RadiationProbe::Neutron,
            ScatteringType::Total,
        )
        .is_err());
    }

    #[test]
    fn test_cif_round_trip() {
        let expt_type = ExperimentType::new(
            SampleForm::Powder,
            BeamMode::TimeOfFlight,
            RadiationProbe::Xray,
            ScatteringType::Bragg,
        )
        .unwrap();
        let mut w = CifWriter::new();
        w.data_block("e");
        expt_type.write_cif(&mut w);
        let text = w.finish();
        assert!(text.contains("_expt_type.beam_mode time-of-flight"));
        let doc = parse_cif_content(&text).unwrap();
        assert_eq!(ExperimentType::from_cif(&doc.blocks[0]).unwrap(), expt_type);
    }

    #[test]
    fn test_quoted_values() {
        let doc = parse_cif_content(
            "data_e\n_expt_type.sample_form 'single crystal'\n_expt_type.beam_mode 'constant wavelength'\n",
        )
        .unwrap();
        let expt_type = ExperimentType::from_cif(&doc.blocks[0]).unwrap();
        assert_eq!(expt_type.sample_form, SampleForm::SingleCrystal);
        assert!(!expt_type.is_tof());
    }
}
