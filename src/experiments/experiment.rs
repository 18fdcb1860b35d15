//! # 实验（数据块）
//!
//! 一个实验由实验类型与若干类别组成：仪器、峰形、背景、排除区间、
//! 关联相、消光（单晶）以及测量数据。类别的具体类型由实验类型决定。
//!
//! ## 创建方式
//! - 名称 + 实验类型
//! - CIF 数据块（`_expt_type.*` 缺省时取默认类型）
//! - 测量数据文件（.xye / .hkl）
//!
//! ## 依赖关系
//! - 被 `experiments/collection.rs`、`analysis/`、`project/` 使用

use crate::core::cif::CifWriter;
use crate::core::{HasParameters, Keyed, Parameter};
use crate::error::{DiffError, Result};
use crate::experiments::background::Background;
use crate::experiments::data::{ExperimentData, PowderData, Reflections, XKind};
use crate::experiments::enums::{BackgroundType, PeakProfileType};
use crate::experiments::excluded_regions::{ExcludedRegion, ExcludedRegions};
use crate::experiments::experiment_type::ExperimentType;
use crate::experiments::instrument::Instrument;
use crate::experiments::linked_phases::{Extinction, LinkedPhases};
use crate::experiments::peak::Peak;
use crate::parsers::{
    detect_kind, parse_cif_content, parse_cif_file, parse_hkl_file, parse_xye_file, CifBlock,
    InputKind,
};
use crate::sample_models::sample_model::validate_name;
use crate::utils::output::print_block;

use std::path::Path;

/// 实验
#[derive(Debug, Clone)]
pub struct Experiment {
    name: String,
    expt_type: ExperimentType,
    pub instrument: Instrument,
    /// 峰形（仅粉末）
    pub peak: Option<Peak>,
    pub background: Background,
    pub excluded_regions: ExcludedRegions,
    pub linked_phases: LinkedPhases,
    /// 消光（仅单晶）
    pub extinction: Option<Extinction>,
    pub data: ExperimentData,
}

impl Experiment {
    /// 按实验类型创建空实验
    pub fn new(name: &str, expt_type: ExperimentType) -> Result<Self> {
        validate_name(name)?;
        expt_type.validate()?;
        let powder = expt_type.is_powder();
        let mut experiment = Self {
            name: name.to_string(),
            expt_type,
            instrument: Instrument::for_beam_mode(expt_type.beam_mode),
            peak: powder.then(|| Peak::new(expt_type.scattering_type, expt_type.beam_mode)),
            background: Background::new(BackgroundType::default()),
            excluded_regions: ExcludedRegions::default(),
            linked_phases: LinkedPhases::new(!powder),
            extinction: (!powder).then(Extinction::default),
            data: if powder {
                ExperimentData::Powder(PowderData::new(x_kind_for(&expt_type)))
            } else {
                ExperimentData::SingleCrystal(Reflections::default())
            },
        };
        experiment.bind();
        Ok(experiment)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.name = name.to_string();
        self.bind();
        Ok(())
    }

    pub fn expt_type(&self) -> &ExperimentType {
        &self.expt_type
    }

    fn bind(&mut self) {
        let name = self.name.clone();
        self.instrument.bind(&name);
        if let Some(peak) = self.peak.as_mut() {
            peak.bind(&name);
        }
        self.background.bind(&name);
        self.linked_phases.bind(&name);
        if let Some(ext) = self.extinction.as_mut() {
            ext.bind(&name);
        }
    }

    pub fn x_kind(&self) -> XKind {
        x_kind_for(&self.expt_type)
    }

    // ─────────────────────────────────────────────────────────────
    // 修改
    // ─────────────────────────────────────────────────────────────

    /// 添加排除区间并重新标记数据点
    pub fn add_excluded_region(&mut self, start: f64, end: f64) -> Result<()> {
        let region = ExcludedRegion::new(start, end)?;
        self.excluded_regions.add(region);
        if let ExperimentData::Powder(data) = &mut self.data {
            data.apply_exclusions(&self.excluded_regions);
        }
        Ok(())
    }

    /// 切换背景类型（清空已有点）
    pub fn set_background_type(&mut self, background_type: BackgroundType) -> Result<()> {
        if !self.expt_type.is_powder() {
            return Err(DiffError::IncompatibleExperiment(
                "single-crystal experiments have no background".to_string(),
            ));
        }
        self.background.set_type(background_type);
        Ok(())
    }

    pub fn set_peak_profile_type(&mut self, profile_type: PeakProfileType) -> Result<()> {
        let peak = self.peak.as_mut().ok_or_else(|| {
            DiffError::IncompatibleExperiment(
                "single-crystal experiments have no peak profile".to_string(),
            )
        })?;
        peak.set_profile_type(profile_type)?;
        peak.bind(&self.name);
        Ok(())
    }

    pub fn link_phase(&mut self, id: &str, scale: f64) -> Result<()> {
        self.linked_phases.add(id, scale)
    }

    // ─────────────────────────────────────────────────────────────
    // 读取
    // ─────────────────────────────────────────────────────────────

    pub fn from_cif_block(block: &CifBlock) -> Result<Self> {
        let expt_type = ExperimentType::from_cif(block)?;
        let mut experiment = Self::new(&block.name, expt_type)?;
        experiment.instrument.load_cif(block)?;
        if let Some(peak) = experiment.peak.as_mut() {
            peak.load_cif(block)?;
        }
        experiment.background.load_cif(block)?;
        experiment.excluded_regions.load_cif(block)?;
        experiment.linked_phases.load_cif(block)?;
        if let Some(ext) = experiment.extinction.as_mut() {
            ext.load_cif(block)?;
        }
        match &mut experiment.data {
            ExperimentData::Powder(data) => {
                data.load_cif(block)?;
                if !experiment.excluded_regions.is_empty() {
                    data.apply_exclusions(&experiment.excluded_regions);
                }
            }
            ExperimentData::SingleCrystal(refl) => {
                refl.load_cif(block)?;
            }
        }
        experiment.bind();
        Ok(experiment)
    }

    pub fn from_cif_str(text: &str) -> Result<Self> {
        let doc = parse_cif_content(text)?;
        let block = doc.first().ok_or_else(|| DiffError::ParseError {
            format: "CIF".to_string(),
            path: "<string>".to_string(),
            reason: "no data block".to_string(),
        })?;
        Self::from_cif_block(block)
    }

    /// 从测量数据文件创建
    pub fn from_data_file(name: &str, expt_type: ExperimentType, path: &Path) -> Result<Self> {
        let mut experiment = Self::new(name, expt_type)?;
        match (detect_kind(path), &mut experiment.data) {
            (InputKind::Cif, _) => {
                let doc = parse_cif_file(path)?;
                let block = doc.first().ok_or_else(|| DiffError::ParseError {
                    format: "CIF".to_string(),
                    path: path.display().to_string(),
                    reason: "no data block".to_string(),
                })?;
                let mut loaded = Self::from_cif_block(block)?;
                loaded.rename(name)?;
                return Ok(loaded);
            }
            (InputKind::Columns, ExperimentData::Powder(data)) => {
                let columns = parse_xye_file(path)?;
                *data = PowderData::from_columns(data.x_kind, columns);
            }
            (InputKind::Reflections, ExperimentData::SingleCrystal(refl)) => {
                *refl = Reflections::from_measured(&parse_hkl_file(path)?);
            }
            (InputKind::Columns, ExperimentData::SingleCrystal(refl)) => {
                *refl = Reflections::from_measured(&parse_hkl_file(path)?);
            }
            (InputKind::Reflections, ExperimentData::Powder(_)) => {
                return Err(DiffError::IncompatibleExperiment(format!(
                    "{} holds single-crystal reflections but the experiment is a powder one",
                    path.display()
                )));
            }
        }
        Ok(experiment)
    }

    pub fn from_cif_path(path: &Path) -> Result<Vec<Self>> {
        let doc = parse_cif_file(path)?;
        doc.blocks.iter().map(Self::from_cif_block).collect()
    }

    // ─────────────────────────────────────────────────────────────
    // 写出
    // ─────────────────────────────────────────────────────────────

    /// 渲染为 CIF；`max_points` 截断数据循环（仅用于显示）
    pub fn to_cif(&self, max_points: Option<usize>) -> String {
        let mut w = CifWriter::new();
        w.data_block(&self.name).blank();
        self.expt_type.write_cif(&mut w);
        w.blank();
        self.instrument.write_cif(&mut w);
        w.blank();
        if let Some(peak) = &self.peak {
            peak.write_cif(&mut w);
            w.blank();
        }
        if !self.linked_phases.is_empty() {
            self.linked_phases.write_cif(&mut w);
            w.blank();
        }
        if let Some(ext) = &self.extinction {
            ext.write_cif(&mut w);
            w.blank();
        }
        if self.expt_type.is_powder() {
            self.background.write_cif(&mut w);
            w.blank();
        }
        if !self.excluded_regions.is_empty() {
            self.excluded_regions.write_cif(&mut w);
            w.blank();
        }
        match &self.data {
            ExperimentData::Powder(data) => data.write_cif(&mut w, max_points),
            ExperimentData::SingleCrystal(refl) => refl.write_cif(&mut w, max_points),
        };
        w.finish()
    }

    /// 打印实验 CIF（数据截断为首尾各 5 点）
    pub fn show(&self) {
        print_block(&self.to_cif(Some(5)));
    }
}

fn x_kind_for(expt_type: &ExperimentType) -> XKind {
    if expt_type.is_total() {
        XKind::R
    } else if expt_type.is_tof() {
        XKind::TimeOfFlight
    } else {
        XKind::TwoTheta
    }
}

impl HasParameters for Experiment {
    fn parameters(&self) -> Vec<&Parameter> {
        let mut params = self.instrument.parameters();
        if let Some(peak) = &self.peak {
            params.extend(peak.parameters());
        }
        params.extend(self.linked_phases.parameters());
        if self.expt_type.is_powder() {
            params.extend(self.background.parameters());
        }
        if let Some(ext) = &self.extinction {
            params.extend(ext.parameters());
        }
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        let powder = self.expt_type.is_powder();
        let mut params = self.instrument.parameters_mut();
        if let Some(peak) = self.peak.as_mut() {
            params.extend(peak.parameters_mut());
        }
        params.extend(self.linked_phases.parameters_mut());
        if powder {
            params.extend(self.background.parameters_mut());
        }
        if let Some(ext) = self.extinction.as_mut() {
            params.extend(ext.parameters_mut());
        }
        params
    }
}

impl Keyed for Experiment {
    fn key(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiments::enums::{BeamMode, RadiationProbe, SampleForm, ScatteringType};

    pub const HRPT_CIF: &str = "data_hrpt
_expt_type.sample_form powder
_expt_type.beam_mode 'constant wavelength'
_expt_type.radiation_probe neutron
_expt_type.scattering_type bragg
_instr.wavelength 1.494
_instr.2theta_offset 0.6()
_peak.broad_gauss_u 0.1
loop_
_pd_phase_block.id
_pd_phase_block.scale
lbco 10.0()
loop_
_pd_background.line_segment_X
_pd_background.line_segment_intensity
10 170
165 190
loop_
_excluded_region.start
_excluded_region.end
0 10.05
loop_
_pd_meas.2theta_scan
_pd_meas.intensity_total
_pd_meas.intensity_total_su
10.0 167 12.6
10.05 157 12.5
10.1 187 13.3
10.15 197 14.0
";

    #[test]
    fn test_from_cif() {
        let expt = Experiment::from_cif_str(HRPT_CIF).unwrap();
        assert_eq!(expt.name(), "hrpt");
        assert_eq!(expt.instrument.wavelength(), Some(1.494));
        assert_eq!(expt.peak.as_ref().unwrap().value("broad_gauss_u"), 0.1);
        assert_eq!(expt.linked_phases.ids(), vec!["lbco"]);
        assert_eq!(expt.background.len(), 2);
        let data = expt.data.as_powder().unwrap();
        assert_eq!(data.len(), 4);
        assert_eq!(data.included_indices(), vec![2, 3]);
    }

    #[test]
    fn test_free_parameters() {
        let expt = Experiment::from_cif_str(HRPT_CIF).unwrap();
        let free: Vec<String> = expt.free_parameters().iter().map(|p| p.full_name()).collect();
        assert_eq!(
            free,
            vec!["hrpt.instrument.twotheta_offset", "hrpt.linked_phases.lbco.scale"]
        );
    }

    #[test]
    fn test_cif_round_trip() {
        let expt = Experiment::from_cif_str(HRPT_CIF).unwrap();
        let again = Experiment::from_cif_str(&expt.to_cif(None)).unwrap();
        assert_eq!(again.expt_type(), expt.expt_type());
        assert_eq!(again.data.len(), 4);
        assert_eq!(again.excluded_regions.len(), 1);
        assert_eq!(again.free_parameters().len(), 2);
    }

    #[test]
    fn test_add_excluded_region_drops_points() {
        let mut expt = Experiment::from_cif_str(HRPT_CIF).unwrap();
        assert_eq!(expt.data.fit_triples().len(), 2);

        expt.add_excluded_region(10.12, 12.0).unwrap();
        let data = expt.data.as_powder().unwrap();
        assert_eq!(data.included_indices(), vec![2]);
        assert_eq!(expt.data.fit_triples(), vec![(187.0, 0.0, 13.3)]);
        assert_eq!(expt.excluded_regions.len(), 2);

        assert!(expt.add_excluded_region(20.0, 15.0).is_err());
        assert_eq!(expt.excluded_regions.len(), 2);
    }

    #[test]
    fn test_single_crystal_has_no_peak() {
        let expt_type = ExperimentType::new(
            SampleForm::SingleCrystal,
            BeamMode::ConstantWavelength,
            RadiationProbe::Neutron,
            ScatteringType::Bragg,
        )
        .unwrap();
        let mut expt = Experiment::new("sc", expt_type).unwrap();
        assert!(expt.peak.is_none());
        assert!(expt.extinction.is_some());
        assert!(expt
            .set_peak_profile_type(PeakProfileType::PseudoVoigt)
            .is_err());
        assert!(expt.set_background_type(BackgroundType::LineSegment).is_err());
    }

    #[test]
    fn test_tof_uses_time_axis() {
        let expt_type = ExperimentType::new(
            SampleForm::Powder,
            BeamMode::TimeOfFlight,
            RadiationProbe::Neutron,
            ScatteringType::Bragg,
        )
        .unwrap();
        let expt = Experiment::new("tof", expt_type).unwrap();
        assert_eq!(expt.x_kind(), XKind::TimeOfFlight);
        assert!(expt.to_cif(None).contains("_instr.d_to_tof_linear 10000.0"));
    }
}
