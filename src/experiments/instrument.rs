//! # 仪器类别
//!
//! 恒定波长仪器：波长与 2θ 零点偏移。
//! 飞行时间仪器：探测器组 2θ 与 d → TOF 标定多项式
//! `tof = offset + linear·d + quad·d² + recip/d`。
//!
//! ## 依赖关系
//! - 被 `experiments/experiment.rs` 与 `analysis/calculators/` 使用

use crate::core::cif::CifWriter;
use crate::core::Parameter;
use crate::error::Result;
use crate::experiments::enums::BeamMode;
use crate::parsers::CifBlock;

pub const CATEGORY: &str = "instrument";

/// 恒定波长仪器
#[derive(Debug, Clone)]
pub struct CwlInstrument {
    pub wavelength: Parameter,
    pub twotheta_offset: Parameter,
}

impl Default for CwlInstrument {
    fn default() -> Self {
        Self {
            wavelength: Parameter::new("wavelength", 1.5406)
                .cif("_instr.wavelength")
                .with_units("Å")
                .range(0.0, f64::INFINITY)
                .with_description("Incident neutron or X-ray wavelength")
                .category(CATEGORY),
            twotheta_offset: Parameter::new("twotheta_offset", 0.0)
                .cif("_instr.2theta_offset")
                .with_units("deg")
                .range(-180.0, 180.0)
                .with_description("Instrument misalignment offset")
                .category(CATEGORY),
        }
    }
}

impl CwlInstrument {
    /// d (Å) → 2θ (deg)，含零点偏移；d 过小无衍射时返回 None
    pub fn two_theta_from_d(&self, d: f64) -> Option<f64> {
        let sin_theta = self.wavelength.value() / (2.0 * d);
        if d <= 0.0 || sin_theta.is_nan() || sin_theta >= 1.0 {
            return None;
        }
        Some(2.0 * sin_theta.asin().to_degrees() + self.twotheta_offset.value())
    }

    /// 2θ (deg) → d (Å)
    pub fn d_from_two_theta(&self, two_theta: f64) -> f64 {
        let theta = ((two_theta - self.twotheta_offset.value()) / 2.0).to_radians();
        self.wavelength.value() / (2.0 * theta.sin())
    }
}

/// 飞行时间仪器
#[derive(Debug, Clone)]
pub struct TofInstrument {
    pub twotheta_bank: Parameter,
    pub d_to_tof_offset: Parameter,
    pub d_to_tof_linear: Parameter,
    pub d_to_tof_quad: Parameter,
    pub d_to_tof_recip: Parameter,
}

impl Default for TofInstrument {
    fn default() -> Self {
        Self {
            twotheta_bank: Parameter::new("twotheta_bank", 150.0)
                .cif("_instr.2theta_bank")
                .with_units("deg")
                .range(0.0, 180.0)
                .with_description("Detector bank position")
                .category(CATEGORY),
            d_to_tof_offset: Parameter::new("d_to_tof_offset", 0.0)
                .cif("_instr.d_to_tof_offset")
                .with_units("µs")
                .with_description("TOF offset")
                .category(CATEGORY),
            d_to_tof_linear: Parameter::new("d_to_tof_linear", 10000.0)
                .cif("_instr.d_to_tof_linear")
                .with_units("µs/Å")
                .with_description("TOF linear conversion")
                .category(CATEGORY),
            d_to_tof_quad: Parameter::new("d_to_tof_quad", -0.00001)
                .cif("_instr.d_to_tof_quad")
                .with_units("µs/Å²")
                .with_description("TOF quadratic correction")
                .category(CATEGORY),
            d_to_tof_recip: Parameter::new("d_to_tof_recip", 0.0)
                .cif("_instr.d_to_tof_recip")
                .with_units("µs·Å")
                .with_description("TOF reciprocal velocity correction")
                .category(CATEGORY),
        }
    }
}

impl TofInstrument {
    /// d (Å) → TOF (µs)
    pub fn tof_from_d(&self, d: f64) -> f64 {
        let recip = if d > 0.0 {
            self.d_to_tof_recip.value() / d
        } else {
            0.0
        };
        self.d_to_tof_offset.value()
            + self.d_to_tof_linear.value() * d
            + self.d_to_tof_quad.value() * d * d
            + recip
    }

    /// TOF (µs) → d (Å)，牛顿迭代，线性解为初值
    pub fn d_from_tof(&self, tof: f64) -> Option<f64> {
        let linear = self.d_to_tof_linear.value();
        if linear == 0.0 {
            return None;
        }
        let mut d = (tof - self.d_to_tof_offset.value()) / linear;
        if d <= 0.0 {
            return None;
        }
        for _ in 0..50 {
            let f = self.tof_from_d(d) - tof;
            let df = linear + 2.0 * self.d_to_tof_quad.value() * d
                - self.d_to_tof_recip.value() / (d * d);
            if df == 0.0 {
                break;
            }
            let step = f / df;
            d -= step;
            if d <= 0.0 {
                return None;
            }
            if step.abs() < 1e-12 * d.max(1.0) {
                break;
            }
        }
        Some(d)
    }
}

/// 仪器（按光束模式）
#[derive(Debug, Clone)]
pub enum Instrument {
    Cwl(CwlInstrument),
    Tof(TofInstrument),
}

impl Instrument {
    pub fn for_beam_mode(beam_mode: BeamMode) -> Self {
        match beam_mode {
            BeamMode::ConstantWavelength => Instrument::Cwl(CwlInstrument::default()),
            BeamMode::TimeOfFlight => Instrument::Tof(TofInstrument::default()),
        }
    }

    /// 衍射角 2θ (deg)；TOF 仪器为探测器组角度
    pub fn two_theta_from_d(&self, d: f64) -> Option<f64> {
        match self {
            Instrument::Cwl(i) => i.two_theta_from_d(d),
            Instrument::Tof(i) => Some(i.twotheta_bank.value()),
        }
    }

    /// 波长 (Å)；TOF 仪器由 λ = 2d·sinθ 对每个 d 单独确定，返回 None
    pub fn wavelength(&self) -> Option<f64> {
        match self {
            Instrument::Cwl(i) => Some(i.wavelength.value()),
            Instrument::Tof(_) => None,
        }
    }

    pub fn parameters(&self) -> Vec<&Parameter> {
        match self {
            Instrument::Cwl(i) => vec![&i.wavelength, &i.twotheta_offset],
            Instrument::Tof(i) => vec![
                &i.twotheta_bank,
                &i.d_to_tof_offset,
                &i.d_to_tof_linear,
                &i.d_to_tof_quad,
                &i.d_to_tof_recip,
            ],
        }
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        match self {
            Instrument::Cwl(i) => vec![&mut i.wavelength, &mut i.twotheta_offset],
            Instrument::Tof(i) => vec![
                &mut i.twotheta_bank,
                &mut i.d_to_tof_offset,
                &mut i.d_to_tof_linear,
                &mut i.d_to_tof_quad,
                &mut i.d_to_tof_recip,
            ],
        }
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
