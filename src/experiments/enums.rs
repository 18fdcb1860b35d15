//! # 实验类型枚举
//!
//! 样品形态、散射类型、辐射探针、光束模式、峰形与背景类型。
//! 每个枚举可与 CIF 拼写互相转换，命令行另接受简写。
//!
//! ## 依赖关系
//! - 被 `experiments/`、`analysis/`、`cli/` 使用

use crate::error::{DiffError, Result};

use std::fmt;
use std::str::FromStr;

/// 为枚举生成 `as_str` / `Display` / `FromStr`
///
/// `$alias` 为额外可接受的拼写（大小写不敏感）。
macro_rules! cif_enum {
    (
        $name:ident, $label:literal {
            $( $variant:ident => $cif:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// CIF 拼写
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $cif),+
                }
            }

            /// 全部 CIF 拼写，以逗号连接
            pub fn allowed() -> String {
                Self::ALL.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DiffError;

            fn from_str(s: &str) -> Result<Self> {
                let key = s.trim();
                $(
                    if key.eq_ignore_ascii_case($cif) $(|| key.eq_ignore_ascii_case($alias))* {
                        return Ok($name::$variant);
                    }
                )+
                Err(DiffError::InvalidChoice {
                    name: $label.to_string(),
                    value: key.to_string(),
                    allowed: Self::allowed(),
                })
            }
        }
    };
}

/// 样品形态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SampleForm {
    #[default]
    Powder,
    #[value(alias = "sc")]
    SingleCrystal,
}

cif_enum!(SampleForm, "sample_form" {
    Powder => "powder" | "pd",
    SingleCrystal => "single crystal" | "single-crystal" | "sc",
});

/// 散射类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ScatteringType {
    #[default]
    Bragg,
    #[value(alias = "pdf")]
    Total,
}

cif_enum!(ScatteringType, "scattering_type" {
    Bragg => "bragg",
    Total => "total" | "pdf",
});

/// 辐射探针
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RadiationProbe {
    #[default]
    Neutron,
    #[value(alias = "x-ray")]
    Xray,
}

cif_enum!(RadiationProbe, "radiation_probe" {
    Neutron => "neutron",
    Xray => "xray" | "x-ray",
});

impl RadiationProbe {
    pub fn probe(&self) -> crate::crystallography::scattering::Probe {
        match self {
            RadiationProbe::Neutron => crate::crystallography::scattering::Probe::Neutron,
            RadiationProbe::Xray => crate::crystallography::scattering::Probe::Xray,
        }
    }
}

/// 光束模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BeamMode {
    #[default]
    #[value(alias = "cwl")]
    ConstantWavelength,
    #[value(alias = "tof")]
    TimeOfFlight,
}

cif_enum!(BeamMode, "beam_mode" {
    ConstantWavelength => "constant wavelength" | "constant-wavelength" | "cwl",
    TimeOfFlight => "time-of-flight" | "time of flight" | "tof",
});

/// 峰形
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakProfileType {
    PseudoVoigt,
    SplitPseudoVoigt,
    ThompsonCoxHastings,
    PseudoVoigtIkedaCarpenter,
    PseudoVoigtBackToBack,
    GaussianDampedSinc,
}

cif_enum!(PeakProfileType, "peak_profile_type" {
    PseudoVoigt => "pseudo-voigt" | "pv",
    SplitPseudoVoigt => "split pseudo-voigt" | "split-pseudo-voigt" | "spv",
    ThompsonCoxHastings => "thompson-cox-hastings" | "tch",
    PseudoVoigtIkedaCarpenter => "pseudo-voigt * ikeda-carpenter" | "pv-ic",
    PseudoVoigtBackToBack => "pseudo-voigt * back-to-back" | "pv-b2b",
    GaussianDampedSinc => "gaussian-damped-sinc" | "gds",
});

impl PeakProfileType {
    /// 给定散射类型与光束模式的默认峰形
    pub fn default_for(scattering: ScatteringType, beam: BeamMode) -> Self {
        match (scattering, beam) {
            (ScatteringType::Bragg, BeamMode::ConstantWavelength) => PeakProfileType::PseudoVoigt,
            (ScatteringType::Bragg, BeamMode::TimeOfFlight) => {
                PeakProfileType::PseudoVoigtIkedaCarpenter
            }
            (ScatteringType::Total, _) => PeakProfileType::GaussianDampedSinc,
        }
    }

    /// 给定散射类型与光束模式允许的峰形
    pub fn allowed_for(scattering: ScatteringType, beam: BeamMode) -> &'static [PeakProfileType] {
        match (scattering, beam) {
            (ScatteringType::Bragg, BeamMode::ConstantWavelength) => &[
                PeakProfileType::PseudoVoigt,
                PeakProfileType::SplitPseudoVoigt,
                PeakProfileType::ThompsonCoxHastings,
            ],
            (ScatteringType::Bragg, BeamMode::TimeOfFlight) => &[
                PeakProfileType::PseudoVoigt,
                PeakProfileType::PseudoVoigtIkedaCarpenter,
                PeakProfileType::PseudoVoigtBackToBack,
            ],
            (ScatteringType::Total, _) => &[PeakProfileType::GaussianDampedSinc],
        }
    }
}

/// 背景类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BackgroundType {
    #[default]
    LineSegment,
    #[value(alias = "chebyshev")]
    ChebyshevPolynomial,
}

cif_enum!(BackgroundType, "background_type" {
    LineSegment => "line-segment" | "line segment",
    ChebyshevPolynomial => "chebyshev polynomial" | "chebyshev-polynomial" | "chebyshev",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cif_spellings_and_aliases() {
        assert_eq!("single crystal".parse::<SampleForm>().unwrap(), SampleForm::SingleCrystal);
        assert_eq!("TOF".parse::<BeamMode>().unwrap(), BeamMode::TimeOfFlight);
        assert_eq!("x-ray".parse::<RadiationProbe>().unwrap(), RadiationProbe::Xray);
        assert_eq!(
            "pseudo-voigt * ikeda-carpenter".parse::<PeakProfileType>().unwrap(),
            PeakProfileType::PseudoVoigtIkedaCarpenter
        );
        assert!("laser".parse::<RadiationProbe>().is_err());
    }

    #[test]
    fn test_display_uses_cif_spelling() {
        assert_eq!(BeamMode::ConstantWavelength.to_string(), "constant wavelength");
        assert_eq!(BackgroundType::ChebyshevPolynomial.to_string(), "chebyshev polynomial");
    }

    #[test]
    fn test_default_profiles() {
        use PeakProfileType::*;
        assert_eq!(
            PeakProfileType::default_for(ScatteringType::Bragg, BeamMode::ConstantWavelength),
            PseudoVoigt
        );
        assert_eq!(
            PeakProfileType::default_for(ScatteringType::Bragg, BeamMode::TimeOfFlight),
            PseudoVoigtIkedaCarpenter
        );
        assert_eq!(
            PeakProfileType::default_for(ScatteringType::Total, BeamMode::TimeOfFlight),
            GaussianDampedSinc
        );
        assert!(!PeakProfileType::allowed_for(ScatteringType::Bragg, BeamMode::ConstantWavelength)
            .contains(&PseudoVoigtBackToBack));
    }
}
