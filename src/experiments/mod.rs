//! # 实验模块
//!
//! 衍射实验：实验类型、仪器、峰形、背景、排除区间、关联相与测量数据。
//!
//! ## 依赖关系
//! - 被 `analysis/`、`project/`、`display/`、`commands/` 使用
//! - 使用 `core/`、`parsers/`
//! - 子模块: enums, experiment_type, instrument, peak, background,
//!   excluded_regions, linked_phases, data, experiment, collection

pub mod background;
pub mod collection;
pub mod data;
pub mod enums;
pub mod excluded_regions;
pub mod experiment;
pub mod experiment_type;
pub mod instrument;
pub mod linked_phases;
pub mod peak;

pub use background::Background;
pub use collection::Experiments;
pub use data::{ExperimentData, PowderData, Reflection, Reflections, XKind};
pub use enums::{
    BackgroundType, BeamMode, PeakProfileType, RadiationProbe, SampleForm, ScatteringType,
};
pub use experiment::Experiment;
pub use experiment_type::ExperimentType;
pub use instrument::Instrument;
pub use peak::Peak;
