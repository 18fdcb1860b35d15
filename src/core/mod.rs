//! # 核心抽象模块
//!
//! 参数模型、有序集合与 CIF 写出辅助。
//!
//! ## 依赖关系
//! - 被 `sample_models/`、`experiments/`、`analysis/`、`project/` 使用
//! - 子模块: parameter, collection, uncertainty, cif

pub mod cif;
pub mod collection;
pub mod parameter;
pub mod uncertainty;

pub use collection::{Collection, Keyed};
pub use parameter::{HasParameters, Identity, Parameter, StringDescriptor};
