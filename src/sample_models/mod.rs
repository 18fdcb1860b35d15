//! # 样品模型模块
//!
//! 晶体结构的描述：空间群、晶胞、原子位置。
//!
//! ## 依赖关系
//! - 被 `analysis/`、`project/`、`commands/` 使用
//! - 使用 `core/`、`crystallography/`、`parsers/`
//! - 子模块: space_group, cell, atom_sites, sample_model, collection

pub mod atom_sites;
pub mod cell;
pub mod collection;
pub mod sample_model;
pub mod space_group;

pub use atom_sites::{AtomSite, AtomSites};
pub use cell::Cell;
pub use collection::SampleModels;
pub use sample_model::{SampleModel, UnitCellAtom};
pub use space_group::SpaceGroup;
