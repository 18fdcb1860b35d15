//! # 晶体学基础模块
//!
//! ## 子模块
//! - `lattice`: 晶格与倒格矢
//! - `symmetry`: 对称操作与等效位置
//! - `space_groups`: 空间群表、晶系、晶胞约束
//! - `scattering`: X 射线散射因子与中子散射长度
//!
//! ## 依赖关系
//! - 被 `sample_models/` 与 `analysis/calculators/` 使用

pub mod lattice;
pub mod scattering;
pub mod space_groups;
pub mod symmetry;

pub use lattice::Lattice;
pub use space_groups::{CellRule, CrystalSystem, SpaceGroupEntry};
pub use symmetry::SymOp;
