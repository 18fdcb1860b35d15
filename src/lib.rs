//! # diffrefine - 衍射图样建模与精修工具箱
//!
//! 以 CIF 项目目录为中心：样品模型（晶胞、空间群、原子位置）、
//! 实验（仪器、峰形、背景、测量数据）与分析设置（计算引擎、最小化器、约束）
//! 各自保存为 CIF 文件，可计算衍射图样并对自由参数做最小二乘精修。
//!
//! ## 依赖关系
//! ```text
//! lib.rs
//!   ├── core/            (参数、描述符、类别与集合)
//!   ├── parsers/         (CIF 读写、xye/hkl 数据文件)
//!   ├── crystallography/ (空间群、对称操作、晶胞)
//!   ├── sample_models/   (样品模型)
//!   ├── experiments/     (实验)
//!   ├── analysis/        (计算引擎、最小化器、拟合与约束)
//!   ├── project/         (项目目录、摘要)
//!   ├── display/         (表格与图表)
//!   ├── batch/           (文件收集、并行导出)
//!   ├── cli/ commands/   (命令行)
//!   ├── utils/           (输出与进度条)
//!   └── error.rs         (错误处理)
//! ```

pub mod analysis;
pub mod batch;
pub mod cli;
pub mod commands;
pub mod core;
pub mod crystallography;
pub mod display;
pub mod error;
pub mod experiments;
pub mod parsers;
pub mod project;
pub mod sample_models;
pub mod utils;

pub use error::{DiffError, Result};
