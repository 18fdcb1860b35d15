//! # 项目模块
//!
//! 将样品模型、实验与分析设置组合为一个可持久化的单元。
//!
//! ## 子模块
//! - `info`：项目标识与时间戳
//! - `manager`：`Project` 的加载、保存与分析入口
//! - `summary`：项目摘要报告
//!
//! ## 依赖关系
//! - 使用 `sample_models/`、`experiments/`、`analysis/`
//! - 被 `commands/` 使用

pub mod info;
pub mod manager;
pub mod summary;

pub use info::ProjectInfo;
pub use manager::Project;
pub use summary::Summary;
