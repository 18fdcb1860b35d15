//! # 批量处理模块
//!
//! ## 功能
//! - 收集匹配文件列表（项目加载、`new` 命令的目录输入）
//! - 并行执行任务，带进度反馈与统计
//! - 图样导出（CSV / XY）
//!
//! ## 依赖关系
//! - 被 `project/` 与 `commands/` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod export;
pub mod runner;

pub use collector::FileCollector;
pub use export::{export_experiment, ExportFormat};
pub use runner::{BatchResult, BatchRunner, ProcessResult};
