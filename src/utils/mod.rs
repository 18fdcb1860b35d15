//! # 工具函数模块
//!
//! 提供美化输出（含输出级别控制）与进度条。
//!
//! ## 依赖关系
//! - 被 `commands/`、`analysis/`、`batch/` 使用
//! - 子模块: output, progress

pub mod output;
pub mod progress;
