//! # 拟合模块
//!
//! ## 组成
//! - `fitter`：自由参数收集、残差构造与最小化
//! - `metrics`：可靠性因子
//! - `progress`：迭代进度表
//! - `results`：拟合结果
//!
//! ## 依赖关系
//! - 被 `analysis/workflow.rs` 使用

pub mod fitter;
pub mod metrics;
pub mod progress;
pub mod results;

pub use fitter::{FitTarget, Fitter};
pub use metrics::{reliability_factors, ReliabilityFactors};
pub use progress::FitProgressTracker;
pub use results::{FitResults, FittedParameter};
