//! # 分析模块
//!
//! 图样计算、参数拟合与用户约束。
//!
//! ## 子模块
//! - `calculators`：衍射计算后端
//! - `minimizers`：最小化算法
//! - `fitting`：拟合器、可靠性因子、进度与结果
//! - `constraints` / `expression`：别名与约束表达式
//! - `workflow`：分析设置（`Analysis`）
//!
//! ## 依赖关系
//! - 使用 `sample_models/`、`experiments/`
//! - 被 `project/`、`commands/` 使用

pub mod calculators;
pub mod constraints;
pub mod expression;
pub mod fitting;
pub mod minimizers;
pub mod workflow;

pub use calculators::{calculate_pattern, Calculator, CalculatorFactory, EngineInfo};
pub use constraints::{Alias, Constraint, Constraints};
pub use fitting::{FitResults, FitTarget, Fitter, ReliabilityFactors};
pub use minimizers::{Minimizer, MinimizerFactory};
pub use workflow::{Analysis, FitMode};
