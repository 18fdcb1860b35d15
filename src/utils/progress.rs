//! # 进度条工具
//!
//! 封装 `indicatif` 提供统一的进度条样式。quiet 模式下返回隐藏的进度条。
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs` 和 `commands/` 使用
//! - 使用 `indicatif` crate

use crate::utils::output::{verbosity, Verbosity};

use indicatif::{ProgressBar, ProgressStyle};

/// 创建标准进度条
pub fn create_progress_bar(len: u64, message: &str) -> ProgressBar {
    if verbosity() == Verbosity::Quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(message.to_string());
    pb
}

/// 创建 spinner（用于迭代次数未知的任务，例如拟合）
pub fn create_spinner(message: &str) -> ProgressBar {
    if verbosity() == Verbosity::Quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {elapsed_precise} {msg}") {
        pb.set_style(style.tick_strings(&["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
