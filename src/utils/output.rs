//! # 美化输出工具
//!
//! 提供统一的终端输出样式，并按全局输出级别过滤消息。
//!
//! ## 输出级别
//! - `quiet`: 只输出错误与警告
//! - `normal`: 默认
//! - `verbose`: 额外输出调试信息 (`print_debug`)
//!
//! ## 依赖关系
//! - 被所有 `commands/` 模块和分析模块使用
//! - 使用 `colored` crate

use colored::Colorize;
use std::sync::atomic::{AtomicU8, Ordering};

/// 输出级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum, Default)]
pub enum Verbosity {
    /// Only warnings and errors
    Quiet,
    /// Regular progress messages
    #[default]
    Normal,
    /// Additional diagnostic messages
    Verbose,
}

static VERBOSITY: AtomicU8 = AtomicU8::new(1);

/// 设置全局输出级别
pub fn set_verbosity(level: Verbosity) {
    VERBOSITY.store(level as u8, Ordering::Relaxed);
}

/// 当前输出级别
pub fn verbosity() -> Verbosity {
    match VERBOSITY.load(Ordering::Relaxed) {
        0 => Verbosity::Quiet,
        1 => Verbosity::Normal,
        _ => Verbosity::Verbose,
    }
}

fn enabled(level: Verbosity) -> bool {
    verbosity() >= level
}

/// 打印成功消息
pub fn print_success(msg: &str) {
    if enabled(Verbosity::Normal) {
        println!("{} {}", "[OK]".green().bold(), msg);
    }
}

/// 打印错误消息
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERR]".red().bold(), msg);
}

/// 打印警告消息
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "[WARN]".yellow().bold(), msg);
}

/// 打印信息消息
pub fn print_info(msg: &str) {
    if enabled(Verbosity::Normal) {
        println!("{} {}", "[*]".blue().bold(), msg);
    }
}

/// 打印调试消息（仅 verbose）
pub fn print_debug(msg: &str) {
    if enabled(Verbosity::Verbose) {
        println!("{} {}", "[DBG]".dimmed(), msg.dimmed());
    }
}

/// 打印跳过消息
pub fn print_skip(msg: &str) {
    if enabled(Verbosity::Normal) {
        println!("{} {}", "[SKIP]".dimmed(), msg);
    }
}

/// 打印完成消息
pub fn print_done(msg: &str) {
    if enabled(Verbosity::Normal) {
        println!("{} {}", "[DONE]".green().bold(), msg);
    }
}

/// 打印标题栏
pub fn print_header(title: &str) {
    if enabled(Verbosity::Normal) {
        let line = "─".repeat(60);
        println!("\n{}", line.dimmed());
        println!("  {}", title.bold());
        println!("{}\n", line.dimmed());
    }
}

/// 打印小节标题
pub fn print_section(title: &str) {
    if enabled(Verbosity::Normal) {
        println!("\n{}", title.cyan().bold());
    }
}

/// 打印分隔线
pub fn print_separator() {
    if enabled(Verbosity::Normal) {
        println!("{}", "─".repeat(60).dimmed());
    }
}

/// 打印块内容（表格、图表），quiet 模式下同样输出
pub fn print_block(content: &str) {
    println!("{}", content);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_ordering() {
        assert!(Verbosity::Verbose > Verbosity::Normal);
        assert!(Verbosity::Normal > Verbosity::Quiet);
        assert_eq!(Verbosity::default(), Verbosity::Normal);
    }
}
