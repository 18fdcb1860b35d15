//! # 拟合进度跟踪
//!
//! 每次目标函数求值记为一次迭代。首次迭代以及 χ²ᵣ 相对上次报告值
//! 改善超过 1% 时输出一行，并记录最佳 χ²ᵣ 及其迭代号。
//!
//! ## 依赖关系
//! - 被 `analysis/fitting/fitter.rs` 使用
//! - 使用 `utils/output.rs` 控制输出级别

use crate::utils::output::{print_block, print_info, verbosity, Verbosity};

use std::time::{Duration, Instant};

/// 报告阈值（百分比）
const IMPROVEMENT_THRESHOLD: f64 = 1.0;
const COLUMN_WIDTH: usize = 17;
const HEADERS: [&str; 3] = ["iteration", "χ²", "improvement [%]"];

/// 表格中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRow {
    pub iteration: usize,
    pub reduced_chi2: f64,
    pub improvement: Option<f64>,
}

#[derive(Debug)]
pub struct FitProgressTracker {
    iteration: usize,
    last_reported: Option<f64>,
    best_chi2: Option<f64>,
    best_iteration: usize,
    started: Option<Instant>,
    elapsed: Option<Duration>,
    rows: Vec<ProgressRow>,
    echo: bool,
}

impl Default for FitProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FitProgressTracker {
    pub fn new() -> Self {
        Self {
            iteration: 0,
            last_reported: None,
            best_chi2: None,
            best_iteration: 0,
            started: None,
            elapsed: None,
            rows: Vec::new(),
            echo: verbosity() >= Verbosity::Normal,
        }
    }

    /// 不输出表格，仅记录
    pub fn silent(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn start(&mut self, minimizer: &str) {
        self.iteration = 0;
        self.last_reported = None;
        self.best_chi2 = None;
        self.best_iteration = 0;
        self.rows.clear();
        self.elapsed = None;
        self.started = Some(Instant::now());
        if self.echo {
            print_info(&format!("Using minimizer '{}'", minimizer));
            print_block(&border('┏', '┯', '┓'));
            print_block(&line(&HEADERS.map(str::to_string)));
            print_block(&border('┠', '┼', '┨'));
        }
    }

    /// 记录一次求值
    pub fn track(&mut self, reduced_chi2: f64) {
        self.iteration += 1;

        if reduced_chi2.is_finite() && self.best_chi2.map_or(true, |b| reduced_chi2 < b) {
            self.best_chi2 = Some(reduced_chi2);
            self.best_iteration = self.iteration;
        }

        let row = match self.last_reported {
            None => Some(ProgressRow {
                iteration: self.iteration,
                reduced_chi2,
                improvement: None,
            }),
            Some(previous) if previous > 0.0 && reduced_chi2.is_finite() => {
                let improvement = (previous - reduced_chi2) / previous * 100.0;
                (improvement > IMPROVEMENT_THRESHOLD).then_some(ProgressRow {
                    iteration: self.iteration,
                    reduced_chi2,
                    improvement: Some(improvement),
                })
            }
            Some(_) => None,
        };
        if let Some(row) = row {
            self.last_reported = Some(row.reduced_chi2);
            self.emit(&row);
            self.rows.push(row);
        }
    }

    pub fn finish(&mut self) {
        self.elapsed = self.started.map(|s| s.elapsed());
        if !self.echo {
            return;
        }
        if let Some(best) = self.best_chi2 {
            let already_shown = self
                .rows
                .last()
                .is_some_and(|r| r.iteration == self.best_iteration);
            if !already_shown {
                self.emit(&ProgressRow {
                    iteration: self.best_iteration,
                    reduced_chi2: best,
                    improvement: None,
                });
            }
        }
        print_block(&border('┗', '┷', '┛'));
        if let Some(best) = self.best_chi2 {
            print_info(&format!(
                "Best goodness-of-fit (reduced χ²) is {:.2} at iteration {}",
                best, self.best_iteration
            ));
        }
        if let Some(elapsed) = self.elapsed {
            print_info(&format!("Fitting time: {:.2} seconds", elapsed.as_secs_f64()));
        }
    }

    fn emit(&self, row: &ProgressRow) {
        if !self.echo {
            return;
        }
        let improvement = row
            .improvement
            .map(|v| format!("{:.1}% ↓", v))
            .unwrap_or_default();
        print_block(&line(&[
            row.iteration.to_string(),
            format!("{:.2}", row.reduced_chi2),
            improvement,
        ]));
    }

    pub fn iterations(&self) -> usize {
        self.iteration
    }

    pub fn best(&self) -> Option<(f64, usize)> {
        self.best_chi2.map(|b| (b, self.best_iteration))
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    pub fn rows(&self) -> &[ProgressRow] {
        &self.rows
    }
}

fn border(left: char, mid: char, right: char) -> String {
    let bar = "━".repeat(COLUMN_WIDTH);
    format!("{left}{bar}{mid}{bar}{mid}{bar}{right}")
}

fn line(cells: &[String; 3]) -> String {
    let body: Vec<String> = cells
        .iter()
        .map(|c| format!("{:^width$}", c, width = COLUMN_WIDTH))
        .collect();
    format!("┃{}┃", body.join("│"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_only_significant_improvements() {
        let mut tracker = FitProgressTracker::new().silent();
        tracker.start("lm");
        for chi2 in [100.0, 99.5, 90.0, 89.8, 50.0, 60.0] {
            tracker.track(chi2);
        }
        tracker.finish();
        let shown: Vec<usize> = tracker.rows().iter().map(|r| r.iteration).collect();
        assert_eq!(shown, vec![1, 3, 5]);
        assert_eq!(tracker.best(), Some((50.0, 5)));
        assert_eq!(tracker.iterations(), 6);
        assert!(tracker.elapsed().is_some());
    }

    #[test]
    fn test_line_width() {
        let row = line(&HEADERS.map(str::to_string));
        assert_eq!(row.chars().count(), 3 * COLUMN_WIDTH + 4);
        assert_eq!(border('┏', '┯', '┓').chars().count(), 3 * COLUMN_WIDTH + 4);
    }
}
