//! # 批量执行器
//!
//! 在独立的 rayon 线程池中并行处理一组任务。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代，`jobs = 0` 时使用全部 CPU
//! - 进度条显示
//! - 错误收集与汇总报告
//!
//! ## 依赖关系
//! - 被 `commands/export.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::error::{DiffError, Result};
use crate::utils::{output, progress};

use rayon::prelude::*;

/// 单个任务处理结果
#[derive(Debug, Clone)]
pub enum ProcessResult {
    /// 处理成功
    Success(String),
    /// 跳过（如文件已存在）
    Skipped(String),
    /// 处理失败
    Failed(String, String), // (任务名, 错误信息)
}

/// 批量处理结果统计
#[derive(Debug, Default)]
pub struct BatchResult {
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
    /// 失败详情
    pub failures: Vec<(String, String)>,
}

impl BatchResult {
    /// 合并处理结果
    pub fn merge(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Success(_) => self.success += 1,
            ProcessResult::Skipped(_) => self.skipped += 1,
            ProcessResult::Failed(name, err) => {
                self.failed += 1;
                self.failures.push((name, err));
            }
        }
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }

    /// 打印汇总行与失败详情
    pub fn report(&self, action: &str) {
        output::print_separator();
        output::print_done(&format!(
            "{}: {}, skipped: {}, failed: {} (total {})",
            action,
            self.success,
            self.skipped,
            self.failed,
            self.total()
        ));
        for (name, err) in &self.failures {
            output::print_error(&format!("{}: {}", name, err));
        }
    }
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
}

impl BatchRunner {
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 并行处理任务列表
    pub fn run<T, F>(&self, items: &[T], message: &str, processor: F) -> Result<BatchResult>
    where
        T: Sync,
        F: Fn(&T) -> ProcessResult + Sync + Send,
    {
        let pb = progress::create_progress_bar(items.len() as u64, message);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| DiffError::Other(format!("cannot start thread pool: {}", e)))?;

        let results: Vec<ProcessResult> = pool.install(|| {
            items
                .par_iter()
                .map(|item| {
                    let result = processor(item);
                    pb.inc(1);
                    result
                })
                .collect()
        });

        pb.finish_and_clear();

        let mut batch_result = BatchResult::default();
        for result in results {
            batch_result.merge(result);
        }
        Ok(batch_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_collects_outcomes() {
        let runner = BatchRunner::new(2);
        assert_eq!(runner.jobs(), 2);
        let items = vec![1, 2, 3, 4, 5];
        let result = runner
            .run(&items, "Testing", |n| match n % 3 {
                0 => ProcessResult::Failed(n.to_string(), "divisible by 3".to_string()),
                1 => ProcessResult::Success(n.to_string()),
                _ => ProcessResult::Skipped(n.to_string()),
            })
            .unwrap();
        assert_eq!(result.total(), 5);
        assert_eq!(result.success, 2);
        assert_eq!(result.skipped, 2);
        assert_eq!(result.failures, vec![("3".to_string(), "divisible by 3".to_string())]);
    }

    #[test]
    fn test_zero_jobs_uses_all_cpus() {
        assert_eq!(BatchRunner::new(0).jobs(), num_cpus::get());
    }
}
