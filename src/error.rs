//! # 统一错误处理模块
//!
//! 定义 diffrefine 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// diffrefine 统一错误类型
#[derive(Error, Debug)]
pub enum DiffError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("CIF syntax error at line {line}: {reason}")]
    CifSyntax { line: usize, reason: String },

    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Missing required CIF item '{tag}' in data block '{block}'")]
    MissingCifItem { block: String, tag: String },

    // ─────────────────────────────────────────────────────────────
    // 模型校验错误
    // ─────────────────────────────────────────────────────────────
    #[error("Value {value} of '{name}' is outside the allowed range [{min}, {max}]")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid value '{value}' for '{name}'. Allowed: {allowed}")]
    InvalidChoice {
        name: String,
        value: String,
        allowed: String,
    },

    #[error("'{0}' is a descriptor and cannot be refined")]
    NotRefinable(String),

    #[error("Unknown space group: '{0}'")]
    UnknownSpaceGroup(String),

    #[error("Invalid symmetry operator '{op}': {reason}")]
    InvalidSymmetryOperator { op: String, reason: String },

    #[error("Incompatible experiment configuration: {0}")]
    IncompatibleExperiment(String),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    // ─────────────────────────────────────────────────────────────
    // 分析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Unknown {kind} engine '{name}'. Available: {available}")]
    UnknownEngine {
        kind: String,
        name: String,
        available: String,
    },

    #[error("Engine '{0}' is an external backend and is not available in this build")]
    EngineUnavailable(String),

    #[error("Calculator '{calculator}' does not support {what}")]
    UnsupportedCalculation { calculator: String, what: String },

    #[error("Nothing to fit: {0}")]
    NothingToFit(String),

    #[error("Invalid constraint expression '{expr}': {reason}")]
    InvalidExpression { expr: String, reason: String },

    #[error("Minimization failed: {0}")]
    MinimizationFailed(String),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    // ─────────────────────────────────────────────────────────────
    // 序列化与绘图错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Plot rendering failed: {0}")]
    PlotError(String),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("No matching files found with pattern: {pattern}")]
    NoFilesFound { pattern: String },

    #[error("{0}")]
    Other(String),
}

impl DiffError {
    /// 构造 "未找到" 错误
    pub fn not_found(kind: &str, name: &str) -> Self {
        DiffError::NotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }

    /// 构造读文件错误
    pub fn read(path: &std::path::Path, source: std::io::Error) -> Self {
        DiffError::FileReadError {
            path: path.display().to_string(),
            source,
        }
    }

    /// 构造写文件错误
    pub fn write(path: &std::path::Path, source: std::io::Error) -> Self {
        DiffError::FileWriteError {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, DiffError>;
