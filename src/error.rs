//! # 统一错误处理模块
//!
//! 定义 xdose 的所有错误类型，使用 `thiserror` 派生。
//!
//! 注意：BSF 越界回退与数值退化不是错误，它们作为
//! `models::Diagnostic` 标志出现在结果中。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// xdose 统一错误类型
#[derive(Error, Debug)]
pub enum DoseError {
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
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Invalid backscatter grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid spectrum: {0}")]
    InvalidSpectrum(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 输入校验错误（计算开始前）
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid {field} = {value}: {constraint}")]
    Validation {
        field: String,
        value: String,
        constraint: String,
    },

    #[error("Unknown material: {0}")]
    UnknownMaterial(String),

    #[error("Unknown device preset: {0}")]
    UnknownDevice(String),

    // ─────────────────────────────────────────────────────────────
    // 数值错误
    // ─────────────────────────────────────────────────────────────
    #[error(
        "Energy {energy} keV outside tabulated range [{min}, {max}] keV for {material}"
    )]
    EnergyOutOfRange {
        material: String,
        energy: f64,
        min: f64,
        max: f64,
    },

    #[error("Root finding failed for {metric}: {reason} (searched [{lower}, {upper}])")]
    RootFindFailure {
        metric: String,
        lower: f64,
        upper: f64,
        reason: String,
    },

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 序列化错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("No matching files found with pattern: {pattern}")]
    NoFilesFound { pattern: String },
}

impl DoseError {
    /// 构造参数范围校验错误
    pub fn validation(field: &str, value: impl ToString, constraint: impl Into<String>) -> Self {
        DoseError::Validation {
            field: field.to_string(),
            value: value.to_string(),
            constraint: constraint.into(),
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, DoseError>;
