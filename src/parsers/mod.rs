//! # 解析器模块
//!
//! 读取注量谱与反散射因子网格文件。
//!
//! ## 支持格式
//! - 注量谱: `.csv`（energy_kev, fluence 两列）、`.json`
//! - BSF 网格: `.json`（轴 + 扁平或嵌套值）、`.csv`（长表格式）
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 构造 `models::Spectrum` 与 `physics::BackscatterGrid`
//! - 子模块: spectrum, bsf_grid

pub mod bsf_grid;
pub mod spectrum;

pub use bsf_grid::{load_bsf_grid, parse_grid_csv, parse_grid_json};
pub use spectrum::{load_spectrum, parse_spectrum_csv, parse_spectrum_json};

use crate::error::{DoseError, Result};
use std::fs;
use std::path::Path;

/// 文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Json,
}

/// 从扩展名推断格式
pub fn detect_format(path: &Path) -> Result<DataFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" | "txt" => Ok(DataFormat::Csv),
        "json" => Ok(DataFormat::Json),
        _ => Err(DoseError::UnsupportedFormat(format!(
            "Cannot determine format for: {} (expected .csv or .json)",
            path.display()
        ))),
    }
}

/// 读取整个文件
pub(crate) fn read_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(DoseError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    fs::read_to_string(path).map_err(|e| DoseError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })
}

pub(crate) fn parse_error(format: &str, source: &str, reason: impl ToString) -> DoseError {
    DoseError::ParseError {
        format: format.to_string(),
        path: source.to_string(),
        reason: reason.to_string(),
    }
}
