//! # batch 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/batch.rs`

use super::calc::BeamArgs;
use clap::Args;
use std::path::PathBuf;

/// batch 子命令参数
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Directory containing spectrum files
    pub input: PathBuf,

    #[command(flatten)]
    pub beam: BeamArgs,

    /// Glob pattern for spectrum files (comma separated)
    #[arg(long, default_value = "*.csv,*.json")]
    pub pattern: String,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Recurse into subdirectories
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Summary CSV with one row per spectrum
    #[arg(long, default_value = "dose_summary.csv")]
    pub summary: PathBuf,

    /// Also write one JSON report per spectrum into this directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Overwrite existing per-spectrum reports
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
