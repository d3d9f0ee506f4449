//! # bsf 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/bsf.rs`

use clap::Args;
use std::path::PathBuf;

/// bsf 子命令参数
#[derive(Args, Debug)]
pub struct BsfArgs {
    /// Backscatter factor grid (.json or long-format .csv)
    #[arg(long, env = "XDOSE_BSF_GRID")]
    pub grid: PathBuf,

    /// Source-to-skin distance in cm
    #[arg(long, default_value_t = 100.0)]
    pub ssd: f64,

    /// Photon energy in keV
    #[arg(long)]
    pub energy: f64,

    /// Field diameter in cm
    #[arg(long)]
    pub diameter: f64,
}
