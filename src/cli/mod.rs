//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `calc`: 单次剂量计算
//! - `batch`: 批量计算目录中的注量谱
//! - `bsf`: 单点查询反散射因子网格
//! - `devices`: 列出设备预设
//! - `materials`: 列出支持的材料
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: calc, batch, bsf

pub mod batch;
pub mod bsf;
pub mod calc;

use clap::{ArgAction, Parser, Subcommand};

/// xdose - X 射线剂量与线质计算工具
#[derive(Parser)]
#[command(name = "xdose")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Entrance surface air kerma and beam-quality calculator for X-ray spectra", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Compute IAK, ESAK, BSF and beam quality for one spectrum
    Calc(calc::CalcArgs),

    /// Evaluate every spectrum file in a directory in parallel
    Batch(batch::BatchArgs),

    /// Query the monoenergetic backscatter factor grid at one point
    Bsf(bsf::BsfArgs),

    /// List built-in X-ray device presets
    Devices,

    /// List supported attenuator materials and their table ranges
    Materials,
}
