//! # calc 子命令 CLI 定义
//!
//! `BeamArgs` 同时被 `batch` 子命令复用。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs`、`cli/batch.rs` 使用
//! - 参数传递给 `commands/calc.rs`

use crate::models::Material;
use crate::physics::TransmissionWeighting;

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 结果输出格式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON document on stdout
    Json,
}

/// 透射率加权方式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum HvlWeighting {
    /// Weight transmission by energy fluence E·Φ
    EnergyFluence,
    /// Weight transmission by air kerma E·Φ·μen
    AirKerma,
}

impl From<HvlWeighting> for TransmissionWeighting {
    fn from(w: HvlWeighting) -> Self {
        match w {
            HvlWeighting::EnergyFluence => TransmissionWeighting::EnergyFluence,
            HvlWeighting::AirKerma => TransmissionWeighting::AirKerma,
        }
    }
}

/// 解析材料名称
pub fn parse_material(input: &str) -> Result<Material, String> {
    input.parse::<Material>().map_err(|e| e.to_string())
}

/// 曝光与引擎参数（calc 与 batch 共用）
#[derive(Args, Debug, Clone)]
pub struct BeamArgs {
    /// Tube potential in kVp
    #[arg(long)]
    pub kvp: f64,

    /// Tube current in mA
    #[arg(long)]
    pub ma: f64,

    /// Exposure time in seconds
    #[arg(long)]
    pub time: f64,

    /// Source-to-skin distance in cm
    #[arg(long, default_value_t = 100.0)]
    pub ssd: f64,

    /// Anode angle in degrees (default 12, or the device preset's value)
    #[arg(long)]
    pub anode_angle: Option<f64>,

    /// Added filtration, e.g. "Al:2.5,Cu:0.1" (overrides the device preset)
    #[arg(long)]
    pub filter: Option<String>,

    /// Field diameter in cm; enables BSF and ESAK
    #[arg(long)]
    pub diameter: Option<f64>,

    /// Phantom material the BSF refers to
    #[arg(long, default_value = "water", value_parser = parse_material)]
    pub phantom: Material,

    /// Device preset id (see `xdose devices`)
    #[arg(long)]
    pub device: Option<String>,

    /// Reference air kerma at 100 cm in uGy/mAs (derived from the spectrum if omitted)
    #[arg(long)]
    pub kerma_per_mas: Option<f64>,

    /// Backscatter factor grid (.json or long-format .csv)
    #[arg(long, env = "XDOSE_BSF_GRID")]
    pub bsf_grid: Option<PathBuf>,

    /// The spectrum already includes the filtration; do not apply it again
    #[arg(long, default_value_t = false)]
    pub prefiltered: bool,

    /// Reference material for HVL and effective energy
    #[arg(long, default_value = "Al", value_parser = parse_material)]
    pub hvl_material: Material,

    /// Further materials to report HVL1 in (comma separated)
    #[arg(long, value_delimiter = ',', default_value = "Cu", value_parser = parse_material)]
    pub also_hvl: Vec<Material>,

    /// Transmission weighting used for HVL
    #[arg(long, value_enum, default_value = "energy-fluence")]
    pub hvl_weighting: HvlWeighting,

    /// Upper limit of the HVL thickness search in mm
    #[arg(long, default_value_t = 50.0)]
    pub max_thickness: f64,
}

/// calc 子命令参数
#[derive(Args, Debug)]
pub struct CalcArgs {
    /// Photon fluence spectrum (.csv or .json) at 100 cm per mAs
    #[arg(short, long)]
    pub spectrum: PathBuf,

    #[command(flatten)]
    pub beam: BeamArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Also write the JSON report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
