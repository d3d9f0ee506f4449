//! # devices 子命令实现
//!
//! ## 依赖关系
//! - 使用 `models/device.rs` 的预设表

use crate::error::Result;
use crate::models::DEVICE_PRESETS;
use crate::utils::output;

use tabled::{Table, Tabled};

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: &'static str,
    #[tabled(rename = "Device")]
    name: &'static str,
    #[tabled(rename = "Anode angle (°)")]
    anode_angle: f64,
    #[tabled(rename = "Filtration")]
    filter: String,
    #[tabled(rename = "Description")]
    description: &'static str,
}

/// 执行 devices 命令
pub fn execute() -> Result<()> {
    output::print_header("Device Presets");

    let rows: Vec<DeviceRow> = DEVICE_PRESETS
        .iter()
        .map(|(id, preset)| DeviceRow {
            id: *id,
            name: preset.name,
            anode_angle: preset.anode_angle_deg,
            filter: preset.filter.to_string(),
            description: preset.description,
        })
        .collect();

    println!("{}", Table::new(&rows));
    output::print_info("Use with: xdose calc --device <ID> ...");
    Ok(())
}
