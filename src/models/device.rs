//! # 设备预设
//!
//! X 射线设备的固定参数（阳极角与固有过滤），以标识符为键的只读表。
//!
//! ## 依赖关系
//! - 被 `commands/calc.rs`、`commands/devices.rs` 使用
//! - 纯静态数据

use crate::error::{DoseError, Result};
use crate::models::{Filter, Material};

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// 设备预设
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DevicePreset {
    /// 显示名称
    pub name: &'static str,
    /// 阳极角（度）
    pub anode_angle_deg: f64,
    /// 固有过滤
    pub filter: Filter,
    pub description: &'static str,
}

/// 设备预设表
pub static DEVICE_PRESETS: LazyLock<BTreeMap<&'static str, DevicePreset>> = LazyLock::new(|| {
    let mut m = BTreeMap::new();

    m.insert(
        "rad-speed-pro-1",
        DevicePreset {
            name: "RAD speed Pro (rooms 1, 2)",
            anode_angle_deg: 16.0,
            filter: Filter::new(Material::Aluminium, 3.0),
            description: "General radiography, examination rooms 1 and 2",
        },
    );

    m.insert(
        "rad-speed-pro-3",
        DevicePreset {
            name: "RAD speed Pro (room 3)",
            anode_angle_deg: 16.0,
            filter: Filter::new(Material::Aluminium, 3.0),
            description: "General radiography, examination room 3",
        },
    );

    m.insert(
        "alula-dental",
        DevicePreset {
            name: "ALULA dental",
            anode_angle_deg: 12.5,
            filter: Filter::new(Material::Aluminium, 2.6),
            description: "Intraoral dental X-ray unit",
        },
    );

    m.insert(
        "varian-kv",
        DevicePreset {
            name: "Varian kV Imager",
            anode_angle_deg: 14.0,
            filter: Filter::new(Material::Aluminium, 3.3),
            description: "On-board kV imaging system",
        },
    );

    m
});

/// 按标识符查找设备预设（不区分大小写）
pub fn get_device_preset(id: &str) -> Result<&'static DevicePreset> {
    DEVICE_PRESETS
        .get(id.trim().to_lowercase().as_str())
        .ok_or_else(|| DoseError::UnknownDevice(id.to_string()))
}
