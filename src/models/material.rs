//! # 衰减材料
//!
//! 过滤片、模体与空气等材料的统一标识。
//!
//! ## 依赖关系
//! - 被 `models/exposure.rs`、`physics/attenuation.rs` 使用
//! - 被 `cli/` 解析过滤片参数时使用

use crate::error::DoseError;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 支持的材料
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Material {
    Air,
    Water,
    Pmma,
    Beryllium,
    Aluminium,
    Copper,
}

impl Material {
    /// 全部材料（按原子序数/常用程度排列）
    pub const ALL: [Material; 6] = [
        Material::Air,
        Material::Water,
        Material::Pmma,
        Material::Beryllium,
        Material::Aluminium,
        Material::Copper,
    ];

    /// 简短符号
    pub fn symbol(&self) -> &'static str {
        match self {
            Material::Air => "Air",
            Material::Water => "Water",
            Material::Pmma => "PMMA",
            Material::Beryllium => "Be",
            Material::Aluminium => "Al",
            Material::Copper => "Cu",
        }
    }

    /// 密度（g/cm³）
    pub fn density(&self) -> f64 {
        match self {
            // 干燥空气，海平面
            Material::Air => 1.205e-3,
            Material::Water => 1.0,
            Material::Pmma => 1.19,
            Material::Beryllium => 1.848,
            Material::Aluminium => 2.699,
            Material::Copper => 8.96,
        }
    }
}

impl std::fmt::Display for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Material {
    type Err = DoseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "air" => Ok(Material::Air),
            "water" | "h2o" => Ok(Material::Water),
            "pmma" | "lucite" | "perspex" => Ok(Material::Pmma),
            "be" | "beryllium" => Ok(Material::Beryllium),
            "al" | "aluminium" | "aluminum" => Ok(Material::Aluminium),
            "cu" | "copper" => Ok(Material::Copper),
            _ => Err(DoseError::UnknownMaterial(s.to_string())),
        }
    }
}
