//! # 曝光参数数据模型
//!
//! 一次临床曝光的全部输入：管电压、管电流、曝光时间、源皮距、
//! 阳极角、过滤片序列、照射野直径与模体材料。
//!
//! 值对象：除字段值外没有身份。`validate` 在任何计算开始前
//! 拒绝超出文档范围的参数。
//!
//! ## 依赖关系
//! - 被 `physics/engine.rs` 使用
//! - 被 `commands/calc.rs`、`commands/batch.rs` 构造
//! - 使用 `models/material.rs`

use crate::error::{DoseError, Result};
use crate::models::Material;

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::str::FromStr;

/// 管电压范围（kVp）
pub const KVP_RANGE: RangeInclusive<f64> = 40.0..=150.0;
/// 管电流范围（mA）
pub const MA_RANGE: RangeInclusive<f64> = 1.0..=1000.0;
/// 曝光时间范围（s）
pub const TIME_RANGE: RangeInclusive<f64> = 0.001..=10.0;
/// 源皮距范围（cm）
pub const SSD_RANGE: RangeInclusive<f64> = 50.0..=300.0;
/// 照射野直径范围（cm）
pub const DIAMETER_RANGE: RangeInclusive<f64> = 1.0..=35.0;

/// 单片过滤片
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub material: Material,
    pub thickness_mm: f64,
}

impl Filter {
    pub fn new(material: Material, thickness_mm: f64) -> Self {
        Self {
            material,
            thickness_mm,
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} mm", self.material, self.thickness_mm)
    }
}

impl FromStr for Filter {
    type Err = DoseError;

    /// 解析 "Al:2.5" 或 "Cu=0.1" 形式
    fn from_str(s: &str) -> Result<Self> {
        let (material, thickness) = s
            .split_once([':', '='])
            .ok_or_else(|| DoseError::InvalidArgument(format!("filter '{}' (expected MAT:MM)", s)))?;

        let material: Material = material.parse()?;
        let thickness_mm: f64 = thickness.trim().parse().map_err(|_| {
            DoseError::InvalidArgument(format!("filter thickness '{}' in '{}'", thickness, s))
        })?;

        Ok(Filter::new(material, thickness_mm))
    }
}

/// 曝光参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureParameters {
    /// 管电压（kVp）
    pub kvp: f64,
    /// 管电流（mA）
    pub ma: f64,
    /// 曝光时间（s）
    pub time_s: f64,
    /// 源皮距（cm）
    pub ssd_cm: f64,
    /// 阳极角（度）
    pub anode_angle_deg: f64,
    /// 过滤片（按射束经过顺序）
    pub filters: Vec<Filter>,
    /// 照射野直径（cm）；None 时不做反散射校正
    pub field_diameter_cm: Option<f64>,
    /// 模体材料
    pub phantom: Material,
}

impl Default for ExposureParameters {
    fn default() -> Self {
        ExposureParameters {
            kvp: 80.0,
            ma: 100.0,
            time_s: 0.1,
            ssd_cm: 100.0,
            anode_angle_deg: 12.0,
            filters: vec![],
            field_diameter_cm: None,
            phantom: Material::Water,
        }
    }
}

impl ExposureParameters {
    /// 电荷量 mA·s
    pub fn mas(&self) -> f64 {
        self.ma * self.time_s
    }

    /// 校验所有参数；第一个越界字段即报错
    pub fn validate(&self) -> Result<()> {
        check_range("kVp", self.kvp, &KVP_RANGE, "kV")?;
        check_range("mA", self.ma, &MA_RANGE, "mA")?;
        check_range("exposure time", self.time_s, &TIME_RANGE, "s")?;
        check_range("SSD", self.ssd_cm, &SSD_RANGE, "cm")?;

        if !(self.anode_angle_deg > 0.0 && self.anode_angle_deg < 90.0) {
            return Err(DoseError::validation(
                "anode angle",
                self.anode_angle_deg,
                "must lie in (0, 90) degrees",
            ));
        }

        for filter in &self.filters {
            if !filter.thickness_mm.is_finite() || filter.thickness_mm < 0.0 {
                return Err(DoseError::validation(
                    &format!("{} filter thickness", filter.material),
                    filter.thickness_mm,
                    "must be finite and >= 0 mm",
                ));
            }
        }

        if let Some(d) = self.field_diameter_cm {
            check_range("field diameter", d, &DIAMETER_RANGE, "cm")?;
        }

        Ok(())
    }

    /// 某材料的总过滤厚度（mm）
    pub fn total_filtration(&self, material: Material) -> f64 {
        self.filters
            .iter()
            .filter(|f| f.material == material)
            .map(|f| f.thickness_mm)
            .sum()
    }
}

fn check_range(field: &str, value: f64, range: &RangeInclusive<f64>, unit: &str) -> Result<()> {
    // NaN 不在任何范围内
    if range.contains(&value) {
        Ok(())
    } else {
        Err(DoseError::validation(
            field,
            value,
            format!("must lie in [{}, {}] {}", range.start(), range.end(), unit),
        ))
    }
}

/// 解析逗号分隔的过滤片列表，如 "Al:2.5,Cu:0.1"
pub fn parse_filter_list(input: &str) -> Result<Vec<Filter>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Filter::from_str)
        .collect()
}
