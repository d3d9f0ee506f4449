//! # 剂量计算结果数据模型
//!
//! 每次请求产生一次、此后不可变的结果对象。字段名即输出 schema。
//!
//! ## 依赖关系
//! - 被 `physics/engine.rs` 构造
//! - 被 `commands/` 打印为表格或 JSON

use crate::models::Material;

use serde::Serialize;
use std::collections::BTreeSet;

/// 非致命诊断标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Diagnostic {
    /// 反散射查询超出网格范围，使用 BSF = 1.0
    BsfFallback,
    /// 加权总注量为零，相关量取定义的回退值
    NumericDegeneracy,
    /// 某个指标求根失败，见 `failures`
    RootFindFailure,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::BsfFallback => write!(f, "BSF_FALLBACK"),
            Diagnostic::NumericDegeneracy => write!(f, "NUMERIC_DEGENERACY"),
            Diagnostic::RootFindFailure => write!(f, "ROOT_FIND_FAILURE"),
        }
    }
}

/// 由求根得到的指标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Hvl1,
    Hvl2,
    EffectiveEnergy,
    AdditionalHvl1(Material),
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Hvl1 => write!(f, "HVL1"),
            Metric::Hvl2 => write!(f, "HVL2"),
            Metric::EffectiveEnergy => write!(f, "effective energy"),
            Metric::AdditionalHvl1(m) => write!(f, "HVL1 ({})", m),
        }
    }
}

/// 单个指标的求根失败记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricFailure {
    pub metric: Metric,
    /// 尝试过的搜索下界
    pub lower: f64,
    /// 尝试过的搜索上界
    pub upper: f64,
    pub reason: String,
}

/// 其他材料中的 HVL1
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialHvl {
    pub material: Material,
    pub hvl1_mm: Option<f64>,
}

/// 剂量与线质计算结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DosimetryResult {
    /// 入射空气比释动能（mGy）
    pub iak_mgy: f64,
    /// 入射表面空气比释动能（mGy），仅在给出照射野直径时有值
    pub esak_mgy: Option<f64>,
    /// 谱加权反散射因子
    pub bsf: Option<f64>,
    /// 距离平方反比校正因子
    pub distance_correction_factor: f64,
    /// 100 cm 处每 mAs 的空气比释动能（µGy/mAs）
    pub kerma_per_mas_ugy: f64,
    /// HVL 参考材料
    pub hvl_material: Material,
    pub hvl1_mm: Option<f64>,
    pub hvl2_mm: Option<f64>,
    pub homogeneity_coefficient: Option<f64>,
    pub mean_energy_kev: Option<f64>,
    pub effective_energy_kev: Option<f64>,
    /// 总注量（photons·cm⁻²）
    pub total_fluence: f64,
    /// 能注量（keV·cm⁻²）
    pub energy_fluence: f64,
    pub additional_hvl1: Vec<MaterialHvl>,
    pub failures: Vec<MetricFailure>,
    pub diagnostics: BTreeSet<Diagnostic>,
}

impl DosimetryResult {
    /// 是否带有某个诊断标志
    pub fn has(&self, diagnostic: Diagnostic) -> bool {
        self.diagnostics.contains(&diagnostic)
    }

    /// 诊断标志的逗号分隔文本
    pub fn diagnostics_label(&self) -> String {
        if self.diagnostics.is_empty() {
            return "-".to_string();
        }
        self.diagnostics
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}
