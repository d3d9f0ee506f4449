//! # 质量衰减系数数据库
//!
//! 提供空气、水、PMMA 与过滤片材料的质量衰减系数 μ/ρ
//! 和质能吸收系数 μen/ρ（cm²/g）。
//!
//! ## 插值
//! 相邻表格点之间做 log-log 线性插值。吸收边以重复能量点表示，
//! 恰好落在吸收边上的能量取边上方的值。超出表格范围的查询
//! 返回 `EnergyOutOfRange`，不做外推。
//!
//! ## 数据来源
//! NIST X-Ray Mass Attenuation Coefficients (Hubbell & Seltzer),
//! NISTIR 5632, 1–200 keV 子集。
//! https://physics.nist.gov/PhysRefData/XrayMassCoef/
//!
//! ## 依赖关系
//! - 被 `physics/engine.rs`、`models/spectrum.rs` 调用
//! - 纯静态数据，进程内只初始化一次

use crate::error::{DoseError, Result};
use crate::models::Material;

use std::collections::BTreeMap;
use std::sync::LazyLock;

/// 单一材料的系数表
#[derive(Debug, Clone)]
pub struct AttenuationTable {
    /// 能量（keV），非递减；吸收边处成对重复
    energies: Vec<f64>,
    /// μ/ρ（cm²/g）
    mu: Vec<f64>,
    /// μen/ρ（cm²/g）
    mu_en: Vec<f64>,
}

impl AttenuationTable {
    /// 从 (能量 keV, μ/ρ, μen/ρ) 行创建系数表
    pub fn new(rows: &[(f64, f64, f64)]) -> Result<Self> {
        if rows.len() < 2 {
            return Err(DoseError::InvalidArgument(
                "attenuation table needs at least two rows".to_string(),
            ));
        }

        for (i, &(e, mu, mu_en)) in rows.iter().enumerate() {
            if !(e > 0.0 && mu > 0.0 && mu_en > 0.0)
                || !e.is_finite()
                || !mu.is_finite()
                || !mu_en.is_finite()
            {
                return Err(DoseError::InvalidArgument(format!(
                    "attenuation table row {} must hold positive finite values",
                    i
                )));
            }
            if i > 0 && e < rows[i - 1].0 {
                return Err(DoseError::InvalidArgument(format!(
                    "attenuation table energies must be non-decreasing (row {})",
                    i
                )));
            }
            // 吸收边最多重复一次
            if i > 1 && e == rows[i - 1].0 && e == rows[i - 2].0 {
                return Err(DoseError::InvalidArgument(format!(
                    "energy {} keV repeated more than twice",
                    e
                )));
            }
        }

        Ok(Self {
            energies: rows.iter().map(|r| r.0).collect(),
            mu: rows.iter().map(|r| r.1).collect(),
            mu_en: rows.iter().map(|r| r.2).collect(),
        })
    }

    /// 从 NIST 格式（能量 MeV）创建
    fn from_nist_mev(rows: &[(f64, f64, f64)]) -> Result<Self> {
        let kev: Vec<(f64, f64, f64)> = rows
            .iter()
            // 先取整到 eV 的千分之一，使 keV 值与十进制写法一致
            .map(|&(e, mu, mu_en)| ((e * 1.0e9).round() / 1.0e6, mu, mu_en))
            .collect();
        Self::new(&kev)
    }

    /// 表格能量范围（keV）
    pub fn energy_range(&self) -> (f64, f64) {
        (self.energies[0], self.energies[self.energies.len() - 1])
    }

    /// 最高吸收边能量；无吸收边时返回表格起点
    pub fn highest_edge(&self) -> f64 {
        self.energies
            .windows(2)
            .rev()
            .find(|w| w[0] == w[1])
            .map(|w| w[0])
            .unwrap_or(self.energies[0])
    }

    fn interpolate(&self, values: &[f64], energy: f64, material: Material) -> Result<f64> {
        let (min, max) = self.energy_range();
        if !(energy >= min && energy <= max) {
            return Err(DoseError::EnergyOutOfRange {
                material: material.to_string(),
                energy,
                min,
                max,
            });
        }

        let n = self.energies.len();
        // 第一个严格大于 energy 的点；吸收边处自然落到边上方一侧
        let hi = self.energies.partition_point(|&e| e <= energy);
        if hi == n {
            return Ok(values[n - 1]);
        }
        let lo = hi - 1;

        let (e0, e1) = (self.energies[lo], self.energies[hi]);
        let (v0, v1) = (values[lo], values[hi]);

        let t = (energy.ln() - e0.ln()) / (e1.ln() - e0.ln());
        Ok((v0.ln() + t * (v1.ln() - v0.ln())).exp())
    }
}

/// 质量衰减系数数据存储（只读）
#[derive(Debug, Clone, Default)]
pub struct AttenuationDataStore {
    tables: BTreeMap<Material, AttenuationTable>,
}

/// 内置标准数据，进程内只构建一次
static STANDARD: LazyLock<AttenuationDataStore> = LazyLock::new(|| {
    let mut store = AttenuationDataStore::default();
    for (material, rows) in [
        (Material::Air, AIR),
        (Material::Water, WATER),
        (Material::Pmma, PMMA),
        (Material::Beryllium, BERYLLIUM),
        (Material::Aluminium, ALUMINIUM),
        (Material::Copper, COPPER),
    ] {
        // 内置表在测试中逐一校验过
        if let Ok(table) = AttenuationTable::from_nist_mev(rows) {
            store.tables.insert(material, table);
        }
    }
    store
});

impl AttenuationDataStore {
    /// 内置 NIST 数据
    pub fn standard() -> &'static AttenuationDataStore {
        &STANDARD
    }

    /// 添加或替换某材料的系数表
    pub fn with_table(mut self, material: Material, table: AttenuationTable) -> Self {
        self.tables.insert(material, table);
        self
    }

    /// 获取材料系数表
    pub fn table(&self, material: Material) -> Result<&AttenuationTable> {
        self.tables
            .get(&material)
            .ok_or_else(|| DoseError::UnknownMaterial(material.to_string()))
    }

    /// 已加载的材料
    pub fn materials(&self) -> impl Iterator<Item = Material> + '_ {
        self.tables.keys().copied()
    }

    /// 质量衰减系数 μ/ρ（cm²/g）
    pub fn mass_attenuation_coefficient(&self, material: Material, energy: f64) -> Result<f64> {
        let table = self.table(material)?;
        table.interpolate(&table.mu, energy, material)
    }

    /// 质能吸收系数 μen/ρ（cm²/g）
    pub fn mass_energy_absorption_coefficient(
        &self,
        material: Material,
        energy: f64,
    ) -> Result<f64> {
        let table = self.table(material)?;
        table.interpolate(&table.mu_en, energy, material)
    }

    /// 线衰减系数（mm⁻¹）
    pub fn linear_attenuation_per_mm(&self, material: Material, energy: f64) -> Result<f64> {
        Ok(self.mass_attenuation_coefficient(material, energy)? * material.density() / 10.0)
    }

    /// 在能量序列上取线衰减系数（mm⁻¹）
    pub fn attenuation_curve(&self, material: Material, energies: &[f64]) -> Result<Vec<f64>> {
        energies
            .iter()
            .map(|&e| self.linear_attenuation_per_mm(material, e))
            .collect()
    }

    /// 在能量序列上取质能吸收系数（cm²/g）
    pub fn absorption_curve(&self, material: Material, energies: &[f64]) -> Result<Vec<f64>> {
        energies
            .iter()
            .map(|&e| self.mass_energy_absorption_coefficient(material, e))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────
// NIST 数据：(能量 MeV, μ/ρ cm²/g, μen/ρ cm²/g)
// ─────────────────────────────────────────────────────────────

const AIR: &[(f64, f64, f64)] = &[
    (1.0e-3, 3.606e3, 3.599e3),
    (1.5e-3, 1.191e3, 1.188e3),
    (2.0e-3, 5.279e2, 5.262e2),
    (3.0e-3, 1.625e2, 1.614e2),
    // Ar K 边
    (3.2029e-3, 1.340e2, 1.330e2),
    (3.2029e-3, 1.485e2, 1.460e2),
    (4.0e-3, 7.788e1, 7.636e1),
    (5.0e-3, 4.027e1, 3.931e1),
    (6.0e-3, 2.341e1, 2.270e1),
    (8.0e-3, 9.921, 9.446),
    (1.0e-2, 5.120, 4.742),
    (1.5e-2, 1.614, 1.334),
    (2.0e-2, 7.779e-1, 5.389e-1),
    (3.0e-2, 3.538e-1, 1.537e-1),
    (4.0e-2, 2.485e-1, 6.833e-2),
    (5.0e-2, 2.080e-1, 4.098e-2),
    (6.0e-2, 1.875e-1, 3.041e-2),
    (8.0e-2, 1.662e-1, 2.407e-2),
    (1.0e-1, 1.541e-1, 2.325e-2),
    (1.5e-1, 1.356e-1, 2.496e-2),
    (2.0e-1, 1.233e-1, 2.672e-2),
];

const WATER: &[(f64, f64, f64)] = &[
    (1.0e-3, 4.078e3, 4.065e3),
    (1.5e-3, 1.376e3, 1.372e3),
    (2.0e-3, 6.173e2, 6.152e2),
    (3.0e-3, 1.929e2, 1.917e2),
    (4.0e-3, 8.278e1, 8.191e1),
    (5.0e-3, 4.258e1, 4.188e1),
    (6.0e-3, 2.464e1, 2.405e1),
    (8.0e-3, 1.037e1, 9.915),
    (1.0e-2, 5.329, 4.944),
    (1.5e-2, 1.673, 1.374),
    (2.0e-2, 8.096e-1, 5.503e-1),
    (3.0e-2, 3.756e-1, 1.557e-1),
    (4.0e-2, 2.683e-1, 6.947e-2),
    (5.0e-2, 2.269e-1, 4.223e-2),
    (6.0e-2, 2.059e-1, 3.190e-2),
    (8.0e-2, 1.837e-1, 2.597e-2),
    (1.0e-1, 1.707e-1, 2.546e-2),
    (1.5e-1, 1.505e-1, 2.764e-2),
    (2.0e-1, 1.370e-1, 2.967e-2),
];

const PMMA: &[(f64, f64, f64)] = &[
    (1.0e-3, 2.794e3, 2.788e3),
    (1.5e-3, 9.153e2, 9.131e2),
    (2.0e-3, 4.037e2, 4.024e2),
    (3.0e-3, 1.236e2, 1.228e2),
    (4.0e-3, 5.247e1, 5.181e1),
    (5.0e-3, 2.681e1, 2.627e1),
    (6.0e-3, 1.545e1, 1.498e1),
    (8.0e-3, 6.494, 6.114),
    (1.0e-2, 3.357, 3.026),
    (1.5e-2, 1.101, 8.324e-1),
    (2.0e-2, 5.714e-1, 3.328e-1),
    (3.0e-2, 3.032e-1, 9.645e-2),
    (4.0e-2, 2.350e-1, 4.599e-2),
    (5.0e-2, 2.074e-1, 3.067e-2),
    (6.0e-2, 1.924e-1, 2.530e-2),
    (8.0e-2, 1.751e-1, 2.302e-2),
    (1.0e-1, 1.641e-1, 2.368e-2),
    (1.5e-1, 1.456e-1, 2.622e-2),
    (2.0e-1, 1.328e-1, 2.834e-2),
];

const BERYLLIUM: &[(f64, f64, f64)] = &[
    (1.0e-3, 6.041e2, 6.035e2),
    (1.5e-3, 1.797e2, 1.791e2),
    (2.0e-3, 7.469e1, 7.422e1),
    (3.0e-3, 2.127e1, 2.090e1),
    (4.0e-3, 8.685, 8.367),
    (5.0e-3, 4.369, 4.081),
    (6.0e-3, 2.527, 2.260),
    (8.0e-3, 1.124, 8.839e-1),
    (1.0e-2, 6.466e-1, 4.255e-1),
    (1.5e-2, 3.070e-1, 1.143e-1),
    (2.0e-2, 2.251e-1, 4.780e-2),
    (3.0e-2, 1.792e-1, 1.898e-2),
    (4.0e-2, 1.640e-1, 1.438e-2),
    (5.0e-2, 1.554e-1, 1.401e-2),
    (6.0e-2, 1.493e-1, 1.468e-2),
    (8.0e-2, 1.401e-1, 1.658e-2),
    (1.0e-1, 1.328e-1, 1.836e-2),
    (1.5e-1, 1.190e-1, 2.157e-2),
    (2.0e-1, 1.089e-1, 2.353e-2),
];

const ALUMINIUM: &[(f64, f64, f64)] = &[
    (1.0e-3, 1.185e3, 1.183e3),
    (1.5e-3, 4.022e2, 4.001e2),
    // K 边
    (1.5596e-3, 3.621e2, 3.600e2),
    (1.5596e-3, 3.957e3, 3.829e3),
    (2.0e-3, 2.263e3, 2.204e3),
    (3.0e-3, 7.880e2, 7.732e2),
    (4.0e-3, 3.605e2, 3.545e2),
    (5.0e-3, 1.934e2, 1.902e2),
    (6.0e-3, 1.153e2, 1.133e2),
    (8.0e-3, 5.033e1, 4.918e1),
    (1.0e-2, 2.623e1, 2.543e1),
    (1.5e-2, 7.955, 7.487),
    (2.0e-2, 3.441, 3.094),
    (3.0e-2, 1.128, 8.778e-1),
    (4.0e-2, 5.685e-1, 3.601e-1),
    (5.0e-2, 3.681e-1, 1.840e-1),
    (6.0e-2, 2.778e-1, 1.099e-1),
    (8.0e-2, 2.018e-1, 5.511e-2),
    (1.0e-1, 1.704e-1, 3.794e-2),
    (1.5e-1, 1.378e-1, 2.827e-2),
    (2.0e-1, 1.223e-1, 2.745e-2),
];

const COPPER: &[(f64, f64, f64)] = &[
    (1.0e-3, 1.057e4, 1.049e4),
    // L1 边
    (1.0961e-3, 8.242e3, 8.178e3),
    (1.0961e-3, 9.347e3, 9.271e3),
    (1.5e-3, 4.418e3, 4.393e3),
    (2.0e-3, 2.154e3, 2.137e3),
    (3.0e-3, 7.488e2, 7.405e2),
    (4.0e-3, 3.473e2, 3.422e2),
    (5.0e-3, 1.899e2, 1.867e2),
    (6.0e-3, 1.156e2, 1.133e2),
    (8.0e-3, 5.255e1, 5.105e1),
    // K 边
    (8.9789e-3, 3.829e1, 3.704e1),
    (8.9789e-3, 2.784e2, 2.155e2),
    (1.0e-2, 2.159e2, 1.484e2),
    (1.5e-2, 7.405e1, 5.788e1),
    (2.0e-2, 3.379e1, 2.788e1),
    (3.0e-2, 1.092e1, 9.349),
    (4.0e-2, 4.862, 4.163),
    (5.0e-2, 2.613, 2.192),
    (6.0e-2, 1.593, 1.290),
    (8.0e-2, 7.630e-1, 5.581e-1),
    (1.0e-1, 4.584e-1, 2.949e-1),
    (1.5e-1, 2.217e-1, 1.027e-1),
    (2.0e-1, 1.559e-1, 5.781e-2),
];
