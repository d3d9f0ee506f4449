//! # 光子注量谱数据模型
//!
//! 离散化的 X 射线光子注量谱：(能量 keV, 注量 photons·cm⁻²) 序列。
//!
//! 能量严格递增且唯一，注量非负且有限。谱一旦构造即不可变，
//! 附加过滤等操作总是返回新的谱。
//!
//! ## 依赖关系
//! - 被 `parsers/spectrum.rs` 构造
//! - 被 `physics/engine.rs` 使用
//! - 使用 `physics/attenuation.rs` 计算附加过滤

use crate::error::{DoseError, Result};
use crate::models::Material;
use crate::physics::AttenuationDataStore;

use serde::Serialize;

/// 光子注量谱
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrum {
    energies: Vec<f64>,
    fluence: Vec<f64>,
}

impl Spectrum {
    /// 创建新的注量谱，校验能量与注量不变量
    pub fn new(energies: Vec<f64>, fluence: Vec<f64>) -> Result<Self> {
        if energies.len() != fluence.len() {
            return Err(DoseError::InvalidSpectrum(format!(
                "{} energies but {} fluence values",
                energies.len(),
                fluence.len()
            )));
        }

        for (i, &e) in energies.iter().enumerate() {
            if !e.is_finite() || e <= 0.0 {
                return Err(DoseError::InvalidSpectrum(format!(
                    "energy at bin {} must be positive and finite, got {}",
                    i, e
                )));
            }
            if i > 0 && e <= energies[i - 1] {
                return Err(DoseError::InvalidSpectrum(format!(
                    "energies must be strictly increasing (bin {}: {} after {})",
                    i,
                    e,
                    energies[i - 1]
                )));
            }
        }

        for (i, &phi) in fluence.iter().enumerate() {
            if !phi.is_finite() || phi < 0.0 {
                return Err(DoseError::InvalidSpectrum(format!(
                    "fluence at bin {} must be non-negative and finite, got {}",
                    i, phi
                )));
            }
        }

        Ok(Self { energies, fluence })
    }

    /// 从 (能量, 注量) 对创建
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self> {
        Self::new(
            pairs.iter().map(|p| p.0).collect(),
            pairs.iter().map(|p| p.1).collect(),
        )
    }

    /// 能量（keV）
    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    /// 注量（photons·cm⁻²）
    pub fn fluence(&self) -> &[f64] {
        &self.fluence
    }

    /// 能量 bin 数
    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    /// 逐 bin 迭代 (E, Φ)
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.energies.iter().copied().zip(self.fluence.iter().copied())
    }

    /// 最高能量（空谱为 None）
    pub fn max_energy(&self) -> Option<f64> {
        self.energies.last().copied()
    }

    /// 总注量 ΣΦ
    pub fn total_fluence(&self) -> f64 {
        self.fluence.iter().sum()
    }

    /// 能注量 ΣE·Φ（keV·cm⁻²）
    pub fn energy_fluence(&self) -> f64 {
        self.bins().map(|(e, phi)| e * phi).sum()
    }

    /// 经过 `thickness_mm` 厚的材料后的新谱
    pub fn attenuated(
        &self,
        store: &AttenuationDataStore,
        material: Material,
        thickness_mm: f64,
    ) -> Result<Spectrum> {
        if !thickness_mm.is_finite() || thickness_mm < 0.0 {
            return Err(DoseError::validation(
                "filter thickness",
                thickness_mm,
                "must be finite and >= 0 mm",
            ));
        }

        let mu = store.attenuation_curve(material, &self.energies)?;
        let fluence = self
            .fluence
            .iter()
            .zip(mu.iter())
            .map(|(phi, mu)| phi * (-mu * thickness_mm).exp())
            .collect();

        Ok(Spectrum {
            energies: self.energies.clone(),
            fluence,
        })
    }
}
