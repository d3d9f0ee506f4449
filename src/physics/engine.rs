//! # 剂量计算引擎
//!
//! 从曝光参数与光子注量谱计算入射空气比释动能、入射表面空气比释动能、
//! 谱加权反散射因子与射线线质参数。
//!
//! ## 算法概述
//! 1. 校验曝光参数（越界即返回错误，不做任何计算）
//! 2. 按需对注量谱施加过滤片
//! 3. 距离平方反比校正，计算 IAK
//! 4. 以 wᵢ = Eᵢ·Φᵢ·μen(Eᵢ) 加权平均单能 BSF，计算 ESAK = IAK × BSF
//! 5. 透射率曲线上括区 + 二分求 HVL1、HVL2
//! 6. 单能衰减曲线上求有效能量；注量加权平均能量；均匀性系数
//!
//! ## 状态
//! 引擎只持有只读的数据库引用与不可变配置，每次 `calculate`
//! 都是输入到结果的纯函数，不会在请求之间保留任何过滤片或结果。
//!
//! ## 参考
//! - Poludniowski et al., SpekPy v2 (Med. Phys. 2021)
//! - IAEA TRS-457, Dosimetry in Diagnostic Radiology
//!
//! ## 依赖关系
//! - 被 `commands/calc.rs`、`commands/batch.rs` 调用
//! - 使用 `physics/attenuation.rs`、`physics/backscatter.rs`、`physics/roots.rs`
//! - 使用 `models/` 中的值对象

use crate::error::{DoseError, Result};
use crate::models::{
    Diagnostic, DosimetryResult, ExposureParameters, Material, MaterialHvl, Metric, MetricFailure,
    Spectrum,
};
use crate::physics::attenuation::AttenuationDataStore;
use crate::physics::backscatter::{BackscatterInterpolator, FALLBACK_BSF};
use crate::physics::roots::{self, RootSettings};

use serde::Serialize;
use std::collections::BTreeSet;
use std::f64::consts::LN_2;

/// 参考距离（cm）
pub const REFERENCE_DISTANCE_CM: f64 = 100.0;

/// Φ[cm⁻²]·E[keV]·(μen/ρ)[cm²/g] 换算为空气比释动能 µGy 的系数
pub const KERMA_UGY_PER_KEV_CM2_G: f64 = 1.602176634e-7;

/// 透射率的加权方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransmissionWeighting {
    /// wᵢ = Eᵢ·Φᵢ
    #[default]
    EnergyFluence,
    /// wᵢ = Eᵢ·Φᵢ·(μen/ρ)_air(Eᵢ)
    AirKerma,
}

/// 过滤片处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FiltrationMode {
    /// 输入为未过滤谱，由引擎施加过滤片
    #[default]
    Apply,
    /// 输入谱已包含过滤，过滤片仅作记录
    AlreadyApplied,
}

/// 空气比释动能来源
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KermaSource {
    /// 外部给出的 100 cm 处每 mAs 空气比释动能（µGy/mAs）
    Reference { kerma_per_mas_ugy: f64 },
    /// 由谱积分得到（谱视为 100 cm 处每 mAs 的注量）
    FromSpectrum,
}

/// 引擎配置
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// HVL 参考材料
    pub hvl_material: Material,
    /// 额外报告 HVL1 的材料
    pub additional_hvl_materials: Vec<Material>,
    pub weighting: TransmissionWeighting,
    pub filtration: FiltrationMode,
    /// 厚度括区的初始上界（mm）
    pub initial_thickness_mm: f64,
    /// 厚度括区的工程上限（mm）
    pub max_thickness_mm: f64,
    pub roots: RootSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hvl_material: Material::Aluminium,
            additional_hvl_materials: vec![Material::Copper],
            weighting: TransmissionWeighting::EnergyFluence,
            filtration: FiltrationMode::Apply,
            initial_thickness_mm: 0.5,
            max_thickness_mm: 50.0,
            roots: RootSettings::default(),
        }
    }
}

impl EngineConfig {
    fn validate(&self) -> Result<()> {
        if !(self.max_thickness_mm > 0.0 && self.max_thickness_mm.is_finite()) {
            return Err(DoseError::validation(
                "max thickness",
                self.max_thickness_mm,
                "must be positive and finite",
            ));
        }
        if !(self.initial_thickness_mm > 0.0) {
            return Err(DoseError::validation(
                "initial thickness",
                self.initial_thickness_mm,
                "must be positive",
            ));
        }
        if !(self.roots.growth > 1.0) {
            return Err(DoseError::validation(
                "bracket growth",
                self.roots.growth,
                "must be greater than 1",
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────
// 基本公式
// ─────────────────────────────────────────────────────────────

/// 距离平方反比校正因子 (100 / ssd)²
pub fn distance_correction_factor(ssd_cm: f64) -> f64 {
    let ratio = REFERENCE_DISTANCE_CM / ssd_cm;
    ratio * ratio
}

/// 空气比释动能（mGy）
///
/// `kerma_per_mas_ugy` 为 100 cm 处每 mAs 的空气比释动能（µGy/mAs）。
pub fn air_kerma(kerma_per_mas_ugy: f64, ma: f64, time_s: f64, ssd_cm: f64) -> f64 {
    kerma_per_mas_ugy * (ma * time_s) * distance_correction_factor(ssd_cm) / 1000.0
}

/// 由谱积分得到 100 cm 处每 mAs 的空气比释动能（µGy/mAs）
pub fn spectrum_kerma_per_mas(spectrum: &Spectrum, mu_en_air: &[f64]) -> f64 {
    spectrum
        .bins()
        .zip(mu_en_air.iter())
        .map(|((e, phi), mu_en)| phi * e * mu_en)
        .sum::<f64>()
        * KERMA_UGY_PER_KEV_CM2_G
}

/// 注量加权平均能量 ΣE·Φ / ΣΦ；总注量为零时为 None
pub fn mean_energy(spectrum: &Spectrum) -> Option<f64> {
    let total = spectrum.total_fluence();
    if total > 0.0 {
        Some(spectrum.energy_fluence() / total)
    } else {
        None
    }
}

/// 谱加权反散射因子
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedBsf {
    pub bsf: f64,
    /// 有正权重的 bin 超出网格范围
    pub fallback: bool,
    /// Σwᵢ = 0
    pub degenerate: bool,
}

/// BSF = Σ(wᵢ·BSF_mono) / Σwᵢ，wᵢ = Eᵢ·Φᵢ·μen(Eᵢ)
pub fn weighted_bsf(
    spectrum: &Spectrum,
    mu_en_air: &[f64],
    interpolator: &BackscatterInterpolator,
    ssd_cm: f64,
    diameter_cm: f64,
) -> WeightedBsf {
    let mono = interpolator.evaluate_spectrum(ssd_cm, spectrum.energies(), diameter_cm);

    let mut fallback = false;
    let (numerator, denominator) = spectrum
        .bins()
        .zip(mu_en_air.iter())
        .zip(mono.values.iter().zip(mono.fallback.iter()))
        .fold((0.0, 0.0), |(num, den), (((e, phi), mu_en), (bsf, &outside))| {
            let w = e * phi * mu_en;
            // 零权重的 bin 不影响平均值，越界也不算回退
            fallback |= outside && w > 0.0;
            (num + w * bsf, den + w)
        });

    if denominator > 0.0 {
        WeightedBsf {
            bsf: numerator / denominator,
            fallback,
            degenerate: false,
        }
    } else {
        WeightedBsf {
            bsf: FALLBACK_BSF,
            fallback,
            degenerate: true,
        }
    }
}

/// 能注量加权透射率 Σ(Eᵢ·Φᵢ·exp(−μᵢ·t)) / Σ(Eᵢ·Φᵢ)
///
/// `mu` 为线衰减系数（mm⁻¹），`thickness_mm` 为厚度（mm）。
pub fn transmission(spectrum: &Spectrum, mu: &[f64], thickness_mm: f64) -> f64 {
    let weights = energy_fluence_weights(spectrum);
    weighted_transmission(&weights, mu, thickness_mm)
}

/// 给定权重下的透射率
pub fn weighted_transmission(weights: &[f64], mu: &[f64], thickness_mm: f64) -> f64 {
    let (num, den) = weights
        .iter()
        .zip(mu.iter())
        .fold((0.0, 0.0), |(num, den), (w, mu)| {
            (num + w * (-mu * thickness_mm).exp(), den + w)
        });
    num / den
}

fn energy_fluence_weights(spectrum: &Spectrum) -> Vec<f64> {
    spectrum.bins().map(|(e, phi)| e * phi).collect()
}

fn air_kerma_weights(spectrum: &Spectrum, mu_en_air: &[f64]) -> Vec<f64> {
    spectrum
        .bins()
        .zip(mu_en_air.iter())
        .map(|((e, phi), mu_en)| e * phi * mu_en)
        .collect()
}

/// 求透射率降至 `target` 的厚度（mm）
pub fn thickness_for_transmission(
    metric: &str,
    weights: &[f64],
    mu: &[f64],
    target: f64,
    config: &EngineConfig,
) -> Result<f64> {
    roots::solve_increasing(
        metric,
        |t| target - weighted_transmission(weights, mu, t),
        0.0,
        config.initial_thickness_mm,
        config.max_thickness_mm,
        &config.roots,
    )
}

/// 能注量加权下的 HVL：透射率降至 `target` 的厚度（mm）
pub fn hvl(spectrum: &Spectrum, mu: &[f64], target: f64, config: &EngineConfig) -> Result<f64> {
    let weights = energy_fluence_weights(spectrum);
    thickness_for_transmission("HVL", &weights, mu, target, config)
}

/// 有效能量：在材料单能衰减曲线上求 exp(−μ(E)·HVL1) = 0.5 的能量（keV）
pub fn effective_energy(
    store: &AttenuationDataStore,
    material: Material,
    hvl1_mm: f64,
    settings: &RootSettings,
) -> Result<f64> {
    let table = store.table(material)?;
    let (_, e_max) = table.energy_range();
    // 最高吸收边之上 μ(E) 单调递减
    let e_min = table.highest_edge();
    let mu_target = LN_2 / hvl1_mm;

    roots::solve_increasing(
        "effective energy",
        |e| {
            store
                .linear_attenuation_per_mm(material, e)
                .map(|mu| mu_target - mu)
                .unwrap_or(f64::NAN)
        },
        e_min,
        e_min * settings.growth,
        e_max,
        settings,
    )
}

/// 均匀性系数 HVL1/HVL2；求根舍入造成的 >1 截断为 1
pub fn homogeneity_coefficient(hvl1_mm: f64, hvl2_mm: f64) -> Option<f64> {
    if hvl1_mm > 0.0 && hvl2_mm > 0.0 {
        Some((hvl1_mm / hvl2_mm).min(1.0))
    } else {
        None
    }
}

// ─────────────────────────────────────────────────────────────
// 引擎
// ─────────────────────────────────────────────────────────────

/// 剂量计算引擎（无状态）
#[derive(Debug, Clone)]
pub struct DosimetryEngine<'a> {
    store: &'a AttenuationDataStore,
    backscatter: Option<&'a BackscatterInterpolator>,
    config: EngineConfig,
}

impl<'a> DosimetryEngine<'a> {
    /// 创建新的剂量计算引擎
    pub fn new(store: &'a AttenuationDataStore, config: EngineConfig) -> Self {
        Self {
            store,
            backscatter: None,
            config,
        }
    }

    /// 附加反散射因子插值器
    pub fn with_backscatter(mut self, interpolator: &'a BackscatterInterpolator) -> Self {
        self.backscatter = Some(interpolator);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 计算一次曝光的剂量与线质参数
    pub fn calculate(
        &self,
        params: &ExposureParameters,
        spectrum: &Spectrum,
        kerma: KermaSource,
    ) -> Result<DosimetryResult> {
        // 校验
        self.config.validate()?;
        params.validate()?;

        if let KermaSource::Reference { kerma_per_mas_ugy } = kerma {
            if !(kerma_per_mas_ugy.is_finite() && kerma_per_mas_ugy >= 0.0) {
                return Err(DoseError::validation(
                    "kerma per mAs",
                    kerma_per_mas_ugy,
                    "must be finite and >= 0 uGy/mAs",
                ));
            }
        }

        let backscatter = match params.field_diameter_cm {
            Some(_) => Some(self.backscatter_for(params)?),
            None => None,
        };

        if let Some(e_max) = spectrum.max_energy() {
            if e_max > params.kvp + 1.0 {
                log::warn!(
                    "spectrum extends to {:.1} keV, above the tube potential of {:.1} kVp",
                    e_max,
                    params.kvp
                );
            }
        }

        // 过滤
        let filtered;
        let spectrum = match self.config.filtration {
            FiltrationMode::Apply => {
                let mut current = spectrum.clone();
                for filter in &params.filters {
                    current = current.attenuated(self.store, filter.material, filter.thickness_mm)?;
                }
                filtered = current;
                &filtered
            }
            FiltrationMode::AlreadyApplied => spectrum,
        };

        let energies = spectrum.energies();
        let mu_en_air = self.store.absorption_curve(Material::Air, energies)?;
        let mu_ref = self.store.attenuation_curve(self.config.hvl_material, energies)?;

        let mut diagnostics = BTreeSet::new();
        let mut failures = Vec::new();

        // 空气比释动能
        let kerma_per_mas_ugy = match kerma {
            KermaSource::Reference { kerma_per_mas_ugy } => kerma_per_mas_ugy,
            KermaSource::FromSpectrum => spectrum_kerma_per_mas(spectrum, &mu_en_air),
        };
        let dcf = distance_correction_factor(params.ssd_cm);
        let iak_mgy = air_kerma(kerma_per_mas_ugy, params.ma, params.time_s, params.ssd_cm);

        // 反散射
        let (bsf, esak_mgy) = match (backscatter, params.field_diameter_cm) {
            (Some(interpolator), Some(diameter)) => {
                let weighted =
                    weighted_bsf(spectrum, &mu_en_air, interpolator, params.ssd_cm, diameter);
                if weighted.fallback {
                    log::warn!(
                        "backscatter grid does not cover ssd={} cm, diameter={} cm for every bin; using BSF = 1.0 there",
                        params.ssd_cm,
                        diameter
                    );
                    diagnostics.insert(Diagnostic::BsfFallback);
                }
                if weighted.degenerate {
                    log::warn!("zero weighted fluence, BSF set to 1.0");
                    diagnostics.insert(Diagnostic::NumericDegeneracy);
                }
                (Some(weighted.bsf), Some(iak_mgy * weighted.bsf))
            }
            _ => (None, None),
        };

        // 线质
        let weights = match self.config.weighting {
            TransmissionWeighting::EnergyFluence => energy_fluence_weights(spectrum),
            TransmissionWeighting::AirKerma => air_kerma_weights(spectrum, &mu_en_air),
        };
        let degenerate = !(weights.iter().sum::<f64>() > 0.0);
        if degenerate {
            log::warn!("zero weighted fluence, beam-quality metrics are undefined");
            diagnostics.insert(Diagnostic::NumericDegeneracy);
        }

        let mut record = |metric: Metric, err: DoseError| -> Result<()> {
            match err {
                DoseError::RootFindFailure {
                    lower,
                    upper,
                    reason,
                    ..
                } => {
                    log::warn!("{} not found in [{}, {}]: {}", metric, lower, upper, reason);
                    failures.push(MetricFailure {
                        metric,
                        lower,
                        upper,
                        reason,
                    });
                    Ok(())
                }
                other => Err(other),
            }
        };

        let mut hvl1_mm = None;
        let mut hvl2_mm = None;
        let mut effective_energy_kev = None;
        let mut additional_hvl1 = Vec::new();

        if !degenerate {
            match thickness_for_transmission("HVL1", &weights, &mu_ref, 0.5, &self.config) {
                Ok(t) => hvl1_mm = Some(t),
                Err(e) => record(Metric::Hvl1, e)?,
            }

            match thickness_for_transmission("HVL2", &weights, &mu_ref, 0.25, &self.config) {
                Ok(quarter) => hvl2_mm = hvl1_mm.map(|h1| quarter - h1),
                Err(e) => record(Metric::Hvl2, e)?,
            }

            if let Some(h1) = hvl1_mm {
                match effective_energy(self.store, self.config.hvl_material, h1, &self.config.roots)
                {
                    Ok(e) => effective_energy_kev = Some(e),
                    Err(e) => record(Metric::EffectiveEnergy, e)?,
                }
            }

            for &material in &self.config.additional_hvl_materials {
                let mu = self.store.attenuation_curve(material, energies)?;
                let hvl1 = match thickness_for_transmission("HVL1", &weights, &mu, 0.5, &self.config)
                {
                    Ok(t) => Some(t),
                    Err(e) => {
                        record(Metric::AdditionalHvl1(material), e)?;
                        None
                    }
                };
                additional_hvl1.push(MaterialHvl {
                    material,
                    hvl1_mm: hvl1,
                });
            }
        }

        if !failures.is_empty() {
            diagnostics.insert(Diagnostic::RootFindFailure);
        }

        let homogeneity = match (hvl1_mm, hvl2_mm) {
            (Some(h1), Some(h2)) => homogeneity_coefficient(h1, h2),
            _ => None,
        };

        let mean_energy_kev = mean_energy(spectrum);
        if mean_energy_kev.is_none() {
            diagnostics.insert(Diagnostic::NumericDegeneracy);
        }

        log::debug!(
            "kVp={} mAs={} ssd={} -> IAK={:.4} mGy, BSF={:?}, HVL1={:?} mm",
            params.kvp,
            params.mas(),
            params.ssd_cm,
            iak_mgy,
            bsf,
            hvl1_mm
        );

        Ok(DosimetryResult {
            iak_mgy,
            esak_mgy,
            bsf,
            distance_correction_factor: dcf,
            kerma_per_mas_ugy,
            hvl_material: self.config.hvl_material,
            hvl1_mm,
            hvl2_mm,
            homogeneity_coefficient: homogeneity,
            mean_energy_kev,
            effective_energy_kev,
            total_fluence: spectrum.total_fluence(),
            energy_fluence: spectrum.energy_fluence(),
            additional_hvl1,
            failures,
            diagnostics,
        })
    }

    /// 给出照射野直径时必须有与模体匹配的反散射网格
    fn backscatter_for(&self, params: &ExposureParameters) -> Result<&'a BackscatterInterpolator> {
        let interpolator = self.backscatter.ok_or_else(|| {
            DoseError::InvalidArgument(
                "a field diameter was given but no backscatter grid is loaded".to_string(),
            )
        })?;

        let grid_phantom = interpolator.grid().phantom();
        if grid_phantom != params.phantom {
            return Err(DoseError::validation(
                "phantom",
                params.phantom,
                format!("backscatter grid is tabulated for {}", grid_phantom),
            ));
        }

        Ok(interpolator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Filter;
    use crate::physics::backscatter::BackscatterGrid;
    use approx::assert_relative_eq;

    /// Kramers 近似的未过滤谱，1 keV 步长
    fn kramers(kvp: f64) -> Spectrum {
        let pairs: Vec<(f64, f64)> = (10..kvp as usize)
            .map(|e| {
                let e = e as f64;
                (e, 1.0e6 * (kvp - e) / e)
            })
            .collect();
        Spectrum::from_pairs(&pairs).unwrap()
    }

    fn constant_grid(value: f64) -> BackscatterInterpolator {
        let ssd = vec![50.0, 300.0];
        let energy = vec![5.0, 200.0];
        let diameter = vec![1.0, 35.0];
        BackscatterInterpolator::new(
            BackscatterGrid::new(ssd, energy, diameter, vec![value; 8], Material::Water).unwrap(),
        )
    }

    fn params(al_mm: f64) -> ExposureParameters {
        ExposureParameters {
            kvp: 120.0,
            ma: 100.0,
            time_s: 0.1,
            filters: vec![Filter::new(Material::Aluminium, al_mm)],
            ..Default::default()
        }
    }

    #[test]
    fn test_distance_correction() {
        assert_eq!(distance_correction_factor(100.0), 1.0);
        assert_eq!(distance_correction_factor(200.0), 0.25);
        assert_relative_eq!(distance_correction_factor(50.0), 4.0);
    }

    #[test]
    fn test_air_kerma_units_and_linearity() {
        assert_relative_eq!(air_kerma(158.7, 100.0, 0.1, 100.0), 1.587, max_relative = 1e-12);
        let single = air_kerma(158.7, 50.0, 0.2, 180.0);
        let double = air_kerma(158.7, 100.0, 0.2, 180.0);
        assert_eq!(double, 2.0 * single);
    }

    #[test]
    fn test_mean_energy_is_fluence_weighted() {
        let s = Spectrum::from_pairs(&[(20.0, 1.0), (60.0, 3.0)]).unwrap();
        assert_relative_eq!(mean_energy(&s).unwrap(), 50.0);
        let empty = Spectrum::from_pairs(&[(20.0, 0.0)]).unwrap();
        assert_eq!(mean_energy(&empty), None);
    }

    #[test]
    fn test_weighted_bsf_constant_grid() {
        let store = AttenuationDataStore::standard();
        let s = kramers(120.0);
        let mu_en = store.absorption_curve(Material::Air, s.energies()).unwrap();
        let w = weighted_bsf(&s, &mu_en, &constant_grid(1.34), 100.0, 10.0);
        assert_relative_eq!(w.bsf, 1.34, max_relative = 1e-12);
        assert!(!w.fallback && !w.degenerate);
    }

    #[test]
    fn test_weighted_bsf_degenerate() {
        let s = Spectrum::from_pairs(&[(30.0, 0.0), (60.0, 0.0)]).unwrap();
        let w = weighted_bsf(&s, &[0.1, 0.1], &constant_grid(1.3), 100.0, 10.0);
        assert_eq!(w.bsf, 1.0);
        assert!(w.degenerate);
    }

    #[test]
    fn test_transmission_decreasing() {
        let store = AttenuationDataStore::standard();
        let s = kramers(80.0);
        let mu = store.attenuation_curve(Material::Aluminium, s.energies()).unwrap();

        assert_relative_eq!(transmission(&s, &mu, 0.0), 1.0, max_relative = 1e-12);
        let mut previous = 1.0;
        for i in 1..=20 {
            let t = transmission(&s, &mu, i as f64 * 0.5);
            assert!(t < previous);
            previous = t;
        }
    }

    #[test]
    fn test_monoenergetic_hvl_and_effective_energy() {
        let store = AttenuationDataStore::standard();
        let s = Spectrum::from_pairs(&[(60.0, 1.0e6)]).unwrap();
        let mu = store.attenuation_curve(Material::Aluminium, s.energies()).unwrap();
        let config = EngineConfig::default();

        let h1 = hvl(&s, &mu, 0.5, &config).unwrap();
        assert_relative_eq!(h1, LN_2 / mu[0], max_relative = 1e-8);

        let quarter = hvl(&s, &mu, 0.25, &config).unwrap();
        assert_relative_eq!(quarter - h1, h1, max_relative = 1e-7);

        let e_eff = effective_energy(store, Material::Aluminium, h1, &config.roots).unwrap();
        assert_relative_eq!(e_eff, 60.0, max_relative = 1e-6);
    }

    #[test]
    fn test_hvl_bracket_failure_reports_bounds() {
        let store = AttenuationDataStore::standard();
        let s = Spectrum::from_pairs(&[(100.0, 1.0)]).unwrap();
        let mu = store.attenuation_curve(Material::Aluminium, s.energies()).unwrap();
        let config = EngineConfig {
            max_thickness_mm: 2.0,
            ..Default::default()
        };

        match hvl(&s, &mu, 0.5, &config) {
            Err(DoseError::RootFindFailure { lower, upper, .. }) => {
                assert_eq!(lower, 0.0);
                assert_eq!(upper, 2.0);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_weighted_bsf_ignores_empty_bins_outside_grid() {
        // 网格能量轴 5..200 keV，1 keV 的 bin 注量为零
        let s = Spectrum::from_pairs(&[(1.0, 0.0), (60.0, 1.0e5), (80.0, 1.0e5)]).unwrap();
        let w = weighted_bsf(&s, &[0.1, 0.1, 0.1], &constant_grid(1.3), 100.0, 10.0);
        assert_relative_eq!(w.bsf, 1.3, max_relative = 1e-12);
        assert!(!w.fallback);

        let s = Spectrum::from_pairs(&[(1.0, 5.0e4), (60.0, 1.0e5)]).unwrap();
        let w = weighted_bsf(&s, &[0.1, 0.1], &constant_grid(1.3), 100.0, 10.0);
        assert!(w.fallback);
        assert!(w.bsf < 1.3);
    }

    #[test]
    fn test_effective_energy_failure_reports_energy_bounds() {
        let store = AttenuationDataStore::standard();
        let edge = store.table(Material::Aluminium).unwrap().highest_edge();

        // 所需 μ 超过 Al K 边以上的最大值
        match effective_energy(store, Material::Aluminium, 1e-4, &RootSettings::default()) {
            Err(DoseError::RootFindFailure { lower, upper, .. }) => {
                assert_eq!(lower, edge);
                assert!(upper >= lower);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_effective_energy_failure_keeps_other_metrics() {
        // 2 keV 处 Cu 的 μ 高于 K 边以上任一能量
        let config = EngineConfig {
            hvl_material: Material::Copper,
            additional_hvl_materials: vec![],
            filtration: FiltrationMode::AlreadyApplied,
            ..Default::default()
        };
        let engine = DosimetryEngine::new(AttenuationDataStore::standard(), config);
        let s = Spectrum::from_pairs(&[(2.0, 1.0e6)]).unwrap();

        let result = engine
            .calculate(
                &ExposureParameters::default(),
                &s,
                KermaSource::Reference {
                    kerma_per_mas_ugy: 50.0,
                },
            )
            .unwrap();

        assert!(result.hvl1_mm.is_some());
        assert!(result.hvl2_mm.is_some());
        assert!(result.mean_energy_kev.is_some());
        assert_eq!(result.effective_energy_kev, None);
        assert!(result.has(Diagnostic::RootFindFailure));

        let failure = result
            .failures
            .iter()
            .find(|f| f.metric == Metric::EffectiveEnergy)
            .unwrap();
        let edge = AttenuationDataStore::standard()
            .table(Material::Copper)
            .unwrap()
            .highest_edge();
        assert_eq!(failure.lower, edge);
    }

    #[test]
    fn test_calculate_without_diameter() {
        let store = AttenuationDataStore::standard();
        let engine = DosimetryEngine::new(store, EngineConfig::default());
        let result = engine
            .calculate(
                &params(2.5),
                &kramers(120.0),
                KermaSource::Reference {
                    kerma_per_mas_ugy: 158.7,
                },
            )
            .unwrap();

        assert_relative_eq!(result.iak_mgy, 1.587, max_relative = 1e-9);
        assert_eq!(result.esak_mgy, None);
        assert_eq!(result.bsf, None);
        assert_eq!(result.distance_correction_factor, 1.0);
        assert!(result.diagnostics.is_empty());

        let h1 = result.hvl1_mm.unwrap();
        let h2 = result.hvl2_mm.unwrap();
        assert!(h2 >= h1);
        let hc = result.homogeneity_coefficient.unwrap();
        assert!(hc > 0.0 && hc <= 1.0);

        let e_eff = result.effective_energy_kev.unwrap();
        let e_mean = result.mean_energy_kev.unwrap();
        assert!(e_eff > 10.0 && e_eff < 120.0);
        assert!(e_mean > 10.0 && e_mean < 120.0);

        assert_eq!(result.additional_hvl1.len(), 1);
        assert_eq!(result.additional_hvl1[0].material, Material::Copper);
        assert!(result.additional_hvl1[0].hvl1_mm.unwrap() < h1);
    }

    #[test]
    fn test_esak_is_iak_times_bsf() {
        let store = AttenuationDataStore::standard();
        let grid = constant_grid(1.34);
        let engine = DosimetryEngine::new(store, EngineConfig::default()).with_backscatter(&grid);

        let mut p = params(2.5);
        p.field_diameter_cm = Some(10.0);
        let result = engine
            .calculate(
                &p,
                &kramers(120.0),
                KermaSource::Reference {
                    kerma_per_mas_ugy: 158.7,
                },
            )
            .unwrap();

        let bsf = result.bsf.unwrap();
        assert_relative_eq!(bsf, 1.34, max_relative = 1e-12);
        assert_eq!(result.esak_mgy.unwrap(), result.iak_mgy * bsf);
        assert_relative_eq!(result.esak_mgy.unwrap(), 2.127, max_relative = 1e-3);
    }

    #[test]
    fn test_diameter_without_grid_is_error() {
        let store = AttenuationDataStore::standard();
        let engine = DosimetryEngine::new(store, EngineConfig::default());
        let mut p = params(2.5);
        p.field_diameter_cm = Some(10.0);
        let err = engine
            .calculate(&p, &kramers(120.0), KermaSource::FromSpectrum)
            .unwrap_err();
        assert!(matches!(err, DoseError::InvalidArgument(_)));
    }

    #[test]
    fn test_phantom_mismatch_is_error() {
        let store = AttenuationDataStore::standard();
        let grid = constant_grid(1.3);
        let engine = DosimetryEngine::new(store, EngineConfig::default()).with_backscatter(&grid);
        let mut p = params(2.5);
        p.field_diameter_cm = Some(10.0);
        p.phantom = Material::Pmma;
        let err = engine
            .calculate(&p, &kramers(120.0), KermaSource::FromSpectrum)
            .unwrap_err();
        assert!(matches!(err, DoseError::Validation { .. }));
    }

    #[test]
    fn test_zero_fluence_is_degenerate_not_fault() {
        let store = AttenuationDataStore::standard();
        let grid = constant_grid(1.3);
        let engine = DosimetryEngine::new(store, EngineConfig::default()).with_backscatter(&grid);
        let mut p = params(2.5);
        p.field_diameter_cm = Some(10.0);
        let s = Spectrum::from_pairs(&[(30.0, 0.0), (60.0, 0.0), (90.0, 0.0)]).unwrap();

        let result = engine.calculate(&p, &s, KermaSource::FromSpectrum).unwrap();
        assert_eq!(result.bsf, Some(1.0));
        assert!(result.has(Diagnostic::NumericDegeneracy));
        assert_eq!(result.mean_energy_kev, None);
        assert_eq!(result.hvl1_mm, None);
        assert_eq!(result.iak_mgy, 0.0);
        assert!(result.failures.is_empty());
    }

    #[test]
    fn test_validation_runs_before_computation() {
        let store = AttenuationDataStore::standard();
        let engine = DosimetryEngine::new(store, EngineConfig::default());
        let mut p = params(2.5);
        p.ssd_cm = 20.0;
        // 谱超出系数表范围，但校验错误优先
        let s = Spectrum::from_pairs(&[(500.0, 1.0)]).unwrap();
        let err = engine.calculate(&p, &s, KermaSource::FromSpectrum).unwrap_err();
        assert!(matches!(err, DoseError::Validation { .. }));
    }

    #[test]
    fn test_energy_outside_table_is_fatal() {
        let store = AttenuationDataStore::standard();
        let engine = DosimetryEngine::new(store, EngineConfig::default());
        let s = Spectrum::from_pairs(&[(50.0, 1.0), (250.0, 1.0)]).unwrap();
        let err = engine
            .calculate(&params(2.5), &s, KermaSource::FromSpectrum)
            .unwrap_err();
        assert!(matches!(err, DoseError::EnergyOutOfRange { .. }));
    }

    #[test]
    fn test_root_failure_keeps_other_metrics() {
        let store = AttenuationDataStore::standard();
        let config = EngineConfig {
            max_thickness_mm: 1.0,
            ..Default::default()
        };
        let engine = DosimetryEngine::new(store, config);
        let result = engine
            .calculate(&params(2.5), &kramers(120.0), KermaSource::FromSpectrum)
            .unwrap();

        assert!(result.has(Diagnostic::RootFindFailure));
        assert_eq!(result.hvl1_mm, None);
        assert!(result
            .failures
            .iter()
            .any(|f| f.metric == Metric::Hvl1 && f.upper == 1.0));
        assert!(result.iak_mgy > 0.0);
        assert!(result.mean_energy_kev.is_some());
        // Cu 的 HVL1 远小于 1 mm，仍然成功
        assert!(result.additional_hvl1[0].hvl1_mm.is_some());
    }

    #[test]
    fn test_more_filtration_hardens_beam() {
        let store = AttenuationDataStore::standard();
        let engine = DosimetryEngine::new(store, EngineConfig::default());
        let s = kramers(120.0);

        let thin = engine
            .calculate(&params(2.5), &s, KermaSource::FromSpectrum)
            .unwrap();
        let thick = engine
            .calculate(&params(5.0), &s, KermaSource::FromSpectrum)
            .unwrap();

        assert!(thick.iak_mgy < thin.iak_mgy);
        assert!(thick.hvl1_mm.unwrap() > thin.hvl1_mm.unwrap());
        assert!(thick.mean_energy_kev.unwrap() > thin.mean_energy_kev.unwrap());
    }

    #[test]
    fn test_prefiltered_mode_ignores_filters() {
        let store = AttenuationDataStore::standard();
        let config = EngineConfig {
            filtration: FiltrationMode::AlreadyApplied,
            ..Default::default()
        };
        let engine = DosimetryEngine::new(store, config);
        let s = kramers(120.0);

        let a = engine.calculate(&params(2.5), &s, KermaSource::FromSpectrum).unwrap();
        let b = engine.calculate(&params(5.0), &s, KermaSource::FromSpectrum).unwrap();
        assert_eq!(a.hvl1_mm, b.hvl1_mm);
        assert_eq!(a.total_fluence, s.total_fluence());
    }

    #[test]
    fn test_engine_is_stateless_across_requests() {
        let store = AttenuationDataStore::standard();
        let engine = DosimetryEngine::new(store, EngineConfig::default());
        let s = kramers(100.0);

        let first = engine.calculate(&params(2.5), &s, KermaSource::FromSpectrum).unwrap();
        let _other = engine.calculate(&params(8.0), &s, KermaSource::FromSpectrum).unwrap();
        let again = engine.calculate(&params(2.5), &s, KermaSource::FromSpectrum).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_air_kerma_weighting_differs() {
        let store = AttenuationDataStore::standard();
        let s = kramers(120.0);
        let fluence = DosimetryEngine::new(store, EngineConfig::default())
            .calculate(&params(2.5), &s, KermaSource::FromSpectrum)
            .unwrap();
        let kerma = DosimetryEngine::new(
            store,
            EngineConfig {
                weighting: TransmissionWeighting::AirKerma,
                ..Default::default()
            },
        )
        .calculate(&params(2.5), &s, KermaSource::FromSpectrum)
        .unwrap();

        let a = fluence.hvl1_mm.unwrap();
        let b = kerma.hvl1_mm.unwrap();
        assert!((a - b).abs() > 1e-6);
        assert!(kerma.hvl2_mm.unwrap() >= b);
    }

    #[test]
    fn test_negative_reference_kerma_rejected() {
        let store = AttenuationDataStore::standard();
        let engine = DosimetryEngine::new(store, EngineConfig::default());
        let err = engine
            .calculate(
                &params(2.5),
                &kramers(120.0),
                KermaSource::Reference {
                    kerma_per_mas_ugy: -1.0,
                },
            )
            .unwrap_err();
        assert!(matches!(err, DoseError::Validation { .. }));
    }
}
