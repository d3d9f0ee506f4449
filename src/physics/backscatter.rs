//! # 单能反散射因子网格与三线性插值
//!
//! 网格坐标：源皮距 SSD（cm）× 光子能量（keV）× 照射野直径（cm），
//! 值为单能反散射因子 BSF_mono。
//!
//! ## 越界策略
//! 任一坐标落在对应轴的 [min, max] 之外（或为 NaN）时不外推，
//! 返回 `BsfLookup::Fallback`，其值恒为 1.0（不做反散射校正），
//! 由调用方记录 `BSF_FALLBACK` 诊断。
//!
//! ## 存储顺序
//! 值数组按行主序存放：SSD 变化最慢，直径变化最快，
//! 即 `index = (i_ssd * n_energy + i_energy) * n_diameter + i_diameter`。
//!
//! ## 依赖关系
//! - 被 `parsers/bsf_grid.rs` 构造
//! - 被 `physics/engine.rs` 调用计算谱加权 BSF

use crate::error::{DoseError, Result};
use crate::models::Material;

use serde::Serialize;

/// 越界时使用的反散射因子
pub const FALLBACK_BSF: f64 = 1.0;

/// 反散射因子网格（加载后只读）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackscatterGrid {
    ssd: Vec<f64>,
    energy: Vec<f64>,
    diameter: Vec<f64>,
    values: Vec<f64>,
    phantom: Material,
}

impl BackscatterGrid {
    /// 创建网格并校验轴与值
    pub fn new(
        ssd: Vec<f64>,
        energy: Vec<f64>,
        diameter: Vec<f64>,
        values: Vec<f64>,
        phantom: Material,
    ) -> Result<Self> {
        check_axis("ssd", &ssd)?;
        check_axis("energy", &energy)?;
        check_axis("diameter", &diameter)?;

        let expected = ssd.len() * energy.len() * diameter.len();
        if values.len() != expected {
            return Err(DoseError::InvalidGrid(format!(
                "bsf has {} values, expected {} ({} x {} x {})",
                values.len(),
                expected,
                ssd.len(),
                energy.len(),
                diameter.len()
            )));
        }

        if let Some(i) = values.iter().position(|v| !v.is_finite() || *v <= 0.0) {
            return Err(DoseError::InvalidGrid(format!(
                "bsf value at flat index {} must be positive and finite, got {}",
                i, values[i]
            )));
        }

        Ok(Self {
            ssd,
            energy,
            diameter,
            values,
            phantom,
        })
    }

    pub fn ssd_axis(&self) -> &[f64] {
        &self.ssd
    }

    pub fn energy_axis(&self) -> &[f64] {
        &self.energy
    }

    pub fn diameter_axis(&self) -> &[f64] {
        &self.diameter
    }

    /// 反散射因子所对应的模体材料
    pub fn phantom(&self) -> Material {
        self.phantom
    }

    /// 网格形状 (n_ssd, n_energy, n_diameter)
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.ssd.len(), self.energy.len(), self.diameter.len())
    }

    /// 节点值
    pub fn value(&self, i_ssd: usize, i_energy: usize, i_diameter: usize) -> f64 {
        let (_, ne, nd) = self.shape();
        self.values[(i_ssd * ne + i_energy) * nd + i_diameter]
    }
}

fn check_axis(name: &str, axis: &[f64]) -> Result<()> {
    if axis.is_empty() {
        return Err(DoseError::InvalidGrid(format!("{} axis is empty", name)));
    }
    if axis.iter().any(|v| !v.is_finite()) {
        return Err(DoseError::InvalidGrid(format!(
            "{} axis contains non-finite values",
            name
        )));
    }
    if axis.windows(2).any(|w| w[1] <= w[0]) {
        return Err(DoseError::InvalidGrid(format!(
            "{} axis must be strictly ascending",
            name
        )));
    }
    Ok(())
}

/// 单点查询结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BsfLookup {
    /// 网格内插值得到
    Interpolated(f64),
    /// 超出网格范围，值为 1.0
    Fallback,
}

impl BsfLookup {
    pub fn value(&self) -> f64 {
        match self {
            BsfLookup::Interpolated(v) => *v,
            BsfLookup::Fallback => FALLBACK_BSF,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, BsfLookup::Fallback)
    }
}

/// 整条能量轴上的查询结果，与谱逐 bin 对齐
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumBsf {
    pub values: Vec<f64>,
    /// 逐 bin 标记是否越界回退
    pub fallback: Vec<bool>,
}

impl SpectrumBsf {
    /// 越界回退的 bin 数
    pub fn fallback_bins(&self) -> usize {
        self.fallback.iter().filter(|&&f| f).count()
    }
}

/// 三线性插值器
#[derive(Debug, Clone)]
pub struct BackscatterInterpolator {
    grid: BackscatterGrid,
}

impl BackscatterInterpolator {
    pub fn new(grid: BackscatterGrid) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &BackscatterGrid {
        &self.grid
    }

    /// 在 (ssd, energy, diameter) 处求单能 BSF
    pub fn evaluate(&self, ssd: f64, energy: f64, diameter: f64) -> BsfLookup {
        let (Some(s), Some(e), Some(d)) = (
            locate(&self.grid.ssd, ssd),
            locate(&self.grid.energy, energy),
            locate(&self.grid.diameter, diameter),
        ) else {
            return BsfLookup::Fallback;
        };

        BsfLookup::Interpolated(self.trilinear(s, e, d))
    }

    /// 固定 (ssd, diameter) 下对整条能量轴求 BSF
    pub fn evaluate_spectrum(&self, ssd: f64, energies: &[f64], diameter: f64) -> SpectrumBsf {
        match (
            locate(&self.grid.ssd, ssd),
            locate(&self.grid.diameter, diameter),
        ) {
            (Some(s), Some(d)) => {
                let (values, fallback) = energies
                    .iter()
                    .map(|&energy| match locate(&self.grid.energy, energy) {
                        Some(e) => (self.trilinear(s, e, d), false),
                        None => (FALLBACK_BSF, true),
                    })
                    .unzip();
                SpectrumBsf { values, fallback }
            }
            _ => SpectrumBsf {
                values: vec![FALLBACK_BSF; energies.len()],
                fallback: vec![true; energies.len()],
            },
        }
    }

    fn trilinear(&self, s: Cell, e: Cell, d: Cell) -> f64 {
        let g = &self.grid;

        // 先沿直径，再沿能量，最后沿 SSD
        let along_d = |i: usize, j: usize| {
            lerp(g.value(i, j, d.lo), g.value(i, j, d.hi), d.t)
        };
        let along_e = |i: usize| lerp(along_d(i, e.lo), along_d(i, e.hi), e.t);

        lerp(along_e(s.lo), along_e(s.hi), s.t)
    }
}

/// 坐标在某一轴上所在的单元
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    lo: usize,
    hi: usize,
    t: f64,
}

/// 定位坐标所在单元；越界或 NaN 返回 None
fn locate(axis: &[f64], x: f64) -> Option<Cell> {
    let n = axis.len();
    if !(x >= axis[0] && x <= axis[n - 1]) {
        return None;
    }
    if n == 1 {
        return Some(Cell { lo: 0, hi: 0, t: 0.0 });
    }

    let hi = axis.partition_point(|&a| a <= x).clamp(1, n - 1);
    let lo = hi - 1;
    let t = (x - axis[lo]) / (axis[hi] - axis[lo]);

    Some(Cell { lo, hi, t })
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    (1.0 - t) * a + t * b
}
