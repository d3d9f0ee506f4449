//! # 物理计算模块
//!
//! 衰减系数数据库、反散射因子插值与剂量计算引擎。
//!
//! ## 依赖关系
//! - 被 `commands/` 调用
//! - 使用 `models/` 中的值对象
//! - 子模块: attenuation, backscatter, roots, engine

pub mod attenuation;
pub mod backscatter;
pub mod engine;
pub mod roots;

pub use attenuation::{AttenuationDataStore, AttenuationTable};
pub use backscatter::{BackscatterGrid, BackscatterInterpolator, BsfLookup, FALLBACK_BSF};
pub use engine::{
    air_kerma, distance_correction_factor, effective_energy, hvl, mean_energy, transmission,
    DosimetryEngine, EngineConfig, FiltrationMode, KermaSource, TransmissionWeighting,
};
pub use roots::RootSettings;
