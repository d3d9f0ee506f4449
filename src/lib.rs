//! # xdose - X 射线剂量与线质计算
//!
//! 由曝光参数与光子注量谱计算入射空气比释动能（IAK）、
//! 入射表面空气比释动能（ESAK）、谱加权反散射因子（BSF）、
//! 半值层（HVL1/HVL2）、均匀性系数、平均能量与有效能量。
//!
//! ## 模块结构
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── parsers/   (注量谱与 BSF 网格解析)
//!   │     ├── physics/   (衰减系数、BSF 插值、剂量引擎)
//!   │     └── models/    (数据模型)
//!   ├── batch/      (并行批处理)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```
//!
//! ## 示例
//! ```no_run
//! use xdose::models::{ExposureParameters, Filter, Material, Spectrum};
//! use xdose::physics::{AttenuationDataStore, DosimetryEngine, EngineConfig, KermaSource};
//!
//! let spectrum = Spectrum::from_pairs(&[(30.0, 1.0e5), (50.0, 2.0e5), (70.0, 1.0e5)])?;
//! let params = ExposureParameters {
//!     kvp: 80.0,
//!     filters: vec![Filter::new(Material::Aluminium, 2.5)],
//!     ..Default::default()
//! };
//! let engine = DosimetryEngine::new(AttenuationDataStore::standard(), EngineConfig::default());
//! let result = engine.calculate(&params, &spectrum, KermaSource::FromSpectrum)?;
//! println!("IAK = {:.4} mGy, HVL1 = {:?} mm Al", result.iak_mgy, result.hvl1_mm);
//! # Ok::<(), xdose::error::DoseError>(())
//! ```

pub mod batch;
pub mod cli;
pub mod commands;
pub mod error;
pub mod models;
pub mod parsers;
pub mod physics;
pub mod utils;

pub use error::{DoseError, Result};
