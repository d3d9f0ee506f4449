//! # 数据模型模块
//!
//! 定义注量谱、曝光参数、设备预设与计算结果等值对象。
//!
//! ## 依赖关系
//! - 被 `parsers/`、`physics/` 和 `commands/` 使用
//! - 子模块: material, spectrum, exposure, device, result

pub mod device;
pub mod exposure;
pub mod material;
pub mod result;
pub mod spectrum;

pub use device::{get_device_preset, DevicePreset, DEVICE_PRESETS};
pub use exposure::{parse_filter_list, ExposureParameters, Filter};
pub use material::Material;
pub use result::{Diagnostic, DosimetryResult, MaterialHvl, Metric, MetricFailure};
pub use spectrum::Spectrum;
