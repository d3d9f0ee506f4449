//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `physics/`, `models/`, `utils/`
//! - 子模块: calc, batch, bsf, devices, materials

pub mod batch;
pub mod bsf;
pub mod calc;
pub mod devices;
pub mod materials;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Calc(args) => calc::execute(args),
        Commands::Batch(args) => batch::execute(args),
        Commands::Bsf(args) => bsf::execute(args),
        Commands::Devices => devices::execute(),
        Commands::Materials => materials::execute(),
    }
}
