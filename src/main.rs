//! # xdose 命令行入口
//!
//! ## 子命令
//! - `calc`      - 单个注量谱的剂量与线质计算
//! - `batch`     - 目录中注量谱的并行批量计算
//! - `bsf`       - 反散射因子网格单点查询
//! - `devices`   - 设备预设列表
//! - `materials` - 衰减材料列表
//!
//! ## 日志
//! 库内诊断通过 `log` 输出，由 `env_logger` 接收；
//! `RUST_LOG` 优先于 `-v` 参数。

use clap::Parser;
use xdose::cli::Cli;
use xdose::{commands, utils};

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
