//! # bsf 子命令实现
//!
//! 在网格上单点查询单能反散射因子，便于核对网格文件。
//!
//! ## 依赖关系
//! - 使用 `cli/bsf.rs` 定义的 BsfArgs
//! - 使用 `parsers/bsf_grid.rs`、`physics/backscatter.rs`

use crate::cli::bsf::BsfArgs;
use crate::error::Result;
use crate::parsers;
use crate::physics::{BackscatterInterpolator, BsfLookup};
use crate::utils::output;

/// 执行 bsf 命令
pub fn execute(args: BsfArgs) -> Result<()> {
    output::print_header("Backscatter Factor Lookup");

    let grid = parsers::load_bsf_grid(&args.grid)?;
    print_axes(&grid);

    let interpolator = BackscatterInterpolator::new(grid);
    match interpolator.evaluate(args.ssd, args.energy, args.diameter) {
        BsfLookup::Interpolated(value) => output::print_success(&format!(
            "BSF(ssd={} cm, E={} keV, d={} cm) = {:.4}",
            args.ssd, args.energy, args.diameter, value
        )),
        BsfLookup::Fallback => output::print_warning(&format!(
            "Point (ssd={} cm, E={} keV, d={} cm) is outside the grid; BSF = 1.0 (BSF_FALLBACK)",
            args.ssd, args.energy, args.diameter
        )),
    }

    Ok(())
}

fn print_axes(grid: &crate::physics::BackscatterGrid) {
    let span = |axis: &[f64]| match (axis.first(), axis.last()) {
        (Some(lo), Some(hi)) => format!("{} points, [{}, {}]", axis.len(), lo, hi),
        _ => "empty".to_string(),
    };

    output::print_info(&format!("Phantom: {}", grid.phantom()));
    output::print_info(&format!("SSD (cm):      {}", span(grid.ssd_axis())));
    output::print_info(&format!("Energy (keV):  {}", span(grid.energy_axis())));
    output::print_info(&format!("Diameter (cm): {}", span(grid.diameter_axis())));
}
