//! # materials 子命令实现
//!
//! ## 依赖关系
//! - 使用 `physics/attenuation.rs` 的内置系数表

use crate::error::Result;
use crate::physics::AttenuationDataStore;
use crate::utils::output;

use tabled::{Table, Tabled};

#[derive(Tabled)]
struct MaterialRow {
    #[tabled(rename = "Material")]
    symbol: &'static str,
    #[tabled(rename = "Density (g/cm³)")]
    density: f64,
    #[tabled(rename = "Range (keV)")]
    range: String,
    #[tabled(rename = "Highest edge (keV)")]
    edge: String,
}

/// 执行 materials 命令
pub fn execute() -> Result<()> {
    output::print_header("Attenuation Data");

    let store = AttenuationDataStore::standard();
    let mut rows = Vec::new();
    for material in store.materials() {
        let table = store.table(material)?;
        let (min, max) = table.energy_range();
        let edge = table.highest_edge();
        rows.push(MaterialRow {
            symbol: material.symbol(),
            density: material.density(),
            range: format!("{} - {}", min, max),
            edge: if edge > min {
                format!("{}", edge)
            } else {
                "-".to_string()
            },
        });
    }

    println!("{}", Table::new(&rows));
    output::print_info("Coefficients: NIST XCOM / X-ray mass energy-absorption tables");
    Ok(())
}
