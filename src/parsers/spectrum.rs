//! # 注量谱解析器
//!
//! ## CSV 格式
//! ```text
//! # 120 kVp, 2.5 mm Al
//! energy_kev,fluence
//! 10.0,1.2e5
//! 10.5,3.4e5
//! ```
//! 列名也可写作 `energy` / `k` 与 `phi`；`#` 开头为注释行。
//!
//! ## JSON 格式
//! ```text
//! { "energy_kev": [10.0, 10.5], "fluence": [1.2e5, 3.4e5] }
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/calc.rs`、`commands/batch.rs` 使用
//! - 使用 `csv`、`serde_json`

use super::{detect_format, parse_error, read_file, DataFormat};
use crate::error::Result;
use crate::models::Spectrum;

use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct SpectrumRow {
    #[serde(alias = "energy", alias = "k", alias = "energy_keV")]
    energy_kev: f64,
    #[serde(alias = "phi")]
    fluence: f64,
}

#[derive(Debug, Deserialize)]
struct SpectrumDocument {
    #[serde(alias = "energy", alias = "k", alias = "energy_keV")]
    energy_kev: Vec<f64>,
    #[serde(alias = "phi")]
    fluence: Vec<f64>,
}

/// 按扩展名读取注量谱文件
pub fn load_spectrum(path: &Path) -> Result<Spectrum> {
    let source = path.display().to_string();
    let content = read_file(path)?;

    match detect_format(path)? {
        DataFormat::Csv => parse_spectrum_csv(content.as_bytes(), &source),
        DataFormat::Json => parse_spectrum_json(&content, &source),
    }
}

/// 解析 CSV 注量谱
pub fn parse_spectrum_csv<R: Read>(reader: R, source: &str) -> Result<Spectrum> {
    let mut rdr = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut energies = Vec::new();
    let mut fluence = Vec::new();

    for (i, row) in rdr.deserialize::<SpectrumRow>().enumerate() {
        let row = row.map_err(|e| parse_error("spectrum CSV", source, format!("row {}: {}", i + 1, e)))?;
        energies.push(row.energy_kev);
        fluence.push(row.fluence);
    }

    log::debug!("read {} spectrum bins from {}", energies.len(), source);
    Spectrum::new(energies, fluence)
}

/// 解析 JSON 注量谱
pub fn parse_spectrum_json(content: &str, source: &str) -> Result<Spectrum> {
    let doc: SpectrumDocument =
        serde_json::from_str(content).map_err(|e| parse_error("spectrum JSON", source, e))?;
    Spectrum::new(doc.energy_kev, doc.fluence)
}
