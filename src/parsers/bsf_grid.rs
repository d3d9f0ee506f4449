//! # 反散射因子网格解析器
//!
//! ## JSON 格式
//! ```text
//! {
//!   "phantom": "water",
//!   "ssd": [50, 100, 150],
//!   "energy": [10, 20, ...],
//!   "diameter": [2, 5, 10],
//!   "bsf": [[[...], ...], ...]
//! }
//! ```
//! 轴名也可写作 `SSD` / `k` / `D`，值名 `Bw`。`bsf` 可以是与轴形状一致的
//! 三层嵌套数组，也可以是行主序（SSD 最慢、直径最快）的扁平数组。
//! `phantom` 缺省为水。
//!
//! ## CSV 长表格式
//! ```text
//! ssd,energy,diameter,bsf
//! 100,20,10,1.21
//! ```
//! 每个 (ssd, energy, diameter) 节点恰好一行，网格必须完整。模体为水。
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 构造 `physics::BackscatterGrid`
//! - 使用 `csv`、`serde_json`

use super::{detect_format, parse_error, read_file, DataFormat};
use crate::error::{DoseError, Result};
use crate::models::Material;
use crate::physics::BackscatterGrid;

use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BsfValues {
    Nested(Vec<Vec<Vec<f64>>>),
    Flat(Vec<f64>),
}

#[derive(Debug, Deserialize)]
struct GridDocument {
    #[serde(default)]
    phantom: Option<String>,
    #[serde(alias = "SSD")]
    ssd: Vec<f64>,
    #[serde(alias = "k", alias = "energy_kev")]
    energy: Vec<f64>,
    #[serde(alias = "D")]
    diameter: Vec<f64>,
    #[serde(alias = "Bw")]
    bsf: BsfValues,
}

#[derive(Debug, Deserialize)]
struct GridRow {
    #[serde(alias = "SSD")]
    ssd: f64,
    #[serde(alias = "k", alias = "energy_kev")]
    energy: f64,
    #[serde(alias = "D")]
    diameter: f64,
    #[serde(alias = "Bw")]
    bsf: f64,
}

/// 按扩展名读取网格文件
pub fn load_bsf_grid(path: &Path) -> Result<BackscatterGrid> {
    let source = path.display().to_string();
    let content = read_file(path)?;

    let grid = match detect_format(path)? {
        DataFormat::Json => parse_grid_json(&content, &source)?,
        DataFormat::Csv => parse_grid_csv(content.as_bytes(), &source)?,
    };

    let (ns, ne, nd) = grid.shape();
    log::info!(
        "loaded backscatter grid {} ({} ssd x {} energy x {} diameter, phantom {})",
        source,
        ns,
        ne,
        nd,
        grid.phantom()
    );
    Ok(grid)
}

/// 解析 JSON 网格
pub fn parse_grid_json(content: &str, source: &str) -> Result<BackscatterGrid> {
    let doc: GridDocument =
        serde_json::from_str(content).map_err(|e| parse_error("BSF grid JSON", source, e))?;

    let phantom = match doc.phantom.as_deref() {
        Some(name) => name.parse::<Material>()?,
        None => Material::Water,
    };

    let values = match doc.bsf {
        BsfValues::Flat(values) => values,
        BsfValues::Nested(nested) => flatten(nested, doc.ssd.len(), doc.energy.len(), doc.diameter.len())?,
    };

    BackscatterGrid::new(doc.ssd, doc.energy, doc.diameter, values, phantom)
}

fn flatten(nested: Vec<Vec<Vec<f64>>>, ns: usize, ne: usize, nd: usize) -> Result<Vec<f64>> {
    if nested.len() != ns {
        return Err(DoseError::InvalidGrid(format!(
            "bsf has {} ssd planes, expected {}",
            nested.len(),
            ns
        )));
    }

    let mut values = Vec::with_capacity(ns * ne * nd);
    for (i, plane) in nested.into_iter().enumerate() {
        if plane.len() != ne {
            return Err(DoseError::InvalidGrid(format!(
                "bsf[{}] has {} energy rows, expected {}",
                i,
                plane.len(),
                ne
            )));
        }
        for (j, row) in plane.into_iter().enumerate() {
            if row.len() != nd {
                return Err(DoseError::InvalidGrid(format!(
                    "bsf[{}][{}] has {} diameter values, expected {}",
                    i,
                    j,
                    row.len(),
                    nd
                )));
            }
            values.extend(row);
        }
    }
    Ok(values)
}

/// 解析 CSV 长表网格
pub fn parse_grid_csv<R: Read>(reader: R, source: &str) -> Result<BackscatterGrid> {
    let mut rdr = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (i, row) in rdr.deserialize::<GridRow>().enumerate() {
        rows.push(row.map_err(|e| parse_error("BSF grid CSV", source, format!("row {}: {}", i + 1, e)))?);
    }

    let ssd = axis_from(rows.iter().map(|r| r.ssd));
    let energy = axis_from(rows.iter().map(|r| r.energy));
    let diameter = axis_from(rows.iter().map(|r| r.diameter));
    let (ne, nd) = (energy.len(), diameter.len());

    let mut values = vec![f64::NAN; ssd.len() * ne * nd];
    let mut filled = vec![false; values.len()];

    for row in &rows {
        let i = position(&ssd, row.ssd);
        let j = position(&energy, row.energy);
        let k = position(&diameter, row.diameter);
        let index = (i * ne + j) * nd + k;
        if filled[index] {
            return Err(DoseError::InvalidGrid(format!(
                "duplicate node ssd={}, energy={}, diameter={}",
                row.ssd, row.energy, row.diameter
            )));
        }
        filled[index] = true;
        values[index] = row.bsf;
    }

    let missing = filled.iter().filter(|f| !**f).count();
    if missing > 0 {
        return Err(DoseError::InvalidGrid(format!(
            "{} of {} grid nodes are missing",
            missing,
            filled.len()
        )));
    }

    BackscatterGrid::new(ssd, energy, diameter, values, Material::Water)
}

/// 去重排序后的轴
fn axis_from(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut axis: Vec<f64> = values.collect();
    axis.sort_by(f64::total_cmp);
    axis.dedup();
    axis
}

fn position(axis: &[f64], x: f64) -> usize {
    axis.partition_point(|&a| a < x)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"{
        "phantom": "water",
        "SSD": [50, 100],
        "k": [20, 80],
        "D": [5, 20],
        "Bw": [[[1.10, 1.20], [1.30, 1.40]], [[1.15, 1.25], [1.35, 1.45]]]
    }"#;

    #[test]
    fn test_parse_nested_json() {
        let grid = parse_grid_json(NESTED, "inline").unwrap();
        assert_eq!(grid.shape(), (2, 2, 2));
        assert_eq!(grid.value(0, 1, 0), 1.30);
        assert_eq!(grid.value(1, 0, 1), 1.25);
        assert_eq!(grid.phantom(), Material::Water);
    }

    #[test]
    fn test_parse_flat_json_matches_nested() {
        let flat = r#"{
            "ssd": [50, 100],
            "energy": [20, 80],
            "diameter": [5, 20],
            "bsf": [1.10, 1.20, 1.30, 1.40, 1.15, 1.25, 1.35, 1.45]
        }"#;
        assert_eq!(
            parse_grid_json(flat, "inline").unwrap(),
            parse_grid_json(NESTED, "inline").unwrap()
        );
    }

    #[test]
    fn test_nested_shape_mismatch() {
        let bad = r#"{"ssd": [100], "energy": [20, 80], "diameter": [5], "bsf": [[[1.1]]]}"#;
        assert!(matches!(
            parse_grid_json(bad, "inline"),
            Err(DoseError::InvalidGrid(_))
        ));
    }

    #[test]
    fn test_phantom_field() {
        let doc = r#"{"phantom": "pmma", "ssd": [100], "energy": [20], "diameter": [5], "bsf": [1.3]}"#;
        assert_eq!(parse_grid_json(doc, "inline").unwrap().phantom(), Material::Pmma);

        let unknown = r#"{"phantom": "lead", "ssd": [100], "energy": [20], "diameter": [5], "bsf": [1.3]}"#;
        assert!(matches!(
            parse_grid_json(unknown, "inline"),
            Err(DoseError::UnknownMaterial(_))
        ));
    }

    #[test]
    fn test_parse_long_csv_any_row_order() {
        let data = "\
ssd,energy,diameter,bsf
100,80,20,1.45
50,20,5,1.10
50,20,20,1.20
100,20,5,1.15
50,80,5,1.30
100,80,5,1.35
50,80,20,1.40
100,20,20,1.25
";
        let grid = parse_grid_csv(data.as_bytes(), "inline").unwrap();
        assert_eq!(grid, parse_grid_json(NESTED, "inline").unwrap());
    }

    #[test]
    fn test_incomplete_csv_grid() {
        let data = "ssd,energy,diameter,bsf\n50,20,5,1.1\n100,80,20,1.4\n";
        assert!(matches!(
            parse_grid_csv(data.as_bytes(), "inline"),
            Err(DoseError::InvalidGrid(_))
        ));
    }

    #[test]
    fn test_duplicate_csv_node() {
        let data = "ssd,energy,diameter,bsf\n50,20,5,1.1\n50,20,5,1.2\n";
        assert!(parse_grid_csv(data.as_bytes(), "inline").is_err());
    }
}
