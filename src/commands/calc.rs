//! # calc 子命令实现
//!
//! 读取注量谱（与可选的 BSF 网格），执行一次剂量计算并输出结果。
//!
//! ## 依赖关系
//! - 使用 `cli/calc.rs` 定义的 CalcArgs、BeamArgs
//! - 使用 `parsers/` 读取谱与网格
//! - 使用 `physics::DosimetryEngine` 计算
//! - 使用 `tabled` 打印结果表

use crate::cli::calc::{BeamArgs, CalcArgs, OutputFormat};
use crate::error::{DoseError, Result};
use crate::models::{get_device_preset, parse_filter_list, DosimetryResult, ExposureParameters, Material};
use crate::parsers;
use crate::physics::{
    AttenuationDataStore, BackscatterInterpolator, DosimetryEngine, EngineConfig, FiltrationMode,
    KermaSource,
};
use crate::utils::output;

use serde::Serialize;
use std::fs;
use std::path::Path;
use tabled::{Table, Tabled};

/// 默认阳极角（度）
const DEFAULT_ANODE_ANGLE_DEG: f64 = 12.0;

/// 由命令行参数构造的一次计算请求（谱除外）
#[derive(Debug)]
pub struct Setup {
    pub params: ExposureParameters,
    pub config: EngineConfig,
    pub kerma: KermaSource,
    pub backscatter: Option<BackscatterInterpolator>,
}

impl Setup {
    pub fn engine(&self) -> DosimetryEngine<'_> {
        let engine = DosimetryEngine::new(AttenuationDataStore::standard(), self.config.clone());
        match &self.backscatter {
            Some(interpolator) => engine.with_backscatter(interpolator),
            None => engine,
        }
    }
}

/// JSON 报告
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub spectrum: String,
    pub exposure: &'a ExposureParameters,
    pub result: &'a DosimetryResult,
}

/// 结果表行
#[derive(Tabled)]
struct QuantityRow {
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Unit")]
    unit: &'static str,
}

/// 解析曝光参数、设备预设与引擎配置
pub fn prepare(beam: &BeamArgs) -> Result<Setup> {
    let device = beam.device.as_deref().map(get_device_preset).transpose()?;

    let anode_angle_deg = beam
        .anode_angle
        .or(device.map(|d| d.anode_angle_deg))
        .unwrap_or(DEFAULT_ANODE_ANGLE_DEG);

    let filters = match (&beam.filter, device) {
        (Some(list), _) => parse_filter_list(list)?,
        (None, Some(preset)) => vec![preset.filter],
        (None, None) => Vec::new(),
    };

    let params = ExposureParameters {
        kvp: beam.kvp,
        ma: beam.ma,
        time_s: beam.time,
        ssd_cm: beam.ssd,
        anode_angle_deg,
        filters,
        field_diameter_cm: beam.diameter,
        phantom: beam.phantom,
    };
    params.validate()?;

    let config = EngineConfig {
        hvl_material: beam.hvl_material,
        additional_hvl_materials: beam
            .also_hvl
            .iter()
            .copied()
            .filter(|m| *m != beam.hvl_material)
            .collect(),
        weighting: beam.hvl_weighting.into(),
        filtration: if beam.prefiltered {
            FiltrationMode::AlreadyApplied
        } else {
            FiltrationMode::Apply
        },
        max_thickness_mm: beam.max_thickness,
        ..Default::default()
    };

    let kerma = match beam.kerma_per_mas {
        Some(kerma_per_mas_ugy) => KermaSource::Reference { kerma_per_mas_ugy },
        None => KermaSource::FromSpectrum,
    };

    let backscatter = match (&beam.bsf_grid, beam.diameter) {
        (Some(path), _) => Some(BackscatterInterpolator::new(parsers::load_bsf_grid(path)?)),
        (None, Some(_)) => {
            return Err(DoseError::InvalidArgument(
                "--diameter requires a backscatter grid (--bsf-grid or XDOSE_BSF_GRID)".to_string(),
            ))
        }
        (None, None) => None,
    };

    Ok(Setup {
        params,
        config,
        kerma,
        backscatter,
    })
}

/// 执行 calc 命令
pub fn execute(args: CalcArgs) -> Result<()> {
    let table_mode = args.format == OutputFormat::Table;
    if table_mode {
        output::print_header("Entrance Surface Air Kerma");
    }

    let setup = prepare(&args.beam)?;
    let spectrum = parsers::load_spectrum(&args.spectrum)?;

    if table_mode {
        output::print_info(&format!(
            "Spectrum '{}': {} bins",
            args.spectrum.display(),
            spectrum.len()
        ));
        print_exposure(&setup);
    }

    let result = setup.engine().calculate(&setup.params, &spectrum, setup.kerma)?;

    let report = Report {
        spectrum: args.spectrum.display().to_string(),
        exposure: &setup.params,
        result: &result,
    };

    match args.format {
        OutputFormat::Table => print_result(&result),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if let Some(path) = &args.output {
        write_report(&report, path)?;
        if table_mode {
            output::print_success(&format!("Report saved to '{}'", path.display()));
        }
    }

    Ok(())
}

/// 写出 JSON 报告
pub fn write_report(report: &Report<'_>, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).map_err(|e| DoseError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

fn print_exposure(setup: &Setup) {
    let p = &setup.params;
    output::print_info(&format!(
        "{} kVp, {} mA x {} s = {} mAs, SSD {} cm, anode {}°",
        p.kvp,
        p.ma,
        p.time_s,
        p.mas(),
        p.ssd_cm,
        p.anode_angle_deg
    ));

    if !p.filters.is_empty() {
        let filters: Vec<String> = p.filters.iter().map(|f| f.to_string()).collect();
        let mode = match setup.config.filtration {
            FiltrationMode::Apply => "applied",
            FiltrationMode::AlreadyApplied => "already in spectrum",
        };
        output::print_info(&format!(
            "Filtration: {} ({}; total Al {} mm)",
            filters.join(", "),
            mode,
            p.total_filtration(Material::Aluminium)
        ));
    }

    match setup.kerma {
        KermaSource::Reference { kerma_per_mas_ugy } => {
            output::print_info(&format!("Reference kerma: {} uGy/mAs at 100 cm", kerma_per_mas_ugy))
        }
        KermaSource::FromSpectrum => output::print_info("Kerma derived from the spectrum"),
    }
}

fn row(quantity: impl Into<String>, value: String, unit: &'static str) -> QuantityRow {
    QuantityRow {
        quantity: quantity.into(),
        value,
        unit,
    }
}

/// 打印结果表与诊断
pub fn print_result(result: &DosimetryResult) {
    let m = result.hvl_material;
    let mut rows = vec![
        row("IAK", format!("{:.4}", result.iak_mgy), "mGy"),
        row("ESAK", output::format_optional(result.esak_mgy, 4), "mGy"),
        row("BSF", output::format_optional(result.bsf, 4), ""),
        row(
            "Distance correction",
            format!("{:.4}", result.distance_correction_factor),
            "",
        ),
        row(
            "Kerma at 100 cm",
            format!("{:.3}", result.kerma_per_mas_ugy),
            "uGy/mAs",
        ),
        row(format!("HVL1 ({})", m), output::format_optional(result.hvl1_mm, 3), "mm"),
        row(format!("HVL2 ({})", m), output::format_optional(result.hvl2_mm, 3), "mm"),
        row("Homogeneity coefficient", output::format_optional(result.homogeneity_coefficient, 3), ""),
        row("Mean energy", output::format_optional(result.mean_energy_kev, 2), "keV"),
        row("Effective energy", output::format_optional(result.effective_energy_kev, 2), "keV"),
    ];

    for extra in &result.additional_hvl1 {
        rows.push(row(
            format!("HVL1 ({})", extra.material),
            output::format_optional(extra.hvl1_mm, 3),
            "mm",
        ));
    }

    rows.push(row("Fluence", format!("{:.4e}", result.total_fluence), "1/cm²"));
    rows.push(row(
        "Energy fluence",
        format!("{:.4e}", result.energy_fluence),
        "keV/cm²",
    ));

    println!("{}", Table::new(&rows));

    for failure in &result.failures {
        output::print_warning(&format!(
            "{} not found: {} (searched [{}, {}])",
            failure.metric, failure.reason, failure.lower, failure.upper
        ));
    }

    for &diagnostic in &result.diagnostics {
        output::print_diagnostic(diagnostic);
    }
    if result.diagnostics.is_empty() {
        output::print_success("Calculation complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::calc::HvlWeighting;
    use crate::models::Filter;

    fn beam() -> BeamArgs {
        BeamArgs {
            kvp: 120.0,
            ma: 100.0,
            time: 0.1,
            ssd: 100.0,
            anode_angle: None,
            filter: None,
            diameter: None,
            phantom: Material::Water,
            device: None,
            kerma_per_mas: Some(158.7),
            bsf_grid: None,
            prefiltered: false,
            hvl_material: Material::Aluminium,
            also_hvl: vec![Material::Copper],
            hvl_weighting: HvlWeighting::EnergyFluence,
            max_thickness: 50.0,
        }
    }

    #[test]
    fn test_device_preset_fills_angle_and_filter() {
        let mut b = beam();
        b.device = Some("varian-kv".to_string());
        let setup = prepare(&b).unwrap();
        assert_eq!(setup.params.anode_angle_deg, 14.0);
        assert_eq!(setup.params.filters, vec![Filter::new(Material::Aluminium, 3.3)]);
    }

    #[test]
    fn test_explicit_values_override_preset() {
        let mut b = beam();
        b.device = Some("varian-kv".to_string());
        b.anode_angle = Some(10.0);
        b.filter = Some("Cu:0.1".to_string());
        let setup = prepare(&b).unwrap();
        assert_eq!(setup.params.anode_angle_deg, 10.0);
        assert_eq!(setup.params.filters, vec![Filter::new(Material::Copper, 0.1)]);
    }

    #[test]
    fn test_default_anode_angle_and_kerma_source() {
        let setup = prepare(&beam()).unwrap();
        assert_eq!(setup.params.anode_angle_deg, 12.0);
        assert!(setup.params.filters.is_empty());
        assert_eq!(
            setup.kerma,
            KermaSource::Reference {
                kerma_per_mas_ugy: 158.7
            }
        );
    }

    #[test]
    fn test_diameter_without_grid_rejected() {
        let mut b = beam();
        b.diameter = Some(10.0);
        assert!(matches!(prepare(&b), Err(DoseError::InvalidArgument(_))));
    }

    #[test]
    fn test_unknown_device_rejected() {
        let mut b = beam();
        b.device = Some("nope".to_string());
        assert!(matches!(prepare(&b), Err(DoseError::UnknownDevice(_))));
    }

    #[test]
    fn test_out_of_range_rejected_before_loading() {
        let mut b = beam();
        b.kvp = 20.0;
        assert!(matches!(prepare(&b), Err(DoseError::Validation { .. })));
    }

    #[test]
    fn test_hvl_material_not_repeated() {
        let mut b = beam();
        b.hvl_material = Material::Copper;
        let setup = prepare(&b).unwrap();
        assert!(setup.config.additional_hvl_materials.is_empty());
    }
}
