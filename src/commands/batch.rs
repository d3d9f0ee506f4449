//! # batch 子命令实现
//!
//! 对目录中的每个注量谱执行同一组曝光参数下的剂量计算。
//!
//! ## 功能
//! - 并行计算（rayon），所有请求共享一份只读网格与系数表
//! - 汇总 CSV，每个谱一行
//! - 可选逐谱 JSON 报告
//!
//! ## 依赖关系
//! - 使用 `cli/batch.rs` 定义的 BatchArgs
//! - 使用 `commands/calc.rs` 的请求构造与报告写出
//! - 使用 `batch/` 模块进行并行处理

use crate::batch::{BatchRunner, FileCollector, ProcessResult};
use crate::cli::batch::BatchArgs;
use crate::commands::calc::{self, Report, Setup};
use crate::error::{DoseError, Result};
use crate::models::DosimetryResult;
use crate::parsers;
use crate::utils::output;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{Table, Tabled};

/// 汇总 CSV 的一行
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub spectrum: String,
    pub iak_mgy: f64,
    pub esak_mgy: Option<f64>,
    pub bsf: Option<f64>,
    pub hvl1_mm: Option<f64>,
    pub hvl2_mm: Option<f64>,
    pub homogeneity_coefficient: Option<f64>,
    pub mean_energy_kev: Option<f64>,
    pub effective_energy_kev: Option<f64>,
    pub diagnostics: String,
}

impl SummaryRow {
    fn new(spectrum: &Path, result: &DosimetryResult) -> Self {
        Self {
            spectrum: spectrum.display().to_string(),
            iak_mgy: result.iak_mgy,
            esak_mgy: result.esak_mgy,
            bsf: result.bsf,
            hvl1_mm: result.hvl1_mm,
            hvl2_mm: result.hvl2_mm,
            homogeneity_coefficient: result.homogeneity_coefficient,
            mean_energy_kev: result.mean_energy_kev,
            effective_energy_kev: result.effective_energy_kev,
            diagnostics: result.diagnostics_label(),
        }
    }
}

/// 终端汇总表行
#[derive(Tabled)]
struct DisplayRow {
    #[tabled(rename = "Spectrum")]
    spectrum: String,
    #[tabled(rename = "IAK (mGy)")]
    iak: String,
    #[tabled(rename = "ESAK (mGy)")]
    esak: String,
    #[tabled(rename = "HVL1 (mm)")]
    hvl1: String,
    #[tabled(rename = "E_eff (keV)")]
    effective_energy: String,
    #[tabled(rename = "Diagnostics")]
    diagnostics: String,
}

impl From<&SummaryRow> for DisplayRow {
    fn from(row: &SummaryRow) -> Self {
        let fmt = output::format_optional;
        let name = Path::new(&row.spectrum)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&row.spectrum)
            .to_string();

        Self {
            spectrum: name,
            iak: format!("{:.4}", row.iak_mgy),
            esak: fmt(row.esak_mgy, 4),
            hvl1: fmt(row.hvl1_mm, 3),
            effective_energy: fmt(row.effective_energy_kev, 2),
            diagnostics: row.diagnostics.clone(),
        }
    }
}

/// 执行 batch 命令
pub fn execute(args: BatchArgs) -> Result<()> {
    output::print_header("Batch Dose Calculation");

    let setup = Arc::new(calc::prepare(&args.beam)?);

    let files = FileCollector::new(args.input.clone())
        .with_pattern(&args.pattern)?
        .recursive(args.recursive)
        .collect()?;
    let files = exclude_outputs(files, &args.summary, args.output_dir.as_deref());

    if files.is_empty() {
        return Err(DoseError::NoFilesFound {
            pattern: args.pattern.clone(),
        });
    }

    output::print_info(&format!(
        "Found {} spectrum files in '{}'",
        files.len(),
        args.input.display()
    ));

    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir).map_err(|e| DoseError::FileWriteError {
            path: dir.display().to_string(),
            source: e,
        })?;
    }

    let reports = match &args.output_dir {
        Some(dir) => report_paths(&files, &args.input, dir)?,
        None => BTreeMap::new(),
    };

    let runner = BatchRunner::new(args.jobs);
    output::print_info(&format!("Running with {} parallel jobs", runner.jobs()));

    let result = runner.run(files, |file| {
        process_file(file, &setup, reports.get(file).map(PathBuf::as_path), args.overwrite)
    })?;

    if !result.successes.is_empty() {
        let rows: Vec<DisplayRow> = result.successes.iter().map(DisplayRow::from).collect();
        println!("{}", Table::new(&rows));
        write_summary(&result.successes, &args.summary)?;
        output::print_success(&format!("Summary saved to '{}'", args.summary.display()));
    }

    output::print_separator();
    output::print_success(&format!(
        "Batch complete: {} success, {} skipped, {} failed",
        result.success(),
        result.skipped,
        result.failed()
    ));

    if !result.failures.is_empty() {
        output::print_warning("Failed files:");
        for (path, err) in result.failures.iter().take(10) {
            output::print_error(&format!("  {}: {}", path, err));
        }
        if result.failures.len() > 10 {
            output::print_warning(&format!("  ... and {} more", result.failures.len() - 10));
        }
    }

    Ok(())
}

/// 去掉本命令自己写出的文件（汇总 CSV 与报告目录）
fn exclude_outputs(files: Vec<PathBuf>, summary: &Path, output_dir: Option<&Path>) -> Vec<PathBuf> {
    let resolve = |p: &Path| fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf());
    let summary = resolve(summary);
    let output_dir = output_dir.map(resolve);

    files
        .into_iter()
        .filter(|file| {
            let file = resolve(file);
            file != summary && output_dir.as_ref().map_or(true, |dir| !file.starts_with(dir))
        })
        .collect()
}

/// 报告文件名：相对输入目录的路径，分隔符与扩展名的点替换为 `_`
///
/// `a/120.csv` -> `a_120_csv_dose.json`。映射后仍重名则报错。
fn report_paths(
    files: &[PathBuf],
    input: &Path,
    output_dir: &Path,
) -> Result<BTreeMap<PathBuf, PathBuf>> {
    let mut by_report: BTreeMap<PathBuf, &PathBuf> = BTreeMap::new();

    for file in files {
        let relative = file
            .strip_prefix(input)
            .ok()
            .filter(|r| !r.as_os_str().is_empty())
            .or_else(|| file.file_name().map(Path::new))
            .unwrap_or(file.as_path());

        let name: String = relative
            .to_string_lossy()
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | '.') { '_' } else { c })
            .collect();
        let report = output_dir.join(format!("{}_dose.json", name));

        if let Some(previous) = by_report.insert(report.clone(), file) {
            return Err(DoseError::InvalidArgument(format!(
                "'{}' and '{}' would both write {}",
                previous.display(),
                file.display(),
                report.display()
            )));
        }
    }

    Ok(by_report
        .into_iter()
        .map(|(report, file)| (file.clone(), report))
        .collect())
}

/// 处理单个注量谱
fn process_file(
    input: &PathBuf,
    setup: &Setup,
    report_path: Option<&Path>,
    overwrite: bool,
) -> ProcessResult<SummaryRow> {
    if let Some(path) = report_path {
        if path.exists() && !overwrite {
            return ProcessResult::Skipped(format!("Report exists, skipping: {}", path.display()));
        }
    }

    match evaluate(input, setup, report_path) {
        Ok(row) => ProcessResult::Success(row),
        Err(e) => ProcessResult::Failed(input.display().to_string(), e.to_string()),
    }
}

fn evaluate(input: &Path, setup: &Setup, report_path: Option<&Path>) -> Result<SummaryRow> {
    let spectrum = parsers::load_spectrum(input)?;
    let result = setup.engine().calculate(&setup.params, &spectrum, setup.kerma)?;

    if let Some(path) = report_path {
        let report = Report {
            spectrum: input.display().to_string(),
            exposure: &setup.params,
            result: &result,
        };
        calc::write_report(&report, path)?;
    }

    Ok(SummaryRow::new(input, &result))
}

/// 写出汇总 CSV
fn write_summary(rows: &[SummaryRow], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| DoseError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}
