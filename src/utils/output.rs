//! # 美化输出工具
//!
//! 终端消息统一使用 `[OK]`、`[*]`、`[WARN]`、`[ERR]` 前缀；
//! 警告与错误写到 stderr，这样 `--format json` 时 stdout 只有 JSON。
//!
//! ## 依赖关系
//! - 被所有 `commands/` 模块使用
//! - 使用 `colored` crate

use crate::models::Diagnostic;

use colored::Colorize;

/// 打印成功消息
pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

/// 打印错误消息
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERR]".red().bold(), msg);
}

/// 打印警告消息
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "[WARN]".yellow().bold(), msg);
}

/// 打印信息消息
pub fn print_info(msg: &str) {
    println!("{} {}", "[*]".blue().bold(), msg);
}

/// 打印带说明的诊断标志
pub fn print_diagnostic(diagnostic: Diagnostic) {
    let hint = match diagnostic {
        Diagnostic::BsfFallback => "part of the spectrum lies outside the BSF grid; BSF = 1.0 used there",
        Diagnostic::NumericDegeneracy => "weighted fluence is zero; affected quantities use their fallback",
        Diagnostic::RootFindFailure => "at least one beam-quality metric could not be bracketed",
    };
    eprintln!(
        "{} {} {}",
        "[WARN]".yellow().bold(),
        diagnostic.to_string().yellow(),
        hint.dimmed()
    );
}

/// 可选数值的固定精度文本，缺失时为 "-"
pub fn format_optional(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "-".to_string())
}

/// 打印标题栏
pub fn print_header(title: &str) {
    let line = "═".repeat(64);
    println!("\n{}", line.cyan());
    println!("  {}", title.bold());
    println!("{}\n", line.cyan());
}

/// 打印分隔线
pub fn print_separator() {
    println!("{}", "─".repeat(64).dimmed());
}
