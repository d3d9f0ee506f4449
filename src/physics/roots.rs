//! # 单调函数求根
//!
//! "先扩展括区、再二分" 的求根策略，供 HVL 与有效能量共用。
//!
//! ## 算法
//! 1. 从初始上界出发按固定倍率扩展，直到函数在上界处变号；
//!    超过工程上限仍未变号即失败，并报告尝试过的区间
//! 2. 在括区内二分，直到区间宽度小于相对容差或达到迭代上限
//!
//! ## 依赖关系
//! - 被 `physics/engine.rs` 调用
//! - 无外部依赖

use crate::error::{DoseError, Result};

/// 求根参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootSettings {
    /// 相对容差（相对于根的大小）
    pub relative_tolerance: f64,
    /// 二分迭代上限
    pub max_iterations: usize,
    /// 括区扩展倍率
    pub growth: f64,
}

impl Default for RootSettings {
    fn default() -> Self {
        Self {
            relative_tolerance: 1e-10,
            max_iterations: 200,
            growth: 2.0,
        }
    }
}

/// 为递增函数 `f` 寻找满足 f(lower) < 0 <= f(upper) 的括区
///
/// 上界从 `start` 开始按 `settings.growth` 扩展，不超过 `limit`。
pub fn bracket_upward<F>(
    metric: &str,
    f: F,
    lower: f64,
    start: f64,
    limit: f64,
    settings: &RootSettings,
) -> Result<(f64, f64)>
where
    F: Fn(f64) -> f64,
{
    let f_lower = f(lower);
    if f_lower.is_nan() {
        return Err(failure(metric, lower, lower, "function is undefined at lower bound"));
    }
    if f_lower >= 0.0 {
        return Err(failure(metric, lower, lower, "root lies below the lower bound"));
    }

    let mut upper = start.max(lower).min(limit);
    loop {
        let f_upper = f(upper);
        if f_upper.is_nan() {
            return Err(failure(metric, lower, upper, "function is undefined in bracket"));
        }
        if f_upper >= 0.0 {
            return Ok((lower, upper));
        }
        if upper >= limit {
            return Err(failure(
                metric,
                lower,
                upper,
                "no sign change before the search limit",
            ));
        }
        upper = (upper * settings.growth).min(limit);
    }
}

/// 在括区 [lower, upper] 内二分求递增函数 `f` 的根
pub fn bisect<F>(f: F, mut lower: f64, mut upper: f64, settings: &RootSettings) -> f64
where
    F: Fn(f64) -> f64,
{
    for _ in 0..settings.max_iterations {
        let mid = 0.5 * (lower + upper);
        if upper - lower <= settings.relative_tolerance * mid.abs() {
            break;
        }
        if f(mid) < 0.0 {
            lower = mid;
        } else {
            upper = mid;
        }
    }
    0.5 * (lower + upper)
}

/// 括区 + 二分
pub fn solve_increasing<F>(
    metric: &str,
    f: F,
    lower: f64,
    start: f64,
    limit: f64,
    settings: &RootSettings,
) -> Result<f64>
where
    F: Fn(f64) -> f64,
{
    let (lo, hi) = bracket_upward(metric, &f, lower, start, limit, settings)?;
    Ok(bisect(&f, lo, hi, settings))
}

fn failure(metric: &str, lower: f64, upper: f64, reason: &str) -> DoseError {
    DoseError::RootFindFailure {
        metric: metric.to_string(),
        lower,
        upper,
        reason: reason.to_string(),
    }
}
