//! Adaptive histogram over one numeric column.
//!
//! The bin count scales with the value range (one bin per 15 units, kept
//! between 4 and 6) and bins are whole-number wide. A trailing bin narrower
//! than half a bin width is folded into its predecessor.
//!
//! Bounds sit on the finest decimal grid the data uses: integer data gets
//! `0-14, 15-29`, one-decimal data gets `0.5-1.4, 1.5-2.4`. Every value then
//! lies inside exactly one bin's closed `[min, max]`.

use log::debug;
use serde::Serialize;

use crate::{
    error::AnalysisError,
    transform::{AGE_FIELD, TransformedRecord},
    value::format_number,
};

const UNITS_PER_BIN: f64 = 15.0;
const MIN_BINS: f64 = 4.0;
const MAX_BINS: f64 = 6.0;
const FALLBACK_BIN_SIZE: f64 = 10.0;

/// Finest grid used for bounds; values with more decimals are still counted.
const MAX_DECIMALS: u32 = 6;
/// Largest grid index that `f64` still represents exactly.
const EXACT_UNITS_LIMIT: f64 = 9_007_199_254_740_992.0;

pub const PALETTE: &[&str] = &[
    "#00C49F", "#FFBB28", "#FF8042", "#0088FE", "#8884D8", "#82CA9D",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    /// Share of all records, not only of those holding a number.
    pub percentage: f64,
    pub color: &'static str,
}

/// Number of bins for a value range.
pub fn bin_count(range: f64) -> usize {
    let raw = (range / UNITS_PER_BIN).ceil();
    if raw.is_nan() || raw == 0.0 {
        return MIN_BINS as usize;
    }
    raw.clamp(MIN_BINS, MAX_BINS) as usize
}

/// Width of each bin, in whole units.
pub fn bin_size(range: f64, bins: usize) -> f64 {
    let size = (range / bins as f64).ceil();
    if size.is_nan() || size == 0.0 {
        FALLBACK_BIN_SIZE
    } else {
        size
    }
}

/// Digits after the decimal point in the shortest rendering of `value`.
pub fn decimal_places(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    let text = value.to_string();
    text.split_once('.')
        .map_or(0, |(_, fraction)| fraction.len() as u32)
        .min(MAX_DECIMALS)
}

/// Lays out empty bins covering `[min, max]` with the given width, on the
/// decimal grid of `min` and `max`.
pub fn build_bins(min: f64, max: f64, size: f64) -> Vec<HistogramBin> {
    let decimals = decimal_places(min).max(decimal_places(max));
    build_bins_on_grid(min, max, size, decimals)
}

/// Lays out empty bins covering `[min, max]`, with bounds on a grid of
/// `10^-decimals`. Adjacent bins are one grid step apart.
pub fn build_bins_on_grid(min: f64, max: f64, size: f64, decimals: u32) -> Vec<HistogramBin> {
    let decimals = coarsen_for_magnitude(min.abs().max(max.abs()), decimals);
    let scale = 10f64.powi(decimals as i32);
    let low = (min * scale).round();
    let high = (max * scale).round();
    let width = size * scale;

    let mut bins: Vec<HistogramBin> = Vec::new();
    let mut step = 0.0_f64;
    loop {
        let lower = low + step * width;
        if lower > high {
            break;
        }
        // A short tail is absorbed by the previous bin, which ends at `max`.
        if !bins.is_empty() && high - lower < width / 2.0 {
            break;
        }
        let upper = high.min(lower + width - 1.0);
        bins.push(HistogramBin {
            label: String::new(),
            min: lower / scale,
            max: upper / scale,
            count: 0,
            percentage: 0.0,
            color: PALETTE[bins.len() % PALETTE.len()],
        });
        let next = low + (step + 1.0) * width;
        if next <= lower {
            break;
        }
        step += 1.0;
    }

    if let Some(first) = bins.first_mut() {
        first.min = min;
    }
    if let Some(last) = bins.last_mut() {
        last.max = max;
    }
    for bin in &mut bins {
        bin.label = range_label(bin.min, bin.max, decimals);
    }
    bins
}

/// Drops grid digits until the largest bound fits in exact `f64` integers.
fn coarsen_for_magnitude(magnitude: f64, decimals: u32) -> u32 {
    let mut decimals = decimals;
    while decimals > 0 && magnitude * 10f64.powi(decimals as i32) >= EXACT_UNITS_LIMIT {
        decimals -= 1;
    }
    decimals
}

fn range_label(min: f64, max: f64, decimals: u32) -> String {
    format!(
        "{}-{}",
        format_bound(min, decimals),
        format_bound(max, decimals)
    )
}

fn format_bound(value: f64, decimals: u32) -> String {
    if decimals == 0 {
        return format_number(value);
    }
    let fixed = format!("{value:.prec$}", prec = decimals as usize);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Builds the distribution of `column` across `records`.
///
/// Records without a finite number for the column are left out of the bins
/// but still count toward the percentage denominator.
pub fn analyze(records: &[TransformedRecord], column: &str) -> Vec<HistogramBin> {
    let values: Vec<f64> = records
        .iter()
        .filter_map(|record| record.metric(column))
        .filter(|value| value.is_finite())
        .collect();
    if values.is_empty() {
        debug!("Column '{column}' has no numeric values; distribution is empty");
        return Vec::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let decimals = values.iter().copied().map(decimal_places).max().unwrap_or(0);
    let range = max - min;
    let bins_wanted = bin_count(range);
    let size = bin_size(range, bins_wanted);
    let mut bins = build_bins_on_grid(min, max, size, decimals);
    debug!(
        "Column '{column}': range {range} over {} bin(s) of width {size}",
        bins.len()
    );

    for value in &values {
        if let Some(bin) = bins.iter_mut().rev().find(|bin| bin.min <= *value) {
            bin.count += 1;
        }
    }
    let total = records.len() as f64;
    for bin in &mut bins {
        bin.percentage = bin.count as f64 / total * 100.0;
    }
    bins
}

/// Report column used when the caller does not pick one.
pub fn default_column(numeric_columns: &[String]) -> Result<String, AnalysisError> {
    if numeric_columns.iter().any(|c| c == AGE_FIELD) {
        return Ok(AGE_FIELD.to_string());
    }
    numeric_columns
        .first()
        .cloned()
        .ok_or(AnalysisError::NoNumericColumns)
}

/// Checks that a caller-selected column is one of the numeric columns.
pub fn ensure_numeric_column(
    column: &str,
    numeric_columns: &[String],
) -> Result<(), AnalysisError> {
    if numeric_columns.iter().any(|c| c == column) {
        return Ok(());
    }
    if numeric_columns.is_empty() {
        return Err(AnalysisError::NoNumericColumns);
    }
    Err(AnalysisError::NotNumeric {
        column: column.to_string(),
        available: numeric_columns.join(", "),
    })
}
