//! # Centered Log-Ratio Transform
//!
//! Maps closed compositional rows into unconstrained real space. Every non-positive or
//! missing cell is replaced according to a [`ZeroStrategy`] *before* any logarithm is
//! taken, so `ln` only ever sees strictly positive finite values. Closure is local to the
//! selected columns: the geometric mean of each row is taken over the active variable set,
//! not the whole original composition.

use crate::types::{CompositionRow, ZeroStrategy};
use ndarray::Array2;
use std::collections::HashMap;

/// Multiplier applied to a column's minimum positive value by the `0.65 x min` policies.
pub const SMALL_CONSTANT_FACTOR: f64 = 0.65;

/// Minimum number of usable values, counted after replacement, a row needs to survive
/// the transform.
pub const MIN_USABLE_PER_ROW: usize = 2;

/// The CLR matrix together with the bookkeeping needed downstream.
#[derive(Debug, Clone)]
pub struct LogRatioMatrix {
    /// Shape `[kept_rows.len(), columns.len()]`. Each row sums to ~0.
    pub values: Array2<f64>,
    pub columns: Vec<String>,
    /// Indices into the input rows that survived the transform, in input order.
    pub kept_rows: Vec<usize>,
    /// Number of cells replaced in the kept rows.
    pub zeros_replaced: usize,
}

impl LogRatioMatrix {
    pub fn n_samples(&self) -> usize {
        self.values.nrows()
    }
}

/// Applies zero replacement and the centered log-ratio transform to `rows`.
///
/// `detection_limits` is only consulted by [`ZeroStrategy::HalfDetectionLimit`].
/// Rows with a cell that cannot be resolved to a positive value, or with fewer than two
/// usable values once replacement is done, are dropped.
pub fn clr_transform(
    rows: &[CompositionRow],
    columns: &[String],
    strategy: ZeroStrategy,
    detection_limits: &HashMap<String, f64>,
) -> LogRatioMatrix {
    let p = columns.len();
    let raw: Vec<Vec<Option<f64>>> = rows
        .iter()
        .map(|row| columns.iter().map(|col| read_cell(row, col)).collect())
        .collect();

    let min_positive: Vec<Option<f64>> = (0..p)
        .map(|j| {
            raw.iter()
                .filter_map(|r| r[j])
                .filter(|v| *v > 0.0)
                .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.min(v))))
        })
        .collect();

    let limits: Vec<Option<f64>> = columns
        .iter()
        .map(|col| {
            detection_limits
                .get(col)
                .copied()
                .filter(|dl| dl.is_finite() && *dl > 0.0)
        })
        .collect();

    let mut flat = Vec::with_capacity(rows.len() * p);
    let mut kept_rows = Vec::with_capacity(rows.len());
    let mut zeros_replaced = 0usize;
    let mut dropped = 0usize;

    'rows: for (i, cells) in raw.iter().enumerate() {
        let mut values = Vec::with_capacity(p);
        let mut replaced = vec![false; p];
        for (j, cell) in cells.iter().enumerate() {
            match cell {
                Some(v) if *v > 0.0 => values.push(*v),
                _ => match replacement_value(strategy, *cell, min_positive[j], limits[j]) {
                    Some(r) => {
                        values.push(r);
                        replaced[j] = true;
                    }
                    None => {
                        dropped += 1;
                        continue 'rows;
                    }
                },
            }
        }

        if values.len() < MIN_USABLE_PER_ROW {
            dropped += 1;
            continue;
        }

        if strategy == ZeroStrategy::MultiplicativeReplacement {
            rescale_observed_parts(&mut values, &replaced);
        }

        let replaced_here = replaced.iter().filter(|r| **r).count();
        zeros_replaced += replaced_here;
        flat.extend(clr_row(&values));
        kept_rows.push(i);
    }

    if dropped > 0 {
        log::warn!(
            "Log-ratio transform dropped {dropped} of {} rows with unresolvable or too few values",
            rows.len()
        );
    }
    log::debug!(
        "CLR transform: {} rows kept over {p} columns, {zeros_replaced} cells replaced \
         ({strategy})",
        kept_rows.len()
    );

    let values = Array2::from_shape_vec((kept_rows.len(), p), flat)
        .unwrap_or_else(|_| Array2::zeros((0, p)));

    LogRatioMatrix {
        values,
        columns: columns.to_vec(),
        kept_rows,
        zeros_replaced,
    }
}

/// Centered log-ratio of one strictly positive row.
pub fn clr_row(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let logs: Vec<f64> = values.iter().map(|v| v.ln()).collect();
    let mean = logs.iter().sum::<f64>() / logs.len() as f64;
    logs.into_iter().map(|l| l - mean).collect()
}

/// Rescales a row of positive parts so it sums to 1.
pub fn close(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| v / total).collect()
}

/// Inverse of [`clr_row`] up to closure: exponentiate and renormalize.
pub fn inverse_clr(clr: &[f64]) -> Vec<f64> {
    // Shift by the max before exponentiating so large clr values cannot overflow.
    let max = clr.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return vec![0.0; clr.len()];
    }
    let exps: Vec<f64> = clr.iter().map(|v| (v - max).exp()).collect();
    close(&exps)
}

fn read_cell(row: &CompositionRow, column: &str) -> Option<f64> {
    row.get(column)
        .copied()
        .flatten()
        .filter(|v| v.is_finite())
}

fn replacement_value(
    strategy: ZeroStrategy,
    cell: Option<f64>,
    min_positive: Option<f64>,
    detection_limit: Option<f64>,
) -> Option<f64> {
    match strategy {
        ZeroStrategy::HalfMin => min_positive.map(|m| 0.5 * m),
        ZeroStrategy::SmallConstant | ZeroStrategy::MultiplicativeReplacement => {
            min_positive.map(|m| SMALL_CONSTANT_FACTOR * m)
        }
        ZeroStrategy::HalfDetectionLimit => {
            // A negative assay value encodes "< |v|", which is its own detection limit.
            let encoded = cell.filter(|v| *v < 0.0).map(f64::abs);
            encoded
                .or(detection_limit)
                .or(min_positive)
                .map(|dl| 0.5 * dl)
        }
        ZeroStrategy::Constant(value) => (value.is_finite() && value > 0.0).then_some(value),
    }
}

/// Shrinks the observed parts of a row so that substituted values do not inflate the
/// row total. Leaves the row untouched when the shrink factor would not be positive.
fn rescale_observed_parts(values: &mut [f64], replaced: &[bool]) {
    let substituted: f64 = values
        .iter()
        .zip(replaced)
        .filter(|(_, r)| **r)
        .map(|(v, _)| *v)
        .sum();
    if substituted == 0.0 {
        return;
    }
    let observed_total: f64 = values
        .iter()
        .zip(replaced)
        .filter(|(_, r)| !**r)
        .map(|(v, _)| *v)
        .sum();
    if observed_total <= 0.0 {
        return;
    }
    let factor = 1.0 - substituted / observed_total;
    if factor <= 0.0 {
        return;
    }
    for (v, r) in values.iter_mut().zip(replaced) {
        if !*r {
            *v *= factor;
        }
    }
}
