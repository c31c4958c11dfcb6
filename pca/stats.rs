//! Descriptive statistics shared by the PCA pipeline and the command line surface.
//!
//! Summary statistics follow the usual data-frame conventions: missing values are skipped,
//! standard deviations use `n - 1`, and quantiles interpolate linearly between order
//! statistics. Correlations that are undefined (a constant column, fewer than two paired
//! observations) are reported as 0 rather than NaN.

use crate::types::CompositionRow;
use itertools::Itertools;
use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Location and spread of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
    pub p10: Option<f64>,
    pub p25: Option<f64>,
    pub p75: Option<f64>,
    pub p90: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    Pearson,
    Spearman,
}

/// A labelled square correlation matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub matrix: Array2<f64>,
}

/// Finite values of `column` across `rows`, in row order.
pub fn column_values(rows: &[CompositionRow], column: &str) -> Vec<f64> {
    rows.iter()
        .filter_map(|row| row.get(column).copied().flatten())
        .filter(|v| v.is_finite())
        .collect()
}

pub fn summarize_column(values: &[f64]) -> ColumnSummary {
    let sorted: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .sorted_by(f64::total_cmp)
        .collect();
    let count = sorted.len();
    if count == 0 {
        return ColumnSummary {
            count,
            min: None,
            max: None,
            mean: None,
            median: None,
            std: None,
            p10: None,
            p25: None,
            p75: None,
            p90: None,
        };
    }

    let mean = sorted.iter().sum::<f64>() / count as f64;
    let std = (count > 1).then(|| {
        let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    });

    ColumnSummary {
        count,
        min: sorted.first().copied(),
        max: sorted.last().copied(),
        mean: Some(mean),
        median: Some(quantile_sorted(&sorted, 0.5)),
        std,
        p10: Some(quantile_sorted(&sorted, 0.10)),
        p25: Some(quantile_sorted(&sorted, 0.25)),
        p75: Some(quantile_sorted(&sorted, 0.75)),
        p90: Some(quantile_sorted(&sorted, 0.90)),
    }
}

/// Linear-interpolation quantile of already sorted, non-empty data.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let position = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = position.floor() as usize;
            let upper = position.ceil() as usize;
            let fraction = position - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
        }
    }
}

/// Pearson correlation of two equally long series; 0 when either has no variance.
pub fn pearson(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let mean_x = x.iter().take(n).sum::<f64>() / n as f64;
    let mean_y = y.iter().take(n).sum::<f64>() / n as f64;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if negligible(sxx, mean_x, n) || negligible(syy, mean_y, n) {
        return 0.0;
    }
    let denominator = (sxx * syy).sqrt();
    if !denominator.is_finite() {
        return 0.0;
    }
    (sxy / denominator).clamp(-1.0, 1.0)
}

/// Pearson correlation matrix of the columns of `data`.
///
/// Constant columns correlate 0 with everything, including themselves, so they
/// contribute nothing to a subsequent eigendecomposition.
pub fn pearson_matrix(data: ArrayView2<f64>) -> Array2<f64> {
    let p = data.ncols();
    let mut out = Array2::zeros((p, p));
    for i in 0..p {
        for j in i..p {
            let r = if i == j {
                if column_variance(data.column(i)) > 0.0 { 1.0 } else { 0.0 }
            } else {
                pearson(data.column(i), data.column(j))
            };
            out[[i, j]] = r;
            out[[j, i]] = r;
        }
    }
    out
}

/// Correlation matrix over `columns` using pairwise-complete observations.
pub fn correlation_matrix(
    rows: &[CompositionRow],
    columns: &[String],
    method: CorrelationMethod,
) -> CorrelationMatrix {
    let p = columns.len();
    let cells: Vec<Vec<Option<f64>>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.get(c).copied().flatten().filter(|v| v.is_finite()))
                .collect()
        })
        .collect();

    let mut matrix = Array2::zeros((p, p));
    for i in 0..p {
        for j in i..p {
            let (x, y): (Vec<f64>, Vec<f64>) = cells
                .iter()
                .filter_map(|r| Some((r[i]?, r[j]?)))
                .unzip();
            let (x, y) = match method {
                CorrelationMethod::Pearson => (x, y),
                CorrelationMethod::Spearman => (average_ranks(&x), average_ranks(&y)),
            };
            let r = pearson(ArrayView1::from(x.as_slice()), ArrayView1::from(y.as_slice()));
            let r = if i == j && r > 0.0 { 1.0 } else { r };
            matrix[[i, j]] = r;
            matrix[[j, i]] = r;
        }
    }

    CorrelationMatrix {
        columns: columns.to_vec(),
        matrix,
    }
}

/// 1-based ranks with ties sharing their average rank.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let order: Vec<usize> = (0..values.len())
        .sorted_by(|&a, &b| values[a].total_cmp(&values[b]))
        .collect();
    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let shared = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = shared;
        }
        start = end;
    }
    ranks
}

fn column_variance(column: ArrayView1<f64>) -> f64 {
    let n = column.len();
    if n < 2 {
        return 0.0;
    }
    let mean = column.sum() / n as f64;
    let ss: f64 = column.iter().map(|v| (v - mean).powi(2)).sum();
    if negligible(ss, mean, n) {
        0.0
    } else {
        ss / (n - 1) as f64
    }
}

/// True when a sum of squared deviations is indistinguishable from rounding noise.
fn negligible(sum_sq: f64, mean: f64, n: usize) -> bool {
    let noise = 1.0e3 * f64::EPSILON * mean.abs().max(1.0);
    sum_sq <= n as f64 * noise * noise
}

/// Inverse of the standard normal CDF (Acklam's rational approximation,
/// relative error below 1.15e-9).
///
/// Returns -inf / +inf at 0 / 1 and NaN outside `[0, 1]`.
pub fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e1,
        2.209460984245205e2,
        -2.759285104469687e2,
        1.383577518672690e2,
        -3.066479806614716e1,
        2.506628277459239e0,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e1,
        1.615858368580409e2,
        -1.556989798598866e2,
        6.680131188771972e1,
        -1.328068155288572e1,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-3,
        -3.223964580411365e-1,
        -2.400758277161838e0,
        -2.549732539343734e0,
        4.374664141464968e0,
        2.938163982698783e0,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-3,
        3.224671290700398e-1,
        2.445134137142996e0,
        3.754408661907416e0,
    ];
    const P_LOW: f64 = 0.02425;
    const P_HIGH: f64 = 1.0 - P_LOW;

    if !(0.0..=1.0).contains(&p) || p.is_nan() {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= P_HIGH {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}
