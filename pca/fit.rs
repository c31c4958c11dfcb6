//! # Compositional PCA
//!
//! Glues the log-ratio transform, the correlation matrix and the Jacobi eigensolver into a
//! single pass that produces sample scores and scaled loadings.
//!
//! Centering and correlation are kept separate: scores are projections of the
//! mean-centered CLR rows, while the eigenvectors come from the correlation matrix of the
//! CLR columns (which normalizes by standard deviation on its own). Loadings are the
//! eigenvector coefficients scaled by `sqrt(eigenvalue)`, which is the quantity the
//! association classifier interprets.
//!
//! Degenerate input (fewer than two columns, fewer than two usable rows) never fails; it
//! yields [`FullPcaResult::empty`].

use crate::eigen::symmetric_eigen;
use crate::logratio::clr_transform;
use crate::progress::{NoopPcaProgress, PcaProgressObserver, PcaStage};
use crate::stats::pearson_matrix;
use crate::types::{CompositionRow, ElementMap, FullPcaResult, SortedLoading, ZeroStrategy};
use itertools::Itertools;
use ndarray::{Array1, Axis, s};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Eigenvalues at or below this are treated as zero when deciding how many components
/// carry information.
pub const EIGENVALUE_EPSILON: f64 = 1.0e-10;

pub const DEFAULT_COMPONENTS: usize = 8;

/// Everything needed to run one PCA besides the data itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcaOptions {
    pub components: usize,
    pub zero_strategy: ZeroStrategy,
    /// Per-column detection limits, consulted by [`ZeroStrategy::HalfDetectionLimit`].
    pub detection_limits: HashMap<String, f64>,
}

impl Default for PcaOptions {
    fn default() -> Self {
        Self {
            components: DEFAULT_COMPONENTS,
            zero_strategy: ZeroStrategy::default(),
            detection_limits: HashMap::new(),
        }
    }
}

/// Runs a PCA on `columns` of `rows`, keeping at most `n_components` components.
pub fn run_pca(
    rows: &[CompositionRow],
    columns: &[String],
    n_components: usize,
    zero_strategy: ZeroStrategy,
) -> FullPcaResult {
    let options = PcaOptions {
        components: n_components,
        zero_strategy,
        detection_limits: HashMap::new(),
    };
    run_pca_with_progress(rows, columns, &options, &mut NoopPcaProgress)
}

/// Runs a PCA and reports stage transitions to `progress`.
pub fn run_pca_with_progress<P>(
    rows: &[CompositionRow],
    columns: &[String],
    options: &PcaOptions,
    progress: &mut P,
) -> FullPcaResult
where
    P: PcaProgressObserver + ?Sized,
{
    let p = columns.len();
    if p < 2 {
        log::warn!("PCA needs at least 2 columns, got {p}; returning an empty result");
        return FullPcaResult::empty(columns);
    }

    // --- 1. Log-ratio transform ---
    progress.on_stage_start(PcaStage::LogRatio, rows.len());
    let clr = clr_transform(
        rows,
        columns,
        options.zero_strategy,
        &options.detection_limits,
    );
    progress.on_stage_finish(PcaStage::LogRatio);

    let n = clr.n_samples();
    if n < 2 {
        log::warn!("PCA needs at least 2 usable samples, got {n}; returning an empty result");
        return FullPcaResult::empty(columns);
    }

    // --- 2. Centering and correlation ---
    progress.on_stage_start(PcaStage::Correlation, p * p);
    let means = clr
        .values
        .mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(p));
    let centered = &clr.values - &means;
    let correlation = pearson_matrix(clr.values.view());
    progress.on_stage_finish(PcaStage::Correlation);

    // --- 3. Eigendecomposition ---
    progress.on_stage_start(PcaStage::Eigen, p);
    let eigen = match symmetric_eigen(correlation.view()) {
        Ok(eigen) => eigen,
        Err(err) => {
            log::error!("Eigendecomposition of the correlation matrix failed: {err}");
            return FullPcaResult::empty(columns);
        }
    };
    progress.on_stage_finish(PcaStage::Eigen);

    let total_variance: f64 = eigen.eigenvalues.iter().map(|l| l.max(0.0)).sum();
    let informative = eigen
        .eigenvalues
        .iter()
        .filter(|l| **l > EIGENVALUE_EPSILON)
        .count();
    let k = options.components.min(p).min(informative);

    let eigenvalues = eigen.eigenvalues.slice(s![..k]).to_owned();
    let variance_explained = eigenvalues.mapv(|l| {
        if total_variance > 0.0 {
            l.max(0.0) / total_variance * 100.0
        } else {
            0.0
        }
    });
    let mut running = 0.0;
    let cumulative_variance = variance_explained.mapv(|v| {
        running += v;
        running
    });

    // --- 4. Projection ---
    progress.on_stage_start(PcaStage::Projection, n);
    let vectors = eigen.eigenvectors.slice(s![.., ..k]);
    let scores = centered.dot(&vectors);
    let scale = eigenvalues.mapv(|l| l.max(0.0).sqrt());
    let loadings = &vectors * &scale;
    progress.on_stage_finish(PcaStage::Projection);

    log::info!(
        "PCA on {n} samples x {p} columns kept {k} components ({:.1}% of variance)",
        cumulative_variance.iter().last().copied().unwrap_or(0.0)
    );

    FullPcaResult {
        scores,
        loadings,
        eigenvalues,
        variance_explained,
        cumulative_variance,
        columns: columns.to_vec(),
        means,
        n_samples: n,
        zeros_replaced: clr.zeros_replaced,
        row_indices: clr.kept_rows,
    }
}

/// Loadings of `component` (0-based) labelled by element symbol and sorted descending.
///
/// Columns absent from `element_map` keep their column name as the label. Returns an
/// empty list for an out-of-range component.
pub fn sorted_loadings(
    result: &FullPcaResult,
    component: usize,
    element_map: &ElementMap,
) -> Vec<SortedLoading> {
    if component >= result.loadings.ncols() {
        return Vec::new();
    }
    result
        .columns
        .iter()
        .zip(result.loadings.column(component).iter())
        .map(|(column, &loading)| SortedLoading {
            element: element_map
                .get(column)
                .cloned()
                .unwrap_or_else(|| column.clone()),
            loading,
        })
        .sorted_by(|a, b| b.loading.total_cmp(&a.loading))
        .collect()
}
