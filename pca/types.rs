//! Shared data model for the compositional PCA pipeline.
//!
//! The types here sit at the boundary with the host application: assay rows come in as
//! loose `column -> value` maps, and PCA results go out as dense `ndarray` matrices that
//! serialize cleanly to TOML.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One sample: column name to concentration. `None`, NaN and absent keys are missing.
///
/// Negative values are accepted and read as a below-detection encoding, so `-5.0`
/// means "less than 5".
pub type CompositionRow = HashMap<String, Option<f64>>;

/// Externally resolved column name to element symbol map (e.g. `"Cu_ppm" -> "Cu"`).
pub type ElementMap = HashMap<String, String>;

/// Policy for replacing zero, negative and missing values before taking logarithms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "value")]
pub enum ZeroStrategy {
    /// Half of the smallest positive value observed in the column.
    HalfMin,
    /// Half of the column's detection limit, falling back to half-min when none is known.
    HalfDetectionLimit,
    /// 0.65 times the smallest positive value observed in the column.
    SmallConstant,
    /// Substitute 0.65 x min positive and shrink the observed parts of the row to keep
    /// the row total fixed.
    MultiplicativeReplacement,
    /// A fixed user-supplied replacement value.
    Constant(f64),
}

impl Default for ZeroStrategy {
    fn default() -> Self {
        Self::HalfMin
    }
}

impl fmt::Display for ZeroStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HalfMin => f.write_str("half-min"),
            Self::HalfDetectionLimit => f.write_str("half-detection-limit"),
            Self::SmallConstant => f.write_str("small-constant"),
            Self::MultiplicativeReplacement => f.write_str("multiplicative-replacement"),
            Self::Constant(value) => write!(f, "constant({value})"),
        }
    }
}

/// The complete output of one PCA run.
///
/// `scores` has shape `[n_samples, k]` and `loadings` has shape `[p, k]`, where `k` is
/// the number of retained components. Loadings are eigenvector coefficients scaled by
/// `sqrt(eigenvalue)`, so their magnitude can exceed 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullPcaResult {
    pub scores: Array2<f64>,
    pub loadings: Array2<f64>,
    pub eigenvalues: Array1<f64>,
    pub variance_explained: Array1<f64>,
    pub cumulative_variance: Array1<f64>,
    pub columns: Vec<String>,
    pub means: Array1<f64>,
    pub n_samples: usize,
    pub zeros_replaced: usize,
    /// Input row index of each score row; rows dropped by the transform are absent.
    pub row_indices: Vec<usize>,
}

impl FullPcaResult {
    /// A well-formed result with no samples and no components.
    pub fn empty(columns: &[String]) -> Self {
        Self {
            scores: Array2::zeros((0, 0)),
            loadings: Array2::zeros((columns.len(), 0)),
            eigenvalues: Array1::zeros(0),
            variance_explained: Array1::zeros(0),
            cumulative_variance: Array1::zeros(0),
            columns: columns.to_vec(),
            means: Array1::zeros(columns.len()),
            n_samples: 0,
            zeros_replaced: 0,
            row_indices: Vec::new(),
        }
    }

    pub fn n_components(&self) -> usize {
        self.eigenvalues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_samples == 0 || self.n_components() == 0
    }
}

/// One variable's loading on one component, labelled by element symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortedLoading {
    pub element: String,
    pub loading: f64,
}
