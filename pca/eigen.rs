//! Dense symmetric eigendecomposition by Jacobi rotations.
//!
//! Correlation matrices in this crate are small (one row per analysed element, rarely more
//! than a few dozen), so the classic Jacobi method is both fast enough and attractive for
//! its properties: every rotation is exactly orthogonal, so the accumulated eigenvector
//! matrix stays orthonormal even when the rotation budget runs out before convergence.

use itertools::Itertools;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use thiserror::Error;

/// Largest off-diagonal magnitude at which the matrix is treated as diagonal.
pub const JACOBI_TOLERANCE: f64 = 1.0e-12;

/// The rotation budget is `JACOBI_BUDGET_FACTOR * n^2`.
pub const JACOBI_BUDGET_FACTOR: usize = 50;

#[derive(Error, Debug, PartialEq)]
pub enum EigenError {
    #[error("Eigendecomposition requires a square matrix, but the input has shape {rows}x{cols}.")]
    NotSquare { rows: usize, cols: usize },

    #[error("Input matrix contains non-finite entries (NaN or Infinity).")]
    NonFinite,
}

/// Tuning knobs for [`symmetric_eigen_with`].
#[derive(Debug, Clone, Copy)]
pub struct JacobiOptions {
    pub tolerance: f64,
    /// Overrides the default `50 * n^2` rotation budget.
    pub max_rotations: Option<usize>,
}

impl Default for JacobiOptions {
    fn default() -> Self {
        Self {
            tolerance: JACOBI_TOLERANCE,
            max_rotations: None,
        }
    }
}

/// All eigenpairs of a symmetric matrix.
///
/// `eigenvalues` are sorted descending and eigenvector `c` is column `c` of
/// `eigenvectors`. Each eigenvector is sign-normalised so that its largest-magnitude
/// component is positive.
#[derive(Debug, Clone)]
pub struct EigenResult {
    pub eigenvalues: Array1<f64>,
    pub eigenvectors: Array2<f64>,
    pub rotations: usize,
    pub converged: bool,
}

impl EigenResult {
    pub fn eigenvector(&self, component: usize) -> ndarray::ArrayView1<'_, f64> {
        self.eigenvectors.column(component)
    }
}

/// Diagonalizes `matrix` with the default tolerance and rotation budget.
pub fn symmetric_eigen(matrix: ArrayView2<f64>) -> Result<EigenResult, EigenError> {
    symmetric_eigen_with(matrix, &JacobiOptions::default())
}

/// Diagonalizes `matrix` with explicit options.
///
/// Only the symmetric part `(A + A^T) / 2` is used. Hitting the rotation budget is not an
/// error: the best-effort decomposition is returned with `converged == false`.
pub fn symmetric_eigen_with(
    matrix: ArrayView2<f64>,
    options: &JacobiOptions,
) -> Result<EigenResult, EigenError> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(EigenError::NotSquare { rows, cols });
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(EigenError::NonFinite);
    }
    let n = rows;

    let mut a = (&matrix + &matrix.t()) * 0.5;
    let mut v = Array2::<f64>::eye(n);
    let budget = options
        .max_rotations
        .unwrap_or(JACOBI_BUDGET_FACTOR * n * n);

    let mut rotations = 0usize;
    let mut converged = n < 2;
    while !converged {
        let (p, q, off) = largest_off_diagonal(&a);
        if off < options.tolerance {
            converged = true;
            break;
        }
        if rotations >= budget {
            break;
        }
        rotate(&mut a, &mut v, p, q);
        rotations += 1;
    }

    if converged {
        log::trace!("Jacobi converged after {rotations} rotations (n = {n})");
    } else {
        log::warn!(
            "Jacobi eigensolver hit its budget of {budget} rotations before reaching \
             tolerance {:e}; returning best-effort result",
            options.tolerance
        );
    }

    let diagonal = a.diag().to_owned();
    let order = (0..n)
        .sorted_by(|&i, &j| diagonal[j].total_cmp(&diagonal[i]))
        .collect::<Vec<_>>();

    let eigenvalues = Array1::from_iter(order.iter().map(|&i| diagonal[i]));
    let mut eigenvectors = v.select(Axis(1), &order);
    for mut column in eigenvectors.columns_mut() {
        let pivot = column
            .iter()
            .copied()
            .fold(0.0_f64, |best, x| if x.abs() > best.abs() { x } else { best });
        if pivot < 0.0 {
            column.mapv_inplace(|x| -x);
        }
    }

    Ok(EigenResult {
        eigenvalues,
        eigenvectors,
        rotations,
        converged,
    })
}

/// Locates the largest-magnitude entry above the diagonal. Ties keep the first one found
/// in row-major order.
fn largest_off_diagonal(a: &Array2<f64>) -> (usize, usize, f64) {
    let n = a.nrows();
    let mut best = (0, 1, 0.0_f64);
    for i in 0..n {
        for j in (i + 1)..n {
            let magnitude = a[[i, j]].abs();
            if magnitude > best.2 {
                best = (i, j, magnitude);
            }
        }
    }
    best
}

/// Annihilates `a[p][q]` with one Givens rotation and accumulates it into `v`.
fn rotate(a: &mut Array2<f64>, v: &mut Array2<f64>, p: usize, q: usize) {
    let n = a.nrows();
    let apq = a[[p, q]];
    let app = a[[p, p]];
    let aqq = a[[q, q]];

    // tan of the rotation angle as the smaller root of t^2 + 2*theta*t - 1 = 0, which
    // avoids cancellation when apq is tiny relative to the diagonal gap.
    let theta = (aqq - app) / (2.0 * apq);
    let t = if theta.abs() > 1.0e150 {
        0.5 / theta
    } else {
        let sign = if theta >= 0.0 { 1.0 } else { -1.0 };
        sign / (theta.abs() + (theta * theta + 1.0).sqrt())
    };
    let c = 1.0 / (t * t + 1.0).sqrt();
    let s = t * c;

    a[[p, p]] = app - t * apq;
    a[[q, q]] = aqq + t * apq;
    a[[p, q]] = 0.0;
    a[[q, p]] = 0.0;

    for r in 0..n {
        if r != p && r != q {
            let arp = a[[r, p]];
            let arq = a[[r, q]];
            let new_rp = c * arp - s * arq;
            let new_rq = s * arp + c * arq;
            a[[r, p]] = new_rp;
            a[[p, r]] = new_rp;
            a[[r, q]] = new_rq;
            a[[q, r]] = new_rq;
        }
    }

    for r in 0..n {
        let vrp = v[[r, p]];
        let vrq = v[[r, q]];
        v[[r, p]] = c * vrp - s * vrq;
        v[[r, q]] = s * vrp + c * vrq;
    }
}
