use approx::assert_abs_diff_eq;
use geosig::eigen::{JacobiOptions, symmetric_eigen, symmetric_eigen_with};
use geosig::stats::pearson_matrix;
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_correlation(n_samples: usize, n_vars: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let latent: Vec<f64> = (0..n_samples).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let data = Array2::from_shape_fn((n_samples, n_vars), |(i, j)| {
        let weight = if j % 2 == 0 { 1.0 } else { -0.5 };
        weight * latent[i] + rng.gen_range(-0.5..0.5)
    });
    pearson_matrix(data.view())
}

#[test]
fn correlation_spectrum_sums_to_dimension() {
    for (n_vars, seed) in [(3, 1), (6, 2), (12, 3), (20, 4)] {
        let corr = random_correlation(200, n_vars, seed);
        let eig = symmetric_eigen(corr.view()).unwrap();
        assert!(eig.converged);
        assert_abs_diff_eq!(eig.eigenvalues.sum(), n_vars as f64, epsilon = 1e-8);
        assert!(eig.eigenvalues.iter().all(|l| *l > -1e-10));
        for pair in eig.eigenvalues.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }
}

#[test]
fn eigenvectors_are_orthonormal_and_reconstruct_the_matrix() {
    let corr = random_correlation(150, 9, 42);
    let eig = symmetric_eigen(corr.view()).unwrap();
    let v = &eig.eigenvectors;

    let gram = v.t().dot(v);
    for i in 0..9 {
        for j in 0..9 {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_abs_diff_eq!(gram[[i, j]], expected, epsilon = 1e-9);
        }
    }

    let lambda = Array2::from_diag(&eig.eigenvalues);
    let rebuilt = v.dot(&lambda).dot(&v.t());
    for (a, b) in rebuilt.iter().zip(corr.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-9);
    }
}

#[test]
fn largest_component_of_each_eigenvector_is_positive() {
    let corr = random_correlation(100, 7, 8);
    let eig = symmetric_eigen(corr.view()).unwrap();
    for column in eig.eigenvectors.axis_iter(Axis(1)) {
        let largest = column
            .iter()
            .copied()
            .max_by(|a, b| a.abs().total_cmp(&b.abs()))
            .unwrap();
        assert!(largest > 0.0);
    }
}

#[test]
fn tiny_budget_still_returns_a_decomposition() {
    let corr = random_correlation(80, 10, 5);
    let options = JacobiOptions {
        max_rotations: Some(3),
        ..JacobiOptions::default()
    };
    let eig = symmetric_eigen_with(corr.view(), &options).unwrap();
    assert!(!eig.converged);
    assert_eq!(eig.rotations, 3);
    assert_eq!(eig.eigenvalues.len(), 10);
    assert_abs_diff_eq!(eig.eigenvalues.sum(), 10.0, epsilon = 1e-8);
}
