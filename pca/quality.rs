//! Below-detection-limit screening for candidate PCA variables.
//!
//! An element whose censored population reaches further than one standard deviation into
//! the lower tail of a normal probability plot is usually safe to log-transform. When the
//! censored share is larger, the flat pile of identical replacement values produces
//! spurious correlations, so the element is flagged. The flag is a recommendation for the
//! caller's variable selection and is never enforced by the PCA itself.

use crate::stats::{column_values, inverse_normal_cdf};
use crate::types::CompositionRow;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Elements are acceptable when their BLD n-score lies below this value.
pub const ACCEPTABLE_N_SCORE: f64 = -1.0;

/// Proportions are clamped to `[P_FLOOR, 1 - P_FLOOR]` so the n-score stays finite.
const P_FLOOR: f64 = 1.0e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementQuality {
    pub bld_n_score: f64,
    pub percent_bld: f64,
    pub is_acceptable: bool,
}

/// Quality of a named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnQuality {
    pub column: String,
    pub n_values: usize,
    #[serde(flatten)]
    pub quality: ElementQuality,
}

/// Scores the BLD censoring of one column's values.
///
/// Without a `detection_limit`, every value equal to the observed minimum is treated as
/// censored. Non-positive values are always censored. Missing (non-finite) values are
/// ignored.
pub fn assess_element(values: &[f64], detection_limit: Option<f64>) -> ElementQuality {
    let sorted: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .sorted_by(f64::total_cmp)
        .collect();
    let n = sorted.len();
    if n == 0 {
        return ElementQuality {
            bld_n_score: 0.0,
            percent_bld: 0.0,
            is_acceptable: false,
        };
    }

    let limit = detection_limit
        .filter(|dl| dl.is_finite())
        .unwrap_or(sorted[0]);
    let count_bld = sorted.iter().filter(|v| **v <= 0.0 || **v <= limit).count();

    let proportion = count_bld as f64 / n as f64;
    let bld_n_score = inverse_normal_cdf(proportion.clamp(P_FLOOR, 1.0 - P_FLOOR));

    ElementQuality {
        bld_n_score,
        percent_bld: proportion * 100.0,
        is_acceptable: bld_n_score < ACCEPTABLE_N_SCORE,
    }
}

/// Assesses every column in `columns`, using per-column limits where provided.
pub fn assess_columns(
    rows: &[CompositionRow],
    columns: &[String],
    detection_limits: &HashMap<String, f64>,
) -> Vec<ColumnQuality> {
    columns
        .iter()
        .map(|column| {
            let values = column_values(rows, column);
            let quality = assess_element(&values, detection_limits.get(column).copied());
            if !quality.is_acceptable {
                log::debug!(
                    "Column '{column}' has {:.1}% BLD (n-score {:.2}); not recommended for PCA",
                    quality.percent_bld,
                    quality.bld_n_score
                );
            }
            ColumnQuality {
                column: column.clone(),
                n_values: values.len(),
                quality,
            }
        })
        .collect()
}

/// The subset of `columns` whose quality is acceptable, in input order.
pub fn recommended_columns(qualities: &[ColumnQuality]) -> Vec<String> {
    qualities
        .iter()
        .filter(|q| q.quality.is_acceptable)
        .map(|q| q.column.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn minimum_value_counts_as_censored_without_limit() {
        // 2 of 100 values sit at the minimum: p = 0.02, n-score ~ -2.05.
        let mut values: Vec<f64> = (1..=98).map(|i| 1.0 + i as f64).collect();
        values.extend([0.5, 0.5]);
        let q = assess_element(&values, None);
        assert_abs_diff_eq!(q.percent_bld, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(q.bld_n_score, -2.053748911, epsilon = 1e-6);
        assert!(q.is_acceptable);
    }

    #[test]
    fn heavily_censored_column_is_rejected() {
        let mut values = vec![0.0; 40];
        values.extend((1..=60).map(|i| i as f64));
        let q = assess_element(&values, None);
        assert_abs_diff_eq!(q.percent_bld, 40.0, epsilon = 1e-12);
        assert!(q.bld_n_score > -1.0);
        assert!(!q.is_acceptable);
    }

    #[test]
    fn explicit_limit_counts_values_at_or_below_it() {
        let values = [0.5, 1.0, 1.0, 2.0, 5.0, 8.0, 9.0, 12.0, 20.0, 30.0];
        let q = assess_element(&values, Some(1.0));
        assert_abs_diff_eq!(q.percent_bld, 30.0, epsilon = 1e-12);
        assert!(!q.is_acceptable);
    }

    #[test]
    fn uncensored_and_fully_censored_scores_stay_finite() {
        let clean = assess_element(&[3.0, 4.0, 5.0], Some(0.1));
        assert_eq!(clean.percent_bld, 0.0);
        assert!(clean.bld_n_score.is_finite());
        assert!(clean.is_acceptable);

        let censored = assess_element(&[-1.0, -1.0, -1.0], None);
        assert_eq!(censored.percent_bld, 100.0);
        assert!(censored.bld_n_score.is_finite());
        assert!(!censored.is_acceptable);
    }

    #[test]
    fn empty_column_is_not_acceptable() {
        let q = assess_element(&[f64::NAN], None);
        assert_eq!(q.percent_bld, 0.0);
        assert!(!q.is_acceptable);
    }

    #[test]
    fn recommended_columns_filters_in_order() {
        let rows: Vec<CompositionRow> = (0..50)
            .map(|i| {
                CompositionRow::from([
                    ("Cu".to_string(), Some(10.0 + i as f64)),
                    ("Au".to_string(), Some(if i < 30 { 0.001 } else { i as f64 })),
                    ("Zn".to_string(), Some(5.0 + 2.0 * i as f64)),
                ])
            })
            .collect();
        let columns = vec!["Cu".to_string(), "Au".to_string(), "Zn".to_string()];
        let qualities = assess_columns(&rows, &columns, &HashMap::new());
        assert_eq!(qualities.len(), 3);
        assert_eq!(qualities[1].n_values, 50);
        assert_eq!(recommended_columns(&qualities), vec!["Cu".to_string(), "Zn".to_string()]);
    }
}
