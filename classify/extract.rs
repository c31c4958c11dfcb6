use crate::classify::patterns::canonical_symbol;
use crate::types::SortedLoading;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Loadings at or below this magnitude are not part of an association.
pub const DEFAULT_LOADING_THRESHOLD: f64 = 0.3;

/// Which tail of a component an association was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssociationEnd {
    Positive,
    Negative,
}

impl fmt::Display for AssociationEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => f.write_str("positive"),
            Self::Negative => f.write_str("negative"),
        }
    }
}

/// The strongly loaded elements on one end of one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedAssociation {
    /// Signed loadings, in the order of the sorted loading list they came from.
    pub elements: Vec<SortedLoading>,
    pub end: AssociationEnd,
    pub average_loading_magnitude: f64,
    pub max_loading_magnitude: f64,
}

impl ExtractedAssociation {
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Signed loading of `symbol`, matched case-insensitively on the element symbol.
    /// When a symbol appears more than once, the strongest loading wins.
    pub fn loading_of(&self, symbol: &str) -> Option<f64> {
        let wanted = canonical_symbol(symbol);
        self.elements
            .iter()
            .filter(|e| canonical_symbol(&e.element) == wanted)
            .map(|e| e.loading)
            .max_by(|a, b| a.abs().total_cmp(&b.abs()))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.loading_of(symbol).is_some()
    }

    /// Elements joined strongest first, e.g. `"Pb-Zn-Cu"`.
    pub fn element_string(&self) -> String {
        self.elements
            .iter()
            .sorted_by(|a, b| b.loading.abs().total_cmp(&a.loading.abs()))
            .map(|e| e.element.as_str())
            .join("-")
    }
}

/// Pulls every element whose loading passes `threshold` on the requested `end`.
///
/// Positive keeps `loading > threshold`; negative keeps `loading < -threshold`. An empty
/// association is a normal outcome and reports zero magnitudes.
pub fn extract_association(
    sorted: &[SortedLoading],
    end: AssociationEnd,
    threshold: f64,
) -> ExtractedAssociation {
    let threshold = threshold.abs();
    let elements: Vec<SortedLoading> = sorted
        .iter()
        .filter(|l| match end {
            AssociationEnd::Positive => l.loading > threshold,
            AssociationEnd::Negative => l.loading < -threshold,
        })
        .cloned()
        .collect();

    let (average, max) = if elements.is_empty() {
        (0.0, 0.0)
    } else {
        let magnitudes = elements.iter().map(|e| e.loading.abs());
        let sum: f64 = magnitudes.clone().sum();
        let max = magnitudes.fold(0.0_f64, f64::max);
        (sum / elements.len() as f64, max)
    };

    ExtractedAssociation {
        elements,
        end,
        average_loading_magnitude: average,
        max_loading_magnitude: max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn loadings(pairs: &[(&str, f64)]) -> Vec<SortedLoading> {
        pairs
            .iter()
            .map(|(e, l)| SortedLoading {
                element: e.to_string(),
                loading: *l,
            })
            .collect()
    }

    #[test]
    fn positive_tail_above_threshold() {
        let sorted = loadings(&[("Pb", 0.8), ("Zn", 0.6), ("Cu", 0.4), ("Fe", 0.2), ("Al", -0.3)]);
        let assoc = extract_association(&sorted, AssociationEnd::Positive, 0.3);
        let names: Vec<&str> = assoc.elements.iter().map(|e| e.element.as_str()).collect();
        assert_eq!(names, vec!["Pb", "Zn", "Cu"]);
        assert_abs_diff_eq!(assoc.average_loading_magnitude, 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(assoc.max_loading_magnitude, 0.8);
        assert_eq!(assoc.element_string(), "Pb-Zn-Cu");
    }

    #[test]
    fn weak_loadings_give_an_empty_association() {
        let sorted = loadings(&[("Fe", 0.2), ("Al", 0.1)]);
        let assoc = extract_association(&sorted, AssociationEnd::Positive, 0.3);
        assert!(assoc.is_empty());
        assert_eq!(assoc.average_loading_magnitude, 0.0);
        assert_eq!(assoc.max_loading_magnitude, 0.0);
        assert_eq!(assoc.element_string(), "");
    }

    #[test]
    fn negative_tail_keeps_signed_values() {
        let sorted = loadings(&[("Cu", 0.7), ("Al", -0.31), ("Zr", -0.5), ("Ti", -0.9)]);
        let assoc = extract_association(&sorted, AssociationEnd::Negative, 0.3);
        assert_eq!(assoc.len(), 3);
        assert!(assoc.elements.iter().all(|e| e.loading < 0.0));
        // Input order is preserved; the display string is strongest first.
        assert_eq!(assoc.elements[0].element, "Al");
        assert_eq!(assoc.element_string(), "Ti-Zr-Al");
        assert_eq!(assoc.loading_of("zr"), Some(-0.5));
        assert!(!assoc.contains("Cu"));
    }

    #[test]
    fn loading_exactly_at_threshold_is_excluded() {
        let sorted = loadings(&[("Au", 0.3), ("As", -0.3)]);
        assert!(extract_association(&sorted, AssociationEnd::Positive, 0.3).is_empty());
        assert!(extract_association(&sorted, AssociationEnd::Negative, 0.3).is_empty());
    }
}
