//! # Component Association Matching
//!
//! Runs extraction, scoring and discrimination over both ends of every retained
//! component and reduces the results to a ranked shortlist plus interpretive notes.
//! Components are independent, so they are matched in parallel; output order always
//! follows the component index.

use crate::classify::discriminate::{DiscriminationSettings, apply_discrimination};
use crate::classify::extract::{
    AssociationEnd, DEFAULT_LOADING_THRESHOLD, ExtractedAssociation, extract_association,
};
use crate::classify::patterns::{LITHOPHILE_ELEMENTS, REFERENCE_PATTERNS, ReferencePattern};
use crate::classify::score::{MatchScore, ScoringWeights, score_all_patterns};
use crate::fit::{DEFAULT_COMPONENTS, sorted_loadings};
use crate::types::{ElementMap, FullPcaResult, SortedLoading};
use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Components explaining less than this percentage of variance are flagged as weak.
pub const WEAK_COMPONENT_PERCENT: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    pub loading_threshold: f64,
    pub max_matches: usize,
    pub minimum_confidence: f64,
    pub apply_discrimination: bool,
    pub max_components: usize,
    pub scoring: ScoringWeights,
    pub discrimination: DiscriminationSettings,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            loading_threshold: DEFAULT_LOADING_THRESHOLD,
            max_matches: 5,
            minimum_confidence: 25.0,
            apply_discrimination: true,
            max_components: DEFAULT_COMPONENTS,
            scoring: ScoringWeights::default(),
            discrimination: DiscriminationSettings::default(),
        }
    }
}

/// Shortlisted interpretations of one end of one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndAssociation {
    pub matches: Vec<MatchScore>,
    /// Best mineralisation confidence over every scored pattern, not just the shortlist.
    /// `None` when the association is empty or the library has no mineralisation pattern.
    pub strongest_mineralisation: Option<f64>,
    pub element_string: String,
    pub association: ExtractedAssociation,
}

impl EndAssociation {
    pub fn top_match(&self) -> Option<&MatchScore> {
        self.matches.first()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcAssociationAnalysis {
    /// 1-based component number.
    pub pc_number: usize,
    pub variance_explained: f64,
    pub positive_association: EndAssociation,
    pub negative_association: EndAssociation,
    pub quality_assessment: QualityAssessment,
}

/// One row of the tabular summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationSummary {
    pub pc_number: usize,
    pub variance_explained: f64,
    pub positive_elements: String,
    pub positive_label: String,
    pub positive_confidence: f64,
    pub negative_elements: String,
    pub negative_label: String,
    pub negative_confidence: f64,
    pub has_mineralisation: bool,
}

const UNCLASSIFIED: &str = "Unclassified";

fn match_end(
    sorted: &[SortedLoading],
    end: AssociationEnd,
    options: &MatchOptions,
    patterns: &[ReferencePattern],
) -> EndAssociation {
    let association = extract_association(sorted, end, options.loading_threshold);
    let element_string = association.element_string();
    if association.is_empty() {
        return EndAssociation {
            matches: Vec::new(),
            strongest_mineralisation: None,
            element_string,
            association,
        };
    }

    let mut scores = score_all_patterns(&association, patterns, &options.scoring);
    if options.apply_discrimination {
        scores = apply_discrimination(&scores, &association, patterns, &options.discrimination);
    }
    let strongest_mineralisation = scores
        .iter()
        .filter(|s| s.is_mineralisation())
        .map(|s| s.confidence_score)
        .reduce(f64::max);
    let matches: Vec<MatchScore> = scores
        .into_iter()
        .filter(|s| s.confidence_score >= options.minimum_confidence)
        .take(options.max_matches)
        .collect();

    EndAssociation {
        matches,
        strongest_mineralisation,
        element_string,
        association,
    }
}

fn end_notes(end: AssociationEnd, result: &EndAssociation, options: &MatchOptions) -> Vec<String> {
    let mut notes = Vec::new();
    if result.association.is_empty() {
        notes.push(format!(
            "No elements load beyond +/-{} on the {end} end",
            options.loading_threshold
        ));
        return notes;
    }
    match result.top_match() {
        None => notes.push(format!(
            "The {end} association ({}) matches no reference pattern at {}% confidence or more",
            result.element_string, options.minimum_confidence
        )),
        Some(top) if top.lithophile_interference => {
            let lithophiles = LITHOPHILE_ELEMENTS
                .iter()
                .filter(|l| result.association.contains(l))
                .join(", ");
            notes.push(format!(
                "The {end} association '{}' co-loads lithophile elements ({lithophiles}); \
                 it may mix ore and host-rock signals",
                top.pattern_name
            ));
        }
        Some(_) => {}
    }
    notes
}

/// Matches both ends of one component, using the built-in pattern library.
pub fn match_pc_associations(
    sorted: &[SortedLoading],
    pc_number: usize,
    variance_explained: f64,
    options: &MatchOptions,
) -> PcAssociationAnalysis {
    match_pc_associations_with_library(
        sorted,
        pc_number,
        variance_explained,
        options,
        REFERENCE_PATTERNS,
    )
}

/// Matches both ends of one component against `patterns`.
pub fn match_pc_associations_with_library(
    sorted: &[SortedLoading],
    pc_number: usize,
    variance_explained: f64,
    options: &MatchOptions,
    patterns: &[ReferencePattern],
) -> PcAssociationAnalysis {
    let positive = match_end(sorted, AssociationEnd::Positive, options, patterns);
    let negative = match_end(sorted, AssociationEnd::Negative, options, patterns);

    let mut notes = end_notes(AssociationEnd::Positive, &positive, options);
    notes.extend(end_notes(AssociationEnd::Negative, &negative, options));
    if variance_explained < WEAK_COMPONENT_PERCENT {
        notes.push(format!(
            "PC{pc_number} explains only {variance_explained:.1}% of the variance; \
             treat its interpretation as tentative"
        ));
    }

    log::debug!(
        "PC{pc_number}: +[{}] -> {}, -[{}] -> {}",
        positive.element_string,
        positive.top_match().map_or(UNCLASSIFIED, |m| m.pattern_name.as_str()),
        negative.element_string,
        negative.top_match().map_or(UNCLASSIFIED, |m| m.pattern_name.as_str()),
    );

    PcAssociationAnalysis {
        pc_number,
        variance_explained,
        positive_association: positive,
        negative_association: negative,
        quality_assessment: QualityAssessment { notes },
    }
}

/// Matches the leading components of `result`, using the built-in pattern library.
pub fn match_associations(
    result: &FullPcaResult,
    element_map: &ElementMap,
    options: &MatchOptions,
) -> Vec<PcAssociationAnalysis> {
    match_associations_with_library(result, element_map, options, REFERENCE_PATTERNS)
}

/// Matches up to `options.max_components` components of `result` against `patterns`.
pub fn match_associations_with_library(
    result: &FullPcaResult,
    element_map: &ElementMap,
    options: &MatchOptions,
    patterns: &[ReferencePattern],
) -> Vec<PcAssociationAnalysis> {
    let n = options.max_components.min(result.n_components());
    if n == 0 {
        log::warn!("The PCA result has no components to interpret");
        return Vec::new();
    }
    log::info!("Matching {n} components against {} reference patterns", patterns.len());

    (0..n)
        .into_par_iter()
        .map(|component| {
            let sorted = sorted_loadings(result, component, element_map);
            let variance = result.variance_explained[component];
            match_pc_associations_with_library(&sorted, component + 1, variance, options, patterns)
        })
        .collect()
}

fn label_of(end: &EndAssociation) -> (String, f64) {
    match end.top_match() {
        Some(top) => (top.pattern_name.clone(), top.confidence_score),
        None => (UNCLASSIFIED.to_string(), 0.0),
    }
}

/// Flattens analyses into one row per component. `has_mineralisation` is set when a
/// mineralisation pattern on either end scores at least `threshold`, whether or not it
/// made the shortlist.
pub fn summarize_associations(
    analyses: &[PcAssociationAnalysis],
    threshold: f64,
) -> Vec<AssociationSummary> {
    analyses
        .iter()
        .map(|analysis| {
            let (positive_label, positive_confidence) = label_of(&analysis.positive_association);
            let (negative_label, negative_confidence) = label_of(&analysis.negative_association);
            let has_mineralisation = [
                &analysis.positive_association,
                &analysis.negative_association,
            ]
            .iter()
            .any(|end| end.strongest_mineralisation.is_some_and(|c| c >= threshold));
            AssociationSummary {
                pc_number: analysis.pc_number,
                variance_explained: analysis.variance_explained,
                positive_elements: analysis.positive_association.element_string.clone(),
                positive_label,
                positive_confidence,
                negative_elements: analysis.negative_association.element_string.clone(),
                negative_label,
                negative_confidence,
                has_mineralisation,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::patterns::PatternCategory;

    fn loadings(pairs: &[(&str, f64)]) -> Vec<SortedLoading> {
        pairs
            .iter()
            .map(|(e, l)| SortedLoading {
                element: e.to_string(),
                loading: *l,
            })
            .sorted_by(|a, b| b.loading.total_cmp(&a.loading))
            .collect()
    }

    fn porphyry_vs_host() -> Vec<SortedLoading> {
        loadings(&[
            ("Cu", 0.9),
            ("Mo", 0.8),
            ("Au", 0.7),
            ("S", 0.65),
            ("Re", 0.5),
            ("Fe", 0.1),
            ("Mg", -0.6),
            ("Cr", -0.7),
            ("Ni", -0.8),
            ("Co", -0.5),
        ])
    }

    #[test]
    fn both_ends_are_interpreted() {
        let analysis =
            match_pc_associations(&porphyry_vs_host(), 1, 42.0, &MatchOptions::default());
        assert_eq!(analysis.pc_number, 1);
        let positive = analysis.positive_association.top_match().unwrap();
        assert_eq!(positive.pattern_id, "porphyry_cu");
        let negative = analysis.negative_association.top_match().unwrap();
        assert_eq!(negative.pattern_id, "ultramafic");
        assert_eq!(analysis.negative_association.element_string, "Ni-Cr-Mg-Co");
        assert!(analysis.quality_assessment.notes.is_empty());
    }

    #[test]
    fn matches_respect_floor_and_limit() {
        let options = MatchOptions {
            max_matches: 2,
            minimum_confidence: 40.0,
            ..MatchOptions::default()
        };
        let analysis = match_pc_associations(&porphyry_vs_host(), 1, 42.0, &options);
        for end in [&analysis.positive_association, &analysis.negative_association] {
            assert!(end.matches.len() <= 2);
            assert!(end.matches.iter().all(|m| m.confidence_score >= 40.0));
            for pair in end.matches.windows(2) {
                assert!(pair[0].confidence_score >= pair[1].confidence_score);
            }
        }
    }

    #[test]
    fn empty_tail_and_weak_component_are_noted() {
        let sorted = loadings(&[("Cu", 0.9), ("Mo", 0.8), ("Au", 0.7), ("S", 0.6), ("Fe", -0.1)]);
        let analysis = match_pc_associations(&sorted, 3, 2.5, &MatchOptions::default());
        assert!(analysis.negative_association.matches.is_empty());
        assert!(analysis.negative_association.association.is_empty());
        let notes = &analysis.quality_assessment.notes;
        assert!(notes.iter().any(|n| n.contains("negative end")));
        assert!(notes.iter().any(|n| n.contains("PC3 explains only 2.5%")));
    }

    #[test]
    fn lithophile_interference_is_noted() {
        let sorted = loadings(&[
            ("Cu", 0.9),
            ("Mo", 0.8),
            ("Au", 0.7),
            ("S", 0.6),
            ("Zr", 0.5),
            ("Ti", 0.45),
        ]);
        let analysis = match_pc_associations(&sorted, 1, 30.0, &MatchOptions::default());
        let top = analysis.positive_association.top_match().unwrap();
        assert!(top.lithophile_interference);
        assert!(
            analysis
                .quality_assessment
                .notes
                .iter()
                .any(|n| n.contains("lithophile") && n.contains("Zr"))
        );
    }

    #[test]
    fn custom_library_is_used() {
        let only = [ReferencePattern {
            id: "cu_mo",
            name: "Cu-Mo",
            category: PatternCategory::Mineralisation,
            description: "",
            core_elements: &["Cu", "Mo"],
            common_elements: &[],
            optional_elements: &[],
            anti_elements: &[],
            discriminators: &[],
        }];
        let analysis = match_pc_associations_with_library(
            &porphyry_vs_host(),
            1,
            42.0,
            &MatchOptions::default(),
            &only,
        );
        assert_eq!(analysis.positive_association.matches.len(), 1);
        assert_eq!(analysis.positive_association.matches[0].pattern_id, "cu_mo");
        assert!(analysis.negative_association.matches.is_empty());
    }

    #[test]
    fn summary_labels_and_mineralisation_flag() {
        let options = MatchOptions::default();
        let analyses = vec![
            match_pc_associations(&porphyry_vs_host(), 1, 42.0, &options),
            match_pc_associations(&loadings(&[("Fe", 0.2)]), 2, 10.0, &options),
        ];
        let summary = summarize_associations(&analyses, options.minimum_confidence);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].positive_label, "Porphyry Cu-Mo-Au");
        assert!(summary[0].has_mineralisation);
        assert_eq!(summary[1].positive_label, "Unclassified");
        assert_eq!(summary[1].positive_confidence, 0.0);
        assert!(!summary[1].has_mineralisation);
    }

    #[test]
    fn mineralisation_beyond_the_shortlist_still_sets_the_flag() {
        let lithology = ReferencePattern {
            id: "host",
            name: "Host",
            category: PatternCategory::Lithology,
            description: "",
            core_elements: &["Cu", "Mo", "Au", "S"],
            common_elements: &[],
            optional_elements: &[],
            anti_elements: &[],
            discriminators: &[],
        };
        let ore = ReferencePattern {
            id: "ore",
            name: "Ore",
            category: PatternCategory::Mineralisation,
            core_elements: &["Cu", "Mo", "Zn", "Pb"],
            ..lithology
        };
        let options = MatchOptions {
            max_matches: 1,
            ..MatchOptions::default()
        };
        let analysis = match_pc_associations_with_library(
            &porphyry_vs_host(),
            1,
            42.0,
            &options,
            &[lithology, ore],
        );
        let positive = &analysis.positive_association;
        assert_eq!(positive.matches.len(), 1);
        assert_eq!(positive.matches[0].pattern_id, "host");
        assert!(positive.strongest_mineralisation.is_some_and(|c| c >= 25.0));

        let summary = summarize_associations(&[analysis], options.minimum_confidence);
        assert!(summary[0].has_mineralisation);
    }
}
