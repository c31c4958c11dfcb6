//! Refines the ranking of patterns that share most of their elements.
//!
//! Discrimination only touches candidates that are already plausible: a pattern is
//! adjusted when it and the rival named by one of its discriminators both score above
//! the relevance threshold for the same association.

use crate::classify::extract::ExtractedAssociation;
use crate::classify::patterns::ReferencePattern;
use crate::classify::score::{MatchScore, rank_scores};
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscriminationSettings {
    /// Both a pattern and its rival must score above this to be discriminated.
    pub relevance_threshold: f64,
    /// Added per favouring element present in the association.
    pub favour_bonus: f64,
    /// Subtracted per opposing element present in the association.
    pub oppose_penalty: f64,
}

impl Default for DiscriminationSettings {
    fn default() -> Self {
        Self {
            relevance_threshold: 25.0,
            favour_bonus: 6.0,
            oppose_penalty: 6.0,
        }
    }
}

/// Returns a re-ranked copy of `scores` with discriminator adjustments applied.
///
/// Patterns are looked up by id in `patterns`; scores whose pattern is unknown pass
/// through unchanged.
pub fn apply_discrimination(
    scores: &[MatchScore],
    association: &ExtractedAssociation,
    patterns: &[ReferencePattern],
    settings: &DiscriminationSettings,
) -> Vec<MatchScore> {
    let by_id: AHashMap<&str, &ReferencePattern> = patterns.iter().map(|p| (p.id, p)).collect();
    let plausible: AHashSet<&str> = scores
        .iter()
        .filter(|s| s.confidence_score > settings.relevance_threshold)
        .map(|s| s.pattern_id.as_str())
        .collect();

    let mut adjusted: Vec<MatchScore> = scores
        .iter()
        .map(|score| {
            let mut score = score.clone();
            if !plausible.contains(score.pattern_id.as_str()) {
                return score;
            }
            let Some(pattern) = by_id.get(score.pattern_id.as_str()) else {
                return score;
            };

            let adjustment: f64 = pattern
                .discriminators
                .iter()
                .filter(|d| plausible.contains(d.rival))
                .map(|d| {
                    let favouring = d.favouring.iter().filter(|e| association.contains(e)).count();
                    let opposing = d.opposing.iter().filter(|e| association.contains(e)).count();
                    settings.favour_bonus * favouring as f64
                        - settings.oppose_penalty * opposing as f64
                })
                .sum();

            if adjustment != 0.0 {
                log::trace!(
                    "Discrimination moved '{}' by {adjustment:+.1}",
                    score.pattern_id
                );
                score.confidence_score = (score.confidence_score + adjustment).clamp(0.0, 100.0);
                score.discrimination_adjustment = adjustment;
            }
            score
        })
        .collect();

    rank_scores(&mut adjusted, patterns);
    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::extract::{AssociationEnd, extract_association};
    use crate::classify::patterns::{Discriminator, PatternCategory, REFERENCE_PATTERNS};
    use crate::classify::score::{ScoringWeights, score_all_patterns};
    use crate::types::SortedLoading;
    use approx::assert_abs_diff_eq;

    fn association(pairs: &[(&str, f64)]) -> ExtractedAssociation {
        let sorted: Vec<SortedLoading> = pairs
            .iter()
            .map(|(e, l)| SortedLoading {
                element: e.to_string(),
                loading: *l,
            })
            .collect();
        extract_association(&sorted, AssociationEnd::Positive, 0.3)
    }

    fn score_of<'a>(scores: &'a [MatchScore], id: &str) -> &'a MatchScore {
        scores
            .iter()
            .find(|s| s.pattern_id == id)
            .unwrap_or_else(|| panic!("no score for {id}"))
    }

    #[test]
    fn thallium_and_manganese_favour_sedex_over_vhms() {
        // Shared base-metal core, plus the exhalative pathfinders.
        let assoc = association(&[
            ("Zn", 0.9),
            ("Pb", 0.85),
            ("Fe", 0.7),
            ("S", 0.7),
            ("Ag", 0.6),
            ("Cu", 0.5),
            ("Tl", 0.5),
            ("Mn", 0.45),
        ]);
        let base = score_all_patterns(&assoc, REFERENCE_PATTERNS, &ScoringWeights::default());
        let refined = apply_discrimination(
            &base,
            &assoc,
            REFERENCE_PATTERNS,
            &DiscriminationSettings::default(),
        );

        let vhms_before = score_of(&base, "vhms").confidence_score;
        let sedex_before = score_of(&base, "sedex").confidence_score;
        assert!(vhms_before > 25.0 && sedex_before > 25.0);

        let vhms = score_of(&refined, "vhms");
        let sedex = score_of(&refined, "sedex");
        assert_abs_diff_eq!(vhms.discrimination_adjustment, -12.0, epsilon = 1e-12);
        assert!(sedex.discrimination_adjustment > 0.0);
        assert!(sedex.confidence_score > vhms.confidence_score);
        for pair in refined.windows(2) {
            assert!(pair[0].confidence_score >= pair[1].confidence_score);
        }
    }

    #[test]
    fn implausible_rival_leaves_scores_untouched() {
        let assoc = association(&[
            ("Cu", 0.8),
            ("Zn", 0.7),
            ("Pb", 0.6),
            ("Fe", 0.6),
            ("S", 0.5),
            ("Tl", 0.4),
        ]);
        let base = score_all_patterns(&assoc, REFERENCE_PATTERNS, &ScoringWeights::default());
        let strict = DiscriminationSettings {
            relevance_threshold: 99.0,
            ..DiscriminationSettings::default()
        };
        let refined = apply_discrimination(&base, &assoc, REFERENCE_PATTERNS, &strict);
        assert_eq!(refined, base);
    }

    #[test]
    fn adjusted_scores_stay_in_range() {
        let assoc = association(&[
            ("Zn", 0.95),
            ("Pb", 0.95),
            ("Fe", 0.9),
            ("S", 0.9),
            ("Ag", 0.9),
        ]);
        let base = score_all_patterns(&assoc, REFERENCE_PATTERNS, &ScoringWeights::default());
        let extreme = DiscriminationSettings {
            relevance_threshold: 0.0,
            favour_bonus: 500.0,
            oppose_penalty: 500.0,
        };
        let refined = apply_discrimination(&base, &assoc, REFERENCE_PATTERNS, &extreme);
        assert!(refined.iter().all(|s| (0.0..=100.0).contains(&s.confidence_score)));
    }

    #[test]
    fn input_is_not_modified() {
        let assoc = association(&[
            ("Zn", 0.9),
            ("Pb", 0.85),
            ("Ag", 0.6),
            ("Tl", 0.5),
            ("Fe", 0.6),
            ("S", 0.6),
        ]);
        let base = score_all_patterns(&assoc, REFERENCE_PATTERNS, &ScoringWeights::default());
        let snapshot = base.clone();
        let refined = apply_discrimination(
            &base,
            &assoc,
            REFERENCE_PATTERNS,
            &DiscriminationSettings::default(),
        );
        assert_eq!(base, snapshot);
        assert_eq!(refined.len(), base.len());
    }

    #[test]
    fn ties_after_adjustment_follow_library_order() {
        // `first` loses 6 to its anti element and wins it back from the discriminator.
        let library = [
            ReferencePattern {
                id: "first",
                name: "First",
                category: PatternCategory::Mineralisation,
                description: "",
                core_elements: &["Cu", "Zn"],
                common_elements: &[],
                optional_elements: &[],
                anti_elements: &["Ag"],
                discriminators: &[Discriminator {
                    rival: "second",
                    favouring: &["Ag"],
                    opposing: &[],
                }],
            },
            ReferencePattern {
                id: "second",
                name: "Second",
                category: PatternCategory::Mineralisation,
                description: "",
                core_elements: &["Cu", "Zn"],
                common_elements: &[],
                optional_elements: &[],
                anti_elements: &[],
                discriminators: &[],
            },
        ];
        let assoc = association(&[("Cu", 0.8), ("Zn", 0.8), ("Ag", 0.6)]);
        let base = score_all_patterns(&assoc, &library, &ScoringWeights::default());
        assert_eq!(base[0].pattern_id, "second");

        let refined =
            apply_discrimination(&base, &assoc, &library, &DiscriminationSettings::default());
        assert_abs_diff_eq!(
            refined[0].confidence_score,
            refined[1].confidence_score,
            epsilon = 1e-9
        );
        assert_eq!(refined[0].pattern_id, "first");
        assert_eq!(refined[1].pattern_id, "second");
    }
}
