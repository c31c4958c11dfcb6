//! # Pattern Scoring
//!
//! Turns the overlap between one extracted association and one reference pattern into a
//! 0-100 confidence. Most of the budget is earned by the core tier alone; common and
//! optional elements add smaller increments on top, strong loadings add a bonus, and
//! every anti element the association carries subtracts a penalty. A pattern whose core
//! is too thinly represented is never confirmed, however many peripheral elements it
//! shares with the association.

use crate::classify::extract::ExtractedAssociation;
use crate::classify::patterns::{
    LITHOPHILE_ELEMENTS, PatternCategory, ReferencePattern, canonical_symbol,
};
use ahash::AHashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Tunable constants of the confidence formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Points earned when every core element is present.
    pub core_points: f64,
    /// Points added when every common element is present.
    pub common_points: f64,
    /// Points added when every optional element is present.
    pub optional_points: f64,
    /// Below this share of core elements present, confidence is forced to 0.
    pub min_core_fraction: f64,
    /// Points available from loading strength.
    pub loading_bonus_points: f64,
    /// Loading magnitude at which the bonus starts to accrue.
    pub loading_bonus_floor: f64,
    /// Magnitude range over which the bonus ramps from nothing to full.
    pub loading_bonus_span: f64,
    /// Penalty for one fully loaded anti element.
    pub anti_element_penalty: f64,
    /// Off-pattern lithophiles needed to flag a mineralisation match as mixed.
    pub lithophile_min_count: usize,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            core_points: 70.0,
            common_points: 10.0,
            optional_points: 5.0,
            min_core_fraction: 0.4,
            loading_bonus_points: 15.0,
            loading_bonus_floor: 0.3,
            loading_bonus_span: 0.5,
            anti_element_penalty: 10.0,
            lithophile_min_count: 2,
        }
    }
}

/// The outcome of scoring one association against one pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub pattern_id: String,
    pub pattern_name: String,
    pub category: PatternCategory,
    pub confidence_score: f64,
    pub core_match_score: f64,
    pub common_match_score: f64,
    pub optional_match_score: f64,
    pub anti_element_penalty: f64,
    pub loading_strength_bonus: f64,
    /// Net change applied by discriminator rules; 0 when none applied.
    pub discrimination_adjustment: f64,
    pub matched_core_elements: Vec<String>,
    pub matched_common_elements: Vec<String>,
    pub matched_optional_elements: Vec<String>,
    pub present_anti_elements: Vec<String>,
    pub missing_core_elements: Vec<String>,
    pub pattern_completeness: f64,
    pub association_purity: f64,
    pub lithophile_interference: bool,
}

impl MatchScore {
    pub fn is_mineralisation(&self) -> bool {
        self.category == PatternCategory::Mineralisation
    }
}

/// `numerator / denominator`, or 0 when the denominator is 0.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Canonical symbol to signed loading, keeping the strongest loading per symbol.
fn association_loadings(association: &ExtractedAssociation) -> AHashMap<String, f64> {
    let mut map: AHashMap<String, f64> = AHashMap::with_capacity(association.len());
    for entry in &association.elements {
        let symbol = canonical_symbol(&entry.element);
        map.entry(symbol)
            .and_modify(|existing| {
                if entry.loading.abs() > existing.abs() {
                    *existing = entry.loading;
                }
            })
            .or_insert(entry.loading);
    }
    map
}

fn present(tier: &[&str], loadings: &AHashMap<String, f64>) -> Vec<String> {
    tier.iter()
        .filter(|e| loadings.contains_key(**e))
        .map(|e| e.to_string())
        .collect()
}

fn ramp(x: f64, weights: &ScoringWeights) -> f64 {
    ratio(x - weights.loading_bonus_floor, weights.loading_bonus_span).clamp(0.0, 1.0)
}

/// Scores `association` against `pattern`.
pub fn score_pattern(
    association: &ExtractedAssociation,
    pattern: &ReferencePattern,
    weights: &ScoringWeights,
) -> MatchScore {
    let loadings = association_loadings(association);

    let matched_core = present(pattern.core_elements, &loadings);
    let matched_common = present(pattern.common_elements, &loadings);
    let matched_optional = present(pattern.optional_elements, &loadings);
    let present_anti = present(pattern.anti_elements, &loadings);
    let missing_core: Vec<String> = pattern
        .core_elements
        .iter()
        .filter(|e| !loadings.contains_key(**e))
        .map(|e| e.to_string())
        .collect();

    let core_fraction = ratio(matched_core.len() as f64, pattern.core_elements.len() as f64);
    let common_fraction = ratio(
        matched_common.len() as f64,
        pattern.common_elements.len() as f64,
    );
    let optional_fraction = ratio(
        matched_optional.len() as f64,
        pattern.optional_elements.len() as f64,
    );

    // Empty peripheral tiers contribute nothing; the core share is never renormalised.
    let coverage = weights.core_points * core_fraction
        + weights.common_points * common_fraction
        + weights.optional_points * optional_fraction;

    let matched_magnitudes: Vec<f64> = matched_core
        .iter()
        .chain(&matched_common)
        .chain(&matched_optional)
        .filter_map(|e| loadings.get(e))
        .map(|l| l.abs())
        .collect();
    let loading_bonus = if matched_magnitudes.is_empty() {
        0.0
    } else {
        let average = ratio(
            matched_magnitudes.iter().sum(),
            matched_magnitudes.len() as f64,
        );
        let max = matched_magnitudes.iter().copied().fold(0.0_f64, f64::max);
        weights.loading_bonus_points * 0.5 * (ramp(average, weights) + ramp(max, weights))
    };

    let anti_penalty: f64 = present_anti
        .iter()
        .filter_map(|e| loadings.get(e))
        .map(|l| weights.anti_element_penalty * l.abs().min(1.0))
        .sum();

    let gated = pattern.core_elements.is_empty() || core_fraction < weights.min_core_fraction;
    let raw = coverage + loading_bonus - anti_penalty;
    let confidence = if gated || !raw.is_finite() {
        0.0
    } else {
        raw.clamp(0.0, 100.0)
    };

    let matched_total = matched_magnitudes.len() as f64;
    let lithophile_interference = pattern.category == PatternCategory::Mineralisation
        && !matched_core.is_empty()
        && LITHOPHILE_ELEMENTS
            .iter()
            .filter(|l| loadings.contains_key(**l) && !pattern.in_tiers(l))
            .count()
            >= weights.lithophile_min_count;

    MatchScore {
        pattern_id: pattern.id.to_string(),
        pattern_name: pattern.name.to_string(),
        category: pattern.category,
        confidence_score: confidence,
        core_match_score: core_fraction * 100.0,
        common_match_score: common_fraction * 100.0,
        optional_match_score: optional_fraction * 100.0,
        anti_element_penalty: anti_penalty,
        loading_strength_bonus: loading_bonus,
        discrimination_adjustment: 0.0,
        matched_core_elements: matched_core,
        matched_common_elements: matched_common,
        matched_optional_elements: matched_optional,
        present_anti_elements: present_anti,
        missing_core_elements: missing_core,
        pattern_completeness: ratio(matched_total, pattern.tier_len() as f64) * 100.0,
        association_purity: ratio(matched_total, loadings.len() as f64) * 100.0,
        lithophile_interference,
    }
}

/// Sorts by descending confidence, breaking ties by declaration order in `patterns`.
/// Scores for ids missing from `patterns` sort after known ones with equal confidence.
pub(crate) fn rank_scores(scores: &mut [MatchScore], patterns: &[ReferencePattern]) {
    let order: AHashMap<&str, usize> = patterns
        .iter()
        .enumerate()
        .map(|(index, pattern)| (pattern.id, index))
        .collect();
    let position = |score: &MatchScore| {
        order
            .get(score.pattern_id.as_str())
            .copied()
            .unwrap_or(usize::MAX)
    };
    scores.sort_by(|a, b| {
        b.confidence_score
            .total_cmp(&a.confidence_score)
            .then_with(|| position(a).cmp(&position(b)))
    });
}

/// Scores `association` against every pattern in `patterns`, best first.
pub fn score_all_patterns(
    association: &ExtractedAssociation,
    patterns: &[ReferencePattern],
    weights: &ScoringWeights,
) -> Vec<MatchScore> {
    let mut scores: Vec<MatchScore> = patterns
        .par_iter()
        .map(|pattern| score_pattern(association, pattern, weights))
        .collect();
    rank_scores(&mut scores, patterns);
    scores
}
