//! Interpretation of PCA loadings against reference geochemical signatures.
pub mod discriminate;
pub mod extract;
pub mod matcher;
pub mod patterns;
pub mod score;
pub use discriminate::{DiscriminationSettings, apply_discrimination};
pub use extract::{
    AssociationEnd, DEFAULT_LOADING_THRESHOLD, ExtractedAssociation, extract_association,
};
pub use matcher::{
    AssociationSummary, EndAssociation, MatchOptions, PcAssociationAnalysis, match_associations,
    match_associations_with_library, match_pc_associations, match_pc_associations_with_library,
    summarize_associations,
};
pub use patterns::{PATTERN_BY_ID, PatternCategory, REFERENCE_PATTERNS, ReferencePattern};
pub use score::{MatchScore, ScoringWeights, score_all_patterns, score_pattern};
