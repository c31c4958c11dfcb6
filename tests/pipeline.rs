use geosig::classify::matcher::{MatchOptions, match_associations, summarize_associations};
use geosig::config::AnalysisConfig;
use geosig::fit::{PcaOptions, run_pca_with_progress};
use geosig::progress::NoopPcaProgress;
use geosig::quality::{assess_columns, recommended_columns};
use geosig::{CompositionRow, ElementMap, ZeroStrategy, run_pca, sorted_loadings};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, LogNormal, Normal};
use std::collections::HashMap;

const COLUMNS: [&str; 8] = [
    "Cu_ppm", "Mo_ppm", "Au_ppb", "S_pct", "Al_pct", "Ti_pct", "Zr_ppm", "Mg_pct",
];

/// Porphyry-style Cu-Mo-Au-S factor against a detrital Al-Ti-Zr factor, with Mg as noise.
fn assays(n: usize, seed: u64) -> Vec<CompositionRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    let factor = Normal::new(0.0, 1.0).unwrap();
    let noise = LogNormal::new(0.0, 0.1).unwrap();
    (0..n)
        .map(|_| {
            let ore: f64 = factor.sample(&mut rng);
            let detrital: f64 = factor.sample(&mut rng);
            let values = [
                50.0 * (0.9 * ore).exp(),
                2.0 * (0.9 * ore).exp(),
                10.0 * (0.8 * ore).exp(),
                0.5 * (0.85 * ore).exp(),
                7.0 * (0.7 * detrital).exp(),
                0.4 * (0.7 * detrital).exp(),
                150.0 * (0.7 * detrital).exp(),
                1.5,
            ];
            COLUMNS
                .iter()
                .zip(values)
                .map(|(c, v)| (c.to_string(), Some(v * noise.sample(&mut rng))))
                .collect()
        })
        .collect()
}

fn columns() -> Vec<String> {
    COLUMNS.iter().map(|c| c.to_string()).collect()
}

fn element_map() -> ElementMap {
    COLUMNS
        .iter()
        .map(|c| {
            let symbol = c.split('_').next().unwrap_or(c);
            (c.to_string(), symbol.to_string())
        })
        .collect()
}

#[test]
fn two_requested_components_give_two_analyses() {
    let rows = assays(120, 11);
    let result = run_pca(&rows, &columns(), 2, ZeroStrategy::HalfMin);
    assert_eq!(result.n_components(), 2);

    let analyses = match_associations(&result, &element_map(), &MatchOptions::default());
    assert_eq!(analyses.len(), 2);
    assert_eq!(analyses[0].pc_number, 1);
    assert_eq!(analyses[1].pc_number, 2);
    assert!(analyses[0].variance_explained >= analyses[1].variance_explained);
}

#[test]
fn ore_factor_is_recognised() {
    let rows = assays(200, 5);
    let result = run_pca(&rows, &columns(), 4, ZeroStrategy::HalfMin);
    let analyses = match_associations(&result, &element_map(), &MatchOptions::default());

    let porphyry = analyses.iter().find(|a| {
        [&a.positive_association, &a.negative_association]
            .iter()
            .any(|end| end.top_match().is_some_and(|m| m.pattern_id == "porphyry_cu"))
    });
    assert!(porphyry.is_some(), "no component was read as porphyry Cu");

    let summary = summarize_associations(&analyses, 25.0);
    assert_eq!(summary.len(), analyses.len());
    assert!(summary.iter().any(|row| row.has_mineralisation));
}

#[test]
fn analyses_are_bounded_by_max_components() {
    let rows = assays(80, 3);
    let result = run_pca(&rows, &columns(), 8, ZeroStrategy::SmallConstant);
    let options = MatchOptions {
        max_components: 3,
        ..MatchOptions::default()
    };
    let analyses = match_associations(&result, &element_map(), &options);
    assert_eq!(analyses.len(), 3.min(result.n_components()));
    for (i, analysis) in analyses.iter().enumerate() {
        assert_eq!(analysis.pc_number, i + 1);
        for end in [&analysis.positive_association, &analysis.negative_association] {
            assert!(end.matches.len() <= options.max_matches);
            assert!(end.matches.iter().all(|m| m.confidence_score >= options.minimum_confidence));
        }
    }
}

#[test]
fn sorted_loadings_use_element_symbols() {
    let rows = assays(60, 9);
    let result = run_pca(&rows, &columns(), 2, ZeroStrategy::HalfMin);
    let sorted = sorted_loadings(&result, 0, &element_map());
    assert_eq!(sorted.len(), COLUMNS.len());
    assert!(sorted.iter().any(|l| l.element == "Cu"));
    for pair in sorted.windows(2) {
        assert!(pair[0].loading >= pair[1].loading);
    }
}

#[test]
fn censored_gold_is_flagged_and_detection_limits_flow_through() {
    let mut rows = assays(100, 21);
    for row in rows.iter_mut().take(45) {
        row.insert("Au_ppb".to_string(), Some(-1.0));
    }
    let limits = HashMap::from([("Au_ppb".to_string(), 1.0)]);
    let qualities = assess_columns(&rows, &columns(), &limits);
    let recommended = recommended_columns(&qualities);
    assert!(!recommended.contains(&"Au_ppb".to_string()));
    assert!(recommended.contains(&"Cu_ppm".to_string()));

    let options = PcaOptions {
        components: 3,
        zero_strategy: ZeroStrategy::HalfDetectionLimit,
        detection_limits: limits,
    };
    let result = run_pca_with_progress(&rows, &columns(), &options, &mut NoopPcaProgress);
    assert_eq!(result.n_samples, 100);
    assert_eq!(result.zeros_replaced, 45);
}

#[test]
fn configuration_drives_the_whole_run() {
    let text = r#"
        [pca]
        components = 3

        [matching]
        max_components = 2
        minimum_confidence = 20.0

        [elements]
        Cu_ppm = "Cu"
        Mo_ppm = "Mo"
        Au_ppb = "Au"
        S_pct = "S"
    "#;
    let config = AnalysisConfig::from_toml_str(text).unwrap();
    let rows = assays(90, 13);
    let result = run_pca_with_progress(&rows, &columns(), &config.pca, &mut NoopPcaProgress);
    assert_eq!(result.n_components(), 3);
    let analyses = match_associations(&result, &config.elements, &config.matching);
    assert_eq!(analyses.len(), 2);
}

#[test]
fn degenerate_input_yields_no_analyses() {
    let rows: Vec<CompositionRow> = Vec::new();
    let result = run_pca(&rows, &columns(), 4, ZeroStrategy::HalfMin);
    assert!(result.is_empty());
    assert_eq!(result.n_samples, 0);
    let analyses = match_associations(&result, &element_map(), &MatchOptions::default());
    assert!(analyses.is_empty());
}
