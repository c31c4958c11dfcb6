#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use geosig::classify::matcher::{
    AssociationSummary, PcAssociationAnalysis, match_associations, summarize_associations,
};
use geosig::classify::patterns::{PatternCategory, REFERENCE_PATTERNS};
use geosig::config::{AnalysisConfig, load_element_map};
use geosig::fit::run_pca_with_progress;
use geosig::io::{AssayTable, load_assay_table, save_toml, write_loadings_tsv, write_scores_tsv};
use geosig::progress::{PcaProgressObserver, PcaStage};
use geosig::quality::{assess_columns, recommended_columns};
use geosig::stats::{CorrelationMethod, column_values, correlation_matrix, summarize_column};
use geosig::{FullPcaResult, ZeroStrategy};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Clone, Copy, ValueEnum)]
pub enum ZeroStrategyCli {
    HalfMin,
    HalfDetectionLimit,
    SmallConstant,
    MultiplicativeReplacement,
    Constant,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CorrelationMethodCli {
    Pearson,
    Spearman,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CategoryCli {
    Mineralisation,
    Lithology,
    Alteration,
    Regolith,
}

impl From<CategoryCli> for PatternCategory {
    fn from(value: CategoryCli) -> Self {
        match value {
            CategoryCli::Mineralisation => PatternCategory::Mineralisation,
            CategoryCli::Lithology => PatternCategory::Lithology,
            CategoryCli::Alteration => PatternCategory::Alteration,
            CategoryCli::Regolith => PatternCategory::Regolith,
        }
    }
}

#[derive(Args)]
pub struct DataArgs {
    /// Path to a CSV or TSV assay table (.tsv/.tab/.txt are read as tab-delimited)
    #[arg(value_name = "DATA")]
    pub data: PathBuf,

    /// Comma-separated columns to analyse; defaults to every numeric column
    #[arg(long, value_delimiter = ',', value_name = "COLUMNS")]
    pub columns: Vec<String>,
}

#[derive(Args)]
pub struct PcaArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Analysis configuration TOML
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Maximum number of components to retain
    #[arg(long, value_name = "K")]
    pub components: Option<usize>,

    /// How zero, negative and missing values are replaced before log-ratios
    #[arg(long, value_enum)]
    pub zero_strategy: Option<ZeroStrategyCli>,

    /// Replacement value for --zero-strategy constant
    #[arg(long, value_name = "VALUE")]
    pub replacement_value: Option<f64>,

    /// Output path prefix
    #[arg(long, default_value = "geosig", value_name = "PREFIX")]
    pub out: PathBuf,
}

#[derive(Args)]
pub struct AssociateArgs {
    #[command(flatten)]
    pub pca: PcaArgs,

    /// TOML table mapping column names to element symbols
    #[arg(long, value_name = "PATH")]
    pub elements: Option<PathBuf>,

    /// Minimum confidence (0-100) for a pattern to be reported
    #[arg(long, value_name = "PERCENT")]
    pub min_confidence: Option<f64>,

    /// Skip discriminator adjustments between similar patterns
    #[arg(long)]
    pub no_discrimination: bool,
}

#[derive(Parser)]
#[command(
    name = "geosig",
    version,
    about = "Compositional PCA and element-association classification for geochemical assays"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a CLR PCA and write scores, loadings and the full result
    Pca(PcaArgs),

    /// Run a PCA and classify each component's element associations
    Associate(AssociateArgs),

    /// Report below-detection censoring per column
    Quality {
        #[command(flatten)]
        data: DataArgs,

        /// Analysis configuration TOML (for detection limits)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Print summary statistics per column
    Stats(DataArgs),

    /// Print a correlation matrix
    Correlate {
        #[command(flatten)]
        data: DataArgs,

        #[arg(long, value_enum, default_value_t = CorrelationMethodCli::Pearson)]
        method: CorrelationMethodCli,
    },

    /// List the reference pattern library
    Patterns {
        #[arg(long, value_enum)]
        category: Option<CategoryCli>,
    },
}

/// Spinner that follows the PCA stages on stderr.
struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl PcaProgressObserver for SpinnerProgress {
    fn on_stage_start(&mut self, stage: PcaStage, work_items: usize) {
        self.bar.set_message(format!("{stage} ({work_items} items)"));
    }

    fn on_stage_finish(&mut self, stage: PcaStage) {
        log::debug!("Finished {stage}");
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Some(Commands::Pca(args)) => run_pca_command(args),
        Some(Commands::Associate(args)) => run_associate(args),
        Some(Commands::Quality { data, config }) => run_quality(data, config),
        Some(Commands::Stats(data)) => run_stats(data),
        Some(Commands::Correlate { data, method }) => run_correlate(data, method),
        Some(Commands::Patterns { category }) => {
            print_patterns(category.map(PatternCategory::from));
            Ok(())
        }
        None => Cli::command().print_help().map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(AnalysisConfig::load(path)?),
        None => Ok(AnalysisConfig::default()),
    }
}

/// Loads the table and resolves the requested columns.
fn load_data(args: &DataArgs) -> Result<(AssayTable, Vec<String>), Box<dyn std::error::Error>> {
    let table = load_assay_table(&args.data)?;
    let columns = if args.columns.is_empty() {
        table.numeric_columns()
    } else {
        table.require_columns(&args.columns)?;
        args.columns.clone()
    };
    Ok((table, columns))
}

fn zero_strategy(
    choice: ZeroStrategyCli,
    replacement_value: Option<f64>,
) -> Result<ZeroStrategy, Box<dyn std::error::Error>> {
    Ok(match choice {
        ZeroStrategyCli::HalfMin => ZeroStrategy::HalfMin,
        ZeroStrategyCli::HalfDetectionLimit => ZeroStrategy::HalfDetectionLimit,
        ZeroStrategyCli::SmallConstant => ZeroStrategy::SmallConstant,
        ZeroStrategyCli::MultiplicativeReplacement => ZeroStrategy::MultiplicativeReplacement,
        ZeroStrategyCli::Constant => match replacement_value {
            Some(v) if v.is_finite() && v > 0.0 => ZeroStrategy::Constant(v),
            _ => {
                return Err("--zero-strategy constant needs a positive --replacement-value".into());
            }
        },
    })
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Loads data and configuration, applies command line overrides and runs the PCA.
fn fit_pca(
    args: &PcaArgs,
) -> Result<(AssayTable, AnalysisConfig, FullPcaResult), Box<dyn std::error::Error>> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(k) = args.components {
        config.pca.components = k;
    }
    if let Some(choice) = args.zero_strategy {
        config.pca.zero_strategy = zero_strategy(choice, args.replacement_value)?;
    }

    let (table, columns) = load_data(&args.data)?;
    log::info!(
        "Running PCA on {} columns with {} zero replacement",
        columns.len(),
        config.pca.zero_strategy
    );

    let mut progress = SpinnerProgress::new();
    let result = run_pca_with_progress(&table.rows, &columns, &config.pca, &mut progress);
    progress.finish();

    if result.is_empty() {
        return Err("PCA produced no components; \
                    check that at least two columns have usable positive values"
            .into());
    }
    log::info!(
        "Retained {} components from {} samples ({} values replaced)",
        result.n_components(),
        result.n_samples,
        result.zeros_replaced
    );
    Ok((table, config, result))
}

fn run_pca_command(args: PcaArgs) -> CliResult {
    let (table, _, result) = fit_pca(&args)?;

    println!("{:<6}{:>12}{:>12}{:>14}", "PC", "eigenvalue", "variance%", "cumulative%");
    for c in 0..result.n_components() {
        println!(
            "{:<6}{:>12.4}{:>12.2}{:>14.2}",
            format!("PC{}", c + 1),
            result.eigenvalues[c],
            result.variance_explained[c],
            result.cumulative_variance[c]
        );
    }

    let scores_path = with_suffix(&args.out, ".scores.tsv");
    let loadings_path = with_suffix(&args.out, ".loadings.tsv");
    let result_path = with_suffix(&args.out, ".pca.toml");
    write_scores_tsv(&scores_path, &result, &table.sample_ids)?;
    write_loadings_tsv(&loadings_path, &result)?;
    save_toml(&result_path, &result)?;
    println!(
        "Wrote {}, {} and {}",
        scores_path.display(),
        loadings_path.display(),
        result_path.display()
    );
    Ok(())
}

#[derive(Serialize)]
struct AssociationReport<'a> {
    summary: &'a [AssociationSummary],
    components: &'a [PcAssociationAnalysis],
}

fn run_associate(args: AssociateArgs) -> CliResult {
    let (_, mut config, result) = fit_pca(&args.pca)?;
    if let Some(path) = &args.elements {
        config.elements.extend(load_element_map(path)?);
    }
    if let Some(min) = args.min_confidence {
        config.matching.minimum_confidence = min;
    }
    if args.no_discrimination {
        config.matching.apply_discrimination = false;
    }

    let analyses = match_associations(&result, &config.elements, &config.matching);
    let summary = summarize_associations(&analyses, config.matching.minimum_confidence);

    println!(
        "{:<5}{:>7}  {:<28}{:<34}{:>6}  {:<28}{:<34}{:>6}",
        "PC", "var%", "positive", "interpretation", "conf", "negative", "interpretation", "conf"
    );
    for row in &summary {
        println!(
            "{:<5}{:>7.2}  {:<28}{:<34}{:>6.1}  {:<28}{:<34}{:>6.1}{}",
            format!("PC{}", row.pc_number),
            row.variance_explained,
            row.positive_elements,
            row.positive_label,
            row.positive_confidence,
            row.negative_elements,
            row.negative_label,
            row.negative_confidence,
            if row.has_mineralisation { "  *" } else { "" }
        );
    }
    for analysis in &analyses {
        for note in &analysis.quality_assessment.notes {
            println!("  note: {note}");
        }
    }

    let report_path = with_suffix(&args.pca.out, ".associations.toml");
    save_toml(
        &report_path,
        &AssociationReport {
            summary: &summary,
            components: &analyses,
        },
    )?;
    println!("Wrote {}", report_path.display());
    Ok(())
}

fn run_quality(data: DataArgs, config: Option<PathBuf>) -> CliResult {
    let config = load_config(config.as_deref())?;
    let (table, columns) = load_data(&data)?;
    let qualities = assess_columns(&table.rows, &columns, config.detection_limits());

    println!("{:<20}{:>8}{:>10}{:>10}  {}", "column", "n", "%BLD", "n-score", "acceptable");
    for q in &qualities {
        println!(
            "{:<20}{:>8}{:>10.1}{:>10.2}  {}",
            q.column,
            q.n_values,
            q.quality.percent_bld,
            q.quality.bld_n_score,
            if q.quality.is_acceptable { "yes" } else { "no" }
        );
    }
    let recommended = recommended_columns(&qualities);
    println!("Recommended for PCA: {}", recommended.join(","));
    Ok(())
}

fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.4}"))
}

fn run_stats(data: DataArgs) -> CliResult {
    let (table, columns) = load_data(&data)?;
    println!(
        "{:<20}{:>8}{:>12}{:>12}{:>12}{:>12}{:>12}",
        "column", "count", "min", "median", "mean", "max", "std"
    );
    for column in &columns {
        let summary = summarize_column(&column_values(&table.rows, column));
        println!(
            "{:<20}{:>8}{:>12}{:>12}{:>12}{:>12}{:>12}",
            column,
            summary.count,
            format_optional(summary.min),
            format_optional(summary.median),
            format_optional(summary.mean),
            format_optional(summary.max),
            format_optional(summary.std)
        );
    }
    Ok(())
}

fn run_correlate(data: DataArgs, method: CorrelationMethodCli) -> CliResult {
    let (table, columns) = load_data(&data)?;
    let method = match method {
        CorrelationMethodCli::Pearson => CorrelationMethod::Pearson,
        CorrelationMethodCli::Spearman => CorrelationMethod::Spearman,
    };
    let correlation = correlation_matrix(&table.rows, &columns, method);

    println!("\t{}", correlation.columns.join("\t"));
    for (name, row) in correlation.columns.iter().zip(correlation.matrix.rows()) {
        let cells: Vec<String> = row.iter().map(|r| format!("{r:.3}")).collect();
        println!("{name}\t{}", cells.join("\t"));
    }
    Ok(())
}

fn print_patterns(category: Option<PatternCategory>) {
    for pattern in REFERENCE_PATTERNS
        .iter()
        .filter(|p| category.is_none_or(|c| p.category == c))
    {
        println!("{} ({}, {})", pattern.id, pattern.name, pattern.category);
        println!("  core:     {}", pattern.core_elements.join(", "));
        println!("  common:   {}", pattern.common_elements.join(", "));
        println!("  optional: {}", pattern.optional_elements.join(", "));
        println!("  anti:     {}", pattern.anti_elements.join(", "));
        for d in pattern.discriminators {
            println!(
                "  vs {}: favoured by [{}], opposed by [{}]",
                d.rival,
                d.favouring.join(", "),
                d.opposing.join(", ")
            );
        }
    }
}
