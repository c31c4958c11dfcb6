#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod eigen;
pub mod fit;
pub mod io;
pub mod logratio;
pub mod progress;
pub mod quality;
pub mod stats;
pub mod types;

#[path = "../shared/config.rs"]
pub mod config;

#[path = "../classify/mod.rs"]
pub mod classify;

pub use fit::{run_pca, run_pca_with_progress, sorted_loadings};
pub use types::{CompositionRow, ElementMap, FullPcaResult, SortedLoading, ZeroStrategy};
