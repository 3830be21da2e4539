//! `revcohort-revenue`: recurring / non-recurring revenue reconciliation.
//!
//! Pure engine crate: receives pre-loaded ledger rows, returns ranked
//! customers, minimal coverage cohorts and keyword classifications per
//! business unit. The `load` module is the one file-backed row source.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod coverage;
pub mod engine;
pub mod error;
pub mod load;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod summary;

pub use classify::{Classifier, RuleSet};
pub use config::PipelineConfig;
pub use coverage::{select_cohort, CoverageCohort, CoverageFraction};
pub use engine::run;
pub use error::{RevenueError, RevenueResult};
pub use model::{CustomerRevenueRecord, RevenueInput, RevenueReport};
