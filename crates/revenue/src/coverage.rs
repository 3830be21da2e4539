use serde::{Deserialize, Serialize};

use crate::error::RevenueError;
use crate::merge::grand_total;
use crate::model::{CoverageSummary, CustomerRevenueRecord};

/// Target share of revenue a cohort must reach, in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct CoverageFraction(f64);

impl CoverageFraction {
    pub const FULL: CoverageFraction = CoverageFraction(1.0);

    pub fn new(value: f64) -> Result<Self, RevenueError> {
        if value.is_finite() && value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(RevenueError::InvalidCoverageFraction(value))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for CoverageFraction {
    fn default() -> Self {
        Self(0.8)
    }
}

impl TryFrom<f64> for CoverageFraction {
    type Error = RevenueError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CoverageFraction> for f64 {
    fn from(fraction: CoverageFraction) -> f64 {
        fraction.0
    }
}

impl std::fmt::Display for CoverageFraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", (self.0 * 10_000.0).round() / 100.0)
    }
}

/// Minimal leading prefix of a ranked population that reaches the target.
#[derive(Debug, Clone, Copy)]
pub struct CoverageCohort<'a> {
    pub records: &'a [CustomerRevenueRecord],
    pub grand_total: f64,
    pub cumulative_total: f64,
    pub target: CoverageFraction,
}

impl<'a> CoverageCohort<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Share of the grand total the cohort actually covers; 0 for an empty
    /// population.
    pub fn coverage_achieved(&self) -> f64 {
        if self.grand_total > 0.0 {
            self.cumulative_total / self.grand_total
        } else {
            0.0
        }
    }

    pub fn identities(&self) -> Vec<String> {
        self.records.iter().map(|r| r.identity.clone()).collect()
    }

    pub fn summary(&self) -> CoverageSummary {
        CoverageSummary {
            grand_total: self.grand_total,
            cohort_size: self.len(),
            cohort_total: self.cumulative_total,
            coverage_fraction_target: self.target.get(),
            coverage_fraction_achieved: self.coverage_achieved(),
        }
    }
}

/// Walk `ranked` in order and stop at the first record whose inclusion brings
/// the running total to `target × grand_total`.
///
/// `ranked` must already be in rank order. A non-positive grand total yields
/// an empty cohort.
pub fn select_cohort(ranked: &[CustomerRevenueRecord], target: CoverageFraction) -> CoverageCohort<'_> {
    let grand = grand_total(ranked);
    let empty = CoverageCohort {
        records: &ranked[..0],
        grand_total: grand,
        cumulative_total: 0.0,
        target,
    };

    if grand <= 0.0 {
        return empty;
    }

    let threshold = target.get() * grand;
    let mut running = 0.0;
    for (i, record) in ranked.iter().enumerate() {
        running += record.total;
        if running >= threshold {
            return CoverageCohort {
                records: &ranked[..=i],
                grand_total: grand,
                cumulative_total: running,
                target,
            };
        }
    }

    // Not reached: the full walk sums to `grand`, which meets any target <= 1.
    CoverageCohort {
        records: ranked,
        grand_total: grand,
        cumulative_total: running,
        target,
    }
}
