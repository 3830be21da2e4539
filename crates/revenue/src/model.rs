use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::CoverageScope;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Which of the two revenue ledgers a row or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Recurring,
    NonRecurring,
}

impl std::fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recurring => write!(f, "recurring"),
            Self::NonRecurring => write!(f, "non-recurring"),
        }
    }
}

/// One row of the recurring (subscription) ledger. Numeric cells stay raw;
/// coercion happens during aggregation.
#[derive(Debug, Clone, Default)]
pub struct RecurringRow {
    /// Business unit (company) column, when the ledger carries one.
    pub unit: Option<String>,
    pub identity: String,
    pub subscription_id: String,
    pub arr_amount: String,
    pub renewal_quarter: String,
    pub renewal_intent: String,
    pub projected_arr: String,
}

/// One row of the non-recurring ledger: a line item with four quarterly amounts.
#[derive(Debug, Clone, Default)]
pub struct NonRecurringRow {
    /// Display identity, possibly decorated as `"prefix <Name> suffix"`.
    pub identity: String,
    /// Explicit canonical identity; wins over bracket extraction when non-blank.
    pub canonical_identity: Option<String>,
    pub classification_tag: String,
    pub quarters: [String; 4],
}

/// Pre-loaded ledgers for one pipeline run. `None` means the ledger section
/// itself is absent, which is a hard error rather than "zero customers".
#[derive(Debug, Clone, Default)]
pub struct RevenueInput {
    pub recurring: Option<Vec<RecurringRow>>,
    pub nonrecurring: Option<Vec<NonRecurringRow>>,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionRecord {
    pub subscription_id: String,
    pub arr_amount: f64,
    pub renewal_quarter: String,
    pub renewal_intent: String,
    pub projected_arr: f64,
}

/// Recurring revenue grouped under one identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecurringAggregate {
    pub recurring_total: f64,
    /// Source order.
    pub subscriptions: Vec<SubscriptionRecord>,
}

pub type RecurringTotals = BTreeMap<String, RecurringAggregate>;
pub type NonRecurringTotals = BTreeMap<String, f64>;

// ---------------------------------------------------------------------------
// Merge + Coverage
// ---------------------------------------------------------------------------

/// A customer's merged revenue within one ranked population.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRevenueRecord {
    pub identity: String,
    pub recurring_total: f64,
    pub nonrecurring_total: f64,
    pub total: f64,
    pub rank: usize,
    pub percent_of_total: f64,
    pub subscriptions: Vec<SubscriptionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageSummary {
    pub grand_total: f64,
    pub cohort_size: usize,
    pub cohort_total: f64,
    pub coverage_fraction_target: f64,
    pub coverage_fraction_achieved: f64,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Rule id reported when no rule matched and the default tag was used.
pub const DEFAULT_RULE_ID: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub identity: String,
    pub tag: String,
    pub rule_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

impl ClassificationResult {
    pub fn is_default(&self) -> bool {
        self.rule_id == DEFAULT_RULE_ID && self.tier.is_none()
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitSummary {
    pub customer_count: usize,
    pub recurring_customers: usize,
    pub nonrecurring_customers: usize,
    pub grand_total: f64,
    pub recurring_total: f64,
    pub nonrecurring_total: f64,
    pub subscription_count: usize,
    pub projected_arr_total: f64,
    pub arr_growth: f64,
    pub at_risk_subscriptions: usize,
    pub at_risk_arr: f64,
    pub tag_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub unit: String,
    pub summary: UnitSummary,
    pub cohort: CoverageSummary,
    pub cohort_identities: Vec<String>,
    pub customers: Vec<CustomerRevenueRecord>,
    pub classifications: Vec<ClassificationResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub ruleset_version: String,
    pub scope: CoverageScope,
    pub coverage_fraction: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueReport {
    pub meta: RunMeta,
    pub units: Vec<UnitReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<UnitReport>,
}
