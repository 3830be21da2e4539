use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::coverage::CoverageFraction;
use crate::error::{RevenueError, RevenueResult};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    #[serde(default)]
    pub coverage_fraction: CoverageFraction,
    #[serde(default)]
    pub scope: CoverageScope,
    pub ledgers: LedgersConfig,
    #[serde(default)]
    pub units: Vec<UnitConfig>,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub renewal: RenewalConfig,
}

/// Population a coverage cohort is drawn from.
///
/// `Unit` selects one cohort per business unit. `Portfolio` additionally
/// combines every unit and selects one global cohort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageScope {
    #[default]
    Unit,
    Portfolio,
}

impl std::fmt::Display for CoverageScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unit => write!(f, "unit"),
            Self::Portfolio => write!(f, "portfolio"),
        }
    }
}

// ---------------------------------------------------------------------------
// Ledgers + column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LedgersConfig {
    pub recurring: RecurringLedgerConfig,
    pub nonrecurring: NonRecurringLedgerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecurringLedgerConfig {
    pub file: String,
    pub columns: RecurringColumns,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecurringColumns {
    /// Company / business-unit column. Required when more than one unit is configured.
    #[serde(default)]
    pub unit: Option<String>,
    pub identity: String,
    pub subscription_id: String,
    pub arr_amount: String,
    pub renewal_quarter: String,
    pub renewal_intent: String,
    pub projected_arr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NonRecurringLedgerConfig {
    pub file: String,
    pub columns: NonRecurringColumns,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NonRecurringColumns {
    pub identity: String,
    #[serde(default)]
    pub canonical_identity: Option<String>,
    pub classification_tag: String,
    pub q1_amount: String,
    pub q2_amount: String,
    pub q3_amount: String,
    pub q4_amount: String,
}

impl RecurringColumns {
    fn names(&self) -> Vec<&str> {
        let mut names = vec![
            self.identity.as_str(),
            self.subscription_id.as_str(),
            self.arr_amount.as_str(),
            self.renewal_quarter.as_str(),
            self.renewal_intent.as_str(),
            self.projected_arr.as_str(),
        ];
        names.extend(self.unit.as_deref());
        names
    }
}

impl NonRecurringColumns {
    fn names(&self) -> Vec<&str> {
        let mut names = vec![
            self.identity.as_str(),
            self.classification_tag.as_str(),
            self.q1_amount.as_str(),
            self.q2_amount.as_str(),
            self.q3_amount.as_str(),
            self.q4_amount.as_str(),
        ];
        names.extend(self.canonical_identity.as_deref());
        names
    }

    pub fn quarters(&self) -> [&str; 4] {
        [
            self.q1_amount.as_str(),
            self.q2_amount.as_str(),
            self.q3_amount.as_str(),
            self.q4_amount.as_str(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct UnitConfig {
    pub name: String,
    /// Value of the recurring ledger's unit column. Defaults to `name`.
    #[serde(default)]
    pub company: Option<String>,
    /// Substring required in the non-recurring classification tag. Defaults to `name`.
    #[serde(default)]
    pub class_filter: Option<String>,
}

impl UnitConfig {
    pub fn company(&self) -> &str {
        self.company.as_deref().unwrap_or(&self.name)
    }

    pub fn class_filter(&self) -> &str {
        self.class_filter.as_deref().unwrap_or(&self.name)
    }
}

// ---------------------------------------------------------------------------
// Classifier + Renewal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClassifierConfig {
    /// Rule set TOML path, relative to the config file. Built-in regions when absent.
    #[serde(default)]
    pub rules: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenewalConfig {
    /// Substrings of the renewal-intent cell that flag a subscription at risk.
    #[serde(default = "default_at_risk_markers")]
    pub at_risk_markers: Vec<String>,
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            at_risk_markers: default_at_risk_markers(),
        }
    }
}

fn default_at_risk_markers() -> Vec<String> {
    vec!["No".into(), "SF".into()]
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> RevenueResult<Self> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| RevenueError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RevenueResult<()> {
        if self.units.is_empty() {
            return Err(RevenueError::ConfigValidation(
                "at least one [[units]] entry is required".into(),
            ));
        }

        let mut names = HashSet::new();
        for unit in &self.units {
            if unit.name.trim().is_empty() {
                return Err(RevenueError::ConfigValidation("unit name must not be empty".into()));
            }
            if !names.insert(unit.name.as_str()) {
                return Err(RevenueError::ConfigValidation(format!(
                    "duplicate unit '{}'",
                    unit.name
                )));
            }
            if unit.company().trim().is_empty() || unit.class_filter().trim().is_empty() {
                return Err(RevenueError::ConfigValidation(format!(
                    "unit '{}': company and class_filter must not be empty",
                    unit.name
                )));
            }
        }

        let recurring = &self.ledgers.recurring.columns;
        if recurring.unit.is_none() && self.units.len() > 1 {
            return Err(RevenueError::ConfigValidation(
                "ledgers.recurring.columns.unit is required when more than one unit is configured"
                    .into(),
            ));
        }

        let blank_column = recurring
            .names()
            .into_iter()
            .map(|c| ("recurring", c))
            .chain(
                self.ledgers
                    .nonrecurring
                    .columns
                    .names()
                    .into_iter()
                    .map(|c| ("nonrecurring", c)),
            )
            .find(|(_, c)| c.trim().is_empty());
        if let Some((ledger, _)) = blank_column {
            return Err(RevenueError::ConfigValidation(format!(
                "ledgers.{ledger}: column names must not be empty"
            )));
        }

        if self.renewal.at_risk_markers.iter().any(|m| m.is_empty()) {
            return Err(RevenueError::ConfigValidation(
                "renewal.at_risk_markers must not contain empty strings".into(),
            ));
        }

        Ok(())
    }

    pub fn unit(&self, name: &str) -> Option<&UnitConfig> {
        self.units.iter().find(|u| u.name == name)
    }

    /// Drop every unit except `name`.
    pub fn restrict_to_unit(&mut self, name: &str) -> RevenueResult<()> {
        if self.unit(name).is_none() {
            let known: Vec<&str> = self.units.iter().map(|u| u.name.as_str()).collect();
            return Err(RevenueError::ConfigValidation(format!(
                "unknown unit '{name}' (configured: {})",
                known.join(", ")
            )));
        }
        self.units.retain(|u| u.name == name);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
