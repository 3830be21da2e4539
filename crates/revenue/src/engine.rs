use crate::aggregate::{aggregate_nonrecurring, aggregate_recurring};
use crate::classify::Classifier;
use crate::config::{CoverageScope, PipelineConfig, UnitConfig};
use crate::coverage::{select_cohort, CoverageFraction};
use crate::error::{RevenueError, RevenueResult};
use crate::merge::{combine_nonrecurring, combine_recurring, merge_ranked};
use crate::model::{
    LedgerKind, NonRecurringRow, NonRecurringTotals, RecurringRow, RecurringTotals, RevenueInput,
    RevenueReport, RunMeta, UnitReport,
};
use crate::summary::compute_summary;

/// Name of the combined report produced for `scope = "portfolio"`.
pub const PORTFOLIO_UNIT: &str = "portfolio";

/// Aggregator outputs for one business unit.
#[derive(Debug, Clone, Default)]
pub struct UnitTotals {
    pub recurring: RecurringTotals,
    pub nonrecurring: NonRecurringTotals,
}

/// Run the pipeline for every configured unit (and the portfolio, when
/// scoped so). Fails only when a ledger is absent from `input`.
pub fn run(
    config: &PipelineConfig,
    classifier: &Classifier,
    input: &RevenueInput,
) -> RevenueResult<RevenueReport> {
    let recurring_rows = input.recurring.as_deref().ok_or(RevenueError::MissingLedger {
        ledger: LedgerKind::Recurring,
    })?;
    let nonrecurring_rows = input.nonrecurring.as_deref().ok_or(RevenueError::MissingLedger {
        ledger: LedgerKind::NonRecurring,
    })?;

    let mut all_totals = Vec::with_capacity(config.units.len());
    let mut units = Vec::with_capacity(config.units.len());

    for unit in &config.units {
        let totals = aggregate_unit(unit, recurring_rows, nonrecurring_rows);
        let report = build_report(
            &unit.name,
            Some(&unit.name),
            &totals,
            config.coverage_fraction,
            classifier,
            &config.renewal.at_risk_markers,
        );
        if report.customers.is_empty() {
            log::warn!(
                "unit '{}': no customers (company '{}', class filter '{}')",
                unit.name,
                unit.company(),
                unit.class_filter()
            );
        }
        units.push(report);
        all_totals.push(totals);
    }

    let portfolio = match config.scope {
        CoverageScope::Unit => None,
        CoverageScope::Portfolio => {
            let combined = UnitTotals {
                recurring: combine_recurring(all_totals.iter().map(|t| &t.recurring)),
                nonrecurring: combine_nonrecurring(all_totals.iter().map(|t| &t.nonrecurring)),
            };
            Some(build_report(
                PORTFOLIO_UNIT,
                None,
                &combined,
                config.coverage_fraction,
                classifier,
                &config.renewal.at_risk_markers,
            ))
        }
    };

    Ok(RevenueReport {
        meta: RunMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            ruleset_version: classifier.version().to_string(),
            scope: config.scope,
            coverage_fraction: config.coverage_fraction.get(),
        },
        units,
        portfolio,
    })
}

/// Scope both ledgers to one unit and aggregate them.
pub fn aggregate_unit(
    unit: &UnitConfig,
    recurring_rows: &[RecurringRow],
    nonrecurring_rows: &[NonRecurringRow],
) -> UnitTotals {
    let company = unit.company();
    let in_unit = |row: &&RecurringRow| row.unit.as_deref().map_or(true, |u| u == company);

    UnitTotals {
        recurring: aggregate_recurring(recurring_rows.iter().filter(in_unit)),
        nonrecurring: aggregate_nonrecurring(nonrecurring_rows, unit.class_filter()),
    }
}

/// Merge, rank, select the cohort, classify and summarize one population.
pub fn build_report(
    name: &str,
    unit_hint: Option<&str>,
    totals: &UnitTotals,
    fraction: CoverageFraction,
    classifier: &Classifier,
    at_risk_markers: &[String],
) -> UnitReport {
    let customers = merge_ranked(&totals.recurring, &totals.nonrecurring);
    let cohort = select_cohort(&customers, fraction);
    let cohort_summary = cohort.summary();
    let cohort_identities = cohort.identities();

    let classifications =
        classifier.classify_all(customers.iter().map(|c| c.identity.as_str()), unit_hint);
    let summary = compute_summary(&customers, &classifications, at_risk_markers);

    log::info!(
        "{name}: {} customers, grand total {:.2}, cohort {} covering {:.1}% (target {fraction})",
        customers.len(),
        cohort_summary.grand_total,
        cohort_summary.cohort_size,
        cohort_summary.coverage_fraction_achieved * 100.0,
    );

    UnitReport {
        unit: name.to_string(),
        summary,
        cohort: cohort_summary,
        cohort_identities,
        customers,
        classifications,
    }
}
