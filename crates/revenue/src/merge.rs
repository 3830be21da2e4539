use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::model::{CustomerRevenueRecord, NonRecurringTotals, RecurringTotals};

/// Union recurring and non-recurring totals into a ranked customer list.
///
/// A customer seen on only one side gets 0 on the other.
pub fn merge_ranked(
    recurring: &RecurringTotals,
    nonrecurring: &NonRecurringTotals,
) -> Vec<CustomerRevenueRecord> {
    let identities: BTreeSet<&String> = recurring.keys().chain(nonrecurring.keys()).collect();

    let mut records: Vec<CustomerRevenueRecord> = identities
        .into_iter()
        .map(|identity| {
            let (recurring_total, subscriptions) = recurring
                .get(identity)
                .map(|agg| (agg.recurring_total, agg.subscriptions.clone()))
                .unwrap_or((0.0, Vec::new()));
            let nonrecurring_total = nonrecurring.get(identity).copied().unwrap_or(0.0);

            CustomerRevenueRecord {
                identity: identity.clone(),
                recurring_total,
                nonrecurring_total,
                total: recurring_total + nonrecurring_total,
                rank: 0,
                percent_of_total: 0.0,
                subscriptions,
            }
        })
        .collect();

    rerank(&mut records);
    records
}

/// Total descending, then identity ascending.
pub fn rank_order(a: &CustomerRevenueRecord, b: &CustomerRevenueRecord) -> Ordering {
    b.total
        .total_cmp(&a.total)
        .then_with(|| a.identity.cmp(&b.identity))
}

/// Sum of `total` over the population, accumulated in slice order.
pub fn grand_total(records: &[CustomerRevenueRecord]) -> f64 {
    records.iter().map(|r| r.total).sum()
}

/// Sort a population into rank order and recompute `rank` and
/// `percent_of_total` for every member.
pub fn rerank(records: &mut [CustomerRevenueRecord]) {
    records.sort_by(rank_order);

    let grand = grand_total(records);
    for (i, record) in records.iter_mut().enumerate() {
        record.rank = i + 1;
        record.percent_of_total = if grand == 0.0 {
            0.0
        } else {
            record.total / grand * 100.0
        };
    }
}

/// Union several units' recurring totals. Subscriptions are concatenated in
/// the order the units are given.
pub fn combine_recurring<'a>(parts: impl IntoIterator<Item = &'a RecurringTotals>) -> RecurringTotals {
    let mut combined = RecurringTotals::new();
    for part in parts {
        for (identity, agg) in part {
            let entry = combined.entry(identity.clone()).or_default();
            entry.recurring_total += agg.recurring_total;
            entry.subscriptions.extend(agg.subscriptions.iter().cloned());
        }
    }
    combined
}

pub fn combine_nonrecurring<'a>(
    parts: impl IntoIterator<Item = &'a NonRecurringTotals>,
) -> NonRecurringTotals {
    let mut combined = NonRecurringTotals::new();
    for part in parts {
        for (identity, amount) in part {
            *combined.entry(identity.clone()).or_insert(0.0) += amount;
        }
    }
    combined
}
