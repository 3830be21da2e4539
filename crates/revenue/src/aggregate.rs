use crate::model::{
    NonRecurringRow, NonRecurringTotals, RecurringRow, RecurringTotals, SubscriptionRecord,
};
use crate::normalize::{coerce_amount, is_blank, resolve_identity};

/// Group recurring rows by identity, sum ARR, keep subscriptions in source order.
///
/// Rows with a blank identity are dropped.
pub fn aggregate_recurring<'a>(rows: impl IntoIterator<Item = &'a RecurringRow>) -> RecurringTotals {
    let mut groups = RecurringTotals::new();
    let mut dropped = 0usize;

    for row in rows {
        if is_blank(&row.identity) {
            dropped += 1;
            continue;
        }

        let subscription = SubscriptionRecord {
            subscription_id: row.subscription_id.clone(),
            arr_amount: coerce_amount(&row.arr_amount),
            renewal_quarter: row.renewal_quarter.clone(),
            renewal_intent: row.renewal_intent.clone(),
            projected_arr: coerce_amount(&row.projected_arr),
        };

        let entry = groups.entry(row.identity.clone()).or_default();
        entry.recurring_total += subscription.arr_amount;
        entry.subscriptions.push(subscription);
    }

    if dropped > 0 {
        log::debug!("recurring: dropped {dropped} row(s) with blank identity");
    }

    groups
}

/// Group non-recurring line items whose classification tag contains
/// `class_filter`, summing the four quarterly amounts per identity.
pub fn aggregate_nonrecurring<'a>(
    rows: impl IntoIterator<Item = &'a NonRecurringRow>,
    class_filter: &str,
) -> NonRecurringTotals {
    let mut totals = NonRecurringTotals::new();
    let mut dropped = 0usize;

    for row in rows {
        if row.classification_tag.is_empty() || !row.classification_tag.contains(class_filter) {
            continue;
        }

        let Some(identity) = resolve_identity(&row.identity, row.canonical_identity.as_deref())
        else {
            dropped += 1;
            continue;
        };

        let amount: f64 = row.quarters.iter().map(|q| coerce_amount(q)).sum();
        *totals.entry(identity).or_insert(0.0) += amount;
    }

    if dropped > 0 {
        log::debug!("non-recurring '{class_filter}': dropped {dropped} row(s) with blank identity");
    }

    totals
}
