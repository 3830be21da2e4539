use crate::classify::tag_counts;
use crate::merge::grand_total;
use crate::model::{ClassificationResult, CustomerRevenueRecord, SubscriptionRecord, UnitSummary};

/// True when the renewal-intent cell contains any at-risk marker.
pub fn is_at_risk(subscription: &SubscriptionRecord, markers: &[String]) -> bool {
    markers
        .iter()
        .any(|m| subscription.renewal_intent.contains(m.as_str()))
}

/// Roll up a ranked population into unit-level statistics.
pub fn compute_summary(
    records: &[CustomerRevenueRecord],
    classifications: &[ClassificationResult],
    at_risk_markers: &[String],
) -> UnitSummary {
    let mut recurring_customers = 0;
    let mut nonrecurring_customers = 0;
    let mut recurring_total = 0.0;
    let mut nonrecurring_total = 0.0;
    let mut subscription_count = 0;
    let mut projected_arr_total = 0.0;
    let mut at_risk_subscriptions = 0;
    let mut at_risk_arr = 0.0;

    for r in records {
        if !r.subscriptions.is_empty() {
            recurring_customers += 1;
        }
        if r.nonrecurring_total != 0.0 {
            nonrecurring_customers += 1;
        }
        recurring_total += r.recurring_total;
        nonrecurring_total += r.nonrecurring_total;

        for s in &r.subscriptions {
            subscription_count += 1;
            projected_arr_total += s.projected_arr;
            if is_at_risk(s, at_risk_markers) {
                at_risk_subscriptions += 1;
                at_risk_arr += s.arr_amount;
            }
        }
    }

    UnitSummary {
        customer_count: records.len(),
        recurring_customers,
        nonrecurring_customers,
        grand_total: grand_total(records),
        recurring_total,
        nonrecurring_total,
        subscription_count,
        projected_arr_total,
        arr_growth: projected_arr_total - recurring_total,
        at_risk_subscriptions,
        at_risk_arr,
        tag_counts: tag_counts(classifications),
    }
}
