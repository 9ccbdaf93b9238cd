//! Per-plan statistics recomputed on every read.

use std::collections::HashMap;

use solana_sdk::pubkey::Pubkey;

use crate::access::SubscriptionStatus;
use crate::accounts::{PlanAccount, SubscriptionAccount};

/// A plan with the subscription counts derived from the current ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub plan: PlanAccount,
    /// Subscriptions ever written for this plan.
    pub subscriber_count: u64,
    /// Subscriptions still active at the summary's `now`.
    pub active_count: u64,
    /// `price * subscriber_count`, in lamports.
    pub lamports_earned: u64,
}

/// Join plans with their subscriptions, most-subscribed first.
///
/// Ties keep the older plan first. Subscriptions whose plan is not in `plans`
/// are ignored.
pub fn summarize(
    plans: Vec<PlanAccount>,
    subscriptions: &[SubscriptionAccount],
    now: i64,
) -> Vec<PlanSummary> {
    let mut counts: HashMap<(Pubkey, u64), (u64, u64)> = HashMap::new();
    for sub in subscriptions {
        let entry = counts.entry((sub.creator, sub.plan_id)).or_default();
        entry.0 += 1;
        if SubscriptionStatus::at(sub, now) == SubscriptionStatus::Active {
            entry.1 += 1;
        }
    }

    let mut summaries: Vec<PlanSummary> = plans
        .into_iter()
        .map(|plan| {
            let (subscriber_count, active_count) = counts
                .get(&(plan.creator, plan.plan_id))
                .copied()
                .unwrap_or_default();
            PlanSummary {
                lamports_earned: plan.price.saturating_mul(subscriber_count),
                subscriber_count,
                active_count,
                plan,
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.subscriber_count
            .cmp(&a.subscriber_count)
            .then(a.plan.created_at.cmp(&b.plan.created_at))
    });
    summaries
}
