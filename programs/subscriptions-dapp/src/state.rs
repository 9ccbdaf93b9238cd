use anchor_lang::prelude::*;

use crate::constants::{MAX_DURATION_DAYS, MAX_PLAN_NAME_LEN, MAX_PLAN_PRICE, SECONDS_PER_DAY};
use crate::errors::SubscriptionsError;

/// A creator's subscription plan, one per `(creator, plan_id)`.
///
/// Seeds: `["creator", creator, plan_id.to_le_bytes()]`
///
/// Written once by `create_subscription_plan` and never mutated. Fixed-size
/// fields precede `name` so off-chain readers can filter on stable offsets.
#[account]
#[derive(InitSpace)]
pub struct Plan {
    /// Creator that owns the plan and receives every payment.
    pub creator: Pubkey,
    /// Caller-chosen identifier, unique per creator.
    pub plan_id: u64,
    /// Price in lamports paid once per subscription.
    pub price: u64,
    /// Validity window granted to each subscription.
    pub duration_days: u32,
    /// Unix timestamp of plan creation.
    pub created_at: i64,
    /// PDA bump seed cached for efficient re-derivation.
    pub bump: u8,
    /// Display name; non-blank.
    #[max_len(MAX_PLAN_NAME_LEN)]
    pub name: String,
}

impl Plan {
    /// Validate caller-supplied plan terms.
    pub fn validate_terms(name: &str, price: u64, duration_days: u32) -> Result<()> {
        require!(price > 0, SubscriptionsError::InvalidPrice);
        require!(price <= MAX_PLAN_PRICE, SubscriptionsError::PriceTooHigh);
        require!(duration_days > 0, SubscriptionsError::InvalidDuration);
        require!(
            duration_days <= MAX_DURATION_DAYS,
            SubscriptionsError::DurationTooLong
        );
        require!(!name.trim().is_empty(), SubscriptionsError::EmptyPlanName);
        require!(
            name.len() <= MAX_PLAN_NAME_LEN,
            SubscriptionsError::PlanNameTooLong
        );
        Ok(())
    }

    /// Expiry of a subscription to this plan that starts at `now`.
    pub fn expiry_from(&self, now: i64) -> Result<i64> {
        expiry_for(now, self.duration_days)
    }
}

/// Compute `created_at + duration_days * 86400` with overflow checks.
///
/// Zero durations are rejected here as well as at plan creation so that
/// `expires_at > created_at` holds for every stored subscription.
pub fn expiry_for(created_at: i64, duration_days: u32) -> Result<i64> {
    require!(duration_days > 0, SubscriptionsError::InvalidDuration);

    let duration_seconds = i64::from(duration_days)
        .checked_mul(SECONDS_PER_DAY)
        .ok_or(SubscriptionsError::MathOverflow)?;

    created_at
        .checked_add(duration_seconds)
        .ok_or_else(|| SubscriptionsError::MathOverflow.into())
}

/// A subscriber's paid relationship with one creator.
///
/// Seeds: `["subscription", subscriber, creator]`
///
/// Lifecycle: Active while `now < expires_at`, Expired afterwards. There is
/// no renewal and the record is never closed.
#[account]
#[derive(InitSpace)]
pub struct Subscription {
    /// The account that paid for the subscription.
    pub subscriber: Pubkey,
    /// The creator that received the payment.
    pub creator: Pubkey,
    /// Plan the subscriber paid for.
    pub plan_id: u64,
    /// Unix timestamp of the payment.
    pub created_at: i64,
    /// First instant at which the subscription is no longer valid.
    pub expires_at: i64,
    /// PDA bump seed cached for efficient re-derivation.
    pub bump: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Active,
    Expired,
}

impl Subscription {
    pub fn status_at(&self, now: i64) -> SubscriptionStatus {
        if now < self.expires_at {
            SubscriptionStatus::Active
        } else {
            SubscriptionStatus::Expired
        }
    }

    /// Access predicate: `Ok(true)` while active, `SubscriptionExpired` otherwise.
    pub fn ensure_active(&self, now: i64) -> Result<bool> {
        require!(
            self.status_at(now) == SubscriptionStatus::Active,
            SubscriptionsError::SubscriptionExpired
        );
        Ok(true)
    }
}
