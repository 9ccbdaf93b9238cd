use anchor_lang::prelude::*;

pub mod constants;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod state;

use instructions::*;

declare_id!("8hSScVud3dY7iV2r4aGDFBduXAZh5j31X3P8GnCaznZd");

/// Creator subscription plans with paid, time-bounded access.
///
/// A creator registers a plan once per `(creator, plan_id)`. A subscriber pays
/// the plan price straight to the creator and receives a subscription record
/// that is valid for the plan's duration. Anyone can ask the program whether a
/// subscription is still active.
///
/// ## Lifecycle
///
/// 1. **Create plan** — the creator calls `create_subscription_plan`; a plan
///    PDA is allocated at `["creator", creator, plan_id_le]`.
/// 2. **Subscribe** — the subscriber calls `subscribe`; `price` lamports move
///    to the creator and a subscription PDA is allocated at
///    `["subscription", subscriber, creator]`.
/// 3. **Check** — any caller simulates `check_subscription`; it returns `true`
///    while the subscription is active and fails once it has expired.
#[program]
pub mod subscriptions_dapp {
    use super::*;

    /// Register a new plan for the signing creator and return its address.
    ///
    /// Fails if a plan already exists for `(creator, plan_id)`.
    pub fn create_subscription_plan(
        ctx: Context<CreateSubscriptionPlan>,
        plan_id: u64,
        name: String,
        price: u64,
        duration_days: u32,
    ) -> Result<Pubkey> {
        instructions::create_plan::handler(ctx, plan_id, name, price, duration_days)
    }

    /// Pay for and activate a subscription to `creator`'s plan `plan_id`,
    /// returning the subscription address.
    ///
    /// One subscription per `(subscriber, creator)`; a second call for the
    /// same pair fails even when it targets a different plan.
    pub fn subscribe(ctx: Context<Subscribe>, plan_id: u64, creator: Pubkey) -> Result<Pubkey> {
        instructions::subscribe::handler(ctx, plan_id, creator)
    }

    /// Report whether a subscription is active.
    ///
    /// Returns `true` before `expires_at` and fails with
    /// `SubscriptionExpired` at or after it.
    pub fn check_subscription(ctx: Context<CheckSubscription>) -> Result<bool> {
        instructions::check_subscription::handler(ctx)
    }
}
