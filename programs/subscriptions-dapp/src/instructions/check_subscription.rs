use anchor_lang::prelude::*;

use crate::state::Subscription;

/// Accounts required to check a subscription.
///
/// Read-only; clients call this through simulation (`.view()`). A missing
/// account fails deserialization with `AccountNotInitialized`.
#[derive(Accounts)]
pub struct CheckSubscription<'info> {
    pub subscription: Account<'info, Subscription>,
}

/// Return `true` while the subscription is active, fail once it has expired.
pub fn handler(ctx: Context<CheckSubscription>) -> Result<bool> {
    let now = Clock::get()?.unix_timestamp;
    ctx.accounts.subscription.ensure_active(now)
}
