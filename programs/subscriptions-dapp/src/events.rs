use anchor_lang::prelude::*;

/// Emitted when a creator registers a new plan.
///
/// `name` is last so the fixed-size prefix can be decoded at stable offsets.
#[event]
pub struct PlanCreated {
    pub creator: Pubkey,
    pub plan_id: u64,
    pub price: u64,
    pub duration_days: u32,
    pub created_at: i64,
    pub name: String,
}

/// Emitted when a subscriber pays for a plan and the subscription is written.
///
/// The off-chain gateway streams these from program logs and forwards them to
/// the configured webhook.
#[event]
pub struct Subscribed {
    pub subscriber: Pubkey,
    pub creator: Pubkey,
    pub plan_id: u64,
    pub price: u64,
    pub created_at: i64,
    pub expires_at: i64,
}
