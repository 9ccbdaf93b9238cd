use anchor_lang::prelude::*;

/// Seed prefix for plan PDAs: `["creator", creator, plan_id_le]`.
#[constant]
pub const PLAN_SEED: &[u8] = b"creator";

/// Seed prefix for subscription PDAs: `["subscription", subscriber, creator]`.
#[constant]
pub const SUBSCRIPTION_SEED: &[u8] = b"subscription";

/// Upper bound on a plan price: 1000 SOL.
pub const MAX_PLAN_PRICE: u64 = 1_000_000_000_000;

pub const MAX_DURATION_DAYS: u32 = 365;

/// Maximum plan name length in bytes.
pub const MAX_PLAN_NAME_LEN: usize = 200;

pub const SECONDS_PER_DAY: i64 = 86_400;
