//! Off-chain access check mirroring the program's `check_subscription`.
//!
//! The outcome depends only on the stored subscription and the current time.
//! A missing record and an expired record are distinct errors; only an active
//! subscription yields `Ok(true)`.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::error;

use crate::accounts::SubscriptionAccount;

/// Source of the current Unix time in seconds.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall-clock time.
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> i64 {
        unix_seconds(SystemTime::now())
    }
}

/// Seconds since the Unix epoch.
///
/// A clock set before the epoch saturates to `i64::MAX`, so every
/// subscription reads as expired rather than active.
fn unix_seconds(at: SystemTime) -> i64 {
    match at.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX),
        Err(e) => {
            error!(behind = ?e.duration(), "System clock is before the Unix epoch, denying access");
            i64::MAX
        }
    }
}

/// A clock frozen at a given instant.
#[cfg(test)]
pub struct FixedClock(pub i64);

#[cfg(test)]
impl TimeSource for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Active,
    Expired,
}

impl SubscriptionStatus {
    pub fn at(subscription: &SubscriptionAccount, now: i64) -> Self {
        if now < subscription.expires_at {
            Self::Active
        } else {
            Self::Expired
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
        }
    }
}

/// Why access was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    /// No subscription exists for the (subscriber, creator) pair.
    NotFound,
    /// The subscription exists but `now >= expires_at`.
    Expired { expires_at: i64 },
}

impl AccessError {
    /// Machine-readable kind exposed in API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Expired { .. } => "expired",
        }
    }
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "Subscription not found"),
            Self::Expired { expires_at } => write!(f, "Subscription has expired (at {expires_at})"),
        }
    }
}

impl std::error::Error for AccessError {}

/// Evaluate access for an optional subscription record at time `now`.
pub fn check_access(
    subscription: Option<&SubscriptionAccount>,
    now: i64,
) -> Result<bool, AccessError> {
    let subscription = subscription.ok_or(AccessError::NotFound)?;
    match SubscriptionStatus::at(subscription, now) {
        SubscriptionStatus::Active => Ok(true),
        SubscriptionStatus::Expired => Err(AccessError::Expired {
            expires_at: subscription.expires_at,
        }),
    }
}

/// Seconds of validity left, zero once expired.
pub fn seconds_remaining(subscription: &SubscriptionAccount, now: i64) -> i64 {
    subscription.expires_at.saturating_sub(now).max(0)
}
