use anchor_lang::prelude::*;

/// Error codes for the subscriptions program.
///
/// Anchor encodes these as `6000 + variant index` in on-chain error responses.
/// Duplicate records are rejected before any handler runs: Anchor's `init`
/// fails with the system program's "already in use" error (custom code 0). A
/// missing plan or subscription fails account validation with
/// `AccountNotInitialized` (3012).
#[error_code]
pub enum SubscriptionsError {
    /// `now >= expires_at` on the checked subscription.
    #[msg("Subscription has expired")]
    SubscriptionExpired,
    #[msg("Price must be greater than 0")]
    InvalidPrice,
    #[msg("Price exceeds maximum allowed (1000 SOL)")]
    PriceTooHigh,
    #[msg("Duration must be at least 1 day")]
    InvalidDuration,
    #[msg("Duration exceeds maximum allowed (365 days)")]
    DurationTooLong,
    /// The name is empty or whitespace only.
    #[msg("Plan name cannot be empty")]
    EmptyPlanName,
    #[msg("Plan name exceeds maximum length (200 characters)")]
    PlanNameTooLong,
    #[msg("Cannot subscribe to your own plan")]
    CannotSubscribeToOwnPlan,
    /// The subscriber cannot cover the plan price on top of the subscription rent.
    #[msg("Insufficient funds to subscribe (need price + rent)")]
    InsufficientFunds,
    /// The passed creator account or argument differs from `plan.creator`.
    #[msg("Creator account mismatch")]
    CreatorMismatch,
    #[msg("Mathematical operation overflow")]
    MathOverflow,
}

/// System program `SystemError::AccountAlreadyInUse`.
const SYSTEM_ACCOUNT_ALREADY_IN_USE: u32 = 0;
/// System program `SystemError::ResultWithNegativeLamports`.
const SYSTEM_RESULT_WITH_NEGATIVE_LAMPORTS: u32 = 1;

/// Caller-facing classification of a failure.
///
/// None of the kinds is transient; clients surface them and never retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    AlreadyExists,
    NotFound,
    InsufficientFunds,
    Expired,
}

impl SubscriptionsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SubscriptionExpired => ErrorKind::Expired,
            Self::InsufficientFunds => ErrorKind::InsufficientFunds,
            Self::InvalidPrice
            | Self::PriceTooHigh
            | Self::InvalidDuration
            | Self::DurationTooLong
            | Self::EmptyPlanName
            | Self::PlanNameTooLong
            | Self::CannotSubscribeToOwnPlan
            | Self::CreatorMismatch
            | Self::MathOverflow => ErrorKind::InvalidArgument,
        }
    }
}

impl ErrorKind {
    /// Classify the custom error code of a failed transaction.
    ///
    /// Covers the program's own codes, the framework code that stands in for
    /// `NotFound`, and the two system program codes raised inside `init`:
    /// `AccountAlreadyInUse` (0) and `ResultWithNegativeLamports` (1).
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            SYSTEM_ACCOUNT_ALREADY_IN_USE => return Some(Self::AlreadyExists),
            SYSTEM_RESULT_WITH_NEGATIVE_LAMPORTS => return Some(Self::InsufficientFunds),
            _ => {}
        }
        if code == anchor_lang::error::ErrorCode::AccountNotInitialized as u32 {
            return Some(Self::NotFound);
        }
        let offset = code.checked_sub(anchor_lang::error::ERROR_CODE_OFFSET)?;
        let variant = match offset {
            0 => SubscriptionsError::SubscriptionExpired,
            1 => SubscriptionsError::InvalidPrice,
            2 => SubscriptionsError::PriceTooHigh,
            3 => SubscriptionsError::InvalidDuration,
            4 => SubscriptionsError::DurationTooLong,
            5 => SubscriptionsError::EmptyPlanName,
            6 => SubscriptionsError::PlanNameTooLong,
            7 => SubscriptionsError::CannotSubscribeToOwnPlan,
            8 => SubscriptionsError::InsufficientFunds,
            9 => SubscriptionsError::CreatorMismatch,
            10 => SubscriptionsError::MathOverflow,
            _ => return None,
        };
        Some(variant.kind())
    }
}
