use anchor_lang::prelude::*;
use anchor_lang::system_program;

use crate::constants::{PLAN_SEED, SUBSCRIPTION_SEED};
use crate::errors::SubscriptionsError;
use crate::events::Subscribed;
use crate::state::{Plan, Subscription};

/// Accounts required to subscribe to a plan.
///
/// The subscription PDA is keyed by `(subscriber, creator)` only, so a
/// subscriber holds at most one subscription per creator regardless of plan.
#[derive(Accounts)]
#[instruction(plan_id: u64, creator: Pubkey)]
pub struct Subscribe<'info> {
    /// The paying subscriber; funds the price and the subscription rent.
    #[account(mut)]
    pub subscriber: Signer<'info>,

    /// Plan being purchased. Seeds: `["creator", creator, plan_id.to_le_bytes()]`.
    #[account(
        seeds = [PLAN_SEED, creator.as_ref(), plan_id.to_le_bytes().as_ref()],
        bump = plan.bump,
    )]
    pub plan: Account<'info, Plan>,

    /// Payment recipient; must be the plan's creator.
    #[account(
        mut,
        address = plan.creator @ SubscriptionsError::CreatorMismatch,
    )]
    pub creator_account: SystemAccount<'info>,

    /// New subscription PDA. Seeds: `["subscription", subscriber, creator]`.
    #[account(
        init,
        payer = subscriber,
        space = 8 + Subscription::INIT_SPACE,
        seeds = [SUBSCRIPTION_SEED, subscriber.key().as_ref(), creator.as_ref()],
        bump,
    )]
    pub subscription: Account<'info, Subscription>,

    pub system_program: Program<'info, System>,
}

/// Check that a subscriber balance covers the plan price.
///
/// Called after `init` has already moved the subscription rent out of the
/// subscriber. What is left after paying `price` must be either nothing or at
/// least `rent_floor`, the rent-exempt minimum of an empty account; anything
/// in between would leave the subscriber rent-paying and the runtime would
/// reject the transaction.
pub fn ensure_covers_price(balance: u64, price: u64, rent_floor: u64) -> Result<()> {
    let remaining = balance
        .checked_sub(price)
        .ok_or(SubscriptionsError::InsufficientFunds)?;
    require!(
        remaining == 0 || remaining >= rent_floor,
        SubscriptionsError::InsufficientFunds
    );
    Ok(())
}

/// Charge the plan price and write the subscription.
///
/// 1. Rejects self-subscription and balances that cannot cover the price.
/// 2. Transfers `plan.price` lamports from `subscriber` to `creator_account`.
/// 3. Initializes the subscription with `expires_at = now + duration_days * 86400`.
/// 4. Emits [`Subscribed`].
///
/// Returns the subscription address. Any failure reverts the whole
/// transaction, including the rent paid by `init`.
pub fn handler(ctx: Context<Subscribe>, plan_id: u64, creator: Pubkey) -> Result<Pubkey> {
    let plan = &ctx.accounts.plan;
    let price = plan.price;

    require_keys_neq!(
        ctx.accounts.subscriber.key(),
        plan.creator,
        SubscriptionsError::CannotSubscribeToOwnPlan
    );

    let rent_floor = Rent::get()?.minimum_balance(0);
    ensure_covers_price(ctx.accounts.subscriber.lamports(), price, rent_floor)?;

    let created_at = Clock::get()?.unix_timestamp;
    let expires_at = plan.expiry_from(created_at)?;

    system_program::transfer(
        CpiContext::new(
            ctx.accounts.system_program.to_account_info(),
            system_program::Transfer {
                from: ctx.accounts.subscriber.to_account_info(),
                to: ctx.accounts.creator_account.to_account_info(),
            },
        ),
        price,
    )?;

    let subscriber = ctx.accounts.subscriber.key();
    let subscription = &mut ctx.accounts.subscription;
    subscription.subscriber = subscriber;
    subscription.creator = creator;
    subscription.plan_id = plan_id;
    subscription.created_at = created_at;
    subscription.expires_at = expires_at;
    subscription.bump = ctx.bumps.subscription;

    msg!(
        "Subscribed to plan {} of {} until {}",
        plan_id,
        creator,
        expires_at
    );

    emit!(Subscribed {
        subscriber,
        creator,
        plan_id,
        price,
        created_at,
        expires_at,
    });

    Ok(subscription.key())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREMIUM_PRICE: u64 = 500_000_000;
    const RENT_FLOOR: u64 = 890_880;

    fn rejected(result: Result<()>) -> bool {
        let expected: Error = SubscriptionsError::InsufficientFunds.into();
        result.unwrap_err() == expected
    }

    #[test]
    fn balance_equal_to_price_is_enough() {
        assert!(ensure_covers_price(PREMIUM_PRICE, PREMIUM_PRICE, RENT_FLOOR).is_ok());
        assert!(ensure_covers_price(10 * PREMIUM_PRICE, PREMIUM_PRICE, RENT_FLOOR).is_ok());
    }

    #[test]
    fn short_balance_is_insufficient_funds() {
        assert!(rejected(ensure_covers_price(100_000_000, PREMIUM_PRICE, RENT_FLOOR)));
        assert!(rejected(ensure_covers_price(PREMIUM_PRICE - 1, PREMIUM_PRICE, RENT_FLOOR)));
    }

    #[test]
    fn remainder_must_stay_rent_exempt() {
        assert!(rejected(ensure_covers_price(PREMIUM_PRICE + 1, PREMIUM_PRICE, RENT_FLOOR)));
        assert!(rejected(ensure_covers_price(
            PREMIUM_PRICE + RENT_FLOOR - 1,
            PREMIUM_PRICE,
            RENT_FLOOR
        )));
        assert!(ensure_covers_price(PREMIUM_PRICE + RENT_FLOOR, PREMIUM_PRICE, RENT_FLOOR).is_ok());
    }
}
