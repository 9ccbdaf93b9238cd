use anchor_lang::prelude::*;

use crate::constants::PLAN_SEED;
use crate::events::PlanCreated;
use crate::state::Plan;

/// Accounts required to register a plan.
///
/// The plan PDA is keyed by `(creator, plan_id)`; a second registration of
/// the same pair fails inside `init` because the address is already in use.
#[derive(Accounts)]
#[instruction(plan_id: u64)]
pub struct CreateSubscriptionPlan<'info> {
    /// New plan PDA. Seeds: `["creator", creator, plan_id.to_le_bytes()]`.
    #[account(
        init,
        payer = creator,
        space = 8 + Plan::INIT_SPACE,
        seeds = [PLAN_SEED, creator.key().as_ref(), plan_id.to_le_bytes().as_ref()],
        bump,
    )]
    pub plan: Account<'info, Plan>,

    /// Owner and beneficiary of the plan; pays the plan account's rent.
    #[account(mut)]
    pub creator: Signer<'info>,

    pub system_program: Program<'info, System>,
}

/// Validate the terms and write the plan. Returns the plan address.
pub fn handler(
    ctx: Context<CreateSubscriptionPlan>,
    plan_id: u64,
    name: String,
    price: u64,
    duration_days: u32,
) -> Result<Pubkey> {
    Plan::validate_terms(&name, price, duration_days)?;

    let created_at = Clock::get()?.unix_timestamp;

    let plan = &mut ctx.accounts.plan;
    plan.creator = ctx.accounts.creator.key();
    plan.plan_id = plan_id;
    plan.price = price;
    plan.duration_days = duration_days;
    plan.created_at = created_at;
    plan.bump = ctx.bumps.plan;
    plan.name = name;

    msg!("Plan {} created at {}", plan_id, plan.key());

    emit!(PlanCreated {
        creator: plan.creator,
        plan_id,
        price,
        duration_days,
        created_at,
        name: plan.name.clone(),
    });

    Ok(plan.key())
}
