//! End-to-end instruction tests against the compiled program in LiteSVM.
//!
//! Build the program first (`cargo build-sbf` or `anchor build`) so that
//! `target/deploy/subscriptions_dapp.so` exists; without it each test reports
//! the missing artifact and returns early.

use anchor_lang::{AccountDeserialize, InstructionData, Space, ToAccountMetas, system_program};
use litesvm::LiteSVM;
use litesvm::types::TransactionMetadata;
use solana_sdk::clock::Clock;
use solana_sdk::instruction::{Instruction, InstructionError};
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::{Transaction, TransactionError};

use subscriptions_dapp::constants::{PLAN_SEED, SUBSCRIPTION_SEED};
use subscriptions_dapp::errors::{ErrorKind, SubscriptionsError};
use subscriptions_dapp::state::{Plan, Subscription};

const PROGRAM_SO: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../target/deploy/subscriptions_dapp.so"
);

const SOL: u64 = 1_000_000_000;
const PREMIUM_PRICE: u64 = 500_000_000;
const THIRTY_DAYS: i64 = 2_592_000;
const LAUNCH: i64 = 1_700_000_000;

struct Harness {
    svm: LiteSVM,
    /// Pays every transaction fee so balance checks only see program effects.
    fee_payer: Keypair,
}

impl Harness {
    fn new() -> Option<Self> {
        let mut svm = LiteSVM::new();
        if let Err(e) = svm.add_program_from_file(subscriptions_dapp::ID, PROGRAM_SO) {
            eprintln!("program artifact {PROGRAM_SO} not loadable ({e}); build it with `cargo build-sbf`");
            return None;
        }
        let fee_payer = Keypair::new();
        svm.airdrop(&fee_payer.pubkey(), 100 * SOL).unwrap();

        let mut harness = Self { svm, fee_payer };
        harness.set_time(LAUNCH);
        Some(harness)
    }

    fn funded(&mut self, lamports: u64) -> Keypair {
        let keypair = Keypair::new();
        self.svm.airdrop(&keypair.pubkey(), lamports).unwrap();
        keypair
    }

    fn set_time(&mut self, unix_timestamp: i64) {
        let mut clock = self.svm.get_sysvar::<Clock>();
        clock.unix_timestamp = unix_timestamp;
        self.svm.set_sysvar(&clock);
    }

    fn send(
        &mut self,
        ix: Instruction,
        signers: &[&Keypair],
    ) -> Result<TransactionMetadata, TransactionError> {
        self.svm.expire_blockhash();
        let mut all_signers = vec![&self.fee_payer];
        all_signers.extend_from_slice(signers);
        let message = Message::new(&[ix], Some(&self.fee_payer.pubkey()));
        let tx = Transaction::new(&all_signers, message, self.svm.latest_blockhash());
        self.svm.send_transaction(tx).map_err(|failed| failed.err)
    }

    fn balance(&self, address: &Pubkey) -> u64 {
        self.svm.get_balance(address).unwrap_or(0)
    }

    fn fetch<T: AccountDeserialize>(&self, address: &Pubkey) -> Option<T> {
        let account = self.svm.get_account(address)?;
        T::try_deserialize(&mut account.data.as_slice()).ok()
    }

    fn subscription_rent(&self) -> u64 {
        self.svm
            .minimum_balance_for_rent_exemption(8 + Subscription::INIT_SPACE)
    }

    fn create_plan(
        &mut self,
        creator: &Keypair,
        plan_id: u64,
        name: &str,
    ) -> Result<TransactionMetadata, TransactionError> {
        let ix = create_plan_ix(&creator.pubkey(), plan_id, name, PREMIUM_PRICE, 30);
        self.send(ix, &[creator])
    }

    fn subscribe(
        &mut self,
        subscriber: &Keypair,
        creator: &Pubkey,
        plan_id: u64,
    ) -> Result<TransactionMetadata, TransactionError> {
        let ix = subscribe_ix(&subscriber.pubkey(), creator, creator, plan_id);
        self.send(ix, &[subscriber])
    }

    fn check(&mut self, subscription: &Pubkey) -> Result<TransactionMetadata, TransactionError> {
        self.send(check_ix(subscription), &[])
    }
}

fn plan_address(creator: &Pubkey, plan_id: u64) -> Pubkey {
    Pubkey::find_program_address(
        &[PLAN_SEED, creator.as_ref(), &plan_id.to_le_bytes()],
        &subscriptions_dapp::ID,
    )
    .0
}

fn subscription_address(subscriber: &Pubkey, creator: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[SUBSCRIPTION_SEED, subscriber.as_ref(), creator.as_ref()],
        &subscriptions_dapp::ID,
    )
    .0
}

fn create_plan_ix(
    creator: &Pubkey,
    plan_id: u64,
    name: &str,
    price: u64,
    duration_days: u32,
) -> Instruction {
    Instruction {
        program_id: subscriptions_dapp::ID,
        accounts: subscriptions_dapp::accounts::CreateSubscriptionPlan {
            plan: plan_address(creator, plan_id),
            creator: *creator,
            system_program: system_program::ID,
        }
        .to_account_metas(None),
        data: subscriptions_dapp::instruction::CreateSubscriptionPlan {
            plan_id,
            name: name.to_string(),
            price,
            duration_days,
        }
        .data(),
    }
}

fn subscribe_ix(
    subscriber: &Pubkey,
    creator: &Pubkey,
    creator_account: &Pubkey,
    plan_id: u64,
) -> Instruction {
    Instruction {
        program_id: subscriptions_dapp::ID,
        accounts: subscriptions_dapp::accounts::Subscribe {
            subscriber: *subscriber,
            plan: plan_address(creator, plan_id),
            creator_account: *creator_account,
            subscription: subscription_address(subscriber, creator),
            system_program: system_program::ID,
        }
        .to_account_metas(None),
        data: subscriptions_dapp::instruction::Subscribe {
            plan_id,
            creator: *creator,
        }
        .data(),
    }
}

fn check_ix(subscription: &Pubkey) -> Instruction {
    Instruction {
        program_id: subscriptions_dapp::ID,
        accounts: subscriptions_dapp::accounts::CheckSubscription {
            subscription: *subscription,
        }
        .to_account_metas(None),
        data: subscriptions_dapp::instruction::CheckSubscription {}.data(),
    }
}

fn custom_code(err: &TransactionError) -> u32 {
    match err {
        TransactionError::InstructionError(_, InstructionError::Custom(code)) => *code,
        other => panic!("expected a custom instruction error, got {other:?}"),
    }
}

fn kind_of(err: &TransactionError) -> Option<ErrorKind> {
    ErrorKind::from_code(custom_code(err))
}

fn returned_address(meta: &TransactionMetadata) -> Pubkey {
    Pubkey::try_from(meta.return_data.data.as_slice()).unwrap()
}

#[test]
fn create_plan_returns_address_and_stores_terms() {
    let Some(mut h) = Harness::new() else { return };
    let creator = h.funded(10 * SOL);

    let meta = h.create_plan(&creator, 1, "Premium").unwrap();
    let address = plan_address(&creator.pubkey(), 1);
    assert_eq!(returned_address(&meta), address);

    let plan: Plan = h.fetch(&address).unwrap();
    assert_eq!(plan.creator, creator.pubkey());
    assert_eq!(plan.plan_id, 1);
    assert_eq!(plan.name, "Premium");
    assert_eq!(plan.price, PREMIUM_PRICE);
    assert_eq!(plan.duration_days, 30);
    assert_eq!(plan.created_at, LAUNCH);
}

#[test]
fn duplicate_plan_is_already_exists() {
    let Some(mut h) = Harness::new() else { return };
    let creator = h.funded(10 * SOL);

    h.create_plan(&creator, 1, "Premium").unwrap();
    let err = h.create_plan(&creator, 1, "Premium Again").unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::AlreadyExists));

    let plan: Plan = h.fetch(&plan_address(&creator.pubkey(), 1)).unwrap();
    assert_eq!(plan.name, "Premium");

    // A different id under the same creator is a separate plan.
    h.create_plan(&creator, 2, "Basic").unwrap();
}

#[test]
fn invalid_terms_are_rejected_with_program_codes() {
    let Some(mut h) = Harness::new() else { return };
    let creator = h.funded(10 * SOL);

    let ix = create_plan_ix(&creator.pubkey(), 1, "   ", PREMIUM_PRICE, 30);
    let err = h.send(ix, &[&creator]).unwrap_err();
    assert_eq!(custom_code(&err), u32::from(SubscriptionsError::EmptyPlanName));

    let ix = create_plan_ix(&creator.pubkey(), 1, "Premium", 0, 30);
    let err = h.send(ix, &[&creator]).unwrap_err();
    assert_eq!(custom_code(&err), u32::from(SubscriptionsError::InvalidPrice));
    assert_eq!(kind_of(&err), Some(ErrorKind::InvalidArgument));

    assert!(h.svm.get_account(&plan_address(&creator.pubkey(), 1)).is_none());
}

#[test]
fn creator_without_rent_is_insufficient_funds() {
    let Some(mut h) = Harness::new() else { return };
    let floor = h.svm.minimum_balance_for_rent_exemption(0);
    let creator = h.funded(floor);

    let err = h.create_plan(&creator, 1, "Premium").unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::InsufficientFunds));
    assert_eq!(h.balance(&creator.pubkey()), floor);
}

#[test]
fn subscribe_moves_exact_price_and_returns_address() {
    let Some(mut h) = Harness::new() else { return };
    let creator = h.funded(10 * SOL);
    let subscriber = h.funded(10 * SOL);
    h.create_plan(&creator, 1, "Premium").unwrap();

    let creator_before = h.balance(&creator.pubkey());
    let subscriber_before = h.balance(&subscriber.pubkey());
    let rent = h.subscription_rent();

    let meta = h.subscribe(&subscriber, &creator.pubkey(), 1).unwrap();
    let address = subscription_address(&subscriber.pubkey(), &creator.pubkey());
    assert_eq!(returned_address(&meta), address);

    assert_eq!(h.balance(&creator.pubkey()), creator_before + PREMIUM_PRICE);
    assert_eq!(
        h.balance(&subscriber.pubkey()),
        subscriber_before - PREMIUM_PRICE - rent
    );

    let sub: Subscription = h.fetch(&address).unwrap();
    assert_eq!(sub.subscriber, subscriber.pubkey());
    assert_eq!(sub.creator, creator.pubkey());
    assert_eq!(sub.plan_id, 1);
    assert_eq!(sub.created_at, LAUNCH);
    assert_eq!(sub.expires_at - sub.created_at, THIRTY_DAYS);
}

#[test]
fn second_subscription_to_same_creator_is_already_exists() {
    let Some(mut h) = Harness::new() else { return };
    let creator = h.funded(10 * SOL);
    let subscriber = h.funded(10 * SOL);
    h.create_plan(&creator, 1, "Premium").unwrap();
    h.create_plan(&creator, 2, "Basic").unwrap();
    h.subscribe(&subscriber, &creator.pubkey(), 1).unwrap();

    let balance = h.balance(&subscriber.pubkey());

    let err = h.subscribe(&subscriber, &creator.pubkey(), 1).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::AlreadyExists));

    let err = h.subscribe(&subscriber, &creator.pubkey(), 2).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::AlreadyExists));

    assert_eq!(h.balance(&subscriber.pubkey()), balance);
    let sub: Subscription = h
        .fetch(&subscription_address(&subscriber.pubkey(), &creator.pubkey()))
        .unwrap();
    assert_eq!(sub.plan_id, 1);
}

#[test]
fn poor_subscriber_changes_nothing() {
    let Some(mut h) = Harness::new() else { return };
    let creator = h.funded(10 * SOL);
    h.create_plan(&creator, 1, "Premium").unwrap();

    let rent = h.subscription_rent();
    let subscriber = h.funded(rent + 100_000_000);
    let creator_before = h.balance(&creator.pubkey());
    let subscriber_before = h.balance(&subscriber.pubkey());

    let err = h.subscribe(&subscriber, &creator.pubkey(), 1).unwrap_err();
    assert_eq!(
        custom_code(&err),
        u32::from(SubscriptionsError::InsufficientFunds)
    );

    assert_eq!(h.balance(&creator.pubkey()), creator_before);
    assert_eq!(h.balance(&subscriber.pubkey()), subscriber_before);
    let address = subscription_address(&subscriber.pubkey(), &creator.pubkey());
    assert!(h.svm.get_account(&address).is_none());
}

#[test]
fn leftover_below_rent_floor_is_insufficient_funds() {
    let Some(mut h) = Harness::new() else { return };
    let creator = h.funded(10 * SOL);
    h.create_plan(&creator, 1, "Premium").unwrap();
    let rent = h.subscription_rent();

    let short = h.funded(rent + PREMIUM_PRICE + 1);
    let err = h.subscribe(&short, &creator.pubkey(), 1).unwrap_err();
    assert_eq!(
        custom_code(&err),
        u32::from(SubscriptionsError::InsufficientFunds)
    );

    // Spending the balance down to zero is allowed.
    let exact = h.funded(rent + PREMIUM_PRICE);
    h.subscribe(&exact, &creator.pubkey(), 1).unwrap();
    assert_eq!(h.balance(&exact.pubkey()), 0);
}

#[test]
fn payment_must_go_to_plan_creator() {
    let Some(mut h) = Harness::new() else { return };
    let creator = h.funded(10 * SOL);
    let impostor = h.funded(SOL);
    let subscriber = h.funded(10 * SOL);
    h.create_plan(&creator, 1, "Premium").unwrap();

    let ix = subscribe_ix(&subscriber.pubkey(), &creator.pubkey(), &impostor.pubkey(), 1);
    let err = h.send(ix, &[&subscriber]).unwrap_err();
    assert_eq!(
        custom_code(&err),
        u32::from(SubscriptionsError::CreatorMismatch)
    );
    assert_eq!(h.balance(&impostor.pubkey()), SOL);
}

#[test]
fn creator_cannot_subscribe_to_own_plan() {
    let Some(mut h) = Harness::new() else { return };
    let creator = h.funded(10 * SOL);
    h.create_plan(&creator, 1, "Premium").unwrap();

    let err = h.subscribe(&creator, &creator.pubkey(), 1).unwrap_err();
    assert_eq!(
        custom_code(&err),
        u32::from(SubscriptionsError::CannotSubscribeToOwnPlan)
    );
}

#[test]
fn subscribing_to_missing_plan_is_not_found() {
    let Some(mut h) = Harness::new() else { return };
    let creator = h.funded(SOL);
    let subscriber = h.funded(10 * SOL);

    let err = h.subscribe(&subscriber, &creator.pubkey(), 7).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::NotFound));
}

#[test]
fn check_on_missing_subscription_is_not_found() {
    let Some(mut h) = Harness::new() else { return };
    let address = subscription_address(&Pubkey::new_from_array([3; 32]), &Pubkey::new_from_array([4; 32]));

    let err = h.check(&address).unwrap_err();
    assert_eq!(custom_code(&err), 3012);
    assert_eq!(kind_of(&err), Some(ErrorKind::NotFound));
}

#[test]
fn check_is_active_until_expiry() {
    let Some(mut h) = Harness::new() else { return };
    let creator = h.funded(10 * SOL);
    let subscriber = h.funded(10 * SOL);
    h.create_plan(&creator, 1, "Premium").unwrap();
    h.subscribe(&subscriber, &creator.pubkey(), 1).unwrap();
    let address = subscription_address(&subscriber.pubkey(), &creator.pubkey());

    let meta = h.check(&address).unwrap();
    assert_eq!(meta.return_data.data, vec![1]);

    h.set_time(LAUNCH + THIRTY_DAYS - 1);
    let meta = h.check(&address).unwrap();
    assert_eq!(meta.return_data.data, vec![1]);

    h.set_time(LAUNCH + THIRTY_DAYS);
    let err = h.check(&address).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::Expired));

    h.set_time(LAUNCH + THIRTY_DAYS + 86_400);
    let err = h.check(&address).unwrap_err();
    assert_eq!(
        custom_code(&err),
        u32::from(SubscriptionsError::SubscriptionExpired)
    );
}
