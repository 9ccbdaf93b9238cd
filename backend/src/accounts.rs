//! Address derivation and account decoding for the subscriptions program.
//!
//! The gateway reads raw account data over RPC and decodes the Borsh layout
//! by hand, so it does not link the on-chain crate.

use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;

/// Seed prefix for plan PDAs.
pub const PLAN_SEED: &[u8] = b"creator";
/// Seed prefix for subscription PDAs.
pub const SUBSCRIPTION_SEED: &[u8] = b"subscription";

/// Minimum `Plan` account length: fixed fields plus the name length prefix.
///
/// Layout: discriminator (8) + creator (32) + plan_id (8) + price (8) +
/// duration_days (4) + created_at (8) + bump (1) + name_len (4) = 73 bytes.
pub const PLAN_MIN_LEN: usize = 73;

/// `Subscription` account length.
///
/// Layout: discriminator (8) + subscriber (32) + creator (32) + plan_id (8) +
/// created_at (8) + expires_at (8) + bump (1) = 97 bytes.
pub const SUBSCRIPTION_LEN: usize = 97;

/// Byte offset of `creator` in a raw `Plan` account.
pub const PLAN_CREATOR_OFFSET: usize = 8;
/// Byte offset of `creator` in a raw `Subscription` account.
pub const SUBSCRIPTION_CREATOR_OFFSET: usize = 40;

/// Compute the Anchor account discriminator: `sha256("account:<Name>")[..8]`.
pub fn account_discriminator(account_name: &str) -> [u8; 8] {
    discriminator("account", account_name)
}

/// Compute the Anchor event discriminator: `sha256("event:<Name>")[..8]`.
pub fn event_discriminator(event_name: &str) -> [u8; 8] {
    discriminator("event", event_name)
}

fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let mut hasher = Sha256::new();
    hasher.update(format!("{namespace}:{name}"));
    let hash = hasher.finalize();
    let mut disc = [0u8; 8];
    disc.copy_from_slice(&hash[..8]);
    disc
}

/// Plan PDA: `["creator", creator, plan_id_le]`.
pub fn plan_address(program_id: &Pubkey, creator: &Pubkey, plan_id: u64) -> Pubkey {
    let (pda, _) = Pubkey::find_program_address(
        &[PLAN_SEED, creator.as_ref(), &plan_id.to_le_bytes()],
        program_id,
    );
    pda
}

/// Subscription PDA: `["subscription", subscriber, creator]`.
pub fn subscription_address(program_id: &Pubkey, subscriber: &Pubkey, creator: &Pubkey) -> Pubkey {
    let (pda, _) = Pubkey::find_program_address(
        &[SUBSCRIPTION_SEED, subscriber.as_ref(), creator.as_ref()],
        program_id,
    );
    pda
}

/// Decoded `Plan` account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanAccount {
    pub creator: Pubkey,
    pub plan_id: u64,
    pub price: u64,
    pub duration_days: u32,
    pub created_at: i64,
    pub name: String,
}

impl PlanAccount {
    /// Parse a full account buffer, including the discriminator.
    pub fn from_account_data(data: &[u8]) -> Option<Self> {
        if data.len() < PLAN_MIN_LEN || data[..8] != account_discriminator("Plan") {
            return None;
        }
        let body = &data[8..];
        let creator = read_pubkey(body, 0)?;
        let plan_id = read_u64(body, 32)?;
        let price = read_u64(body, 40)?;
        let duration_days = read_u32(body, 48)?;
        let created_at = read_i64(body, 52)?;
        // body[60] is the bump.
        let name = read_string(body, 61)?;
        Some(Self {
            creator,
            plan_id,
            price,
            duration_days,
            created_at,
            name,
        })
    }

    pub fn address(&self, program_id: &Pubkey) -> Pubkey {
        plan_address(program_id, &self.creator, self.plan_id)
    }
}

/// Decoded `Subscription` account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionAccount {
    pub subscriber: Pubkey,
    pub creator: Pubkey,
    pub plan_id: u64,
    pub created_at: i64,
    pub expires_at: i64,
}

impl SubscriptionAccount {
    /// Parse a full account buffer, including the discriminator.
    pub fn from_account_data(data: &[u8]) -> Option<Self> {
        if data.len() < SUBSCRIPTION_LEN || data[..8] != account_discriminator("Subscription") {
            return None;
        }
        let body = &data[8..];
        Some(Self {
            subscriber: read_pubkey(body, 0)?,
            creator: read_pubkey(body, 32)?,
            plan_id: read_u64(body, 64)?,
            created_at: read_i64(body, 72)?,
            expires_at: read_i64(body, 80)?,
        })
    }

    pub fn address(&self, program_id: &Pubkey) -> Pubkey {
        subscription_address(program_id, &self.subscriber, &self.creator)
    }
}

pub(crate) fn read_pubkey(data: &[u8], offset: usize) -> Option<Pubkey> {
    Pubkey::try_from(data.get(offset..offset + 32)?).ok()
}

pub(crate) fn read_u64(data: &[u8], offset: usize) -> Option<u64> {
    Some(u64::from_le_bytes(data.get(offset..offset + 8)?.try_into().ok()?))
}

pub(crate) fn read_i64(data: &[u8], offset: usize) -> Option<i64> {
    Some(i64::from_le_bytes(data.get(offset..offset + 8)?.try_into().ok()?))
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    Some(u32::from_le_bytes(data.get(offset..offset + 4)?.try_into().ok()?))
}

/// Borsh string: `u32` little-endian length followed by UTF-8 bytes.
pub(crate) fn read_string(data: &[u8], offset: usize) -> Option<String> {
    let len = read_u32(data, offset)? as usize;
    let start = offset + 4;
    let bytes = data.get(start..start.checked_add(len)?)?;
    String::from_utf8(bytes.to_vec()).ok()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn key(n: u8) -> Pubkey {
        Pubkey::new_from_array([n; 32])
    }

    pub(crate) fn encode_plan(plan: &PlanAccount) -> Vec<u8> {
        let mut data = Vec::with_capacity(PLAN_MIN_LEN + plan.name.len());
        data.extend_from_slice(&account_discriminator("Plan"));
        data.extend_from_slice(plan.creator.as_ref());
        data.extend_from_slice(&plan.plan_id.to_le_bytes());
        data.extend_from_slice(&plan.price.to_le_bytes());
        data.extend_from_slice(&plan.duration_days.to_le_bytes());
        data.extend_from_slice(&plan.created_at.to_le_bytes());
        data.push(255);
        data.extend_from_slice(&(plan.name.len() as u32).to_le_bytes());
        data.extend_from_slice(plan.name.as_bytes());
        data
    }

    pub(crate) fn encode_subscription(sub: &SubscriptionAccount) -> Vec<u8> {
        let mut data = Vec::with_capacity(SUBSCRIPTION_LEN);
        data.extend_from_slice(&account_discriminator("Subscription"));
        data.extend_from_slice(sub.subscriber.as_ref());
        data.extend_from_slice(sub.creator.as_ref());
        data.extend_from_slice(&sub.plan_id.to_le_bytes());
        data.extend_from_slice(&sub.created_at.to_le_bytes());
        data.extend_from_slice(&sub.expires_at.to_le_bytes());
        data.push(254);
        data
    }

    pub(crate) fn premium_plan(creator: Pubkey) -> PlanAccount {
        PlanAccount {
            creator,
            plan_id: 1,
            price: 500_000_000,
            duration_days: 30,
            created_at: 1_700_000_000,
            name: "Premium".into(),
        }
    }

    #[test]
    fn decodes_plan_account() {
        let plan = premium_plan(key(11));
        let data = encode_plan(&plan);
        assert_eq!(PlanAccount::from_account_data(&data), Some(plan));
    }

    #[test]
    fn creator_sits_at_filter_offsets() {
        let creator = key(12);
        let plan = encode_plan(&premium_plan(creator));
        assert_eq!(&plan[PLAN_CREATOR_OFFSET..PLAN_CREATOR_OFFSET + 32], creator.as_ref());

        let sub = encode_subscription(&SubscriptionAccount {
            subscriber: key(13),
            creator,
            plan_id: 1,
            created_at: 0,
            expires_at: 86_400,
        });
        assert_eq!(
            &sub[SUBSCRIPTION_CREATOR_OFFSET..SUBSCRIPTION_CREATOR_OFFSET + 32],
            creator.as_ref()
        );
    }

    #[test]
    fn rejects_truncated_plan_name() {
        let mut data = encode_plan(&premium_plan(key(14)));
        data.truncate(data.len() - 2);
        assert_eq!(PlanAccount::from_account_data(&data), None);
    }

    #[test]
    fn rejects_wrong_discriminator() {
        let sub = SubscriptionAccount {
            subscriber: key(15),
            creator: key(16),
            plan_id: 7,
            created_at: 10,
            expires_at: 20,
        };
        let mut data = encode_subscription(&sub);
        assert_eq!(SubscriptionAccount::from_account_data(&data), Some(sub));

        data[..8].copy_from_slice(&account_discriminator("Plan"));
        assert_eq!(SubscriptionAccount::from_account_data(&data), None);
        assert_eq!(PlanAccount::from_account_data(&data), None);
    }

    #[test]
    fn discriminators_differ_by_namespace() {
        assert_ne!(account_discriminator("Subscribed"), event_discriminator("Subscribed"));
        assert_ne!(account_discriminator("Plan"), account_discriminator("Subscription"));
    }

    #[test]
    fn plan_address_depends_on_plan_id() {
        let program_id = key(17);
        let creator = key(18);
        let first = plan_address(&program_id, &creator, 1);
        assert_eq!(first, plan_address(&program_id, &creator, 1));
        assert_ne!(first, plan_address(&program_id, &creator, 2));
    }

    #[test]
    fn subscription_address_is_per_pair_and_ordered() {
        let program_id = key(19);
        let a = key(20);
        let b = key(21);
        assert_eq!(
            subscription_address(&program_id, &a, &b),
            subscription_address(&program_id, &a, &b)
        );
        assert_ne!(
            subscription_address(&program_id, &a, &b),
            subscription_address(&program_id, &b, &a)
        );
    }

    #[test]
    fn address_matches_manual_derivation() {
        let program_id = key(22);
        let subscriber = key(23);
        let creator = key(24);
        let (expected, _) = Pubkey::find_program_address(
            &[b"subscription", subscriber.as_ref(), creator.as_ref()],
            &program_id,
        );
        let sub = SubscriptionAccount {
            subscriber,
            creator,
            plan_id: 1,
            created_at: 0,
            expires_at: 1,
        };
        assert_eq!(sub.address(&program_id), expected);
    }
}
