//! Read-only RPC access to plan and subscription accounts.
//!
//! Single records are fetched by their PDA. Enumeration uses
//! `getProgramAccounts` with a discriminator `Memcmp` filter (and optionally a
//! creator filter); nothing is cached between calls.

use anyhow::{Context, Result};
use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::accounts::{
    account_discriminator, plan_address, subscription_address, PlanAccount, SubscriptionAccount,
    PLAN_CREATOR_OFFSET, SUBSCRIPTION_CREATOR_OFFSET,
};

/// RPC-backed reader for the subscriptions program's accounts.
pub struct LedgerReader {
    rpc: RpcClient,
    program_id: Pubkey,
}

impl LedgerReader {
    pub fn new(rpc_url: String, program_id: Pubkey) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed()),
            program_id,
        }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Fetch the plan stored for `(creator, plan_id)`, if any.
    pub async fn plan(&self, creator: &Pubkey, plan_id: u64) -> Result<Option<PlanAccount>> {
        let address = plan_address(&self.program_id, creator, plan_id);
        let data = self.account_data(&address).await?;
        Ok(data.as_deref().and_then(PlanAccount::from_account_data))
    }

    /// Fetch the subscription stored for `(subscriber, creator)`, if any.
    pub async fn subscription(
        &self,
        subscriber: &Pubkey,
        creator: &Pubkey,
    ) -> Result<Option<SubscriptionAccount>> {
        let address = subscription_address(&self.program_id, subscriber, creator);
        let data = self.account_data(&address).await?;
        Ok(data.as_deref().and_then(SubscriptionAccount::from_account_data))
    }

    /// Enumerate every plan, optionally restricted to one creator.
    pub async fn plans(&self, creator: Option<&Pubkey>) -> Result<Vec<PlanAccount>> {
        let creator_filter = creator.map(|c| (PLAN_CREATOR_OFFSET, *c));
        self.scan("Plan", creator_filter, PlanAccount::from_account_data)
            .await
    }

    /// Enumerate every subscription, optionally restricted to one creator.
    pub async fn subscriptions(&self, creator: Option<&Pubkey>) -> Result<Vec<SubscriptionAccount>> {
        let creator_filter = creator.map(|c| (SUBSCRIPTION_CREATOR_OFFSET, *c));
        self.scan(
            "Subscription",
            creator_filter,
            SubscriptionAccount::from_account_data,
        )
        .await
    }

    /// Raw data of a program-owned account, `None` if absent or foreign.
    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        let response = self
            .rpc
            .get_account_with_commitment(address, CommitmentConfig::confirmed())
            .await
            .with_context(|| format!("failed to fetch account {address}"))?;

        match response.value {
            Some(account) if account.owner == self.program_id => Ok(Some(account.data)),
            Some(account) => {
                warn!(
                    account = %address,
                    owner = %account.owner,
                    "Account not owned by program, treating as absent"
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn scan<T>(
        &self,
        account_name: &str,
        creator_filter: Option<(usize, Pubkey)>,
        decode: fn(&[u8]) -> Option<T>,
    ) -> Result<Vec<T>> {
        let disc = account_discriminator(account_name);

        let mut filters = vec![RpcFilterType::Memcmp(Memcmp::new_raw_bytes(0, disc.to_vec()))];
        if let Some((offset, creator)) = creator_filter {
            filters.push(RpcFilterType::Memcmp(Memcmp::new_raw_bytes(
                offset,
                creator.to_bytes().to_vec(),
            )));
        }

        let account_config = RpcProgramAccountsConfig {
            filters: Some(filters),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(CommitmentConfig::confirmed()),
                ..Default::default()
            },
            ..Default::default()
        };

        let accounts = self
            .rpc
            .get_program_ui_accounts_with_config(&self.program_id, account_config)
            .await
            .with_context(|| format!("failed to scan {account_name} accounts"))?;

        debug!(kind = account_name, count = accounts.len(), "Scanned program accounts");

        let mut records = Vec::with_capacity(accounts.len());
        for (pubkey, ui_account) in accounts {
            let Some(data) = ui_account.data.decode() else {
                warn!(account = %pubkey, "Failed to decode account data, skipping");
                continue;
            };
            match decode(&data) {
                Some(record) => records.push(record),
                None => warn!(
                    account = %pubkey,
                    len = data.len(),
                    kind = account_name,
                    "Malformed account data, skipping"
                ),
            }
        }

        Ok(records)
    }
}
