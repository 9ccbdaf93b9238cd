//! On-chain event listener for the subscriptions program.
//!
//! Subscribes to program log events via WebSocket, parses the Anchor
//! `PlanCreated` and `Subscribed` events and forwards them to the notifier.
//! Reconnects automatically on disconnection.

use base64::Engine;
use solana_client::nonblocking::pubsub_client::PubsubClient;
use solana_client::rpc_config::{RpcTransactionLogsConfig, RpcTransactionLogsFilter};
use solana_commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::accounts::{event_discriminator, read_i64, read_pubkey, read_string, read_u32, read_u64};
use crate::config::AppConfig;
use crate::metrics::Metrics;

/// Parsed `PlanCreated` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanCreatedEvent {
    pub creator: Pubkey,
    pub plan_id: u64,
    pub price: u64,
    pub duration_days: u32,
    pub created_at: i64,
    pub name: String,
}

/// Parsed `Subscribed` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribedEvent {
    pub subscriber: Pubkey,
    pub creator: Pubkey,
    pub plan_id: u64,
    pub price: u64,
    pub created_at: i64,
    pub expires_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    PlanCreated(PlanCreatedEvent),
    Subscribed(SubscribedEvent),
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlanCreated(_) => "plan_created",
            Self::Subscribed(_) => "subscribed",
        }
    }

    /// Webhook representation; keys are base58 strings, amounts are lamports.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::PlanCreated(e) => serde_json::json!({
                "creator": e.creator.to_string(),
                "plan_id": e.plan_id,
                "price": e.price,
                "duration_days": e.duration_days,
                "created_at": e.created_at,
                "name": e.name,
            }),
            Self::Subscribed(e) => serde_json::json!({
                "subscriber": e.subscriber.to_string(),
                "creator": e.creator.to_string(),
                "plan_id": e.plan_id,
                "price": e.price,
                "created_at": e.created_at,
                "expires_at": e.expires_at,
            }),
        }
    }
}

/// An event together with the transaction that emitted it.
#[derive(Debug, Clone)]
pub struct ObservedEvent {
    pub signature: String,
    pub event: LedgerEvent,
}

/// Delay before reconnecting to the WebSocket after a disconnect or error.
const WS_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Event discriminators, computed once per listener.
struct Discriminators {
    plan_created: [u8; 8],
    subscribed: [u8; 8],
}

impl Discriminators {
    fn new() -> Self {
        Self {
            plan_created: event_discriminator("PlanCreated"),
            subscribed: event_discriminator("Subscribed"),
        }
    }
}

/// Subscribe to program logs via WebSocket and forward ledger events.
pub async fn listen_for_events(
    config: AppConfig,
    tx: mpsc::Sender<ObservedEvent>,
    metrics: Arc<Metrics>,
) {
    let discriminators = Discriminators::new();

    loop {
        info!(url = %config.ws_url, "Connecting to WebSocket");

        match PubsubClient::new(&config.ws_url).await {
            Ok(pubsub) => {
                info!("WebSocket connected");

                let filter =
                    RpcTransactionLogsFilter::Mentions(vec![config.program_id.to_string()]);
                let logs_config = RpcTransactionLogsConfig {
                    commitment: Some(CommitmentConfig::confirmed()),
                };

                match pubsub.logs_subscribe(filter, logs_config).await {
                    Ok((mut stream, _unsub)) => {
                        use futures_util::StreamExt;
                        while let Some(log_result) = stream.next().await {
                            if log_result.value.err.is_some() {
                                continue;
                            }
                            let forwarded = forward_log_events(
                                &log_result.value.signature,
                                &log_result.value.logs,
                                &discriminators,
                                &tx,
                                &metrics,
                            )
                            .await;
                            if !forwarded {
                                error!("Channel closed, stopping listener");
                                return;
                            }
                        }
                        warn!("WebSocket stream ended, reconnecting");
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to subscribe to logs");
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to connect to WebSocket");
            }
        }

        info!(delay = ?WS_RECONNECT_DELAY, "Reconnecting");
        tokio::time::sleep(WS_RECONNECT_DELAY).await;
    }
}

/// Forward every ledger event found in a transaction's logs.
///
/// Returns `false` once the receiving side has gone away.
async fn forward_log_events(
    signature: &str,
    logs: &[String],
    discriminators: &Discriminators,
    tx: &mpsc::Sender<ObservedEvent>,
    metrics: &Metrics,
) -> bool {
    for event in parse_log_lines(logs, discriminators) {
        metrics.record_event();
        match &event {
            LedgerEvent::PlanCreated(e) => info!(
                creator = %e.creator,
                plan_id = e.plan_id,
                price = e.price,
                signature,
                "Received PlanCreated event"
            ),
            LedgerEvent::Subscribed(e) => info!(
                subscriber = %e.subscriber,
                creator = %e.creator,
                plan_id = e.plan_id,
                expires_at = e.expires_at,
                signature,
                "Received Subscribed event"
            ),
        }

        let observed = ObservedEvent {
            signature: signature.to_string(),
            event,
        };
        if tx.send(observed).await.is_err() {
            return false;
        }
    }
    true
}

/// Extract ledger events from `Program data:` log entries.
///
/// Anchor emits events as base64-encoded `Program data:` lines; each entry is
/// decoded and dispatched on its 8-byte discriminator.
fn parse_log_lines(logs: &[String], discriminators: &Discriminators) -> Vec<LedgerEvent> {
    let mut events = Vec::new();
    for log_line in logs {
        let Some(data_str) = log_line.strip_prefix("Program data: ") else {
            continue;
        };

        let decoded = match base64::engine::general_purpose::STANDARD.decode(data_str.trim()) {
            Ok(d) => d,
            Err(e) => {
                debug!(error = %e, "Failed to decode base64 log data");
                continue;
            }
        };

        if decoded.len() < 8 {
            continue;
        }
        let (disc, body) = decoded.split_at(8);

        let event = if disc == discriminators.plan_created.as_slice() {
            parse_plan_created(body).map(LedgerEvent::PlanCreated)
        } else if disc == discriminators.subscribed.as_slice() {
            parse_subscribed(body).map(LedgerEvent::Subscribed)
        } else {
            continue;
        };

        match event {
            Some(event) => events.push(event),
            None => warn!("Failed to parse ledger event payload"),
        }
    }
    events
}

/// Layout: `creator (32) + plan_id (8) + price (8) + duration_days (4) +
/// created_at (8) + name (4 + len)`.
fn parse_plan_created(data: &[u8]) -> Option<PlanCreatedEvent> {
    Some(PlanCreatedEvent {
        creator: read_pubkey(data, 0)?,
        plan_id: read_u64(data, 32)?,
        price: read_u64(data, 40)?,
        duration_days: read_u32(data, 48)?,
        created_at: read_i64(data, 52)?,
        name: read_string(data, 60)?,
    })
}

/// Layout: `subscriber (32) + creator (32) + plan_id (8) + price (8) +
/// created_at (8) + expires_at (8) = 96 bytes`.
fn parse_subscribed(data: &[u8]) -> Option<SubscribedEvent> {
    Some(SubscribedEvent {
        subscriber: read_pubkey(data, 0)?,
        creator: read_pubkey(data, 32)?,
        plan_id: read_u64(data, 64)?,
        price: read_u64(data, 72)?,
        created_at: read_i64(data, 80)?,
        expires_at: read_i64(data, 88)?,
    })
}
