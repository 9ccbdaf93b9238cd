//! Application configuration loaded from environment variables.
//!
//! All variables are optional: `RPC_URL`, `WS_URL`, `PROGRAM_ID`, `CLUSTER`,
//! `HTTP_PORT`, `WEBHOOK_URL`, `WEBHOOK_SECRET`, `MAX_RETRIES`,
//! `INITIAL_RETRY_DELAY_MS`, `NOTIFY_CONCURRENCY`

use anyhow::{Context, Result};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

/// Program id the subscriptions program is deployed under by default.
pub const DEFAULT_PROGRAM_ID: &str = "8hSScVud3dY7iV2r4aGDFBduXAZh5j31X3P8GnCaznZd";

/// Application configuration for the subscriptions gateway.
#[derive(Clone)]
pub struct AppConfig {
    /// Solana JSON-RPC endpoint (HTTP).
    pub rpc_url: String,
    /// Solana PubSub endpoint (WebSocket) for log subscriptions.
    pub ws_url: String,
    /// The deployed subscriptions program ID.
    pub program_id: Pubkey,
    /// Cluster name for explorer URLs.
    pub cluster: String,
    /// HTTP server port.
    pub http_port: u16,
    /// Endpoint that receives ledger events, if any.
    pub webhook_url: Option<String>,
    /// Key for the `X-Signature` HMAC over webhook bodies.
    pub webhook_secret: Option<Vec<u8>>,
    /// Maximum delivery attempts per webhook event.
    pub max_retries: u32,
    /// Initial retry delay in milliseconds.
    pub initial_retry_delay_ms: u64,
    /// Maximum concurrent webhook deliveries.
    pub notify_concurrency: usize,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let rpc_url = lookup("RPC_URL").unwrap_or_else(|| "http://127.0.0.1:8899".into());
        let ws_url = lookup("WS_URL").unwrap_or_else(|| "ws://127.0.0.1:8900".into());

        let program_id_str = lookup("PROGRAM_ID").unwrap_or_else(|| DEFAULT_PROGRAM_ID.into());
        let program_id = Pubkey::from_str(&program_id_str)
            .with_context(|| format!("invalid PROGRAM_ID: {program_id_str}"))?;

        let cluster = lookup("CLUSTER").unwrap_or_else(|| "devnet".into());

        let http_port = parse_or(&lookup, "HTTP_PORT", 8080);
        let max_retries = parse_or(&lookup, "MAX_RETRIES", 5);
        let initial_retry_delay_ms = parse_or(&lookup, "INITIAL_RETRY_DELAY_MS", 500);
        let notify_concurrency = parse_or(&lookup, "NOTIFY_CONCURRENCY", 4);

        let webhook_url = lookup("WEBHOOK_URL").filter(|url| !url.trim().is_empty());
        let webhook_secret = lookup("WEBHOOK_SECRET")
            .filter(|secret| !secret.is_empty())
            .map(String::into_bytes);

        if max_retries == 0 {
            anyhow::bail!("MAX_RETRIES must be at least 1");
        }
        if notify_concurrency == 0 {
            anyhow::bail!("NOTIFY_CONCURRENCY must be at least 1");
        }

        Ok(Self {
            rpc_url,
            ws_url,
            program_id,
            cluster,
            http_port,
            webhook_url,
            webhook_secret,
            max_retries,
            initial_retry_delay_ms,
            notify_concurrency,
        })
    }

    /// Return the Solscan explorer URL for a given transaction signature.
    pub fn explorer_url(&self, signature: &str) -> String {
        match self.cluster.as_str() {
            "mainnet-beta" => format!("https://solscan.io/tx/{signature}"),
            cluster => format!("https://solscan.io/tx/{signature}?cluster={cluster}"),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
