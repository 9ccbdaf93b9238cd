//! Webhook notifier — consumes ledger events from the listener and POSTs
//! them to the configured endpoint.
//!
//! Each delivery is a JSON body `{event, signature, explorer, data}`, signed
//! with `X-Signature` when a secret is configured. Server errors and network
//! failures are retried with exponential backoff; other 4xx responses are
//! permanent.

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, instrument, warn};

use crate::config::AppConfig;
use crate::listener::ObservedEvent;
use crate::metrics::Metrics;
use crate::signing::{SIGNATURE_HEADER, sign_payload};

/// HTTP request timeout for a single delivery attempt.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on the backoff between attempts.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Main notifier loop.
///
/// Without a `WEBHOOK_URL` events are drained and only logged.
pub async fn run_notifier(
    config: AppConfig,
    mut rx: mpsc::Receiver<ObservedEvent>,
    pending_count: Arc<AtomicU64>,
    metrics: Arc<Metrics>,
) {
    let Some(url) = config.webhook_url.clone() else {
        info!("WEBHOOK_URL not set, events will only be logged");
        while let Some(observed) = rx.recv().await {
            debug!(event = observed.event.name(), signature = %observed.signature, "Dropping event");
        }
        return;
    };

    let http = match reqwest::Client::builder().timeout(HTTP_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client, notifier disabled");
            return;
        }
    };

    let semaphore = Arc::new(Semaphore::new(config.notify_concurrency));

    while let Some(observed) = rx.recv().await {
        pending_count.fetch_add(1, Ordering::Relaxed);

        let permit = match semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => {
                error!("Semaphore closed, stopping notifier");
                break;
            }
        };
        let http = http.clone();
        let cfg = config.clone();
        let url = url.clone();
        let pending = pending_count.clone();
        let met = metrics.clone();

        tokio::spawn(async move {
            let _permit = permit;
            let start = Instant::now();

            match deliver(&http, &cfg, &url, &observed).await {
                Ok(()) => {
                    let latency_ms = start.elapsed().as_millis() as u64;
                    met.record_delivery(latency_ms);
                    info!(
                        event = observed.event.name(),
                        signature = %observed.signature,
                        latency_ms,
                        "Webhook delivered"
                    );
                }
                Err(e) => {
                    met.record_delivery_failure();
                    error!(
                        event = observed.event.name(),
                        signature = %observed.signature,
                        error = %format!("{e:#}"),
                        "Webhook delivery failed"
                    );
                }
            }

            pending.fetch_sub(1, Ordering::Relaxed);
        });
    }

    info!("Notifier channel closed, shutting down");
}

/// Whether a non-success status is worth another attempt.
fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

fn build_payload(config: &AppConfig, observed: &ObservedEvent) -> serde_json::Value {
    serde_json::json!({
        "event": observed.event.name(),
        "signature": observed.signature,
        "explorer": config.explorer_url(&observed.signature),
        "data": observed.event.to_json(),
    })
}

/// POST one event, retrying with exponential backoff.
#[instrument(skip_all, fields(event = observed.event.name(), signature = %observed.signature))]
async fn deliver(
    http: &reqwest::Client,
    config: &AppConfig,
    url: &str,
    observed: &ObservedEvent,
) -> Result<()> {
    let body = serde_json::to_vec(&build_payload(config, observed))
        .context("failed to encode webhook payload")?;
    let signature = config
        .webhook_secret
        .as_deref()
        .map(|secret| sign_payload(secret, &body));

    let mut retry_delay = Duration::from_millis(config.initial_retry_delay_ms);

    for attempt in 1..=config.max_retries {
        let mut request = http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body.clone());
        if let Some(signature) = &signature {
            request = request.header(SIGNATURE_HEADER, signature.as_str());
        }

        let last_attempt = attempt == config.max_retries;

        match request.send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            Ok(resp) if !is_retryable(resp.status()) => {
                anyhow::bail!("webhook rejected with status {}", resp.status())
            }
            Ok(resp) if last_attempt => {
                anyhow::bail!(
                    "webhook returned {} after {} attempts",
                    resp.status(),
                    attempt
                )
            }
            Err(e) if last_attempt => {
                return Err(e).context("webhook request failed");
            }
            Ok(resp) => {
                warn!(attempt, status = %resp.status(), delay = ?retry_delay, "Webhook not accepted, retrying");
            }
            Err(e) => {
                warn!(attempt, error = %e, delay = ?retry_delay, "Webhook request failed, retrying");
            }
        }

        tokio::time::sleep(retry_delay).await;
        retry_delay = retry_delay.saturating_mul(2).min(MAX_RETRY_DELAY);
    }

    anyhow::bail!("max retries ({}) exceeded", config.max_retries)
}
