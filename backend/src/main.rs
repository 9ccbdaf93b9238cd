//! Subscriptions Gateway
//!
//! Off-chain companion to the subscriptions program. Runs three concurrent
//! subsystems:
//!
//! - **Listener** — WebSocket subscription to `PlanCreated` / `Subscribed` events.
//! - **Notifier** — Forwards observed events to a signed webhook.
//! - **HTTP server** — Probes plus read-only plan, subscription and access queries.

use actix_web::{App, HttpServer, web};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod access;
mod accounts;
mod config;
mod ledger;
mod listener;
mod metrics;
mod notifier;
mod plans;
mod routes;
mod signing;

use access::SystemClock;
use config::AppConfig;
use ledger::LedgerReader;
use metrics::Metrics;
use routes::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,solana_client=warn,solana_rpc_client=warn,hyper=warn,reqwest=warn")),
        )
        .with_target(true)
        .with_ansi(true)
        .init();

    let config = AppConfig::from_env()
        .map_err(|e| std::io::Error::other(format!("invalid configuration: {e:#}")))?;

    info!(
        program = %config.program_id,
        cluster = %config.cluster,
        webhook = config.webhook_url.is_some(),
        "Starting subscriptions gateway"
    );
    info!(rpc = %config.rpc_url, ws = %config.ws_url, "Endpoints configured");

    let ledger = LedgerReader::new(config.rpc_url.clone(), config.program_id);

    // Startup snapshot; an unreachable RPC is not fatal.
    match ledger.plans(None).await {
        Ok(plans) => info!(plans = plans.len(), "Ledger reachable"),
        Err(e) => warn!(error = %format!("{e:#}"), "Ledger not reachable at startup"),
    }

    let metrics = Arc::new(Metrics::new());
    let pending_count = Arc::new(AtomicU64::new(0));
    let (tx, rx) = mpsc::channel(256);

    // Background: stream on-chain events and forward to the notifier.
    let listener_config = config.clone();
    let listener_metrics = metrics.clone();
    tokio::spawn(async move {
        listener::listen_for_events(listener_config, tx, listener_metrics).await;
    });

    // Background: deliver events to the webhook.
    let notifier_config = config.clone();
    let notifier_pending = pending_count.clone();
    let notifier_metrics = metrics.clone();
    tokio::spawn(async move {
        notifier::run_notifier(notifier_config, rx, notifier_pending, notifier_metrics).await;
    });

    let state = web::Data::new(AppState {
        ledger,
        clock: Arc::new(SystemClock),
        metrics,
        pending_count,
        webhooks_enabled: config.webhook_url.is_some(),
    });

    let addr = ("0.0.0.0", config.http_port);
    info!(addr = %format!("{}:{}", addr.0, addr.1), "Starting HTTP server");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind(addr)?
    .run()
    .await
}
