//! HTTP API of the gateway.
//!
//! Every response is recomputed from the ledger on request. Path keys are
//! base58 public keys; a malformed key yields 400 and an RPC failure 502.

use actix_web::{HttpResponse, web};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, instrument};

use crate::access::{AccessError, SubscriptionStatus, TimeSource, check_access, seconds_remaining};
use crate::accounts::{PlanAccount, SubscriptionAccount};
use crate::ledger::LedgerReader;
use crate::metrics::Metrics;
use crate::plans::{PlanSummary, summarize};

/// Shared application state accessible from HTTP handlers.
pub struct AppState {
    pub ledger: LedgerReader,
    pub clock: Arc<dyn TimeSource>,
    pub metrics: Arc<Metrics>,
    /// Webhook deliveries currently in flight.
    pub pending_count: Arc<AtomicU64>,
    pub webhooks_enabled: bool,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/status", web::get().to(status))
        .route("/plans", web::get().to(list_plans))
        .route("/plans/{creator}/{plan_id}", web::get().to(get_plan))
        .route(
            "/subscriptions/{subscriber}/{creator}",
            web::get().to(get_subscription),
        )
        .route("/access/{subscriber}/{creator}", web::get().to(access));
}

/// Liveness probe — returns 200 if the process is running.
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok"}))
}

/// Readiness / status probe — counters plus in-flight deliveries.
async fn status(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "running",
        "program_id": data.ledger.program_id().to_string(),
        "webhooks_enabled": data.webhooks_enabled,
        "pending_deliveries": data.pending_count.load(Ordering::Relaxed),
        "metrics": data.metrics.to_json(),
    }))
}

#[derive(Debug, Deserialize)]
struct PlansQuery {
    creator: Option<String>,
}

#[instrument(skip_all, fields(creator = ?query.creator))]
async fn list_plans(data: web::Data<AppState>, query: web::Query<PlansQuery>) -> HttpResponse {
    let creator = match query.creator.as_deref().map(parse_pubkey).transpose() {
        Ok(creator) => creator,
        Err(resp) => return resp,
    };

    let fetched = tokio::try_join!(
        data.ledger.plans(creator.as_ref()),
        data.ledger.subscriptions(creator.as_ref()),
    );
    let (plans, subscriptions) = match fetched {
        Ok(pair) => pair,
        Err(e) => return rpc_failure(e),
    };

    let program_id = data.ledger.program_id();
    let summaries = summarize(plans, &subscriptions, data.clock.now());
    let body: Vec<serde_json::Value> = summaries
        .iter()
        .map(|summary| summary_json(summary, program_id))
        .collect();
    HttpResponse::Ok().json(body)
}

#[instrument(skip_all, fields(creator = %path.0, plan_id = %path.1))]
async fn get_plan(data: web::Data<AppState>, path: web::Path<(String, String)>) -> HttpResponse {
    let (creator, plan_id) = path.into_inner();
    let creator = match parse_pubkey(&creator) {
        Ok(key) => key,
        Err(resp) => return resp,
    };
    let Ok(plan_id) = plan_id.parse::<u64>() else {
        return bad_request(format!("invalid plan id: {plan_id}"));
    };

    match data.ledger.plan(&creator, plan_id).await {
        Ok(Some(plan)) => HttpResponse::Ok().json(plan_json(&plan, data.ledger.program_id())),
        Ok(None) => not_found("Plan not found"),
        Err(e) => rpc_failure(e),
    }
}

#[instrument(skip_all, fields(subscriber = %path.0, creator = %path.1))]
async fn get_subscription(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (subscriber, creator) = match parse_pair(&path) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };

    match data.ledger.subscription(&subscriber, &creator).await {
        Ok(Some(sub)) => HttpResponse::Ok().json(subscription_json(
            &sub,
            data.ledger.program_id(),
            data.clock.now(),
        )),
        Ok(None) => not_found("Subscription not found"),
        Err(e) => rpc_failure(e),
    }
}

#[instrument(skip_all, fields(subscriber = %path.0, creator = %path.1))]
async fn access(data: web::Data<AppState>, path: web::Path<(String, String)>) -> HttpResponse {
    let (subscriber, creator) = match parse_pair(&path) {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };

    let record = match data.ledger.subscription(&subscriber, &creator).await {
        Ok(record) => record,
        Err(e) => return rpc_failure(e),
    };

    let outcome = check_access(record.as_ref(), data.clock.now());
    data.metrics.record_access(&outcome);
    access_response(&outcome)
}

/// Map an access outcome to its HTTP response: 200, 404 or 403.
pub fn access_response(outcome: &Result<bool, AccessError>) -> HttpResponse {
    match outcome {
        Ok(active) => HttpResponse::Ok().json(serde_json::json!({"active": active})),
        Err(e) => {
            let mut body = serde_json::json!({
                "active": false,
                "kind": e.kind(),
                "error": e.to_string(),
            });
            match e {
                AccessError::NotFound => HttpResponse::NotFound().json(body),
                AccessError::Expired { expires_at } => {
                    body["expires_at"] = (*expires_at).into();
                    HttpResponse::Forbidden().json(body)
                }
            }
        }
    }
}

fn plan_json(plan: &PlanAccount, program_id: &Pubkey) -> serde_json::Value {
    serde_json::json!({
        "address": plan.address(program_id).to_string(),
        "creator": plan.creator.to_string(),
        "plan_id": plan.plan_id,
        "name": plan.name,
        "price": plan.price,
        "duration_days": plan.duration_days,
        "created_at": plan.created_at,
    })
}

fn summary_json(summary: &PlanSummary, program_id: &Pubkey) -> serde_json::Value {
    let mut value = plan_json(&summary.plan, program_id);
    value["subscriber_count"] = summary.subscriber_count.into();
    value["active_count"] = summary.active_count.into();
    value["lamports_earned"] = summary.lamports_earned.into();
    value
}

fn subscription_json(sub: &SubscriptionAccount, program_id: &Pubkey, now: i64) -> serde_json::Value {
    serde_json::json!({
        "address": sub.address(program_id).to_string(),
        "subscriber": sub.subscriber.to_string(),
        "creator": sub.creator.to_string(),
        "plan_id": sub.plan_id,
        "created_at": sub.created_at,
        "expires_at": sub.expires_at,
        "status": SubscriptionStatus::at(sub, now).as_str(),
        "seconds_remaining": seconds_remaining(sub, now),
    })
}

fn parse_pubkey(raw: &str) -> Result<Pubkey, HttpResponse> {
    Pubkey::from_str(raw).map_err(|_| bad_request(format!("invalid public key: {raw}")))
}

fn parse_pair(path: &(String, String)) -> Result<(Pubkey, Pubkey), HttpResponse> {
    Ok((parse_pubkey(&path.0)?, parse_pubkey(&path.1)?))
}

fn bad_request(message: String) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({"error": message}))
}

fn not_found(message: &str) -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({"error": message}))
}

fn rpc_failure(e: anyhow::Error) -> HttpResponse {
    error!(error = %format!("{e:#}"), "Ledger read failed");
    HttpResponse::BadGateway().json(serde_json::json!({"error": "ledger unavailable"}))
}
