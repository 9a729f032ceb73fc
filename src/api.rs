//! HTTP surface for threadbrief.
//!
//! This module exposes a compact Axum router:
//!
//! - `GET /webhook` – WhatsApp subscription handshake. Echoes `hub.challenge` when
//!   `hub.verify_token` matches the configured token, otherwise answers 403.
//! - `POST /webhook` – Inbound deliveries. User messages are acknowledged right away and a
//!   digest job is dispatched in the background; delivery receipts are acknowledged and ignored.
//! - `GET /metrics` – Webhook and digest counters.
//! - `GET /commands` – Machine-readable catalog of the endpoints above.

use crate::dispatch::Dispatch;
use crate::metrics::{DigestMetrics, MetricsSnapshot};
use crate::pipeline::DigestJob;
use crate::webhook::WebhookEvent;
use crate::whatsapp::MessagingGateway;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Sent to the user as soon as their question arrives.
pub const ACKNOWLEDGEMENT_MESSAGE: &str =
    "Recebemos sua pergunta! Você receberá a resposta em cerca de 2 minutos.";

/// Shared state behind the webhook routes.
pub struct WebhookState {
    /// Token expected in the subscription handshake.
    pub verify_token: String,
    /// Result limit attached to every dispatched job.
    pub result_limit: usize,
    /// Gateway used for the immediate acknowledgement.
    pub gateway: Arc<dyn MessagingGateway>,
    /// Background job runner.
    pub dispatcher: Arc<dyn Dispatch>,
    /// Counters exposed on `/metrics`.
    pub metrics: Arc<DigestMetrics>,
}

/// Build the HTTP router exposing the webhook surface.
pub fn create_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .route("/metrics", get(get_metrics))
        .route("/commands", get(get_commands))
        .with_state(state)
}

/// Query parameters of the subscription handshake.
#[derive(Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.verify_token", default)]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge", default)]
    challenge: Option<String>,
}

/// Answer the subscription handshake.
async fn verify_webhook(
    State(state): State<Arc<WebhookState>>,
    Query(params): Query<VerifyParams>,
) -> Response {
    if params.verify_token.as_deref() == Some(state.verify_token.as_str()) {
        tracing::info!("Webhook verification succeeded");
        (StatusCode::OK, params.challenge.unwrap_or_default()).into_response()
    } else {
        tracing::warn!("Webhook verification rejected");
        (StatusCode::FORBIDDEN, "Unauthorized").into_response()
    }
}

/// Body returned by `POST /webhook`.
#[derive(Debug, Serialize)]
struct WebhookResponse {
    status: &'static str,
}

fn webhook_response(code: StatusCode, status: &'static str) -> (StatusCode, Json<WebhookResponse>) {
    (code, Json(WebhookResponse { status }))
}

/// Handle an inbound delivery without waiting for the digest to finish.
async fn receive_webhook(
    State(state): State<Arc<WebhookState>>,
    body: Bytes,
) -> (StatusCode, Json<WebhookResponse>) {
    tracing::debug!(payload = %String::from_utf8_lossy(&body), "Received webhook payload");

    match WebhookEvent::decode(&body) {
        WebhookEvent::Message(message) => {
            state.metrics.record_message();
            tracing::info!(sender = %message.sender_id, term = %message.body, "Received question");
            let acknowledged = state
                .gateway
                .send_message(&message.sender_id, ACKNOWLEDGEMENT_MESSAGE)
                .await;
            state.metrics.record_reply(acknowledged);
            state.dispatcher.dispatch(DigestJob {
                sender_id: message.sender_id,
                term: message.body,
                limit: state.result_limit,
            });
            webhook_response(StatusCode::OK, "success")
        }
        WebhookEvent::Status => {
            state.metrics.record_status();
            tracing::debug!("Received message status, not a new message");
            webhook_response(StatusCode::OK, "status_received")
        }
        WebhookEvent::Malformed => {
            state.metrics.record_malformed();
            tracing::warn!("Webhook payload carried neither messages nor statuses");
            webhook_response(StatusCode::BAD_REQUEST, "no_message_found")
        }
    }
}

/// Return the current counter snapshot.
async fn get_metrics(State(state): State<Arc<WebhookState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "verify_webhook",
                method: "GET",
                path: "/webhook",
                description: "Subscription handshake. Returns `hub.challenge` when `hub.verify_token` matches, otherwise 403.",
                request_example: Some(json!({
                    "hub.mode": "subscribe",
                    "hub.verify_token": "reddit",
                    "hub.challenge": "123"
                })),
            },
            CommandDescriptor {
                name: "receive_webhook",
                method: "POST",
                path: "/webhook",
                description: "Inbound WhatsApp delivery. Text messages are acknowledged and answered asynchronously with Reddit digests. Responds { \"status\": \"success\" | \"status_received\" | \"no_message_found\" }.",
                request_example: Some(json!({
                    "entry": [{ "changes": [{ "value": {
                        "messages": [{ "from": "5511999999999", "text": { "body": "rust vs go" } }]
                    }}]}]
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return webhook and digest counters.",
                request_example: None,
            },
        ],
    })
}
