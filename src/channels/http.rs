//! HTTP activity channel — `POST /api/messages` in the Bot Framework shape.
//!
//! Each request carries one activity. Message activities are pushed onto the
//! channel's stream and the request waits for the bot's reply, which is
//! returned inline as a reply activity. Attachments are sent as base64
//! `data:` URLs.
//!
//! There is no authentication: every request is accepted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::stream;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

const CHANNEL_NAME: &str = "http";

// ── Activity JSON ───────────────────────────────────────────────────────

/// Inbound activity. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub from: Option<ChannelAccount>,
    #[serde(default)]
    pub conversation: Option<ConversationAccount>,
}

#[derive(Debug, Deserialize)]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConversationAccount {
    pub id: String,
}

/// Reply activity returned to the caller.
#[derive(Debug, Serialize)]
pub struct ReplyActivity {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<ReplyAttachment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyAttachment {
    pub name: String,
    pub content_type: String,
    pub content_url: String,
}

impl From<OutgoingResponse> for ReplyActivity {
    fn from(response: OutgoingResponse) -> Self {
        let attachments = response
            .attachments
            .iter()
            .map(|a| ReplyAttachment {
                name: a.name.clone(),
                content_type: a.content_type.clone(),
                content_url: a.data_url(),
            })
            .collect();

        Self {
            kind: "message",
            text: response.content,
            attachments,
        }
    }
}

// ── Shared State ────────────────────────────────────────────────────────

struct HttpChannelInner {
    /// Handler → `Channel::start` stream.
    incoming_tx: mpsc::UnboundedSender<IncomingMessage>,
    /// Requests waiting for a reply, keyed by message id.
    pending: Mutex<HashMap<Uuid, oneshot::Sender<OutgoingResponse>>>,
    reply_timeout: Duration,
}

#[derive(Clone)]
struct HttpState {
    inner: Arc<HttpChannelInner>,
}

// ── HttpChannel ─────────────────────────────────────────────────────────

/// Request/response channel served by axum.
pub struct HttpChannel {
    inner: Arc<HttpChannelInner>,
    /// Consumed once in `start()`.
    incoming_rx: Mutex<Option<mpsc::UnboundedReceiver<IncomingMessage>>>,
}

impl HttpChannel {
    pub fn new(reply_timeout: Duration) -> Self {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(HttpChannelInner {
            incoming_tx,
            pending: Mutex::new(HashMap::new()),
            reply_timeout,
        });

        Self {
            inner,
            incoming_rx: Mutex::new(Some(incoming_rx)),
        }
    }

    /// Build the axum router with `/api/messages` and `/health`.
    pub fn router(&self) -> Router {
        let state = HttpState {
            inner: Arc::clone(&self.inner),
        };

        Router::new()
            .route("/api/messages", post(messages_handler))
            .route("/health", get(health))
            .with_state(state)
    }
}

#[async_trait]
impl Channel for HttpChannel {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let rx = self
            .incoming_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| ChannelError::StartupFailed {
                name: CHANNEL_NAME.to_string(),
                reason: "start() already called".to_string(),
            })?;

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let waiter = self.inner.pending.lock().await.remove(&msg.id);
        let Some(waiter) = waiter else {
            return Err(ChannelError::SendFailed {
                name: CHANNEL_NAME.into(),
                reason: format!("no pending request for message {}", msg.id),
            });
        };

        waiter.send(response).map_err(|_| ChannelError::SendFailed {
            name: CHANNEL_NAME.into(),
            reason: "client went away before the reply was ready".into(),
        })
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        self.inner.pending.lock().await.clear();
        Ok(())
    }
}

// ── Handlers ────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "order-bot"
    }))
}

fn ack() -> Response {
    Json(serde_json::json!({ "status": "ok" })).into_response()
}

async fn messages_handler(State(state): State<HttpState>, Json(activity): Json<Activity>) -> Response {
    if activity.kind != "message" {
        debug!(kind = %activity.kind, "Ignoring non-message activity");
        return ack();
    }
    let Some(text) = activity.text else {
        debug!("Ignoring message activity without text");
        return ack();
    };

    let user_id = activity
        .from
        .as_ref()
        .map_or("anonymous", |f| f.id.as_str());
    let mut msg = IncomingMessage::new(CHANNEL_NAME, user_id, &text)
        .with_metadata(serde_json::json!({ "activity_id": activity.id }));
    if let Some(name) = activity.from.as_ref().and_then(|f| f.name.as_deref()) {
        msg = msg.with_user_name(name);
    }
    if let Some(conversation) = &activity.conversation {
        msg = msg.with_thread(&conversation.id);
    }

    let id = msg.id;
    let (tx, rx) = oneshot::channel();
    state.inner.pending.lock().await.insert(id, tx);

    if state.inner.incoming_tx.send(msg).is_err() {
        state.inner.pending.lock().await.remove(&id);
        warn!("HTTP incoming channel closed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "bot is not running" })),
        )
            .into_response();
    }

    info!(message_id = %id, user = %user_id, "HTTP message received");

    match tokio::time::timeout(state.inner.reply_timeout, rx).await {
        Ok(Ok(response)) => Json(ReplyActivity::from(response)).into_response(),
        Ok(Err(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "reply was dropped" })),
        )
            .into_response(),
        Err(_) => {
            state.inner.pending.lock().await.remove(&id);
            warn!(message_id = %id, "Timed out waiting for bot reply");
            (
                StatusCode::GATEWAY_TIMEOUT,
                Json(serde_json::json!({ "error": "timed out waiting for reply" })),
            )
                .into_response()
        }
    }
}
