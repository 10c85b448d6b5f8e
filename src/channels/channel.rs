//! Channel trait and the message types that flow through it.

use std::pin::Pin;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use futures::Stream;
use uuid::Uuid;

use crate::error::ChannelError;

/// Stream of inbound messages produced by a started channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A message received from a channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Unique id, used to correlate replies (e.g. HTTP request/response).
    pub id: Uuid,
    /// Name of the channel that received the message.
    pub channel: String,
    /// Channel-specific sender id.
    pub user_id: String,
    /// Display name of the sender, if the channel knows it.
    pub user_name: Option<String>,
    /// Raw message text.
    pub content: String,
    /// Conversation id on the external side.
    pub thread_id: Option<String>,
    /// Channel-specific data needed to reply (chat ids etc.).
    pub metadata: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn new(channel: &str, user_id: &str, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            user_id: user_id.to_string(),
            user_name: None,
            content: content.to_string(),
            thread_id: None,
            metadata: serde_json::Value::Null,
            received_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_user_name(mut self, name: &str) -> Self {
        self.user_name = Some(name.to_string());
        self
    }

    pub fn with_thread(mut self, thread_id: &str) -> Self {
        self.thread_id = Some(thread_id.to_string());
        self
    }
}

/// A named binary file sent along with a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// `data:` URL with the base64-encoded content.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            STANDARD.encode(&self.data)
        )
    }
}

/// A response to send back on the channel a message came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    /// Text of the reply. Doubles as the caption when attachments are present.
    pub content: String,
    pub attachments: Vec<Attachment>,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// A source of inbound messages that can also deliver replies.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name, matched against [`IncomingMessage::channel`].
    fn name(&self) -> &str;

    /// Start receiving messages.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Deliver a response to the sender of `msg`.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incoming_message_builders() {
        let msg = IncomingMessage::new("http", "u1", "hello")
            .with_user_name("Anna")
            .with_thread("conv-1")
            .with_metadata(serde_json::json!({"chat_id": "42"}));

        assert_eq!(msg.channel, "http");
        assert_eq!(msg.user_id, "u1");
        assert_eq!(msg.user_name.as_deref(), Some("Anna"));
        assert_eq!(msg.thread_id.as_deref(), Some("conv-1"));
        assert_eq!(msg.metadata["chat_id"], "42");
    }

    #[test]
    fn incoming_messages_get_distinct_ids() {
        let a = IncomingMessage::new("cli", "u", "x");
        let b = IncomingMessage::new("cli", "u", "x");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn incoming_message_is_stamped_on_creation() {
        let before = Utc::now();
        let msg = IncomingMessage::new("cli", "u", "x");
        assert!(msg.received_at >= before);
        assert!(msg.received_at <= Utc::now());
    }

    #[test]
    fn attachment_data_url() {
        let att = Attachment::new("orders.csv", "text/csv", b"1\r\n".to_vec());
        assert_eq!(att.data_url(), "data:text/csv;base64,MQ0K");
    }

    #[test]
    fn text_response_has_no_attachments() {
        let resp = OutgoingResponse::text("ok");
        assert_eq!(resp.content, "ok");
        assert!(resp.attachments.is_empty());
    }
}
