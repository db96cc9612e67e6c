//! # Mail Transport
//!
//! Outbound message envelopes and the [`MailTransport`] trait implemented by
//! delivery providers. A transport either accepts an envelope or reports a
//! [`TransportError`] carrying the provider's human-readable reason.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A fully addressed message, ready for a transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub to: Vec<String>,
    pub from: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl Envelope {
    /// A copy of this envelope addressed to `to`.
    pub fn addressed_to(&self, to: Vec<String>) -> Self {
        Self {
            to,
            ..self.clone()
        }
    }
}

/// A file attached to an envelope. `content` is base64 without any
/// data-URL prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub content: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub disposition: String,
}

/// Attachment as submitted by a caller; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInput {
    pub content_base64: Option<String>,
    pub content: Option<String>,
    pub filename: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
    pub mime_type: Option<String>,
}

impl From<AttachmentInput> for Attachment {
    fn from(input: AttachmentInput) -> Self {
        let raw = input
            .content_base64
            .filter(|s| !s.is_empty())
            .or(input.content)
            .unwrap_or_default();
        Attachment {
            content: normalize_base64(&raw),
            filename: input
                .filename
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "attachment".to_string()),
            content_type: input
                .content_type
                .filter(|s| !s.is_empty())
                .or(input.mime_type.filter(|s| !s.is_empty()))
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            disposition: "attachment".to_string(),
        }
    }
}

/// Strip a `data:<mime>;base64,` prefix if present, otherwise trim.
pub fn normalize_base64(input: &str) -> String {
    const MARKER: &str = "base64,";
    match input.find(MARKER) {
        Some(idx) => input[idx + MARKER.len()..].to_string(),
        None => input.trim().to_string(),
    }
}

/// Failure reported by a mail provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct TransportError {
    pub reason: String,
}

impl TransportError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Running delivery totals reported by a transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryMetrics {
    pub calls: u64,
    pub recipients: u64,
    pub failures: u64,
}

/// A mail delivery provider.
#[async_trait::async_trait]
pub trait MailTransport: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Delivery totals since startup, for transports that keep them.
    fn metrics(&self) -> Option<DeliveryMetrics> {
        None
    }

    /// Deliver one message with every address in `to` on a shared envelope.
    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError>;

    /// Deliver one copy per address in `to`; recipients do not see each
    /// other.
    async fn send_multiple(&self, envelope: &Envelope) -> Result<(), TransportError>;
}
