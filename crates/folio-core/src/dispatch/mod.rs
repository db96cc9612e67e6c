//! # Bulk Dispatcher
//!
//! Resolves who a mass email goes to and pushes it through the mail
//! transport in sequential batches.
//!
//! ```text
//! RecipientSpec ──► resolve ──► dedupe ──► partition(batch_size) ──► send_multiple × N
//!      │                                                                  │
//!      └─ Search(query) ─► RecordSource::fetch_all ─► query::apply        └─► DispatchReport
//! ```
//!
//! The only suspension points are the one-time candidate fetch and each
//! batch send. A failure at batch *k* leaves batches `1..k` confirmed and
//! the rest unattempted.

pub mod batch;
pub mod recipients;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mail::{Envelope, MailTransport};
use crate::query::{Query, QueryParams};
use crate::source::RecordSource;

pub use recipients::{dedupe, derive_addresses, split_addresses, Recipients};

/// Maximum recipients per transport call unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Subject and body of a bulk message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

impl Message {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Default::default()
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    /// A subject and at least one non-empty body are required.
    pub fn validate(&self) -> Result<()> {
        let has_body = non_empty(&self.text).is_some() || non_empty(&self.html).is_some();
        if self.subject.is_empty() || !has_body {
            return Err(Error::invalid("Missing fields: subject AND (text or html)"));
        }
        Ok(())
    }

    /// Envelope template with no recipients yet; empty bodies are omitted.
    pub fn envelope(&self, from: &str) -> Envelope {
        Envelope {
            to: Vec::new(),
            from: from.to_string(),
            subject: self.subject.clone(),
            text: non_empty(&self.text),
            html: non_empty(&self.html),
            attachments: Vec::new(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}

/// Who a bulk message goes to.
#[derive(Debug, Clone, PartialEq)]
pub enum RecipientSpec {
    /// Addresses given directly by the caller.
    Explicit(Recipients),
    /// Addresses taken from the records matching a query.
    Search(Query),
}

impl RecipientSpec {
    /// Pick the recipient source from a request's `to` / `search` fields.
    ///
    /// A present, non-empty `to` wins; an empty string or list falls back
    /// to `search`. With neither, the request is invalid.
    pub fn from_request(to: Option<Recipients>, search: Option<QueryParams>) -> Result<Self> {
        match (to.filter(Recipients::is_present), search) {
            (Some(to), _) => Ok(RecipientSpec::Explicit(to)),
            (None, Some(search)) => Ok(RecipientSpec::Search(search.to_query())),
            (None, None) => Err(Error::invalid(
                "Provide either \"to\" (array/string) or \"search\" (object) to build recipients",
            )),
        }
    }
}

/// Static dispatch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Sender address stamped on every envelope.
    pub from: String,
    pub batch_size: usize,
    /// Collection searched when recipients come from a query.
    pub recipient_collection: String,
    /// Field holding the address on each record of that collection.
    pub email_field: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            from: String::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            recipient_collection: "users".to_string(),
            email_field: "email".to_string(),
        }
    }
}

/// Summary of one dispatch call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub total_recipients: usize,
    pub sent: usize,
    pub batches: usize,
}

impl DispatchReport {
    pub fn start(total_recipients: usize) -> Self {
        Self {
            total_recipients,
            sent: 0,
            batches: 0,
        }
    }

    /// The report after one more confirmed batch of `size` recipients.
    #[must_use]
    pub fn record_batch(self, size: usize) -> Self {
        Self {
            sent: self.sent + size,
            batches: self.batches + 1,
            ..self
        }
    }

    pub fn is_complete(&self) -> bool {
        self.sent == self.total_recipients
    }
}

/// Bulk dispatcher bound to its collaborators.
pub struct Dispatcher {
    source: Arc<dyn RecordSource>,
    transport: Arc<dyn MailTransport>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        source: Arc<dyn RecordSource>,
        transport: Arc<dyn MailTransport>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            source,
            transport,
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Validate, resolve, and send `message` to everyone `spec` names.
    pub async fn dispatch(&self, spec: &RecipientSpec, message: &Message) -> Result<DispatchReport> {
        message.validate()?;
        if self.config.from.trim().is_empty() {
            return Err(Error::Configuration(
                "MAIL_FROM is not set on server".to_string(),
            ));
        }

        let recipients = self.resolve(spec).await?;
        if recipients.is_empty() {
            tracing::warn!("Bulk dispatch rejected: no valid recipients");
            return Err(Error::invalid("No valid recipients"));
        }

        tracing::info!(
            "Dispatching '{}' to {} recipients in batches of {}",
            message.subject,
            recipients.len(),
            self.config.batch_size
        );

        let template = message.envelope(&self.config.from);
        batch::send_batches(
            self.transport.as_ref(),
            &template,
            &recipients,
            self.config.batch_size,
        )
        .await
    }

    /// The deduplicated address list `spec` resolves to.
    pub async fn resolve(&self, spec: &RecipientSpec) -> Result<Vec<String>> {
        let addresses = match spec {
            RecipientSpec::Explicit(to) => to.addresses(),
            RecipientSpec::Search(query) => {
                let records = self
                    .source
                    .fetch_all(&self.config.recipient_collection)
                    .await
                    .map_err(|err| {
                        tracing::error!("Recipient fetch failed: {}", err);
                        Error::from(err)
                    })?;
                derive_addresses(&records, query, &self.config.email_field)
            }
        };
        Ok(dedupe(addresses))
    }
}
