//! # SendGrid Transport
//!
//! Delivers envelopes through the SendGrid v3 `mail/send` API. A shared
//! envelope becomes one personalization listing every address; a
//! multi-recipient send becomes one personalization per address so that
//! recipients do not see each other.

use folio_core::{DeliveryMetrics, Envelope, MailTransport, TransportError};
use serde_json::{json, Value};

use super::DeliveryCounters;

pub struct SendGridTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    counters: DeliveryCounters,
}

impl SendGridTransport {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            counters: DeliveryCounters::default(),
        }
    }

    async fn post(&self, body: Value, recipients: usize) -> Result<(), TransportError> {
        let result = self.deliver(body).await;
        match &result {
            Ok(()) => self.counters.record_success(recipients),
            Err(err) => {
                self.counters.record_failure();
                tracing::error!("SendGrid rejected message: {}", err);
            }
        }
        result
    }

    async fn deliver(&self, body: Value) -> Result<(), TransportError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| TransportError::new("SENDGRID_API_KEY is not set on server"))?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(TransportError::new(error_reason(status.as_u16(), &text)))
    }
}

/// Request body with the given personalizations.
fn payload(envelope: &Envelope, personalizations: Vec<Value>) -> Value {
    let mut content = Vec::new();
    if let Some(text) = &envelope.text {
        content.push(json!({ "type": "text/plain", "value": text }));
    }
    if let Some(html) = &envelope.html {
        content.push(json!({ "type": "text/html", "value": html }));
    }

    let mut body = json!({
        "personalizations": personalizations,
        "from": { "email": envelope.from },
        "subject": envelope.subject,
        "content": content,
    });
    if !envelope.attachments.is_empty() {
        body["attachments"] = json!(envelope.attachments);
    }
    body
}

fn shared_payload(envelope: &Envelope) -> Value {
    let to: Vec<Value> = envelope.to.iter().map(|addr| json!({ "email": addr })).collect();
    payload(envelope, vec![json!({ "to": to })])
}

fn separate_payload(envelope: &Envelope) -> Value {
    let personalizations = envelope
        .to
        .iter()
        .map(|addr| json!({ "to": [{ "email": addr }] }))
        .collect();
    payload(envelope, personalizations)
}

/// The provider's own messages when the body carries them, else the status.
fn error_reason(status: u16, body: &str) -> String {
    let messages: Vec<String> = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("errors").and_then(Value::as_array).cloned())
        .unwrap_or_default()
        .iter()
        .filter_map(|e| e.get("message").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    if messages.is_empty() {
        format!("SendGrid responded with HTTP {status}")
    } else {
        messages.join("; ")
    }
}

#[async_trait::async_trait]
impl MailTransport for SendGridTransport {
    fn name(&self) -> &str {
        "sendgrid"
    }

    fn metrics(&self) -> Option<DeliveryMetrics> {
        Some(self.counters.snapshot())
    }

    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        self.post(shared_payload(envelope), envelope.to.len()).await
    }

    async fn send_multiple(&self, envelope: &Envelope) -> Result<(), TransportError> {
        self.post(separate_payload(envelope), envelope.to.len()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::Attachment;

    fn envelope() -> Envelope {
        Envelope {
            to: vec!["alice@example.com".into(), "bob@example.com".into()],
            from: "noreply@example.com".into(),
            subject: "Reading list".into(),
            text: Some("plain".into()),
            html: Some("<p>rich</p>".into()),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_shared_payload_lists_everyone_once() {
        let body = shared_payload(&envelope());
        assert_eq!(body["personalizations"].as_array().unwrap().len(), 1);
        assert_eq!(body["personalizations"][0]["to"][1]["email"], "bob@example.com");
        assert_eq!(body["from"]["email"], "noreply@example.com");
        assert_eq!(body["content"][0]["type"], "text/plain");
        assert_eq!(body["content"][1]["value"], "<p>rich</p>");
        assert!(body.get("attachments").is_none());
    }

    #[test]
    fn test_separate_payload_isolates_recipients() {
        let body = separate_payload(&envelope());
        let personalizations = body["personalizations"].as_array().unwrap();
        assert_eq!(personalizations.len(), 2);
        assert_eq!(personalizations[0]["to"].as_array().unwrap().len(), 1);
        assert_eq!(personalizations[1]["to"][0]["email"], "bob@example.com");
    }

    #[test]
    fn test_attachments_use_provider_field_names() {
        let mut envelope = envelope();
        envelope.attachments.push(Attachment {
            content: "JVBERi0=".into(),
            filename: "list.pdf".into(),
            content_type: "application/pdf".into(),
            disposition: "attachment".into(),
        });
        let body = shared_payload(&envelope);
        assert_eq!(body["attachments"][0]["type"], "application/pdf");
        assert_eq!(body["attachments"][0]["filename"], "list.pdf");
    }

    #[test]
    fn test_error_reason() {
        let body = r#"{"errors":[{"message":"The from address does not match a verified Sender Identity."}]}"#;
        assert_eq!(
            error_reason(403, body),
            "The from address does not match a verified Sender Identity."
        );
        assert_eq!(error_reason(502, "<html>"), "SendGrid responded with HTTP 502");
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let transport = SendGridTransport::new("http://127.0.0.1:9/v3/mail/send".into(), None);
        let err = transport.send(&envelope()).await.unwrap_err();
        assert_eq!(err.reason, "SENDGRID_API_KEY is not set on server");
        let metrics = transport.metrics().unwrap();
        assert_eq!((metrics.calls, metrics.failures), (1, 1));
    }
}
