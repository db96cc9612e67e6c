//! Transport that accepts every message and writes a summary to the log.
//! Used for local development and as the default provider.

use folio_core::{DeliveryMetrics, Envelope, MailTransport, TransportError};

use super::DeliveryCounters;

#[derive(Debug, Default)]
pub struct LogTransport {
    counters: DeliveryCounters,
}

impl LogTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MailTransport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    fn metrics(&self) -> Option<DeliveryMetrics> {
        Some(self.counters.snapshot())
    }

    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        tracing::info!(
            "[mail] '{}' from {} to {} ({} attachments)",
            envelope.subject,
            envelope.from,
            envelope.to.join(", "),
            envelope.attachments.len()
        );
        self.counters.record_success(envelope.to.len());
        Ok(())
    }

    async fn send_multiple(&self, envelope: &Envelope) -> Result<(), TransportError> {
        tracing::info!(
            "[mail] '{}' from {} to {} separate recipients",
            envelope.subject,
            envelope.from,
            envelope.to.len()
        );
        self.counters.record_success(envelope.to.len());
        Ok(())
    }
}
