//! # Mail Providers
//!
//! [`MailTransport`] implementations the hub can be configured with, and the
//! delivery counters they report through [`MailTransport::metrics`].

pub mod log;
pub mod sendgrid;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use folio_core::{DeliveryMetrics, MailTransport};

use crate::config::{MailConfig, MailProvider};

pub use self::log::LogTransport;
pub use self::sendgrid::SendGridTransport;

/// Delivery counters for one transport.
#[derive(Debug, Default)]
pub struct DeliveryCounters {
    calls: AtomicU64,
    recipients: AtomicU64,
    failures: AtomicU64,
}

impl DeliveryCounters {
    pub fn record_success(&self, recipients: usize) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.recipients.fetch_add(recipients as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DeliveryMetrics {
        DeliveryMetrics {
            calls: self.calls.load(Ordering::Relaxed),
            recipients: self.recipients.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Build the transport selected by `[mail].provider`.
///
/// SendGrid without an API key still builds; every send then fails with a
/// configuration message instead of the hub refusing to start.
pub fn build_transport(config: &MailConfig) -> Arc<dyn MailTransport> {
    match config.provider {
        MailProvider::SendGrid => {
            if config.api_key.is_none() {
                tracing::warn!("SendGrid selected but SENDGRID_API_KEY is not set");
            }
            Arc::new(SendGridTransport::new(
                config.endpoint.clone(),
                config.api_key.clone(),
            ))
        }
        MailProvider::Log => {
            tracing::info!("Mail provider 'log': messages are logged, not delivered");
            Arc::new(LogTransport::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let counters = DeliveryCounters::default();
        counters.record_success(200);
        counters.record_success(50);
        counters.record_failure();
        assert_eq!(
            counters.snapshot(),
            DeliveryMetrics {
                calls: 3,
                recipients: 250,
                failures: 1
            }
        );
    }

    #[test]
    fn test_provider_selection() {
        let mut config = MailConfig::default();
        assert_eq!(build_transport(&config).name(), "log");
        assert_eq!(build_transport(&config).metrics(), Some(DeliveryMetrics::default()));
        config.provider = MailProvider::SendGrid;
        assert_eq!(build_transport(&config).name(), "sendgrid");
    }
}
