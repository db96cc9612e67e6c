//! # Batch Pipeline
//!
//! Sends a recipient list through a [`MailTransport`] as consecutive
//! fixed-size batches, one at a time. The running [`DispatchReport`] is
//! folded forward after every confirmed batch; the first transport failure
//! stops the pipeline and is returned together with the report so far.

use super::DispatchReport;
use crate::error::{Error, Result};
use crate::mail::{Envelope, MailTransport};

/// Consecutive slices of at most `batch_size` recipients (0 acts as 1).
pub fn partition(recipients: &[String], batch_size: usize) -> std::slice::Chunks<'_, String> {
    recipients.chunks(batch_size.max(1))
}

/// Number of batches `partition` yields for `total` recipients.
pub fn batch_count(total: usize, batch_size: usize) -> usize {
    total.div_ceil(batch_size.max(1))
}

/// Send `template` to every recipient, one awaited batch at a time.
pub async fn send_batches(
    transport: &dyn MailTransport,
    template: &Envelope,
    recipients: &[String],
    batch_size: usize,
) -> Result<DispatchReport> {
    let planned = batch_count(recipients.len(), batch_size);
    let mut report = DispatchReport::start(recipients.len());

    for (index, batch) in partition(recipients, batch_size).enumerate() {
        let envelope = template.addressed_to(batch.to_vec());

        if let Err(err) = transport.send_multiple(&envelope).await {
            tracing::error!(
                "Batch {}/{} via {} failed after {} sent: {}",
                index + 1,
                planned,
                transport.name(),
                report.sent,
                err
            );
            return Err(Error::DispatchFailed {
                reason: err.reason,
                report,
            });
        }

        report = report.record_batch(batch.len());
        tracing::info!(
            "Batch {}/{} via {} delivered ({} recipients, {} total)",
            index + 1,
            planned,
            transport.name(),
            batch.len(),
            report.sent
        );
    }

    Ok(report)
}
