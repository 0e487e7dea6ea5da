//! Pricing computation channel
//!
//! Quotes run on a dedicated task rather than inline with request handling;
//! callers talk to it through a bounded mpsc channel and get their answer on
//! a oneshot. Errors travel across the channel as values.
//!
//! Requests carry a monotonic sequence number. A caller that fires quotes in
//! quick succession (the booking form recalculates on every toggle) keeps a
//! [`QuoteTicket`] per request and discards any reply whose ticket has been
//! superseded by a newer one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::domain::pricing::{PriceResult, ServiceConfiguration};
use crate::error::CalculationError;
use crate::pricing::calculator;
use crate::pricing::tables::PricingTables;

struct QuoteJob {
    seq: u64,
    config: ServiceConfiguration,
    reply: oneshot::Sender<Result<PriceResult, CalculationError>>,
}

/// Handle to the pricing engine task. Cheap to clone.
#[derive(Clone)]
pub struct PricingHandle {
    tx: mpsc::Sender<QuoteJob>,
    latest_seq: Arc<AtomicU64>,
}

/// Tracks whether a newer quote request has been issued since this one.
pub struct QuoteTicket {
    seq: u64,
    latest_seq: Arc<AtomicU64>,
}

impl QuoteTicket {
    pub fn is_superseded(&self) -> bool {
        self.latest_seq.load(Ordering::SeqCst) != self.seq
    }
}

/// Spawn the engine task. The tables move into the task and stay immutable
/// for its lifetime.
pub fn spawn(tables: PricingTables, queue_depth: usize) -> PricingHandle {
    let (tx, mut rx) = mpsc::channel::<QuoteJob>(queue_depth.max(1));

    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            let result = calculator::calculate(&job.config, &tables);
            if let Err(ref e) = result {
                tracing::warn!(seq = job.seq, error = %e, "quote calculation failed");
            }
            // The caller may have gone away; that's fine.
            let _ = job.reply.send(result);
        }
        tracing::debug!("pricing engine channel closed");
    });

    PricingHandle {
        tx,
        latest_seq: Arc::new(AtomicU64::new(0)),
    }
}

impl PricingHandle {
    fn issue_ticket(&self) -> QuoteTicket {
        let seq = self.latest_seq.fetch_add(1, Ordering::SeqCst) + 1;
        QuoteTicket {
            seq,
            latest_seq: Arc::clone(&self.latest_seq),
        }
    }

    async fn submit(
        &self,
        seq: u64,
        config: ServiceConfiguration,
    ) -> Result<PriceResult, CalculationError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(QuoteJob {
                seq,
                config,
                reply: reply_tx,
            })
            .await
            .map_err(|_| CalculationError::EngineUnavailable)?;
        reply_rx
            .await
            .map_err(|_| CalculationError::EngineUnavailable)?
    }

    /// Request a quote and wait for it.
    pub async fn quote(
        &self,
        config: ServiceConfiguration,
    ) -> Result<PriceResult, CalculationError> {
        let ticket = self.issue_ticket();
        self.submit(ticket.seq, config).await
    }

    /// Request a quote, but return `None` when a newer request was issued
    /// while this one was in flight. The stale result is computed and then
    /// dropped on the floor; the engine itself never cancels.
    pub async fn quote_latest(
        &self,
        config: ServiceConfiguration,
    ) -> Result<Option<PriceResult>, CalculationError> {
        let ticket = self.issue_ticket();
        let result = self.submit(ticket.seq, config).await?;
        if ticket.is_superseded() {
            tracing::debug!(seq = ticket.seq, "discarding stale quote reply");
            return Ok(None);
        }
        Ok(Some(result))
    }
}
