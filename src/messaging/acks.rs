//! Acknowledgment dispatch for consumed deliveries.
//!
//! The dispatcher drains the ack channel and turns decisions into as few
//! broker calls as possible:
//! - consecutive successes are coalesced into one multi-ack (or multi-reject)
//! - a failure is requeued on its own, immediately
//! - whatever is still pending when the channel closes is flushed once
//!
//! Under [`AckMode::Requeue`] nothing is acknowledged and the channel is never
//! read.

use super::channel::AckReceiver;
use super::error::{BrokerError, ConsumeError};
use super::message::{AckDecision, AckMode, FailurePolicy};
use super::prefetch::BatchThreshold;
use futures::future::BoxFuture;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Broker primitives
// ---------------------------------------------------------------------------

/// Broker acknowledgment primitives.
///
/// Only the dispatcher calls these, sequentially from a single task.
pub trait Acknowledger: Send + Sync {
    /// Positive acknowledgment of `tag` (and every earlier outstanding tag
    /// when `multiple` is set).
    fn ack(&self, tag: u64, multiple: bool) -> BoxFuture<'_, Result<(), BrokerError>>;

    /// Negative acknowledgment of `tag` (and every earlier outstanding tag
    /// when `multiple` is set).
    fn nack(&self, tag: u64, multiple: bool, requeue: bool)
        -> BoxFuture<'_, Result<(), BrokerError>>;
}

impl<A: Acknowledger + ?Sized> Acknowledger for Arc<A> {
    fn ack(&self, tag: u64, multiple: bool) -> BoxFuture<'_, Result<(), BrokerError>> {
        (**self).ack(tag, multiple)
    }

    fn nack(
        &self,
        tag: u64,
        multiple: bool,
        requeue: bool,
    ) -> BoxFuture<'_, Result<(), BrokerError>> {
        (**self).nack(tag, multiple, requeue)
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Counters describing one dispatcher run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Decisions read from the ack channel.
    pub decisions: u64,
    /// Successful decisions covered by a positive multi-ack.
    pub acked: u64,
    /// Successful decisions covered by a multi-reject.
    pub rejected: u64,
    /// Failed decisions requeued individually.
    pub requeued: u64,
    /// Total ack/nack calls issued.
    pub broker_calls: u64,
    /// Set when the dispatcher stopped early under [`FailurePolicy::Halt`].
    pub halted: bool,
}

/// Translates ack decisions into batched broker acknowledgments.
///
/// The tag cursors are owned by the single dispatcher task.
pub struct AckDispatcher<A> {
    acker: A,
    mode: AckMode,
    policy: FailurePolicy,
    threshold: u64,
    last_seen_tag: u64,
    last_flushed_tag: u64,
    /// Successes seen since the last flush.
    pending: u64,
    report: DispatchReport,
}

impl<A: Acknowledger> AckDispatcher<A> {
    pub fn new(acker: A, mode: AckMode, threshold: BatchThreshold) -> Self {
        Self {
            acker,
            mode,
            policy: FailurePolicy::default(),
            threshold: threshold.get(),
            last_seen_tag: 0,
            last_flushed_tag: 0,
            pending: 0,
            report: DispatchReport::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Drain `decisions` until it closes (or until the first failure under
    /// [`FailurePolicy::Halt`]), then flush what is pending.
    pub async fn run(mut self, mut decisions: AckReceiver) -> Result<DispatchReport, ConsumeError> {
        if !self.mode.acknowledges() {
            tracing::debug!(mode = %self.mode, "acknowledgment disabled; dispatcher idle");
            return Ok(self.report);
        }

        while let Some(decision) = decisions.recv().await {
            self.report.decisions += 1;
            if !self.apply(decision).await? {
                self.report.halted = true;
                tracing::warn!(
                    tag = decision.delivery_tag,
                    "processing failed; acknowledgment halted for the rest of the session"
                );
                return Ok(self.report);
            }
        }

        self.flush().await?;
        tracing::debug!(
            decisions = self.report.decisions,
            broker_calls = self.report.broker_calls,
            "ack channel drained"
        );
        Ok(self.report)
    }

    /// Apply one decision. Returns `false` when dispatch must stop.
    async fn apply(&mut self, decision: AckDecision) -> Result<bool, ConsumeError> {
        let AckDecision {
            delivery_tag: tag,
            success,
        } = decision;

        if !success {
            self.call_nack(tag, false, true).await?;
            self.report.requeued += 1;
            return Ok(self.policy == FailurePolicy::Continue);
        }

        self.last_seen_tag = self.last_seen_tag.max(tag);
        self.pending += 1;
        if self.last_seen_tag.saturating_sub(self.last_flushed_tag) >= self.threshold {
            self.flush().await?;
        }
        Ok(true)
    }

    /// Multi-ack (or multi-reject) everything up to `last_seen_tag`.
    async fn flush(&mut self) -> Result<(), ConsumeError> {
        if self.last_flushed_tag >= self.last_seen_tag {
            return Ok(());
        }
        let tag = self.last_seen_tag;
        match self.mode {
            AckMode::Ack => {
                self.call_ack(tag).await?;
                self.report.acked += self.pending;
            }
            AckMode::Reject => {
                self.call_nack(tag, true, false).await?;
                self.report.rejected += self.pending;
            }
            AckMode::Requeue => return Ok(()),
        }
        tracing::debug!(tag, covered = self.pending, mode = %self.mode, "flushed batch");
        self.last_flushed_tag = tag;
        self.pending = 0;
        Ok(())
    }

    async fn call_ack(&mut self, tag: u64) -> Result<(), ConsumeError> {
        self.report.broker_calls += 1;
        self.acker
            .ack(tag, true)
            .await
            .map_err(|source| ConsumeError::Acknowledge { tag, source })
    }

    async fn call_nack(&mut self, tag: u64, multiple: bool, requeue: bool) -> Result<(), ConsumeError> {
        self.report.broker_calls += 1;
        self.acker
            .nack(tag, multiple, requeue)
            .await
            .map_err(|source| ConsumeError::Acknowledge { tag, source })
    }
}
