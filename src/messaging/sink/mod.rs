//! Output sinks: render each delivery, write it, report the outcome.
//!
//! A sink never touches the broker. It only tells the dispatcher, through the
//! ack channel, whether each delivery was written.

mod console;
mod file;

pub use console::ConsoleSink;
pub use file::{RotatingFileSink, RotationPolicy};

use super::channel::{AckSender, MessageReceiver};
use super::error::SinkError;
use super::message::{AckDecision, AckMode, Delivery};

/// Destination for consumed messages.
pub trait OutputSink: Send {
    /// Render and write one delivery.
    fn emit(&mut self, delivery: &Delivery) -> Result<(), SinkError>;

    /// Flush buffered output once the message channel is drained.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Counters describing one sink run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    pub written: u64,
    pub failed: u64,
    /// Decisions dropped because nobody was reading the ack channel anymore.
    pub discarded: u64,
}

/// Drive `sink` until `messages` closes and drains.
///
/// Exactly one decision is pushed per delivery, success or not, except under
/// [`AckMode::Requeue`] where no decision is ever produced and the ack channel
/// is released immediately. If the dispatcher stops reading, later decisions
/// are discarded and the sink keeps writing.
///
/// Writes are blocking, so this must run on a blocking thread (see
/// `tokio::task::spawn_blocking`), never on an async worker.
pub fn process<S: OutputSink>(
    mut sink: S,
    mut messages: MessageReceiver,
    acks: AckSender,
    mode: AckMode,
) -> SinkReport {
    let mut report = SinkReport::default();
    let mut acks = if mode.acknowledges() {
        Some(acks)
    } else {
        drop(acks);
        None
    };
    let mut ack_closed = false;

    while let Some(delivery) = messages.blocking_recv() {
        let tag = delivery.delivery_tag;
        let success = match sink.emit(&delivery) {
            Ok(()) => {
                report.written += 1;
                true
            }
            Err(err) => {
                report.failed += 1;
                tracing::debug!(tag, error = %err, "failed to write message");
                false
            }
        };
        drop(delivery);

        let decision = AckDecision {
            delivery_tag: tag,
            success,
        };
        let sent = match &acks {
            Some(tx) => tx.blocking_send(decision).is_ok(),
            None => !ack_closed,
        };
        if !sent {
            if !ack_closed {
                tracing::debug!(tag, "ack channel closed; discarding further decisions");
                ack_closed = true;
                acks = None;
            }
            report.discarded += 1;
        }
    }

    if let Err(err) = sink.finish() {
        tracing::warn!(error = %err, "failed to flush output");
    }
    report
}

/// Runtime choice between the concrete sinks.
pub enum Sink {
    Console(ConsoleSink),
    File(RotatingFileSink),
}

impl OutputSink for Sink {
    fn emit(&mut self, delivery: &Delivery) -> Result<(), SinkError> {
        match self {
            Self::Console(sink) => sink.emit(delivery),
            Self::File(sink) => sink.emit(delivery),
        }
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        match self {
            Self::Console(sink) => sink.finish(),
            Self::File(sink) => sink.finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::channel::bounded;
    use std::io;

    /// Fails every delivery whose tag is listed.
    struct FlakySink {
        fail: Vec<u64>,
        written: Vec<u64>,
    }

    impl OutputSink for FlakySink {
        fn emit(&mut self, delivery: &Delivery) -> Result<(), SinkError> {
            if self.fail.contains(&delivery.delivery_tag) {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full").into());
            }
            self.written.push(delivery.delivery_tag);
            Ok(())
        }
    }

    fn feed(tags: &[u64]) -> MessageReceiver {
        let (tx, rx) = bounded(tags.len().max(1)).unwrap();
        for tag in tags {
            tx.blocking_send(Delivery::new(*tag, "q", "m")).unwrap();
        }
        rx
    }

    #[test]
    fn one_decision_per_delivery() {
        let messages = feed(&[1, 2, 3]);
        let (ack_tx, mut ack_rx) = bounded(8).unwrap();
        let sink = FlakySink {
            fail: vec![2],
            written: Vec::new(),
        };

        let report = process(sink, messages, ack_tx, AckMode::Ack);

        assert_eq!(report.written, 2);
        assert_eq!(report.failed, 1);
        let mut decisions = Vec::new();
        while let Some(d) = ack_rx.blocking_recv() {
            decisions.push(d);
        }
        assert_eq!(
            decisions,
            vec![
                AckDecision::success(1),
                AckDecision::failure(2),
                AckDecision::success(3),
            ]
        );
    }

    #[test]
    fn requeue_mode_emits_no_decisions() {
        let messages = feed(&[1, 2, 3, 4]);
        // Capacity 1 would block the sink on the second decision if any were sent.
        let (ack_tx, mut ack_rx) = bounded(1).unwrap();
        let sink = FlakySink {
            fail: vec![],
            written: Vec::new(),
        };

        let report = process(sink, messages, ack_tx, AckMode::Requeue);

        assert_eq!(report.written, 4);
        assert_eq!(ack_rx.blocking_recv(), None);
    }

    #[test]
    fn keeps_writing_after_ack_channel_closes() {
        let messages = feed(&[1, 2, 3]);
        let (ack_tx, ack_rx) = bounded(8).unwrap();
        drop(ack_rx);
        let sink = FlakySink {
            fail: vec![],
            written: Vec::new(),
        };

        let report = process(sink, messages, ack_tx, AckMode::Ack);

        assert_eq!(report.written, 3);
        assert_eq!(report.discarded, 3);
    }
}
