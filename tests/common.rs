//! Common test harness utilities for integration tests.
//!
//! This module provides in-memory stand-ins for the broker side of the
//! consume pipeline:
//! - `VecSource` - scripted deliveries with pull and cancel counters
//! - `RecordingAcker` - records every ack/nack call, optionally failing or stalling
//! - `MemorySink` - records written tags, can fail tags or block on a gate

// Not all test files use all helpers; silence dead_code warnings for unused exports.
#![allow(dead_code)]

use futures::future::BoxFuture;
use futures::FutureExt;
use rmqcat::messaging::{
    Acknowledger, BrokerError, Delivery, DeliverySource, OutputSink, SinkError,
};
use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

/// Build `count` deliveries tagged `1..=count` on queue `jobs`.
pub fn deliveries(count: u64) -> Vec<Delivery> {
    (1..=count)
        .map(|tag| Delivery::new(tag, "jobs", format!("message {tag}")).with_routing_key("jobs"))
        .collect()
}

/// What a `VecSource` does once its scripted deliveries run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhenEmpty {
    /// End the subscription.
    End,
    /// Stay open with nothing to deliver, like an idle queue.
    Idle,
    /// Fail the stream.
    Fail,
}

/// Scripted delivery source.
pub struct VecSource {
    queue: VecDeque<Delivery>,
    prefetch: i64,
    when_empty: WhenEmpty,
    pulled: Arc<AtomicU64>,
    cancelled: Arc<AtomicBool>,
}

impl VecSource {
    pub fn new(deliveries: Vec<Delivery>, prefetch: i64) -> Self {
        Self {
            queue: deliveries.into(),
            prefetch,
            when_empty: WhenEmpty::End,
            pulled: Arc::new(AtomicU64::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn when_empty(mut self, when_empty: WhenEmpty) -> Self {
        self.when_empty = when_empty;
        self
    }

    /// Number of deliveries handed out so far.
    pub fn pulled(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.pulled)
    }

    pub fn cancelled(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }
}

impl DeliverySource for VecSource {
    fn next_delivery(&mut self) -> BoxFuture<'_, Option<Result<Delivery, BrokerError>>> {
        async move {
            if let Some(delivery) = self.queue.pop_front() {
                self.pulled.fetch_add(1, Ordering::SeqCst);
                return Some(Ok(delivery));
            }
            match self.when_empty {
                WhenEmpty::End => None,
                WhenEmpty::Idle => std::future::pending().await,
                WhenEmpty::Fail => Some(Err(BrokerError::Closed)),
            }
        }
        .boxed()
    }

    fn cancel(&mut self) -> BoxFuture<'_, Result<(), BrokerError>> {
        self.cancelled.store(true, Ordering::SeqCst);
        futures::future::ready(Ok(())).boxed()
    }

    fn prefetch_count(&self) -> i64 {
        self.prefetch
    }
}

/// One broker acknowledgment call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Ack { tag: u64, multiple: bool },
    Nack { tag: u64, multiple: bool, requeue: bool },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AckBehavior {
    #[default]
    Succeed,
    /// Every call returns a broker error.
    Fail,
    /// Every call hangs forever.
    Stall,
}

/// Acknowledger that records its calls. Clones share the record.
#[derive(Clone, Default)]
pub struct RecordingAcker {
    calls: Arc<Mutex<Vec<Call>>>,
    behavior: AckBehavior,
}

impl RecordingAcker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: AckBehavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> BoxFuture<'_, Result<(), BrokerError>> {
        self.calls.lock().unwrap().push(call);
        match self.behavior {
            AckBehavior::Succeed => futures::future::ready(Ok(())).boxed(),
            AckBehavior::Fail => futures::future::ready(Err(BrokerError::Closed)).boxed(),
            AckBehavior::Stall => std::future::pending().boxed(),
        }
    }
}

impl Acknowledger for RecordingAcker {
    fn ack(&self, tag: u64, multiple: bool) -> BoxFuture<'_, Result<(), BrokerError>> {
        self.record(Call::Ack { tag, multiple })
    }

    fn nack(
        &self,
        tag: u64,
        multiple: bool,
        requeue: bool,
    ) -> BoxFuture<'_, Result<(), BrokerError>> {
        self.record(Call::Nack {
            tag,
            multiple,
            requeue,
        })
    }
}

/// Sink that records the tags it wrote.
#[derive(Default)]
pub struct MemorySink {
    written: Arc<Mutex<Vec<u64>>>,
    fail_tags: Vec<u64>,
    gate: Option<mpsc::Receiver<()>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the write of every listed tag.
    pub fn failing(tags: &[u64]) -> Self {
        Self {
            fail_tags: tags.to_vec(),
            ..Self::default()
        }
    }

    /// Block every write until the returned sender sends a token or is dropped.
    pub fn gated() -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let sink = Self {
            gate: Some(rx),
            ..Self::default()
        };
        (sink, tx)
    }

    pub fn written(&self) -> Arc<Mutex<Vec<u64>>> {
        Arc::clone(&self.written)
    }
}

impl OutputSink for MemorySink {
    fn emit(&mut self, delivery: &Delivery) -> Result<(), SinkError> {
        if let Some(gate) = &self.gate {
            let _ = gate.recv();
        }
        if self.fail_tags.contains(&delivery.delivery_tag) {
            return Err(SinkError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "stdout closed",
            )));
        }
        self.written.lock().unwrap().push(delivery.delivery_tag);
        Ok(())
    }
}

/// Wait for a condition with bounded timeout, polling at intervals.
pub async fn wait_for<F>(timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(interval).await;
    }
    condition()
}

/// Fail the test instead of hanging when `fut` deadlocks.
pub async fn within<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(10), fut)
        .await
        .expect("pipeline did not finish in time")
}
