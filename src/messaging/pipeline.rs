//! Consume pipeline: intake → message channel → sink → ack channel → dispatcher.
//!
//! Three tasks run concurrently. The intake pumps deliveries into the bounded
//! message channel, the sink renders and writes them, and the dispatcher
//! acknowledges them in batches. Stopping always starts at the intake: it
//! cancels the subscription and closes the message channel, the sink drains
//! and closes the ack channel, and the dispatcher drains and flushes.

use super::acks::{AckDispatcher, Acknowledger, DispatchReport};
use super::channel::{self, MessageSender, DEFAULT_ACK_CAPACITY, DEFAULT_MESSAGE_CAPACITY};
use super::error::ConsumeError;
use super::message::{AckMode, FailurePolicy};
use super::prefetch::BatchThreshold;
use super::sink::{self, OutputSink, SinkReport};
use super::source::DeliverySource;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinError;

/// Knobs for one consume invocation.
#[derive(Debug, Clone)]
pub struct ConsumeSettings {
    pub ack_mode: AckMode,
    pub failure_policy: FailurePolicy,
    /// Stop after this many deliveries.
    pub limit: Option<u64>,
    pub message_capacity: usize,
    pub ack_capacity: usize,
    /// Upper bound on the drain phase once intake stops.
    pub drain_timeout: Option<Duration>,
}

impl Default for ConsumeSettings {
    fn default() -> Self {
        Self {
            ack_mode: AckMode::default(),
            failure_policy: FailurePolicy::default(),
            limit: None,
            message_capacity: DEFAULT_MESSAGE_CAPACITY,
            ack_capacity: DEFAULT_ACK_CAPACITY,
            drain_timeout: None,
        }
    }
}

/// Why the intake stopped pulling deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The subscription ended (consumer cancelled by the broker).
    SourceEnded,
    /// The configured message-count limit was reached.
    Limit,
    /// Shutdown was requested, or the dispatcher failed.
    Shutdown,
    /// The sink went away before the source ended.
    SinkClosed,
}

/// Outcome of a pipeline run that drained cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeReport {
    pub received: u64,
    pub stop: StopReason,
    pub sink: SinkReport,
    pub dispatch: DispatchReport,
}

struct IntakeReport {
    received: u64,
    stop: StopReason,
}

/// Run the pipeline to completion.
///
/// Setting `shutdown` to `true` stops intake; everything already in the
/// message channel is still written and acknowledged unless the drain timeout
/// elapses first.
pub async fn run_pipeline<Src, S, A>(
    source: Src,
    sink: S,
    acker: A,
    settings: ConsumeSettings,
    mut shutdown: watch::Receiver<bool>,
) -> Result<ConsumeReport, ConsumeError>
where
    Src: DeliverySource + 'static,
    S: OutputSink + 'static,
    A: Acknowledger + 'static,
{
    let threshold = BatchThreshold::from_prefetch(source.prefetch_count());
    let (msg_tx, msg_rx) = channel::bounded(settings.message_capacity)
        .map_err(|err| ConsumeError::Config(format!("message channel: {err}")))?;
    let (ack_tx, ack_rx) = channel::bounded(settings.ack_capacity)
        .map_err(|err| ConsumeError::Config(format!("ack channel: {err}")))?;
    let (stop_tx, stop_rx) = watch::channel(*shutdown.borrow_and_update());

    tracing::debug!(
        ack_mode = %settings.ack_mode,
        on_failure = %settings.failure_policy,
        batch = threshold.get(),
        message_capacity = settings.message_capacity,
        ack_capacity = settings.ack_capacity,
        "starting consume pipeline"
    );

    let mut intake = tokio::spawn(intake(source, msg_tx, settings.limit, stop_rx));
    let ack_mode = settings.ack_mode;
    let sink_task =
        tokio::task::spawn_blocking(move || sink::process(sink, msg_rx, ack_tx, ack_mode));
    let mut dispatcher = tokio::spawn(
        AckDispatcher::new(acker, settings.ack_mode, threshold)
            .with_policy(settings.failure_policy)
            .run(ack_rx),
    );

    let mut shutdown_open = true;
    let mut dispatched: Option<Result<DispatchReport, ConsumeError>> = None;
    let intake_result = loop {
        tokio::select! {
            res = &mut intake => break joined("intake", res),
            changed = shutdown.changed(), if shutdown_open => match changed {
                Ok(()) => {
                    if *shutdown.borrow_and_update() {
                        tracing::info!("shutdown requested; draining");
                        let _ = stop_tx.send(true);
                    }
                }
                Err(_) => shutdown_open = false,
            },
            res = &mut dispatcher, if dispatched.is_none() => {
                let res = joined("dispatcher", res);
                if res.is_err() {
                    let _ = stop_tx.send(true);
                }
                dispatched = Some(res);
            }
        }
    };

    let sink_abort = sink_task.abort_handle();
    let dispatcher_abort = dispatcher.abort_handle();
    let drain = async move {
        let sink_report = sink_task
            .await
            .map_err(|source| ConsumeError::Task {
                stage: "sink",
                source,
            })?;
        let dispatch = match dispatched {
            Some(res) => res,
            None => joined("dispatcher", dispatcher.await),
        };
        Ok::<_, ConsumeError>((sink_report, dispatch))
    };
    let (sink_report, dispatch) = match settings.drain_timeout {
        Some(limit) => match tokio::time::timeout(limit, drain).await {
            Ok(res) => res?,
            Err(_) => {
                // Only effective if the sink has not started; a write stuck
                // in the blocking pool is left for runtime shutdown.
                sink_abort.abort();
                dispatcher_abort.abort();
                tracing::warn!(?limit, "drain timed out; unacknowledged messages will be redelivered");
                return Err(ConsumeError::DrainTimeout(limit));
            }
        },
        None => drain.await?,
    };

    let dispatch = dispatch?;
    let intake = intake_result?;
    tracing::info!(
        received = intake.received,
        written = sink_report.written,
        failed = sink_report.failed,
        broker_calls = dispatch.broker_calls,
        stop = ?intake.stop,
        "consume pipeline drained"
    );
    Ok(ConsumeReport {
        received: intake.received,
        stop: intake.stop,
        sink: sink_report,
        dispatch,
    })
}

fn joined<T>(
    stage: &'static str,
    res: Result<Result<T, ConsumeError>, JoinError>,
) -> Result<T, ConsumeError> {
    res.map_err(|source| ConsumeError::Task { stage, source })?
}

/// Pull deliveries into the message channel until stopped.
///
/// A channel slot is reserved before the next delivery is requested, so a
/// delivery is never held while the channel is full.
async fn intake<Src: DeliverySource>(
    mut source: Src,
    tx: MessageSender,
    limit: Option<u64>,
    mut stop: watch::Receiver<bool>,
) -> Result<IntakeReport, ConsumeError> {
    let mut received = 0u64;
    let outcome = loop {
        if limit.is_some_and(|limit| received >= limit) {
            break Ok(StopReason::Limit);
        }
        let permit = tokio::select! {
            biased;
            _ = stop.wait_for(|stopped| *stopped) => break Ok(StopReason::Shutdown),
            permit = tx.reserve() => match permit {
                Ok(permit) => permit,
                Err(_) => break Ok(StopReason::SinkClosed),
            },
        };
        let next = tokio::select! {
            biased;
            _ = stop.wait_for(|stopped| *stopped) => break Ok(StopReason::Shutdown),
            next = source.next_delivery() => next,
        };
        match next {
            Some(Ok(delivery)) => {
                received += 1;
                permit.send(delivery);
            }
            Some(Err(source)) => break Err(source),
            None => break Ok(StopReason::SourceEnded),
        }
    };

    if let Err(err) = source.cancel().await {
        tracing::debug!(error = %err, "cancel subscription failed");
    }
    drop(tx);

    match outcome {
        Ok(stop) => {
            tracing::debug!(received, ?stop, "intake stopped");
            Ok(IntakeReport { received, stop })
        }
        Err(source) => Err(ConsumeError::Source { received, source }),
    }
}
