//! Consume command: stream a queue to stdout or a rotating file (kcat -C style).

use super::shutdown_signal;
use crate::broker::{AmqpAcker, AmqpSource, Session};
use crate::cli::args::ConsumeArgs;
use crate::config::Config;
use crate::messaging::{
    run_pipeline, ConsoleSink, ConsumeReport, ConsumeSettings, Formatter, RotatingFileSink, Sink,
    StopReason,
};
use anyhow::{Context, Result};
use tokio::sync::watch;

/// Run the consume command until the queue subscription ends, `--count` is
/// reached or SIGINT/SIGTERM arrives; in-flight messages are drained first.
pub async fn run_consume(cfg: Config, args: ConsumeArgs) -> Result<()> {
    let cfg = merge_args(cfg, &args);
    cfg.validate()?;

    let sink = open_sink(&cfg)?;
    let settings = ConsumeSettings {
        ack_mode: cfg.consume.ack_mode,
        failure_policy: cfg.consume.on_failure,
        limit: args.count,
        message_capacity: cfg.consume.message_capacity,
        ack_capacity: cfg.consume.ack_capacity,
        drain_timeout: cfg.consume.drain_timeout(),
    };

    let session = Session::open(&cfg.connection).await?;
    let source = AmqpSource::subscribe(
        session.channel.clone(),
        &args.queue,
        args.consumer_tag.clone(),
        cfg.consume.prefetch,
    )
    .await?;
    let acker = AmqpAcker::new(session.channel.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signals = tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(sig) => {
                tracing::info!(signal = sig, "shutting down, draining in-flight messages");
                let _ = shutdown_tx.send(true);
            }
            Err(err) => tracing::warn!(error = %err, "signal handlers unavailable"),
        }
    });

    let result = run_pipeline(source, sink, acker, settings, shutdown_rx).await;
    signals.abort();
    session.close().await;

    let report = result.with_context(|| format!("consume from queue '{}'", args.queue))?;
    log_report(&args.queue, &report);
    Ok(())
}

/// Command-line flags win over the configuration file.
fn merge_args(mut cfg: Config, args: &ConsumeArgs) -> Config {
    let consume = &mut cfg.consume;
    if let Some(prefetch) = args.prefetch {
        consume.prefetch = prefetch;
    }
    if let Some(mode) = args.ack_mode {
        consume.ack_mode = mode;
    }
    if let Some(policy) = args.on_failure {
        consume.on_failure = policy;
    }
    if let Some(capacity) = args.message_capacity {
        consume.message_capacity = capacity;
    }
    if let Some(capacity) = args.ack_capacity {
        consume.ack_capacity = capacity;
    }
    if let Some(ms) = args.drain_timeout_ms {
        consume.drain_timeout_ms = ms;
    }

    let output = &mut cfg.output;
    if let Some(format) = args.format {
        output.format = format;
    }
    if let Some(path) = &args.output {
        output.file = Some(path.clone());
    }
    if let Some(bytes) = args.max_file_bytes {
        output.max_file_bytes = bytes;
    }
    if let Some(files) = args.max_files {
        output.max_files = files;
    }
    cfg
}

fn open_sink(cfg: &Config) -> Result<Sink> {
    let formatter = Formatter::new(cfg.output.format);
    match &cfg.output.file {
        Some(path) => {
            let sink = RotatingFileSink::open(path, formatter, cfg.output.rotation())
                .with_context(|| format!("open output file {}", path.display()))?;
            Ok(Sink::File(sink))
        }
        None => Ok(Sink::Console(ConsoleSink::stdout(formatter))),
    }
}

fn log_report(queue: &str, report: &ConsumeReport) {
    let stop = match report.stop {
        StopReason::SourceEnded => "subscription ended",
        StopReason::Limit => "count reached",
        StopReason::Shutdown => "shutdown",
        StopReason::SinkClosed => "output closed",
    };
    tracing::info!(
        queue,
        received = report.received,
        written = report.sink.written,
        failed = report.sink.failed,
        acked = report.dispatch.acked,
        rejected = report.dispatch.rejected,
        requeued = report.dispatch.requeued,
        halted = report.dispatch.halted,
        stop,
        "consume finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::cli::Commands;
    use crate::messaging::{AckMode, OutputFormat};
    use clap::Parser;
    use std::path::PathBuf;

    fn consume_args(argv: &[&str]) -> ConsumeArgs {
        let mut full = vec!["rmqcat", "consume"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Consume(args) => args,
            _ => panic!("expected consume"),
        }
    }

    #[test]
    fn flags_override_file_settings() {
        let mut cfg = Config::default();
        cfg.consume.prefetch = 50;
        cfg.consume.ack_mode = AckMode::Requeue;
        cfg.output.max_files = 9;

        let args = consume_args(&[
            "--queue",
            "jobs",
            "--prefetch",
            "-1",
            "--ack-mode",
            "reject",
            "--format",
            "json",
            "--output",
            "out.log",
            "--drain-timeout-ms",
            "0",
        ]);
        let cfg = merge_args(cfg, &args);

        assert_eq!(cfg.consume.prefetch, -1);
        assert_eq!(cfg.consume.ack_mode, AckMode::Reject);
        assert_eq!(cfg.consume.drain_timeout(), None);
        assert_eq!(cfg.output.format, OutputFormat::Json);
        assert_eq!(cfg.output.file, Some(PathBuf::from("out.log")));
        assert_eq!(cfg.output.max_files, 9);
    }

    #[test]
    fn file_settings_kept_without_flags() {
        let mut cfg = Config::default();
        cfg.consume.prefetch = 7;
        let merged = merge_args(cfg.clone(), &consume_args(&["--queue", "jobs"]));
        assert_eq!(merged, cfg);
    }

    #[test]
    fn opens_file_sink_when_output_set() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = Config::default();
        cfg.output.file = Some(dir.path().join("out.log"));
        assert!(matches!(open_sink(&cfg).unwrap(), Sink::File(_)));

        cfg.output.file = None;
        assert!(matches!(open_sink(&cfg).unwrap(), Sink::Console(_)));
    }
}
