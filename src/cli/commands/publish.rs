//! Publish command: send messages from the command line or stdin (kcat -P style).

use super::shutdown_signal;
use crate::broker::{self, PublishRequest, Session};
use crate::cli::args::PublishArgs;
use crate::config::Config;
use anyhow::{Context, Result};
use base64::Engine;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

/// Run the publish command.
pub async fn run_publish(cfg: Config, args: PublishArgs) -> Result<()> {
    cfg.validate()?;

    // Read a whole-stdin payload before connecting so a slow producer does
    // not hold an idle connection open.
    let single = match (&args.routing_key, &args.message) {
        (Some(key), Some(msg)) => Some((key.clone(), msg.as_bytes().to_vec(), "argument")),
        (Some(key), None) => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("read stdin")?;
            Some((key.clone(), buf, "stdin"))
        }
        (None, _) => None,
    };

    let session = Session::open(&cfg.connection).await?;
    let result = send(&session, &args, single).await;
    session.close().await;
    result
}

async fn send(
    session: &Session,
    args: &PublishArgs,
    single: Option<(String, Vec<u8>, &'static str)>,
) -> Result<()> {
    broker::enable_confirms(&session.channel).await?;
    let Some((routing_key, payload, origin)) = single else {
        return publish_lines(session, args).await;
    };
    tracing::info!(
        bytes = payload.len(),
        origin,
        exchange = %args.exchange,
        routing_key = %routing_key,
        "publishing"
    );
    broker::publish(&session.channel, &request(args, routing_key, payload)).await?;
    tracing::info!("published (confirmed)");
    Ok(())
}

fn request(args: &PublishArgs, routing_key: String, payload: Vec<u8>) -> PublishRequest {
    PublishRequest {
        exchange: args.exchange.clone(),
        routing_key,
        payload,
        content_type: args.content_type.clone(),
        headers: args.headers.clone(),
        persistent: args.persistent,
    }
}

/// Publish one message per stdin line of the form `routing_key<delim>payload`.
async fn publish_lines(session: &Session, args: &PublishArgs) -> Result<()> {
    tracing::info!(
        delimiter = %printable_delimiter(&args.delimiter),
        binary = args.binary,
        "reading stdin lines"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let interrupted = shutdown_signal();
    tokio::pin!(interrupted);

    let mut published: u64 = 0;
    let mut skipped: u64 = 0;
    loop {
        let line = tokio::select! {
            biased;
            sig = &mut interrupted => {
                match sig {
                    Ok(sig) => tracing::info!(signal = sig, "interrupted, stopping"),
                    Err(err) => tracing::warn!(error = %err, "signal handlers unavailable"),
                }
                break;
            }
            line = lines.next_line() => line.context("read stdin")?,
        };
        let Some(line) = line else { break };

        match parse_line(&line, &args.delimiter, args.binary) {
            Ok((routing_key, payload)) => {
                broker::publish(&session.channel, &request(args, routing_key, payload)).await?;
                published += 1;
            }
            Err(reason) => {
                skipped += 1;
                tracing::warn!(line = %truncate_line(&line, 60), "skipping {reason}");
            }
        }
    }

    tracing::info!(published, skipped, "published message(s)");
    Ok(())
}

/// Split `routing_key<delim>payload`, decoding the payload as base64 when
/// `binary` is set.
fn parse_line(line: &str, delimiter: &str, binary: bool) -> Result<(String, Vec<u8>), String> {
    let (routing_key, payload) = line
        .split_once(delimiter)
        .ok_or_else(|| "malformed line (no delimiter)".to_string())?;
    if routing_key.is_empty() {
        return Err("line with empty routing key".into());
    }
    let payload = if binary {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| format!("line with invalid base64: {e}"))?
    } else {
        payload.as_bytes().to_vec()
    };
    Ok((routing_key.to_string(), payload))
}

fn printable_delimiter(delimiter: &str) -> String {
    delimiter.escape_default().to_string()
}

fn truncate_line(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
