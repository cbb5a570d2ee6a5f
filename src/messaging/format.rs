//! Rendering of a single delivery for console or file output.

use super::error::SinkError;
use super::message::{Delivery, MessageProperties};
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Output format for consumed messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Header line with routing metadata, properties, then the body
    #[default]
    Text,
    /// JSON objects, one per line
    Json,
    /// Raw payload only (no metadata)
    Raw,
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    ts: String,
    queue: &'a str,
    exchange: &'a str,
    routing_key: &'a str,
    delivery_tag: u64,
    redelivered: bool,
    #[serde(skip_serializing_if = "no_properties")]
    properties: &'a MessageProperties,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body_b64: Option<String>,
}

fn no_properties(props: &&MessageProperties) -> bool {
    props.is_empty()
}

/// Renders deliveries into newline-terminated byte records.
#[derive(Debug, Clone, Copy, Default)]
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn render(&self, delivery: &Delivery) -> Result<Vec<u8>, SinkError> {
        match self.format {
            OutputFormat::Json => render_json(delivery),
            OutputFormat::Text => Ok(render_text(delivery).into_bytes()),
            OutputFormat::Raw => {
                let mut out = Vec::with_capacity(delivery.body.len() + 1);
                out.extend_from_slice(&delivery.body);
                out.push(b'\n');
                Ok(out)
            }
        }
    }
}

fn render_json(delivery: &Delivery) -> Result<Vec<u8>, SinkError> {
    let (body, body_b64) = match std::str::from_utf8(&delivery.body) {
        Ok(s) => (Some(s), None),
        Err(_) => (
            None,
            Some(base64::engine::general_purpose::STANDARD.encode(&delivery.body)),
        ),
    };
    let msg = MessageOutput {
        ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        queue: &delivery.queue,
        exchange: &delivery.exchange,
        routing_key: &delivery.routing_key,
        delivery_tag: delivery.delivery_tag,
        redelivered: delivery.redelivered,
        properties: &delivery.properties,
        body,
        body_b64,
    };
    let mut out = serde_json::to_vec(&msg)?;
    out.push(b'\n');
    Ok(out)
}

fn render_text(delivery: &Delivery) -> String {
    let mut out = String::new();
    let exchange = if delivery.exchange.is_empty() {
        "(default)"
    } else {
        delivery.exchange.as_str()
    };
    let _ = writeln!(
        out,
        "--- queue={} exchange={} routing_key={} tag={}{}",
        delivery.queue,
        exchange,
        delivery.routing_key,
        delivery.delivery_tag,
        if delivery.redelivered { " redelivered" } else { "" }
    );

    let props = &delivery.properties;
    let fields: [(&str, Option<String>); 11] = [
        ("content_type", props.content_type.clone()),
        ("content_encoding", props.content_encoding.clone()),
        ("message_id", props.message_id.clone()),
        ("correlation_id", props.correlation_id.clone()),
        ("timestamp", props.timestamp.map(format_timestamp)),
        ("delivery_mode", props.delivery_mode.map(|m| m.to_string())),
        ("priority", props.priority.map(|p| p.to_string())),
        ("app_id", props.app_id.clone()),
        ("reply_to", props.reply_to.clone()),
        ("expiration", props.expiration.clone()),
        ("type", props.kind.clone()),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            let _ = writeln!(out, "{name}: {value}");
        }
    }
    if let Some(user_id) = &props.user_id {
        let _ = writeln!(out, "user_id: {user_id}");
    }
    for (key, value) in &props.headers {
        let _ = writeln!(out, "header {key}: {value}");
    }

    match std::str::from_utf8(&delivery.body) {
        Ok(text) => {
            out.push_str(text);
            out.push('\n');
        }
        Err(_) => {
            let _ = writeln!(
                out,
                "base64: {}",
                base64::engine::general_purpose::STANDARD.encode(&delivery.body)
            );
        }
    }
    out
}

fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| secs.to_string())
}
