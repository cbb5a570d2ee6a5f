//! Delivery and acknowledgment decision types shared by the consume pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One message pulled from the broker.
///
/// Immutable once built. The intake task owns it until it is pushed into the
/// message channel, after which the output sink owns it until the
/// acknowledgment decision is made.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    /// Broker-assigned tag, unique and increasing within a consumer session.
    pub delivery_tag: u64,
    /// Exchange the message was published to (empty for the default exchange).
    pub exchange: String,
    /// Routing key used at publish time.
    pub routing_key: String,
    /// Queue the message was consumed from.
    pub queue: String,
    /// Whether the broker has delivered this message before.
    pub redelivered: bool,
    pub properties: MessageProperties,
    /// Opaque payload.
    pub body: Vec<u8>,
}

impl Delivery {
    pub fn new(delivery_tag: u64, queue: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            delivery_tag,
            exchange: String::new(),
            routing_key: String::new(),
            queue: queue.into(),
            redelivered: false,
            properties: MessageProperties::default(),
            body: body.into(),
        }
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self
    }

    pub fn with_routing_key(mut self, routing_key: impl Into<String>) -> Self {
        self.routing_key = routing_key.into();
        self
    }

    pub fn with_properties(mut self, properties: MessageProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn redelivered(mut self) -> Self {
        self.redelivered = true;
        self
    }
}

/// Optional property bag carried by a delivery.
///
/// Header values are kept as JSON values so the formatter does not depend on
/// the broker client's field-table representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Seconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_mode: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, serde_json::Value>,
}

impl MessageProperties {
    /// True when no property is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Outcome of processing one delivery, produced by the output sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckDecision {
    pub delivery_tag: u64,
    pub success: bool,
}

impl AckDecision {
    pub fn success(delivery_tag: u64) -> Self {
        Self {
            delivery_tag,
            success: true,
        }
    }

    pub fn failure(delivery_tag: u64) -> Self {
        Self {
            delivery_tag,
            success: false,
        }
    }
}

/// What a successfully processed message means on the wire.
///
/// Fixed for the lifetime of one consume invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AckMode {
    /// Positive acknowledgment; the broker drops the message.
    #[default]
    Ack,
    /// Reject without requeue; the broker drops or dead-letters the message.
    Reject,
    /// No explicit acknowledgment; messages return to the queue when the
    /// channel closes.
    Requeue,
}

impl AckMode {
    /// Whether the dispatcher issues broker calls at all under this mode.
    pub fn acknowledges(self) -> bool {
        !matches!(self, Self::Requeue)
    }
}

impl fmt::Display for AckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ack => "ack",
            Self::Reject => "reject",
            Self::Requeue => "requeue",
        })
    }
}

impl FromStr for AckMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ack" => Ok(Self::Ack),
            "reject" => Ok(Self::Reject),
            "requeue" => Ok(Self::Requeue),
            other => Err(format!("invalid ack mode {other}")),
        }
    }
}

/// How the dispatcher reacts to a failed decision.
///
/// Both policies requeue the failed tag individually. `Halt` then stops
/// acknowledging for the rest of the session, so every later message is
/// redelivered once the channel closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Requeue the failed tag and keep batching later successes.
    #[default]
    Continue,
    /// Requeue the failed tag and stop reading decisions.
    Halt,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Continue => "continue",
            Self::Halt => "halt",
        })
    }
}
