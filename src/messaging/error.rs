//! Error types for the consume pipeline and its collaborators.

use std::time::Duration;
use thiserror::Error;

/// Failure reported by the broker connection.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),
    #[error("broker channel closed")]
    Closed,
}

/// Failure while rendering or writing one message.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fatal failure of the consume pipeline.
#[derive(Debug, Error)]
pub enum ConsumeError {
    #[error("delivery stream failed after {received} message(s): {source}")]
    Source {
        received: u64,
        #[source]
        source: BrokerError,
    },
    #[error("acknowledgment for delivery tag {tag} failed: {source}")]
    Acknowledge {
        tag: u64,
        #[source]
        source: BrokerError,
    },
    #[error("pipeline did not drain within {0:?}")]
    DrainTimeout(Duration),
    #[error("{stage} task failed: {source}")]
    Task {
        stage: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
    #[error("invalid consume settings: {0}")]
    Config(String),
}
