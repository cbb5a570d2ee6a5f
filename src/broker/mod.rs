//! AMQP 0-9-1 broker access built on `lapin`.
//!
//! Only the thin layer the commands need lives here: opening a connection,
//! the consume-side source and acknowledger, publishing with confirms and
//! purging a queue.

mod consumer;
mod publish;

pub use consumer::{headers_to_json, AmqpAcker, AmqpSource};
pub use publish::{enable_confirms, publish, purge, PublishRequest};

use crate::config::ConnectionConfig;
use anyhow::{Context, Result};
use lapin::{Channel, Connection, ConnectionProperties};

/// An open connection with one channel.
pub struct Session {
    pub connection: Connection,
    pub channel: Channel,
}

impl Session {
    /// Connect and open a channel.
    pub async fn open(cfg: &ConnectionConfig) -> Result<Self> {
        let props = ConnectionProperties::default()
            .with_connection_name(cfg.connection_name.clone().into());
        let connection = Connection::connect(&cfg.url, props)
            .await
            .with_context(|| format!("connect to {}", redact_url(&cfg.url)))?;
        let channel = connection
            .create_channel()
            .await
            .context("open channel")?;
        tracing::info!(url = %redact_url(&cfg.url), "connected");
        Ok(Self {
            connection,
            channel,
        })
    }

    /// Close channel and connection. Unacknowledged deliveries return to
    /// their queues.
    pub async fn close(self) {
        if let Err(err) = self.channel.close(200, "bye").await {
            tracing::debug!(error = %err, "channel close failed");
        }
        if let Err(err) = self.connection.close(200, "bye").await {
            tracing::debug!(error = %err, "connection close failed");
        }
    }
}

/// Hide the password component of an AMQP URL for logs and errors.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((userinfo, host)) = rest.split_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}
