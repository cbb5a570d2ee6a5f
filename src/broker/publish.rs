use anyhow::{bail, Context, Result};
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, QueuePurgeOptions};
use lapin::types::{AMQPValue, FieldTable, LongString, ShortString};
use lapin::{BasicProperties, Channel};

/// One message to publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishRequest {
    pub exchange: String,
    pub routing_key: String,
    pub payload: Vec<u8>,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Delivery mode 2 (persisted by the broker) instead of 1.
    pub persistent: bool,
}

impl PublishRequest {
    pub fn properties(&self) -> BasicProperties {
        let mut props = BasicProperties::default()
            .with_delivery_mode(if self.persistent { 2 } else { 1 });
        if let Some(content_type) = &self.content_type {
            props = props.with_content_type(ShortString::from(content_type.clone()));
        }
        if !self.headers.is_empty() {
            let mut table = FieldTable::default();
            for (key, value) in &self.headers {
                table.insert(
                    ShortString::from(key.clone()),
                    AMQPValue::LongString(LongString::from(value.clone())),
                );
            }
            props = props.with_headers(table);
        }
        props
    }
}

/// Put `channel` into publisher-confirm mode.
pub async fn enable_confirms(channel: &Channel) -> Result<()> {
    channel
        .confirm_select(ConfirmSelectOptions::default())
        .await
        .context("enable publisher confirms")
}

/// Publish and wait for the broker's confirm.
///
/// The channel must already be in confirm mode.
pub async fn publish(channel: &Channel, req: &PublishRequest) -> Result<()> {
    let confirm = channel
        .basic_publish(
            &req.exchange,
            &req.routing_key,
            BasicPublishOptions::default(),
            &req.payload,
            req.properties(),
        )
        .await
        .with_context(|| format!("publish to '{}'", req.routing_key))?;
    let confirmation = confirm
        .await
        .with_context(|| format!("await confirm for '{}'", req.routing_key))?;
    if confirmation.is_nack() {
        bail!("broker rejected message for '{}'", req.routing_key);
    }
    Ok(())
}

/// Purge `queue`, returning how many messages were removed.
pub async fn purge(channel: &Channel, queue: &str) -> Result<u32> {
    channel
        .queue_purge(queue, QueuePurgeOptions::default())
        .await
        .with_context(|| format!("purge queue '{queue}'"))
}
