use crate::messaging::prefetch::qos_prefetch;
use crate::messaging::{Acknowledger, BrokerError, Delivery, DeliverySource, MessageProperties};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use lapin::options::{
    BasicAckOptions, BasicCancelOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions,
};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{BasicProperties, Channel, Consumer};
use std::collections::BTreeMap;

/// Deliveries from one `basic.consume` subscription.
pub struct AmqpSource {
    channel: Channel,
    consumer: Consumer,
    queue: String,
    consumer_tag: String,
    prefetch: i64,
    cancelled: bool,
}

impl AmqpSource {
    /// Apply the prefetch limit and start consuming `queue`.
    pub async fn subscribe(
        channel: Channel,
        queue: &str,
        consumer_tag: Option<String>,
        prefetch: i64,
    ) -> Result<Self> {
        if let Some(count) = qos_prefetch(prefetch) {
            channel
                .basic_qos(count, BasicQosOptions::default())
                .await
                .with_context(|| format!("set prefetch to {count}"))?;
        }
        let consumer_tag = consumer_tag.unwrap_or_else(|| {
            format!(
                "rmqcat-{}",
                uuid::Uuid::new_v4()
                    .to_string()
                    .split('-')
                    .next()
                    .unwrap_or("xxxx")
            )
        });
        let consumer = channel
            .basic_consume(
                queue,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("consume from queue '{queue}'"))?;
        tracing::info!(queue, consumer_tag = %consumer_tag, prefetch, "consuming");
        Ok(Self {
            channel,
            consumer,
            queue: queue.to_string(),
            consumer_tag,
            prefetch,
            cancelled: false,
        })
    }

    pub fn consumer_tag(&self) -> &str {
        &self.consumer_tag
    }
}

impl DeliverySource for AmqpSource {
    fn next_delivery(&mut self) -> BoxFuture<'_, Option<Result<Delivery, BrokerError>>> {
        async move {
            let next = self.consumer.next().await?;
            Some(
                next.map(|d| convert_delivery(d, &self.queue))
                    .map_err(BrokerError::from),
            )
        }
        .boxed()
    }

    fn cancel(&mut self) -> BoxFuture<'_, Result<(), BrokerError>> {
        async move {
            if self.cancelled {
                return Ok(());
            }
            self.cancelled = true;
            self.channel
                .basic_cancel(&self.consumer_tag, BasicCancelOptions::default())
                .await?;
            tracing::debug!(consumer_tag = %self.consumer_tag, "consumer cancelled");
            Ok(())
        }
        .boxed()
    }

    fn prefetch_count(&self) -> i64 {
        self.prefetch
    }
}

/// `basic.ack` / `basic.nack` on the consuming channel.
pub struct AmqpAcker {
    channel: Channel,
}

impl AmqpAcker {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

impl Acknowledger for AmqpAcker {
    fn ack(&self, tag: u64, multiple: bool) -> BoxFuture<'_, Result<(), BrokerError>> {
        async move {
            self.channel
                .basic_ack(tag, BasicAckOptions { multiple })
                .await?;
            Ok(())
        }
        .boxed()
    }

    fn nack(
        &self,
        tag: u64,
        multiple: bool,
        requeue: bool,
    ) -> BoxFuture<'_, Result<(), BrokerError>> {
        async move {
            self.channel
                .basic_nack(tag, BasicNackOptions { multiple, requeue })
                .await?;
            Ok(())
        }
        .boxed()
    }
}

fn convert_delivery(delivery: lapin::message::Delivery, queue: &str) -> Delivery {
    Delivery {
        delivery_tag: delivery.delivery_tag,
        exchange: delivery.exchange.as_str().to_string(),
        routing_key: delivery.routing_key.as_str().to_string(),
        queue: queue.to_string(),
        redelivered: delivery.redelivered,
        properties: convert_properties(&delivery.properties),
        body: delivery.data,
    }
}

fn convert_properties(props: &BasicProperties) -> MessageProperties {
    let text =
        |v: &Option<lapin::types::ShortString>| v.as_ref().map(|s| s.as_str().to_string());
    MessageProperties {
        content_type: text(props.content_type()),
        content_encoding: text(props.content_encoding()),
        message_id: text(props.message_id()),
        correlation_id: text(props.correlation_id()),
        timestamp: *props.timestamp(),
        delivery_mode: *props.delivery_mode(),
        priority: *props.priority(),
        app_id: text(props.app_id()),
        reply_to: text(props.reply_to()),
        expiration: text(props.expiration()),
        kind: text(props.kind()),
        user_id: text(props.user_id()),
        headers: props
            .headers()
            .as_ref()
            .map(headers_to_json)
            .unwrap_or_default(),
    }
}

/// Convert an AMQP field table to JSON values, recursively.
pub fn headers_to_json(table: &FieldTable) -> BTreeMap<String, serde_json::Value> {
    table
        .inner()
        .iter()
        .map(|(key, value)| (key.as_str().to_string(), amqp_to_json(value)))
        .collect()
}

fn amqp_to_json(value: &AMQPValue) -> serde_json::Value {
    use serde_json::Value;
    match value {
        AMQPValue::Boolean(v) => Value::from(*v),
        AMQPValue::ShortShortInt(v) => Value::from(*v),
        AMQPValue::ShortShortUInt(v) => Value::from(*v),
        AMQPValue::ShortInt(v) => Value::from(*v),
        AMQPValue::ShortUInt(v) => Value::from(*v),
        AMQPValue::LongInt(v) => Value::from(*v),
        AMQPValue::LongUInt(v) => Value::from(*v),
        AMQPValue::LongLongInt(v) => Value::from(*v),
        AMQPValue::Float(v) => Value::from(*v),
        AMQPValue::Double(v) => Value::from(*v),
        AMQPValue::Timestamp(v) => Value::from(*v),
        AMQPValue::ShortString(v) => Value::from(v.as_str()),
        AMQPValue::LongString(v) => {
            Value::from(String::from_utf8_lossy(v.as_bytes()).into_owned())
        }
        AMQPValue::FieldArray(v) => Value::Array(v.as_slice().iter().map(amqp_to_json).collect()),
        AMQPValue::FieldTable(v) => Value::Object(headers_to_json(v).into_iter().collect()),
        AMQPValue::Void => Value::Null,
        other => Value::from(format!("{other:?}")),
    }
}
