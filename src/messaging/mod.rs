//! Consume-side message handling.
//!
//! - `message` - Delivery, ack decision and policy types
//! - `channel` - Bounded hand-off queues between pipeline stages
//! - `source` - Delivery source contract
//! - `acks` - Batched acknowledgment dispatch
//! - `prefetch` - Batch threshold derived from the prefetch count
//! - `format` - Text/JSON/raw rendering of one delivery
//! - `sink` - Console and rotating-file output sinks
//! - `pipeline` - Task wiring, backpressure and drain-on-cancel

pub mod acks;
pub mod channel;
pub mod error;
pub mod format;
pub mod message;
pub mod pipeline;
pub mod prefetch;
pub mod sink;
pub mod source;

pub use acks::{AckDispatcher, Acknowledger, DispatchReport};
pub use error::{BrokerError, ConsumeError, SinkError};
pub use format::{Formatter, OutputFormat};
pub use message::{AckDecision, AckMode, Delivery, FailurePolicy, MessageProperties};
pub use pipeline::{run_pipeline, ConsumeReport, ConsumeSettings, StopReason};
pub use prefetch::BatchThreshold;
pub use sink::{ConsoleSink, OutputSink, RotatingFileSink, RotationPolicy, Sink, SinkReport};
pub use source::DeliverySource;
