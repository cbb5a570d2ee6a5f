//! Delivery source contract consumed by the intake task.

use super::error::BrokerError;
use super::message::Delivery;
use futures::future::BoxFuture;

/// A cancellable subscription yielding deliveries in arrival order.
pub trait DeliverySource: Send {
    /// Next delivery, or `None` once the subscription has ended.
    fn next_delivery(&mut self) -> BoxFuture<'_, Option<Result<Delivery, BrokerError>>>;

    /// Stop consuming. Calling it more than once is a no-op.
    fn cancel(&mut self) -> BoxFuture<'_, Result<(), BrokerError>>;

    /// Prefetch count the subscription was opened with (0 when unset).
    fn prefetch_count(&self) -> i64;
}
