//! Bounded FIFO hand-off queues between pipeline stages.
//!
//! Both queues are `tokio::sync::mpsc` channels. A full channel suspends the
//! writer and an empty one suspends the reader. Dropping every sender closes
//! the channel; readers then drain what is buffered and observe `None`.

use super::message::{AckDecision, Delivery};
use tokio::sync::mpsc;

/// Default capacity of the message channel.
pub const DEFAULT_MESSAGE_CAPACITY: usize = 64;
/// Default capacity of the acknowledgment channel.
pub const DEFAULT_ACK_CAPACITY: usize = 256;

pub type MessageSender = mpsc::Sender<Delivery>;
pub type MessageReceiver = mpsc::Receiver<Delivery>;
pub type AckSender = mpsc::Sender<AckDecision>;
pub type AckReceiver = mpsc::Receiver<AckDecision>;

/// Returned when a channel is requested with zero capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("channel capacity must be > 0")]
pub struct ZeroCapacity;

/// Create a bounded channel.
pub fn bounded<T>(capacity: usize) -> Result<(mpsc::Sender<T>, mpsc::Receiver<T>), ZeroCapacity> {
    if capacity == 0 {
        return Err(ZeroCapacity);
    }
    Ok(mpsc::channel(capacity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_rejected() {
        assert_eq!(bounded::<u8>(0).unwrap_err(), ZeroCapacity);
    }

    #[tokio::test]
    async fn closed_channel_drains_before_end_of_stream() {
        let (tx, mut rx) = bounded::<AckDecision>(4).unwrap();
        tx.send(AckDecision::success(1)).await.unwrap();
        tx.send(AckDecision::failure(2)).await.unwrap();
        drop(tx);

        assert_eq!(rx.recv().await, Some(AckDecision::success(1)));
        assert_eq!(rx.recv().await, Some(AckDecision::failure(2)));
        assert_eq!(rx.recv().await, None);
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn full_channel_refuses_more() {
        let (tx, _rx) = bounded::<u8>(1).unwrap();
        tx.try_send(1).unwrap();
        assert!(matches!(
            tx.try_send(2),
            Err(mpsc::error::TrySendError::Full(2))
        ));
    }
}
