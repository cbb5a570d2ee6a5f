//! Prefetch-derived batching for multi-acknowledgment.
//!
//! The broker stops delivering once `prefetch` messages are outstanding, so
//! coalescing up to that many successes into one multi-ack never stalls its
//! flow control.

/// Batch size used when the consumer has no positive prefetch count.
pub const DEFAULT_BATCH_THRESHOLD: u64 = 100;

/// Number of consecutive successes coalesced into one multi-ack call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchThreshold(u64);

impl BatchThreshold {
    /// Derive the threshold from a prefetch count.
    ///
    /// Zero and negative values mean "unset" and fall back to
    /// [`DEFAULT_BATCH_THRESHOLD`].
    pub fn from_prefetch(prefetch: i64) -> Self {
        if prefetch > 0 {
            Self(prefetch as u64)
        } else {
            Self(DEFAULT_BATCH_THRESHOLD)
        }
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl Default for BatchThreshold {
    fn default() -> Self {
        Self(DEFAULT_BATCH_THRESHOLD)
    }
}

/// Clamp a configured prefetch count to the AMQP `basic.qos` field width.
///
/// Returns `None` when no prefetch limit should be requested.
pub fn qos_prefetch(prefetch: i64) -> Option<u16> {
    if prefetch > 0 {
        Some(prefetch.min(i64::from(u16::MAX)) as u16)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_prefetch_becomes_threshold() {
        assert_eq!(BatchThreshold::from_prefetch(10).get(), 10);
        assert_eq!(BatchThreshold::from_prefetch(1).get(), 1);
    }

    #[test]
    fn unset_prefetch_uses_default() {
        assert_eq!(BatchThreshold::from_prefetch(0).get(), 100);
        assert_eq!(BatchThreshold::from_prefetch(-5).get(), 100);
        assert_eq!(BatchThreshold::default().get(), DEFAULT_BATCH_THRESHOLD);
    }

    #[test]
    fn qos_prefetch_clamps_to_u16() {
        assert_eq!(qos_prefetch(0), None);
        assert_eq!(qos_prefetch(-1), None);
        assert_eq!(qos_prefetch(250), Some(250));
        assert_eq!(qos_prefetch(1_000_000), Some(u16::MAX));
    }
}
