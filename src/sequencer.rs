use super::error::SequenceError;
use super::types::OrderId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of order numbers.
///
/// Each call to `next` returns an id strictly greater than every id handed
/// out before it, including under concurrent callers. Once the id space is
/// used up it fails with [`SequenceError::Exhausted`] rather than wrapping.
pub trait OrderSequencer: Send + Sync {
    fn next(&self) -> Result<OrderId, SequenceError>;
}

/// Process-local counter. The first id issued is 1.
#[derive(Debug, Default)]
pub struct MemorySequencer {
    last: AtomicU64,
}

impl MemorySequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume numbering after an id that was already issued elsewhere.
    pub fn starting_after(last: OrderId) -> Self {
        Self {
            last: AtomicU64::new(last.0),
        }
    }
}

impl OrderSequencer for MemorySequencer {
    fn next(&self) -> Result<OrderId, SequenceError> {
        self.last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_add(1))
            .map(|prev| OrderId(prev + 1))
            .map_err(|_| SequenceError::Exhausted)
    }
}
