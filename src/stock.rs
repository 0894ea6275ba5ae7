//! Stock repository contract and the in-memory catalog
//!
//! Every item carries two counters. `available` is what can still be handed
//! to an order, `reserved` is what orders currently hold. Their sum is the
//! stock on hand and only [`StockRepository::reserve`] and
//! [`StockRepository::release`] move quantity between them.
use super::error::StockError;
use super::types::{ItemId, Price};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Snapshot of an item's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevel {
    pub available: u64,
    pub reserved: u64,
}

impl StockLevel {
    pub fn on_hand(&self) -> u64 {
        self.available + self.reserved
    }
}

/// One catalog row. Stored as CBOR by the sled backend.
#[derive(Debug, Clone, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
pub struct StockRecord {
    #[n(0)]
    pub price: Price,
    #[n(1)]
    pub available: u64,
    #[n(2)]
    pub reserved: u64,
}

impl StockRecord {
    pub fn new(price: Price, available: u64) -> Self {
        Self {
            price,
            available,
            reserved: 0,
        }
    }

    pub fn level(&self) -> StockLevel {
        StockLevel {
            available: self.available,
            reserved: self.reserved,
        }
    }

    /// Moves `quantity` from available to reserved. Leaves the record
    /// untouched and returns false when the quantity is not positive or not
    /// enough is available.
    pub fn try_reserve(&mut self, quantity: i64) -> bool {
        let Ok(quantity) = u64::try_from(quantity) else {
            return false;
        };
        if quantity == 0 || self.available < quantity {
            return false;
        }
        self.available -= quantity;
        self.reserved += quantity;
        true
    }

    /// Moves `quantity` from reserved back to available.
    pub fn try_release(&mut self, item: ItemId, quantity: i64) -> Result<(), StockError> {
        let amount = match u64::try_from(quantity) {
            Ok(0) | Err(_) => return Err(StockError::InvalidQuantity(quantity)),
            Ok(amount) => amount,
        };
        if amount > self.reserved {
            return Err(StockError::InvariantViolation {
                item,
                requested: quantity,
                reserved: self.reserved,
            });
        }
        self.reserved -= amount;
        self.available += amount;
        Ok(())
    }
}

/// Shared inventory that orders reserve against.
///
/// Implementations must make `reserve` and `release` atomic per item: two
/// concurrent calls on the same id never interleave their read and write.
/// Calls on different ids are free to run in parallel.
pub trait StockRepository: Send + Sync {
    /// True iff `item` is in the catalog.
    fn exists(&self, item: ItemId) -> Result<bool, StockError>;

    /// Current unit price. Unknown ids are an error, never a zero price.
    fn price(&self, item: ItemId) -> Result<Price, StockError>;

    /// Reserve `quantity` of `item`.
    ///
    /// Returns `Ok(false)` with no change when `quantity <= 0` or fewer than
    /// `quantity` units are available.
    fn reserve(&self, item: ItemId, quantity: i64) -> Result<bool, StockError>;

    /// Return `quantity` of `item` from reserved to available.
    ///
    /// Releasing more than is reserved is a caller bug and fails with
    /// [`StockError::InvariantViolation`] without touching the counters.
    fn release(&self, item: ItemId, quantity: i64) -> Result<bool, StockError>;

    /// Current counters of `item`.
    fn level(&self, item: ItemId) -> Result<StockLevel, StockError>;

    /// Every id in the catalog, ascending.
    fn items(&self) -> Result<Vec<ItemId>, StockError>;
}

/// Fixed catalog held in memory with one lock per item.
#[derive(Debug, Default)]
pub struct MemoryStock {
    catalog: HashMap<ItemId, Mutex<StockRecord>>,
}

impl MemoryStock {
    pub fn new(items: impl IntoIterator<Item = (ItemId, StockRecord)>) -> Self {
        items.into_iter().collect()
    }

    fn record(&self, item: ItemId) -> Result<&Mutex<StockRecord>, StockError> {
        self.catalog.get(&item).ok_or(StockError::UnknownItem(item))
    }
}

impl FromIterator<(ItemId, StockRecord)> for MemoryStock {
    fn from_iter<I: IntoIterator<Item = (ItemId, StockRecord)>>(iter: I) -> Self {
        Self {
            catalog: iter
                .into_iter()
                .map(|(item, record)| (item, Mutex::new(record)))
                .collect(),
        }
    }
}

impl StockRepository for MemoryStock {
    fn exists(&self, item: ItemId) -> Result<bool, StockError> {
        Ok(self.catalog.contains_key(&item))
    }

    fn price(&self, item: ItemId) -> Result<Price, StockError> {
        Ok(self.record(item)?.lock().price)
    }

    fn reserve(&self, item: ItemId, quantity: i64) -> Result<bool, StockError> {
        let mut record = self.record(item)?.lock();
        let reserved = record.try_reserve(quantity);
        debug!(%item, quantity, reserved, available = record.available, "reserve");
        Ok(reserved)
    }

    fn release(&self, item: ItemId, quantity: i64) -> Result<bool, StockError> {
        let mut record = self.record(item)?.lock();
        if let Err(err) = record.try_release(item, quantity) {
            warn!(%item, quantity, error = %err, "release rejected");
            return Err(err);
        }
        debug!(%item, quantity, available = record.available, "release");
        Ok(true)
    }

    fn level(&self, item: ItemId) -> Result<StockLevel, StockError> {
        Ok(self.record(item)?.lock().level())
    }

    fn items(&self) -> Result<Vec<ItemId>, StockError> {
        let mut items: Vec<ItemId> = self.catalog.keys().copied().collect();
        items.sort();
        Ok(items)
    }
}
