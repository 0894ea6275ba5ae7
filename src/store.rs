//! sled backed stock repository and order sequencer
//!
//! Catalog rows live in the `stock` tree keyed by the big-endian item id with
//! a CBOR encoded [`StockRecord`] as value. Mutations are compare-and-swap
//! loops on that single key, so each item has exactly one writer at a time
//! while other items are untouched.
use super::error::{SequenceError, StockError};
use super::sequencer::OrderSequencer;
use super::stock::{StockLevel, StockRecord, StockRepository};
use super::types::{ItemId, OrderId, Price};
use sled::{Batch, Db, IVec, Tree};
use tracing::{debug, trace, warn};

const STOCK_TREE: &str = "stock";
const SEQUENCE_TREE: &str = "order_sequence";
const LAST_ORDER_KEY: &[u8] = b"last_order";

fn encode_record(record: &StockRecord) -> Result<Vec<u8>, StockError> {
    minicbor::to_vec(record).map_err(|e| StockError::Encode(e.to_string()))
}

pub struct SledStock {
    tree: Tree,
}

impl SledStock {
    pub fn open(db: &Db) -> Result<Self, StockError> {
        Ok(Self {
            tree: db.open_tree(STOCK_TREE)?,
        })
    }

    /// Insert or replace catalog rows in one batch.
    pub fn seed(
        &self,
        items: impl IntoIterator<Item = (ItemId, StockRecord)>,
    ) -> Result<(), StockError> {
        let mut batch = Batch::default();
        for (item, record) in items {
            batch.insert(item.to_key().to_vec(), encode_record(&record)?);
        }
        self.tree.apply_batch(batch)?;
        Ok(())
    }

    pub fn flush(&self) -> Result<usize, StockError> {
        Ok(self.tree.flush()?)
    }

    fn load(&self, item: ItemId) -> Result<(IVec, StockRecord), StockError> {
        let raw = self
            .tree
            .get(item.to_key())?
            .ok_or(StockError::UnknownItem(item))?;
        let record: StockRecord = minicbor::decode(&raw)?;
        Ok((raw, record))
    }

    // Read, apply `f`, and swap the new row in only if nobody wrote in
    // between. An unchanged record is never written back.
    fn mutate<T>(
        &self,
        item: ItemId,
        mut f: impl FnMut(&mut StockRecord) -> Result<T, StockError>,
    ) -> Result<(T, StockRecord), StockError> {
        loop {
            let (raw, current) = self.load(item)?;
            let mut next = current.clone();
            let out = f(&mut next)?;
            if next == current {
                return Ok((out, next));
            }

            let swapped = self
                .tree
                .compare_and_swap(item.to_key(), Some(raw), Some(encode_record(&next)?))?;
            match swapped {
                Ok(()) => return Ok((out, next)),
                Err(_) => trace!(%item, "stock row changed underneath, retrying"),
            }
        }
    }
}

impl StockRepository for SledStock {
    fn exists(&self, item: ItemId) -> Result<bool, StockError> {
        Ok(self.tree.contains_key(item.to_key())?)
    }

    fn price(&self, item: ItemId) -> Result<Price, StockError> {
        Ok(self.load(item)?.1.price)
    }

    fn reserve(&self, item: ItemId, quantity: i64) -> Result<bool, StockError> {
        let (reserved, record) = self.mutate(item, |record| Ok(record.try_reserve(quantity)))?;
        debug!(%item, quantity, reserved, available = record.available, "reserve");
        Ok(reserved)
    }

    fn release(&self, item: ItemId, quantity: i64) -> Result<bool, StockError> {
        match self.mutate(item, |record| record.try_release(item, quantity)) {
            Ok((_, record)) => {
                debug!(%item, quantity, available = record.available, "release");
                Ok(true)
            }
            Err(err) => {
                warn!(%item, quantity, error = %err, "release rejected");
                Err(err)
            }
        }
    }

    fn level(&self, item: ItemId) -> Result<StockLevel, StockError> {
        Ok(self.load(item)?.1.level())
    }

    fn items(&self) -> Result<Vec<ItemId>, StockError> {
        self.tree
            .iter()
            .keys()
            .map(|key| {
                let key = key?;
                ItemId::from_key(&key).ok_or_else(|| StockError::Corrupt(format!("{key:?}")))
            })
            .collect()
    }
}

/// Order counter persisted next to the catalog. The first id is 1.
pub struct SledSequencer {
    tree: Tree,
}

impl SledSequencer {
    pub fn open(db: &Db) -> Result<Self, SequenceError> {
        Ok(Self {
            tree: db.open_tree(SEQUENCE_TREE)?,
        })
    }

    /// The most recent id handed out, if any.
    pub fn last_issued(&self) -> Result<Option<OrderId>, SequenceError> {
        match self.tree.get(LAST_ORDER_KEY)? {
            Some(raw) => OrderId::from_key(&raw)
                .map(Some)
                .ok_or_else(|| SequenceError::Corrupt(format!("{raw:?}"))),
            None => Ok(None),
        }
    }
}

impl OrderSequencer for SledSequencer {
    fn next(&self) -> Result<OrderId, SequenceError> {
        let mut exhausted = false;
        let updated = self.tree.update_and_fetch(LAST_ORDER_KEY, |old| {
            let last = old.and_then(OrderId::from_key).map_or(0, |id| id.0);
            let next = last.checked_add(1);
            exhausted = next.is_none();
            match next {
                Some(n) => Some(OrderId(n).to_key().to_vec()),
                None => old.map(<[u8]>::to_vec),
            }
        })?;
        if exhausted {
            warn!("order sequence exhausted");
            return Err(SequenceError::Exhausted);
        }

        let id = updated
            .as_deref()
            .and_then(OrderId::from_key)
            .ok_or_else(|| SequenceError::Corrupt(format!("{updated:?}")))?;

        // an id must survive a restart before anyone can use it
        self.tree.flush()?;
        Ok(id)
    }
}
