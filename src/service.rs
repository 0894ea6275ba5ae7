//! Service layer tying a sled store to the order workflow
use super::config::StoreConfig;
use super::error::{OrderError, StockError};
use super::order::Order;
use super::stock::{StockLevel, StockRecord, StockRepository};
use super::store::{SledSequencer, SledStock};
use super::types::ItemId;
use sled::Db;
use std::sync::Arc;
use tracing::info;

pub struct OrderService {
    instance: Arc<Db>,
    stock: Arc<SledStock>,
    sequencer: SledSequencer,
}

impl OrderService {
    pub fn new(instance: Arc<Db>) -> anyhow::Result<Self> {
        let stock = Arc::new(SledStock::open(&instance)?);
        let sequencer = SledSequencer::open(&instance)?;
        Ok(Self {
            instance,
            stock,
            sequencer,
        })
    }

    pub fn from_config(config: &StoreConfig) -> anyhow::Result<Self> {
        Self::new(config.open()?)
    }

    /// Shared handle to the catalog, for callers that reserve directly
    pub fn stock(&self) -> Arc<SledStock> {
        Arc::clone(&self.stock)
    }

    /// Load catalog rows, replacing any with the same id
    pub fn stock_items(
        &self,
        items: impl IntoIterator<Item = (ItemId, StockRecord)>,
    ) -> Result<(), StockError> {
        self.stock.seed(items)
    }

    /// Open a new pending order against this store's catalog
    pub fn open_order(&self) -> Result<Order, OrderError> {
        Order::open(self.stock.clone(), &self.sequencer)
    }

    /// Counters for every catalog item, ascending by id
    pub fn levels(&self) -> Result<Vec<(ItemId, StockLevel)>, StockError> {
        self.stock
            .items()?
            .into_iter()
            .map(|item| Ok((item, self.stock.level(item)?)))
            .collect()
    }

    /// Flush everything to disk. Call before dropping the service when the
    /// store was opened without background flushing.
    pub fn flush(&self) -> Result<usize, StockError> {
        let flushed = self.instance.flush()?;
        info!(bytes = flushed, "order store flushed");
        Ok(flushed)
    }
}
