use super::error::StockError;
use super::stock::StockRepository;
use super::types::{ItemId, Price};

/// One item and quantity held by an order's cart.
///
/// A `LineItem` only exists once its quantity is reserved in the stock
/// repository, so holding one means holding the stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    item: ItemId,
    quantity: u32,
    unit_price: Price, // price when the reservation was taken
}

/// Result of trying to materialise a line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineItemStatus {
    Added(LineItem),
    NotAdded,
}

impl LineItem {
    /// Reserve `quantity` of `item` and, on success, build the line with the
    /// price snapshotted at this moment.
    pub fn reserve(
        stock: &dyn StockRepository,
        item: ItemId,
        quantity: u32,
    ) -> Result<LineItemStatus, StockError> {
        if !stock.reserve(item, i64::from(quantity))? {
            return Ok(LineItemStatus::NotAdded);
        }

        let unit_price = match stock.price(item) {
            Ok(price) => price,
            Err(err) => {
                // hand the stock back so a failed build holds nothing
                stock.release(item, i64::from(quantity))?;
                return Err(err);
            }
        };

        Ok(LineItemStatus::Added(LineItem {
            item,
            quantity,
            unit_price,
        }))
    }

    pub fn item(&self) -> ItemId {
        self.item
    }
    pub fn quantity(&self) -> u32 {
        self.quantity
    }
    pub fn unit_price(&self) -> Price {
        self.unit_price
    }
    /// `quantity * unit_price` at the reserved price.
    pub fn line_total(&self) -> Result<Price, StockError> {
        self.unit_price.checked_mul(self.quantity)
    }

    pub(crate) fn grow(&mut self, by: u32) {
        self.quantity += by;
    }
    pub(crate) fn shrink(&mut self, by: u32) {
        self.quantity -= by;
    }
}

impl LineItemStatus {
    pub fn is_added(&self) -> bool {
        matches!(self, LineItemStatus::Added(_))
    }
}
