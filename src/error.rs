use super::order::OrderStatus;
use super::types::{ItemId, OrderId};
use rust_decimal::Decimal;

/// Failures raised at the stock repository boundary.
#[derive(thiserror::Error, Debug)]
pub enum StockError {
    #[error("Item {0} is not in the catalog")]
    UnknownItem(ItemId),
    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(i64),
    #[error("Price must not be negative, got {0}")]
    InvalidPrice(Decimal),
    #[error("Release of {requested} for item {item} exceeds the {reserved} currently reserved")]
    InvariantViolation {
        item: ItemId,
        requested: i64,
        reserved: u64,
    },
    #[error("Stock store failed: {0}")]
    Storage(#[from] sled::Error),
    #[error("Failed to encode stock record: {0}")]
    Encode(String),
    #[error("Failed to decode stock record: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error("Store entry {0} is corrupt")]
    Corrupt(String),
    #[error("Price arithmetic overflowed")]
    PriceOverflow,
}

/// Failures raised while issuing order ids.
#[derive(thiserror::Error, Debug)]
pub enum SequenceError {
    #[error("Order sequence is exhausted")]
    Exhausted,
    #[error("Sequence store failed: {0}")]
    Storage(#[from] sled::Error),
    #[error("Sequence counter is corrupt: {0}")]
    Corrupt(String),
}

/// Failures surfaced by [`crate::order::Order`].
///
/// Skipped adds and modifies are not errors by default, see
/// [`crate::order::Outcome::strict`] for turning them into one of these.
#[derive(thiserror::Error, Debug)]
pub enum OrderError {
    #[error("Order {order} is {status:?} and can no longer be changed")]
    OrderClosed { order: OrderId, status: OrderStatus },
    #[error("Item {0} is not in the catalog")]
    UnknownItem(ItemId),
    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(i64),
    #[error("Not enough stock of item {item} to reserve {requested}")]
    InsufficientStock { item: ItemId, requested: i64 },
    #[error("Item {0} is not in the cart")]
    NotInCart(ItemId),
    #[error(transparent)]
    Stock(#[from] StockError),
    #[error(transparent)]
    Sequence(#[from] SequenceError),
}
