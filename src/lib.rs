pub mod config;
pub mod error;
pub mod line_item;
pub mod order;
pub mod sequencer;
pub mod service;
pub mod stock;
pub mod store;
pub mod telemetry;
pub mod types;

pub use error::{OrderError, SequenceError, StockError};
pub use order::{CartLine, Order, OrderStatus, Outcome, SkipReason};
pub use sequencer::OrderSequencer;
pub use service::OrderService;
pub use stock::{StockLevel, StockRecord, StockRepository};
pub use types::{ItemId, OrderId, Price};
