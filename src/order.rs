//! Orders and their cart of reserved line items
//!
//! An order is opened `Pending`, and every line in its cart holds a live
//! reservation for exactly its quantity. Adds and modifies are best effort:
//! when stock is short, the item is unknown or the quantity is not positive,
//! nothing changes and the call reports [`Outcome::Skipped`] instead of
//! failing. Callers that want those cases as errors use [`Outcome::strict`].
//!
//! `Paid` and `Cancelled` are terminal. Any mutation on a terminal order
//! fails with [`OrderError::OrderClosed`].
use super::error::OrderError;
use super::line_item::{LineItem, LineItemStatus};
use super::sequencer::OrderSequencer;
use super::stock::StockRepository;
use super::types::{ItemId, OrderId, Price};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

/// Why an add or modify left the order untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InvalidQuantity(i64),
    UnknownItem(ItemId),
    InsufficientStock { item: ItemId, requested: i64 },
    NotInCart(ItemId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Skipped(SkipReason),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    /// Opt in to strict handling: a skip becomes the matching error.
    pub fn strict(self) -> Result<(), OrderError> {
        match self {
            Outcome::Applied => Ok(()),
            Outcome::Skipped(reason) => Err(match reason {
                SkipReason::InvalidQuantity(q) => OrderError::InvalidQuantity(q),
                SkipReason::UnknownItem(item) => OrderError::UnknownItem(item),
                SkipReason::InsufficientStock { item, requested } => {
                    OrderError::InsufficientStock { item, requested }
                }
                SkipReason::NotInCart(item) => OrderError::NotInCart(item),
            }),
        }
    }
}

/// A printable row of the cart priced at the current catalog price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub order: OrderId,
    pub item: ItemId,
    pub quantity: u32,
    pub line_total: Price,
}

impl fmt::Display for CartLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "order {} item {} x{} = {}",
            self.order, self.item, self.quantity, self.line_total
        )
    }
}

pub struct Order {
    id: OrderId,
    status: OrderStatus,
    cart: HashMap<ItemId, LineItem>,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    stock: Arc<dyn StockRepository>,
}

impl fmt::Debug for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Order")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("cart", &self.cart)
            .field("opened_at", &self.opened_at)
            .field("closed_at", &self.closed_at)
            .finish_non_exhaustive()
    }
}

impl Order {
    /// Open a new pending order, drawing its id from `sequencer`.
    pub fn open(
        stock: Arc<dyn StockRepository>,
        sequencer: &dyn OrderSequencer,
    ) -> Result<Self, OrderError> {
        let id = sequencer.next()?;
        info!(order = %id, "order opened");

        Ok(Self {
            id,
            status: OrderStatus::Pending,
            cart: HashMap::new(),
            opened_at: Utc::now(),
            closed_at: None,
            stock,
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }
    pub fn status(&self) -> OrderStatus {
        self.status
    }
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }
    /// Set once the order reaches `Paid` or `Cancelled`
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }
    pub fn line(&self, item: ItemId) -> Option<&LineItem> {
        self.cart.get(&item)
    }
    pub fn cart(&self) -> impl Iterator<Item = &LineItem> {
        self.cart.values()
    }
    pub fn len(&self) -> usize {
        self.cart.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    fn ensure_pending(&self) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::OrderClosed {
                order: self.id,
                status: self.status,
            });
        }
        Ok(())
    }

    /// Add a single unit of `item`.
    pub fn add_one(&mut self, item: ItemId) -> Result<Outcome, OrderError> {
        self.add_line_item(item, 1)
    }

    /// Reserve `quantity` of `item` and put it in the cart.
    ///
    /// An item already in the cart has `quantity` merged into its existing
    /// line, reserving only the extra units.
    pub fn add_line_item(&mut self, item: ItemId, quantity: i64) -> Result<Outcome, OrderError> {
        self.ensure_pending()?;

        if quantity <= 0 {
            return Ok(self.skip(SkipReason::InvalidQuantity(quantity)));
        }
        if !self.stock.exists(item)? {
            return Ok(self.skip(SkipReason::UnknownItem(item)));
        }
        if self.cart.contains_key(&item) {
            return self.modify_line_item(item, quantity);
        }
        // no catalog can hold more than a line can count
        let Ok(units) = u32::try_from(quantity) else {
            return Ok(self.skip(SkipReason::InsufficientStock {
                item,
                requested: quantity,
            }));
        };

        match LineItem::reserve(self.stock.as_ref(), item, units)? {
            LineItemStatus::Added(line) => {
                debug!(order = %self.id, %item, quantity, "line added");
                self.cart.insert(item, line);
                Ok(Outcome::Applied)
            }
            LineItemStatus::NotAdded => Ok(self.skip(SkipReason::InsufficientStock {
                item,
                requested: quantity,
            })),
        }
    }

    /// Change the quantity of a line already in the cart by `delta`.
    ///
    /// A line whose quantity would fall below one is removed and its whole
    /// reservation released. Growth reserves the extra units first and
    /// leaves the line as is when they are not available.
    pub fn modify_line_item(&mut self, item: ItemId, delta: i64) -> Result<Outcome, OrderError> {
        self.ensure_pending()?;

        let Some(current) = self.cart.get(&item).map(LineItem::quantity) else {
            return Ok(self.skip(SkipReason::NotInCart(item)));
        };
        let current = i64::from(current);

        if current.saturating_add(delta) < 1 {
            self.stock.release(item, current)?;
            self.cart.remove(&item);
            debug!(order = %self.id, %item, released = current, "line removed");
            return Ok(Outcome::Applied);
        }

        if delta == 0 {
            return Ok(Outcome::Applied);
        }

        if delta > 0 {
            let grow = match u32::try_from(delta) {
                Ok(grow) if (current as u32).checked_add(grow).is_some() => grow,
                _ => {
                    return Ok(self.skip(SkipReason::InsufficientStock {
                        item,
                        requested: delta,
                    }));
                }
            };
            if !self.stock.reserve(item, delta)? {
                return Ok(self.skip(SkipReason::InsufficientStock {
                    item,
                    requested: delta,
                }));
            }
            if let Some(line) = self.cart.get_mut(&item) {
                line.grow(grow);
            }
            debug!(order = %self.id, %item, delta, "line grown");
            return Ok(Outcome::Applied);
        }

        // shrinking, and at least one unit stays
        let shrink = -delta;
        self.stock.release(item, shrink)?;
        if let Some(line) = self.cart.get_mut(&item) {
            // shrink < current <= u32::MAX
            line.shrink(shrink as u32);
        }
        debug!(order = %self.id, %item, delta, "line shrunk");
        Ok(Outcome::Applied)
    }

    /// Sum of `quantity * current catalog price` over the cart.
    ///
    /// Fails with [`StockError::PriceOverflow`] when a line or the sum no
    /// longer fits a decimal.
    ///
    /// [`StockError::PriceOverflow`]: crate::error::StockError::PriceOverflow
    pub fn subtotal(&self) -> Result<Price, OrderError> {
        let mut total = Price::ZERO;
        for line in self.cart.values() {
            total = total.checked_add(self.live_total(line)?)?;
        }
        Ok(total)
    }

    /// Sum of the line totals at the prices captured when each line was
    /// reserved.
    pub fn reserved_total(&self) -> Result<Price, OrderError> {
        let lines = self
            .cart
            .values()
            .map(LineItem::line_total)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Price::checked_sum(lines)?)
    }

    fn live_total(&self, line: &LineItem) -> Result<Price, OrderError> {
        Ok(self.stock.price(line.item())?.checked_mul(line.quantity())?)
    }

    /// Cart rows ordered by item id, priced live.
    pub fn cart_lines(&self) -> Result<Vec<CartLine>, OrderError> {
        let mut lines = self
            .cart
            .values()
            .map(|line| {
                Ok(CartLine {
                    order: self.id,
                    item: line.item(),
                    quantity: line.quantity(),
                    line_total: self.live_total(line)?,
                })
            })
            .collect::<Result<Vec<_>, OrderError>>()?;
        lines.sort_by_key(|line| line.item);
        Ok(lines)
    }

    /// Release every reservation held by the cart and close the order.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        self.ensure_pending()?;

        let held: Vec<(ItemId, i64)> = self
            .cart
            .values()
            .map(|line| (line.item(), i64::from(line.quantity())))
            .collect();
        for (item, quantity) in held {
            self.modify_line_item(item, -quantity)?;
        }

        self.close(OrderStatus::Cancelled);
        Ok(())
    }

    /// Mark the order paid. Reservations stay held, settling them against
    /// stock on hand is up to whoever takes the payment.
    pub fn pay(&mut self) -> Result<(), OrderError> {
        self.ensure_pending()?;
        self.close(OrderStatus::Paid);
        Ok(())
    }

    fn close(&mut self, status: OrderStatus) {
        self.status = status;
        self.closed_at = Some(Utc::now());
        info!(order = %self.id, status = ?status, lines = self.cart.len(), "order closed");
    }

    fn skip(&self, reason: SkipReason) -> Outcome {
        debug!(order = %self.id, reason = ?reason, "cart left unchanged");
        Outcome::Skipped(reason)
    }
}
