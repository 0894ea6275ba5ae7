//! End to end order scenarios against the sled backed store.
use anyhow::Context;
use order_reservation::{
    ItemId, Order, OrderId, OrderService, OrderStatus, Outcome, Price, SkipReason, StockLevel,
    StockRecord, StockRepository,
    config::StoreConfig,
    sequencer::OrderSequencer,
    store::{SledSequencer, SledStock},
};
use std::sync::Arc;
use std::thread;

use tempfile::tempdir; // Use for test db cleanup.

fn ten() -> Price {
    Price::from_minor(1000, 2)
}

fn level(stock: &SledStock, item: u64) -> anyhow::Result<StockLevel> {
    Ok(stock.level(ItemId(item))?)
}

#[test]
fn add_two_lines_then_cancel() -> anyhow::Result<()> {
    // sled locks its directory, so every test gets its own store.
    let temp_dir = tempdir()?;
    let db = StoreConfig::new()
        .set_path(temp_dir.path().join("add_then_cancel.db"))
        .open()?;

    let stock = Arc::new(SledStock::open(&db)?);
    stock.seed([
        (ItemId(111), StockRecord::new(ten(), 10)),
        (ItemId(222), StockRecord::new(ten(), 10)),
    ])?;
    let sequencer = SledSequencer::open(&db)?;

    let mut order = Order::open(stock.clone(), &sequencer)?;
    order.add_line_item(ItemId(111), 2)?;
    order.add_line_item(ItemId(222), 3)?;

    assert_eq!(order.len(), 2);
    assert_eq!(order.subtotal()?, Price::from_minor(5000, 2));
    assert_eq!(level(&stock, 111)?.available, 8);
    assert_eq!(level(&stock, 222)?.available, 7);

    order.cancel().context("Order failed on cancel: ")?;

    assert_eq!(order.status(), OrderStatus::Cancelled);
    assert!(order.is_empty());
    assert_eq!(order.subtotal()?, Price::ZERO);
    assert_eq!(
        level(&stock, 111)?,
        StockLevel {
            available: 10,
            reserved: 0
        }
    );
    assert_eq!(level(&stock, 222)?.available, 10);

    Ok(())
}

#[test]
fn oversized_add_leaves_cart_and_stock_alone() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = StoreConfig::new()
        .set_path(temp_dir.path().join("oversized_add.db"))
        .open()?;

    let stock = Arc::new(SledStock::open(&db)?);
    stock.seed([(ItemId(111), StockRecord::new(ten(), 5))])?;
    let sequencer = SledSequencer::open(&db)?;

    let mut order = Order::open(stock.clone(), &sequencer)?;
    let outcome = order.add_line_item(ItemId(111), 6)?;

    assert_eq!(
        outcome,
        Outcome::Skipped(SkipReason::InsufficientStock {
            item: ItemId(111),
            requested: 6
        })
    );
    assert!(order.is_empty());
    assert_eq!(level(&stock, 111)?.available, 5);
    assert_eq!(level(&stock, 111)?.reserved, 0);

    Ok(())
}

#[test]
fn modify_then_cancel_tracks_subtotal() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = StoreConfig::new()
        .set_path(temp_dir.path().join("modify_then_cancel.db"))
        .open()?;

    let stock = Arc::new(SledStock::open(&db)?);
    stock.seed([
        (ItemId(111), StockRecord::new(ten(), 10)),
        (ItemId(222), StockRecord::new(ten(), 10)),
    ])?;
    let sequencer = SledSequencer::open(&db)?;

    let mut order = Order::open(stock.clone(), &sequencer)?;
    assert_eq!(order.subtotal()?, Price::ZERO);

    order.add_line_item(ItemId(111), 3)?;
    order.add_line_item(ItemId(222), 2)?;
    assert_eq!(order.subtotal()?, Price::from_minor(50, 0));

    order.modify_line_item(ItemId(111), -2)?;
    assert_eq!(order.line(ItemId(111)).map(|l| l.quantity()), Some(1));
    assert_eq!(order.subtotal()?, Price::from_minor(30, 0));
    assert_eq!(level(&stock, 111)?.reserved, 1);

    order.cancel()?;
    assert_eq!(order.status(), OrderStatus::Cancelled);
    assert_eq!(level(&stock, 111)?.available, 10);
    assert_eq!(level(&stock, 222)?.available, 10);

    Ok(())
}

#[test]
fn subtotal_follows_live_price() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = StoreConfig::new()
        .set_path(temp_dir.path().join("live_price.db"))
        .open()?;

    let stock = Arc::new(SledStock::open(&db)?);
    stock.seed([(ItemId(111), StockRecord::new(ten(), 10))])?;
    let sequencer = SledSequencer::open(&db)?;

    let mut order = Order::open(stock.clone(), &sequencer)?;
    order.add_line_item(ItemId(111), 2)?;

    // reprice the catalog row while keeping the reservation counters
    stock.seed([(
        ItemId(111),
        StockRecord {
            price: Price::from_minor(1250, 2),
            available: 8,
            reserved: 2,
        },
    )])?;

    assert_eq!(order.subtotal()?, Price::from_minor(25, 0));
    assert_eq!(order.reserved_total()?, Price::from_minor(20, 0));

    Ok(())
}

#[test]
fn cancelled_order_cannot_be_cancelled_again() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = StoreConfig::new()
        .set_path(temp_dir.path().join("double_cancel.db"))
        .open()?;

    let stock = Arc::new(SledStock::open(&db)?);
    stock.seed([(ItemId(111), StockRecord::new(ten(), 10))])?;
    let sequencer = SledSequencer::open(&db)?;

    let mut order = Order::open(stock.clone(), &sequencer)?;
    order.cancel()?;
    let before = level(&stock, 111)?;

    assert!(order.cancel().is_err());
    assert!(order.add_line_item(ItemId(111), 1).is_err());
    assert_eq!(level(&stock, 111)?, before);

    Ok(())
}

#[test]
fn order_ids_survive_reopen() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("sequence.db");

    {
        let db = StoreConfig::new().set_path(&path).open()?;
        let sequencer = SledSequencer::open(&db)?;
        assert_eq!(sequencer.next()?, OrderId(1));
        assert_eq!(sequencer.next()?, OrderId(2));
    }

    let db = StoreConfig::new().set_path(&path).open()?;
    let sequencer = SledSequencer::open(&db)?;
    assert_eq!(sequencer.last_issued()?, Some(OrderId(2)));
    assert_eq!(sequencer.next()?, OrderId(3));

    Ok(())
}

#[test]
fn competing_orders_never_oversell() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = StoreConfig::new()
        .set_path(temp_dir.path().join("competing_orders.db"))
        .open()?;

    let stock = Arc::new(SledStock::open(&db)?);
    stock.seed([(ItemId(111), StockRecord::new(ten(), 10))])?;
    let sequencer = Arc::new(SledSequencer::open(&db)?);

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let stock = Arc::clone(&stock);
            let sequencer = Arc::clone(&sequencer);
            thread::spawn(move || -> anyhow::Result<(OrderId, u32)> {
                let mut order = Order::open(stock, sequencer.as_ref())?;
                for _ in 0..4 {
                    order.add_one(ItemId(111))?;
                }
                let held = order.line(ItemId(111)).map_or(0, |l| l.quantity());
                Ok((order.id(), held))
            })
        })
        .collect();

    let mut ids = Vec::new();
    let mut held = 0;
    for handle in handles {
        let (id, quantity) = handle.join().expect("order thread panicked")?;
        ids.push(id);
        held += quantity;
    }
    ids.sort();
    ids.dedup();

    assert_eq!(ids.len(), 6);
    assert_eq!(held, 10);
    assert_eq!(
        level(&stock, 111)?,
        StockLevel {
            available: 0,
            reserved: 10
        }
    );

    Ok(())
}

#[test]
fn service_opens_orders_on_a_shared_store() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = sled::open(temp_dir.path().join("service.db"))?;
    let db = Arc::new(db);

    // reset the db for each test run
    db.clear()?;

    let service = OrderService::new(db)?;
    service.stock_items([
        (ItemId(111), StockRecord::new(ten(), 10)),
        (ItemId(222), StockRecord::new(ten(), 10)),
    ])?;

    let mut first = service.open_order()?;
    let mut second = service.open_order()?;
    assert_eq!(first.id(), OrderId(1));
    assert_eq!(second.id(), OrderId(2));

    first.add_line_item(ItemId(111), 7)?;
    let outcome = second.add_line_item(ItemId(111), 4)?;
    assert!(!outcome.is_applied());

    second.add_line_item(ItemId(111), 3)?;
    second.pay()?;

    let levels = service.levels()?;
    assert_eq!(
        levels,
        vec![
            (
                ItemId(111),
                StockLevel {
                    available: 0,
                    reserved: 10
                }
            ),
            (
                ItemId(222),
                StockLevel {
                    available: 10,
                    reserved: 0
                }
            ),
        ]
    );

    first.cancel()?;
    assert_eq!(service.stock().level(ItemId(111))?.available, 7);
    service.flush()?;

    Ok(())
}
