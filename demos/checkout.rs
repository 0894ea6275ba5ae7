//! A shopper walks in, fills a cart, looks at it, and walks away.
//!
//! Run with `cargo run --example checkout`. The store lives under
//! `ORDER_STORE_PATH` (default `./database`).
use anyhow::Context;
use order_reservation::{ItemId, OrderService, Price, StockRecord, config::StoreConfig, telemetry};

fn main() -> anyhow::Result<()> {
    telemetry::init();

    let service = OrderService::from_config(&StoreConfig::from_env())
        .context("failed to open the order store")?;

    let ten = Price::from_minor(1000, 2);
    service.stock_items([
        (ItemId(111), StockRecord::new(ten, 10)),
        (ItemId(222), StockRecord::new(ten, 10)),
    ])?;

    let mut order = service.open_order()?;
    order.add_line_item(ItemId(111), 2)?;
    order.add_line_item(ItemId(222), 3)?;

    for line in order.cart_lines()? {
        println!("{line}");
    }
    println!("subtotal {}", order.subtotal()?);

    order.cancel().context("failed to cancel the order")?;
    for (item, level) in service.levels()? {
        println!(
            "item {item} available {} reserved {}",
            level.available, level.reserved
        );
    }

    service.flush()?;
    Ok(())
}
