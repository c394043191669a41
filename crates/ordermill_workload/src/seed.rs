//! Deterministic data-set loader for the in-memory store mode.
//!
//! Rows Warehouse/District/Customer/Item/Stock are pre-loaded here the way
//! the benchmark's population phase would; Order/OrderLine/queue rows are
//! only ever created by the transaction mix itself.

use anyhow::Context;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use ordermill_txn::keys;
use ordermill_txn::model::{
    Customer, District, Item, Stock, Warehouse, DISTRICTS_PER_WAREHOUSE,
};
use ordermill_txn::{Session, Table};

#[derive(Clone, Copy, Debug)]
pub struct SeedScale {
    pub warehouses: u32,
    pub customers_per_district: u32,
    pub items: u32,
}

pub async fn load(session: &Session, scale: SeedScale, seed: u64) -> anyhow::Result<()> {
    let mut rng = SmallRng::seed_from_u64(seed);

    for i in 1..=scale.items {
        let price = Decimal::new(rng.gen_range(100..=10_000), 2);
        session
            .put(
                Table::Item,
                keys::item(i),
                &Item {
                    name: format!("item-{i:06}"),
                    price,
                },
            )
            .await
            .with_context(|| format!("seed item {i}"))?;
    }

    for w in 1..=scale.warehouses {
        session
            .put(
                Table::Warehouse,
                keys::warehouse(w),
                &Warehouse {
                    name: format!("warehouse-{w:03}"),
                    tax: Decimal::new(rng.gen_range(0..=20), 2),
                    ytd: Decimal::ZERO,
                },
            )
            .await
            .with_context(|| format!("seed warehouse {w}"))?;

        for d in 1..=DISTRICTS_PER_WAREHOUSE {
            session
                .put(
                    Table::District,
                    keys::district(w, d),
                    &District {
                        name: format!("district-{w:03}-{d:02}"),
                        tax: Decimal::new(rng.gen_range(0..=20), 2),
                        next_order_id: 1,
                        ytd: Decimal::ZERO,
                    },
                )
                .await
                .with_context(|| format!("seed district {w}/{d}"))?;

            for c in 1..=scale.customers_per_district {
                session
                    .put(
                        Table::Customer,
                        keys::customer(w, d, c),
                        &Customer {
                            first: format!("first-{c:05}"),
                            middle: "OE".to_string(),
                            last: format!("last-{c:05}"),
                            credit: if rng.gen_range(0..10) == 0 { "BC" } else { "GC" }
                                .to_string(),
                            credit_limit: Decimal::from(50_000),
                            discount: Decimal::new(rng.gen_range(0..=50), 3),
                            balance: Decimal::new(-1_000, 2),
                            ytd_payment: Decimal::from(10),
                            payment_count: 1,
                            delivery_count: 0,
                        },
                    )
                    .await
                    .with_context(|| format!("seed customer {w}/{d}/{c}"))?;
            }
        }

        for i in 1..=scale.items {
            session
                .put(
                    Table::Stock,
                    keys::stock(w, i),
                    &Stock {
                        quantity: rng.gen_range(10..=100),
                        ytd: 0,
                        order_count: 0,
                        remote_count: 0,
                    },
                )
                .await
                .with_context(|| format!("seed stock {w}/{i}"))?;
        }
    }

    Ok(())
}
