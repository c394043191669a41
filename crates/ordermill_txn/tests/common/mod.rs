//! Shared fixture for integration tests: a small deterministic data set
//! loaded into the in-memory store, plus a connected dispatcher.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use ordermill_txn::model::{Customer, District, Item, Stock, Warehouse, DISTRICTS_PER_WAREHOUSE};
use ordermill_txn::{
    keys, Dispatcher, DispatcherConfig, MemConnector, MemStore, Session, Table,
};

pub const KEYSPACE: &str = "bench";
pub const WAREHOUSES: u32 = 2;
pub const CUSTOMERS_PER_DISTRICT: u32 = 3;
pub const ITEMS: u32 = 50;
pub const SEED_STOCK_QUANTITY: i64 = 50;

/// Warehouse tax 10%, district tax 5%, customer discount 5%.
pub fn warehouse_tax() -> Decimal {
    Decimal::new(10, 2)
}

pub fn district_tax() -> Decimal {
    Decimal::new(5, 2)
}

pub fn customer_discount() -> Decimal {
    Decimal::new(5, 2)
}

/// Seed item price: `i` whole dollars.
pub fn item_price(item_id: u32) -> Decimal {
    Decimal::from(item_id)
}

/// Discount/tax factor NewOrder folds into every line amount.
pub fn price_factor() -> Decimal {
    (Decimal::ONE - customer_discount()) * (Decimal::ONE + warehouse_tax() + district_tax())
}

pub struct Fixture {
    pub store: Arc<MemStore>,
    pub connector: MemConnector,
    pub dispatcher: Dispatcher,
    /// Direct session for seeding and row-level assertions.
    pub session: Arc<Session>,
}

pub async fn fixture() -> Fixture {
    let store = Arc::new(MemStore::new());
    let connector = MemConnector::new(store.clone());
    let dispatcher = Dispatcher::connect(
        &connector,
        DispatcherConfig {
            worker_index: 0,
            consistency: "QUORUM".to_string(),
            contact_points: vec!["node-a".to_string(), "node-b".to_string()],
            keyspace: KEYSPACE.to_string(),
            op_timeout: Duration::from_secs(2),
        },
    )
    .await
    .expect("dispatcher connect");

    let session = dispatcher.session().clone();
    seed(&session).await;
    Fixture {
        store,
        connector,
        dispatcher,
        session,
    }
}

async fn seed(session: &Session) {
    for i in 1..=ITEMS {
        session
            .put(
                Table::Item,
                keys::item(i),
                &Item {
                    name: format!("item-{i}"),
                    price: item_price(i),
                },
            )
            .await
            .unwrap();
    }

    for w in 1..=WAREHOUSES {
        session
            .put(
                Table::Warehouse,
                keys::warehouse(w),
                &Warehouse {
                    name: format!("warehouse-{w}"),
                    tax: warehouse_tax(),
                    ytd: Decimal::ZERO,
                },
            )
            .await
            .unwrap();

        for d in 1..=DISTRICTS_PER_WAREHOUSE {
            session
                .put(
                    Table::District,
                    keys::district(w, d),
                    &District {
                        name: format!("district-{w}-{d}"),
                        tax: district_tax(),
                        next_order_id: 1,
                        ytd: Decimal::ZERO,
                    },
                )
                .await
                .unwrap();

            for c in 1..=CUSTOMERS_PER_DISTRICT {
                session
                    .put(
                        Table::Customer,
                        keys::customer(w, d, c),
                        &Customer {
                            first: format!("first-{c}"),
                            middle: "OE".to_string(),
                            last: format!("last-{c}"),
                            credit: "GC".to_string(),
                            credit_limit: Decimal::from(50_000),
                            discount: customer_discount(),
                            balance: Decimal::new(-1_000, 2),
                            ytd_payment: Decimal::from(10),
                            payment_count: 0,
                            delivery_count: 0,
                        },
                    )
                    .await
                    .unwrap();
            }
        }

        for i in 1..=ITEMS {
            session
                .put(
                    Table::Stock,
                    keys::stock(w, i),
                    &Stock {
                        quantity: SEED_STOCK_QUANTITY,
                        ytd: 0,
                        order_count: 0,
                        remote_count: 0,
                    },
                )
                .await
                .unwrap();
        }
    }
}

pub async fn load_stock(session: &Session, w: u32, i: u32) -> Stock {
    session
        .load(Table::Stock, &keys::stock(w, i))
        .await
        .unwrap()
        .expect("stock row")
}

pub async fn load_customer(session: &Session, w: u32, d: u32, c: u32) -> Customer {
    session
        .load(Table::Customer, &keys::customer(w, d, c))
        .await
        .unwrap()
        .expect("customer row")
}

pub async fn load_district(session: &Session, w: u32, d: u32) -> District {
    session
        .load(Table::District, &keys::district(w, d))
        .await
        .unwrap()
        .expect("district row")
}

pub async fn set_customer_balance(session: &Session, w: u32, d: u32, c: u32, balance: Decimal) {
    let mut customer = load_customer(session, w, d, c).await;
    customer.balance = balance;
    session
        .put(Table::Customer, keys::customer(w, d, c), &customer)
        .await
        .unwrap();
}

pub async fn set_stock_quantity(session: &Session, w: u32, i: u32, quantity: i64) {
    let mut stock = load_stock(session, w, i).await;
    stock.quantity = quantity;
    session
        .put(Table::Stock, keys::stock(w, i), &stock)
        .await
        .unwrap();
}
