//! PopularItem: aggregate ordered quantities over a district's recent
//! orders and report the most-ordered item(s), ties included, together
//! with the ordering customers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{TxnError, TxnResult};
use crate::keys;
use crate::model::{Customer, District, Item, Order, MAX_ORDER_LINES};
use crate::store::{ScanOrder, Session, Table};
use crate::txn::order_status::decode_line;

#[derive(Clone, Debug)]
pub struct PopularItemInput {
    pub warehouse_id: u32,
    pub district_id: u32,
    /// Number of most recent orders to examine.
    pub window: u32,
}

#[derive(Clone, Debug)]
pub struct ExaminedOrder {
    pub order_id: u32,
    pub entry_ts: u64,
    pub customer_first: String,
    pub customer_middle: String,
    pub customer_last: String,
}

#[derive(Clone, Debug)]
pub struct PopularItemTotal {
    pub item_id: u32,
    pub name: String,
    pub total_quantity: u64,
}

#[derive(Clone, Debug)]
pub struct PopularItemOutput {
    pub window: u32,
    pub orders: Vec<ExaminedOrder>,
    /// Item(s) with the highest total quantity over the window.
    pub popular: Vec<PopularItemTotal>,
}

pub struct PopularItem {
    session: Arc<Session>,
}

impl PopularItem {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub async fn execute(&self, input: PopularItemInput) -> TxnResult<PopularItemOutput> {
        let district_key = keys::district(input.warehouse_id, input.district_id);
        let district: District = self
            .session
            .load(Table::District, &district_key)
            .await?
            .ok_or_else(|| TxnError::not_found("district", keys::display(&district_key)))?;

        let upper = district.next_order_id;
        let lower = upper.saturating_sub(input.window);

        let mut orders = Vec::new();
        let mut totals: HashMap<u32, u64> = HashMap::new();
        for order_id in lower..upper {
            let order_key = keys::order(input.warehouse_id, input.district_id, order_id);
            let Some(order) = self.session.load::<Order>(Table::Order, &order_key).await? else {
                // Gaps can exist when a concurrent NewOrder aborted.
                continue;
            };
            let customer: Option<Customer> = self
                .session
                .load(
                    Table::Customer,
                    &keys::customer(input.warehouse_id, input.district_id, order.customer_id),
                )
                .await?;
            let (first, middle, last) = customer
                .map(|c| (c.first, c.middle, c.last))
                .unwrap_or_default();
            orders.push(ExaminedOrder {
                order_id,
                entry_ts: order.entry_ts,
                customer_first: first,
                customer_middle: middle,
                customer_last: last,
            });

            let prefix = keys::order_prefix(input.warehouse_id, input.district_id, order_id);
            let page = self
                .session
                .scan(Table::OrderLine, &prefix, None, ScanOrder::Asc, MAX_ORDER_LINES)
                .await?;
            for (_, raw) in &page.rows {
                let line = decode_line(raw)?;
                *totals.entry(line.item_id).or_default() += u64::from(line.quantity);
            }
        }

        let max = totals.values().copied().max().unwrap_or(0);
        let mut popular = Vec::new();
        for (item_id, total_quantity) in totals {
            if total_quantity != max {
                continue;
            }
            let name = self
                .session
                .load::<Item>(Table::Item, &keys::item(item_id))
                .await?
                .map(|i| i.name)
                .unwrap_or_default();
            popular.push(PopularItemTotal {
                item_id,
                name,
                total_quantity,
            });
        }
        popular.sort_by_key(|p| p.item_id);

        Ok(PopularItemOutput {
            window: input.window,
            orders,
            popular,
        })
    }
}
