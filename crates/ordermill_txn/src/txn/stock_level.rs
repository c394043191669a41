//! StockLevel: count low-stock items among a district's recent orders.
//!
//! Reads the lines of the last `window` orders, then one stock row per
//! distinct item — a deliberate read amplification bounded by
//! `window * 15` line reads plus the distinct-item lookups.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{TxnError, TxnResult};
use crate::keys;
use crate::model::{District, Stock, MAX_ORDER_LINES};
use crate::store::{ScanOrder, Session, Table};
use crate::txn::order_status::decode_line;

#[derive(Clone, Debug)]
pub struct StockLevelInput {
    pub warehouse_id: u32,
    pub district_id: u32,
    /// Items with stock quantity strictly below this count as low.
    pub threshold: i64,
    /// Number of most recent orders to examine.
    pub window: u32,
}

#[derive(Clone, Debug)]
pub struct StockLevelOutput {
    pub low_stock_items: usize,
    pub distinct_items: usize,
    pub examined_orders: u32,
}

pub struct StockLevel {
    session: Arc<Session>,
}

impl StockLevel {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub async fn execute(&self, input: StockLevelInput) -> TxnResult<StockLevelOutput> {
        if input.window == 0 {
            return Ok(StockLevelOutput {
                low_stock_items: 0,
                distinct_items: 0,
                examined_orders: 0,
            });
        }

        let district_key = keys::district(input.warehouse_id, input.district_id);
        let district: District = self
            .session
            .load(Table::District, &district_key)
            .await?
            .ok_or_else(|| TxnError::not_found("district", keys::display(&district_key)))?;

        // Existing orders have ids strictly below next_order_id.
        let upper = district.next_order_id;
        let lower = upper.saturating_sub(input.window);

        let mut items: HashSet<u32> = HashSet::new();
        for order_id in lower..upper {
            let prefix = keys::order_prefix(input.warehouse_id, input.district_id, order_id);
            let page = self
                .session
                .scan(Table::OrderLine, &prefix, None, ScanOrder::Asc, MAX_ORDER_LINES)
                .await?;
            for (_, raw) in &page.rows {
                items.insert(decode_line(raw)?.item_id);
            }
        }

        let mut low = 0usize;
        for item_id in &items {
            let stock: Option<Stock> = self
                .session
                .load(Table::Stock, &keys::stock(input.warehouse_id, *item_id))
                .await?;
            if let Some(stock) = stock {
                if stock.quantity < input.threshold {
                    low += 1;
                }
            }
        }

        Ok(StockLevelOutput {
            low_stock_items: low,
            distinct_items: items.len(),
            examined_orders: upper - lower,
        })
    }
}
