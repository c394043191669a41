//! TopBalance: the ten customers with the largest balance magnitude,
//! cluster-wide.
//!
//! The customer table is walked in bounded pages with a running top-N,
//! never materializing the full scan in memory. Warehouse and district
//! names are resolved once per distinct id after the scan.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::error::{StoreError, TxnResult};
use crate::keys;
use crate::model::{Customer, District, Warehouse, TOP_BALANCE_LIMIT};
use crate::store::{ScanOrder, Session, Table};

/// Customers fetched per round trip during the scan.
const SCAN_PAGE: usize = 128;

#[derive(Clone, Debug)]
pub struct TopBalanceEntry {
    pub warehouse_id: u32,
    pub district_id: u32,
    pub customer_id: u32,
    pub first: String,
    pub middle: String,
    pub last: String,
    pub balance: Decimal,
    pub warehouse_name: String,
    pub district_name: String,
}

#[derive(Clone, Debug)]
pub struct TopBalanceOutput {
    /// Sorted by balance magnitude, largest first. Balances are reported
    /// signed.
    pub customers: Vec<TopBalanceEntry>,
}

pub struct TopBalance {
    session: Arc<Session>,
}

impl TopBalance {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub async fn execute(&self) -> TxnResult<TopBalanceOutput> {
        let mut top: Vec<(Decimal, (u32, u32, u32), Customer)> = Vec::new();
        let mut cursor: Option<Vec<u8>> = None;
        loop {
            let page = self
                .session
                .scan(
                    Table::Customer,
                    &[],
                    cursor.as_deref(),
                    ScanOrder::Asc,
                    SCAN_PAGE,
                )
                .await?;
            for (key, raw) in &page.rows {
                let Some(parts) = keys::customer_parts(key) else {
                    continue;
                };
                let customer: Customer = serde_json::from_slice(raw).map_err(|err| {
                    StoreError::Backend(format!("undecodable customer row: {err}"))
                })?;
                // Ranked by magnitude: a deeply negative balance outranks a
                // small positive one.
                top.push((customer.balance.abs(), parts, customer));
                if top.len() > TOP_BALANCE_LIMIT {
                    top.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
                    top.truncate(TOP_BALANCE_LIMIT);
                }
            }
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        top.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let mut warehouse_names: HashMap<u32, String> = HashMap::new();
        let mut district_names: HashMap<(u32, u32), String> = HashMap::new();
        let mut customers = Vec::with_capacity(top.len());
        for (_, (w, d, c), customer) in top {
            let warehouse_name = match warehouse_names.get(&w) {
                Some(name) => name.clone(),
                None => {
                    let name = self
                        .session
                        .load::<Warehouse>(Table::Warehouse, &keys::warehouse(w))
                        .await?
                        .map(|wh| wh.name)
                        .unwrap_or_default();
                    warehouse_names.insert(w, name.clone());
                    name
                }
            };
            let district_name = match district_names.get(&(w, d)) {
                Some(name) => name.clone(),
                None => {
                    let name = self
                        .session
                        .load::<District>(Table::District, &keys::district(w, d))
                        .await?
                        .map(|dt| dt.name)
                        .unwrap_or_default();
                    district_names.insert((w, d), name.clone());
                    name
                }
            };
            customers.push(TopBalanceEntry {
                warehouse_id: w,
                district_id: d,
                customer_id: c,
                balance: customer.balance,
                first: customer.first,
                middle: customer.middle,
                last: customer.last,
                warehouse_name,
                district_name,
            });
        }

        Ok(TopBalanceOutput { customers })
    }
}
