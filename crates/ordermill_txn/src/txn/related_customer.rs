//! RelatedCustomer: customers of the same warehouse whose order history
//! shares at least one item with the given customer's order history.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::error::{StoreError, TxnError, TxnResult};
use crate::keys;
use crate::model::{Order, DISTRICTS_PER_WAREHOUSE, MAX_ORDER_LINES};
use crate::store::{ScanOrder, Session, Table};
use crate::txn::order_status::decode_line;

/// Orders examined per page while walking a district's history.
const ORDER_SCAN_PAGE: usize = 64;

#[derive(Clone, Debug)]
pub struct RelatedCustomerInput {
    pub warehouse_id: u32,
    pub district_id: u32,
    pub customer_id: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct CustomerRef {
    pub warehouse_id: u32,
    pub district_id: u32,
    pub customer_id: u32,
}

#[derive(Clone, Debug)]
pub struct RelatedCustomerOutput {
    pub customers: Vec<CustomerRef>,
}

pub struct RelatedCustomer {
    session: Arc<Session>,
}

impl RelatedCustomer {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub async fn execute(&self, input: RelatedCustomerInput) -> TxnResult<RelatedCustomerOutput> {
        let customer_key = keys::customer(input.warehouse_id, input.district_id, input.customer_id);
        if self
            .session
            .load::<crate::model::Customer>(Table::Customer, &customer_key)
            .await?
            .is_none()
        {
            return Err(TxnError::not_found("customer", keys::display(&customer_key)));
        }

        // Items the input customer has ever ordered in their home district.
        let target = self
            .district_items(input.warehouse_id, input.district_id, Some(input.customer_id))
            .await?
            .remove(&input.customer_id)
            .unwrap_or_default();
        if target.is_empty() {
            return Ok(RelatedCustomerOutput {
                customers: Vec::new(),
            });
        }

        let mut related: BTreeSet<CustomerRef> = BTreeSet::new();
        for district_id in 1..=DISTRICTS_PER_WAREHOUSE {
            let per_customer = self
                .district_items(input.warehouse_id, district_id, None)
                .await?;
            for (customer_id, items) in per_customer {
                if district_id == input.district_id && customer_id == input.customer_id {
                    continue;
                }
                if !items.is_disjoint(&target) {
                    related.insert(CustomerRef {
                        warehouse_id: input.warehouse_id,
                        district_id,
                        customer_id,
                    });
                }
            }
        }

        Ok(RelatedCustomerOutput {
            customers: related.into_iter().collect(),
        })
    }

    /// Item sets per customer over one district's order history. When
    /// `only` is set, orders of other customers are skipped.
    async fn district_items(
        &self,
        warehouse_id: u32,
        district_id: u32,
        only: Option<u32>,
    ) -> TxnResult<HashMap<u32, HashSet<u32>>> {
        let prefix = keys::district_prefix(warehouse_id, district_id);
        let mut out: HashMap<u32, HashSet<u32>> = HashMap::new();
        let mut cursor: Option<Vec<u8>> = None;
        loop {
            let page = self
                .session
                .scan(
                    Table::Order,
                    &prefix,
                    cursor.as_deref(),
                    ScanOrder::Asc,
                    ORDER_SCAN_PAGE,
                )
                .await?;
            for (key, raw) in &page.rows {
                let order: Order = serde_json::from_slice(raw).map_err(|err| {
                    StoreError::Backend(format!("undecodable orders row: {err}"))
                })?;
                if only.is_some_and(|c| c != order.customer_id) {
                    continue;
                }
                let Some(order_id) = keys::order_id(key) else {
                    continue;
                };
                let line_prefix = keys::order_prefix(warehouse_id, district_id, order_id);
                let lines = self
                    .session
                    .scan(
                        Table::OrderLine,
                        &line_prefix,
                        None,
                        ScanOrder::Asc,
                        MAX_ORDER_LINES,
                    )
                    .await?;
                let entry = out.entry(order.customer_id).or_default();
                for (_, line_raw) in &lines.rows {
                    entry.insert(decode_line(line_raw)?.item_id);
                }
            }
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(out)
    }
}
