//! OrderStatus: read-only lookup of a customer's most recent order.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::error::{StoreError, TxnError, TxnResult};
use crate::keys;
use crate::model::{Customer, Order, OrderLine};
use crate::store::{ScanOrder, Session, Table};

#[derive(Clone, Debug)]
pub struct OrderStatusInput {
    pub warehouse_id: u32,
    pub district_id: u32,
    pub customer_id: u32,
}

#[derive(Clone, Debug)]
pub struct OrderLineStatus {
    pub item_id: u32,
    pub supply_warehouse_id: u32,
    pub quantity: u32,
    pub amount: Decimal,
    pub delivery_ts: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct OrderStatusOutput {
    pub customer_first: String,
    pub customer_middle: String,
    pub customer_last: String,
    pub balance: Decimal,
    pub order_id: u32,
    pub entry_ts: u64,
    pub carrier_id: Option<u32>,
    pub lines: Vec<OrderLineStatus>,
}

/// Orders examined per page while walking a district's history backwards.
const ORDER_SCAN_PAGE: usize = 64;

pub struct OrderStatus {
    session: Arc<Session>,
}

impl OrderStatus {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub async fn execute(&self, input: OrderStatusInput) -> TxnResult<OrderStatusOutput> {
        let customer_key = keys::customer(input.warehouse_id, input.district_id, input.customer_id);
        let customer: Customer = self
            .session
            .load(Table::Customer, &customer_key)
            .await?
            .ok_or_else(|| TxnError::not_found("customer", keys::display(&customer_key)))?;

        let (order_id, order) = self.latest_order(&input).await?;

        let line_prefix = keys::order_prefix(input.warehouse_id, input.district_id, order_id);
        let mut lines = Vec::with_capacity(order.line_count as usize);
        let mut cursor: Option<Vec<u8>> = None;
        loop {
            let page = self
                .session
                .scan(
                    Table::OrderLine,
                    &line_prefix,
                    cursor.as_deref(),
                    ScanOrder::Asc,
                    crate::model::MAX_ORDER_LINES,
                )
                .await?;
            for (_, raw) in &page.rows {
                let line: OrderLine = decode_line(raw)?;
                lines.push(OrderLineStatus {
                    item_id: line.item_id,
                    supply_warehouse_id: line.supply_warehouse_id,
                    quantity: line.quantity,
                    amount: line.amount,
                    delivery_ts: line.delivery_ts,
                });
            }
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(OrderStatusOutput {
            customer_first: customer.first,
            customer_middle: customer.middle,
            customer_last: customer.last,
            balance: customer.balance,
            order_id,
            entry_ts: order.entry_ts,
            carrier_id: order.carrier_id,
            lines,
        })
    }

    /// Walk the district's orders newest-first until one belongs to the
    /// customer.
    async fn latest_order(&self, input: &OrderStatusInput) -> TxnResult<(u32, Order)> {
        let prefix = keys::district_prefix(input.warehouse_id, input.district_id);
        let mut cursor: Option<Vec<u8>> = None;
        loop {
            let page = self
                .session
                .scan(
                    Table::Order,
                    &prefix,
                    cursor.as_deref(),
                    ScanOrder::Desc,
                    ORDER_SCAN_PAGE,
                )
                .await?;
            for (key, raw) in &page.rows {
                let order: Order = serde_json::from_slice(raw).map_err(|err| {
                    StoreError::Backend(format!("undecodable orders row: {err}"))
                })?;
                if order.customer_id == input.customer_id {
                    let order_id = keys::order_id(key)
                        .ok_or_else(|| TxnError::not_found("order", keys::display(key)))?;
                    return Ok((order_id, order));
                }
            }
            match page.next {
                Some(next) => cursor = Some(next),
                None => {
                    return Err(TxnError::not_found(
                        "order",
                        format!(
                            "no orders for customer {}/{}/{}",
                            input.warehouse_id, input.district_id, input.customer_id
                        ),
                    ))
                }
            }
        }
    }
}

pub(crate) fn decode_line(raw: &[u8]) -> Result<OrderLine, StoreError> {
    serde_json::from_slice(raw)
        .map_err(|err| StoreError::Backend(format!("undecodable order_line row: {err}")))
}
