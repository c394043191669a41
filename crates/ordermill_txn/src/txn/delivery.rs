//! Delivery: assign a carrier to the oldest undelivered order of each of
//! the warehouse's ten districts.
//!
//! Each district is an independent unit: an empty queue is a normal
//! outcome, and a failure in one district is recorded and never blocks the
//! other nine. The queue entry is removed as soon as the order is popped,
//! so a repeated Delivery call cannot reprocess the same order.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::warn;

use crate::error::{StoreError, TxnError, TxnResult};
use crate::keys;
use crate::model::{self, Customer, Order, OrderLine, DISTRICTS_PER_WAREHOUSE};
use crate::store::{ScanOrder, Session, Table};

#[derive(Clone, Debug)]
pub struct DeliveryInput {
    pub warehouse_id: u32,
    pub carrier_id: u32,
}

/// Outcome for one district.
#[derive(Debug)]
pub enum DistrictDelivery {
    Delivered {
        district_id: u32,
        order_id: u32,
        customer_id: u32,
        amount: Decimal,
    },
    /// No pending orders; a no-op, not an error.
    EmptyQueue { district_id: u32 },
    Failed {
        district_id: u32,
        error: TxnError,
    },
}

#[derive(Debug)]
pub struct DeliveryOutput {
    pub carrier_id: u32,
    pub districts: Vec<DistrictDelivery>,
}

pub struct Delivery {
    session: Arc<Session>,
}

impl Delivery {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub async fn execute(&self, input: DeliveryInput) -> TxnResult<DeliveryOutput> {
        let mut districts = Vec::with_capacity(DISTRICTS_PER_WAREHOUSE as usize);
        for district_id in 1..=DISTRICTS_PER_WAREHOUSE {
            let outcome = match self
                .deliver_district(input.warehouse_id, district_id, input.carrier_id)
                .await
            {
                Ok(Some((order_id, customer_id, amount))) => DistrictDelivery::Delivered {
                    district_id,
                    order_id,
                    customer_id,
                    amount,
                },
                Ok(None) => DistrictDelivery::EmptyQueue { district_id },
                Err(error) => {
                    warn!(
                        warehouse = input.warehouse_id,
                        district = district_id,
                        %error,
                        "district delivery failed"
                    );
                    DistrictDelivery::Failed { district_id, error }
                }
            };
            districts.push(outcome);
        }
        Ok(DeliveryOutput {
            carrier_id: input.carrier_id,
            districts,
        })
    }

    /// Pop and deliver the oldest pending order of one district. Returns
    /// `None` when the queue is empty.
    async fn deliver_district(
        &self,
        warehouse_id: u32,
        district_id: u32,
        carrier_id: u32,
    ) -> TxnResult<Option<(u32, u32, Decimal)>> {
        let prefix = keys::district_prefix(warehouse_id, district_id);
        let page = self
            .session
            .scan(Table::NewOrderQueue, &prefix, None, ScanOrder::Asc, 1)
            .await?;
        let Some((queue_key, _)) = page.rows.into_iter().next() else {
            return Ok(None);
        };
        let order_id = keys::order_id(&queue_key)
            .ok_or_else(|| TxnError::not_found("queue entry", keys::display(&queue_key)))?;

        let order_key = keys::order(warehouse_id, district_id, order_id);
        let mut order: Order = self
            .session
            .load(Table::Order, &order_key)
            .await?
            .ok_or_else(|| TxnError::not_found("order", keys::display(&order_key)))?;

        // Dequeue first so a repeat call never reprocesses this order.
        self.session.delete(Table::NewOrderQueue, &queue_key).await?;

        order.carrier_id = Some(carrier_id);
        self.session
            .put(Table::Order, order_key, &order)
            .await?;

        let delivery_ts = model::now_micros();
        let line_prefix = keys::order_prefix(warehouse_id, district_id, order_id);
        let mut amount = Decimal::ZERO;
        let mut cursor: Option<Vec<u8>> = None;
        loop {
            let page = self
                .session
                .scan(
                    Table::OrderLine,
                    &line_prefix,
                    cursor.as_deref(),
                    ScanOrder::Asc,
                    model::MAX_ORDER_LINES,
                )
                .await?;
            for (line_key, raw) in &page.rows {
                let mut line: OrderLine = serde_json::from_slice(raw).map_err(|err| {
                    StoreError::Backend(format!("undecodable order_line row: {err}"))
                })?;
                amount += line.amount;
                line.delivery_ts = Some(delivery_ts);
                self.session
                    .put(Table::OrderLine, line_key.clone(), &line)
                    .await?;
            }
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        let customer_key = keys::customer(warehouse_id, district_id, order.customer_id);
        let mut customer: Customer = self
            .session
            .load(Table::Customer, &customer_key)
            .await?
            .ok_or_else(|| TxnError::not_found("customer", keys::display(&customer_key)))?;
        customer.balance += amount;
        customer.delivery_count += 1;
        self.session
            .put(Table::Customer, customer_key, &customer)
            .await?;

        Ok(Some((order_id, order.customer_id, amount)))
    }
}
