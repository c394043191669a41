//! NewOrder: place an order with 1..=15 lines.
//!
//! The district's order-id counter is advanced through a conditional write
//! so concurrent workers never allocate the same id. Every write after the
//! allocation is guarded by a saga of compensating actions; an abort undoes
//! the order row, its lines, the stock decrements, and the queue entry in
//! reverse order before the failure is reported.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::{TxnError, TxnResult};
use crate::keys;
use crate::model::{
    self, Customer, District, Item, Order, OrderLine, QueueEntry, Stock, Warehouse,
    CAS_RETRY_BUDGET, MAX_ORDER_LINES,
};
use crate::saga::{Compensation, Saga};
use crate::store::{Session, Table};

#[derive(Clone, Debug)]
pub struct OrderLineRequest {
    pub item_id: u32,
    pub supply_warehouse_id: u32,
    pub quantity: u32,
}

#[derive(Clone, Debug)]
pub struct NewOrderInput {
    pub warehouse_id: u32,
    pub district_id: u32,
    pub customer_id: u32,
    pub lines: Vec<OrderLineRequest>,
}

#[derive(Clone, Debug)]
pub struct NewOrderLine {
    pub item_id: u32,
    pub item_name: String,
    pub supply_warehouse_id: u32,
    pub quantity: u32,
    pub amount: Decimal,
    pub stock_remaining: i64,
}

#[derive(Clone, Debug)]
pub struct NewOrderOutput {
    pub order_id: u32,
    pub entry_ts: u64,
    pub customer_last: String,
    pub customer_credit: String,
    pub discount: Decimal,
    pub warehouse_tax: Decimal,
    pub district_tax: Decimal,
    /// Sum of the line amounts. Discount and taxes are already folded into
    /// each amount, so the total always equals the stored line sum.
    pub total: Decimal,
    pub lines: Vec<NewOrderLine>,
}

pub struct NewOrder {
    session: Arc<Session>,
}

impl NewOrder {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub async fn execute(&self, input: NewOrderInput) -> TxnResult<NewOrderOutput> {
        validate(&input)?;

        let customer: Customer = self
            .session
            .load(
                Table::Customer,
                &keys::customer(input.warehouse_id, input.district_id, input.customer_id),
            )
            .await?
            .ok_or_else(|| {
                TxnError::not_found(
                    "customer",
                    keys::display(&keys::customer(
                        input.warehouse_id,
                        input.district_id,
                        input.customer_id,
                    )),
                )
            })?;
        let warehouse: Warehouse = self
            .session
            .load(Table::Warehouse, &keys::warehouse(input.warehouse_id))
            .await?
            .ok_or_else(|| TxnError::not_found("warehouse", input.warehouse_id.to_string()))?;

        let (order_id, district) = self.allocate_order_id(&input).await?;
        debug!(
            warehouse = input.warehouse_id,
            district = input.district_id,
            order_id,
            "allocated order id"
        );

        let mut saga = Saga::new();
        match self
            .apply(&input, order_id, &customer, &warehouse, &district, &mut saga)
            .await
        {
            Ok(output) => Ok(output),
            Err(cause) => {
                warn!(
                    warehouse = input.warehouse_id,
                    district = input.district_id,
                    order_id,
                    error = %cause,
                    "new-order aborted, unwinding"
                );
                match saga.unwind(&self.session).await {
                    Ok(()) => Err(cause),
                    Err((leftover, cleanup)) => Err(TxnError::CleanupFailed {
                        cause: Box::new(cause),
                        leftover,
                        cleanup,
                    }),
                }
            }
        }
    }

    /// Fetch-and-increment of the district's `next_order_id` with conflict
    /// detection. Returns the allocated id and the district row as read.
    async fn allocate_order_id(&self, input: &NewOrderInput) -> TxnResult<(u32, District)> {
        let key = keys::district(input.warehouse_id, input.district_id);
        for attempt in 1..=CAS_RETRY_BUDGET {
            let (district, raw): (District, Vec<u8>) = self
                .session
                .fetch(Table::District, &key)
                .await?
                .ok_or_else(|| TxnError::not_found("district", keys::display(&key)))?;
            let mut advanced = district.clone();
            advanced.next_order_id += 1;
            if self
                .session
                .compare_and_put(Table::District, &key, Some(raw.as_slice()), &advanced)
                .await?
            {
                return Ok((district.next_order_id, district));
            }
            debug!(
                district = input.district_id,
                attempt, "order-id allocation lost race, retrying"
            );
        }
        Err(TxnError::Conflict {
            what: "district next_order_id",
            attempts: CAS_RETRY_BUDGET,
        })
    }

    /// The write sequence after id allocation. Every completed write pushes
    /// its inverse onto `saga` before the next step runs.
    async fn apply(
        &self,
        input: &NewOrderInput,
        order_id: u32,
        customer: &Customer,
        warehouse: &Warehouse,
        district: &District,
        saga: &mut Saga,
    ) -> TxnResult<NewOrderOutput> {
        let entry_ts = model::now_micros();
        let all_local = input
            .lines
            .iter()
            .all(|l| l.supply_warehouse_id == input.warehouse_id);

        let order_key = keys::order(input.warehouse_id, input.district_id, order_id);
        self.session
            .put(
                Table::Order,
                order_key.clone(),
                &Order {
                    customer_id: input.customer_id,
                    entry_ts,
                    carrier_id: None,
                    line_count: input.lines.len() as u32,
                    all_local,
                },
            )
            .await?;
        saga.push(Compensation::Delete {
            table: Table::Order,
            key: order_key,
        });

        // Discount and taxes apply per line so the order total is exactly
        // the sum of the stored line amounts.
        let price_factor = (Decimal::ONE - customer.discount)
            * (Decimal::ONE + warehouse.tax + district.tax);

        let mut lines = Vec::with_capacity(input.lines.len());
        let mut total = Decimal::ZERO;
        for (idx, request) in input.lines.iter().enumerate() {
            let line_number = idx as u32 + 1;
            let item: Item = self
                .session
                .load(Table::Item, &keys::item(request.item_id))
                .await?
                .ok_or_else(|| TxnError::not_found("item", request.item_id.to_string()))?;
            let amount = item.price * Decimal::from(request.quantity) * price_factor;
            total += amount;

            let line_key = keys::order_line(
                input.warehouse_id,
                input.district_id,
                order_id,
                line_number,
            );
            self.session
                .put(
                    Table::OrderLine,
                    line_key.clone(),
                    &OrderLine {
                        item_id: request.item_id,
                        supply_warehouse_id: request.supply_warehouse_id,
                        quantity: request.quantity,
                        amount,
                        delivery_ts: None,
                        dist_info: format!("dist-{:02}", input.district_id),
                    },
                )
                .await?;
            saga.push(Compensation::Delete {
                table: Table::OrderLine,
                key: line_key,
            });

            let stock_remaining = self.decrement_stock(input, request, saga).await?;
            lines.push(NewOrderLine {
                item_id: request.item_id,
                item_name: item.name,
                supply_warehouse_id: request.supply_warehouse_id,
                quantity: request.quantity,
                amount,
                stock_remaining,
            });
        }

        let queue_key = keys::queue_entry(input.warehouse_id, input.district_id, order_id);
        self.session
            .put(
                Table::NewOrderQueue,
                queue_key.clone(),
                &QueueEntry {
                    queued_ts: entry_ts,
                },
            )
            .await?;
        saga.push(Compensation::Delete {
            table: Table::NewOrderQueue,
            key: queue_key,
        });

        Ok(NewOrderOutput {
            order_id,
            entry_ts,
            customer_last: customer.last.clone(),
            customer_credit: customer.credit.clone(),
            discount: customer.discount,
            warehouse_tax: warehouse.tax,
            district_tax: district.tax,
            total,
            lines,
        })
    }

    /// Conditional stock decrement with the restock-wrap rule. Conditional
    /// so a retry after an ambiguous timeout cannot double-apply.
    async fn decrement_stock(
        &self,
        input: &NewOrderInput,
        request: &OrderLineRequest,
        saga: &mut Saga,
    ) -> TxnResult<i64> {
        let key = keys::stock(request.supply_warehouse_id, request.item_id);
        for _attempt in 1..=CAS_RETRY_BUDGET {
            let (stock, raw): (Stock, Vec<u8>) = self
                .session
                .fetch(Table::Stock, &key)
                .await?
                .ok_or_else(|| TxnError::not_found("stock", keys::display(&key)))?;
            let mut updated = stock.clone();
            updated.quantity = model::restock(stock.quantity, i64::from(request.quantity));
            updated.ytd += u64::from(request.quantity);
            updated.order_count += 1;
            if request.supply_warehouse_id != input.warehouse_id {
                updated.remote_count += 1;
            }
            if self
                .session
                .compare_and_put(Table::Stock, &key, Some(raw.as_slice()), &updated)
                .await?
            {
                saga.push(Compensation::Restore {
                    table: Table::Stock,
                    key,
                    prior: raw,
                });
                return Ok(updated.quantity);
            }
        }
        Err(TxnError::Conflict {
            what: "stock decrement",
            attempts: CAS_RETRY_BUDGET,
        })
    }
}

fn validate(input: &NewOrderInput) -> TxnResult<()> {
    if input.lines.is_empty() || input.lines.len() > MAX_ORDER_LINES {
        return Err(TxnError::Validation(format!(
            "order must carry 1..={MAX_ORDER_LINES} lines, got {}",
            input.lines.len()
        )));
    }
    if let Some(line) = input.lines.iter().find(|l| l.quantity == 0) {
        return Err(TxnError::Validation(format!(
            "zero quantity for item {}",
            line.item_id
        )));
    }
    Ok(())
}
