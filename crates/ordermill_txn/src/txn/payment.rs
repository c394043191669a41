//! Payment: credit a payment against warehouse, district, and customer.
//!
//! The four updates are independent single-row writes; there is no
//! cross-row atomicity to preserve, so a partial failure is surfaced with
//! the failing step named and the earlier updates left in place.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::error::{StoreError, TxnError, TxnResult};
use crate::keys;
use crate::model::{self, Customer, District, PaymentRecord, Warehouse};
use crate::store::{Session, Table};

#[derive(Clone, Debug)]
pub struct PaymentInput {
    pub warehouse_id: u32,
    pub district_id: u32,
    pub customer_id: u32,
    pub amount: Decimal,
}

#[derive(Clone, Debug)]
pub struct PaymentOutput {
    pub warehouse_name: String,
    pub district_name: String,
    pub customer_first: String,
    pub customer_middle: String,
    pub customer_last: String,
    pub customer_credit: String,
    pub credit_limit: Decimal,
    pub discount: Decimal,
    /// Customer balance after the payment applied.
    pub balance: Decimal,
    pub amount: Decimal,
}

pub struct Payment {
    session: Arc<Session>,
}

impl Payment {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub async fn execute(&self, input: PaymentInput) -> TxnResult<PaymentOutput> {
        if input.amount <= Decimal::ZERO {
            return Err(TxnError::Validation(format!(
                "payment amount must be positive, got {}",
                input.amount
            )));
        }

        let warehouse_key = keys::warehouse(input.warehouse_id);
        let mut warehouse: Warehouse = self
            .session
            .load(Table::Warehouse, &warehouse_key)
            .await?
            .ok_or_else(|| TxnError::not_found("warehouse", input.warehouse_id.to_string()))?;
        warehouse.ytd += input.amount;
        self.session
            .put(Table::Warehouse, warehouse_key, &warehouse)
            .await
            .map_err(|source| step_failed("warehouse", source))?;

        let district_key = keys::district(input.warehouse_id, input.district_id);
        let mut district: District = self
            .session
            .load(Table::District, &district_key)
            .await?
            .ok_or_else(|| TxnError::not_found("district", keys::display(&district_key)))?;
        district.ytd += input.amount;
        self.session
            .put(Table::District, district_key, &district)
            .await
            .map_err(|source| step_failed("district", source))?;

        let customer_key = keys::customer(input.warehouse_id, input.district_id, input.customer_id);
        let mut customer: Customer = self
            .session
            .load(Table::Customer, &customer_key)
            .await?
            .ok_or_else(|| TxnError::not_found("customer", keys::display(&customer_key)))?;
        customer.balance -= input.amount;
        customer.ytd_payment += input.amount;
        customer.payment_count += 1;
        self.session
            .put(Table::Customer, customer_key, &customer)
            .await
            .map_err(|source| step_failed("customer", source))?;

        let paid_ts = model::now_micros();
        self.session
            .put(
                Table::PaymentHistory,
                keys::payment_history(
                    input.warehouse_id,
                    input.district_id,
                    input.customer_id,
                    paid_ts,
                ),
                &PaymentRecord {
                    amount: input.amount,
                    paid_ts,
                },
            )
            .await
            .map_err(|source| step_failed("history", source))?;

        Ok(PaymentOutput {
            warehouse_name: warehouse.name,
            district_name: district.name,
            customer_first: customer.first,
            customer_middle: customer.middle,
            customer_last: customer.last,
            customer_credit: customer.credit,
            credit_limit: customer.credit_limit,
            discount: customer.discount,
            balance: customer.balance,
            amount: input.amount,
        })
    }
}

fn step_failed(step: &'static str, source: StoreError) -> TxnError {
    tracing::warn!(step, error = %source, "payment step failed; earlier updates stand");
    TxnError::PaymentStep { step, source }
}
