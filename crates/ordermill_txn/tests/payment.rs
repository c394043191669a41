mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use ordermill_txn::keys;
use ordermill_txn::store::{ScanPage, Session};
use ordermill_txn::txn::PaymentInput;
use ordermill_txn::{
    Consistency, Dispatcher, MemStore, ScanOrder, StoreError, StoreSession, Table, TxnError,
};

fn payment(amount: Decimal) -> PaymentInput {
    PaymentInput {
        warehouse_id: 1,
        district_id: 1,
        customer_id: 1,
        amount,
    }
}

#[tokio::test]
async fn payment_moves_balance_and_ytd() {
    let fx = common::fixture().await;
    common::set_customer_balance(&fx.session, 1, 1, 1, Decimal::new(-12_000, 2)).await;
    let before_customer = common::load_customer(&fx.session, 1, 1, 1).await;
    let before_district = common::load_district(&fx.session, 1, 1).await;

    let amount = Decimal::new(5_000, 2); // 50.00
    let out = fx.dispatcher.process_payment(payment(amount)).await.unwrap();

    // -120.00 - 50.00 = -170.00
    assert_eq!(out.balance, Decimal::new(-17_000, 2));
    assert_eq!(out.amount, amount);
    assert_eq!(out.warehouse_name, "warehouse-1");
    assert_eq!(out.district_name, "district-1-1");

    let customer = common::load_customer(&fx.session, 1, 1, 1).await;
    assert_eq!(customer.balance, before_customer.balance - amount);
    assert_eq!(customer.ytd_payment, before_customer.ytd_payment + amount);
    assert_eq!(customer.payment_count, before_customer.payment_count + 1);

    let district = common::load_district(&fx.session, 1, 1).await;
    assert_eq!(district.ytd, before_district.ytd + amount);
    let warehouse: ordermill_txn::model::Warehouse = fx
        .session
        .load(Table::Warehouse, &keys::warehouse(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(warehouse.ytd, amount);

    // A history record was appended.
    assert_eq!(fx.store.len(Table::PaymentHistory), 1);
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let fx = common::fixture().await;
    for amount in [Decimal::ZERO, Decimal::from(-5)] {
        let err = fx.dispatcher.process_payment(payment(amount)).await.unwrap_err();
        assert!(matches!(err, TxnError::Validation(_)));
    }
    // No YTD moved.
    assert_eq!(common::load_district(&fx.session, 1, 1).await.ytd, Decimal::ZERO);
}

/// Delegates to the real store but refuses district writes, failing the
/// second of Payment's four update steps.
struct DistrictWritesRefused {
    inner: Arc<MemStore>,
}

#[async_trait]
impl StoreSession for DistrictWritesRefused {
    async fn get(
        &self,
        cl: Consistency,
        table: Table,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(cl, table, key).await
    }

    async fn put(
        &self,
        cl: Consistency,
        table: Table,
        key: Vec<u8>,
        value: Vec<u8>,
    ) -> Result<(), StoreError> {
        if table == Table::District {
            return Err(StoreError::Backend("district write refused".to_string()));
        }
        self.inner.put(cl, table, key, value).await
    }

    async fn delete(&self, cl: Consistency, table: Table, key: &[u8]) -> Result<(), StoreError> {
        self.inner.delete(cl, table, key).await
    }

    async fn compare_and_put(
        &self,
        cl: Consistency,
        table: Table,
        key: &[u8],
        expected: Option<&[u8]>,
        value: Vec<u8>,
    ) -> Result<bool, StoreError> {
        self.inner.compare_and_put(cl, table, key, expected, value).await
    }

    async fn scan(
        &self,
        cl: Consistency,
        table: Table,
        prefix: &[u8],
        start_after: Option<&[u8]>,
        order: ScanOrder,
        limit: usize,
    ) -> Result<ScanPage, StoreError> {
        self.inner
            .scan(cl, table, prefix, start_after, order, limit)
            .await
    }
}

#[tokio::test]
async fn partial_failure_names_the_step_and_keeps_earlier_updates() {
    let fx = common::fixture().await;
    let refusing = Arc::new(DistrictWritesRefused {
        inner: fx.store.clone(),
    });
    let session = Arc::new(Session::new(
        refusing,
        Consistency::Quorum,
        Duration::from_secs(2),
        "node-a",
        common::KEYSPACE,
    ));
    let dispatcher = Dispatcher::with_session(session);

    let amount = Decimal::new(2_500, 2); // 25.00
    let err = dispatcher.process_payment(payment(amount)).await.unwrap_err();
    assert!(matches!(
        err,
        TxnError::PaymentStep {
            step: "district",
            ..
        }
    ));

    // The warehouse YTD update applied before the failure and stands.
    let warehouse: ordermill_txn::model::Warehouse = fx
        .session
        .load(Table::Warehouse, &keys::warehouse(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(warehouse.ytd, amount);

    // Steps after the failing one never ran.
    assert_eq!(common::load_district(&fx.session, 1, 1).await.ytd, Decimal::ZERO);
    let customer = common::load_customer(&fx.session, 1, 1, 1).await;
    assert_eq!(customer.payment_count, 0);
    assert_eq!(customer.balance, Decimal::new(-1_000, 2));
    assert_eq!(fx.store.len(Table::PaymentHistory), 0);
}

#[tokio::test]
async fn missing_customer_is_not_found() {
    let fx = common::fixture().await;
    let err = fx
        .dispatcher
        .process_payment(PaymentInput {
            warehouse_id: 1,
            district_id: 1,
            customer_id: 999,
            amount: Decimal::from(10),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TxnError::NotFound { entity: "customer", .. }));
}
