//! The store-client boundary.
//!
//! The underlying distributed column store is an external collaborator; this
//! module only defines the contract the transaction handlers need: typed
//! single-row reads and writes, a linearizable conditional write, and
//! cursor-paged prefix scans, all at an explicit consistency level. A
//! `Session` wraps one connected [`StoreSession`] with the process-wide
//! consistency policy and a per-operation deadline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time;

use crate::consistency::Consistency;
use crate::error::StoreError;

/// The column-family tables the workload touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Table {
    Warehouse,
    District,
    Customer,
    Order,
    OrderLine,
    Stock,
    Item,
    NewOrderQueue,
    PaymentHistory,
}

impl Table {
    pub const ALL: [Table; 9] = [
        Table::Warehouse,
        Table::District,
        Table::Customer,
        Table::Order,
        Table::OrderLine,
        Table::Stock,
        Table::Item,
        Table::NewOrderQueue,
        Table::PaymentHistory,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::Warehouse => "warehouse",
            Table::District => "district",
            Table::Customer => "customer",
            Table::Order => "orders",
            Table::OrderLine => "order_line",
            Table::Stock => "stock",
            Table::Item => "item",
            Table::NewOrderQueue => "new_order",
            Table::PaymentHistory => "payment_history",
        }
    }
}

/// Direction of a prefix scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanOrder {
    Asc,
    Desc,
}

/// One page of scan results. `next` is the cursor to pass as
/// `start_after` for the following page; `None` means the scan is
/// exhausted.
#[derive(Clone, Debug, Default)]
pub struct ScanPage {
    pub rows: Vec<(Vec<u8>, Vec<u8>)>,
    pub next: Option<Vec<u8>>,
}

/// A pooled connection to the store, bound to one contact point.
///
/// `compare_and_put` is the one linearizable primitive: it applies the new
/// value only when the current value matches `expected` (`None` = row must
/// not exist) and reports whether it won, regardless of the configured
/// consistency level.
#[async_trait]
pub trait StoreSession: Send + Sync {
    async fn get(
        &self,
        cl: Consistency,
        table: Table,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>, StoreError>;

    async fn put(
        &self,
        cl: Consistency,
        table: Table,
        key: Vec<u8>,
        value: Vec<u8>,
    ) -> Result<(), StoreError>;

    async fn delete(&self, cl: Consistency, table: Table, key: &[u8]) -> Result<(), StoreError>;

    async fn compare_and_put(
        &self,
        cl: Consistency,
        table: Table,
        key: &[u8],
        expected: Option<&[u8]>,
        value: Vec<u8>,
    ) -> Result<bool, StoreError>;

    async fn scan(
        &self,
        cl: Consistency,
        table: Table,
        prefix: &[u8],
        start_after: Option<&[u8]>,
        order: ScanOrder,
        limit: usize,
    ) -> Result<ScanPage, StoreError>;
}

/// Establishes store sessions against a cluster contact point.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        contact_point: &str,
        keyspace: &str,
        consistency: Consistency,
    ) -> Result<Arc<dyn StoreSession>, StoreError>;
}

/// Extra attempts granted to idempotent reads that time out.
const READ_RETRIES: u32 = 2;

type BoxedOp<T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<T, StoreError>> + Send>>;

/// One worker's handle on the store: the connected session, the process
/// consistency level, and the per-round-trip deadline. Every call is
/// bounded by `tokio::time::timeout`; a missed deadline surfaces as
/// [`StoreError::Timeout`] so callers can tell it apart from a data error.
pub struct Session {
    store: Arc<dyn StoreSession>,
    consistency: Consistency,
    op_timeout: Duration,
    contact_point: String,
    keyspace: String,
}

impl Session {
    pub fn new(
        store: Arc<dyn StoreSession>,
        consistency: Consistency,
        op_timeout: Duration,
        contact_point: impl Into<String>,
        keyspace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            consistency,
            op_timeout,
            contact_point: contact_point.into(),
            keyspace: keyspace.into(),
        }
    }

    pub fn consistency(&self) -> Consistency {
        self.consistency
    }

    pub fn contact_point(&self) -> &str {
        &self.contact_point
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    async fn bounded<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match time::timeout(self.op_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(StoreError::Timeout(self.op_timeout)),
        }
    }

    /// Reads are idempotent, so a timed-out read gets a bounded number of
    /// local retries before the timeout propagates. Writes never do.
    async fn read_retrying<T>(
        &self,
        mut op: impl FnMut() -> BoxedOp<T>,
    ) -> Result<T, StoreError> {
        let mut last = None;
        for attempt in 0..=READ_RETRIES {
            match self.bounded(op()).await {
                Err(StoreError::Timeout(deadline)) => {
                    tracing::debug!(attempt, ?deadline, "read timed out, retrying");
                    last = Some(StoreError::Timeout(deadline));
                }
                other => return other,
            }
        }
        Err(last.expect("at least one attempt ran"))
    }

    /// Read and decode a row, returning the raw bytes alongside the value
    /// so the caller can use them as the `expected` side of a conditional
    /// write.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        table: Table,
        key: &[u8],
    ) -> Result<Option<(T, Vec<u8>)>, StoreError> {
        let store = self.store.clone();
        let cl = self.consistency;
        let key_owned = key.to_vec();
        let raw = self
            .read_retrying(move || {
                let store = store.clone();
                let key = key_owned.clone();
                Box::pin(async move { store.get(cl, table, &key).await })
            })
            .await?;
        match raw {
            None => Ok(None),
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(|err| {
                    StoreError::Backend(format!("undecodable {} row: {err}", table.name()))
                })?;
                Ok(Some((value, bytes)))
            }
        }
    }

    /// Read and decode a row, discarding the raw bytes.
    pub async fn load<T: DeserializeOwned>(
        &self,
        table: Table,
        key: &[u8],
    ) -> Result<Option<T>, StoreError> {
        Ok(self.fetch(table, key).await?.map(|(value, _)| value))
    }

    pub async fn put<T: Serialize>(
        &self,
        table: Table,
        key: Vec<u8>,
        value: &T,
    ) -> Result<(), StoreError> {
        let bytes = encode(table, value)?;
        self.bounded(self.store.put(self.consistency, table, key, bytes))
            .await
    }

    pub async fn delete(&self, table: Table, key: &[u8]) -> Result<(), StoreError> {
        self.bounded(self.store.delete(self.consistency, table, key))
            .await
    }

    /// Raw write used by saga unwinding to restore a prior row image.
    pub async fn put_raw(
        &self,
        table: Table,
        key: Vec<u8>,
        value: Vec<u8>,
    ) -> Result<(), StoreError> {
        self.bounded(self.store.put(self.consistency, table, key, value))
            .await
    }

    /// Conditional write; returns whether this writer won.
    pub async fn compare_and_put<T: Serialize>(
        &self,
        table: Table,
        key: &[u8],
        expected: Option<&[u8]>,
        value: &T,
    ) -> Result<bool, StoreError> {
        let bytes = encode(table, value)?;
        self.bounded(
            self.store
                .compare_and_put(self.consistency, table, key, expected, bytes),
        )
        .await
    }

    pub async fn scan(
        &self,
        table: Table,
        prefix: &[u8],
        start_after: Option<&[u8]>,
        order: ScanOrder,
        limit: usize,
    ) -> Result<ScanPage, StoreError> {
        let store = self.store.clone();
        let cl = self.consistency;
        let prefix = prefix.to_vec();
        let start_after = start_after.map(<[u8]>::to_vec);
        self.read_retrying(move || {
            let store = store.clone();
            let prefix = prefix.clone();
            let start_after = start_after.clone();
            Box::pin(async move {
                store
                    .scan(cl, table, &prefix, start_after.as_deref(), order, limit)
                    .await
            })
        })
        .await
    }
}

fn encode<T: Serialize>(table: Table, value: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value)
        .map_err(|err| StoreError::Backend(format!("unencodable {} row: {err}", table.name())))
}
