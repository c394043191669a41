//! In-memory emulation of the column-store contract.
//!
//! Used by the test suite and by the workload driver's local mode. The
//! consistency level is accepted and ignored; the conditional write is
//! genuinely atomic under the table lock, which is the property the
//! handlers rely on.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::consistency::Consistency;
use crate::error::StoreError;
use crate::store::{Connector, ScanOrder, ScanPage, StoreSession, Table};

type TableMap = BTreeMap<Vec<u8>, Vec<u8>>;

#[derive(Default)]
pub struct MemStore {
    tables: RwLock<HashMap<Table, TableMap>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row count of one table; test and seeding helper.
    pub fn len(&self, table: Table) -> usize {
        self.tables
            .read()
            .expect("memstore lock poisoned")
            .get(&table)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self, table: Table) -> bool {
        self.len(table) == 0
    }
}

/// End of the key range sharing `prefix`: the prefix with its last
/// non-0xff byte incremented, or unbounded when no such byte exists.
fn prefix_end(prefix: &[u8]) -> Bound<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.last() {
        if *last == 0xff {
            end.pop();
        } else {
            *end.last_mut().unwrap() += 1;
            return Bound::Excluded(end);
        }
    }
    Bound::Unbounded
}

#[async_trait]
impl StoreSession for MemStore {
    async fn get(
        &self,
        _cl: Consistency,
        table: Table,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let tables = self.tables.read().expect("memstore lock poisoned");
        Ok(tables.get(&table).and_then(|t| t.get(key).cloned()))
    }

    async fn put(
        &self,
        _cl: Consistency,
        table: Table,
        key: Vec<u8>,
        value: Vec<u8>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().expect("memstore lock poisoned");
        tables.entry(table).or_default().insert(key, value);
        Ok(())
    }

    async fn delete(&self, _cl: Consistency, table: Table, key: &[u8]) -> Result<(), StoreError> {
        let mut tables = self.tables.write().expect("memstore lock poisoned");
        if let Some(t) = tables.get_mut(&table) {
            t.remove(key);
        }
        Ok(())
    }

    async fn compare_and_put(
        &self,
        _cl: Consistency,
        table: Table,
        key: &[u8],
        expected: Option<&[u8]>,
        value: Vec<u8>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().expect("memstore lock poisoned");
        let t = tables.entry(table).or_default();
        let current = t.get(key).map(Vec::as_slice);
        if current == expected {
            t.insert(key.to_vec(), value);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn scan(
        &self,
        _cl: Consistency,
        table: Table,
        prefix: &[u8],
        start_after: Option<&[u8]>,
        order: ScanOrder,
        limit: usize,
    ) -> Result<ScanPage, StoreError> {
        if limit == 0 {
            return Ok(ScanPage::default());
        }
        let tables = self.tables.read().expect("memstore lock poisoned");
        let Some(t) = tables.get(&table) else {
            return Ok(ScanPage::default());
        };

        let mut lower = Bound::Included(prefix.to_vec());
        let mut upper = prefix_end(prefix);
        if let Some(cursor) = start_after {
            match order {
                ScanOrder::Asc => lower = Bound::Excluded(cursor.to_vec()),
                ScanOrder::Desc => upper = Bound::Excluded(cursor.to_vec()),
            }
        }

        let range = t.range::<Vec<u8>, _>((lower, upper));
        let rows: Vec<(Vec<u8>, Vec<u8>)> = match order {
            ScanOrder::Asc => range
                .map(|(k, v)| (k.clone(), v.clone()))
                .take(limit)
                .collect(),
            ScanOrder::Desc => range
                .rev()
                .map(|(k, v)| (k.clone(), v.clone()))
                .take(limit)
                .collect(),
        };

        let next = if rows.len() == limit {
            rows.last().map(|(k, _)| k.clone())
        } else {
            None
        };
        Ok(ScanPage { rows, next })
    }
}

/// Connector handing every contact point the same shared in-memory store,
/// so a multi-worker run emulates one cluster.
#[derive(Clone)]
pub struct MemConnector {
    store: Arc<MemStore>,
}

impl MemConnector {
    pub fn new(store: Arc<MemStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<MemStore> {
        self.store.clone()
    }
}

#[async_trait]
impl Connector for MemConnector {
    async fn connect(
        &self,
        contact_point: &str,
        _keyspace: &str,
        _consistency: Consistency,
    ) -> Result<Arc<dyn StoreSession>, StoreError> {
        if contact_point.is_empty() {
            return Err(StoreError::Connection {
                contact: contact_point.to_string(),
                reason: "empty contact point".to_string(),
            });
        }
        Ok(self.store.clone())
    }
}
