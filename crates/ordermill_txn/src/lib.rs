//! Transaction execution layer for a TPC-C-style order-processing workload
//! running against a distributed, eventually-consistent column-family store.
//!
//! The store offers no multi-row transactions, so each business transaction
//! is mapped onto a sequence of single-row reads and writes at a tunable
//! consistency level. Multi-step writes are guarded by an explicit saga of
//! compensating actions; the district order-id counter uses a conditional
//! (compare-and-put) write so concurrent workers never allocate the same id.

pub mod consistency;
pub mod dispatcher;
pub mod error;
pub mod keys;
pub mod memstore;
pub mod model;
mod saga;
pub mod store;
pub mod txn;

pub use consistency::Consistency;
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::{StoreError, TxnError, TxnResult};
pub use memstore::{MemConnector, MemStore};
pub use store::{Connector, ScanOrder, Session, StoreSession, Table};
