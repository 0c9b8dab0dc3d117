//! Storage layer for bigcorp.
//!
//! The traits define the transactional contract the hierarchy manager relies
//! on; `memory` provides the reference in-memory backend.

mod memory;
mod traits;

pub use memory::{
    FaultPoint, InMemoryCaptorStore, InMemoryDatabase, InMemoryMeasureStore, InMemorySiteStore,
    InMemoryTransaction, RowCounts,
};
pub use traits::{
    CaptorStore, MeasureStore, SiteStore, StorageError, Transaction, TransactionManager,
};
