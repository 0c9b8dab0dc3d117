//! Abstract storage traits for bigcorp.
//!
//! These traits define the contract that storage backends must implement.
//! Stores are only ever reached through a [`Transaction`], so every read and
//! write of one operation shares a single unit of work.
//!
//! Backends are not expected to cascade deletes. Referential integrity is
//! kept by the hierarchy manager, which removes dependents first.

use thiserror::Error;

use crate::captor::{Captor, CaptorId};
use crate::measure::{Measure, MeasureId};
use crate::site::{Site, SiteId};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Site not found.
    #[error("Site not found: {0}")]
    SiteNotFound(SiteId),

    /// Captor not found.
    #[error("Captor not found: {0}")]
    CaptorNotFound(CaptorId),

    /// Measure not found.
    #[error("Measure not found: {0}")]
    MeasureNotFound(MeasureId),

    /// A row references a parent that does not exist.
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    /// The write conflicts with another one.
    #[error("Write conflict: {0}")]
    Conflict(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// Storage trait for Site rows.
pub trait SiteStore {
    /// Get a site by ID. The returned site has no captors attached.
    fn find_by_id(&self, id: &SiteId) -> Result<Option<Site>, StorageError>;

    /// List every site.
    fn find_all(&self) -> Result<Vec<Site>, StorageError>;

    /// Insert or replace a site, assigning an ID if it has none.
    ///
    /// The captor projection is never persisted.
    fn save(&mut self, site: Site) -> Result<Site, StorageError>;

    /// Delete a site. Returns `SiteNotFound` if it does not exist.
    fn delete(&mut self, site: &Site) -> Result<(), StorageError>;

    /// Number of stored sites.
    fn count(&self) -> Result<usize, StorageError>;
}

/// Storage trait for Captor rows, keyed by site.
pub trait CaptorStore {
    /// Get a captor by ID.
    fn find_by_id(&self, id: &CaptorId) -> Result<Option<Captor>, StorageError>;

    /// List every captor.
    fn find_all(&self) -> Result<Vec<Captor>, StorageError>;

    /// List the captors attached to a site.
    fn find_by_site(&self, site_id: &SiteId) -> Result<Vec<Captor>, StorageError>;

    /// Insert or replace a captor, assigning an ID if it has none.
    ///
    /// Replacing a captor with one bound to another site is a `Conflict`.
    fn save(&mut self, captor: Captor) -> Result<Captor, StorageError>;

    /// Delete a captor. Returns `CaptorNotFound` if it does not exist.
    fn delete(&mut self, captor: &Captor) -> Result<(), StorageError>;

    /// Delete every captor of a site, returning how many were removed.
    fn delete_by_site(&mut self, site_id: &SiteId) -> Result<usize, StorageError>;

    /// Number of stored captors.
    fn count(&self) -> Result<usize, StorageError>;
}

/// Storage trait for Measure rows, keyed by captor.
pub trait MeasureStore {
    /// Get a measure by ID.
    fn find_by_id(&self, id: &MeasureId) -> Result<Option<Measure>, StorageError>;

    /// List every measure.
    fn find_all(&self) -> Result<Vec<Measure>, StorageError>;

    /// List the measures of a captor, oldest first.
    fn find_by_captor(&self, captor_id: &CaptorId) -> Result<Vec<Measure>, StorageError>;

    /// Insert or replace a measure, assigning an ID if it has none.
    ///
    /// Replacing a measure with one bound to another captor is a `Conflict`.
    fn save(&mut self, measure: Measure) -> Result<Measure, StorageError>;

    /// Delete a measure. Returns `MeasureNotFound` if it does not exist.
    fn delete(&mut self, measure: &Measure) -> Result<(), StorageError>;

    /// Delete every measure of a captor, returning how many were removed.
    fn delete_by_captor(&mut self, captor_id: &CaptorId) -> Result<usize, StorageError>;

    /// Number of stored measures.
    fn count(&self) -> Result<usize, StorageError>;
}

/// One unit of work spanning the three stores.
///
/// Nothing done through the stores is visible outside the transaction until
/// [`Transaction::commit`] succeeds. Dropping a transaction without committing
/// it rolls it back.
pub trait Transaction {
    /// Site store view of this transaction.
    fn sites(&mut self) -> &mut dyn SiteStore;

    /// Captor store view of this transaction.
    fn captors(&mut self) -> &mut dyn CaptorStore;

    /// Measure store view of this transaction.
    fn measures(&mut self) -> &mut dyn MeasureStore;

    /// Publish every write atomically.
    ///
    /// # Errors
    /// The backend rejected the writes (for example a dangling foreign key).
    /// Nothing is published in that case.
    fn commit(self: Box<Self>) -> Result<(), StorageError>;

    /// Discard every write.
    fn rollback(self: Box<Self>);
}

/// Entry point of a transactional backend.
pub trait TransactionManager: Send + Sync {
    /// Begin a new transaction, blocking on the backend's own locking.
    fn begin(&self) -> Result<Box<dyn Transaction + '_>, StorageError>;
}
