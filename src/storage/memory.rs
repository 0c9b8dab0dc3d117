//! In-memory storage backend.
//!
//! This module provides a transactional in-memory implementation of the
//! storage traits. It is intended for embedded usage, tests, and as a
//! reference implementation.
//!
//! A transaction holds the database lock for its whole lifetime and works on
//! a private copy of the tables, so transactions are serializable. The copy
//! replaces the committed tables only after the foreign key check passes.
//! Like a relational store with constraints but no `ON DELETE CASCADE`,
//! the backend refuses dangling rows instead of removing them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use crate::captor::{Captor, CaptorId};
use crate::measure::{Measure, MeasureId};
use crate::site::{Site, SiteId};
use crate::storage::traits::{
    CaptorStore, MeasureStore, SiteStore, StorageError, Transaction, TransactionManager,
};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

/// A store operation that can be made to fail once, for exercising rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// `SiteStore::save`
    SiteSave,
    /// `SiteStore::delete`
    SiteDelete,
    /// `CaptorStore::save`
    CaptorSave,
    /// `CaptorStore::delete`
    CaptorDelete,
    /// `CaptorStore::delete_by_site`
    CaptorDeleteBySite,
    /// `MeasureStore::save`
    MeasureSave,
    /// `MeasureStore::delete`
    MeasureDelete,
    /// `MeasureStore::delete_by_captor`
    MeasureDeleteByCaptor,
    /// `Transaction::commit`
    Commit,
}

impl fmt::Display for FaultPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SiteSave => "site.save",
            Self::SiteDelete => "site.delete",
            Self::CaptorSave => "captor.save",
            Self::CaptorDelete => "captor.delete",
            Self::CaptorDeleteBySite => "captor.delete_by_site",
            Self::MeasureSave => "measure.save",
            Self::MeasureDelete => "measure.delete",
            Self::MeasureDeleteByCaptor => "measure.delete_by_captor",
            Self::Commit => "commit",
        };
        f.write_str(name)
    }
}

fn trip(armed: &mut Option<FaultPoint>, point: FaultPoint) -> Result<(), StorageError> {
    if *armed == Some(point) {
        *armed = None;
        return Err(StorageError::Conflict(format!("injected fault at {point}")));
    }
    Ok(())
}

/// In-memory site table.
#[derive(Debug, Clone, Default)]
pub struct InMemorySiteStore {
    rows: BTreeMap<SiteId, Site>,
    fault: Option<FaultPoint>,
}

impl SiteStore for InMemorySiteStore {
    fn find_by_id(&self, id: &SiteId) -> Result<Option<Site>, StorageError> {
        Ok(self.rows.get(id).cloned())
    }

    fn find_all(&self) -> Result<Vec<Site>, StorageError> {
        Ok(self.rows.values().cloned().collect())
    }

    fn save(&mut self, site: Site) -> Result<Site, StorageError> {
        trip(&mut self.fault, FaultPoint::SiteSave)?;
        let mut site = site.detached();
        if site.id.is_unassigned() {
            site.id = SiteId::generate();
        }
        self.rows.insert(site.id.clone(), site.clone());
        Ok(site)
    }

    fn delete(&mut self, site: &Site) -> Result<(), StorageError> {
        trip(&mut self.fault, FaultPoint::SiteDelete)?;
        self.rows
            .remove(&site.id)
            .map(|_| ())
            .ok_or_else(|| StorageError::SiteNotFound(site.id.clone()))
    }

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.rows.len())
    }
}

/// In-memory captor table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCaptorStore {
    rows: BTreeMap<CaptorId, Captor>,
    fault: Option<FaultPoint>,
}

impl CaptorStore for InMemoryCaptorStore {
    fn find_by_id(&self, id: &CaptorId) -> Result<Option<Captor>, StorageError> {
        Ok(self.rows.get(id).cloned())
    }

    fn find_all(&self) -> Result<Vec<Captor>, StorageError> {
        Ok(self.rows.values().cloned().collect())
    }

    fn find_by_site(&self, site_id: &SiteId) -> Result<Vec<Captor>, StorageError> {
        Ok(self
            .rows
            .values()
            .filter(|c| c.site_id() == site_id)
            .cloned()
            .collect())
    }

    fn save(&mut self, mut captor: Captor) -> Result<Captor, StorageError> {
        trip(&mut self.fault, FaultPoint::CaptorSave)?;
        if captor.id.is_unassigned() {
            captor.id = CaptorId::generate();
        } else if let Some(existing) = self.rows.get(&captor.id) {
            if existing.site_id() != captor.site_id() {
                return Err(StorageError::Conflict(format!(
                    "captor {} belongs to site {} and cannot move to {}",
                    captor.id,
                    existing.site_id(),
                    captor.site_id()
                )));
            }
        }
        self.rows.insert(captor.id.clone(), captor.clone());
        Ok(captor)
    }

    fn delete(&mut self, captor: &Captor) -> Result<(), StorageError> {
        trip(&mut self.fault, FaultPoint::CaptorDelete)?;
        self.rows
            .remove(&captor.id)
            .map(|_| ())
            .ok_or_else(|| StorageError::CaptorNotFound(captor.id.clone()))
    }

    fn delete_by_site(&mut self, site_id: &SiteId) -> Result<usize, StorageError> {
        trip(&mut self.fault, FaultPoint::CaptorDeleteBySite)?;
        let before = self.rows.len();
        self.rows.retain(|_, c| c.site_id() != site_id);
        Ok(before - self.rows.len())
    }

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.rows.len())
    }
}

/// In-memory measure table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMeasureStore {
    rows: BTreeMap<MeasureId, Measure>,
    fault: Option<FaultPoint>,
}

impl MeasureStore for InMemoryMeasureStore {
    fn find_by_id(&self, id: &MeasureId) -> Result<Option<Measure>, StorageError> {
        Ok(self.rows.get(id).cloned())
    }

    fn find_all(&self) -> Result<Vec<Measure>, StorageError> {
        Ok(self.rows.values().cloned().collect())
    }

    fn find_by_captor(&self, captor_id: &CaptorId) -> Result<Vec<Measure>, StorageError> {
        let mut out: Vec<Measure> = self
            .rows
            .values()
            .filter(|m| m.captor_id() == captor_id)
            .cloned()
            .collect();
        out.sort_by_key(|m| m.instant);
        Ok(out)
    }

    fn save(&mut self, mut measure: Measure) -> Result<Measure, StorageError> {
        trip(&mut self.fault, FaultPoint::MeasureSave)?;
        if measure.id.is_unassigned() {
            measure.id = MeasureId::generate();
        } else if let Some(existing) = self.rows.get(&measure.id) {
            if existing.captor_id() != measure.captor_id() {
                return Err(StorageError::Conflict(format!(
                    "measure {} belongs to captor {} and cannot move to {}",
                    measure.id,
                    existing.captor_id(),
                    measure.captor_id()
                )));
            }
        }
        self.rows.insert(measure.id.clone(), measure.clone());
        Ok(measure)
    }

    fn delete(&mut self, measure: &Measure) -> Result<(), StorageError> {
        trip(&mut self.fault, FaultPoint::MeasureDelete)?;
        self.rows
            .remove(&measure.id)
            .map(|_| ())
            .ok_or_else(|| StorageError::MeasureNotFound(measure.id.clone()))
    }

    fn delete_by_captor(&mut self, captor_id: &CaptorId) -> Result<usize, StorageError> {
        trip(&mut self.fault, FaultPoint::MeasureDeleteByCaptor)?;
        let before = self.rows.len();
        self.rows.retain(|_, m| m.captor_id() != captor_id);
        Ok(before - self.rows.len())
    }

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.rows.len())
    }
}

/// Row counts of the committed tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowCounts {
    pub sites: usize,
    pub captors: usize,
    pub measures: usize,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    sites: InMemorySiteStore,
    captors: InMemoryCaptorStore,
    measures: InMemoryMeasureStore,
}

impl Tables {
    fn arm(&mut self, point: FaultPoint) {
        match point {
            FaultPoint::SiteSave | FaultPoint::SiteDelete => self.sites.fault = Some(point),
            FaultPoint::CaptorSave | FaultPoint::CaptorDelete | FaultPoint::CaptorDeleteBySite => {
                self.captors.fault = Some(point);
            }
            FaultPoint::MeasureSave
            | FaultPoint::MeasureDelete
            | FaultPoint::MeasureDeleteByCaptor => self.measures.fault = Some(point),
            FaultPoint::Commit => {}
        }
    }

    fn disarm(&mut self) {
        self.sites.fault = None;
        self.captors.fault = None;
        self.measures.fault = None;
    }

    /// Every captor must reference an existing site and every measure an
    /// existing captor.
    fn check_integrity(&self) -> Result<(), StorageError> {
        if let Some(orphan) = self
            .captors
            .rows
            .values()
            .find(|c| !self.sites.rows.contains_key(c.site_id()))
        {
            return Err(StorageError::IntegrityViolation(format!(
                "captor {} references missing site {}",
                orphan.id,
                orphan.site_id()
            )));
        }

        if let Some(orphan) = self
            .measures
            .rows
            .values()
            .find(|m| !self.captors.rows.contains_key(m.captor_id()))
        {
            return Err(StorageError::IntegrityViolation(format!(
                "measure {} references missing captor {}",
                orphan.id,
                orphan.captor_id()
            )));
        }

        Ok(())
    }

    fn counts(&self) -> RowCounts {
        RowCounts {
            sites: self.sites.rows.len(),
            captors: self.captors.rows.len(),
            measures: self.measures.rows.len(),
        }
    }
}

/// Thread-safe, transactional in-memory database.
#[derive(Debug, Default)]
pub struct InMemoryDatabase {
    tables: Mutex<Tables>,
    fault: Mutex<Option<FaultPoint>>,
}

impl InMemoryDatabase {
    /// Create a new empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `point` fail once in the next transaction.
    ///
    /// # Errors
    /// `BackendError` if the fault lock is poisoned.
    pub fn inject_fault(&self, point: FaultPoint) -> Result<(), StorageError> {
        let mut fault = self.fault.lock().map_err(|_| lock_err("database.inject_fault"))?;
        *fault = Some(point);
        Ok(())
    }

    /// Row counts of the committed state.
    ///
    /// # Errors
    /// `BackendError` if the table lock is poisoned.
    pub fn counts(&self) -> Result<RowCounts, StorageError> {
        let tables = self.tables.lock().map_err(|_| lock_err("database.counts"))?;
        Ok(tables.counts())
    }
}

impl TransactionManager for InMemoryDatabase {
    fn begin(&self) -> Result<Box<dyn Transaction + '_>, StorageError> {
        let armed = self
            .fault
            .lock()
            .map_err(|_| lock_err("database.begin"))?
            .take();
        let guard = self.tables.lock().map_err(|_| lock_err("database.begin"))?;

        let mut working = guard.clone();
        let mut fail_commit = false;
        match armed {
            Some(FaultPoint::Commit) => fail_commit = true,
            Some(point) => working.arm(point),
            None => {}
        }

        Ok(Box::new(InMemoryTransaction {
            guard,
            working,
            fail_commit,
        }))
    }
}

/// A transaction over an [`InMemoryDatabase`].
pub struct InMemoryTransaction<'a> {
    guard: MutexGuard<'a, Tables>,
    working: Tables,
    fail_commit: bool,
}

impl Transaction for InMemoryTransaction<'_> {
    fn sites(&mut self) -> &mut dyn SiteStore {
        &mut self.working.sites
    }

    fn captors(&mut self) -> &mut dyn CaptorStore {
        &mut self.working.captors
    }

    fn measures(&mut self) -> &mut dyn MeasureStore {
        &mut self.working.measures
    }

    fn commit(self: Box<Self>) -> Result<(), StorageError> {
        let Self {
            mut guard,
            mut working,
            fail_commit,
        } = *self;

        if fail_commit {
            return Err(StorageError::Conflict(format!(
                "injected fault at {}",
                FaultPoint::Commit
            )));
        }

        working.check_integrity()?;
        working.disarm();
        *guard = working;
        Ok(())
    }

    fn rollback(self: Box<Self>) {}
}
