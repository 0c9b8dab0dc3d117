//! Hierarchy integrity manager.
//!
//! Every public operation runs as exactly one transaction: it begins on
//! entry, commits when the operation succeeds and rolls back on any error.
//! Deleting a site walks the hierarchy bottom-up (measures, then captors,
//! then the site) so it never relies on the backend cascading for it.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::captor::{Captor, CaptorId};
use crate::config::HierarchyConfig;
use crate::error::{BigCorpResult, ExecutionError};
use crate::generator::SimulatedValueGenerator;
use crate::measure::Measure;
use crate::site::{Site, SiteId};
use crate::storage::{Transaction, TransactionManager};
use crate::validate::{check_name_length, Validate};

/// A site together with the captors whose measures can be displayed.
#[derive(Debug, Clone, Serialize)]
pub struct MeasuresView {
    pub site: Site,
    pub captors: Vec<Captor>,
}

/// Rows removed by a cascading site deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub measures: usize,
    pub captors: usize,
}

/// Orchestrates operations spanning the site, captor and measure stores.
#[derive(Clone)]
pub struct HierarchyManager {
    db: Arc<dyn TransactionManager>,
    config: HierarchyConfig,
}

impl HierarchyManager {
    /// Create a manager with the default configuration.
    #[must_use]
    pub fn new(db: Arc<dyn TransactionManager>) -> Self {
        Self {
            db,
            config: HierarchyConfig::default(),
        }
    }

    /// Create a manager with a validated configuration.
    ///
    /// # Errors
    /// `InvalidConfig` if the configuration is rejected.
    pub fn with_config(db: Arc<dyn TransactionManager>, config: HierarchyConfig) -> BigCorpResult<Self> {
        Ok(Self {
            db,
            config: config.validate()?,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    /// Runs `op` in a transaction that is committed on success.
    fn write<T>(
        &self,
        name: &'static str,
        op: impl FnOnce(&mut dyn Transaction) -> BigCorpResult<T>,
    ) -> BigCorpResult<T> {
        let mut tx = self.db.begin()?;
        match op(&mut *tx) {
            Ok(value) => {
                if let Err(err) = tx.commit() {
                    warn!(operation = name, error = %err, "commit failed, transaction rolled back");
                    return Err(err.into());
                }
                Ok(value)
            }
            Err(err) => {
                warn!(operation = name, error = %err, "rolling back transaction");
                tx.rollback();
                Err(err)
            }
        }
    }

    /// Runs `op` in a transaction that is always rolled back.
    fn read<T>(&self, op: impl FnOnce(&mut dyn Transaction) -> BigCorpResult<T>) -> BigCorpResult<T> {
        let mut tx = self.db.begin()?;
        let result = op(&mut *tx);
        tx.rollback();
        result
    }

    fn check_site(&self, site: &Site) -> BigCorpResult<()> {
        if let Err(err) = site.validate() {
            warn!(site = %site.id, error = %err, "rejected site");
            return Err(err.into());
        }
        check_name_length("name", &site.name, self.config.max_name_length)?;
        Ok(())
    }

    /// Lists every site with its captors.
    pub fn list(&self) -> BigCorpResult<Vec<Site>> {
        self.read(list_sites)
    }

    /// Gets a site with its captors.
    ///
    /// # Errors
    /// `SiteNotFound` if `id` is unknown.
    pub fn get(&self, id: &SiteId) -> BigCorpResult<Site> {
        self.read(|tx| {
            let site = load_site(tx, id)?;
            attach_captors(tx, site)
        })
    }

    /// Creates and persists a new site without captors.
    ///
    /// # Errors
    /// `EmptySiteName` or `FieldTooLong` if the name is rejected.
    pub fn create(&self, name: &str) -> BigCorpResult<Site> {
        let site = Site::new(name.trim());
        self.check_site(&site)?;

        let site = self.write("create", |tx| Ok(tx.sites().save(site)?))?;
        info!(site = %site.id, name = %site.name, "created site");
        Ok(site)
    }

    /// Renames a site and returns every site.
    ///
    /// Only the name changes; captor associations are untouched.
    ///
    /// # Errors
    /// - `SiteNotFound` if `id` is unknown
    /// - `EmptySiteName` or `FieldTooLong` if the name is rejected
    pub fn rename(&self, id: &SiteId, new_name: &str) -> BigCorpResult<Vec<Site>> {
        let renamed = Site::with_id(id.clone(), new_name.trim());
        self.check_site(&renamed)?;

        self.write("rename", |tx| {
            rename_site(tx, renamed)?;
            list_sites(tx)
        })
    }

    /// Persists a site submitted by a client.
    ///
    /// A site without an id is created. For an existing site only the name is
    /// taken from `site`; every other field it carries, such as a captor list,
    /// is ignored.
    ///
    /// # Errors
    /// As [`HierarchyManager::create`] and [`HierarchyManager::rename`].
    pub fn save(&self, site: Site) -> BigCorpResult<Site> {
        if site.id.is_unassigned() {
            return self.create(&site.name);
        }
        let submitted = Site::with_id(site.id, site.name.trim());
        self.check_site(&submitted)?;

        self.write("save", |tx| {
            let site = rename_site(tx, submitted)?;
            attach_captors(tx, site)
        })
    }

    /// Deletes a site with all its captors and measures, returning the
    /// remaining sites.
    ///
    /// # Errors
    /// - `SiteNotFound` if `id` is unknown, including when it was already deleted
    /// - any storage failure, in which case nothing is deleted
    pub fn delete(&self, id: &SiteId) -> BigCorpResult<Vec<Site>> {
        self.write("delete", |tx| {
            let site = load_site(tx, id)?;
            let report = cascade_delete(tx, &site)?;
            info!(
                site = %id,
                captors = report.captors,
                measures = report.measures,
                "deleted site"
            );
            list_sites(tx)
        })
    }

    /// Returns a site with the captors whose measures can be displayed.
    ///
    /// # Errors
    /// `SiteNotFound` if `id` is unknown.
    pub fn measures_view(&self, id: &SiteId) -> BigCorpResult<MeasuresView> {
        self.read(|tx| {
            let site = load_site(tx, id)?;
            let captors = tx.captors().find_by_site(id)?;
            Ok(MeasuresView { site, captors })
        })
    }

    /// Validates and persists a captor on an existing site.
    ///
    /// # Errors
    /// - `InvalidCaptor`, `EmptyCaptorName`, `UnboundSite` or `FieldTooLong`
    ///   before anything is written
    /// - `SiteNotFound` if the captor's site does not exist
    /// - `IntegrityViolation` if an existing captor would move to another site
    pub fn add_captor(&self, captor: Captor) -> BigCorpResult<Captor> {
        if let Err(err) = captor.validate() {
            warn!(captor = %captor.name, error = %err, "rejected captor");
            return Err(err.into());
        }
        check_name_length("name", &captor.name, self.config.max_name_length)?;

        self.write("add_captor", |tx| {
            load_site(tx, captor.site_id())?;
            if let Some(existing) = tx.captors().find_by_id(&captor.id)? {
                if existing.site_id() != captor.site_id() {
                    return Err(ExecutionError::IntegrityViolation {
                        message: format!(
                            "captor {} belongs to site {}",
                            existing.id,
                            existing.site_id()
                        ),
                    }
                    .into());
                }
            }
            let saved = tx.captors().save(captor)?;
            info!(captor = %saved.id, site = %saved.site_id(), power_source = %saved.power_source(), "saved captor");
            Ok(saved)
        })
    }

    /// Gets a captor.
    ///
    /// # Errors
    /// `CaptorNotFound` if `id` is unknown.
    pub fn captor(&self, id: &CaptorId) -> BigCorpResult<Captor> {
        self.read(|tx| load_captor(tx, id))
    }

    /// Deletes a captor and its measures.
    ///
    /// # Errors
    /// `CaptorNotFound` if `id` is unknown.
    pub fn remove_captor(&self, id: &CaptorId) -> BigCorpResult<usize> {
        self.write("remove_captor", |tx| {
            let captor = load_captor(tx, id)?;
            let measures = tx.measures().delete_by_captor(id)?;
            tx.captors().delete(&captor)?;
            info!(captor = %id, measures, "deleted captor");
            Ok(measures)
        })
    }

    /// Persists an externally captured reading.
    ///
    /// # Errors
    /// - `UnboundCaptor` if the measure has no captor
    /// - `CaptorNotFound` if its captor does not exist
    /// - `IntegrityViolation` if an existing measure would move to another captor
    pub fn record_measure(&self, measure: Measure) -> BigCorpResult<Measure> {
        measure.validate()?;
        self.write("record_measure", |tx| {
            load_captor(tx, measure.captor_id())?;
            if let Some(existing) = tx.measures().find_by_id(&measure.id)? {
                if existing.captor_id() != measure.captor_id() {
                    return Err(ExecutionError::IntegrityViolation {
                        message: format!(
                            "measure {} belongs to captor {}",
                            existing.id,
                            existing.captor_id()
                        ),
                    }
                    .into());
                }
            }
            Ok(tx.measures().save(measure)?)
        })
    }

    /// Lists the readings of a captor, oldest first.
    ///
    /// # Errors
    /// `CaptorNotFound` if `id` is unknown.
    pub fn measures(&self, id: &CaptorId) -> BigCorpResult<Vec<Measure>> {
        self.read(|tx| {
            load_captor(tx, id)?;
            Ok(tx.measures().find_by_captor(id)?)
        })
    }

    /// Generates a reading for a simulated captor and persists it.
    ///
    /// # Errors
    /// - `CaptorNotFound` if `id` is unknown
    /// - `NotSimulated` if the captor is not a simulated one
    pub fn simulate_measure(
        &self,
        id: &CaptorId,
        generator: &mut SimulatedValueGenerator,
    ) -> BigCorpResult<Measure> {
        self.write("simulate_measure", |tx| {
            let captor = load_captor(tx, id)?;
            let measure = generator.generate(&captor)?;
            Ok(tx.measures().save(measure)?)
        })
    }
}

fn load_site(tx: &mut dyn Transaction, id: &SiteId) -> BigCorpResult<Site> {
    tx.sites()
        .find_by_id(id)?
        .ok_or_else(|| ExecutionError::SiteNotFound { id: id.clone() }.into())
}

fn load_captor(tx: &mut dyn Transaction, id: &CaptorId) -> BigCorpResult<Captor> {
    tx.captors()
        .find_by_id(id)?
        .ok_or_else(|| ExecutionError::CaptorNotFound { id: id.clone() }.into())
}

/// Replaces the stored name of `renamed.id`, keeping every other field.
fn rename_site(tx: &mut dyn Transaction, renamed: Site) -> BigCorpResult<Site> {
    let mut site = load_site(tx, &renamed.id)?;
    site.name = renamed.name;
    let site = tx.sites().save(site)?;
    info!(site = %site.id, name = %site.name, "renamed site");
    Ok(site)
}

fn attach_captors(tx: &mut dyn Transaction, mut site: Site) -> BigCorpResult<Site> {
    site.captors = tx.captors().find_by_site(&site.id)?;
    Ok(site)
}

fn list_sites(tx: &mut dyn Transaction) -> BigCorpResult<Vec<Site>> {
    let sites = tx.sites().find_all()?;
    sites
        .into_iter()
        .map(|site| attach_captors(tx, site))
        .collect()
}

/// Removes measures, then captors, then the site. Order matters: a backend
/// enforcing foreign keys rejects any other order.
fn cascade_delete(tx: &mut dyn Transaction, site: &Site) -> BigCorpResult<CascadeReport> {
    let mut report = CascadeReport::default();

    for captor in tx.captors().find_by_site(&site.id)? {
        let removed = tx.measures().delete_by_captor(&captor.id)?;
        debug!(captor = %captor.id, measures = removed, "deleted captor measures");
        report.measures += removed;
    }

    report.captors = tx.captors().delete_by_site(&site.id)?;
    debug!(site = %site.id, captors = report.captors, "deleted site captors");

    tx.sites().delete(site)?;
    Ok(report)
}
