//! Read-side captor service.

use std::sync::Arc;

use crate::captor::Captor;
use crate::error::{BigCorpResult, ExecutionError};
use crate::site::{Site, SiteId};
use crate::storage::TransactionManager;

/// Looks up captors by site, for read paths that assemble a [`Site`].
#[derive(Clone)]
pub struct CaptorService {
    db: Arc<dyn TransactionManager>,
}

impl CaptorService {
    #[must_use]
    pub fn new(db: Arc<dyn TransactionManager>) -> Self {
        Self { db }
    }

    /// Lists the captors attached to a site. An unknown site has none.
    pub fn find_by_site(&self, site_id: &SiteId) -> BigCorpResult<Vec<Captor>> {
        let mut tx = self.db.begin()?;
        let captors = tx.captors().find_by_site(site_id);
        tx.rollback();
        Ok(captors?)
    }

    /// Loads a site and fills in its captors from the same snapshot.
    ///
    /// # Errors
    /// `SiteNotFound` if `site_id` is unknown.
    pub fn populate(&self, site_id: &SiteId) -> BigCorpResult<Site> {
        let mut tx = self.db.begin()?;
        let site = tx.sites().find_by_id(site_id);
        let captors = tx.captors().find_by_site(site_id);
        tx.rollback();

        let mut site = site?.ok_or_else(|| ExecutionError::SiteNotFound {
            id: site_id.clone(),
        })?;
        site.captors = captors?;
        Ok(site)
    }
}
