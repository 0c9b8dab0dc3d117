//! Sites: the top level of the monitoring hierarchy.
//!
//! A site enumerates its captors but does not own their storage. The
//! `captors` field is a read-path projection filled by the hierarchy manager;
//! site stores never persist it.

use serde::{Deserialize, Serialize};

use crate::captor::Captor;
use crate::error::ValidationError;
use crate::id::opaque_id;
use crate::validate::Validate;

opaque_id!(
    /// Stable site identifier. Immutable once assigned.
    ///
    /// # Examples
    ///
    /// ```
    /// use bigcorp::SiteId;
    ///
    /// let id = SiteId::generate();
    /// assert!(!id.is_unassigned());
    /// ```
    SiteId
);

/// A physical location owning zero or more captors.
///
/// # Examples
///
/// ```
/// use bigcorp::Site;
///
/// let site = Site::new("Florange");
/// assert!(site.id.is_unassigned());
/// assert!(site.captors.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,

    pub name: String,

    /// Captors attached to this site, populated on read paths only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub captors: Vec<Captor>,
}

impl Site {
    /// Creates a site that has not been saved yet.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(SiteId::unassigned(), name)
    }

    /// Creates a site with a caller-chosen identifier.
    #[must_use]
    pub fn with_id(id: SiteId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            captors: Vec::new(),
        }
    }

    /// Returns a copy without the captor projection, as stores keep it.
    #[must_use]
    pub fn detached(&self) -> Self {
        Self::with_id(self.id.clone(), self.name.clone())
    }
}

impl Validate for Site {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptySiteName);
        }
        Ok(())
    }
}

impl PartialEq for Site {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Site {}
