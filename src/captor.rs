//! Captors: the sensors attached to a site.
//!
//! Captors form a closed set of variants tagged by their [`PowerSource`].
//! The owning site is bound at construction and cannot be reassigned.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::opaque_id;
use crate::site::SiteId;
use crate::validate::Validate;

/// Reason reported when a simulated captor has inverted bounds.
pub const INVALID_POWER_RANGE: &str = "minPowerInWatt should be less than maxPowerInWatt";

opaque_id!(
    /// Stable captor identifier.
    CaptorId
);

/// Discriminant of the captor variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerSource {
    /// A physical device reporting externally supplied readings.
    Real,
    /// A captor synthesizing readings within a power range.
    Simulated,
}

impl fmt::Display for PowerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real => write!(f, "REAL"),
            Self::Simulated => write!(f, "SIMULATED"),
        }
    }
}

/// Power bounds of a simulated captor, in Watt.
///
/// The bounds are private so that `min_power_in_watt <= max_power_in_watt`
/// holds for every value, including deserialized ones.
///
/// # Examples
///
/// ```
/// use bigcorp::SimulatedCaptor;
///
/// let range = SimulatedCaptor::new(10, 50).unwrap();
/// assert_eq!(range.min_power_in_watt(), 10);
/// assert!(SimulatedCaptor::new(500, 100).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PowerRange")]
pub struct SimulatedCaptor {
    min_power_in_watt: i32,
    max_power_in_watt: i32,
}

#[derive(Deserialize)]
struct PowerRange {
    min_power_in_watt: i32,
    max_power_in_watt: i32,
}

impl TryFrom<PowerRange> for SimulatedCaptor {
    type Error = ValidationError;

    fn try_from(range: PowerRange) -> Result<Self, Self::Error> {
        Self::new(range.min_power_in_watt, range.max_power_in_watt)
    }
}

impl SimulatedCaptor {
    /// Creates validated simulation bounds.
    ///
    /// # Errors
    /// `InvalidCaptor` if `min_power_in_watt > max_power_in_watt`.
    pub fn new(min_power_in_watt: i32, max_power_in_watt: i32) -> Result<Self, ValidationError> {
        let range = Self {
            min_power_in_watt,
            max_power_in_watt,
        };
        range.validate()?;
        Ok(range)
    }

    #[must_use]
    pub const fn min_power_in_watt(&self) -> i32 {
        self.min_power_in_watt
    }

    #[must_use]
    pub const fn max_power_in_watt(&self) -> i32 {
        self.max_power_in_watt
    }

    /// Replaces both bounds at once, leaving them untouched on failure.
    ///
    /// # Errors
    /// `InvalidCaptor` if the new bounds are inverted.
    pub fn set_power_range(
        &mut self,
        min_power_in_watt: i32,
        max_power_in_watt: i32,
    ) -> Result<(), ValidationError> {
        *self = Self::new(min_power_in_watt, max_power_in_watt)?;
        Ok(())
    }
}

impl Validate for SimulatedCaptor {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.min_power_in_watt > self.max_power_in_watt {
            return Err(ValidationError::InvalidCaptor {
                reason: INVALID_POWER_RANGE.to_string(),
            });
        }
        Ok(())
    }
}

/// Variant-specific part of a captor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "power_source", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptorKind {
    /// Physical device; readings come from outside.
    Real,
    /// Readings are synthesized within the given bounds.
    Simulated(SimulatedCaptor),
}

impl CaptorKind {
    /// Returns the discriminant of this variant.
    #[must_use]
    pub const fn power_source(&self) -> PowerSource {
        match self {
            Self::Real => PowerSource::Real,
            Self::Simulated(_) => PowerSource::Simulated,
        }
    }
}

impl Validate for CaptorKind {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Real => Ok(()),
            Self::Simulated(range) => range.validate(),
        }
    }
}

/// A sensor attached to exactly one site.
///
/// # Examples
///
/// ```
/// use bigcorp::{Captor, PowerSource, SiteId};
///
/// let captor = Captor::simulated("C1", SiteId::new("S1"), 10, 50).unwrap();
/// assert_eq!(captor.power_source(), PowerSource::Simulated);
/// assert_eq!(captor.site_id().as_str(), "S1");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Captor {
    pub id: CaptorId,

    pub name: String,

    site_id: SiteId,

    #[serde(flatten)]
    pub kind: CaptorKind,
}

impl Captor {
    /// Creates an unsaved captor of the given variant.
    #[must_use]
    pub fn new(name: impl Into<String>, site_id: SiteId, kind: CaptorKind) -> Self {
        Self {
            id: CaptorId::unassigned(),
            name: name.into(),
            site_id,
            kind,
        }
    }

    /// Creates an unsaved physical captor.
    #[must_use]
    pub fn real(name: impl Into<String>, site_id: SiteId) -> Self {
        Self::new(name, site_id, CaptorKind::Real)
    }

    /// Creates an unsaved simulated captor, validating its bounds.
    ///
    /// # Errors
    /// `InvalidCaptor` if `min_power_in_watt > max_power_in_watt`.
    pub fn simulated(
        name: impl Into<String>,
        site_id: SiteId,
        min_power_in_watt: i32,
        max_power_in_watt: i32,
    ) -> Result<Self, ValidationError> {
        let range = SimulatedCaptor::new(min_power_in_watt, max_power_in_watt)?;
        Ok(Self::new(name, site_id, CaptorKind::Simulated(range)))
    }

    /// Sets a caller-chosen identifier.
    #[must_use]
    pub fn with_id(mut self, id: CaptorId) -> Self {
        self.id = id;
        self
    }

    /// The site this captor belongs to.
    #[must_use]
    pub const fn site_id(&self) -> &SiteId {
        &self.site_id
    }

    #[must_use]
    pub const fn power_source(&self) -> PowerSource {
        self.kind.power_source()
    }

    /// Returns the simulation bounds if this is a simulated captor.
    #[must_use]
    pub const fn as_simulated(&self) -> Option<&SimulatedCaptor> {
        match &self.kind {
            CaptorKind::Simulated(range) => Some(range),
            CaptorKind::Real => None,
        }
    }
}

impl Validate for Captor {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyCaptorName);
        }
        if self.site_id.is_unassigned() {
            return Err(ValidationError::UnboundSite);
        }
        self.kind.validate()
    }
}

impl PartialEq for Captor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Captor {}
