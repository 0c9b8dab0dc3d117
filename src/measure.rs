//! Measures: timestamped power readings of a captor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::captor::CaptorId;
use crate::error::ValidationError;
use crate::id::opaque_id;
use crate::validate::Validate;

opaque_id!(
    /// Stable measure identifier.
    MeasureId
);

/// A single power reading attached to exactly one captor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    pub id: MeasureId,

    captor_id: CaptorId,

    /// When the reading was taken.
    pub instant: DateTime<Utc>,

    pub value_in_watt: i32,
}

impl Measure {
    /// Creates an unsaved measure for `captor_id`.
    #[must_use]
    pub fn new(captor_id: CaptorId, instant: DateTime<Utc>, value_in_watt: i32) -> Self {
        Self {
            id: MeasureId::unassigned(),
            captor_id,
            instant,
            value_in_watt,
        }
    }

    /// Creates an unsaved measure timestamped now.
    #[must_use]
    pub fn now(captor_id: CaptorId, value_in_watt: i32) -> Self {
        Self::new(captor_id, Utc::now(), value_in_watt)
    }

    /// The captor that produced this reading.
    #[must_use]
    pub const fn captor_id(&self) -> &CaptorId {
        &self.captor_id
    }
}

impl Validate for Measure {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.captor_id.is_unassigned() {
            return Err(ValidationError::UnboundCaptor);
        }
        Ok(())
    }
}
