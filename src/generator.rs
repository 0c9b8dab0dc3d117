//! Simulated value generator.
//!
//! Produces readings for simulated captors, drawn uniformly from the
//! captor's inclusive `[min_power_in_watt, max_power_in_watt]` range. The
//! generator never persists anything; callers decide what to store.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::captor::{Captor, SimulatedCaptor};
use crate::config::GeneratorConfig;
use crate::error::ValidationError;
use crate::measure::Measure;

/// Largest number of readings a single series may hold.
pub const MAX_SERIES_LEN: usize = 100_000;

/// Spacing between consecutive readings of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureStep {
    OneMinute,
    FifteenMinutes,
    OneHour,
    OneDay,
}

impl MeasureStep {
    #[must_use]
    pub fn duration(self) -> Duration {
        match self {
            Self::OneMinute => Duration::minutes(1),
            Self::FifteenMinutes => Duration::minutes(15),
            Self::OneHour => Duration::hours(1),
            Self::OneDay => Duration::days(1),
        }
    }
}

/// Random source for simulated captor readings.
///
/// # Examples
///
/// ```
/// use bigcorp::{Captor, CaptorId, SiteId, SimulatedValueGenerator};
///
/// let captor = Captor::simulated("C1", SiteId::new("S1"), 10, 50)
///     .unwrap()
///     .with_id(CaptorId::new("C1"));
/// let mut generator = SimulatedValueGenerator::seeded(7);
/// let measure = generator.generate(&captor).unwrap();
/// assert!((10..=50).contains(&measure.value_in_watt));
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedValueGenerator {
    rng: StdRng,
}

impl Default for SimulatedValueGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedValueGenerator {
    /// Creates a generator seeded from the operating system.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Creates a deterministic generator.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn from_config(config: &GeneratorConfig) -> Self {
        config.seed.map_or_else(Self::new, Self::seeded)
    }

    /// Draws a power value within the captor's bounds.
    pub fn sample(&mut self, range: &SimulatedCaptor) -> i32 {
        self.rng
            .random_range(range.min_power_in_watt()..=range.max_power_in_watt())
    }

    /// Generates a reading for `captor` timestamped now.
    ///
    /// # Errors
    /// - `NotSimulated` if the captor is not a simulated one
    /// - `UnboundCaptor` if the captor has not been saved yet
    pub fn generate(&mut self, captor: &Captor) -> Result<Measure, ValidationError> {
        self.generate_at(captor, Utc::now())
    }

    /// Generates a reading for `captor` at `instant`.
    ///
    /// # Errors
    /// Same as [`SimulatedValueGenerator::generate`].
    pub fn generate_at(
        &mut self,
        captor: &Captor,
        instant: DateTime<Utc>,
    ) -> Result<Measure, ValidationError> {
        let range = simulated_range(captor)?;
        let value = self.sample(range);
        tracing::debug!(captor = %captor.id, value, "generated simulated measure");
        Ok(Measure::new(captor.id.clone(), instant, value))
    }

    /// Generates one reading per `step` in `[start, end)`.
    ///
    /// The series stops early if the next instant is past the latest
    /// representable date.
    ///
    /// # Errors
    /// - `InvalidTimeRange` unless `start < end`
    /// - `SeriesTooLong` if the range holds more than [`MAX_SERIES_LEN`] steps
    /// - the errors of [`SimulatedValueGenerator::generate`]
    pub fn generate_series(
        &mut self,
        captor: &Captor,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: MeasureStep,
    ) -> Result<Vec<Measure>, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidTimeRange {
                from: start,
                to: end,
            });
        }
        let range = simulated_range(captor)?;

        let span = end.signed_duration_since(start).num_milliseconds();
        let step_ms = step.duration().num_milliseconds();
        let len = usize::try_from((span + step_ms - 1) / step_ms).unwrap_or(usize::MAX);
        if len > MAX_SERIES_LEN {
            return Err(ValidationError::SeriesTooLong {
                len,
                max: MAX_SERIES_LEN,
            });
        }

        let mut out = Vec::with_capacity(len);
        let mut instant = start;
        while instant < end {
            out.push(Measure::new(captor.id.clone(), instant, self.sample(range)));
            match instant.checked_add_signed(step.duration()) {
                Some(next) => instant = next,
                None => break,
            }
        }
        tracing::debug!(captor = %captor.id, count = out.len(), ?step, "generated simulated series");
        Ok(out)
    }
}

fn simulated_range(captor: &Captor) -> Result<&SimulatedCaptor, ValidationError> {
    if captor.id.is_unassigned() {
        return Err(ValidationError::UnboundCaptor);
    }
    captor.as_simulated().ok_or_else(|| ValidationError::NotSimulated {
        id: captor.id.clone(),
    })
}
