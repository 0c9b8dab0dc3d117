//! # bigcorp - site, captor and measure integrity core
//!
//! bigcorp keeps the Site → Captor → Measure hierarchy of an energy
//! monitoring application consistent across creation, renaming and
//! deletion, and models the polymorphic captor family with its validation
//! rules.
//!
//! ## Core Concepts
//!
//! - **Site**: a physical location owning zero or more captors
//! - **Captor**: a sensor bound to one site, either real or simulated
//! - **Measure**: a timestamped power reading of one captor
//! - **HierarchyManager**: runs every cross-store operation in one transaction
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use bigcorp::{Captor, HierarchyManager, InMemoryDatabase, SimulatedValueGenerator};
//!
//! let manager = HierarchyManager::new(Arc::new(InMemoryDatabase::new()));
//! let site = manager.create("Florange")?;
//! let captor = manager.add_captor(Captor::simulated("C1", site.id.clone(), 10, 50)?)?;
//!
//! let mut generator = SimulatedValueGenerator::new();
//! let measure = manager.simulate_measure(&captor.id, &mut generator)?;
//! assert!((10..=50).contains(&measure.value_in_watt));
//!
//! let remaining = manager.delete(&site.id)?;
//! assert!(remaining.is_empty());
//! # Ok::<(), bigcorp::BigCorpError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod id;

pub mod captor;
pub mod config;
pub mod error;
pub mod generator;
pub mod hierarchy;
pub mod measure;
pub mod service;
pub mod site;
pub mod storage;
pub mod validate;

// Re-export primary types at crate root for convenience
pub use captor::{Captor, CaptorId, CaptorKind, PowerSource, SimulatedCaptor};
pub use config::{GeneratorConfig, HierarchyConfig};
pub use error::{BigCorpError, BigCorpResult, ExecutionError, ValidationError};
pub use generator::{MeasureStep, SimulatedValueGenerator, MAX_SERIES_LEN};
pub use hierarchy::{CascadeReport, HierarchyManager, MeasuresView};
pub use measure::{Measure, MeasureId};
pub use service::CaptorService;
pub use site::{Site, SiteId};
pub use storage::{
    CaptorStore, FaultPoint, InMemoryDatabase, MeasureStore, RowCounts, SiteStore, StorageError,
    Transaction, TransactionManager,
};
pub use validate::Validate;
