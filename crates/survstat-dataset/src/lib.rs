//! Cached statistical summaries of survival datasets
//!
//! This crate turns an uploaded tabular survival dataset into a structured
//! summary (sample and feature counts, the time-to-event distribution,
//! per-feature association with the outcome and a censoring-aware
//! histogram) and caches it per dataset.
//!
//! # Overview
//!
//! ```text
//! StatisticsEngine
//! ├─ loader      FileStorage → Table (or an "unavailable" reason)
//! ├─ roles       which columns hold time and event
//! ├─ indicator   event/censoring column → per-row event flags
//! ├─ features    per-feature moments, correlation and Cox p-value
//! ├─ histogram   event-time bins split into events and censored
//! └─ store       StatisticsStore / DatasetCatalog persistence
//! ```
//!
//! Input problems (no file, a missing file, unparsable content, missing
//! columns) never fail a computation: they produce `null` fields in a
//! well-formed [`record::DatasetStatistics`]. Only persistence failures are
//! errors ([`engine::EngineError`]).
//!
//! # Modules
//!
//! - [`table`]: In-memory typed columns with null masks
//! - [`loader`]: Reading CSV/TSV files through a [`loader::FileStorage`]
//! - [`roles`]: Time and event column resolution
//! - [`indicator`]: Event indicator derivation
//! - [`features`]: Per-feature statistics
//! - [`histogram`]: Event-time histogram
//! - [`record`]: Persisted and served data structures
//! - [`store`]: Persistence traits and implementations
//! - [`diagnostics`]: Warnings collected during a computation
//! - [`engine`]: Cache orchestration
//!
//! # Examples
//!
//! ```
//! use survstat_dataset::{
//!     engine::{EnsureOptions, StatisticsEngine},
//!     loader::{LocalFileStorage, read_delimited},
//!     record::{Dataset, DatasetId, TimeUnit},
//!     store::InMemoryStore,
//! };
//! use survstat_stats::cox::PartialLikelihoodCox;
//!
//! let engine = StatisticsEngine::new(LocalFileStorage::new("."), InMemoryStore::new())
//!     .with_cox_fitter(PartialLikelihoodCox::default());
//! let dataset = Dataset::new(DatasetId(1), None, TimeUnit::Day);
//!
//! // The file was just rewritten; hand the engine the new table directly
//! let table = read_delimited(
//!     "time,censored,age\n10,1,50\n15,0,61\n20,1,45\n".as_bytes(),
//!     b',',
//! )
//! .unwrap();
//! let outcome = engine.refresh_with_table(&dataset, table).unwrap();
//! assert_eq!(outcome.stats.general_stats.num_events, Some(1));
//!
//! // Later reads are served from the cache
//! let outcome = engine.ensure_statistics(&dataset, EnsureOptions::default()).unwrap();
//! assert!(outcome.source.is_cached());
//! ```

pub mod diagnostics;
pub mod engine;
pub mod features;
pub mod histogram;
pub mod indicator;
pub mod loader;
pub mod record;
pub mod roles;
pub mod store;
pub mod table;
