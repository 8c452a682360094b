//! Statistics cache orchestration
//!
//! [`StatisticsEngine`] serves cached statistics while they are current and
//! recomputes them otherwise:
//!
//! 1. **Fetch** the stored row, classifying it as a [`CacheState`]
//! 2. **Load** the dataset file through [`FileStorage`] (unless a table is supplied)
//! 3. **Summarize** it: resolve column roles, derive the event indicator,
//!    compute feature statistics and the event-time histogram
//! 4. **Upsert** the new row, stamped with [`STATS_SCHEMA_VERSION`]
//!
//! Missing or unreadable data is not an error: it produces a row with zero
//! counts and null statistics. Only storage failures are reported as
//! [`EngineError::StoreUnavailable`].

use chrono::Utc;
use survstat_stats::{cox::CoxFitter, descriptive::DescriptiveStats};
use tracing::{debug, error, info, info_span, warn};

use crate::{
    diagnostics::{Diagnostic, Diagnostics, Stage},
    features::{FeatureStatistics, compute_feature_statistics, feature_columns},
    histogram::{EventTimeBin, build_event_time_histogram},
    indicator::EventIndicator,
    loader::{FileStorage, LoadOutcome, UnavailableReason, load_table},
    record::{
        Dataset, DatasetId, DatasetStatistics, GeneralStats, STATS_SCHEMA_VERSION,
        StatisticsResponse,
    },
    roles::ColumnRoles,
    store::{DatasetCatalog, StatisticsStore, StoreError},
    table::{Column, Table},
};

/// Values of a refresh request parameter that force recomputation.
pub const REFRESH_FLAG_VALUES: [&str; 5] = ["1", "true", "yes", "recompute", "refresh"];

/// Interprets a user-supplied refresh flag.
///
/// ```
/// # use survstat_dataset::engine::parse_refresh_flag;
/// assert!(parse_refresh_flag("Recompute"));
/// assert!(parse_refresh_flag(" yes "));
/// assert!(!parse_refresh_flag("0"));
/// assert!(!parse_refresh_flag(""));
/// ```
#[must_use]
pub fn parse_refresh_flag(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    REFRESH_FLAG_VALUES.contains(&value.as_str())
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum EngineError {
    #[display("statistics storage is unavailable, try again later: {_0}")]
    StoreUnavailable(StoreError),
    #[display("dataset {id} not found")]
    DatasetNotFound { id: DatasetId },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnsureOptions {
    /// Recompute even if a current row is cached.
    pub force_recalculate: bool,
    /// Also load the table when serving a cached row.
    pub include_table: bool,
}

/// State of the stored row for a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum CacheState {
    NoRow,
    CachedFresh,
    /// Computed by a different engine version, or no longer decodable.
    CachedStale,
}

impl CacheState {
    #[must_use]
    pub fn of(row: Option<&DatasetStatistics>) -> Self {
        match row {
            None => CacheState::NoRow,
            Some(stats) if stats.is_current() => CacheState::CachedFresh,
            Some(_) => CacheState::CachedStale,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum StatisticsSource {
    Cached,
    Computed,
}

/// Whether the dataset's data backed the returned statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum DataAvailability {
    Loaded,
    Unavailable(UnavailableReason),
    /// Cached statistics were served without touching the file.
    NotLoaded,
}

#[derive(Debug, Clone)]
pub struct StatisticsOutcome {
    pub stats: DatasetStatistics,
    pub source: StatisticsSource,
    pub data: DataAvailability,
    /// The table the statistics were computed from, or the table loaded on
    /// request for a cached row.
    pub table: Option<Table>,
    pub diagnostics: Vec<Diagnostic>,
}

impl StatisticsOutcome {
    #[must_use]
    pub fn into_response(self) -> StatisticsResponse {
        StatisticsResponse::from(self.stats)
    }
}

/// Computes, caches and serves dataset statistics.
pub struct StatisticsEngine<F, S> {
    storage: F,
    store: S,
    cox: Option<Box<dyn CoxFitter>>,
}

impl<F, S> StatisticsEngine<F, S>
where
    F: FileStorage,
    S: StatisticsStore,
{
    /// Creates an engine without Cox statistics.
    pub fn new(storage: F, store: S) -> Self {
        Self {
            storage,
            store,
            cox: None,
        }
    }

    /// Enables Cox statistics for numeric features.
    #[must_use]
    pub fn with_cox_fitter<C>(mut self, cox: C) -> Self
    where
        C: CoxFitter + 'static,
    {
        self.cox = Some(Box::new(cox));
        self
    }

    pub fn storage(&self) -> &F {
        &self.storage
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns cached statistics when current, recomputing them otherwise.
    pub fn ensure_statistics(
        &self,
        dataset: &Dataset,
        options: EnsureOptions,
    ) -> Result<StatisticsOutcome, EngineError> {
        let (existing, state) = match self.store.fetch(dataset.id) {
            Ok(row) => {
                let state = CacheState::of(row.as_ref());
                (row, state)
            }
            // An undecodable row is rewritten by the recompute below
            Err(StoreError::Corrupt { path, source }) => {
                warn!(
                    dataset_id = %dataset.id,
                    path = %path.display(),
                    error = %source,
                    "stored statistics are corrupt, recomputing"
                );
                (None, CacheState::CachedStale)
            }
            Err(e) => return Err(store_failure(dataset.id, e)),
        };
        debug!(dataset_id = %dataset.id, ?state, ?options, "checked statistics cache");

        match existing {
            Some(stats) if state.is_cached_fresh() && !options.force_recalculate => {
                let mut diagnostics = Diagnostics::new();
                let (table, data) = if options.include_table {
                    self.load(dataset, &mut diagnostics)
                } else {
                    (None, DataAvailability::NotLoaded)
                };
                Ok(StatisticsOutcome {
                    stats,
                    source: StatisticsSource::Cached,
                    data,
                    table,
                    diagnostics: diagnostics.into_vec(),
                })
            }
            _ => self.calculate_and_store(dataset, None),
        }
    }

    /// Computes statistics and replaces the stored row.
    ///
    /// `preloaded` skips reading the file, e.g. right after the caller
    /// rewrote it.
    pub fn calculate_and_store(
        &self,
        dataset: &Dataset,
        preloaded: Option<Table>,
    ) -> Result<StatisticsOutcome, EngineError> {
        let _span = info_span!("statistics", dataset_id = %dataset.id).entered();
        let mut diagnostics = Diagnostics::new();

        let (table, mut data) = match preloaded {
            Some(table) => (Some(table), DataAvailability::Loaded),
            None => self.load(dataset, &mut diagnostics),
        };
        if table.as_ref().is_some_and(Table::is_empty) {
            diagnostics.warn(Stage::Load, "dataset has no data rows, storing empty statistics");
            data = DataAvailability::Unavailable(UnavailableReason::NoRows);
        }

        let stats = summarize(dataset, table.as_ref(), self.cox.as_deref(), &mut diagnostics);
        let stats = self
            .store
            .upsert(stats)
            .map_err(|e| store_failure(dataset.id, e))?;
        info!(
            num_samples = stats.general_stats.num_samples,
            num_features = stats.feature_correlations.len(),
            "stored dataset statistics"
        );

        Ok(StatisticsOutcome {
            stats,
            source: StatisticsSource::Computed,
            data,
            table,
            diagnostics: diagnostics.into_vec(),
        })
    }

    /// Recomputes statistics after the dataset file was rewritten with `table`.
    pub fn refresh_with_table(
        &self,
        dataset: &Dataset,
        table: Table,
    ) -> Result<StatisticsOutcome, EngineError> {
        self.calculate_and_store(dataset, Some(table))
    }

    fn load(
        &self,
        dataset: &Dataset,
        diagnostics: &mut Diagnostics,
    ) -> (Option<Table>, DataAvailability) {
        match load_table(&self.storage, dataset.file_path.as_deref()) {
            LoadOutcome::Loaded(table) => (Some(table), DataAvailability::Loaded),
            LoadOutcome::Unavailable(reason) => {
                diagnostics.record(Stage::Load, reason.to_string());
                (None, DataAvailability::Unavailable(reason))
            }
        }
    }
}

impl<F, S> StatisticsEngine<F, S>
where
    F: FileStorage,
    S: StatisticsStore + DatasetCatalog,
{
    /// Like [`Self::ensure_statistics`], looking the dataset up by id.
    pub fn ensure_statistics_by_id(
        &self,
        id: DatasetId,
        options: EnsureOptions,
    ) -> Result<StatisticsOutcome, EngineError> {
        let dataset = self
            .store
            .dataset(id)
            .map_err(|e| store_failure(id, e))?
            .ok_or(EngineError::DatasetNotFound { id })?;
        self.ensure_statistics(&dataset, options)
    }
}

fn store_failure(id: DatasetId, e: StoreError) -> EngineError {
    error!(dataset_id = %id, error = %e, "statistics storage failed");
    EngineError::StoreUnavailable(e)
}

/// Computes the statistics row of `dataset` from its table.
///
/// A missing or empty table yields zero counts and null statistics.
#[must_use]
pub fn summarize(
    dataset: &Dataset,
    table: Option<&Table>,
    cox: Option<&dyn CoxFitter>,
    diagnostics: &mut Diagnostics,
) -> DatasetStatistics {
    let (general_stats, feature_correlations, event_time_histogram) =
        match table.filter(|t| !t.is_empty()) {
            Some(table) => summarize_table(dataset, table, cox, diagnostics),
            None => (GeneralStats::empty(dataset.time_unit), vec![], vec![]),
        };

    DatasetStatistics {
        dataset_id: dataset.id,
        computed_at: Utc::now(),
        schema_version: STATS_SCHEMA_VERSION.to_owned(),
        general_stats,
        feature_correlations,
        event_time_histogram,
    }
}

fn summarize_table(
    dataset: &Dataset,
    table: &Table,
    cox: Option<&dyn CoxFitter>,
    diagnostics: &mut Diagnostics,
) -> (GeneralStats, Vec<FeatureStatistics>, Vec<EventTimeBin>) {
    let roles = ColumnRoles::resolve(&table.column_names());
    debug!(time = ?roles.time, event = ?roles.event, "resolved column roles");

    let time_column = roles
        .time
        .as_deref()
        .and_then(|name| table.column_by_name(name));
    let time = time_column.map(Column::to_numeric);
    let time_stats = time
        .as_ref()
        .and_then(|time| DescriptiveStats::new(time.iter().flatten().copied()));
    let finite = |v: f64| v.is_finite().then_some(v);

    let event_column = roles
        .event
        .as_deref()
        .and_then(|name| table.column_by_name(name));
    let indicator = EventIndicator::derive(event_column, table.num_rows());

    let features = feature_columns(table);
    let general_stats = GeneralStats {
        num_samples: table.num_rows(),
        num_features: features.len(),
        num_numeric_features: features.iter().filter(|c| c.is_numeric()).count(),
        num_censored: indicator.num_censored(),
        num_events: indicator.num_events(),
        time_min: time_stats.as_ref().and_then(|s| finite(s.min)),
        time_max: time_stats.as_ref().and_then(|s| finite(s.max)),
        time_mean: time_stats.as_ref().and_then(|s| finite(s.mean)),
        time_median: time_stats.as_ref().and_then(|s| finite(s.median)),
        time_unit: dataset.time_unit,
        total_columns: table.num_columns(),
        event_indicator_status: indicator.status(),
    };

    let feature_correlations =
        compute_feature_statistics(table, time_column, &indicator, cox, diagnostics);
    let event_time_histogram = build_event_time_histogram(time.as_deref(), &indicator, diagnostics);

    (general_stats, feature_correlations, event_time_histogram)
}
