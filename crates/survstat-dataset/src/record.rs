//! Persisted and served data structures
//!
//! [`DatasetStatistics`] is the cached summary of one dataset. It is stored
//! as JSON and served together with a small [`DataframeMetadata`] block via
//! [`StatisticsResponse`].
//!
//! # Serialization
//!
//! Every field is always present; unknown values are `null`:
//!
//! ```json
//! {
//!   "dataset_id": 7,
//!   "computed_at": "2024-05-01T12:00:00Z",
//!   "schema_version": "v3",
//!   "general_stats": {
//!     "num_samples": 3,
//!     "num_features": 1,
//!     "num_numeric_features": 1,
//!     "num_censored": 2,
//!     "num_events": 1,
//!     "time_min": 10.0,
//!     "time_max": 20.0,
//!     "time_mean": 15.0,
//!     "time_median": 15.0,
//!     "time_unit": "day",
//!     "total_columns": 3,
//!     "event_indicator_status": "derived"
//!   },
//!   "feature_correlations": [...],
//!   "event_time_histogram": [...]
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{features::FeatureStatistics, histogram::EventTimeBin, indicator::IndicatorStatus};

/// Version tag of the statistics computation.
///
/// Cached rows with a different tag are recomputed on next access.
pub const STATS_SCHEMA_VERSION: &str = "v3";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
#[serde(transparent)]
pub struct DatasetId(pub u64);

/// Display unit of survival times.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::FromStr,
)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Year,
    #[default]
    Month,
    Day,
    Hour,
}

impl TimeUnit {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Year => "year",
            TimeUnit::Month => "month",
            TimeUnit::Day => "day",
            TimeUnit::Hour => "hour",
        }
    }
}

/// A stored survival dataset, as far as statistics are concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: DatasetId,
    /// Storage-relative path of the uploaded file.
    pub file_path: Option<String>,
    #[serde(default)]
    pub time_unit: TimeUnit,
}

impl Dataset {
    #[must_use]
    pub fn new(id: DatasetId, file_path: Option<String>, time_unit: TimeUnit) -> Self {
        Self {
            id,
            file_path,
            time_unit,
        }
    }
}

/// Dataset-level summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralStats {
    pub num_samples: usize,
    /// Columns after the first two.
    pub num_features: usize,
    pub num_numeric_features: usize,
    pub num_censored: Option<usize>,
    pub num_events: Option<usize>,
    pub time_min: Option<f64>,
    pub time_max: Option<f64>,
    pub time_mean: Option<f64>,
    pub time_median: Option<f64>,
    pub time_unit: TimeUnit,
    pub total_columns: usize,
    pub event_indicator_status: IndicatorStatus,
}

impl GeneralStats {
    /// Summary of a dataset without data.
    #[must_use]
    pub fn empty(time_unit: TimeUnit) -> Self {
        Self {
            num_samples: 0,
            num_features: 0,
            num_numeric_features: 0,
            num_censored: None,
            num_events: None,
            time_min: None,
            time_max: None,
            time_mean: None,
            time_median: None,
            time_unit,
            total_columns: 0,
            event_indicator_status: IndicatorStatus::Absent,
        }
    }
}

/// Cached statistics of one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStatistics {
    pub dataset_id: DatasetId,
    pub computed_at: DateTime<Utc>,
    pub schema_version: String,
    pub general_stats: GeneralStats,
    pub feature_correlations: Vec<FeatureStatistics>,
    pub event_time_histogram: Vec<EventTimeBin>,
}

impl DatasetStatistics {
    /// Whether the row was computed by the current engine version.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.schema_version == STATS_SCHEMA_VERSION
    }

    #[must_use]
    pub fn dataframe_metadata(&self) -> DataframeMetadata {
        DataframeMetadata {
            columns: self.general_stats.total_columns,
            rows: self.general_stats.num_samples,
        }
    }
}

/// Table shape attached to served statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataframeMetadata {
    pub columns: usize,
    pub rows: usize,
}

/// Statistics as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsResponse {
    #[serde(flatten)]
    pub statistics: DatasetStatistics,
    pub dataframe_metadata: DataframeMetadata,
}

impl From<DatasetStatistics> for StatisticsResponse {
    fn from(statistics: DatasetStatistics) -> Self {
        let dataframe_metadata = statistics.dataframe_metadata();
        Self {
            statistics,
            dataframe_metadata,
        }
    }
}
