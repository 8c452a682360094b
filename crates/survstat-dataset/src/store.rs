//! Persistence of datasets and their statistics
//!
//! [`StatisticsStore`] holds at most one [`DatasetStatistics`] row per
//! dataset; [`DatasetCatalog`] holds dataset descriptors and cascades
//! deletes to the statistics row.
//!
//! Two implementations are provided:
//!
//! - [`InMemoryStore`]: mutex-guarded maps, for tests and one-shot runs
//! - [`JsonFileStore`]: one pretty-printed JSON file per row in a directory

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use serde::{Serialize, de::DeserializeOwned};

use crate::record::{Dataset, DatasetId, DatasetStatistics};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum StoreError {
    #[display("storage at {} is unavailable: {source}", path.display())]
    Unavailable { path: PathBuf, source: io::Error },
    #[display("stored row {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Storage of computed statistics, keyed by dataset.
pub trait StatisticsStore {
    fn fetch(&self, id: DatasetId) -> Result<Option<DatasetStatistics>, StoreError>;

    /// Inserts or fully replaces the row of `stats.dataset_id`.
    fn upsert(&self, stats: DatasetStatistics) -> Result<DatasetStatistics, StoreError>;

    /// Removes the row, returning whether one existed.
    fn delete(&self, id: DatasetId) -> Result<bool, StoreError>;
}

/// Lookup of dataset descriptors.
pub trait DatasetCatalog {
    fn dataset(&self, id: DatasetId) -> Result<Option<Dataset>, StoreError>;

    fn put_dataset(&self, dataset: Dataset) -> Result<(), StoreError>;

    /// Removes the dataset and its statistics, returning whether it existed.
    fn delete_dataset(&self, id: DatasetId) -> Result<bool, StoreError>;
}

impl<T> StatisticsStore for &T
where
    T: StatisticsStore + ?Sized,
{
    fn fetch(&self, id: DatasetId) -> Result<Option<DatasetStatistics>, StoreError> {
        (**self).fetch(id)
    }

    fn upsert(&self, stats: DatasetStatistics) -> Result<DatasetStatistics, StoreError> {
        (**self).upsert(stats)
    }

    fn delete(&self, id: DatasetId) -> Result<bool, StoreError> {
        (**self).delete(id)
    }
}

impl<T> DatasetCatalog for &T
where
    T: DatasetCatalog + ?Sized,
{
    fn dataset(&self, id: DatasetId) -> Result<Option<Dataset>, StoreError> {
        (**self).dataset(id)
    }

    fn put_dataset(&self, dataset: Dataset) -> Result<(), StoreError> {
        (**self).put_dataset(dataset)
    }

    fn delete_dataset(&self, id: DatasetId) -> Result<bool, StoreError> {
        (**self).delete_dataset(id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    datasets: Mutex<BTreeMap<DatasetId, Dataset>>,
    statistics: Mutex<BTreeMap<DatasetId, DatasetStatistics>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn num_statistics(&self) -> usize {
        lock(&self.statistics).len()
    }
}

impl StatisticsStore for InMemoryStore {
    fn fetch(&self, id: DatasetId) -> Result<Option<DatasetStatistics>, StoreError> {
        Ok(lock(&self.statistics).get(&id).cloned())
    }

    fn upsert(&self, stats: DatasetStatistics) -> Result<DatasetStatistics, StoreError> {
        lock(&self.statistics).insert(stats.dataset_id, stats.clone());
        Ok(stats)
    }

    fn delete(&self, id: DatasetId) -> Result<bool, StoreError> {
        Ok(lock(&self.statistics).remove(&id).is_some())
    }
}

impl DatasetCatalog for InMemoryStore {
    fn dataset(&self, id: DatasetId) -> Result<Option<Dataset>, StoreError> {
        Ok(lock(&self.datasets).get(&id).cloned())
    }

    fn put_dataset(&self, dataset: Dataset) -> Result<(), StoreError> {
        lock(&self.datasets).insert(dataset.id, dataset);
        Ok(())
    }

    fn delete_dataset(&self, id: DatasetId) -> Result<bool, StoreError> {
        let existed = lock(&self.datasets).remove(&id).is_some();
        self.delete(id)?;
        Ok(existed)
    }
}

/// Directory of JSON rows: `dataset-<id>.json` and `statistics-<id>.json`.
///
/// Writes go to a temporary file that is then renamed over the row, so a
/// row is always either the old or the new version.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Opens a store in an existing directory.
    pub fn open<P>(dir: P) -> Result<Self, StoreError>
    where
        P: Into<PathBuf>,
    {
        let store = Self { dir: dir.into() };
        store.check_dir()?;
        Ok(store)
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn check_dir(&self) -> Result<(), StoreError> {
        let unavailable = |source| StoreError::Unavailable {
            path: self.dir.clone(),
            source,
        };
        let metadata = fs::metadata(&self.dir).map_err(unavailable)?;
        if !metadata.is_dir() {
            return Err(unavailable(io::Error::new(
                io::ErrorKind::NotADirectory,
                "not a directory",
            )));
        }
        Ok(())
    }

    fn statistics_path(&self, id: DatasetId) -> PathBuf {
        self.dir.join(format!("statistics-{id}.json"))
    }

    fn dataset_path(&self, id: DatasetId) -> PathBuf {
        self.dir.join(format!("dataset-{id}.json"))
    }

    fn read_row<T>(&self, path: &Path) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.check_dir()?;
                return Ok(None);
            }
            Err(source) => {
                return Err(StoreError::Unavailable {
                    path: path.to_owned(),
                    source,
                });
            }
        };
        serde_json::from_reader(BufReader::new(file))
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                path: path.to_owned(),
                source,
            })
    }

    fn write_row<T>(&self, path: &Path, value: &T) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let unavailable = |source| StoreError::Unavailable {
            path: path.to_owned(),
            source,
        };
        let tmp_path = path.with_extension("json.tmp");

        let mut writer = BufWriter::new(File::create(&tmp_path).map_err(unavailable)?);
        serde_json::to_writer_pretty(&mut writer, value)
            .map_err(|e| unavailable(io::Error::other(e)))?;
        writeln!(writer).map_err(unavailable)?;
        writer.flush().map_err(unavailable)?;
        drop(writer);

        fs::rename(&tmp_path, path).map_err(unavailable)
    }

    fn remove_row(&self, path: &Path) -> Result<bool, StoreError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.check_dir()?;
                Ok(false)
            }
            Err(source) => Err(StoreError::Unavailable {
                path: path.to_owned(),
                source,
            }),
        }
    }
}

impl StatisticsStore for JsonFileStore {
    fn fetch(&self, id: DatasetId) -> Result<Option<DatasetStatistics>, StoreError> {
        self.read_row(&self.statistics_path(id))
    }

    fn upsert(&self, stats: DatasetStatistics) -> Result<DatasetStatistics, StoreError> {
        self.write_row(&self.statistics_path(stats.dataset_id), &stats)?;
        Ok(stats)
    }

    fn delete(&self, id: DatasetId) -> Result<bool, StoreError> {
        self.remove_row(&self.statistics_path(id))
    }
}

impl DatasetCatalog for JsonFileStore {
    fn dataset(&self, id: DatasetId) -> Result<Option<Dataset>, StoreError> {
        self.read_row(&self.dataset_path(id))
    }

    fn put_dataset(&self, dataset: Dataset) -> Result<(), StoreError> {
        self.write_row(&self.dataset_path(dataset.id), &dataset)
    }

    fn delete_dataset(&self, id: DatasetId) -> Result<bool, StoreError> {
        let existed = self.remove_row(&self.dataset_path(id))?;
        self.delete(id)?;
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        features::{FeatureStatistics, FeatureType},
        histogram::EventTimeBin,
        record::{GeneralStats, STATS_SCHEMA_VERSION, TimeUnit},
    };

    fn stats(id: u64, num_samples: usize) -> DatasetStatistics {
        let mut general_stats = GeneralStats::empty(TimeUnit::Month);
        general_stats.num_samples = num_samples;
        DatasetStatistics {
            dataset_id: DatasetId(id),
            computed_at: Utc::now(),
            schema_version: STATS_SCHEMA_VERSION.to_owned(),
            general_stats,
            feature_correlations: vec![],
            event_time_histogram: vec![],
        }
    }

    fn dataset(id: u64) -> Dataset {
        Dataset::new(DatasetId(id), Some(format!("{id}.csv")), TimeUnit::Day)
    }

    fn exercise<S>(store: &S)
    where
        S: StatisticsStore + DatasetCatalog,
    {
        assert!(store.fetch(DatasetId(1)).unwrap().is_none());

        store.upsert(stats(1, 10)).unwrap();
        store.upsert(stats(1, 20)).unwrap();
        store.upsert(stats(2, 5)).unwrap();
        assert_eq!(
            store.fetch(DatasetId(1)).unwrap().unwrap().general_stats.num_samples,
            20
        );

        store.put_dataset(dataset(1)).unwrap();
        assert_eq!(store.dataset(DatasetId(1)).unwrap(), Some(dataset(1)));
        assert!(store.dataset(DatasetId(9)).unwrap().is_none());

        assert!(store.delete_dataset(DatasetId(1)).unwrap());
        assert!(store.dataset(DatasetId(1)).unwrap().is_none());
        assert!(store.fetch(DatasetId(1)).unwrap().is_none());
        assert!(store.fetch(DatasetId(2)).unwrap().is_some());

        assert!(store.delete(DatasetId(2)).unwrap());
        assert!(!store.delete(DatasetId(2)).unwrap());
    }

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryStore::new();
        exercise(&store);
        assert_eq!(store.num_statistics(), 0);
    }

    #[test]
    fn test_json_file_store() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        exercise(&store);
        // no temporary files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_json_file_store_round_trips_timestamps() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        let saved = store.upsert(stats(3, 1)).unwrap();
        assert_eq!(store.fetch(DatasetId(3)).unwrap(), Some(saved));
    }

    #[test]
    fn test_json_file_store_round_trips_floats_exactly() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();

        for id in 1..=200_u32 {
            let x = f64::from(id);
            let p_value = (-x / 3.0).exp();
            let mut row = stats(u64::from(id), 40);
            row.general_stats.time_mean = Some(x.sqrt() / 7.0);
            row.general_stats.time_median = Some(x.ln() * 1.1);
            row.feature_correlations = vec![FeatureStatistics {
                feature: format!("f{id}"),
                feature_type: FeatureType::Numeric,
                non_null_percent: Some(100.0 * (x / 201.0)),
                correlation_with_time: Some(-(x / 200.0).sqrt()),
                abs_correlation: Some((x / 200.0).sqrt()),
                mean: Some(x.cbrt() * 3.3),
                std_dev: Some((x + 0.1).sqrt()),
                cox_score: Some(p_value),
                cox_score_log: Some(p_value.ln()),
            }];
            let step = (x.sqrt() + 1.0) / 7.0;
            row.event_time_histogram = (0..7_u32)
                .map(|i| EventTimeBin {
                    bin_start: 0.1 + step * f64::from(i),
                    bin_end: 0.1 + step * f64::from(i + 1),
                    count: 3,
                    events: 1,
                    censored: 2,
                })
                .collect();

            let saved = store.upsert(row).unwrap();
            assert_eq!(store.fetch(DatasetId(u64::from(id))).unwrap(), Some(saved));
        }
    }

    #[test]
    fn test_missing_directory_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope");
        assert!(matches!(
            JsonFileStore::open(&path),
            Err(StoreError::Unavailable { .. })
        ));

        let store = JsonFileStore::open(dir.path()).unwrap();
        drop(dir);
        assert!(matches!(
            store.fetch(DatasetId(1)),
            Err(StoreError::Unavailable { .. })
        ));
        assert!(matches!(
            store.upsert(stats(1, 1)),
            Err(StoreError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_undecodable_row_is_corrupt() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("statistics-4.json"), "{ not json").unwrap();
        let store = JsonFileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.fetch(DatasetId(4)),
            Err(StoreError::Corrupt { .. })
        ));
    }
}
