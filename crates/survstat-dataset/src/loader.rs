//! Reading stored dataset files into [`Table`]s
//!
//! Files are delimited text with a header row. A path ending in `.tsv`
//! (case-insensitive) is read as tab-separated, anything else as
//! comma-separated.
//!
//! Loading never fails: a dataset without a file, a file missing from
//! storage and a file that cannot be parsed are all reported as
//! [`LoadOutcome::Unavailable`], so callers can store null-filled
//! statistics instead of erroring.

use std::{
    collections::HashSet,
    io::{self, Read},
    path::{Path, PathBuf},
};

use csv::ReaderBuilder;
use tracing::{error, warn};

use crate::table::{Column, Table, TableError};

/// Read-only access to stored dataset files.
pub trait FileStorage {
    /// Whether a file exists at the storage-relative `path`.
    fn exists(&self, path: &str) -> bool;

    /// Opens the file at the storage-relative `path` for reading.
    fn open(&self, path: &str) -> io::Result<Box<dyn Read>>;
}

impl<T> FileStorage for &T
where
    T: FileStorage + ?Sized,
{
    fn exists(&self, path: &str) -> bool {
        (**self).exists(path)
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read>> {
        (**self).open(path)
    }
}

/// File storage rooted at a local directory.
///
/// Relative paths are resolved against the root; absolute paths are used as-is.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new<P>(root: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl FileStorage for LocalFileStorage {
    fn exists(&self, path: &str) -> bool {
        self.full_path(path).is_file()
    }

    fn open(&self, path: &str) -> io::Result<Box<dyn Read>> {
        let file = std::fs::File::open(self.full_path(path))?;
        Ok(Box::new(io::BufReader::new(file)))
    }
}

/// Why a dataset's table could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum UnavailableReason {
    #[display("dataset has no associated file")]
    NoFile,
    #[display("dataset file is missing from storage")]
    FileMissing,
    #[display("dataset file could not be read")]
    Unreadable,
    #[display("dataset file has no data rows")]
    NoRows,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(Table),
    Unavailable(UnavailableReason),
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum LoadError {
    /// I/O failures while reading surface here too.
    #[display("malformed delimited text: {_0}")]
    Csv(csv::Error),
    #[display("file has no header row")]
    MissingHeader,
    #[display("{_0}")]
    Table(TableError),
}

/// Field delimiter for a stored file name.
///
/// ```
/// # use survstat_dataset::loader::delimiter_for;
/// assert_eq!(delimiter_for("uploads/cohort.TSV"), b'\t');
/// assert_eq!(delimiter_for("uploads/cohort.csv"), b',');
/// assert_eq!(delimiter_for("uploads/cohort"), b',');
/// ```
#[must_use]
pub fn delimiter_for(path: &str) -> u8 {
    if path.to_ascii_lowercase().ends_with(".tsv") {
        b'\t'
    } else {
        b','
    }
}

/// Loads the table stored at `file_path`.
///
/// A table with a header but no rows is returned as [`LoadOutcome::Loaded`];
/// deciding what an empty table means is left to the caller.
pub fn load_table<S>(storage: &S, file_path: Option<&str>) -> LoadOutcome
where
    S: FileStorage + ?Sized,
{
    let Some(path) = file_path.filter(|p| !p.is_empty()) else {
        warn!("dataset has no file path, cannot compute statistics");
        return LoadOutcome::Unavailable(UnavailableReason::NoFile);
    };

    if !storage.exists(path) {
        warn!(path, "dataset file is missing, skipping statistics generation");
        return LoadOutcome::Unavailable(UnavailableReason::FileMissing);
    }

    let reader = match storage.open(path) {
        Ok(reader) => reader,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path, "dataset file not found on open, skipping statistics generation");
            return LoadOutcome::Unavailable(UnavailableReason::FileMissing);
        }
        Err(e) => {
            error!(path, error = %e, "failed to open dataset file");
            return LoadOutcome::Unavailable(UnavailableReason::Unreadable);
        }
    };

    match read_delimited(reader, delimiter_for(path)) {
        Ok(table) => LoadOutcome::Loaded(table),
        Err(e) => {
            error!(path, error = %e, "failed to read dataset file");
            LoadOutcome::Unavailable(UnavailableReason::Unreadable)
        }
    }
}

/// Parses delimited text with a header row into a [`Table`].
///
/// Every record must have as many fields as the header. Duplicate header
/// names are disambiguated by appending `.1`, `.2`, ...
///
/// # Examples
///
/// ```
/// # use survstat_dataset::loader::read_delimited;
/// let table = read_delimited("time,arm\n3,a\n5,b\n".as_bytes(), b',').unwrap();
/// assert_eq!(table.num_rows(), 2);
/// assert_eq!(table.column_names(), vec!["time", "arm"]);
/// assert!(table.column(0).unwrap().is_numeric());
/// ```
pub fn read_delimited<R>(reader: R, delimiter: u8) -> Result<Table, LoadError>
where
    R: Read,
{
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(false)
        .from_reader(reader);

    let headers = reader.headers().map_err(LoadError::Csv)?.clone();
    if headers.is_empty() {
        return Err(LoadError::MissingHeader);
    }
    let names = dedupe_names(headers.iter());

    let mut cells = vec![vec![]; names.len()];
    for record in reader.records() {
        let record = record.map_err(LoadError::Csv)?;
        for (column, field) in cells.iter_mut().zip(record.iter()) {
            column.push(field.to_owned());
        }
    }

    let columns = names
        .into_iter()
        .zip(cells)
        .map(|(name, cells)| Column::from_cells(name, cells))
        .collect();
    Table::new(columns).map_err(LoadError::Table)
}

fn dedupe_names<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let names = names.into_iter().collect::<Vec<_>>();
    let mut seen = HashSet::new();
    let mut result = Vec::with_capacity(names.len());
    for name in &names {
        let mut candidate = (*name).to_owned();
        let mut suffix = 1;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{name}.{suffix}");
            suffix += 1;
        }
        result.push(candidate);
    }
    result
}
