//! In-memory tabular data
//!
//! A [`Table`] is an ordered list of named [`Column`]s of equal length. Each
//! column is either numeric or text, and every cell may be null.
//!
//! Column types are inferred from raw cells with [`Column::from_cells`]: a
//! column is numeric when every non-null cell parses as a float. A column
//! with no non-null cells is numeric as well.

use std::fmt;

/// Cell values treated as missing data.
pub const NULL_TOKENS: [&str; 13] = [
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A", "<NA>",
];

/// Parses a trimmed cell as a number, mapping NaN to null.
fn parse_number(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn is_null_token(cell: &str) -> bool {
    NULL_TOKENS.contains(&cell)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.len(),
            ColumnData::Text(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named column of a [`Table`].
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    #[must_use]
    pub fn numeric<S>(name: S, values: Vec<Option<f64>>) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    #[must_use]
    pub fn text<S>(name: S, values: Vec<Option<String>>) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }

    /// Builds a column from raw cells, inferring its type.
    ///
    /// Cells are trimmed; null tokens (see [`NULL_TOKENS`]) become nulls.
    ///
    /// # Examples
    ///
    /// ```
    /// # use survstat_dataset::table::Column;
    /// let column = Column::from_cells("age", ["42", " NA ", "7.5"]);
    /// assert!(column.is_numeric());
    /// assert_eq!(column.to_numeric(), vec![Some(42.0), None, Some(7.5)]);
    ///
    /// let column = Column::from_cells("arm", ["a", "", "b"]);
    /// assert!(!column.is_numeric());
    /// assert_eq!(column.non_null_count(), 2);
    /// ```
    pub fn from_cells<S, I, C>(name: S, cells: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        let cells = cells
            .into_iter()
            .map(|cell| {
                let cell = cell.as_ref().trim();
                (!is_null_token(cell)).then(|| cell.to_owned())
            })
            .collect::<Vec<_>>();

        let numbers = cells
            .iter()
            .map(|cell| match cell {
                Some(cell) => parse_number(cell).map(Some).ok_or(()),
                None => Ok(None),
            })
            .collect::<Result<Vec<_>, ()>>();

        match numbers {
            Ok(values) => Self::numeric(name, values),
            Err(()) => Self::text(name, cells),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn non_null_count(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(values) => values.iter().flatten().count(),
            ColumnData::Text(values) => values.iter().flatten().count(),
        }
    }

    /// Coerces the column to numbers.
    ///
    /// Text cells that parse as numbers are converted, all other cells become null.
    #[must_use]
    pub fn to_numeric(&self) -> Vec<Option<f64>> {
        match &self.data {
            ColumnData::Numeric(values) => values.clone(),
            ColumnData::Text(values) => values
                .iter()
                .map(|cell| cell.as_deref().and_then(|c| parse_number(c.trim())))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum TableError {
    #[display("column '{column}' has {actual} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },
}

/// Ordered collection of equal-length columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    /// Creates a table from columns of equal length.
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let num_rows = columns.first().map_or(0, Column::len);
        if let Some(ragged) = columns.iter().find(|c| c.len() != num_rows) {
            return Err(TableError::RaggedColumn {
                column: ragged.name.clone(),
                expected: num_rows,
                actual: ragged.len(),
            });
        }
        Ok(Self { columns, num_rows })
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Whether the table has no rows (regardless of its columns).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    #[must_use]
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// The first column with the given name.
    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows x {} columns [{}]",
            self.num_rows,
            self.columns.len(),
            self.column_names().join(", ")
        )
    }
}
