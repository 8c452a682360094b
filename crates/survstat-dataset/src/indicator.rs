//! Event indicator derivation
//!
//! Normalizes the event/censoring column into a per-row flag where `true`
//! means the event was observed and `false` means the row is censored.
//!
//! A column only qualifies when its numeric values are all 0 or 1. Columns
//! whose name mentions "censor" are inverted, since a 1 there marks a
//! censored row. Rows with a missing or non-numeric value count as censored.

use serde::{Deserialize, Serialize};

use crate::table::Column;

/// How the event indicator was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorStatus {
    /// Derived from a binary event column.
    #[display("derived")]
    Derived,
    /// An event column was found but is not a binary indicator.
    #[display("defaulted")]
    Defaulted,
    /// No event column (or no data).
    #[display("absent")]
    Absent,
}

/// Per-row event flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventIndicator {
    events: Vec<bool>,
    status: IndicatorStatus,
}

impl EventIndicator {
    /// Derives the indicator from the resolved event column.
    ///
    /// When no column is given or it is not a binary indicator, every row
    /// is treated as an event and the counts are unknown.
    ///
    /// # Examples
    ///
    /// ```
    /// # use survstat_dataset::{indicator::{EventIndicator, IndicatorStatus}, table::Column};
    /// let column = Column::from_cells("censored", ["1", "0", "1"]);
    /// let indicator = EventIndicator::derive(Some(&column), 3);
    /// assert_eq!(indicator.status(), IndicatorStatus::Derived);
    /// assert_eq!(indicator.events(), &[false, true, false]);
    /// assert_eq!(indicator.num_events(), Some(1));
    /// assert_eq!(indicator.num_censored(), Some(2));
    /// ```
    #[must_use]
    pub fn derive(column: Option<&Column>, num_rows: usize) -> Self {
        let Some(column) = column else {
            return Self::all_events(num_rows, IndicatorStatus::Absent);
        };

        let values = column.to_numeric();
        let mut present = values.iter().flatten().peekable();
        let binary = present.peek().is_some() && present.all(|&v| v == 0.0 || v == 1.0);
        if !binary {
            return Self::all_events(num_rows, IndicatorStatus::Defaulted);
        }

        let inverted = column.name().to_lowercase().contains("censor");
        let events = values
            .iter()
            .map(|value| match value {
                Some(v) if inverted => *v == 0.0,
                Some(v) => *v == 1.0,
                None => false,
            })
            .collect();
        Self {
            events,
            status: IndicatorStatus::Derived,
        }
    }

    /// Indicator that marks every row as an event.
    #[must_use]
    pub fn all_events(num_rows: usize, status: IndicatorStatus) -> Self {
        Self {
            events: vec![true; num_rows],
            status,
        }
    }

    #[must_use]
    pub fn status(&self) -> IndicatorStatus {
        self.status
    }

    #[must_use]
    pub fn is_derived(&self) -> bool {
        self.status == IndicatorStatus::Derived
    }

    #[must_use]
    pub fn events(&self) -> &[bool] {
        &self.events
    }

    /// `1.0` for events, `0.0` for censored rows.
    pub fn weights(&self) -> impl Iterator<Item = f64> + '_ {
        self.events.iter().map(|&e| if e { 1.0 } else { 0.0 })
    }

    /// Number of observed events, known only for a derived indicator.
    #[must_use]
    pub fn num_events(&self) -> Option<usize> {
        self.is_derived()
            .then(|| self.events.iter().filter(|&&e| e).count())
    }

    /// Number of censored rows, known only for a derived indicator.
    #[must_use]
    pub fn num_censored(&self) -> Option<usize> {
        self.is_derived()
            .then(|| self.events.iter().filter(|&&e| !e).count())
    }
}
