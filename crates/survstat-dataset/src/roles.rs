//! Column role resolution
//!
//! Picks which columns hold the survival time and the event/censoring flag
//! from the column names alone. Well-known names win; otherwise the layout
//! convention of "time first, event second" applies.

/// Time column names, in priority order.
pub const TIME_COLUMN_CANDIDATES: [&str; 5] = ["time", "Time", "TIME", "duration", "survival_time"];

/// Event/censoring column names, in priority order.
pub const EVENT_COLUMN_CANDIDATES: [&str; 7] = [
    "censored", "Censored", "event", "Event", "status", "Status", "failure",
];

/// The columns chosen as survival time and event indicator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRoles {
    pub time: Option<String>,
    pub event: Option<String>,
}

impl ColumnRoles {
    /// Resolves roles from the ordered column names.
    ///
    /// # Examples
    ///
    /// ```
    /// # use survstat_dataset::roles::ColumnRoles;
    /// let roles = ColumnRoles::resolve(&["age", "status", "duration"]);
    /// assert_eq!(roles.time.as_deref(), Some("duration"));
    /// assert_eq!(roles.event.as_deref(), Some("status"));
    ///
    /// // No well-known names: first column is time, next one is the event
    /// let roles = ColumnRoles::resolve(&["t", "d", "x"]);
    /// assert_eq!(roles.time.as_deref(), Some("t"));
    /// assert_eq!(roles.event.as_deref(), Some("d"));
    /// ```
    pub fn resolve<S>(columns: &[S]) -> Self
    where
        S: AsRef<str>,
    {
        let names = columns.iter().map(AsRef::as_ref).collect::<Vec<_>>();

        let time = first_present(&names, &TIME_COLUMN_CANDIDATES, None)
            .or_else(|| names.first().copied());

        let event = if names.len() < 2 {
            None
        } else {
            first_present(&names, &EVENT_COLUMN_CANDIDATES, time)
                .or_else(|| names[1..].iter().copied().find(|&name| Some(name) != time))
        };

        Self {
            time: time.map(str::to_owned),
            event: event.map(str::to_owned),
        }
    }
}

fn first_present<'a>(
    names: &[&'a str],
    candidates: &[&str],
    exclude: Option<&str>,
) -> Option<&'a str> {
    candidates
        .iter()
        .filter(|&&candidate| Some(candidate) != exclude)
        .find_map(|candidate| names.iter().copied().find(|name| name == candidate))
}
