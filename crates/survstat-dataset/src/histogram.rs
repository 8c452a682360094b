//! Event-time histogram stratified by outcome

use serde::{Deserialize, Serialize};
use survstat_stats::histogram::{BinEdges, Histogram, HistogramError, sqrt_bin_count};

use crate::{
    diagnostics::{Diagnostics, Stage},
    indicator::EventIndicator,
};

pub const MIN_HISTOGRAM_BINS: usize = 5;
pub const MAX_HISTOGRAM_BINS: usize = 20;

/// One bin of the event-time histogram.
///
/// `events + censored == count` holds for every bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTimeBin {
    pub bin_start: f64,
    pub bin_end: f64,
    pub count: u64,
    pub events: u64,
    pub censored: u64,
}

/// Bins the non-null survival times, splitting each bin into events and
/// censored observations.
///
/// Returns an empty list when there are no times, and also (with a
/// diagnostic) when the times cannot be binned.
///
/// # Examples
///
/// ```
/// # use survstat_dataset::diagnostics::Diagnostics;
/// # use survstat_dataset::histogram::build_event_time_histogram;
/// # use survstat_dataset::indicator::{EventIndicator, IndicatorStatus};
/// let time = [Some(1.0), Some(2.0), None, Some(10.0)];
/// let indicator = EventIndicator::all_events(4, IndicatorStatus::Absent);
/// let bins = build_event_time_histogram(Some(&time), &indicator, &mut Diagnostics::new());
/// assert_eq!(bins.len(), 5);
/// assert_eq!(bins.iter().map(|b| b.count).sum::<u64>(), 3);
/// ```
pub fn build_event_time_histogram(
    time: Option<&[Option<f64>]>,
    indicator: &EventIndicator,
    diagnostics: &mut Diagnostics,
) -> Vec<EventTimeBin> {
    let Some(time) = time else {
        return vec![];
    };

    let mut valid = vec![];
    let mut event_times = vec![];
    for (t, &event) in time.iter().zip(indicator.events()) {
        if let Some(t) = *t {
            valid.push(t);
            if event {
                event_times.push(t);
            }
        }
    }
    if valid.is_empty() {
        return vec![];
    }

    match stratified(&valid, &event_times) {
        Ok(bins) => bins,
        Err(e) => {
            diagnostics.warn(
                Stage::EventTimeHistogram,
                format!("failed to compute histogram: {e}"),
            );
            vec![]
        }
    }
}

fn stratified(valid: &[f64], event_times: &[f64]) -> Result<Vec<EventTimeBin>, HistogramError> {
    let num_bins = sqrt_bin_count(valid.len(), MIN_HISTOGRAM_BINS, MAX_HISTOGRAM_BINS);
    let edges = BinEdges::spanning(valid.iter().copied(), num_bins)?;
    let total = Histogram::with_edges(valid.iter().copied(), &edges);
    let events = Histogram::with_edges(event_times.iter().copied(), &edges);

    let bins = total
        .bins
        .iter()
        .zip(&events.bins)
        .map(|(all, ev)| EventTimeBin {
            bin_start: all.range.start,
            bin_end: all.range.end,
            count: all.count,
            events: ev.count,
            censored: all.count - ev.count,
        })
        .collect();
    Ok(bins)
}
