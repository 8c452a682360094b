//! Per-feature statistics
//!
//! Every column after the first two is treated as a feature. For each one we
//! record its completeness, basic moments, its Pearson correlation with the
//! event-weighted survival time and, when a [`CoxFitter`] is available, the
//! Wald p-value of a single-covariate Cox model.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use survstat_stats::{
    correlation::pearson,
    cox::CoxFitter,
    descriptive::{self, distinct_count},
};
use tracing::debug;

use crate::{
    diagnostics::{Diagnostics, Stage},
    indicator::EventIndicator,
    table::{Column, ColumnData, Table},
};

/// Number of leading columns reserved for time and event.
const NUM_OUTCOME_COLUMNS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    Numeric,
    Categorical,
}

/// Statistics of one feature column.
///
/// Unknown values serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStatistics {
    pub feature: String,
    pub feature_type: FeatureType,
    /// Share of non-null cells, in percent.
    pub non_null_percent: Option<f64>,
    /// Pearson correlation with `time * event`.
    pub correlation_with_time: Option<f64>,
    pub abs_correlation: Option<f64>,
    pub mean: Option<f64>,
    /// Sample standard deviation.
    pub std_dev: Option<f64>,
    /// Two-sided Wald p-value of the Cox coefficient.
    pub cox_score: Option<f64>,
    /// Natural log of `cox_score`.
    pub cox_score_log: Option<f64>,
}

/// The feature columns, in table order.
#[must_use]
pub fn feature_columns(table: &Table) -> &[Column] {
    table.columns().get(NUM_OUTCOME_COLUMNS..).unwrap_or_default()
}

/// Computes statistics for every feature column, strongest correlation first.
///
/// `time` is the resolved time column, or `None` when the table has none, in
/// which case no features are reported. Correlations use its values coerced
/// to numbers; Cox models are only fitted when the column is numeric.
pub fn compute_feature_statistics(
    table: &Table,
    time: Option<&Column>,
    indicator: &EventIndicator,
    cox: Option<&dyn CoxFitter>,
    diagnostics: &mut Diagnostics,
) -> Vec<FeatureStatistics> {
    let features = feature_columns(table);
    let Some(time_column) = time else {
        return vec![];
    };
    if features.is_empty() {
        return vec![];
    }
    let time = time_column.to_numeric();

    if cox.is_none() {
        diagnostics.warn(
            Stage::FeatureStatistics,
            "Cox fitter is not configured; Cox statistics will be omitted",
        );
    }
    let cox = cox.filter(|_| {
        let numeric = time_column.is_numeric();
        if !numeric {
            debug!(time = time_column.name(), "time column is not numeric, skipping Cox");
        }
        numeric
    });

    let mut results = features
        .iter()
        .map(|column| feature_statistics(column, table.num_rows(), &time, indicator, cox))
        .collect::<Vec<_>>();
    results.sort_by(|a, b| by_abs_correlation_desc(a.abs_correlation, b.abs_correlation));
    results
}

fn by_abs_correlation_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[expect(clippy::cast_precision_loss)]
fn feature_statistics(
    column: &Column,
    num_rows: usize,
    time: &[Option<f64>],
    indicator: &EventIndicator,
    cox: Option<&dyn CoxFitter>,
) -> FeatureStatistics {
    let non_null_percent =
        (num_rows > 0).then(|| column.non_null_count() as f64 / num_rows as f64 * 100.0);

    let ColumnData::Numeric(values) = column.data() else {
        return FeatureStatistics {
            feature: column.name().to_owned(),
            feature_type: FeatureType::Categorical,
            non_null_percent,
            correlation_with_time: None,
            abs_correlation: None,
            mean: None,
            std_dev: None,
            cox_score: None,
            cox_score_log: None,
        };
    };

    let present = values.iter().flatten().copied().collect::<Vec<_>>();
    let mean = descriptive::mean(&present).filter(|v| v.is_finite());
    let std_dev = descriptive::sample_std_dev(&present).filter(|v| v.is_finite());

    let correlation_with_time = time_correlation(values, time, indicator);
    let cox_score = cox.and_then(|cox| cox_p_value(column.name(), values, time, indicator, cox));

    FeatureStatistics {
        feature: column.name().to_owned(),
        feature_type: FeatureType::Numeric,
        non_null_percent,
        correlation_with_time,
        abs_correlation: correlation_with_time.map(f64::abs),
        mean,
        std_dev,
        cox_score,
        cox_score_log: cox_score.filter(|&p| p > 0.0).map(f64::ln),
    }
}

fn time_correlation(
    values: &[Option<f64>],
    time: &[Option<f64>],
    indicator: &EventIndicator,
) -> Option<f64> {
    let (weighted_time, feature): (Vec<f64>, Vec<f64>) = time
        .iter()
        .zip(indicator.weights())
        .zip(values)
        .filter_map(|((t, w), x)| Some(((*t)? * w, (*x)?)))
        .filter(|(t, _)| !t.is_nan())
        .unzip();

    if weighted_time.len() < 2
        || distinct_count(&weighted_time) < 2
        || distinct_count(&feature) < 2
    {
        return None;
    }
    pearson(&weighted_time, &feature)
}

fn cox_p_value(
    name: &str,
    values: &[Option<f64>],
    time: &[Option<f64>],
    indicator: &EventIndicator,
    cox: &dyn CoxFitter,
) -> Option<f64> {
    let mut fit_time = vec![];
    let mut fit_event = vec![];
    let mut fit_feature = vec![];
    for ((t, &event), x) in time.iter().zip(indicator.events()).zip(values) {
        if let (Some(t), Some(x)) = (t, x) {
            fit_time.push(*t);
            fit_event.push(event);
            fit_feature.push(*x);
        }
    }

    if fit_time.is_empty() || !fit_event.contains(&true) || distinct_count(&fit_feature) < 2 {
        return None;
    }

    match cox.fit_single_covariate(&fit_time, &fit_event, &fit_feature) {
        Ok(fit) => Some(fit.p_value),
        Err(e) => {
            debug!(feature = name, error = %e, "Cox statistics failed for feature");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use survstat_stats::cox::{CoxFit, CoxFitError, PartialLikelihoodCox};

    use super::*;
    use crate::indicator::IndicatorStatus;

    fn sample_table() -> Table {
        Table::new(vec![
            Column::from_cells("time", ["2", "4", "6", "8", "10", "12"]),
            Column::from_cells("event", ["1", "1", "0", "1", "0", "1"]),
            Column::from_cells("age", ["70", "52", "", "66", "51", "47"]),
            Column::from_cells("arm", ["a", "b", "a", "b", "a", "b"]),
            Column::from_cells("flat", ["3", "3", "3", "3", "3", "3"]),
        ])
        .unwrap()
    }

    fn compute(
        table: &Table,
        cox: Option<&dyn CoxFitter>,
    ) -> (Vec<FeatureStatistics>, Diagnostics) {
        let indicator = EventIndicator::derive(table.column(1), table.num_rows());
        let mut diagnostics = Diagnostics::new();
        let stats =
            compute_feature_statistics(table, table.column(0), &indicator, cox, &mut diagnostics);
        (stats, diagnostics)
    }

    #[test]
    fn test_numeric_feature_statistics() {
        let (stats, _) = compute(&sample_table(), None);
        let age = stats.iter().find(|s| s.feature == "age").unwrap();

        assert_eq!(age.feature_type, FeatureType::Numeric);
        assert_relative_eq!(age.non_null_percent.unwrap(), 500.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(age.mean.unwrap(), 57.2, epsilon = 1e-12);
        assert!(age.std_dev.is_some());
        assert!(age.correlation_with_time.is_some());
        assert_eq!(age.abs_correlation, age.correlation_with_time.map(f64::abs));
        assert_eq!(age.cox_score, None);
    }

    #[test]
    fn test_categorical_feature_has_only_completeness() {
        let (stats, _) = compute(&sample_table(), None);
        let arm = stats.iter().find(|s| s.feature == "arm").unwrap();

        assert_eq!(arm.feature_type, FeatureType::Categorical);
        assert_eq!(arm.non_null_percent, Some(100.0));
        assert_eq!(arm.mean, None);
        assert_eq!(arm.correlation_with_time, None);
    }

    #[test]
    fn test_constant_feature_has_no_correlation() {
        let (stats, _) = compute(&sample_table(), None);
        let flat = stats.iter().find(|s| s.feature == "flat").unwrap();
        assert_eq!(flat.mean, Some(3.0));
        assert_eq!(flat.std_dev, Some(0.0));
        assert_eq!(flat.correlation_with_time, None);
    }

    #[test]
    fn test_ordering_puts_nulls_last() {
        let (stats, _) = compute(&sample_table(), None);
        assert_eq!(stats[0].feature, "age");
        assert!(stats[1..].iter().all(|s| s.abs_correlation.is_none()));
        // stable for ties
        assert_eq!(stats[1].feature, "arm");
        assert_eq!(stats[2].feature, "flat");
    }

    #[test]
    fn test_missing_cox_fitter_warns_once() {
        let (_, diagnostics) = compute(&sample_table(), None);
        assert_eq!(diagnostics.entries().len(), 1);
        assert_eq!(diagnostics.entries()[0].stage, Stage::FeatureStatistics);
    }

    #[test]
    fn test_cox_score_is_reported_for_numeric_features() {
        let cox = PartialLikelihoodCox::default();
        let (stats, diagnostics) = compute(&sample_table(), Some(&cox));
        assert!(diagnostics.is_empty());

        let age = stats.iter().find(|s| s.feature == "age").unwrap();
        let p = age.cox_score.unwrap();
        assert!(p > 0.0 && p <= 1.0);
        assert_relative_eq!(age.cox_score_log.unwrap(), p.ln());

        // constant and categorical features are skipped
        let flat = stats.iter().find(|s| s.feature == "flat").unwrap();
        assert_eq!(flat.cox_score, None);
        let arm = stats.iter().find(|s| s.feature == "arm").unwrap();
        assert_eq!(arm.cox_score, None);
    }

    struct FailingCox;

    impl CoxFitter for FailingCox {
        fn fit_single_covariate(
            &self,
            _: &[f64],
            _: &[bool],
            _: &[f64],
        ) -> Result<CoxFit, CoxFitError> {
            Err(CoxFitError::SingularInformation { beta: 0.0 })
        }
    }

    #[test]
    fn test_cox_failure_only_nulls_that_feature() {
        let (stats, _) = compute(&sample_table(), Some(&FailingCox));
        let age = stats.iter().find(|s| s.feature == "age").unwrap();
        assert_eq!(age.cox_score, None);
        assert_eq!(age.cox_score_log, None);
        assert!(age.mean.is_some());
    }

    struct CertainCox;

    impl CoxFitter for CertainCox {
        fn fit_single_covariate(
            &self,
            _: &[f64],
            _: &[bool],
            _: &[f64],
        ) -> Result<CoxFit, CoxFitError> {
            Ok(CoxFit {
                coefficient: 40.0,
                standard_error: 1.0,
                z: 40.0,
                p_value: 0.0,
                log_likelihood: 0.0,
                iterations: 1,
                converged: true,
            })
        }
    }

    #[test]
    fn test_zero_p_value_has_no_log() {
        let (stats, _) = compute(&sample_table(), Some(&CertainCox));
        let age = stats.iter().find(|s| s.feature == "age").unwrap();
        assert_eq!(age.cox_score, Some(0.0));
        assert_eq!(age.cox_score_log, None);
    }

    #[test]
    fn test_no_time_or_no_features() {
        let table = sample_table();
        let indicator = EventIndicator::all_events(table.num_rows(), IndicatorStatus::Absent);
        let mut diagnostics = Diagnostics::new();
        let stats = compute_feature_statistics(&table, None, &indicator, None, &mut diagnostics);
        assert!(stats.is_empty());

        let narrow = Table::new(vec![
            Column::from_cells("time", ["1", "2"]),
            Column::from_cells("event", ["1", "0"]),
        ])
        .unwrap();
        let time = narrow.column(0);
        let stats = compute_feature_statistics(&narrow, time, &indicator, None, &mut diagnostics);
        assert!(stats.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_censored_rows_weight_time_to_zero() {
        // time * event = [0, 4, 0, 8]; feature tracks it exactly
        let table = Table::new(vec![
            Column::from_cells("time", ["2", "4", "6", "8"]),
            Column::from_cells("event", ["0", "1", "0", "1"]),
            Column::from_cells("x", ["0", "1", "0", "2"]),
        ])
        .unwrap();
        let (stats, _) = compute(&table, None);
        assert_relative_eq!(stats[0].correlation_with_time.unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_text_time_column_skips_cox_but_keeps_correlation() {
        // one unparsable cell makes the time column text-typed
        let table = Table::new(vec![
            Column::from_cells("time", ["2", "4", "unknown", "8", "10", "12"]),
            Column::from_cells("event", ["1", "1", "0", "1", "0", "1"]),
            Column::from_cells("age", ["70", "52", "61", "66", "51", "47"]),
        ])
        .unwrap();
        assert!(!table.column(0).unwrap().is_numeric());

        let (stats, diagnostics) = compute(&table, Some(&CertainCox));
        assert!(diagnostics.is_empty());
        assert_eq!(stats[0].cox_score, None);
        assert_eq!(stats[0].cox_score_log, None);
        assert!(stats[0].correlation_with_time.is_some());
        assert!(stats[0].mean.is_some());
    }
}
