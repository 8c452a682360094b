//! Location and spread of samples

/// Five-number style summary of a non-empty sample.
///
/// Dispersion uses the `n - 1` denominator and is `None` for a single value.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Midpoint of the two central values when `count` is even.
    pub median: f64,
    pub variance: Option<f64>,
    pub std_dev: Option<f64>,
}

impl DescriptiveStats {
    /// Summarizes `values` in any order, or returns `None` for an empty sample.
    ///
    /// ```
    /// # use survstat_stats::descriptive::DescriptiveStats;
    /// let stats = DescriptiveStats::new([12.0, 3.0, 9.0, 6.0]).unwrap();
    /// assert_eq!((stats.min, stats.max), (3.0, 12.0));
    /// assert_eq!(stats.median, 7.5);
    /// assert_eq!(stats.variance, Some(15.0));
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut sorted = values.into_iter().collect::<Vec<_>>();
        sorted.sort_by(f64::total_cmp);

        let (&min, &max) = (sorted.first()?, sorted.last()?);
        let mean = mean(&sorted)?;
        let half = sorted.len() / 2;
        let median = if sorted.len() % 2 == 1 {
            sorted[half]
        } else {
            f64::midpoint(sorted[half - 1], sorted[half])
        };
        let variance = sample_variance_around(&sorted, mean);

        Some(Self {
            count: sorted.len(),
            min,
            max,
            mean,
            median,
            variance,
            std_dev: variance.map(f64::sqrt),
        })
    }
}

/// Arithmetic mean of `values`, or `None` when empty.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (`n - 1` denominator), or `None` for fewer than two values.
///
/// ```
/// # use survstat_stats::descriptive::sample_std_dev;
/// assert_eq!(sample_std_dev(&[2.0, 4.0]), Some(2.0_f64.sqrt()));
/// assert_eq!(sample_std_dev(&[2.0]), None);
/// ```
#[must_use]
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    sample_variance_around(values, mean).map(f64::sqrt)
}

/// Number of distinct values, treating `-0.0` and `0.0` as equal.
#[must_use]
pub fn distinct_count(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup_by(|a, b| a == b);
    sorted.len()
}

#[expect(clippy::cast_precision_loss)]
fn sample_variance_around(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let sum_sq = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    Some(sum_sq / (values.len() - 1) as f64)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_empty_values() {
        assert!(DescriptiveStats::new(Vec::<f64>::new()).is_none());
        assert_eq!(mean(&[]), None);
        assert_eq!(sample_std_dev(&[]), None);
    }

    #[test]
    fn test_single_value_has_no_dispersion() {
        let stats = DescriptiveStats::new([7.5]).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.min, 7.5);
        assert_eq!(stats.max, 7.5);
        assert_eq!(stats.median, 7.5);
        assert_eq!(stats.variance, None);
        assert_eq!(stats.std_dev, None);
    }

    #[test]
    fn test_even_count_median_is_midpoint() {
        let stats = DescriptiveStats::new([10.0, 20.0, 15.0, 30.0]).unwrap();
        assert_relative_eq!(stats.median, 17.5);
    }

    #[test]
    fn test_sample_std_dev_uses_n_minus_one() {
        // values 0.5, 1.5, 3.0: mean 5/3, squared deviations sum to 19/6
        let std = sample_std_dev(&[0.5, 1.5, 3.0]).unwrap();
        assert_relative_eq!(std, (19.0_f64 / 12.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_distinct_count() {
        assert_eq!(distinct_count(&[1.0, 1.0, 2.0, -0.0, 0.0]), 3);
        assert_eq!(distinct_count(&[]), 0);
    }

    #[test]
    fn test_unordered_input_is_sorted_first() {
        let stats = DescriptiveStats::new([4.0, -1.0, 9.0]).unwrap();
        assert_eq!(stats.min, -1.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.median, 4.0);
        assert_relative_eq!(stats.mean, 4.0);
    }
}
