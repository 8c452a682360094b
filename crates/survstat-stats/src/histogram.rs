use std::ops::Range;

/// Error raised when histogram bin edges cannot be constructed.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum HistogramError {
    #[display("cannot build histogram bins from an empty sample")]
    EmptySample,
    #[display("histogram needs at least one bin")]
    NoBins,
    #[display("histogram range [{min}, {max}] has no finite width")]
    NonFiniteRange { min: f64, max: f64 },
}

/// Equal-width bin boundaries spanning a closed interval.
///
/// The edges are computed once and can be reused to histogram several
/// sub-samples, which guarantees that per-bin counts of disjoint sub-samples
/// add up to the counts of their union.
///
/// All bins are half-open (`[start, end)`) except the last one, which also
/// includes its upper edge.
#[derive(Debug, Clone, PartialEq)]
pub struct BinEdges {
    edges: Vec<f64>,
}

impl BinEdges {
    /// Creates `num_bins` equal-width bins covering `[min, max]`.
    ///
    /// A degenerate interval (`min == max`) is widened to `[min - 0.5, max + 0.5]`
    /// so the single observed value falls in the middle bin.
    ///
    /// # Errors
    ///
    /// Fails if `num_bins` is zero or `max - min` is not finite.
    ///
    /// # Examples
    ///
    /// ```
    /// # use survstat_stats::histogram::BinEdges;
    /// let edges = BinEdges::equal_width(0.0, 10.0, 5).unwrap();
    /// assert_eq!(edges.edges(), &[0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    pub fn equal_width(min: f64, max: f64, num_bins: usize) -> Result<Self, HistogramError> {
        if num_bins == 0 {
            return Err(HistogramError::NoBins);
        }
        if !min.is_finite() || !max.is_finite() {
            return Err(HistogramError::NonFiniteRange { min, max });
        }

        let (first, last) = if min == max {
            (min - 0.5, max + 0.5)
        } else {
            (min, max)
        };

        let width = last - first;
        if !width.is_finite() {
            return Err(HistogramError::NonFiniteRange { min, max });
        }

        // Recompute each edge from the start point to avoid accumulating rounding error
        let step = width / num_bins as f64;
        let mut edges = (0..num_bins)
            .map(|i| first + step * i as f64)
            .collect::<Vec<_>>();
        edges.push(last);

        Ok(Self { edges })
    }

    /// Creates `num_bins` equal-width bins spanning the range of `values`.
    ///
    /// # Errors
    ///
    /// Fails if `values` is empty, contains NaN or infinities, spans a range
    /// wider than `f64::MAX`, or `num_bins` is zero.
    pub fn spanning<I>(values: I, num_bins: usize) -> Result<Self, HistogramError>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut seen = false;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in values {
            if value.is_nan() {
                return Err(HistogramError::NonFiniteRange {
                    min: value,
                    max: value,
                });
            }
            seen = true;
            min = min.min(value);
            max = max.max(value);
        }
        if !seen {
            return Err(HistogramError::EmptySample);
        }
        Self::equal_width(min, max, num_bins)
    }

    /// The `num_bins + 1` bin boundaries, in ascending order.
    #[must_use]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// The number of bins.
    #[must_use]
    pub fn num_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Returns the index of the bin containing `value`, or `None` if it lies
    /// outside the covered interval.
    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    #[must_use]
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        let num_bins = self.num_bins();
        let first = self.edges[0];
        let last = self.edges[num_bins];
        if !(first..=last).contains(&value) {
            return None;
        }

        // Estimate from the position within the range, then correct against the
        // stored edges so that boundary values land where the edges say they do.
        let position = (value - first) * (num_bins as f64 / (last - first));
        let mut idx = (position as usize).min(num_bins - 1);
        if value < self.edges[idx] {
            idx -= 1;
        } else if idx != num_bins - 1 && value >= self.edges[idx + 1] {
            idx += 1;
        }
        Some(idx)
    }

    /// Iterates over the bins as ranges.
    pub fn ranges(&self) -> impl Iterator<Item = Range<f64>> + '_ {
        self.edges.windows(2).map(|w| w[0]..w[1])
    }
}

/// A histogram representation of a dataset's distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// The bins comprising the histogram, in ascending order.
    pub bins: Vec<HistogramBin>,
}

/// A single bin in a histogram.
///
/// Each bin represents a range of values and the count of data points falling within that range.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    /// The range of values covered by this bin (inclusive start, exclusive end;
    /// the last bin of a histogram also includes its end).
    pub range: Range<f64>,
    /// The number of values that fall within this bin's range.
    pub count: u64,
}

impl Histogram {
    /// Creates a histogram with `num_bins` equal-width bins spanning the values.
    ///
    /// # Examples
    ///
    /// ```
    /// # use survstat_stats::histogram::Histogram;
    /// let histogram = Histogram::new([1.0, 2.0, 2.5, 4.0], 3).unwrap();
    /// assert_eq!(histogram.counts(), vec![1, 2, 1]);
    /// ```
    pub fn new<I>(values: I, num_bins: usize) -> Result<Self, HistogramError>
    where
        I: IntoIterator<Item = f64>,
    {
        let values = values.into_iter().collect::<Vec<_>>();
        let edges = BinEdges::spanning(values.iter().copied(), num_bins)?;
        Ok(Self::with_edges(values, &edges))
    }

    /// Counts `values` against pre-computed bin edges.
    ///
    /// Values outside the edges are ignored.
    #[must_use]
    pub fn with_edges<I>(values: I, edges: &BinEdges) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut bins = edges
            .ranges()
            .map(|range| HistogramBin { range, count: 0 })
            .collect::<Vec<_>>();
        for value in values {
            if let Some(idx) = edges.bin_index(value) {
                bins[idx].count += 1;
            }
        }
        Self { bins }
    }

    /// Per-bin counts, in bin order.
    #[must_use]
    pub fn counts(&self) -> Vec<u64> {
        self.bins.iter().map(|bin| bin.count).collect()
    }

    /// Total number of values counted.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.bins.iter().map(|bin| bin.count).sum()
    }
}

/// Square-root rule for the number of bins, clamped to `[min_bins, max_bins]`.
///
/// ```
/// # use survstat_stats::histogram::sqrt_bin_count;
/// assert_eq!(sqrt_bin_count(3, 5, 20), 5);
/// assert_eq!(sqrt_bin_count(150, 5, 20), 12);
/// assert_eq!(sqrt_bin_count(10_000, 5, 20), 20);
/// ```
#[expect(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#[must_use]
pub fn sqrt_bin_count(sample_count: usize, min_bins: usize, max_bins: usize) -> usize {
    let heuristic = (sample_count as f64).sqrt().round() as usize;
    heuristic.clamp(min_bins, max_bins)
}
