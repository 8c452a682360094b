//! Statistical primitives for survival dataset summaries.
//!
//! This crate provides the numerical building blocks used by the dataset
//! statistics engine:
//!
//! - **Descriptive statistics**: mean, median, sample variance and standard deviation
//! - **Correlation**: Pearson product-moment correlation between paired samples
//! - **Histogram generation**: equal-width bins that can be shared between sub-samples
//! - **Normal tail probabilities**: complementary error function and two-sided p-values
//! - **Cox regression**: single-covariate proportional-hazards fit with Wald p-value
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`correlation`]: Linear association between two samples
//! - [`histogram`]: Histogram construction for visualizing data distributions
//! - [`normal`]: Standard normal tail probabilities
//! - [`cox`]: Cox proportional-hazards fitting for a single covariate
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use survstat_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 2.5);
//! assert_eq!(stats.median, 2.5);
//! ```
//!
//! ## Stratifying a histogram
//!
//! ```
//! use survstat_stats::histogram::{BinEdges, Histogram};
//!
//! let times = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let edges = BinEdges::spanning(times, 2).unwrap();
//! let all = Histogram::with_edges(times, &edges);
//! let events = Histogram::with_edges([1.0, 5.0], &edges);
//! assert_eq!(all.counts(), vec![2, 3]);
//! assert_eq!(events.counts(), vec![1, 1]);
//! ```
//!
//! ## Fitting a Cox model
//!
//! ```
//! use survstat_stats::cox::{CoxFitter, PartialLikelihoodCox};
//!
//! let time = [5.0, 8.0, 12.0, 3.0, 9.0, 14.0, 2.0, 11.0];
//! let event = [true, true, false, true, true, false, true, true];
//! let dose = [2.0, 1.0, 0.5, 3.0, 1.5, 0.0, 2.5, 0.5];
//! let fit = PartialLikelihoodCox::default()
//!     .fit_single_covariate(&time, &event, &dose)
//!     .unwrap();
//! assert!(fit.p_value > 0.0 && fit.p_value <= 1.0);
//! ```

pub mod correlation;
pub mod cox;
pub mod descriptive;
pub mod histogram;
pub mod normal;
