//! Single-covariate Cox proportional-hazards regression
//!
//! Fits `h(t | x) = h0(t) * exp(beta * x)` by maximizing the partial
//! log-likelihood with Efron's approximation for tied event times, and
//! reports the Wald test of `beta = 0`.
//!
//! The covariate is standardized before fitting. The reported coefficient and
//! standard error are mapped back to the original scale; the Wald statistic
//! and p-value are scale invariant.
//!
//! # Examples
//!
//! ```
//! use survstat_stats::cox::{CoxFitter, PartialLikelihoodCox};
//!
//! let time = [2.0, 3.0, 4.0, 5.0, 8.0, 9.0, 11.0, 12.0];
//! let event = [true, true, true, false, true, true, false, true];
//! let age = [70.0, 52.0, 66.0, 48.0, 61.0, 45.0, 59.0, 50.0];
//!
//! let fit = PartialLikelihoodCox::default()
//!     .with_max_iterations(100)
//!     .fit_single_covariate(&time, &event, &age)
//!     .unwrap();
//! assert!(fit.coefficient > 0.0); // older subjects fail earlier
//! ```

use crate::normal;

/// Result of a single-covariate Cox fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoxFit {
    /// Estimated log hazard ratio per unit of the covariate.
    pub coefficient: f64,
    /// Standard error of the coefficient (inverse observed information).
    pub standard_error: f64,
    /// Wald statistic `coefficient / standard_error`.
    pub z: f64,
    /// Two-sided p-value of the Wald test.
    pub p_value: f64,
    /// Partial log-likelihood at the estimate.
    pub log_likelihood: f64,
    /// Newton iterations performed.
    pub iterations: usize,
    /// Whether the step size dropped below the tolerance.
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum CoxFitError {
    #[display("time, event and covariate lengths differ ({time}, {event}, {covariate})")]
    LengthMismatch {
        time: usize,
        event: usize,
        covariate: usize,
    },
    #[display("no observations to fit")]
    Empty,
    #[display("non-finite value in {column}")]
    NonFinite { column: &'static str },
    #[display("no observed events")]
    NoEvents,
    #[display("covariate has zero variance")]
    ConstantCovariate,
    #[display("observed information is not positive at beta = {beta}")]
    SingularInformation { beta: f64 },
    #[display("partial likelihood could not be improved from beta = {beta}")]
    Diverged { beta: f64 },
}

/// Capability to fit a Cox model with one covariate.
pub trait CoxFitter {
    /// Fits the model to `(time, event, covariate)` triples.
    ///
    /// `event[i]` is `true` when the event was observed for subject `i` and
    /// `false` when the subject was censored at `time[i]`.
    fn fit_single_covariate(
        &self,
        time: &[f64],
        event: &[bool],
        covariate: &[f64],
    ) -> Result<CoxFit, CoxFitError>;
}

/// Newton-Raphson maximizer of the Efron partial likelihood.
#[derive(Debug, Clone)]
pub struct PartialLikelihoodCox {
    max_iterations: usize,
    tolerance: f64,
}

impl Default for PartialLikelihoodCox {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-9,
        }
    }
}

impl PartialLikelihoodCox {
    /// max Newton steps before accepting the current estimate
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// step size (on the standardized scale) treated as converged
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.abs();
        self
    }
}

impl CoxFitter for PartialLikelihoodCox {
    #[expect(clippy::cast_precision_loss)]
    fn fit_single_covariate(
        &self,
        time: &[f64],
        event: &[bool],
        covariate: &[f64],
    ) -> Result<CoxFit, CoxFitError> {
        let risk_sets = RiskSets::new(time, event, covariate.len())?;
        if covariate.iter().any(|x| !x.is_finite()) {
            return Err(CoxFitError::NonFinite {
                column: "covariate",
            });
        }

        let n = covariate.len() as f64;
        let mean = covariate.iter().sum::<f64>() / n;
        let scale = (covariate.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();
        if scale <= f64::EPSILON * mean.abs().max(1.0) {
            return Err(CoxFitError::ConstantCovariate);
        }
        let x = covariate
            .iter()
            .map(|v| (v - mean) / scale)
            .collect::<Vec<_>>();

        let mut beta = 0.0;
        let mut current = risk_sets.evaluate(&x, beta);
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            iterations += 1;
            if current.information.is_nan() || current.information <= 0.0 {
                return Err(CoxFitError::SingularInformation { beta });
            }

            // Newton step, halved until the likelihood does not decrease
            let mut step = current.score / current.information;
            let mut candidate = risk_sets.evaluate(&x, beta + step);
            let mut halvings = 0;
            while !candidate.log_likelihood.is_finite()
                || candidate.log_likelihood < current.log_likelihood - 1e-12
            {
                halvings += 1;
                if halvings > 40 {
                    return Err(CoxFitError::Diverged { beta });
                }
                step *= 0.5;
                candidate = risk_sets.evaluate(&x, beta + step);
            }

            beta += step;
            current = candidate;
            if step.abs() < self.tolerance {
                converged = true;
                break;
            }
        }

        if !current.information.is_finite() || current.information <= 0.0 {
            return Err(CoxFitError::SingularInformation { beta });
        }

        let standard_error_std = current.information.sqrt().recip();
        let z = beta / standard_error_std;
        Ok(CoxFit {
            coefficient: beta / scale,
            standard_error: standard_error_std / scale,
            z,
            p_value: normal::two_sided_p_value(z),
            log_likelihood: current.log_likelihood,
            iterations,
            converged,
        })
    }
}

/// Efron partial log-likelihood of `beta` for the raw (unstandardized) covariate.
///
/// ```
/// # use survstat_stats::cox::log_partial_likelihood;
/// // Two subjects, both events, no ties: ll(0) = -ln 2
/// let ll = log_partial_likelihood(&[1.0, 2.0], &[true, true], &[0.0, 1.0], 0.0).unwrap();
/// assert!((ll + 2.0_f64.ln()).abs() < 1e-12);
/// ```
pub fn log_partial_likelihood(
    time: &[f64],
    event: &[bool],
    covariate: &[f64],
    beta: f64,
) -> Result<f64, CoxFitError> {
    let risk_sets = RiskSets::new(time, event, covariate.len())?;
    Ok(risk_sets.evaluate(covariate, beta).log_likelihood)
}

/// Log-likelihood with its first and (negated) second derivative.
#[derive(Debug, Clone, Copy)]
struct Evaluation {
    log_likelihood: f64,
    score: f64,
    information: f64,
}

/// Subjects grouped by distinct time, latest first, so that the risk set of
/// each group is the running union of all groups visited so far.
#[derive(Debug)]
struct RiskSets {
    groups: Vec<TimeGroup>,
}

#[derive(Debug)]
struct TimeGroup {
    members: Vec<usize>,
    events: Vec<usize>,
}

impl RiskSets {
    fn new(time: &[f64], event: &[bool], n_covariate: usize) -> Result<Self, CoxFitError> {
        if time.len() != event.len() || time.len() != n_covariate {
            return Err(CoxFitError::LengthMismatch {
                time: time.len(),
                event: event.len(),
                covariate: n_covariate,
            });
        }
        if time.is_empty() {
            return Err(CoxFitError::Empty);
        }
        if time.iter().any(|t| !t.is_finite()) {
            return Err(CoxFitError::NonFinite { column: "time" });
        }
        if !event.iter().any(|&e| e) {
            return Err(CoxFitError::NoEvents);
        }

        let mut order = (0..time.len()).collect::<Vec<_>>();
        order.sort_by(|&a, &b| time[b].total_cmp(&time[a]));

        let mut groups: Vec<TimeGroup> = vec![];
        let mut last_time = None;
        for i in order {
            if last_time != Some(time[i]) {
                groups.push(TimeGroup {
                    members: vec![],
                    events: vec![],
                });
                last_time = Some(time[i]);
            }
            if let Some(group) = groups.last_mut() {
                group.members.push(i);
                if event[i] {
                    group.events.push(i);
                }
            }
        }

        Ok(Self { groups })
    }

    #[expect(clippy::cast_precision_loss)]
    fn evaluate(&self, x: &[f64], beta: f64) -> Evaluation {
        // Shift the linear predictor so the largest weight is exp(0)
        let shift = x
            .iter()
            .map(|&xi| beta * xi)
            .fold(f64::NEG_INFINITY, f64::max);
        let weight = |i: usize| (beta * x[i] - shift).exp();

        let (mut s0, mut s1, mut s2) = (0.0, 0.0, 0.0);
        let mut log_likelihood = 0.0;
        let mut score = 0.0;
        let mut information = 0.0;

        for group in &self.groups {
            for &i in &group.members {
                let w = weight(i);
                s0 += w;
                s1 += w * x[i];
                s2 += w * x[i] * x[i];
            }
            if group.events.is_empty() {
                continue;
            }

            let (mut d0, mut d1, mut d2) = (0.0, 0.0, 0.0);
            for &i in &group.events {
                let w = weight(i);
                d0 += w;
                d1 += w * x[i];
                d2 += w * x[i] * x[i];
                log_likelihood += beta * x[i];
                score += x[i];
            }

            let ties = group.events.len() as f64;
            for l in 0..group.events.len() {
                let frac = l as f64 / ties;
                let phi0 = s0 - frac * d0;
                let phi1 = s1 - frac * d1;
                let phi2 = s2 - frac * d2;
                let mean = phi1 / phi0;
                log_likelihood -= phi0.ln() + shift;
                score -= mean;
                information += phi2 / phi0 - mean * mean;
            }
        }

        Evaluation {
            log_likelihood,
            score,
            information,
        }
    }
}
