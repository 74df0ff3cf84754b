//! # Metrics
//!
//! $$
//! m : \Delta^{n-1} \to \mathbb R
//! $$
//!
//! Objective functions the optimizer maximizes. A metric owns its price
//! data and is a pure function of the weight vector.

pub mod factory;
pub mod sharpe;

use std::fmt::Display;

use super::config::MetricKind;
use super::data::PriceSeries;

/// Score substituted when an evaluation cannot be computed.
pub const FALLBACK_SCORE: f64 = 0.1;

/// Why an evaluation fell back to [`FALLBACK_SCORE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricFailure {
  /// Weight vector length differs from the number of assets.
  DimensionMismatch { expected: usize, got: usize },
  /// The price window holds no returns.
  EmptyWindow,
  /// An intermediate or the final value was NaN or infinite.
  NonFinite,
}

impl Display for MetricFailure {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      MetricFailure::DimensionMismatch { expected, got } => {
        write!(f, "expected {expected} weights, got {got}")
      }
      MetricFailure::EmptyWindow => write!(f, "price window has no returns"),
      MetricFailure::NonFinite => write!(f, "non-finite metric value"),
    }
  }
}

/// Outcome of one metric evaluation. Always carries a finite score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetricValue {
  Computed(f64),
  Fallback { value: f64, reason: MetricFailure },
}

impl MetricValue {
  /// Substitute [`FALLBACK_SCORE`] for a failed evaluation.
  pub fn fallback(reason: MetricFailure) -> Self {
    MetricValue::Fallback {
      value: FALLBACK_SCORE,
      reason,
    }
  }

  /// Wrap a computed value, demoting non-finite results to a fallback.
  pub fn checked(value: f64) -> Self {
    if value.is_finite() {
      MetricValue::Computed(value)
    } else {
      Self::fallback(MetricFailure::NonFinite)
    }
  }

  /// Finite score, whichever way it was obtained.
  pub fn score(&self) -> f64 {
    match *self {
      MetricValue::Computed(v) => v,
      MetricValue::Fallback { value, .. } => value,
    }
  }

  pub fn is_fallback(&self) -> bool {
    matches!(self, MetricValue::Fallback { .. })
  }
}

/// Scalar objective of a candidate weight vector.
pub trait Metric: Send + Sync {
  fn kind(&self) -> MetricKind;

  /// Price data the metric was built on.
  fn prices(&self) -> &PriceSeries;

  /// Evaluate `weights`. Must never panic and never yield a non-finite score.
  fn compute(&self, weights: &[f64]) -> MetricValue;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn checked_demotes_non_finite_values() {
    assert_eq!(MetricValue::checked(1.5), MetricValue::Computed(1.5));
    let v = MetricValue::checked(f64::NAN);
    assert!(v.is_fallback());
    assert_eq!(v.score(), FALLBACK_SCORE);
    assert!(MetricValue::checked(f64::INFINITY).is_fallback());
  }

  #[test]
  fn computed_value_equal_to_fallback_is_distinguishable() {
    let genuine = MetricValue::Computed(FALLBACK_SCORE);
    let substituted = MetricValue::fallback(MetricFailure::EmptyWindow);
    assert_eq!(genuine.score(), substituted.score());
    assert_ne!(genuine, substituted);
  }
}
