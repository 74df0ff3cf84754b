//! # Portfolio Types
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}\in\Delta^{n-1}} \frac{\mathbb E[R_p]-r_f}{\sqrt{\mathbf{w}^\top C\,\mathbf{w}}}
//! $$
//!
//! Shared value types and result containers for portfolio optimization.

use std::fmt::Display;
use std::ops::Deref;

use serde::Serialize;

use super::performance::Allocation;
use super::performance::Performance;

/// Tolerance below which negative solver weights are treated as zero.
pub const NEGATIVE_WEIGHT_TOLERANCE: f64 = 1e-9;

/// Allowed absolute deviation of the weight sum from one.
pub const SUM_TOLERANCE: f64 = 1e-6;

/// Long-only weights on the unit simplex, one per ticker in config order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WeightVector(Vec<f64>);

impl WeightVector {
  /// Uniform `1/n` weights.
  pub fn uniform(n: usize) -> Self {
    if n == 0 {
      return Self(Vec::new());
    }
    Self(vec![1.0 / n as f64; n])
  }

  /// Project raw solver output onto the simplex.
  ///
  /// Tiny negatives are clipped to zero, entries are capped at one and the
  /// vector is renormalized. A vector with no usable mass becomes uniform.
  pub fn from_raw(raw: Vec<f64>) -> Self {
    let n = raw.len();
    let clipped: Vec<f64> = raw
      .into_iter()
      .map(|w| {
        if !w.is_finite() || w < 0.0 {
          0.0
        } else {
          w.min(1.0)
        }
      })
      .collect();

    let total: f64 = clipped.iter().sum();
    if total <= 1e-15 || !total.is_finite() {
      return Self::uniform(n);
    }

    Self(clipped.into_iter().map(|w| w / total).collect())
  }

  /// Borrow the weights.
  pub fn as_slice(&self) -> &[f64] {
    &self.0
  }

  /// Consume into the inner vector.
  pub fn into_inner(self) -> Vec<f64> {
    self.0
  }

  /// Sum of all weights.
  pub fn total(&self) -> f64 {
    self.0.iter().sum()
  }

  /// Whether the vector lies on the simplex within tolerance.
  pub fn is_feasible(&self) -> bool {
    !self.0.is_empty()
      && (self.total() - 1.0).abs() <= SUM_TOLERANCE
      && self
        .0
        .iter()
        .all(|&w| w >= -NEGATIVE_WEIGHT_TOLERANCE && w <= 1.0 + SUM_TOLERANCE)
  }
}

impl Deref for WeightVector {
  type Target = [f64];

  fn deref(&self) -> &Self::Target {
    &self.0
  }
}

/// Where the price series used for a request came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataProvenance {
  /// Fetched from the price source.
  Real,
  /// Generated by the fallback random walk.
  Synthetic,
}

impl Display for DataProvenance {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      DataProvenance::Real => write!(f, "real"),
      DataProvenance::Synthetic => write!(f, "synthetic"),
    }
  }
}

/// Non-aborting degradation reported next to a best-effort result.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
  /// Prices were generated because the source failed.
  SyntheticData { reason: String },
  /// The solver exhausted its iteration budget.
  SolverNonConvergence { iterations: u64 },
  /// The risk-free rate lookup failed and the default was used.
  RiskFreeRateFallback { reason: String },
  /// Some objective evaluations used the metric fallback score.
  MetricFallback { evaluations: usize },
}

impl Display for Warning {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Warning::SyntheticData { reason } => {
        write!(f, "using synthetic price data ({reason})")
      }
      Warning::SolverNonConvergence { iterations } => write!(
        f,
        "solver did not converge after {iterations} iterations, returning best iterate"
      ),
      Warning::RiskFreeRateFallback { reason } => {
        write!(f, "using default risk-free rate ({reason})")
      }
      Warning::MetricFallback { evaluations } => write!(
        f,
        "{evaluations} metric evaluations failed and used the fallback score"
      ),
    }
  }
}

/// Output of [`super::PortfolioEngine::run_optimization`].
#[derive(Clone, Debug, Serialize)]
pub struct OptimizationReport {
  /// Tickers in the order of `weights`.
  pub tickers: Vec<String>,
  /// Optimized weights.
  pub weights: WeightVector,
  /// Whether the solver met its tolerance.
  pub converged: bool,
  /// Origin of the price series.
  pub provenance: DataProvenance,
  /// Risk-free rate the metric was evaluated with.
  pub risk_free_rate: f64,
  /// Metric value at the returned weights.
  pub metric_value: f64,
  /// Whether `metric_value` is the fallback score rather than a computed one.
  pub metric_fallback: bool,
  /// Solver iterations.
  pub iterations: u64,
  /// Capital split per ticker.
  pub allocation: Vec<Allocation>,
  /// Money gained over the window by holding the allocation.
  pub capital_return: f64,
  /// Historical performance of the optimized portfolio.
  pub performance: Performance,
  /// Degradations encountered on the way.
  pub warnings: Vec<Warning>,
}

impl OptimizationReport {
  /// Weight for `ticker`, if it is part of the universe.
  pub fn weight_of(&self, ticker: &str) -> Option<f64> {
    self
      .tickers
      .iter()
      .position(|t| t == ticker)
      .map(|i| self.weights[i])
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn from_raw_clips_tiny_negatives_and_renormalizes() {
    let w = WeightVector::from_raw(vec![0.6, -1e-12, 0.4000001]);
    assert_eq!(w[1], 0.0);
    assert!((w.total() - 1.0).abs() < 1e-12);
    assert!(w.is_feasible());
  }

  #[test]
  fn from_raw_without_mass_is_uniform() {
    let w = WeightVector::from_raw(vec![0.0, f64::NAN, -3.0]);
    assert_eq!(w.as_slice(), &[1.0 / 3.0; 3]);
  }

  #[test]
  fn empty_vector_is_not_feasible() {
    assert!(!WeightVector::uniform(0).is_feasible());
    assert!(WeightVector::uniform(4).is_feasible());
  }

  #[test]
  fn warnings_render_readable_messages() {
    let w = Warning::SolverNonConvergence { iterations: 5000 };
    assert!(w.to_string().contains("5000 iterations"));
    assert_eq!(DataProvenance::Synthetic.to_string(), "synthetic");
  }
}
