//! # Portfolio Optimizer
//!
//! $$
//! \min_{\mathbf{x}\in\mathbb R^n} -m\big(\operatorname{softmax}(\mathbf x)\big),
//! \qquad \operatorname{softmax}(\mathbf x)\in\Delta^{n-1}
//! $$
//!
//! Long-only simplex search. The softmax map keeps every candidate inside
//! `0 <= w_i <= 1, sum(w) = 1`, so the Nelder-Mead solver works on an
//! unconstrained problem and never needs derivatives of the metric.

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::State;
use argmin::core::TerminationReason;
use argmin::core::TerminationStatus;
use argmin::solver::neldermead::NelderMead;
use impl_new_derive::ImplNew;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::config::PortfolioConfig;
use super::data::MIN_RETURN_ROWS;
use super::metric::Metric;
use super::metric::MetricValue;
use super::types::WeightVector;
use crate::error::PortfolioError;
use crate::error::Result;

/// Minimum metric gain over the uniform start for the solver result to be kept.
pub const IMPROVEMENT_TOLERANCE: f64 = 1e-12;

/// Cost the solver sees for an evaluation that fell back. Worse than any
/// computed score, so the search steers away from failing regions.
pub const FALLBACK_PENALTY: f64 = 1e6;

/// Solver settings.
#[derive(ImplNew, Clone, Debug, PartialEq)]
pub struct OptimizerConfig {
  /// Iteration budget before the best iterate is returned unconverged.
  pub max_iters: u64,
  /// Standard deviation of simplex costs at which the search stops.
  pub sd_tolerance: f64,
}

impl Default for OptimizerConfig {
  fn default() -> Self {
    Self {
      max_iters: 5000,
      sd_tolerance: 1e-10,
    }
  }
}

/// Result of one optimization.
#[derive(Clone, Debug, PartialEq)]
pub struct Optimization {
  /// Best weights found, one per configured ticker.
  pub weights: WeightVector,
  /// Whether the solver met its tolerance within the budget.
  pub converged: bool,
  /// Solver iterations performed.
  pub iterations: u64,
  /// Metric at `weights`.
  pub metric_value: MetricValue,
  /// Objective evaluations that used the metric fallback.
  pub fallback_evaluations: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Optimizer {
  config: OptimizerConfig,
}

fn softmax(x: &[f64]) -> Vec<f64> {
  if x.is_empty() {
    return Vec::new();
  }

  let max_x = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let exps: Vec<f64> = x.iter().map(|&v| (v - max_x).exp()).collect();
  let sum: f64 = exps.iter().sum();

  if sum < 1e-15 || !sum.is_finite() {
    vec![1.0 / x.len() as f64; x.len()]
  } else {
    exps.iter().map(|&e| e / sum).collect()
  }
}

/// Whether `candidate` should replace `start`. A computed value always beats
/// a fallback; otherwise the candidate must gain more than the tolerance.
fn improves_on(candidate: &MetricValue, start: &MetricValue) -> bool {
  match (candidate.is_fallback(), start.is_fallback()) {
    (true, false) => false,
    (false, true) => true,
    _ => candidate.score() > start.score() + IMPROVEMENT_TOLERANCE,
  }
}

/// Negated metric over softmax coordinates.
struct NegatedMetric<'a> {
  metric: &'a dyn Metric,
  fallbacks: &'a AtomicUsize,
}

impl CostFunction for NegatedMetric<'_> {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    let value = self.metric.compute(&softmax(x));
    if value.is_fallback() {
      self.fallbacks.fetch_add(1, Ordering::Relaxed);
      return Ok(FALLBACK_PENALTY);
    }

    let score = value.score();
    Ok(if score.is_finite() { -score } else { FALLBACK_PENALTY })
  }
}

impl Optimizer {
  pub fn new(config: OptimizerConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &OptimizerConfig {
    &self.config
  }

  /// Find weights maximizing `metric` for the tickers of `config`.
  ///
  /// Fails before any solver work with [`PortfolioError::EmptyUniverse`] for
  /// an empty universe and [`PortfolioError::InsufficientData`] when the
  /// metric's prices hold fewer than two rows. Exhausting the iteration
  /// budget is not an error: the best iterate comes back with
  /// `converged = false`.
  pub fn optimize(&self, config: &PortfolioConfig, metric: &dyn Metric) -> Result<Optimization> {
    let n = config.tickers().len();
    if n == 0 {
      return Err(PortfolioError::EmptyUniverse);
    }

    let rows = metric.prices().len();
    if rows < MIN_RETURN_ROWS {
      return Err(PortfolioError::InsufficientData {
        rows,
        required: MIN_RETURN_ROWS,
      });
    }

    let assets = metric.prices().tickers().len();
    if assets != n {
      return Err(PortfolioError::InvalidConfig(format!(
        "metric covers {assets} assets but {n} tickers are configured"
      )));
    }

    if n == 1 {
      let weights = WeightVector::uniform(1);
      let metric_value = metric.compute(&weights);
      debug!(ticker = %config.tickers()[0], "single asset universe, full allocation");
      return Ok(Optimization {
        weights,
        converged: true,
        iterations: 0,
        metric_value,
        fallback_evaluations: usize::from(metric_value.is_fallback()),
      });
    }

    debug!(
      assets = n,
      rows,
      metric = %metric.kind(),
      max_iters = self.config.max_iters,
      "starting simplex search"
    );

    let fallbacks = AtomicUsize::new(0);
    let cost = NegatedMetric {
      metric,
      fallbacks: &fallbacks,
    };

    // x = 0 is the uniform starting allocation
    let x0 = vec![0.0; n];
    let mut simplex = Vec::with_capacity(n + 1);
    simplex.push(x0.clone());
    for i in 0..n {
      let mut point = x0.clone();
      point[i] = 1.0;
      simplex.push(point);
    }

    let solver = NelderMead::new(simplex).with_sd_tolerance(self.config.sd_tolerance);
    let (raw, converged, iterations) = match solver {
      Ok(solver) => {
        match Executor::new(cost, solver)
          .configure(|state| state.max_iters(self.config.max_iters))
          .run()
        {
          Ok(res) => {
            let iterations = res.state().get_iter();
            let converged = matches!(
              res.state().get_termination_status(),
              TerminationStatus::Terminated(TerminationReason::SolverConverged)
            );
            let best_x = res.state.best_param.unwrap_or(x0);
            (softmax(&best_x), converged, iterations)
          }
          Err(e) => {
            warn!(error = %e, "solver failed, returning uniform weights");
            (vec![1.0 / n as f64; n], false, 0)
          }
        }
      }
      Err(e) => {
        warn!(error = %e, "invalid solver settings, returning uniform weights");
        (vec![1.0 / n as f64; n], false, 0)
      }
    };

    let mut weights = WeightVector::from_raw(raw);
    let mut metric_value = metric.compute(&weights);

    // a flat objective keeps the uniform start, which keeps ties symmetric
    let start = WeightVector::uniform(n);
    let start_value = metric.compute(&start);
    if !improves_on(&metric_value, &start_value) {
      weights = start;
      metric_value = start_value;
    }

    let fallback_evaluations = fallbacks.load(Ordering::Relaxed);

    if converged {
      info!(iterations, score = metric_value.score(), "optimization converged");
    } else {
      warn!(
        iterations,
        score = metric_value.score(),
        "optimization did not converge, returning best iterate"
      );
    }

    Ok(Optimization {
      weights,
      converged,
      iterations,
      metric_value,
      fallback_evaluations,
    })
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use chrono::NaiveDate;

  use super::*;
  use crate::portfolio::config::MetricKind;
  use crate::portfolio::data::PriceSeries;
  use crate::portfolio::metric::sharpe::SharpeRatio;
  use crate::portfolio::metric::MetricFailure;
  use crate::portfolio::synthetic::FallbackPriceGenerator;

  /// `w0 - 1` up to `w0 = 0.6`, failing beyond.
  struct Cliff {
    prices: PriceSeries,
  }

  impl Metric for Cliff {
    fn kind(&self) -> MetricKind {
      MetricKind::SharpeRatio
    }

    fn prices(&self) -> &PriceSeries {
      &self.prices
    }

    fn compute(&self, weights: &[f64]) -> MetricValue {
      if weights[0] <= 0.6 {
        MetricValue::Computed(weights[0] - 1.0)
      } else {
        MetricValue::fallback(MetricFailure::NonFinite)
      }
    }
  }

  fn dates(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    (0..n)
      .map(|i| start + chrono::Duration::days(i as i64))
      .collect()
  }

  fn config(tickers: &[&str], rf: f64) -> PortfolioConfig {
    PortfolioConfig::new(
      10_000.0,
      tickers.iter().map(|t| t.to_string()).collect(),
      rf,
      MetricKind::SharpeRatio,
    )
    .unwrap()
  }

  fn series(columns: Vec<(&str, Vec<f64>)>) -> PriceSeries {
    let rows = columns[0].1.len();
    PriceSeries::from_columns(
      dates(rows),
      columns
        .into_iter()
        .map(|(t, p)| (t.to_string(), p))
        .collect(),
    )
    .unwrap()
  }

  fn trending() -> PriceSeries {
    series(vec![
      ("A", vec![100.0, 101.0, 102.0, 103.0, 104.0, 105.0]),
      ("B", vec![100.0, 99.0, 98.0, 97.0, 96.0, 95.0]),
    ])
  }

  #[test]
  fn softmax_lies_on_simplex() {
    let w = softmax(&[1000.0, -1000.0, 0.0]);
    assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    assert!(w.iter().all(|&x| (0.0..=1.0).contains(&x)));
    assert_eq!(softmax(&[0.0, 0.0]), vec![0.5, 0.5]);
  }

  #[test]
  fn rising_asset_gets_more_weight() {
    let config = config(&["A", "B"], 0.0);
    let metric = SharpeRatio::new(&config, &trending()).unwrap();
    let result = Optimizer::default().optimize(&config, &metric).unwrap();

    assert!(result.weights.is_feasible());
    assert!(result.weights[0] > result.weights[1]);
    assert!(result.metric_value.score() > 0.0);
    assert_eq!(result.fallback_evaluations, 0);
  }

  #[test]
  fn single_asset_gets_everything() {
    let config = config(&["AAPL"], 0.045);
    let prices = series(vec![("AAPL", vec![190.0, 188.0, 192.0, 191.5])]);
    let metric = SharpeRatio::new(&config, &prices).unwrap();
    let result = Optimizer::default().optimize(&config, &metric).unwrap();

    assert_eq!(result.weights.as_slice(), &[1.0]);
    assert!(result.converged);
  }

  #[test]
  fn identical_assets_are_swap_invariant() {
    let path = vec![50.0, 51.0, 50.5, 52.0, 53.5, 53.0, 54.0];
    let prices = series(vec![("X", path.clone()), ("Y", path)]);

    let xy = config(&["X", "Y"], 0.0);
    let yx = config(&["Y", "X"], 0.0);
    let a = Optimizer::default()
      .optimize(&xy, &SharpeRatio::new(&xy, &prices).unwrap())
      .unwrap();
    let b = Optimizer::default()
      .optimize(&yx, &SharpeRatio::new(&yx, &prices).unwrap())
      .unwrap();

    assert_abs_diff_eq!(a.weights[0], b.weights[1], epsilon = 1e-6);
    assert_abs_diff_eq!(a.weights[1], b.weights[0], epsilon = 1e-6);
  }

  #[test]
  fn repeated_runs_are_deterministic() {
    let config = config(&["A", "B", "C", "D"], 0.0);
    let prices = FallbackPriceGenerator::seeded(11)
      .generate(
        config.tickers(),
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2023, 6, 30).unwrap(),
      )
      .unwrap();
    let metric = SharpeRatio::new(&config, &prices).unwrap();

    let first = Optimizer::default().optimize(&config, &metric).unwrap();
    let second = Optimizer::default().optimize(&config, &metric).unwrap();

    assert!(first.weights.is_feasible());
    for (a, b) in first.weights.iter().zip(second.weights.iter()) {
      assert_abs_diff_eq!(a, b, epsilon = 1e-6);
    }
  }

  #[test]
  fn optimum_beats_uniform_start() {
    let config = config(&["A", "B", "C"], 0.0);
    let prices = FallbackPriceGenerator::seeded(3)
      .generate(
        config.tickers(),
        NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2022, 12, 31).unwrap(),
      )
      .unwrap();
    let metric = SharpeRatio::new(&config, &prices).unwrap();
    let result = Optimizer::default().optimize(&config, &metric).unwrap();

    let uniform = metric.compute(&[1.0 / 3.0; 3]).score();
    assert!(result.metric_value.score() >= uniform - 1e-12);
  }

  #[test]
  fn tiny_budget_reports_unconverged() {
    let config = config(&["A", "B"], 0.0);
    let metric = SharpeRatio::new(&config, &trending()).unwrap();
    let result = Optimizer::new(OptimizerConfig::new(2, 1e-30))
      .optimize(&config, &metric)
      .unwrap();

    assert!(!result.converged);
    assert!(result.weights.is_feasible());
  }

  #[test]
  fn single_row_is_insufficient() {
    let config = config(&["A", "B"], 0.0);
    let prices = series(vec![("A", vec![100.0]), ("B", vec![50.0])]);
    let metric = SharpeRatio::new(&config, &prices).unwrap();
    let err = Optimizer::default().optimize(&config, &metric).unwrap_err();

    assert_eq!(err, PortfolioError::InsufficientData { rows: 1, required: 2 });
  }

  #[test]
  fn mismatched_metric_is_rejected() {
    let pair = config(&["A", "B"], 0.0);
    let single = config(&["A"], 0.0);
    let metric = SharpeRatio::new(&single, &trending()).unwrap();
    let err = Optimizer::default().optimize(&pair, &metric).unwrap_err();

    assert!(matches!(err, PortfolioError::InvalidConfig(_)));
  }

  #[test]
  fn failing_region_never_wins_over_computed_scores() {
    let config = config(&["A", "B"], 0.0);
    let metric = Cliff { prices: trending() };
    let result = Optimizer::default().optimize(&config, &metric).unwrap();

    assert!(!result.metric_value.is_fallback());
    assert!(result.weights[0] <= 0.6);
    assert!(result.metric_value.score() >= -0.5);
    assert!(result.fallback_evaluations > 0);
  }

  #[test]
  fn computed_start_beats_fallback_candidate() {
    let computed = MetricValue::Computed(-3.0);
    let failed = MetricValue::fallback(MetricFailure::NonFinite);

    assert!(!improves_on(&failed, &computed));
    assert!(improves_on(&computed, &failed));
    assert!(!improves_on(&MetricValue::Computed(1.0), &MetricValue::Computed(1.0)));
  }
}
