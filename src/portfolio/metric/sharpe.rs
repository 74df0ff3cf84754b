//! # Sharpe Ratio
//!
//! $$
//! S(\mathbf w)=\frac{\mathbf w^\top\bar{\mathbf r}-r_f}{\sqrt{\max(\mathbf w^\top C\,\mathbf w,\ 10^{-3})}}
//! $$
//!
//! Daily mean return over the window, not annualized. The risk term uses the
//! correlation matrix `C` of daily returns rather than their covariance, so
//! it is unitless and differs in scale from Markowitz variance.

use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;

use super::Metric;
use super::MetricFailure;
use super::MetricValue;
use crate::error::Result;
use crate::portfolio::config::MetricKind;
use crate::portfolio::config::PortfolioConfig;
use crate::portfolio::data::correlation_matrix;
use crate::portfolio::data::mean_returns;
use crate::portfolio::data::PriceSeries;

/// Floor applied to a non-positive risk term.
pub const VARIANCE_FLOOR: f64 = 0.001;

#[derive(Clone, Debug)]
pub struct SharpeRatio {
  prices: PriceSeries,
  risk_free_rate: f64,
  /// Number of return rows in the window.
  periods: usize,
  mean_returns: Array1<f64>,
  correlation: Array2<f64>,
}

impl SharpeRatio {
  /// Build the metric over the configured tickers, in config order.
  pub fn new(config: &PortfolioConfig, prices: &PriceSeries) -> Result<Self> {
    let prices = prices.select(config.tickers())?;
    let returns = prices.simple_returns();

    Ok(Self {
      periods: returns.nrows(),
      mean_returns: mean_returns(&returns),
      correlation: correlation_matrix(&returns),
      risk_free_rate: config.risk_free_rate(),
      prices,
    })
  }

  /// Mean daily return of the weighted portfolio.
  pub fn expected_return(&self, weights: &[f64]) -> f64 {
    ArrayView1::from(weights).dot(&self.mean_returns)
  }

  /// `w' C w` before flooring.
  pub fn correlation_risk(&self, weights: &[f64]) -> f64 {
    let w = ArrayView1::from(weights);
    w.dot(&self.correlation.dot(&w))
  }

  pub fn correlation(&self) -> &Array2<f64> {
    &self.correlation
  }

  pub fn mean_returns(&self) -> &Array1<f64> {
    &self.mean_returns
  }
}

impl Metric for SharpeRatio {
  fn kind(&self) -> MetricKind {
    MetricKind::SharpeRatio
  }

  fn prices(&self) -> &PriceSeries {
    &self.prices
  }

  fn compute(&self, weights: &[f64]) -> MetricValue {
    let n = self.mean_returns.len();
    if weights.len() != n {
      return MetricValue::fallback(MetricFailure::DimensionMismatch {
        expected: n,
        got: weights.len(),
      });
    }

    if self.periods == 0 {
      return MetricValue::fallback(MetricFailure::EmptyWindow);
    }

    let expected = self.expected_return(weights);
    let mut risk = self.correlation_risk(weights);
    if !expected.is_finite() || risk.is_nan() {
      return MetricValue::fallback(MetricFailure::NonFinite);
    }

    if risk <= 0.0 {
      risk = VARIANCE_FLOOR;
    }

    MetricValue::checked((expected - self.risk_free_rate) / risk.sqrt())
  }
}
