//! # Portfolio Performance
//!
//! $$
//! V_t=\frac{\sum_i w_i P_{t,i}}{\sum_i w_i P_{0,i}},\qquad
//! S_{\text{ann}}=\frac{252\,\bar r_p-r_f}{\sqrt{252}\,\sigma_{r_p}}
//! $$
//!
//! Capital allocation and the historical behaviour of a weighted portfolio
//! over its price window.

use chrono::NaiveDate;
use ndarray::ArrayView1;
use serde::Serialize;
use statrs::statistics::Statistics;

use super::config::PortfolioConfig;
use super::data::PriceSeries;
use crate::error::PortfolioError;
use crate::error::Result;

/// Trading days per year used for annualization.
pub const TRADING_DAYS: f64 = 252.0;

/// Capital assigned to one ticker.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Allocation {
  pub ticker: String,
  pub weight: f64,
  pub amount: f64,
}

/// Annualized statistics of the weighted portfolio value.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Performance {
  pub dates: Vec<NaiveDate>,
  /// Portfolio value divided by its first observation.
  pub normalized_value: Vec<f64>,
  pub annual_return: f64,
  pub annual_volatility: f64,
  /// Zero when the volatility is zero or undefined.
  pub sharpe: f64,
}

/// Split the configured capital according to `weights`.
pub fn allocate(config: &PortfolioConfig, weights: &[f64]) -> Vec<Allocation> {
  config
    .tickers()
    .iter()
    .zip(weights)
    .map(|(ticker, &weight)| Allocation {
      ticker: ticker.clone(),
      weight,
      amount: weight * config.capital(),
    })
    .collect()
}

fn check_width(prices: &PriceSeries, weights: &[f64]) -> Result<()> {
  if prices.tickers().len() != weights.len() {
    return Err(PortfolioError::InvalidConfig(format!(
      "{} weights for {} price columns",
      weights.len(),
      prices.tickers().len()
    )));
  }
  Ok(())
}

/// Normalized value path and annualized statistics of `weights` applied to
/// `prices`. Columns of `prices` must follow the order of `weights`.
pub fn historical_performance(prices: &PriceSeries, weights: &[f64], risk_free_rate: f64) -> Result<Performance> {
  check_width(prices, weights)?;
  if prices.is_empty() {
    return Ok(Performance::default());
  }

  let value = prices.prices().dot(&ArrayView1::from(weights));
  let first = value[0];
  let normalized_value: Vec<f64> = value.iter().map(|v| v / first).collect();

  let returns: Vec<f64> = value
    .windows(2)
    .into_iter()
    .map(|w| (w[1] - w[0]) / w[0])
    .collect();

  let (annual_return, annual_volatility) = if returns.len() < 2 {
    (returns.iter().sum::<f64>() * TRADING_DAYS, 0.0)
  } else {
    (
      returns.iter().mean() * TRADING_DAYS,
      returns.iter().std_dev() * TRADING_DAYS.sqrt(),
    )
  };

  let sharpe = if annual_volatility > 0.0 && annual_volatility.is_finite() {
    (annual_return - risk_free_rate) / annual_volatility
  } else {
    0.0
  };

  Ok(Performance {
    dates: prices.dates().to_vec(),
    normalized_value,
    annual_return,
    annual_volatility,
    sharpe,
  })
}

/// Money gained over the window when `capital * w_i` is held in ticker `i`
/// from the first to the last row.
pub fn capital_return(config: &PortfolioConfig, prices: &PriceSeries, weights: &[f64]) -> Result<f64> {
  let prices = prices.select(config.tickers())?;
  check_width(&prices, weights)?;
  if prices.len() < 2 {
    return Ok(0.0);
  }

  let table = prices.prices();
  let last = prices.len() - 1;
  Ok(
    weights
      .iter()
      .enumerate()
      .map(|(i, w)| {
        let growth = (table[[last, i]] - table[[0, i]]) / table[[0, i]];
        config.capital() * w * growth
      })
      .sum(),
  )
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;

  use super::*;
  use crate::portfolio::config::MetricKind;

  fn series(columns: Vec<(&str, Vec<f64>)>) -> PriceSeries {
    let rows = columns[0].1.len();
    let start = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
    let dates = (0..rows)
      .map(|i| start + chrono::Duration::days(i as i64))
      .collect();
    PriceSeries::from_columns(
      dates,
      columns
        .into_iter()
        .map(|(t, p)| (t.to_string(), p))
        .collect(),
    )
    .unwrap()
  }

  fn config(tickers: &[&str]) -> PortfolioConfig {
    PortfolioConfig::new(
      10_000.0,
      tickers.iter().map(|t| t.to_string()).collect(),
      0.0,
      MetricKind::SharpeRatio,
    )
    .unwrap()
  }

  #[test]
  fn allocation_splits_capital() {
    let alloc = allocate(&config(&["AAPL", "MSFT"]), &[0.25, 0.75]);
    assert_eq!(alloc.len(), 2);
    assert_eq!(alloc[0].ticker, "AAPL");
    assert_abs_diff_eq!(alloc[0].amount, 2_500.0, epsilon = 1e-9);
    assert_abs_diff_eq!(alloc[1].amount, 7_500.0, epsilon = 1e-9);
  }

  #[test]
  fn normalized_value_starts_at_one() {
    let prices = series(vec![("A", vec![100.0, 110.0, 121.0]), ("B", vec![50.0, 50.0, 50.0])]);
    let perf = historical_performance(&prices, &[0.5, 0.5], 0.0).unwrap();

    assert_eq!(perf.dates.len(), 3);
    assert_abs_diff_eq!(perf.normalized_value[0], 1.0, epsilon = 1e-12);
    // value path 75, 80, 85.5
    assert_abs_diff_eq!(perf.normalized_value[2], 85.5 / 75.0, epsilon = 1e-12);
    assert!(perf.annual_return > 0.0);
    assert!(perf.annual_volatility > 0.0);
  }

  #[test]
  fn flat_portfolio_has_zero_volatility_and_sharpe() {
    let prices = series(vec![("A", vec![40.0, 40.0, 40.0, 40.0])]);
    let perf = historical_performance(&prices, &[1.0], 0.02).unwrap();

    assert_eq!(perf.annual_return, 0.0);
    assert_eq!(perf.annual_volatility, 0.0);
    assert_eq!(perf.sharpe, 0.0);
    assert!(perf.normalized_value.iter().all(|&v| v == 1.0));
  }

  #[test]
  fn weight_width_must_match_columns() {
    let prices = series(vec![("A", vec![1.0, 2.0])]);
    let err = historical_performance(&prices, &[0.5, 0.5], 0.0).unwrap_err();
    assert!(matches!(err, PortfolioError::InvalidConfig(_)));
  }

  #[test]
  fn capital_return_weights_each_leg() {
    let prices = series(vec![("A", vec![100.0, 90.0, 120.0]), ("B", vec![10.0, 12.0, 9.0])]);
    let gained = capital_return(&config(&["A", "B"]), &prices, &[0.5, 0.5]).unwrap();

    // +20% on 5000, -10% on 5000
    assert_abs_diff_eq!(gained, 500.0, epsilon = 1e-9);
  }
}
