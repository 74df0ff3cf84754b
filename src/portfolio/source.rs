//! # Price Sources
//!
//! $$
//! (\{s_i\}, t_0, t_1) \mapsto P \in \mathbb R_{>0}^{T\times n}
//! $$
//!
//! Boundary to historical price providers. Sources are unreliable: they may
//! fail, time out or return fewer rows than asked for, and the engine
//! decides what to do about it.

use std::time::Duration;

use chrono::NaiveDate;
use ndarray::Axis;

use super::data::PriceSeries;
use crate::error::PortfolioError;
use crate::error::Result;

/// Adjusted close prices for `tickers` over `[start, end]`.
pub trait PriceSource {
  fn fetch(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> Result<PriceSeries>;
}

/// Network settings for live sources.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FetchOptions {
  /// Upper bound on one complete fetch.
  pub timeout: Duration,
}

impl Default for FetchOptions {
  fn default() -> Self {
    Self {
      timeout: Duration::from_secs(10),
    }
  }
}

/// Serves a preloaded series, trimmed to the requested window.
#[derive(Clone, Debug)]
pub struct StaticPriceSource {
  series: PriceSeries,
}

impl StaticPriceSource {
  pub fn new(series: PriceSeries) -> Self {
    Self { series }
  }
}

impl PriceSource for StaticPriceSource {
  fn fetch(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> Result<PriceSeries> {
    let rows: Vec<usize> = self
      .series
      .dates()
      .iter()
      .enumerate()
      .filter(|(_, d)| (start..=end).contains(*d))
      .map(|(i, _)| i)
      .collect();

    let window = PriceSeries::new(
      rows.iter().map(|&i| self.series.dates()[i]).collect(),
      self.series.tickers().to_vec(),
      self.series.prices().select(Axis(0), &rows),
    )?;

    window.select(tickers)
  }
}

/// Source that never answers. Runs the engine entirely on synthetic data.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineSource;

impl PriceSource for OfflineSource {
  fn fetch(&self, _tickers: &[String], _start: NaiveDate, _end: NaiveDate) -> Result<PriceSeries> {
    Err(PortfolioError::DataUnavailable("offline mode".into()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 2, day).unwrap()
  }

  fn source() -> StaticPriceSource {
    StaticPriceSource::new(
      PriceSeries::from_columns(
        (1..=5).map(d).collect(),
        vec![
          ("A".into(), vec![1.0, 2.0, 3.0, 4.0, 5.0]),
          ("B".into(), vec![9.0, 8.0, 7.0, 6.0, 5.0]),
        ],
      )
      .unwrap(),
    )
  }

  #[test]
  fn static_source_trims_window_and_orders_columns() {
    let got = source()
      .fetch(&["B".to_string(), "A".to_string()], d(2), d(4))
      .unwrap();

    assert_eq!(got.dates(), &[d(2), d(3), d(4)]);
    assert_eq!(got.tickers(), &["B".to_string(), "A".to_string()]);
    assert_eq!(got.prices()[[0, 0]], 8.0);
    assert_eq!(got.prices()[[2, 1]], 4.0);
  }

  #[test]
  fn static_source_reports_unknown_tickers() {
    let err = source().fetch(&["Q".to_string()], d(1), d(5)).unwrap_err();
    assert_eq!(err, PortfolioError::MissingTicker("Q".into()));
  }

  #[test]
  fn window_outside_data_is_empty() {
    let got = source()
      .fetch(&["A".to_string()], NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2023, 2, 1).unwrap())
      .unwrap();
    assert!(got.is_empty());
  }

  #[test]
  fn offline_source_is_unavailable() {
    let err = OfflineSource.fetch(&[], d(1), d(2)).unwrap_err();
    assert!(matches!(err, PortfolioError::DataUnavailable(_)));
    assert_eq!(FetchOptions::default().timeout, Duration::from_secs(10));
  }
}
