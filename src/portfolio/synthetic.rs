//! # Synthetic Prices
//!
//! $$
//! P_{t} = P_0 \prod_{k=1}^{t} (1 + \varepsilon_k),\qquad \varepsilon_k \sim \mathcal N(\mu, \sigma^2)
//! $$
//!
//! Fallback price generator used when the price source cannot deliver.
//! One shared collaborator, invoked explicitly by the engine, seedable so
//! runs can be reproduced.

use chrono::Datelike;
use chrono::NaiveDate;
use chrono::Weekday;
use impl_new_derive::ImplNew;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rand_distr::Distribution;
use rand_distr::Normal;
use tracing::debug;

use super::data::PriceSeries;
use crate::error::PortfolioError;
use crate::error::Result;

/// Geometric random walk over business days.
#[derive(ImplNew, Clone, Debug, PartialEq)]
pub struct FallbackPriceGenerator {
  /// Seed for reproducible paths, `None` draws from OS entropy.
  pub seed: Option<u64>,
  /// Mean daily simple return.
  pub drift: f64,
  /// Standard deviation of daily simple returns.
  pub volatility: f64,
  /// Lower bound of the uniform starting price.
  pub min_start_price: f64,
  /// Upper bound (exclusive) of the uniform starting price.
  pub max_start_price: f64,
}

impl Default for FallbackPriceGenerator {
  fn default() -> Self {
    Self {
      seed: None,
      drift: 0.0005,
      volatility: 0.01,
      min_start_price: 10.0,
      max_start_price: 1000.0,
    }
  }
}

impl FallbackPriceGenerator {
  /// Default walk with a fixed seed.
  pub fn seeded(seed: u64) -> Self {
    Self {
      seed: Some(seed),
      ..Self::default()
    }
  }

  /// Generate one column per ticker over the business days in `[start, end]`.
  pub fn generate(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> Result<PriceSeries> {
    if !(self.min_start_price > 0.0 && self.min_start_price < self.max_start_price) {
      return Err(PortfolioError::InvalidConfig(format!(
        "starting price range [{}, {}) is empty or not positive",
        self.min_start_price, self.max_start_price
      )));
    }

    let normal = Normal::new(self.drift, self.volatility)
      .map_err(|e| PortfolioError::InvalidConfig(format!("fallback return distribution: {e}")))?;

    let mut rng = match self.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    };

    let dates = business_days(start, end);
    let mut prices = Array2::<f64>::zeros((dates.len(), tickers.len()));

    for (j, ticker) in tickers.iter().enumerate() {
      let mut price = rng.gen_range(self.min_start_price..self.max_start_price);
      for t in 0..dates.len() {
        let step = 1.0 + normal.sample(&mut rng);
        price *= step.max(1e-6);
        prices[[t, j]] = price;
      }
      debug!(ticker = %ticker, rows = dates.len(), "generated synthetic prices");
    }

    PriceSeries::new(dates, tickers.to_vec(), prices)
  }
}

/// Monday-to-Friday dates in `[start, end]`.
pub fn business_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
  let mut out = Vec::new();
  let mut day = start;

  while day <= end {
    if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
      out.push(day);
    }
    match day.succ_opt() {
      Some(next) => day = next,
      None => break,
    }
  }

  out
}
