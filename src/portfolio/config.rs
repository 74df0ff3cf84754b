//! # Portfolio Configuration
//!
//! $$
//! \text{config} = (C_0,\ \{s_1,\dots,s_n\},\ r_f,\ \text{metric})
//! $$
//!
//! Immutable per-request settings and the risk-free rate lookup with its
//! hard-coded fallback.

use std::fmt::Display;
use std::str::FromStr;

use serde::Serialize;
use tracing::info;
use tracing::warn;

use crate::error::PortfolioError;
use crate::error::Result;

/// Rate used when the risk-free lookup fails (4.5%).
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.045;

/// Objectives the optimizer can maximize.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum MetricKind {
  /// Excess mean return per unit of correlation-weighted risk.
  #[default]
  SharpeRatio,
}

impl MetricKind {
  /// Canonical name, as accepted by [`FromStr`].
  pub fn name(&self) -> &'static str {
    match self {
      MetricKind::SharpeRatio => "sharpe_ratio",
    }
  }
}

impl Display for MetricKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.name())
  }
}

impl FromStr for MetricKind {
  type Err = PortfolioError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "sharpe_ratio" | "sharpe-ratio" | "sharpe" => Ok(MetricKind::SharpeRatio),
      other => Err(PortfolioError::UnknownStrategy(other.to_string())),
    }
  }
}

/// Validated optimization settings.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PortfolioConfig {
  capital: f64,
  tickers: Vec<String>,
  risk_free_rate: f64,
  metric: MetricKind,
}

impl PortfolioConfig {
  /// Validate and build a configuration.
  ///
  /// Fails with [`PortfolioError::EmptyUniverse`] when `tickers` is empty and
  /// with [`PortfolioError::InvalidConfig`] for a non-positive capital, blank
  /// or duplicate tickers, or a rate outside `[0, 1]`.
  pub fn new(capital: f64, tickers: Vec<String>, risk_free_rate: f64, metric: MetricKind) -> Result<Self> {
    if tickers.is_empty() {
      return Err(PortfolioError::EmptyUniverse);
    }

    if !(capital.is_finite() && capital > 0.0) {
      return Err(PortfolioError::InvalidConfig(format!(
        "capital must be positive, got {capital}"
      )));
    }

    if !(0.0..=1.0).contains(&risk_free_rate) {
      return Err(PortfolioError::InvalidConfig(format!(
        "risk-free rate must lie in [0, 1], got {risk_free_rate}"
      )));
    }

    for (i, ticker) in tickers.iter().enumerate() {
      if ticker.trim().is_empty() {
        return Err(PortfolioError::InvalidConfig(format!(
          "ticker at position {i} is blank"
        )));
      }
      if tickers[..i].contains(ticker) {
        return Err(PortfolioError::InvalidConfig(format!(
          "ticker `{ticker}` is listed twice"
        )));
      }
    }

    Ok(Self {
      capital,
      tickers,
      risk_free_rate,
      metric,
    })
  }

  /// Same settings with another risk-free rate, validated like [`Self::new`].
  pub fn with_risk_free_rate(self, risk_free_rate: f64) -> Result<Self> {
    Self::new(self.capital, self.tickers, risk_free_rate, self.metric)
  }

  pub fn capital(&self) -> f64 {
    self.capital
  }

  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  pub fn risk_free_rate(&self) -> f64 {
    self.risk_free_rate
  }

  pub fn metric(&self) -> MetricKind {
    self.metric
  }
}

/// Split a free-form ticker list on newlines, commas and whitespace.
///
/// Symbols are trimmed and upper-cased; blanks and repeats are dropped,
/// first occurrence wins.
pub fn parse_tickers(input: &str) -> Vec<String> {
  let mut out: Vec<String> = Vec::new();
  for raw in input.split(|c: char| c == ',' || c.is_whitespace()) {
    let ticker = raw.trim().to_uppercase();
    if !ticker.is_empty() && !out.contains(&ticker) {
      out.push(ticker);
    }
  }
  out
}

/// Source of the latest short-term risk-free yield, as a fraction.
pub trait RateSource {
  fn latest_rate(&self) -> Result<f64>;
}

/// Fixed rate, for tests and offline runs.
#[derive(Clone, Copy, Debug)]
pub struct FixedRate(pub f64);

impl RateSource for FixedRate {
  fn latest_rate(&self) -> Result<f64> {
    Ok(self.0)
  }
}

/// Risk-free rate together with whether the default was substituted.
#[derive(Clone, Debug, PartialEq)]
pub struct RiskFreeRate {
  pub value: f64,
  /// Why the lookup was replaced by [`DEFAULT_RISK_FREE_RATE`].
  pub fallback_reason: Option<String>,
}

impl RiskFreeRate {
  pub fn is_fallback(&self) -> bool {
    self.fallback_reason.is_some()
  }
}

/// Query `source`, falling back to [`DEFAULT_RISK_FREE_RATE`] on any failure.
pub fn resolve_risk_free_rate(source: &dyn RateSource) -> RiskFreeRate {
  let reason = match source.latest_rate() {
    Ok(rate) if rate.is_finite() && (0.0..=1.0).contains(&rate) => {
      info!(risk_free_rate = rate, "resolved risk-free rate");
      return RiskFreeRate {
        value: rate,
        fallback_reason: None,
      };
    }
    Ok(rate) => format!("rate {rate} outside [0, 1]"),
    Err(e) => e.to_string(),
  };

  warn!(
    default = DEFAULT_RISK_FREE_RATE,
    reason = %reason,
    "risk-free rate unavailable, using default"
  );

  RiskFreeRate {
    value: DEFAULT_RISK_FREE_RATE,
    fallback_reason: Some(reason),
  }
}

#[cfg(test)]
mod tests {
  use tracing_test::traced_test;

  use super::*;

  struct Unreachable;

  impl RateSource for Unreachable {
    fn latest_rate(&self) -> Result<f64> {
      Err(PortfolioError::DataUnavailable("connection refused".into()))
    }
  }

  fn tickers(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn empty_universe_is_rejected() {
    let err = PortfolioConfig::new(1000.0, vec![], 0.01, MetricKind::SharpeRatio).unwrap_err();
    assert_eq!(err, PortfolioError::EmptyUniverse);
  }

  #[test]
  fn invalid_settings_are_rejected() {
    let t = tickers(&["AAPL"]);
    assert!(PortfolioConfig::new(0.0, t.clone(), 0.01, MetricKind::SharpeRatio).is_err());
    assert!(PortfolioConfig::new(f64::NAN, t.clone(), 0.01, MetricKind::SharpeRatio).is_err());
    assert!(PortfolioConfig::new(100.0, t.clone(), 1.5, MetricKind::SharpeRatio).is_err());
    assert!(PortfolioConfig::new(100.0, t, -0.1, MetricKind::SharpeRatio).is_err());

    let dup = PortfolioConfig::new(100.0, tickers(&["A", "A"]), 0.0, MetricKind::SharpeRatio);
    assert!(matches!(dup, Err(PortfolioError::InvalidConfig(_))));

    let blank = PortfolioConfig::new(100.0, tickers(&["A", " "]), 0.0, MetricKind::SharpeRatio);
    assert!(matches!(blank, Err(PortfolioError::InvalidConfig(_))));
  }

  #[test]
  fn rate_can_be_replaced_but_stays_validated() {
    let config = PortfolioConfig::new(100.0, tickers(&["A"]), DEFAULT_RISK_FREE_RATE, MetricKind::SharpeRatio).unwrap();
    let updated = config.clone().with_risk_free_rate(0.03).unwrap();
    assert_eq!(updated.risk_free_rate(), 0.03);
    assert_eq!(updated.tickers(), config.tickers());
    assert!(config.with_risk_free_rate(2.0).is_err());
  }

  #[test]
  fn metric_kind_parses_known_names_only() {
    assert_eq!("sharpe_ratio".parse::<MetricKind>(), Ok(MetricKind::SharpeRatio));
    assert_eq!(" Sharpe ".parse::<MetricKind>(), Ok(MetricKind::SharpeRatio));
    assert_eq!(
      "sortino".parse::<MetricKind>(),
      Err(PortfolioError::UnknownStrategy("sortino".into()))
    );
  }

  #[test]
  fn parse_tickers_trims_and_dedups() {
    let parsed = parse_tickers("aapl\n MSFT ,\n\nGOOGL\naapl");
    assert_eq!(parsed, tickers(&["AAPL", "MSFT", "GOOGL"]));
    assert!(parse_tickers(" \n ").is_empty());
  }

  #[test]
  fn resolved_rate_is_used_when_valid() {
    let rate = resolve_risk_free_rate(&FixedRate(0.052));
    assert_eq!(rate.value, 0.052);
    assert!(!rate.is_fallback());
  }

  #[test]
  #[traced_test]
  fn failed_lookup_falls_back_and_logs() {
    let rate = resolve_risk_free_rate(&Unreachable);
    assert_eq!(rate.value, DEFAULT_RISK_FREE_RATE);
    assert!(rate.is_fallback());
    assert!(logs_contain("risk-free rate unavailable"));
  }

  #[test]
  fn out_of_range_rate_falls_back() {
    let rate = resolve_risk_free_rate(&FixedRate(4.5));
    assert_eq!(rate.value, DEFAULT_RISK_FREE_RATE);
    assert!(rate.fallback_reason.unwrap().contains("outside"));
  }
}
