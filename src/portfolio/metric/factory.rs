//! # Metric Factory
//!
//! $$
//! \text{kind} \mapsto m_{\text{kind}}(\text{config}, P)
//! $$
//!
//! Registry from [`MetricKind`] to metric constructors. New objectives are
//! added by registering a constructor; the optimizer only sees `dyn Metric`.

use std::collections::HashMap;

use super::sharpe::SharpeRatio;
use super::Metric;
use crate::error::PortfolioError;
use crate::error::Result;
use crate::portfolio::config::MetricKind;
use crate::portfolio::config::PortfolioConfig;
use crate::portfolio::data::PriceSeries;

/// Builds a metric for one request.
pub type MetricConstructor = fn(&PortfolioConfig, &PriceSeries) -> Result<Box<dyn Metric>>;

#[derive(Clone)]
pub struct MetricFactory {
  constructors: HashMap<MetricKind, MetricConstructor>,
}

impl MetricFactory {
  /// Factory with nothing registered.
  pub fn empty() -> Self {
    Self {
      constructors: HashMap::new(),
    }
  }

  /// Register (or replace) the constructor for `kind`.
  pub fn register(&mut self, kind: MetricKind, constructor: MetricConstructor) -> &mut Self {
    self.constructors.insert(kind, constructor);
    self
  }

  pub fn supports(&self, kind: MetricKind) -> bool {
    self.constructors.contains_key(&kind)
  }

  /// Registered kinds, sorted by name.
  pub fn kinds(&self) -> Vec<MetricKind> {
    let mut kinds: Vec<MetricKind> = self.constructors.keys().copied().collect();
    kinds.sort_by_key(|k| k.name());
    kinds
  }

  /// Instantiate the metric registered for `kind`.
  pub fn create(
    &self,
    kind: MetricKind,
    config: &PortfolioConfig,
    prices: &PriceSeries,
  ) -> Result<Box<dyn Metric>> {
    let constructor = self
      .constructors
      .get(&kind)
      .ok_or_else(|| PortfolioError::UnknownStrategy(kind.name().to_string()))?;
    constructor(config, prices)
  }

  /// Parse `name` and instantiate the matching metric.
  pub fn create_by_name(
    &self,
    name: &str,
    config: &PortfolioConfig,
    prices: &PriceSeries,
  ) -> Result<Box<dyn Metric>> {
    self.create(name.parse()?, config, prices)
  }
}

impl Default for MetricFactory {
  fn default() -> Self {
    let mut factory = Self::empty();
    factory.register(MetricKind::SharpeRatio, sharpe_ratio);
    factory
  }
}

fn sharpe_ratio(config: &PortfolioConfig, prices: &PriceSeries) -> Result<Box<dyn Metric>> {
  Ok(Box::new(SharpeRatio::new(config, prices)?))
}

impl std::fmt::Debug for MetricFactory {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MetricFactory")
      .field("kinds", &self.kinds())
      .finish()
  }
}
