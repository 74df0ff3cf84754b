//! # Portfolio Engine
//!
//! $$
//! (C_0, \{s_i\}, t_0, t_1) \mapsto P \mapsto m \mapsto \mathbf w^\* \mapsto \text{report}
//! $$
//!
//! Request orchestration: risk-free lookup, price fetch with synthetic
//! fallback, metric construction, optimization and the final report.

use chrono::NaiveDate;
use impl_new_derive::ImplNew;
use tracing::info;
use tracing::warn;

use super::config::resolve_risk_free_rate;
use super::config::DEFAULT_RISK_FREE_RATE;
use super::config::MetricKind;
use super::config::PortfolioConfig;
use super::config::RateSource;
use super::data::PriceSeries;
use super::metric::factory::MetricFactory;
use super::optimizer::Optimizer;
use super::optimizer::OptimizerConfig;
use super::performance::allocate;
use super::performance::capital_return;
use super::performance::historical_performance;
use super::source::PriceSource;
use super::synthetic::FallbackPriceGenerator;
use super::types::DataProvenance;
use super::types::OptimizationReport;
use super::types::Warning;
use crate::error::PortfolioError;
use crate::error::Result;

/// Fewest fetched rows accepted before falling back to synthetic prices.
pub const MIN_FETCHED_ROWS: usize = 5;

/// Runtime configuration for [`PortfolioEngine`].
#[derive(ImplNew, Clone, Debug, PartialEq)]
pub struct PortfolioEngineConfig {
  /// Solver settings.
  pub optimizer: OptimizerConfig,
  /// Fetched series shorter than this are replaced by synthetic data.
  pub min_rows: usize,
  /// Generator used when the price source cannot deliver.
  pub fallback: FallbackPriceGenerator,
}

impl Default for PortfolioEngineConfig {
  fn default() -> Self {
    Self {
      optimizer: OptimizerConfig::default(),
      min_rows: MIN_FETCHED_ROWS,
      fallback: FallbackPriceGenerator::default(),
    }
  }
}

/// Single entry point for optimization requests.
pub struct PortfolioEngine {
  config: PortfolioEngineConfig,
  prices: Box<dyn PriceSource>,
  rates: Box<dyn RateSource>,
  factory: MetricFactory,
  optimizer: Optimizer,
}

impl PortfolioEngine {
  /// Engine with the default metric registry.
  pub fn new(config: PortfolioEngineConfig, prices: Box<dyn PriceSource>, rates: Box<dyn RateSource>) -> Self {
    Self {
      optimizer: Optimizer::new(config.optimizer.clone()),
      config,
      prices,
      rates,
      factory: MetricFactory::default(),
    }
  }

  /// Replace the metric registry.
  pub fn with_factory(mut self, factory: MetricFactory) -> Self {
    self.factory = factory;
    self
  }

  pub fn config(&self) -> &PortfolioEngineConfig {
    &self.config
  }

  pub fn factory(&self) -> &MetricFactory {
    &self.factory
  }

  /// Optimize `tickers` over `[start, end]` and report weights, allocation
  /// and historical performance.
  ///
  /// Price and rate lookup failures degrade to synthetic prices and the
  /// default rate, and are listed in the report's warnings. Invalid
  /// requests and windows too short to yield a return abort.
  pub fn run_optimization(
    &self,
    capital: f64,
    tickers: Vec<String>,
    metric: MetricKind,
    start: NaiveDate,
    end: NaiveDate,
  ) -> Result<OptimizationReport> {
    if tickers.is_empty() {
      return Err(PortfolioError::EmptyUniverse);
    }
    if start >= end {
      return Err(PortfolioError::InvalidDateRange { start, end });
    }
    if !self.factory.supports(metric) {
      return Err(PortfolioError::UnknownStrategy(metric.name().to_string()));
    }

    info!(
      tickers = tickers.len(),
      capital,
      metric = %metric,
      %start,
      %end,
      "optimization requested"
    );

    // settings are checked before the rate lookup touches the network
    let config = PortfolioConfig::new(capital, tickers, DEFAULT_RISK_FREE_RATE, metric)?;

    let mut warnings = Vec::new();
    let rate = resolve_risk_free_rate(self.rates.as_ref());
    if let Some(reason) = &rate.fallback_reason {
      warnings.push(Warning::RiskFreeRateFallback {
        reason: reason.clone(),
      });
    }

    let config = config.with_risk_free_rate(rate.value)?;
    let (prices, provenance) = self.load_prices(&config, start, end, &mut warnings)?;

    let metric = self.factory.create(config.metric(), &config, &prices)?;
    let result = self.optimizer.optimize(&config, metric.as_ref())?;

    if !result.converged {
      warnings.push(Warning::SolverNonConvergence {
        iterations: result.iterations,
      });
    }
    if result.fallback_evaluations > 0 {
      warnings.push(Warning::MetricFallback {
        evaluations: result.fallback_evaluations,
      });
    }

    let allocation = allocate(&config, &result.weights);
    let gained = capital_return(&config, metric.prices(), &result.weights)?;
    let performance = historical_performance(metric.prices(), &result.weights, config.risk_free_rate())?;

    info!(
      %provenance,
      converged = result.converged,
      metric_value = result.metric_value.score(),
      metric_fallback = result.metric_value.is_fallback(),
      warnings = warnings.len(),
      "optimization finished"
    );

    Ok(OptimizationReport {
      tickers: config.tickers().to_vec(),
      weights: result.weights,
      converged: result.converged,
      provenance,
      risk_free_rate: config.risk_free_rate(),
      metric_value: result.metric_value.score(),
      metric_fallback: result.metric_value.is_fallback(),
      iterations: result.iterations,
      allocation,
      capital_return: gained,
      performance,
      warnings,
    })
  }

  /// Fetch prices, substituting a synthetic walk when the source fails,
  /// returns too few rows or lacks a configured ticker.
  fn load_prices(
    &self,
    config: &PortfolioConfig,
    start: NaiveDate,
    end: NaiveDate,
    warnings: &mut Vec<Warning>,
  ) -> Result<(PriceSeries, DataProvenance)> {
    let reason = match self.prices.fetch(config.tickers(), start, end) {
      Ok(series) if series.len() >= self.config.min_rows => match series.select(config.tickers()) {
        Ok(series) => {
          info!(rows = series.len(), "using fetched prices");
          return Ok((series, DataProvenance::Real));
        }
        Err(e) => e.to_string(),
      },
      Ok(series) => format!(
        "{} rows fetched, at least {} required",
        series.len(),
        self.config.min_rows
      ),
      Err(e) => e.to_string(),
    };

    warn!(reason = %reason, "price fetch failed, generating synthetic prices");
    let series = self.config.fallback.generate(config.tickers(), start, end)?;
    warnings.push(Warning::SyntheticData { reason });

    Ok((series, DataProvenance::Synthetic))
  }
}
