//! # Portfolio
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}\in\Delta^{n-1}} \frac{\mathbf w^\top\bar{\mathbf r}-r_f}{\sqrt{\mathbf{w}^\top C\,\mathbf{w}}}
//! $$
//!
//! Long-only weight optimization over historical prices.

pub mod config;
pub mod data;
pub mod engine;
pub mod metric;
pub mod optimizer;
pub mod performance;
pub mod source;
pub mod synthetic;
pub mod types;
#[cfg(feature = "yahoo")]
pub mod yahoo;

pub use config::FixedRate;
pub use config::MetricKind;
pub use config::PortfolioConfig;
pub use config::RateSource;
pub use config::RiskFreeRate;
pub use config::parse_tickers;
pub use config::resolve_risk_free_rate;
pub use data::PriceSeries;
pub use data::correlation_matrix;
pub use data::mean_returns;
pub use data::simple_returns;
pub use engine::PortfolioEngine;
pub use engine::PortfolioEngineConfig;
pub use metric::Metric;
pub use metric::MetricValue;
pub use metric::factory::MetricFactory;
pub use metric::sharpe::SharpeRatio;
pub use optimizer::Optimization;
pub use optimizer::Optimizer;
pub use optimizer::OptimizerConfig;
pub use performance::Allocation;
pub use performance::Performance;
pub use performance::allocate;
pub use performance::capital_return;
pub use performance::historical_performance;
pub use source::FetchOptions;
pub use source::OfflineSource;
pub use source::PriceSource;
pub use source::StaticPriceSource;
pub use synthetic::FallbackPriceGenerator;
pub use types::DataProvenance;
pub use types::OptimizationReport;
pub use types::Warning;
pub use types::WeightVector;
#[cfg(feature = "yahoo")]
pub use yahoo::YahooPriceSource;
#[cfg(feature = "yahoo")]
pub use yahoo::YahooRateSource;
