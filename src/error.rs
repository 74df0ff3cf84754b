//! # Errors
//!
//! $$
//! \text{request} \mapsto \text{Ok}(\mathbf{w}) \;|\; \text{Err}(\text{kind}, \text{cause})
//! $$
//!
//! Request-level failures. Degradations that still produce a result are
//! reported as [`crate::portfolio::Warning`] instead.

use chrono::NaiveDate;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PortfolioError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortfolioError {
  /// The external data source failed, timed out or returned nothing usable.
  /// The engine recovers from this with synthetic data.
  #[error("price data unavailable: {0}")]
  DataUnavailable(String),
  /// Too few usable price rows to compute a single return.
  #[error("insufficient price data: {rows} usable rows, at least {required} required")]
  InsufficientData { rows: usize, required: usize },
  /// No tickers were supplied.
  #[error("ticker universe is empty")]
  EmptyUniverse,
  /// The requested metric is not registered.
  #[error("unknown optimization strategy `{0}`")]
  UnknownStrategy(String),
  /// Settings failed validation.
  #[error("invalid portfolio configuration: {0}")]
  InvalidConfig(String),
  /// A configured ticker has no price column.
  #[error("no price column for ticker `{0}`")]
  MissingTicker(String),
  /// A price was non-positive or not finite.
  #[error("invalid price for `{ticker}` at row {row}")]
  InvalidPrice { ticker: String, row: usize },
  /// The requested window is empty or reversed.
  #[error("invalid date range: {start} is not before {end}")]
  InvalidDateRange { start: NaiveDate, end: NaiveDate },
}
