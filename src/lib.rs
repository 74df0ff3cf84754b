//! # portfolio-rs
//!
//! $$
//! \max_{\mathbf w\ge 0,\ \mathbf 1^\top\mathbf w=1}\ \frac{\mathbb E[R_p]-r_f}{\sigma_p}
//! $$
//!
//! Sharpe-ratio portfolio weights from historical prices, with a synthetic
//! price fallback when the data source cannot deliver.

pub mod error;
pub mod portfolio;

pub use error::PortfolioError;
pub use error::Result;
