//! # Portfolio Data
//!
//! $$
//! r_{t,i} = \frac{P_{t,i}-P_{t-1,i}}{P_{t-1,i}},\qquad
//! \rho_{ij} = \frac{\sum_t (r_{t,i}-\bar r_i)(r_{t,j}-\bar r_j)}{\sqrt{\sum_t (r_{t,i}-\bar r_i)^2 \sum_t (r_{t,j}-\bar r_j)^2}}
//! $$
//!
//! Price table plus the return and correlation helpers the metrics build on.

use chrono::NaiveDate;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::Axis;

use crate::error::PortfolioError;
use crate::error::Result;

/// Minimum rows needed to compute one return.
pub const MIN_RETURN_ROWS: usize = 2;

/// Time-indexed close prices, one column per ticker.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceSeries {
  dates: Vec<NaiveDate>,
  tickers: Vec<String>,
  /// `rows x tickers`
  prices: Array2<f64>,
}

impl PriceSeries {
  /// Build a series from dates, column names and a row-major price table.
  ///
  /// Dates must be strictly ascending and every price finite and positive.
  pub fn new(dates: Vec<NaiveDate>, tickers: Vec<String>, prices: Array2<f64>) -> Result<Self> {
    if prices.nrows() != dates.len() || prices.ncols() != tickers.len() {
      return Err(PortfolioError::InvalidConfig(format!(
        "price table is {}x{} but got {} dates and {} tickers",
        prices.nrows(),
        prices.ncols(),
        dates.len(),
        tickers.len()
      )));
    }

    if dates.windows(2).any(|w| w[0] >= w[1]) {
      return Err(PortfolioError::InvalidConfig(
        "price dates must be strictly ascending".into(),
      ));
    }

    for ((row, col), &p) in prices.indexed_iter() {
      if !p.is_finite() || p <= 0.0 {
        return Err(PortfolioError::InvalidPrice {
          ticker: tickers[col].clone(),
          row,
        });
      }
    }

    Ok(Self {
      dates,
      tickers,
      prices,
    })
  }

  /// Build a series from named columns.
  pub fn from_columns(dates: Vec<NaiveDate>, columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
    let rows = dates.len();
    let mut prices = Array2::<f64>::zeros((rows, columns.len()));
    let mut tickers = Vec::with_capacity(columns.len());

    for (j, (ticker, values)) in columns.into_iter().enumerate() {
      if values.len() != rows {
        return Err(PortfolioError::InvalidConfig(format!(
          "column `{ticker}` has {} prices for {rows} dates",
          values.len()
        )));
      }
      prices.column_mut(j).assign(&Array1::from(values));
      tickers.push(ticker);
    }

    Self::new(dates, tickers, prices)
  }

  /// Series without rows, as returned by a source that found nothing.
  pub fn empty(tickers: Vec<String>) -> Self {
    let cols = tickers.len();
    Self {
      dates: Vec::new(),
      tickers,
      prices: Array2::zeros((0, cols)),
    }
  }

  /// Number of dated rows.
  pub fn len(&self) -> usize {
    self.dates.len()
  }

  /// Whether the series has no rows.
  pub fn is_empty(&self) -> bool {
    self.dates.is_empty()
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  pub fn prices(&self) -> &Array2<f64> {
    &self.prices
  }

  /// Price column of `ticker`.
  pub fn column(&self, ticker: &str) -> Option<ArrayView1<'_, f64>> {
    self
      .tickers
      .iter()
      .position(|t| t == ticker)
      .map(|j| self.prices.column(j))
  }

  /// Reorder columns to `tickers`, failing on the first one that is missing.
  pub fn select(&self, tickers: &[String]) -> Result<Self> {
    let mut prices = Array2::<f64>::zeros((self.len(), tickers.len()));
    for (j, ticker) in tickers.iter().enumerate() {
      let column = self
        .column(ticker)
        .ok_or_else(|| PortfolioError::MissingTicker(ticker.clone()))?;
      prices.column_mut(j).assign(&column);
    }

    Ok(Self {
      dates: self.dates.clone(),
      tickers: tickers.to_vec(),
      prices,
    })
  }

  /// Simple per-period returns, `rows - 1` by `tickers`.
  pub fn simple_returns(&self) -> Array2<f64> {
    simple_returns(&self.prices)
  }
}

/// Simple returns of a price table; the first row has no return and is dropped.
pub fn simple_returns(prices: &Array2<f64>) -> Array2<f64> {
  let rows = prices.nrows();
  if rows < MIN_RETURN_ROWS {
    return Array2::zeros((0, prices.ncols()));
  }

  let prev = prices.slice(ndarray::s![..rows - 1, ..]);
  let next = prices.slice(ndarray::s![1.., ..]);
  (&next - &prev) / &prev
}

/// Column means of a return table. Empty tables give zeros.
pub fn mean_returns(returns: &Array2<f64>) -> Array1<f64> {
  returns
    .mean_axis(Axis(0))
    .unwrap_or_else(|| Array1::zeros(returns.ncols()))
}

fn sample_mean(xs: ArrayView1<'_, f64>) -> f64 {
  if xs.is_empty() {
    0.0
  } else {
    xs.sum() / xs.len() as f64
  }
}

/// Pearson correlation of two series, `None` when either has no variance.
fn pearson(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> Option<f64> {
  let n = x.len().min(y.len());
  if n < 2 {
    return None;
  }

  let mx = sample_mean(x);
  let my = sample_mean(y);

  let mut cov = 0.0;
  let mut sx = 0.0;
  let mut sy = 0.0;

  for i in 0..n {
    let dx = x[i] - mx;
    let dy = y[i] - my;
    cov += dx * dy;
    sx += dx * dx;
    sy += dy * dy;
  }

  let denom = (sx * sy).sqrt();
  if denom < 1e-15 || !denom.is_finite() {
    None
  } else {
    Some((cov / denom).clamp(-1.0, 1.0))
  }
}

/// Sample correlation matrix of the return columns.
///
/// A column without variance has an undefined correlation; its row and
/// column, diagonal included, are zero.
pub fn correlation_matrix(returns: &Array2<f64>) -> Array2<f64> {
  let n = returns.ncols();
  let mut corr = Array2::<f64>::zeros((n, n));

  for i in 0..n {
    let ri = returns.column(i);
    corr[[i, i]] = if pearson(ri, ri).is_some() { 1.0 } else { 0.0 };
    for j in (i + 1)..n {
      let r = pearson(ri, returns.column(j)).unwrap_or(0.0);
      corr[[i, j]] = r;
      corr[[j, i]] = r;
    }
  }

  corr
}
