//! # Yahoo Finance
//!
//! $$
//! P_{t,i} = \text{adjclose}_{t}(s_i),\qquad r_f = \text{close}(\texttt{\^{}IRX}) / 100
//! $$
//!
//! Live price and risk-free sources. Each call runs on a private
//! current-thread runtime bounded by [`FetchOptions::timeout`]; every
//! failure surfaces as [`PortfolioError::DataUnavailable`].

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::future::Future;

use chrono::DateTime;
use chrono::NaiveDate;
use time::OffsetDateTime;
use tracing::debug;
use yahoo_finance_api as yahoo;

use super::config::RateSource;
use super::data::PriceSeries;
use super::source::FetchOptions;
use super::source::PriceSource;
use crate::error::PortfolioError;
use crate::error::Result;

/// 13-week Treasury bill yield, quoted in percent.
pub const RISK_FREE_SYMBOL: &str = "^IRX";

fn unavailable(e: impl std::fmt::Display) -> PortfolioError {
  PortfolioError::DataUnavailable(e.to_string())
}

fn block_on<F, T>(options: &FetchOptions, fut: F) -> Result<T>
where
  F: Future<Output = Result<T>>,
{
  let runtime = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .map_err(unavailable)?;

  runtime.block_on(async {
    match tokio::time::timeout(options.timeout, fut).await {
      Ok(res) => res,
      Err(_) => Err(unavailable(format!(
        "request timed out after {:?}",
        options.timeout
      ))),
    }
  })
}

fn to_offset(date: NaiveDate) -> Result<OffsetDateTime> {
  let ts = date.and_hms_opt(0, 0, 0).map(|d| d.and_utc().timestamp());
  let ts = ts.ok_or_else(|| unavailable(format!("cannot convert {date}")))?;
  OffsetDateTime::from_unix_timestamp(ts).map_err(unavailable)
}

/// Adjusted daily closes joined on the dates every ticker traded.
#[derive(Clone, Debug, Default)]
pub struct YahooPriceSource {
  options: FetchOptions,
}

impl YahooPriceSource {
  pub fn new(options: FetchOptions) -> Self {
    Self { options }
  }

  async fn history(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> Result<PriceSeries> {
    let provider = yahoo::YahooConnector::new().map_err(unavailable)?;
    let (from, to) = (to_offset(start)?, to_offset(end.succ_opt().unwrap_or(end))?);

    let mut closes: Vec<BTreeMap<NaiveDate, f64>> = Vec::with_capacity(tickers.len());
    for ticker in tickers {
      let response = provider
        .get_quote_history(ticker, from, to)
        .await
        .map_err(|e| unavailable(format!("{ticker}: {e}")))?;
      let quotes = response
        .quotes()
        .map_err(|e| unavailable(format!("{ticker}: {e}")))?;

      let by_date: BTreeMap<NaiveDate, f64> = quotes
        .iter()
        .filter(|q| q.adjclose.is_finite() && q.adjclose > 0.0)
        .filter_map(|q| DateTime::from_timestamp(q.timestamp as i64, 0).map(|t| (t.date_naive(), q.adjclose)))
        .collect();
      debug!(ticker = %ticker, rows = by_date.len(), "fetched quote history");
      closes.push(by_date);
    }

    let mut common: BTreeSet<NaiveDate> = closes
      .first()
      .map(|c| c.keys().copied().collect())
      .unwrap_or_default();
    for c in closes.iter().skip(1) {
      common.retain(|d| c.contains_key(d));
    }

    let dates: Vec<NaiveDate> = common.into_iter().collect();
    let columns = tickers
      .iter()
      .zip(&closes)
      .map(|(ticker, c)| (ticker.clone(), dates.iter().map(|d| c[d]).collect()))
      .collect();

    PriceSeries::from_columns(dates, columns)
  }
}

impl PriceSource for YahooPriceSource {
  fn fetch(&self, tickers: &[String], start: NaiveDate, end: NaiveDate) -> Result<PriceSeries> {
    if tickers.is_empty() {
      return Ok(PriceSeries::empty(Vec::new()));
    }
    block_on(&self.options, self.history(tickers, start, end))
  }
}

/// Latest `^IRX` close converted from percent to a fraction.
#[derive(Clone, Debug, Default)]
pub struct YahooRateSource {
  options: FetchOptions,
}

impl YahooRateSource {
  pub fn new(options: FetchOptions) -> Self {
    Self { options }
  }
}

impl RateSource for YahooRateSource {
  fn latest_rate(&self) -> Result<f64> {
    block_on(&self.options, async {
      let provider = yahoo::YahooConnector::new().map_err(unavailable)?;
      let response = provider
        .get_latest_quotes(RISK_FREE_SYMBOL, "1d")
        .await
        .map_err(unavailable)?;
      let quote = response.last_quote().map_err(unavailable)?;
      Ok(quote.close / 100.0)
    })
  }
}
