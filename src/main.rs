//! Command line front end: optimize one portfolio and print the result.

use anyhow::Context;
use anyhow::Result;
use chrono::Duration;
use chrono::Local;
use chrono::NaiveDate;
use clap::Parser;
use portfolio_rs::portfolio::FallbackPriceGenerator;
use portfolio_rs::portfolio::FixedRate;
use portfolio_rs::portfolio::MetricKind;
use portfolio_rs::portfolio::OptimizationReport;
use portfolio_rs::portfolio::PortfolioEngine;
use portfolio_rs::portfolio::PortfolioEngineConfig;
use portfolio_rs::portfolio::PriceSource;
use portfolio_rs::portfolio::RateSource;
use portfolio_rs::portfolio::parse_tickers;
use prettytable::Table;
use prettytable::row;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "portfolio-rs")]
#[command(about = "Sharpe-ratio portfolio weight optimizer", long_about = None)]
struct Cli {
  /// Tickers, separated by commas or whitespace
  #[arg(short, long, default_value = "AAPL,MSFT,GOOGL,AMZN,META")]
  tickers: String,

  /// Capital to allocate
  #[arg(short, long, default_value_t = 10_000.0)]
  capital: f64,

  /// First day of the price window (YYYY-MM-DD), defaults to one year before `end`
  #[arg(long)]
  start: Option<NaiveDate>,

  /// Last day of the price window (YYYY-MM-DD), defaults to today
  #[arg(long)]
  end: Option<NaiveDate>,

  /// Objective to maximize
  #[arg(short, long, default_value = "sharpe_ratio")]
  metric: String,

  /// Seed for the synthetic price fallback
  #[arg(long)]
  seed: Option<u64>,

  /// Fixed annual risk-free rate as a fraction, skips the live lookup
  #[arg(long)]
  risk_free_rate: Option<f64>,

  /// Timeout for each live data request, in seconds
  #[arg(long, default_value_t = 10)]
  timeout_secs: u64,

  /// Print the report as JSON
  #[arg(long)]
  json: bool,
}

#[cfg(feature = "yahoo")]
fn sources(cli: &Cli) -> (Box<dyn PriceSource>, Box<dyn RateSource>) {
  use portfolio_rs::portfolio::FetchOptions;
  use portfolio_rs::portfolio::YahooPriceSource;
  use portfolio_rs::portfolio::YahooRateSource;

  let options = FetchOptions {
    timeout: std::time::Duration::from_secs(cli.timeout_secs),
  };
  let rates: Box<dyn RateSource> = match cli.risk_free_rate {
    Some(rate) => Box::new(FixedRate(rate)),
    None => Box::new(YahooRateSource::new(options)),
  };
  (Box::new(YahooPriceSource::new(options)), rates)
}

#[cfg(not(feature = "yahoo"))]
fn sources(cli: &Cli) -> (Box<dyn PriceSource>, Box<dyn RateSource>) {
  use portfolio_rs::portfolio::OfflineSource;
  use portfolio_rs::portfolio::config::DEFAULT_RISK_FREE_RATE;

  let rate = cli.risk_free_rate.unwrap_or(DEFAULT_RISK_FREE_RATE);
  (Box::new(OfflineSource), Box::new(FixedRate(rate)))
}

fn print_report(report: &OptimizationReport, capital: f64) {
  let mut table = Table::new();
  table.add_row(row!["Ticker", "Weight (%)", "Amount ($)"]);
  for a in &report.allocation {
    table.add_row(row![
      a.ticker,
      r->format!("{:.2}", a.weight * 100.0),
      r->format!("{:.2}", a.amount)
    ]);
  }
  table.printstd();

  let perf = &report.performance;
  println!("capital            {capital:.2}");
  println!("data               {}", report.provenance);
  println!("risk-free rate     {:.4}", report.risk_free_rate);
  let marker = if report.metric_fallback { " (fallback)" } else { "" };
  println!("sharpe (daily)     {:.4}{marker}", report.metric_value);
  println!("converged          {} ({} iterations)", report.converged, report.iterations);
  println!("capital return     {:.2}", report.capital_return);
  println!("annual return      {:.2}%", perf.annual_return * 100.0);
  println!("annual volatility  {:.2}%", perf.annual_volatility * 100.0);
  println!("annual sharpe      {:.2}", perf.sharpe);

  for w in &report.warnings {
    println!("warning: {w}");
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let metric: MetricKind = cli.metric.parse()?;
  let tickers = parse_tickers(&cli.tickers);
  let end = cli.end.unwrap_or_else(|| Local::now().date_naive());
  let start = cli.start.unwrap_or(end - Duration::days(365));

  let config = PortfolioEngineConfig {
    fallback: FallbackPriceGenerator {
      seed: cli.seed,
      ..FallbackPriceGenerator::default()
    },
    ..PortfolioEngineConfig::default()
  };
  let (prices, rates) = sources(&cli);
  let engine = PortfolioEngine::new(config, prices, rates);

  let report = engine
    .run_optimization(cli.capital, tickers, metric, start, end)
    .context("portfolio optimization failed")?;

  if cli.json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    print_report(&report, cli.capital);
  }

  Ok(())
}
