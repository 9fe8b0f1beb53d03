use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Ticker symbols to pull filings for, e.g. `pulp MSFT aapl`.
    ///
    /// If no symbols are provided, pulp will ask for one.
    pub tickers: Vec<String>,

    /// Directory that receives the per-ticker `filings_{TICKER}` output
    /// directories.
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Sets the level of tracing.
    #[arg(short, long)]
    pub trace: Option<TraceLevel>,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
#[clap(rename_all = "UPPERCASE")]
pub enum TraceLevel {
    DEBUG,
    ERROR,
    INFO,
    TRACE,
    WARN,
}
