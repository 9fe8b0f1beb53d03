pub(crate) mod common;

pub use common::Cik;

/// Ticker symbol to CIK resolution against the [SEC]'s company index.
///
/// [SEC]: https://www.sec.gov/search-filings/edgar-application-programming-interfaces
pub mod tickers;

/// Filing history per company, and the recent-report selection taken from it.
pub mod submissions;

/// Primary-document downloads, milled to plaintext on their way to disk.
pub mod filings;
