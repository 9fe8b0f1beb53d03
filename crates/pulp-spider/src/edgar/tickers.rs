use super::common::{de_cik, Cik};
use crate::dispatch::Dispatcher;
use serde::de::Visitor;
use serde::Deserialize;
use tracing::{debug, error};

const COMPANY_INDEX_URL: &str = "https://www.sec.gov/files/company_tickers.json";

// fetch
// ----------------------------------------------------------------------------

/// Pull the SEC company index: every registered ticker with its CIK and
/// title. One document covers the whole market, so fetch it once per run
/// and resolve as many symbols as needed against it.
pub async fn fetch(http: &Dispatcher) -> anyhow::Result<Tickers> {
    let time = std::time::Instant::now();

    debug!("fetching SEC company index");
    let response = http.get(COMPANY_INDEX_URL).await.map_err(|err| {
        error!("failed to fetch company index, error({err})");
        err
    })?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("company index returned HTTP {status}");
    }

    let tickers: Tickers = response.json().await.map_err(|err| {
        error!("failed to parse company index JSON, error({err})");
        err
    })?;

    debug!(
        "company index decoded, {} entries. {}",
        tickers.0.len(),
        crate::time_elapsed(time)
    );

    Ok(tickers)
}

// de
// ----------------------------------------------------------------------------

#[derive(Debug)]
pub struct Tickers(Vec<Ticker>);

#[derive(Clone, Debug, Deserialize)]
pub struct Ticker {
    #[serde(rename = "cik_str", deserialize_with = "de_cik")]
    pub cik: Cik,
    pub ticker: String,
    pub title: String,
}

struct TickerVisitor;

impl<'de> Visitor<'de> for TickerVisitor {
    type Value = Tickers;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("Map of tickers")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        // each entry is in the form of:
        // `0: { "cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc." },
        //  1: { ... },
        //  ...`
        let mut tickers: Vec<Ticker> = Vec::new();
        while let Some((_, ticker)) = map.next_entry::<u32, Ticker>()? {
            tickers.push(ticker);
        }
        Ok(Tickers(tickers))
    }
}

impl<'de> Deserialize<'de> for Tickers {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // we want a vector returned, but the deserialize will expect a map, given
        // how the API has been designed
        deserializer.deserialize_map(TickerVisitor)
    }
}

impl Tickers {
    /// Case-insensitive symbol lookup; `aapl` and `AAPL` land on the
    /// same record. First index entry wins.
    pub fn resolve(&self, symbol: &str) -> Option<&Ticker> {
        let wanted = symbol.trim();
        self.0
            .iter()
            .find(|entry| entry.ticker.eq_ignore_ascii_case(wanted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"{
        "0": { "cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc." },
        "1": { "cik_str": 789019, "ticker": "MSFT", "title": "MICROSOFT CORP" },
        "2": { "cik_str": 1018724, "ticker": "AMZN", "title": "AMAZON COM INC" }
    }"#;

    #[test]
    fn decodes_map_shaped_index() {
        let tickers: Tickers = serde_json::from_str(INDEX).unwrap();
        assert_eq!(tickers.0.len(), 3);
        assert_eq!(tickers.0[0].ticker, "AAPL");
        assert_eq!(tickers.0[0].title, "Apple Inc.");
    }

    #[test]
    fn cik_comes_out_padded() {
        let tickers: Tickers = serde_json::from_str(INDEX).unwrap();
        assert_eq!(tickers.0[0].cik, Cik::new(320193));
        assert_eq!(tickers.0[0].cik.as_str(), "0000320193");
    }

    #[test]
    fn resolve_ignores_case_and_padding() {
        let tickers: Tickers = serde_json::from_str(INDEX).unwrap();
        assert_eq!(tickers.resolve("msft").unwrap().title, "MICROSOFT CORP");
        assert_eq!(tickers.resolve("MSFT").unwrap().title, "MICROSOFT CORP");
        assert_eq!(tickers.resolve(" amzn ").unwrap().ticker, "AMZN");
    }

    #[test]
    fn resolve_misses_cleanly() {
        let tickers: Tickers = serde_json::from_str(INDEX).unwrap();
        assert!(tickers.resolve("ZZZZ").is_none());
    }
}
