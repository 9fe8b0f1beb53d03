use super::common::{convert_date_type, Cik};
use crate::dispatch::Dispatcher;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, error};

/// Form types worth pulling: annual and quarterly reports.
pub const FORMS: [&str; 2] = ["10-K", "10-Q"];

/// Ceiling on filings fetched per symbol.
pub const MAX_FILINGS: usize = 10;

// fetch
// ----------------------------------------------------------------------------

/// Pull the filing history for one CIK and shape it into a [`Catalog`].
pub async fn fetch(http: &Dispatcher, cik: &Cik) -> anyhow::Result<Catalog> {
    let time = std::time::Instant::now();
    let url = format!("https://data.sec.gov/submissions/CIK{cik}.json");

    debug!("fetching submissions for CIK{cik}");
    let response = http.get(&url).await.map_err(|err| {
        error!("failed to fetch submissions for CIK{cik}, error({err})");
        err
    })?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("submissions for CIK{cik} returned HTTP {status}");
    }

    let submissions: Submissions = response.json().await.map_err(|err| {
        error!("failed to parse submissions JSON for CIK{cik}, error({err})");
        err
    })?;

    let catalog = Catalog::try_from(submissions.filings.recent)?;
    debug!(
        "catalog holds {} filings for CIK{cik}. {}",
        catalog.len(),
        crate::time_elapsed(time)
    );

    Ok(catalog)
}

// de
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Submissions {
    filings: Filings,
}

#[derive(Debug, Deserialize)]
struct Filings {
    recent: Recent,
}

// the API ships the history as index-aligned parallel arrays:
// `"recent": {
//      "accessionNumber": ["0000320193-24-000123", ...],
//      "filingDate": ["2024-11-01", ...],
//      "form": ["10-K", ...],
//      "primaryDocument": ["aapl-20240928.htm", ...],
//      ...
//  }`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Recent {
    accession_number: Vec<String>,
    filing_date: Vec<String>,
    form: Vec<String>,
    primary_document: Vec<String>,
}

/// One entry of a company's filing history: what was filed, when, and
/// where its primary document lives in the archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filing {
    pub form: String,
    pub accession: String,
    pub primary_doc: String,
    pub dated: NaiveDate,
}

/// Filing history for one company, newest first as served upstream. The
/// parallel arrays are zipped into records at decode time so nothing
/// downstream depends on index alignment; the upstream ordering is kept
/// as-is and never re-sorted.
#[derive(Debug)]
pub struct Catalog(Vec<Filing>);

impl TryFrom<Recent> for Catalog {
    type Error = anyhow::Error;

    fn try_from(recent: Recent) -> Result<Self, Self::Error> {
        let len = recent.form.len();
        anyhow::ensure!(
            recent.accession_number.len() == len
                && recent.filing_date.len() == len
                && recent.primary_document.len() == len,
            "submissions arrays disagree in length: {len} forms, {} accessions, {} dates, {} documents",
            recent.accession_number.len(),
            recent.filing_date.len(),
            recent.primary_document.len(),
        );

        let filings = recent
            .form
            .into_iter()
            .zip(recent.accession_number)
            .zip(recent.filing_date)
            .zip(recent.primary_document)
            .map(|(((form, accession), date), primary_doc)| {
                Ok(Filing {
                    form,
                    accession,
                    primary_doc,
                    dated: convert_date_type(&date)?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Catalog(filings))
    }
}

impl Catalog {
    /// The first `cap` filings whose form tag is on the allow-list, in
    /// catalog order.
    pub fn select(&self, forms: &[&str], cap: usize) -> Vec<&Filing> {
        self.0
            .iter()
            .filter(|filing| forms.contains(&filing.form.as_str()))
            .take(cap)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBMISSIONS: &str = r#"{
        "cik": "320193",
        "name": "Apple Inc.",
        "filings": {
            "recent": {
                "accessionNumber": [
                    "0000320193-24-000123",
                    "0000320193-24-000081",
                    "0000320193-24-000069",
                    "0000320193-24-000006"
                ],
                "filingDate": ["2024-11-01", "2024-08-02", "2024-07-23", "2024-02-02"],
                "form": ["10-K", "10-Q", "8-K", "10-Q"],
                "primaryDocument": [
                    "aapl-20240928.htm",
                    "aapl-20240629.htm",
                    "aapl-8k.htm",
                    "aapl-20231230.htm"
                ]
            }
        }
    }"#;

    fn catalog() -> Catalog {
        let submissions: Submissions = serde_json::from_str(SUBMISSIONS).unwrap();
        Catalog::try_from(submissions.filings.recent).unwrap()
    }

    #[test]
    fn zips_parallel_arrays_into_records() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 4);

        let first = &catalog.0[0];
        assert_eq!(first.form, "10-K");
        assert_eq!(first.accession, "0000320193-24-000123");
        assert_eq!(first.primary_doc, "aapl-20240928.htm");
        assert_eq!(first.dated.to_string(), "2024-11-01");
    }

    #[test]
    fn mismatched_arrays_are_refused() {
        let recent = Recent {
            accession_number: vec!["0000320193-24-000123".into()],
            filing_date: vec!["2024-11-01".into(), "2024-08-02".into()],
            form: vec!["10-K".into()],
            primary_document: vec!["aapl-20240928.htm".into()],
        };
        assert!(Catalog::try_from(recent).is_err());
    }

    #[test]
    fn select_keeps_catalog_order_and_skips_other_forms() {
        let catalog = catalog();
        let picked = catalog.select(&FORMS, MAX_FILINGS);

        let forms: Vec<&str> = picked.iter().map(|f| f.form.as_str()).collect();
        assert_eq!(forms, ["10-K", "10-Q", "10-Q"]);

        // newest first, untouched from the upstream order
        assert!(picked[0].dated > picked[1].dated);
        assert!(picked[1].dated > picked[2].dated);
    }

    #[test]
    fn select_caps_the_take() {
        let catalog = catalog();
        let picked = catalog.select(&FORMS, 2);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[1].form, "10-Q");
        assert_eq!(picked[1].dated.to_string(), "2024-08-02");
    }

    #[test]
    fn select_handles_empty_results() {
        let catalog = catalog();
        assert!(catalog.select(&["S-1"], MAX_FILINGS).is_empty());
        assert!(catalog.select(&FORMS, 0).is_empty());
    }
}
