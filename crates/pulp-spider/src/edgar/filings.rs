use super::common::Cik;
use super::submissions::Filing;
use super::tickers::Ticker;
use crate::dispatch::Dispatcher;
use crate::text;
use std::path::Path;
use tracing::{debug, error, trace};

// download
// ----------------------------------------------------------------------------

/// Per-filing result. Failures carry their reason; skips are the normal
/// incremental-run case and stay quiet.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Written,
    Skipped,
    Failed(String),
}

/// Fetch one filing's primary document, mill it to plaintext, and write
/// `{date}_{form}.txt` under `dir`. A file already on disk short-circuits
/// before any network traffic, so reruns only pull what is missing; the
/// first filing to claim a name keeps it.
pub async fn download(http: &Dispatcher, company: &Ticker, filing: &Filing, dir: &Path) -> Outcome {
    let target = dir.join(filename(filing));
    if target.exists() {
        trace!("{} already on disk, skipping", target.display());
        return Outcome::Skipped;
    }

    match fetch_and_write(http, company, filing, &target).await {
        Ok(()) => Outcome::Written,
        Err(err) => {
            error!("{} {} failed, error({err:#})", filing.form, filing.dated);
            Outcome::Failed(format!(
                "{} {} {}: {err:#}",
                company.ticker, filing.form, filing.dated
            ))
        }
    }
}

/// Output name for one filing: `{filing date}_{form}.txt`.
pub fn filename(filing: &Filing) -> String {
    format!("{}_{}.txt", filing.dated, filing.form)
}

/// Archive URL of the primary document: unpadded CIK, the accession
/// token with its dashes dropped, then the document name.
pub fn archive_url(cik: &Cik, filing: &Filing) -> String {
    format!(
        "https://www.sec.gov/Archives/edgar/data/{}/{}/{}",
        cik.unpadded(),
        filing.accession.replace('-', ""),
        filing.primary_doc
    )
}

async fn fetch_and_write(
    http: &Dispatcher,
    company: &Ticker,
    filing: &Filing,
    target: &Path,
) -> anyhow::Result<()> {
    let url = archive_url(&company.cik, filing);
    let response = http.get(&url).await?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("{url} returned HTTP {status}");
    }

    let raw = response.bytes().await?;
    let clean = text::plaintext(
        &raw,
        &text::Metadata {
            company: &company.title,
            cik: &company.cik,
            form: &filing.form,
            dated: filing.dated,
        },
    )?;

    if let Some(dir) = target.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(target, clean).await?;
    debug!("wrote {}", target.display());

    Ok(())
}

// summary
// ----------------------------------------------------------------------------

/// Run-level tally: what was written, what was already on disk, and the
/// failure reasons in the order they happened.
#[derive(Debug, Default)]
pub struct Summary {
    pub written: usize,
    pub skipped: usize,
    pub failures: Vec<String>,
}

impl Summary {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Written => self.written += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed(reason) => self.failures.push(reason),
        }
    }

    /// Symbol-level problems (resolution, catalog fetch) land here too,
    /// so the end-of-run report drops nothing.
    pub fn note_failure(&mut self, reason: impl Into<String>) {
        self.failures.push(reason.into());
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}
