use crate::cli::Cli;
use crate::tui;
use colored::Colorize;
use futures::{stream, StreamExt};
use pulp_spider::dispatch::Dispatcher;
use pulp_spider::edgar::filings::Summary;
use pulp_spider::edgar::tickers::Tickers;
use pulp_spider::edgar::{filings, submissions, tickers};
use std::path::Path;
use tracing::{debug, error, info, trace};

/// Pull filings for every requested ticker, strictly one at a time;
/// pacing matters more than throughput against this host.
pub(crate) async fn run(cli: Cli, tui: bool) -> anyhow::Result<()> {
    let symbols = gather_symbols(&cli)?;
    if symbols.is_empty() {
        println!("{}", "no ticker provided, exiting".yellow());
        return Ok(());
    }

    // one dispatcher for the whole run; every request queues at its gate
    let http = Dispatcher::new();

    // the company index covers every symbol, so fetch it once up front
    let index = tickers::fetch(&http).await?;

    let time = std::time::Instant::now();
    let mut summary = Summary::default();
    for symbol in symbols {
        if tui {
            println!("{} {}", "ticker:".dimmed(), symbol.cyan().bold());
        }

        if let Err(err) = process(&http, &index, &symbol, &cli.dir, tui, &mut summary).await {
            error!("{symbol}: {err:#}");
            if tui {
                println!("  {} {err:#}", "failed:".red());
            }
            summary.note_failure(format!("{symbol}: {err:#}"));
        }
    }
    info!(
        "pulp finished collecting filings, time elapsed: {:?}",
        time.elapsed()
    );

    report(&summary, tui);

    Ok(())
}

/// The full chain for one symbol: resolve it against the index, pull its
/// filing history, and download whichever selected filings are missing
/// from disk.
async fn process(
    http: &Dispatcher,
    index: &Tickers,
    symbol: &str,
    root: &Path,
    tui: bool,
    summary: &mut Summary,
) -> anyhow::Result<()> {
    let company = index
        .resolve(symbol)
        .ok_or_else(|| anyhow::anyhow!("no CIK found for ticker {symbol}"))?;
    debug!("resolved {symbol} to CIK{}", company.cik);
    if tui {
        println!("  {} {}", "cik:".dimmed(), company.cik.to_string().green());
    }

    let catalog = submissions::fetch(http, &company.cik).await?;
    let selection = catalog.select(&submissions::FORMS, submissions::MAX_FILINGS);
    if selection.is_empty() {
        info!("{symbol}: no annual or quarterly reports in the catalog");
        if tui {
            println!("  {}", "no 10-K or 10-Q filings found".yellow());
        }
        return Ok(());
    }
    debug!("{symbol}: {} filings selected", selection.len());

    let dir = root.join(format!("filings_{symbol}"));
    let bar = tui::download_bar(selection.len(), tui)?;

    let mut stream = stream::iter(selection);
    while let Some(filing) = stream.next().await {
        bar.set_message(format!("{} ({})", filing.form, filing.dated));
        let outcome = filings::download(http, company, filing, &dir).await;
        trace!("{} {} -> {outcome:?}", filing.form, filing.dated);
        summary.record(outcome);
        bar.inc(1);
    }
    bar.finish_and_clear();

    if tui {
        println!(
            "  {} {}\n",
            "saved in".dimmed(),
            dir.display().to_string().cyan()
        );
    }

    Ok(())
}

// read tickers from the arguments, or ask for one
fn gather_symbols(cli: &Cli) -> anyhow::Result<Vec<String>> {
    let mut symbols: Vec<String> = cli
        .tickers
        .iter()
        .map(|ticker| ticker.trim().to_uppercase())
        .filter(|ticker| !ticker.is_empty())
        .collect();

    if symbols.is_empty() {
        let answer: String = dialoguer::Input::new()
            .with_prompt("enter a ticker symbol (e.g. MSFT)")
            .allow_empty(true)
            .interact_text()?;

        let answer = answer.trim().to_uppercase();
        if !answer.is_empty() {
            symbols.push(answer);
        }
    }

    Ok(symbols)
}

fn report(summary: &Summary, tui: bool) {
    if tui {
        println!(
            "{} {} written, {} skipped, {} failed",
            "summary:".bold(),
            summary.written.to_string().green(),
            summary.skipped.to_string().yellow(),
            summary.failed().to_string().red(),
        );
        for failure in &summary.failures {
            println!("  {} {failure}", "x".red());
        }
    } else {
        info!(
            "summary: {} written, {} skipped, {} failed",
            summary.written,
            summary.skipped,
            summary.failed()
        );
        for failure in &summary.failures {
            error!("{failure}");
        }
    }
}
