use crate::edgar::Cik;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

/// Column width for the markup-to-text render.
const WRAP_COLS: usize = 80;

lazy_static! {
    // whole lines of leftover XBRL schema and namespace URIs
    static ref SCHEMA_LINE: Regex =
        Regex::new(r"(?m)^(http|https|xmlns|xbrli):.*$").unwrap();
    // a currency sign, minus, or opening parenthesis drifted off its figure
    static ref DRIFT_OPEN: Regex = Regex::new(r"([$(\-])\s+").unwrap();
    static ref DRIFT_CLOSE: Regex = Regex::new(r"\s+\)").unwrap();
    static ref WHITESPACE_LINE: Regex = Regex::new(r"(?m)^[ \t]+$").unwrap();
    static ref PAGE_MARKER_LINE: Regex =
        Regex::new(r"(?m)^(\s*\d+\s*|\s*[Pp]age\s+\d+\s*)$").unwrap();
    static ref BLANK_RUN: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Header fields stamped on every output document.
#[derive(Debug)]
pub struct Metadata<'a> {
    pub company: &'a str,
    pub cik: &'a Cik,
    pub form: &'a str,
    pub dated: NaiveDate,
}

/// Full mill: render the raw filing markup to text, scrub it, and stamp
/// the metadata header on top.
pub fn plaintext(raw: &[u8], meta: &Metadata) -> anyhow::Result<String> {
    let rendered = render(raw)?;
    Ok(with_header(meta, &scrub(&rendered)))
}

/// Markup-to-text render. Raw mode flattens table cells into the text
/// flow instead of drawing bordered grids, which would otherwise bury
/// every financial statement in box-drawing characters.
fn render(raw: &[u8]) -> anyhow::Result<String> {
    Ok(html2text::config::plain()
        .raw_mode(true)
        .string_from_read(raw, WRAP_COLS)?)
}

// scrub
// ----------------------------------------------------------------------------

// the scrub chain, in execution order; each stage leaves its own output
// fixed, so re-running the chain over scrubbed text changes nothing
const STAGES: [fn(&str) -> String; 7] = [
    unstick_nbsp,
    strip_schema_lines,
    reglue_figures,
    blank_whitespace_lines,
    strip_page_markers,
    collapse_blank_runs,
    trim_document,
];

/// Scrub rendered filing text into its normalized form.
pub fn scrub(text: &str) -> String {
    STAGES
        .iter()
        .fold(text.to_string(), |text, stage| stage(&text))
}

// non-breaking spaces pad half the tables EDGAR serves; turn them into
// real spaces so the line rules below can see them
fn unstick_nbsp(text: &str) -> String {
    text.replace('\u{a0}', " ")
}

// inline XBRL leaves whole lines of schema URIs behind
fn strip_schema_lines(text: &str) -> String {
    SCHEMA_LINE.replace_all(text, "").into_owned()
}

// "$ 1,000" -> "$1,000", "( 500 )" -> "(500)"; table cell boundaries
// scatter these during the render
fn reglue_figures(text: &str) -> String {
    let text = DRIFT_OPEN.replace_all(text, "$1");
    DRIFT_CLOSE.replace_all(&text, ")").into_owned()
}

// lines of pure spaces and tabs become truly empty
fn blank_whitespace_lines(text: &str) -> String {
    WHITESPACE_LINE.replace_all(text, "").into_owned()
}

// standalone page numbers and "Page N" markers carry no content
fn strip_page_markers(text: &str) -> String {
    PAGE_MARKER_LINE.replace_all(text, "").into_owned()
}

// three or more newlines collapse to one paragraph break
fn collapse_blank_runs(text: &str) -> String {
    BLANK_RUN.replace_all(text, "\n\n").into_owned()
}

fn trim_document(text: &str) -> String {
    text.trim().to_string()
}

// header
// ----------------------------------------------------------------------------

/// Stamp the metadata block above the body, blank-line separated.
pub fn with_header(meta: &Metadata, body: &str) -> String {
    format!(
        "--- METADATA ---\n\
         COMPANY: {}\n\
         CIK: {}\n\
         FORM: {}\n\
         DATE: {}\n\
         ----------------\n\n{}",
        meta.company, meta.cik, meta.form, meta.dated, body
    )
}
