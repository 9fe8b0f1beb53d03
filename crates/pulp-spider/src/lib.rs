pub mod dispatch;
pub mod edgar;
pub mod text;

/// Shortcut for required API elements.
pub(crate) mod http {
    pub(crate) use dotenv::var;
    pub(crate) use reqwest::Client as HttpClient;
    pub(crate) use reqwest::{Response, StatusCode};
}

/// Elapsed-time readout for debug logs.
pub(crate) fn time_elapsed(start: std::time::Instant) -> String {
    format!("time elapsed: {:.2?}", start.elapsed())
}
