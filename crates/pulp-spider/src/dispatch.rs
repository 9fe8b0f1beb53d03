use crate::http::*;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{trace, warn};

/// SEC fair-access guidance caps clients at 10 requests per second;
/// stay comfortably under it.
const REQUESTS_PER_SEC: u32 = 8;
const BURST: u32 = 8;

/// Retries granted per request once the server starts throttling.
const MAX_RETRIES: u32 = 5;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

const HTTP_TIMEOUT: Duration = Duration::from_secs(45);
const DEFAULT_USER_AGENT: &str = "pulp admin@example.com";

// dispatcher
// ----------------------------------------------------------------------------

/// Single front door for outbound traffic. Every component GETs through
/// one shared `Dispatcher`, so pacing and retry policy hold across the
/// whole run rather than per call site.
pub struct Dispatcher {
    client: HttpClient,
    gate: Mutex<TokenBucket>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            client: build_client(),
            gate: Mutex::new(TokenBucket::new(REQUESTS_PER_SEC, BURST)),
        }
    }

    /// GET `url`, waiting at the admission gate first. Throttling
    /// responses are retried with backoff, and each retry queues at the
    /// gate again like any fresh request. Any other status is returned
    /// to the caller untouched; transport failures are not retried.
    pub async fn get(&self, url: &str) -> Result<Response, DispatchError> {
        let mut attempt = 0;
        loop {
            self.admit().await;
            trace!("GET {url}");
            let response = self.client.get(url).send().await?;
            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            attempt += 1;
            let retry = next_retry(response.headers(), attempt, Utc::now());
            // release the throttled connection before sleeping on it
            drop(response);
            match retry {
                Some(delay) => {
                    warn!("{url} throttled, retry {attempt}/{MAX_RETRIES} in {delay:?}");
                    tokio::time::sleep(delay).await;
                }
                None => {
                    return Err(DispatchError::RetriesExhausted {
                        url: url.to_string(),
                        retries: MAX_RETRIES,
                    })
                }
            }
        }
    }

    // block until the bucket hands out a token
    async fn admit(&self) {
        loop {
            let wait = self.gate.lock().await.poll(Instant::now());
            match wait {
                None => return,
                Some(delay) => tokio::time::sleep(delay).await,
            }
        }
    }
}

fn build_client() -> HttpClient {
    // SEC fair-access policy wants a contact string on every request
    let contact = var("USER_AGENT").unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());
    reqwest::ClientBuilder::new()
        .user_agent(contact)
        .timeout(HTTP_TIMEOUT)
        .build()
        .expect("failed to build reqwest client")
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{url} still throttled after {retries} retries")]
    RetriesExhausted { url: String, retries: u32 },
}

// backoff
// ----------------------------------------------------------------------------

/// A throttling response either earns another paced retry or, once the
/// budget is spent, ends the request for good. `attempt` is 1-based:
/// the first throttled response asks for attempt 1.
fn next_retry(headers: &HeaderMap, attempt: u32, now: DateTime<Utc>) -> Option<Duration> {
    (attempt <= MAX_RETRIES).then(|| throttle_delay(headers, attempt, now))
}

/// Wait before retry `attempt`: the server's `Retry-After` hint when
/// usable, else a linear ramp off the default delay.
fn throttle_delay(headers: &HeaderMap, attempt: u32, now: DateTime<Utc>) -> Duration {
    retry_after(headers, now).unwrap_or(DEFAULT_RETRY_DELAY * attempt)
}

/// `Retry-After` carries either delay-seconds or an HTTP-date. Zero,
/// garbage, and dates already in the past are all discarded so the
/// caller falls back to its own ramp.
fn retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let value = value.trim();

    if let Ok(secs) = value.parse::<u64>() {
        return (secs > 0).then(|| Duration::from_secs(secs));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let delay = (date.with_timezone(&Utc) - now).to_std().ok()?;
    (!delay.is_zero()).then_some(delay)
}

// token bucket
// ----------------------------------------------------------------------------

/// Admission gate: `rate` tokens accrue per second up to `burst`, and
/// each request spends one. The clock is passed in so the pacing math
/// stays testable without sleeping.
#[derive(Debug)]
struct TokenBucket {
    rate: f64,
    burst: f64,
    tokens: f64,
    refilled: Instant,
}

impl TokenBucket {
    fn new(rate: u32, burst: u32) -> Self {
        Self {
            rate: rate as f64,
            burst: burst as f64,
            tokens: burst as f64,
            refilled: Instant::now(),
        }
    }

    /// Take a token if one is available at `now`, otherwise say how long
    /// until the next one accrues. Backoff sleeps never hand tokens
    /// back, so a retried request queues like any other.
    fn poll(&mut self, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(self.refilled).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.burst);
        self.refilled = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            Some(Duration::from_secs_f64((1.0 - self.tokens) / self.rate))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_retry_after(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, value.parse().unwrap());
        headers
    }

    #[test]
    fn bucket_admits_full_burst_immediately() {
        let mut bucket = TokenBucket::new(8, 8);
        let t0 = Instant::now();
        for _ in 0..8 {
            assert_eq!(bucket.poll(t0), None);
        }
        // ninth caller waits for one token to accrue at 8/s
        assert_eq!(bucket.poll(t0), Some(Duration::from_millis(125)));
    }

    #[test]
    fn bucket_refills_at_rate() {
        let mut bucket = TokenBucket::new(8, 8);
        let t0 = Instant::now();
        for _ in 0..8 {
            assert_eq!(bucket.poll(t0), None);
        }
        // half a second later, four tokens have accrued
        let t1 = t0 + Duration::from_millis(500);
        for _ in 0..4 {
            assert_eq!(bucket.poll(t1), None);
        }
        assert!(bucket.poll(t1).is_some());
    }

    #[test]
    fn bucket_never_exceeds_burst() {
        let mut bucket = TokenBucket::new(8, 8);
        let t0 = Instant::now();
        assert_eq!(bucket.poll(t0), None);

        // a long idle stretch still caps the bucket at `burst` tokens
        let t1 = t0 + Duration::from_secs(60);
        for _ in 0..8 {
            assert_eq!(bucket.poll(t1), None);
        }
        assert!(bucket.poll(t1).is_some());
    }

    #[test]
    fn retry_after_in_seconds() {
        let headers = headers_with_retry_after("7");
        assert_eq!(
            retry_after(&headers, Utc::now()),
            Some(Duration::from_secs(7))
        );
    }

    #[test]
    fn retry_after_http_date() {
        let now = Utc::now();
        let headers = headers_with_retry_after(&(now + chrono::Duration::seconds(90)).to_rfc2822());

        // rfc2822 drops subseconds, so allow a second of slack
        let delay = retry_after(&headers, now).unwrap();
        assert!(delay >= Duration::from_secs(89) && delay <= Duration::from_secs(90));
    }

    #[test]
    fn retry_after_rejects_past_dates_and_garbage() {
        let now = Utc::now();
        let stale = headers_with_retry_after(&(now - chrono::Duration::seconds(60)).to_rfc2822());
        assert_eq!(retry_after(&stale, now), None);

        assert_eq!(retry_after(&headers_with_retry_after("soon"), now), None);
        assert_eq!(retry_after(&headers_with_retry_after("0"), now), None);
        assert_eq!(retry_after(&HeaderMap::new(), now), None);
    }

    #[test]
    fn throttle_delay_ramps_linearly_without_hint() {
        let headers = HeaderMap::new();
        let now = Utc::now();
        assert_eq!(throttle_delay(&headers, 1, now), Duration::from_secs(5));
        assert_eq!(throttle_delay(&headers, 3, now), Duration::from_secs(15));
        assert_eq!(throttle_delay(&headers, 5, now), Duration::from_secs(25));
    }

    #[test]
    fn throttle_delay_prefers_server_hint() {
        let headers = headers_with_retry_after("2");
        assert_eq!(
            throttle_delay(&headers, 4, Utc::now()),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn retry_budget_ends_after_max_retries() {
        let headers = HeaderMap::new();
        let now = Utc::now();
        for attempt in 1..=MAX_RETRIES {
            assert!(next_retry(&headers, attempt, now).is_some());
        }
        // the response after the final retry is terminal
        assert_eq!(next_retry(&headers, MAX_RETRIES + 1, now), None);
    }
}
