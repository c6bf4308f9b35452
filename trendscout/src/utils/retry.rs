//! Transport level retries for the trends client.
//!
//! Every request issued through [`crate::client::Client`] passes through
//! [`RetryMiddleware`], so backoff and jitter live in one place. The
//! middleware reads each body to the end before deciding, so a connection
//! dropped mid-body is retried like one dropped before the headers.

use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use std::sync::Mutex;
use std::time::Duration;

/// Upper bound for [`RetryPolicy::max_retries`].
pub const MAX_RETRIES: u8 = 3;

/// HTTP statuses retried by the transport.
pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Is the status retried by the transport.
pub fn is_retryable_status(status: u16) -> bool {
    RETRY_STATUSES.contains(&status)
}

/// Is the transport error worth another attempt: connect, timeout, request, body or redirect failures.
///
/// Bodies are buffered inside the middleware, so a decode kind error here is a
/// failed read of the body and is retried too.
pub fn is_retryable_error(err: &reqwest_middleware::Error) -> bool {
    match err {
        reqwest_middleware::Error::Reqwest(e) => {
            e.is_connect()
                || e.is_timeout()
                || e.is_request()
                || e.is_body()
                || e.is_decode()
                || e.is_redirect()
        }
        reqwest_middleware::Error::Middleware(_) => false,
    }
}

/// Exponential backoff with jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
    /// Attempts after the first, at most [`MAX_RETRIES`]. 0 disables retrying.
    pub max_retries: u8,
    /// Delay before the first retry, doubled on each further attempt.
    pub base_delay: Duration,
    /// Upper bound for a single delay, including jitter and `Retry-After`.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (0 based): `base * 2^attempt` plus jitter in `[0, base)`,
    /// raised to the server hint when present, capped at `max_delay`.
    pub fn delay_for(
        &self,
        attempt: u32,
        retry_after: Option<Duration>,
        rng: &mut fastrand::Rng,
    ) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)));
        let base_nanos = self.base_delay.as_nanos().min(u64::MAX as u128) as u64;
        let jitter = if base_nanos > 0 {
            Duration::from_nanos(rng.u64(0..base_nanos))
        } else {
            Duration::ZERO
        };

        let mut delay = exp.saturating_add(jitter);

        if let Some(hint) = retry_after {
            delay = delay.max(hint);
        }

        delay.min(self.max_delay)
    }

    /// Retry count used at runtime, capped at [`MAX_RETRIES`].
    pub fn retries(&self) -> u8 {
        self.max_retries.min(MAX_RETRIES)
    }

    /// Worst case time spent sleeping between the attempts of one request.
    pub fn max_total_delay(&self) -> Duration {
        (0..self.retries() as u32)
            .map(|attempt| {
                self.base_delay
                    .saturating_mul(2u32.saturating_pow(attempt.min(16)))
                    .saturating_add(self.base_delay)
                    .min(self.max_delay)
            })
            .fold(Duration::ZERO, |acc, d| acc.saturating_add(d))
    }
}

/// `reqwest-middleware` layer that replays failed requests per [`RetryPolicy`].
pub struct RetryMiddleware {
    policy: RetryPolicy,
    rng: Mutex<fastrand::Rng>,
}

impl RetryMiddleware {
    /// Create the middleware with a random jitter seed.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Create the middleware with a fixed jitter seed.
    pub fn with_seed(policy: RetryPolicy, seed: u64) -> Self {
        Self {
            policy,
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }

    fn next_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.policy.delay_for(attempt, retry_after, &mut rng)
    }
}

/// Read the whole body and rebuild the response around the bytes.
async fn buffer(res: Response) -> Result<Response, reqwest::Error> {
    let status = res.status();
    let version = res.version();
    let headers = res.headers().clone();
    let body = res.bytes().await?;

    let mut buffered = http::Response::new(body);
    *buffered.status_mut() = status;
    *buffered.version_mut() = version;
    *buffered.headers_mut() = headers;

    Ok(Response::from(buffered))
}

/// Seconds from a `Retry-After` header, HTTP-date form is ignored.
fn retry_after(res: &Response) -> Option<Duration> {
    res.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait::async_trait]
impl Middleware for RetryMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let mut attempt: u32 = 0;
        let max_retries = self.policy.retries();

        loop {
            let duplicate = match req.try_clone() {
                Some(r) => r,
                // streaming bodies cannot be replayed
                None => return next.run(req, extensions).await,
            };

            let result = match next.clone().run(duplicate, extensions).await {
                Ok(res) => buffer(res).await.map_err(reqwest_middleware::Error::Reqwest),
                Err(err) => Err(err),
            };

            let hint = match &result {
                Ok(res) if is_retryable_status(res.status().as_u16()) => Some(retry_after(res)),
                Err(err) if is_retryable_error(err) => Some(None),
                _ => None,
            };

            match hint {
                Some(hint) if attempt < max_retries as u32 => {
                    let delay = self.next_delay(attempt, hint);
                    match &result {
                        Ok(res) => log::warn!(
                            "retry {}/{} for {} after HTTP {} in {:?}",
                            attempt + 1,
                            max_retries,
                            req.url().path(),
                            res.status(),
                            delay
                        ),
                        Err(err) => log::warn!(
                            "retry {}/{} for {} after {} in {:?}",
                            attempt + 1,
                            max_retries,
                            req.url().path(),
                            err,
                            delay
                        ),
                    }
                    drop(result);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Some(_) => {
                    log::error!(
                        "exceeded {} retries for {}",
                        max_retries,
                        req.url().path()
                    );
                    return result;
                }
                None => return result,
            }
        }
    }
}
