//! Retry with exponential backoff and jitter.
//!
//! `with_retry` runs an async operation up to `max_retries + 1` times. Between
//! attempts it sleeps `min(base_delay * 2^attempt, max_delay)` plus up to 10%
//! random jitter. Whether a failure is worth retrying is decided by a
//! caller-supplied predicate; [`TransientErrorPolicy`] is the default one.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::AceError;

/// HTTP statuses that indicate a transient server-side condition.
pub const TRANSIENT_STATUS_CODES: &[u16] = &[429, 502, 503, 504];

/// Lower-cased substrings that identify network-level failures.
const NETWORK_ERROR_MARKERS: &[&str] = &[
    "econnrefused",
    "econnreset",
    "enotfound",
    "etimedout",
    "connection refused",
    "connection reset",
    "dns error",
    "failed to lookup address",
    "timed out",
    "fetch failed",
    "error sending request",
];

// ─── Options ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RetryOptions {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl RetryOptions {
    /// Backoff before jitter for a 0-based attempt index.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Backoff plus jitter drawn from `[0, 0.1 * backoff)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.backoff(attempt);
        backoff + jitter(backoff)
    }
}

fn jitter(delay: Duration) -> Duration {
    let ceiling = delay.as_secs_f64() * 0.1;
    if ceiling <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(rand::thread_rng().gen_range(0.0..ceiling))
}

// ─── Transient error policy ────────────────────────────────────────────────

/// Stateless retryability predicate: network failures and transient HTTP
/// statuses are retried, everything else is surfaced immediately.
#[derive(Debug, Clone, Copy)]
pub struct TransientErrorPolicy {
    pub status_codes: &'static [u16],
    pub network_markers: &'static [&'static str],
}

impl Default for TransientErrorPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TransientErrorPolicy {
    pub const DEFAULT: Self = Self {
        status_codes: TRANSIENT_STATUS_CODES,
        network_markers: NETWORK_ERROR_MARKERS,
    };

    /// Inspect a rendered error message, e.g. `"Fabric API error (503): ..."`.
    pub fn is_transient_message(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        if self.network_markers.iter().any(|m| lower.contains(m)) {
            return true;
        }
        self.status_codes
            .iter()
            .any(|code| message.contains(&format!("({})", code)))
    }

    pub fn is_transient(&self, err: &AceError) -> bool {
        match err {
            AceError::Network(_) => true,
            AceError::InvalidUrl(_) | AceError::Http(_) => false,
            AceError::Api { status, .. } => self.status_codes.contains(status),
            other => self.is_transient_message(&other.to_string()),
        }
    }
}

/// Default predicate used by the Fabric client.
pub fn is_transient_error(err: &AceError) -> bool {
    TransientErrorPolicy::DEFAULT.is_transient(err)
}

// ─── Retry loop ────────────────────────────────────────────────────────────

/// Run `operation` until it succeeds, `should_retry` rejects the error, or
/// `max_retries` retries have been spent. The last error is returned as-is.
pub async fn with_retry<T, E, F, Fut, P>(
    options: &RetryOptions,
    should_retry: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= options.max_retries || !should_retry(&err) {
                    return Err(err);
                }
                let delay = options.delay_for(attempt);
                tracing::warn!(
                    "[Retry] Attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt + 1,
                    options.max_retries + 1,
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
