//! Live HTTP source with an explicit timeout and retry budget.

use super::{RegistrationSource, SourceError};
use reqwest::blocking::Client;
use std::thread::sleep;
use std::time::Duration;
use tracing::{info, warn};

/// How many times to retry a failed fetch and how long to wait in between.
/// The delay doubles after every failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Run `op` until it succeeds or the retry budget is spent.
///
/// `op` receives the 1-based attempt number.
pub fn with_retry<T, F>(policy: &RetryPolicy, mut op: F) -> Result<T, SourceError>
where
    F: FnMut(u32) -> Result<T, SourceError>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if attempt <= policy.max_retries => {
                let delay = policy.backoff(attempt);
                warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "Retrying");
                sleep(delay);
            }
            Err(e) => {
                return Err(SourceError::RetriesExhausted {
                    attempts: attempt,
                    last: e.to_string(),
                })
            }
        }
    }
}

/// Fetches a CSV export over HTTP.
pub struct HttpSource {
    url: String,
    client: Client,
    policy: RetryPolicy,
}

impl HttpSource {
    pub fn new(url: impl Into<String>, timeout: Duration, policy: RetryPolicy) -> Result<Self, SourceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
            policy,
        })
    }
}

impl RegistrationSource for HttpSource {
    fn name(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        with_retry(&self.policy, |attempt| {
            info!(url = %self.url, attempt, "Fetching registrations");
            let resp = self.client.get(&self.url).send()?;
            if !resp.status().is_success() {
                return Err(SourceError::Status(resp.status().as_u16()));
            }
            Ok(resp.bytes()?.to_vec())
        })
    }

    fn is_live(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_wait(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::ZERO,
        }
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let mut calls = 0;
        let result = with_retry(&no_wait(3), |attempt| {
            calls += 1;
            if attempt < 3 {
                Err(SourceError::Status(503))
            } else {
                Ok(attempt)
            }
        });

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn gives_up_once_budget_is_spent() {
        let mut calls = 0;
        let result: Result<(), _> = with_retry(&no_wait(2), |_| {
            calls += 1;
            Err(SourceError::Status(500))
        });

        assert_eq!(calls, 3);
        match result {
            Err(SourceError::RetriesExhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last, "HTTP status 500");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 4,
            initial_backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
    }
}
