//! Retry policy applied inside request execution

use std::{fmt, future::Future, sync::Arc, time::Duration};

use reqwest::{Request, Response, StatusCode};
use tracing::{debug, warn};

use crate::{
    config::BlingConfig,
    error::{BlingError, Result},
};

/// Decides whether the outcome of one attempt should be retried
pub type RetryPredicate = dyn Fn(&Result<Response>) -> bool + Send + Sync;

/// Retry policy: attempt budget, backoff schedule and retry predicate
///
/// The default policy performs no retries.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Maximum retries after the first attempt
    pub max_retries: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Backoff multiplier
    pub backoff_multiplier: f64,
    predicate: Option<Arc<RetryPredicate>>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self::new(0)
    }

    /// Exponential backoff starting at 500ms, capped at 30s
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            predicate: None,
        }
    }

    /// Derive a policy from client configuration
    pub fn from_config(config: &BlingConfig) -> Self {
        Self {
            initial_delay: config.retry_delay,
            ..Self::new(config.retry_count)
        }
    }

    /// Set the initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the delay cap
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Replace the default predicate (retryable errors, 5xx and 429)
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Result<Response>) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Whether this policy can retry at all
    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Calculate delay for given attempt number
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);

        let delay = Duration::from_millis(delay_ms as u64);
        std::cmp::min(delay, self.max_delay)
    }

    /// Ask the predicate whether `outcome` deserves another attempt
    pub fn should_retry(&self, outcome: &Result<Response>) -> bool {
        if !self.is_enabled() {
            return false;
        }
        match &self.predicate {
            Some(predicate) => predicate(outcome),
            None => default_predicate(outcome),
        }
    }

    /// Run `operation` with `request`, replaying a clone of it while the
    /// predicate asks for a retry and the budget allows
    ///
    /// A request whose body cannot be cloned (a stream) gets a single attempt.
    /// When the budget runs out on an error it is wrapped in
    /// [`BlingError::RetryLimitExceeded`]; a response is returned as-is.
    pub async fn execute<F, Fut>(&self, request: Request, operation: F) -> Result<Response>
    where
        F: Fn(Request) -> Fut,
        Fut: Future<Output = Result<Response>>,
    {
        let mut attempt = 0;
        let mut current = request;

        loop {
            let spare = if attempt < self.max_retries {
                let spare = current.try_clone();
                if spare.is_none() && attempt == 0 {
                    debug!("Request body cannot be replayed; retries disabled for this call");
                }
                spare
            } else {
                None
            };

            let outcome = operation(current).await;
            if !self.should_retry(&outcome) {
                if attempt > 0 && outcome.is_ok() {
                    debug!("Request succeeded after {attempt} retries");
                }
                return outcome;
            }

            let Some(next) = spare else {
                return match outcome {
                    Err(last) if attempt > 0 => Err(BlingError::RetryLimitExceeded {
                        attempts: attempt + 1,
                        last: Box::new(last),
                    }),
                    other => other,
                };
            };

            let delay = self.calculate_delay(attempt);
            match &outcome {
                Ok(response) => warn!(
                    "Request answered {} (attempt {}/{}), retrying in {:?}",
                    response.status(),
                    attempt + 1,
                    self.max_retries + 1,
                    delay
                ),
                Err(e) => warn!(
                    "Request failed (attempt {}/{}), retrying in {:?}: {}",
                    attempt + 1,
                    self.max_retries + 1,
                    delay,
                    e
                ),
            }
            drop(outcome);
            tokio::time::sleep(delay).await;

            current = next;
            attempt += 1;
        }
    }
}

fn default_predicate(outcome: &Result<Response>) -> bool {
    match outcome {
        Ok(response) => {
            let status = response.status();
            status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
        }
        Err(e) => e.is_retryable(),
    }
}
