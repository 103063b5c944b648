//! Client facade handing out request builders

use std::{fmt, sync::Arc};

use crate::{
    client::{HttpClient, HttpClientTrait},
    config::BlingConfig,
    error::Result,
    request::Request,
    retry::RetryPolicy,
};

/// Entry point: owns a shared transport and stamps out [`Request`] builders
///
/// Not synchronised; swap the transport before sharing the facade.
#[derive(Clone)]
pub struct Bling {
    client: Arc<dyn HttpClientTrait>,
    retry: RetryPolicy,
}

impl Bling {
    /// Facade over the default transport, without retries
    pub fn new() -> Result<Self> {
        Self::with_config(BlingConfig::default())
    }

    /// Facade whose transport and retry policy come from `config`
    pub fn with_config(config: BlingConfig) -> Result<Self> {
        let retry = RetryPolicy::from_config(&config);
        Ok(Self {
            client: Arc::new(HttpClient::new(config)?),
            retry,
        })
    }

    /// Facade over an injected transport
    pub fn with_client(client: Arc<dyn HttpClientTrait>) -> Self {
        Self {
            client,
            retry: RetryPolicy::none(),
        }
    }

    /// Replace the transport
    pub fn client(mut self, client: Arc<dyn HttpClientTrait>) -> Self {
        self.client = client;
        self
    }

    /// Replace the retry policy given to new requests
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Start a request with any method
    pub fn verb(&self, verb: impl Into<String>) -> Request {
        Request::new(Arc::clone(&self.client), verb).retry(self.retry.clone())
    }

    pub fn get(&self, path: &str) -> Request {
        self.verb("GET").path(path)
    }

    pub fn post(&self, path: &str) -> Request {
        self.verb("POST").path(path)
    }

    pub fn put(&self, path: &str) -> Request {
        self.verb("PUT").path(path)
    }

    pub fn patch(&self, path: &str) -> Request {
        self.verb("PATCH").path(path)
    }

    pub fn delete(&self, path: &str) -> Request {
        self.verb("DELETE").path(path)
    }

    pub fn head(&self, path: &str) -> Request {
        self.verb("HEAD").path(path)
    }
}

impl fmt::Debug for Bling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bling")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
