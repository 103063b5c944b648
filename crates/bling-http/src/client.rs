//! Transport capability and the default reqwest-backed implementation

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Request, Response};
use tracing::debug;

use crate::{
    config::BlingConfig,
    error::{BlingError, Result},
};

/// Mockable transport: executes one prepared request
///
/// Implementations are shared between the facade and every builder it hands
/// out, so they must be safe to call concurrently.
#[async_trait]
pub trait HttpClientTrait: Send + Sync {
    /// Send the request once and return whatever the server answered
    async fn execute(&self, request: Request) -> Result<Response>;
}

/// Production transport
pub struct HttpClient {
    inner: reqwest::Client,
    config: BlingConfig,
}

impl HttpClient {
    /// Create a new HTTP client with configuration
    pub fn new(config: BlingConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .redirect(if config.max_redirects > 0 {
                reqwest::redirect::Policy::limited(config.max_redirects)
            } else {
                reqwest::redirect::Policy::none()
            });

        // Configure proxy if provided
        if let Some(proxy_url) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| BlingError::InvalidProxy(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let inner = builder
            .build()
            .map_err(|e| BlingError::BuildError(e.to_string()))?;

        Ok(Self { inner, config })
    }

    /// Create HTTP client with default configuration
    pub fn with_defaults() -> Result<Self> {
        Self::new(BlingConfig::default())
    }

    /// Get underlying reqwest client (for advanced usage)
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }

    /// Get configuration
    pub fn config(&self) -> &BlingConfig {
        &self.config
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn execute(&self, request: Request) -> Result<Response> {
        debug!("HTTP {} {}", request.method(), request.url());
        self.inner.execute(request).await.map_err(BlingError::from)
    }
}

/// A bare reqwest client can be injected as-is
#[async_trait]
impl HttpClientTrait for reqwest::Client {
    async fn execute(&self, request: Request) -> Result<Response> {
        reqwest::Client::execute(self, request)
            .await
            .map_err(BlingError::from)
    }
}

/// Create a shared HTTP client (Arc-wrapped for cloning)
pub fn shared_client(config: BlingConfig) -> Result<Arc<dyn HttpClientTrait>> {
    Ok(Arc::new(HttpClient::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_client_creation_with_defaults() {
        let client = HttpClient::with_defaults();
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_creation_with_config() {
        let config = BlingConfig {
            timeout: Duration::from_secs(10),
            retry_count: 2,
            ..Default::default()
        };

        let client = HttpClient::new(config);
        assert!(client.is_ok());

        let client = client.unwrap();
        assert_eq!(client.config().timeout, Duration::from_secs(10));
        assert_eq!(client.config().retry_count, 2);
    }

    #[test]
    fn test_client_with_proxy() {
        let config = BlingConfig::default().with_proxy("http://proxy.example.com:8080");

        let client = HttpClient::new(config);
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_proxy() {
        let config = BlingConfig::default().with_proxy("http://[invalid");

        let result = HttpClient::new(config);
        assert!(matches!(result, Err(BlingError::InvalidProxy(_))));
    }

    #[test]
    fn test_client_without_redirects() {
        let config = BlingConfig::default().with_max_redirects(0);
        assert!(HttpClient::new(config).is_ok());
    }

    #[tokio::test]
    async fn test_execute_unreachable_host_is_transport_error() {
        // Bind then release a port so nothing is listening on it
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = HttpClient::new(BlingConfig::fast()).unwrap();
        let url = url::Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap();
        let result = client
            .execute(Request::new(reqwest::Method::GET, url))
            .await;
        match result {
            Err(err @ BlingError::Transport(_)) => assert!(err.is_retryable()),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_sends_configured_user_agent() {
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/agent"))
            .and(header("user-agent", "probe/1.0"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(BlingConfig::default().with_user_agent("probe/1.0")).unwrap();
        let url = url::Url::parse(&format!("{}/agent", server.uri())).unwrap();
        let response = client
            .execute(Request::new(reqwest::Method::GET, url))
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_shared_client_creation() {
        let config = BlingConfig::default();
        let client = shared_client(config);
        assert!(client.is_ok());
    }
}
