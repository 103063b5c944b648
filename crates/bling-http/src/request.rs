//! Fluent request builder and execution

use std::{fmt, sync::Arc, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Body, Method, Response,
};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::{
    body::BodyInput,
    client::HttpClientTrait,
    error::{BlingError, Result},
    reply::Reply,
    retry::RetryPolicy,
    uri::UriReference,
};

/// Request under construction
///
/// Every chain method takes and returns the builder. The first error raised
/// while building is kept, turns later chain calls into no-ops and is
/// returned by whichever terminal method runs the request.
pub struct Request {
    client: Arc<dyn HttpClientTrait>,
    verb: String,
    raw_url: String,
    headers: Option<HeaderMap>,
    body: Option<Body>,
    timeout: Option<Duration>,
    retry: RetryPolicy,
    error: Option<BlingError>,
}

impl Request {
    /// Start a request with an empty URL
    ///
    /// `verb` is not checked here; anything that is not a valid method token
    /// fails when the request is sent.
    pub fn new(client: Arc<dyn HttpClientTrait>, verb: impl Into<String>) -> Self {
        Self {
            client,
            verb: verb.into(),
            raw_url: String::new(),
            headers: None,
            body: None,
            timeout: None,
            retry: RetryPolicy::none(),
            error: None,
        }
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// The URL as resolved so far
    ///
    /// This is the resolved reference text, not a normalised URL: characters
    /// such as spaces are not percent-encoded until the request is built, and
    /// a relative start stays relative (`""` + `foo` is `foo`, not `/foo`).
    pub fn url(&self) -> &str {
        &self.raw_url
    }

    pub fn headers(&self) -> Option<&HeaderMap> {
        self.headers.as_ref()
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// The deferred error, if one was raised while building
    pub fn error(&self) -> Option<&BlingError> {
        self.error.as_ref()
    }

    /// Resolve `path` against the current URL as a URI reference
    ///
    /// `http://h/foo` + `bar` gives `http://h/bar`; `http://h/foo/` + `bar`
    /// gives `http://h/foo/bar`; an absolute `path` replaces the URL. If
    /// either side does not parse the URL is left as it was and no error is
    /// recorded.
    pub fn path(mut self, path: &str) -> Self {
        if self.error.is_some() {
            return self;
        }

        let resolved = UriReference::parse(&self.raw_url)
            .and_then(|base| Ok(base.resolve(&UriReference::parse(path)?)));
        match resolved {
            Ok(uri) => self.raw_url = uri.to_string(),
            Err(e) => debug!("Ignoring path {path:?} on {:?}: {e}", self.raw_url),
        }
        self
    }

    /// Set a header, replacing any earlier value for the same name
    pub fn set_header(mut self, key: &str, value: &str) -> Self {
        if self.error.is_some() {
            return self;
        }

        let name = match HeaderName::from_bytes(key.as_bytes()) {
            Ok(name) => name,
            Err(e) => {
                self.error = Some(BlingError::InvalidHeader(format!("{key:?}: {e}")));
                return self;
            }
        };
        let value = match HeaderValue::from_str(value) {
            Ok(value) => value,
            Err(e) => {
                self.error = Some(BlingError::InvalidHeader(format!("{key}: {e}")));
                return self;
            }
        };

        self.headers
            .get_or_insert_with(HeaderMap::new)
            .insert(name, value);
        self
    }

    /// Set the body from a file path, bytes or a stream
    ///
    /// A file that cannot be read or an unsupported input becomes the
    /// deferred error and any previous body is kept.
    pub fn body(mut self, input: impl Into<BodyInput>) -> Self {
        if self.error.is_some() {
            return self;
        }

        match input.into().into_body() {
            Ok(body) => self.body = Some(body),
            Err(e) => self.error = Some(e),
        }
        self
    }

    /// Serialize `value` as the JSON body and set `Content-Type`
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        if self.error.is_some() {
            return self;
        }

        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.body = Some(Body::from(bytes));
                self.set_header(CONTENT_TYPE.as_str(), "application/json")
            }
            Err(e) => {
                self.error = Some(BlingError::Serialization(e));
                self
            }
        }
    }

    /// Bound each transport call and the body read
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Retry policy for this request only
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Turn the builder into a transport request without sending it
    pub fn build(self) -> Result<reqwest::Request> {
        if let Some(err) = self.error {
            return Err(err);
        }
        build_request(&self.verb, &self.raw_url, self.headers, self.body)
    }

    /// Send the request and hand back the transport response untouched
    ///
    /// Reading (or dropping) the response body is up to the caller.
    pub async fn send_raw(self) -> Result<Response> {
        self.perform().await
    }

    /// Send the request and buffer the whole response into a [`Reply`]
    ///
    /// Building and transport failures are returned as errors. A failure
    /// while reading the body yields a reply that only carries that error.
    pub async fn send(self) -> Result<Reply> {
        let timeout = self.timeout;
        let response = self.perform().await?;
        Ok(Reply::from_response(response, timeout).await)
    }

    async fn perform(self) -> Result<Response> {
        let Request {
            client,
            verb,
            raw_url,
            headers,
            body,
            timeout,
            retry,
            error,
        } = self;

        if let Some(err) = error {
            debug!("Not sending {verb} {raw_url:?}: {err}");
            return Err(err);
        }

        let request = build_request(&verb, &raw_url, headers, body)?;
        debug!("HTTP {} {}", request.method(), request.url());

        retry
            .execute(request, |request| {
                let client = Arc::clone(&client);
                async move { send_once(client.as_ref(), request, timeout).await }
            })
            .await
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("verb", &self.verb)
            .field("url", &self.raw_url)
            .field("headers", &self.headers)
            .field("body", &self.body.is_some())
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("error", &self.error)
            .finish()
    }
}

fn build_request(
    verb: &str,
    raw_url: &str,
    headers: Option<HeaderMap>,
    body: Option<Body>,
) -> Result<reqwest::Request> {
    let method = Method::from_bytes(verb.as_bytes())
        .map_err(|e| BlingError::RequestConstruction(format!("invalid method {verb:?}: {e}")))?;
    let url = Url::parse(raw_url)
        .map_err(|e| BlingError::RequestConstruction(format!("invalid URL {raw_url:?}: {e}")))?;

    let mut request = reqwest::Request::new(method, url);
    if let Some(headers) = headers {
        *request.headers_mut() = headers;
    }
    *request.body_mut() = body;
    Ok(request)
}

async fn send_once(
    client: &dyn HttpClientTrait,
    request: reqwest::Request,
    timeout: Option<Duration>,
) -> Result<Response> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, client.execute(request))
            .await
            .map_err(|_| BlingError::Timeout(limit))?,
        None => client.execute(request).await,
    }
}
