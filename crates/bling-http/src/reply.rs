//! Buffered response snapshot

use std::time::Duration;

use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, CONTENT_TYPE},
    Response,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{BlingError, Result};

/// A fully buffered response
///
/// Built once by [`Request::send`](crate::Request::send) and never changed
/// afterwards. When the body could not be read the reply only carries the
/// error: status `0`, no headers, empty body.
#[derive(Debug, Default)]
pub struct Reply {
    status: u16,
    content_type: String,
    headers: HeaderMap,
    body: Bytes,
    error: Option<BlingError>,
}

impl Reply {
    pub(crate) async fn from_response(response: Response, timeout: Option<Duration>) -> Self {
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = match timeout {
            Some(limit) => match tokio::time::timeout(limit, response.bytes()).await {
                Ok(read) => read.map_err(|e| BlingError::BodyRead(e.to_string())),
                Err(_) => Err(BlingError::BodyRead(format!(
                    "timed out after {limit:?}"
                ))),
            },
            None => response
                .bytes()
                .await
                .map_err(|e| BlingError::BodyRead(e.to_string())),
        };

        match body {
            Ok(body) => Self {
                status,
                content_type,
                headers,
                body,
                error: None,
            },
            Err(err) => {
                debug!("Discarding response with status {status}: {err}");
                Self::failed(err)
            }
        }
    }

    pub(crate) fn failed(error: BlingError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// Status code, `0` when the body could not be read
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Copy the status code out and keep chaining
    pub fn status_into(&self, status: &mut u16) -> &Self {
        *status = self.status;
        self
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as text, invalid UTF-8 replaced
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Error hit while buffering the body
    pub fn error(&self) -> Option<&BlingError> {
        self.error.as_ref()
    }

    pub fn has_2xx_status(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Decode the JSON body into `success` for a 2xx status, else into `failure`
    ///
    /// The chosen target being `None` is a no-op. A reply that failed to
    /// buffer its body reports that failure instead of decoding.
    pub fn decode_into<S, E>(&self, success: Option<&mut S>, failure: Option<&mut E>) -> Result<()>
    where
        S: DeserializeOwned,
        E: DeserializeOwned,
    {
        if let Some(err) = &self.error {
            return Err(match err {
                BlingError::BodyRead(message) => BlingError::BodyRead(message.clone()),
                other => BlingError::BodyRead(other.to_string()),
            });
        }

        if self.has_2xx_status() {
            if let Some(target) = success {
                *target = self.json()?;
            }
        } else if let Some(target) = failure {
            *target = self.json()?;
        }
        Ok(())
    }

    /// Decode the JSON body regardless of status
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(BlingError::decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeErrorKind;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Payload {
        status: String,
        data: String,
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct ApiError {
        message: String,
    }

    async fn reply(status: u16, body: &'static str) -> Reply {
        let response = http::Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(body)
            .unwrap();
        Reply::from_response(Response::from(response), None).await
    }

    #[tokio::test]
    async fn test_from_response_captures_everything() {
        let reply = reply(200, r#"{"status": "okay", "data": "bling"}"#).await;
        assert_eq!(reply.status(), 200);
        assert_eq!(reply.content_type(), "application/json");
        assert_eq!(reply.text(), r#"{"status": "okay", "data": "bling"}"#);
        assert!(reply.headers().contains_key("content-type"));
        assert!(reply.error().is_none());
    }

    #[tokio::test]
    async fn test_status_into() {
        let reply = reply(201, "{}").await;
        let mut status = 0;
        assert!(reply.status_into(&mut status).has_2xx_status());
        assert_eq!(status, 201);
    }

    #[tokio::test]
    async fn test_has_2xx_status_bounds() {
        assert!(reply(200, "").await.has_2xx_status());
        assert!(reply(299, "").await.has_2xx_status());
        assert!(!reply(199, "").await.has_2xx_status());
        assert!(!reply(300, "").await.has_2xx_status());
        assert!(!reply(404, "").await.has_2xx_status());
    }

    #[tokio::test]
    async fn test_decode_into_success_target() {
        let reply = reply(200, r#"{"status": "okay", "data": "bling"}"#).await;
        let mut payload = Payload::default();
        let mut api_error = ApiError::default();

        reply
            .decode_into(Some(&mut payload), Some(&mut api_error))
            .unwrap();

        assert_eq!(payload.data, "bling");
        assert_eq!(api_error, ApiError::default());
    }

    #[tokio::test]
    async fn test_decode_into_error_target() {
        let reply = reply(404, r#"{"message": "no such thing"}"#).await;
        let mut payload = Payload::default();
        let mut api_error = ApiError::default();

        reply
            .decode_into(Some(&mut payload), Some(&mut api_error))
            .unwrap();

        assert_eq!(api_error.message, "no such thing");
        assert_eq!(payload, Payload::default());
    }

    #[tokio::test]
    async fn test_decode_into_absent_target_is_noop() {
        let reply = reply(500, "not json at all").await;
        let mut payload = Payload::default();

        reply
            .decode_into(Some(&mut payload), None::<&mut ApiError>)
            .unwrap();
        assert_eq!(payload, Payload::default());
    }

    #[tokio::test]
    async fn test_decode_errors_are_classified() {
        let malformed = reply(200, r#"{"status": "#).await;
        let err = malformed.json::<Payload>().unwrap_err();
        assert!(matches!(err, BlingError::Decode { kind: DecodeErrorKind::Malformed, .. }));

        let mismatched = reply(200, r#"{"status": 1, "data": "x"}"#).await;
        let err = mismatched.json::<Payload>().unwrap_err();
        assert!(matches!(err, BlingError::Decode { kind: DecodeErrorKind::Mismatch, .. }));
    }

    #[test]
    fn test_failed_reply_carries_only_error() {
        let reply = Reply::failed(BlingError::BodyRead("connection reset".to_string()));
        assert_eq!(reply.status(), 0);
        assert!(reply.body().is_empty());
        assert!(reply.content_type().is_empty());
        assert!(!reply.has_2xx_status());

        let mut payload = Payload::default();
        let err = reply
            .decode_into(Some(&mut payload), None::<&mut ApiError>)
            .unwrap_err();
        assert!(matches!(err, BlingError::BodyRead(ref m) if m == "connection reset"));
    }
}
