//! Fluent HTTP request builder
//!
//! Chain method, URL, headers and body on a [`Request`], then either take the
//! raw transport response or a buffered [`Reply`] that decodes on demand.
//!
//! ## Features
//!
//! - **Trait-based transport**: inject anything implementing `HttpClientTrait`
//! - **URI reference resolution**: `path` composes like RFC 3986 links
//! - **Deferred errors**: building never fails mid-chain; the first error is
//!   returned when the request is sent
//! - **Retry policy**: opt-in, exponential backoff with a custom predicate
//! - **Testing support**: easy mocking with wiremock
//!
//! ```no_run
//! # async fn run() -> bling_http::Result<()> {
//! use bling_http::Bling;
//!
//! let bling = Bling::new()?;
//! let reply = bling
//!     .get("https://api.example.com/v1/")
//!     .path("users")
//!     .set_header("Accept", "application/json")
//!     .send()
//!     .await?;
//! assert!(reply.has_2xx_status());
//! # Ok(())
//! # }
//! ```

pub mod bling;
pub mod body;
pub mod client;
pub mod config;
pub mod error;
pub mod reply;
pub mod request;
pub mod retry;
pub mod uri;

pub use bling::Bling;
pub use body::BodyInput;
pub use client::{shared_client, HttpClient, HttpClientTrait};
pub use config::BlingConfig;
pub use error::{BlingError, DecodeErrorKind, Result};
pub use reply::Reply;
pub use request::Request;
pub use retry::{RetryPolicy, RetryPredicate};

/// Re-export commonly used types
pub use reqwest::{header, Method, Response, StatusCode};
