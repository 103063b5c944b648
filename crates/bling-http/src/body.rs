//! Request body sources

use std::{
    fmt,
    path::{Path, PathBuf},
};

use bytes::Bytes;
use futures::TryStream;
use reqwest::Body;

use crate::error::{BlingError, Result};

/// What a request body is built from
///
/// Strings are file paths, byte buffers are sent verbatim and a
/// [`reqwest::Body`] is forwarded untouched. Scalars convert into
/// [`BodyInput::Unsupported`] so the mistake surfaces as a deferred
/// [`BlingError::UnsupportedBodyType`] instead of being serialized.
#[derive(Debug)]
pub enum BodyInput {
    /// Contents of the file at this path
    Path(PathBuf),
    /// Raw bytes
    Bytes(Bytes),
    /// Already-built body, consumed when the request is sent
    Stream(Body),
    /// Rejected value, kept as its `Debug` form
    Unsupported(String),
}

impl BodyInput {
    /// Body fed from a stream of byte chunks
    pub fn stream<S>(stream: S) -> Self
    where
        S: TryStream + Send + Sync + 'static,
        S::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
        Bytes: From<S::Ok>,
    {
        BodyInput::Stream(Body::wrap_stream(stream))
    }

    /// Mark any value as an unsupported body source
    pub fn unsupported(value: &dyn fmt::Debug) -> Self {
        BodyInput::Unsupported(format!("{value:?}"))
    }

    pub(crate) fn into_body(self) -> Result<Body> {
        match self {
            BodyInput::Path(path) => match std::fs::read(&path) {
                Ok(data) => Ok(Body::from(data)),
                Err(source) => Err(BlingError::Io { path, source }),
            },
            BodyInput::Bytes(bytes) => Ok(Body::from(bytes)),
            BodyInput::Stream(body) => Ok(body),
            BodyInput::Unsupported(repr) => Err(BlingError::UnsupportedBodyType(repr)),
        }
    }
}

impl From<&str> for BodyInput {
    fn from(path: &str) -> Self {
        BodyInput::Path(PathBuf::from(path))
    }
}

impl From<String> for BodyInput {
    fn from(path: String) -> Self {
        BodyInput::Path(PathBuf::from(path))
    }
}

impl From<&Path> for BodyInput {
    fn from(path: &Path) -> Self {
        BodyInput::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for BodyInput {
    fn from(path: PathBuf) -> Self {
        BodyInput::Path(path)
    }
}

impl From<Vec<u8>> for BodyInput {
    fn from(bytes: Vec<u8>) -> Self {
        BodyInput::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for BodyInput {
    fn from(bytes: &'static [u8]) -> Self {
        BodyInput::Bytes(Bytes::from_static(bytes))
    }
}

impl<const N: usize> From<&'static [u8; N]> for BodyInput {
    fn from(bytes: &'static [u8; N]) -> Self {
        BodyInput::Bytes(Bytes::from_static(bytes))
    }
}

impl From<Bytes> for BodyInput {
    fn from(bytes: Bytes) -> Self {
        BodyInput::Bytes(bytes)
    }
}

impl From<Body> for BodyInput {
    fn from(body: Body) -> Self {
        BodyInput::Stream(body)
    }
}

macro_rules! unsupported_scalars {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for BodyInput {
                fn from(value: $ty) -> Self {
                    BodyInput::unsupported(&value)
                }
            }
        )*
    };
}

unsupported_scalars!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char);
