//! URI references and RFC 3986 reference resolution
//!
//! [`url::Url`] only models absolute URLs and normalises what it parses
//! (an empty path becomes `/`). Request paths are built progressively from
//! an empty or relative start, so resolution works on raw URI references
//! and keeps the text exactly as written apart from dot-segment removal.

use std::fmt;

use thiserror::Error;

/// Why a string was rejected as a URI reference
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    #[error("control character in {0:?}")]
    ControlCharacter(String),

    #[error("invalid percent-escape in {0:?}")]
    InvalidEscape(String),

    #[error("missing protocol scheme in {0:?}")]
    MissingScheme(String),

    #[error("invalid scheme in {0:?}")]
    InvalidScheme(String),

    #[error("invalid port in {0:?}")]
    InvalidPort(String),

    #[error("invalid host in {0:?}")]
    InvalidHost(String),
}

/// A parsed URI reference: `scheme:` `//authority` `path` `?query` `#fragment`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UriReference {
    scheme: Option<String>,
    authority: Option<String>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl UriReference {
    /// Split `input` into its components
    pub fn parse(input: &str) -> Result<Self, UriError> {
        if input.chars().any(|c| c.is_ascii_control()) {
            return Err(UriError::ControlCharacter(input.to_string()));
        }
        validate_escapes(input)?;

        let (rest, fragment) = match input.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_string())),
            None => (input, None),
        };
        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(query.to_string())),
            None => (rest, None),
        };

        // A colon before the first slash terminates the scheme
        let (scheme, rest) = match rest.find(|c: char| c == ':' || c == '/') {
            Some(idx) if rest.as_bytes()[idx] == b':' => {
                let scheme = &rest[..idx];
                validate_scheme(scheme, input)?;
                (Some(scheme.to_string()), &rest[idx + 1..])
            }
            _ => (None, rest),
        };

        let (authority, path) = match rest.strip_prefix("//") {
            Some(after) => {
                let end = after.find('/').unwrap_or(after.len());
                let authority = &after[..end];
                validate_authority(authority, input)?;
                (Some(authority.to_string()), &after[end..])
            }
            None => (None, rest),
        };

        Ok(Self {
            scheme,
            authority,
            path: path.to_string(),
            query,
            fragment,
        })
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// True when the reference carries its own scheme
    pub fn is_absolute(&self) -> bool {
        self.scheme.is_some()
    }

    /// Resolve `reference` against `self` as base (RFC 3986 section 5.2.2)
    pub fn resolve(&self, reference: &UriReference) -> UriReference {
        if reference.scheme.is_some() {
            return UriReference {
                path: remove_dot_segments(&reference.path),
                ..reference.clone()
            };
        }

        if reference.authority.is_some() {
            return UriReference {
                scheme: self.scheme.clone(),
                path: remove_dot_segments(&reference.path),
                ..reference.clone()
            };
        }

        let (path, query) = if reference.path.is_empty() {
            (
                self.path.clone(),
                reference.query.clone().or_else(|| self.query.clone()),
            )
        } else if reference.path.starts_with('/') {
            (remove_dot_segments(&reference.path), reference.query.clone())
        } else {
            (
                remove_dot_segments(&self.merge(&reference.path)),
                reference.query.clone(),
            )
        };

        UriReference {
            scheme: self.scheme.clone(),
            authority: self.authority.clone(),
            path,
            query,
            fragment: reference.fragment.clone(),
        }
    }

    // RFC 3986 section 5.2.3
    fn merge(&self, relative: &str) -> String {
        if self.authority.is_some() && self.path.is_empty() {
            return format!("/{relative}");
        }
        match self.path.rfind('/') {
            Some(idx) => format!("{}{relative}", &self.path[..=idx]),
            None => relative.to_string(),
        }
    }
}

impl fmt::Display for UriReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}:")?;
        }
        if let Some(authority) = &self.authority {
            write!(f, "//{authority}")?;
        }
        f.write_str(&self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

/// Parse both strings and resolve `reference` against `base`
pub fn resolve(base: &str, reference: &str) -> Result<String, UriError> {
    let base = UriReference::parse(base)?;
    let reference = UriReference::parse(reference)?;
    Ok(base.resolve(&reference).to_string())
}

/// RFC 3986 section 5.2.4
pub fn remove_dot_segments(path: &str) -> String {
    let mut input = path;
    let mut output = String::with_capacity(path.len());

    while !input.is_empty() {
        if let Some(rest) = input.strip_prefix("../") {
            input = rest;
        } else if let Some(rest) = input.strip_prefix("./") {
            input = rest;
        } else if input.starts_with("/./") {
            input = &input[2..];
        } else if input == "/." {
            input = "/";
        } else if input.starts_with("/../") {
            input = &input[3..];
            pop_segment(&mut output);
        } else if input == "/.." {
            input = "/";
            pop_segment(&mut output);
        } else if input == "." || input == ".." {
            input = "";
        } else {
            let start = usize::from(input.starts_with('/'));
            let end = input[start..]
                .find('/')
                .map_or(input.len(), |idx| idx + start);
            output.push_str(&input[..end]);
            input = &input[end..];
        }
    }

    output
}

fn pop_segment(output: &mut String) {
    match output.rfind('/') {
        Some(idx) => output.truncate(idx),
        None => output.clear(),
    }
}

fn validate_escapes(input: &str) -> Result<(), UriError> {
    let bytes = input.as_bytes();
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' {
            let valid = bytes.len() > idx + 2
                && bytes[idx + 1].is_ascii_hexdigit()
                && bytes[idx + 2].is_ascii_hexdigit();
            if !valid {
                return Err(UriError::InvalidEscape(input.to_string()));
            }
            idx += 3;
        } else {
            idx += 1;
        }
    }
    Ok(())
}

fn validate_scheme(scheme: &str, input: &str) -> Result<(), UriError> {
    let mut chars = scheme.chars();
    match chars.next() {
        None => Err(UriError::MissingScheme(input.to_string())),
        Some(first) if !first.is_ascii_alphabetic() => {
            Err(UriError::InvalidScheme(input.to_string()))
        }
        Some(_) => {
            if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
                Ok(())
            } else {
                Err(UriError::InvalidScheme(input.to_string()))
            }
        }
    }
}

fn validate_authority(authority: &str, input: &str) -> Result<(), UriError> {
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host_port)| host_port);

    let (host, port) = if host_port.starts_with('[') {
        let close = host_port
            .find(']')
            .ok_or_else(|| UriError::InvalidHost(input.to_string()))?;
        let port = match &host_port[close + 1..] {
            "" => None,
            rest => match rest.strip_prefix(':') {
                Some(port) => Some(port),
                None => return Err(UriError::InvalidPort(input.to_string())),
            },
        };
        (&host_port[..=close], port)
    } else {
        match host_port.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (host_port, None),
        }
    };

    if !valid_host(host) {
        return Err(UriError::InvalidHost(input.to_string()));
    }
    match port {
        Some(port) if !port.chars().all(|c| c.is_ascii_digit()) => {
            Err(UriError::InvalidPort(input.to_string()))
        }
        _ => Ok(()),
    }
}

// IP-literal in brackets, or a reg-name of unreserved, sub-delims and escapes
fn valid_host(host: &str) -> bool {
    match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        Some(literal) => {
            !literal.is_empty()
                && literal.chars().all(|c| {
                    c.is_ascii_alphanumeric() || matches!(c, ':' | '.' | '-' | '_' | '~' | '%')
                })
        }
        None => host.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || "-._~%".contains(c)
                || "!$&'()*+,;=".contains(c)
        }),
    }
}
