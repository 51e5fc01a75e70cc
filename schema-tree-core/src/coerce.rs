use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::schema::LeafKind;
use crate::tree::Scalar;

/// Leaf text that could not be coerced into its declared kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("element <{element}>: cannot read {text:?} as {expected}")]
pub struct FormatError {
    pub element: String,
    pub expected: &'static str,
    pub text: String,
}

/// Coerce accumulated element text into a scalar of the given kind.
///
/// Safe to call repeatedly with a growing buffer: each call computes the value
/// from scratch and the caller overwrites the previous one.
pub fn coerce(kind: LeafKind, element: &str, text: &str) -> Result<Scalar, FormatError> {
    let fail = |expected| FormatError {
        element: element.to_string(),
        expected,
        text: text.to_string(),
    };

    match kind {
        LeafKind::Text | LeafKind::Reference => Ok(Scalar::Text(text.to_string())),
        LeafKind::Flag => Ok(Scalar::Flag),
        LeafKind::Integer => text
            .trim()
            .parse::<i64>()
            .map(Scalar::Integer)
            .map_err(|_| fail("an integer")),
        LeafKind::Timestamp => text
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .map(Scalar::Timestamp)
            .ok_or_else(|| fail("a unix timestamp")),
        LeafKind::Port => {
            let port = text.trim();
            if is_port_like(port) {
                Ok(Scalar::Text(port.to_string()))
            } else {
                Err(fail("a port, port range or service alias"))
            }
        }
    }
}

/// Accept `digits`, `digits:digits`, `digits-digits`, or an identifier.
pub fn is_port_like(value: &str) -> bool {
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    if all_digits(value) {
        return true;
    }
    if let Some((low, high)) = value.split_once([':', '-']) {
        return all_digits(low) && all_digits(high);
    }
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
