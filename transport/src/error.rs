//! Error types for the compliance transport.
//!
//! # Design
//! Failures are split by the layer that detects them. Configuration and URL
//! problems fail fast when the endpoint table is loaded. A server that answers
//! with a non-2xx status produces a `ProtocolError`, which always carries the
//! HTTP status and either the decoded `{errorCode, message}` envelope or the
//! raw body text. A server that never answers is *not* an error here: the
//! call yields `Ok(None)` (see `client`).

use std::path::PathBuf;

use thiserror::Error;

use crate::messages::GaException;

/// Error code reported when a non-2xx body was not a decodable envelope.
pub const UNPARSEABLE_ERROR_CODE: i32 = -1;

/// A URL string could not be turned into a `Url`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("URL cannot be empty")]
    Empty,

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("unknown scheme {0:?}, expected http, https or ftp")]
    UnknownScheme(String),

    #[error("host {0:?} contains invalid characters")]
    InvalidHost(String),

    /// Raised by `Url::set_port`. Parsing reads any written `u16` port.
    #[error("port {0} is outside 1..=65534")]
    InvalidPort(i64),

    #[error("malformed URL {url:?}: {reason}")]
    Syntax { url: String, reason: String },
}

/// A percent-encoded string could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("incomplete % sequence at byte {0}")]
    Incomplete(usize),

    #[error("invalid % sequence {sequence:?} at byte {position}")]
    InvalidHex { sequence: String, position: usize },

    #[error("decoded bytes are not valid UTF-8")]
    InvalidUtf8,
}

/// The endpoint table could not be loaded or holds an unusable value.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read endpoint resource {path}: {source}")]
    UnreadableResource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no value configured for {0}")]
    MissingUrlRoot(String),

    #[error("no endpoint configured for operation {0:?}")]
    UnknownOperation(String),

    #[error("invalid server root {value:?}: {source}")]
    InvalidUrlRoot {
        value: String,
        #[source]
        source: UrlError,
    },
}

/// A request value could not be written to the wire encoding.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialization of {type_name} failed: {source}")]
    Serialize {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// The body of a non-2xx response, decoded when possible.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    /// The body matched the `{errorCode, message}` envelope.
    Parsed(GaException),
    /// The body was something else; kept verbatim.
    Raw(String),
}

/// The server answered, but with a non-success status.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("HTTP {http_status}: error {} {}", self.code(), self.message())]
pub struct ProtocolError {
    pub http_status: u16,
    pub body: ErrorBody,
}

impl ProtocolError {
    /// Classify a non-success response body.
    pub fn from_response(http_status: u16, body: &str) -> Self {
        let body = match serde_json::from_str::<GaException>(body) {
            Ok(parsed) => ErrorBody::Parsed(parsed),
            Err(e) => {
                tracing::warn!(http_status, error = %e, body, "error body is not an errorCode/message envelope");
                ErrorBody::Raw(body.to_string())
            }
        };
        Self { http_status, body }
    }

    /// The envelope's `errorCode`, or `-1` when the body could not be parsed.
    pub fn code(&self) -> i32 {
        match &self.body {
            ErrorBody::Parsed(e) => e.error_code,
            ErrorBody::Raw(_) => UNPARSEABLE_ERROR_CODE,
        }
    }

    /// The envelope's `message`, or the raw body text when it could not be parsed.
    pub fn message(&self) -> &str {
        match &self.body {
            ErrorBody::Parsed(e) => &e.message,
            ErrorBody::Raw(raw) => raw,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self.body, ErrorBody::Parsed(_))
    }
}

/// Top-level error returned by transport and configuration operations.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Url(#[from] UrlError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl TransportError {
    /// The protocol error, if this is one.
    pub fn as_protocol(&self) -> Option<&ProtocolError> {
        match self {
            TransportError::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_envelope_delegates_code_and_message() {
        let err = ProtocolError::from_response(404, r#"{"errorCode":404,"message":"no such dataset"}"#);
        assert!(err.is_parsed());
        assert_eq!(err.http_status, 404);
        assert_eq!(err.code(), 404);
        assert_eq!(err.message(), "no such dataset");
    }

    #[test]
    fn unparseable_body_keeps_raw_text() {
        let err = ProtocolError::from_response(404, "Not Found");
        assert!(!err.is_parsed());
        assert_eq!(err.code(), UNPARSEABLE_ERROR_CODE);
        assert_eq!(err.message(), "Not Found");
    }

    #[test]
    fn empty_body_is_raw() {
        let err = ProtocolError::from_response(501, "");
        assert_eq!(err.code(), -1);
        assert_eq!(err.message(), "");
    }

    #[test]
    fn display_includes_status_code_and_message() {
        let err = ProtocolError::from_response(400, r#"{"errorCode":7,"message":"bad page size"}"#);
        assert_eq!(err.to_string(), "HTTP 400: error 7 bad page size");
    }

    #[test]
    fn protocol_error_converts_into_transport_error() {
        let err: TransportError = ProtocolError::from_response(400, "x").into();
        assert_eq!(err.as_protocol().map(|p| p.http_status), Some(400));
    }
}
