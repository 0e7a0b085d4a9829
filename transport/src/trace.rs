//! Per-call capture of what went over the wire.
//!
//! A `WireTrace` is created by the caller, handed to exactly one call, and
//! read afterwards. The call fills in the final URL, the body sent, the body
//! received and the mapped status. When the status is not `OK` the received
//! body is parsed as an error envelope on first access.

use std::cell::OnceCell;

use crate::error::{ErrorBody, UNPARSEABLE_ERROR_CODE};
use crate::messages::GaException;
use crate::status::RespCode;

#[derive(Debug, Clone, Default)]
pub struct WireTrace {
    url: Option<String>,
    body_sent: Option<String>,
    body_received: Option<String>,
    response_status: Option<RespCode>,
    error: OnceCell<Option<ErrorBody>>,
}

impl WireTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(
        &mut self,
        url: &str,
        body_sent: Option<&str>,
        body_received: Option<&str>,
        http_status: Option<u16>,
    ) {
        self.url = Some(url.to_string());
        self.body_sent = body_sent.map(str::to_string);
        self.body_received = body_received.map(str::to_string);
        self.response_status = http_status.map(RespCode::from_code);
        self.error = OnceCell::new();
    }

    /// Whether a call has filled this trace in.
    pub fn is_recorded(&self) -> bool {
        self.url.is_some()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn body_sent(&self) -> Option<&str> {
        self.body_sent.as_deref()
    }

    pub fn body_received(&self) -> Option<&str> {
        self.body_received.as_deref()
    }

    /// `None` when the server never answered.
    pub fn response_status(&self) -> Option<RespCode> {
        self.response_status
    }

    /// The error body of a non-`OK` answer.
    pub fn error(&self) -> Option<&ErrorBody> {
        self.error
            .get_or_init(|| {
                let status = self.response_status?;
                if status == RespCode::Ok {
                    return None;
                }
                let body = self.body_received.as_deref().unwrap_or_default();
                Some(match serde_json::from_str::<GaException>(body) {
                    Ok(parsed) => ErrorBody::Parsed(parsed),
                    Err(e) => {
                        tracing::warn!(body, error = %e, "traced error body is not an errorCode/message envelope");
                        ErrorBody::Raw(body.to_string())
                    }
                })
            })
            .as_ref()
    }

    /// Envelope `errorCode`, `-1` for an unparseable body, `None` when the
    /// call succeeded or never got an answer.
    pub fn error_code(&self) -> Option<i32> {
        self.error().map(|body| match body {
            ErrorBody::Parsed(e) => e.error_code,
            ErrorBody::Raw(_) => UNPARSEABLE_ERROR_CODE,
        })
    }

    /// Envelope `message`, or the raw body when unparseable.
    pub fn error_message(&self) -> Option<&str> {
        self.error().map(|body| match body {
            ErrorBody::Parsed(e) => e.message.as_str(),
            ErrorBody::Raw(raw) => raw.as_str(),
        })
    }

    /// True only if an error envelope was received and it parsed.
    pub fn got_parseable_error(&self) -> bool {
        matches!(self.error(), Some(ErrorBody::Parsed(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_trace_is_empty() {
        let t = WireTrace::new();
        assert!(!t.is_recorded());
        assert_eq!(t.response_status(), None);
        assert_eq!(t.error_code(), None);
    }

    #[test]
    fn ok_status_has_no_error() {
        let mut t = WireTrace::new();
        t.record("http://h/x", Some("{}"), Some(r#"{"datasets":[]}"#), Some(200));
        assert_eq!(t.url(), Some("http://h/x"));
        assert_eq!(t.body_sent(), Some("{}"));
        assert_eq!(t.response_status(), Some(RespCode::Ok));
        assert!(t.error().is_none());
        assert!(!t.got_parseable_error());
    }

    #[test]
    fn error_envelope_is_parsed_lazily() {
        let mut t = WireTrace::new();
        t.record(
            "http://h/x",
            None,
            Some(r#"{"errorCode":404,"message":"no reference"}"#),
            Some(404),
        );
        assert_eq!(t.response_status(), Some(RespCode::NotFound));
        assert_eq!(t.error_code(), Some(404));
        assert_eq!(t.error_message(), Some("no reference"));
        assert!(t.got_parseable_error());
    }

    #[test]
    fn raw_error_body_reports_minus_one() {
        let mut t = WireTrace::new();
        t.record("http://h/x", None, Some("<html>oops</html>"), Some(500));
        assert_eq!(t.response_status(), Some(RespCode::NotImplemented));
        assert_eq!(t.error_code(), Some(-1));
        assert_eq!(t.error_message(), Some("<html>oops</html>"));
        assert!(!t.got_parseable_error());
    }

    #[test]
    fn no_answer_leaves_status_absent() {
        let mut t = WireTrace::new();
        t.record("http://h/x", Some("{}"), None, None);
        assert!(t.is_recorded());
        assert_eq!(t.response_status(), None);
        assert_eq!(t.body_received(), None);
        assert_eq!(t.error_code(), None);
    }
}
