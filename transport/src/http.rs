//! HTTP exchange types and the executor seam.
//!
//! # Design
//! Requests and responses are plain data. `Call` (see `client`) builds an
//! `HttpRequest` and interprets an `HttpResponse`; the round-trip in between
//! belongs to an `HttpExecutor`. The production executor is a blocking ureq
//! agent; tests swap in scripted executors without a network.
//!
//! An executor returns `Err(ExchangeFailure)` only when no usable response
//! arrived (refused, reset, timed out, or the body could not be read to the
//! end). Every status code, including 4xx and 5xx, is an `Ok(HttpResponse)`.
//! Body bytes that are not UTF-8 are replaced, not rejected.

use std::time::Duration;

use thiserror::Error;
use tracing::warn;

pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// No response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no response from {url}: {reason}")]
pub struct ExchangeFailure {
    pub url: String,
    pub reason: String,
}

/// Performs one blocking HTTP round-trip.
pub trait HttpExecutor: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ExchangeFailure>;
}

/// Blocking executor backed by a ureq agent.
///
/// Status codes are returned as data rather than errors so the transport
/// can classify them.
#[derive(Clone)]
pub struct UreqExecutor {
    agent: ureq::Agent,
}

impl UreqExecutor {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Bound every call (connect, send, receive) by `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Some(timeout))
    }

    fn build(timeout: Option<Duration>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpExecutor for UreqExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ExchangeFailure> {
        let failure = |e: ureq::Error| ExchangeFailure {
            url: request.url.clone(),
            reason: e.to_string(),
        };

        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.send(request.body.as_deref().unwrap_or_default().as_bytes())
            }
        };
        let mut response = result.map_err(failure)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = match response.body_mut().read_to_vec() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!(url = %request.url, status, error = %e, "response body could not be read");
                return Err(failure(e));
            }
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
