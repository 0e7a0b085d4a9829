//! Transport layer for a GA4GH compliance kit.
//!
//! # Overview
//! Turns typed GA4GH request values into HTTP calls against a server under
//! test and classifies what comes back. The operation path for each call is
//! looked up in a layered `EndpointMap`; every call can be captured in a
//! `WireTrace` and is recorded in a shared `TrafficRegistry` for coverage
//! reporting.
//!
//! # Design
//! - Blocking I/O only. The HTTP round-trip sits behind the `HttpExecutor`
//!   trait; `UreqExecutor` is the production implementation.
//! - No process-wide statics. The endpoint table and the traffic registry
//!   are built by the entry point and injected into `Client`/`Transport`.
//! - A server that never answers yields `Ok(None)`. A server that answers
//!   with a non-2xx status yields `Err(TransportError::Protocol)`. Callers
//!   check both.
//! - Message types are defined independently from the mock-server crate;
//!   integration tests catch schema drift.

pub mod client;
pub mod codec;
pub mod encoding;
pub mod endpoints;
pub mod error;
pub mod facade;
pub mod http;
pub mod messages;
pub mod status;
pub mod trace;
pub mod traffic;
pub mod url;

pub use client::{Call, Transport};
pub use endpoints::{EndpointMap, EndpointSources};
pub use error::{ConfigError, ErrorBody, ProtocolError, TransportError, UrlError};
pub use facade::Client;
pub use http::{HttpExecutor, HttpMethod, HttpRequest, HttpResponse, UreqExecutor};
pub use status::RespCode;
pub use trace::WireTrace;
pub use traffic::{TrafficRecord, TrafficRegistry};
pub use url::{Scheme, Url};
