//! Generic invoker that turns typed requests into wire calls.
//!
//! # Design
//! `Transport` is the long-lived context: an `HttpExecutor` and the shared
//! `TrafficRegistry`. It holds no per-call state. Each operation opens a
//! `Call` (server root, operation path, optional `WireTrace`), spends it on
//! exactly one `invoke_post` or `invoke_get`, and drops it.
//!
//! The core of a call is untyped: it moves strings through the executor and
//! classifies the outcome. The typed entry points only encode the request
//! and decode the body, so the generic surface stays thin.
//!
//! Outcomes:
//! - no answer at all: `Ok(None)`, logged at `warn`,
//! - non-2xx: `Err(TransportError::Protocol)`, the body parsed as an error
//!   envelope when possible and kept raw otherwise,
//! - 2xx: `Ok(Some(body decoded into P))`, or `P::default()` when the body
//!   does not fit.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::codec;
use crate::encoding::encode_path_segment;
use crate::error::{ProtocolError, TransportError};
use crate::http::{HttpExecutor, HttpMethod, HttpRequest, JSON_CONTENT_TYPE, UreqExecutor};
use crate::trace::WireTrace;
use crate::traffic::{request_signature, TrafficRegistry, NO_RESPONSE};
use crate::url::{make_url, Url};

/// Route-parameter token replaced by the id of a GET call.
pub const ID_TOKEN: &str = "{id}";

/// Response name recorded in the traffic table when nothing came back.
const NO_RESPONSE_TYPE: &str = "null";

/// Executor plus traffic registry, shared by every call.
#[derive(Clone)]
pub struct Transport {
    executor: Arc<dyn HttpExecutor>,
    traffic: Arc<TrafficRegistry>,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("traffic_rows", &self.traffic.len())
            .finish_non_exhaustive()
    }
}

impl Transport {
    pub fn new(executor: impl HttpExecutor + 'static, traffic: Arc<TrafficRegistry>) -> Self {
        Self {
            executor: Arc::new(executor),
            traffic,
        }
    }

    /// A transport over a default ureq agent.
    pub fn over_http(traffic: Arc<TrafficRegistry>) -> Self {
        Self::new(UreqExecutor::new(), traffic)
    }

    pub fn traffic(&self) -> &Arc<TrafficRegistry> {
        &self.traffic
    }

    /// Open a call against `path` below `url_root`.
    pub fn call<'a>(&'a self, url_root: &str, path: &str) -> Call<'a> {
        Call {
            transport: self,
            url_root: url_root.trim().to_string(),
            path: path.trim().trim_matches('/').to_string(),
            trace: None,
        }
    }
}

/// One call in flight. Consumed by `invoke_post` or `invoke_get`.
pub struct Call<'a> {
    transport: &'a Transport,
    url_root: String,
    path: String,
    trace: Option<&'a mut WireTrace>,
}

impl<'a> Call<'a> {
    /// Record the exchange into `trace`.
    pub fn traced(mut self, trace: &'a mut WireTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn maybe_traced(mut self, trace: Option<&'a mut WireTrace>) -> Self {
        self.trace = trace;
        self
    }

    /// POST the encoded `request` and decode the answer as `P`.
    pub fn invoke_post<Q, P>(self, request: &Q) -> Result<Option<P>, TransportError>
    where
        Q: Serialize,
        P: DeserializeOwned + Default,
    {
        let body = codec::encode(request)?;
        let url = make_url(&self.url_root, &self.path)?;
        let signature = request_signature(
            Some(codec::short_type_name::<Q>()),
            HttpMethod::Post.as_str(),
            &body,
        );
        let request = HttpRequest {
            method: HttpMethod::Post,
            url,
            headers: vec![
                ("content-type".to_string(), JSON_CONTENT_TYPE.to_string()),
                ("accept".to_string(), JSON_CONTENT_TYPE.to_string()),
            ],
            body: Some(body),
        };
        let received = self.exchange(request, signature, codec::short_type_name::<P>())?;
        Ok(received.map(|body| codec::decode(&body)))
    }

    /// GET the path with `{id}` replaced by `id`, appending every query
    /// parameter that has a value, and decode the answer as `P`.
    pub fn invoke_get<P>(
        self,
        id: &str,
        query: &[(&str, Option<String>)],
    ) -> Result<Option<P>, TransportError>
    where
        P: DeserializeOwned + Default,
    {
        let path = self.path.replace(ID_TOKEN, &encode_path_segment(id));
        let mut url = Url::parse(&make_url(&self.url_root, &path)?)?;
        for (name, value) in query {
            if let Some(value) = value {
                url.add_parameter(name, value);
            }
        }
        let url = url.to_string();
        let signature = request_signature(None, HttpMethod::Get.as_str(), &url);
        let request = HttpRequest {
            method: HttpMethod::Get,
            url,
            headers: vec![("accept".to_string(), JSON_CONTENT_TYPE.to_string())],
            body: None,
        };
        let received = self.exchange(request, signature, codec::short_type_name::<P>())?;
        Ok(received.map(|body| codec::decode(&body)))
    }

    /// Run the request and classify the outcome. Returns the 2xx body.
    fn exchange(
        self,
        request: HttpRequest,
        signature: String,
        response_type: &str,
    ) -> Result<Option<String>, TransportError> {
        let Call {
            transport, trace, ..
        } = self;
        debug!(method = request.method.as_str(), url = %request.url, "sending request");

        let response = match transport.executor.execute(&request) {
            Ok(response) => response,
            Err(failure) => {
                warn!(url = %failure.url, reason = %failure.reason, "no response from server");
                if let Some(trace) = trace {
                    trace.record(&request.url, request.body.as_deref(), None, None);
                }
                transport
                    .traffic
                    .record(signature, NO_RESPONSE_TYPE, NO_RESPONSE);
                return Ok(None);
            }
        };
        debug!(url = %request.url, status = response.status, "received response");

        if let Some(trace) = trace {
            trace.record(
                &request.url,
                request.body.as_deref(),
                Some(&response.body),
                Some(response.status),
            );
        }
        transport
            .traffic
            .record(signature, response_type, response.status);

        if !response.is_success() {
            return Err(ProtocolError::from_response(response.status, &response.body).into());
        }
        Ok(Some(response.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{ExchangeFailure, HttpResponse};
    use crate::messages::{Dataset, SearchDatasetsRequest, SearchDatasetsResponse};
    use crate::status::RespCode;
    use parking_lot::Mutex;

    /// Replies with a fixed answer and remembers every request.
    struct Scripted {
        reply: Option<(u16, &'static str)>,
        seen: Arc<Mutex<Vec<HttpRequest>>>,
    }

    impl HttpExecutor for Scripted {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ExchangeFailure> {
            self.seen.lock().push(request.clone());
            match self.reply {
                Some((status, body)) => Ok(HttpResponse {
                    status,
                    headers: Vec::new(),
                    body: body.to_string(),
                }),
                None => Err(ExchangeFailure {
                    url: request.url.clone(),
                    reason: "connection refused".to_string(),
                }),
            }
        }
    }

    fn transport(reply: Option<(u16, &'static str)>) -> (Transport, Arc<Mutex<Vec<HttpRequest>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let executor = Scripted {
            reply,
            seen: Arc::clone(&seen),
        };
        (Transport::new(executor, TrafficRegistry::shared()), seen)
    }

    #[test]
    fn post_sends_json_and_decodes_success() {
        let (t, seen) = transport(Some((200, r#"{"datasets":[{"id":"d1"}]}"#)));
        let req = SearchDatasetsRequest {
            page_size: Some(5),
            page_token: None,
        };
        let resp: SearchDatasetsResponse = t
            .call("http://localhost:8000/", "/datasets/search/")
            .invoke_post(&req)
            .unwrap()
            .unwrap();
        assert_eq!(resp.datasets[0].id, "d1");

        let sent = &seen.lock()[0];
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(sent.url, "http://localhost:8000/datasets/search");
        assert_eq!(sent.body.as_deref(), Some(r#"{"pageSize":5}"#));
        assert!(sent
            .headers
            .contains(&("content-type".to_string(), JSON_CONTENT_TYPE.to_string())));
        assert!(sent
            .headers
            .contains(&("accept".to_string(), JSON_CONTENT_TYPE.to_string())));

        assert_eq!(
            t.traffic().status(
                "SearchDatasetsRequestPOST <{\"pageSize\":5}>",
                "SearchDatasetsResponse"
            ),
            Some(200)
        );
    }

    #[test]
    fn get_substitutes_id_and_appends_present_params() {
        let (t, seen) = transport(Some((200, r#"{"id":"a b"}"#)));
        let ds: Dataset = t
            .call("http://h:8000/v1", "references/{id}/bases")
            .invoke_get("a b", &[("start", Some("10".to_string())), ("end", None)])
            .unwrap()
            .unwrap();
        assert_eq!(ds.id, "a b");
        let sent = &seen.lock()[0];
        assert_eq!(sent.method, HttpMethod::Get);
        assert_eq!(sent.url, "http://h:8000/v1/references/a%20b/bases?start=10");
        assert!(sent.body.is_none());
        assert_eq!(
            sent.headers,
            vec![("accept".to_string(), JSON_CONTENT_TYPE.to_string())]
        );
    }

    #[test]
    fn no_answer_is_absent_not_an_error() {
        let (t, _) = transport(None);
        let mut trace = WireTrace::new();
        let resp: Option<SearchDatasetsResponse> = t
            .call("http://localhost:8000/", "datasets/search")
            .traced(&mut trace)
            .invoke_post(&SearchDatasetsRequest::default())
            .unwrap();
        assert!(resp.is_none());
        assert_eq!(trace.url(), Some("http://localhost:8000/datasets/search"));
        assert_eq!(trace.body_sent(), Some("{}"));
        assert_eq!(trace.response_status(), None);
        let rows = t.traffic().rows_for_response("null");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, NO_RESPONSE);
    }

    #[test]
    fn non_success_with_envelope_is_parsed_protocol_error() {
        let (t, _) = transport(Some((404, r#"{"errorCode":404,"message":"no dataset x"}"#)));
        let mut trace = WireTrace::new();
        let err = t
            .call("http://localhost:8000/", "datasets/{id}")
            .traced(&mut trace)
            .invoke_get::<Dataset>("x", &[])
            .unwrap_err();
        let protocol = err.as_protocol().unwrap();
        assert!(protocol.is_parsed());
        assert_eq!(protocol.http_status, 404);
        assert_eq!(protocol.code(), 404);
        assert_eq!(protocol.message(), "no dataset x");
        assert_eq!(trace.response_status(), Some(RespCode::NotFound));
        assert_eq!(trace.error_code(), Some(404));
    }

    #[test]
    fn non_success_with_other_body_is_raw_protocol_error() {
        let (t, _) = transport(Some((503, "Service Unavailable")));
        let err = t
            .call("http://localhost:8000/", "datasets/search")
            .invoke_post::<_, SearchDatasetsResponse>(&SearchDatasetsRequest::default())
            .unwrap_err();
        let protocol = err.as_protocol().unwrap();
        assert_eq!(protocol.code(), -1);
        assert_eq!(protocol.message(), "Service Unavailable");
        assert_eq!(protocol.http_status, 503);
    }

    #[test]
    fn mismatched_success_body_decodes_to_default() {
        let (t, _) = transport(Some((200, "[]")));
        let resp: SearchDatasetsResponse = t
            .call("http://localhost:8000/", "datasets/search")
            .invoke_post(&SearchDatasetsRequest::default())
            .unwrap()
            .unwrap();
        assert_eq!(resp, SearchDatasetsResponse::default());
    }

    #[test]
    fn invalid_root_is_a_url_error() {
        let (t, seen) = transport(Some((200, "{}")));
        let err = t
            .call("", "datasets/search")
            .invoke_post::<_, SearchDatasetsResponse>(&SearchDatasetsRequest::default())
            .unwrap_err();
        assert!(matches!(err, TransportError::Url(_)));
        assert!(seen.lock().is_empty());
    }
}
