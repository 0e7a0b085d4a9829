//! Process-lifetime record of which message combinations were exercised.
//!
//! Each call records one row keyed by a request signature (request type,
//! method and payload) and the response type name, valued by the HTTP
//! status (`0` when no answer arrived). A later call with the same key
//! overwrites the status. The transport only writes here; coverage reporters
//! read it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Status recorded when the server never answered.
pub const NO_RESPONSE: u16 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrafficRecord {
    pub request: String,
    pub response: String,
    pub status: u16,
}

#[derive(Debug, Default)]
pub struct TrafficRegistry {
    rows: RwLock<HashMap<(String, String), u16>>,
}

impl TrafficRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry ready to be shared between transports.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn record(&self, request: impl Into<String>, response: impl Into<String>, status: u16) {
        self.rows
            .write()
            .insert((request.into(), response.into()), status);
    }

    pub fn status(&self, request: &str, response: &str) -> Option<u16> {
        self.rows
            .read()
            .get(&(request.to_string(), response.to_string()))
            .copied()
    }

    /// Every row, sorted for stable reporting.
    pub fn snapshot(&self) -> Vec<TrafficRecord> {
        let mut records: Vec<TrafficRecord> = self
            .rows
            .read()
            .iter()
            .map(|((request, response), status)| TrafficRecord {
                request: request.clone(),
                response: response.clone(),
                status: *status,
            })
            .collect();
        records.sort();
        records
    }

    pub fn rows_for_response(&self, response: &str) -> Vec<TrafficRecord> {
        self.snapshot()
            .into_iter()
            .filter(|r| r.response == response)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

/// The request half of a row key: `<Type><METHOD> <payload>`.
pub fn request_signature(request_type: Option<&str>, method: &str, payload: &str) -> String {
    format!("{}{method} <{payload}>", request_type.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_record_overwrites_status() {
        let reg = TrafficRegistry::new();
        reg.record("SearchReadsRequestPOST <{}>", "SearchReadsResponse", 400);
        reg.record("SearchReadsRequestPOST <{}>", "SearchReadsResponse", 200);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.status("SearchReadsRequestPOST <{}>", "SearchReadsResponse"), Some(200));
    }

    #[test]
    fn same_request_different_response_is_a_new_row() {
        let reg = TrafficRegistry::new();
        reg.record("GET <r1>", "Reference", 200);
        reg.record("GET <r1>", "null", NO_RESPONSE);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.rows_for_response("null")[0].status, NO_RESPONSE);
    }

    #[test]
    fn signatures() {
        assert_eq!(
            request_signature(Some("SearchDatasetsRequest"), "POST", "{}"),
            "SearchDatasetsRequestPOST <{}>"
        );
        assert_eq!(request_signature(None, "GET", "http://h/datasets/1"), "GET <http://h/datasets/1>");
    }

    #[test]
    fn concurrent_recording_keeps_every_row() {
        let reg = TrafficRegistry::shared();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        reg.record(format!("GET <{t}-{i}>"), "Dataset", 200);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(reg.len(), 400);
        assert!(reg.snapshot().windows(2).all(|w| w[0] <= w[1]));
    }
}
