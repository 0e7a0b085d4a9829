//! Typed, grouped access to the remote API.
//!
//! `Client` owns the endpoint table and a `Transport`. Each group borrows the
//! client, optionally takes the `WireTrace` for its next call, and spends
//! itself on one operation:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use ctk_transport::{Client, EndpointMap, TrafficRegistry, WireTrace};
//! # use ctk_transport::messages::SearchDatasetsRequest;
//! let client = Client::over_http(Arc::new(EndpointMap::defaults()), TrafficRegistry::shared());
//! let mut trace = WireTrace::new();
//! let datasets = client
//!     .metadata()
//!     .traced(&mut trace)
//!     .search_datasets(&SearchDatasetsRequest::default())?;
//! # Ok::<(), ctk_transport::TransportError>(())
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::{Call, Transport};
use crate::endpoints::EndpointMap;
use crate::error::{ConfigError, TransportError};
use crate::messages::*;
use crate::trace::WireTrace;
use crate::traffic::TrafficRegistry;

type Reply<T> = Result<Option<T>, TransportError>;

#[derive(Debug, Clone)]
pub struct Client {
    endpoints: Arc<EndpointMap>,
    transport: Transport,
}

impl Client {
    pub fn new(endpoints: Arc<EndpointMap>, transport: Transport) -> Self {
        Self {
            endpoints,
            transport,
        }
    }

    /// A client over a default ureq agent.
    pub fn over_http(endpoints: Arc<EndpointMap>, traffic: Arc<TrafficRegistry>) -> Self {
        Self::new(endpoints, Transport::over_http(traffic))
    }

    pub fn endpoints(&self) -> &EndpointMap {
        &self.endpoints
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn metadata(&self) -> Metadata<'_> {
        Metadata(Scope::new(self))
    }

    pub fn reads(&self) -> Reads<'_> {
        Reads(Scope::new(self))
    }

    pub fn references(&self) -> References<'_> {
        References(Scope::new(self))
    }

    pub fn variants(&self) -> Variants<'_> {
        Variants(Scope::new(self))
    }

    /// Open a call for an operation named in the endpoint table.
    pub fn call(&self, operation: &str) -> Result<Call<'_>, TransportError> {
        let root = self.endpoints.url_root()?;
        let path = self
            .endpoints
            .resolve(operation)
            .ok_or_else(|| ConfigError::UnknownOperation(operation.to_string()))?;
        Ok(self.transport.call(root, path))
    }
}

struct Scope<'a> {
    client: &'a Client,
    trace: Option<&'a mut WireTrace>,
}

impl<'a> Scope<'a> {
    fn new(client: &'a Client) -> Self {
        Self {
            client,
            trace: None,
        }
    }

    fn post<Q, P>(self, operation: &str, request: &Q) -> Reply<P>
    where
        Q: Serialize,
        P: DeserializeOwned + Default,
    {
        self.client
            .call(operation)?
            .maybe_traced(self.trace)
            .invoke_post(request)
    }

    fn get<P>(self, operation: &str, id: &str, query: &[(&str, Option<String>)]) -> Reply<P>
    where
        P: DeserializeOwned + Default,
    {
        self.client
            .call(operation)?
            .maybe_traced(self.trace)
            .invoke_get(id, query)
    }
}

/// Datasets.
pub struct Metadata<'a>(Scope<'a>);

impl<'a> Metadata<'a> {
    pub fn traced(mut self, trace: &'a mut WireTrace) -> Self {
        self.0.trace = Some(trace);
        self
    }

    pub fn search_datasets(self, request: &SearchDatasetsRequest) -> Reply<SearchDatasetsResponse> {
        self.0.post("searchDatasets", request)
    }

    pub fn get_dataset(self, id: &str) -> Reply<Dataset> {
        self.0.get("getDataset", id, &[])
    }
}

/// Read group sets, read groups and alignments.
pub struct Reads<'a>(Scope<'a>);

impl<'a> Reads<'a> {
    pub fn traced(mut self, trace: &'a mut WireTrace) -> Self {
        self.0.trace = Some(trace);
        self
    }

    pub fn search_reads(self, request: &SearchReadsRequest) -> Reply<SearchReadsResponse> {
        self.0.post("searchReads", request)
    }

    pub fn search_read_group_sets(
        self,
        request: &SearchReadGroupSetsRequest,
    ) -> Reply<SearchReadGroupSetsResponse> {
        self.0.post("searchReadGroupSets", request)
    }

    pub fn get_read_group_set(self, id: &str) -> Reply<ReadGroupSet> {
        self.0.get("getReadGroupSet", id, &[])
    }

    pub fn get_read_group(self, id: &str) -> Reply<ReadGroup> {
        self.0.get("getReadGroup", id, &[])
    }
}

/// Reference sets, references and their bases.
pub struct References<'a>(Scope<'a>);

impl<'a> References<'a> {
    pub fn traced(mut self, trace: &'a mut WireTrace) -> Self {
        self.0.trace = Some(trace);
        self
    }

    pub fn search_reference_sets(
        self,
        request: &SearchReferenceSetsRequest,
    ) -> Reply<SearchReferenceSetsResponse> {
        self.0.post("searchReferencesets", request)
    }

    pub fn get_reference_set(self, id: &str) -> Reply<ReferenceSet> {
        self.0.get("getReferencesets", id, &[])
    }

    pub fn search_references(
        self,
        request: &SearchReferencesRequest,
    ) -> Reply<SearchReferencesResponse> {
        self.0.post("searchReferences", request)
    }

    pub fn get_reference(self, id: &str) -> Reply<Reference> {
        self.0.get("getReferences", id, &[])
    }

    /// Bases of reference `id`. Unset range fields are not sent.
    pub fn get_reference_bases(
        self,
        id: &str,
        request: &ListReferenceBasesRequest,
    ) -> Reply<ListReferenceBasesResponse> {
        let query = [
            ("start", request.start.map(|v| v.to_string())),
            ("end", request.end.map(|v| v.to_string())),
            ("pageToken", request.page_token.clone()),
        ];
        self.0.get("getReferencesBases", id, &query)
    }
}

/// Variant sets, variants and call sets.
pub struct Variants<'a>(Scope<'a>);

impl<'a> Variants<'a> {
    pub fn traced(mut self, trace: &'a mut WireTrace) -> Self {
        self.0.trace = Some(trace);
        self
    }

    pub fn search_variant_sets(
        self,
        request: &SearchVariantSetsRequest,
    ) -> Reply<SearchVariantSetsResponse> {
        self.0.post("searchVariantSets", request)
    }

    pub fn get_variant_set(self, id: &str) -> Reply<VariantSet> {
        self.0.get("getVariantSet", id, &[])
    }

    pub fn search_variants(self, request: &SearchVariantsRequest) -> Reply<SearchVariantsResponse> {
        self.0.post("searchVariants", request)
    }

    pub fn get_variant(self, id: &str) -> Reply<Variant> {
        self.0.get("getVariant", id, &[])
    }

    pub fn search_call_sets(self, request: &SearchCallSetsRequest) -> Reply<SearchCallSetsResponse> {
        self.0.post("searchCallsets", request)
    }

    pub fn get_call_set(self, id: &str) -> Reply<CallSet> {
        self.0.get("getCallSet", id, &[])
    }
}
