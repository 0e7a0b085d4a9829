//! A small GA4GH-style reference server for exercising the transport.
//!
//! Serves a fixed, deterministic corpus: one dataset, one reference set with
//! two references, and one read group set. Lookups of unknown ids answer
//! `404` with the `{errorCode, message}` envelope; paths that are not routed
//! get axum's plain `404` with an empty body. `reads/search` without read
//! group ids is a `400`, and `variants/search` is always `501`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSet {
    pub id: Uuid,
    pub name: String,
    pub md5checksum: String,
    pub assembly_id: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub id: Uuid,
    pub reference_set_id: Uuid,
    pub name: String,
    pub length: i64,
    pub md5checksum: String,
    pub source_accessions: Vec<String>,
    #[serde(skip)]
    pub bases: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadGroupSet {
    pub id: Uuid,
    pub dataset_id: Uuid,
    pub name: String,
    pub read_groups: Vec<ReadGroup>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadGroup {
    pub id: Uuid,
    pub dataset_id: Uuid,
    pub name: String,
    pub sample_name: String,
}

/// Body sent with every handled non-2xx status.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub error_code: i32,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchDatasetsRequest {
    pub page_size: Option<i32>,
    pub page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDatasetsResponse {
    pub datasets: Vec<Dataset>,
    pub next_page_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchReferenceSetsRequest {
    pub md5checksum: Option<String>,
    pub accession: Option<String>,
    pub assembly_id: Option<String>,
    pub page_size: Option<i32>,
    pub page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReferenceSetsResponse {
    pub reference_sets: Vec<ReferenceSet>,
    pub next_page_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchReferencesRequest {
    pub reference_set_id: String,
    pub md5checksum: Option<String>,
    pub accession: Option<String>,
    pub page_size: Option<i32>,
    pub page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReferencesResponse {
    pub references: Vec<Reference>,
    pub next_page_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListReferenceBasesQuery {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReferenceBasesResponse {
    pub offset: i64,
    pub sequence: String,
    pub next_page_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchReadGroupSetsRequest {
    pub dataset_id: String,
    pub name: Option<String>,
    pub page_size: Option<i32>,
    pub page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReadGroupSetsResponse {
    pub read_group_sets: Vec<ReadGroupSet>,
    pub next_page_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchReadsRequest {
    pub read_group_ids: Vec<String>,
    pub page_size: Option<i32>,
    pub page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReadsResponse {
    pub alignments: Vec<serde_json::Value>,
    pub next_page_token: String,
}

// ---------------------------------------------------------------------------
// Corpus
// ---------------------------------------------------------------------------

pub const DATASET_ID: Uuid = Uuid::from_u128(0x0001);
pub const REFERENCE_SET_ID: Uuid = Uuid::from_u128(0x0100);
pub const REFERENCE_1_ID: Uuid = Uuid::from_u128(0x0101);
pub const REFERENCE_2_ID: Uuid = Uuid::from_u128(0x0102);
pub const READ_GROUP_SET_ID: Uuid = Uuid::from_u128(0x0200);
pub const READ_GROUP_ID: Uuid = Uuid::from_u128(0x0201);

/// Bases returned per page by `references/{id}/bases`.
pub const BASES_PAGE_SIZE: usize = 16;

#[derive(Debug)]
pub struct Store {
    datasets: Vec<Dataset>,
    reference_sets: Vec<ReferenceSet>,
    references: Vec<Reference>,
    read_group_sets: Vec<ReadGroupSet>,
}

impl Store {
    pub fn seeded() -> Self {
        let dataset = Dataset {
            id: DATASET_ID,
            name: "ctk-sample".to_string(),
            description: "compliance sample dataset".to_string(),
        };
        let reference_set = ReferenceSet {
            id: REFERENCE_SET_ID,
            name: "hg-mini".to_string(),
            md5checksum: "0f3c48a1e2f7d5b6c9a4e8d1b2c3f4a5".to_string(),
            assembly_id: "hg-mini.1".to_string(),
            description: "two tiny contigs".to_string(),
        };
        let chr1 = "ACGTACGTTAGCCGATAGCTAGCTAGGATCCA".to_string();
        let chr2 = "GGGCCCAAATTT".to_string();
        let references = vec![
            Reference {
                id: REFERENCE_1_ID,
                reference_set_id: REFERENCE_SET_ID,
                name: "chr1".to_string(),
                length: chr1.len() as i64,
                md5checksum: "a1b2c3d4e5f60718293a4b5c6d7e8f90".to_string(),
                source_accessions: vec!["NC_MINI.1".to_string()],
                bases: chr1,
            },
            Reference {
                id: REFERENCE_2_ID,
                reference_set_id: REFERENCE_SET_ID,
                name: "chr2".to_string(),
                length: chr2.len() as i64,
                md5checksum: "0918273645aabbccddeeff0011223344".to_string(),
                source_accessions: vec!["NC_MINI.2".to_string()],
                bases: chr2,
            },
        ];
        let read_group_sets = vec![ReadGroupSet {
            id: READ_GROUP_SET_ID,
            dataset_id: DATASET_ID,
            name: "sample-reads".to_string(),
            read_groups: vec![ReadGroup {
                id: READ_GROUP_ID,
                dataset_id: DATASET_ID,
                name: "rg-1".to_string(),
                sample_name: "NA00001".to_string(),
            }],
        }];
        Self {
            datasets: vec![dataset],
            reference_sets: vec![reference_set],
            references,
            read_group_sets,
        }
    }
}

pub type Db = Arc<Store>;

pub fn app() -> Router {
    let db: Db = Arc::new(Store::seeded());
    Router::new()
        .route("/datasets/search", post(search_datasets))
        .route("/datasets/{id}", get(get_dataset))
        .route("/referencesets/search", post(search_reference_sets))
        .route("/referencesets/{id}", get(get_reference_set))
        .route("/references/search", post(search_references))
        .route("/references/{id}", get(get_reference))
        .route("/references/{id}/bases", get(list_reference_bases))
        .route("/readgroupsets/search", post(search_read_group_sets))
        .route("/readgroupsets/{id}", get(get_read_group_set))
        .route("/reads/search", post(search_reads))
        .route("/variants/search", post(search_variants))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found(kind: &str, id: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("no {kind} with id {id}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope {
            error_code: i32::from(self.status.as_u16()),
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Slice `items` by an index-valued page token.
fn page<T: Clone>(
    items: &[T],
    page_size: Option<i32>,
    page_token: Option<&str>,
) -> Result<(Vec<T>, String), ApiError> {
    let start = match page_token {
        None | Some("") => 0,
        Some(token) => token
            .parse::<usize>()
            .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, format!("bad page token {token:?}")))?,
    };
    let size = match page_size {
        None => items.len().max(1),
        Some(n) if n > 0 => n as usize,
        Some(n) => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                format!("page size must be positive, got {n}"),
            ))
        }
    };
    let end = start.saturating_add(size).min(items.len());
    let slice = items.get(start..end).unwrap_or_default().to_vec();
    let next = if end < items.len() {
        end.to_string()
    } else {
        String::new()
    };
    Ok((slice, next))
}

fn find<'a, T>(items: &'a [T], id: &str, key: impl Fn(&T) -> Uuid) -> Option<&'a T> {
    let id = Uuid::parse_str(id).ok()?;
    items.iter().find(|item| key(item) == id)
}

async fn search_datasets(
    State(db): State<Db>,
    Json(input): Json<SearchDatasetsRequest>,
) -> Result<Json<SearchDatasetsResponse>, ApiError> {
    let (datasets, next_page_token) =
        page(&db.datasets, input.page_size, input.page_token.as_deref())?;
    Ok(Json(SearchDatasetsResponse {
        datasets,
        next_page_token,
    }))
}

async fn get_dataset(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Dataset>, ApiError> {
    find(&db.datasets, &id, |d| d.id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("dataset", &id))
}

async fn search_reference_sets(
    State(db): State<Db>,
    Json(input): Json<SearchReferenceSetsRequest>,
) -> Result<Json<SearchReferenceSetsResponse>, ApiError> {
    let matching: Vec<ReferenceSet> = db
        .reference_sets
        .iter()
        .filter(|s| input.md5checksum.as_deref().map_or(true, |m| s.md5checksum == m))
        .filter(|s| input.assembly_id.as_deref().map_or(true, |a| s.assembly_id == a))
        .filter(|s| {
            input.accession.as_deref().map_or(true, |acc| {
                db.references
                    .iter()
                    .any(|r| r.reference_set_id == s.id && r.source_accessions.iter().any(|a| a == acc))
            })
        })
        .cloned()
        .collect();
    let (reference_sets, next_page_token) =
        page(&matching, input.page_size, input.page_token.as_deref())?;
    Ok(Json(SearchReferenceSetsResponse {
        reference_sets,
        next_page_token,
    }))
}

async fn get_reference_set(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<ReferenceSet>, ApiError> {
    find(&db.reference_sets, &id, |s| s.id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("reference set", &id))
}

async fn search_references(
    State(db): State<Db>,
    Json(input): Json<SearchReferencesRequest>,
) -> Result<Json<SearchReferencesResponse>, ApiError> {
    let set_id = match input.reference_set_id.as_str() {
        "" => None,
        id => Some(
            Uuid::parse_str(id).map_err(|_| ApiError::not_found("reference set", id))?,
        ),
    };
    let matching: Vec<Reference> = db
        .references
        .iter()
        .filter(|r| set_id.map_or(true, |id| r.reference_set_id == id))
        .filter(|r| input.md5checksum.as_deref().map_or(true, |m| r.md5checksum == m))
        .filter(|r| {
            input
                .accession
                .as_deref()
                .map_or(true, |acc| r.source_accessions.iter().any(|a| a == acc))
        })
        .cloned()
        .collect();
    let (references, next_page_token) =
        page(&matching, input.page_size, input.page_token.as_deref())?;
    Ok(Json(SearchReferencesResponse {
        references,
        next_page_token,
    }))
}

async fn get_reference(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Reference>, ApiError> {
    find(&db.references, &id, |r| r.id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("reference", &id))
}

async fn list_reference_bases(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(query): Query<ListReferenceBasesQuery>,
) -> Result<Json<ListReferenceBasesResponse>, ApiError> {
    let reference =
        find(&db.references, &id, |r| r.id).ok_or_else(|| ApiError::not_found("reference", &id))?;
    let len = reference.bases.len() as i64;
    let start = query.start.unwrap_or(0);
    let end = query.end.unwrap_or(len);
    if start < 0 || end > len || start > end {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("range {start}..{end} is outside 0..{len}"),
        ));
    }
    let offset = match query.page_token.as_deref() {
        None | Some("") => start,
        Some(token) => token.parse::<i64>().map_err(|_| {
            ApiError::new(StatusCode::BAD_REQUEST, format!("bad page token {token:?}"))
        })?,
    };
    if offset < start || offset > end {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("page token {offset} is outside {start}..{end}"),
        ));
    }
    let stop = (offset + BASES_PAGE_SIZE as i64).min(end);
    let next_page_token = if stop < end {
        stop.to_string()
    } else {
        String::new()
    };
    Ok(Json(ListReferenceBasesResponse {
        offset,
        sequence: reference.bases[offset as usize..stop as usize].to_string(),
        next_page_token,
    }))
}

async fn search_read_group_sets(
    State(db): State<Db>,
    Json(input): Json<SearchReadGroupSetsRequest>,
) -> Result<Json<SearchReadGroupSetsResponse>, ApiError> {
    let dataset = find(&db.datasets, &input.dataset_id, |d| d.id)
        .ok_or_else(|| ApiError::not_found("dataset", &input.dataset_id))?;
    let matching: Vec<ReadGroupSet> = db
        .read_group_sets
        .iter()
        .filter(|s| s.dataset_id == dataset.id)
        .filter(|s| input.name.as_deref().map_or(true, |n| s.name == n))
        .cloned()
        .collect();
    let (read_group_sets, next_page_token) =
        page(&matching, input.page_size, input.page_token.as_deref())?;
    Ok(Json(SearchReadGroupSetsResponse {
        read_group_sets,
        next_page_token,
    }))
}

async fn get_read_group_set(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<ReadGroupSet>, ApiError> {
    find(&db.read_group_sets, &id, |s| s.id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found("read group set", &id))
}

async fn search_reads(
    State(db): State<Db>,
    Json(input): Json<SearchReadsRequest>,
) -> Result<Json<SearchReadsResponse>, ApiError> {
    if input.read_group_ids.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "readGroupIds must name at least one read group",
        ));
    }
    for id in &input.read_group_ids {
        let known = db
            .read_group_sets
            .iter()
            .flat_map(|s| &s.read_groups)
            .any(|g| Uuid::parse_str(id).is_ok_and(|id| g.id == id));
        if !known {
            return Err(ApiError::not_found("read group", id));
        }
    }
    Ok(Json(SearchReadsResponse {
        alignments: Vec::new(),
        next_page_token: String::new(),
    }))
}

async fn search_variants() -> ApiError {
    ApiError::new(StatusCode::NOT_IMPLEMENTED, "variant search is not implemented")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_uses_camel_case() {
        let json = serde_json::to_value(ErrorEnvelope {
            error_code: 404,
            message: "gone".to_string(),
        })
        .unwrap();
        assert_eq!(json["errorCode"], 404);
        assert_eq!(json["message"], "gone");
    }

    #[test]
    fn reference_bases_are_not_serialized() {
        let store = Store::seeded();
        let json = serde_json::to_value(&store.references[0]).unwrap();
        assert!(json.get("bases").is_none());
        assert_eq!(json["referenceSetId"], REFERENCE_SET_ID.to_string());
        assert_eq!(json["length"], 32);
    }

    #[test]
    fn paging_walks_by_index_token() {
        let items = [1, 2, 3, 4, 5];
        let (first, next) = page(&items, Some(2), None).unwrap();
        assert_eq!(first, vec![1, 2]);
        assert_eq!(next, "2");
        let (last, next) = page(&items, Some(4), Some("2")).unwrap();
        assert_eq!(last, vec![3, 4, 5]);
        assert_eq!(next, "");
        let (past, _) = page(&items, Some(2), Some("9")).unwrap();
        assert!(past.is_empty());
    }

    #[test]
    fn paging_rejects_bad_input() {
        assert_eq!(page(&[1], Some(0), None).unwrap_err().status, StatusCode::BAD_REQUEST);
        assert_eq!(page(&[1], None, Some("x")).unwrap_err().status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn find_ignores_malformed_ids() {
        let store = Store::seeded();
        assert!(find(&store.datasets, "not-a-uuid", |d| d.id).is_none());
        assert!(find(&store.datasets, &DATASET_ID.to_string(), |d| d.id).is_some());
    }
}
