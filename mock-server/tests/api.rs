use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{
    app, Dataset, ErrorEnvelope, ReferenceSet, DATASET_ID, READ_GROUP_ID, REFERENCE_1_ID,
    REFERENCE_SET_ID,
};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- datasets ---

#[tokio::test]
async fn search_datasets_lists_the_seeded_dataset() {
    let resp = app()
        .oneshot(json_request("/datasets/search", "{}"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["datasets"][0]["id"], DATASET_ID.to_string());
    assert_eq!(body["nextPageToken"], "");
}

#[tokio::test]
async fn get_dataset_by_id() {
    let resp = app()
        .oneshot(get_request(&format!("/datasets/{DATASET_ID}")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let dataset: Dataset = body_json(resp).await;
    assert_eq!(dataset.id, DATASET_ID);
    assert_eq!(dataset.name, "ctk-sample");
}

#[tokio::test]
async fn unknown_dataset_is_a_404_envelope() {
    let resp = app()
        .oneshot(get_request("/datasets/not-a-uuid"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let err: ErrorEnvelope = body_json(resp).await;
    assert_eq!(err.error_code, 404);
    assert_eq!(err.message, "no dataset with id not-a-uuid");
}

#[tokio::test]
async fn search_with_zero_page_size_is_a_400_envelope() {
    let resp = app()
        .oneshot(json_request("/datasets/search", r#"{"pageSize":0}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: ErrorEnvelope = body_json(resp).await;
    assert_eq!(err.error_code, 400);
}

// --- references ---

#[tokio::test]
async fn search_reference_sets_filters_by_accession() {
    let resp = app()
        .oneshot(json_request(
            "/referencesets/search",
            r#"{"accession":"NC_MINI.2"}"#,
        ))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["referenceSets"][0]["id"], REFERENCE_SET_ID.to_string());

    let resp = app()
        .oneshot(json_request(
            "/referencesets/search",
            r#"{"accession":"NC_NOPE.1"}"#,
        ))
        .await
        .unwrap();
    let body: Value = body_json(resp).await;
    assert_eq!(body["referenceSets"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn get_reference_set_by_id() {
    let resp = app()
        .oneshot(get_request(&format!("/referencesets/{REFERENCE_SET_ID}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let set: ReferenceSet = body_json(resp).await;
    assert_eq!(set.assembly_id, "hg-mini.1");
}

#[tokio::test]
async fn search_references_pages_through_the_set() {
    let body = format!(r#"{{"referenceSetId":"{REFERENCE_SET_ID}","pageSize":1}}"#);
    let resp = app()
        .oneshot(json_request("/references/search", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let page: Value = body_json(resp).await;
    assert_eq!(page["references"][0]["name"], "chr1");
    assert_eq!(page["nextPageToken"], "1");

    let body = format!(
        r#"{{"referenceSetId":"{REFERENCE_SET_ID}","pageSize":1,"pageToken":"1"}}"#
    );
    let resp = app()
        .oneshot(json_request("/references/search", &body))
        .await
        .unwrap();
    let page: Value = body_json(resp).await;
    assert_eq!(page["references"][0]["name"], "chr2");
    assert_eq!(page["nextPageToken"], "");
}

#[tokio::test]
async fn reference_bases_honour_range_and_paging() {
    let resp = app()
        .oneshot(get_request(&format!(
            "/references/{REFERENCE_1_ID}/bases?start=4&end=8"
        )))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bases: Value = body_json(resp).await;
    assert_eq!(bases["offset"], 4);
    assert_eq!(bases["sequence"], "ACGT");
    assert_eq!(bases["nextPageToken"], "");

    let resp = app()
        .oneshot(get_request(&format!("/references/{REFERENCE_1_ID}/bases")))
        .await
        .unwrap();
    let bases: Value = body_json(resp).await;
    assert_eq!(bases["sequence"], "ACGTACGTTAGCCGAT");
    assert_eq!(bases["nextPageToken"], "16");
}

#[tokio::test]
async fn reference_bases_out_of_range_is_a_400_envelope() {
    let resp = app()
        .oneshot(get_request(&format!(
            "/references/{REFERENCE_1_ID}/bases?start=10&end=99"
        )))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: ErrorEnvelope = body_json(resp).await;
    assert_eq!(err.error_code, 400);
}

// --- reads ---

#[tokio::test]
async fn search_read_group_sets_by_dataset() {
    let body = format!(r#"{{"datasetId":"{DATASET_ID}"}}"#);
    let resp = app()
        .oneshot(json_request("/readgroupsets/search", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let page: Value = body_json(resp).await;
    assert_eq!(
        page["readGroupSets"][0]["readGroups"][0]["id"],
        READ_GROUP_ID.to_string()
    );
}

#[tokio::test]
async fn search_reads_requires_read_group_ids() {
    let resp = app()
        .oneshot(json_request("/reads/search", r#"{"readGroupIds":[]}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: ErrorEnvelope = body_json(resp).await;
    assert_eq!(err.error_code, 400);
    assert!(err.message.contains("readGroupIds"));

    let body = format!(r#"{{"readGroupIds":["{READ_GROUP_ID}"]}}"#);
    let resp = app()
        .oneshot(json_request("/reads/search", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// --- unimplemented and unrouted ---

#[tokio::test]
async fn search_variants_is_a_501_envelope() {
    let resp = app()
        .oneshot(json_request("/variants/search", "{}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
    let err: ErrorEnvelope = body_json(resp).await;
    assert_eq!(err.error_code, 501);
}

#[tokio::test]
async fn unrouted_path_is_a_bare_404() {
    let resp = app()
        .oneshot(json_request("/callsets/search", "{}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_bytes(resp).await.is_empty());
}
