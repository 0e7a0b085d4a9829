//! Schema-typed GA4GH values exchanged through the facade.
//!
//! # Design
//! These mirror the GA4GH reference API's JSON shapes (camelCase field
//! names) but the transport treats them opaquely: it only needs `Serialize`
//! for requests and `Deserialize + Default` for responses. Every response
//! field defaults, so a body with missing fields still decodes and callers
//! see per-field absence. The mock-server crate defines its own copies;
//! integration tests catch drift between the two.
//!
//! `GaException` is the exception: both its fields are required so that an
//! arbitrary JSON body is not mistaken for an error envelope.

use serde::{Deserialize, Serialize};

/// The `{errorCode, message}` body a server sends with a non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GaException {
    pub error_code: i32,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchDatasetsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchDatasetsResponse {
    pub datasets: Vec<Dataset>,
    pub next_page_token: String,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadGroup {
    pub id: String,
    pub dataset_id: String,
    pub name: String,
    pub description: String,
    pub sample_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadGroupSet {
    pub id: String,
    pub dataset_id: String,
    pub name: String,
    pub read_groups: Vec<ReadGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadAlignment {
    pub id: String,
    pub read_group_id: String,
    pub fragment_name: String,
    pub aligned_sequence: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchReadGroupSetsRequest {
    pub dataset_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchReadGroupSetsResponse {
    pub read_group_sets: Vec<ReadGroupSet>,
    pub next_page_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchReadsRequest {
    pub read_group_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchReadsResponse {
    pub alignments: Vec<ReadAlignment>,
    pub next_page_token: String,
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReferenceSet {
    pub id: String,
    pub name: String,
    pub md5checksum: String,
    pub assembly_id: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Reference {
    pub id: String,
    pub name: String,
    pub length: i64,
    pub md5checksum: String,
    pub source_accessions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchReferenceSetsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accession: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assembly_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchReferenceSetsResponse {
    pub reference_sets: Vec<ReferenceSet>,
    pub next_page_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchReferencesRequest {
    pub reference_set_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accession: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchReferencesResponse {
    pub references: Vec<Reference>,
    pub next_page_token: String,
}

/// Range selector for `getReferenceBases`; sent as query parameters, not a body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListReferenceBasesRequest {
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListReferenceBasesResponse {
    pub offset: i64,
    pub sequence: String,
    pub next_page_token: String,
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// One header line of a variant set. `type` is a Rust keyword, so the field
/// is `kind` in code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VariantSetMetadata {
    pub key: String,
    pub value: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub number: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VariantSet {
    pub id: String,
    pub dataset_id: String,
    pub reference_set_id: String,
    pub name: String,
    pub metadata: Vec<VariantSetMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    pub variant_set_id: String,
    pub reference_name: String,
    pub start: i64,
    pub end: i64,
    pub reference_bases: String,
    pub alternate_bases: Vec<String>,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CallSet {
    pub id: String,
    pub name: String,
    pub bio_sample_id: String,
    pub variant_set_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchVariantSetsRequest {
    pub dataset_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchVariantSetsResponse {
    pub variant_sets: Vec<VariantSet>,
    pub next_page_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchVariantsRequest {
    pub variant_set_id: String,
    pub reference_name: String,
    pub start: i64,
    pub end: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub call_set_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchVariantsResponse {
    pub variants: Vec<Variant>,
    pub next_page_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchCallSetsRequest {
    pub variant_set_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchCallSetsResponse {
    pub call_sets: Vec<CallSet>,
    pub next_page_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_unset_optionals() {
        let req = SearchReadsRequest {
            read_group_ids: vec!["rg1".to_string()],
            start: Some(0),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"readGroupIds": ["rg1"], "start": 0}));
    }

    #[test]
    fn metadata_kind_is_written_as_type() {
        let md = VariantSetMetadata {
            key: "FORMAT.GT".to_string(),
            kind: "String".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&md).unwrap();
        assert_eq!(json["type"], "String");
        assert!(json.get("kind").is_none());
        let back: VariantSetMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind, "String");
    }

    #[test]
    fn response_with_missing_fields_decodes_to_defaults() {
        let resp: SearchDatasetsResponse =
            serde_json::from_str(r#"{"datasets":[{"id":"d1"}]}"#).unwrap();
        assert_eq!(resp.datasets[0].id, "d1");
        assert_eq!(resp.datasets[0].name, "");
        assert_eq!(resp.next_page_token, "");
    }

    #[test]
    fn error_envelope_requires_both_fields() {
        assert!(serde_json::from_str::<GaException>(r#"{"message":"x"}"#).is_err());
        assert!(serde_json::from_str::<GaException>(r#"{}"#).is_err());
        let e: GaException = serde_json::from_str(r#"{"errorCode":3,"message":"x"}"#).unwrap();
        assert_eq!(e.error_code, 3);
    }
}
