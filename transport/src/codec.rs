//! JSON wire codec for schema-typed values.
//!
//! Encoding is strict: a request that cannot be serialized is a caller bug
//! and is reported. Decoding is lenient: a body that does not fit the target
//! type yields `T::default()` and a warning, so one malformed response does
//! not abort a long compliance run.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;

/// Serialize a request value to its JSON wire form.
pub fn encode<T: Serialize>(value: &T) -> Result<String, CodecError> {
    serde_json::to_string(value).map_err(|source| CodecError::Serialize {
        type_name: short_type_name::<T>(),
        source,
    })
}

/// Deserialize a response body, falling back to the empty value.
pub fn decode<T: DeserializeOwned + Default>(body: &str) -> T {
    match decode_strict(body) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(
                target_type = short_type_name::<T>(),
                error = %e,
                body,
                "response body does not match the expected shape; using an empty value"
            );
            T::default()
        }
    }
}

pub fn decode_strict<T: DeserializeOwned>(body: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(body)
}

/// The unqualified type name, e.g. `SearchReadsRequest`. Diagnostic only.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
