//! Key and value encoding.
//!
//! Forward keys are the local id prefixed with its category tag. Forward
//! values are a single-element JSON list holding the record metadata:
//!
//! ```text
//! [{"object_id":"obj-abc","order":"1.2.3","apiVersion":"0"}]
//! ```
//!
//! Not-synced sets are stored as a JSON list of local ids.

use crate::category::RecordCategory;
use crate::error::{MapError, MapResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Builds the raw forward key for a local id.
#[must_use]
pub fn compose_key(category: RecordCategory, local_id: &str) -> String {
    match category.tag() {
        Some(tag) => {
            let mut key = String::with_capacity(local_id.len() + 1);
            key.push(tag);
            key.push_str(local_id);
            key
        }
        None => local_id.to_string(),
    }
}

/// Splits a raw forward key into its local id and category.
///
/// Keys without a known prefix decode as [`RecordCategory::Unset`] with the
/// whole key as the local id.
#[must_use]
pub fn decompose_key(raw_key: &str) -> (String, RecordCategory) {
    let mut chars = raw_key.chars();
    match chars.next().and_then(RecordCategory::from_tag) {
        Some(category) => (chars.as_str().to_string(), category),
        None => (raw_key.to_string(), RecordCategory::Unset),
    }
}

/// Metadata stored under a forward key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Remote object id.
    pub object_id: String,

    /// Ordering position among siblings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,

    /// Protocol version the record was saved under.
    #[serde(
        rename = "apiVersion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub api_version: Option<String>,
}

/// Encodes record metadata into its stored text form.
///
/// # Errors
///
/// Fails only if serialization fails.
pub fn encode_metadata(
    object_id: &str,
    order: Option<&str>,
    api_version: &str,
) -> MapResult<String> {
    let entry = RecordMetadata {
        object_id: object_id.to_string(),
        order: order.map(str::to_string),
        api_version: Some(api_version.to_string()),
    };
    Ok(serde_json::to_string(&[entry])?)
}

/// Decodes stored metadata text.
///
/// # Errors
///
/// Returns [`MapError::Decode`] if the text is not a one-element list whose
/// entry carries an `object_id`.
pub fn decode_metadata(text: &str) -> MapResult<RecordMetadata> {
    let mut entries: Vec<RecordMetadata> = serde_json::from_str(text)?;
    if entries.len() != 1 {
        return Err(MapError::decode(format!(
            "expected one metadata entry, found {}",
            entries.len()
        )));
    }
    Ok(entries.remove(0))
}

/// Encodes a set of local ids.
///
/// # Errors
///
/// Fails only if serialization fails.
pub fn encode_set(ids: &BTreeSet<String>) -> MapResult<String> {
    Ok(serde_json::to_string(ids)?)
}

/// Decodes a set of local ids. Anything unparsable decodes as empty.
#[must_use]
pub fn decode_set(text: &str) -> BTreeSet<String> {
    serde_json::from_str(text).unwrap_or_default()
}
