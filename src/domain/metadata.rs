//! `Entry.metadata` schema.
//!
//! The source system reads and writes this column as a free-form JSON blob
//! from wherever convenient. Per the Design Note in `spec.md` §9 ("JSON
//! metadata column"), this crate instead defines the slot's shape once and
//! reads/writes it only through `EntryMetadata::{from_json, into_json}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computed_size: Option<ComputedSize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_status: Option<UploadStatus>,

    /// Opaque pointer written by the (out-of-scope) preview/transcoding
    /// collaborator. Never interpreted here, only preserved across upserts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_pointer: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComputedSize {
    pub total_bytes: i64,
    pub file_count: i64,
    pub dir_count: i64,
    pub calculated_at: DateTime<Utc>,
}

impl ComputedSize {
    pub fn is_fresh(&self, ttl_ms: i64, now: DateTime<Utc>) -> bool {
        (now - self.calculated_at).num_milliseconds() < ttl_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    NotUploaded,
    Uploading,
    Uploaded,
    Failed,
}

impl EntryMetadata {
    pub fn from_json(value: &JsonValue) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn into_json(self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    /// Merge filesystem-derived fields from a fresh observation onto this
    /// metadata, preserving fields the Indexer never writes
    /// (`upload_status`, `preview_pointer`) — see `spec.md` §3-SUPPLEMENT.
    pub fn merge_computed_size(mut self, computed: ComputedSize) -> Self {
        self.computed_size = Some(computed);
        self
    }
}
