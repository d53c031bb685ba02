//! Represents an object (raw paste, uploaded file or rendered page) held by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents a single stored object.
///
/// The struct describes the object; payload bytes live on disk and are
/// streamed separately.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct StoredObject {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Object key (flat identifier, possibly carrying a file extension).
    pub key: String,

    /// Content type (MIME type) declared at upload.
    pub content_type: String,

    /// Size in bytes.
    pub size_bytes: i64,

    /// MD5 checksum of the payload.
    pub etag: String,

    /// Timestamp when the object was written.
    pub last_modified: DateTime<Utc>,
}
