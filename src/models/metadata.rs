//! Key/value metadata attached to stored objects.
//!
//! Every object written by the upload workflow carries the required field
//! [`DELETE_SECRET_FIELD`]. Field names are case-insensitive and normalized
//! to lowercase on the way in.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// Metadata field holding a paste's delete secret.
pub const DELETE_SECRET_FIELD: &str = "delete";

/// A single metadata row as persisted by the SQLite store.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct MetadataEntry {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Reference to the associated object.
    pub object_id: Uuid,

    /// Metadata field name (lowercase).
    pub key: String,

    /// Metadata value as plain text.
    pub value: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("metadata field `{0}` is absent")]
    Absent(&'static str),
    #[error("metadata field `{0}` is empty")]
    Empty(&'static str),
}

/// Metadata map for one stored object.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectMetadata(BTreeMap<String, String>);

impl ObjectMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata carrying only the delete secret.
    pub fn with_delete_secret(secret: impl Into<String>) -> Self {
        let mut meta = Self::new();
        meta.insert(DELETE_SECRET_FIELD, secret);
        meta
    }

    pub fn insert(&mut self, field: &str, value: impl Into<String>) {
        self.0.insert(field.to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(&field.to_ascii_lowercase()).map(String::as_str)
    }

    /// Look up the delete secret, distinguishing a missing field from an empty one.
    pub fn delete_secret(&self) -> Result<&str, MetadataError> {
        match self.get(DELETE_SECRET_FIELD) {
            None => Err(MetadataError::Absent(DELETE_SECRET_FIELD)),
            Some("") => Err(MetadataError::Empty(DELETE_SECRET_FIELD)),
            Some(secret) => Ok(secret),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<MetadataEntry> for ObjectMetadata {
    fn from_iter<I: IntoIterator<Item = MetadataEntry>>(iter: I) -> Self {
        let mut meta = Self::new();
        for entry in iter {
            meta.insert(&entry.key, entry.value);
        }
        meta
    }
}
