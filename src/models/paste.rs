//! Identifiers of a paste and the client-held provenance record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three identifiers generated for a paste at upload time.
///
/// `raw` is the base key; file uploads may extend it with the file extension
/// before storing (see [`PasteKeys::with_extension`]). `html` is always derived
/// from the base key and never changes afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasteKeys {
    pub raw: String,
    pub html: String,
    pub delete: String,
}

impl PasteKeys {
    /// Raw key extended with a sanitized file extension (without the dot).
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.raw.push('.');
        self.raw.push_str(extension);
        self
    }
}

/// One uploaded paste as remembered by the client.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PasteObject {
    pub html_key: String,
    pub raw_key: String,
    pub delete_key: String,
}

impl From<&PasteKeys> for PasteObject {
    fn from(keys: &PasteKeys) -> Self {
        Self {
            html_key: keys.html.clone(),
            raw_key: keys.raw.clone(),
            delete_key: keys.delete.clone(),
        }
    }
}

/// Payload of the `paste_data` cookie.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PasteData {
    pub objects: Vec<PasteObject>,
    pub create_time: DateTime<Utc>,
}
