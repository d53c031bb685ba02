//! Delete workflow: check every object's delete secret, then delete all of
//! them in one batch. Any failed check leaves every object untouched.

use crate::{errors::PasteError, services::storage_service::Store};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};

/// Query parameters of `DELETE /?raw=&html=&key=`.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    pub raw: Option<String>,
    pub html: Option<String>,
    pub key: Option<String>,
}

/// A validated delete request.
#[derive(Debug, Clone)]
pub struct DeleteRequest {
    pub raw_key: String,
    pub html_key: String,
    pub secret: String,
}

impl DeleteQuery {
    pub fn into_request(self) -> Result<DeleteRequest, PasteError> {
        let present = |v: Option<String>| v.filter(|s| !s.is_empty());
        match (present(self.raw), present(self.html), present(self.key)) {
            (Some(raw_key), Some(html_key), Some(secret)) => Ok(DeleteRequest {
                raw_key,
                html_key,
                secret,
            }),
            _ => {
                warn!("Missing required parameters for deletion");
                Err(PasteError::client("missing raw, html or key parameter"))
            }
        }
    }
}

/// Delete both objects of a paste if `request.secret` matches on each of them.
///
/// Lookups for all keys complete before any secret is compared, and all
/// comparisons complete before the single batched delete is issued.
pub async fn delete_paste(store: &dyn Store, request: &DeleteRequest) -> Result<(), PasteError> {
    info!("Deleting paste with rawKey: {}", request.raw_key);
    let keys = vec![request.raw_key.clone(), request.html_key.clone()];

    let mut fetched = Vec::with_capacity(keys.len());
    for key in &keys {
        match store.get_metadata(key).await {
            Ok(metadata) => fetched.push(metadata),
            Err(err) => {
                if err.is_not_found() {
                    warn!("Object {} not found for deletion", key);
                } else {
                    error!("Error retrieving metadata for {}: {}", key, err);
                }
                return Err(PasteError::NotFound(key.clone()));
            }
        }
    }

    for (key, metadata) in keys.iter().zip(&fetched) {
        let authorized = metadata
            .delete_secret()
            .map(|stored| secrets_match(&request.secret, stored))
            .unwrap_or(false);
        if !authorized {
            warn!("Invalid delete key provided for: {}", key);
            return Err(PasteError::Authorization(key.clone()));
        }
    }

    store.delete_many(&keys).await.map_err(|err| {
        error!("Error deleting objects: {}", err);
        PasteError::dependency(err)
    })?;

    info!("Successfully deleted paste with key: {}", request.raw_key);
    Ok(())
}

/// Exact byte equality, compared in constant time for equal lengths.
fn secrets_match(provided: &str, stored: &str) -> bool {
    let provided = provided.as_bytes();
    let stored = stored.as_bytes();
    if provided.len() != stored.len() {
        return false;
    }
    provided.ct_eq(stored).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_parameters_are_required() {
        let full = DeleteQuery {
            raw: Some("r1".into()),
            html: Some("r1.paste.html".into()),
            key: Some("s".into()),
        };
        assert!(full.into_request().is_ok());

        let missing_key = DeleteQuery {
            raw: Some("r1".into()),
            html: Some("r1.paste.html".into()),
            key: Some(String::new()),
        };
        assert!(matches!(
            missing_key.into_request(),
            Err(PasteError::Client(_))
        ));
        assert!(DeleteQuery::default().into_request().is_err());
    }

    #[test]
    fn secrets_compare_exactly() {
        assert!(secrets_match("realsecret", "realsecret"));
        assert!(!secrets_match("wrongsecret", "realsecret"));
        assert!(!secrets_match("realsecre", "realsecret"));
        assert!(!secrets_match("RealSecret", "realsecret"));
        assert!(!secrets_match("", "realsecret"));
    }
}
