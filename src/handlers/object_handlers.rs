//! HTTP handlers serving stored objects at `/{*key}`.
//! Streams payloads to avoid buffering in memory; pastes are reachable this
//! way when the public URL prefix points back at this service.
//!
//! Objects share an origin with the script-readable `paste_data` cookie, so
//! every object is served sandboxed with sniffing disabled. Raw objects whose
//! type is not on [`INLINE_SAFE_TYPES`] are sent as attachments.

use crate::{
    errors::PasteError,
    models::object::StoredObject,
    services::{keys::HTML_KEY_SUFFIX, storage_service::StorageError},
    state::AppState,
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use tracing::{debug, error, warn};

/// Sandboxed documents get an opaque origin and run no scripts.
pub const OBJECT_CSP: &str = "sandbox allow-downloads";

/// Raw content types a browser may render inline.
pub const INLINE_SAFE_TYPES: [&str; 8] = [
    "text/plain",
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "application/pdf",
    "audio/",
    "video/",
];

/// Download an object as a streaming response.
pub async fn get_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, PasteError> {
    let (meta, stream) = state.store.get_object(&key).await.map_err(lookup_error)?;

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &meta);
    Ok(response)
}

/// HEAD — same headers as GET but no body.
pub async fn head_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, PasteError> {
    let meta = state.store.head_object(&key).await.map_err(lookup_error)?;

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &meta);
    Ok(response)
}

fn lookup_error(err: StorageError) -> PasteError {
    match err {
        StorageError::ObjectNotFound(key) => {
            warn!("Object {} not found", key);
            PasteError::NotFound(key)
        }
        StorageError::InvalidObjectKey => {
            warn!("Rejected invalid object key");
            PasteError::client("invalid object key")
        }
        other => {
            error!("Error reading object: {}", other);
            PasteError::dependency(other)
        }
    }
}

/// Rendered pages are always inline; raw objects only when their type is safe.
fn is_inline(meta: &StoredObject) -> bool {
    if meta.key.ends_with(HTML_KEY_SUFFIX) {
        return true;
    }
    let content_type = meta.content_type.to_ascii_lowercase();
    INLINE_SAFE_TYPES
        .iter()
        .any(|safe| content_type.starts_with(safe))
}

fn set_object_headers(headers: &mut HeaderMap, meta: &StoredObject) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&meta.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&meta.size_bytes.max(0).to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );

    if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", meta.etag)) {
        headers.insert(header::ETAG, value);
    }

    if let Ok(value) = HeaderValue::from_str(&meta.last_modified.to_rfc2822()) {
        headers.insert(header::LAST_MODIFIED, value);
    }

    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(OBJECT_CSP),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    if !is_inline(meta) {
        debug!("Serving {} ({}) as attachment", meta.key, meta.content_type);
        headers.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn object(key: &str, content_type: &str) -> StoredObject {
        StoredObject {
            id: Uuid::new_v4(),
            key: key.into(),
            content_type: content_type.into(),
            size_bytes: 3,
            etag: "abc".into(),
            last_modified: Utc::now(),
        }
    }

    #[test]
    fn rendered_pages_stay_inline() {
        assert!(is_inline(&object("k.paste.html", "text/html; charset=utf-8")));
    }

    #[test]
    fn active_raw_types_become_attachments() {
        for ct in ["text/html", "TEXT/HTML", "image/svg+xml", "application/xml", ""] {
            assert!(!is_inline(&object("k.html", ct)), "{ct}");
        }
        for ct in ["text/plain; charset=utf-8", "image/png", "video/mp4"] {
            assert!(is_inline(&object("k.txt", ct)), "{ct}");
        }
    }

    #[test]
    fn every_object_is_sandboxed() {
        for meta in [object("k.paste.html", "text/html"), object("k.png", "image/png")] {
            let mut headers = HeaderMap::new();
            set_object_headers(&mut headers, &meta);
            assert_eq!(headers[header::CONTENT_SECURITY_POLICY], OBJECT_CSP);
            assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
            assert!(headers.get(header::CONTENT_DISPOSITION).is_none());
        }
    }
}
