//! Encoding of the `paste_data` provenance cookie.
//!
//! The value is base64(JSON) of a [`PasteData`] record. The server only ever
//! writes a fresh record for the paste it just created; it never reads back or
//! merges what the client already holds. Client-side script may read the cookie
//! (it is not HTTP-only) to list the uploader's pastes.

use crate::models::paste::{PasteData, PasteKeys, PasteObject};
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use thiserror::Error;

pub const PASTE_COOKIE_NAME: &str = "paste_data";
pub const PASTE_COOKIE_MAX_AGE_DAYS: i64 = 30;

#[derive(Debug, Error)]
pub enum CookieError {
    #[error("paste data serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("paste data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl PasteData {
    /// Record for a single newly created paste.
    pub fn single(keys: &PasteKeys, create_time: DateTime<Utc>) -> Self {
        Self {
            objects: vec![PasteObject::from(keys)],
            create_time,
        }
    }
}

/// Serialize a record into the transport-safe cookie value.
pub fn encode_paste_data(data: &PasteData) -> Result<String, CookieError> {
    let json = serde_json::to_vec(data)?;
    Ok(general_purpose::STANDARD.encode(json))
}

/// Decode a cookie value produced by [`encode_paste_data`].
pub fn decode_paste_data(value: &str) -> Result<PasteData, CookieError> {
    let json = general_purpose::STANDARD.decode(value)?;
    Ok(serde_json::from_slice(&json)?)
}

/// Build the site-wide, secure, 30-day provenance cookie for `data`.
pub fn paste_cookie(data: &PasteData) -> Result<Cookie<'static>, CookieError> {
    let value = encode_paste_data(data)?;
    Ok(Cookie::build((PASTE_COOKIE_NAME, value))
        .path("/")
        .secure(true)
        .http_only(false)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(PASTE_COOKIE_MAX_AGE_DAYS))
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn keys() -> PasteKeys {
        PasteKeys {
            raw: "r1".into(),
            html: "r1.paste.html".into(),
            delete: "secret".into(),
        }
    }

    #[test]
    fn json_shape_uses_client_field_names() {
        let data = PasteData::single(&keys(), Utc::now());
        let encoded = encode_paste_data(&data).expect("encode");
        let json: Value =
            serde_json::from_slice(&general_purpose::STANDARD.decode(encoded).expect("b64"))
                .expect("json");

        let object = &json["objects"][0];
        assert_eq!(object["rawKey"], "r1");
        assert_eq!(object["htmlKey"], "r1.paste.html");
        assert_eq!(object["deleteKey"], "secret");
        assert!(json["create_time"].is_string());
    }

    #[test]
    fn decode_recovers_record() {
        let data = PasteData::single(&keys(), Utc::now());
        let decoded = decode_paste_data(&encode_paste_data(&data).expect("encode")).expect("decode");
        assert_eq!(decoded, data);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_paste_data("%%%"),
            Err(CookieError::Base64(_))
        ));
        let not_json = general_purpose::STANDARD.encode("nope");
        assert!(matches!(
            decode_paste_data(&not_json),
            Err(CookieError::Json(_))
        ));
    }

    #[test]
    fn cookie_attributes() {
        let cookie = paste_cookie(&PasteData::single(&keys(), Utc::now())).expect("cookie");
        assert_eq!(cookie.name(), PASTE_COOKIE_NAME);
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.secure(), Some(true));
        assert_ne!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(30)));
    }
}
