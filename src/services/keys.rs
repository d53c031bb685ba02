//! Key derivation for new pastes.
//!
//! Raw keys and delete secrets are UUIDv4 values (122 random bits) built from
//! OS randomness. The HTML key is the raw key plus [`HTML_KEY_SUFFIX`].

use crate::models::paste::PasteKeys;
use rand::RngCore;
use thiserror::Error;
use uuid::{Builder, Uuid};

/// Suffix appended to the base raw key to form the HTML key.
///
/// Contains two dots; a raw key carries at most one (before its extension),
/// so no stored raw object can share a key with a rendered page.
pub const HTML_KEY_SUFFIX: &str = ".paste.html";

const MAX_EXTENSION_LEN: usize = 16;

#[derive(Debug, Error)]
#[error("randomness source failed: {0}")]
pub struct KeyGenerationError(#[from] rand::Error);

/// Derive keys for a new paste from the supplied randomness source.
///
/// Production callers pass [`rand::rngs::OsRng`].
pub fn generate_keys_with<R: RngCore + ?Sized>(rng: &mut R) -> Result<PasteKeys, KeyGenerationError> {
    let raw = random_uuid(rng)?.to_string();
    let delete = random_uuid(rng)?.to_string();
    let html = format!("{}{}", raw, HTML_KEY_SUFFIX);
    Ok(PasteKeys { raw, html, delete })
}

fn random_uuid<R: RngCore + ?Sized>(rng: &mut R) -> Result<Uuid, KeyGenerationError> {
    let mut bytes = [0u8; 16];
    rng.try_fill_bytes(&mut bytes)?;
    Ok(Builder::from_random_bytes(bytes).into_uuid())
}

/// Extract a file extension safe to embed in an object key.
///
/// Only the last component after the final `.` of the file name is considered,
/// and it must be 1-16 ASCII alphanumerics.
pub fn file_extension(filename: &str) -> Option<&str> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (stem, ext) = name.rsplit_once('.')?;
    // dotfiles like `.bashrc` have no extension
    if stem.is_empty() {
        return None;
    }
    if ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext)
}
