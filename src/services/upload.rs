//! Upload workflow: validate → derive keys → store raw → render → store HTML.
//!
//! Nothing is rolled back on failure. If the raw object is stored and a later
//! step fails, the raw object stays behind; its delete secret was never handed
//! to the client.

use crate::{
    errors::PasteError,
    models::{metadata::ObjectMetadata, paste::PasteKeys},
    services::{
        keys::{file_extension, generate_keys_with},
        renderer::escape_html,
    },
    state::AppState,
};
use bytes::Bytes;
use rand::RngCore;
use tracing::{debug, error, info, warn};

/// Text larger than this is shown verbatim instead of highlighted.
pub const HIGHLIGHT_LIMIT_BYTES: usize = 100 * 1024;
pub const DEFAULT_SYNTAX: &str = "plaintext";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";
const CONTENT_TYPE_FALLBACK: &str = "application/octet-stream";
const VIEWABLE_PREFIXES: [&str; 5] = ["image/", "text/", "application/pdf", "video/", "audio/"];

/// A file part of the upload form.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Raw fields collected from the request body.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub content: Option<String>,
    pub syntax: Option<String>,
    pub file: Option<FilePart>,
}

/// Validated upload: exactly one of text or file.
#[derive(Debug, Clone)]
pub enum PasteInput {
    Text { content: String, syntax: String },
    File(FilePart),
}

impl UploadForm {
    /// Require exactly one non-empty source.
    pub fn into_input(self) -> Result<PasteInput, PasteError> {
        let content = self.content.filter(|c| !c.is_empty());
        let file = self
            .file
            .filter(|f| !f.filename.is_empty() && !f.bytes.is_empty());

        match (content, file) {
            (Some(_), Some(_)) => {
                warn!("Both text content and a file were submitted");
                Err(PasteError::client("both content and file present"))
            }
            (None, None) => {
                warn!("Empty form content");
                Err(PasteError::client("empty form content"))
            }
            (None, Some(file)) => Ok(PasteInput::File(file)),
            (Some(content), None) => {
                let syntax = self
                    .syntax
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| DEFAULT_SYNTAX.to_string());
                Ok(PasteInput::Text { content, syntax })
            }
        }
    }
}

/// Result of a complete upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Keys as stored; `raw` includes the file extension for file uploads.
    pub keys: PasteKeys,
    pub html_url: String,
}

/// Whether a browser can display the content type inline.
pub fn can_view_in_browser(content_type: &str) -> bool {
    let viewable = VIEWABLE_PREFIXES
        .iter()
        .any(|prefix| content_type.starts_with(prefix));
    debug!("content type {} viewable in browser: {}", content_type, viewable);
    viewable
}

/// Run the upload workflow with keys derived from `rng`.
///
/// A randomness failure aborts before the store is touched.
pub async fn upload_paste<R>(
    state: &AppState,
    input: PasteInput,
    rng: &mut R,
) -> Result<UploadOutcome, PasteError>
where
    R: RngCore + Send + ?Sized,
{
    let keys = generate_keys_with(rng).map_err(|err| {
        error!("Error generating keys: {}", err);
        PasteError::KeyGeneration(err.to_string())
    })?;
    store_paste(state, input, keys).await
}

/// Store and render `input` under the given keys.
pub async fn store_paste(
    state: &AppState,
    input: PasteInput,
    keys: PasteKeys,
) -> Result<UploadOutcome, PasteError> {
    let metadata = ObjectMetadata::with_delete_secret(keys.delete.clone());

    let (keys, html) = match input {
        PasteInput::File(file) => store_file(state, file, keys, &metadata).await?,
        PasteInput::Text { content, syntax } => {
            let html = store_text(state, content, &syntax, &keys, &metadata).await?;
            (keys, html)
        }
    };

    state
        .store
        .put(&keys.html, Bytes::from(html), CONTENT_TYPE_HTML, &metadata)
        .await
        .map_err(|err| {
            error!("Error uploading HTML: {}", err);
            PasteError::dependency(err)
        })?;
    info!("Uploaded HTML content with key: {}", keys.html);

    let html_url = state.settings.public_url(&keys.html);
    Ok(UploadOutcome { keys, html_url })
}

async fn store_file(
    state: &AppState,
    file: FilePart,
    keys: PasteKeys,
    metadata: &ObjectMetadata,
) -> Result<(PasteKeys, Vec<u8>), PasteError> {
    let keys = match file_extension(&file.filename) {
        Some(ext) => keys.with_extension(ext),
        None => keys,
    };
    let content_type = file
        .content_type
        .as_deref()
        .filter(|ct| !ct.is_empty())
        .unwrap_or(CONTENT_TYPE_FALLBACK)
        .to_string();
    let size = file.bytes.len();

    state
        .store
        .put(&keys.raw, file.bytes, &content_type, metadata)
        .await
        .map_err(|err| {
            error!("Error uploading file: {}", err);
            PasteError::dependency(err)
        })?;
    info!("Uploaded file with key: {}", keys.raw);
    debug!("File size: {}, content type: {}", size, content_type);

    let download_url = state.settings.public_url(&keys.raw);
    let html = state
        .renderer
        .render_file_view(
            &file.filename,
            &download_url,
            can_view_in_browser(&content_type),
        )
        .map_err(|err| {
            error!("Error rendering file download HTML: {}", err);
            PasteError::dependency(err)
        })?;

    Ok((keys, html))
}

async fn store_text(
    state: &AppState,
    content: String,
    syntax: &str,
    keys: &PasteKeys,
    metadata: &ObjectMetadata,
) -> Result<Vec<u8>, PasteError> {
    let markup = if content.len() > HIGHLIGHT_LIMIT_BYTES {
        debug!(
            "Content size more than 100kb: '{}' bytes, using pre tag",
            content.len()
        );
        escape_html(&content)
    } else {
        debug!("Content size: '{}' bytes, highlighting as {}", content.len(), syntax);
        let renderer = state.renderer.clone();
        let style = state.settings.style.clone();
        let source = content.clone();
        let syntax = syntax.to_string();
        tokio::task::spawn_blocking(move || renderer.highlight(&source, &syntax, &style))
            .await
            .map_err(|err| {
                error!("Highlighting task failed: {}", err);
                PasteError::dependency(err)
            })?
            .map_err(|err| {
                error!("Error highlighting content: {}", err);
                PasteError::dependency(err)
            })?
    };

    let download_url = state.settings.public_url(&keys.raw);
    let html = state
        .renderer
        .render_text_view(&markup, &download_url)
        .map_err(|err| {
            error!("Error rendering output pre HTML: {}", err);
            PasteError::dependency(err)
        })?;

    state
        .store
        .put(&keys.raw, Bytes::from(content), CONTENT_TYPE_TEXT, metadata)
        .await
        .map_err(|err| {
            error!("Error uploading raw content: {}", err);
            PasteError::dependency(err)
        })?;
    info!("Uploaded raw content with key: {}", keys.raw);

    Ok(html)
}
