//! Shared application state handed to every handler.

use crate::services::{
    renderer::{RenderError, Renderer},
    storage_service::Store,
};
use bytes::Bytes;
use std::sync::Arc;

/// Per-deployment settings used by the workflows.
#[derive(Debug, Clone)]
pub struct PasteSettings {
    /// Prefix prepended to object keys to form public URLs.
    pub result_url_prefix: String,
    /// Highlighting theme.
    pub style: String,
    /// Upper bound for an upload request body.
    pub multipart_max_memory: usize,
}

impl PasteSettings {
    pub fn public_url(&self, key: &str) -> String {
        format!("{}{}", self.result_url_prefix, key)
    }
}

/// Read-only state shared across concurrent requests.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub renderer: Arc<dyn Renderer>,
    pub settings: Arc<PasteSettings>,
    /// Index page, rendered once here and never regenerated.
    pub index_html: Bytes,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        renderer: Arc<dyn Renderer>,
        settings: PasteSettings,
    ) -> Result<Self, RenderError> {
        let index_html = Bytes::from(renderer.render_index()?);
        tracing::debug!("index page rendered ({} bytes)", index_html.len());
        Ok(Self {
            store,
            renderer,
            settings: Arc::new(settings),
            index_html,
        })
    }
}
