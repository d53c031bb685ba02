//! Shared fixtures for integration tests.
//! Note: #[allow(dead_code)] because each test file compiles common/ separately.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use bytes::Bytes;
use chrono::Utc;
use futures::stream;
use paste_store::{
    AppState, PasteSettings, app,
    models::{metadata::ObjectMetadata, object::StoredObject, paste::PasteData},
    services::{
        cookie::{PASTE_COOKIE_NAME, decode_paste_data},
        renderer::{HtmlRenderer, PageLinks, RenderError, Renderer},
        storage_service::{ByteStream, ReadinessCheck, StorageError, StorageResult, Store},
    },
};
use std::{
    collections::HashMap,
    io,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use tower::ServiceExt;
use uuid::Uuid;

pub const STYLE: &str = "InspiredGitHub";
pub const BOUNDARY: &str = "----paste-store-test-boundary";

#[derive(Clone)]
struct Entry {
    object: StoredObject,
    body: Bytes,
    metadata: ObjectMetadata,
}

/// In-memory store with switchable failures.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Entry>>,
    /// Puts whose key ends with this suffix fail.
    fail_put_suffix: Mutex<Option<String>>,
    fail_delete: AtomicBool,
    pub delete_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_puts_ending_with(&self, suffix: &str) {
        *self.fail_put_suffix.lock().unwrap() = Some(suffix.to_string());
    }

    pub fn fail_deletes(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }

    /// Insert an object directly, bypassing the workflows.
    pub fn insert(&self, key: &str, body: &str, content_type: &str, metadata: ObjectMetadata) {
        let body = Bytes::copy_from_slice(body.as_bytes());
        let object = stored_object(key, &body, content_type);
        self.objects.lock().unwrap().insert(
            key.to_string(),
            Entry {
                object,
                body,
                metadata,
            },
        );
    }

    pub fn body(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).map(|e| e.body.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|e| e.object.content_type.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

fn stored_object(key: &str, body: &Bytes, content_type: &str) -> StoredObject {
    StoredObject {
        id: Uuid::new_v4(),
        key: key.to_string(),
        content_type: content_type.to_string(),
        size_bytes: body.len() as i64,
        etag: format!("{:x}", md5::compute(body)),
        last_modified: Utc::now(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<StoredObject> {
        if let Some(suffix) = self.fail_put_suffix.lock().unwrap().as_deref() {
            if key.ends_with(suffix) {
                return Err(StorageError::Io(io::Error::other("injected put failure")));
            }
        }
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(key) {
            return Err(StorageError::ObjectAlreadyExists(key.to_string()));
        }
        let object = stored_object(key, &body, content_type);
        objects.insert(
            key.to_string(),
            Entry {
                object: object.clone(),
                body,
                metadata: metadata.clone(),
            },
        );
        Ok(object)
    }

    async fn get_metadata(&self, key: &str) -> StorageResult<ObjectMetadata> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|e| e.metadata.clone())
            .ok_or_else(|| StorageError::ObjectNotFound(key.to_string()))
    }

    async fn delete_many(&self, keys: &[String]) -> StorageResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::Io(io::Error::other("injected delete failure")));
        }
        let mut objects = self.objects.lock().unwrap();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    async fn head_object(&self, key: &str) -> StorageResult<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|e| e.object.clone())
            .ok_or_else(|| StorageError::ObjectNotFound(key.to_string()))
    }

    async fn get_object(&self, key: &str) -> StorageResult<(StoredObject, ByteStream)> {
        let entry = self
            .objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound(key.to_string()))?;
        let body: ByteStream = Box::pin(stream::once(async move { Ok(entry.body) }));
        Ok((entry.object, body))
    }

    async fn readiness(&self) -> Vec<ReadinessCheck> {
        vec![ReadinessCheck {
            name: "memory",
            ok: true,
            error: None,
        }]
    }
}

/// Randomness source that always fails.
pub struct FailingRng;

impl rand::RngCore for FailingRng {
    fn next_u32(&mut self) -> u32 {
        0
    }

    fn next_u64(&mut self) -> u64 {
        0
    }

    fn fill_bytes(&mut self, _dest: &mut [u8]) {}

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
        Err(rand::Error::new("entropy source unavailable"))
    }
}

/// Renderer whose every operation fails.
pub struct BrokenRenderer;

impl Renderer for BrokenRenderer {
    fn highlight(&self, _: &str, _: &str, style: &str) -> Result<String, RenderError> {
        Err(RenderError::UnknownStyle(style.to_string()))
    }

    fn render_text_view(&self, _: &str, _: &str) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::UnknownStyle(STYLE.to_string()))
    }

    fn render_file_view(&self, _: &str, _: &str, _: bool) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::UnknownStyle(STYLE.to_string()))
    }

    fn render_index(&self) -> Result<Vec<u8>, RenderError> {
        Ok(b"<html>index</html>".to_vec())
    }
}

pub fn settings() -> PasteSettings {
    PasteSettings {
        result_url_prefix: "/".into(),
        style: STYLE.into(),
        multipart_max_memory: 4 << 20,
    }
}

pub fn html_renderer() -> Arc<dyn Renderer> {
    Arc::new(HtmlRenderer::new(PageLinks::default(), STYLE).expect("renderer"))
}

/// Router over a fresh memory store and the real renderer.
pub fn test_app() -> (Router, Arc<MemoryStore>) {
    let store = MemoryStore::new();
    (router_with(store.clone(), html_renderer()), store)
}

pub fn router_with(store: Arc<MemoryStore>, renderer: Arc<dyn Renderer>) -> Router {
    let state = AppState::new(store, renderer, settings()).expect("state");
    app(state)
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn urlencoded_upload(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("Content-Type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// A multipart part: (field name, optional (filename, content type), bytes).
pub type Part<'a> = (&'a str, Option<(&'a str, &'a str)>, &'a [u8]);

pub fn multipart_upload(parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, file, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file {
            Some((filename, content_type)) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, filename, content_type
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
            }
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Decode the `paste_data` cookie set on a response.
pub fn paste_cookie(response: &Response<Body>) -> (PasteData, String) {
    let header = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{}=", PASTE_COOKIE_NAME)))
        .expect("paste_data cookie")
        .to_string();
    let value = header
        .trim_start_matches(&format!("{}=", PASTE_COOKIE_NAME))
        .split(';')
        .next()
        .unwrap();
    (decode_paste_data(value).expect("cookie decodes"), header)
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get("location")
        .expect("location header")
        .to_str()
        .unwrap()
        .to_string()
}

pub fn assert_status(response: &Response<Body>, status: StatusCode) {
    assert_eq!(response.status(), status);
}
