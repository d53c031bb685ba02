//! src/services/storage_service.rs
//!
//! The `Store` seam used by the paste workflows, and `SqliteStore`, its
//! implementation backed by SQLite for object records and metadata and local
//! disk for payloads sharded beneath `base_path/{shard}/{shard}/{key}`.

use crate::models::{
    metadata::{MetadataEntry, ObjectMetadata},
    object::StoredObject,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt};
use serde::Serialize;
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    pin::Pin,
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

/// A boxed stream of payload bytes.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object `{0}` not found")]
    ObjectNotFound(String),
    #[error("object `{0}` already exists")]
    ObjectAlreadyExists(String),
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound(_))
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of one readiness probe run by a store.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessCheck {
    pub name: &'static str,
    pub ok: bool,
    pub error: Option<String>,
}

/// Blob storage used by the paste workflows.
///
/// Objects are immutable: `put` on an existing key fails with
/// `ObjectAlreadyExists`. `get_metadata` reports a missing key as
/// `ObjectNotFound`, never as a generic failure.
#[async_trait]
pub trait Store: Send + Sync {
    /// Store `body` under `key` with its content type and metadata.
    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<StoredObject>;

    /// Fetch the metadata attached to `key`.
    async fn get_metadata(&self, key: &str) -> StorageResult<ObjectMetadata>;

    /// Remove every key in `keys`. Keys that are already gone are not an error.
    async fn delete_many(&self, keys: &[String]) -> StorageResult<()>;

    /// Describe the object stored under `key`.
    async fn head_object(&self, key: &str) -> StorageResult<StoredObject>;

    /// Describe the object stored under `key` and open its payload.
    async fn get_object(&self, key: &str) -> StorageResult<(StoredObject, ByteStream)>;

    /// Probe the backing resources.
    async fn readiness(&self) -> Vec<ReadinessCheck>;
}

const MAX_OBJECT_KEY_LEN: usize = 1024;
const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

/// Store backed by a SQLite pool and a payload directory.
#[derive(Clone)]
pub struct SqliteStore {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,
}

impl SqliteStore {
    /// Create a new SqliteStore backed by the provided SQLite pool and
    /// using `base_path` as the root directory for object payloads.
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Apply the embedded schema. Statements are idempotent.
    pub async fn run_migrations(&self) -> StorageResult<()> {
        let statements = SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        tracing::info!("Running {} migration statements...", statements.len());

        for stmt in statements {
            debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    /// Basic key validation to avoid path traversal vectors.
    ///
    /// Rejects empty or oversized keys, keys that begin with `/`, contain `..`,
    /// a path separator, or control characters.
    fn ensure_key_safe(key: &str) -> StorageResult<()> {
        if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
            return Err(StorageError::InvalidObjectKey);
        }
        if key.starts_with('/') || key.contains("..") {
            return Err(StorageError::InvalidObjectKey);
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'/')
        {
            return Err(StorageError::InvalidObjectKey);
        }
        Ok(())
    }

    /// Two-level shard identifiers for an object key: the first two bytes of
    /// MD5(key) as lowercase hex.
    fn object_shards(key: &str) -> (String, String) {
        let digest = md5::compute(key);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Construct `base_path/{shard}/{shard}/{key}`. Parent directories may not exist yet.
    fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(key);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    async fn fetch_object(&self, key: &str) -> StorageResult<StoredObject> {
        sqlx::query_as::<_, StoredObject>(
            "SELECT id, key, content_type, size_bytes, etag, last_modified
             FROM objects WHERE key = ?",
        )
        .bind(key)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StorageError::ObjectNotFound(key.to_string()),
            other => StorageError::Sqlx(other),
        })
    }

    /// Write a payload to a temp file, fsync it, then rename it into place.
    /// The temp file is removed on any failure.
    async fn write_payload(&self, file_path: &Path, body: &[u8]) -> StorageResult<()> {
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StorageError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let written = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(body).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, file_path).await
        }
        .await;

        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        Ok(())
    }

    /// Recursively remove empty directories up to `stop`.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl Store for SqliteStore {
    /// Insert the object and metadata rows and write the payload inside one
    /// transaction; the rows only become visible once the payload is on disk.
    async fn put(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<StoredObject> {
        Self::ensure_key_safe(key)?;

        let object = StoredObject {
            id: Uuid::new_v4(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            size_bytes: body.len() as i64,
            etag: format!("{:x}", md5::compute(&body)),
            last_modified: Utc::now(),
        };

        let mut tx = self.db.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO objects (id, key, content_type, size_bytes, etag, last_modified)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(object.id)
        .bind(&object.key)
        .bind(&object.content_type)
        .bind(object.size_bytes)
        .bind(&object.etag)
        .bind(object.last_modified)
        .execute(&mut *tx)
        .await;
        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(StorageError::ObjectAlreadyExists(key.to_string()));
            }
            Err(err) => return Err(StorageError::Sqlx(err)),
        }

        for (field, value) in metadata.iter() {
            sqlx::query(
                "INSERT INTO object_metadata (id, object_id, key, value) VALUES (?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4())
            .bind(object.id)
            .bind(field)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }

        let file_path = self.object_path(key);
        self.write_payload(&file_path, &body).await?;

        if let Err(err) = tx.commit().await {
            let _ = fs::remove_file(&file_path).await;
            return Err(StorageError::Sqlx(err));
        }

        debug!("stored {} ({} bytes) at {}", key, object.size_bytes, file_path.display());
        Ok(object)
    }

    async fn get_metadata(&self, key: &str) -> StorageResult<ObjectMetadata> {
        Self::ensure_key_safe(key)?;
        let object = self.fetch_object(key).await?;

        let entries = sqlx::query_as::<_, MetadataEntry>(
            "SELECT id, object_id, key, value FROM object_metadata WHERE object_id = ?",
        )
        .bind(object.id)
        .fetch_all(&*self.db)
        .await?;

        Ok(entries.into_iter().collect())
    }

    /// Delete all rows in one transaction, then remove payloads and prune
    /// empty shard directories.
    async fn delete_many(&self, keys: &[String]) -> StorageResult<()> {
        for key in keys {
            Self::ensure_key_safe(key)?;
        }

        let mut tx = self.db.begin().await?;
        for key in keys {
            sqlx::query(
                "DELETE FROM object_metadata
                 WHERE object_id IN (SELECT id FROM objects WHERE key = ?)",
            )
            .bind(key)
            .execute(&mut *tx)
            .await?;
            sqlx::query("DELETE FROM objects WHERE key = ?")
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        for key in keys {
            let file_path = self.object_path(key);
            match fs::remove_file(&file_path).await {
                Ok(_) => debug!("removed physical file {}", file_path.display()),
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!("file {} already missing", file_path.display());
                }
                Err(err) => return Err(StorageError::Io(err)),
            }
            if let Some(parent) = file_path.parent() {
                self.prune_empty_dirs(parent, &self.base_path).await;
            }
        }

        Ok(())
    }

    async fn head_object(&self, key: &str) -> StorageResult<StoredObject> {
        Self::ensure_key_safe(key)?;
        self.fetch_object(key).await
    }

    /// Returns ObjectNotFound if the record exists but the payload file is missing.
    async fn get_object(&self, key: &str) -> StorageResult<(StoredObject, ByteStream)> {
        Self::ensure_key_safe(key)?;
        let object = self.fetch_object(key).await?;

        let file = File::open(self.object_path(key)).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StorageError::ObjectNotFound(key.to_string())
            } else {
                StorageError::Io(err)
            }
        })?;

        Ok((object, ReaderStream::new(file).boxed()))
    }

    /// SQLite `SELECT 1` plus a write/read/delete round trip under `base_path`.
    async fn readiness(&self) -> Vec<ReadinessCheck> {
        let sqlite = match sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await
        {
            Ok(1) => (true, None),
            Ok(v) => (false, Some(format!("unexpected result: {}", v))),
            Err(e) => (false, Some(format!("error: {}", e))),
        };

        let tmp_path = self.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
        let disk = match fs::write(&tmp_path, b"readyz").await {
            Ok(_) => match fs::read(&tmp_path).await {
                Ok(bytes) if bytes == b"readyz" => match fs::remove_file(&tmp_path).await {
                    Ok(_) => (true, None),
                    Err(e) => (true, Some(format!("could not remove tmp file: {}", e))),
                },
                Ok(_) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    (false, Some("file content mismatch".to_string()))
                }
                Err(e) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    (false, Some(format!("could not read tmp file: {}", e)))
                }
            },
            Err(e) => (false, Some(format!("could not write tmp file: {}", e))),
        };

        vec![
            ReadinessCheck {
                name: "sqlite",
                ok: sqlite.0,
                error: sqlite.1,
            },
            ReadinessCheck {
                name: "disk",
                ok: disk.0,
                error: disk.1,
            },
        ]
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
