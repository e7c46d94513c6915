//! Storage collaborator: listing and deleting objects in one bucket.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use object_store::ObjectStore;
use object_store::path::Path as ObjectPath;
use std::sync::Arc;
use thiserror::Error;

/// One object as returned by the bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageObjectRef {
    /// Full object key.
    pub key: String,
    /// Last modification timestamp.
    pub last_modified: DateTime<Utc>,
    /// Object size in bytes.
    pub size_bytes: u64,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to connect to bucket {bucket}: {message}")]
    Connect { bucket: String, message: String },

    #[error("Failed to list objects: {0}")]
    List(#[source] object_store::Error),

    #[error("Failed to delete {key}: {source}")]
    Delete {
        key: String,
        #[source]
        source: object_store::Error,
    },
}

/// Bucket-scoped object listing and deletion.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Every object in the bucket, as a lazy, finite, non-restartable stream.
    ///
    /// Paging through the underlying listing API is the implementation's
    /// concern; callers only see objects.
    fn list_objects(&self) -> BoxStream<'_, Result<StorageObjectRef, StorageError>>;

    /// Delete a single object by key.
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;
}

/// Opens the bucket named by a validated config.
pub trait StorageConnector: Send + Sync {
    fn connect(&self, bucket: &str) -> Result<Arc<dyn ObjectStorage>, StorageError>;
}

/// [`ObjectStorage`] backed by an `object_store` implementation.
pub struct ObjectStoreStorage {
    object_store: Arc<dyn ObjectStore>,
}

impl ObjectStoreStorage {
    pub fn new(object_store: Arc<dyn ObjectStore>) -> Self {
        Self { object_store }
    }
}

#[async_trait]
impl ObjectStorage for ObjectStoreStorage {
    fn list_objects(&self) -> BoxStream<'_, Result<StorageObjectRef, StorageError>> {
        self.object_store
            .list(None)
            .map(|meta| {
                meta.map(|meta| StorageObjectRef {
                    key: meta.location.to_string(),
                    last_modified: meta.last_modified,
                    size_bytes: meta.size,
                })
                .map_err(StorageError::List)
            })
            .boxed()
    }

    /// `key` is taken as an already encoded location, the form
    /// [`ObjectStorage::list_objects`] hands out.
    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        let delete_failed = |source| StorageError::Delete {
            key: key.to_string(),
            source,
        };

        let location = ObjectPath::parse(key)
            .map_err(|source| delete_failed(object_store::Error::InvalidPath { source }))?;
        self.object_store
            .delete(&location)
            .await
            .map_err(delete_failed)
    }
}

/// Connects through `common::storage`, or hands out a fixed store.
pub enum ObjectStoreConnector {
    /// Build a client per bucket, optionally redirected by a storage DSN.
    Dsn(Option<String>),
    /// Always use the given store regardless of bucket name.
    Fixed(Arc<dyn ObjectStore>),
}

impl StorageConnector for ObjectStoreConnector {
    fn connect(&self, bucket: &str) -> Result<Arc<dyn ObjectStorage>, StorageError> {
        let object_store = match self {
            Self::Dsn(dsn) => common::storage::create_bucket_store(bucket, dsn.as_deref())
                .map_err(|e| StorageError::Connect {
                    bucket: bucket.to_string(),
                    message: format!("{e:#}"),
                })?,
            Self::Fixed(object_store) => object_store.clone(),
        };

        tracing::debug!(bucket = %bucket, store = %object_store, "Connected to object store");
        Ok(Arc::new(ObjectStoreStorage::new(object_store)))
    }
}
