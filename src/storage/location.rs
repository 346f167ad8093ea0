use crate::error::{IngestError, Result};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore, PutPayload};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// An object store together with a key or key prefix inside it.
///
/// Sources point at a single object, targets at a prefix that part files are
/// written under.
#[derive(Clone)]
pub struct StorageLocation {
    url: Url,
    store: Arc<dyn ObjectStore>,
    path: ObjectPath,
}

impl StorageLocation {
    /// Resolve `s3://`, `s3a://`, `file://` and `memory://` URIs, or a bare
    /// local filesystem path.
    ///
    /// S3 credentials and region come from the usual `AWS_*` environment.
    pub fn parse(uri: &str) -> Result<Self> {
        let url = to_url(uri)?;

        let store: Arc<dyn ObjectStore> = match url.scheme() {
            "s3" | "s3a" => {
                let bucket = url.host_str().ok_or_else(|| {
                    IngestError::Config(format!("S3 URI has no bucket: {}", uri))
                })?;
                Arc::new(
                    AmazonS3Builder::from_env()
                        .with_bucket_name(bucket)
                        .build()?,
                )
            }
            "file" => Arc::new(LocalFileSystem::new()),
            "memory" => Arc::new(InMemory::new()),
            other => {
                return Err(IngestError::Config(format!(
                    "Unsupported storage scheme '{}' in {}",
                    other, uri
                )))
            }
        };

        Self::new(store, url)
    }

    /// Use an already constructed store; the URL only supplies the key
    pub fn new(store: Arc<dyn ObjectStore>, url: Url) -> Result<Self> {
        let path = ObjectPath::from_url_path(url.path())?;
        Ok(Self { url, store, path })
    }

    pub fn uri(&self) -> &str {
        self.url.as_str()
    }

    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    pub fn store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.store)
    }

    /// Key of a named object directly under this prefix
    pub fn child(&self, name: &str) -> ObjectPath {
        self.path.child(name)
    }

    /// Fetch the whole object at this location
    pub async fn read_bytes(&self) -> Result<Bytes> {
        match self.store.get(&self.path).await {
            Ok(result) => Ok(result.bytes().await?),
            Err(object_store::Error::NotFound { .. }) => Err(IngestError::SourceNotFound {
                uri: self.uri().to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Every object under this prefix, ordered by key
    pub async fn list_prefix(&self) -> Result<Vec<ObjectMeta>> {
        let mut objects: Vec<ObjectMeta> = self.store.list(Some(&self.path)).try_collect().await?;
        objects.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(objects)
    }

    /// Delete every object under this prefix, returning how many went
    pub async fn delete_prefix(&self) -> Result<usize> {
        let locations = self
            .store
            .list(Some(&self.path))
            .map_ok(|meta| meta.location)
            .boxed();

        let deleted: Vec<ObjectPath> = self.store.delete_stream(locations).try_collect().await?;
        debug!(prefix = %self.path, deleted = deleted.len(), "Cleared target prefix");

        Ok(deleted.len())
    }

    /// Write one object named `name` under this prefix
    pub async fn put(&self, name: &str, data: Bytes) -> Result<ObjectPath> {
        let location = self.child(name);
        let size = data.len();
        self.store.put(&location, PutPayload::from(data)).await?;
        debug!(location = %location, bytes = size, "Uploaded object");
        Ok(location)
    }

    /// Fetch an object by key from the same store
    pub async fn read_object(&self, location: &ObjectPath) -> Result<Bytes> {
        Ok(self.store.get(location).await?.bytes().await?)
    }
}

impl fmt::Debug for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageLocation")
            .field("url", &self.url.as_str())
            .field("store", &self.store.to_string())
            .field("path", &self.path)
            .finish()
    }
}

fn to_url(uri: &str) -> Result<Url> {
    if uri.contains("://") {
        return Ok(Url::parse(uri)?);
    }

    let absolute = std::path::absolute(uri)?;
    Url::from_file_path(&absolute).map_err(|_| {
        IngestError::Config(format!(
            "Cannot convert path to a file URI: {}",
            absolute.display()
        ))
    })
}
