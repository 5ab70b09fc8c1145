use std::{collections::HashMap, sync::Mutex};

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use lazy_static::lazy_static;
use url::Url;

use crate::config::StorageConfig;

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    /// Public retrieval URL for an object key.
    fn public_url(&self, key: &str) -> String;
}

#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
    public_base_url: Url,
}

impl Storage {
    pub async fn new(cfg: &StorageConfig) -> anyhow::Result<Self> {
        let public_base_url = Url::parse(&cfg.public_base_url)
            .with_context(|| format!("invalid public base url {}", cfg.public_base_url))?;
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
            public_base_url,
        })
    }
}

#[async_trait]
impl StorageClient for Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        object_url(&self.public_base_url, key)
    }
}

/// Appends `key` to `base` one path segment at a time, percent-encoding
/// each segment so `#`, `?` and `%` in names stay part of the path.
pub fn object_url(base: &Url, key: &str) -> String {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(key.split('/'));
    }
    url.to_string()
}

lazy_static! {
    static ref MEMORY_BASE_URL: Url = Url::parse("https://fake.local/files").unwrap();
}

/// In-process object store for tests and local runs without S3.
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
    base: Url,
    fail_writes: bool,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self {
            objects: Mutex::default(),
            base: MEMORY_BASE_URL.clone(),
            fail_writes: false,
        }
    }
}

impl MemoryStorage {
    /// A store whose writes always fail, for exercising upload error paths.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Stored body and content type for `key`.
    pub fn get(&self, key: &str) -> Option<(Bytes, String)> {
        self.objects.lock().ok()?.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        anyhow::ensure!(!self.fail_writes, "memory storage rejects writes");
        self.objects
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage lock poisoned"))?
            .insert(key.to_string(), (body, content_type.to_string()));
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        anyhow::ensure!(!self.fail_writes, "memory storage rejects writes");
        self.objects
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage lock poisoned"))?
            .remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        object_url(&self.base, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_storage_put_get_delete() {
        let store = MemoryStorage::default();
        store
            .put_object("people/1_a.jpg", Bytes::from_static(b"abc"), "image/jpeg")
            .await
            .unwrap();
        let (body, ct) = store.get("people/1_a.jpg").expect("stored");
        assert_eq!(&body[..], b"abc");
        assert_eq!(ct, "image/jpeg");

        store.delete_object("people/1_a.jpg").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn failing_storage_rejects_puts() {
        let store = MemoryStorage::failing();
        let err = store
            .put_object("k", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rejects writes"));
        assert!(store.is_empty());
    }

    #[test]
    fn public_url_joins_key() {
        let store = MemoryStorage::default();
        assert_eq!(
            store.public_url("people/7_Ann.png"),
            "https://fake.local/files/people/7_Ann.png"
        );
    }

    #[test]
    fn object_url_encodes_reserved_characters() {
        let base = Url::parse("https://fake.local/files").unwrap();
        assert_eq!(
            object_url(&base, "people/1_Ann_#2.jpg"),
            "https://fake.local/files/people/1_Ann_%232.jpg"
        );
        assert_eq!(
            object_url(&base, "people/1_100%_Bob.jpg"),
            "https://fake.local/files/people/1_100%25_Bob.jpg"
        );
        assert_eq!(
            object_url(&base, "people/1_Who?.jpg"),
            "https://fake.local/files/people/1_Who%3F.jpg"
        );
    }

    #[test]
    fn object_url_tolerates_trailing_slash_on_base() {
        let base = Url::parse("https://cdn.example.com/photos/").unwrap();
        assert_eq!(
            object_url(&base, "people/2_Bo.png"),
            "https://cdn.example.com/photos/people/2_Bo.png"
        );
        let root = Url::parse("https://cdn.example.com").unwrap();
        assert_eq!(
            object_url(&root, "people/2_Bo.png"),
            "https://cdn.example.com/people/2_Bo.png"
        );
    }
}
