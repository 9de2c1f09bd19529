//! The object-store capability consumed by `BlobFS`.
//!
//! An object store is flat: every container holds objects addressed by a string key, and
//! "directories" only exist as shared `/`-delimited key prefixes. Implementations are
//! expected to be correct and thread-safe; `BlobFS` builds folder semantics on top.

use chrono::{DateTime, Utc};

use crate::core::SasPermissions;

mod memory;

pub use memory::MemoryStore;

/// Capability errors are reported as `anyhow` errors and surface from providers as
/// `StorageError::Backend`.
pub type StoreResult<T> = anyhow::Result<T>;

/// Metadata of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub content_type: String,
}

/// How `list` treats keys below the prefix.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ListMode {
    /// Only the first level: deeper keys are folded into `ListEntry::Prefix`.
    Delimited,
    /// Every object whose key starts with the prefix.
    Flat,
}

/// One item of a listing, in key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEntry {
    Object(ObjectMeta),
    /// A virtual directory: the full key prefix, ending with `/`.
    Prefix(String),
}

impl ListEntry {
    pub fn key(&self) -> &str {
        match self {
            ListEntry::Object(meta) => &meta.key,
            ListEntry::Prefix(prefix) => prefix,
        }
    }
}

pub trait ObjectStore: Send + Sync {
    fn container_exists(&self, container: &str) -> StoreResult<bool>;

    /// Creates the container if absent. Returns true if it was created by this call.
    fn create_container(&self, container: &str) -> StoreResult<bool>;

    /// Deletes the container with all its objects.
    fn delete_container(&self, container: &str) -> StoreResult<()>;

    fn object_exists(&self, container: &str, key: &str) -> StoreResult<bool>;

    fn head_object(&self, container: &str, key: &str) -> StoreResult<ObjectMeta>;

    fn get_object(&self, container: &str, key: &str) -> StoreResult<Vec<u8>>;

    /// Stores `data` under `key`, replacing any previous object.
    fn put_object(
        &self,
        container: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> StoreResult<()>;

    fn delete_object(&self, container: &str, key: &str) -> StoreResult<()>;

    /// Server-side copy, possibly across containers. Replaces the destination.
    fn copy_object(
        &self,
        src_container: &str,
        src_key: &str,
        dst_container: &str,
        dst_key: &str,
    ) -> StoreResult<()>;

    fn list(&self, container: &str, prefix: &str, mode: ListMode) -> StoreResult<Vec<ListEntry>>;

    /// Time-bounded, permission-scoped URL for direct access to one object.
    fn signed_url(
        &self,
        container: &str,
        key: &str,
        expires_at: DateTime<Utc>,
        permissions: SasPermissions,
    ) -> StoreResult<String>;
}
