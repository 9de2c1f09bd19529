//! File and folder handles produced by `BlobFS`.

use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::ProviderConfig;
use crate::core::{Result, SasPermissions, StorageFile, StorageFolder, utils};
use crate::error::StorageError;
use crate::registry::Namespace;
use crate::store::{ListEntry, ListMode};
use crate::vfs::entry::{AttributeCache, FileAttributes};

/// A file stored as one object of a namespace.
///
/// Size and last-modified are fetched from the store on first access and then cached
/// for the lifetime of the handle.
#[derive(Debug)]
pub struct BlobFile {
    namespace: Arc<Namespace>,
    key: String,
    path: String,
    config: Arc<ProviderConfig>,
    attributes: AttributeCache,
}

impl BlobFile {
    pub(crate) fn new(namespace: Arc<Namespace>, key: &str, config: Arc<ProviderConfig>) -> Self {
        let path = utils::combine(namespace.name(), key);
        Self {
            namespace,
            key: key.to_string(),
            path,
            config,
            attributes: AttributeCache::new(),
        }
    }

    /// Object key inside the namespace.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn namespace(&self) -> &str {
        self.namespace.name()
    }

    /// Size and last-modified time, fetched on first call and cached afterwards.
    pub fn attributes(&self) -> Result<FileAttributes> {
        self.attributes.get_or_fetch(|| {
            let meta = self.namespace.head(&self.key)?;
            Ok(FileAttributes {
                size: meta.size,
                last_modified: meta.last_modified,
            })
        })
    }

    fn writer(&self) -> BlobWriter {
        BlobWriter {
            namespace: Arc::clone(&self.namespace),
            key: self.key.clone(),
            content_type: self.config.content_type_for(&self.key),
            buffer: Vec::new(),
            dirty: true,
        }
    }
}

impl StorageFile for BlobFile {
    fn path(&self) -> &str {
        &self.path
    }

    fn name(&self) -> &str {
        utils::file_name(&self.key)
    }

    fn size(&self) -> Result<u64> {
        Ok(self.attributes()?.size)
    }

    fn last_modified(&self) -> Result<DateTime<Utc>> {
        Ok(self.attributes()?.last_modified)
    }

    fn file_type(&self) -> &str {
        utils::extension(&self.key)
    }

    fn open_read(&self) -> Result<Box<dyn Read + Send>> {
        let data = self.namespace.get(&self.key)?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn open_write(&self) -> Result<Box<dyn Write + Send>> {
        Ok(Box::new(self.writer()))
    }

    fn create_stream(&mut self) -> Result<Box<dyn Write + Send>> {
        let mut writer = self.writer();
        writer.commit()?;
        self.attributes.reset();
        Ok(Box::new(writer))
    }

    fn shared_access_url(
        &self,
        expiration: Option<DateTime<Utc>>,
        permissions: SasPermissions,
    ) -> Result<String> {
        let expires_at = expiration.unwrap_or_else(|| self.config.default_expiration());
        Ok(self
            .namespace
            .signed_url(&self.key, expires_at, permissions)?)
    }
}

/// Write stream for one object.
///
/// Object stores replace whole objects, so written bytes are buffered and uploaded on
/// `flush` or when the writer is dropped. A writer dropped without any write still
/// uploads, leaving an empty object.
pub struct BlobWriter {
    namespace: Arc<Namespace>,
    key: String,
    content_type: String,
    buffer: Vec<u8>,
    dirty: bool,
}

impl BlobWriter {
    fn commit(&mut self) -> io::Result<()> {
        self.namespace
            .put(&self.key, &self.buffer, &self.content_type)
            .map_err(io::Error::other)?;
        self.dirty = false;
        Ok(())
    }
}

impl Write for BlobWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.dirty = true;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.dirty {
            self.commit()?;
        }
        Ok(())
    }
}

impl Drop for BlobWriter {
    fn drop(&mut self) {
        if !self.dirty {
            return;
        }
        if let Err(err) = self.commit() {
            tracing::error!(
                namespace = self.namespace.name(),
                key = %self.key,
                error = %err,
                "failed to upload object on drop"
            );
        }
    }
}

/// A virtual folder: a key prefix of a namespace.
#[derive(Debug, Clone)]
pub struct BlobFolder {
    namespace: Arc<Namespace>,
    key: String,
    path: String,
}

impl BlobFolder {
    /// `key` is the folder key without trailing `/`; empty for the namespace root.
    pub(crate) fn new(namespace: Arc<Namespace>, key: &str) -> Self {
        let key = utils::trim_folder(key).to_string();
        let path = utils::combine(namespace.name(), &key);
        Self {
            namespace,
            key,
            path,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_namespace_root(&self) -> bool {
        self.key.is_empty()
    }
}

impl StorageFolder for BlobFolder {
    fn path(&self) -> &str {
        &self.path
    }

    fn name(&self) -> &str {
        if self.is_namespace_root() {
            self.namespace.name()
        } else {
            utils::file_name(&self.key)
        }
    }

    fn size(&self) -> Result<u64> {
        let mut size = 0;
        let mut pending = vec![utils::folder_prefix(&self.key)];
        while let Some(prefix) = pending.pop() {
            for entry in self.namespace.list(&prefix, ListMode::Delimited)? {
                match entry {
                    ListEntry::Object(meta) => size += meta.size,
                    ListEntry::Prefix(sub) => pending.push(sub),
                }
            }
        }
        Ok(size)
    }

    /// Virtual folders carry no timestamp; always `DateTime::<Utc>::MIN_UTC`.
    fn last_modified(&self) -> Result<DateTime<Utc>> {
        Ok(DateTime::<Utc>::MIN_UTC)
    }

    fn parent(&self) -> Result<Self> {
        if self.is_namespace_root() {
            return Err(StorageError::NoParent(self.path.clone()));
        }
        let parent = utils::parent(&self.key).unwrap_or("");
        Ok(Self::new(Arc::clone(&self.namespace), parent))
    }
}
