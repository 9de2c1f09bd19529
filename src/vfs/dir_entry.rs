//! File and folder handles produced by `DirFS`.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use url::Url;

use crate::core::{Result, SasPermissions, StorageFile, StorageFolder, utils};
use crate::error::StorageError;
use crate::vfs::entry::{AttributeCache, FileAttributes};

/// A file on the host file system addressed by a logical path.
#[derive(Debug)]
pub struct DirFile {
    path: String,
    host: PathBuf,
    attributes: AttributeCache,
}

impl DirFile {
    pub(crate) fn new(path: &str, host: PathBuf) -> Self {
        Self {
            path: path.to_string(),
            host,
            attributes: AttributeCache::new(),
        }
    }

    /// Absolute host path of the file.
    pub fn host_path(&self) -> &Path {
        &self.host
    }

    /// Size and last-modified time, fetched on first call and cached afterwards.
    pub fn attributes(&self) -> Result<FileAttributes> {
        self.attributes.get_or_fetch(|| {
            let metadata = fs::metadata(&self.host)?;
            Ok(FileAttributes {
                size: metadata.len(),
                last_modified: DateTime::<Utc>::from(metadata.modified()?),
            })
        })
    }
}

impl StorageFile for DirFile {
    fn path(&self) -> &str {
        &self.path
    }

    fn name(&self) -> &str {
        utils::file_name(&self.path)
    }

    fn size(&self) -> Result<u64> {
        Ok(self.attributes()?.size)
    }

    fn last_modified(&self) -> Result<DateTime<Utc>> {
        Ok(self.attributes()?.last_modified)
    }

    fn file_type(&self) -> &str {
        utils::extension(&self.path)
    }

    fn open_read(&self) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(&self.host)?))
    }

    fn open_write(&self) -> Result<Box<dyn Write + Send>> {
        Ok(Box::new(File::create(&self.host)?))
    }

    fn create_stream(&mut self) -> Result<Box<dyn Write + Send>> {
        let file = File::create(&self.host)?;
        self.attributes.reset();
        Ok(Box::new(file))
    }

    /// Returns a `file://` URL. Local files carry no access policy, so `expiration` and
    /// `permissions` are ignored.
    fn shared_access_url(
        &self,
        _expiration: Option<DateTime<Utc>>,
        _permissions: SasPermissions,
    ) -> Result<String> {
        if !self.host.is_file() {
            return Err(StorageError::NotFound(self.path.clone()));
        }
        let url = Url::from_file_path(&self.host)
            .map_err(|_| StorageError::invalid_path(&self.path, "not representable as a URL"))?;
        Ok(url.into())
    }
}

/// A directory on the host file system addressed by a logical path.
#[derive(Debug, Clone)]
pub struct DirFolder {
    path: String,
    host: PathBuf,
}

impl DirFolder {
    pub(crate) fn new(path: &str, host: PathBuf) -> Self {
        Self {
            path: utils::trim_folder(path).to_string(),
            host,
        }
    }

    pub fn host_path(&self) -> &Path {
        &self.host
    }
}

impl StorageFolder for DirFolder {
    fn path(&self) -> &str {
        &self.path
    }

    fn name(&self) -> &str {
        utils::file_name(&self.path)
    }

    fn size(&self) -> Result<u64> {
        let mut size = 0;
        let mut pending = vec![self.host.clone()];
        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let file_type = entry.file_type()?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    size += entry.metadata()?.len();
                }
            }
        }
        Ok(size)
    }

    fn last_modified(&self) -> Result<DateTime<Utc>> {
        let modified = fs::metadata(&self.host)?.modified()?;
        Ok(DateTime::<Utc>::from(modified))
    }

    fn parent(&self) -> Result<Self> {
        let parent = utils::parent(&self.path)
            .ok_or_else(|| StorageError::NoParent(self.path.clone()))?;
        let host = self
            .host
            .parent()
            .ok_or_else(|| StorageError::NoParent(self.path.clone()))?;
        Ok(Self::new(parent, host.to_path_buf()))
    }
}
