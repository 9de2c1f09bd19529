//! This module provides a storage provider that maps logical paths onto a real directory on
//! the host system.
//!
//! ### Key Features:
//! - **Isolated root**: all operations are confined to a designated root directory
//!   (`self.root`). The first segment of a logical path is a top-level directory under it.
//! - **Native hierarchy**: folders are real directories, so rename is a single `rename(2)` and
//!   folder delete is `remove_dir_all`.
//! - **Reference behavior**: `DirFS` follows the same contract as `BlobFS` and serves as the
//!   parity implementation in tests.

use std::fs::{self, OpenOptions};
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use crate::config::ProviderConfig;
use crate::core::{Result, StorageProvider, utils};
use crate::error::StorageError;
use crate::vfs::{DirFile, DirFolder, copy_stream};

/// A storage provider backed by a directory on the host system.
///
/// ### Usage notes:
/// - `DirFS` does not follow symlinks when listing; they are neither files nor folders.
/// - Permissions are not adjusted; `root` must be writable.
/// - `.` and `..` segments are rejected, so no operation escapes `root`.
///
/// ### Example:
/// ```
/// use vfs_storage::{DirFS, StorageProvider};
///
/// let root = std::env::temp_dir().join("vfs_storage_doc");
/// let fs = DirFS::new(&root).unwrap();
///
/// fs.create_folder("docs/notes").unwrap();
/// fs.save_stream("docs/notes/note.txt", &mut &b"Hello"[..]).unwrap();
/// assert!(fs.file_exists("docs/notes/note.txt").unwrap());
///
/// fs.delete_folder("docs").unwrap();
/// ```
#[derive(Debug)]
pub struct DirFS {
    root: PathBuf, // host-related absolute normalized path
    config: ProviderConfig,
}

impl DirFS {
    /// Creates a new `DirFS` with the root directory at `root`.
    /// * `root` is an absolute host path. If it does not exist it will be created.
    ///
    /// Fails if `root` is empty, relative, an existing file, or not writable.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        Self::with_config(root, ProviderConfig::default())
    }

    pub fn with_config<P: AsRef<Path>>(root: P, config: ProviderConfig) -> Result<Self> {
        let root = root.as_ref();

        if root.as_os_str().is_empty() {
            return Err(StorageError::invalid_path("", "root path is empty"));
        }
        if root.is_relative() {
            return Err(StorageError::invalid_path(
                root.display().to_string(),
                "root path must be absolute",
            ));
        }
        if root.exists() && !root.is_dir() {
            return Err(StorageError::InvalidArgument(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let root = Self::normalize(root);
        if !root.exists() {
            fs::create_dir_all(&root)?;
            tracing::debug!(root = %root.display(), "created root directory");
        }

        // check permissions
        if !Self::check_permissions(&root) {
            return Err(StorageError::InvalidArgument(format!(
                "access denied: {}",
                root.display()
            )));
        }

        Ok(Self { root, config })
    }

    /// Returns the host root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Maps a logical path to the host path under `root`.
    fn to_host(&self, path: &str) -> Result<PathBuf> {
        utils::resolve(path)?;
        let mut host = self.root.clone();
        for segment in utils::trim_folder(path).split(utils::SEPARATOR) {
            match segment {
                "" => return Err(StorageError::invalid_path(path, "empty path segment")),
                "." | ".." => {
                    return Err(StorageError::invalid_path(path, "relative segments are not allowed"));
                }
                _ => host.push(segment),
            }
        }
        Ok(host)
    }

    /// Like `to_host`, but `path` must name a file below a namespace, not the namespace
    /// itself or a folder (trailing `/`).
    fn to_host_file(&self, path: &str) -> Result<PathBuf> {
        let (_, relative) = utils::resolve(path)?;
        if relative.is_empty() || relative.ends_with(utils::SEPARATOR) {
            return Err(StorageError::invalid_path(path, "path must name a file"));
        }
        self.to_host(path)
    }

    /// Lexically removes `.` and `..` components.
    fn normalize(path: &Path) -> PathBuf {
        let mut result = PathBuf::new();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if let Some(parent) = result.parent() {
                        result = parent.to_path_buf();
                    }
                }
                _ => result.push(component),
            }
        }
        result
    }

    fn check_permissions(path: &Path) -> bool {
        let marker = path.join(".access");
        fs::write(&marker, b"check").is_ok() && fs::remove_file(marker).is_ok()
    }

    fn create_parent(host: &Path) -> Result<()> {
        if let Some(parent) = host.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Directory entries of `host` matching `keep`, sorted by name.
    fn entries<F>(host: &Path, keep: F) -> Result<Vec<String>>
    where
        F: Fn(&fs::FileType) -> bool,
    {
        if !host.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(host)? {
            let entry = entry?;
            if keep(&entry.file_type()?) {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl StorageProvider for DirFS {
    type File = DirFile;
    type Folder = DirFolder;

    fn get_file(&self, path: &str) -> Result<DirFile> {
        let host = self.to_host_file(path)?;
        if !host.is_file() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(DirFile::new(path, host))
    }

    fn file_exists(&self, path: &str) -> Result<bool> {
        let (_, relative) = utils::resolve(path)?;
        if relative.is_empty() || relative.ends_with(utils::SEPARATOR) {
            return Ok(false);
        }
        Ok(self.to_host(path)?.is_file())
    }

    fn folder_exists(&self, path: &str) -> Result<bool> {
        Ok(self.to_host(path)?.is_dir())
    }

    fn create_file(&self, path: &str) -> Result<DirFile> {
        let host = self.to_host_file(path)?;
        if host.exists() {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        Self::create_parent(&host)?;
        OpenOptions::new().write(true).create_new(true).open(&host)?;
        tracing::debug!(path, "created file");
        Ok(DirFile::new(path, host))
    }

    fn delete_file(&self, path: &str) -> Result<()> {
        let host = self.to_host_file(path)?;
        if !host.is_file() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        fs::remove_file(&host)?;
        tracing::debug!(path, "deleted file");
        Ok(())
    }

    fn rename_file(&self, path: &str, new_path: &str) -> Result<()> {
        let from = self.to_host_file(path)?;
        let to = self.to_host_file(new_path)?;
        if !from.is_file() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        if to.exists() {
            return Err(StorageError::AlreadyExists(new_path.to_string()));
        }
        Self::create_parent(&to)?;
        fs::rename(&from, &to)?;
        tracing::debug!(from = path, to = new_path, "renamed file");
        Ok(())
    }

    fn save_stream(&self, path: &str, input: &mut dyn Read) -> Result<()> {
        let file = self.create_file(path)?;
        let mut output = fs::File::create(file.host_path())?;
        copy_stream(input, &mut output, self.config.copy_buffer_size)?;
        Ok(())
    }

    fn create_folder(&self, path: &str) -> Result<()> {
        let host = self.to_host(path)?;
        if host.exists() {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        fs::create_dir_all(&host)?;
        tracing::debug!(path, "created folder");
        Ok(())
    }

    fn delete_folder(&self, path: &str) -> Result<()> {
        let host = self.to_host(path)?;
        if !host.is_dir() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        fs::remove_dir_all(&host)?;
        tracing::debug!(path, "deleted folder");
        Ok(())
    }

    fn rename_folder(&self, path: &str, new_path: &str) -> Result<()> {
        let from = self.to_host(path)?;
        let to = self.to_host(new_path)?;
        if to.starts_with(&from) {
            return Err(StorageError::InvalidArgument(format!(
                "cannot move folder {path} into itself"
            )));
        }
        if !from.is_dir() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        if to.exists() {
            return Err(StorageError::AlreadyExists(new_path.to_string()));
        }
        Self::create_parent(&to)?;
        fs::rename(&from, &to)?;
        tracing::debug!(from = path, to = new_path, "renamed folder");
        Ok(())
    }

    fn list_files(&self, path: &str) -> Result<Vec<DirFile>> {
        let host = self.to_host(path)?;
        let base = utils::trim_folder(path);
        let files = Self::entries(&host, |t| t.is_file())?
            .into_iter()
            .map(|name| DirFile::new(&utils::combine(base, &name), host.join(&name)))
            .collect();
        Ok(files)
    }

    fn list_folders(&self, path: &str) -> Result<Vec<DirFolder>> {
        let host = self.to_host(path)?;
        let base = utils::trim_folder(path);
        let folders = Self::entries(&host, |t| t.is_dir())?
            .into_iter()
            .map(|name| DirFolder::new(&utils::combine(base, &name), host.join(&name)))
            .collect();
        Ok(folders)
    }
}
