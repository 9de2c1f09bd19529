use std::fmt;
use std::io::{Read, Write};
use std::ops::BitOr;

use chrono::{DateTime, Utc};

use crate::error::StorageError;

pub mod utils;

pub type Result<T> = std::result::Result<T, StorageError>;

/// The uniform file/folder contract implemented by every storage backend.
///
/// All paths are logical: `/`-separated, relative, with the first segment naming the
/// root namespace. See [`utils::resolve`].
pub trait StorageProvider {
    type File: StorageFile;
    type Folder: StorageFolder;

    /// Joins two logical path fragments. See [`utils::combine`].
    fn combine(&self, base: &str, rel: &str) -> String {
        utils::combine(base, rel)
    }

    /// Returns a handle for an existing file.
    fn get_file(&self, path: &str) -> Result<Self::File>;

    fn file_exists(&self, path: &str) -> Result<bool>;

    fn folder_exists(&self, path: &str) -> Result<bool>;

    /// Creates an empty file. Fails with `AlreadyExists` if the file is present.
    fn create_file(&self, path: &str) -> Result<Self::File>;

    fn delete_file(&self, path: &str) -> Result<()>;

    /// Moves a file. Fails with `NotFound` if `path` is absent and with `AlreadyExists`
    /// if `new_path` is present.
    fn rename_file(&self, path: &str, new_path: &str) -> Result<()>;

    /// Creates the file at `path` and copies `input` into it until exhausted.
    fn save_stream(&self, path: &str, input: &mut dyn Read) -> Result<()>;

    /// Like [`save_stream`](Self::save_stream), but reports any failure as `false`.
    fn try_save_stream(&self, path: &str, input: &mut dyn Read) -> bool {
        match self.save_stream(path, input) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(path, error = %err, "save stream failed");
                false
            }
        }
    }

    /// Creates a folder. Fails with `AlreadyExists` if the folder is present.
    fn create_folder(&self, path: &str) -> Result<()>;

    /// Like [`create_folder`](Self::create_folder), but returns `false` when the folder
    /// already exists or anything else goes wrong.
    fn try_create_folder(&self, path: &str) -> bool {
        match self.create_folder(path) {
            Ok(()) => true,
            Err(StorageError::AlreadyExists(_)) => false,
            Err(err) => {
                tracing::warn!(path, error = %err, "create folder failed");
                false
            }
        }
    }

    /// Removes a folder and everything below it.
    fn delete_folder(&self, path: &str) -> Result<()>;

    /// Moves a folder and everything below it to `new_path`.
    fn rename_folder(&self, path: &str, new_path: &str) -> Result<()>;

    /// Files directly inside the folder at `path` (single level).
    fn list_files(&self, path: &str) -> Result<Vec<Self::File>>;

    /// Folders directly inside the folder at `path` (single level).
    fn list_folders(&self, path: &str) -> Result<Vec<Self::Folder>>;
}

/// A file bound to the provider that produced it.
pub trait StorageFile {
    /// Full logical path, namespace included.
    fn path(&self) -> &str;

    fn name(&self) -> &str;

    /// Size in bytes. Fetched on first access and cached for the lifetime of the handle.
    fn size(&self) -> Result<u64>;

    /// Last modification time. Fetched on first access and cached for the lifetime of
    /// the handle.
    fn last_modified(&self) -> Result<DateTime<Utc>>;

    /// Extension without the leading dot, empty if there is none.
    fn file_type(&self) -> &str;

    fn open_read(&self) -> Result<Box<dyn Read + Send>>;

    /// Opens a stream that replaces the whole content of the file.
    fn open_write(&self) -> Result<Box<dyn Write + Send>>;

    /// Truncates the file right away and opens a stream for writing to it.
    fn create_stream(&mut self) -> Result<Box<dyn Write + Send>>;

    /// URL granting time-limited direct access to the file.
    /// `expiration` falls back to the provider's configured default lifetime.
    fn shared_access_url(
        &self,
        expiration: Option<DateTime<Utc>>,
        permissions: SasPermissions,
    ) -> Result<String>;
}

/// A folder bound to the provider that produced it.
pub trait StorageFolder: Sized {
    /// Full logical path, namespace included.
    fn path(&self) -> &str;

    fn name(&self) -> &str;

    /// Sum of the sizes of all files below the folder. Computed on every call.
    fn size(&self) -> Result<u64>;

    fn last_modified(&self) -> Result<DateTime<Utc>>;

    /// Fails with `NoParent` at a namespace root.
    fn parent(&self) -> Result<Self>;
}

/// Permission set carried by a shared-access URL.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct SasPermissions(u8);

impl SasPermissions {
    pub const NONE: Self = Self(0);
    pub const READ: Self = Self(1);
    pub const WRITE: Self = Self(2);
    pub const DELETE: Self = Self(4);
    pub const LIST: Self = Self(8);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Parses the compact `sp` token produced by `Display` (`"rw"`, `"rdl"`, ...).
    pub fn from_token(token: &str) -> Option<Self> {
        token.chars().try_fold(Self::NONE, |acc, c| {
            let flag = match c {
                'r' => Self::READ,
                'w' => Self::WRITE,
                'd' => Self::DELETE,
                'l' => Self::LIST,
                _ => return None,
            };
            Some(acc | flag)
        })
    }
}

impl BitOr for SasPermissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for SasPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, c) in [
            (Self::READ, 'r'),
            (Self::WRITE, 'w'),
            (Self::DELETE, 'd'),
            (Self::LIST, 'l'),
        ] {
            if self.contains(flag) {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}
