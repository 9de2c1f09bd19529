use thiserror::Error;

/// Errors returned by storage providers and their file/folder handles.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An absolute path or URL was given where a namespace-relative path is required.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0} does not exist")]
    NotFound(String),

    /// The operation is not supported for the given arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} does not have a parent folder")]
    NoParent(String),

    /// Failure reported by the underlying object store or file system.
    #[error("storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StorageError {
    pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Backend(err.into())
    }
}
