use std::sync::OnceLock;

use chrono::{DateTime, Utc};

use crate::core::Result;

/// Attributes of a file as reported by the backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FileAttributes {
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Fetch-once cache for file attributes.
///
/// The first successful fetch is kept for the lifetime of the cache and never refreshed,
/// so a handle may report stale values after a concurrent change. A failed fetch is not
/// cached.
#[derive(Debug, Default)]
pub(crate) struct AttributeCache {
    cell: OnceLock<FileAttributes>,
}

impl AttributeCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get_or_fetch<F>(&self, fetch: F) -> Result<FileAttributes>
    where
        F: FnOnce() -> Result<FileAttributes>,
    {
        if let Some(attributes) = self.cell.get() {
            return Ok(*attributes);
        }
        let fetched = fetch()?;
        // a racing fetch may have won; keep whichever landed first
        Ok(*self.cell.get_or_init(|| fetched))
    }

    pub(crate) fn is_fetched(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Forgets the cached attributes, e.g. after the handle truncated its file.
    pub(crate) fn reset(&mut self) {
        self.cell = OnceLock::new();
    }
}
