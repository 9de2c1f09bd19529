//! Registry of root-namespace handles (containers) shared by `BlobFS` instances.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::core::SasPermissions;
use crate::store::{ListEntry, ListMode, ObjectMeta, ObjectStore, StoreResult};

/// Handle to one container of an object store.
///
/// All object operations issued through a `Namespace` are scoped to its container.
pub struct Namespace {
    name: String,
    store: Arc<dyn ObjectStore>,
}

impl Namespace {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exists(&self) -> StoreResult<bool> {
        self.store.container_exists(&self.name)
    }

    pub fn object_exists(&self, key: &str) -> StoreResult<bool> {
        self.store.object_exists(&self.name, key)
    }

    pub fn head(&self, key: &str) -> StoreResult<ObjectMeta> {
        self.store.head_object(&self.name, key)
    }

    pub fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.store.get_object(&self.name, key)
    }

    pub fn put(&self, key: &str, data: &[u8], content_type: &str) -> StoreResult<()> {
        self.store.put_object(&self.name, key, data, content_type)
    }

    pub fn delete(&self, key: &str) -> StoreResult<()> {
        self.store.delete_object(&self.name, key)
    }

    /// Server-side copy of `key` into `dst` (possibly another namespace).
    pub fn copy_to(&self, key: &str, dst: &Namespace, dst_key: &str) -> StoreResult<()> {
        self.store.copy_object(&self.name, key, &dst.name, dst_key)
    }

    pub fn list(&self, prefix: &str, mode: ListMode) -> StoreResult<Vec<ListEntry>> {
        self.store.list(&self.name, prefix, mode)
    }

    pub fn signed_url(
        &self,
        key: &str,
        expires_at: DateTime<Utc>,
        permissions: SasPermissions,
    ) -> StoreResult<String> {
        self.store.signed_url(&self.name, key, expires_at, permissions)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace").field("name", &self.name).finish()
    }
}

/// Maps namespace names to lazily created, cached [`Namespace`] handles.
///
/// Lookups and insertions happen under a single lock, so concurrent callers asking for
/// the same name trigger at most one container creation and share one handle. Entries
/// live as long as the registry unless removed explicitly with [`remove`](Self::remove).
pub struct NamespaceRegistry {
    store: Arc<dyn ObjectStore>,
    namespaces: Mutex<Vec<Arc<Namespace>>>,
}

impl NamespaceRegistry {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            namespaces: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Returns the cached handle for `name`, creating the container if it is absent.
    pub fn get_or_create(&self, name: &str) -> StoreResult<Arc<Namespace>> {
        let mut namespaces = self.lock();
        if let Some(namespace) = namespaces.iter().find(|ns| ns.name == name) {
            return Ok(Arc::clone(namespace));
        }

        if !self.store.container_exists(name)? && self.store.create_container(name)? {
            tracing::debug!(namespace = name, "created container");
        }
        let namespace = Arc::new(Namespace {
            name: name.to_string(),
            store: Arc::clone(&self.store),
        });
        namespaces.push(Arc::clone(&namespace));
        Ok(namespace)
    }

    /// Drops the cached handle for `name`. Returns false if it was not cached.
    pub fn remove(&self, name: &str) -> bool {
        let mut namespaces = self.lock();
        let before = namespaces.len();
        namespaces.retain(|ns| ns.name != name);
        namespaces.len() != before
    }

    /// Deletes the container `name` and drops its cached handle.
    ///
    /// Both happen under the registry lock: a concurrent `get_or_create` for the same name
    /// waits and then creates a fresh container instead of caching one about to vanish.
    pub fn destroy(&self, name: &str) -> StoreResult<()> {
        let mut namespaces = self.lock();
        self.store.delete_container(name)?;
        namespaces.retain(|ns| ns.name != name);
        tracing::debug!(namespace = name, "deleted container");
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().iter().any(|ns| ns.name == name)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<Namespace>>> {
        // the list stays consistent even if a holder panicked
        self.namespaces
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for NamespaceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.lock().iter().map(|ns| ns.name.clone()).collect();
        f.debug_struct("NamespaceRegistry")
            .field("namespaces", &names)
            .finish()
    }
}
