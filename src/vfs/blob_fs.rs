//! This module provides a storage provider over a flat object store (blob storage), where
//! folders exist only as a naming convention.
//!
//! ### Folder emulation
//! - **Marker objects**: an empty folder is represented by a zero-byte object whose key is
//!   the folder key followed by `/` (`photos/2024/`).
//! - **Prefixes**: a folder exists as long as its marker or any object below its key prefix
//!   exists. Listings fold deeper keys into first-level prefixes.
//! - **Recursive operations**: deleting or renaming a folder walks the prefix tree one level
//!   at a time and applies per-object deletes or copy+delete moves. Nothing is atomic: a
//!   failure part way leaves the tree partially modified.

use std::io::Read;
use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::core::{Result, StorageFile, StorageProvider, utils};
use crate::error::StorageError;
use crate::registry::{Namespace, NamespaceRegistry};
use crate::store::{ListEntry, ListMode, ObjectStore};
use crate::vfs::{BlobFile, BlobFolder, copy_stream};

/// A storage provider that emulates files and folders on top of an [`ObjectStore`].
///
/// The first segment of every logical path names a container (namespace). Containers are
/// created on first reference and cached in a [`NamespaceRegistry`], which may be shared
/// between several providers.
///
/// `BlobFS` is `Send + Sync`; operations on different paths may run concurrently from
/// independent threads. Concurrent changes to the same subtree during a folder delete or
/// rename leave it in an undefined state.
///
/// ### Example:
/// ```
/// use std::sync::Arc;
/// use vfs_storage::{BlobFS, StorageFile, StorageProvider};
/// use vfs_storage::store::MemoryStore;
///
/// let fs = BlobFS::new(Arc::new(MemoryStore::new()));
/// fs.create_folder("abc123/folder").unwrap();
/// fs.save_stream("abc123/folder/f1", &mut &b"Hello"[..]).unwrap();
///
/// fs.rename_folder("abc123/folder", "abc123/folder2").unwrap();
///
/// let files = fs.list_files("abc123/folder2").unwrap();
/// assert_eq!(files[0].name(), "f1");
/// assert!(fs.list_files("abc123/folder").unwrap().is_empty());
/// ```
#[derive(Debug)]
pub struct BlobFS {
    registry: Arc<NamespaceRegistry>,
    config: Arc<ProviderConfig>,
}

impl BlobFS {
    /// Creates a provider with its own namespace registry and default configuration.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_config(store, ProviderConfig::default())
    }

    pub fn with_config(store: Arc<dyn ObjectStore>, config: ProviderConfig) -> Self {
        Self::with_registry(Arc::new(NamespaceRegistry::new(store)), config)
    }

    /// Creates a provider that resolves namespaces through a shared registry.
    pub fn with_registry(registry: Arc<NamespaceRegistry>, config: ProviderConfig) -> Self {
        Self {
            registry,
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> &Arc<NamespaceRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Splits `path` and returns the namespace handle together with the relative part.
    fn resolve<'a>(&self, path: &'a str) -> Result<(Arc<Namespace>, &'a str)> {
        let (name, relative) = utils::resolve(path)?;
        let namespace = self.registry.get_or_create(name)?;
        Ok((namespace, relative))
    }

    fn resolve_file<'a>(&self, path: &'a str) -> Result<(Arc<Namespace>, &'a str)> {
        let (namespace, key) = self.resolve(path)?;
        if key.is_empty() || key.ends_with(utils::SEPARATOR) {
            return Err(StorageError::invalid_path(path, "path must name a file"));
        }
        Ok((namespace, key))
    }

    fn folder_exists_in(namespace: &Namespace, key: &str) -> Result<bool> {
        let key = utils::trim_folder(key);
        if key.is_empty() {
            return Ok(namespace.exists()?);
        }
        let prefix = utils::folder_prefix(key);
        if namespace.object_exists(&prefix)? {
            return Ok(true);
        }
        Ok(!namespace.list(&prefix, ListMode::Delimited)?.is_empty())
    }

    /// Copies the object to its new key, then deletes the source.
    fn move_object(src: &Namespace, key: &str, dst: &Namespace, new_key: &str) -> Result<()> {
        if !src.object_exists(key)? {
            return Err(StorageError::NotFound(utils::combine(src.name(), key)));
        }
        if dst.object_exists(new_key)? {
            return Err(StorageError::AlreadyExists(utils::combine(dst.name(), new_key)));
        }
        src.copy_to(key, dst, new_key)?;
        src.delete(key)?;
        tracing::debug!(
            from = %utils::combine(src.name(), key),
            to = %utils::combine(dst.name(), new_key),
            "moved object"
        );
        Ok(())
    }
}

impl StorageProvider for BlobFS {
    type File = BlobFile;
    type Folder = BlobFolder;

    fn get_file(&self, path: &str) -> Result<BlobFile> {
        let (namespace, key) = self.resolve_file(path)?;
        if !namespace.object_exists(key)? {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(BlobFile::new(namespace, key, Arc::clone(&self.config)))
    }

    fn file_exists(&self, path: &str) -> Result<bool> {
        let (namespace, key) = self.resolve(path)?;
        if key.is_empty() || key.ends_with(utils::SEPARATOR) {
            return Ok(false);
        }
        Ok(namespace.object_exists(key)?)
    }

    fn folder_exists(&self, path: &str) -> Result<bool> {
        let (namespace, key) = self.resolve(path)?;
        Self::folder_exists_in(&namespace, key)
    }

    fn create_file(&self, path: &str) -> Result<BlobFile> {
        let (namespace, key) = self.resolve_file(path)?;
        if namespace.object_exists(key)? {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        namespace.put(key, &[], &self.config.content_type_for(key))?;
        tracing::debug!(path, "created file");
        Ok(BlobFile::new(namespace, key, Arc::clone(&self.config)))
    }

    fn delete_file(&self, path: &str) -> Result<()> {
        let (namespace, key) = self.resolve_file(path)?;
        if !namespace.object_exists(key)? {
            return Err(StorageError::NotFound(path.to_string()));
        }
        namespace.delete(key)?;
        tracing::debug!(path, "deleted file");
        Ok(())
    }

    fn rename_file(&self, path: &str, new_path: &str) -> Result<()> {
        let (src, key) = self.resolve_file(path)?;
        let (dst, new_key) = self.resolve_file(new_path)?;
        Self::move_object(&src, key, &dst, new_key)
    }

    fn save_stream(&self, path: &str, input: &mut dyn Read) -> Result<()> {
        let file = self.create_file(path)?;
        let mut output = file.open_write()?;
        copy_stream(input, &mut output, self.config.copy_buffer_size)?;
        Ok(())
    }

    fn create_folder(&self, path: &str) -> Result<()> {
        let (namespace, key) = self.resolve(path)?;
        let key = utils::trim_folder(key);
        // the namespace root exists as soon as it is referenced; a file blocks its key
        if key.is_empty()
            || namespace.object_exists(key)?
            || Self::folder_exists_in(&namespace, key)?
        {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        let marker = utils::folder_prefix(key);
        namespace.put(&marker, &[], &self.config.default_content_type)?;
        tracing::debug!(path, "created folder marker");
        Ok(())
    }

    fn delete_folder(&self, path: &str) -> Result<()> {
        let (namespace, key) = self.resolve(path)?;
        let key = utils::trim_folder(key);

        if key.is_empty() {
            self.registry.destroy(namespace.name())?;
            return Ok(());
        }

        if !Self::folder_exists_in(&namespace, key)? {
            return Err(StorageError::NotFound(path.to_string()));
        }

        let mut pending = vec![utils::folder_prefix(key)];
        while let Some(prefix) = pending.pop() {
            for entry in namespace.list(&prefix, ListMode::Delimited)? {
                match entry {
                    ListEntry::Object(meta) => namespace.delete(&meta.key)?,
                    ListEntry::Prefix(sub) => pending.push(sub),
                }
            }
        }
        tracing::debug!(path, "deleted folder");
        Ok(())
    }

    fn rename_folder(&self, path: &str, new_path: &str) -> Result<()> {
        let (src, key) = self.resolve(path)?;
        let (dst, new_key) = self.resolve(new_path)?;
        let key = utils::trim_folder(key);
        let new_key = utils::trim_folder(new_key);

        if key.is_empty() || new_key.is_empty() {
            return Err(StorageError::InvalidArgument(format!(
                "renaming namespace roots is not supported: {path} -> {new_path}"
            )));
        }
        let src_prefix = utils::folder_prefix(key);
        let dst_prefix = utils::folder_prefix(new_key);
        if src.name() == dst.name() && (key == new_key || dst_prefix.starts_with(&src_prefix)) {
            return Err(StorageError::InvalidArgument(format!(
                "cannot move folder {path} into itself"
            )));
        }
        if !Self::folder_exists_in(&src, key)? {
            return Err(StorageError::NotFound(path.to_string()));
        }
        if dst.object_exists(new_key)? || Self::folder_exists_in(&dst, new_key)? {
            return Err(StorageError::AlreadyExists(new_path.to_string()));
        }

        let mut pending = vec![(src_prefix, dst_prefix)];
        while let Some((from, to)) = pending.pop() {
            for entry in src.list(&from, ListMode::Delimited)? {
                match entry {
                    // the folder marker itself has an empty remainder and maps onto `to`
                    ListEntry::Object(meta) => {
                        let target = format!("{to}{}", &meta.key[from.len()..]);
                        Self::move_object(&src, &meta.key, &dst, &target)?;
                    }
                    ListEntry::Prefix(sub) => {
                        let target = format!("{to}{}", &sub[from.len()..]);
                        pending.push((sub, target));
                    }
                }
            }
        }
        tracing::debug!(from = path, to = new_path, "renamed folder");
        Ok(())
    }

    fn list_files(&self, path: &str) -> Result<Vec<BlobFile>> {
        let (namespace, key) = self.resolve(path)?;
        let prefix = utils::folder_prefix(key);
        let files = namespace
            .list(&prefix, ListMode::Delimited)?
            .into_iter()
            .filter_map(|entry| match entry {
                ListEntry::Object(meta) if !meta.key.ends_with(utils::SEPARATOR) => Some(
                    BlobFile::new(Arc::clone(&namespace), &meta.key, Arc::clone(&self.config)),
                ),
                _ => None,
            })
            .collect();
        Ok(files)
    }

    fn list_folders(&self, path: &str) -> Result<Vec<BlobFolder>> {
        let (namespace, key) = self.resolve(path)?;
        let prefix = utils::folder_prefix(key);
        let folders = namespace
            .list(&prefix, ListMode::Delimited)?
            .into_iter()
            .filter_map(|entry| match entry {
                ListEntry::Prefix(sub) => Some(BlobFolder::new(Arc::clone(&namespace), &sub)),
                ListEntry::Object(_) => None,
            })
            .collect();
        Ok(folders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SasPermissions, StorageFolder};
    use crate::store::MemoryStore;
    use chrono::{DateTime, Utc};
    use std::io::Write;

    fn setup_test_fs() -> (Arc<MemoryStore>, BlobFS) {
        let store = Arc::new(MemoryStore::new());
        let fs = BlobFS::new(store.clone());
        (store, fs)
    }

    mod namespaces {
        use super::*;

        #[test]
        fn test_namespace_created_on_first_reference() -> Result<()> {
            let (store, fs) = setup_test_fs();
            assert!(!store.container_exists("abc123")?);

            assert!(!fs.file_exists("abc123/missing.txt")?);

            assert!(store.container_exists("abc123")?);
            assert!(fs.registry().contains("abc123"));
            Ok(())
        }

        #[test]
        fn test_shared_registry() -> Result<()> {
            let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
            let registry = Arc::new(NamespaceRegistry::new(store));
            let first = BlobFS::with_registry(registry.clone(), ProviderConfig::default());
            let second = BlobFS::with_registry(registry.clone(), ProviderConfig::default());

            first.create_file("shared/a.txt")?;
            assert!(second.file_exists("shared/a.txt")?);
            assert_eq!(registry.len(), 1);
            Ok(())
        }

        #[test]
        fn test_delete_namespace_root_with_concurrent_lookup() -> Result<()> {
            use crate::registry::tests::CountingStore;
            use std::sync::{Mutex, Weak};
            use std::thread::{self, JoinHandle};

            let store = Arc::new(CountingStore::new());
            let fs = Arc::new(BlobFS::new(store.clone()));
            let lookups: Arc<Mutex<Vec<JoinHandle<()>>>> = Arc::default();

            let weak: Weak<BlobFS> = Arc::downgrade(&fs);
            let pending = Arc::clone(&lookups);
            let hook = Box::new(move || {
                let weak = weak.clone();
                pending.lock().unwrap().push(thread::spawn(move || {
                    if let Some(fs) = weak.upgrade() {
                        fs.file_exists("ns/x").unwrap();
                    }
                }));
                thread::sleep(std::time::Duration::from_millis(50));
            });
            assert!(store.before_delete_container.set(hook).is_ok());

            fs.create_file("ns/f")?;
            fs.delete_folder("ns")?;
            for handle in lookups.lock().unwrap().drain(..) {
                handle.join().unwrap();
            }

            fs.create_file("ns/g")?;
            assert!(fs.file_exists("ns/g")?);
            assert!(!fs.file_exists("ns/f")?);
            Ok(())
        }

        #[test]
        fn test_delete_namespace_root() -> Result<()> {
            let (store, fs) = setup_test_fs();
            fs.create_file("abc123/folder/f1")?;

            fs.delete_folder("abc123")?;

            assert!(!store.container_exists("abc123")?);
            assert!(!fs.registry().contains("abc123"));

            // referencing it again recreates an empty namespace
            assert!(fs.list_files("abc123/folder")?.is_empty());
            assert!(store.container_exists("abc123")?);
            Ok(())
        }

        #[test]
        fn test_create_folder_on_namespace_root() {
            let (_store, fs) = setup_test_fs();
            assert!(matches!(
                fs.create_folder("abc123"),
                Err(StorageError::AlreadyExists(_))
            ));
            assert!(!fs.try_create_folder("abc123/"));
        }
    }

    mod paths {
        use super::*;

        #[test]
        fn test_absolute_and_url_paths_rejected() {
            let (_store, fs) = setup_test_fs();
            for path in ["/abc123/f", "https://host/abc123/f", "abc123//f"] {
                assert!(
                    matches!(fs.create_file(path), Err(StorageError::InvalidPath { .. })),
                    "{path}"
                );
            }
        }

        #[test]
        fn test_file_path_must_name_an_object() {
            let (_store, fs) = setup_test_fs();
            assert!(matches!(
                fs.create_file("abc123"),
                Err(StorageError::InvalidPath { .. })
            ));
            assert!(matches!(
                fs.create_file("abc123/folder/"),
                Err(StorageError::InvalidPath { .. })
            ));
            assert!(!fs.file_exists("abc123/folder/").unwrap());
        }

        #[test]
        fn test_combine_url_passthrough() {
            let (_store, fs) = setup_test_fs();
            assert_eq!(fs.combine("abc123", "folder"), "abc123/folder");
            assert_eq!(fs.combine("abc123", "https://x/y"), "https://x/y");
        }
    }

    mod folders {
        use super::*;

        #[test]
        fn test_create_folder_writes_marker() -> Result<()> {
            let (store, fs) = setup_test_fs();
            fs.create_folder("abc123/folder")?;

            let marker = store.head_object("abc123", "folder/")?;
            assert_eq!(marker.size, 0);
            assert!(fs.folder_exists("abc123/folder")?);
            assert!(fs.folder_exists("abc123/folder/")?);
            Ok(())
        }

        #[test]
        fn test_folder_exists_without_marker() -> Result<()> {
            let (store, fs) = setup_test_fs();
            fs.create_file("abc123/a/b/c.txt")?;

            assert!(store.head_object("abc123", "a/").is_err());
            assert!(fs.folder_exists("abc123/a")?);
            assert!(fs.folder_exists("abc123/a/b")?);
            assert!(!fs.folder_exists("abc123/a/c")?);
            assert!(!fs.folder_exists("abc123/a/b/c.txt")?);
            Ok(())
        }

        #[test]
        fn test_create_folder_existing_virtual_folder() -> Result<()> {
            let (_store, fs) = setup_test_fs();
            fs.create_file("abc123/a/f.txt")?;
            assert!(matches!(
                fs.create_folder("abc123/a"),
                Err(StorageError::AlreadyExists(_))
            ));
            Ok(())
        }

        #[test]
        fn test_list_files_skips_markers_and_nested() -> Result<()> {
            let (_store, fs) = setup_test_fs();
            fs.create_folder("abc123/a")?;
            fs.create_folder("abc123/a/sub")?;
            fs.create_file("abc123/a/one.txt")?;
            fs.create_file("abc123/a/sub/two.txt")?;

            let names: Vec<_> = fs
                .list_files("abc123/a")?
                .iter()
                .map(|f| f.name().to_string())
                .collect();
            assert_eq!(names, vec!["one.txt"]);

            let folders = fs.list_folders("abc123/a")?;
            assert_eq!(folders.len(), 1);
            assert_eq!(folders[0].name(), "sub");
            assert_eq!(folders[0].path(), "abc123/a/sub");
            Ok(())
        }

        #[test]
        fn test_list_at_namespace_root() -> Result<()> {
            let (_store, fs) = setup_test_fs();
            fs.create_file("abc123/top.txt")?;
            fs.create_folder("abc123/x")?;
            fs.create_file("abc123/y/z.txt")?;

            let files = fs.list_files("abc123")?;
            assert_eq!(files.len(), 1);
            assert_eq!(files[0].path(), "abc123/top.txt");

            let folders: Vec<_> = fs
                .list_folders("abc123")?
                .iter()
                .map(|f| f.name().to_string())
                .collect();
            assert_eq!(folders, vec!["x", "y"]);
            Ok(())
        }

        #[test]
        fn test_delete_missing_folder() {
            let (_store, fs) = setup_test_fs();
            assert!(matches!(
                fs.delete_folder("abc123/nope"),
                Err(StorageError::NotFound(_))
            ));
        }

        #[test]
        fn test_delete_folder_keeps_siblings() -> Result<()> {
            let (store, fs) = setup_test_fs();
            fs.create_file("abc123/a/f.txt")?;
            fs.create_file("abc123/a/b/g.txt")?;
            fs.create_file("abc123/ab/keep.txt")?;
            fs.create_file("abc123/a.txt")?;

            fs.delete_folder("abc123/a")?;

            let remaining: Vec<_> = store
                .list("abc123", "", ListMode::Flat)?
                .iter()
                .map(|e| e.key().to_string())
                .collect();
            assert_eq!(remaining, vec!["a.txt", "ab/keep.txt"]);
            Ok(())
        }

        #[test]
        fn test_folder_last_modified_is_unknown() -> Result<()> {
            let (_store, fs) = setup_test_fs();
            fs.create_folder("abc123/a")?;
            let folder = fs.list_folders("abc123")?.remove(0);
            assert_eq!(folder.last_modified()?, DateTime::<Utc>::MIN_UTC);
            Ok(())
        }

        #[test]
        fn test_folder_parent_chain() -> Result<()> {
            let (_store, fs) = setup_test_fs();
            fs.create_folder("abc123/a/b")?;
            let b = fs.list_folders("abc123/a")?.remove(0);

            let a = b.parent()?;
            assert_eq!(a.path(), "abc123/a");
            let root = a.parent()?;
            assert_eq!(root.path(), "abc123");
            assert_eq!(root.name(), "abc123");
            assert!(matches!(root.parent(), Err(StorageError::NoParent(_))));
            Ok(())
        }
    }

    mod rename {
        use super::*;

        #[test]
        fn test_rename_namespace_root_rejected() {
            let (_store, fs) = setup_test_fs();
            fs.create_file("abc123/f").unwrap();
            assert!(matches!(
                fs.rename_folder("abc123", "abc1232"),
                Err(StorageError::InvalidArgument(_))
            ));
            assert!(matches!(
                fs.rename_folder("abc123/", "abc1232/x"),
                Err(StorageError::InvalidArgument(_))
            ));
        }

        #[test]
        fn test_rename_into_namespace_root_rejected() {
            let (_store, fs) = setup_test_fs();
            fs.create_folder("abc123/a").unwrap();
            assert!(matches!(
                fs.rename_folder("abc123/a", "other"),
                Err(StorageError::InvalidArgument(_))
            ));
        }

        #[test]
        fn test_rename_into_itself_rejected() {
            let (_store, fs) = setup_test_fs();
            fs.create_folder("abc123/a").unwrap();
            assert!(matches!(
                fs.rename_folder("abc123/a", "abc123/a/b"),
                Err(StorageError::InvalidArgument(_))
            ));
            assert!(matches!(
                fs.rename_folder("abc123/a", "abc123/a"),
                Err(StorageError::InvalidArgument(_))
            ));
        }

        #[test]
        fn test_rename_prefix_sibling_allowed() -> Result<()> {
            let (_store, fs) = setup_test_fs();
            fs.create_file("abc123/a/f")?;
            fs.rename_folder("abc123/a", "abc123/ab")?;
            assert!(fs.file_exists("abc123/ab/f")?);
            assert!(!fs.folder_exists("abc123/a")?);
            Ok(())
        }

        #[test]
        fn test_rename_moves_marker_and_nested_tree() -> Result<()> {
            let (store, fs) = setup_test_fs();
            fs.create_folder("abc123/a")?;
            fs.create_folder("abc123/a/empty")?;
            fs.create_file("abc123/a/f1")?;
            fs.create_file("abc123/a/b/c/f2")?;

            fs.rename_folder("abc123/a", "abc123/z")?;

            let keys: Vec<_> = store
                .list("abc123", "", ListMode::Flat)?
                .iter()
                .map(|e| e.key().to_string())
                .collect();
            assert_eq!(keys, vec!["z/", "z/b/c/f2", "z/empty/", "z/f1"]);
            Ok(())
        }

        #[test]
        fn test_rename_folder_across_namespaces() -> Result<()> {
            let (store, fs) = setup_test_fs();
            fs.create_file("abc123/a/f1")?;

            fs.rename_folder("abc123/a", "archive/a")?;

            assert!(fs.file_exists("archive/a/f1")?);
            assert!(store.list("abc123", "", ListMode::Flat)?.is_empty());
            Ok(())
        }

        #[test]
        fn test_rename_folder_onto_file() -> Result<()> {
            let (store, fs) = setup_test_fs();
            fs.create_file("abc123/a/f")?;
            fs.create_file("abc123/b")?;

            assert!(matches!(
                fs.rename_folder("abc123/a", "abc123/b"),
                Err(StorageError::AlreadyExists(_))
            ));
            assert!(store.object_exists("abc123", "a/f")?);
            assert!(!store.object_exists("abc123", "b/f")?);
            Ok(())
        }

        #[test]
        fn test_empty_segment_is_not_a_folder() {
            let (store, fs) = setup_test_fs();
            assert!(matches!(
                fs.create_file("abc123/a//b"),
                Err(StorageError::InvalidPath { .. })
            ));
            assert!(fs.list_folders("abc123").unwrap().is_empty());
            assert!(store.list("abc123", "", ListMode::Flat).unwrap().is_empty());
        }

        #[test]
        fn test_rename_folder_missing_or_taken() -> Result<()> {
            let (_store, fs) = setup_test_fs();
            assert!(matches!(
                fs.rename_folder("abc123/nope", "abc123/x"),
                Err(StorageError::NotFound(_))
            ));

            fs.create_folder("abc123/a")?;
            fs.create_folder("abc123/b")?;
            assert!(matches!(
                fs.rename_folder("abc123/a", "abc123/b"),
                Err(StorageError::AlreadyExists(_))
            ));
            Ok(())
        }

        #[test]
        fn test_rename_file_across_namespaces() -> Result<()> {
            let (_store, fs) = setup_test_fs();
            fs.save_stream("abc123/f.txt", &mut &b"data"[..])?;

            fs.rename_file("abc123/f.txt", "other/g.txt")?;

            assert!(!fs.file_exists("abc123/f.txt")?);
            let mut content = Vec::new();
            fs.get_file("other/g.txt")?
                .open_read()?
                .read_to_end(&mut content)?;
            assert_eq!(content, b"data");
            Ok(())
        }
    }

    mod failures {
        use super::*;
        use crate::registry::tests::CountingStore;
        use std::sync::atomic::Ordering;

        fn setup_failing_fs() -> (Arc<CountingStore>, BlobFS) {
            let store = Arc::new(CountingStore::new());
            let fs = BlobFS::new(store.clone());
            store.fail_writes.store(true, Ordering::SeqCst);
            (store, fs)
        }

        #[test]
        fn test_backend_errors_surface() {
            let (_store, fs) = setup_failing_fs();
            assert!(matches!(
                fs.create_folder("abc123/folder"),
                Err(StorageError::Backend(_))
            ));
            assert!(matches!(
                fs.save_stream("abc123/f.txt", &mut &b"x"[..]),
                Err(StorageError::Backend(_))
            ));
        }

        #[test]
        fn test_try_variants_swallow_backend_errors() -> Result<()> {
            let (store, fs) = setup_failing_fs();

            assert!(!fs.try_create_folder("abc123/folder"));
            assert!(!fs.try_save_stream("abc123/f.txt", &mut &b"x"[..]));
            assert!(!fs.folder_exists("abc123/folder")?);
            assert!(!fs.file_exists("abc123/f.txt")?);

            store.fail_writes.store(false, Ordering::SeqCst);
            assert!(fs.try_create_folder("abc123/folder"));
            assert!(fs.try_save_stream("abc123/f.txt", &mut &b"x"[..]));
            Ok(())
        }
    }

    mod files {
        use super::*;

        #[test]
        fn test_create_file_sets_content_type() -> Result<()> {
            let (store, fs) = setup_test_fs();
            fs.create_file("abc123/doc.json")?;
            fs.create_file("abc123/blob.bin")?;

            assert_eq!(store.head_object("abc123", "doc.json")?.content_type, "application/json");
            assert_eq!(
                store.head_object("abc123", "blob.bin")?.content_type,
                "application/unknown"
            );
            Ok(())
        }

        #[test]
        fn test_configured_default_content_type() -> Result<()> {
            let store = Arc::new(MemoryStore::new());
            let config = ProviderConfig {
                default_content_type: "application/octet-stream".to_string(),
                ..ProviderConfig::default()
            };
            let fs = BlobFS::with_config(store.clone(), config);
            fs.create_file("abc123/blob.bin")?;
            assert_eq!(
                store.head_object("abc123", "blob.bin")?.content_type,
                "application/octet-stream"
            );
            Ok(())
        }

        #[test]
        fn test_file_handle_fields() -> Result<()> {
            let (_store, fs) = setup_test_fs();
            let file = fs.create_file("abc123/folder/report.pdf")?;
            assert_eq!(file.path(), "abc123/folder/report.pdf");
            assert_eq!(file.name(), "report.pdf");
            assert_eq!(file.file_type(), "pdf");
            assert_eq!(file.key(), "folder/report.pdf");
            assert_eq!(file.namespace(), "abc123");
            Ok(())
        }

        #[test]
        fn test_shared_access_url_is_verifiable() -> Result<()> {
            let (store, fs) = setup_test_fs();
            fs.create_file("abc123/folder/f1")?;
            let file = fs.get_file("abc123/folder/f1")?;

            let url = file.shared_access_url(None, SasPermissions::READ | SasPermissions::LIST)?;
            store.verify_signed_url(&url, "abc123", "folder/f1", SasPermissions::READ)?;

            let expired = file.shared_access_url(
                Some(Utc::now() - chrono::Duration::minutes(5)),
                SasPermissions::READ,
            )?;
            assert!(store
                .verify_signed_url(&expired, "abc123", "folder/f1", SasPermissions::READ)
                .is_err());
            Ok(())
        }

        #[test]
        fn test_shared_access_url_for_deleted_file() -> Result<()> {
            let (_store, fs) = setup_test_fs();
            let file = fs.create_file("abc123/f1")?;
            fs.delete_file("abc123/f1")?;
            assert!(matches!(
                file.shared_access_url(None, SasPermissions::READ),
                Err(StorageError::Backend(_))
            ));
            Ok(())
        }

        #[test]
        fn test_write_stream_commits_on_flush_and_drop() -> Result<()> {
            let (store, fs) = setup_test_fs();
            let file = fs.create_file("abc123/f.txt")?;

            let mut writer = file.open_write()?;
            writer.write_all(b"abc")?;
            assert_eq!(store.get_object("abc123", "f.txt")?, b"");
            writer.flush()?;
            assert_eq!(store.get_object("abc123", "f.txt")?, b"abc");
            writer.write_all(b"def")?;
            drop(writer);
            assert_eq!(store.get_object("abc123", "f.txt")?, b"abcdef");
            Ok(())
        }

        #[test]
        fn test_save_stream_on_existing_file() -> Result<()> {
            let (_store, fs) = setup_test_fs();
            fs.create_file("abc123/f.txt")?;
            assert!(matches!(
                fs.save_stream("abc123/f.txt", &mut &b"x"[..]),
                Err(StorageError::AlreadyExists(_))
            ));
            Ok(())
        }
    }
}
