//! Uniform file and folder storage for Rust.
//! One API over a directory on the local disk and over a flat object store (blob storage)
//! where folders are emulated with key prefixes and marker objects.
//!
//! ### Overview
//!
//! `vfs-storage` defines the `StorageProvider` trait together with the `StorageFile` and
//! `StorageFolder` handle traits, and provides two implementations: `DirFS`, which maps
//! logical paths to a real directory, and `BlobFS`, which emulates a folder hierarchy on
//! top of any `ObjectStore`.
//!
//! **Key ideas**:
//! - **Logical paths**: `namespace/folder/file.txt`, always relative and `/`-separated. The
//!   first segment is the root namespace (a container, or a top-level directory).
//! - **Folder emulation**: on an object store a folder exists if its marker object or any
//!   object under its prefix exists. Recursive delete and rename work object by object and
//!   are not atomic.
//! - **Shared namespaces**: containers are created on first use and cached in a
//!   `NamespaceRegistry` that can be shared between providers.
//! - **Testability**: `MemoryStore` is a complete in-process object store, so both backends
//!   run the same scenarios in unit tests.
//!
//! ### Example
//!
//! ```
//! use std::sync::Arc;
//! use vfs_storage::{BlobFS, StorageFile, StorageProvider};
//! use vfs_storage::store::MemoryStore;
//!
//! let fs = BlobFS::new(Arc::new(MemoryStore::new()));
//! fs.save_stream("docs/readme.txt", &mut &b"Hello"[..]).unwrap();
//!
//! let file = fs.get_file("docs/readme.txt").unwrap();
//! assert_eq!(file.size().unwrap(), 5);
//! assert_eq!(file.file_type(), "txt");
//! ```

mod core;
mod error;
mod vfs;

pub mod config;
pub mod registry;
pub mod store;

pub use config::ProviderConfig;
pub use core::{Result, SasPermissions, StorageFile, StorageFolder, StorageProvider, utils};
pub use error::StorageError;
pub use registry::{Namespace, NamespaceRegistry};
pub use vfs::{BlobFS, BlobFile, BlobFolder, DirFS, DirFile, DirFolder, FileAttributes};
