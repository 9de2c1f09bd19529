use std::io::Read;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use vfs_storage::store::MemoryStore;
use vfs_storage::{
    BlobFS, DirFS, SasPermissions, StorageFile, StorageFolder, StorageProvider,
};

fn main() {
    // RUST_LOG=vfs_storage=debug shows every storage mutation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // the in-memory store stands in for a real blob service
    let store = Arc::new(MemoryStore::new());
    let blobs = BlobFS::new(store);

    // `abc123` is created as a container on first use;
    // `folder` exists only as the marker object `folder/`
    blobs.create_folder("abc123/folder").unwrap();
    blobs
        .save_stream("abc123/folder/f1.txt", &mut &b"Hello"[..])
        .unwrap();

    // moves every object under `folder/` to `folder2/`, one copy+delete at a time
    blobs.rename_folder("abc123/folder", "abc123/folder2").unwrap();
    assert!(blobs.list_files("abc123/folder").unwrap().is_empty());

    let file = blobs.get_file("abc123/folder2/f1.txt").unwrap();
    let url = file
        .shared_access_url(None, SasPermissions::READ)
        .unwrap();
    println!("{} ({} bytes): {url}", file.path(), file.size().unwrap());

    // the same calls against a real directory
    let root = std::env::temp_dir().join("vfs_storage_demo");
    let local = DirFS::new(&root).unwrap();
    local
        .save_stream("abc123/folder/f2.txt", &mut &b"World"[..])
        .unwrap();

    let mut second = String::new();
    local
        .get_file("abc123/folder/f2.txt")
        .unwrap()
        .open_read()
        .unwrap()
        .read_to_string(&mut second)
        .unwrap();

    let folder = local.list_folders("abc123").unwrap().remove(0);
    println!("{} holds {} bytes", folder.path(), folder.size().unwrap());

    let mut first = String::new();
    file.open_read().unwrap().read_to_string(&mut first).unwrap();
    println!("{first}, {second}!");

    // host files outlive the process; remove what the demo created
    local.delete_folder("abc123").unwrap();
}
