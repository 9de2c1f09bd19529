mod blob_entry;
mod blob_fs;
mod dir_entry;
mod dir_fs;
mod entry;

use std::io::{self, Read, Write};

pub use blob_entry::{BlobFile, BlobFolder};
pub use blob_fs::BlobFS;
pub use dir_entry::{DirFile, DirFolder};
pub use dir_fs::DirFS;
pub use entry::FileAttributes;

/// Copies `input` to `output` in chunks of `buffer_size` bytes, then flushes `output`.
pub(crate) fn copy_stream(
    input: &mut dyn Read,
    output: &mut dyn Write,
    buffer_size: usize,
) -> io::Result<u64> {
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut copied = 0;
    loop {
        let read = match input.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        output.write_all(&buffer[..read])?;
        copied += read as u64;
    }
    output.flush()?;
    Ok(copied)
}
