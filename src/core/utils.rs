//! Logical path helpers shared by all providers.
//!
//! A logical path is a `/`-separated string whose first segment names the root namespace
//! (a container for object stores, a top-level directory for `DirFS`) and whose remainder
//! is the path inside that namespace: `photos/2024/cat.png`.

use crate::error::StorageError;
use crate::core::Result;

pub const SEPARATOR: char = '/';

/// Joins two logical path fragments with exactly one `/`.
///
/// * `rel` is returned unchanged if it is a full URL or `base` is empty.
/// * `base` is returned unchanged if `rel` is empty.
pub fn combine(base: &str, rel: &str) -> String {
    if is_url(rel) || base.is_empty() {
        return rel.to_string();
    }
    if rel.is_empty() {
        return base.to_string();
    }
    format!(
        "{}{}{}",
        base.trim_end_matches(SEPARATOR),
        SEPARATOR,
        rel.trim_start_matches(SEPARATOR)
    )
}

/// Returns true if `path` starts with a URL scheme (`http://`, `https://`, `file://`, ...).
pub fn is_url(path: &str) -> bool {
    match path.split_once("://") {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Splits a logical path into `(namespace, relative_path)` on the first `/`.
///
/// Fails with `InvalidPath` if the path (or the part after the namespace) is absolute or a URL,
/// or if the namespace or any inner segment is empty (`ns/a//b`). One trailing `/` run is
/// allowed and marks a folder.
pub fn resolve(path: &str) -> Result<(&str, &str)> {
    if path.starts_with(SEPARATOR) || is_url(path) {
        return Err(StorageError::invalid_path(path, "path must be relative"));
    }
    let (namespace, relative) = path.split_once(SEPARATOR).unwrap_or((path, ""));
    if namespace.is_empty() {
        return Err(StorageError::invalid_path(path, "namespace is empty"));
    }
    if relative.starts_with(SEPARATOR) || is_url(relative) {
        return Err(StorageError::invalid_path(path, "path must be relative"));
    }
    let trimmed = trim_folder(relative);
    if !trimmed.is_empty() && trimmed.split(SEPARATOR).any(str::is_empty) {
        return Err(StorageError::invalid_path(path, "empty path segment"));
    }
    Ok((namespace, relative))
}

/// Key of a folder without its trailing separators (`a/b/` -> `a/b`).
pub fn trim_folder(path: &str) -> &str {
    path.trim_end_matches(SEPARATOR)
}

/// Key prefix of a folder, always ending with `/` (empty for the namespace root).
pub fn folder_prefix(path: &str) -> String {
    let trimmed = trim_folder(path);
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}{SEPARATOR}")
    }
}

/// Last segment of a path, ignoring trailing separators.
pub fn file_name(path: &str) -> &str {
    let trimmed = trim_folder(path);
    match trimmed.rfind(SEPARATOR) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Path without its last segment, or `None` for a single-segment path.
pub fn parent(path: &str) -> Option<&str> {
    let trimmed = trim_folder(path);
    trimmed.rfind(SEPARATOR).map(|idx| &trimmed[..idx])
}

/// Extension of the last path segment without the leading dot (empty if none).
pub fn extension(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(0) | None => "",
        Some(idx) => &name[idx + 1..],
    }
}

/// Best-effort MIME type derived from the file extension.
pub fn content_type(path: &str) -> Option<&'static str> {
    let ext = extension(path).to_ascii_lowercase();
    let mime = match ext.as_str() {
        "txt" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "xml" => "text/xml",
        "js" => "text/javascript",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "doc" | "docx" => "application/msword",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        _ => return None,
    };
    Some(mime)
}
