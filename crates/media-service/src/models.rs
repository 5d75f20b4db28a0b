//! Object key generation and upload validation

/// Extensions accepted for upload: common image formats plus PDF (driver
/// documents travel through the same endpoint as profile photos).
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "pdf"];

/// Metadata for a stored object
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub content_type: Option<String>,
    pub size: i64,
}

/// Extract the lowercase extension of a filename, if any
pub fn file_extension(filename: &str) -> Option<String> {
    let ext = filename.rsplit_once('.')?.1;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Whether the filename's extension is on the allow-list
pub fn extension_allowed(filename: &str) -> bool {
    match file_extension(filename) {
        Some(ext) => ALLOWED_EXTENSIONS.contains(&ext.as_str()),
        None => false,
    }
}

/// Build the object key for an upload: per-user prefix plus a
/// timestamped name, so repeated uploads never collide.
pub fn object_key(uid: &str, filename: &str, now_millis: i64) -> String {
    let ext = file_extension(filename).unwrap_or_else(|| "bin".to_string());
    format!("users/{}/file_{}_{}.{}", uid, uid, now_millis, ext)
}

/// Canonical path-style retrieval URL for a stored object
pub fn canonical_url(public_base_url: &str, bucket: &str, key: &str) -> String {
    format!(
        "{}/{}/{}",
        public_base_url.trim_end_matches('/'),
        bucket,
        key
    )
}
