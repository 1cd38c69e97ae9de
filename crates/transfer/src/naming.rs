//! Remote name and content-type policy.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::MediaKind;

const DEFAULT_EXTENSION: &str = "jpg";
const SUFFIX_LEN: usize = 6;
const OCTET_STREAM: &str = "application/octet-stream";

/// Generates a collision-resistant remote name for `original_name`.
///
/// Format: `{img|vid}_{timestamp}_{suffix}.{ext}`, e.g.
/// `img_2024-05-01T12-30-45-123Z_3fa9c1.heic`.
pub fn derive_remote_name(original_name: &str, kind: MediaKind) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    remote_name_at(original_name, kind, Utc::now(), &suffix[..SUFFIX_LEN])
}

/// Deterministic form of [`derive_remote_name`] with explicit clock and suffix.
///
/// The timestamp is ISO-8601 with `:` and `.` replaced by `-` so names sort
/// chronologically and stay URL-safe.
pub fn remote_name_at(
    original_name: &str,
    kind: MediaKind,
    at: DateTime<Utc>,
    suffix: &str,
) -> String {
    let timestamp = at.format("%Y-%m-%dT%H-%M-%S-%3fZ");
    let ext = extension(original_name).unwrap_or(DEFAULT_EXTENSION);
    format!("{}_{timestamp}_{suffix}.{ext}", kind.prefix())
}

/// Maps a file name to its content type by extension (case-insensitive).
///
/// Unknown or missing extensions map to `application/octet-stream`.
pub fn resolve_content_type(name: &str) -> &'static str {
    let ext = extension(name).map(str::to_lowercase);

    match ext.as_deref() {
        // Images
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        // Videos
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("3gp") => "video/3gpp",
        // Documents
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("txt") => "text/plain",
        _ => OCTET_STREAM,
    }
}

/// Extension of `name` if it is non-empty ASCII alphanumeric. Anything else
/// would need escaping in the blob URL.
fn extension(name: &str) -> Option<&str> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.bytes().all(|b| b.is_ascii_alphanumeric()))
}
