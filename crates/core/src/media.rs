//! Image media-type helpers used at the intake boundary.
//!
//! Detection is header-only: the `image` crate inspects magic bytes and
//! nothing is decoded.

use std::path::Path;

/// Whether a declared content type names an image (`image/*`).
pub fn is_image_mime(mime: &str) -> bool {
    mime.trim()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

/// Guess the content type from the leading bytes of a file.
pub fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}

/// Guess the content type from a file extension.
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    image::ImageFormat::from_path(path)
        .ok()
        .map(|f| f.to_mime_type())
}

/// Resolve a content type, preferring the bytes over the extension.
pub fn detect_mime(path: &Path, bytes: &[u8]) -> Option<&'static str> {
    sniff_image_mime(bytes).or_else(|| mime_from_extension(path))
}
