//! Utility helpers shared across the ragchat CLI.

use std::path::{Path, PathBuf};

/// Expand a leading `~` in a user-supplied path.
#[must_use]
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand::tilde(path.trim());
    PathBuf::from(expanded.as_ref())
}

/// Truncate a string to at most `max_len` bytes, appending `ellipsis` when cut.
///
/// Never splits a UTF-8 character.
#[must_use]
pub fn truncate_with_ellipsis(s: &str, max_len: usize, ellipsis: &str) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut truncate_at = max_len.saturating_sub(ellipsis.len());
    while truncate_at > 0 && !s.is_char_boundary(truncate_at) {
        truncate_at -= 1;
    }
    format!("{}{}", &s[..truncate_at], ellipsis)
}

/// Whether the path carries a `.pdf` extension (any case).
#[must_use]
pub fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// File name used for display and for the multipart part.
#[must_use]
pub fn display_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
