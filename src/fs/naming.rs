//! Filename generation and manipulation.

use crate::error::{Error, Result};

/// Longest directory name produced from a post title, in characters.
const MAX_DIR_NAME_CHARS: usize = 120;

/// Device names Windows refuses as file or directory names.
const RESERVED_WINDOWS_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

fn replace_forbidden(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Sanitize a path component (creator folder name).
///
/// Separators are replaced rather than rejected, but traversal is refused.
pub fn sanitize_path_component(name: &str) -> Result<String> {
    // Reject path traversal attempts
    if name.contains("..") {
        return Err(Error::InvalidFilename(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }

    // Reject null bytes
    if name.contains('\0') {
        return Err(Error::InvalidFilename(format!(
            "Null bytes not allowed: '{}'",
            name
        )));
    }

    let sanitized = replace_forbidden(name);

    // Reject empty or whitespace-only names
    if sanitized.trim().is_empty() {
        return Err(Error::InvalidFilename(
            "Path component cannot be empty or whitespace-only".to_string(),
        ));
    }

    Ok(sanitized)
}

/// Sanitize a single file name inside a download directory.
///
/// Separators are replaced, so only the bare `.` and `..` names can leave the directory.
/// Dots elsewhere in the name (`notes..final.pdf`) are kept.
pub fn sanitize_file_component(name: &str) -> Result<String> {
    if name.contains('\0') {
        return Err(Error::InvalidFilename(format!(
            "Null bytes not allowed: '{}'",
            name
        )));
    }

    let sanitized = replace_forbidden(name);
    let trimmed = sanitized.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return Err(Error::InvalidFilename(format!(
            "Not a usable file name: '{}'",
            name
        )));
    }

    Ok(sanitized)
}

/// Turn an untrusted remote name into a safe file name, or `None` if nothing usable remains.
pub fn sanitize_filename_lossy(name: &str) -> Option<String> {
    let sanitized = replace_forbidden(name);
    let trimmed = sanitized.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        return None;
    }
    Some(trimmed.to_string())
}

/// Turn a post title into a directory name valid on Windows (and therefore everywhere).
///
/// Returns `None` when nothing usable remains.
pub fn sanitize_dir_name(title: &str) -> Option<String> {
    let replaced = replace_forbidden(title);
    let truncated: String = replaced.trim().chars().take(MAX_DIR_NAME_CHARS).collect();

    // Windows strips trailing dots and spaces silently
    let cleaned = truncated.trim_end_matches(|c| c == '.' || c == ' ').trim_start().to_string();
    if cleaned.is_empty() {
        return None;
    }

    let stem = cleaned.split('.').next().unwrap_or("").to_uppercase();
    if RESERVED_WINDOWS_NAMES.contains(&stem.as_str()) {
        return Some(format!("{}_", cleaned));
    }

    Some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path_component_valid() {
        assert_eq!(
            sanitize_path_component("creator_name").unwrap(),
            "creator_name"
        );
        // Path separators are sanitized (not rejected) in path components
        assert_eq!(
            sanitize_path_component("path/to/name").unwrap(),
            "path_to_name"
        );
    }

    #[test]
    fn test_sanitize_path_component_traversal() {
        assert!(sanitize_path_component("../evil").is_err());
        assert!(sanitize_path_component("foo/../bar").is_err());
        assert!(sanitize_path_component("  ").is_err());
    }

    #[test]
    fn test_sanitize_file_component_keeps_inner_dots() {
        assert_eq!(
            sanitize_file_component("notes..final.pdf").unwrap(),
            "notes..final.pdf"
        );
        assert_eq!(sanitize_file_component("a/../b").unwrap(), "a_.._b");
        assert!(sanitize_file_component("..").is_err());
        assert!(sanitize_file_component(" . ").is_err());
        assert!(sanitize_file_component("").is_err());
    }

    #[test]
    fn test_sanitize_filename_lossy() {
        assert_eq!(sanitize_filename_lossy("a/b.txt").as_deref(), Some("a_b.txt"));
        assert_eq!(sanitize_filename_lossy(" .. "), None);
        assert_eq!(sanitize_filename_lossy(""), None);
    }

    #[test]
    fn test_sanitize_dir_name() {
        assert_eq!(sanitize_dir_name("What? Yes: no").as_deref(), Some("What_ Yes_ no"));
        assert_eq!(sanitize_dir_name("trailing dots...").as_deref(), Some("trailing dots"));
        assert_eq!(sanitize_dir_name("con").as_deref(), Some("con_"));
        assert_eq!(sanitize_dir_name("Lpt1.txt").as_deref(), Some("Lpt1.txt_"));
        assert_eq!(sanitize_dir_name(" . "), None);
        assert_eq!(sanitize_dir_name(""), None);
    }

    #[test]
    fn test_sanitize_dir_name_truncates() {
        let long = "я".repeat(300);
        let name = sanitize_dir_name(&long).unwrap();
        assert_eq!(name.chars().count(), MAX_DIR_NAME_CHARS);
    }
}
