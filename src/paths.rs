/**
 * Path decomposition and directory-segment cleaning
 */

use std::path::Path;

/// Components of a file path: directory, base name and lowercased extension
/// (with leading separator). Concatenating the three reconstructs a path
/// equivalent to the input, modulo extension case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathComponents {
    pub directory: String,
    pub base_name: String,
    pub extension: String,
}

/// Split a file path into its directory, base name and extension.
///
/// The extension is lowercased and includes the leading dot; a file with no
/// extension (or only a leading dot, like `.hidden`) gets an empty one.
pub fn decompose(path: &Path) -> PathComponents {
    let directory = path
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (base_name, extension) = match file_name.rfind('.') {
        Some(idx) if idx > 0 => (
            file_name[..idx].to_string(),
            file_name[idx..].to_lowercase(),
        ),
        _ => (file_name, String::new()),
    };

    PathComponents {
        directory,
        base_name,
        extension,
    }
}

/// Clean a directory segment into a filename-safe token:
/// strip everything outside `[A-Za-z0-9_- ]`, lowercase, spaces become hyphens.
pub fn clean_token(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ' '))
        .collect::<String>()
        .to_lowercase()
        .replace(' ', "-")
}
