//! File name sanitization for scratch storage
//!
//! Remote providers accept names the local disk refuses; fetched files are
//! written under a sanitized name so any backend's content can land locally.

/// Names Windows refuses regardless of extension
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL",
    "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9",
    "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Characters no local file system accepts everywhere
const FORBIDDEN_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Sanitize a remote file name for local storage
pub fn sanitize_filename(name: &str) -> String {
    let mut result: String = name
        .chars()
        .map(|c| {
            if FORBIDDEN_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let name_upper = result.to_uppercase();
    let base_name = name_upper.split('.').next().unwrap_or("");
    if RESERVED_NAMES.contains(&base_name) {
        result = format!("_{}", result);
    }

    // Trailing dots and spaces are dropped by Windows
    while result.ends_with('.') || result.ends_with(' ') {
        result.pop();
    }

    if result.is_empty() {
        result = "_unnamed".to_string();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_chars() {
        assert_eq!(sanitize_filename("a/b:c?.txt"), "a_b_c_.txt");
    }

    #[test]
    fn test_reserved_names() {
        assert_eq!(sanitize_filename("con.txt"), "_con.txt");
        assert_eq!(sanitize_filename("console.txt"), "console.txt");
    }

    #[test]
    fn test_degenerate_names() {
        assert_eq!(sanitize_filename("name. "), "name");
        assert_eq!(sanitize_filename(".."), "_unnamed");
        assert_eq!(sanitize_filename(""), "_unnamed");
    }
}
