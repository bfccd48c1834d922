use sha2::{Digest, Sha256};

use crate::unit::MetadataFormat;

const MAX_NAME_CHARS: usize = 80;
const MAX_EXTENSION_CHARS: usize = 16;

/// Windows-safe encoding of arbitrary text into a single path component.
///
/// Forbidden characters become `_`, runs of `_` collapse, and the result is
/// capped at 80 characters.
pub fn encode_file_name(input: &str) -> String {
    let mut collapsed = String::with_capacity(input.len());
    for c in input.chars().map(|c| if is_forbidden(c) { '_' } else { c }) {
        if c == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(c);
    }
    let trimmed = collapsed.trim_matches(&['_', ' ', '.'][..]);
    let mut name: String = if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.chars().take(MAX_NAME_CHARS).collect()
    };
    if is_reserved_windows_name(&name) {
        name.push('_');
    }
    name
}

/// Keeps only ASCII alphanumerics of an extension, at most 16 of them.
/// Falls back to `fallback` when nothing is left.
pub fn encode_extension(extension: &str, fallback: &str) -> String {
    let kept: String = extension
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_EXTENSION_CHARS)
        .collect();
    if kept.is_empty() {
        fallback.to_string()
    } else {
        kept
    }
}

/// Deterministic directory name for a post: `{encoded_title}--{short_hash(post_id)}`.
///
/// The hash keeps posts with identical titles apart.
pub fn post_dir_name(title: &str, post_id: &str) -> String {
    format!("{}--{}", encode_file_name(title), short_hash(post_id))
}

/// Metadata document written next to each post's `index.html`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InformationFile {
    pub name: &'static str,
    pub content: String,
}

pub fn information_file(format: MetadataFormat, text: &str) -> InformationFile {
    let name = match format {
        MetadataFormat::Json => "info.json",
        MetadataFormat::KeyValue => "info.txt",
    };
    InformationFile {
        name,
        content: text.to_string(),
    }
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    Sha256::digest(input.as_bytes())[..4]
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_characters_are_replaced_and_collapsed() {
        assert_eq!(encode_file_name("My: Title?/Bad"), "My_ Title_Bad");
        assert_eq!(encode_file_name("a<>|b"), "a_b");
    }

    #[test]
    fn empty_and_reserved_names_are_patched() {
        assert_eq!(encode_file_name("..."), "untitled");
        assert_eq!(encode_file_name("con"), "con_");
    }

    #[test]
    fn long_multibyte_titles_truncate_on_char_boundary() {
        let title = "あ".repeat(200);
        let encoded = encode_file_name(&title);
        assert_eq!(encoded.chars().count(), MAX_NAME_CHARS);
    }

    #[test]
    fn extensions_keep_only_alphanumerics() {
        assert_eq!(encode_extension("png", "bin"), "png");
        assert_eq!(encode_extension("../../evil", "bin"), "evil");
        assert_eq!(encode_extension("./", "bin"), "bin");
        assert_eq!(encode_extension("", "jpeg"), "jpeg");
    }

    #[test]
    fn post_dir_name_is_deterministic_per_id() {
        let first = post_dir_name("Same", "100");
        assert_eq!(first, post_dir_name("Same", "100"));
        assert_ne!(first, post_dir_name("Same", "101"));
        assert!(first.starts_with("Same--"));
        assert_eq!(first.len(), "Same--".len() + 8);
    }

    #[test]
    fn information_file_name_follows_format() {
        assert_eq!(information_file(MetadataFormat::Json, "{}").name, "info.json");
        assert_eq!(
            information_file(MetadataFormat::KeyValue, "a:1").name,
            "info.txt"
        );
    }
}
