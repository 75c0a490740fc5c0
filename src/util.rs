//! Shared utility functions

use sha2::{Digest, Sha256};

/// Keep at most `max_chars` characters of `s`.
///
/// Limits on prompt input are expressed in characters, so this never cuts
/// through a multi-byte character and returns `s` unchanged when it is short
/// enough.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Short SHA-256 fingerprint for logging secrets without revealing them
pub fn fingerprint(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    let hash = hasher.finalize();
    format!("{:x}", hash)[..12].to_string()
}

/// Turn a free-form title into a file-name-safe stem.
///
/// Letters (including accented ones) and digits are kept, runs of anything
/// else collapse into a single underscore.
pub fn file_stem(title: &str) -> String {
    let mut stem = String::with_capacity(title.len());
    let mut pending_sep = false;

    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !stem.is_empty() {
                stem.push('_');
            }
            pending_sep = false;
            stem.push(c);
        } else {
            pending_sep = true;
        }
    }

    if stem.is_empty() {
        "study_guide".to_string()
    } else {
        truncate_chars(&stem, 80).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_shorter_than_max() {
        assert_eq!(truncate_chars("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_at_char_count() {
        assert_eq!(truncate_chars("hello world", 5), "hello");
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let s = "日本語";
        assert_eq!(truncate_chars(s, 1), "日");
        assert_eq!(truncate_chars(s, 2), "日本");
        assert_eq!(truncate_chars(s, 3), "日本語");
    }

    #[test]
    fn test_truncate_empty_string() {
        assert_eq!(truncate_chars("", 5), "");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let a = fingerprint("secret-key");
        assert_eq!(a.len(), 12);
        assert_eq!(a, fingerprint("secret-key"));
        assert_ne!(a, fingerprint("other-key"));
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("Intro to Rust: Ownership!"), "Intro_to_Rust_Ownership");
        assert_eq!(file_stem("  Álgebra lineal  "), "Álgebra_lineal");
        assert_eq!(file_stem("***"), "study_guide");
    }
}
