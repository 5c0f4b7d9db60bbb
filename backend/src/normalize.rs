//! Pure text canonicalization functions. No I/O, no external state.
//!
//! All normalization rules here are versioned behavior: changing the
//! substitution table or the binary-root prefix length is a schema-version
//! bump, never a silent change.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::types::{BinaryRootMethod, CanonicalRow};

/// Version tag of the Arabic letter-variant substitution table below.
pub static ROOT_FOLD_VERSION: &str = "v1";

/// Fixed prefix length for binary-root derivation.
pub const BINARY_ROOT_PREFIX_LEN: usize = 2;

/// Letters treated as weak/auxiliary when forming the weakless root variant.
pub static WEAK_LETTERS: &str = "اوييء";

lazy_static! {
    static ref WS_RE: Regex = Regex::new(r"\s+").unwrap();

    static ref HTML_TAG_RE: Regex = Regex::new(r"<[^>]+>").unwrap();

    /// Arabic diacritics (fathatan..wavy hamza), superscript alef and tatweel.
    static ref AR_DIACRITICS_RE: Regex =
        Regex::new("[\u{064B}-\u{065F}\u{0670}\u{0640}]").unwrap();

    /// Letter-variant equivalence classes for Arabic root normalization.
    /// Hamza-carrier alif forms fold to bare alif, alif maqsura to ya,
    /// hamza on waw/ya to the carrier, ta marbuta to ha.
    static ref ROOT_FOLD: HashMap<char, char> = {
        let mut map = HashMap::new();
        map.insert('أ', 'ا');
        map.insert('إ', 'ا');
        map.insert('آ', 'ا');
        map.insert('ٱ', 'ا');
        map.insert('ى', 'ي');
        map.insert('ؤ', 'و');
        map.insert('ئ', 'ي');
        map.insert('ة', 'ه');
        map
    };
}

/// Canonicalize a lemma surface form: lowercase, NFC-compose, trim and
/// collapse internal whitespace to single spaces.
///
/// Idempotent: `normalize_lemma(normalize_lemma(x)) == normalize_lemma(x)`.
pub fn normalize_lemma(text: &str) -> String {
    let lowered = text.to_lowercase();
    let composed: String = lowered.nfc().collect();
    WS_RE.replace_all(composed.trim(), " ").to_string()
}

/// Normalize an Arabic root: strip diacritics and tatweel, fold the
/// documented letter-variant table. Empty input yields an empty string.
pub fn normalize_root(root: &str) -> String {
    let root = root.trim();
    if root.is_empty() {
        return String::new();
    }
    let stripped = AR_DIACRITICS_RE.replace_all(root, "");
    stripped
        .chars()
        .map(|c| *ROOT_FOLD.get(&c).unwrap_or(&c))
        .collect()
}

/// First two characters of the normalized root, or `None` with
/// `BinaryRootMethod::Missing` when the root is too short.
pub fn derive_binary_root(root_norm: &str) -> (Option<String>, BinaryRootMethod) {
    let chars: Vec<char> = root_norm.chars().collect();
    if chars.len() >= BINARY_ROOT_PREFIX_LEN {
        let prefix: String = chars[..BINARY_ROOT_PREFIX_LEN].iter().collect();
        (Some(prefix), BinaryRootMethod::First2)
    } else {
        (None, BinaryRootMethod::Missing)
    }
}

/// The normalized root with weak letters removed.
pub fn weakless_root(root_norm: &str) -> String {
    root_norm
        .chars()
        .filter(|c| !WEAK_LETTERS.contains(*c))
        .collect()
}

/// Clean up an IPA string: trim, strip wrapping `/.../` or `[...]`,
/// NFC-compose, remove whitespace and stress marks.
pub fn normalize_ipa(ipa: &str) -> String {
    let mut s = ipa.trim().to_string();
    let cs: Vec<char> = s.chars().collect();
    if cs.len() >= 2
        && ((cs[0] == '/' && cs[cs.len() - 1] == '/')
            || (cs[0] == '[' && cs[cs.len() - 1] == ']'))
    {
        let inner: String = cs[1..cs.len() - 1].iter().collect();
        s = inner.trim().to_string();
    }
    let composed: String = s.nfc().collect();
    composed
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{02c8}' && *c != '\u{02cc}' && *c != '\'')
        .collect()
}

/// Replace HTML tags with spaces and collapse whitespace.
pub fn strip_html(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let no_tags = HTML_TAG_RE.replace_all(text, " ");
    WS_RE.replace_all(no_tags.trim(), " ").to_string()
}

/// Populate the root-derived fields of a row from its raw `root`.
///
/// When `root` is absent or empty, all derived fields stay absent. When a
/// root is present but too short, `binary_root` is absent and the method is
/// explicitly `missing` rather than an empty string.
pub fn apply_root_fields(row: &mut CanonicalRow) {
    let raw = match row.root.as_deref() {
        Some(r) if !r.trim().is_empty() => r.trim().to_string(),
        _ => {
            row.root = None;
            row.root_norm = None;
            row.binary_root = None;
            row.binary_root_method = None;
            row.weakless_root = None;
            return;
        }
    };

    let norm = normalize_root(&raw);
    let (binary, method) = derive_binary_root(&norm);
    let weakless = weakless_root(&norm);

    row.root = Some(raw);
    row.root_norm = if norm.is_empty() { None } else { Some(norm) };
    row.binary_root = binary;
    row.binary_root_method = Some(method);
    row.weakless_root = if weakless.is_empty() {
        None
    } else {
        Some(weakless)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lemma_collapses_whitespace() {
        assert_eq!(normalize_lemma("  Foo\t Bar  "), "foo bar");
    }

    #[test]
    fn test_normalize_lemma_idempotent() {
        let samples = ["  Foo\t Bar  ", "Éclair", "رَحْمَة", "a\u{0301}bc"];
        for s in samples {
            let once = normalize_lemma(s);
            assert_eq!(normalize_lemma(&once), once);
        }
    }

    #[test]
    fn test_normalize_root_strips_diacritics_and_folds() {
        // رحمة with a fatha: diacritic stripped, ta marbuta folded to ha.
        assert_eq!(normalize_root("رَحمة"), "رحمه");
        assert_eq!(normalize_root("أكل"), "اكل");
        assert_eq!(normalize_root("هدى"), "هدي");
    }

    #[test]
    fn test_derive_binary_root() {
        let (br, method) = derive_binary_root("رحمه");
        assert_eq!(br.as_deref(), Some("رح"));
        assert_eq!(method, BinaryRootMethod::First2);

        let (br, method) = derive_binary_root("ر");
        assert_eq!(br, None);
        assert_eq!(method, BinaryRootMethod::Missing);

        let (br, method) = derive_binary_root("");
        assert_eq!(br, None);
        assert_eq!(method, BinaryRootMethod::Missing);
    }

    #[test]
    fn test_normalize_ipa_unwraps_and_strips() {
        assert_eq!(normalize_ipa("/ˈæp.əl/"), "æp.əl");
        assert_eq!(normalize_ipa("[ a b ]"), "ab");
        assert_eq!(normalize_ipa(""), "");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<b>word</b> sense"), "word sense");
    }

    #[test]
    fn test_apply_root_fields_missing_root() {
        let mut row = CanonicalRow::new("x", "ara", "test");
        row.root = Some("  ".to_string());
        apply_root_fields(&mut row);
        assert_eq!(row.root, None);
        assert_eq!(row.binary_root_method, None);
    }

    #[test]
    fn test_apply_root_fields_example_scenario() {
        let mut row = CanonicalRow::new("x", "ara", "test");
        row.root = Some("رَحمة".to_string());
        apply_root_fields(&mut row);
        assert_eq!(row.root_norm.as_deref(), Some("رحمه"));
        assert_eq!(row.binary_root.as_deref(), Some("رح"));
        assert_eq!(row.binary_root_method, Some(BinaryRootMethod::First2));
    }
}
