//! Deterministic embedding-ready text construction.
//!
//! Purely structural: no wall clock, no randomness, no inference. The same
//! input row always yields the same `form_text` / `meaning_text`.

use serde::{Serialize, Deserialize};

use crate::types::CanonicalRow;

/// Separator between tagged segments in `form_text`.
pub static SEGMENT_SEP: &str = " | ";

/// Coverage accounting for meaning_text construction. The fallback flag
/// lives here, out of the row, so degraded rows are auditable without
/// polluting the schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverageReport {
    pub rows: usize,
    pub with_gloss: usize,
    pub fallback: usize,
    pub empty_meaning: usize,
    /// IDs (or source_refs when IDs are not yet assigned) of fallback rows.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_refs: Vec<String>,
}

/// Build `form_text` from the native-script lemma plus tagged
/// transliteration and IPA segments. Gloss text is never included.
///
/// Arabic-family lemmas get an `AR:` script tag; other languages use the
/// bare lemma.
pub fn build_form_text(language: &str, lemma: &str, translit: &str, ipa: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !lemma.is_empty() {
        if language.to_lowercase().starts_with("ar") {
            parts.push(format!("AR: {}", lemma));
        } else {
            parts.push(lemma.to_string());
        }
    }
    if !translit.is_empty() {
        parts.push(format!("TR: {}", translit));
    }
    if !ipa.is_empty() {
        parts.push(format!("IPA: {}", ipa));
    }
    parts.join(SEGMENT_SEP)
}

/// Build `meaning_text`, returning `(text, used_fallback)`.
///
/// Prefers a plain gloss verbatim. When absent but a definition exists, the
/// text becomes `{lemma} — {definition}` and the fallback flag is set for
/// the coverage report. When neither exists, the result is `None`, never
/// the bare lemma, which would silently degrade the signal.
pub fn build_meaning_text(
    gloss_plain: Option<&str>,
    lemma: &str,
    definition: Option<&str>,
) -> (Option<String>, bool) {
    if let Some(gloss) = gloss_plain {
        if !gloss.trim().is_empty() {
            return (Some(gloss.trim().to_string()), false);
        }
    }
    if let Some(def) = definition {
        if !def.trim().is_empty() {
            let base = lemma.trim();
            if !base.is_empty() {
                return (Some(format!("{} — {}", base, def.trim())), true);
            }
            return (Some(def.trim().to_string()), true);
        }
    }
    (None, false)
}

/// Populate `form_text` / `meaning_text` on every row.
pub fn apply_text_fields(rows: &mut [CanonicalRow]) -> CoverageReport {
    let mut report = CoverageReport {
        rows: rows.len(),
        ..Default::default()
    };

    for row in rows.iter_mut() {
        let form = build_form_text(&row.language, &row.lemma, &row.translit, &row.ipa);
        row.form_text = if form.is_empty() { None } else { Some(form) };

        let (meaning, fallback) = build_meaning_text(
            row.gloss_plain.as_deref(),
            &row.lemma,
            row.definition.as_deref(),
        );
        match (&meaning, fallback) {
            (Some(_), false) => report.with_gloss += 1,
            (Some(_), true) => {
                report.fallback += 1;
                let r = if row.id.is_empty() {
                    row.source_ref.clone()
                } else {
                    row.id.clone()
                };
                report.fallback_refs.push(r);
            }
            (None, _) => report.empty_meaning += 1,
        }
        row.meaning_text = meaning;
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_text_arabic_segments() {
        let text = build_form_text("ara-qur", "رحمة", "raḥmah", "raħma");
        assert_eq!(text, "AR: رحمة | TR: raḥmah | IPA: raħma");
    }

    #[test]
    fn test_form_text_skips_empty_segments() {
        assert_eq!(build_form_text("ara", "كتاب", "", ""), "AR: كتاب");
        assert_eq!(build_form_text("eng", "book", "", "bʊk"), "book | IPA: bʊk");
    }

    #[test]
    fn test_meaning_text_prefers_gloss_verbatim() {
        let (m, fallback) = build_meaning_text(Some("mercy; compassion"), "رحمة", Some("def"));
        assert_eq!(m.as_deref(), Some("mercy; compassion"));
        assert!(!fallback);
    }

    #[test]
    fn test_meaning_text_definition_fallback() {
        let (m, fallback) = build_meaning_text(None, "رحمة", Some("divine mercy"));
        assert_eq!(m.as_deref(), Some("رحمة — divine mercy"));
        assert!(fallback);
    }

    #[test]
    fn test_meaning_text_never_bare_lemma() {
        let (m, fallback) = build_meaning_text(None, "رحمة", None);
        assert_eq!(m, None);
        assert!(!fallback);
    }

    #[test]
    fn test_apply_counts_coverage_out_of_row() {
        let mut gloss_row = CanonicalRow::new("a", "eng", "s");
        gloss_row.gloss_plain = Some("sense".to_string());
        let mut fb_row = CanonicalRow::new("b", "eng", "s");
        fb_row.definition = Some("def".to_string());
        fb_row.source_ref = "ref-b".to_string();
        let empty_row = CanonicalRow::new("c", "eng", "s");

        let mut rows = vec![gloss_row, fb_row, empty_row];
        let report = apply_text_fields(&mut rows);

        assert_eq!(report.with_gloss, 1);
        assert_eq!(report.fallback, 1);
        assert_eq!(report.empty_meaning, 1);
        assert_eq!(report.fallback_refs, vec!["ref-b".to_string()]);
        // The flag is not embedded in the row itself.
        assert_eq!(rows[1].meaning_text.as_deref(), Some("b — def"));
        assert_eq!(rows[2].meaning_text, None);
    }

    #[test]
    fn test_builder_is_stable() {
        let a = build_form_text("ara", "كتاب", "kitab", "kitaːb");
        let b = build_form_text("ara", "كتاب", "kitab", "kitaːb");
        assert_eq!(a, b);
    }
}
