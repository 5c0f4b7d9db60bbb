//! Cross-source row resolution.
//!
//! Rows describing the same logical entity are grouped by
//! `(language, normalized_lemma, root_norm)` and resolved under an explicit
//! source-priority order. The highest-priority source's scalar fields win;
//! lower-priority rows may only fill fields the winner left empty. Every
//! input row ends up recorded as winner, fill-in contributor, or suppressed
//! with a reason. No silent drops.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};

use crate::normalize::normalize_lemma;
use crate::types::{lemma_status_rank, CanonicalRow, FillIn, MergeTrace};

/// Ordered source-priority configuration for one build.
///
/// Lower index means higher priority. Sources not listed rank below all
/// listed ones. The order is fixed per build; changing it is a configuration
/// change, never a runtime choice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergePolicy {
    pub priorities: Vec<String>,
}

impl MergePolicy {
    pub fn new<S: AsRef<str>>(priorities: &[S]) -> Self {
        MergePolicy {
            priorities: priorities.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    pub fn rank(&self, source: &str) -> usize {
        self.priorities
            .iter()
            .position(|s| s == source)
            .unwrap_or(self.priorities.len())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Disposition {
    Winner,
    FillIn { fields: Vec<String> },
    Suppressed { reason: String },
}

/// Per-input-row merge decision, keyed by provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowDecision {
    pub source: String,
    pub source_ref: String,
    pub disposition: Disposition,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub decisions: Vec<RowDecision>,
}

impl MergeReport {
    pub fn suppressed_count(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| matches!(d.disposition, Disposition::Suppressed { .. }))
            .count()
    }

    pub fn fill_in_count(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| matches!(d.disposition, Disposition::FillIn { .. }))
            .count()
    }
}

/// Entity equivalence key. Rows from different languages are never merged;
/// a general language and a restricted sub-variant are distinct values.
pub fn entity_key(row: &CanonicalRow) -> (String, String, String) {
    (
        row.language.clone(),
        normalize_lemma(&row.lemma),
        row.root_norm.clone().unwrap_or_default(),
    )
}

fn has_text(v: &str) -> bool {
    !v.trim().is_empty()
}

/// Fill one optional field, recording its name when the fill happens.
fn fill_opt(
    dst: &mut Option<String>,
    src: &Option<String>,
    name: &str,
    filled: &mut Vec<String>,
) {
    let src_val = match src.as_deref() {
        Some(v) if has_text(v) => v,
        _ => return,
    };
    if dst.as_deref().map(has_text).unwrap_or(false) {
        return;
    }
    *dst = Some(src_val.to_string());
    filled.push(name.to_string());
}

fn fill_string(dst: &mut String, src: &str, name: &str, filled: &mut Vec<String>) {
    if has_text(dst) || !has_text(src) {
        return;
    }
    *dst = src.to_string();
    filled.push(name.to_string());
}

/// Additive merge of one lower-priority candidate into the merged row.
/// Returns the names of the fields the candidate contributed.
fn fill_from(merged: &mut CanonicalRow, cand: &CanonicalRow) -> Vec<String> {
    let mut filled: Vec<String> = Vec::new();

    fill_string(&mut merged.translit, &cand.translit, "translit", &mut filled);
    fill_string(&mut merged.ipa, &cand.ipa, "ipa", &mut filled);
    fill_opt(&mut merged.ipa_raw, &cand.ipa_raw, "ipa_raw", &mut filled);
    fill_opt(&mut merged.script, &cand.script, "script", &mut filled);

    fill_opt(&mut merged.root, &cand.root, "root", &mut filled);
    fill_opt(&mut merged.root_norm, &cand.root_norm, "root_norm", &mut filled);
    if merged.binary_root.is_none() && cand.binary_root.is_some() {
        merged.binary_root = cand.binary_root.clone();
        merged.binary_root_method = cand.binary_root_method;
        filled.push("binary_root".to_string());
    }
    fill_opt(
        &mut merged.weakless_root,
        &cand.weakless_root,
        "weakless_root",
        &mut filled,
    );

    if merged.pos.is_empty() && !cand.pos.is_empty() {
        merged.pos = cand.pos.clone();
        filled.push("pos".to_string());
    }
    fill_opt(&mut merged.pos_tag, &cand.pos_tag, "pos_tag", &mut filled);

    fill_opt(&mut merged.gloss_plain, &cand.gloss_plain, "gloss_plain", &mut filled);
    fill_opt(&mut merged.definition, &cand.definition, "definition", &mut filled);
    fill_opt(
        &mut merged.example_surface,
        &cand.example_surface,
        "example_surface",
        &mut filled,
    );

    // Attestation confidence upgrades independently of source priority.
    if lemma_status_rank(&cand.lemma_status) > lemma_status_rank(&merged.lemma_status) {
        merged.lemma_status = cand.lemma_status.clone();
        filled.push("lemma_status".to_string());
    }

    filled
}

fn record_provenance(merged: &mut CanonicalRow, cand: &CanonicalRow) {
    if has_text(&cand.source) && !merged.sources.contains(&cand.source) {
        merged.sources.push(cand.source.clone());
    }
    for s in &cand.sources {
        if has_text(s) && !merged.sources.contains(s) {
            merged.sources.push(s.clone());
        }
    }
    if has_text(&cand.source_ref) && !merged.source_refs.contains(&cand.source_ref) {
        merged.source_refs.push(cand.source_ref.clone());
    }
    for s in &cand.source_refs {
        if has_text(s) && !merged.source_refs.contains(s) {
            merged.source_refs.push(s.clone());
        }
    }
}

/// Resolve candidate rows into merged rows under the given policy.
///
/// Candidates must all belong to the same build; the barrier of having every
/// contributing adapter finished before merging is the caller's concern.
pub fn merge_rows(
    rows: Vec<CanonicalRow>,
    policy: &MergePolicy,
) -> (Vec<CanonicalRow>, MergeReport) {
    let mut report = MergeReport {
        rows_in: rows.len(),
        ..Default::default()
    };

    // BTreeMap gives a deterministic group order independent of input order.
    let mut groups: BTreeMap<(String, String, String), Vec<(usize, CanonicalRow)>> =
        BTreeMap::new();
    for (ordinal, row) in rows.into_iter().enumerate() {
        groups.entry(entity_key(&row)).or_default().push((ordinal, row));
    }

    let mut out: Vec<CanonicalRow> = Vec::with_capacity(groups.len());

    for (_key, mut group) in groups {
        // Priority first; same-priority ties broken by (source, source_ref),
        // then input ordinal as the final stable key.
        group.sort_by(|(ord_a, a), (ord_b, b)| {
            policy
                .rank(&a.source)
                .cmp(&policy.rank(&b.source))
                .then_with(|| a.source.cmp(&b.source))
                .then_with(|| a.source_ref.cmp(&b.source_ref))
                .then(ord_a.cmp(ord_b))
        });

        let mut iter = group.into_iter();
        let (_, winner) = iter.next().expect("group is never empty");
        let winner_source = winner.source.clone();
        let winner_ref = winner.source_ref.clone();

        let mut merged = winner.clone();
        merged.sources = Vec::new();
        merged.source_refs = Vec::new();
        record_provenance(&mut merged, &winner);

        report.decisions.push(RowDecision {
            source: winner_source.clone(),
            source_ref: winner_ref.clone(),
            disposition: Disposition::Winner,
        });

        let mut fill_ins: Vec<FillIn> = Vec::new();

        for (_, cand) in iter {
            record_provenance(&mut merged, &cand);
            let filled = fill_from(&mut merged, &cand);

            let disposition = if filled.is_empty() {
                let reason = if cand.source == winner_source && cand.source_ref == winner_ref {
                    "exact_duplicate"
                } else {
                    "no_new_fields"
                };
                Disposition::Suppressed {
                    reason: reason.to_string(),
                }
            } else {
                fill_ins.push(FillIn {
                    source: cand.source.clone(),
                    fields: filled.clone(),
                });
                Disposition::FillIn { fields: filled }
            };

            report.decisions.push(RowDecision {
                source: cand.source,
                source_ref: cand.source_ref,
                disposition,
            });
        }

        merged.sources.sort();
        merged.source_refs.sort();
        merged.n_sources = Some(merged.sources.len());
        if merged.n_sources > Some(1) || !fill_ins.is_empty() {
            merged.merged_from = Some(MergeTrace {
                winner: winner_source,
                fill_ins,
            });
        }

        out.push(merged);
    }

    report.rows_out = out.len();
    (out, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(lemma: &str, source: &str, source_ref: &str) -> CanonicalRow {
        let mut r = CanonicalRow::new(lemma, "ara", source);
        r.source_ref = source_ref.to_string();
        r
    }

    #[test]
    fn test_policy_rank() {
        let policy = MergePolicy::new(&["a", "b"]);
        assert_eq!(policy.rank("a"), 0);
        assert_eq!(policy.rank("b"), 1);
        assert_eq!(policy.rank("unknown"), 2);
    }

    #[test]
    fn test_higher_priority_scalar_wins() {
        let policy = MergePolicy::new(&["corpus", "bulk"]);
        let mut a = row("x", "corpus", "a1");
        a.translit = "high".to_string();
        let mut b = row("x", "bulk", "b1");
        b.translit = "low".to_string();

        let (merged, report) = merge_rows(vec![b, a], &policy);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].translit, "high");
        assert_eq!(report.rows_in, 2);
        assert_eq!(report.rows_out, 1);
    }

    #[test]
    fn test_additive_fill_in_example_scenario() {
        // A (priority 1): translit empty, ipa "k".
        // B (priority 2): translit "tr", ipa "k2".
        // Merged: translit "tr" (filled from B), ipa "k" (A wins, non-empty).
        let policy = MergePolicy::new(&["a", "b"]);
        let mut a = row("x", "a", "a1");
        a.ipa = "k".to_string();
        let mut b = row("x", "b", "b1");
        b.translit = "tr".to_string();
        b.ipa = "k2".to_string();

        let (merged, report) = merge_rows(vec![a, b], &policy);
        assert_eq!(merged[0].translit, "tr");
        assert_eq!(merged[0].ipa, "k");

        let trace = merged[0].merged_from.as_ref().unwrap();
        assert_eq!(trace.winner, "a");
        assert_eq!(trace.fill_ins.len(), 1);
        assert_eq!(trace.fill_ins[0].source, "b");
        assert_eq!(trace.fill_ins[0].fields, vec!["translit"]);
        assert_eq!(report.fill_in_count(), 1);
    }

    #[test]
    fn test_same_priority_tie_broken_lexicographically() {
        let policy = MergePolicy::new::<&str>(&[]);
        let mut a = row("x", "src-b", "r1");
        a.translit = "from-b".to_string();
        let mut b = row("x", "src-a", "r1");
        b.translit = "from-a".to_string();

        let (merged, _) = merge_rows(vec![a, b], &policy);
        assert_eq!(merged[0].source, "src-a");
        assert_eq!(merged[0].translit, "from-a");
    }

    #[test]
    fn test_no_silent_drops() {
        let policy = MergePolicy::new(&["a", "b"]);
        let rows = vec![
            row("x", "a", "a1"),
            row("x", "a", "a1"),
            row("x", "b", "b1"),
        ];
        let (merged, report) = merge_rows(rows, &policy);
        assert_eq!(merged.len(), 1);
        assert_eq!(report.decisions.len(), 3);
        assert_eq!(report.suppressed_count(), 2);
        let reasons: Vec<&str> = report
            .decisions
            .iter()
            .filter_map(|d| match &d.disposition {
                Disposition::Suppressed { reason } => Some(reason.as_str()),
                _ => None,
            })
            .collect();
        assert!(reasons.contains(&"exact_duplicate"));
    }

    #[test]
    fn test_distinct_roots_stay_distinct() {
        let policy = MergePolicy::new(&["a"]);
        let mut a = row("x", "a", "a1");
        a.root_norm = Some("كتب".to_string());
        let mut b = row("x", "a", "a2");
        b.root_norm = Some("قرا".to_string());

        let (merged, _) = merge_rows(vec![a, b], &policy);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_languages_never_merged() {
        let policy = MergePolicy::new(&["a"]);
        let mut a = row("x", "a", "a1");
        a.language = "ara".to_string();
        let mut b = row("x", "a", "a2");
        b.language = "ara-qur".to_string();

        let (merged, _) = merge_rows(vec![a, b], &policy);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_lemma_status_best_rank_wins() {
        let policy = MergePolicy::new(&["a", "b"]);
        let mut a = row("x", "a", "a1");
        a.lemma_status = "auto_brut".to_string();
        let mut b = row("x", "b", "b1");
        b.lemma_status = "gold".to_string();

        let (merged, _) = merge_rows(vec![a, b], &policy);
        assert_eq!(merged[0].lemma_status, "gold");
    }

    #[test]
    fn test_n_sources_and_provenance_lists() {
        let policy = MergePolicy::new(&["a", "b"]);
        let mut a = row("x", "a", "a1");
        a.ipa = "k".to_string();
        let mut b = row("x", "b", "b1");
        b.translit = "tr".to_string();

        let (merged, _) = merge_rows(vec![a, b], &policy);
        assert_eq!(merged[0].n_sources, Some(2));
        assert_eq!(merged[0].sources, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            merged[0].source_refs,
            vec!["a1".to_string(), "b1".to_string()]
        );
    }
}
