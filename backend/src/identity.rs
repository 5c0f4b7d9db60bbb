//! Deterministic row identity.
//!
//! Canonical ID shape:
//! `{language}:{stage}:{source}:{normalized_lemma}:{pos_joined}:{disambiguator}`
//!
//! The disambiguator is always present (baseline 0) so the shape is uniform.
//! When several rows collide on every preceding component, they are ordered
//! by `(source_ref, input ordinal)` and numbered in that order, so the same
//! input always yields the same assignment across runs.

use std::collections::BTreeMap;
use std::collections::HashSet;

use serde::{Serialize, Deserialize};

use crate::normalize::normalize_lemma;
use crate::types::{CanonicalRow, CoreError};

/// Separator for joining part-of-speech tags inside an ID.
pub static POS_JOIN_SEP: &str = "+";

/// Human-readable description of the ID policy, recorded in manifests.
pub static ID_POLICY: &str = "id = language:stage:source:lemma:pos_joined:disambiguator; \
colliding rows ordered by (source_ref, input ordinal)";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedRow {
    pub source: String,
    pub source_ref: String,
    pub reason: String,
}

/// Outcome of an ID assignment pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdReport {
    pub assigned: usize,
    pub collision_groups: usize,
    pub max_disambiguator: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedRow>,
}

/// POS tags joined with the fixed separator, in their given order.
pub fn pos_joined(pos: &[String]) -> String {
    pos.join(POS_JOIN_SEP)
}

/// All ID components except the disambiguator.
pub fn id_base(row: &CanonicalRow) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        row.language,
        row.stage,
        row.source,
        normalize_lemma(&row.lemma),
        pos_joined(&row.pos),
    )
}

/// Assign deterministic IDs to every row in place.
///
/// Rows whose lemma is empty after normalization are removed from the vector
/// and reported in `IdReport::rejected`; they never receive an ID. A
/// duplicate ID after assignment is a logic bug and returns a fatal error.
pub fn assign_ids(rows: &mut Vec<CanonicalRow>) -> Result<IdReport, CoreError> {
    let mut report = IdReport::default();

    // Reject rows with no usable lemma before grouping.
    let mut kept: Vec<CanonicalRow> = Vec::with_capacity(rows.len());
    for row in rows.drain(..) {
        if normalize_lemma(&row.lemma).is_empty() {
            report.rejected.push(RejectedRow {
                source: row.source.clone(),
                source_ref: row.source_ref.clone(),
                reason: "empty_lemma_after_normalization".to_string(),
            });
        } else {
            kept.push(row);
        }
    }

    // Group by the ID base, remembering each row's input ordinal.
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (ordinal, row) in kept.iter().enumerate() {
        groups.entry(id_base(row)).or_default().push(ordinal);
    }

    for (base, mut ordinals) in groups {
        if ordinals.len() > 1 {
            report.collision_groups += 1;
            // Fixed total order: source_ref first, then input ordinal.
            ordinals.sort_by(|a, b| {
                kept[*a]
                    .source_ref
                    .cmp(&kept[*b].source_ref)
                    .then(a.cmp(b))
            });
        }
        for (n, ordinal) in ordinals.iter().enumerate() {
            kept[*ordinal].id = format!("{}:{}", base, n);
            report.max_disambiguator = report.max_disambiguator.max(n as u32);
        }
    }

    // Post-assignment uniqueness is an invariant, not an assumption.
    let mut seen: HashSet<&str> = HashSet::with_capacity(kept.len());
    for row in &kept {
        if !seen.insert(row.id.as_str()) {
            return Err(CoreError::DuplicateId(row.id.clone()));
        }
    }

    report.assigned = kept.len();
    *rows = kept;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(lemma: &str, source_ref: &str) -> CanonicalRow {
        let mut r = CanonicalRow::new(lemma, "ara", "test-src");
        r.stage = "classical".to_string();
        r.source_ref = source_ref.to_string();
        r
    }

    #[test]
    fn test_pos_joined() {
        assert_eq!(pos_joined(&[]), "");
        assert_eq!(
            pos_joined(&["N".to_string(), "V".to_string()]),
            "N+V"
        );
    }

    #[test]
    fn test_single_row_gets_baseline_disambiguator() {
        let mut rows = vec![row("kitab", "r1")];
        let report = assign_ids(&mut rows).unwrap();
        assert_eq!(report.assigned, 1);
        assert_eq!(report.collision_groups, 0);
        assert_eq!(rows[0].id, "ara:classical:test-src:kitab::0");
    }

    #[test]
    fn test_collisions_numbered_by_source_ref_order() {
        let mut rows = vec![row("kitab", "r2"), row("kitab", "r1")];
        let report = assign_ids(&mut rows).unwrap();
        assert_eq!(report.collision_groups, 1);
        assert_eq!(report.max_disambiguator, 1);
        // r1 sorts before r2, so the row that arrived second gets :0.
        let by_ref: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.source_ref.as_str(), r.id.as_str()))
            .collect();
        assert!(by_ref.contains(&("r1", "ara:classical:test-src:kitab::0")));
        assert!(by_ref.contains(&("r2", "ara:classical:test-src:kitab::1")));
    }

    #[test]
    fn test_collision_assignment_is_reproducible() {
        let mut a = vec![row("x", "r1"), row("x", "r1"), row("x", "r2")];
        let mut b = vec![row("x", "r1"), row("x", "r1"), row("x", "r2")];
        assign_ids(&mut a).unwrap();
        assign_ids(&mut b).unwrap();
        let ids_a: Vec<&str> = a.iter().map(|r| r.id.as_str()).collect();
        let ids_b: Vec<&str> = b.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_empty_lemma_rejected_not_assigned() {
        let mut rows = vec![row("  ", "r1"), row("kitab", "r2")];
        let report = assign_ids(&mut rows).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].reason, "empty_lemma_after_normalization");
    }

    #[test]
    fn test_ids_pairwise_distinct() {
        let mut rows: Vec<CanonicalRow> = (0..50)
            .map(|i| row("kalima", &format!("r{:02}", i % 7)))
            .collect();
        assign_ids(&mut rows).unwrap();
        let mut ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), rows.len());
    }
}
