//! Adapter for the Quranic corpus morphology table.
//!
//! Raw format: tab-separated lines
//! `ref<TAB>surface<TAB>pos_tag<TAB>FEAT|LEM:...|ROOT:...`
//! Rows are de-duplicated by `(lemma, root)` at read time, keeping the
//! first occurrence, so repeated surface forms of the same lexeme collapse
//! deterministically.

use std::collections::HashMap;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::json;

use crate::normalize::{apply_root_fields, normalize_ipa, normalize_lemma};
use crate::translit::arabic_translit_ipa;
use crate::types::{CanonicalRow, CoreError};

use super::{Adapter, RawRecord};

pub struct QuranMorphologyAdapter {
    pub language: String,
    pub stage: String,
    pub source_tag: String,
}

impl Default for QuranMorphologyAdapter {
    fn default() -> Self {
        QuranMorphologyAdapter {
            language: "ara-qur".to_string(),
            stage: "quranic".to_string(),
            source_tag: "quranic-corpus-morphology".to_string(),
        }
    }
}

fn parse_features(feat_str: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for part in feat_str.split('|') {
        match part.split_once(':') {
            Some((k, v)) => {
                out.insert(k.to_string(), v.to_string());
            }
            None => {
                out.insert(part.to_string(), String::new());
            }
        }
    }
    out
}

impl Adapter for QuranMorphologyAdapter {
    fn source_tag(&self) -> &str {
        &self.source_tag
    }

    fn read(&self, raw_location: &Path) -> Result<Vec<RawRecord>, CoreError> {
        let file = File::open(raw_location)?;
        let reader = BufReader::new(file);

        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut records: Vec<RawRecord> = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.splitn(4, '\t').collect();
            if parts.len() < 4 {
                // Malformed line: kept as a null record so the rejection is
                // countable downstream instead of vanishing at read time.
                records.push(RawRecord {
                    source_ref: format!("line:{}", line_num + 1),
                    value: serde_json::Value::Null,
                });
                continue;
            }
            let (loc_ref, surface, pos_tag, feats) =
                (parts[0], parts[1].trim(), parts[2], parts[3]);

            let feat_map = parse_features(feats);
            let lemma = feat_map
                .get("LEM")
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .unwrap_or(surface)
                .to_string();
            if lemma.is_empty() {
                records.push(RawRecord {
                    source_ref: loc_ref.to_string(),
                    value: serde_json::Value::Null,
                });
                continue;
            }
            let root = feat_map
                .get("ROOT")
                .map(|s| s.trim().to_string())
                .unwrap_or_default();

            if !seen.insert((lemma.clone(), root.clone())) {
                continue;
            }

            records.push(RawRecord {
                source_ref: loc_ref.to_string(),
                value: json!({
                    "lemma": lemma,
                    "root": root,
                    "pos_tag": pos_tag,
                    "example_surface": surface,
                }),
            });
        }

        Ok(records)
    }

    fn to_canonical(&self, record: &RawRecord) -> Result<Option<CanonicalRow>, CoreError> {
        if record.value.is_null() {
            return Ok(None);
        }
        let lemma_raw = record.value["lemma"].as_str().unwrap_or_default();
        let lemma = normalize_lemma(lemma_raw);
        if lemma.is_empty() {
            return Ok(None);
        }

        let mut row = CanonicalRow::new(&lemma, &self.language, &self.source_tag);
        row.stage = self.stage.clone();
        row.script = Some("Arabic".to_string());
        row.lemma_status = "silver".to_string();
        row.source_ref = record.source_ref.clone();

        let root = record.value["root"].as_str().unwrap_or_default();
        if !root.is_empty() {
            row.root = Some(root.to_string());
        }
        apply_root_fields(&mut row);

        if let Some(pos_tag) = record.value["pos_tag"].as_str() {
            if !pos_tag.is_empty() {
                row.pos = vec![pos_tag.to_string()];
                row.pos_tag = Some(pos_tag.to_string());
            }
        }
        if let Some(surface) = record.value["example_surface"].as_str() {
            if !surface.is_empty() {
                row.example_surface = Some(surface.to_string());
            }
        }

        // Deterministic character-level enrichment from the lemma itself.
        let (translit, ipa_raw) = arabic_translit_ipa(lemma_raw);
        row.translit = translit;
        row.ipa = normalize_ipa(&ipa_raw);
        if !ipa_raw.is_empty() {
            row.ipa_raw = Some(ipa_raw);
        }

        Ok(Some(row))
    }
}
