//! Adapter for pre-shaped canonical JSONL sources.
//!
//! This is the cross-source merge input format: intermediate datasets that
//! already carry canonical field names but may lack normalization, derived
//! root fields, or a source tag. Malformed JSON lines are counted
//! rejections, not build failures (unless strict mode is on).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::normalize::{apply_root_fields, normalize_ipa, normalize_lemma, strip_html};
use crate::types::{CanonicalRow, CoreError};

use super::{Adapter, RawRecord};

pub struct JsonlSourceAdapter {
    pub source_tag: String,
    /// Applied when a row carries no language of its own.
    pub default_language: String,
    pub default_stage: String,
}

impl JsonlSourceAdapter {
    pub fn new(source_tag: &str, default_language: &str, default_stage: &str) -> Self {
        JsonlSourceAdapter {
            source_tag: source_tag.to_string(),
            default_language: default_language.to_string(),
            default_stage: default_stage.to_string(),
        }
    }
}

impl Adapter for JsonlSourceAdapter {
    fn source_tag(&self) -> &str {
        &self.source_tag
    }

    fn read(&self, raw_location: &Path) -> Result<Vec<RawRecord>, CoreError> {
        let file = File::open(raw_location)?;
        let reader = BufReader::new(file);

        let mut records: Vec<RawRecord> = Vec::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let value = match serde_json::from_str(line) {
                Ok(v) => v,
                // Keep the malformed line as a null record so the rejection
                // is countable downstream.
                Err(_) => serde_json::Value::Null,
            };
            records.push(RawRecord {
                source_ref: format!("line:{}", line_num + 1),
                value,
            });
        }
        Ok(records)
    }

    fn to_canonical(&self, record: &RawRecord) -> Result<Option<CanonicalRow>, CoreError> {
        if record.value.is_null() {
            return Ok(None);
        }
        let mut row: CanonicalRow = match serde_json::from_value(record.value.clone()) {
            Ok(r) => r,
            Err(_) => return Ok(None),
        };

        row.lemma = normalize_lemma(&row.lemma);
        if row.lemma.is_empty() {
            return Ok(None);
        }
        if row.language.trim().is_empty() {
            row.language = self.default_language.clone();
        }
        if row.stage.trim().is_empty() {
            row.stage = self.default_stage.clone();
        }
        if row.source.trim().is_empty() {
            row.source = self.source_tag.clone();
        }
        if row.lemma_status.trim().is_empty() {
            row.lemma_status = "auto_brut".to_string();
        }
        if row.source_ref.is_empty() {
            row.source_ref = record.source_ref.clone();
        }
        // Dictionary exports often carry markup in gloss text.
        if let Some(gloss) = row.gloss_plain.as_deref() {
            let cleaned = strip_html(gloss);
            row.gloss_plain = if cleaned.is_empty() { None } else { Some(cleaned) };
        }
        if let Some(def) = row.definition.as_deref() {
            let cleaned = strip_html(def);
            row.definition = if cleaned.is_empty() { None } else { Some(cleaned) };
        }
        if let Some(raw) = row.ipa_raw.clone() {
            row.ipa = normalize_ipa(&raw);
        } else if !row.ipa.is_empty() {
            row.ipa_raw = Some(row.ipa.clone());
            row.ipa = normalize_ipa(&row.ipa);
        }
        apply_root_fields(&mut row);

        // Identity is assigned after merging; stray pre-existing ids would
        // defeat write-time uniqueness enforcement.
        row.id = String::new();

        Ok(Some(row))
    }
}
