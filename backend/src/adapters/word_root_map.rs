//! Adapter for two-column word/root map tables.
//!
//! Accepts `word,root` or `word<TAB>root` lines; a header line naming the
//! columns is skipped. Rows without a word are rejected; a missing root is
//! allowed and leaves the root-derived fields absent.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::json;

use crate::normalize::{apply_root_fields, normalize_lemma};
use crate::types::{CanonicalRow, CoreError};

use super::{Adapter, RawRecord};

pub struct WordRootMapAdapter {
    pub language: String,
    pub stage: String,
    pub source_tag: String,
}

impl Default for WordRootMapAdapter {
    fn default() -> Self {
        WordRootMapAdapter {
            language: "ara".to_string(),
            stage: "classical".to_string(),
            source_tag: "word-root-map".to_string(),
        }
    }
}

fn split_columns(line: &str) -> Option<(&str, &str)> {
    if let Some((w, r)) = line.split_once('\t') {
        return Some((w.trim(), r.trim()));
    }
    if let Some((w, r)) = line.split_once(',') {
        return Some((w.trim(), r.trim()));
    }
    Some((line.trim(), ""))
}

impl Adapter for WordRootMapAdapter {
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
            let (word, root) = match split_columns(line) {
                Some(cols) => cols,
                None => continue,
            };
            // Header line.
            if line_num == 0 && word.eq_ignore_ascii_case("word") {
                continue;
            }
            records.push(RawRecord {
                source_ref: format!("line:{}", line_num + 1),
                value: json!({ "word": word, "root": root }),
            });
        }
        Ok(records)
    }

    fn to_canonical(&self, record: &RawRecord) -> Result<Option<CanonicalRow>, CoreError> {
        let word = record.value["word"].as_str().unwrap_or_default();
        let lemma = normalize_lemma(word);
        if lemma.is_empty() {
            return Ok(None);
        }

        let mut row = CanonicalRow::new(&lemma, &self.language, &self.source_tag);
        row.stage = self.stage.clone();
        row.script = Some("Arabic".to_string());
        row.source_ref = record.source_ref.clone();

        let root = record.value["root"].as_str().unwrap_or_default();
        if !root.is_empty() {
            row.root = Some(root.to_string());
        }
        apply_root_fields(&mut row);

        Ok(Some(row))
    }
}
