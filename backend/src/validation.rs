//! Streaming validation of canonical JSONL files.
//!
//! Checks run line-by-line over raw JSON values rather than deserialized
//! rows, so a file with one malformed record still reports every other
//! problem in the same pass. Validation never mutates the input.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::types::CoreError;

/// Fields every canonical row must carry with non-empty text.
pub static REQUIRED_FIELDS: &[&str] = &["id", "lemma", "language", "source", "lemma_status"];

/// Fields that must be present even when empty.
pub static REQUIRED_PRESENT_FIELDS: &[&str] = &["translit", "ipa"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub line: usize,
    pub check: String,
    pub message: String,
}

/// Per-file validation outcome.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileValidation {
    pub file: String,
    pub rows: usize,
    pub issues: Vec<ValidationIssue>,
}

impl FileValidation {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }

    fn push(&mut self, line: usize, check: &str, message: String) {
        self.issues.push(ValidationIssue {
            line,
            check: check.to_string(),
            message,
        });
    }
}

fn str_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(|v| v.as_str())
}

fn has_text_field(value: &Value, field: &str) -> bool {
    str_field(value, field).map(|s| !s.trim().is_empty()).unwrap_or(false)
}

fn check_row(value: &Value, line: usize, report: &mut FileValidation, seen_ids: &mut HashSet<String>) {
    for field in REQUIRED_FIELDS {
        if !has_text_field(value, field) {
            report.push(line, "required_field", format!("'{}' missing or empty", field));
        }
    }
    for field in REQUIRED_PRESENT_FIELDS {
        if value.get(*field).and_then(|v| v.as_str()).is_none() {
            report.push(line, "required_present", format!("'{}' missing", field));
        }
    }

    if let Some(id) = str_field(value, "id") {
        if !id.is_empty() && !seen_ids.insert(id.to_string()) {
            report.push(line, "duplicate_id", format!("id '{}' already seen", id));
        }
    }

    // pos is a list of tags, never a bare string.
    if let Some(pos) = value.get("pos") {
        if !pos.is_array() {
            report.push(line, "pos_shape", "'pos' is not a list".to_string());
        }
    }

    // Normalized IPA carries no wrapping slashes or brackets.
    if let Some(ipa) = str_field(value, "ipa") {
        let t = ipa.trim();
        if (t.starts_with('/') && t.ends_with('/') && t.len() > 1)
            || (t.starts_with('[') && t.ends_with(']'))
        {
            report.push(line, "wrapped_ipa", format!("ipa '{}' still wrapped", t));
        }
    }

    // Arabic rows that carry a normalized root must also carry the binary
    // root derivation (value or an explicit 'missing' method).
    let language = str_field(value, "language").unwrap_or_default();
    if language.to_lowercase().starts_with("ar") && has_text_field(value, "root_norm") {
        let has_binary = has_text_field(value, "binary_root");
        let method = str_field(value, "binary_root_method").unwrap_or_default();
        if !has_binary && method != "missing" {
            report.push(
                line,
                "binary_root",
                "root_norm present without binary_root or 'missing' method".to_string(),
            );
        }
    }
}

/// Validate one canonical JSONL file, streaming.
pub fn validate_file(path: &Path) -> Result<FileValidation, CoreError> {
    let mut report = FileValidation {
        file: path.to_string_lossy().to_string(),
        ..Default::default()
    };

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut seen_ids: HashSet<String> = HashSet::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line_no = line_num + 1;
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        report.rows += 1;

        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                report.push(line_no, "json", e.to_string());
                continue;
            }
        };
        if !value.is_object() {
            report.push(line_no, "json", "line is not a JSON object".to_string());
            continue;
        }
        check_row(&value, line_no, &mut report, &mut seen_ids);
    }

    Ok(report)
}

/// Validate several files; missing files are issues only when required.
pub fn validate_files(paths: &[&Path], require_files: bool) -> Result<Vec<FileValidation>, CoreError> {
    let mut reports: Vec<FileValidation> = Vec::new();
    for path in paths {
        if !path.exists() {
            let mut report = FileValidation {
                file: path.to_string_lossy().to_string(),
                ..Default::default()
            };
            if require_files {
                report.push(0, "missing_file", "file does not exist".to_string());
            }
            reports.push(report);
            continue;
        }
        reports.push(validate_file(path)?);
    }
    Ok(reports)
}
