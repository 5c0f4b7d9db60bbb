//! Newline-delimited JSON reading and writing for canonical row files.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::types::{CanonicalRow, CoreError};

/// Read canonical rows from a JSONL file, skipping blank lines.
pub fn read_rows(path: &Path) -> Result<Vec<CanonicalRow>, CoreError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut rows: Vec<CanonicalRow> = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row: CanonicalRow =
            serde_json::from_str(line).map_err(|e| CoreError::MalformedRecord {
                context: format!("{}:{}", path.display(), line_num + 1),
                message: e.to_string(),
            })?;
        rows.push(row);
    }
    Ok(rows)
}

/// Count non-blank lines in a JSONL file.
pub fn count_rows(path: &Path) -> Result<usize, CoreError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut total = 0;
    for line in reader.lines() {
        if !line?.trim().is_empty() {
            total += 1;
        }
    }
    Ok(total)
}

/// Write rows as UTF-8 JSONL, enforcing id uniqueness at write time.
///
/// The file is written to a `.tmp` sibling and renamed into place, so a
/// failed write never leaves a truncated canonical file behind. Row order
/// is preserved exactly as given; the byte content is what manifests hash.
pub fn write_rows_unique(path: &Path, rows: &[CanonicalRow]) -> Result<(), CoreError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(rows.len());
    for row in rows {
        if !row.id.is_empty() && !seen.insert(row.id.as_str()) {
            return Err(CoreError::DuplicateId(row.id.clone()));
        }
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("jsonl.tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        for row in rows {
            serde_json::to_writer(&mut writer, row)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_roundtrip_and_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");

        let mut a = CanonicalRow::new("alpha", "eng", "s");
        a.id = "id-a".to_string();
        let mut b = CanonicalRow::new("beta", "eng", "s");
        b.id = "id-b".to_string();

        write_rows_unique(&path, &[a.clone(), b.clone()]).unwrap();
        assert_eq!(count_rows(&path).unwrap(), 2);
        let rows = read_rows(&path).unwrap();
        assert_eq!(rows, vec![a, b]);
    }

    #[test]
    fn test_duplicate_id_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");

        let mut a = CanonicalRow::new("alpha", "eng", "s");
        a.id = "same".to_string();
        let mut b = CanonicalRow::new("beta", "eng", "s");
        b.id = "same".to_string();

        let err = write_rows_unique(&path, &[a, b]).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateId(_)));
        // Nothing committed.
        assert!(!path.exists());
    }
}
