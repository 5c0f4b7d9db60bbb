//! Per-output-file provenance and integrity descriptors.
//!
//! A manifest records the exact byte content of one canonical file (row
//! order included) via sha256. Manifests are written all-or-nothing: the
//! payload goes to a temp file and is renamed into place, so an interrupted
//! build never leaves a manifest describing bytes that were not fully
//! written.

use std::fmt::Write as FmtWrite;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::Utc;
use serde::{Serialize, Deserialize};
use sha2::{Digest, Sha256};

use crate::jsonl::count_rows;
use crate::types::CoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub file: String,
    pub sha256: String,
    pub row_count: usize,
    pub schema_version: String,
    pub generated_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
    pub timestamp_utc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_policy: Option<String>,
}

/// Streamed sha256 of a file's exact bytes, as lowercase hex.
pub fn sha256_file(path: &Path) -> Result<String, CoreError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        let _ = write!(hex, "{:02x}", byte);
    }
    Ok(hex)
}

/// Sidecar manifest path convention: `<data>.manifest.json`.
pub fn manifest_path_for(data_path: &Path) -> PathBuf {
    let mut name = data_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    name.push_str(".manifest.json");
    data_path.with_file_name(name)
}

/// Best-effort current git commit; None outside a repository.
pub fn git_commit() -> Option<String> {
    let out = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let commit = String::from_utf8_lossy(&out.stdout).trim().to_string();
    if commit.is_empty() { None } else { Some(commit) }
}

/// Hash the target file and write its manifest sidecar atomically.
pub fn write_manifest(
    target: &Path,
    manifest_path: &Path,
    schema_version: &str,
    generated_by: &str,
    id_policy: Option<&str>,
) -> Result<Manifest, CoreError> {
    let sha256 = sha256_file(target)?;
    let row_count = count_rows(target)?;

    let manifest = Manifest {
        file: target.to_string_lossy().to_string(),
        sha256,
        row_count,
        schema_version: schema_version.to_string(),
        generated_by: generated_by.to_string(),
        git_commit: git_commit(),
        timestamp_utc: Utc::now().to_rfc3339(),
        id_policy: id_policy.map(|s| s.to_string()),
    };

    if let Some(parent) = manifest_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = manifest_path.with_extension("json.tmp");
    fs::write(&tmp_path, serde_json::to_string_pretty(&manifest)?)?;
    fs::rename(&tmp_path, manifest_path)?;

    Ok(manifest)
}

pub fn read_manifest(manifest_path: &Path) -> Result<Manifest, CoreError> {
    let text = fs::read_to_string(manifest_path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Re-hash the data file a manifest describes and compare. A mismatch is a
/// fatal integrity failure, never swallowed.
pub fn verify_manifest(manifest_path: &Path) -> Result<Manifest, CoreError> {
    let manifest = read_manifest(manifest_path)?;
    let actual = sha256_file(Path::new(&manifest.file))?;
    if actual != manifest.sha256 {
        return Err(CoreError::HashMismatch {
            file: manifest.file.clone(),
            expected: manifest.sha256.clone(),
            actual,
        });
    }
    Ok(manifest)
}
