//! Dataset registry: maps `(language, stage, source)` keys to the latest
//! manifest reference for that dataset.
//!
//! Lifecycle: created empty, updated additively on successful builds only.
//! Updates are read-modify-replace with an atomic rename; if the registry
//! file changed on disk between load and commit the update is rejected with
//! a conflict error rather than half-written.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use serde::{Serialize, Deserialize};

use crate::manifest::{sha256_file, Manifest};
use crate::types::{CoreError, DatasetKey};

lazy_static! {
    // Serializes registry commits within this process.
    static ref REGISTRY_WRITE_LOCK: Mutex<()> = Mutex::new(());
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub file: String,
    pub manifest: String,
    pub sha256: String,
    pub row_count: usize,
    pub schema_version: String,
    pub updated_utc: String,
}

impl RegistryEntry {
    pub fn from_manifest(manifest: &Manifest, manifest_path: &Path) -> Self {
        RegistryEntry {
            file: manifest.file.clone(),
            manifest: manifest_path.to_string_lossy().to_string(),
            sha256: manifest.sha256.clone(),
            row_count: manifest.row_count,
            schema_version: manifest.schema_version.clone(),
            updated_utc: Utc::now().to_rfc3339(),
        }
    }
}

/// In-memory view of the registry file, remembering the on-disk state it
/// was loaded from so concurrent modification can be detected at commit.
#[derive(Debug)]
pub struct RegistryStore {
    path: PathBuf,
    loaded_sha: Option<String>,
    entries: BTreeMap<String, RegistryEntry>,
}

impl RegistryStore {
    /// Load the registry, treating a missing file as empty.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Ok(RegistryStore {
                path: path.to_path_buf(),
                loaded_sha: None,
                entries: BTreeMap::new(),
            });
        }
        let loaded_sha = Some(sha256_file(path)?);
        let text = fs::read_to_string(path)?;
        let entries: BTreeMap<String, RegistryEntry> = serde_json::from_str(&text)?;
        Ok(RegistryStore {
            path: path.to_path_buf(),
            loaded_sha,
            entries,
        })
    }

    pub fn get(&self, key: &DatasetKey) -> Option<&RegistryEntry> {
        self.entries.get(&key.registry_key())
    }

    pub fn entries(&self) -> &BTreeMap<String, RegistryEntry> {
        &self.entries
    }

    pub fn upsert(&mut self, key: &DatasetKey, entry: RegistryEntry) {
        self.entries.insert(key.registry_key(), entry);
    }

    /// Atomically replace the registry file with the in-memory state.
    ///
    /// Fails with `RegistryConflict` if the file changed on disk since this
    /// store was loaded; the caller must reload and retry.
    pub fn commit(&mut self) -> Result<(), CoreError> {
        let _lock = REGISTRY_WRITE_LOCK.lock();

        let current_sha = if self.path.exists() {
            Some(sha256_file(&self.path)?)
        } else {
            None
        };
        if current_sha != self.loaded_sha {
            return Err(CoreError::RegistryConflict(
                self.path.to_string_lossy().to_string(),
            ));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(&self.entries)?)?;
        fs::rename(&tmp_path, &self.path)?;

        self.loaded_sha = Some(sha256_file(&self.path)?);
        Ok(())
    }
}
