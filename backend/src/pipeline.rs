//! Build orchestration: adapters -> merge -> identity -> text fields ->
//! canonical JSONL + manifest + registry.
//!
//! A build either completes and commits its manifest and registry update,
//! or fails and commits nothing. Merging only starts once every adapter for
//! the build has finished (or failed the whole build in strict mode), which
//! is the synchronization barrier the merger requires.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use crate::adapters::{run_adapter, Adapter, AdapterReport};
use crate::identity::{assign_ids, IdReport, ID_POLICY};
use crate::jsonl::write_rows_unique;
use crate::manifest::{manifest_path_for, write_manifest, Manifest};
use crate::merge::{merge_rows, MergePolicy, MergeReport};
use crate::registry::{RegistryEntry, RegistryStore};
use crate::text_fields::{apply_text_fields, CoverageReport};
use crate::types::{CanonicalRow, DatasetKey};
use crate::SCHEMA_VERSION;

lazy_static! {
    // Builds targeting the same output path must not interleave; one lock
    // for all builds in this process keeps the manifest/bytes invariant.
    static ref OUTPUT_WRITE_LOCK: Mutex<()> = Mutex::new(());
}

pub struct BuildConfig {
    pub dataset: DatasetKey,
    pub output_path: PathBuf,
    /// Defaults to `<output>.manifest.json`.
    pub manifest_path: Option<PathBuf>,
    /// No registry update when absent.
    pub registry_path: Option<PathBuf>,
    pub policy: MergePolicy,
    pub strict: bool,
    pub generated_by: String,
    pub schema_version: String,
}

impl BuildConfig {
    pub fn new(dataset: DatasetKey, output_path: &Path) -> Self {
        BuildConfig {
            dataset,
            output_path: output_path.to_path_buf(),
            manifest_path: None,
            registry_path: None,
            policy: MergePolicy::default(),
            strict: false,
            generated_by: "lexicore".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub adapters: Vec<AdapterReport>,
    pub merge: MergeReport,
    pub identity: IdReport,
    pub coverage: CoverageReport,
    pub manifest: Manifest,
    pub registry_key: Option<String>,
}

/// Run one build over the given `(adapter, raw_location)` pairs.
pub fn run_build(
    adapters: &[(&dyn Adapter, &Path)],
    config: &BuildConfig,
) -> Result<BuildReport> {
    // Barrier: collect every adapter's rows before any merging.
    let mut rows: Vec<CanonicalRow> = Vec::new();
    let mut adapter_reports: Vec<AdapterReport> = Vec::new();
    for (adapter, raw_location) in adapters {
        let (adapter_rows, report) = run_adapter(*adapter, raw_location, config.strict)
            .with_context(|| {
                format!(
                    "adapter '{}' failed on {}",
                    adapter.source_tag(),
                    raw_location.display()
                )
            })?;
        info!(
            "{}: read {} records, emitted {} rows, rejected {}",
            report.source_tag, report.records_read, report.rows_emitted, report.rejected
        );
        rows.extend(adapter_rows);
        adapter_reports.push(report);
    }

    let (mut merged, merge_report) = merge_rows(rows, &config.policy);
    info!(
        "merge: {} rows in, {} rows out, {} fill-ins, {} suppressed",
        merge_report.rows_in,
        merge_report.rows_out,
        merge_report.fill_in_count(),
        merge_report.suppressed_count()
    );

    let id_report = assign_ids(&mut merged).context("id assignment failed")?;
    if config.strict && !id_report.rejected.is_empty() {
        anyhow::bail!(
            "{} rows rejected during id assignment in strict mode",
            id_report.rejected.len()
        );
    }

    let coverage = apply_text_fields(&mut merged);

    // Canonical embedding-alignment order: ascending by id.
    merged.sort_by(|a, b| a.id.cmp(&b.id));

    let manifest_path = config
        .manifest_path
        .clone()
        .unwrap_or_else(|| manifest_path_for(&config.output_path));

    let id_policy = format!(
        "{}; collision_groups={}; max_disambiguator={}",
        ID_POLICY, id_report.collision_groups, id_report.max_disambiguator
    );

    let _lock = OUTPUT_WRITE_LOCK.lock();

    write_rows_unique(&config.output_path, &merged)
        .with_context(|| format!("writing {}", config.output_path.display()))?;

    let manifest = write_manifest(
        &config.output_path,
        &manifest_path,
        &config.schema_version,
        &config.generated_by,
        Some(&id_policy),
    )
    .with_context(|| format!("writing manifest {}", manifest_path.display()))?;

    let registry_key = match &config.registry_path {
        Some(registry_path) => {
            let mut store = RegistryStore::load(registry_path)
                .with_context(|| format!("loading registry {}", registry_path.display()))?;
            store.upsert(
                &config.dataset,
                RegistryEntry::from_manifest(&manifest, &manifest_path),
            );
            store
                .commit()
                .with_context(|| format!("committing registry {}", registry_path.display()))?;
            Some(config.dataset.registry_key())
        }
        None => None,
    };

    info!(
        "build complete: {} rows -> {} (sha256 {})",
        manifest.row_count,
        config.output_path.display(),
        manifest.sha256
    );

    Ok(BuildReport {
        adapters: adapter_reports,
        merge: merge_report,
        identity: id_report,
        coverage,
        manifest,
        registry_key,
    })
}
