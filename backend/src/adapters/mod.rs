//! Adapter boundary: source-specific readers that turn raw records into
//! pre-ID canonical rows.
//!
//! Adapters are the only components that know raw formats. The core treats
//! them uniformly once rows reach canonical shape: an adapter may reject a
//! record (zero rows), and rejections are counted for QA. In strict mode
//! any rejection aborts that adapter's contribution to the build.

pub mod quran_morphology;
pub mod word_root_map;
pub mod jsonl_source;

use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::types::{CanonicalRow, CoreError};

pub use quran_morphology::QuranMorphologyAdapter;
pub use word_root_map::WordRootMapAdapter;
pub use jsonl_source::JsonlSourceAdapter;

/// One raw record in adapter-neutral shape: a JSON value plus the reference
/// that locates it in the raw source.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub source_ref: String,
    pub value: serde_json::Value,
}

pub trait Adapter {
    /// Source tag stamped on every emitted row, e.g. `quranic-corpus-morphology`.
    fn source_tag(&self) -> &str;

    /// Read raw records from the given location, in a deterministic order.
    fn read(&self, raw_location: &Path) -> Result<Vec<RawRecord>, CoreError>;

    /// Convert one raw record into zero or one pre-ID canonical row.
    /// `Ok(None)` is a counted rejection, not an error.
    fn to_canonical(&self, record: &RawRecord) -> Result<Option<CanonicalRow>, CoreError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterReport {
    pub source_tag: String,
    pub records_read: usize,
    pub rows_emitted: usize,
    pub rejected: usize,
}

/// Drive one adapter over one raw location.
pub fn run_adapter(
    adapter: &dyn Adapter,
    raw_location: &Path,
    strict: bool,
) -> Result<(Vec<CanonicalRow>, AdapterReport), CoreError> {
    let records = adapter.read(raw_location)?;
    let mut report = AdapterReport {
        source_tag: adapter.source_tag().to_string(),
        records_read: records.len(),
        ..Default::default()
    };

    let mut rows: Vec<CanonicalRow> = Vec::with_capacity(records.len());
    for record in &records {
        match adapter.to_canonical(record)? {
            Some(row) => {
                rows.push(row);
                report.rows_emitted += 1;
            }
            None => {
                report.rejected += 1;
                tracing::debug!(
                    "{}: rejected record {}",
                    adapter.source_tag(),
                    record.source_ref
                );
            }
        }
    }

    if strict && report.rejected > 0 {
        return Err(CoreError::StrictRejections {
            adapter: adapter.source_tag().to_string(),
            count: report.rejected,
        });
    }

    Ok((rows, report))
}
