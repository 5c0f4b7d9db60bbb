use std::fmt;

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Attestation confidence ranking used when merging `lemma_status` values.
/// Higher rank wins regardless of source priority.
pub fn lemma_status_rank(status: &str) -> u8 {
    match status.trim() {
        "gold" => 4,
        "silver" => 3,
        "auto" => 2,
        "auto_brut" => 1,
        _ => 0,
    }
}

/// How (or whether) `binary_root` was derived from `root_norm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryRootMethod {
    /// First two characters of the normalized root.
    #[serde(rename = "first2")]
    First2,
    /// The normalized root was too short to derive a binary root.
    #[serde(rename = "missing")]
    Missing,
}

impl fmt::Display for BinaryRootMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryRootMethod::First2 => write!(f, "first2"),
            BinaryRootMethod::Missing => write!(f, "missing"),
        }
    }
}

/// Which lower-priority sources contributed fields after the merge winner
/// was chosen. Recorded on the merged row so every output field is traceable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeTrace {
    /// Source tag of the row whose scalar fields won.
    pub winner: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fill_ins: Vec<FillIn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillIn {
    pub source: String,
    pub fields: Vec<String>,
}

/// One normalized, schema-conformant record representing a lexeme.
///
/// `id` is assigned by the identity module after merging; adapters emit
/// pre-ID rows with `id` empty. Required string fields are always present;
/// `translit` and `ipa` exist on every row but may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRow {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub lemma: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    pub source: String,
    pub lemma_status: String,
    #[serde(default)]
    pub translit: String,
    #[serde(default)]
    pub ipa: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipa_raw: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pos: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_tag: Option<String>,

    // Root-derived fields (Arabic family). `root_norm` and `binary_root`
    // are present only when derivable; `binary_root_method` makes absence
    // explicit rather than an empty string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_norm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_root_method: Option<BinaryRootMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weakless_root: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gloss_plain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_surface: Option<String>,

    // Provenance.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_ref: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_sources: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_from: Option<MergeTrace>,

    // Embedding-ready text, built by the text_fields module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meaning_text: Option<String>,
}

impl CanonicalRow {
    pub fn new(lemma: &str, language: &str, source: &str) -> Self {
        CanonicalRow {
            lemma: lemma.to_string(),
            language: language.to_string(),
            source: source.to_string(),
            lemma_status: "auto_brut".to_string(),
            ..Default::default()
        }
    }
}

/// Identifies one logical dataset in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetKey {
    pub language: String,
    #[serde(default)]
    pub stage: String,
    pub source: String,
}

impl DatasetKey {
    pub fn new(language: &str, stage: &str, source: &str) -> Self {
        DatasetKey {
            language: language.to_string(),
            stage: stage.to_string(),
            source: source.to_string(),
        }
    }

    /// Registry key string, e.g. `ara:classical:lexemes`.
    pub fn registry_key(&self) -> String {
        format!("{}:{}:{}", self.language, self.stage, self.source)
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("duplicate id after assignment: {0}")]
    DuplicateId(String),

    #[error("manifest hash mismatch for {file}: manifest has {expected}, file is {actual}")]
    HashMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("registry at {0} changed on disk since it was loaded")]
    RegistryConflict(String),

    #[error("adapter '{adapter}' rejected {count} records in strict mode")]
    StrictRejections { adapter: String, count: usize },

    #[error("malformed record ({context}): {message}")]
    MalformedRecord { context: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
