pub mod adapters;
pub mod identity;
pub mod jsonl;
pub mod logger;
pub mod manifest;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod registry;
pub mod text_fields;
pub mod translit;
pub mod types;
pub mod validation;

/// Canonical row schema version recorded in every manifest.
pub static SCHEMA_VERSION: &str = "lex0.7";
