use std::path::{Path, PathBuf};
use std::process::exit;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use anyhow::{anyhow, Result};

use lexicore_backend::adapters::{
    Adapter, JsonlSourceAdapter, QuranMorphologyAdapter, WordRootMapAdapter,
};
use lexicore_backend::jsonl::read_rows;
use lexicore_backend::logger::init_tracing;
use lexicore_backend::manifest::{manifest_path_for, verify_manifest, write_manifest};
use lexicore_backend::merge::MergePolicy;
use lexicore_backend::pipeline::{run_build, BuildConfig};
use lexicore_backend::registry::RegistryStore;
use lexicore_backend::text_fields::apply_text_fields;
use lexicore_backend::types::DatasetKey;
use lexicore_backend::validation::validate_files;
use lexicore_backend::SCHEMA_VERSION;

#[derive(Parser, Debug)]
#[command(author, version, about = "Lexicore CLI", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Optional path to the dataset registry file.
    /// If not provided, the LEXICORE_REGISTRY environment variable is used.
    #[arg(long, global = true, value_name = "FILE_PATH", env = "LEXICORE_REGISTRY")]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest raw sources, merge them, and write a canonical dataset
    #[command(arg_required_else_help = true)]
    Ingest {
        /// Quranic corpus morphology table (tab-separated)
        #[arg(long, value_name = "FILE_PATH")]
        quran_morphology: Option<PathBuf>,

        /// Two-column word/root map (CSV or TSV)
        #[arg(long, value_name = "FILE_PATH")]
        word_root_map: Option<PathBuf>,

        /// Pre-shaped canonical JSONL source, as TAG=PATH (repeatable)
        #[arg(long, value_name = "TAG=PATH")]
        jsonl_source: Vec<String>,

        /// Canonical JSONL output path
        #[arg(long, value_name = "FILE_PATH")]
        output: PathBuf,

        /// Dataset language for the registry key
        #[arg(long, default_value = "ara")]
        language: String,

        /// Dataset stage for the registry key
        #[arg(long, default_value = "classical")]
        stage: String,

        /// Dataset source label for the registry key
        #[arg(long, default_value = "merged")]
        source: String,

        /// Source priority order for the merge, highest first (repeatable)
        #[arg(long, value_name = "SOURCE_TAG")]
        priority: Vec<String>,

        /// Fail the build on any adapter rejection
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Validate canonical JSONL files
    #[command(arg_required_else_help = true)]
    Validate {
        /// Files to validate
        #[arg(value_name = "FILE_PATH", required = true)]
        files: Vec<PathBuf>,

        /// Treat a missing file as a validation failure
        #[arg(long, default_value_t = false)]
        require_files: bool,
    },

    /// Write or verify a manifest for an existing JSONL file
    #[command(arg_required_else_help = true)]
    Manifest {
        /// The JSONL data file
        #[arg(value_name = "FILE_PATH")]
        jsonl: PathBuf,

        /// Manifest path; defaults to <data>.manifest.json
        #[arg(long, value_name = "FILE_PATH")]
        manifest: Option<PathBuf>,

        /// Schema version to record
        #[arg(long, default_value = SCHEMA_VERSION)]
        schema_version: String,

        /// ID policy note to record
        #[arg(long)]
        id_policy: Option<String>,

        /// Verify the existing manifest instead of writing one
        #[arg(long, default_value_t = false)]
        verify: bool,
    },

    /// Print the dataset registry
    Registry,

    /// Rebuild form_text / meaning_text, writing an enriched copy
    #[command(arg_required_else_help = true)]
    TextFields {
        /// Input canonical JSONL file (left untouched)
        #[arg(value_name = "FILE_PATH")]
        input: PathBuf,

        /// Output path for the enriched file; must differ from the input
        #[arg(value_name = "FILE_PATH")]
        output: PathBuf,
    },
}

fn parse_tag_path(spec: &str) -> Result<(String, PathBuf)> {
    match spec.split_once('=') {
        Some((tag, path)) if !tag.trim().is_empty() && !path.trim().is_empty() => {
            Ok((tag.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => Err(anyhow!("expected TAG=PATH, got '{}'", spec)),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_ingest(
    quran_morphology: Option<PathBuf>,
    word_root_map: Option<PathBuf>,
    jsonl_sources: Vec<String>,
    output: PathBuf,
    language: String,
    stage: String,
    source: String,
    priority: Vec<String>,
    strict: bool,
    registry: Option<PathBuf>,
) -> Result<()> {
    let mut adapters: Vec<(Box<dyn Adapter>, PathBuf)> = Vec::new();

    if let Some(path) = quran_morphology {
        adapters.push((Box::new(QuranMorphologyAdapter::default()), path));
    }
    if let Some(path) = word_root_map {
        adapters.push((Box::new(WordRootMapAdapter::default()), path));
    }
    for spec in &jsonl_sources {
        let (tag, path) = parse_tag_path(spec)?;
        adapters.push((
            Box::new(JsonlSourceAdapter::new(&tag, &language, &stage)),
            path,
        ));
    }
    if adapters.is_empty() {
        return Err(anyhow!("no input sources given"));
    }
    for (adapter, path) in &adapters {
        if !path.exists() {
            return Err(anyhow!(
                "input for '{}' does not exist: {:?}",
                adapter.source_tag(),
                path
            ));
        }
    }

    let mut config = BuildConfig::new(DatasetKey::new(&language, &stage, &source), &output);
    config.policy = MergePolicy::new(&priority);
    config.strict = strict;
    config.registry_path = registry;

    let pairs: Vec<(&dyn Adapter, &Path)> = adapters
        .iter()
        .map(|(a, p)| (a.as_ref(), p.as_path()))
        .collect();

    let report = run_build(&pairs, &config)?;

    println!(
        "wrote {} rows to {:?} (sha256 {})",
        report.manifest.row_count, output, report.manifest.sha256
    );
    println!(
        "merge: {} in / {} out, {} fill-ins, {} suppressed; id collisions: {} groups",
        report.merge.rows_in,
        report.merge.rows_out,
        report.merge.fill_in_count(),
        report.merge.suppressed_count(),
        report.identity.collision_groups,
    );
    println!(
        "meaning_text coverage: {} gloss, {} fallback, {} empty",
        report.coverage.with_gloss, report.coverage.fallback, report.coverage.empty_meaning
    );
    if let Some(key) = report.registry_key {
        println!("registry updated: {}", key);
    }

    Ok(())
}

fn run_validate(files: Vec<PathBuf>, require_files: bool) -> Result<()> {
    let paths: Vec<&Path> = files.iter().map(|p| p.as_path()).collect();
    let reports = validate_files(&paths, require_files)?;

    let mut total_issues = 0;
    for report in &reports {
        if report.is_ok() {
            println!("OK   {} ({} rows)", report.file, report.rows);
        } else {
            println!("FAIL {} ({} rows)", report.file, report.rows);
            for issue in &report.issues {
                println!("  line {}: [{}] {}", issue.line, issue.check, issue.message);
            }
            total_issues += report.issues.len();
        }
    }

    if total_issues > 0 {
        Err(anyhow!("{} validation issues", total_issues))
    } else {
        Ok(())
    }
}

fn run_manifest(
    jsonl: PathBuf,
    manifest: Option<PathBuf>,
    schema_version: String,
    id_policy: Option<String>,
    verify: bool,
) -> Result<()> {
    let manifest_path = manifest.unwrap_or_else(|| manifest_path_for(&jsonl));

    if verify {
        let verified = verify_manifest(&manifest_path)?;
        println!(
            "OK {} ({} rows, sha256 {})",
            verified.file, verified.row_count, verified.sha256
        );
        return Ok(());
    }

    let written = write_manifest(
        &jsonl,
        &manifest_path,
        &schema_version,
        "lexicore",
        id_policy.as_deref(),
    )?;
    println!(
        "wrote {:?} ({} rows, sha256 {})",
        manifest_path, written.row_count, written.sha256
    );
    Ok(())
}

fn run_registry(registry: Option<PathBuf>) -> Result<()> {
    let path = registry.ok_or_else(|| {
        anyhow!("no registry given; use --registry or set LEXICORE_REGISTRY")
    })?;
    let store = RegistryStore::load(&path)?;
    if store.entries().is_empty() {
        println!("registry is empty: {:?}", path);
        return Ok(());
    }
    for (key, entry) in store.entries() {
        println!(
            "{}: {} ({} rows, {}, sha256 {})",
            key, entry.file, entry.row_count, entry.schema_version, entry.sha256
        );
    }
    Ok(())
}

fn run_text_fields(input: PathBuf, output: PathBuf) -> Result<()> {
    // Canonical files are immutable once written; enrichment is a new file
    // with its own manifest, never an in-place rewrite that would leave the
    // input's sidecar manifest describing bytes that no longer exist.
    let same_file = input == output
        || (output.exists()
            && std::fs::canonicalize(&input)? == std::fs::canonicalize(&output)?);
    if same_file {
        return Err(anyhow!(
            "output must differ from the input: {:?}",
            input
        ));
    }

    let mut rows = read_rows(&input)?;
    let report = apply_text_fields(&mut rows);
    lexicore_backend::jsonl::write_rows_unique(&output, &rows)?;

    let manifest_path = manifest_path_for(&output);
    let manifest = write_manifest(&output, &manifest_path, SCHEMA_VERSION, "lexicore", None)?;

    println!(
        "wrote {} rows to {:?} (sha256 {}): {} gloss, {} fallback, {} empty",
        manifest.row_count,
        output,
        manifest.sha256,
        report.with_gloss,
        report.fallback,
        report.empty_meaning
    );
    Ok(())
}

fn main() {
    // A .env file may define LEXICORE_REGISTRY; clap picks it up via env.
    let _ = dotenv();

    let cli = Cli::parse();

    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize logging: {}", e);
        exit(1);
    }

    let command_result = match cli.command {
        Commands::Ingest {
            quran_morphology,
            word_root_map,
            jsonl_source,
            output,
            language,
            stage,
            source,
            priority,
            strict,
        } => run_ingest(
            quran_morphology,
            word_root_map,
            jsonl_source,
            output,
            language,
            stage,
            source,
            priority,
            strict,
            cli.registry,
        ),

        Commands::Validate { files, require_files } => run_validate(files, require_files),

        Commands::Manifest {
            jsonl,
            manifest,
            schema_version,
            id_policy,
            verify,
        } => run_manifest(jsonl, manifest, schema_version, id_policy, verify),

        Commands::Registry => run_registry(cli.registry),

        Commands::TextFields { input, output } => run_text_fields(input, output),
    };

    if let Err(e) = command_result {
        eprintln!("Error executing command: {:#}", e);
        exit(1);
    }
}
