use std::fs;
use std::path::Path;

use tempfile::tempdir;

use lexicore_backend::adapters::{Adapter, JsonlSourceAdapter, QuranMorphologyAdapter};
use lexicore_backend::merge::MergePolicy;
use lexicore_backend::pipeline::{run_build, BuildConfig};
use lexicore_backend::registry::RegistryStore;
use lexicore_backend::types::DatasetKey;
use lexicore_backend::validation::validate_file;

mod helpers;
use helpers as h;

fn build_once(
    morphology: &Path,
    glosses: &Path,
    output: &Path,
    registry: Option<&Path>,
) -> lexicore_backend::pipeline::BuildReport {
    let quran = QuranMorphologyAdapter::default();
    let gloss_source = JsonlSourceAdapter::new("gloss-notes", "ara-qur", "quranic");

    let adapters: Vec<(&dyn Adapter, &Path)> =
        vec![(&quran, morphology), (&gloss_source, glosses)];

    let mut config = BuildConfig::new(
        DatasetKey::new("ara-qur", "quranic", "merged"),
        output,
    );
    config.policy = MergePolicy::new(&["quranic-corpus-morphology", "gloss-notes"]);
    config.registry_path = registry.map(|p| p.to_path_buf());

    run_build(&adapters, &config).unwrap()
}

#[test]
fn test_rebuild_yields_byte_identical_data() {
    let dir = tempdir().unwrap();
    let morphology = h::write_morphology_fixture(&dir);
    let glosses = h::write_lines(
        &dir,
        "glosses.jsonl",
        &[r#"{"lemma":"رَحْمَة","language":"","source":"","lemma_status":"silver","translit":"","ipa":"","root":"رحم","gloss_plain":"mercy"}"#],
    );

    let out_a = dir.path().join("a.jsonl");
    let out_b = dir.path().join("b.jsonl");

    let report_a = build_once(&morphology, &glosses, &out_a, None);
    let report_b = build_once(&morphology, &glosses, &out_b, None);

    assert_eq!(fs::read(&out_a).unwrap(), fs::read(&out_b).unwrap());
    assert_eq!(report_a.manifest.sha256, report_b.manifest.sha256);
    assert_eq!(report_a.manifest.row_count, report_b.manifest.row_count);
}

#[test]
fn test_build_output_is_sorted_merged_and_valid() {
    let dir = tempdir().unwrap();
    let morphology = h::write_morphology_fixture(&dir);
    let glosses = h::write_lines(
        &dir,
        "glosses.jsonl",
        &[r#"{"lemma":"رَحْمَة","language":"","source":"","lemma_status":"silver","translit":"","ipa":"","root":"رحم","gloss_plain":"mercy"}"#],
    );

    let output = dir.path().join("merged.jsonl");
    let registry = dir.path().join("registry.json");

    let report = build_once(&morphology, &glosses, &output, Some(&registry));

    // The repeated (lemma, root) line collapses at read time; the gloss row
    // merges into the morphology lexeme, so three lexemes remain.
    assert_eq!(report.manifest.row_count, 3);
    assert_eq!(report.merge.fill_in_count(), 1);

    let rows = lexicore_backend::jsonl::read_rows(&output).unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);

    let merged_row = rows
        .iter()
        .find(|r| r.gloss_plain.as_deref() == Some("mercy"))
        .expect("gloss should merge into a morphology lexeme");
    assert_eq!(merged_row.source, "quranic-corpus-morphology");
    assert_eq!(merged_row.n_sources, Some(2));
    assert!(merged_row.meaning_text.as_deref() == Some("mercy"));
    assert!(merged_row.form_text.as_ref().unwrap().starts_with("AR: "));

    // The written file passes validation as-is.
    let validation = validate_file(&output).unwrap();
    assert!(validation.is_ok(), "{:?}", validation.issues);

    // The registry points at the freshly written manifest.
    let store = RegistryStore::load(&registry).unwrap();
    let key = DatasetKey::new("ara-qur", "quranic", "merged");
    let entry = store.get(&key).expect("registry entry for the build");
    assert_eq!(entry.sha256, report.manifest.sha256);
    assert_eq!(entry.row_count, 3);
}

#[test]
fn test_strict_mode_fails_on_rejections() {
    let dir = tempdir().unwrap();
    let morphology = h::write_morphology_fixture(&dir);
    let glosses = h::write_lines(&dir, "glosses.jsonl", &["this is not json"]);

    let quran = QuranMorphologyAdapter::default();
    let gloss_source = JsonlSourceAdapter::new("gloss-notes", "ara-qur", "quranic");
    let adapters: Vec<(&dyn Adapter, &Path)> = vec![
        (&quran, morphology.as_path()),
        (&gloss_source, glosses.as_path()),
    ];

    let output = dir.path().join("merged.jsonl");
    let mut config = BuildConfig::new(
        DatasetKey::new("ara-qur", "quranic", "merged"),
        &output,
    );
    config.strict = true;

    let err = run_build(&adapters, &config).unwrap_err();
    assert!(err.to_string().contains("gloss-notes"));
    // Nothing committed on failure.
    assert!(!output.exists());
}
