use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use tempfile::TempDir;

use lexicore_backend::types::CanonicalRow;

#[allow(dead_code)]
pub fn row(lemma: &str, language: &str, source: &str, source_ref: &str) -> CanonicalRow {
    let mut r = CanonicalRow::new(lemma, language, source);
    r.stage = "classical".to_string();
    r.source_ref = source_ref.to_string();
    r
}

#[allow(dead_code)]
pub fn write_lines(dir: &TempDir, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.path().join(name);
    let mut f = File::create(&path).unwrap();
    for line in lines {
        writeln!(f, "{}", line).unwrap();
    }
    path
}

/// A small Quranic morphology fixture: three lexemes, one repeated surface
/// form that collapses at read time.
#[allow(dead_code)]
pub fn write_morphology_fixture(dir: &TempDir) -> PathBuf {
    write_lines(
        dir,
        "morphology.txt",
        &[
            "(1:1:1)\tبِسْمِ\tN\tSTEM|LEM:ٱسْم|ROOT:سمو",
            "(1:1:2)\tٱسْمَ\tN\tSTEM|LEM:ٱسْم|ROOT:سمو",
            "(1:3:1)\tٱلرَّحْمَٰنِ\tADJ\tSTEM|LEM:رَحْمَٰن|ROOT:رحم",
            "(2:105:5)\tرَحْمَة\tN\tSTEM|LEM:رَحْمَة|ROOT:رحم",
        ],
    )
}

/// A word/root map fixture overlapping the morphology lexemes.
#[allow(dead_code)]
pub fn write_word_root_fixture(dir: &TempDir) -> PathBuf {
    write_lines(
        dir,
        "word_root_map.csv",
        &["word,root", "كتاب,كتب", "رحمة,رحم"],
    )
}
