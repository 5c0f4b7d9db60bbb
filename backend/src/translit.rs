//! Deterministic Arabic-script transliteration and IPA generation.
//!
//! Character-level mapping only; no phonological modeling. Shadda doubles
//! the previous segment, sukun is dropped, unmapped characters pass through.

use std::collections::HashMap;

use lazy_static::lazy_static;

const SHADDA: char = '\u{0651}';
const SUKUN: char = '\u{0652}';

lazy_static! {
    /// Consonants and long vowels: Arabic letter -> (translit, ipa).
    static ref CONS_MAP: HashMap<char, (&'static str, &'static str)> = {
        let mut map = HashMap::new();
        map.insert('ء', ("'", "ʔ"));
        map.insert('ا', ("a", "aː"));
        map.insert('أ', ("a", "ʔaː"));
        map.insert('إ', ("i", "ʔiː"));
        map.insert('آ', ("a", "ʔaː"));
        map.insert('ب', ("b", "b"));
        map.insert('ت', ("t", "t"));
        map.insert('ث', ("th", "θ"));
        map.insert('ج', ("j", "dʒ"));
        map.insert('ح', ("ḥ", "ħ"));
        map.insert('خ', ("kh", "x"));
        map.insert('د', ("d", "d"));
        map.insert('ذ', ("dh", "ð"));
        map.insert('ر', ("r", "r"));
        map.insert('ز', ("z", "z"));
        map.insert('س', ("s", "s"));
        map.insert('ش', ("sh", "ʃ"));
        map.insert('ص', ("ṣ", "sˤ"));
        map.insert('ض', ("ḍ", "dˤ"));
        map.insert('ط', ("ṭ", "tˤ"));
        map.insert('ظ', ("ẓ", "ðˤ"));
        map.insert('ع', ("ʿ", "ʕ"));
        map.insert('غ', ("gh", "ɣ"));
        map.insert('ف', ("f", "f"));
        map.insert('ق', ("q", "q"));
        map.insert('ك', ("k", "k"));
        map.insert('ل', ("l", "l"));
        map.insert('م', ("m", "m"));
        map.insert('ن', ("n", "n"));
        map.insert('ه', ("h", "h"));
        map.insert('و', ("w", "w"));
        map.insert('ي', ("y", "j"));
        map.insert('ة', ("h", "h"));
        map.insert('ى', ("a", "aː"));
        map
    };

    /// Short vowels and tanwin.
    static ref DIAC_MAP: HashMap<char, (&'static str, &'static str)> = {
        let mut map = HashMap::new();
        map.insert('\u{064E}', ("a", "a"));
        map.insert('\u{064F}', ("u", "u"));
        map.insert('\u{0650}', ("i", "i"));
        map.insert('\u{064B}', ("an", "an"));
        map.insert('\u{064C}', ("un", "un"));
        map.insert('\u{064D}', ("in", "in"));
        map
    };
}

/// Transliterate Arabic-script text, returning `(translit, ipa)`.
pub fn arabic_translit_ipa(text: &str) -> (String, String) {
    let mut tr_out: Vec<String> = Vec::new();
    let mut ipa_out: Vec<String> = Vec::new();

    for ch in text.chars() {
        if ch == SHADDA {
            if let Some(last) = tr_out.last().cloned() {
                let n = tr_out.len();
                tr_out[n - 1] = format!("{}{}", last, last);
            }
            if let Some(last) = ipa_out.last().cloned() {
                let n = ipa_out.len();
                ipa_out[n - 1] = format!("{}{}", last, last);
            }
            continue;
        }
        if ch == SUKUN {
            continue;
        }
        if let Some((tr, ipa)) = DIAC_MAP.get(&ch) {
            tr_out.push(tr.to_string());
            ipa_out.push(ipa.to_string());
            continue;
        }
        if let Some((tr, ipa)) = CONS_MAP.get(&ch) {
            tr_out.push(tr.to_string());
            ipa_out.push(ipa.to_string());
            continue;
        }
        tr_out.push(ch.to_string());
        ipa_out.push(ch.to_string());
    }

    (tr_out.concat(), ipa_out.concat())
}
