//! C1 — Text Normalizer. Turns a raw text segment into an ordered sequence
//! of valid, stemmed terms (repetition preserved) per spec §4.1.
//!
//! The index-side pipeline order is: lowercase, strip markup, split,
//! drop stopwords, stem, validity filter. The query-side pipeline (`query.rs`)
//! stems *before* checking stopwords — spec §9 flags this as a load-bearing
//! asymmetry and asks that it be kept faithful, not "fixed".

use crate::stopwords;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::cell::RefCell;

static SELF_CLOSING_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*/>").unwrap());
static OPEN_CLOSE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static URL_OR_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"http[^ }|]*[ }|]|[a-z0-9]*\.(?:svg|png|jpeg|jpg|com|html|gif|pdf)").unwrap()
});
static TABLE_EQUALITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[|!] ?[^=|\n}\]]*=").unwrap());
static SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());
// Anchored at the start of the term, mirroring Python's re.match semantics:
// a run of digits then letters then a digit, or letters then digits then a
// letter, appearing as a *prefix* of the term (not necessarily the whole term).
static GARBAGE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9]+[a-z]+[0-9]|[a-z]+[0-9]+[a-z])").unwrap());

const MAX_TERM_LEN: usize = 20;
const MAX_PURE_DIGIT_LEN: usize = 4;

/// True if `term` starts with the same letter repeated 3 or more times.
/// `regex` has no backreferences, so this can't be expressed as a pattern.
fn starts_with_triple_repeat(term: &str) -> bool {
    let mut chars = term.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(a), Some(b), Some(c)) => a == b && b == c && a.is_ascii_alphabetic(),
        _ => false,
    }
}

/// Strip only self-closing `<.../>` tags (spec §4.2 step 1 — run once over
/// the whole document before any field is carved out).
pub fn strip_self_closing_tags(text: &str) -> String {
    SELF_CLOSING_TAG.replace_all(text, " ").into_owned()
}

/// Strip self-closing `<.../>` tags, then open/close `<...>` tags. Spec §4.1
/// step 2 runs this once, up front, on the whole segment.
pub fn strip_tags(text: &str) -> String {
    let no_self_closing = strip_self_closing_tags(text);
    OPEN_CLOSE_TAG.replace_all(&no_self_closing, " ").into_owned()
}

/// Strip bare URLs and filename-shaped tokens (spec §4.1 step 3).
pub fn strip_urls_and_files(text: &str) -> String {
    URL_OR_FILENAME.replace_all(text, " ").into_owned()
}

/// Strip wiki-table field equalities like `| name = ` (spec §4.1 step 4).
pub fn strip_table_equalities(text: &str) -> String {
    TABLE_EQUALITY.replace_all(text, " ").into_owned()
}

/// Split on any run of non-`[a-z0-9]` characters (spec §4.1 step 5).
pub fn split_words(text: &str) -> Vec<String> {
    SPLIT
        .split(text)
        .filter(|w| !w.is_empty())
        .map(|w| w.to_string())
        .collect()
}

thread_local! {
    static STEMMER: RefCell<Stemmer> = RefCell::new(Stemmer::create(Algorithm::English));
}

/// Stem a single lowercase token with the Porter2 (Snowball English) algorithm.
pub fn stem(word: &str) -> String {
    STEMMER.with(|s| s.borrow().stem(word).into_owned())
}

/// The Term validity filter from spec §3: lowercase alphanumeric non-empty;
/// length <= 20; not a pure-digit string longer than 4; does not begin with
/// `00`; does not match the noise pattern (digit-letter-digit,
/// letter-digit-letter, or any letter repeated >= 3 times).
pub fn is_valid_term(term: &str) -> bool {
    if term.is_empty() || term.len() > MAX_TERM_LEN {
        return false;
    }
    if term.starts_with("00") {
        return false;
    }
    let all_digits = term.chars().all(|c| c.is_ascii_digit());
    if all_digits {
        return term.len() <= MAX_PURE_DIGIT_LEN;
    }
    if GARBAGE_PREFIX.is_match(term) || starts_with_triple_repeat(term) {
        return false;
    }
    true
}

/// Run the full index-side pipeline (spec §4.1) over one text segment,
/// returning the ordered, stemmed, validity-filtered term sequence with
/// repetition preserved.
pub fn normalize_segment(raw: &str) -> Vec<String> {
    let lowered = raw.to_lowercase();
    let detagged = strip_tags(&lowered);
    let deurled = strip_urls_and_files(&detagged);
    let detabled = strip_table_equalities(&deurled);

    split_words(&detabled)
        .into_iter()
        .filter(|w| !stopwords::is_stopword(w))
        .map(|w| stem(&w))
        .filter(|w| is_valid_term(w))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_splits() {
        let terms = normalize_segment("Alpha is the <b>first</b> letter.");
        assert_eq!(terms, vec!["alpha", "first", "letter"]);
    }

    #[test]
    fn strips_urls_and_filenames() {
        let terms = normalize_segment("See http://example.com/path and logo.svg for format");
        assert_eq!(terms, vec!["see", "format"]);
    }

    #[test]
    fn strips_table_equality_lines() {
        let text = "| name = Some Value\nplain words here";
        let terms = normalize_segment(text);
        assert!(!terms.contains(&"name".to_string()));
        assert!(terms.contains(&"plain".to_string()));
    }

    #[test]
    fn rejects_long_pure_digit_strings() {
        assert!(!is_valid_term("123456"));
        assert!(is_valid_term("1234"));
    }

    #[test]
    fn rejects_leading_double_zero() {
        assert!(!is_valid_term("007bond"));
    }

    #[test]
    fn rejects_noise_patterns() {
        assert!(!is_valid_term("a1b"));
        assert!(!is_valid_term("1a1"));
        assert!(!is_valid_term("aaab"));
    }

    #[test]
    fn repeated_digit_prefix_is_not_garbage() {
        // Only a repeated *letter* triggers the noise filter; a repeated
        // digit prefix followed by letters is not digit-letter-digit,
        // letter-digit-letter, or a letter run, so it passes.
        assert!(is_valid_term("111abc"));
    }

    #[test]
    fn rejects_overlong_terms() {
        let long = "a".repeat(21);
        assert!(!is_valid_term(&long));
    }
}
