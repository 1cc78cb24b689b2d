//! C2 — Document Analyzer. Field-aware extraction that carves a raw page's
//! wikitext into title / reference / category / external-link / infobox /
//! body segments, each step consuming its span from the residue so later
//! steps only see what's left (spec §4.2).

use crate::model::{DocPosting, FieldTag};
use crate::normalize;
use fnv::FnvHashMap;
use once_cell::sync::Lazy;
use regex::Regex;

// Markup is matched case-sensitively throughout, mirroring the original's
// plain (non `re.IGNORECASE`) patterns: Wikipedia markup capitalization
// ("References", "Category", "Infobox", "External links") is exact.
static INLINE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"<ref[^>]*>[^<]*</ref>").unwrap());
static REFBEGIN_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{\{refbegin\}\}.*?\{\{refend\}\}").unwrap());
// Just the literal heading text, the way the original finds it — not
// anchored to a line by itself, since nothing requires that in wikitext.
static REFERENCES_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"==References==").unwrap());
static SECTION_ENDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\n|\n==").unwrap());

static CATEGORY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[Category:([^\]]*)\]\]").unwrap());

static EXTERNAL_LINKS_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"==External links==").unwrap());
static EXTERNAL_LINKS_ENDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\n|\[\[Category").unwrap());

static INFOBOX_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{Infobox").unwrap());
static INFOBOX_ENDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\}\}|\n \}\}|\n==").unwrap());

/// Position right after the first newline following `from`, or end of string
/// if there is none — skips past the rest of a heading's own line, the way
/// the original's `.*\n` term does before its lazy section body match.
fn skip_to_next_line(text: &str, from: usize) -> usize {
    text[from..]
        .find('\n')
        .map(|i| from + i + 1)
        .unwrap_or_else(|| text.len())
}

/// Sort and coalesce overlapping/adjacent byte ranges into their union.
fn merge_ranges(mut ranges: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    ranges.sort_by_key(|r| r.0);
    let mut out: Vec<(usize, usize)> = Vec::new();
    for (start, end) in ranges {
        if let Some(last) = out.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        out.push((start, end));
    }
    out
}

/// Split `text` into the concatenation of the given (sorted, non-overlapping)
/// ranges, and the remaining text with each range replaced by a single space
/// (as `re.sub(" ", ...)` does, so words on either side of a removed span
/// never fuse into one token).
fn extract_and_remove(text: &str, ranges: &[(usize, usize)]) -> (String, String) {
    let mut extracted = String::new();
    let mut residue = String::new();
    let mut cursor = 0usize;
    for &(start, end) in ranges {
        if start > cursor {
            residue.push_str(&text[cursor..start]);
        }
        residue.push(' ');
        extracted.push_str(&text[start..end]);
        extracted.push(' ');
        cursor = end.max(cursor);
    }
    residue.push_str(&text[cursor..]);
    (extracted, residue)
}

fn accumulate_field(map: &mut FnvHashMap<String, DocPosting>, tag: FieldTag, terms: &[String]) {
    for term in terms {
        let entry = map.entry(term.clone()).or_default();
        entry.weighted_count += tag.weight();
        entry.tags.insert(tag);
    }
}

/// Body occurrences always add their weight, but only mark the `b` tag when
/// the term already carries some other tag in this document (spec §3's
/// special rule — a pure-body posting is serialized with no `tagchars` at
/// all).
fn accumulate_body(map: &mut FnvHashMap<String, DocPosting>, terms: &[String]) {
    for term in terms {
        let entry = map.entry(term.clone()).or_default();
        entry.weighted_count += FieldTag::Body.weight();
        if !entry.tags.is_empty() {
            entry.tags.insert(FieldTag::Body);
        }
    }
}

/// Three independent passes, each operating on the residue left by the one
/// before it: every inline `<ref>` first, then (at most) one `==References==`
/// section, then (at most) one `{{refbegin}}` block. Each pass only ever
/// takes its single first match (aside from the inline refs, which are all
/// taken) — later occurrences of a references section or refbegin block are
/// left untouched, matching the original's `.search` (not `.finditer`) use.
fn extract_references(residue: &str) -> (String, String) {
    let mut text = String::new();

    let inline_ranges: Vec<(usize, usize)> =
        INLINE_REF.find_iter(residue).map(|m| (m.start(), m.end())).collect();
    let (inline_text, residue) = extract_and_remove(residue, &inline_ranges);
    text.push_str(&inline_text);

    let residue = if let Some(heading) = REFERENCES_HEADING.find(&residue) {
        let body_start = skip_to_next_line(&residue, heading.end());
        let end = SECTION_ENDER
            .find_at(&residue, body_start)
            .map(|e| e.start())
            .unwrap_or_else(|| residue.len());
        let (section_text, residue) = extract_and_remove(&residue, &[(heading.start(), end)]);
        text.push_str(&section_text);
        residue
    } else {
        residue
    };

    let residue = if let Some(m) = REFBEGIN_BLOCK.find(&residue) {
        let (block_text, residue) = extract_and_remove(&residue, &[(m.start(), m.end())]);
        text.push_str(&block_text);
        residue
    } else {
        residue
    };

    (text, residue)
}

fn extract_categories(residue: &str) -> (String, String) {
    let mut ranges = Vec::new();
    let mut text = String::new();
    for m in CATEGORY.find_iter(residue) {
        ranges.push((m.start(), m.end()));
        text.push_str(m.as_str());
        text.push(' ');
    }
    let (_, residue) = extract_and_remove(residue, &merge_ranges(ranges));
    (text, residue)
}

fn extract_external_links(residue: &str) -> (String, String) {
    let mut ranges = Vec::new();
    if let Some(heading) = EXTERNAL_LINKS_HEADING.find(residue) {
        let body_start = skip_to_next_line(residue, heading.end());
        let end = EXTERNAL_LINKS_ENDER
            .find_at(residue, body_start)
            .map(|e| e.start())
            .unwrap_or_else(|| residue.len());
        ranges.push((heading.start(), end));
    }
    extract_and_remove(residue, &ranges)
}

/// Every `{{Infobox` occurrence contributes its own content (from just past
/// the `{{Infobox` marker to its own closing `}}`) to the extracted text, but
/// the removed span is a single union from the first occurrence's start to
/// the last occurrence's close — not a per-occurrence merge. A gap between
/// two infoboxes is swallowed along with them, matching the original.
fn extract_infoboxes(residue: &str) -> (String, String) {
    let mut text = String::new();
    let mut union_start: Option<usize> = None;
    let mut union_end: Option<usize> = None;

    for m in INFOBOX_START.find_iter(residue) {
        union_start = Some(union_start.map_or(m.start(), |s| s.min(m.start())));
        if let Some(close) = INFOBOX_ENDER.find_at(residue, m.end()) {
            text.push_str(&residue[m.end()..close.start()]);
            text.push(' ');
            union_end = Some(union_end.map_or(close.end(), |e| e.max(close.end())));
        }
    }

    match (union_start, union_end) {
        (Some(start), Some(end)) => {
            let mut new_residue = String::with_capacity(residue.len());
            new_residue.push_str(&residue[..start]);
            new_residue.push(' ');
            new_residue.push_str(&residue[end..]);
            (text, new_residue)
        }
        _ => (text, residue.to_string()),
    }
}

/// Build the term -> (weighted count, tag set) map for one document (spec §4.2).
/// `title` is the document's already-lowercased title; `raw_text` is the raw
/// wikitext body.
pub fn analyze_document(title: &str, raw_text: &str) -> FnvHashMap<String, DocPosting> {
    let mut postings: FnvHashMap<String, DocPosting> = FnvHashMap::default();

    // Step 1: strip self-closing tags globally, once, before anything else.
    let residue = normalize::strip_self_closing_tags(raw_text);

    // Step 2: title.
    accumulate_field(&mut postings, FieldTag::Title, &normalize::normalize_segment(title));

    // Step 3: references.
    let (ref_text, residue) = extract_references(&residue);
    accumulate_field(
        &mut postings,
        FieldTag::Reference,
        &normalize::normalize_segment(&ref_text),
    );

    // Step 4: categories.
    let (cat_text, residue) = extract_categories(&residue);
    accumulate_field(
        &mut postings,
        FieldTag::Category,
        &normalize::normalize_segment(&cat_text),
    );

    // Step 5: external links.
    let (link_text, residue) = extract_external_links(&residue);
    accumulate_field(
        &mut postings,
        FieldTag::Link,
        &normalize::normalize_segment(&link_text),
    );

    // Step 6: infoboxes.
    let (infobox_text, residue) = extract_infoboxes(&residue);
    accumulate_field(
        &mut postings,
        FieldTag::Infobox,
        &normalize::normalize_segment(&infobox_text),
    );

    // Step 7: whatever's left is body.
    accumulate_body(&mut postings, &normalize::normalize_segment(&residue));

    postings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_doc_title_and_body() {
        let postings = analyze_document("alpha", "Alpha is the first letter.");
        let alpha = postings.get("alpha").unwrap();
        assert_eq!(alpha.weighted_count, 7);
        assert_eq!(alpha.tags.len(), 2);
        assert!(alpha.tags.contains(&FieldTag::Title));
        assert!(alpha.tags.contains(&FieldTag::Body));

        let first = postings.get("first").unwrap();
        assert_eq!(first.weighted_count, 1);
        assert!(first.tags.is_empty());
    }

    #[test]
    fn field_weight_dominance_title_and_body() {
        let postings = analyze_document("gamma", "gamma appears here too.");
        let gamma = postings.get("gamma").unwrap();
        assert_eq!(gamma.weighted_count, 7);
        assert_eq!(gamma.tags.len(), 2);
    }

    #[test]
    fn category_removed_and_tagged() {
        let text = "Some intro text. [[Category:Science]]";
        let postings = analyze_document("doc", text);
        let sci = postings.get("scienc").or_else(|| postings.get("science"));
        assert!(sci.is_some());
        assert!(sci.unwrap().tags.contains(&FieldTag::Category));
        // the category markup itself must not leak into the body.
        assert!(!postings.contains_key("category"));
    }

    #[test]
    fn references_section_captured_and_removed() {
        let text = "Intro sentence.\n\n==References==\nSome citation text here.\n\n==See also==\nMore body.";
        let postings = analyze_document("doc", text);
        let citation = postings.get("citat").unwrap();
        assert!(citation.tags.contains(&FieldTag::Reference));
        assert!(!citation.tags.contains(&FieldTag::Body));
    }

    #[test]
    fn infobox_removed_from_body() {
        let text = "{{Infobox test\n| name = Foo\n}}\nRemaining body sentence.";
        let postings = analyze_document("doc", text);
        // the field value is tagged as infobox content, not leaked as a
        // tagless (pure body) posting.
        let foo = postings.get("foo").unwrap();
        assert!(foo.tags.contains(&FieldTag::Infobox));
        assert!(!foo.tags.contains(&FieldTag::Body));

        let remaining = postings.get("remain").unwrap();
        assert!(remaining.tags.is_empty());
    }

    #[test]
    fn empty_body_all_content_in_references() {
        let text = "==References==\nOnly citation content.\n";
        let postings = analyze_document("doc", text);
        let citation = postings.get("citat").unwrap();
        assert_eq!(citation.tags.len(), 1);
        assert!(citation.tags.contains(&FieldTag::Reference));
    }
}
