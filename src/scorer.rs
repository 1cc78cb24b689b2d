//! C7 — Scorer. Scans only the Stage-2 shards a query's terms can live in,
//! applies the field-tag match rule, computes the BM-like additive score,
//! and resolves the top-10 documents to titles (spec §4.7).

use crate::model::{FieldTag, Record};
use crate::query::{shard_for_term, QueryTerm};
use crate::title_store::TitleStore;
use crate::DocId;
use fnv::FnvHashMap;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const K1: f64 = 1.2;
const TOP_K: usize = 10;

pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
    pub title: String,
}

/// A record matches a query tag-set iff the tag-set is a subset of the
/// record's tags, or the query asks for `{b}` exactly and the record is a
/// pure-body posting (no tagchars at all) — spec §4.7.
fn record_matches(query_tags: &BTreeSet<FieldTag>, record_tags: &BTreeSet<FieldTag>) -> bool {
    if query_tags.is_subset(record_tags) {
        return true;
    }
    query_tags.len() == 1 && query_tags.contains(&FieldTag::Body) && record_tags.is_empty()
}

fn idf(total_docs: u64, df: usize) -> f64 {
    let n = total_docs as f64;
    let df = df as f64;
    (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
}

/// Run one already-planned query against the index at `index_dir`.
pub fn run_query(
    terms: &[QueryTerm],
    boundary: &[String],
    index_dir: &Path,
    total_doc_count: u64,
    title_store: &TitleStore,
) -> Result<Vec<ScoredDoc>, crate::Error> {
    let mut shard_to_terms: std::collections::BTreeMap<usize, Vec<&str>> =
        std::collections::BTreeMap::new();
    let mut term_lookup: FnvHashMap<&str, &QueryTerm> = FnvHashMap::default();

    for term in terms {
        term_lookup.insert(term.term.as_str(), term);
        let shard = shard_for_term(boundary, &term.term);
        if shard == 0 {
            continue; // precedes every shard's first term: cannot exist.
        }
        shard_to_terms.entry(shard).or_default().push(&term.term);
    }

    let mut scores: FnvHashMap<DocId, f64> = FnvHashMap::default();
    let mut first_seen: Vec<DocId> = Vec::new();

    for (shard_index, wanted) in &shard_to_terms {
        let wanted: BTreeSet<&str> = wanted.iter().copied().collect();
        let path = index_dir.join(format!("index2_{}.txt", shard_index));
        let file = File::open(&path)
            .map_err(|e| crate::Error::IO(e).with_context(format!("opening {:?}", path)))?;
        let reader = BufReader::new(file);
        for line in reader.lines() {
            let line = line?;
            let (term, rest) = match line.find(' ') {
                Some(idx) => (&line[..idx], &line[idx + 1..]),
                None => continue,
            };
            if !wanted.contains(term) {
                continue;
            }
            let query_term = match term_lookup.get(term) {
                Some(qt) => *qt,
                None => continue,
            };
            let mut filtered: Vec<(DocId, u32)> = Vec::new();
            for field in rest.split(' ') {
                if field.is_empty() {
                    continue;
                }
                let record = Record::parse(field)
                    .map_err(|e| e.with_context(format!("parsing record for term {:?}", term)))?;
                if record_matches(&query_term.tags, &record.tags) {
                    filtered.push((DocId::new(record.doc_id), record.count));
                }
            }
            let df = filtered.len();
            if df == 0 {
                continue;
            }
            let term_idf = idf(total_doc_count, df);
            for (doc_id, tf) in filtered {
                let tf = tf as f64;
                let contribution =
                    query_term.count as f64 * term_idf * (1.0 + tf * (K1 + 1.0) / (tf + K1));
                let entry = scores.entry(doc_id).or_insert_with(|| {
                    first_seen.push(doc_id);
                    0.0
                });
                *entry += contribution;
            }
        }
    }

    let mut results: Vec<(DocId, f64)> = first_seen
        .into_iter()
        .map(|doc_id| {
            let score = scores[&doc_id];
            (doc_id, score)
        })
        .filter(|(_, score)| *score > 0.0)
        .collect();

    // Stable sort: equal scores preserve first-seen (insertion) order.
    results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(TOP_K);

    results
        .into_iter()
        .map(|(doc_id, score)| {
            let title = title_store.lookup(doc_id)?;
            Ok(ScoredDoc {
                doc_id,
                score,
                title,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldTag;

    #[test]
    fn idf_is_nonnegative_for_any_df_up_to_n() {
        assert!(idf(100, 1) >= 0.0);
        assert!(idf(100, 100) >= 0.0);
    }

    #[test]
    fn idf_decreases_as_df_grows() {
        assert!(idf(100, 1) > idf(100, 50));
    }

    #[test]
    fn record_matches_subset_rule() {
        let mut query = BTreeSet::new();
        query.insert(FieldTag::Title);
        let mut record = BTreeSet::new();
        record.insert(FieldTag::Title);
        record.insert(FieldTag::Infobox);
        assert!(record_matches(&query, &record));
    }

    #[test]
    fn record_matches_pure_body_special_case() {
        let mut query = BTreeSet::new();
        query.insert(FieldTag::Body);
        let record = BTreeSet::new();
        assert!(record_matches(&query, &record));
    }

    #[test]
    fn unrestricted_query_matches_everything() {
        let query = BTreeSet::new();
        let record = BTreeSet::new();
        assert!(record_matches(&query, &record));
        let mut tagged = BTreeSet::new();
        tagged.insert(FieldTag::Category);
        assert!(record_matches(&query, &tagged));
    }

    #[test]
    fn title_filter_excludes_pure_body_record() {
        let mut query = BTreeSet::new();
        query.insert(FieldTag::Title);
        let record = BTreeSet::new();
        assert!(!record_matches(&query, &record));
    }
}
