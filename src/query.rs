//! C6 — Query Planner. Tokenizes a query line into field-qualified terms,
//! runs them through the (stem-before-stopword) query-side pipeline, and
//! routes each unique term to the Stage-2 shard that must contain it
//! (spec §4.6).

use crate::model::FieldTag;
use crate::normalize;
use crate::stopwords;
use std::collections::BTreeSet;

/// One deduplicated, stemmed query term: how many times it was typed, and
/// the union of fields it was explicitly bound to (empty = unrestricted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerm {
    pub term: String,
    pub count: u32,
    pub tags: BTreeSet<FieldTag>,
}

fn split_tokens(query: &str) -> Vec<&str> {
    query
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect()
}

/// Apply the query-side term pipeline: lowercase, stem, *then* discard if the
/// stemmed form is a stopword. This order is the opposite of the index-side
/// pipeline in `normalize.rs` — an intentional asymmetry, not a bug.
fn process_term(raw: &str) -> Option<String> {
    let lowered = raw.to_lowercase();
    let stemmed = normalize::stem(&lowered);
    if stemmed.is_empty() || stopwords::is_stopword(&stemmed) {
        None
    } else {
        Some(stemmed)
    }
}

/// Parse a query line into its deduplicated, field-tagged, stemmed terms, in
/// first-seen order.
pub fn plan_query(query: &str) -> Vec<QueryTerm> {
    let tokens = split_tokens(query);
    let mut current_field: Option<FieldTag> = None;
    let mut order: Vec<String> = Vec::new();
    let mut by_term: std::collections::HashMap<String, (u32, BTreeSet<FieldTag>)> =
        std::collections::HashMap::new();

    let mut emit = |field: Option<FieldTag>, raw_term: &str| {
        if let Some(term) = process_term(raw_term) {
            let entry = by_term.entry(term.clone()).or_insert_with(|| {
                order.push(term.clone());
                (0, BTreeSet::new())
            });
            entry.0 += 1;
            if let Some(tag) = field {
                entry.1.insert(tag);
            }
        }
    };

    let mut i = 0;
    while i < tokens.len() {
        let tok = tokens[i];
        if let Some(colon_idx) = tok.find(':') {
            let field_part = &tok[..colon_idx];
            let term_part = &tok[colon_idx + 1..];
            if !field_part.is_empty() && !term_part.is_empty() {
                // "field:term"
                let field = FieldTag::from_query_name(&field_part.to_lowercase());
                current_field = field;
                emit(field, term_part);
            } else if !field_part.is_empty() {
                // "field:" alone: set the field for subsequent `:term` tokens.
                current_field = FieldTag::from_query_name(&field_part.to_lowercase());
            } else if !term_part.is_empty() {
                // ":term" alone: bind to whatever field is currently active.
                emit(current_field, term_part);
            }
        } else if i + 1 < tokens.len() && tokens[i + 1].starts_with(':') {
            // Bare token immediately followed by `:term` names the field,
            // and is not itself a search term.
            current_field = FieldTag::from_query_name(&tok.to_lowercase());
        } else {
            emit(None, tok);
        }
        i += 1;
    }

    order
        .into_iter()
        .map(|term| {
            let (count, tags) = by_term.remove(&term).unwrap();
            QueryTerm { term, count, tags }
        })
        .collect()
}

/// Find the Stage-2 shard (1-indexed) that must contain `term`, given the
/// boundary vector of first-terms-per-shard. `0` means the term precedes
/// every shard's first term and therefore cannot exist in the index.
///
/// Exact matches resolve to the *next* shard: `boundary[k]` is the first term
/// of shard `k+1`, so a term equal to it lives in that shard, not the one
/// before (spec §9's boundary-vector subtlety).
pub fn shard_for_term(boundary: &[String], term: &str) -> usize {
    boundary.partition_point(|b| b.as_str() <= term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_tokens_are_unrestricted() {
        let terms = plan_query("alpha beta");
        assert_eq!(terms.len(), 2);
        assert!(terms[0].tags.is_empty());
    }

    #[test]
    fn field_colon_term_binds_field() {
        let terms = plan_query("title:delta");
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].term, normalize::stem("delta"));
        assert!(terms[0].tags.contains(&FieldTag::Title));
    }

    #[test]
    fn field_colon_alone_then_colon_term() {
        let terms = plan_query("title: delta");
        assert_eq!(terms.len(), 1);
        assert!(terms[0].tags.contains(&FieldTag::Title));
    }

    #[test]
    fn bare_token_before_colon_term_is_field_not_term() {
        let terms = plan_query("title :delta");
        assert_eq!(terms.len(), 1);
        assert!(terms[0].tags.contains(&FieldTag::Title));
        assert!(terms.iter().all(|t| t.term != "titl" && t.term != "title"));
    }

    #[test]
    fn stopword_only_query_yields_no_terms() {
        let terms = plan_query("the and of");
        assert!(terms.is_empty());
    }

    #[test]
    fn duplicate_terms_aggregate_count() {
        let terms = plan_query("alpha alpha alpha");
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].count, 3);
    }

    #[test]
    fn shard_routing_handles_exact_boundary_match() {
        let boundary: Vec<String> = vec!["cat".into(), "dog".into(), "fish".into()];
        assert_eq!(shard_for_term(&boundary, "ant"), 0);
        assert_eq!(shard_for_term(&boundary, "cat"), 1);
        assert_eq!(shard_for_term(&boundary, "cow"), 1);
        assert_eq!(shard_for_term(&boundary, "dog"), 2);
        assert_eq!(shard_for_term(&boundary, "zebra"), 3);
    }
}
