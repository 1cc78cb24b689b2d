//! Shared data model: field tags and the posting shape every other
//! component reads or writes. See spec §3 for the authoritative invariants.

use std::collections::BTreeSet;
use std::fmt;

/// One of the six document sections a term occurrence can be attributed to.
/// Ordering here is the canonical serialization order for `tagchars`
/// (t, i, c, r, l, b) so that two shards built from the same postings are
/// byte-identical regardless of insertion order.
#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Hash, Copy, Clone)]
pub enum FieldTag {
    Title,
    Infobox,
    Category,
    Reference,
    Link,
    Body,
}

impl FieldTag {
    /// Scoring weight contributed by one occurrence in this field.
    pub fn weight(&self) -> u32 {
        match self {
            FieldTag::Title => 6,
            FieldTag::Infobox => 3,
            FieldTag::Category => 2,
            FieldTag::Reference => 1,
            FieldTag::Link => 1,
            FieldTag::Body => 1,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            FieldTag::Title => 't',
            FieldTag::Infobox => 'i',
            FieldTag::Category => 'c',
            FieldTag::Reference => 'r',
            FieldTag::Link => 'l',
            FieldTag::Body => 'b',
        }
    }

    pub fn from_letter(c: char) -> Option<FieldTag> {
        Some(match c {
            't' => FieldTag::Title,
            'i' => FieldTag::Infobox,
            'c' => FieldTag::Category,
            'r' => FieldTag::Reference,
            'l' => FieldTag::Link,
            'b' => FieldTag::Body,
            _ => return None,
        })
    }

    /// Parses a query-side field name, e.g. `title`, `infobox`, `category`,
    /// `references`/`ref`, `links`/`external`, `body`.
    pub fn from_query_name(name: &str) -> Option<FieldTag> {
        Some(match name {
            "t" | "title" => FieldTag::Title,
            "i" | "infobox" => FieldTag::Infobox,
            "c" | "category" | "categories" => FieldTag::Category,
            "r" | "ref" | "refs" | "reference" | "references" => FieldTag::Reference,
            "l" | "link" | "links" | "external" | "externallinks" => FieldTag::Link,
            "b" | "body" => FieldTag::Body,
            _ => return None,
        })
    }
}

/// Render a tag set in canonical letter order, e.g. `{Title, Body}` -> "tb".
pub fn tagchars(tags: &BTreeSet<FieldTag>) -> String {
    tags.iter().map(|t| t.letter()).collect()
}

/// Parse a `tagchars` string back into a tag set. Per §6 grammar, every
/// character must be one of `[ticrlb]` and unique; callers that need the
/// stricter invariant check should use `parse_strict`.
pub fn parse_tagchars(s: &str) -> Option<BTreeSet<FieldTag>> {
    let mut set = BTreeSet::new();
    for c in s.chars() {
        let tag = FieldTag::from_letter(c)?;
        if !set.insert(tag) {
            return None; // duplicate character: malformed.
        }
    }
    Some(set)
}

/// One term's contribution to a single document: the BM-weighted occurrence
/// count and the set of fields it appeared in (the `b` tag is added only
/// when a non-`b` tag already exists for this term in this document — see
/// spec §3's "special rule" and §9's open question; this is load-bearing at
/// query time and must not be "fixed").
#[derive(Debug, Clone, Default)]
pub struct DocPosting {
    pub weighted_count: u32,
    pub tags: BTreeSet<FieldTag>,
}

/// A single decoded record from a posting line: `count-docid[-tagchars]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub count: u32,
    pub doc_id: u64,
    pub tags: BTreeSet<FieldTag>,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tags.is_empty() {
            write!(f, "{}-{}", self.count, self.doc_id)
        } else {
            write!(f, "{}-{}-{}", self.count, self.doc_id, tagchars(&self.tags))
        }
    }
}

impl Record {
    /// Parse one `count-docid[-tagchars]` record per the grammar in spec §6.
    pub fn parse(s: &str) -> Result<Record, crate::Error> {
        let mut parts = s.splitn(3, '-');
        let count: u32 = parts
            .next()
            .ok_or_else(|| crate::Error::parse(format!("missing count in record {:?}", s)))?
            .parse()
            .map_err(|_| crate::Error::parse(format!("bad count in record {:?}", s)))?;
        let doc_id: u64 = parts
            .next()
            .ok_or_else(|| crate::Error::parse(format!("missing docid in record {:?}", s)))?
            .parse()
            .map_err(|_| crate::Error::parse(format!("bad docid in record {:?}", s)))?;
        let tags = match parts.next() {
            Some(tagchars) => parse_tagchars(tagchars)
                .ok_or_else(|| crate::Error::parse(format!("bad tagchars in record {:?}", s)))?,
            None => BTreeSet::new(),
        };
        Ok(Record {
            count,
            doc_id,
            tags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_roundtrip_with_tags() {
        let mut tags = BTreeSet::new();
        tags.insert(FieldTag::Title);
        tags.insert(FieldTag::Body);
        let rec = Record {
            count: 7,
            doc_id: 1,
            tags,
        };
        let rendered = rec.to_string();
        assert_eq!(rendered, "7-1-tb");
        let parsed = Record::parse(&rendered).unwrap();
        assert_eq!(parsed, rec);
    }

    #[test]
    fn record_roundtrip_pure_body() {
        let rec = Record {
            count: 2,
            doc_id: 5,
            tags: BTreeSet::new(),
        };
        assert_eq!(rec.to_string(), "2-5");
        let parsed = Record::parse("2-5").unwrap();
        assert_eq!(parsed, rec);
    }

    #[test]
    fn rejects_duplicate_tag_letters() {
        assert!(parse_tagchars("tt").is_none());
    }

    #[test]
    fn rejects_unknown_tag_letters() {
        assert!(parse_tagchars("tz").is_none());
    }
}
