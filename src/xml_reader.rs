//! XML reader contract (upstream collaborator, spec §6). Streams a MediaWiki
//! export dump with a SAX-style `quick_xml` reader rather than building a DOM,
//! so a multi-gigabyte dump never has to fit in memory at once. Transparently
//! decompresses `.gz` input.

use flate2::read::GzDecoder;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Titles beginning with any of these (case-folded) prefixes are not articles
/// and never receive a document id (spec §3).
const FILTERED_NAMESPACE_PREFIXES: &[&str] = &[
    "wikipedia:",
    "file:",
    "category:",
    "template:",
    "portal:",
    "help:",
];

pub fn is_filtered_title(lowercase_title: &str) -> bool {
    FILTERED_NAMESPACE_PREFIXES
        .iter()
        .any(|prefix| lowercase_title.starts_with(prefix))
}

/// One accepted (non-filtered) page, ready for the analyzer.
pub struct RawPage {
    pub title: String,
    pub text: String,
}

/// Open `path` for streaming, transparently decompressing if it ends in `.gz`.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>, crate::Error> {
    let file = File::open(path)
        .map_err(|e| crate::Error::IO(e).with_context(format!("opening {:?}", path)))?;
    let is_gzip = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);
    if is_gzip {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Streams `page` elements out of a MediaWiki export dump, filtering
/// non-article namespaces and honoring only the first `id` per page.
pub struct PageReader<R: BufRead> {
    xml: Reader<R>,
    scratch: Vec<u8>,
}

impl<R: BufRead> PageReader<R> {
    pub fn new(source: R) -> Self {
        let mut xml = Reader::from_reader(source);
        xml.trim_text(true);
        PageReader {
            xml,
            scratch: Vec::new(),
        }
    }

    /// Returns the next accepted page, or `None` at end of stream. Filtered
    /// pages are skipped transparently; they never surface here.
    pub fn next_page(&mut self) -> Result<Option<RawPage>, crate::Error> {
        let mut in_page = false;
        let mut id_seen = false;
        let mut current_tag: Vec<u8> = Vec::new();
        let mut text_buf = String::new();
        let mut title: Option<String> = None;
        let mut text: Option<String> = None;

        loop {
            self.scratch.clear();
            match self.xml.read_event_into(&mut self.scratch)? {
                Event::Start(e) => {
                    let name = e.name().as_ref().to_vec();
                    if name == b"page" {
                        in_page = true;
                        id_seen = false;
                        title = None;
                        text = None;
                    }
                    current_tag = name;
                    text_buf.clear();
                }
                Event::Text(e) if in_page => {
                    text_buf.push_str(e.unescape()?.as_ref());
                }
                Event::End(e) => {
                    let name = e.name().as_ref().to_vec();
                    if in_page {
                        match (name.as_slice(), current_tag.as_slice()) {
                            (b"title", b"title") => {
                                title = Some(text_buf.trim().to_lowercase());
                            }
                            (b"id", b"id") if !id_seen => {
                                id_seen = true;
                            }
                            (b"text", b"text") => {
                                text = Some(std::mem::take(&mut text_buf));
                            }
                            (b"page", _) => {
                                in_page = false;
                                let page_title = title.take().unwrap_or_default();
                                let page_text = text.take().unwrap_or_default();
                                if !is_filtered_title(&page_title) {
                                    return Ok(Some(RawPage {
                                        title: page_title,
                                        text: page_text,
                                    }));
                                }
                                // Filtered: keep looping for the next page.
                            }
                            _ => {}
                        }
                    }
                    text_buf.clear();
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages_from(xml: &str) -> Vec<RawPage> {
        let mut reader = PageReader::new(BufReader::new(xml.as_bytes()));
        let mut pages = Vec::new();
        while let Some(page) = reader.next_page().unwrap() {
            pages.push(page);
        }
        pages
    }

    #[test]
    fn filters_help_namespace() {
        let xml = r#"<mediawiki>
            <page><title>Help:Contents</title><id>1</id><revision><id>10</id><text>x</text></revision></page>
            <page><title>Beta</title><id>2</id><revision><id>20</id><text>beta body</text></revision></page>
        </mediawiki>"#;
        let pages = pages_from(xml);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "beta");
        assert_eq!(pages[0].text, "beta body");
    }

    #[test]
    fn lowercases_title() {
        let xml = r#"<mediawiki><page><title>Alpha</title><id>1</id><text>x</text></page></mediawiki>"#;
        let pages = pages_from(xml);
        assert_eq!(pages[0].title, "alpha");
    }

    #[test]
    fn ignores_revision_id_after_page_id() {
        // Well-formed either way since we never expose the id, but this
        // exercises the "only first id honored" path without panicking.
        let xml = r#"<mediawiki>
            <page><title>Gamma</title><id>5</id><revision><id>99</id><text>body</text></revision></page>
        </mediawiki>"#;
        let pages = pages_from(xml);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].text, "body");
    }
}
