//! C8 — Driver. Orchestrates a full indexer run (parse -> flush-tail -> merge
//! -> stats) and a full search run (per-line query, resetting per-query state
//! between lines) (spec §4.8).

use crate::analyzer;
use crate::merge::{self, DEFAULT_STAGE2_FLUSH_BYTES};
use crate::model::Record;
use crate::query;
use crate::scorer;
use crate::shard_writer::{
    stage1_dir, PostingsBucket, TitleBucketWriter, DEFAULT_SHARD_FLUSH_BYTES,
    DEFAULT_TITLE_BUCKET_SIZE,
};
use crate::stats::Stats;
use crate::title_store::TitleStore;
use crate::xml_reader::{open_input, PageReader};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub struct IndexerConfig {
    pub shard_flush_bytes: usize,
    pub stage2_flush_bytes: usize,
    pub title_bucket_size: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        IndexerConfig {
            shard_flush_bytes: DEFAULT_SHARD_FLUSH_BYTES,
            stage2_flush_bytes: DEFAULT_STAGE2_FLUSH_BYTES,
            title_bucket_size: DEFAULT_TITLE_BUCKET_SIZE,
        }
    }
}

pub fn run_indexer(
    input_xml: &Path,
    index_dir: &Path,
    stats_file: &Path,
    config: &IndexerConfig,
) -> Result<(), crate::Error> {
    fs::create_dir_all(index_dir)?;
    let stage1 = stage1_dir(index_dir);
    fs::create_dir_all(&stage1)?;

    let source = open_input(input_xml)?;
    let mut reader = PageReader::new(source);

    let mut bucket = PostingsBucket::new(stage1.clone(), config.shard_flush_bytes);
    let mut titles = TitleBucketWriter::new(index_dir.to_path_buf(), config.title_bucket_size);
    let mut shard_paths: Vec<PathBuf> = Vec::new();
    let mut doc_id: u64 = 0;

    while let Some(page) = reader.next_page()? {
        doc_id += 1;
        let postings = analyzer::analyze_document(&page.title, &page.text);
        for (term, posting) in postings {
            let record = Record {
                count: posting.weighted_count,
                doc_id,
                tags: posting.tags,
            };
            if let Some(path) = bucket.add_record(&term, &record)? {
                shard_paths.push(path);
            }
        }
        titles.add_title(&page.title)?;
    }

    if let Some(path) = bucket.flush()? {
        shard_paths.push(path);
    }
    titles.flush()?;

    let merge_output = merge::merge_shards(&shard_paths, index_dir, config.stage2_flush_bytes)?;
    let _ = fs::remove_dir_all(&stage1);

    // Every file left in the index directory at this point is a Stage-2
    // shard or a title bucket — first_words.txt/page_count.txt/the stats
    // file itself haven't been written yet, matching when the original
    // takes its directory-wide size snapshot.
    let on_disk_bytes = directory_size(index_dir)?;

    fs::write(
        index_dir.join("first_words.txt"),
        merge_output.boundary.join(" "),
    )?;
    fs::write(index_dir.join("page_count.txt"), doc_id.to_string())?;

    let stats = Stats {
        on_disk_bytes,
        shard_count: merge_output.shard_count,
        title_bucket_count: titles.bucket_count(),
        vocabulary_size: merge_output.vocabulary_size,
    };
    stats.write_to(stats_file)?;

    Ok(())
}

fn directory_size(dir: &Path) -> Result<u64, crate::Error> {
    let mut total = 0u64;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_file() {
            total += metadata.len();
        }
    }
    Ok(total)
}

fn read_boundary(index_dir: &Path) -> Result<Vec<String>, crate::Error> {
    let path = index_dir.join("first_words.txt");
    let contents = fs::read_to_string(&path)
        .map_err(|e| crate::Error::IO(e).with_context(format!("missing {:?}", path)))?;
    Ok(contents
        .split_whitespace()
        .map(|s| s.to_string())
        .collect())
}

fn read_page_count(index_dir: &Path) -> Result<u64, crate::Error> {
    let path = index_dir.join("page_count.txt");
    let contents = fs::read_to_string(&path)
        .map_err(|e| crate::Error::IO(e).with_context(format!("missing {:?}", path)))?;
    contents
        .trim()
        .parse()
        .map_err(|_| crate::Error::parse(format!("malformed page_count.txt: {:?}", contents)))
}

pub fn run_search(index_dir: &Path, queries_file: &Path) -> Result<(), crate::Error> {
    let boundary = read_boundary(index_dir)?;
    let total_doc_count = read_page_count(index_dir)?;
    let title_store = TitleStore::new(index_dir.to_path_buf(), DEFAULT_TITLE_BUCKET_SIZE);

    let queries = fs::File::open(queries_file)?;
    let mut out = fs::File::create("query_op.txt")?;

    for line in BufReader::new(queries).lines() {
        let line = line?;
        let started = Instant::now();
        let terms = query::plan_query(&line);

        let outcome = scorer::run_query(&terms, &boundary, index_dir, total_doc_count, &title_store);
        match outcome {
            Ok(results) if results.is_empty() => {
                writeln!(out, "NO RESULTS FOUND")?;
            }
            Ok(results) => {
                for result in results {
                    writeln!(out, "{}, {}, {}", result.doc_id, result.score, result.title)?;
                }
            }
            Err(crate::Error::ParseError(msg)) => {
                writeln!(out, "ParseError: {}", msg)?;
            }
            Err(other) => return Err(other),
        }

        let elapsed = started.elapsed().as_secs_f64();
        writeln!(out, "Time taken: {:.6} sec", elapsed)?;
        writeln!(out)?;
    }

    Ok(())
}
