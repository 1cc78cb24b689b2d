//! C4 — Merger. K-way merge of Stage-1 shards into fewer, smaller Stage-2
//! shards, recording the boundary vector as it goes (spec §4.4).

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_STAGE2_FLUSH_BYTES: usize = 20 * 1024 * 1024;

struct ShardCursor {
    reader: BufReader<File>,
    current: Option<(String, String)>,
}

impl ShardCursor {
    fn open(path: &Path) -> io::Result<Self> {
        let mut cursor = ShardCursor {
            reader: BufReader::new(File::open(path)?),
            current: None,
        };
        cursor.advance()?;
        Ok(cursor)
    }

    fn advance(&mut self) -> io::Result<()> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line)?;
        if read == 0 {
            self.current = None;
            return Ok(());
        }
        if line.ends_with('\n') {
            line.pop();
        }
        let (term, records) = match line.find(' ') {
            Some(idx) => (line[..idx].to_string(), line[idx + 1..].to_string()),
            None => (line, String::new()),
        };
        self.current = Some((term, records));
        Ok(())
    }
}

/// Min-heap entry keyed on (term, shard index), so equal terms drain in
/// shard-index order and preserve document-id monotonicity across shards.
struct HeapEntry {
    term: String,
    shard_index: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term && self.shard_index == other.shard_index
    }
}
impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the smallest (term, shard_index).
        other
            .term
            .cmp(&self.term)
            .then_with(|| other.shard_index.cmp(&self.shard_index))
    }
}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct MergeOutput {
    pub boundary: Vec<String>,
    pub shard_count: usize,
    pub vocabulary_size: usize,
}

struct Stage2Writer {
    out_dir: PathBuf,
    flush_threshold: usize,
    lines: Vec<String>,
    size_estimate: usize,
    next_shard_index: usize,
    boundary: Vec<String>,
}

impl Stage2Writer {
    fn new(out_dir: PathBuf, flush_threshold: usize) -> Self {
        Stage2Writer {
            out_dir,
            flush_threshold,
            lines: Vec::new(),
            size_estimate: 0,
            next_shard_index: 0,
            boundary: Vec::new(),
        }
    }

    fn push_line(&mut self, term: &str, records: &str) -> io::Result<()> {
        let line = format!("{} {}", term, records);
        self.size_estimate += line.len() + 1;
        self.lines.push(line);
        if self.size_estimate >= self.flush_threshold {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.lines.is_empty() {
            return Ok(());
        }
        self.next_shard_index += 1;
        let path = self
            .out_dir
            .join(format!("index2_{}.txt", self.next_shard_index));
        let first_term = self.lines[0]
            .split(' ')
            .next()
            .unwrap_or_default()
            .to_string();
        self.boundary.push(first_term);
        let mut writer = BufWriter::new(File::create(&path)?);
        for line in &self.lines {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
        self.lines.clear();
        self.size_estimate = 0;
        Ok(())
    }
}

/// K-way merge `shard_paths` (Stage-1) into Stage-2 shards under `out_dir`,
/// deleting the Stage-1 files once the merge has fully committed.
pub fn merge_shards(
    shard_paths: &[PathBuf],
    out_dir: &Path,
    flush_threshold: usize,
) -> Result<MergeOutput, crate::Error> {
    let mut cursors: Vec<ShardCursor> = shard_paths
        .iter()
        .map(|p| ShardCursor::open(p))
        .collect::<io::Result<_>>()?;

    let mut heap = BinaryHeap::new();
    for (idx, cursor) in cursors.iter().enumerate() {
        if let Some((term, _)) = &cursor.current {
            heap.push(HeapEntry {
                term: term.clone(),
                shard_index: idx,
            });
        }
    }

    let mut writer = Stage2Writer::new(out_dir.to_path_buf(), flush_threshold);
    let mut vocabulary_size = 0usize;

    while let Some(top) = heap.peek() {
        let term = top.term.clone();
        let mut merged = String::new();
        while let Some(next) = heap.peek() {
            if next.term != term {
                break;
            }
            let entry = heap.pop().unwrap();
            let idx = entry.shard_index;
            let records = cursors[idx].current.take().map(|(_, r)| r).unwrap_or_default();
            if !merged.is_empty() && !records.is_empty() {
                merged.push(' ');
            }
            merged.push_str(&records);
            cursors[idx].advance()?;
            if let Some((next_term, _)) = &cursors[idx].current {
                heap.push(HeapEntry {
                    term: next_term.clone(),
                    shard_index: idx,
                });
            }
        }
        writer.push_line(&term, &merged)?;
        vocabulary_size += 1;
    }
    writer.flush()?;

    for path in shard_paths {
        fs::remove_file(path)?;
    }

    Ok(MergeOutput {
        boundary: writer.boundary,
        shard_count: writer.next_shard_index,
        vocabulary_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_shard(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
        path
    }

    #[test]
    fn merge_determinism_preserves_doc_id_order() {
        let dir = tempfile::tempdir().unwrap();
        let shard_a = write_shard(dir.path(), "shard_1.txt", &["alpha 1-1"]);
        let shard_b = write_shard(dir.path(), "shard_2.txt", &["alpha 1-2"]);
        let out = merge_shards(&[shard_a, shard_b], dir.path(), 20 * 1024 * 1024).unwrap();
        assert_eq!(out.vocabulary_size, 1);
        let contents = fs::read_to_string(dir.path().join("index2_1.txt")).unwrap();
        assert_eq!(contents.trim(), "alpha 1-1 1-2");
    }

    #[test]
    fn stage1_files_deleted_after_merge() {
        let dir = tempfile::tempdir().unwrap();
        let shard = write_shard(dir.path(), "shard_1.txt", &["term 1-1"]);
        merge_shards(&[shard.clone()], dir.path(), 20 * 1024 * 1024).unwrap();
        assert!(!shard.exists());
    }

    #[test]
    fn boundary_vector_records_first_term_of_each_flush() {
        let dir = tempfile::tempdir().unwrap();
        let shard = write_shard(
            dir.path(),
            "shard_1.txt",
            &["apple 1-1", "banana 1-1", "cherry 1-1"],
        );
        // flush every line by making the threshold tiny.
        let out = merge_shards(&[shard], dir.path(), 1).unwrap();
        assert_eq!(out.boundary, vec!["apple", "banana", "cherry"]);
        assert_eq!(out.shard_count, 3);
    }
}
