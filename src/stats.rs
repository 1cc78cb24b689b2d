//! Human-readable index statistics, written to the indexer's `<stats-file>`
//! (spec §6).

use std::fs;
use std::io;
use std::path::Path;

pub struct Stats {
    /// Sum of every file's size in the index directory, taken after Stage-1
    /// shards are removed but before `first_words.txt`/`page_count.txt`/this
    /// stats file itself are written.
    pub on_disk_bytes: u64,
    /// Stage-2 shard count.
    pub shard_count: usize,
    /// Title bucket count.
    pub title_bucket_count: usize,
    pub vocabulary_size: usize,
}

impl Stats {
    pub fn render(&self) -> String {
        let gb = self.on_disk_bytes as f64 / 1e9;
        let file_count = self.shard_count + self.title_bucket_count + 2;
        format!(
            "Index size in GB: {}\nNumber of files in which the inverted index is split: {}\nNumber of tokens in the inverted index: {} ",
            gb, file_count, self.vocabulary_size
        )
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_expected_fields() {
        let stats = Stats {
            on_disk_bytes: 2_000_000_000,
            shard_count: 4,
            title_bucket_count: 3,
            vocabulary_size: 12_345,
        };
        let rendered = stats.render();
        assert!(rendered.contains("Index size in GB: 2"));
        assert!(rendered.contains("Number of files in which the inverted index is split: 9"));
        assert!(rendered.contains("Number of tokens in the inverted index: 12345 "));
    }
}
