//! C5 — Title Store reader. Titles were written in fixed-size buckets by
//! `shard_writer::TitleBucketWriter`; this resolves a document id back to its
//! title by mapping only the one bucket file that can contain it (spec §4.5).

use crate::DocId;
use memmap::Mmap;
use std::fs::File;
use std::path::PathBuf;

pub struct TitleStore {
    index_dir: PathBuf,
    bucket_size: u64,
}

impl TitleStore {
    pub fn new(index_dir: PathBuf, bucket_size: usize) -> Self {
        TitleStore {
            index_dir,
            bucket_size: bucket_size as u64,
        }
    }

    /// Bucket index for document id `d`: `ceil(d / B)`; line offset within
    /// that bucket: `((d - 1) mod B) + 1`.
    fn locate(&self, doc_id: DocId) -> (u64, u64) {
        let d = doc_id.get();
        let bucket = (d - 1) / self.bucket_size + 1;
        let line_offset = (d - 1) % self.bucket_size + 1;
        (bucket, line_offset)
    }

    pub fn lookup(&self, doc_id: DocId) -> Result<String, crate::Error> {
        if doc_id.get() == 0 {
            return Err(crate::Error::parse("document id 0 is not valid"));
        }
        let (bucket, line_offset) = self.locate(doc_id);
        let path = self.index_dir.join(format!("title_{}.txt", bucket));
        let file = File::open(&path)
            .map_err(|e| crate::Error::IO(e).with_context(format!("opening {:?}", path)))?;
        let mmap = unsafe { Mmap::map(&file)? };

        let mut line_no = 0u64;
        let mut start = 0usize;
        for (i, &byte) in mmap.iter().enumerate() {
            if byte == b'\n' {
                line_no += 1;
                if line_no == line_offset {
                    return Ok(String::from_utf8_lossy(&mmap[start..i]).into_owned());
                }
                start = i + 1;
            }
        }
        Err(crate::Error::parse(format!(
            "title line {} not found in {:?}",
            line_offset, path
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shard_writer::TitleBucketWriter;

    #[test]
    fn looks_up_titles_across_bucket_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = TitleBucketWriter::new(dir.path().to_path_buf(), 2);
        writer.add_title("alpha").unwrap();
        writer.add_title("beta").unwrap();
        writer.add_title("gamma").unwrap();
        writer.flush().unwrap();

        let store = TitleStore::new(dir.path().to_path_buf(), 2);
        assert_eq!(store.lookup(DocId::new(1)).unwrap(), "alpha");
        assert_eq!(store.lookup(DocId::new(2)).unwrap(), "beta");
        assert_eq!(store.lookup(DocId::new(3)).unwrap(), "gamma");
    }
}
