use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use landed_domain::Record;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::error::SilverError;

/// Disk-backed hash partitioning of a record stream by natural key (§4.8
/// "external-sort strategy"): each record is appended as one JSON line to
/// the bucket its key hashes into, so a full-pass model never holds more
/// than one bucket's worth of a partition in memory at once. Mirrors
/// `landed_chunk`'s own staging-directory idiom, one level lower — scratch
/// files instead of a scratch directory.
pub struct BucketSet {
    files: Vec<NamedTempFile>,
    writers: Vec<BufWriter<File>>,
}

impl BucketSet {
    pub fn new(count: usize) -> Result<Self, SilverError> {
        let count = count.max(1);
        let mut files = Vec::with_capacity(count);
        let mut writers = Vec::with_capacity(count);
        for _ in 0..count {
            let file = NamedTempFile::new()?;
            writers.push(BufWriter::new(file.reopen()?));
            files.push(file);
        }
        Ok(Self { files, writers })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Hashes `key_bytes` into `[0, count)`. SHA-256 reuses the same primitive
    /// the manifest checksum already depends on, rather than pulling in a
    /// second hashing crate for one `u64`.
    pub fn index_for(key_bytes: &[u8], count: usize) -> usize {
        let mut hasher = Sha256::new();
        hasher.update(key_bytes);
        let digest = hasher.finalize();
        let value = u64::from_be_bytes(digest[0..8].try_into().expect("sha256 digest is at least 8 bytes"));
        (value % count as u64) as usize
    }

    pub fn append(&mut self, index: usize, record: &Record) -> Result<(), SilverError> {
        let line = serde_json::to_string(record)?;
        writeln!(self.writers[index], "{line}")?;
        Ok(())
    }

    /// Flushes every bucket writer. The returned `NamedTempFile`s must stay
    /// alive until their contents are read back — dropping one deletes it.
    pub fn finish(mut self) -> Result<Vec<NamedTempFile>, SilverError> {
        for writer in &mut self.writers {
            writer.flush()?;
        }
        Ok(self.files)
    }
}

pub fn read_bucket(path: &std::path::Path) -> Result<Vec<Record>, SilverError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}
