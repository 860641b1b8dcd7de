//! # Checksum Module
//!
//! SHA-256 content digests, used only to answer "are these two files
//! byte-for-byte the same?". Digests are never ordered or used as identity
//! beyond exact equality.

use crate::error::DigestError;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Read buffer size; memory use stays flat regardless of file size
const CHUNK_SIZE: usize = 64 * 1024;

/// A SHA-256 digest of a file's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Stream a file through SHA-256 in fixed-size chunks
pub fn digest_file(path: &Path) -> Result<ContentDigest, DigestError> {
    let read_err = |source| DigestError::Read {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_err)?;
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buffer).map_err(read_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    Ok(ContentDigest(bytes))
}

/// Memoizing digest service for a single run.
///
/// A file is compared against several candidates while its name is being
/// resolved; each file is still read at most once.
#[derive(Debug, Default)]
pub struct ChecksumService {
    cache: HashMap<PathBuf, ContentDigest>,
}

impl ChecksumService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Digest of `path`, computed on first use
    pub fn digest(&mut self, path: &Path) -> Result<ContentDigest, DigestError> {
        if let Some(digest) = self.cache.get(path) {
            return Ok(*digest);
        }
        let digest = digest_file(path)?;
        tracing::trace!("sha256 {} {}", digest, path.display());
        self.cache.insert(path.to_path_buf(), digest);
        Ok(digest)
    }

    /// True when both files have bit-equal digests
    pub fn same_content(&mut self, a: &Path, b: &Path) -> Result<bool, DigestError> {
        Ok(self.digest(a)? == self.digest(b)?)
    }

    /// Number of files digested so far
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
