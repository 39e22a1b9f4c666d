//! Content addressing for source files.
//!
//! Every file is fingerprinted as `sha256:<hex>`. A task's whole source set is
//! summarized by a Merkle root computed over the sorted `(path, digest)`
//! pairs, so a single comparison tells whether anything moved.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{Error, Result};

const DIGEST_PREFIX: &str = "sha256:";

/// A `sha256:<hex>` content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileDigest(String);

impl FileDigest {
    fn from_hasher(hasher: Sha256) -> Self {
        FileDigest(format!("{}{:x}", DIGEST_PREFIX, hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The lowercase hex part without the algorithm prefix.
    pub fn hex(&self) -> &str {
        self.0.strip_prefix(DIGEST_PREFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileDigest {
    fn from(value: &str) -> Self {
        FileDigest(value.to_string())
    }
}

/// Aggregate digest over a [`FileSet`]. Same shape as a file digest.
pub type MerkleRoot = FileDigest;

/// Relative path to digest, kept sorted by path.
pub type FileSet = BTreeMap<String, FileDigest>;

/// A file that was resolved but could not be hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Streams a file through SHA-256.
pub fn hash_file(path: impl AsRef<Path>) -> Result<FileDigest> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::PathIo {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher).map_err(|source| Error::PathIo {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(FileDigest::from_hasher(hasher))
}

/// Computes the Merkle root of a file set.
///
/// Lines of the form `<path>:<digest>\n` are fed in path order into a single
/// hasher. An empty set yields the digest of the empty byte sequence.
pub fn compute_merkle_root(files: &FileSet) -> MerkleRoot {
    let mut hasher = Sha256::new();
    for (path, digest) in files {
        hasher.update(path.as_bytes());
        hasher.update(b":");
        hasher.update(digest.as_str().as_bytes());
        hasher.update(b"\n");
    }
    FileDigest::from_hasher(hasher)
}

/// Hashes resolved paths (relative to `root`) into a file set.
///
/// Files that vanished or became unreadable since resolution are reported
/// back instead of failing the whole set.
pub fn hash_files(root: &Path, paths: &[String]) -> (FileSet, Vec<SkippedFile>) {
    let results: Vec<(String, Result<FileDigest>)> = paths
        .par_iter()
        .map(|rel| (rel.clone(), hash_file(root.join(rel))))
        .collect();

    let mut files = FileSet::new();
    let mut skipped = Vec::new();
    for (rel, result) in results {
        match result {
            Ok(digest) => {
                debug!(path = %rel, %digest, "hashed file");
                files.insert(rel, digest);
            }
            Err(e) => {
                warn!(path = %rel, error = %e, "skipping file that could not be hashed");
                skipped.push(SkippedFile {
                    path: rel,
                    reason: e.to_string(),
                });
            }
        }
    }
    skipped.sort_by(|a, b| a.path.cmp(&b.path));

    (files, skipped)
}
