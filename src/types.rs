//! Core data model: postings, inverted maps, document descriptors, and the
//! partition bookkeeping the coordinator hands out to workers.
//!
//! # INVARIANTS (DO NOT VIOLATE)
//!
//! 1. **POSTING_SORTED**: an inverted list's postings are sorted strictly
//!    ascending by docid, with no two postings sharing a docid.
//! 2. **DISJOINT_DOCID_RANGES**: two partitions never share a docid in
//!    `[docid_offset, docid_offset + pending_files.len() * MAX_DOCS_PER_FILE)`.
//! 3. **TERM_SHAPE**: a term is non-empty UTF-8, at most 20 bytes, lowercase,
//!    and contains neither a space nor a comma.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Planning-time cap on docids reserved per pending file in a partition.
pub const MAX_DOCS_PER_FILE: u64 = 12_000;

/// Maximum length, in bytes, of a stored term (post-stemming).
pub const MAX_TERM_LEN: usize = 20;

/// A single (docid, freq) entry in an inverted list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Posting {
    pub docid: u64,
    pub freq: u32,
}

/// Mapping from term to its sorted inverted list.
///
/// `BTreeMap` keeps terms in ascending byte-lexical order for free, which is
/// exactly the order the codec must emit them in (§4.1).
pub type InvertedMap = BTreeMap<String, Vec<Posting>>;

/// One line of the url-mapping block: a document's length and source URL.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DocDescriptor {
    pub docid: u64,
    pub doc_len: u64,
    pub url: String,
}

/// The three scalars stored in the index-metadata trailer.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IndexMetadata {
    pub num_docs: u64,
    pub max_docid: u64,
    pub avg_doc_len: f64,
}

impl IndexMetadata {
    /// `avg_doc_len` must avoid division by zero on an empty corpus.
    pub fn new(num_docs: u64, max_docid: u64, total_doc_len: u64) -> Self {
        let avg_doc_len = if num_docs == 0 {
            0.0
        } else {
            total_doc_len as f64 / num_docs as f64
        };
        Self {
            num_docs,
            max_docid,
            avg_doc_len,
        }
    }
}

/// A disjoint, statically assigned slice of the corpus and docid space owned
/// by one worker session (spec's "Subindex").
///
/// `pending_files` preserves insertion order so round-robin planning and
/// resumption are deterministic within one run; iteration order across an
/// equivalent implementation is not guaranteed by the spec, only
/// determinism within a single run is required.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Partition {
    pub id: usize,
    pub docid_offset: u64,
    pub docid: u64,
    /// File count at planning time, fixed once by [`crate::partition::plan`]
    /// and never touched by `push_file`/`pop_file`. `len()` shrinks and
    /// grows as files are dispatched and requeued, so it cannot stand in
    /// for this when computing the planned docid budget post-hoc.
    pub planned_file_count: usize,
    pending_files: Vec<(PathBuf, u64)>,
}

impl Partition {
    pub fn new(id: usize, docid_offset: u64) -> Self {
        Self {
            id,
            docid_offset,
            docid: 0,
            planned_file_count: 0,
            pending_files: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.pending_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_files.is_empty()
    }

    /// Pushes a file onto the partition's work queue at the given checkpoint
    /// (0 for an untouched file). Panics if the path is already queued,
    /// since every path may appear at most once per partition.
    pub fn push_file(&mut self, path: PathBuf, checkpoint: u64) {
        debug_assert!(
            !self.pending_files.iter().any(|(p, _)| p == &path),
            "path {:?} pushed twice onto partition {}",
            path,
            self.id
        );
        self.pending_files.push((path, checkpoint));
    }

    /// Pops an arbitrary pending file. The coordinator tolerates whatever
    /// order this returns; only determinism within one run matters.
    pub fn pop_file(&mut self) -> Option<(PathBuf, u64)> {
        self.pending_files.pop()
    }

    /// Paths still queued, in insertion order.
    pub fn pending_paths(&self) -> Vec<&std::path::Path> {
        self.pending_files.iter().map(|(p, _)| p.as_path()).collect()
    }
}

/// Which ranking function the processor uses to score postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RankerKind {
    TfIdf,
    Bm25,
}

impl std::str::FromStr for RankerKind {
    type Err = crate::error::IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TFIDF" => Ok(RankerKind::TfIdf),
            "BM25" => Ok(RankerKind::Bm25),
            other => Err(crate::error::IndexError::Config(format!(
                "invalid ranker type '{other}', expected TFIDF or BM25"
            ))),
        }
    }
}

/// A single ranked result: a URL and its score.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ScoredResult {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "Score")]
    pub score: f64,
}

/// Output of one query: `{"Query": ..., "Results": [...]}` (C7).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct QueryResult {
    #[serde(rename = "Query")]
    pub query: String,
    #[serde(rename = "Results")]
    pub results: Vec<ScoredResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn avg_doc_len_avoids_division_by_zero() {
        let meta = IndexMetadata::new(0, 0, 0);
        assert_eq!(meta.avg_doc_len, 0.0);
    }

    #[test]
    fn partition_docid_range_matches_pending_files() {
        let mut p = Partition::new(2, 24_000);
        p.push_file(PathBuf::from("a.warc"), 0);
        p.push_file(PathBuf::from("b.warc"), 0);
        assert_eq!(p.len(), 2);
        let range_end = p.docid_offset + (p.len() as u64) * MAX_DOCS_PER_FILE;
        assert_eq!(range_end, 24_000 + 24_000);
    }

    #[test]
    #[should_panic]
    fn push_file_twice_panics_in_debug() {
        let mut p = Partition::new(0, 0);
        p.push_file(PathBuf::from("a.warc"), 0);
        p.push_file(PathBuf::from("a.warc"), 5);
    }
}
