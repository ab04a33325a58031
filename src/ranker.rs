//! DAAT ranked retrieval: TF-IDF and BM25 scoring over an assembled index
//! file (§4.6).
//!
//! # INVARIANTS (DO NOT VIOLATE)
//!
//! 1. **BM25_PARENTHESIZATION**: the BM25 numerator of the first factor is
//!    `f*(k1+1)` divided by the bare frequency `f`, not by
//!    `f + k1*(1-b+b*dl/avgdl)` as in the textbook formula. This is
//!    intentional, not a bug — do not "fix" it.
//! 2. **ONE_PUSH_PER_DOCID**: the DAAT loop accumulates every term's
//!    contribution for a candidate docid before a single `heap.push`.
//! 3. **TOP_K_TIE_BREAK**: equal scores are broken by lower docid first.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::codec;
use crate::error::Result;
use crate::mark_index::MarkIndex;
use crate::types::{Posting, QueryResult, RankerKind, ScoredResult};

const K1: f64 = 1.5;
const B: f64 = 0.75;
const TOP_K: usize = 10;

fn idf(n: f64, df: f64) -> f64 {
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

fn tfidf_contribution(idf: f64, f: f64, doc_len: f64) -> f64 {
    (f / doc_len.max(1.0)) * idf
}

/// `idf * ( f*(k1+1) / f + k1*(1-b+b*dl/avgdl) )`, parenthesized exactly as
/// pinned in §4.6: the first factor's denominator is the bare frequency
/// `f`, not the textbook `f + k1*(1-b+b*dl/avgdl)`.
fn bm25_contribution(idf: f64, f: f64, doc_len: f64, avg_doc_len: f64) -> f64 {
    idf * (f * (K1 + 1.0) / f + K1 * (1.0 - B + B * doc_len / avg_doc_len))
}

/// A scored candidate in the bounded min-heap; ordered so the heap's `pop`
/// always removes the *worst* candidate (lowest score, tie-broken by
/// higher docid, since the heap's natural max comes out first and we want
/// to evict the minimum).
#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapEntry {
    score: f64,
    docid: u64,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so `BinaryHeap` (a max-heap) behaves as the required
        // min-heap of size <= TOP_K: the smallest score sits at the top,
        // ready to be evicted first when the heap overflows.
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.docid.cmp(&other.docid))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Everything the ranker loads once per run, shared read-only by every
/// concurrent query.
pub struct RankerContext {
    index_path: PathBuf,
    kind: RankerKind,
    url_mapping: HashMap<u64, (u64, String)>,
    num_docs: u64,
    max_docid: u64,
    avg_doc_len: f64,
    mark_index: MarkIndex,
    /// Per-term postings resolved once at init; cache misses during
    /// scoring are rare (a query term discovered late) and go through
    /// `cache_miss_lock`.
    term_cache: HashMap<String, Vec<Posting>>,
    not_found: Vec<String>,
    cache_miss_lock: Mutex<()>,
    max_read_chars: usize,
}

impl RankerContext {
    /// Reads the url-mapping block and index-metadata trailer, builds the
    /// mark index over the postings region, tokenizes `queries` to collect
    /// the distinct term set `U`, and resolves each term in `U` once.
    pub fn load(
        index_path: &Path,
        kind: RankerKind,
        queries: &[String],
        max_read_chars: usize,
    ) -> Result<Self> {
        let (url_mapping, after_urls) = codec::read_url_mapping(index_path, 0)?;
        let (metadata, postings_start) = codec::read_index_metadata(index_path, after_urls)?;
        let mark_index = MarkIndex::build(index_path, postings_start)?;

        let mut distinct_terms: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        for query in queries {
            for term in crate::tokenize::tokenize_and_normalize(query) {
                distinct_terms.insert(term);
            }
        }

        let mut term_cache = HashMap::new();
        let mut not_found = Vec::new();
        for term in &distinct_terms {
            match mark_index.locate(index_path, term, max_read_chars)? {
                Some(postings) => {
                    term_cache.insert(term.clone(), postings);
                }
                None => not_found.push(term.clone()),
            }
        }

        Ok(Self {
            index_path: index_path.to_path_buf(),
            kind,
            url_mapping,
            num_docs: metadata.num_docs,
            max_docid: metadata.max_docid,
            avg_doc_len: metadata.avg_doc_len,
            mark_index,
            term_cache,
            not_found,
            cache_miss_lock: Mutex::new(()),
            max_read_chars,
        })
    }

    pub fn not_found(&self) -> &[String] {
        &self.not_found
    }

    fn doc_len(&self, docid: u64) -> u64 {
        self.url_mapping.get(&docid).map(|(len, _)| *len).unwrap_or(0)
    }

    fn url(&self, docid: u64) -> String {
        self.url_mapping
            .get(&docid)
            .map(|(_, url)| url.clone())
            .unwrap_or_default()
    }

    /// Resolves a term not already in the cache, serialized behind
    /// `cache_miss_lock` since it touches the index file.
    fn resolve(&self, term: &str) -> Result<Vec<Posting>> {
        if let Some(postings) = self.term_cache.get(term) {
            return Ok(postings.clone());
        }
        let _guard = self.cache_miss_lock.lock();
        Ok(self
            .mark_index
            .locate(&self.index_path, term, self.max_read_chars)?
            .unwrap_or_default())
    }

    fn idf(&self, df: u64) -> f64 {
        idf(self.num_docs as f64, df as f64)
    }

    fn contribution(&self, df: u64, docid: u64, freq: u32) -> f64 {
        let f = freq as f64;
        let idf = self.idf(df);
        let dl = self.doc_len(docid) as f64;
        match self.kind {
            RankerKind::TfIdf => tfidf_contribution(idf, f, dl),
            RankerKind::Bm25 => bm25_contribution(idf, f, dl, self.avg_doc_len.max(1.0)),
        }
    }

    /// Runs one query's DAAT scan over `0..max_docid`, returning its
    /// top-10 results highest-score first.
    pub fn score_query(&self, query: &str) -> Result<QueryResult> {
        let terms = crate::tokenize::tokenize_and_normalize(query);

        let mut postings_by_term = Vec::new();
        for term in &terms {
            let postings = self.resolve(term)?;
            if !postings.is_empty() {
                postings_by_term.push((term.clone(), postings, 0usize));
            }
        }

        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(TOP_K + 1);

        for target_docid in 0..self.max_docid {
            let mut score = 0.0;
            for (_, postings, idx) in &mut postings_by_term {
                while *idx < postings.len() && postings[*idx].docid < target_docid {
                    *idx += 1;
                }
                if *idx < postings.len() && postings[*idx].docid == target_docid {
                    let df = postings.len() as u64;
                    score += self.contribution(df, target_docid, postings[*idx].freq);
                    *idx += 1;
                }
            }
            if score > 0.0 {
                heap.push(HeapEntry {
                    score,
                    docid: target_docid,
                });
                if heap.len() > TOP_K {
                    heap.pop();
                }
            }
        }

        let mut entries: Vec<HeapEntry> = heap.into_vec();
        entries.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.docid.cmp(&b.docid))
        });

        let results = entries
            .into_iter()
            .map(|e| ScoredResult {
                url: self.url(e.docid),
                score: round1(e.score),
            })
            .collect();

        Ok(QueryResult {
            query: query.to_string(),
            results,
        })
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
