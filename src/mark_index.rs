//! Sparse term → byte-offset map over an index file's postings region
//! (§4.5), letting the ranker seek near a target term instead of scanning
//! from the start of the file.
//!
//! # INVARIANTS (DO NOT VIOLATE)
//!
//! 1. **MARKS_ASCEND**: mark keys (first term of each scanned block) are
//!    strictly ascending, matching the codec's `ASCENDING_TERMS` guarantee.
//! 2. **SEEK_NEVER_OVERSHOOTS**: `locate` always seeks to an offset at or
//!    before the target term's line.

use std::collections::BTreeMap;
use std::path::Path;

use crate::codec;
use crate::error::{IndexError, Result};
use crate::types::InvertedMap;

/// Byte span, roughly, between consecutive marks. Matches the 1 MiB
/// granularity named in §4.5; in characters since the codec's reader
/// budgets in chars.
const MARK_STEP_CHARS: usize = 1 << 20;

/// `first_term_of_block -> byte_offset_where_block_begins`.
pub struct MarkIndex {
    marks: BTreeMap<String, u64>,
}

impl MarkIndex {
    /// Scans the postings region of `path` starting at `postings_start`,
    /// recording one mark per `MARK_STEP_CHARS`-sized block.
    pub fn build(path: &Path, postings_start: u64) -> Result<Self> {
        let mut marks = BTreeMap::new();
        let mut cursor = postings_start;

        loop {
            let (block, next) = codec::read_next(path, cursor, MARK_STEP_CHARS)?;
            if let Some(first_term) = block.keys().next() {
                marks.insert(first_term.clone(), cursor);
            }
            match next {
                Some(next_cursor) => cursor = next_cursor,
                None => break,
            }
        }

        Ok(Self { marks })
    }

    /// Finds the largest mark term `<= target`, seeks there, and scans
    /// block-by-block (re-using the codec's `max_chars` budget) until
    /// `target`'s line is found or a term past it is observed.
    ///
    /// Returns `None` if `target` genuinely is not in the index (a term
    /// past it was observed before a match, or the file ended). Per §7, a
    /// mark promising a term's presence that then fails to produce it on
    /// re-scan is a bug (`IndexError::MarkIndexInconsistency`), not this
    /// "not present at all" case.
    pub fn locate(
        &self,
        path: &Path,
        target: &str,
        max_chars: usize,
    ) -> Result<Option<Vec<crate::types::Posting>>> {
        let start = match self.marks.range(..=target.to_string()).next_back() {
            Some((_, &offset)) => offset,
            None => 0,
        };

        let mut cursor = start;
        loop {
            let (block, next) = codec::read_next(path, cursor, max_chars)?;
            if let Some(postings) = block.get(target) {
                return Ok(Some(postings.clone()));
            }
            if block.keys().any(|k| k.as_str() > target) {
                return Ok(None);
            }
            match next {
                Some(next_cursor) => cursor = next_cursor,
                None => return Ok(None),
            }
        }
    }

    /// Confirms a term the mark index itself placed a mark under is still
    /// reachable by a direct re-scan from that mark, surfacing a structural
    /// inconsistency rather than silently treating it as "not found".
    pub fn confirm_present(&self, path: &Path, target: &str, max_chars: usize) -> Result<InvertedMap> {
        match self.locate(path, target, max_chars)? {
            Some(postings) => {
                let mut map = InvertedMap::new();
                map.insert(target.to_string(), postings);
                Ok(map)
            }
            None => Err(IndexError::MarkIndexInconsistency(target.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}
