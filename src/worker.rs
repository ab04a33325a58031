//! Shard worker steps: streamize → tokenize/normalize → index → flush
//! (§4.3). Runs inside the child process spawned by [`crate::procpool`].
//!
//! # INVARIANTS (DO NOT VIOLATE)
//!
//! 1. **DOCID_ADVANCES_ONLY_AFTER_FLUSH**: the caller's `docid` counter is
//!    only advanced once step 4's writes have both landed on disk (via
//!    write-then-rename). A failure anywhere in steps 1-3 leaves `docid`
//!    untouched.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::archive::{self, ArchiveDoc};
use crate::codec;
use crate::error::Result;
use crate::types::{DocDescriptor, InvertedMap, Posting};

/// Everything the shard worker produced from one `(path, cursor)` job.
pub struct ShardResult {
    pub new_docid: u64,
    pub completed: bool,
    pub next_cursor: u64,
    pub run_file: PathBuf,
    pub url_mapping_fragment: PathBuf,
    pub total_doc_len: u64,
}

/// Runs steps 1-4 against `path` starting at `cursor`, writing a run-file
/// fragment and a url-mapping fragment under `scratch_dir`.
///
/// `docid_offset` and `docid` come from the partition's current state;
/// `docid` is the next unused *local* docid to assign. Fragment file names
/// are derived from `partition_id` and `cursor` so repeated calls for the
/// same partition never collide.
pub fn run_shard(
    partition_id: usize,
    docid_offset: u64,
    docid: u64,
    path: &Path,
    cursor: u64,
    max_read_bytes: u64,
    scratch_dir: &Path,
) -> Result<ShardResult> {
    // Step 1: streamize.
    let stream = archive::streamize(path, cursor, max_read_bytes)?;

    // Step 2 + 3: tokenize/normalize, then assign docids and index.
    let mut inverted: InvertedMap = InvertedMap::new();
    let mut descriptors = Vec::with_capacity(stream.docs.len());
    let mut local_docid = docid;
    let mut total_doc_len = 0u64;

    for ArchiveDoc { url, text, doc_len } in &stream.docs {
        let terms = crate::tokenize::tokenize_and_normalize(text);
        let mut freqs: HashMap<&str, u32> = HashMap::new();
        for term in &terms {
            *freqs.entry(term.as_str()).or_insert(0) += 1;
        }
        for (term, freq) in freqs {
            inverted.entry(term.to_string()).or_default().push(Posting {
                docid: local_docid,
                freq,
            });
        }
        descriptors.push(DocDescriptor {
            docid: local_docid + docid_offset,
            doc_len: *doc_len,
            url: url.clone(),
        });
        total_doc_len += doc_len;
        local_docid += 1;
    }

    // Step 4: flush, atomically.
    let run_file = scratch_dir.join(format!("run-{partition_id}-{cursor}.part"));
    write_atomically(&run_file, |w| codec::write_inverted_map(&inverted, w, docid_offset))?;

    let url_mapping_fragment = scratch_dir.join(format!("urls-{partition_id}-{cursor}.part"));
    write_atomically(&url_mapping_fragment, |w| codec::write_url_mapping(w, &descriptors))?;

    Ok(ShardResult {
        new_docid: local_docid,
        completed: stream.completed,
        next_cursor: stream.next_cursor,
        run_file,
        url_mapping_fragment,
        total_doc_len,
    })
}

/// Writes to a `.tmp` sibling of `path` and renames it into place, so a
/// crash mid-write never leaves a partially-written fragment where the
/// merge or assembly step could see it.
fn write_atomically(
    path: &Path,
    body: impl FnOnce(&mut BufWriter<File>) -> Result<()>,
) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        body(&mut writer)?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
