//! Partition planning: dividing a corpus into disjoint, statically assigned
//! bags of files, each owning its own slice of the docid space.
//!
//! # INVARIANTS (DO NOT VIOLATE)
//!
//! 1. **ROUND_ROBIN_DETERMINISM**: for a fixed file list and partition count,
//!    `plan` always assigns the same file to the same partition.
//! 2. **OFFSET_MONOTONE**: `docid_offset` is strictly increasing by partition
//!    id, and wide enough that no partition's planned range can overlap the
//!    next one's, even before any worker has run (see DESIGN.md's note on
//!    docid overflow for how the coordinator widens this after execution).

use std::path::{Path, PathBuf};

use crate::types::{Partition, MAX_DOCS_PER_FILE};

/// Splits `files` round-robin across `num_partitions` partitions, each
/// starting at checkpoint 0, and assigns each partition a `docid_offset`
/// wide enough for its planned file count at `MAX_DOCS_PER_FILE` per file.
///
/// Round-robin (rather than contiguous chunks) keeps partitions close in
/// size even when `files.len()` isn't a multiple of `num_partitions`, which
/// matters because every partition is dispatched to one worker and the
/// coordinator waits on the slowest one.
pub fn plan(files: &[PathBuf], num_partitions: usize) -> Vec<Partition> {
    assert!(num_partitions > 0, "at least one partition is required");

    let mut buckets: Vec<Vec<PathBuf>> = vec![Vec::new(); num_partitions];
    for (i, file) in files.iter().enumerate() {
        buckets[i % num_partitions].push(file.clone());
    }

    let mut partitions = Vec::with_capacity(num_partitions);
    let mut next_offset = 0u64;
    for (id, bucket) in buckets.into_iter().enumerate() {
        let mut partition = Partition::new(id, next_offset);
        for file in &bucket {
            partition.push_file(file.clone(), 0);
        }
        partition.planned_file_count = bucket.len();
        next_offset += bucket.len() as u64 * MAX_DOCS_PER_FILE;
        partitions.push(partition);
    }
    partitions
}

/// Widens the `docid_offset` of every partition after `id` to account for
/// `actual_local_docs` exceeding the planning-time estimate for partition
/// `id` (see DESIGN.md's docid-overflow note). Called once per completed
/// worker job, before the next partition in line is dispatched.
pub fn rebase_following(partitions: &mut [Partition], id: usize, actual_local_docs: u64) {
    let planned = partitions[id].planned_file_count as u64 * MAX_DOCS_PER_FILE;
    if actual_local_docs <= planned {
        return;
    }
    let widen_by = actual_local_docs - planned;
    for p in partitions.iter_mut().filter(|p| p.id > id) {
        p.docid_offset += widen_by;
    }
}

/// Returns every path still queued for work across all partitions, in
/// partition order. Used by the coordinator to validate that a resumed run
/// is being pointed at the same corpus it was planned against.
pub fn all_pending_paths(partitions: &[Partition]) -> Vec<&Path> {
    partitions
        .iter()
        .flat_map(|p| p.pending_paths())
        .collect()
}
