//! Indexer coordinator: planning, dispatching the process pool, and
//! assembling the final index file (§4.4).
//!
//! # INVARIANTS (DO NOT VIOLATE)
//!
//! 1. **SINGLE_OWNER**: the coordinator is the only thread that mutates
//!    partition state; workers are separate processes operating on copies.
//! 2. **DISJOINT_RANGES_PRESERVED**: [`crate::partition::rebase_following`]
//!    runs after every completed job, before the next partition dispatches,
//!    so docid ranges never overlap even when a file yields more records
//!    than planned.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use crate::codec;
use crate::error::{IndexError, Result};
use crate::partition::{self};
use crate::procpool::{self, WorkerJob, WorkerOutcome};
use crate::types::{IndexMetadata, Partition};

fn create_progress_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg} [{bar:30.cyan/blue}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

/// Planner-computed knobs, derived once from the memory budget and corpus
/// size (§4.4).
#[derive(Debug, Clone, Copy)]
pub struct Plan {
    pub max_workers: usize,
    pub num_partitions: usize,
    pub max_docs_per_worker: u64,
    pub max_read_bytes: u64,
    pub max_read_chars: usize,
    pub memory_cap_per_worker: u64,
}

impl Plan {
    /// `memory_limit_bytes` is the indexer's full memory budget
    /// (`-m <MB>` converted to bytes by the caller).
    pub fn compute(memory_limit_bytes: u64, num_files: usize) -> Self {
        let max_workers = num_files.min(6).max(1);
        let safe = 0.5 * memory_limit_bytes as f64;
        let max_docs_per_worker = (safe / (0.4 * 1024.0 * 1024.0 * max_workers as f64)).max(25.0) as u64;
        let num_partitions = num_files.min(2 * max_workers).max(1);

        let kib = memory_limit_bytes as f64 / 1024.0;
        let max_read_bytes = (kib * kib * 16_384.0 * 8.0) as u64;
        let max_read_chars = (kib * kib * 8.0 * 1024.0 * 1024.0) as usize;

        Self {
            max_workers,
            num_partitions,
            max_docs_per_worker,
            max_read_bytes,
            max_read_chars,
            memory_cap_per_worker: memory_limit_bytes / (max_workers as u64 + 1),
        }
    }
}

/// Everything produced by a full indexer run, before the final summary is
/// printed.
pub struct BuildReport {
    pub num_docs: u64,
    pub max_docid: u64,
    pub total_doc_len: u64,
    pub index_size_bytes: u64,
    pub num_lists: u64,
    pub total_postings: u64,
    pub elapsed: Duration,
}

/// A job-execution strategy: either hands a [`WorkerJob`] to a forked
/// worker process ([`procpool::run_job`], used by the real `indexer`
/// binary) or runs the same shard-worker steps in-process (used by tests,
/// where `std::env::current_exe()` is the test binary and doesn't know the
/// hidden `--spimi-worker` flag).
pub type JobRunner = fn(&WorkerJob) -> Result<procpool::WorkerJobResult>;

/// Runs the full build: plan, dispatch workers over the process pool,
/// assemble the final index file at `index_path`.
pub fn run_build(
    corpus_dir: &Path,
    index_path: &Path,
    memory_limit_bytes: u64,
) -> Result<BuildReport> {
    run_build_with(corpus_dir, index_path, memory_limit_bytes, procpool::run_job)
}

/// Same as [`run_build`] but runs each shard directly on a scoped thread
/// instead of forking a worker process. Exists for integration tests,
/// which run inside the test harness binary rather than the `indexer`
/// binary that knows how to re-invoke itself with `--spimi-worker`.
pub fn run_build_for_test(
    corpus_dir: &Path,
    index_path: &Path,
    memory_limit_bytes: u64,
) -> Result<BuildReport> {
    run_build_with(corpus_dir, index_path, memory_limit_bytes, run_job_in_process)
}

/// Runs a [`WorkerJob`]'s shard-worker steps directly in the calling
/// process, skipping both the child-process fork and the `RLIMIT_AS` cap
/// (which would apply to the whole test binary, not just the job).
fn run_job_in_process(job: &WorkerJob) -> Result<procpool::WorkerJobResult> {
    let scratch_dir = job.path.parent().unwrap_or_else(|| Path::new("."));
    let outcome = match crate::worker::run_shard(
        job.partition_id,
        job.docid_offset,
        job.docid,
        &job.path,
        job.cursor,
        job.max_read_bytes,
        scratch_dir,
    ) {
        Ok(shard) => WorkerOutcome::Success {
            new_docid: shard.new_docid,
            completed: shard.completed,
            next_cursor: shard.next_cursor,
            run_file: shard.run_file,
            url_mapping_fragment: shard.url_mapping_fragment,
            total_doc_len: shard.total_doc_len,
        },
        Err(e) => WorkerOutcome::Failure { reason: e.to_string() },
    };
    Ok(procpool::WorkerJobResult { partition_id: job.partition_id, outcome })
}

fn run_build_with(
    corpus_dir: &Path,
    index_path: &Path,
    memory_limit_bytes: u64,
    run_job: JobRunner,
) -> Result<BuildReport> {
    let started = Instant::now();

    let mut files: Vec<PathBuf> = std::fs::read_dir(corpus_dir)
        .map_err(|e| IndexError::Corpus {
            path: corpus_dir.to_path_buf(),
            reason: e.to_string(),
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(IndexError::Config(format!(
            "corpus directory '{}' contains no files",
            corpus_dir.display()
        )));
    }

    let plan = Plan::compute(memory_limit_bytes, files.len());
    tracing::info!(?plan, num_files = files.len(), "planned indexer run");

    let mut partitions = partition::plan(&files, plan.num_partitions);

    let scratch_dir = index_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!(
            "{}.scratch",
            index_path.file_name().and_then(|n| n.to_str()).unwrap_or("index")
        ));
    std::fs::create_dir_all(&scratch_dir)?;

    let (num_docs, max_docid, total_doc_len, run_files, url_fragments) =
        dispatch(&mut partitions, &plan, &scratch_dir, run_job)?;

    let index_file = File::create(index_path)?;
    let mut writer = BufWriter::new(index_file);

    assemble_url_mapping(&url_fragments, &mut writer)?;
    let metadata = IndexMetadata::new(num_docs, max_docid, total_doc_len);
    codec::write_index_metadata(&mut writer, &metadata)?;
    writer.flush()?;
    drop(writer);

    let (num_lists, total_postings) = merge_run_files(run_files, index_path, plan.max_read_chars)?;

    let index_size_bytes = std::fs::metadata(index_path)?.len();
    std::fs::remove_dir_all(&scratch_dir).ok();

    Ok(BuildReport {
        num_docs,
        max_docid,
        total_doc_len,
        index_size_bytes,
        num_lists,
        total_postings,
        elapsed: started.elapsed(),
    })
}

/// Runs the process pool over `partitions` until every pending file has
/// been consumed, honoring `plan.max_workers` concurrent children.
/// Returns `(num_docs, max_docid, total_doc_len, run_files, url_fragments)`.
fn dispatch(
    partitions: &mut [Partition],
    plan: &Plan,
    scratch_dir: &Path,
    run_job: JobRunner,
) -> Result<(u64, u64, u64, Vec<PathBuf>, Vec<PathBuf>)> {
    let mut queue: VecDeque<usize> = partitions
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.id)
        .collect();

    let total_files: u64 = partitions.iter().map(|p| p.len() as u64).sum();
    let progress = ProgressBar::new(total_files);
    progress.set_style(create_progress_style());
    progress.set_message("indexing corpus");

    let mut num_docs = 0u64;
    let mut max_docid = 0u64;
    let mut total_doc_len = 0u64;
    let mut run_files = Vec::new();
    let mut url_fragments = Vec::new();

    let (tx, rx) = mpsc::channel::<(usize, PathBuf, u64, Result<procpool::WorkerJobResult>)>();
    let mut in_flight = 0usize;

    loop {
        while in_flight < plan.max_workers {
            let Some(partition_id) = queue.pop_front() else {
                break;
            };
            let partition = &mut partitions[partition_id];
            let Some((path, cursor)) = partition.pop_file() else {
                continue;
            };
            let job = WorkerJob {
                partition_id,
                docid_offset: partition.docid_offset,
                docid: partition.docid,
                path: path.clone(),
                cursor,
                max_read_bytes: plan.max_read_bytes,
                memory_cap_bytes: plan.memory_cap_per_worker,
            };
            let tx = tx.clone();
            std::thread::spawn(move || {
                let result = run_job(&job);
                let _ = tx.send((job.partition_id, path, cursor, result));
            });
            in_flight += 1;
        }

        if in_flight == 0 {
            break;
        }

        let (partition_id, dispatched_path, dispatched_cursor, result) =
            rx.recv().expect("worker channel closed unexpectedly");
        in_flight -= 1;
        progress.inc(1);

        match result? {
            procpool::WorkerJobResult { outcome: WorkerOutcome::Success {
                new_docid,
                completed,
                next_cursor,
                run_file,
                url_mapping_fragment,
                total_doc_len: job_doc_len,
            }, .. } => {
                partitions[partition_id].docid = new_docid;
                partition::rebase_following(partitions, partition_id, new_docid);

                run_files.push(run_file);
                url_fragments.push(url_mapping_fragment);
                total_doc_len += job_doc_len;

                if completed {
                    if partitions[partition_id].is_empty() {
                        // No more files queued for this partition: its
                        // final local docid count is now settled.
                        let partition = &partitions[partition_id];
                        num_docs += new_docid;
                        max_docid = max_docid.max(partition.docid_offset + new_docid);
                    } else {
                        queue.push_back(partition_id);
                    }
                } else {
                    let partition = &mut partitions[partition_id];
                    partition.push_file(dispatched_path, next_cursor);
                    queue.push_back(partition_id);
                }
            }
            procpool::WorkerJobResult { outcome: WorkerOutcome::Failure { reason }, .. } => {
                tracing::error!(partition_id, %reason, "worker job failed, partition requeued");
                let partition = &mut partitions[partition_id];
                partition.push_file(dispatched_path, dispatched_cursor);
                queue.push_back(partition_id);
            }
        }
    }

    progress.finish_with_message("corpus indexed");

    let _ = scratch_dir; // scratch_dir is used by the worker children, not here.
    Ok((num_docs, max_docid, total_doc_len, run_files, url_fragments))
}

/// Concatenates every url-mapping fragment's body (stripping each
/// fragment's own BEGIN/END markers) into one block in `writer`, deleting
/// fragments as they're consumed.
fn assemble_url_mapping<W: Write>(fragments: &[PathBuf], writer: &mut W) -> Result<()> {
    write!(writer, "{}", codec::BEGIN_URL_MAPPING)?;
    for fragment in fragments {
        let (map, _) = codec::read_url_mapping(fragment, 0)?;
        let mut entries: Vec<_> = map.into_iter().collect();
        entries.sort_by_key(|(docid, _)| *docid);
        for (docid, (doc_len, url)) in entries {
            writeln!(writer, "{docid} {doc_len} {url}")?;
        }
        std::fs::remove_file(fragment)?;
    }
    write!(writer, "{}", codec::END_URL_MAPPING)?;
    Ok(())
}

/// Repeatedly pops the first two run files, merges them into the second's
/// place, and re-queues the merged file, until one remains; copies it into
/// `index_path` (appended after the metadata block already written there).
/// Returns `(num_lists, total_postings)` for the final file: the number of
/// distinct terms and the sum of every list's posting count.
fn merge_run_files(
    mut run_files: Vec<PathBuf>,
    index_path: &Path,
    max_read_chars: usize,
) -> Result<(u64, u64)> {
    if run_files.is_empty() {
        return Ok((0, 0));
    }

    let mut queue: VecDeque<PathBuf> = run_files.drain(..).collect();

    while queue.len() > 1 {
        let a = queue.pop_front().unwrap();
        let b = queue.pop_front().unwrap();
        let merged = b.with_extension("merged");
        merge_two(&a, &b, &merged, max_read_chars)?;
        std::fs::remove_file(&a)?;
        std::fs::remove_file(&b)?;
        std::fs::rename(&merged, &b)?;
        queue.push_back(b);
    }

    let sole = queue.pop_front().unwrap();
    let stats = scan_stats(&sole, max_read_chars)?;
    let mut out = std::fs::OpenOptions::new().append(true).open(index_path)?;
    codec::move_file_bounded(&sole, &mut out, max_read_chars.max(4096))?;
    Ok(stats)
}

/// Scans a run file via the codec's streaming reader, counting distinct
/// terms and total postings without holding the whole file in memory.
fn scan_stats(path: &Path, max_chars: usize) -> Result<(u64, u64)> {
    let (mut num_lists, mut total_postings) = (0u64, 0u64);
    let mut cursor = Some(0u64);
    while let Some(c) = cursor {
        let (block, next) = codec::read_next(path, c, max_chars)?;
        num_lists += block.len() as u64;
        total_postings += block.values().map(|v| v.len() as u64).sum::<u64>();
        cursor = next;
    }
    Ok((num_lists, total_postings))
}

/// Streams `a` and `b` in `max_chars`-sized blocks, writing their
/// term-sorted union to `out`. Within a term present in both files, the
/// postings are concatenated and re-sorted ascending by docid.
///
/// Both `a` and `b` are internally ascending by term (the codec's
/// `ASCENDING_TERMS` invariant), so the smallest unconsumed term across
/// both buffers is always the global minimum; no k-way merge bookkeeping
/// beyond two cursors is required. The "advancing left side" case (`a`
/// drains several blocks before `b`'s buffer yields its next term) falls
/// out naturally: the loop always refills whichever buffer is empty before
/// comparing again.
fn merge_two(a: &Path, b: &Path, out_path: &Path, max_chars: usize) -> Result<()> {
    let mut cursor_a = Some(0u64);
    let mut cursor_b = Some(0u64);
    let mut buf_a = crate::types::InvertedMap::new();
    let mut buf_b = crate::types::InvertedMap::new();

    let out = File::create(out_path)?;
    let mut writer = BufWriter::new(out);

    loop {
        if buf_a.is_empty() {
            if let Some(c) = cursor_a {
                let (block, next) = codec::read_next(a, c, max_chars)?;
                buf_a = block;
                cursor_a = next;
            }
        }
        if buf_b.is_empty() {
            if let Some(c) = cursor_b {
                let (block, next) = codec::read_next(b, c, max_chars)?;
                buf_b = block;
                cursor_b = next;
            }
        }

        match (buf_a.keys().next().cloned(), buf_b.keys().next().cloned()) {
            (None, None) => break,
            (Some(_), None) => write_front(&mut buf_a, &mut writer)?,
            (None, Some(_)) => write_front(&mut buf_b, &mut writer)?,
            (Some(ta), Some(tb)) => {
                if ta < tb {
                    write_front(&mut buf_a, &mut writer)?;
                } else if tb < ta {
                    write_front(&mut buf_b, &mut writer)?;
                } else {
                    let mut postings_a = buf_a.remove(&ta).unwrap();
                    let postings_b = buf_b.remove(&tb).unwrap();
                    postings_a.extend(postings_b);
                    postings_a.sort_by_key(|p| p.docid);
                    writeln!(
                        writer,
                        "{ta} {}",
                        postings_a
                            .iter()
                            .map(|p| format!("{},{}", p.docid, p.freq))
                            .collect::<Vec<_>>()
                            .join(" ")
                    )?;
                }
            }
        }
    }

    Ok(())
}

/// Exposes the pairwise run-file merge for property tests, which compile
/// against the crate's public API only and can't reach `merge_two`
/// directly.
#[doc(hidden)]
pub fn merge_two_files_for_test(a: &Path, b: &Path, out_path: &Path, max_chars: usize) -> Result<()> {
    merge_two(a, b, out_path, max_chars)
}

fn write_front<W: Write>(buf: &mut crate::types::InvertedMap, writer: &mut W) -> Result<()> {
    if let Some((term, postings)) = buf.pop_first() {
        writeln!(
            writer,
            "{term} {}",
            postings
                .iter()
                .map(|p| format!("{},{}", p.docid, p.freq))
                .collect::<Vec<_>>()
                .join(" ")
        )?;
    }
    Ok(())
}
