//! Child-process worker pool: job envelopes and the stdin/stdout JSON
//! transport used to dispatch a [`crate::types::Partition`] file to a
//! worker process (C8).
//!
//! A worker is this same `indexer` binary re-invoked with the hidden
//! `--spimi-worker` flag (see `bin/indexer.rs`). One JSON object goes in on
//! its stdin, one comes out on its stdout; the child applies its own
//! `RLIMIT_AS` cap before touching the corpus file, so a runaway record
//! can't take down the coordinator process.

use std::io::Write as _;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// One unit of work handed to a worker: everything it needs to run the
/// shard-worker steps for a single pending file, with no back-reference to
/// the coordinator's in-memory state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerJob {
    pub partition_id: usize,
    pub docid_offset: u64,
    pub docid: u64,
    pub path: PathBuf,
    pub cursor: u64,
    pub max_read_bytes: u64,
    /// Byte cap applied to this child via `setrlimit(RLIMIT_AS, ...)`.
    pub memory_cap_bytes: u64,
}

/// What a worker reports back after running the shard-worker steps for one
/// job, or the reason it failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerJobResult {
    pub partition_id: usize,
    pub outcome: WorkerOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkerOutcome {
    Success {
        new_docid: u64,
        completed: bool,
        next_cursor: u64,
        run_file: PathBuf,
        url_mapping_fragment: PathBuf,
        total_doc_len: u64,
    },
    Failure {
        reason: String,
    },
}

/// Spawns a worker child for `job`, writes the job as one JSON line to its
/// stdin, and blocks for its JSON response on stdout.
///
/// The child is this process's own executable re-invoked with
/// `--spimi-worker` (see `bin/indexer.rs`'s dispatch), so no separate
/// worker binary needs to be installed alongside the indexer.
pub fn run_job(job: &WorkerJob) -> Result<WorkerJobResult> {
    let exe = std::env::current_exe()?;
    let mut child = Command::new(exe)
        .arg("--spimi-worker")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()?;

    {
        let stdin = child.stdin.as_mut().ok_or_else(|| {
            IndexError::WorkerFatal {
                partition_id: job.partition_id,
                reason: "failed to open child stdin".to_string(),
            }
        })?;
        let line = serde_json::to_string(job)?;
        writeln!(stdin, "{line}")?;
    }

    let output = child.wait_with_output()?;
    if !output.status.success() && output.stdout.is_empty() {
        return Err(IndexError::WorkerFatal {
            partition_id: job.partition_id,
            reason: format!("worker exited with {} and no result", output.status),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout.lines().next().ok_or_else(|| IndexError::WorkerFatal {
        partition_id: job.partition_id,
        reason: "worker produced no output line".to_string(),
    })?;
    let result: WorkerJobResult = serde_json::from_str(line)?;
    Ok(result)
}

/// Applies the calling process's memory cap. Called by the worker-mode
/// entry point immediately after parsing its job, before opening the
/// corpus file. A no-op cfg-gated away on platforms without `setrlimit`
/// would go here; this crate targets Linux, so `nix`'s `resource` feature
/// is always available.
pub fn apply_memory_cap(cap_bytes: u64) -> Result<()> {
    use nix::sys::resource::{setrlimit, Resource};
    setrlimit(Resource::RLIMIT_AS, cap_bytes, cap_bytes).map_err(|e| IndexError::Config(format!(
        "failed to set RLIMIT_AS to {cap_bytes} bytes: {e}"
    )))
}
