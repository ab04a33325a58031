//! `indexer` binary: builds a disk-resident inverted index from a corpus
//! of WARC files, or (with the hidden `--spimi-worker` flag) runs as a
//! shard-worker child process.

use std::io::{BufRead, Write};
use std::process::ExitCode;

use clap::Parser;
use spimidex::cli::IndexerArgs;
use spimidex::error::IndexError;
use spimidex::procpool::{self, WorkerJob, WorkerJobResult, WorkerOutcome};
use spimidex::report::IndexSummary;
use spimidex::{coordinator, worker};

fn main() -> ExitCode {
    let args = IndexerArgs::parse();

    let level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(format!("spimidex={level}")))
        .init();

    if args.spimi_worker {
        return run_worker_mode();
    }

    match run_coordinator(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for(&e)
        }
    }
}

fn run_coordinator(args: &IndexerArgs) -> spimidex::Result<()> {
    let memory_limit_bytes = args.memory_mb * 1024 * 1024;
    let report = coordinator::run_build(&args.corpus_dir, &args.index_path, memory_limit_bytes)?;

    let summary = IndexSummary::new(
        report.index_size_bytes,
        report.num_lists,
        report.total_postings,
        report.elapsed,
    );
    let stdout = std::io::stdout();
    serde_json::to_writer(stdout.lock(), &summary).map_err(IndexError::from)?;
    println!();

    tracing::info!(
        num_docs = report.num_docs,
        max_docid = report.max_docid,
        "indexer run complete"
    );
    Ok(())
}

/// Reads one [`WorkerJob`] from stdin, runs the shard-worker steps, and
/// writes one [`WorkerJobResult`] to stdout.
fn run_worker_mode() -> ExitCode {
    let stdin = std::io::stdin();
    let mut line = String::new();
    if let Err(e) = stdin.lock().read_line(&mut line) {
        eprintln!("worker: failed to read job: {e}");
        return ExitCode::FAILURE;
    }

    let job: WorkerJob = match serde_json::from_str(&line) {
        Ok(job) => job,
        Err(e) => {
            eprintln!("worker: malformed job: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = run_one_job(&job);
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if serde_json::to_writer(&mut handle, &result).is_err() || writeln!(handle).is_err() {
        return ExitCode::FAILURE;
    }

    match &result.outcome {
        WorkerOutcome::Success { .. } => ExitCode::SUCCESS,
        WorkerOutcome::Failure { .. } => ExitCode::FAILURE,
    }
}

fn run_one_job(job: &WorkerJob) -> WorkerJobResult {
    let outcome = (|| -> spimidex::Result<WorkerOutcome> {
        procpool::apply_memory_cap(job.memory_cap_bytes)?;
        let scratch_dir = job.path.parent().unwrap_or_else(|| std::path::Path::new("."));
        let shard = worker::run_shard(
            job.partition_id,
            job.docid_offset,
            job.docid,
            &job.path,
            job.cursor,
            job.max_read_bytes,
            scratch_dir,
        )?;
        Ok(WorkerOutcome::Success {
            new_docid: shard.new_docid,
            completed: shard.completed,
            next_cursor: shard.next_cursor,
            run_file: shard.run_file,
            url_mapping_fragment: shard.url_mapping_fragment,
            total_doc_len: shard.total_doc_len,
        })
    })()
    .unwrap_or_else(|e| WorkerOutcome::Failure { reason: e.to_string() });

    WorkerJobResult {
        partition_id: job.partition_id,
        outcome,
    }
}

fn exit_code_for(e: &IndexError) -> ExitCode {
    match e {
        IndexError::MemoryExhausted => ExitCode::from(1),
        _ => ExitCode::FAILURE,
    }
}
