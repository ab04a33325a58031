//! `processor` binary: runs a batch of queries against an assembled index
//! and prints ranked results, one JSON object per line.

use std::io::Write;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Instant;

use clap::Parser;
use rayon::ThreadPoolBuilder;

use spimidex::cli::ProcessorArgs;
use spimidex::error::IndexError;
use spimidex::ranker::RankerContext;
use spimidex::report;
use spimidex::types::RankerKind;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("spimidex=info"))
        .init();

    let args = ProcessorArgs::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            match e {
                IndexError::MemoryExhausted => ExitCode::from(1),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(args: &ProcessorArgs) -> spimidex::Result<()> {
    let kind = RankerKind::from_str(&args.ranker)?;

    let queries: Vec<String> = std::fs::read_to_string(&args.queries_path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    // The planner formula in coordinator::Plan is sized for the indexer's
    // memory-bound writes; the ranker's bounded reads reuse the same
    // knob so a single mental model covers both binaries' I/O budgets.
    let max_read_chars = 8 * 1024 * 1024;
    let context = RankerContext::load(&args.index_path, kind, &queries, max_read_chars)?;

    if !context.not_found().is_empty() {
        tracing::debug!(terms = ?context.not_found(), "query terms absent from index");
    }

    let pool = ThreadPoolBuilder::new()
        .num_threads(args.parallelism.max(1))
        .build()
        .map_err(|e| IndexError::Config(format!("failed to build query thread pool: {e}")))?;

    let started = Instant::now();
    let results: Vec<_> = pool.install(|| {
        use rayon::prelude::*;
        queries
            .par_iter()
            .map(|query| context.score_query(query))
            .collect::<Vec<_>>()
    });
    let elapsed = started.elapsed();

    if args.benchmarking {
        let stdout = std::io::stdout();
        report::write_benchmark_duration(&mut stdout.lock(), elapsed)?;
    } else {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        for result in results {
            let result = result?;
            report::write_query_result(&mut handle, &result)?;
        }
        handle.flush()?;
    }

    Ok(())
}
