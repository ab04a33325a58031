use std::path::PathBuf;

use clap::Parser;

/// Builds a disk-resident inverted index from a directory of WARC corpus
/// files.
#[derive(Parser, Debug)]
#[command(name = "indexer", about = "SPIMI inverted-index builder", version)]
pub struct IndexerArgs {
    /// Memory budget, in megabytes, used to plan worker count and per-call
    /// read sizes.
    #[arg(short = 'm', long = "memory")]
    pub memory_mb: u64,

    /// Directory containing the corpus's WARC files.
    #[arg(short = 'c', long = "corpus")]
    pub corpus_dir: PathBuf,

    /// Output path for the assembled index file.
    #[arg(short = 'i', long = "index")]
    pub index_path: PathBuf,

    /// Raise the log level from info to debug.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Internal: re-invokes this binary as a shard worker, reading one
    /// `WorkerJob` from stdin and writing one `WorkerJobResult` to stdout.
    /// Not part of the public CLI surface.
    #[arg(long = "spimi-worker", hide = true)]
    pub spimi_worker: bool,
}

/// Runs a batch of queries against an assembled index and prints ranked
/// results.
#[derive(Parser, Debug)]
#[command(name = "processor", about = "DAAT ranked-retrieval query engine", version)]
pub struct ProcessorArgs {
    /// Path to the assembled index file.
    #[arg(short = 'i', long = "index")]
    pub index_path: PathBuf,

    /// Path to a UTF-8 file of one query per line.
    #[arg(short = 'q', long = "queries")]
    pub queries_path: PathBuf,

    /// Ranking function: TFIDF or BM25.
    #[arg(short = 'r', long = "ranker", default_value = "TFIDF")]
    pub ranker: String,

    /// Number of concurrent query worker threads.
    #[arg(long = "parallelism", default_value_t = 4)]
    pub parallelism: usize,

    /// Skip per-query output and print only a single wall-clock duration
    /// for the whole batch.
    #[arg(long = "benchmarking")]
    pub benchmarking: bool,
}
