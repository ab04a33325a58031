//! Error taxonomy for the indexer and processor.
//!
//! One variant per error kind named in the error-handling design: corpus-level
//! failures are logged and skipped by callers (they never reach this enum),
//! everything else propagates up to `main` and is mapped to an exit code.

use std::path::PathBuf;

/// Errors that can terminate an indexer or processor run.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// A corpus file could not be opened or a record inside it was malformed
    /// beyond recovery. Most corpus-level problems are logged and skipped at
    /// the record level instead of reaching this variant; this one is for
    /// failures that make an entire file unusable.
    #[error("corpus error reading '{path}': {reason}")]
    Corpus { path: PathBuf, reason: String },

    /// A shard worker failed during streamize/tokenize/index/flush. The
    /// partition has already been rolled back by the caller before this is
    /// surfaced.
    #[error("worker job for partition {partition_id} failed: {reason}")]
    WorkerFatal { partition_id: usize, reason: String },

    /// The posting codec hit a structurally invalid line: a partial line at
    /// EOF, a posting missing a comma, or a non-integer docid/freq.
    #[error("malformed index structure in '{path}' at byte {offset}: {reason}")]
    Codec {
        path: PathBuf,
        offset: u64,
        reason: String,
    },

    /// The OS reported memory exhaustion. Mapped to exit code 1 by `main`.
    #[error("memory exhausted (limit exceeded)")]
    MemoryExhausted,

    /// Bad CLI configuration: unknown ranker type, missing required flag,
    /// nonexistent path.
    #[error("configuration error: {0}")]
    Config(String),

    /// A term the mark index promised exists was not found on re-scan. This
    /// is a bug in the mark index or the merge, not a soft miss.
    #[error("mark index promised term '{0}' but it was not found on re-scan")]
    MarkIndexInconsistency(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("job transport error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;
