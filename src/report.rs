//! JSON result encoding (C7): per-query output lines and the indexer's
//! stdout summary object.

use std::io::Write;
use std::time::Duration;

use serde::Serialize;

use crate::error::Result;
use crate::types::QueryResult;

/// Writes one query's result as a single JSON line (`ensure_ascii=false`
/// equivalent: `serde_json` already emits UTF-8 rather than `\uXXXX`
/// escapes for non-ASCII by default).
pub fn write_query_result<W: Write>(out: &mut W, result: &QueryResult) -> Result<()> {
    serde_json::to_writer(&mut *out, result)?;
    writeln!(out)?;
    Ok(())
}

/// `{"Index Size": MB, "Number of Lists": L, "Average List Size": X,
/// "Elapsed Time": secs}`, printed once by the indexer on successful
/// completion.
#[derive(Debug, Serialize)]
pub struct IndexSummary {
    #[serde(rename = "Index Size")]
    pub index_size_mb: f64,
    #[serde(rename = "Number of Lists")]
    pub number_of_lists: u64,
    #[serde(rename = "Average List Size")]
    pub average_list_size: f64,
    #[serde(rename = "Elapsed Time")]
    pub elapsed_time_secs: f64,
}

impl IndexSummary {
    pub fn new(index_size_bytes: u64, number_of_lists: u64, total_posting_count: u64, elapsed: Duration) -> Self {
        let average_list_size = if number_of_lists == 0 {
            0.0
        } else {
            total_posting_count as f64 / number_of_lists as f64
        };
        Self {
            index_size_mb: index_size_bytes as f64 / (1024.0 * 1024.0),
            number_of_lists,
            average_list_size,
            elapsed_time_secs: elapsed.as_secs_f64(),
        }
    }
}

/// A single benchmarking-mode line: just the wall-clock duration of a
/// whole query batch, in seconds.
pub fn write_benchmark_duration<W: Write>(out: &mut W, elapsed: Duration) -> Result<()> {
    writeln!(out, "{{\"Elapsed Time\": {}}}", elapsed.as_secs_f64())?;
    Ok(())
}
