//! External-memory SPIMI inverted-index builder and DAAT ranked-retrieval
//! query engine over WARC web-archive corpora.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌───────────┐   ┌────────────┐
//! │ archive  │──▶│ tokenize  │──▶│  worker   │──▶│ procpool   │
//! │ (WARC,   │   │ (stem,    │   │ (shard    │   │ (child     │
//! │  HTML)   │   │  stop)    │   │  steps 1-4│   │  processes)│
//! └──────────┘   └───────────┘   └─────┬─────┘   └─────┬──────┘
//!                                      │               │
//!                                      ▼               ▼
//!                              ┌──────────────────────────┐
//!                              │      coordinator          │
//!                              │ (plan, dispatch, assemble,│
//!                              │  external merge)          │
//!                              └─────────────┬──────────────┘
//!                                            ▼
//!                                   ┌──────────────────┐
//!                                   │      codec        │
//!                                   │ (line format, url- │
//!                                   │  mapping, metadata)│
//!                                   └─────────┬──────────┘
//!                                             ▼
//!                                   ┌──────────────────┐
//!                                   │  mark_index        │
//!                                   │ (term -> offset)   │
//!                                   └─────────┬──────────┘
//!                                             ▼
//!                                   ┌──────────────────┐
//!                                   │      ranker        │
//!                                   │ (DAAT, TF-IDF/BM25)│
//!                                   └─────────┬──────────┘
//!                                             ▼
//!                                   ┌──────────────────┐
//!                                   │      report        │
//!                                   │ (JSON result lines)│
//!                                   └──────────────────┘
//! ```
//!
//! The `indexer` binary drives `archive -> tokenize -> worker -> procpool ->
//! coordinator -> codec`; the `processor` binary drives `codec -> mark_index
//! -> tokenize -> ranker -> report`. Both share `types` and `error`.

pub mod archive;
pub mod cli;
pub mod codec;
pub mod coordinator;
pub mod error;
pub mod mark_index;
pub mod partition;
pub mod procpool;
pub mod ranker;
pub mod report;
pub mod tokenize;
pub mod types;
pub mod worker;

pub use error::{IndexError, Result};
