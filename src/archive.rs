//! WARC archive iteration and page-text decoding.
//!
//! spec.md treats archive-record iteration and HTML/plaintext decoding as
//! external collaborators ("Nothing in §4 depends on how they are
//! implemented"). This module is a genuine implementation behind those
//! interfaces, built on the `warc` crate, so the rest of the pipeline has
//! something real to run against.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use scraper::Html;
use warc::{RecordType, WarcHeader, WarcReader};

use crate::error::{IndexError, Result};

/// Tags whose text content is never part of the page body (script/style
/// payloads, document metadata), mirroring the non-text tag list used by the
/// HTML parser in the system this specification distills from.
const NON_TEXT_TAGS: &[&str] = &["head", "meta", "script", "style", "title"];

/// One useful document extracted from the corpus: its source URL, decoded
/// whitespace-normalized text, and that text's byte length.
pub struct ArchiveDoc {
    pub url: String,
    pub text: String,
    pub doc_len: u64,
}

/// Result of streaming one corpus file: the documents extracted and whether
/// the whole file was consumed (`completed`), or the worker stopped early
/// because it exceeded `max_read_bytes` (carrying the resume cursor).
pub struct StreamResult {
    pub docs: Vec<ArchiveDoc>,
    pub completed: bool,
    pub next_cursor: u64,
}

/// A reader that counts how many bytes have been logically consumed from the
/// underlying stream (via `consume`, which is how `BufRead`-based parsers
/// signal "I'm done with this many bytes of the fill buffer").
struct CountingReader<R> {
    inner: R,
    consumed: Arc<AtomicU64>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: BufRead> BufRead for CountingReader<R> {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
        self.consumed.fetch_add(amt as u64, Ordering::Relaxed);
    }
}

/// `is_useful_record`: a WARC record is retained iff it is a `response`
/// record whose embedded HTTP `Content-Type` header is `text/html` or
/// `application/http`.
fn is_useful_record(warc_type: &RecordType, content_type: Option<&str>) -> bool {
    *warc_type == RecordType::Response
        && matches!(content_type, Some("text/html") | Some("application/http"))
}

/// Splits a WARC `response` record's block (a raw HTTP message) into its
/// embedded HTTP headers and body. Returns `None` if the block isn't a
/// well-formed HTTP message (no header/body separator).
fn split_http_message(content: &[u8]) -> Option<(Vec<(String, String)>, &[u8])> {
    let sep = b"\r\n\r\n";
    let idx = content
        .windows(sep.len())
        .position(|w| w == sep)
        .or_else(|| {
            content
                .windows(2)
                .position(|w| w == b"\n\n")
                .map(|i| i) // tolerate bare-LF bodies
        })?;
    let (head, rest) = content.split_at(idx);
    let body = &rest[rest.iter().take(4).take_while(|b| **b == b'\r' || **b == b'\n').count()..];
    let head_str = String::from_utf8_lossy(head);
    let mut headers = Vec::new();
    for line in head_str.lines().skip(1) {
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }
    Some((headers, body))
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

/// Extracts visible page text from an HTML document, excluding script/style/
/// head/meta/title content, matching the non-text tag exclusion used by the
/// original HTML parser (which drops text whose immediate parent is one of
/// those tags).
fn extract_html_text(html: &[u8]) -> String {
    let text = String::from_utf8_lossy(html);
    let document = Html::parse_document(&text);

    let mut words = Vec::new();
    for node in document.tree.nodes() {
        if !node.value().is_text() {
            continue;
        }
        let under_excluded_tag = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| NON_TEXT_TAGS.contains(&el.name()))
        });
        if under_excluded_tag {
            continue;
        }
        if let Some(text_node) = node.value().as_text() {
            words.extend(text_node.split_whitespace().map(str::to_string));
        }
    }
    words.join(" ")
}

/// Collapses runs of tab/CR/LF/space into a single space and trims the ends,
/// per spec §4.3 step 1.
pub fn normalize_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_run = false;
    for c in s.chars() {
        if c == '\t' || c == '\r' || c == '\n' || c == ' ' {
            if !in_run && !out.is_empty() {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out.trim().to_string()
}

/// Streams useful records out of a WARC file starting at `cursor`, stopping
/// once more than `max_read_bytes` have been advanced past `cursor`.
pub fn streamize(path: &Path, cursor: u64, max_read_bytes: u64) -> Result<StreamResult> {
    let mut file = File::open(path).map_err(|e| IndexError::Corpus {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    file.seek(SeekFrom::Start(cursor))
        .map_err(|e| IndexError::Corpus {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let consumed = Arc::new(AtomicU64::new(0));
    let counting = CountingReader {
        inner: BufReader::new(file),
        consumed: Arc::clone(&consumed),
    };
    let mut reader = WarcReader::new(counting);

    let mut docs = Vec::new();
    let mut completed = true;

    for record in reader.iter_records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping malformed WARC record");
                continue;
            }
        };

        if *record.warc_type() == RecordType::Response {
            let content = record.body();
            if let Some((headers, body)) = split_http_message(content) {
                let content_type = header_value(&headers, "content-type")
                    .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());
                if is_useful_record(record.warc_type(), content_type.as_deref()) {
                    let url = record
                        .header(WarcHeader::TargetURI)
                        .map(|c| c.to_string())
                        .unwrap_or_default();
                    let decoded = match content_type.as_deref() {
                        Some("text/html") => extract_html_text(body),
                        _ => String::from_utf8_lossy(body).to_string(),
                    };
                    let text = normalize_whitespace(&decoded);
                    let doc_len = text.len() as u64;
                    docs.push(ArchiveDoc { url, text, doc_len });
                }
            }
        }

        if consumed.load(Ordering::Relaxed) > max_read_bytes {
            completed = false;
            break;
        }
    }

    let next_cursor = cursor + consumed.load(Ordering::Relaxed);
    Ok(StreamResult {
        docs,
        completed,
        next_cursor,
    })
}
