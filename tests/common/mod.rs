//! Shared test fixtures: WARC file construction and small index files built
//! directly from the codec, bypassing the corpus reader where a test only
//! cares about codec/merge/ranker behavior.

#![allow(dead_code)]

use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use spimidex::codec;
use spimidex::types::{DocDescriptor, IndexMetadata, InvertedMap, Posting};

/// Writes a minimal but well-formed WARC file with one `response` record per
/// `(url, html_body)` pair.
pub fn write_warc_file(path: &Path, records: &[(&str, &str)]) {
    let mut out = String::new();
    for (i, (url, html_body)) in records.iter().enumerate() {
        let http_message = format!("HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n{html_body}");
        out.push_str(&format!(
            "WARC/1.0\r\n\
             WARC-Type: response\r\n\
             WARC-Record-ID: <urn:uuid:00000000-0000-0000-0000-{i:012}>\r\n\
             WARC-Date: 2020-01-01T00:00:00Z\r\n\
             WARC-Target-URI: {url}\r\n\
             Content-Type: application/http; msgtype=response\r\n\
             Content-Length: {}\r\n\
             \r\n\
             {http_message}\r\n\r\n",
            http_message.len(),
        ));
    }
    fs::write(path, out).unwrap();
}

/// Assembles a complete index file (url-mapping + metadata + posting lines)
/// directly from an in-memory inverted map and doc descriptors, without
/// going through the coordinator's partitioning/merge pipeline. Useful for
/// ranker and mark-index tests that need a known-shape index file.
pub fn write_index_file(path: &Path, docs: &[DocDescriptor], map: &InvertedMap) {
    let file = File::create(path).unwrap();
    let mut writer = BufWriter::new(file);
    codec::write_url_mapping(&mut writer, docs).unwrap();
    let total_doc_len: u64 = docs.iter().map(|d| d.doc_len).sum();
    let max_docid = docs.iter().map(|d| d.docid).max().map(|m| m + 1).unwrap_or(0);
    let metadata = IndexMetadata::new(docs.len() as u64, max_docid, total_doc_len);
    codec::write_index_metadata(&mut writer, &metadata).unwrap();
    codec::write_inverted_map(map, &mut writer, 0).unwrap();
}

/// A single-posting inverted list entry, for building `InvertedMap`s tersely.
pub fn posting(docid: u64, freq: u32) -> Posting {
    Posting { docid, freq }
}
