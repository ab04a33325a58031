//! The textual line format for inverted lists, plus the url-mapping and
//! index-metadata block markers (C1).
//!
//! # INVARIANTS (DO NOT VIOLATE)
//!
//! 1. **ASCENDING_TERMS**: `write_inverted_map` emits lines in ascending
//!    term order (free, since callers build an `InvertedMap`/`BTreeMap`).
//! 2. **NO_EMPTY_TERMS**: a term with zero postings is never emitted.
//! 3. **BLOCK_BOUNDARY_ON_NEWLINE**: `read_next` never splits a line across
//!    two blocks — it always extends its read to the next `\n`.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{IndexError, Result};
use crate::types::{DocDescriptor, IndexMetadata, InvertedMap, Posting};

pub const BEGIN_URL_MAPPING: &str = "-----BEGIN URL MAPPING-----\n";
pub const END_URL_MAPPING: &str = "-----END URL MAPPING-----\n";
pub const BEGIN_INDEX_METADATA: &str = "-----BEGIN INDEX METADATA-----\n";
pub const END_INDEX_METADATA: &str = "-----END INDEX METADATA-----\n";

/// Writes an inverted map as posting-list lines, offsetting every docid by
/// `docid_offset`. Ascending term order falls out of `InvertedMap` being a
/// `BTreeMap`; within a term's list, postings are written in the order they
/// are stored (callers must pre-sort by docid for a final on-disk output —
/// shard-worker output is already ascending by construction, see §4.3).
pub fn write_inverted_map<W: Write>(map: &InvertedMap, out: &mut W, docid_offset: u64) -> Result<()> {
    for (term, postings) in map {
        if postings.is_empty() {
            continue;
        }
        write!(out, "{term}")?;
        for p in postings {
            write!(out, " {},{}", p.docid + docid_offset, p.freq)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Parses one posting-list line (`term SP docid,freq SP docid,freq ...`)
/// into `(term, postings)`. Returns a `Codec` error on a malformed posting.
fn parse_line(line: &str, path: &Path, offset: u64) -> Result<(String, Vec<Posting>)> {
    let mut parts = line.split(' ');
    let term = parts.next().unwrap_or("").to_string();
    let mut postings = Vec::new();
    for field in parts {
        let (docid_str, freq_str) = field.split_once(',').ok_or_else(|| IndexError::Codec {
            path: path.to_path_buf(),
            offset,
            reason: format!("posting '{field}' missing comma"),
        })?;
        let docid: u64 = docid_str.parse().map_err(|_| IndexError::Codec {
            path: path.to_path_buf(),
            offset,
            reason: format!("non-integer docid '{docid_str}'"),
        })?;
        let freq: u32 = freq_str.parse().map_err(|_| IndexError::Codec {
            path: path.to_path_buf(),
            offset,
            reason: format!("non-integer freq '{freq_str}'"),
        })?;
        postings.push(Posting { docid, freq });
    }
    Ok((term, postings))
}

/// Reads at most `max_chars` UTF-8 characters (as bytes — this format is
/// ASCII-safe within UTF-8) starting at `cursor`, extends to the next `\n`
/// so no line is split across two blocks, and parses the block into an
/// `InvertedMap`. Returns `(map, None)` when EOF lands exactly at the block
/// boundary, or `(map, Some(next_cursor))` otherwise.
///
/// A partial line at EOF (the file ends mid-line, with no trailing `\n`) is
/// a structural error.
pub fn read_next(path: &Path, cursor: u64, max_chars: usize) -> Result<(InvertedMap, Option<u64>)> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(cursor))?;
    let mut reader = BufReader::new(file);

    let mut buf = vec![0u8; max_chars];
    let n = reader.read(&mut buf)?;
    buf.truncate(n);

    if n == 0 {
        return Ok((InvertedMap::new(), None));
    }

    // Extend to the next newline.
    if buf.last() != Some(&b'\n') {
        let mut extra = Vec::new();
        reader.read_until(b'\n', &mut extra)?;
        if extra.is_empty() || *extra.last().unwrap() != b'\n' {
            return Err(IndexError::Codec {
                path: path.to_path_buf(),
                offset: cursor + buf.len() as u64,
                reason: "partial line at end of file".to_string(),
            });
        }
        buf.extend_from_slice(&extra);
    }

    let consumed = buf.len() as u64;
    let text = String::from_utf8(buf).map_err(|e| IndexError::Codec {
        path: path.to_path_buf(),
        offset: cursor,
        reason: format!("non-UTF-8 block: {e}"),
    })?;

    let mut map = InvertedMap::new();
    for (i, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let (term, postings) = parse_line(line, path, cursor + i as u64)?;
        if !postings.is_empty() {
            map.insert(term, postings);
        }
    }

    let next_cursor = cursor + consumed;
    // Peek whether we're exactly at EOF.
    let mut probe = [0u8; 1];
    let mut probe_file = File::open(path)?;
    probe_file.seek(SeekFrom::Start(next_cursor))?;
    let at_eof = probe_file.read(&mut probe)? == 0;

    Ok((map, if at_eof { None } else { Some(next_cursor) }))
}

/// Writes the `-----BEGIN URL MAPPING-----` / lines / `-----END ...-----`
/// block for a set of document descriptors.
pub fn write_url_mapping<W: Write>(out: &mut W, docs: &[DocDescriptor]) -> Result<()> {
    write!(out, "{BEGIN_URL_MAPPING}")?;
    for d in docs {
        writeln!(out, "{} {} {}", d.docid, d.doc_len, d.url)?;
    }
    write!(out, "{END_URL_MAPPING}")?;
    Ok(())
}

/// Reads the url-mapping block starting at `checkpoint`, returning the
/// `docid -> (doc_len, url)` map and the checkpoint immediately after the
/// block's END marker.
pub fn read_url_mapping(
    path: &Path,
    checkpoint: u64,
) -> Result<(std::collections::HashMap<u64, (u64, String)>, u64)> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(checkpoint))?;
    let mut reader = BufReader::new(file);

    let mut first = String::new();
    reader.read_line(&mut first)?;
    if first != BEGIN_URL_MAPPING {
        return Err(IndexError::Codec {
            path: path.to_path_buf(),
            offset: checkpoint,
            reason: format!("expected url-mapping begin marker, got '{first}'"),
        });
    }

    let mut map = std::collections::HashMap::new();
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 || line == END_URL_MAPPING {
            break;
        }
        let mut parts = line.trim_end_matches('\n').splitn(3, ' ');
        let docid: u64 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| IndexError::Codec {
                path: path.to_path_buf(),
                offset: checkpoint,
                reason: format!("malformed url-mapping line '{line}'"),
            })?;
        let doc_len: u64 = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| IndexError::Codec {
                path: path.to_path_buf(),
                offset: checkpoint,
                reason: format!("malformed url-mapping line '{line}'"),
            })?;
        let url = parts.next().unwrap_or("").to_string();
        map.insert(docid, (doc_len, url));
    }

    let checkpoint = reader.stream_position()?;
    Ok((map, checkpoint))
}

/// Writes the `-----BEGIN INDEX METADATA-----` block.
pub fn write_index_metadata<W: Write>(out: &mut W, meta: &IndexMetadata) -> Result<()> {
    write!(out, "{BEGIN_INDEX_METADATA}")?;
    writeln!(out, "num_docs {}", meta.num_docs)?;
    writeln!(out, "max_docid {}", meta.max_docid)?;
    writeln!(out, "avg_doc_len {}", meta.avg_doc_len)?;
    write!(out, "{END_INDEX_METADATA}")?;
    Ok(())
}

/// Reads the index-metadata block starting at `checkpoint`, returning the
/// metadata and the checkpoint immediately after the block (the start of
/// the posting lines region).
pub fn read_index_metadata(path: &Path, checkpoint: u64) -> Result<(IndexMetadata, u64)> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(checkpoint))?;
    let mut reader = BufReader::new(file);

    let mut first = String::new();
    reader.read_line(&mut first)?;
    if first != BEGIN_INDEX_METADATA {
        return Err(IndexError::Codec {
            path: path.to_path_buf(),
            offset: checkpoint,
            reason: format!("expected index-metadata begin marker, got '{first}'"),
        });
    }

    let (mut num_docs, mut max_docid, mut avg_doc_len) = (0u64, 0u64, 0.0f64);
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 || line == END_INDEX_METADATA {
            break;
        }
        let line = line.trim_end_matches('\n');
        if let Some((key, value)) = line.split_once(' ') {
            match key {
                "num_docs" => num_docs = value.parse().unwrap_or(0),
                "max_docid" => max_docid = value.parse().unwrap_or(0),
                "avg_doc_len" => avg_doc_len = value.parse().unwrap_or(0.0),
                _ => {}
            }
        }
    }

    let checkpoint = reader.stream_position()?;
    Ok((
        IndexMetadata {
            num_docs,
            max_docid,
            avg_doc_len,
        },
        checkpoint,
    ))
}

/// Copies the remainder of `src` into `dst`, `chunk_bytes` at a time, then
/// removes `src`. Used for the final single-remaining-run copy in the
/// external merge (§4.4).
pub fn move_file_bounded(src: &Path, dst: &mut File, chunk_bytes: usize) -> Result<()> {
    let mut inf = BufReader::new(File::open(src)?);
    let mut buf = vec![0u8; chunk_bytes];
    loop {
        let n = inf.read(&mut buf)?;
        if n == 0 {
            break;
        }
        dst.write_all(&buf[..n])?;
    }
    drop(inf);
    std::fs::remove_file(src)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn write_then_read_round_trips() {
        let mut map = InvertedMap::new();
        map.insert("brown".into(), vec![Posting { docid: 0, freq: 1 }]);
        map.insert("fox".into(), vec![Posting { docid: 0, freq: 1 }]);
        map.insert("quick".into(), vec![Posting { docid: 0, freq: 1 }]);

        let mut buf = Vec::new();
        write_inverted_map(&map, &mut buf, 0).unwrap();
        assert_eq!(
            String::from_utf8(buf.clone()).unwrap(),
            "brown 0,1\nfox 0,1\nquick 0,1\n"
        );

        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), &buf).unwrap();
        let (read_back, next) = read_next(file.path(), 0, 4096).unwrap();
        assert_eq!(read_back, map);
        assert_eq!(next, None);
    }

    #[test]
    fn partial_line_at_eof_is_structural_error() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"brown 0,1").unwrap(); // no trailing LF
        let err = read_next(file.path(), 0, 4096).unwrap_err();
        assert!(matches!(err, IndexError::Codec { .. }));
    }

    #[test]
    fn url_mapping_round_trips() {
        let docs = vec![DocDescriptor {
            docid: 0,
            doc_len: 19,
            url: "u".to_string(),
        }];
        let mut buf = Vec::new();
        write_url_mapping(&mut buf, &docs).unwrap();
        assert_eq!(String::from_utf8(buf.clone()).unwrap(), "-----BEGIN URL MAPPING-----\n0 19 u\n-----END URL MAPPING-----\n");

        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), &buf).unwrap();
        let (map, checkpoint) = read_url_mapping(file.path(), 0).unwrap();
        assert_eq!(map.get(&0), Some(&(19, "u".to_string())));
        assert_eq!(checkpoint, buf.len() as u64);
    }

    #[test]
    fn index_metadata_round_trips() {
        let meta = IndexMetadata::new(3, 2, 30);
        let mut buf = Vec::new();
        write_index_metadata(&mut buf, &meta).unwrap();
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), &buf).unwrap();
        let (read_back, _) = read_index_metadata(file.path(), 0).unwrap();
        assert_eq!(read_back, meta);
    }

    #[test]
    fn empty_corpus_metadata_avoids_divide_by_zero() {
        let meta = IndexMetadata::new(0, 0, 0);
        let mut buf = Vec::new();
        write_index_metadata(&mut buf, &meta).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("avg_doc_len 0"));
    }
}
