//! Black-box codec tests: the line format and the url-mapping/metadata
//! block markers, called only through `spimidex::codec`'s public surface.

use spimidex::codec;
use spimidex::types::{DocDescriptor, InvertedMap, Posting};
use tempfile::NamedTempFile;

#[test]
fn end_to_end_scenario_one_single_document() {
    // spec §8 scenario 1: one record, text "the quick brown fox",
    // Portuguese stopwords removed, stemmed to itself.
    let terms = spimidex::tokenize::tokenize_and_normalize("the quick brown fox");
    assert_eq!(terms, vec!["quick", "brown", "fox"]);

    let mut map = InvertedMap::new();
    for term in &terms {
        map.insert(term.clone(), vec![Posting { docid: 0, freq: 1 }]);
    }

    let mut buf = Vec::new();
    codec::write_inverted_map(&map, &mut buf, 0).unwrap();
    assert_eq!(
        String::from_utf8(buf).unwrap(),
        "brown 0,1\nfox 0,1\nquick 0,1\n"
    );

    let docs = vec![DocDescriptor {
        docid: 0,
        doc_len: 19,
        url: "u".to_string(),
    }];
    let mut mapping_buf = Vec::new();
    codec::write_url_mapping(&mut mapping_buf, &docs).unwrap();
    assert_eq!(
        String::from_utf8(mapping_buf).unwrap(),
        "-----BEGIN URL MAPPING-----\n0 19 u\n-----END URL MAPPING-----\n"
    );
}

#[test]
fn end_to_end_scenario_two_two_documents_sorted_on_disk() {
    // spec §8 scenario 2.
    let mut map = InvertedMap::new();
    map.insert("cat".into(), vec![Posting { docid: 0, freq: 2 }]);
    map.insert(
        "dog".into(),
        vec![Posting { docid: 0, freq: 1 }, Posting { docid: 1, freq: 2 }],
    );
    map.insert("bird".into(), vec![Posting { docid: 1, freq: 1 }]);

    let mut buf = Vec::new();
    codec::write_inverted_map(&map, &mut buf, 0).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let terms: Vec<&str> = text.lines().map(|l| l.split(' ').next().unwrap()).collect();
    assert_eq!(terms, vec!["bird", "cat", "dog"]);
}

#[test]
fn read_next_reports_structural_error_on_partial_final_line() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), b"fox 0,1\nbrown 0,1").unwrap();
    let err = codec::read_next(file.path(), 0, 4096).unwrap_err();
    assert!(matches!(err, spimidex::IndexError::Codec { .. }));
}

#[test]
fn read_next_never_splits_a_line_across_a_small_block_budget() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), b"aaaaaaaaaa 0,1\nbbbbbbbbbb 0,1\n").unwrap();
    // A budget smaller than the first line forces `read_next` to extend to
    // the next newline rather than truncate mid-line.
    let (block, next) = codec::read_next(file.path(), 0, 5).unwrap();
    assert_eq!(block.len(), 1);
    assert!(block.contains_key("aaaaaaaaaa"));
    assert!(next.is_some());
}
