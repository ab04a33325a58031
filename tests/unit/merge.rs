//! Black-box tests of the external pairwise run-file merge.

use spimidex::coordinator::merge_two_files_for_test;
use spimidex::types::{InvertedMap, Posting};
use spimidex::{codec, types};
use tempfile::tempdir;

fn write_run(path: &std::path::Path, entries: &[(&str, Vec<Posting>)]) {
    let mut map = InvertedMap::new();
    for (term, postings) in entries {
        map.insert(term.to_string(), postings.clone());
    }
    let mut buf = Vec::new();
    codec::write_inverted_map(&map, &mut buf, 0).unwrap();
    std::fs::write(path, buf).unwrap();
}

#[test]
fn merge_scenario_three_unions_and_concatenates_shared_terms() {
    // spec §8 scenario 3.
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.part");
    let b = dir.path().join("b.part");
    let out = dir.path().join("merged.part");

    write_run(
        &a,
        &[
            ("a", vec![types::Posting { docid: 0, freq: 1 }]),
            ("c", vec![types::Posting { docid: 0, freq: 1 }]),
        ],
    );
    write_run(
        &b,
        &[
            ("b", vec![types::Posting { docid: 1, freq: 2 }]),
            ("c", vec![types::Posting { docid: 1, freq: 3 }]),
        ],
    );

    merge_two_files_for_test(&a, &b, &out, 4096).unwrap();

    let (block, _) = codec::read_next(&out, 0, 1 << 20).unwrap();
    let mut buf = Vec::new();
    codec::write_inverted_map(&block, &mut buf, 0).unwrap();
    assert_eq!(
        String::from_utf8(buf).unwrap(),
        "a 0,1\nb 1,2\nc 0,1 1,3\n"
    );
}

#[test]
fn merge_preserves_every_posting_from_both_inputs() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.part");
    let b = dir.path().join("b.part");
    let out = dir.path().join("merged.part");

    write_run(
        &a,
        &[("shared", vec![Posting { docid: 0, freq: 4 }, Posting { docid: 2, freq: 1 }])],
    );
    write_run(&b, &[("shared", vec![Posting { docid: 1, freq: 7 }])]);

    merge_two_files_for_test(&a, &b, &out, 4096).unwrap();

    let (block, _) = codec::read_next(&out, 0, 1 << 20).unwrap();
    let postings = &block["shared"];
    assert_eq!(
        postings,
        &vec![
            Posting { docid: 0, freq: 4 },
            Posting { docid: 1, freq: 7 },
            Posting { docid: 2, freq: 1 },
        ]
    );
}

#[test]
fn merge_over_a_budget_smaller_than_either_file_still_unions_fully() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.part");
    let b = dir.path().join("b.part");
    let out = dir.path().join("merged.part");

    write_run(
        &a,
        &[
            ("alpha", vec![Posting { docid: 0, freq: 1 }]),
            ("gamma", vec![Posting { docid: 0, freq: 1 }]),
        ],
    );
    write_run(
        &b,
        &[
            ("beta", vec![Posting { docid: 1, freq: 1 }]),
            ("delta", vec![Posting { docid: 1, freq: 1 }]),
        ],
    );

    // Budget small enough that each `read_next` only sees one line at a
    // time, forcing several refills on both sides of `merge_two`.
    merge_two_files_for_test(&a, &b, &out, 8).unwrap();

    let mut cursor = Some(0u64);
    let mut terms = Vec::new();
    while let Some(c) = cursor {
        let (block, next) = codec::read_next(&out, c, 8).unwrap();
        terms.extend(block.keys().cloned());
        cursor = next;
    }
    assert_eq!(terms, vec!["alpha", "beta", "delta", "gamma"]);
}
