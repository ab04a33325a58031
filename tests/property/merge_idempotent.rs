//! Idempotent-merge law (§8): merging the same two run files twice (the
//! second time with the already-merged output against an empty file)
//! produces byte-identical output.

use proptest::prelude::*;
use spimidex::codec;
use spimidex::coordinator::merge_two_files_for_test;
use spimidex::types::{InvertedMap, Posting};
use tempfile::tempdir;

fn ascending_postings() -> impl Strategy<Value = Vec<Posting>> {
    prop::collection::btree_map(0u64..200, 1u32..50, 0..8)
        .prop_map(|m| m.into_iter().map(|(docid, freq)| Posting { docid, freq }).collect())
}

fn term() -> impl Strategy<Value = String> {
    "[a-z]{1,15}"
}

fn inverted_map() -> impl Strategy<Value = InvertedMap> {
    prop::collection::btree_map(term(), ascending_postings(), 0..10)
        .prop_map(|m| m.into_iter().filter(|(_, v)| !v.is_empty()).collect())
}

proptest! {
    #[test]
    fn second_merge_against_empty_is_a_no_op(a in inverted_map(), b in inverted_map()) {
        let dir = tempdir().unwrap();
        let path_a = dir.path().join("a.part");
        let path_b = dir.path().join("b.part");
        let path_empty = dir.path().join("empty.part");
        let path_merged1 = dir.path().join("merged1.part");
        let path_merged2 = dir.path().join("merged2.part");

        let mut buf_a = Vec::new();
        codec::write_inverted_map(&a, &mut buf_a, 0).unwrap();
        std::fs::write(&path_a, buf_a).unwrap();

        let mut buf_b = Vec::new();
        codec::write_inverted_map(&b, &mut buf_b, 0).unwrap();
        std::fs::write(&path_b, buf_b).unwrap();

        std::fs::write(&path_empty, b"").unwrap();

        merge_two_files_for_test(&path_a, &path_b, &path_merged1, 1 << 16).unwrap();
        merge_two_files_for_test(&path_merged1, &path_empty, &path_merged2, 1 << 16).unwrap();

        let bytes1 = std::fs::read(&path_merged1).unwrap();
        let bytes2 = std::fs::read(&path_merged2).unwrap();
        prop_assert_eq!(bytes1, bytes2);
    }
}
