//! Codec round-trip law (§8): for any in-memory inverted map whose terms are
//! ASCII-safe and postings ascend, `read(write(m)) == m`.

use proptest::prelude::*;
use spimidex::codec;
use spimidex::types::{InvertedMap, Posting};
use tempfile::NamedTempFile;

fn ascending_postings() -> impl Strategy<Value = Vec<Posting>> {
    prop::collection::btree_map(0u64..200, 1u32..50, 0..8)
        .prop_map(|m| m.into_iter().map(|(docid, freq)| Posting { docid, freq }).collect())
}

fn term() -> impl Strategy<Value = String> {
    "[a-z]{1,15}"
}

fn inverted_map() -> impl Strategy<Value = InvertedMap> {
    prop::collection::btree_map(term(), ascending_postings(), 0..12)
        .prop_map(|m| m.into_iter().filter(|(_, v)| !v.is_empty()).collect())
}

proptest! {
    #[test]
    fn round_trips_through_write_then_read(map in inverted_map()) {
        let mut buf = Vec::new();
        codec::write_inverted_map(&map, &mut buf, 0).unwrap();

        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), &buf).unwrap();

        let mut read_back = InvertedMap::new();
        let mut cursor = Some(0u64);
        while let Some(c) = cursor {
            let (block, next) = codec::read_next(file.path(), c, 1 << 16).unwrap();
            read_back.extend(block);
            cursor = next;
        }

        prop_assert_eq!(read_back, map);
    }
}
