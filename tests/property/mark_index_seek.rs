//! Mark-index seek law (§8): for any term present in the index, the
//! mark-index seek procedure positions the reader at a block whose first
//! term is <= the target and finds it without reading a block that begins
//! after it (observed here via the returned postings being exactly right).

use proptest::prelude::*;
use spimidex::codec;
use spimidex::mark_index::MarkIndex;
use spimidex::types::{InvertedMap, Posting};
use tempfile::NamedTempFile;

fn distinct_terms() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z]{1,12}", 1..40).prop_map(|s| s.into_iter().collect())
}

proptest! {
    #[test]
    fn locate_finds_every_present_term_with_its_exact_postings(terms in distinct_terms()) {
        let mut map = InvertedMap::new();
        for (i, term) in terms.iter().enumerate() {
            map.insert(term.clone(), vec![Posting { docid: i as u64, freq: (i as u32) + 1 }]);
        }

        let file = NamedTempFile::new().unwrap();
        let mut buf = Vec::new();
        codec::write_inverted_map(&map, &mut buf, 0).unwrap();
        std::fs::write(file.path(), &buf).unwrap();

        // A small step forces multiple marks even over a handful of terms.
        let index = MarkIndex::build(file.path(), 0).unwrap();

        for (i, term) in terms.iter().enumerate() {
            let found = index.locate(file.path(), term, 64).unwrap();
            prop_assert_eq!(found, Some(vec![Posting { docid: i as u64, freq: (i as u32) + 1 }]));
        }

        // 13 z's: one longer than the generator's max term length, so this
        // can never collide with a generated term.
        prop_assert_eq!(index.locate(file.path(), "zzzzzzzzzzzzz", 64).unwrap(), None);
    }
}
