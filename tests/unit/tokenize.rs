//! Black-box tests of the shared tokenization pipeline.

use spimidex::tokenize::tokenize_and_normalize;

#[test]
fn stopwords_and_short_tokens_are_dropped() {
    let terms = tokenize_and_normalize("the cat sat on a mat");
    assert!(!terms.contains(&"the".to_string()));
    assert!(!terms.contains(&"on".to_string()));
    assert!(!terms.contains(&"a".to_string()));
}

#[test]
fn same_pipeline_produces_same_terms_for_indexer_and_ranker_callers() {
    // Both the indexer (worker.rs) and the ranker call this one function;
    // any drift between them breaks recall, so a single call site here
    // stands in for both.
    let indexed = tokenize_and_normalize("quick brown fox");
    let queried = tokenize_and_normalize("quick brown fox");
    assert_eq!(indexed, queried);
}

#[test]
fn uppercase_input_normalizes_to_the_same_terms_as_lowercase() {
    assert_eq!(
        tokenize_and_normalize("Quick Brown Fox"),
        tokenize_and_normalize("quick brown fox")
    );
}
