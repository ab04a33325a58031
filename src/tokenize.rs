//! The tokenization pipeline shared verbatim by the indexer and the ranker.
//!
//! Any drift between how the indexer builds postings and how the ranker
//! resolves query terms breaks recall, so both sides call
//! [`tokenize_and_normalize`] and nothing else.

use std::collections::HashSet;
use std::sync::LazyLock;

use rust_stemmers::{Algorithm, Stemmer};

/// Tokens shorter than this are dropped as noise (single letters, stray
/// punctuation fragments).
const MIN_CHARS_WORD: usize = 3;

/// Stems longer than this are truncated, keeping the on-disk term bounded.
const MAX_CHARS_WORD: usize = crate::types::MAX_TERM_LEN;

/// A token starting with any of these bytes is dropped outright: these are
/// artifacts of naive whitespace tokenization over HTML/markup text, e.g.
/// `",123"`, `".hello"`, `"(melt"`.
const LEADING_PUNCTUATION: &[char] = &[',', '.', '[', ']', '(', ')', '{', '}', '/', '\\'];

static STOPWORDS: LazyLock<HashSet<String>> = LazyLock::new(|| {
    let mut set = HashSet::new();
    for lang in [stop_words::LANGUAGE::Portuguese, stop_words::LANGUAGE::English] {
        set.extend(stop_words::get(lang));
    }
    set
});

/// Single active stemmer. The system this specification distills from keeps
/// an English stemmer defined but unused; only the Portuguese stemmer runs,
/// which is why English words in practice survive stemming unchanged (see
/// the end-to-end scenario in spec §8: "quick brown fox" stems to itself).
fn stemmer() -> &'static Stemmer {
    static STEMMER: LazyLock<Stemmer> = LazyLock::new(|| Stemmer::create(Algorithm::Portuguese));
    &STEMMER
}

/// Splits `text` on whitespace into raw word candidates.
///
/// This mirrors `nltk.word_tokenize` only in spirit: a real sentence
/// tokenizer/BPE pipeline is out of scope for this system (spec.md §1 treats
/// tokenization as an external collaborator); whitespace splitting plus the
/// downstream punctuation/length filters below produce the same token set
/// for the kind of already-whitespace-normalized text this pipeline sees.
fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Lowercases, removes stopwords, drops malformed tokens, stems, and
/// truncates. Returns the final sequence of terms as they will be indexed
/// or looked up.
pub fn tokenize_and_normalize(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter_map(normalize_word)
        .collect()
}

/// Applies the per-word filters and stemming from spec §4.3 step 2.
fn normalize_word(word: &str) -> Option<String> {
    let lower = word.to_lowercase();

    if STOPWORDS.contains(&lower) {
        return None;
    }
    if lower.chars().count() < MIN_CHARS_WORD {
        return None;
    }
    if lower.starts_with(LEADING_PUNCTUATION) {
        return None;
    }

    let mut stemmed = stemmer().stem(&lower).into_owned();
    if stemmed.len() > MAX_CHARS_WORD {
        let mut cut = MAX_CHARS_WORD;
        while !stemmed.is_char_boundary(cut) {
            cut -= 1;
        }
        stemmed.truncate(cut);
    }
    if stemmed.is_empty() {
        return None;
    }

    Some(stemmed)
}
