//! Fuzzy similarity scoring for noisy recognizer output
//!
//! Scores are integers in `[0, 100]`. Comparison is case-insensitive and
//! ignores punctuation, so "Dr. John Smith" and "dr john smith" are equal.

use std::collections::BTreeSet;

/// Default minimum score for accepting a fuzzy entity match
pub const DEFAULT_THRESHOLD: u8 = 70;

/// References with at least this many words are also scored by token set
const TOKEN_SET_MIN_WORDS: usize = 3;

/// Best vocabulary entry for a candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch {
    /// The vocabulary entry, exactly as it appears in the vocabulary
    pub value: String,
    /// Similarity in `[0, 100]`
    pub score: u8,
}

/// Scores candidates against a reference vocabulary with an acceptance threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyMatcher {
    threshold: u8,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl FuzzyMatcher {
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold: threshold.min(100),
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Whether a score clears the acceptance threshold (inclusive)
    pub fn accepts(&self, score: u8) -> bool {
        score >= self.threshold
    }

    /// Highest-scoring vocabulary entry, accepted or not.
    ///
    /// Ties go to the entry declared first, so the result only depends on
    /// the candidate and the vocabulary order.
    pub fn best_match<S: AsRef<str>>(&self, candidate: &str, vocabulary: &[S]) -> Option<FuzzyMatch> {
        let mut best: Option<FuzzyMatch> = None;

        for reference in vocabulary {
            let reference = reference.as_ref();
            let score = score(candidate, reference);
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(FuzzyMatch {
                    value: reference.to_string(),
                    score,
                });
                if score == 100 {
                    break;
                }
            }
        }

        best
    }

    /// Best vocabulary entry, only if it clears the threshold
    pub fn find<S: AsRef<str>>(&self, candidate: &str, vocabulary: &[S]) -> Option<FuzzyMatch> {
        self.best_match(candidate, vocabulary)
            .filter(|m| self.accepts(m.score))
    }
}

/// Combined similarity of a candidate against one reference
pub fn score(candidate: &str, reference: &str) -> u8 {
    let candidate = normalize(candidate);
    let reference = normalize(reference);

    if candidate.is_empty() || reference.is_empty() {
        return 0;
    }
    if candidate == reference {
        return 100;
    }

    let mut best = ratio(&candidate, &reference).max(partial_ratio(&candidate, &reference));
    if reference.split(' ').count() >= TOKEN_SET_MIN_WORDS {
        best = best.max(token_set_ratio(&candidate, &reference));
    }
    best
}

/// Edit-distance similarity of two whole strings
pub fn ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() && b.is_empty() {
        return 100;
    }
    to_score(strsim::normalized_levenshtein(a, b))
}

/// Best similarity of the shorter string against every word-aligned window
/// of the longer one with the same word count
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a_words: Vec<&str> = a.split_whitespace().collect();
    let b_words: Vec<&str> = b.split_whitespace().collect();

    let (short, long) = if a_words.len() <= b_words.len() {
        (a_words, b_words)
    } else {
        (b_words, a_words)
    };

    if short.is_empty() {
        return 0;
    }

    let needle = short.join(" ");
    if short.len() == long.len() {
        return ratio(&needle, &long.join(" "));
    }

    long.windows(short.len())
        .map(|window| ratio(&needle, &window.join(" ")))
        .max()
        .unwrap_or(0)
}

/// Similarity that ignores word order and duplicated words
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let a_set: BTreeSet<&str> = a.split_whitespace().collect();
    let b_set: BTreeSet<&str> = b.split_whitespace().collect();

    let common = a_set.intersection(&b_set).copied().collect::<Vec<_>>().join(" ");
    let only_a = a_set.difference(&b_set).copied().collect::<Vec<_>>().join(" ");
    let only_b = b_set.difference(&a_set).copied().collect::<Vec<_>>().join(" ");

    let with_a = join_nonempty(&common, &only_a);
    let with_b = join_nonempty(&common, &only_b);

    let mut best = ratio(&with_a, &with_b);
    if !common.is_empty() {
        best = best.max(ratio(&common, &with_a)).max(ratio(&common, &with_b));
    }
    best
}

/// Lowercase, strip punctuation, collapse whitespace
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else if c == '\'' {
                '\0'
            } else {
                ' '
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_nonempty(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}

fn to_score(similarity: f64) -> u8 {
    (similarity.clamp(0.0, 1.0) * 100.0).round() as u8
}
