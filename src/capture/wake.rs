//! Wake phrase detection on recognized text

use crate::intent::fuzzy;

/// Minimum per-word similarity for each wake word in a fuzzy match
const TOKEN_FLOOR: u8 = 60;

/// A detected wake phrase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeMatch {
    pub score: u8,
    /// Words spoken after the wake phrase, if any
    pub follow_up: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WakeMatcher {
    /// Canonical phrase first, then accent variants; each as normalized words
    phrases: Vec<Vec<String>>,
    threshold: u8,
}

impl WakeMatcher {
    pub fn new<S: AsRef<str>>(phrase: &str, variants: &[S], threshold: u8) -> Self {
        let phrases = std::iter::once(phrase)
            .chain(variants.iter().map(AsRef::as_ref))
            .map(|p| {
                fuzzy::normalize(p)
                    .split(' ')
                    .filter(|w| !w.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|words| !words.is_empty())
            .collect();

        Self {
            phrases,
            threshold: threshold.min(100),
        }
    }

    fn canonical(&self) -> &[String] {
        self.phrases.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look for the wake phrase anywhere in `text`
    pub fn detect(&self, text: &str) -> Option<WakeMatch> {
        let normalized = fuzzy::normalize(text);
        let words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();

        let canonical = self.canonical();
        if canonical.is_empty() || words.len() < canonical.len() {
            return None;
        }

        // Exact canonical phrase or a known variant
        for phrase in &self.phrases {
            if let Some(start) = find_words(&words, phrase) {
                return Some(WakeMatch {
                    score: 100,
                    follow_up: follow_up(&words, start + phrase.len()),
                });
            }
        }

        // Fuzzy window over the canonical phrase
        let wanted = canonical.join(" ");
        let (start, score) = words
            .windows(canonical.len())
            .enumerate()
            .map(|(i, window)| (i, fuzzy::ratio(&window.join(" "), &wanted)))
            .fold(None::<(usize, u8)>, |best, (i, s)| match best {
                Some((_, b)) if b >= s => best,
                _ => Some((i, s)),
            })?;

        if score < self.threshold {
            return None;
        }

        let every_word_heard = canonical.iter().all(|wake_word| {
            words
                .iter()
                .any(|w| fuzzy::ratio(w, wake_word) >= TOKEN_FLOOR)
        });
        if !every_word_heard {
            return None;
        }

        Some(WakeMatch {
            score,
            follow_up: follow_up(&words, start + canonical.len()),
        })
    }
}

fn find_words(words: &[&str], phrase: &[String]) -> Option<usize> {
    words
        .windows(phrase.len())
        .position(|window| window.iter().zip(phrase).all(|(w, p)| *w == p.as_str()))
}

fn follow_up(words: &[&str], from: usize) -> Option<String> {
    let rest = words.get(from..)?.join(" ");
    (!rest.is_empty()).then_some(rest)
}
