//! Two-stage intent resolution
//!
//! Stage 1 classifies the utterance with the ordered pattern table. Stage 2
//! scores every captured slot against its reference vocabulary and keeps the
//! best entry only when it clears the slot's acceptance threshold.

use std::collections::BTreeMap;

use tracing::debug;

use super::fuzzy::{FuzzyMatcher, DEFAULT_THRESHOLD};
use super::patterns::{
    apply_corrections, apply_phonetic, clean_capture, compile_abbreviations, compile_corrections,
    compile_patterns, compile_phonetic, Correction, IntentPattern,
};
use super::types::{Entity, EntityKind, ResolvedIntent};

/// Acceptance thresholds, global with optional per-slot overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityThresholds {
    pub default: u8,
    pub overrides: BTreeMap<EntityKind, u8>,
}

impl Default for EntityThresholds {
    fn default() -> Self {
        Self {
            default: DEFAULT_THRESHOLD,
            overrides: BTreeMap::new(),
        }
    }
}

impl EntityThresholds {
    pub fn uniform(threshold: u8) -> Self {
        Self {
            default: threshold,
            overrides: BTreeMap::new(),
        }
    }

    pub fn for_kind(&self, kind: EntityKind) -> u8 {
        self.overrides.get(&kind).copied().unwrap_or(self.default)
    }

    pub fn matcher(&self, kind: EntityKind) -> FuzzyMatcher {
        FuzzyMatcher::new(self.for_kind(kind))
    }
}

/// Reference names each slot kind is matched against
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    names: BTreeMap<EntityKind, Vec<String>>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: EntityKind, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.set(kind, names);
        self
    }

    /// Replace the names for one kind, dropping blanks and duplicates
    pub fn set(&mut self, kind: EntityKind, names: impl IntoIterator<Item = impl Into<String>>) {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name: String = name.into();
            let name = name.trim();
            if !name.is_empty() && !unique.iter().any(|u| u.eq_ignore_ascii_case(name)) {
                unique.push(name.to_string());
            }
        }
        self.names.insert(kind, unique);
    }

    pub fn get(&self, kind: EntityKind) -> &[String] {
        self.names.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.names.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Turns raw recognized text into a [`ResolvedIntent`]
#[derive(Debug, Clone)]
pub struct IntentResolver {
    patterns: Vec<IntentPattern>,
    corrections: Vec<Correction>,
    phonetic: Vec<Correction>,
    abbreviations: Vec<Correction>,
    vocabulary: Vocabulary,
    thresholds: EntityThresholds,
}

impl IntentResolver {
    pub fn new(vocabulary: Vocabulary, thresholds: EntityThresholds) -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: compile_patterns()?,
            corrections: compile_corrections()?,
            phonetic: compile_phonetic()?,
            abbreviations: compile_abbreviations()?,
            vocabulary,
            thresholds,
        })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Resolve one utterance.
    ///
    /// Total and deterministic: any input yields a result, and the same text
    /// against the same vocabulary always yields the same result.
    pub fn resolve(&self, text: &str) -> ResolvedIntent {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return ResolvedIntent::unknown(text);
        }

        let corrected = apply_phonetic(&self.phonetic, &apply_corrections(&self.corrections, trimmed));

        let Some((pattern, captures)) = self
            .patterns
            .iter()
            .find_map(|p| p.regex.captures(&corrected).map(|c| (p, c)))
        else {
            debug!(text = %trimmed, "no intent pattern matched");
            return ResolvedIntent::unknown(text);
        };

        let mut resolved = ResolvedIntent {
            intent: pattern.intent,
            entities: Vec::new(),
            missing: Vec::new(),
            utterance: text.to_string(),
        };

        if pattern.intent.is_conversational() {
            return resolved;
        }

        for &kind in pattern.slots {
            let capture = captures
                .name(kind.key())
                .map(|m| clean_capture(kind, m.as_str()))
                .filter(|c| !c.is_empty());

            match capture {
                Some(raw) => resolved.entities.push(self.extract(kind, raw)),
                None => resolved.missing.push(kind),
            }
        }

        for &kind in pattern.optional {
            if let Some(raw) = captures
                .name(kind.key())
                .map(|m| clean_capture(kind, m.as_str()))
                .filter(|c| !c.is_empty())
            {
                resolved.entities.push(self.extract(kind, raw));
            }
        }

        debug!(
            intent = %resolved.intent,
            entities = resolved.entities.len(),
            missing = resolved.missing.len(),
            "intent resolved"
        );

        resolved
    }

    /// Score a captured value against the slot's vocabulary.
    ///
    /// An abbreviation such as "cs" is also scored in its expanded form; the
    /// expansion is used only when it scores strictly higher.
    fn extract(&self, kind: EntityKind, raw: String) -> Entity {
        let matcher = self.thresholds.matcher(kind);
        let vocabulary = self.vocabulary.get(kind);

        let mut best = matcher.best_match(&raw, vocabulary);
        if kind != EntityKind::RollNumber {
            let expanded = apply_corrections(&self.abbreviations, &raw);
            if expanded != raw {
                if let Some(alt) = matcher.best_match(&expanded, vocabulary) {
                    if best.as_ref().map_or(true, |b| alt.score > b.score) {
                        debug!(%kind, %raw, %expanded, "abbreviation expanded");
                        best = Some(alt);
                    }
                }
            }
        }

        match best {
            Some(best) if matcher.accepts(best.score) => Entity {
                kind,
                value: best.value,
                raw,
                score: best.score,
                accepted: true,
            },
            best => {
                let score = best.map(|b| b.score).unwrap_or(0);
                debug!(%kind, %raw, score, threshold = matcher.threshold(), "entity below threshold");
                Entity {
                    kind,
                    value: raw.clone(),
                    raw,
                    score,
                    accepted: false,
                }
            }
        }
    }
}
