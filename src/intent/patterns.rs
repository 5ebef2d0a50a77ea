//! Intent pattern table and recognizer correction table
//!
//! Patterns are tried in declaration order and the first match wins. Each
//! pattern names the entity slots it declares; a slot is extracted from the
//! capture group with the same name as the slot key.

use regex::{Regex, RegexBuilder};

use super::types::{EntityKind, IntentType};

/// Source form of one classification rule
struct PatternSpec {
    intent: IntentType,
    pattern: String,
    slots: &'static [EntityKind],
    /// Extracted when captured, never reported missing
    optional: &'static [EntityKind],
}

const TITLES: &str = r"(?:professor|prof|doctor|dr|teacher|sir|madam|mrs|mr|ms)";

const ROLES: &str = r"(?:vice[\s-]?principal|principal|dean|hod|head\s+of\s+(?:the\s+)?department|director|chairman|registrar|librarian)";

const NAVIGATION_PHRASES: &str = r"(?:how\s+(?:do|can|should)\s+i\s+(?:get|go|reach|walk)(?:\s+to)?|how\s+to\s+(?:get|go|reach)(?:\s+to)?|where\s+is|where's|take\s+me\s+to|guide\s+me\s+to|directions?\s+(?:to|for)|(?:the\s+)?way\s+to|route\s+to|path\s+to|i\s+(?:want|need)\s+to\s+(?:go|get)\s+to|navigate\s+to)";

fn specs() -> Vec<PatternSpec> {
    use EntityKind::*;
    use IntentType::*;

    vec![
        // "how do i get to the principal's office" asks for a place, not a person
        PatternSpec {
            intent: Navigation,
            pattern: format!(r"\b{NAVIGATION_PHRASES}\s+(?P<location>.+)"),
            slots: &[Location],
            optional: &[],
        },
        // "tell me about professor smith", "who is dr. nair"
        PatternSpec {
            intent: FacultyInfo,
            pattern: format!(r"\b{TITLES}\.?\s+(?P<person_name>[a-z][a-z.'\s-]*)"),
            slots: &[PersonName],
            optional: &[],
        },
        // "who is the principal", "who is the hod of computer science"
        PatternSpec {
            intent: FacultyInfo,
            pattern: format!(
                r"\b(?P<role>{ROLES})\b(?:\s+(?:of|for|in)\s+(?:the\s+)?(?P<department_name>[a-z][a-z&.\s-]*))?"
            ),
            slots: &[Role],
            optional: &[DepartmentName],
        },
        // Asked for directions without saying where
        PatternSpec {
            intent: Navigation,
            pattern: r"\b(?:where\s+is|take\s+me|directions?|navigate|guide\s+me)\b".to_string(),
            slots: &[Location],
            optional: &[],
        },
        PatternSpec {
            intent: StudentLookup,
            pattern: r"\broll\s*(?:number|no\.?|#)?\s*(?:is\s+)?(?P<roll_number>[a-z]{0,4}\s*-?\s*\d[a-z0-9\s-]*)".to_string(),
            slots: &[RollNumber],
            optional: &[],
        },
        PatternSpec {
            intent: StudentLookup,
            pattern: r"\bstudent\s+(?:named\s+|called\s+)?(?P<student_name>[a-z][a-z.'\s-]*)".to_string(),
            slots: &[StudentName],
            optional: &[],
        },
        PatternSpec {
            intent: StudentLookup,
            pattern: r"\b(?:students?|roll\s*number|enrol+(?:ed|ment)?)\b".to_string(),
            slots: &[StudentName],
            optional: &[],
        },
        // "what departments are there": answered with the full list
        PatternSpec {
            intent: DepartmentInfo,
            pattern: r"\b(?:what|which|list|all)\s+(?:(?:are\s+)?the\s+|all\s+)?departments\b|\bdepartments\s+(?:are\s+there|do\s+you\s+have)\b".to_string(),
            slots: &[],
            optional: &[],
        },
        PatternSpec {
            intent: DepartmentInfo,
            pattern: r"\b(?:department|dept)\.?\s+of\s+(?P<department_name>[a-z][a-z&.\s-]*)".to_string(),
            slots: &[DepartmentName],
            optional: &[],
        },
        PatternSpec {
            intent: DepartmentInfo,
            pattern: r"\b(?P<department_name>[a-z][a-z&.-]*(?:\s+[a-z][a-z&.-]*){0,5}?)\s+(?:department|dept)\b".to_string(),
            slots: &[DepartmentName],
            optional: &[],
        },
        PatternSpec {
            intent: DepartmentInfo,
            pattern: r"\b(?:departments?|dept)\b".to_string(),
            slots: &[DepartmentName],
            optional: &[],
        },
        PatternSpec {
            intent: FacultyInfo,
            pattern: r"\bwho\s+is\s+(?P<person_name>.+)".to_string(),
            slots: &[PersonName],
            optional: &[],
        },
        PatternSpec {
            intent: FacultyInfo,
            pattern: r"\b(?:faculty|professors|teachers|staff)\b".to_string(),
            slots: &[PersonName],
            optional: &[],
        },
        PatternSpec {
            intent: Help,
            pattern: r"\b(?:help|what\s+can\s+you\s+do|options|menu|capabilities|features)\b".to_string(),
            slots: &[],
            optional: &[],
        },
        PatternSpec {
            intent: Greeting,
            pattern: r"\b(?:hello|hi|hey|hai|good\s+(?:morning|afternoon|evening)|greetings|howdy|namaste|what'?s\s+up)\b".to_string(),
            slots: &[],
            optional: &[],
        },
        PatternSpec {
            intent: Farewell,
            pattern: r"\b(?:bye|goodbye|good\s+bye|see\s+you|thank(?:s|\s+you)|that'?s\s+all|no\s+more\s+questions)\b".to_string(),
            slots: &[],
            optional: &[],
        },
    ]
}

/// Common recognizer garbles, replaced on word boundaries before classification
const CORRECTIONS: &[(&str, &str)] = &[
    // v/w confusion
    ("vhere", "where"),
    ("vhat", "what"),
    ("vhich", "which"),
    ("vho", "who"),
    ("vant", "want"),
    ("vay", "way"),
    // campus terms
    ("liberry", "library"),
    ("libbary", "library"),
    ("hostle", "hostel"),
    ("hostall", "hostel"),
    ("affice", "office"),
    ("offis", "office"),
    ("can teen", "canteen"),
    ("kanteen", "canteen"),
    ("caffeteria", "cafeteria"),
    ("labortary", "laboratory"),
    ("labrotary", "laboratory"),
    ("auditoriyam", "auditorium"),
    ("semminar", "seminar"),
    ("admishun", "admission"),
    ("depart meant", "department"),
    ("departmant", "department"),
    ("deparment", "department"),
    ("principel", "principal"),
    ("prinsiple", "principal"),
    ("prncipal", "principal"),
    ("professar", "professor"),
    ("profesar", "professor"),
    ("doc tar", "doctor"),
    // spelled-out department acronyms
    ("see us", "CS"),
    ("c s", "CS"),
    ("e c e", "ECE"),
    ("m c a", "MCA"),
    ("b c a", "BCA"),
    ("m b a", "MBA"),
];

/// Sound-alike rewrites, tried per word in order; a rewrite is kept only if
/// it lands on a word in [`KNOWN_WORDS`]
const PHONETIC_RULES: &[(&str, &str)] = &[
    (r"\bvh", "wh"),
    (r"\bv([aeiou])", "w${1}"),
    (r"shun\b", "tion"),
    (r"mant\b", "ment"),
    (r"shion\b", "sion"),
    (r"\bd(is|at|ere|ey|em|en)\b", "th${1}"),
    (r"iy(?:am|um)\b", "ium"),
];

const KNOWN_WORDS: &[&str] = &[
    "where", "what", "when", "which", "who", "why", "with", "want", "way", "work", "we", "will",
    "well", "were", "think", "thing", "that", "this", "there", "them", "then", "the", "they",
    "mention", "department", "placement", "admission", "auditorium", "navigation", "direction",
    "location", "information", "question", "session", "permission", "decision", "management",
    "assessment", "environment", "development",
];

/// Short department names, tried as an alternative reading of a captured slot
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("cs", "Computer Science"),
    ("ece", "Electronics and Communication"),
    ("it", "Information Technology"),
    ("mca", "MCA"),
    ("bca", "BCA"),
    ("mech", "Mechanical"),
];

/// A compiled classification rule
#[derive(Debug, Clone)]
pub struct IntentPattern {
    pub intent: IntentType,
    pub regex: Regex,
    pub slots: &'static [EntityKind],
    pub optional: &'static [EntityKind],
}

/// A compiled word-boundary replacement
#[derive(Debug, Clone)]
pub struct Correction {
    regex: Regex,
    replacement: &'static str,
}

/// Compile the pattern table in declaration order
pub fn compile_patterns() -> Result<Vec<IntentPattern>, regex::Error> {
    specs()
        .into_iter()
        .map(|spec| {
            Ok(IntentPattern {
                intent: spec.intent,
                regex: RegexBuilder::new(&spec.pattern)
                    .case_insensitive(true)
                    .build()?,
                slots: spec.slots,
                optional: spec.optional,
            })
        })
        .collect()
}

fn compile_words(table: &[(&str, &'static str)]) -> Result<Vec<Correction>, regex::Error> {
    table
        .iter()
        .map(|(wrong, right)| {
            let pattern = format!(r"\b{}\b", regex::escape(wrong));
            Ok(Correction {
                regex: RegexBuilder::new(&pattern).case_insensitive(true).build()?,
                replacement: *right,
            })
        })
        .collect()
}

/// Compile the correction table
pub fn compile_corrections() -> Result<Vec<Correction>, regex::Error> {
    compile_words(CORRECTIONS)
}

/// Compile the abbreviation table
pub fn compile_abbreviations() -> Result<Vec<Correction>, regex::Error> {
    compile_words(ABBREVIATIONS)
}

/// Compile the sound-alike rules
pub fn compile_phonetic() -> Result<Vec<Correction>, regex::Error> {
    PHONETIC_RULES
        .iter()
        .map(|(pattern, replacement)| {
            Ok(Correction {
                regex: RegexBuilder::new(pattern).case_insensitive(true).build()?,
                replacement: *replacement,
            })
        })
        .collect()
}

/// Apply every correction in table order
pub fn apply_corrections(corrections: &[Correction], text: &str) -> String {
    corrections.iter().fold(text.to_string(), |acc, c| {
        c.regex.replace_all(&acc, c.replacement).into_owned()
    })
}

/// Rewrite each word with the first sound-alike rule that yields a known word
pub fn apply_phonetic(rules: &[Correction], text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            rules
                .iter()
                .map(|rule| rule.regex.replace_all(word, rule.replacement))
                .find(|candidate| {
                    let lower = candidate.to_lowercase();
                    lower != word.to_lowercase() && KNOWN_WORDS.contains(&lower.as_str())
                })
                .map_or_else(|| word.to_string(), |candidate| candidate.into_owned())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Filler words stripped from the edges of a captured slot value
const LEADING_FILLER: &[&str] = &[
    "the", "a", "an", "about", "me", "tell", "of", "our", "your", "for", "is", "what", "which",
    "where", "in", "on", "at", "to", "info", "information", "details", "please", "give",
];

const TRAILING_FILLER: &[&str] = &["please", "now", "located", "situated", "then", "today"];

/// Trim punctuation and filler words from a captured slot value
pub fn clean_capture(kind: EntityKind, capture: &str) -> String {
    let stripped: String = capture
        .chars()
        .map(|c| if matches!(c, '?' | '!' | ',' | ';' | ':') { ' ' } else { c })
        .collect();

    let mut words: Vec<&str> = stripped.split_whitespace().collect();
    while let Some(first) = words.first() {
        if LEADING_FILLER.contains(&first.to_lowercase().as_str()) {
            words.remove(0);
        } else {
            break;
        }
    }
    while let Some(last) = words.last() {
        if TRAILING_FILLER.contains(&last.trim_end_matches('.').to_lowercase().as_str()) {
            words.pop();
        } else {
            break;
        }
    }

    if kind == EntityKind::DepartmentName {
        while let Some(last) = words.last() {
            if matches!(last.trim_end_matches('.').to_lowercase().as_str(), "department" | "dept") {
                words.pop();
            } else {
                break;
            }
        }
    }

    let joined = words.join(" ");
    let joined = joined.trim_end_matches('.').trim();

    match kind {
        EntityKind::RollNumber => joined
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_uppercase(),
        _ => joined.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        let patterns = compile_patterns().unwrap();
        assert!(!patterns.is_empty());
        for p in &patterns {
            for slot in p.optional {
                assert!(
                    p.regex.capture_names().flatten().any(|n| n == slot.key()),
                    "{:?} optional slot {}",
                    p.intent,
                    slot
                );
            }
            for slot in p.slots {
                // Every declared slot either has a capture group or is a
                // "mentioned but not said" pattern with no groups at all
                let has_group = p.regex.capture_names().flatten().any(|n| n == slot.key());
                let has_no_groups = p.regex.capture_names().flatten().count() == 0;
                assert!(has_group || has_no_groups, "{:?} slot {}", p.intent, slot);
            }
        }
    }

    #[test]
    fn test_corrections_apply_on_word_boundaries() {
        let corrections = compile_corrections().unwrap();
        assert_eq!(
            apply_corrections(&corrections, "vhere is the liberry"),
            "where is the library"
        );
        // "vhost" is not "vho"
        assert_eq!(apply_corrections(&corrections, "vhost"), "vhost");
    }

    #[test]
    fn test_phonetic_rewrites_only_known_words() {
        let rules = compile_phonetic().unwrap();
        assert_eq!(
            apply_phonetic(&rules, "vith dis placemant"),
            "with this placement"
        );
        assert_eq!(apply_phonetic(&rules, "auditoriyum dere"), "auditorium there");
        // "van" would become "wan", which is not a word we know
        assert_eq!(apply_phonetic(&rules, "the van dog"), "the van dog");
    }

    #[test]
    fn test_abbreviations_expand_whole_words() {
        let abbreviations = compile_abbreviations().unwrap();
        assert_eq!(apply_corrections(&abbreviations, "cs"), "Computer Science");
        assert_eq!(apply_corrections(&abbreviations, "ECE"), "Electronics and Communication");
        assert_eq!(apply_corrections(&abbreviations, "mech"), "Mechanical");
        assert_eq!(apply_corrections(&abbreviations, "physics"), "physics");
    }

    #[test]
    fn test_clean_capture_drops_trailing_department_word() {
        assert_eq!(clean_capture(EntityKind::DepartmentName, "the cs department"), "cs");
        assert_eq!(clean_capture(EntityKind::Location, "the cs department"), "cs department");
    }

    #[test]
    fn test_clean_capture_strips_filler() {
        assert_eq!(clean_capture(EntityKind::Location, "the library please?"), "library");
        assert_eq!(
            clean_capture(EntityKind::DepartmentName, "about the computer science"),
            "computer science"
        );
        assert_eq!(clean_capture(EntityKind::PersonName, "smtih."), "smtih");
    }

    #[test]
    fn test_clean_capture_roll_number() {
        assert_eq!(clean_capture(EntityKind::RollNumber, "cs 2021 001"), "CS2021001");
        assert_eq!(clean_capture(EntityKind::RollNumber, "cs-2021-001?"), "CS2021001");
    }
}
