//! Resolved intent value types

use serde::{Deserialize, Serialize};

/// The closed set of things a visitor can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Navigation,
    FacultyInfo,
    StudentLookup,
    DepartmentInfo,
    Greeting,
    Farewell,
    Help,
    Unknown,
}

impl Default for IntentType {
    fn default() -> Self {
        Self::Unknown
    }
}

impl IntentType {
    /// Intents answered from a template, without entity extraction
    pub fn is_conversational(&self) -> bool {
        matches!(
            self,
            IntentType::Greeting | IntentType::Farewell | IntentType::Help | IntentType::Unknown
        )
    }
}

impl std::fmt::Display for IntentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IntentType::Navigation => "navigation",
            IntentType::FacultyInfo => "faculty_info",
            IntentType::StudentLookup => "student_lookup",
            IntentType::DepartmentInfo => "department_info",
            IntentType::Greeting => "greeting",
            IntentType::Farewell => "farewell",
            IntentType::Help => "help",
            IntentType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Which slot an entity fills, and which vocabulary it is scored against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Campus location (building, facility, landmark)
    Location,
    /// Faculty member name
    PersonName,
    /// Student name
    StudentName,
    RollNumber,
    DepartmentName,
    /// Faculty designation such as "principal" or "hod"
    Role,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Location,
        EntityKind::PersonName,
        EntityKind::StudentName,
        EntityKind::RollNumber,
        EntityKind::DepartmentName,
        EntityKind::Role,
    ];

    /// Name of the regex capture group that extracts this slot
    pub fn key(&self) -> &'static str {
        match self {
            EntityKind::Location => "location",
            EntityKind::PersonName => "person_name",
            EntityKind::StudentName => "student_name",
            EntityKind::RollNumber => "roll_number",
            EntityKind::DepartmentName => "department_name",
            EntityKind::Role => "role",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// One extracted slot value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    /// Canonical vocabulary value when accepted, otherwise the raw capture
    pub value: String,
    /// Text as captured from the utterance
    pub raw: String,
    /// Fuzzy similarity of the best vocabulary entry, `[0, 100]`
    pub score: u8,
    /// Score cleared the acceptance threshold
    pub accepted: bool,
}

/// Result of running one utterance through the resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIntent {
    pub intent: IntentType,
    /// Entities in slot declaration order, accepted or not
    pub entities: Vec<Entity>,
    /// Declared slots for which nothing was captured
    pub missing: Vec<EntityKind>,
    /// The utterance exactly as received
    pub utterance: String,
}

impl ResolvedIntent {
    pub fn unknown(utterance: impl Into<String>) -> Self {
        Self {
            intent: IntentType::Unknown,
            entities: Vec::new(),
            missing: Vec::new(),
            utterance: utterance.into(),
        }
    }

    /// First accepted entity of the given kind
    pub fn accepted(&self, kind: EntityKind) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| e.kind == kind && e.accepted)
    }

    /// First entity of the given kind, accepted or not
    pub fn entity(&self, kind: EntityKind) -> Option<&Entity> {
        self.entities.iter().find(|e| e.kind == kind)
    }

    /// A declared slot is missing or below the acceptance threshold
    pub fn is_under_specified(&self) -> bool {
        !self.missing.is_empty() || self.entities.iter().any(|e| !e.accepted)
    }
}
