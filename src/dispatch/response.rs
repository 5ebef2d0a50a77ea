//! Response values and the spoken templates that build them

use serde::Serialize;

use crate::campus::{DepartmentRecord, FacultyRecord, Route, StudentRecord};
use crate::intent::IntentType;

/// How a response relates to the request that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// The request was answered from a collaborator
    Answer,
    /// Canned conversational text
    Template,
    /// The request was unknown or under-specified
    Clarification,
    /// A lookup or route came back empty
    Apology,
}

/// Structured data behind an answer, for collaborators that want more than text
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    Route(Route),
    Faculty(FacultyRecord),
    Student(StudentRecord),
    Department(DepartmentRecord),
    Departments { names: Vec<String> },
}

/// What the agent says back for one turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub kind: ResponseKind,
    pub text: String,
    pub payload: Option<ResponsePayload>,
}

impl Response {
    pub fn answer(text: impl Into<String>, payload: ResponsePayload) -> Self {
        Self {
            kind: ResponseKind::Answer,
            text: text.into(),
            payload: Some(payload),
        }
    }

    pub fn template(text: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Template,
            text: text.into(),
            payload: None,
        }
    }

    pub fn clarification(text: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Clarification,
            text: text.into(),
            payload: None,
        }
    }

    pub fn apology(text: impl Into<String>) -> Self {
        Self {
            kind: ResponseKind::Apology,
            text: text.into(),
            payload: None,
        }
    }
}

pub const GREETING: &str = "Hello! Welcome to our campus. I can help you with directions, \
finding faculty, looking up students, or department information. Just ask me anything!";

pub const FAREWELL: &str = "Goodbye! Have a great day. Feel free to ask me anytime.";

pub const HELP: &str = "I can help you with several things. \
Ask me for directions to any building or department. \
Ask me about a professor or faculty member. \
Ask me to look up a student by name or roll number. \
Or ask about department information. What would you like?";

pub const NOT_UNDERSTOOD: &str = "I'm sorry, I didn't understand that. You can ask me for \
directions, about faculty, students, or departments. Could you try rephrasing?";

pub const ERROR_APOLOGY: &str = "Sorry, something went wrong on my side. Please try again.";

pub const WAKE_ACK: &str = "Yes? How can I help you?";

pub const BOOT_GREETING: &str = "Hello! I'm the campus assistant. Say hey robot to ask me anything.";

pub const SHUTDOWN_FAREWELL: &str = "Shutting down. Goodbye!";

/// Clarification for an intent whose slot was never said
pub fn clarification_for(intent: IntentType) -> &'static str {
    match intent {
        IntentType::Navigation => "Where would you like to go? Please mention a specific location.",
        IntentType::FacultyInfo => "Which faculty member would you like to know about?",
        IntentType::StudentLookup => {
            "Which student are you looking for? You can tell me their name or roll number."
        }
        IntentType::DepartmentInfo => "Which department would you like to know about?",
        _ => NOT_UNDERSTOOD,
    }
}

pub fn location_not_found(term: &str) -> String {
    format!("I couldn't find a location matching '{term}'. Could you try again?")
}

pub fn no_route(destination: &str) -> String {
    format!("I know where {destination} is, but I couldn't find a walking route there right now.")
}

pub fn already_there(destination: &str) -> String {
    format!("You are already at {destination}.")
}

pub fn faculty_not_found(term: &str) -> String {
    format!("I couldn't find any faculty matching '{term}'.")
}

pub fn role_not_found(term: &str) -> String {
    format!("I couldn't find a {term} in our records.")
}

pub fn student_not_found(term: &str) -> String {
    format!("I couldn't find any student matching '{term}'.")
}

pub fn department_not_found(term: &str) -> String {
    format!("I couldn't find a department matching '{term}'.")
}

/// Prefix for answers built from a best-effort substitute record
pub fn closest_match(name: &str) -> String {
    format!("The closest match I found is {name}.")
}

/// "Here are the directions from A to B: Step 1: ... approximately N minutes."
pub fn directions(route: &Route) -> String {
    let origin = route.stops.first().map(String::as_str).unwrap_or_default();
    let destination = route.stops.last().map(String::as_str).unwrap_or_default();

    let mut parts = vec![format!("Here are the directions from {origin} to {destination}:")];
    for (i, step) in route.steps.iter().enumerate() {
        parts.push(format!("Step {}: {}", i + 1, step.instruction));
    }

    let minutes = route.walking_minutes();
    let unit = if minutes == 1 { "minute" } else { "minutes" };
    parts.push(format!(
        "The total walking distance is approximately {minutes} {unit}."
    ));

    parts.join(" ")
}

pub fn faculty(record: &FacultyRecord) -> String {
    let department = record.department.as_deref().unwrap_or("an unknown department");
    let mut parts = vec![format!(
        "{} is a {} in {}.",
        record.name, record.designation, department
    )];
    if let Some(q) = &record.qualification {
        parts.push(format!("Qualification: {q}."));
    }
    if let Some(office) = &record.office {
        parts.push(format!("Their office is at {office}."));
    }
    if let Some(email) = &record.email {
        parts.push(format!("Email: {email}."));
    }
    parts.join(" ")
}

pub fn role_holder(record: &FacultyRecord) -> String {
    let mut parts = vec![format!("The {} is {}.", record.designation, record.name)];
    if let Some(q) = &record.qualification {
        parts.push(format!("Qualification: {q}."));
    }
    if let Some(email) = &record.email {
        parts.push(format!("Email: {email}."));
    }
    parts.join(" ")
}

pub fn student(record: &StudentRecord) -> String {
    let mut text = format!("{}, roll number {}", record.name, record.roll_number);
    match (record.year, record.department.as_deref()) {
        (Some(year), Some(dept)) => text.push_str(&format!(", is a year {year} student in {dept}")),
        (Some(year), None) => text.push_str(&format!(", is a year {year} student")),
        (None, Some(dept)) => text.push_str(&format!(", is a student in {dept}")),
        (None, None) => {}
    }
    if let Some(section) = &record.section {
        text.push_str(&format!(", section {section}"));
    }
    text.push('.');
    text
}

pub fn department(record: &DepartmentRecord) -> String {
    let mut first = format!("The {} department", record.name);
    if let Some(college) = &record.college {
        first.push_str(&format!(" is part of {college}"));
    }
    first.push('.');

    let mut parts = vec![first];
    if let Some(building) = &record.building {
        parts.push(format!(
            "It is located in {building}, floor {}.",
            record.floor.unwrap_or(0)
        ));
    }
    if let Some(head) = &record.head {
        parts.push(format!("The head of department is {head}."));
    }
    if let Some(phone) = &record.phone {
        parts.push(format!("You can contact them at {phone}."));
    }
    parts.join(" ")
}

pub fn department_list(names: &[String]) -> String {
    if names.is_empty() {
        return "I don't have any departments on record yet.".to_string();
    }
    format!("We have the following departments: {}.", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campus::RouteStep;

    #[test]
    fn test_directions_text() {
        let route = Route {
            stops: vec!["Main Gate".into(), "Admin Block".into(), "Library".into()],
            steps: vec![
                RouteStep {
                    from: "Main Gate".into(),
                    to: "Admin Block".into(),
                    instruction: "Walk straight ahead.".into(),
                    distance: 100.0,
                },
                RouteStep {
                    from: "Admin Block".into(),
                    to: "Library".into(),
                    instruction: "Turn left.".into(),
                    distance: 20.0,
                },
            ],
            total_distance: 120.0,
        };

        assert_eq!(
            directions(&route),
            "Here are the directions from Main Gate to Library: Step 1: Walk straight ahead. \
             Step 2: Turn left. The total walking distance is approximately 2 minutes."
        );
    }

    #[test]
    fn test_student_text_with_partial_record() {
        let record = StudentRecord {
            roll_number: "CS2021001".into(),
            name: "Rahul Menon".into(),
            department: Some("Computer Science".into()),
            year: Some(3),
            section: None,
        };
        assert_eq!(
            student(&record),
            "Rahul Menon, roll number CS2021001, is a year 3 student in Computer Science."
        );
    }

    #[test]
    fn test_not_found_names_the_term() {
        assert!(faculty_not_found("smtih").contains("'smtih'"));
        assert!(location_not_found("moon").contains("'moon'"));
    }

    #[test]
    fn test_department_list() {
        assert_eq!(
            department_list(&["CS".to_string(), "ECE".to_string()]),
            "We have the following departments: CS, ECE."
        );
        assert!(department_list(&[]).contains("don't have"));
    }
}
