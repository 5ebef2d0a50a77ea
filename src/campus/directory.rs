//! Campus records: faculty, students, departments
//!
//! The directory answers exact-or-not-found, plus a best-effort substitute
//! when only a fuzzy match clears the threshold.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::intent::fuzzy::{self, FuzzyMatcher};
use crate::intent::{EntityKind, Vocabulary};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacultyRecord {
    pub name: String,
    pub designation: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub office: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub qualification: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub roll_number: String,
    pub name: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub year: Option<u8>,
    #[serde(default)]
    pub section: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentRecord {
    pub name: String,
    #[serde(default)]
    pub college: Option<String>,
    #[serde(default)]
    pub building: Option<String>,
    #[serde(default)]
    pub floor: Option<i32>,
    /// Name of the head of department
    #[serde(default)]
    pub head: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Outcome of a directory lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// The query named this record exactly (case and punctuation aside)
    Exact(T),
    /// No exact record; this is the closest one above the threshold
    Substitute { record: T, score: u8 },
    NotFound,
}

impl<T> Lookup<T> {
    pub fn record(&self) -> Option<&T> {
        match self {
            Lookup::Exact(r) | Lookup::Substitute { record: r, .. } => Some(r),
            Lookup::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        !matches!(self, Lookup::NotFound)
    }
}

/// Errors from the directory backend itself (not "no such record")
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("campus directory unavailable: {0}")]
    Unavailable(String),
}

/// Query surface the dispatcher uses for campus records
pub trait CampusDirectory: Send + Sync {
    fn find_faculty(&self, name: &str) -> Result<Lookup<FacultyRecord>, DirectoryError>;

    /// Faculty holding a designation such as "principal" or "hod", within
    /// one department when given
    fn find_faculty_by_role(
        &self,
        role: &str,
        department: Option<&str>,
    ) -> Result<Lookup<FacultyRecord>, DirectoryError>;

    fn find_student(&self, roll_or_name: &str) -> Result<Lookup<StudentRecord>, DirectoryError>;

    fn find_department(&self, name: &str) -> Result<Lookup<DepartmentRecord>, DirectoryError>;

    fn list_departments(&self) -> Result<Vec<DepartmentRecord>, DirectoryError>;

    /// Reference names for entity extraction
    fn vocabulary(&self) -> Vocabulary;
}

/// On-disk shape of `campus.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampusData {
    #[serde(default)]
    pub departments: Vec<DepartmentRecord>,
    #[serde(default)]
    pub faculty: Vec<FacultyRecord>,
    #[serde(default)]
    pub students: Vec<StudentRecord>,
}

/// In-memory directory loaded once from a JSON file
#[derive(Debug, Clone)]
pub struct JsonDirectory {
    data: CampusData,
    matcher: FuzzyMatcher,
}

impl JsonDirectory {
    /// Load `campus.json`; failure is fatal at startup
    pub fn load(path: &Path, matcher: FuzzyMatcher) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read campus data {}", path.display()))?;
        let data: CampusData = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse campus data {}", path.display()))?;

        info!(
            departments = data.departments.len(),
            faculty = data.faculty.len(),
            students = data.students.len(),
            "campus directory loaded"
        );

        Ok(Self::from_data(data, matcher))
    }

    pub fn from_data(data: CampusData, matcher: FuzzyMatcher) -> Self {
        Self { data, matcher }
    }

    fn lookup<T: Clone>(&self, query: &str, records: &[T], key: impl Fn(&T) -> &str) -> Lookup<T> {
        let wanted = fuzzy::normalize(query);
        if wanted.is_empty() {
            return Lookup::NotFound;
        }

        if let Some(record) = records.iter().find(|r| fuzzy::normalize(key(*r)) == wanted) {
            return Lookup::Exact(record.clone());
        }

        let mut best: Option<(&T, u8)> = None;
        for record in records {
            let score = fuzzy::score(query, key(record));
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((record, score));
            }
        }

        match best {
            Some((record, score)) if self.matcher.accepts(score) => {
                debug!(query, score, "directory substitute match");
                Lookup::Substitute {
                    record: record.clone(),
                    score,
                }
            }
            _ => Lookup::NotFound,
        }
    }
}

/// Spoken role names that map onto a stored designation
fn canonical_role(role: &str) -> String {
    let role = fuzzy::normalize(role);
    match role.as_str() {
        "head of department" | "head of the department" => "hod".to_string(),
        "vice principal" | "viceprincipal" => "vice principal".to_string(),
        _ => role,
    }
}

impl CampusDirectory for JsonDirectory {
    fn find_faculty(&self, name: &str) -> Result<Lookup<FacultyRecord>, DirectoryError> {
        Ok(self.lookup(name, &self.data.faculty, |f| f.name.as_str()))
    }

    fn find_faculty_by_role(
        &self,
        role: &str,
        department: Option<&str>,
    ) -> Result<Lookup<FacultyRecord>, DirectoryError> {
        let role = canonical_role(role);
        let Some(department) = department else {
            return Ok(self.lookup(&role, &self.data.faculty, |f| f.designation.as_str()));
        };

        let members: Vec<FacultyRecord> = self
            .data
            .faculty
            .iter()
            .filter(|f| {
                f.department
                    .as_deref()
                    .map_or(false, |d| self.matcher.accepts(fuzzy::score(department, d)))
            })
            .cloned()
            .collect();
        debug!(department, members = members.len(), "role lookup scoped to department");

        Ok(self.lookup(&role, &members, |f| f.designation.as_str()))
    }

    fn find_student(&self, roll_or_name: &str) -> Result<Lookup<StudentRecord>, DirectoryError> {
        let roll: String = roll_or_name
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_uppercase();

        if let Some(student) = self
            .data
            .students
            .iter()
            .find(|s| !roll.is_empty() && s.roll_number.eq_ignore_ascii_case(&roll))
        {
            return Ok(Lookup::Exact(student.clone()));
        }

        Ok(self.lookup(roll_or_name, &self.data.students, |s| s.name.as_str()))
    }

    fn find_department(&self, name: &str) -> Result<Lookup<DepartmentRecord>, DirectoryError> {
        Ok(self.lookup(name, &self.data.departments, |d| d.name.as_str()))
    }

    fn list_departments(&self) -> Result<Vec<DepartmentRecord>, DirectoryError> {
        Ok(self.data.departments.clone())
    }

    fn vocabulary(&self) -> Vocabulary {
        Vocabulary::new()
            .with(EntityKind::PersonName, self.data.faculty.iter().map(|f| f.name.clone()))
            .with(EntityKind::Role, self.data.faculty.iter().map(|f| f.designation.clone()))
            .with(EntityKind::StudentName, self.data.students.iter().map(|s| s.name.clone()))
            .with(EntityKind::RollNumber, self.data.students.iter().map(|s| s.roll_number.clone()))
            .with(EntityKind::DepartmentName, self.data.departments.iter().map(|d| d.name.clone()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    pub(crate) fn sample_data() -> CampusData {
        CampusData {
            departments: vec![
                DepartmentRecord {
                    name: "Computer Science".to_string(),
                    college: Some("LMCST".to_string()),
                    building: Some("Block A".to_string()),
                    floor: Some(2),
                    head: Some("Dr. Anil Kumar".to_string()),
                    phone: None,
                },
                DepartmentRecord {
                    name: "Mechanical Engineering".to_string(),
                    college: None,
                    building: Some("Block C".to_string()),
                    floor: Some(0),
                    head: None,
                    phone: Some("0471 2349 100".to_string()),
                },
            ],
            faculty: vec![
                FacultyRecord {
                    name: "Dr. Anil Kumar".to_string(),
                    designation: "HOD".to_string(),
                    department: Some("Computer Science".to_string()),
                    office: Some("A-201".to_string()),
                    email: Some("anil@example.edu".to_string()),
                    qualification: Some("PhD".to_string()),
                },
                FacultyRecord {
                    name: "Priya Nair".to_string(),
                    designation: "Assistant Professor".to_string(),
                    department: Some("Computer Science".to_string()),
                    office: None,
                    email: None,
                    qualification: None,
                },
                FacultyRecord {
                    name: "Dr. Mary George".to_string(),
                    designation: "Principal".to_string(),
                    department: None,
                    office: Some("Admin Block".to_string()),
                    email: None,
                    qualification: None,
                },
            ],
            students: vec![StudentRecord {
                roll_number: "CS2021001".to_string(),
                name: "Rahul Menon".to_string(),
                department: Some("Computer Science".to_string()),
                year: Some(3),
                section: Some("A".to_string()),
            }],
        }
    }

    fn directory() -> JsonDirectory {
        JsonDirectory::from_data(sample_data(), FuzzyMatcher::default())
    }

    #[test]
    fn test_exact_faculty_lookup() {
        let found = directory().find_faculty("dr anil kumar").unwrap();
        assert!(matches!(found, Lookup::Exact(ref f) if f.name == "Dr. Anil Kumar"));
    }

    #[test]
    fn test_substitute_faculty_lookup() {
        let found = directory().find_faculty("priya").unwrap();
        match found {
            Lookup::Substitute { record, score } => {
                assert_eq!(record.name, "Priya Nair");
                assert!(score >= 70);
            }
            other => panic!("expected substitute, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_faculty_not_found() {
        assert_eq!(directory().find_faculty("smtih").unwrap(), Lookup::NotFound);
        assert_eq!(directory().find_faculty("  ").unwrap(), Lookup::NotFound);
    }

    #[test]
    fn test_role_lookup_with_alias() {
        let found = directory().find_faculty_by_role("head of department", None).unwrap();
        assert_eq!(found.record().unwrap().name, "Dr. Anil Kumar");
        let found = directory().find_faculty_by_role("Principal", None).unwrap();
        assert_eq!(found.record().unwrap().name, "Dr. Mary George");
    }

    #[test]
    fn test_role_lookup_scoped_to_department() {
        let mut data = sample_data();
        data.faculty.push(FacultyRecord {
            name: "Dr. Ravi Shankar".to_string(),
            designation: "HOD".to_string(),
            department: Some("Mechanical Engineering".to_string()),
            office: None,
            email: None,
            qualification: None,
        });
        let dir = JsonDirectory::from_data(data, FuzzyMatcher::default());

        let found = dir.find_faculty_by_role("hod", Some("Mechanical Engineering")).unwrap();
        assert_eq!(found.record().unwrap().name, "Dr. Ravi Shankar");
        let found = dir.find_faculty_by_role("hod", Some("computer science")).unwrap();
        assert_eq!(found.record().unwrap().name, "Dr. Anil Kumar");

        // nobody in the department holds the role
        assert_eq!(
            dir.find_faculty_by_role("hod", Some("Civil Engineering")).unwrap(),
            Lookup::NotFound
        );
    }

    #[test]
    fn test_student_by_roll_and_name() {
        let dir = directory();
        assert!(matches!(dir.find_student("cs 2021 001").unwrap(), Lookup::Exact(_)));
        assert_eq!(
            dir.find_student("rahul menon").unwrap().record().unwrap().roll_number,
            "CS2021001"
        );
        assert!(!dir.find_student("ZZ9999").unwrap().is_found());
    }

    #[test]
    fn test_vocabulary_covers_records() {
        let vocab = directory().vocabulary();
        assert_eq!(vocab.get(EntityKind::PersonName).len(), 3);
        assert_eq!(vocab.get(EntityKind::RollNumber), ["CS2021001"]);
        assert!(vocab.get(EntityKind::Location).is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&sample_data()).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let dir = JsonDirectory::load(file.path(), FuzzyMatcher::default()).unwrap();
        assert_eq!(dir.list_departments().unwrap().len(), 2);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let result = JsonDirectory::load(Path::new("/nonexistent/campus.json"), FuzzyMatcher::default());
        assert!(result.is_err());
    }
}
