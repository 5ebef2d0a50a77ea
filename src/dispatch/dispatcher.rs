//! Intent routing
//!
//! Maps a resolved intent onto one collaborator call or template. Misses
//! become apology or clarification responses; only collaborator faults are
//! returned as errors.

use std::sync::Arc;

use tracing::{debug, info};

use super::response::{self, Response, ResponsePayload};
use crate::campus::{CampusDirectory, DirectoryError, Lookup, NavigationError, RouteFinder};
use crate::intent::{Entity, EntityKind, IntentType, ResolvedIntent};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("directory lookup failed: {0}")]
    Directory(#[from] DirectoryError),

    #[error("route lookup failed: {0}")]
    Navigation(#[from] NavigationError),
}

#[derive(Clone)]
pub struct Dispatcher {
    directory: Arc<dyn CampusDirectory>,
    routes: Arc<dyn RouteFinder>,
    /// Node id every route starts from
    origin: String,
}

impl Dispatcher {
    pub fn new(
        directory: Arc<dyn CampusDirectory>,
        routes: Arc<dyn RouteFinder>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            routes,
            origin: origin.into(),
        }
    }

    pub fn dispatch(&self, intent: &ResolvedIntent) -> Result<Response, DispatchError> {
        info!(intent = %intent.intent, entities = intent.entities.len(), "dispatching");

        let response = match intent.intent {
            IntentType::Greeting => Response::template(response::GREETING),
            IntentType::Farewell => Response::template(response::FAREWELL),
            IntentType::Help => Response::template(response::HELP),
            IntentType::Unknown => Response::clarification(response::NOT_UNDERSTOOD),
            IntentType::Navigation => self.navigation(intent)?,
            IntentType::FacultyInfo => self.faculty(intent)?,
            IntentType::StudentLookup => self.student(intent)?,
            IntentType::DepartmentInfo => self.department(intent)?,
        };

        debug!(kind = ?response.kind, "response built");
        Ok(response)
    }

    fn clarify(intent: &ResolvedIntent) -> Response {
        Response::clarification(response::clarification_for(intent.intent))
    }

    fn navigation(&self, intent: &ResolvedIntent) -> Result<Response, DispatchError> {
        let Some(location) = intent.entity(EntityKind::Location) else {
            return Ok(Self::clarify(intent));
        };

        let destination = if location.accepted {
            self.routes.locate(&location.value)
        } else {
            None
        };
        let Some(destination) = destination else {
            return Ok(Response::clarification(response::location_not_found(&location.raw)));
        };

        let name = self
            .routes
            .display_name(&destination)
            .unwrap_or_else(|| location.value.clone());

        if destination == self.origin {
            return Ok(Response::template(response::already_there(&name)));
        }

        match self.routes.shortest_path(&self.origin, &destination) {
            Ok(route) => Ok(Response::answer(
                response::directions(&route),
                ResponsePayload::Route(route),
            )),
            Err(NavigationError::NoPath { .. }) => {
                info!(to = %destination, "no route from origin");
                Ok(Response::apology(response::no_route(&name)))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn faculty(&self, intent: &ResolvedIntent) -> Result<Response, DispatchError> {
        if let Some(role) = intent.entity(EntityKind::Role) {
            let department = intent.entity(EntityKind::DepartmentName);
            let found = self
                .directory
                .find_faculty_by_role(&role.value, department.map(|d| d.value.as_str()))?;
            return Ok(match found.record() {
                Some(record) => Response::answer(
                    response::role_holder(record),
                    ResponsePayload::Faculty(record.clone()),
                ),
                None => {
                    let term = match department {
                        Some(d) => format!("{} of {}", role.raw, d.raw),
                        None => role.raw.clone(),
                    };
                    Response::apology(response::role_not_found(&term))
                }
            });
        }

        let Some(name) = intent.entity(EntityKind::PersonName) else {
            return Ok(Self::clarify(intent));
        };

        let found = self.directory.find_faculty(&name.value)?;
        Ok(Self::answer(found, name, response::faculty, ResponsePayload::Faculty, |r| &r.name)
            .unwrap_or_else(|| Response::apology(response::faculty_not_found(&name.raw))))
    }

    fn student(&self, intent: &ResolvedIntent) -> Result<Response, DispatchError> {
        let Some(query) = intent
            .entity(EntityKind::RollNumber)
            .or_else(|| intent.entity(EntityKind::StudentName))
        else {
            return Ok(Self::clarify(intent));
        };

        let found = self.directory.find_student(&query.value)?;
        Ok(Self::answer(found, query, response::student, ResponsePayload::Student, |r| &r.name)
            .unwrap_or_else(|| Response::apology(response::student_not_found(&query.raw))))
    }

    fn department(&self, intent: &ResolvedIntent) -> Result<Response, DispatchError> {
        // A department question with no slot at all asks for the full list
        if intent.entities.is_empty() && intent.missing.is_empty() {
            let names: Vec<String> = self
                .directory
                .list_departments()?
                .into_iter()
                .map(|d| d.name)
                .collect();
            return Ok(Response::answer(
                response::department_list(&names),
                ResponsePayload::Departments { names },
            ));
        }

        let Some(name) = intent.entity(EntityKind::DepartmentName) else {
            return Ok(Self::clarify(intent));
        };

        let found = self.directory.find_department(&name.value)?;
        Ok(Self::answer(found, name, response::department, ResponsePayload::Department, |r| &r.name)
            .unwrap_or_else(|| Response::apology(response::department_not_found(&name.raw))))
    }

    /// Spoken answer for a found record; substitutes are announced first
    fn answer<T: Clone>(
        found: Lookup<T>,
        query: &Entity,
        describe: fn(&T) -> String,
        payload: fn(T) -> ResponsePayload,
        name: fn(&T) -> &String,
    ) -> Option<Response> {
        match found {
            Lookup::Exact(record) => Some(Response::answer(describe(&record), payload(record))),
            Lookup::Substitute { record, score } => {
                debug!(query = %query.raw, substitute = %name(&record), score, "answering with substitute");
                let text = format!("{} {}", response::closest_match(name(&record)), describe(&record));
                Some(Response::answer(text, payload(record)))
            }
            Lookup::NotFound => None,
        }
    }
}
