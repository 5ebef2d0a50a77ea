//! Campus data collaborators
//!
//! - [`CampusDirectory`]: faculty, student and department records
//! - [`RouteFinder`]: location lookup and shortest walking routes

mod directory;
mod navigation;

pub use directory::{
    CampusData, CampusDirectory, DepartmentRecord, DirectoryError, FacultyRecord, JsonDirectory,
    Lookup, StudentRecord,
};
pub use navigation::{
    CampusMap, NavigationError, Route, RouteFinder, RouteStep, WALKING_METERS_PER_MINUTE,
};

#[cfg(test)]
pub(crate) use directory::tests::sample_data;
#[cfg(test)]
pub(crate) use navigation::tests::sample_map;
