//! Resolves filename-derived keys to enrolled students.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use crate::models::CourseUser;
use crate::services::files::MappedUser;

/// Resolve each filename key to a roster student, by email first and name
/// second.
///
/// Roster indices are last-write-wins on duplicate emails or names; a
/// duplicate is logged but does not change the outcome. Keys that match
/// nobody are logged and dropped, never fatal.
pub fn resolve_students(
    fname_user_map: &BTreeMap<String, MappedUser>,
    students: &[CourseUser],
) -> HashMap<String, CourseUser> {
    let mut by_email: HashMap<&str, &CourseUser> = HashMap::new();
    let mut by_name: HashMap<&str, &CourseUser> = HashMap::new();
    for student in students {
        if by_email.insert(student.email.as_str(), student).is_some() {
            warn!(email = %student.email, "duplicate email in roster, keeping the later entry");
        }
        if by_name.insert(student.name.as_str(), student).is_some() {
            warn!(name = %student.name, "duplicate name in roster, keeping the later entry");
        }
    }

    let mut resolved: HashMap<String, CourseUser> = HashMap::new();
    for (fname, user) in fname_user_map {
        let matched = by_email
            .get(user.email.as_str())
            .or_else(|| by_name.get(user.name.as_str()));
        match matched {
            Some(student) => {
                resolved.insert(fname.clone(), (*student).clone());
            }
            None => {
                warn!(
                    key = %fname,
                    name = %user.name,
                    email = %user.email,
                    "could not find student for mapping entry"
                );
            }
        }
    }
    resolved
}
