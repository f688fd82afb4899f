//! Domain types shared across the uploader pipeline.
//!
//! Remote entities (students, submissions, answers) are kept separate from
//! the wire structs in `client::coursemology`; the client maps responses
//! into these before anything else sees them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An enrolled student as reported by the course roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseUser {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Workflow state of a submission on the remote platform.
///
/// Only `Attempting` is writable; the state machine drives every
/// submission into it before any answer is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Unstarted,
    Attempting,
    Submitted,
    Published,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowState::Unstarted => "unstarted",
            WorkflowState::Attempting => "attempting",
            WorkflowState::Submitted => "submitted",
            WorkflowState::Published => "published",
        };
        f.write_str(s)
    }
}

/// One student's attempt record against the target assessment.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: i64,
    pub course_user_id: i64,
    pub workflow_state: WorkflowState,
}

/// A question within the editable submission view.
#[derive(Debug, Clone)]
pub struct QuestionInfo {
    pub question_title: String,
    pub answer_id: Option<i64>,
}

/// File metadata attached to a programming answer.
#[derive(Debug, Clone)]
pub struct AnswerFile {
    pub id: i64,
    pub filename: String,
}

/// A programming answer slot within a submission.
#[derive(Debug, Clone)]
pub struct AnswerInfo {
    pub id: i64,
    pub files: Vec<AnswerFile>,
}

/// The editable view of a submission.
///
/// This is the only source of current answer IDs; it must be fetched
/// fresh per submission before any write.
#[derive(Debug, Clone)]
pub struct SubmissionEdit {
    pub questions: Vec<QuestionInfo>,
    pub answers: Vec<AnswerInfo>,
}

/// Handle to a background job started on the remote platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub job_url: String,
}

/// Resolved student identity as recorded in the report.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StudentInfo {
    pub name: String,
    pub email: String,
    pub id: String,
}

impl From<&CourseUser> for StudentInfo {
    fn from(user: &CourseUser) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            id: user.id.to_string(),
        }
    }
}

/// Per-file-key outcome of a run.
///
/// List fields are lexicographically sorted before the report leaves the
/// executor.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportEntry {
    pub student: Option<StudentInfo>,
    pub errors: Vec<String>,
    pub submitted: Vec<String>,
    pub no_match: Vec<String>,
    pub no_submission: Vec<String>,
}

impl ReportEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort every list field in place.
    pub fn sort_lists(&mut self) {
        self.errors.sort();
        self.submitted.sort();
        self.no_match.sort();
        self.no_submission.sort();
    }
}

/// An assessment category on the remote platform.
#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub title: String,
}

/// A gradable assessment within a category.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub id: i64,
    pub title: String,
}
