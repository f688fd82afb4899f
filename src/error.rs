//! Error taxonomy for the uploader.
//!
//! Variants split along the propagation policy: per-file and per-student
//! failures are caught by the executor and folded into the report, while
//! configuration, lookup, and state-machine failures abort the whole run.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::WorkflowState;

#[derive(Debug, Error)]
pub enum UploaderError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid question route pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid glob pattern '{pattern}': {source}")]
    GlobPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("base directory is not a directory: {path}")]
    BaseDirInvalid { path: PathBuf },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("column '{column}' not found in CSV headers")]
    CsvColumnMissing { column: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error("file is not valid UTF-8: {path}")]
    NotUtf8 { path: PathBuf },

    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {endpoint}: {reason}")]
    UnexpectedResponse { endpoint: String, reason: String },

    #[error("login failed for user '{username}'")]
    LoginFailed { username: String },

    #[error("category with title '{title}' not found")]
    CategoryNotFound { title: String },

    #[error("assessment with title '{title}' not found in category {category_id}")]
    AssessmentNotFound { title: String, category_id: i64 },

    #[error("question with title '{title}' not found in submission")]
    QuestionNotFound { title: String },

    #[error("question '{title}' has no associated answer ID")]
    AnswerIdMissing { title: String },

    #[error("answer with ID {answer_id} not found in submission")]
    AnswerNotFound { answer_id: i64 },

    #[error("answer {answer_id} has no file attributes")]
    AnswerHasNoFiles { answer_id: i64 },

    #[error("background job did not complete within {timeout_seconds}s")]
    JobTimeout { timeout_seconds: u64 },

    #[error("background job failed: {message}")]
    JobFailed { message: String },

    #[error(
        "auto-grading did not complete within {waited_seconds}s; \
         {remaining} submission(s) still in 'submitted' state"
    )]
    GradingTimeout { waited_seconds: u64, remaining: usize },

    #[error(
        "submission {submission_id} for course user {course_user_id} is in \
         state '{state}', expected 'attempting'"
    )]
    InvariantViolation {
        submission_id: i64,
        course_user_id: i64,
        state: WorkflowState,
    },

    #[error("unsupported report file extension '{extension}'; supported: .json, .csv")]
    UnsupportedReportFormat { extension: String },
}

pub type Result<T> = std::result::Result<T, UploaderError>;
