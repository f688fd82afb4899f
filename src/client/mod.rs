//! Remote platform access.
//!
//! The submission-facing surface is a trait so the state machine and
//! executor can run against an in-memory fake in tests; the real
//! implementation in [`coursemology`] speaks HTTP via reqwest.

pub mod coursemology;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AnswerFile, JobHandle, Submission, SubmissionEdit};

/// Operations against one assessment's submissions.
///
/// Bulk mutations (`force_submit_all`, `unsubmit_all`) start background
/// jobs on the platform; callers must wait on the returned handle and
/// re-fetch the submission list before trusting any local state again.
#[async_trait]
pub trait SubmissionsApi {
    /// List every submission for the assessment.
    async fn list_submissions(&self) -> Result<Vec<Submission>>;

    /// Start a bulk force-submit job covering the given course users.
    async fn force_submit_all(&self, course_user_ids: &[i64]) -> Result<JobHandle>;

    /// Start a bulk unsubmit job covering the given course users.
    async fn unsubmit_all(&self, course_user_ids: &[i64]) -> Result<JobHandle>;

    /// Block until the job completes, fails, or the timeout elapses.
    async fn wait_for_job(&self, job: &JobHandle, timeout: Duration) -> Result<()>;

    /// Fetch the editable view of a submission (questions + answer slots).
    async fn edit_submission(&self, submission_id: i64) -> Result<SubmissionEdit>;

    /// Write file content into one answer slot, returning the grading job.
    async fn submit_answer(
        &self,
        submission_id: i64,
        answer_id: i64,
        file: &AnswerFile,
        content: &str,
    ) -> Result<JobHandle>;
}

pub use coursemology::CoursemologyClient;
