//! Drives every cohort submission into the `attempting` state.
//!
//! Transition order is fixed: force-submit unstarted submissions, wait
//! out auto-grading, unsubmit published submissions, then assert the
//! terminal state. Bulk endpoints are the platform's unit of background
//! job granularity, so each transition covers the whole cohort rather
//! than just the submissions that need it. The local submission list is
//! never trusted across a mutating call; it is re-fetched after every
//! job completes.

use std::collections::HashSet;
use std::time::Duration;

use tracing::info;

use crate::client::SubmissionsApi;
use crate::config::OperationalConfig;
use crate::error::{Result, UploaderError};
use crate::models::{CourseUser, Submission, WorkflowState};

/// Fetch the assessment's submissions filtered to the given students.
pub async fn fetch_student_submissions<A: SubmissionsApi + ?Sized>(
    api: &A,
    students: &[CourseUser],
) -> Result<Vec<Submission>> {
    let student_ids: HashSet<i64> = students.iter().map(|s| s.id).collect();
    Ok(api
        .list_submissions()
        .await?
        .into_iter()
        .filter(|s| student_ids.contains(&s.course_user_id))
        .collect())
}

fn count_state(submissions: &[Submission], state: WorkflowState) -> usize {
    submissions
        .iter()
        .filter(|s| s.workflow_state == state)
        .count()
}

/// Ensure every submission in the cohort is in `attempting` state.
///
/// Returns the refreshed submission list. Fails the run on an
/// auto-grading timeout or when any submission ends up outside
/// `attempting` after all transitions.
pub async fn ensure_attempting<A: SubmissionsApi + ?Sized>(
    api: &A,
    students: &[CourseUser],
    mut submissions: Vec<Submission>,
    operational: &OperationalConfig,
) -> Result<Vec<Submission>> {
    let course_user_ids: Vec<i64> = submissions.iter().map(|s| s.course_user_id).collect();
    let job_timeout = Duration::from_secs(operational.job_timeout_seconds);

    let unstarted = count_state(&submissions, WorkflowState::Unstarted);
    if unstarted > 0 {
        info!(unstarted, "force submitting unstarted submission(s)");
        let job = api.force_submit_all(&course_user_ids).await?;
        api.wait_for_job(&job, job_timeout).await?;
        submissions = fetch_student_submissions(api, students).await?;
    }

    submissions = wait_for_auto_grading(api, students, submissions, operational).await?;

    let published = count_state(&submissions, WorkflowState::Published);
    if published > 0 {
        info!(published, "unsubmitting published submission(s)");
        let job = api.unsubmit_all(&course_user_ids).await?;
        api.wait_for_job(&job, job_timeout).await?;
        submissions = fetch_student_submissions(api, students).await?;
    }

    for submission in &submissions {
        if submission.workflow_state != WorkflowState::Attempting {
            return Err(UploaderError::InvariantViolation {
                submission_id: submission.id,
                course_user_id: submission.course_user_id,
                state: submission.workflow_state,
            });
        }
    }

    Ok(submissions)
}

/// Poll until no submission remains in `submitted` state.
///
/// Sleeps one interval before each poll, stops early once the count hits
/// zero, and fails the whole run once the configured wait is exhausted.
async fn wait_for_auto_grading<A: SubmissionsApi + ?Sized>(
    api: &A,
    students: &[CourseUser],
    mut submissions: Vec<Submission>,
    operational: &OperationalConfig,
) -> Result<Vec<Submission>> {
    let mut remaining = count_state(&submissions, WorkflowState::Submitted);
    if remaining == 0 {
        return Ok(submissions);
    }

    info!(remaining, "waiting for auto-grading to complete");
    let interval = Duration::from_secs(operational.grading_poll_interval_seconds);
    let max_polls =
        operational.grading_max_wait_seconds / operational.grading_poll_interval_seconds;

    for _ in 0..max_polls {
        tokio::time::sleep(interval).await;
        submissions = fetch_student_submissions(api, students).await?;
        remaining = count_state(&submissions, WorkflowState::Submitted);
        if remaining == 0 {
            info!("auto-grading complete");
            return Ok(submissions);
        }
        info!(remaining, "still waiting for auto-grading");
    }

    Err(UploaderError::GradingTimeout {
        waited_seconds: operational.grading_max_wait_seconds,
        remaining,
    })
}
