//! Writes student files into answer slots and accumulates the report.
//!
//! Each file key is processed as a fold step: one key in, one
//! `ReportEntry` plus emitted job handles out, merged into the aggregate
//! by the caller. Failures local to one file or one placeholder are
//! recorded into the entry's `errors` and never abort the batch.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::client::SubmissionsApi;
use crate::error::{Result, UploaderError};
use crate::models::{
    AnswerInfo, CourseUser, JobHandle, ReportEntry, StudentInfo, Submission, SubmissionEdit,
};
use crate::services::QuestionRouter;

/// Submit matched files for every file key, filling unmatched questions
/// with `placeholder_content`.
///
/// All list fields of every report entry are lexicographically sorted
/// before return.
pub async fn submit_answers<A: SubmissionsApi + ?Sized>(
    api: &A,
    user_files: &BTreeMap<String, BTreeMap<String, PathBuf>>,
    fname_student_map: &HashMap<String, CourseUser>,
    user_submission_map: &HashMap<i64, Submission>,
    router: &QuestionRouter,
    placeholder_content: &str,
) -> (Vec<JobHandle>, BTreeMap<String, ReportEntry>) {
    let mut all_jobs = Vec::new();
    let mut report = BTreeMap::new();

    for (fname, files) in user_files {
        info!(key = %fname, files = files.len(), "processing user files");
        let (mut entry, jobs) = process_user_files(
            api,
            fname,
            files,
            fname_student_map,
            user_submission_map,
            router,
            placeholder_content,
        )
        .await;
        entry.sort_lists();
        all_jobs.extend(jobs);
        report.insert(fname.clone(), entry);
    }

    (all_jobs, report)
}

/// Process one file key: resolve the student and submission, submit each
/// routable file, then fill every uncovered route with the placeholder.
async fn process_user_files<A: SubmissionsApi + ?Sized>(
    api: &A,
    fname: &str,
    files: &BTreeMap<String, PathBuf>,
    fname_student_map: &HashMap<String, CourseUser>,
    user_submission_map: &HashMap<i64, Submission>,
    router: &QuestionRouter,
    placeholder_content: &str,
) -> (ReportEntry, Vec<JobHandle>) {
    let mut entry = ReportEntry::new();
    let mut jobs = Vec::new();

    let Some(student) = fname_student_map.get(fname) else {
        warn!(key = %fname, "skipping: no matching student found");
        entry.errors.push("No matching student found".to_string());
        return (entry, jobs);
    };
    entry.student = Some(StudentInfo::from(student));

    let Some(submission) = user_submission_map.get(&student.id) else {
        warn!(key = %fname, student = %student.name, "skipping: no matching submission");
        entry.errors.push(format!(
            "No matching submission found for student {} ({})",
            student.name, student.id
        ));
        return (entry, jobs);
    };

    // The edit view is the only source of current answer IDs; fetch it
    // once per submission and reuse it for every file.
    let edit = match api.edit_submission(submission.id).await {
        Ok(edit) => edit,
        Err(e) => {
            warn!(key = %fname, submission = submission.id, error = %e, "cannot open submission for editing");
            entry.errors.push(format!(
                "Failed to open submission {} for editing: {}",
                submission.id, e
            ));
            return (entry, jobs);
        }
    };

    let mut covered = vec![false; router.len()];

    for (filename, filepath) in files {
        let Some(route_index) = router.route(filename) else {
            entry.no_match.push(filename.clone());
            continue;
        };
        let question_title = router.question(route_index);
        match submit_file(api, submission.id, &edit, question_title, filepath).await {
            Ok(job) => {
                jobs.push(job);
                covered[route_index] = true;
                entry.submitted.push(filename.clone());
            }
            Err(e) => {
                warn!(key = %fname, filename = %filename, error = %e, "failed to submit file");
                entry
                    .errors
                    .push(format!("Failed to submit {}: {}", filename, e));
            }
        }
    }

    for route_index in 0..router.len() {
        if covered[route_index] {
            continue;
        }
        let question_title = router.question(route_index);
        entry.no_submission.push(question_title.to_string());
        match submit_content(api, submission.id, &edit, question_title, placeholder_content).await {
            Ok(job) => jobs.push(job),
            Err(e) => {
                warn!(key = %fname, question = %question_title, error = %e, "failed to submit placeholder");
                entry.errors.push(format!(
                    "Failed to submit placeholder for {}: {}",
                    question_title, e
                ));
            }
        }
    }

    (entry, jobs)
}

/// Look up the answer slot for a question title within the edit view.
fn question_answer<'a>(edit: &'a SubmissionEdit, title: &str) -> Result<&'a AnswerInfo> {
    let question = edit
        .questions
        .iter()
        .find(|q| q.question_title == title)
        .ok_or_else(|| UploaderError::QuestionNotFound {
            title: title.to_string(),
        })?;
    let answer_id = question
        .answer_id
        .ok_or_else(|| UploaderError::AnswerIdMissing {
            title: title.to_string(),
        })?;
    edit.answers
        .iter()
        .find(|a| a.id == answer_id)
        .ok_or(UploaderError::AnswerNotFound { answer_id })
}

async fn submit_content<A: SubmissionsApi + ?Sized>(
    api: &A,
    submission_id: i64,
    edit: &SubmissionEdit,
    question_title: &str,
    content: &str,
) -> Result<JobHandle> {
    let answer = question_answer(edit, question_title)?;
    let file = answer
        .files
        .first()
        .ok_or(UploaderError::AnswerHasNoFiles {
            answer_id: answer.id,
        })?;
    api.submit_answer(submission_id, answer.id, file, content)
        .await
}

async fn submit_file<A: SubmissionsApi + ?Sized>(
    api: &A,
    submission_id: i64,
    edit: &SubmissionEdit,
    question_title: &str,
    filepath: &Path,
) -> Result<JobHandle> {
    let bytes = tokio::fs::read(filepath).await?;
    let content = String::from_utf8(bytes).map_err(|_| UploaderError::NotUtf8 {
        path: filepath.to_path_buf(),
    })?;
    submit_content(api, submission_id, edit, question_title, &content).await
}
