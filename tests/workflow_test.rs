//! Workflow tests against an in-memory submissions API.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio_test::{assert_err, assert_ok};
use tokio::time::Instant;

use coursemology_uploader::client::SubmissionsApi;
use coursemology_uploader::config::{OperationalConfig, QuestionRouteEntry};
use coursemology_uploader::error::{Result, UploaderError};
use coursemology_uploader::models::{
    AnswerFile, AnswerInfo, CourseUser, JobHandle, QuestionInfo, Submission, SubmissionEdit,
    WorkflowState,
};
use coursemology_uploader::services::QuestionRouter;
use coursemology_uploader::workflow::{ensure_attempting, submit_answers};

#[derive(Debug, Clone, PartialEq)]
struct SubmittedAnswer {
    submission_id: i64,
    answer_id: i64,
    filename: String,
    content: String,
}

#[derive(Default)]
struct FakeState {
    submissions: Vec<Submission>,
    edits: HashMap<i64, SubmissionEdit>,
    submitted: Vec<SubmittedAnswer>,
    list_calls: usize,
    force_submit_calls: Vec<Vec<i64>>,
    unsubmit_calls: Vec<Vec<i64>>,
    jobs_waited: usize,
    grading_completes_at: Option<Instant>,
    force_submit_is_noop: bool,
    failing_answer_ids: HashSet<i64>,
}

struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    fn new(submissions: Vec<Submission>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                submissions,
                ..FakeState::default()
            }),
        }
    }

    fn with_edit(self, submission_id: i64, edit: SubmissionEdit) -> Self {
        self.state.lock().unwrap().edits.insert(submission_id, edit);
        self
    }

    fn grading_completes_after(self, delay: Duration) -> Self {
        self.state.lock().unwrap().grading_completes_at = Some(Instant::now() + delay);
        self
    }

    fn failing_answer(self, answer_id: i64) -> Self {
        self.state.lock().unwrap().failing_answer_ids.insert(answer_id);
        self
    }

    fn force_submit_is_noop(self) -> Self {
        self.state.lock().unwrap().force_submit_is_noop = true;
        self
    }
}

#[async_trait]
impl SubmissionsApi for FakeApi {
    async fn list_submissions(&self) -> Result<Vec<Submission>> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if let Some(done_at) = state.grading_completes_at {
            if Instant::now() >= done_at {
                for submission in &mut state.submissions {
                    if submission.workflow_state == WorkflowState::Submitted {
                        submission.workflow_state = WorkflowState::Attempting;
                    }
                }
            }
        }
        Ok(state.submissions.clone())
    }

    async fn force_submit_all(&self, course_user_ids: &[i64]) -> Result<JobHandle> {
        let mut state = self.state.lock().unwrap();
        state.force_submit_calls.push(course_user_ids.to_vec());
        if !state.force_submit_is_noop {
            for submission in &mut state.submissions {
                if submission.workflow_state == WorkflowState::Unstarted {
                    submission.workflow_state = WorkflowState::Attempting;
                }
            }
        }
        Ok(JobHandle {
            job_url: "job://force_submit".to_string(),
        })
    }

    async fn unsubmit_all(&self, course_user_ids: &[i64]) -> Result<JobHandle> {
        let mut state = self.state.lock().unwrap();
        state.unsubmit_calls.push(course_user_ids.to_vec());
        for submission in &mut state.submissions {
            if submission.workflow_state == WorkflowState::Published {
                submission.workflow_state = WorkflowState::Attempting;
            }
        }
        Ok(JobHandle {
            job_url: "job://unsubmit".to_string(),
        })
    }

    async fn wait_for_job(&self, _job: &JobHandle, _timeout: Duration) -> Result<()> {
        self.state.lock().unwrap().jobs_waited += 1;
        Ok(())
    }

    async fn edit_submission(&self, submission_id: i64) -> Result<SubmissionEdit> {
        let state = self.state.lock().unwrap();
        state
            .edits
            .get(&submission_id)
            .cloned()
            .ok_or(UploaderError::UnexpectedResponse {
                endpoint: format!("fake://submissions/{}/edit", submission_id),
                reason: "no edit view registered".to_string(),
            })
    }

    async fn submit_answer(
        &self,
        submission_id: i64,
        answer_id: i64,
        file: &AnswerFile,
        content: &str,
    ) -> Result<JobHandle> {
        let mut state = self.state.lock().unwrap();
        if state.failing_answer_ids.contains(&answer_id) {
            return Err(UploaderError::JobFailed {
                message: "answer endpoint rejected the write".to_string(),
            });
        }
        state.submitted.push(SubmittedAnswer {
            submission_id,
            answer_id,
            filename: file.filename.clone(),
            content: content.to_string(),
        });
        Ok(JobHandle {
            job_url: format!("job://answer/{}", answer_id),
        })
    }
}

fn student(id: i64, name: &str, email: &str) -> CourseUser {
    CourseUser {
        id,
        name: name.to_string(),
        email: email.to_string(),
    }
}

fn submission(id: i64, course_user_id: i64, state: WorkflowState) -> Submission {
    Submission {
        id,
        course_user_id,
        workflow_state: state,
    }
}

fn operational(max_wait: u64, poll_interval: u64) -> OperationalConfig {
    OperationalConfig {
        grading_max_wait_seconds: max_wait,
        grading_poll_interval_seconds: poll_interval,
        ..OperationalConfig::default()
    }
}

fn router(entries: &[(&str, &str)]) -> QuestionRouter {
    let entries: Vec<QuestionRouteEntry> = entries
        .iter()
        .map(|(pattern, question)| QuestionRouteEntry {
            pattern: pattern.to_string(),
            question: question.to_string(),
        })
        .collect();
    QuestionRouter::from_entries(&entries).unwrap()
}

/// Edit view with one answer slot per (title, answer id) pair.
fn edit_view(slots: &[(&str, i64)]) -> SubmissionEdit {
    SubmissionEdit {
        questions: slots
            .iter()
            .map(|(title, answer_id)| QuestionInfo {
                question_title: title.to_string(),
                answer_id: Some(*answer_id),
            })
            .collect(),
        answers: slots
            .iter()
            .map(|(_, answer_id)| AnswerInfo {
                id: *answer_id,
                files: vec![AnswerFile {
                    id: answer_id * 10,
                    filename: "template.py".to_string(),
                }],
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unstarted_submissions_are_force_submitted_in_bulk() {
    let students = vec![student(1, "Alice Tan", "alice@u.example"), student(2, "Bob Lee", "bob@u.example")];
    let initial = vec![
        submission(10, 1, WorkflowState::Unstarted),
        submission(11, 2, WorkflowState::Attempting),
    ];
    let api = FakeApi::new(initial.clone());

    let result =
        assert_ok!(ensure_attempting(&api, &students, initial, &operational(20, 5)).await);

    assert!(result
        .iter()
        .all(|s| s.workflow_state == WorkflowState::Attempting));
    let state = api.state.lock().unwrap();
    // The bulk call covers the whole cohort, not just the unstarted ones.
    assert_eq!(state.force_submit_calls, vec![vec![1, 2]]);
    assert_eq!(state.jobs_waited, 1);
    assert_eq!(state.list_calls, 1);
}

#[tokio::test]
async fn published_submissions_are_unsubmitted_in_bulk() {
    let students = vec![student(1, "Alice Tan", "alice@u.example"), student(2, "Bob Lee", "bob@u.example")];
    let initial = vec![
        submission(10, 1, WorkflowState::Published),
        submission(11, 2, WorkflowState::Attempting),
    ];
    let api = FakeApi::new(initial.clone());

    let result = ensure_attempting(&api, &students, initial, &operational(20, 5))
        .await
        .unwrap();

    assert!(result
        .iter()
        .all(|s| s.workflow_state == WorkflowState::Attempting));
    let state = api.state.lock().unwrap();
    assert!(state.force_submit_calls.is_empty());
    assert_eq!(state.unsubmit_calls, vec![vec![1, 2]]);
}

#[tokio::test(start_paused = true)]
async fn auto_grading_wait_polls_until_count_reaches_zero() {
    let students = vec![student(1, "Alice Tan", "alice@u.example")];
    let initial = vec![submission(10, 1, WorkflowState::Submitted)];
    // Grading finishes 12s in; with a 5s interval the polls land at
    // t=5, t=10, and t=15, where the third sees zero remaining.
    let api = FakeApi::new(initial.clone()).grading_completes_after(Duration::from_secs(12));

    let result = ensure_attempting(&api, &students, initial, &operational(20, 5))
        .await
        .unwrap();

    assert_eq!(result[0].workflow_state, WorkflowState::Attempting);
    assert_eq!(api.state.lock().unwrap().list_calls, 3);
}

#[tokio::test(start_paused = true)]
async fn auto_grading_timeout_fails_the_run() {
    let students = vec![student(1, "Alice Tan", "alice@u.example")];
    let initial = vec![submission(10, 1, WorkflowState::Submitted)];
    let api = FakeApi::new(initial.clone());

    let err =
        assert_err!(ensure_attempting(&api, &students, initial, &operational(20, 5)).await);

    assert!(matches!(
        err,
        UploaderError::GradingTimeout {
            waited_seconds: 20,
            remaining: 1,
        }
    ));
    // Budget of 20s at 5s intervals allows exactly four polls.
    assert_eq!(api.state.lock().unwrap().list_calls, 4);
}

#[tokio::test]
async fn submission_left_outside_attempting_is_a_fatal_invariant() {
    let students = vec![student(1, "Alice Tan", "alice@u.example")];
    let initial = vec![submission(10, 1, WorkflowState::Unstarted)];
    let api = FakeApi::new(initial.clone()).force_submit_is_noop();

    let err = ensure_attempting(&api, &students, initial, &operational(20, 5))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        UploaderError::InvariantViolation {
            submission_id: 10,
            course_user_id: 1,
            state: WorkflowState::Unstarted,
        }
    ));
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

struct ExecutorFixture {
    api: FakeApi,
    user_files: BTreeMap<String, BTreeMap<String, PathBuf>>,
    fname_student_map: HashMap<String, CourseUser>,
    user_submission_map: HashMap<i64, Submission>,
    _dir: tempfile::TempDir,
}

/// One student `alice_123` with the given files on disk and the given
/// answer slots in her submission's edit view.
fn fixture(files: &[(&str, &str)], slots: &[(&str, i64)]) -> ExecutorFixture {
    let dir = tempfile::tempdir().unwrap();
    let student_dir = dir.path().join("alice_123");
    std::fs::create_dir_all(&student_dir).unwrap();

    let mut file_map = BTreeMap::new();
    for (filename, content) in files {
        let path = student_dir.join(filename);
        std::fs::write(&path, content).unwrap();
        file_map.insert(filename.to_string(), path);
    }
    let mut user_files = BTreeMap::new();
    user_files.insert("alice_123".to_string(), file_map);

    let alice = student(1, "Alice Tan", "alice@u.example");
    let mut fname_student_map = HashMap::new();
    fname_student_map.insert("alice_123".to_string(), alice);

    let mut user_submission_map = HashMap::new();
    user_submission_map.insert(1, submission(10, 1, WorkflowState::Attempting));

    let api = FakeApi::new(vec![]).with_edit(10, edit_view(slots));

    ExecutorFixture {
        api,
        user_files,
        fname_student_map,
        user_submission_map,
        _dir: dir,
    }
}

#[tokio::test]
async fn matched_file_is_submitted_and_unmatched_file_is_reported() {
    let fx = fixture(
        &[("main.py", "print('hi')"), ("helper.py", "pass")],
        &[("Q1 Main Logic", 100)],
    );
    let router = router(&[("^main", "Q1 Main Logic")]);

    let (jobs, report) = submit_answers(
        &fx.api,
        &fx.user_files,
        &fx.fname_student_map,
        &fx.user_submission_map,
        &router,
        "# No submission",
    )
    .await;

    let entry = &report["alice_123"];
    assert_eq!(entry.submitted, vec!["main.py"]);
    assert_eq!(entry.no_match, vec!["helper.py"]);
    assert!(entry.no_submission.is_empty());
    assert!(entry.errors.is_empty());
    assert_eq!(jobs.len(), 1);

    let state = fx.api.state.lock().unwrap();
    assert_eq!(state.submitted.len(), 1);
    assert_eq!(state.submitted[0].content, "print('hi')");
    assert_eq!(state.submitted[0].answer_id, 100);
}

#[tokio::test]
async fn uncovered_question_receives_exactly_one_placeholder() {
    let fx = fixture(
        &[("main.py", "print('hi')")],
        &[("Q1 Main Logic", 100), ("Q2 Utilities", 200)],
    );
    let router = router(&[("^main", "Q1 Main Logic"), ("^util", "Q2 Utilities")]);

    let (jobs, report) = submit_answers(
        &fx.api,
        &fx.user_files,
        &fx.fname_student_map,
        &fx.user_submission_map,
        &router,
        "# No submission",
    )
    .await;

    let entry = &report["alice_123"];
    assert_eq!(entry.submitted, vec!["main.py"]);
    assert_eq!(entry.no_submission, vec!["Q2 Utilities"]);
    assert_eq!(jobs.len(), 2);

    // Every declared question got exactly one write: a file or a
    // placeholder, never both, never neither.
    let state = fx.api.state.lock().unwrap();
    let mut writes_per_answer: HashMap<i64, usize> = HashMap::new();
    for answer in &state.submitted {
        *writes_per_answer.entry(answer.answer_id).or_default() += 1;
    }
    assert_eq!(writes_per_answer[&100], 1);
    assert_eq!(writes_per_answer[&200], 1);
    let placeholder = state.submitted.iter().find(|a| a.answer_id == 200).unwrap();
    assert_eq!(placeholder.content, "# No submission");
}

#[tokio::test]
async fn unresolved_key_is_an_identity_error_only() {
    let mut fx = fixture(&[("main.py", "print('hi')")], &[("Q1 Main Logic", 100)]);
    fx.fname_student_map.clear();
    let router = router(&[("^main", "Q1 Main Logic")]);

    let (jobs, report) = submit_answers(
        &fx.api,
        &fx.user_files,
        &fx.fname_student_map,
        &fx.user_submission_map,
        &router,
        "# No submission",
    )
    .await;

    let entry = &report["alice_123"];
    assert_eq!(entry.errors, vec!["No matching student found"]);
    assert!(entry.student.is_none());
    // An identity failure leaves the per-file lists untouched.
    assert!(entry.no_match.is_empty());
    assert!(entry.no_submission.is_empty());
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn missing_submission_record_is_reported_and_skipped() {
    let mut fx = fixture(&[("main.py", "print('hi')")], &[("Q1 Main Logic", 100)]);
    fx.user_submission_map.clear();
    let router = router(&[("^main", "Q1 Main Logic")]);

    let (jobs, report) = submit_answers(
        &fx.api,
        &fx.user_files,
        &fx.fname_student_map,
        &fx.user_submission_map,
        &router,
        "# No submission",
    )
    .await;

    let entry = &report["alice_123"];
    assert_eq!(
        entry.errors,
        vec!["No matching submission found for student Alice Tan (1)"]
    );
    assert!(entry.student.is_some());
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn failed_file_write_is_caught_and_the_batch_continues() {
    let fx = fixture(
        &[("main.py", "print('hi')"), ("util_a.py", "pass")],
        &[("Q1 Main Logic", 100), ("Q2 Utilities", 200)],
    );
    let fx = ExecutorFixture {
        api: fx.api.failing_answer(100),
        ..fx
    };
    let router = router(&[("^main", "Q1 Main Logic"), ("^util", "Q2 Utilities")]);

    let (jobs, report) = submit_answers(
        &fx.api,
        &fx.user_files,
        &fx.fname_student_map,
        &fx.user_submission_map,
        &router,
        "# No submission",
    )
    .await;

    let entry = &report["alice_123"];
    // The file write and the subsequent placeholder both failed on Q1,
    // but util_a.py still went through.
    assert_eq!(entry.submitted, vec!["util_a.py"]);
    assert_eq!(entry.no_submission, vec!["Q1 Main Logic"]);
    assert_eq!(entry.errors.len(), 2);
    assert!(entry.errors.iter().any(|e| e.contains("main.py")));
    assert!(entry
        .errors
        .iter()
        .any(|e| e.contains("placeholder for Q1 Main Logic")));
    assert_eq!(jobs.len(), 1);
}

#[tokio::test]
async fn report_lists_are_lexicographically_sorted() {
    let fx = fixture(
        &[
            ("zebra.txt", "no route"),
            ("alpha.txt", "no route"),
            ("util_b.py", "b"),
            ("util_a.py", "a"),
        ],
        &[("Q2 Utilities", 200)],
    );
    // BTreeMap iteration already sorts filenames, so scramble coverage
    // through routing instead: both util files hit the same question.
    let router = router(&[("^util", "Q2 Utilities")]);

    let (_jobs, report) = submit_answers(
        &fx.api,
        &fx.user_files,
        &fx.fname_student_map,
        &fx.user_submission_map,
        &router,
        "# No submission",
    )
    .await;

    let entry = &report["alice_123"];
    assert_eq!(entry.no_match, vec!["alpha.txt", "zebra.txt"]);
    assert_eq!(entry.submitted, vec!["util_a.py", "util_b.py"]);
    let mut sorted = entry.errors.clone();
    sorted.sort();
    assert_eq!(entry.errors, sorted);
}
