//! HTTP client for the Coursemology JSON API.
//!
//! Authentication is cookie-based: `login` establishes a session that the
//! shared reqwest client carries on every subsequent request.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::SubmissionsApi;
use crate::error::{Result, UploaderError};
use crate::models::{
    AnswerFile, AnswerInfo, Assessment, Category, CourseUser, JobHandle, QuestionInfo, Submission,
    SubmissionEdit, WorkflowState,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const JOB_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Session-holding client for one Coursemology instance.
#[derive(Debug, Clone)]
pub struct CoursemologyClient {
    http: reqwest::Client,
    base_url: String,
}

impl CoursemologyClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| UploaderError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sign in and establish the session cookie.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let endpoint = format!("{}/users/sign_in", self.base_url);
        let response = self
            .http
            .post(&endpoint)
            .json(&json!({ "user": { "email": username, "password": password } }))
            .send()
            .await
            .map_err(|source| UploaderError::Request {
                endpoint: endpoint.clone(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(UploaderError::LoginFailed {
                username: username.to_string(),
            });
        }
        Ok(())
    }

    /// Fetch the enrolled-student roster for a course.
    pub async fn list_students(&self, course_id: i64) -> Result<Vec<CourseUser>> {
        let endpoint = format!("{}/courses/{}/students", self.base_url, course_id);
        let data: StudentsResponse = self.get_json(&endpoint).await?;
        Ok(data
            .users
            .into_iter()
            .map(|u| CourseUser {
                id: u.id,
                name: u.name,
                email: u.email,
            })
            .collect())
    }

    /// Find an assessment category by its exact title.
    pub async fn find_category(&self, course_id: i64, title: &str) -> Result<Category> {
        let endpoint = format!(
            "{}/courses/{}/assessments/categories",
            self.base_url, course_id
        );
        let data: CategoriesResponse = self.get_json(&endpoint).await?;
        data.categories
            .into_iter()
            .find(|c| c.title == title)
            .map(|c| Category {
                id: c.id,
                title: c.title,
            })
            .ok_or_else(|| UploaderError::CategoryNotFound {
                title: title.to_string(),
            })
    }

    /// Find an assessment by its exact title within a category.
    pub async fn find_assessment(
        &self,
        course_id: i64,
        category_id: i64,
        title: &str,
    ) -> Result<Assessment> {
        let endpoint = format!(
            "{}/courses/{}/assessments?category={}",
            self.base_url, course_id, category_id
        );
        let data: AssessmentsResponse = self.get_json(&endpoint).await?;
        data.assessments
            .into_iter()
            .find(|a| a.title == title)
            .map(|a| Assessment {
                id: a.id,
                title: a.title,
            })
            .ok_or_else(|| UploaderError::AssessmentNotFound {
                title: title.to_string(),
                category_id,
            })
    }

    /// Bind a submissions client to one assessment.
    pub fn submissions(&self, course_id: i64, assessment_id: i64) -> SubmissionsClient {
        SubmissionsClient {
            client: self.clone(),
            submissions_url: format!(
                "{}/courses/{}/assessments/{}/submissions",
                self.base_url, course_id, assessment_id
            ),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let response = self
            .http
            .get(endpoint)
            .header("Accept", "application/json")
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| UploaderError::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;
        response
            .json()
            .await
            .map_err(|source| UploaderError::Request {
                endpoint: endpoint.to_string(),
                source,
            })
    }

    async fn patch_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        debug!(endpoint, "PATCH");
        let response = self
            .http
            .patch(endpoint)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| UploaderError::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;
        response
            .json()
            .await
            .map_err(|source| UploaderError::Request {
                endpoint: endpoint.to_string(),
                source,
            })
    }
}

/// Submission operations bound to one assessment.
#[derive(Debug, Clone)]
pub struct SubmissionsClient {
    client: CoursemologyClient,
    submissions_url: String,
}

#[async_trait]
impl SubmissionsApi for SubmissionsClient {
    async fn list_submissions(&self) -> Result<Vec<Submission>> {
        let data: SubmissionsResponse = self.client.get_json(&self.submissions_url).await?;
        Ok(data
            .submissions
            .into_iter()
            .map(|s| Submission {
                id: s.id,
                course_user_id: s.course_user.id,
                workflow_state: s.workflow_state,
            })
            .collect())
    }

    async fn force_submit_all(&self, course_user_ids: &[i64]) -> Result<JobHandle> {
        let endpoint = format!("{}/force_submit_all", self.submissions_url);
        let data: JobResponse = self
            .client
            .patch_json(&endpoint, &json!({ "course_users": course_user_ids }))
            .await?;
        Ok(JobHandle {
            job_url: data.job_url,
        })
    }

    async fn unsubmit_all(&self, course_user_ids: &[i64]) -> Result<JobHandle> {
        let endpoint = format!("{}/unsubmit_all", self.submissions_url);
        let data: JobResponse = self
            .client
            .patch_json(&endpoint, &json!({ "course_users": course_user_ids }))
            .await?;
        Ok(JobHandle {
            job_url: data.job_url,
        })
    }

    async fn wait_for_job(&self, job: &JobHandle, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let status: JobStatusResponse = self.client.get_json(&job.job_url).await?;
            match status.status.as_str() {
                "completed" => return Ok(()),
                "errored" => {
                    return Err(UploaderError::JobFailed {
                        message: status
                            .message
                            .unwrap_or_else(|| "no error message".to_string()),
                    })
                }
                _ => {}
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(UploaderError::JobTimeout {
                    timeout_seconds: timeout.as_secs(),
                });
            }
            tokio::time::sleep(JOB_POLL_INTERVAL).await;
        }
    }

    async fn edit_submission(&self, submission_id: i64) -> Result<SubmissionEdit> {
        let endpoint = format!("{}/{}/edit", self.submissions_url, submission_id);
        let data: SubmissionEditResponse = self.client.get_json(&endpoint).await?;
        Ok(SubmissionEdit {
            questions: data
                .questions
                .into_iter()
                .map(|q| QuestionInfo {
                    question_title: q.question_title,
                    answer_id: q.answer_id,
                })
                .collect(),
            answers: data
                .answers
                .into_iter()
                .map(|a| AnswerInfo {
                    id: a.id,
                    files: a
                        .fields
                        .files_attributes
                        .into_iter()
                        .map(|f| AnswerFile {
                            id: f.id,
                            filename: f.filename,
                        })
                        .collect(),
                })
                .collect(),
        })
    }

    async fn submit_answer(
        &self,
        submission_id: i64,
        answer_id: i64,
        file: &AnswerFile,
        content: &str,
    ) -> Result<JobHandle> {
        let endpoint = format!(
            "{}/{}/answers/{}",
            self.submissions_url, submission_id, answer_id
        );
        let body = json!({
            "answer": {
                "id": answer_id,
                "files_attributes": [{
                    "id": file.id,
                    "filename": file.filename,
                    "content": content,
                }],
            }
        });
        let data: JobResponse = self.client.patch_json(&endpoint, &body).await?;
        Ok(JobHandle {
            job_url: data.job_url,
        })
    }
}

// Wire shapes. Coursemology serves camelCase JSON.

#[derive(Debug, Deserialize)]
struct StudentsResponse {
    users: Vec<CourseUserData>,
}

#[derive(Debug, Deserialize)]
struct CourseUserData {
    id: i64,
    name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct CategoriesResponse {
    categories: Vec<TitledData>,
}

#[derive(Debug, Deserialize)]
struct AssessmentsResponse {
    assessments: Vec<TitledData>,
}

#[derive(Debug, Deserialize)]
struct TitledData {
    id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct SubmissionsResponse {
    submissions: Vec<SubmissionData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionData {
    id: i64,
    course_user: CourseUserRef,
    workflow_state: WorkflowState,
}

#[derive(Debug, Deserialize)]
struct CourseUserRef {
    id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResponse {
    job_url: String,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmissionEditResponse {
    questions: Vec<QuestionData>,
    answers: Vec<AnswerData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionData {
    question_title: String,
    #[serde(default)]
    answer_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AnswerData {
    id: i64,
    fields: AnswerFields,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerFields {
    files_attributes: Vec<FileData>,
}

#[derive(Debug, Deserialize)]
struct FileData {
    id: i64,
    filename: String,
}
