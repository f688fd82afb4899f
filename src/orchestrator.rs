//! End-to-end run: local inputs, remote resolution, state transitions,
//! answer submission, report persistence.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::client::CoursemologyClient;
use crate::config::{BatchDownloadConfig, Config};
use crate::download;
use crate::error::{Result, UploaderError};
use crate::models::{JobHandle, Submission};
use crate::services;
use crate::services::QuestionRouter;
use crate::workflow;

/// Run the whole upload batch, returning the grading jobs it started.
pub async fn run(config: &Config) -> Result<Vec<JobHandle>> {
    // Compile the route table up front so a bad pattern fails before any
    // network traffic.
    let router = QuestionRouter::from_entries(&config.file_question_map)?;

    if let Some(batch) = &config.batch_download {
        run_batch_download(batch, &config.base_dir).await?;
    }

    let user_files = services::get_user_files(&config.base_dir, &config.file_pattern)?;
    info!(
        users = user_files.len(),
        pattern = %config.file_pattern,
        "loaded user files"
    );

    let cm = &config.coursemology;
    let client = CoursemologyClient::new(&cm.base_url)?;
    client.login(&cm.username, &cm.password).await?;
    info!(username = %cm.username, course = cm.course_id, "logged in to Coursemology");

    let students = client.list_students(cm.course_id).await?;
    let fname_user_map = services::load_fname_user_map(&config.fname_user_map)?;
    let fname_student_map = services::resolve_students(&fname_user_map, &students);
    info!(
        mapped = fname_student_map.len(),
        total = fname_user_map.len(),
        "mapped file keys to students"
    );

    let category = client
        .find_category(cm.course_id, &cm.assessment_category)
        .await?;
    let assessment = client
        .find_assessment(cm.course_id, category.id, &cm.assessment_title)
        .await?;
    info!(category = %category.title, assessment = %assessment.title, "found target assessment");

    let submissions_api = client.submissions(cm.course_id, assessment.id);
    let submissions = workflow::fetch_student_submissions(&submissions_api, &students).await?;
    let submissions =
        workflow::ensure_attempting(&submissions_api, &students, submissions, &config.operational)
            .await?;
    let user_submission_map: HashMap<i64, Submission> = submissions
        .into_iter()
        .map(|s| (s.course_user_id, s))
        .collect();

    let (jobs, report) = workflow::submit_answers(
        &submissions_api,
        &user_files,
        &fname_student_map,
        &user_submission_map,
        &router,
        &config.operational.no_submission_content,
    )
    .await;

    if let Some(report_path) = &config.report_path {
        services::save_report(&report, report_path)?;
    }

    info!(jobs = jobs.len(), "completed submission run");
    Ok(jobs)
}

/// Scrape the directory index, download matching archives, and extract
/// them into the submission base directory.
async fn run_batch_download(batch: &BatchDownloadConfig, base_dir: &Path) -> Result<()> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| UploaderError::Config(format!("failed to build HTTP client: {}", e)))?;

    info!(url = %batch.base_url, "scraping directory index");
    let urls =
        download::scrape_directory_index(&http, &batch.base_url, batch.basic_auth.as_ref()).await?;
    let filtered = download::filter_urls(&urls, &batch.filter_pattern)?;
    info!(
        harvested = urls.len(),
        matched = filtered.len(),
        "filtered index URLs"
    );

    let downloaded = download::download_files(
        &http,
        &filtered,
        &batch.destination,
        batch.basic_auth.as_ref(),
    )
    .await?;
    let extracted = download::extract_zip_files(&downloaded, base_dir)?;
    info!(path = %extracted.display(), "extracted archives");
    Ok(())
}
