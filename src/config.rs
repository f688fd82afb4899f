//! Run configuration, loaded from a TOML file given on the command line.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, UploaderError};

/// Default wait for Coursemology background jobs (force submit / unsubmit).
pub const DEFAULT_JOB_TIMEOUT_SECONDS: u64 = 3600;
/// Content submitted for questions no file matched.
pub const DEFAULT_NO_SUBMISSION_CONTENT: &str = "# No submission";
/// Default maximum wait for auto-grading to finish.
pub const DEFAULT_GRADING_MAX_WAIT_SECONDS: u64 = 3600;
/// Default interval between auto-grading status checks.
pub const DEFAULT_GRADING_POLL_INTERVAL_SECONDS: u64 = 5;

/// Top-level configuration for one uploader run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base directory containing (extracted) student files.
    pub base_dir: PathBuf,
    /// Glob pattern locating student files under `base_dir`, e.g. `**/*.py`.
    pub file_pattern: String,
    /// CSV-based mapping from filename key to student name/email.
    pub fname_user_map: NameUserMapConfig,
    /// Ordered filename-pattern to question-title routes.
    ///
    /// Declared as an array of tables so declaration order is preserved;
    /// the first pattern matching the start of a filename wins.
    #[serde(default)]
    pub file_question_map: Vec<QuestionRouteEntry>,
    /// Coursemology credentials and assessment selection.
    pub coursemology: CoursemologyConfig,
    /// Optional path to write the submission report (.json or .csv).
    #[serde(default)]
    pub report_path: Option<PathBuf>,
    /// Optional remote-archive download and extraction step.
    #[serde(default)]
    pub batch_download: Option<BatchDownloadConfig>,
    /// Timeouts and default content.
    #[serde(default)]
    pub operational: OperationalConfig,
}

/// One filename-pattern to question-title route.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRouteEntry {
    pub pattern: String,
    pub question: String,
}

/// How to map filename keys to student identities via CSV columns.
#[derive(Debug, Clone, Deserialize)]
pub struct NameUserMapConfig {
    /// Path to the CSV file.
    pub csv: PathBuf,
    /// Column used as the lookup key (e.g. a submission folder name).
    pub key: String,
    /// Column containing the student's full name.
    pub name: String,
    /// Column containing the student's email.
    pub email: String,
}

/// Coursemology authentication and assessment selection.
#[derive(Debug, Clone, Deserialize)]
pub struct CoursemologyConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub course_id: i64,
    pub assessment_category: String,
    pub assessment_title: String,
}

/// Basic HTTP auth for protected directory indexes.
#[derive(Debug, Clone, Deserialize)]
pub struct BasicAuthConfig {
    pub username: String,
    pub password: String,
}

/// Scrape, filter, and download files from a directory index.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchDownloadConfig {
    /// Root URL of the directory index.
    pub base_url: String,
    #[serde(default)]
    pub basic_auth: Option<BasicAuthConfig>,
    /// Case-insensitive regex selecting which harvested URLs to download.
    pub filter_pattern: String,
    /// Local directory to save downloaded archives.
    pub destination: PathBuf,
}

/// Operational settings for timeouts and default content.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OperationalConfig {
    pub job_timeout_seconds: u64,
    pub no_submission_content: String,
    pub grading_max_wait_seconds: u64,
    pub grading_poll_interval_seconds: u64,
}

impl Default for OperationalConfig {
    fn default() -> Self {
        Self {
            job_timeout_seconds: DEFAULT_JOB_TIMEOUT_SECONDS,
            no_submission_content: DEFAULT_NO_SUBMISSION_CONTENT.to_string(),
            grading_max_wait_seconds: DEFAULT_GRADING_MAX_WAIT_SECONDS,
            grading_poll_interval_seconds: DEFAULT_GRADING_POLL_INTERVAL_SECONDS,
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            UploaderError::Config(format!(
                "cannot read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&raw)
            .map_err(|e| UploaderError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.operational.grading_poll_interval_seconds == 0 {
            return Err(UploaderError::Config(
                "grading_poll_interval_seconds must be greater than zero".to_string(),
            ));
        }
        if self.operational.grading_max_wait_seconds < self.operational.grading_poll_interval_seconds
        {
            return Err(UploaderError::Config(
                "grading_max_wait_seconds must be at least one poll interval".to_string(),
            ));
        }
        Ok(())
    }
}
